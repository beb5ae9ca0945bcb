use std::fmt;
use std::path::Path;

use tracing::debug;

use super::ProgramDocument;
use crate::Result;

/// Output flavour of a saved program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Everything is written as it is.
    #[default]
    PaintProcess,
    /// Drop the `PAINT_PROCESS;` header block and comment out `Preset` lines.
    NonPaint,
}

fn latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

impl ProgramDocument {
    /// Render the program; `PaintProcess` mode is the exact inverse of parsing.
    pub fn render(&self, mode: OutputMode) -> String {
        let mut out = String::new();
        match mode {
            OutputMode::PaintProcess => {
                self.header.entries().iter().for_each(|l| out.push_str(l));
            }
            OutputMode::NonPaint => {
                let header = self.header.entries();
                let mut i = 0;
                while i < header.len() {
                    if header[i].trim_end() == "PAINT_PROCESS;" {
                        // the block itself, then the section after it
                        i += 1;
                        while i < header.len() && !is_blank(&header[i]) {
                            i += 1;
                        }
                        i += 1;
                        while i < header.len() && !is_blank(&header[i]) {
                            i += 1;
                        }
                    } else {
                        out.push_str(&header[i]);
                    }
                    i += 1;
                }
            }
        }
        out.push_str(self.header.sentinel());

        for instruction in self.instructions.entries() {
            let text = instruction.text();
            match (mode, text.find("Preset")) {
                (OutputMode::NonPaint, Some(pos)) => {
                    out.push_str(&text[..pos]);
                    out.push('!');
                    out.push_str(&text[pos..]);
                }
                _ => out.push_str(text),
            }
        }
        out.push_str(self.instructions.sentinel());

        self.points
            .entries()
            .iter()
            .for_each(|p| out.push_str(p.text()));
        out.push_str(self.points.sentinel());
        out
    }

    /// Controller byte form (one byte per character).
    pub fn to_bytes(&self) -> Vec<u8> {
        latin1(&self.to_string())
    }

    /// Save under `path`, renaming the program after the file stem.
    pub fn save_as<P: AsRef<Path>>(&self, path: P, mode: OutputMode) -> Result<()> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_uppercase())
            .unwrap_or_default();

        let mut doc = self.clone();
        doc.set_program_name(&name, mode == OutputMode::PaintProcess);

        let text = doc.render(mode);
        debug!("Saving {} ({} bytes) to {:?}", name, text.len(), path);
        std::fs::write(path, latin1(&text))?;
        Ok(())
    }
}

impl fmt::Display for ProgramDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(OutputMode::PaintProcess))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_data::SAMPLE_PROGRAM;

    #[test]
    fn round_trip() {
        let doc = ProgramDocument::parse(SAMPLE_PROGRAM).unwrap();
        assert_eq!(doc.to_string(), SAMPLE_PROGRAM);
        let again = ProgramDocument::parse(&doc.to_string()).unwrap();
        assert_eq!(again, doc);
        assert_eq!(doc.to_bytes(), SAMPLE_PROGRAM.as_bytes());
    }

    #[test]
    fn round_trip_after_edits() {
        let mut doc = ProgramDocument::parse(SAMPLE_PROGRAM).unwrap();
        doc.set_speed(3, 1234).unwrap();
        doc.set_comment("Edited");
        let again = ProgramDocument::parse(&doc.to_string()).unwrap();
        assert_eq!(again, doc);
    }

    #[test]
    fn non_paint() {
        let doc = ProgramDocument::parse(SAMPLE_PROGRAM).unwrap();
        let text = doc.render(OutputMode::NonPaint);
        assert!(!text.contains("PAINT_PROCESS"));
        assert!(!text.contains("/APPL"));
        assert!(text.contains("CONTROL_CODE\t= 00000000 00000000;\r\n/MN\r\n"));
        assert!(text.contains("   5:  !Preset[3] ;\r\n"));
        // still a valid program
        let stripped = ProgramDocument::parse(&text).unwrap();
        assert_eq!(stripped.points(), doc.points());
    }

    #[test]
    fn save_renames() {
        let doc = ProgramDocument::parse(SAMPLE_PROGRAM).unwrap();
        let path = std::env::temp_dir().join("dynacoat_save_renames.ls");
        doc.save_as(&path, OutputMode::PaintProcess).unwrap();
        let saved = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert!(saved.starts_with("/PROG  DYNACOAT_SAVE_RENAMES\t\tProcess\r\n"));
    }
}
