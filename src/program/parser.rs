use std::collections::HashSet;
use std::path::Path;

use tracing::trace;

use super::{Instruction, PointBlock, ProgramDocument, Section};
use crate::axis::AxisSpec;
use crate::{Error, Result};

const MN: &str = "/MN";
const POS: &str = "/POS";
const END: &str = "/END";

impl ProgramDocument {
    /// Parse program text scanning line by line for the section markers.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.split_inclusive('\n');

        let mut header = vec![];
        let mn = loop {
            match lines.next() {
                Some(line) if line.trim() == MN => break line.to_owned(),
                Some(line) => header.push(line.to_owned()),
                None => return Err(Error::MissingSection(MN)),
            }
        };

        let mut instructions = vec![];
        let pos = loop {
            match lines.next() {
                Some(line) if line.trim() == POS => break line.to_owned(),
                Some(line) => instructions.push(Instruction::new(line)),
                None => return Err(Error::MissingSection(POS)),
            }
        };

        let points = parse_points(lines)?;
        Self::assemble(
            Section::new(header, mn),
            Section::new(instructions, pos),
            points,
        )
    }

    /// Parse a raw controller buffer. Section boundaries are located by
    /// searching for the marker tokens, line endings are kept as found.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let text = bytes.iter().map(|b| *b as char).collect::<String>();

        let mn_start = text.find(MN).ok_or(Error::MissingSection(MN))?;
        let pos_start = mn_start + text[mn_start..].find(POS).ok_or(Error::MissingSection(POS))?;
        if !text[pos_start..].contains(END) {
            return Err(Error::MissingSection(END));
        }
        let mn_end = line_end(&text, mn_start);
        let pos_end = line_end(&text, pos_start);

        let header = text[..mn_start]
            .split_inclusive('\n')
            .map(|l| l.to_owned())
            .collect();
        let instructions = text[mn_end..pos_start]
            .split_inclusive('\n')
            .map(Instruction::new)
            .collect();
        let points = parse_points(text[pos_end..].split_inclusive('\n'))?;

        Self::assemble(
            Section::new(header, text[mn_start..mn_end].to_owned()),
            Section::new(instructions, text[pos_start..pos_end].to_owned()),
            points,
        )
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        trace!("Loading program {:?} ({} bytes)", path.as_ref(), bytes.len());
        Self::from_bytes(&bytes)
    }

    fn assemble(
        header: Section<String>,
        instructions: Section<Instruction>,
        points: Section<PointBlock>,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        for p in points.entries() {
            if !seen.insert(p.number()) {
                return Err(Error::DuplicatePoint(p.number()));
            }
        }

        let axes = points
            .entries()
            .first()
            .map(|p| AxisSpec::from_point_text(p.text()))
            .unwrap_or_default();

        Ok(Self {
            header,
            instructions,
            points,
            axes,
        })
    }
}

fn line_end(text: &str, from: usize) -> usize {
    text[from..]
        .find('\n')
        .map(|i| from + i + 1)
        .unwrap_or(text.len())
}

fn is_block_end(line: &str) -> bool {
    let line = line.trim();
    line.starts_with('}') && line.ends_with(';')
}

/// Collect point blocks up to `/END`; blank lines between blocks stay with
/// the block that follows them, anything after `/END` stays with the marker.
fn parse_points<'a, I>(mut lines: I) -> Result<Section<PointBlock>>
where
    I: Iterator<Item = &'a str>,
{
    let mut points = vec![];
    let mut block = String::new();

    while let Some(line) = lines.next() {
        if line.trim() == END {
            if !block.trim().is_empty() {
                return Err(unterminated(&block));
            }
            let mut sentinel = std::mem::take(&mut block);
            sentinel.push_str(line);
            sentinel.extend(lines);
            return Ok(Section::new(points, sentinel));
        }

        block.push_str(line);
        if is_block_end(line) {
            points.push(PointBlock::parse(std::mem::take(&mut block))?);
        }
    }

    if block.trim().is_empty() {
        Err(Error::MissingSection(END))
    } else {
        Err(unterminated(&block))
    }
}

fn unterminated(block: &str) -> Error {
    Error::UnterminatedPoint(
        block
            .trim_start()
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_owned(),
    )
}
