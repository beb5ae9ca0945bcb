use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::ProgramDocument;

pub(super) fn line_ending(line: &str) -> &str {
    if line.ends_with("\r\n") {
        "\r\n"
    } else if line.ends_with('\n') {
        "\n"
    } else {
        ""
    }
}

impl ProgramDocument {
    /// Program name from the `/PROG` line.
    pub fn program_name(&self) -> Option<&str> {
        self.header
            .entries()
            .first()
            .and_then(|l| l.strip_prefix("/PROG"))
            .and_then(|l| l.split_whitespace().next())
    }

    pub fn set_program_name(&mut self, name: &str, paint_process: bool) {
        let Some(first) = self.header.entries_mut().first_mut() else {
            return;
        };
        let ending = line_ending(first).to_owned();
        *first = if paint_process {
            format!("/PROG  {}\t\tProcess{}", name, ending)
        } else {
            format!("/PROG  {}{}", name, ending)
        };
    }

    /// Text between the quotes of the `COMMENT` attribute.
    pub fn comment(&self) -> Option<&str> {
        let line = self.comment_line()?;
        let line = &self.header.entries()[line];
        let start = line.find('"')? + 1;
        let end = start + line[start..].find('"')?;
        Some(&line[start..end])
    }

    pub fn set_comment(&mut self, comment: &str) -> bool {
        let Some(index) = self.comment_line() else {
            return false;
        };
        let line = &mut self.header.entries_mut()[index];
        let ending = line_ending(line).to_owned();
        *line = format!("COMMENT\t\t= \"{}\";{}", comment, ending);
        true
    }

    fn comment_line(&self) -> Option<usize> {
        self.header
            .entries()
            .iter()
            .position(|l| l.trim_start().starts_with("COMMENT"))
    }

    /// `MODIFIED = DATE yy-mm-dd TIME hh:mm:ss;`
    pub fn modified_date(&self) -> Option<NaiveDateTime> {
        let line = self
            .header
            .entries()
            .iter()
            .find(|l| l.trim_start().starts_with("MODIFIED"))?;
        let mut words = line[line.find("DATE")? + 4..].split_whitespace();
        let date = NaiveDate::parse_from_str(words.next()?, "%y-%m-%d").ok()?;
        if words.next()? != "TIME" {
            return None;
        }
        let time = words.next()?.trim_end_matches(';');
        let time = NaiveTime::parse_from_str(time, "%H:%M:%S").ok()?;
        Some(NaiveDateTime::new(date, time))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_data::SAMPLE_PROGRAM;

    #[test]
    fn comment() {
        let mut doc = ProgramDocument::parse(SAMPLE_PROGRAM).unwrap();
        assert_eq!(doc.comment(), Some("Door panel"));
        assert!(doc.set_comment("Hood, second coat"));
        assert_eq!(doc.comment(), Some("Hood, second coat"));
        assert!(doc
            .to_string()
            .contains("COMMENT\t\t= \"Hood, second coat\";\r\nPROG_SIZE"));
    }

    #[test]
    fn name() {
        let mut doc = ProgramDocument::parse(SAMPLE_PROGRAM).unwrap();
        assert_eq!(doc.program_name(), Some("SAMPLE"));
        doc.set_program_name("HOOD_1", false);
        assert!(doc.to_string().starts_with("/PROG  HOOD_1\r\n/ATTR"));
    }

    #[test]
    fn modified() {
        let doc = ProgramDocument::parse(SAMPLE_PROGRAM).unwrap();
        let date = doc.modified_date().unwrap();
        assert_eq!(date.format("%Y-%m-%d %H:%M:%S").to_string(), "2015-03-12 10:22:33");
    }
}
