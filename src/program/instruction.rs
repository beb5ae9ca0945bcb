use std::fmt;

/// Motion type of an instruction line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveType {
    Joint,
    Linear,
    /// Speed lives on the continuation line that follows.
    Circular,
}

/// Unit of a speed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedUnit {
    Percent,
    MmPerSec,
    /// Any other `.../sec`, `.../min` or `sec` unit, kept as written.
    Other,
}

/// Motion termination mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Fine,
    Cnt(u8),
}

impl Termination {
    /// `0` means `FINE`, `1..=100` means `CNTn`, anything else is rejected.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Termination::Fine),
            1..=100 => Some(Termination::Cnt(code as u8)),
            _ => None,
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Fine => write!(f, "FINE"),
            Termination::Cnt(n) => write!(f, "CNT{}", n),
        }
    }
}

/// Location of the numeric speed inside an instruction line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedField {
    pub start: usize,
    pub end: usize,
    pub unit: SpeedUnit,
    unit_end: usize,
}

/// One line of the instruction section.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    text: String,
    point: Option<u32>,
}

impl Instruction {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let point = parse_point_number(&text);
        Self { text, point }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        *self = Self::new(text);
    }

    /// Number of the point referenced by this line.
    pub fn point(&self) -> Option<u32> {
        self.point
    }

    pub fn line_number(&self) -> Option<u32> {
        let colon = self.text.find(':')?;
        self.text[..colon].trim().parse().ok()
    }

    pub fn move_type(&self) -> MoveType {
        let kind = self
            .text
            .find(':')
            .and_then(|colon| self.text[colon + 1..].chars().next());
        match kind {
            Some('J') => MoveType::Joint,
            Some('C') => MoveType::Circular,
            _ => MoveType::Linear,
        }
    }

    /// Speed token following the point reference of this line.
    pub fn speed_field(&self) -> Option<SpeedField> {
        let open = find_point_ref(&self.text)?;
        let close = open + self.text[open..].find(']')?;
        let after = close + 1;
        let rest = &self.text[after..];
        let start = after + (rest.len() - rest.trim_start().len());
        let digits = self.text[start..]
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(self.text.len() - start);
        if digits == 0 {
            return None;
        }
        let end = start + digits;
        let unit_len = self.text[end..]
            .find(|c: char| c.is_whitespace() || c == ';')
            .unwrap_or(self.text.len() - end);
        let unit = match &self.text[end..end + unit_len] {
            "%" => SpeedUnit::Percent,
            "mm/sec" => SpeedUnit::MmPerSec,
            "" => return None,
            _ => SpeedUnit::Other,
        };
        Some(SpeedField {
            start,
            end,
            unit,
            unit_end: end + unit_len,
        })
    }

    pub fn speed_text(&self) -> Option<&str> {
        self.speed_field().map(|f| &self.text[f.start..f.end])
    }

    /// Replace the numeric speed, keeping everything else byte for byte.
    pub fn replace_speed(&mut self, speed: i32) -> bool {
        let Some(field) = self.speed_field() else {
            return false;
        };
        self.text
            .replace_range(field.start..field.end, &speed.to_string());
        true
    }

    /// Replace the termination token that follows the speed unit.
    pub fn replace_termination(&mut self, termination: Termination) -> bool {
        let Some(field) = self.speed_field() else {
            return false;
        };
        let rest = &self.text[field.unit_end..];
        let start = field.unit_end + (rest.len() - rest.trim_start().len());
        let len = self.text[start..]
            .find(|c: char| c.is_whitespace() || c == ';')
            .unwrap_or(self.text.len() - start);
        let token = &self.text[start..start + len];
        if !(token == "FINE" || token.starts_with("CNT")) {
            return false;
        }
        self.text
            .replace_range(start..start + len, &termination.to_string());
        true
    }

    /// Rewrite the referenced point number, keeping any `:comment` part.
    pub fn replace_point_number(&mut self, number: u32) -> bool {
        let Some(open) = find_point_ref(&self.text) else {
            return false;
        };
        let start = open + 2;
        let len = self.text[start..]
            .find(|c: char| c == ']' || c == ':')
            .unwrap_or(0);
        if len == 0 {
            return false;
        }
        let mut text = self.text.clone();
        text.replace_range(start..start + len, &number.to_string());
        self.set_text(text);
        true
    }

    /// Replace everything between the brackets of the point reference.
    pub fn replace_reference(&mut self, inner: &str) -> bool {
        let Some(open) = find_point_ref(&self.text) else {
            return false;
        };
        let Some(close) = self.text[open..].find(']') else {
            return false;
        };
        let mut text = self.text.clone();
        text.replace_range(open + 2..open + close, inner);
        self.set_text(text);
        true
    }

    /// Rewrite the leading line number right aligned to 4 columns.
    pub fn replace_line_number(&mut self, number: u32) -> bool {
        let Some(colon) = self.text.find(':') else {
            return false;
        };
        if self.text[..colon].trim().parse::<u32>().is_err() {
            return false;
        }
        let text = format!("{:>4}{}", number, &self.text[colon..]);
        self.set_text(text);
        true
    }

    /// Value assigned by a `<KEY>=<n>` statement such as `UFRAME_NUM=2`.
    pub fn assignment(&self, key: &str) -> Option<(usize, usize, i32)> {
        let pos = self.text.find(key)?;
        let mut start = pos + key.len();
        let rest = &self.text[start..];
        let rest_trim = rest.trim_start();
        let rest_trim = rest_trim.strip_prefix('=')?;
        start += rest.len() - rest_trim.len();
        let lead = rest_trim.len() - rest_trim.trim_start().len();
        start += lead;
        let len = self.text[start..]
            .find(|c: char| !(c.is_ascii_digit() || c == '-'))
            .unwrap_or(self.text.len() - start);
        let value = self.text[start..start + len].parse().ok()?;
        Some((start, start + len, value))
    }

    pub fn replace_assignment(&mut self, key: &str, value: i32) -> bool {
        let Some((start, end, _)) = self.assignment(key) else {
            return false;
        };
        self.text.replace_range(start..end, &value.to_string());
        true
    }

    /// Program name of a `CALL` statement.
    pub fn called_program(&self) -> Option<&str> {
        let pos = self.text.find("CALL ")?;
        let rest = &self.text[pos + 5..];
        let end = rest.find(';').unwrap_or(rest.len());
        let name = rest[..end].trim();
        (!name.is_empty()).then_some(name)
    }
}

/// Byte offset of the `P[` of a position reference, skipping `PR[` and
/// identifiers ending with `P`.
fn find_point_ref(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut from = 0;
    while let Some(pos) = line[from..].find("P[") {
        let abs = from + pos;
        if abs == 0 || !(bytes[abs - 1].is_ascii_alphanumeric() || bytes[abs - 1] == b'_') {
            return Some(abs);
        }
        from = abs + 2;
    }
    None
}

/// Point number referenced by an instruction line (`P[12]`, `P[12:name]`).
pub fn parse_point_number(line: &str) -> Option<u32> {
    let start = find_point_ref(line)? + 2;
    let len = line[start..].find(|c: char| c == ']' || c == ':')?;
    line[start..start + len].trim().parse().ok()
}
