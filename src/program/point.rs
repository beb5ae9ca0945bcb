use std::fmt;

use crate::axis::{Axis, AxisType};
use crate::{Error, Result};

/// Cartesian pose as stored in a point block.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
    pub p: f64,
    pub r: f64,
}

impl Pose {
    pub fn new(x: f64, y: f64, z: f64, w: f64, p: f64, r: f64) -> Self {
        Self { x, y, z, w, p, r }
    }

    pub fn as_array(&self) -> [f64; 6] {
        [self.x, self.y, self.z, self.w, self.p, self.r]
    }

    pub fn distance(&self, other: &Pose) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }
}

/// Arm configuration `'F U T, t4, t5, t6'`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmConfig {
    pub flip: char,
    pub up_down: char,
    pub front_back: char,
    pub turns: [i32; 3],
}

impl ArmConfig {
    /// Letters are accepted in either case, turn counts must be in `-3..=3`.
    pub fn new(flip: char, up_down: char, front_back: char, turns: [i32; 3]) -> Option<Self> {
        let flip = flip.to_ascii_uppercase();
        let up_down = up_down.to_ascii_uppercase();
        let front_back = front_back.to_ascii_uppercase();
        let valid = matches!(flip, 'F' | 'N')
            && matches!(up_down, 'U' | 'D')
            && matches!(front_back, 'T' | 'B')
            && turns.iter().all(|t| *t > -4 && *t < 4);
        valid.then_some(Self {
            flip,
            up_down,
            front_back,
            turns,
        })
    }
}

impl fmt::Display for ArmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}, {}, {}, {}",
            self.flip, self.up_down, self.front_back, self.turns[0], self.turns[1], self.turns[2]
        )
    }
}

/// Format a pose value the way the controller writes it.
pub fn format_value(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded == 0.0 {
        "0.000".to_owned()
    } else {
        format!("{:.3}", rounded)
    }
}

/// One `P[n]{ ... };` block of the position section.
#[derive(Debug, Clone, PartialEq)]
pub struct PointBlock {
    text: String,
    number: u32,
    comment: Option<String>,
}

impl PointBlock {
    pub fn parse(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        let (number, comment) = parse_header(&text)?;
        Ok(Self {
            text,
            number,
            comment,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn is_joint_form(&self) -> bool {
        (1..=6).all(|j| self.text.contains(&format!("J{}=", j)))
    }

    /// Rewrite the number in the block header, keeping the comment.
    pub fn set_number(&mut self, number: u32) {
        if let Some(start) = self.text.find("P[") {
            let start = start + 2;
            if let Some(len) = self.text[start..].find(|c: char| c == ']' || c == ':') {
                self.text.replace_range(start..start + len, &number.to_string());
                self.number = number;
            }
        }
    }

    /// Rewrite the whole header as `P[n:"comment"]{`.
    pub fn set_number_and_comment(&mut self, number: u32, comment: &str) {
        if let (Some(open), Some(close)) = (self.text.find("P["), self.text.find(']')) {
            self.text
                .replace_range(open + 2..close, &format!("{}:\"{}\"", number, comment));
            self.number = number;
            self.comment = Some(comment.to_owned());
        }
    }

    pub fn value(&self, label: &str) -> Option<f64> {
        let (start, end) = value_span(&self.text, label)?;
        self.text[start..end].parse().ok()
    }

    pub fn axis_value(&self, axis: Axis) -> Option<f64> {
        self.value(axis.label())
    }

    pub fn require(&self, axis: Axis) -> Result<f64> {
        self.axis_value(axis).ok_or_else(|| Error::MissingField {
            point: self.number,
            field: axis.to_string(),
        })
    }

    /// Replace a numeric field in place; the value stays right aligned in
    /// its original column.
    pub fn set_value(&mut self, label: &str, value: f64) -> bool {
        let Some(label_pos) = self.text.find(label) else {
            return false;
        };
        let Some((start, end)) = value_span(&self.text, label) else {
            return false;
        };
        let gap_start = label_pos + label.len();
        let lead = start - gap_start;
        let new = format_value(value);
        let width = lead + (end - start);
        let min_lead = lead.min(1);
        let new_lead = width.saturating_sub(new.len()).max(min_lead);
        self.text
            .replace_range(gap_start..end, &format!("{}{}", " ".repeat(new_lead), new));
        true
    }

    pub fn set_axis_value(&mut self, axis: Axis, value: f64) -> bool {
        self.set_value(axis.label(), value)
    }

    pub fn pose(&self) -> Result<Pose> {
        if self.is_joint_form() {
            return Err(Error::JointRepresentation(self.number));
        }
        Ok(Pose {
            x: self.require(Axis::X)?,
            y: self.require(Axis::Y)?,
            z: self.require(Axis::Z)?,
            w: self.require(Axis::W)?,
            p: self.require(Axis::P)?,
            r: self.require(Axis::R)?,
        })
    }

    pub fn set_pose(&mut self, pose: &Pose) {
        for (axis, v) in Axis::CARTESIAN.iter().zip(pose.as_array()) {
            self.set_axis_value(*axis, v);
        }
    }

    pub fn extended_values(&self) -> Vec<f64> {
        Axis::EXTENDED
            .iter()
            .map_while(|a| self.axis_value(*a))
            .collect()
    }

    /// Drop extended axis `axis`; the axes after it move down one slot.
    pub fn remove_extended_axis(&mut self, axis: Axis) -> bool {
        let Some(index) = axis.extended_index() else {
            return false;
        };
        let Some(start) = self.text.find(axis.label()) else {
            return false;
        };
        let next = Axis::EXTENDED
            .get(index + 1)
            .and_then(|n| self.text[start..].find(n.label()))
            .map(|p| start + p);
        match next {
            Some(next) => self.text.replace_range(start..next, ""),
            None => {
                let Some(end) = unit_end(&self.text, start) else {
                    return false;
                };
                let from = self.text[..start].rfind(',').unwrap_or(start);
                self.text.replace_range(from..end, "");
            }
        }
        for (from, to) in Axis::EXTENDED[index + 1..].iter().zip(&Axis::EXTENDED[index..]) {
            self.text = self.text.replacen(from.label(), to.label(), 1);
        }
        true
    }

    /// Append the next free extended axis with value 0.
    pub fn add_extended_axis(&mut self, kind: AxisType) -> Option<Axis> {
        let axis = Axis::EXTENDED
            .into_iter()
            .find(|a| !self.text.contains(a.label()))?;
        let close = self.text.find("};")?;
        let at = self.text[..close].trim_end().len();
        let ending = if self.text.contains("\r\n") { "\r\n" } else { "\n" };
        let separator = match axis {
            Axis::E1 => format!(",{}\t", ending),
            _ => ",\t".to_owned(),
        };
        let field = format!(
            "{}{}{:>10} {:>3}",
            separator,
            axis.label(),
            format_value(0.0),
            kind.unit()
        );
        self.text.insert_str(at, &field);
        Some(axis)
    }

    pub fn user_frame(&self) -> Option<i32> {
        let (start, end) = frame_span(&self.text, "UF :")?;
        self.text[start..end].parse().ok()
    }

    pub fn tool_frame(&self) -> Option<i32> {
        let (start, end) = frame_span(&self.text, "UT :")?;
        self.text[start..end].parse().ok()
    }

    pub fn set_user_frame(&mut self, frame: i32) -> bool {
        self.replace_frame("UF :", frame)
    }

    pub fn set_tool_frame(&mut self, frame: i32) -> bool {
        self.replace_frame("UT :", frame)
    }

    fn replace_frame(&mut self, label: &str, frame: i32) -> bool {
        let Some((start, end)) = frame_span(&self.text, label) else {
            return false;
        };
        self.text.replace_range(start..end, &frame.to_string());
        true
    }

    /// Raw text between the quotes of the `CONFIG` field.
    pub fn config(&self) -> Option<&str> {
        let (start, end) = config_span(&self.text)?;
        Some(&self.text[start..end])
    }

    pub fn set_config(&mut self, config: &ArmConfig) -> bool {
        let Some((start, end)) = config_span(&self.text) else {
            return false;
        };
        self.text.replace_range(start..end, &config.to_string());
        true
    }

    /// Field-by-field text split at unit boundaries, used for diffs.
    pub fn fields(&self) -> Vec<&str> {
        let mut res = vec![];
        let mut rest = self.text.as_str();
        while !rest.is_empty() {
            let next = [rest.find("mm").map(|i| i + 2), rest.find("deg").map(|i| i + 3)]
                .into_iter()
                .flatten()
                .min();
            match next {
                Some(cut) => {
                    res.push(rest[..cut].trim_matches(|c: char| c.is_whitespace() || c == ','));
                    rest = &rest[cut..];
                }
                None => {
                    let tail = rest.trim_matches(|c: char| c.is_whitespace() || c == ',');
                    if !tail.is_empty() {
                        res.push(tail);
                    }
                    break;
                }
            }
        }
        res
    }
}

fn parse_header(text: &str) -> Result<(u32, Option<String>)> {
    let head = text.trim_start();
    let first_line = head.lines().next().unwrap_or_default();
    let bad = || Error::BadPointHeader(first_line.trim().to_owned());

    let inner = head.strip_prefix("P[").ok_or_else(bad)?;
    let close = inner.find(']').ok_or_else(bad)?;
    let inner = &inner[..close];
    let (number, comment) = match inner.split_once(':') {
        Some((n, c)) => (n, Some(c.trim().trim_matches('"').to_owned())),
        None => (inner, None),
    };
    let number = number.trim().parse().map_err(|_| bad())?;
    Ok((number, comment))
}

/// Span of the numeric token following `label`.
fn value_span(text: &str, label: &str) -> Option<(usize, usize)> {
    let after = text.find(label)? + label.len();
    let rest = &text[after..];
    let start = after + (rest.len() - rest.trim_start_matches(' ').len());
    let len = text[start..]
        .find(|c: char| c.is_whitespace() || c == ',')
        .unwrap_or(text.len() - start);
    (len > 0).then_some((start, start + len))
}

/// End of the first `mm`/`deg` unit at or after `from`.
fn unit_end(text: &str, from: usize) -> Option<usize> {
    let rest = &text[from..];
    [rest.find("mm").map(|i| i + 2), rest.find("deg").map(|i| i + 3)]
        .into_iter()
        .flatten()
        .min()
        .map(|i| from + i)
}

fn frame_span(text: &str, label: &str) -> Option<(usize, usize)> {
    let (start, end) = value_span(text, label)?;
    let len = text[start..end]
        .find(|c: char| !(c.is_ascii_digit() || c == '-'))
        .unwrap_or(end - start);
    (len > 0).then_some((start, start + len))
}

fn config_span(text: &str) -> Option<(usize, usize)> {
    let pos = text.find("CONFIG")?;
    let start = pos + text[pos..].find('\'')? + 1;
    let end = start + text[start..].find('\'')?;
    Some((start, end))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_data::{POINT_EXT, POINT_JOINT, POINT_NO_EXT};

    #[test]
    fn header() {
        let p = PointBlock::parse(POINT_EXT).unwrap();
        assert_eq!(p.number(), 3);
        assert_eq!(p.comment(), None);
        let p = PointBlock::parse("P[5001:\"3_4\"]{\r\n};\r\n").unwrap();
        assert_eq!(p.number(), 5001);
        assert_eq!(p.comment(), Some("3_4"));
        assert!(PointBlock::parse("Q[1]{\r\n};\r\n").is_err());
    }

    #[test]
    fn fields() {
        let p = PointBlock::parse(POINT_EXT).unwrap();
        assert_eq!(p.user_frame(), Some(1));
        assert_eq!(p.tool_frame(), Some(2));
        assert_eq!(p.config(), Some("N U T, 0, 0, 0"));
        let pose = p.pose().unwrap();
        assert_eq!(pose, Pose::new(1200.5, -350.25, 800.0, -90.0, 0.0, 180.0));
        assert_eq!(p.extended_values(), vec![1500.0]);
        assert!(!p.is_joint_form());
    }

    #[test]
    fn joint_form() {
        let p = PointBlock::parse(POINT_JOINT).unwrap();
        assert!(p.is_joint_form());
        assert!(matches!(p.pose(), Err(Error::JointRepresentation(2))));
    }

    #[test]
    fn aligned_replace() {
        let mut p = PointBlock::parse(POINT_NO_EXT).unwrap();
        assert!(p.set_axis_value(Axis::X, 12.34567));
        assert!(p.text().contains("X =    12.346  mm"));
        assert!(p.set_axis_value(Axis::X, -12345.0));
        assert!(p.text().contains("X = -12345.000  mm"));
        assert_eq!(p.axis_value(Axis::X), Some(-12345.0));
        // the other fields are untouched
        assert!(p.text().contains("Y =   200.000  mm"));
    }

    #[test]
    fn frames_and_config() {
        let mut p = PointBlock::parse(POINT_EXT).unwrap();
        assert!(p.set_user_frame(4));
        assert!(p.set_tool_frame(10));
        assert_eq!(p.user_frame(), Some(4));
        assert_eq!(p.tool_frame(), Some(10));
        let cfg = ArmConfig::new('f', 'd', 'b', [1, 0, -1]).unwrap();
        assert!(p.set_config(&cfg));
        assert_eq!(p.config(), Some("F D B, 1, 0, -1"));
        assert!(ArmConfig::new('x', 'u', 't', [0, 0, 0]).is_none());
        assert!(ArmConfig::new('n', 'u', 't', [0, 4, 0]).is_none());
    }

    #[test]
    fn extended_axis_layout() {
        let mut p = PointBlock::parse(POINT_EXT).unwrap();
        assert_eq!(p.add_extended_axis(AxisType::Rotational), Some(Axis::E2));
        assert!(p.text().ends_with("\tE1=  1500.000  mm,\tE2=     0.000 deg\r\n};\r\n"));
        assert_eq!(p.extended_values(), vec![1500.0, 0.0]);

        assert!(p.remove_extended_axis(Axis::E1));
        assert!(p.text().ends_with("deg,\r\n\tE1=     0.000 deg\r\n};\r\n"));
        assert_eq!(p.extended_values(), vec![0.0]);

        assert!(p.remove_extended_axis(Axis::E1));
        assert!(p.text().ends_with("R =   180.000 deg\r\n};\r\n"));
        assert!(!p.remove_extended_axis(Axis::E1));
        assert!(!p.remove_extended_axis(Axis::X));

        assert_eq!(p.add_extended_axis(AxisType::Linear), Some(Axis::E1));
        assert!(p.text().ends_with("R =   180.000 deg,\r\n\tE1=     0.000  mm\r\n};\r\n"));
        assert_eq!(p.add_extended_axis(AxisType::Linear), Some(Axis::E2));
        assert_eq!(p.add_extended_axis(AxisType::Linear), Some(Axis::E3));
        assert_eq!(p.add_extended_axis(AxisType::Linear), None);
    }

    #[test]
    fn value_format() {
        assert_eq!(format_value(-0.0004), "0.000");
        assert_eq!(format_value(1.0006), "1.001");
        assert_eq!(format_value(-7.5), "-7.500");
    }

    #[test]
    fn split_fields() {
        let p = PointBlock::parse(POINT_NO_EXT).unwrap();
        let f = p.fields();
        assert!(f.iter().any(|s| s.ends_with("X =   100.000  mm")));
        assert!(f.iter().any(|s| *s == "R =     0.000 deg"));
    }
}
