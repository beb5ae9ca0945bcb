use std::fmt;

/// Unit class of a robot axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisType {
    /// millimeters
    Linear,
    /// degrees
    Rotational,
}

impl AxisType {
    pub fn unit(&self) -> &'static str {
        match self {
            AxisType::Linear => "mm",
            AxisType::Rotational => "deg",
        }
    }
}

/// Named axis of a Cartesian point record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
    W,
    P,
    R,
    E1,
    E2,
    E3,
}

impl Axis {
    pub const CARTESIAN: [Axis; 6] = [Axis::X, Axis::Y, Axis::Z, Axis::W, Axis::P, Axis::R];
    pub const EXTENDED: [Axis; 3] = [Axis::E1, Axis::E2, Axis::E3];

    /// Field label as written in a point block, including the `=` sign.
    pub fn label(&self) -> &'static str {
        match self {
            Axis::X => "X =",
            Axis::Y => "Y =",
            Axis::Z => "Z =",
            Axis::W => "W =",
            Axis::P => "P =",
            Axis::R => "R =",
            Axis::E1 => "E1=",
            Axis::E2 => "E2=",
            Axis::E3 => "E3=",
        }
    }

    pub fn extended_index(&self) -> Option<usize> {
        match self {
            Axis::E1 => Some(0),
            Axis::E2 => Some(1),
            Axis::E3 => Some(2),
            _ => None,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label().trim_end_matches('=').trim())
    }
}

/// Axis layout of a program: six base axes plus up to three extended axes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisSpec {
    axes: Vec<AxisType>,
}

const BASE_AXES: [AxisType; 6] = [
    AxisType::Linear,
    AxisType::Linear,
    AxisType::Linear,
    AxisType::Rotational,
    AxisType::Rotational,
    AxisType::Rotational,
];

impl Default for AxisSpec {
    fn default() -> Self {
        Self {
            axes: BASE_AXES.to_vec(),
        }
    }
}

impl AxisSpec {
    /// Infer extended axis types from the text of a point block.
    pub fn from_point_text(text: &str) -> Self {
        let mut axes = BASE_AXES.to_vec();
        for axis in Axis::EXTENDED {
            let Some(pos) = text.find(axis.label()) else {
                break;
            };
            let rest = &text[pos + axis.label().len()..];
            let unit = rest
                .trim_start()
                .split_whitespace()
                .nth(1)
                .unwrap_or_default();
            axes.push(if unit.starts_with("mm") {
                AxisType::Linear
            } else {
                AxisType::Rotational
            });
        }
        Self { axes }
    }

    pub fn len(&self) -> usize {
        self.axes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    pub fn extended_count(&self) -> usize {
        self.axes.len() - BASE_AXES.len()
    }

    pub fn get(&self, index: usize) -> Option<AxisType> {
        self.axes.get(index).copied()
    }

    pub fn extended(&self) -> &[AxisType] {
        &self.axes[BASE_AXES.len()..]
    }

    pub fn iter(&self) -> impl Iterator<Item = AxisType> + '_ {
        self.axes.iter().copied()
    }

    pub(crate) fn push_extended(&mut self, kind: AxisType) {
        self.axes.push(kind);
    }

    pub(crate) fn remove_extended(&mut self, index: usize) {
        if index < self.extended_count() {
            self.axes.remove(BASE_AXES.len() + index);
        }
    }
}

impl fmt::Display for AxisSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = ["X", "Y", "Z", "W", "P", "R", "E1", "E2", "E3"];
        for (i, (name, t)) in names.iter().zip(self.axes.iter()).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}[{}]", name, t.unit())?;
        }
        Ok(())
    }
}
