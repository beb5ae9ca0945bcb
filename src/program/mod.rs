mod edit;
mod header;
mod instrument;
mod instruction;
mod parser;
mod point;
pub mod point_index;
mod serializer;
mod speed;

pub use edit::TransformSide;
pub use instruction::{parse_point_number, Instruction, MoveType, SpeedField, SpeedUnit, Termination};
pub use point::{format_value, ArmConfig, PointBlock, Pose};
pub use serializer::OutputMode;

use crate::axis::AxisSpec;

/// Ordered entries of one program section closed by its marker line.
#[derive(Debug, Clone, PartialEq)]
pub struct Section<T> {
    entries: Vec<T>,
    sentinel: String,
}

impl<T> Section<T> {
    pub(crate) fn new(entries: Vec<T>, sentinel: String) -> Self {
        Self { entries, sentinel }
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    /// The closing marker line (`/MN`, `/POS` or `/END`) with its line ending.
    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entries_mut(&mut self) -> &mut Vec<T> {
        &mut self.entries
    }
}

/// A parsed `.ls` teach pendant program.
///
/// Lines are kept with their original terminators so an unmodified document
/// serializes back byte for byte. Edits replace only the affected line or
/// point block.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramDocument {
    header: Section<String>,
    instructions: Section<Instruction>,
    points: Section<PointBlock>,
    axes: AxisSpec,
}

impl ProgramDocument {
    pub fn header(&self) -> &Section<String> {
        &self.header
    }

    pub fn instructions(&self) -> &Section<Instruction> {
        &self.instructions
    }

    pub fn points(&self) -> &Section<PointBlock> {
        &self.points
    }

    pub fn axes(&self) -> &AxisSpec {
        &self.axes
    }

    pub fn number_of_points(&self) -> usize {
        self.points.len()
    }

    /// Point numbers in the order the instructions visit them, repeats included.
    pub fn travel_order(&self) -> Vec<u32> {
        self.instructions
            .entries()
            .iter()
            .filter_map(|i| i.point())
            .filter(|n| *n > 0)
            .collect()
    }

    /// Names of all programs invoked with `CALL`.
    pub fn called_programs(&self) -> Vec<String> {
        self.instructions
            .entries()
            .iter()
            .filter_map(|i| i.called_program())
            .map(|s| s.to_owned())
            .collect()
    }

    pub fn user_frames_used(&self) -> Vec<i32> {
        self.collect_frames(PointBlock::user_frame)
    }

    pub fn tool_frames_used(&self) -> Vec<i32> {
        self.collect_frames(PointBlock::tool_frame)
    }

    fn collect_frames(&self, f: fn(&PointBlock) -> Option<i32>) -> Vec<i32> {
        let mut frames = self
            .points
            .entries()
            .iter()
            .filter_map(f)
            .collect::<Vec<_>>();
        frames.sort_unstable();
        frames.dedup();
        frames
    }
}
