//! Line edits that add measuring hooks to a path: calls after each move,
//! motion options on the move itself, tool offsets and group output markers.

use std::ops::RangeInclusive;

use tracing::debug;

use super::edit::FIRST_MIDPOINT_NUMBER;
use super::header::line_ending;
use super::{Instruction, MoveType, ProgramDocument};

/// Insert `option` before the padding in front of the closing `;`.
fn append_option(line: &mut Instruction, option: &str) -> bool {
    let text = line.text();
    let Some(semi) = text.rfind(';') else {
        return false;
    };
    let cut = text[..semi].trim_end().len();
    let new = format!("{} {}{}", &text[..cut], option, &text[cut..]);
    line.set_text(new);
    true
}

fn is_move(line: &Instruction) -> bool {
    let text = line.text();
    text.find(':')
        .and_then(|colon| text[colon + 1..].chars().next())
        .map_or(false, |kind| matches!(kind, 'J' | 'L' | 'C'))
}

fn pick<'a>(point: u32, point_program: &'a str, midpoint_program: &'a str) -> &'a str {
    if point >= FIRST_MIDPOINT_NUMBER {
        midpoint_program
    } else {
        point_program
    }
}

impl ProgramDocument {
    /// Insert `statement(point)` as its own line after every move that
    /// ends at a point. The head line of a circular move gets nothing, its
    /// continuation line does.
    fn insert_after_moves(&mut self, mut statement: impl FnMut(u32) -> String) -> usize {
        let mut inserted = 0;
        let mut i = 0;
        while i < self.instructions.len() {
            let line = &self.instructions.entries()[i];
            let target = line
                .point()
                .filter(|n| *n > 0 && line.move_type() != MoveType::Circular);
            let Some(point) = target else {
                i += 1;
                continue;
            };
            let text = format!("{:>4}:  {}    ;{}", 0, statement(point), line_ending(line.text()));
            self.instructions
                .entries_mut()
                .insert(i + 1, Instruction::new(text));
            inserted += 1;
            i += 2;
        }
        if inserted > 0 {
            self.renumber_lines();
        }
        inserted
    }

    /// Add a `CALL` line after every move: `point_program` after taught
    /// points, `midpoint_program` after synthetic midpoints.
    pub fn add_measure_calls(&mut self, point_program: &str, midpoint_program: &str) -> usize {
        let inserted = self.insert_after_moves(|n| {
            format!("CALL {}", pick(n, point_program, midpoint_program))
        });
        debug!("{} measure calls added", inserted);
        inserted
    }

    /// Call the measuring program from the motion itself, 50 ms before the
    /// point is reached (`TA 0.05sec, CALL ...`).
    pub fn add_measure_motion_options(&mut self, point_program: &str, midpoint_program: &str) -> usize {
        let mut changed = 0;
        for line in self.instructions.entries_mut() {
            let Some(n) = line.point().filter(|n| *n > 0) else {
                continue;
            };
            let option = format!("TA   0.05sec, CALL {}", pick(n, point_program, midpoint_program));
            if append_option(line, &option) {
                changed += 1;
            }
        }
        debug!("Measure motion option added to {} lines", changed);
        changed
    }

    /// Append `Tool_Offset,PR[register]` to the moves to points in `range`.
    /// Without a range every move is changed, including moves to position
    /// registers.
    pub fn add_tool_offset(&mut self, register: u32, range: Option<RangeInclusive<u32>>) -> usize {
        let option = format!("Tool_Offset,PR[{}]", register);
        let mut changed = 0;
        for line in self.instructions.entries_mut() {
            let wanted = match (&range, line.point()) {
                (Some(r), Some(n)) => r.contains(&n),
                (Some(_), None) => false,
                (None, Some(_)) => true,
                (None, None) => is_move(line) && line.text().contains("PR["),
            };
            if wanted && append_option(line, &option) {
                changed += 1;
            }
        }
        changed
    }

    /// Write the number of the point just reached to group output `group`.
    pub fn add_group_output_markers(&mut self, group: u32) -> usize {
        self.insert_after_moves(|n| format!("GO[{}]={}", group, n))
    }
}
