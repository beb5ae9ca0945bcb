//! Point number lookup and renumbering.
//!
//! Point `n` is usually stored near position `n - 1` of the position
//! section, so lookups start there and fan out alternately below and above.
//! The search covers the whole section, so a miss really means "absent".

use std::collections::HashSet;

use tracing::trace;

use super::{PointBlock, ProgramDocument};
use crate::{Error, Result};

/// Temporary number used while swapping two point numbers.
const SWAP_NUMBER: u32 = u32::MAX;

/// Position of point `number` in `points`.
pub fn find(points: &[PointBlock], number: u32) -> Option<usize> {
    if points.is_empty() {
        return None;
    }
    let guess = (number.saturating_sub(1) as usize).min(points.len() - 1);
    if points[guess].number() == number {
        return Some(guess);
    }
    for offset in 1..points.len() {
        let below = guess.checked_sub(offset);
        let above = Some(guess + offset).filter(|i| *i < points.len());
        if below.is_none() && above.is_none() {
            break;
        }
        for i in [below, above].into_iter().flatten() {
            if points[i].number() == number {
                return Some(i);
            }
        }
    }
    None
}

/// Index that keeps the section ascending when `number` is inserted.
pub fn insertion_index(points: &[PointBlock], number: u32) -> usize {
    points
        .iter()
        .position(|p| p.number() > number)
        .unwrap_or(points.len())
}

impl ProgramDocument {
    pub fn find_point(&self, number: u32) -> Option<usize> {
        find(self.points.entries(), number)
    }

    pub fn point(&self, number: u32) -> Option<&PointBlock> {
        self.find_point(number).map(|i| &self.points.entries()[i])
    }

    pub(crate) fn point_mut(&mut self, number: u32) -> Option<&mut PointBlock> {
        let index = self.find_point(number)?;
        Some(&mut self.points.entries_mut()[index])
    }

    pub fn contains_point(&self, number: u32) -> bool {
        self.find_point(number).is_some()
    }

    pub fn max_point_number(&self) -> Option<u32> {
        self.points.entries().iter().map(|p| p.number()).max()
    }

    fn is_referenced(&self, number: u32) -> bool {
        self.instructions
            .entries()
            .iter()
            .any(|i| i.point() == Some(number))
    }

    /// Insert a block keeping ascending order.
    pub(crate) fn insert_point(&mut self, block: PointBlock) -> Result<()> {
        if self.contains_point(block.number()) {
            return Err(Error::DuplicatePoint(block.number()));
        }
        let index = insertion_index(self.points.entries(), block.number());
        self.points.entries_mut().insert(index, block);
        Ok(())
    }

    /// Give point `from` the free number `to` in both sections.
    fn move_point(&mut self, from: u32, to: u32) {
        for instruction in self.instructions.entries_mut() {
            if instruction.point() == Some(from) {
                instruction.replace_point_number(to);
            }
        }
        if let Some(index) = self.find_point(from) {
            let mut block = self.points.entries_mut().remove(index);
            block.set_number(to);
            let index = insertion_index(self.points.entries(), to);
            self.points.entries_mut().insert(index, block);
        }
    }

    /// Renumber point `old` to `new`. When `new` is taken the two points
    /// swap numbers through a temporary number.
    pub fn change_point_number(&mut self, old: u32, new: u32) -> Result<()> {
        if old == new {
            return Ok(());
        }
        if !self.contains_point(old) && !self.is_referenced(old) {
            return Err(Error::PointNotFound(old));
        }
        if self.contains_point(new) || self.is_referenced(new) {
            trace!("P[{}] <-> P[{}]", old, new);
            self.move_point(old, SWAP_NUMBER);
            self.move_point(new, old);
            self.move_point(SWAP_NUMBER, new);
        } else {
            trace!("P[{}] -> P[{}]", old, new);
            self.move_point(old, new);
        }
        Ok(())
    }

    /// Renumber points so the travel order visits 1, 2, 3, ...
    ///
    /// A point visited more than once keeps the number of its first visit.
    pub fn renumber_points(&mut self) -> Result<()> {
        let mut assigned = HashSet::new();
        let mut next = 1;
        for i in 0..self.instructions.len() {
            let Some(point) = self.instructions.entries()[i].point() else {
                continue;
            };
            if point == 0 || assigned.contains(&point) {
                continue;
            }
            self.change_point_number(point, next)?;
            assigned.insert(next);
            next += 1;
        }
        Ok(())
    }
}
