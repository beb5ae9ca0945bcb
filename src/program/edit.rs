use std::ops::RangeInclusive;

use tracing::{debug, trace, warn};

use super::{ArmConfig, MoveType, PointBlock, Pose, ProgramDocument, Termination};
use crate::axis::{Axis, AxisType};
use crate::geometry::{self, Transform};
use crate::{Error, Result};

/// First number given to synthetic midpoints.
pub const FIRST_MIDPOINT_NUMBER: u32 = 5001;

/// Which side of the point transform an edit is applied on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformSide {
    /// `point * T`, relative to the tool.
    Post,
    /// `T * point`, a correction of the frame.
    Pre,
}

fn ordered(a: u32, b: u32) -> RangeInclusive<u32> {
    a.min(b)..=a.max(b)
}

impl ProgramDocument {
    fn numbers_in(&self, range: &RangeInclusive<u32>) -> Vec<u32> {
        self.points
            .entries()
            .iter()
            .map(|p| p.number())
            .filter(|n| range.contains(n))
            .collect()
    }

    fn all_numbers(&self) -> Vec<u32> {
        self.points.entries().iter().map(|p| p.number()).collect()
    }

    /// `None` for points in joint representation.
    pub fn point_transform(&self, number: u32) -> Result<Option<Transform>> {
        let point = self.point(number).ok_or(Error::PointNotFound(number))?;
        if point.is_joint_form() {
            return Ok(None);
        }
        Ok(Some(geometry::pose_to_transform(&point.pose()?)))
    }

    pub fn set_point_transform(&mut self, number: u32, transform: &Transform) -> Result<()> {
        let point = self.point_mut(number).ok_or(Error::PointNotFound(number))?;
        if point.is_joint_form() {
            return Err(Error::JointRepresentation(number));
        }
        point.set_pose(&geometry::transform_to_pose(transform));
        Ok(())
    }

    /// Returns `false` for joint form points, which are left as they are.
    pub fn transform_point(&mut self, number: u32, t: &Transform, side: TransformSide) -> Result<bool> {
        let Some(current) = self.point_transform(number)? else {
            return Ok(false);
        };
        let moved = match side {
            TransformSide::Post => current * t,
            TransformSide::Pre => t * current,
        };
        self.set_point_transform(number, &moved)?;
        Ok(true)
    }

    pub fn transform_points(&mut self, first: u32, last: u32, t: &Transform, side: TransformSide) -> Result<usize> {
        let mut moved = 0;
        for n in self.numbers_in(&ordered(first, last)) {
            if self.transform_point(n, t, side)? {
                moved += 1;
            }
        }
        Ok(moved)
    }

    pub fn transform_all_points(&mut self, t: &Transform, side: TransformSide) -> Result<usize> {
        let mut moved = 0;
        for n in self.all_numbers() {
            if self.transform_point(n, t, side)? {
                moved += 1;
            }
        }
        Ok(moved)
    }

    /// Set the tool frame of every point and every `UTOOL_NUM=` statement.
    pub fn change_tool_frame(&mut self, frame: i32) -> usize {
        for i in self.instructions.entries_mut() {
            i.replace_assignment("UTOOL_NUM", frame);
        }
        self.points
            .entries_mut()
            .iter_mut()
            .map(|p| p.set_tool_frame(frame))
            .filter(|changed| *changed)
            .count()
    }

    /// Set the tool frame of the points in the range and of the last
    /// `UTOOL_NUM=` statement before the first move into the range.
    /// Positions are kept as they are.
    pub fn change_tool_frame_in_range(&mut self, first: u32, last: u32, frame: i32) -> usize {
        let range = ordered(first, last);
        let lines = self.instructions.entries_mut();
        let entry = lines.iter().position(|l| l.point() == Some(*range.start()));
        if let Some(entry) = entry {
            let select = lines[..=entry]
                .iter_mut()
                .rev()
                .find(|l| l.assignment("UTOOL_NUM").is_some());
            match select {
                Some(line) => {
                    line.replace_assignment("UTOOL_NUM", frame);
                }
                None => warn!("No UTOOL_NUM before P[{}]", range.start()),
            }
        }
        self.points
            .entries_mut()
            .iter_mut()
            .filter(|p| range.contains(&p.number()))
            .map(|p| p.set_tool_frame(frame))
            .filter(|changed| *changed)
            .count()
    }

    /// Set the user frame number without touching positions.
    pub fn change_user_frame(&mut self, frame: i32) -> usize {
        for i in self.instructions.entries_mut() {
            i.replace_assignment("UFRAME_NUM", frame);
        }
        self.points
            .entries_mut()
            .iter_mut()
            .map(|p| p.set_user_frame(frame))
            .filter(|changed| *changed)
            .count()
    }

    /// Move every Cartesian point from `old_frame` into `new_frame` so it
    /// stays where it is in space, then switch to user frame `frame`.
    pub fn convert_user_frame(&mut self, frame: i32, old_frame: &Pose, new_frame: &Pose) -> Result<usize> {
        let old_t = geometry::pose_to_transform(old_frame);
        let new_t = geometry::pose_to_transform(new_frame);
        let mut converted = 0;
        for n in self.all_numbers() {
            if let Some(current) = self.point_transform(n)? {
                let m = geometry::convert_frame(&current, &old_t, &new_t)?;
                self.set_point_transform(n, &m)?;
                converted += 1;
            }
        }
        self.change_user_frame(frame);
        debug!("{} points converted into user frame {}", converted, frame);
        Ok(converted)
    }

    /// Rewrite the `CONFIG` string of the points in `range` (all when `None`).
    /// Invalid letters or turn counts leave the program untouched.
    pub fn change_configuration(
        &mut self,
        flip: char,
        up_down: char,
        front_back: char,
        turns: [i32; 3],
        range: Option<RangeInclusive<u32>>,
    ) -> bool {
        let Some(config) = ArmConfig::new(flip, up_down, front_back, turns) else {
            return false;
        };
        for p in self.points.entries_mut() {
            if range.as_ref().map_or(true, |r| r.contains(&p.number())) {
                p.set_config(&config);
            }
        }
        true
    }

    fn change_termination_where(&mut self, termination: Termination, f: impl Fn(u32) -> bool) -> usize {
        let mut skipped = 0;
        let lines = self.instructions.entries_mut();
        for index in 0..lines.len() {
            if !lines[index].point().map_or(false, &f) {
                continue;
            }
            let target = match lines[index].move_type() {
                MoveType::Circular => index + 1,
                _ => index,
            };
            let changed = lines
                .get_mut(target)
                .map_or(false, |l| l.replace_termination(termination));
            if !changed {
                warn!("No termination to change in `{}`", lines[index].text().trim_end());
                skipped += 1;
            }
        }
        skipped
    }

    /// Set the termination of every move to point `number`.
    /// Returns how many referencing lines had no termination field.
    pub fn change_termination(&mut self, number: u32, termination: Termination) -> usize {
        self.change_termination_where(termination, |n| n == number)
    }

    pub fn change_termination_in_range(&mut self, first: u32, last: u32, termination: Termination) -> usize {
        let range = ordered(first, last);
        self.change_termination_where(termination, |n| range.contains(&n))
    }

    /// Renumber the instruction lines 1, 2, 3, ...
    pub fn renumber_lines(&mut self) {
        let mut next = 1;
        for i in self.instructions.entries_mut() {
            if i.replace_line_number(next) {
                next += 1;
            }
        }
    }

    /// Remove the points in the range together with the lines moving to them.
    pub fn delete_points(&mut self, first: u32, last: u32) -> usize {
        let range = ordered(first, last);
        let entries = self.instructions.entries();
        let mut drop = vec![false; entries.len()];
        for (i, line) in entries.iter().enumerate() {
            if !line.point().map_or(false, |n| range.contains(&n)) {
                continue;
            }
            drop[i] = true;
            // a circular move is a head line plus its continuation
            if line.move_type() == MoveType::Circular && i + 1 < entries.len() {
                drop[i + 1] = true;
            }
            if line.line_number().is_none() && i > 0 && entries[i - 1].move_type() == MoveType::Circular {
                drop[i - 1] = true;
            }
        }
        let mut keep = drop.iter().map(|d| !d);
        self.instructions.entries_mut().retain(|_| keep.next().unwrap_or(true));

        let before = self.points.len();
        self.points
            .entries_mut()
            .retain(|p| !range.contains(&p.number()));
        self.renumber_lines();
        before - self.points.len()
    }

    /// Point every reference of a duplicate pose to the first point at that
    /// location. Returns the number of redirected lines.
    pub fn join_points_at_same_location(&mut self, margin: f64) -> Result<usize> {
        let numbers = self.all_numbers();
        let mut transforms = vec![];
        for n in &numbers {
            transforms.push(self.point_transform(*n)?);
        }
        let mut redirected = 0;
        for i in 0..numbers.len() {
            for j in i + 1..numbers.len() {
                let (Some(a), Some(b)) = (&transforms[i], &transforms[j]) else {
                    continue;
                };
                if !geometry::approx_eq(a, b, margin) {
                    continue;
                }
                for line in self.instructions.entries_mut() {
                    if line.point() == Some(numbers[j]) && line.replace_point_number(numbers[i]) {
                        redirected += 1;
                    }
                }
            }
        }
        Ok(redirected)
    }

    /// Next line after `index` that references a point.
    fn next_reference(&self, index: usize) -> Option<(usize, u32)> {
        self.instructions.entries()[index + 1..]
            .iter()
            .enumerate()
            .find_map(|(k, l)| l.point().map(|p| (index + 1 + k, p)))
    }

    /// Pair of straight moves that can take a point between them.
    fn splittable(&self, a: usize, b: usize) -> bool {
        let lines = self.instructions.entries();
        lines[b].line_number().is_some()
            && lines[a].move_type() != MoveType::Circular
            && lines[b].move_type() != MoveType::Circular
    }

    /// Build the block of a point halfway between `first` and `second`.
    fn midpoint_block(&self, first: u32, second: u32, number: u32) -> Result<Option<PointBlock>> {
        let (Some(a), Some(b)) = (self.point_transform(first)?, self.point_transform(second)?) else {
            return Ok(None);
        };
        let (Some(pa), Some(pb)) = (self.point(first), self.point(second)) else {
            return Ok(None);
        };
        let mut block = pb.clone();
        block.set_number(number);
        block.set_pose(&geometry::transform_to_pose(&geometry::midpoint(&a, &b)));
        for axis in Axis::EXTENDED.iter().take(self.axes.extended_count()) {
            if let (Some(va), Some(vb)) = (pa.axis_value(*axis), pb.axis_value(*axis)) {
                block.set_axis_value(*axis, (va + vb) / 2.0);
            }
        }
        Ok(Some(block))
    }

    /// Insert a synthetic midpoint between every pair of consecutive moves.
    /// Midpoints are numbered from 5001 and named `A_B` after their neighbours.
    pub fn insert_midpoints(&mut self) -> Result<Vec<u32>> {
        let mut number = FIRST_MIDPOINT_NUMBER;
        let mut created = vec![];
        let mut i = 0;
        while i < self.instructions.len() {
            let Some(first) = self.instructions.entries()[i].point() else {
                i += 1;
                continue;
            };
            let Some((j, second)) = self.next_reference(i) else {
                break;
            };
            if !self.splittable(i, j) {
                i += 1;
                continue;
            }
            while self.contains_point(number) {
                number += 1;
            }
            let Some(mut block) = self.midpoint_block(first, second, number)? else {
                i += 1;
                continue;
            };
            let name = format!("{}_{}", first, second);
            block.set_number_and_comment(number, &name);
            self.insert_point(block)?;

            let mut line = self.instructions.entries()[j].clone();
            line.replace_reference(&format!("{}: {}", number, name));
            self.instructions.entries_mut().insert(i + 1, line);
            trace!("Midpoint P[{}] between P[{}] and P[{}]", number, first, second);

            created.push(number);
            number += 1;
            i += 2;
        }
        self.renumber_lines();
        Ok(created)
    }

    /// Split every straight segment longer than `max_distance` by inserting
    /// points until no segment exceeds it.
    pub fn densify(&mut self, max_distance: f64) -> Result<usize> {
        self.densify_where(max_distance, |_, _| true)
    }

    /// [`densify`](Self::densify) limited to segments between points of the
    /// range. Points added on the way count as inside it.
    pub fn densify_range(&mut self, max_distance: f64, first: u32, last: u32) -> Result<usize> {
        let range = ordered(first, last);
        let added_from = self.max_point_number().unwrap_or_default() + 1;
        let inside = |n: u32| range.contains(&n) || n >= added_from;
        self.densify_where(max_distance, |a, b| inside(a) && inside(b))
    }

    fn densify_where(&mut self, max_distance: f64, eligible: impl Fn(u32, u32) -> bool) -> Result<usize> {
        if max_distance <= 0.0 {
            return Ok(0);
        }
        let mut inserted = 0;
        let mut i = 0;
        while i < self.instructions.len() {
            let Some(first) = self.instructions.entries()[i].point() else {
                i += 1;
                continue;
            };
            let Some((j, second)) = self.next_reference(i) else {
                break;
            };
            if !eligible(first, second) {
                i += 1;
                continue;
            }
            let far = match (self.point(first), self.point(second)) {
                (Some(a), Some(b)) => match (a.pose(), b.pose()) {
                    (Ok(pa), Ok(pb)) => pa.distance(&pb) > max_distance,
                    _ => false,
                },
                _ => false,
            };
            if !far || !self.splittable(i, j) {
                i += 1;
                continue;
            }
            let number = self.max_point_number().unwrap_or_default() + 1;
            let Some(block) = self.midpoint_block(first, second, number)? else {
                i += 1;
                continue;
            };
            self.insert_point(block)?;
            let mut line = self.instructions.entries()[j].clone();
            line.replace_point_number(number);
            self.instructions.entries_mut().insert(i + 1, line);
            inserted += 1;
            // the first half is checked again on the next round
        }
        if inserted > 0 {
            self.renumber_lines();
        }
        Ok(inserted)
    }

    pub fn set_axis_value(&mut self, number: u32, axis: Axis, value: f64) -> Result<()> {
        let point = self.point_mut(number).ok_or(Error::PointNotFound(number))?;
        if point.set_axis_value(axis, value) {
            Ok(())
        } else {
            Err(Error::MissingField {
                point: number,
                field: axis.to_string(),
            })
        }
    }

    /// Add `amount` to `axis` of every point in the range that has it.
    pub fn add_to_axis(&mut self, axis: Axis, amount: f64, first: u32, last: u32) -> usize {
        let range = ordered(first, last);
        self.points
            .entries_mut()
            .iter_mut()
            .filter(|p| range.contains(&p.number()))
            .map(|p| match p.axis_value(axis) {
                Some(v) => p.set_axis_value(axis, v + amount),
                None => false,
            })
            .filter(|changed| *changed)
            .count()
    }

    /// [`add_to_axis`](Self::add_to_axis) over the range, then ramp the
    /// points numbered next to it down in 100 unit steps: the `d`-th
    /// neighbour on each side gets `amount` reduced by `100 * d`. The ramp
    /// is `|amount| / 100 - 1` points long.
    pub fn add_to_axis_with_transitions(&mut self, axis: Axis, amount: f64, first: u32, last: u32) -> usize {
        const STEP: f64 = 100.0;
        let range = ordered(first, last);
        let ramp = ((amount.abs() / STEP) as u32).saturating_sub(1);
        let mut changed = self.add_to_axis(axis, amount, *range.start(), *range.end());
        for d in 1..=ramp {
            let share = amount - amount.signum() * STEP * d as f64;
            let before = range.start().checked_sub(d).filter(|n| *n > 0);
            let after = range.end().checked_add(d);
            for n in before.into_iter().chain(after) {
                changed += self.add_to_axis(axis, share, n, n);
            }
        }
        changed
    }

    /// Append a new extended axis set to 0 on every point.
    pub fn add_extended_axis(&mut self, kind: AxisType) -> Option<Axis> {
        let axis = *Axis::EXTENDED.get(self.axes.extended_count())?;
        for p in self.points.entries_mut() {
            if p.add_extended_axis(kind) != Some(axis) {
                warn!("P[{}] does not follow the program axis layout", p.number());
            }
        }
        self.axes.push_extended(kind);
        debug!("Extended axis {} added", axis);
        Some(axis)
    }

    /// Remove extended axis `axis` from every point; later extended axes
    /// are renamed down. Returns the number of points changed.
    pub fn remove_extended_axis(&mut self, axis: Axis) -> usize {
        let Some(index) = axis
            .extended_index()
            .filter(|i| *i < self.axes.extended_count())
        else {
            return 0;
        };
        let changed = self
            .points
            .entries_mut()
            .iter_mut()
            .map(|p| p.remove_extended_axis(axis))
            .filter(|changed| *changed)
            .count();
        self.axes.remove_extended(index);
        changed
    }

    /// Set extended axis `target` to `offset` plus the listed Cartesian
    /// components of each point (Y counts negative). The result may go
    /// below zero.
    pub fn set_extended_axis_offset(
        &mut self,
        target: Axis,
        offset: f64,
        sources: &[Axis],
        range: Option<RangeInclusive<u32>>,
    ) -> usize {
        let mut changed = 0;
        for p in self.points.entries_mut() {
            if !range.as_ref().map_or(true, |r| r.contains(&p.number())) {
                continue;
            }
            let sum = sources.iter().try_fold(0.0, |acc, axis| {
                p.axis_value(*axis).map(|v| match axis {
                    Axis::Y => acc - v,
                    _ => acc + v,
                })
            });
            if let Some(sum) = sum {
                if p.set_axis_value(target, offset + sum) {
                    changed += 1;
                }
            }
        }
        changed
    }

    /// Take the extended axis values of equally numbered points from `other`.
    pub fn copy_extended_axes_from(&mut self, other: &ProgramDocument) -> usize {
        let mut changed = 0;
        for p in self.points.entries_mut() {
            let Some(source) = other.point(p.number()) else {
                continue;
            };
            let mut touched = false;
            for axis in Axis::EXTENDED {
                if let Some(v) = source.axis_value(axis) {
                    touched |= p.set_axis_value(axis, v);
                }
            }
            if touched {
                changed += 1;
            }
        }
        changed
    }
}
