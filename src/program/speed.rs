use std::ops::RangeInclusive;

use itertools::Itertools;
use tracing::warn;

use super::{MoveType, ProgramDocument};
use crate::{round_speed, Error, Result};

const JOINT_SPEED_LIMIT: RangeInclusive<i32> = 0..=100;

fn ordered(a: u32, b: u32) -> RangeInclusive<u32> {
    a.min(b)..=a.max(b)
}

impl ProgramDocument {
    fn referencing_lines(&self, number: u32) -> Vec<usize> {
        self.instructions
            .entries()
            .iter()
            .positions(|i| i.point() == Some(number))
            .collect()
    }

    /// Circular moves keep their speed on the continuation line.
    fn speed_line(&self, index: usize) -> usize {
        match self.instructions.entries()[index].move_type() {
            MoveType::Circular => index + 1,
            _ => index,
        }
    }

    fn speed_at(&self, line: usize, number: u32) -> Result<i32> {
        let text = self
            .instructions
            .entries()
            .get(line)
            .and_then(|i| i.speed_text())
            .ok_or_else(|| Error::MissingField {
                point: number,
                field: "speed".to_owned(),
            })?;
        text.parse().map_err(|_| Error::Number(text.to_owned()))
    }

    /// Speed of the first instruction that moves to point `number`.
    pub fn speed(&self, number: u32) -> Result<i32> {
        let first = self
            .instructions
            .entries()
            .iter()
            .position(|i| i.point() == Some(number))
            .ok_or(Error::NotReferenced(number))?;
        self.speed_at(self.speed_line(first), number)
    }

    /// Write `speed` into every instruction moving to point `number`.
    /// Joint speeds are clamped to 0..=100 %. Returns the number of lines changed.
    pub fn set_speed(&mut self, number: u32, speed: i32) -> Result<usize> {
        let lines = self.referencing_lines(number);
        if lines.is_empty() {
            return Err(Error::NotReferenced(number));
        }
        let mut changed = 0;
        for index in lines {
            let value = match self.instructions.entries()[index].move_type() {
                MoveType::Joint => {
                    speed.clamp(*JOINT_SPEED_LIMIT.start(), *JOINT_SPEED_LIMIT.end())
                }
                _ => speed,
            };
            let target = self.speed_line(index);
            if let Some(line) = self.instructions.entries_mut().get_mut(target) {
                if line.replace_speed(value) {
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }

    /// Scale the speed of point `number` by `percent`, truncating the result.
    /// Circular moves are left alone.
    pub fn adjust_speed_by_percent(&mut self, number: u32, percent: f64) -> Result<usize> {
        let lines = self.referencing_lines(number);
        if lines.is_empty() {
            return Err(Error::NotReferenced(number));
        }
        let mut changed = 0;
        for index in lines {
            let move_type = self.instructions.entries()[index].move_type();
            if move_type == MoveType::Circular {
                continue;
            }
            let current = match self.speed_at(index, number) {
                Ok(s) => s,
                Err(e) => {
                    warn!("P[{}]: {}", number, e);
                    continue;
                }
            };
            let mut value = (current as f64 * (1.0 + percent / 100.0)) as i32;
            if move_type == MoveType::Joint {
                value = value.clamp(*JOINT_SPEED_LIMIT.start(), *JOINT_SPEED_LIMIT.end());
            }
            if self.instructions.entries_mut()[index].replace_speed(value) {
                changed += 1;
            }
        }
        Ok(changed)
    }

    fn visited_points(&self) -> Vec<u32> {
        self.travel_order().into_iter().unique().collect()
    }

    pub fn set_speeds_in_range(&mut self, first: u32, last: u32, speed: i32) -> usize {
        let range = ordered(first, last);
        self.visited_points()
            .into_iter()
            .filter(|n| range.contains(n))
            .filter(|n| self.set_speed(*n, speed).is_ok())
            .count()
    }

    pub fn adjust_speeds_in_range(&mut self, first: u32, last: u32, percent: f64) -> usize {
        let range = ordered(first, last);
        self.visited_points()
            .into_iter()
            .filter(|n| range.contains(n))
            .filter(|n| self.adjust_speed_by_percent(*n, percent).is_ok())
            .count()
    }

    pub fn set_all_speeds(&mut self, speed: i32) -> usize {
        self.visited_points()
            .into_iter()
            .filter(|n| self.set_speed(*n, speed).is_ok())
            .count()
    }

    pub fn adjust_all_speeds(&mut self, percent: f64) -> usize {
        self.visited_points()
            .into_iter()
            .filter(|n| self.adjust_speed_by_percent(*n, percent).is_ok())
            .count()
    }

    /// Take the speed of every point from `other` where it has one.
    pub fn copy_speeds_from(&mut self, other: &ProgramDocument) -> usize {
        self.visited_points()
            .into_iter()
            .filter_map(|n| other.speed(n).ok().map(|s| (n, s)))
            .filter(|(n, s)| self.set_speed(*n, *s).is_ok())
            .count()
    }

    /// Apply a `point,speed` table. Empty and `#VALUE!` cells are skipped.
    pub fn apply_speed_table(&mut self, table: &str) -> Result<usize> {
        let mut applied = 0;
        for row in table.lines().filter(|l| !l.trim().is_empty()) {
            let mut cells = row.split(',').map(str::trim);
            let point = cells.next().unwrap_or_default();
            let speed = cells.next().unwrap_or_default();
            if speed.is_empty() || speed == "#VALUE!" {
                continue;
            }
            let point = point
                .parse::<u32>()
                .map_err(|_| Error::Number(point.to_owned()))?;
            let speed = speed
                .parse::<f64>()
                .map_err(|_| Error::Number(speed.to_owned()))?;
            match self.set_speed(point, round_speed(speed)) {
                Ok(_) => applied += 1,
                Err(e) => warn!("Speed table row `{}` skipped: {}", row, e),
            }
        }
        Ok(applied)
    }

    /// Copy of this program with linear speeds rescaled from
    /// `original_base` to `new_base`.
    pub fn with_base_speed(&self, original_base: i32, new_base: i32) -> Self {
        let mut res = self.clone();
        if original_base == 0 {
            return res;
        }
        for instruction in self.instructions.entries() {
            if instruction.move_type() != MoveType::Linear || instruction.line_number().is_none() {
                continue;
            }
            let (Some(point), Some(Ok(speed))) = (
                instruction.point(),
                instruction.speed_text().map(str::parse::<f64>),
            ) else {
                continue;
            };
            let ratio = speed / original_base as f64;
            res.set_speed(point, round_speed(ratio * new_base as f64)).ok();
        }
        res
    }

    /// Coat weighted average of the speeds of several versions of a program.
    pub fn average_program(coats: &[u32], programs: &[&ProgramDocument]) -> Option<Self> {
        if coats.len() != programs.len() || programs.is_empty() {
            return None;
        }
        let total = coats.iter().sum::<u32>() as f64;
        if total == 0.0 {
            return None;
        }
        let mut res = programs[0].clone();
        for number in res.visited_points() {
            let speeds = programs
                .iter()
                .map(|p| p.speed(number))
                .collect::<Result<Vec<_>>>();
            let Ok(speeds) = speeds else {
                continue;
            };
            let average = speeds
                .iter()
                .zip(coats)
                .map(|(s, c)| *s as f64 / total * *c as f64)
                .sum::<f64>();
            res.set_speed(number, round_speed(average)).ok();
        }
        Some(res)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_data::SAMPLE_PROGRAM;

    fn sample() -> ProgramDocument {
        ProgramDocument::parse(SAMPLE_PROGRAM).unwrap()
    }

    #[test]
    fn read_speeds() {
        let doc = sample();
        assert_eq!(doc.speed(1).unwrap(), 100);
        assert_eq!(doc.speed(2).unwrap(), 500);
        // circular move reads the continuation line
        assert_eq!(doc.speed(4).unwrap(), 300);
        assert_eq!(doc.speed(5).unwrap(), 300);
        assert!(matches!(doc.speed(9), Err(Error::NotReferenced(9))));
    }

    #[test]
    fn write_then_read() {
        let mut doc = sample();
        for (point, speed) in [(2, 1234), (3, 5), (6, 0)] {
            doc.set_speed(point, speed).unwrap();
            assert_eq!(doc.speed(point).unwrap(), speed);
        }
        doc.set_speed(1, 250).unwrap();
        assert_eq!(doc.speed(1).unwrap(), 100);
        doc.set_speed(1, -5).unwrap();
        assert_eq!(doc.speed(1).unwrap(), 0);
    }

    #[test]
    fn circular_write_keeps_head_line() {
        let mut doc = sample();
        doc.set_speed(4, 450).unwrap();
        let text = doc.to_string();
        assert!(text.contains("   7:C P[4]    \r\n    :  P[5] 450mm/sec CNT50    ;\r\n"));
    }

    #[test]
    fn percent() {
        let mut doc = sample();
        doc.adjust_speed_by_percent(3, 10.0).unwrap();
        assert_eq!(doc.speed(3).unwrap(), 880);
        doc.adjust_speed_by_percent(2, -33.3).unwrap();
        assert_eq!(doc.speed(2).unwrap(), 333);
        doc.adjust_speed_by_percent(1, 50.0).unwrap();
        assert_eq!(doc.speed(1).unwrap(), 100);
        // circular head untouched
        assert_eq!(doc.adjust_speed_by_percent(4, 50.0).unwrap(), 0);
        assert_eq!(doc.speed(4).unwrap(), 300);
    }

    #[test]
    fn ranges() {
        let mut doc = sample();
        assert_eq!(doc.set_speeds_in_range(7, 6, 900), 2);
        assert_eq!(doc.speed(6).unwrap(), 900);
        assert_eq!(doc.speed(7).unwrap(), 900);
        assert_eq!(doc.speed(3).unwrap(), 800);
        assert_eq!(doc.set_all_speeds(700), 7);
        assert_eq!(doc.speed(1).unwrap(), 100);
        assert_eq!(doc.speed(3).unwrap(), 700);
    }

    #[test]
    fn speed_table() {
        let mut doc = sample();
        let applied = doc
            .apply_speed_table("2,612.4\n3,\n6,#VALUE!\n7,701.5\n")
            .unwrap();
        assert_eq!(applied, 2);
        assert_eq!(doc.speed(2).unwrap(), 612);
        assert_eq!(doc.speed(3).unwrap(), 800);
        assert_eq!(doc.speed(7).unwrap(), 702);
        assert!(doc.apply_speed_table("x,100").is_err());
    }

    #[test]
    fn copies_and_averages() {
        let base = sample();
        let scaled = base.with_base_speed(500, 1000);
        assert_eq!(scaled.speed(2).unwrap(), 1000);
        assert_eq!(scaled.speed(3).unwrap(), 1600);
        assert_eq!(scaled.speed(1).unwrap(), 100);

        let avg = ProgramDocument::average_program(&[1, 3], &[&base, &scaled]).unwrap();
        assert_eq!(avg.speed(2).unwrap(), 875);
        assert!(ProgramDocument::average_program(&[1], &[&base, &scaled]).is_none());

        let mut copy = sample();
        copy.copy_speeds_from(&scaled);
        assert_eq!(copy.speed(6).unwrap(), scaled.speed(6).unwrap());
    }
}
