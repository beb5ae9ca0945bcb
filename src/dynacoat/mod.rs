//! DynaCoat: closed loop paint speed control.
//!
//! Given the thickness measured after previous coats, new point speeds are
//! computed so the coats still to be applied bring every point to the target
//! thickness. The run walks the program travel order in four passes:
//!
//! 1. measured points get a new speed, from a fitted speed/rate line when the
//!    history allows one, otherwise 35% of a proportional correction;
//! 2. unmeasured points between two adjusted points are interpolated;
//! 3. the points just outside the adjusted run are pulled 75% towards it;
//! 4. single point spikes are smoothed out.
//!
//! Every speed ends up inside the robot speed window of its point.

mod change_log;
mod flags;
mod limits;

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::measurement::{MeasurementHistory, PointKey, RobotMeasurementSeries};
use crate::program::ProgramDocument;
use crate::{round_speed, Result};

pub use change_log::{ChangeLog, PointChange, CSV_HEADER};
pub use flags::{DynaResultFlag, DynaResultFlags};
pub use limits::{PointSpeedLimits, SpeedLimits};

/// Thinner readings are too close to bare substrate to steer by.
pub const MIN_PAINT_THICKNESS_FOR_CHANGE: f32 = 0.004;
/// Share of a proportional correction applied in one go.
pub const PROPORTIONAL_STEP: f64 = 0.35;
/// How far the points next to the adjusted run move towards it.
pub const BOUNDARY_STEP: f64 = 0.75;

pub const NOTE_RATE_LIMITED: &str = "Deposition rate limited by paint specifications";
pub const NOTE_NORMAL: &str = "; Normal Speed Adjust";
pub const NOTE_FIT_LINE: &str = "; Fit Line Speed Adjust";
pub const NOTE_ROBOT_LIMITED: &str = "; Limited by robot speed";
pub const NOTE_GAP_FILL: &str = "Adjusted by gap fill";
pub const NOTE_GAP_LIMITED: &str = "; Limited by Robot Speed";
pub const NOTE_FIRST_POINT: &str = "First point adjust";
pub const NOTE_LAST_POINT: &str = "Last point adjust";
pub const NOTE_OUTLIER: &str = "Toned down for being an outlier";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DynaCoatParams {
    /// Coats that will be painted with the adjusted program.
    pub coats_to_apply: u32,
    /// Wanted cumulative thickness, mm.
    pub target_thickness: f32,
    pub min_deposition_rate: f32,
    pub max_deposition_rate: f32,
    /// Fraction of the original speed a change may reach before it is reported.
    pub speed_change_warning_percent: f32,
}

/// Outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DynaReport {
    pub flags: DynaResultFlags,
    pub changes: ChangeLog,
    /// Points that received a speed in the measurement pass, ascending.
    pub adjusted: Vec<u32>,
    /// Points inside a gap that could not be adjusted.
    pub skipped: Vec<u32>,
}

/// Where the thickness for a point comes from in the measurement pass.
struct Sample<'a> {
    key: PointKey,
    thickness: f32,
    speed: i32,
    series: &'a RobotMeasurementSeries,
}

pub struct DynaCoat<'a> {
    params: DynaCoatParams,
    limits: &'a SpeedLimits,
    history: &'a MeasurementHistory,
}

impl<'a> DynaCoat<'a> {
    pub fn new(params: DynaCoatParams, limits: &'a SpeedLimits, history: &'a MeasurementHistory) -> Self {
        Self {
            params,
            limits,
            history,
        }
    }

    /// Adjust the speeds of `program` in place.
    pub fn run(&self, program: &mut ProgramDocument) -> Result<DynaReport> {
        let travel = program.travel_order();
        let mut report = DynaReport::default();
        self.warn_missing_limits(&travel);

        let series_count = self.history.series_count();
        info!(
            "DynaCoat over {} points, {} measurement series",
            travel.len(),
            series_count
        );

        let adjusted = self.measured_pass(program, &travel, series_count, &mut report)?;
        report.adjusted = adjusted.iter().copied().collect();

        self.gap_fill_pass(program, &travel, &mut report)?;
        self.boundary_pass(program, &travel, &adjusted, &mut report)?;
        self.outlier_pass(program, &travel, &mut report)?;

        let pct = self.params.speed_change_warning_percent as f64;
        let over = report
            .changes
            .entries()
            .iter()
            .any(|c| c.speed_delta() > round_speed(c.original_speed as f64 * pct));
        report.flags.set(DynaResultFlag::SpeedChangeOverPercentThreshold, over);

        info!("DynaCoat done: {} changes, flags {}", report.changes.len(), report.flags);
        Ok(report)
    }

    fn warn_missing_limits(&self, travel: &[u32]) {
        let mut seen = HashSet::new();
        for n in travel {
            if seen.insert(*n) && self.limits.get(*n).is_none() {
                warn!("No speed limits for P[{}], it will not be adjusted", n);
            }
        }
    }

    fn limits(&self, number: u32) -> PointSpeedLimits {
        self.limits.get(number).unwrap_or_else(PointSpeedLimits::locked)
    }

    /// Series the measurement pass reads from.
    fn latest_series(&self) -> Option<&'a RobotMeasurementSeries> {
        self.history.latest_series()
    }

    /// Preceding midpoint first, then the point itself, if thick enough.
    fn pick_sample(&self, series: &'a RobotMeasurementSeries, previous: u32, number: u32) -> Option<Sample<'a>> {
        [PointKey::Midpoint(previous, number), PointKey::Point(number)]
            .into_iter()
            .find_map(|key| {
                let m = series.measurement(&key)?;
                let thickness = m.thickness.filter(|t| *t > MIN_PAINT_THICKNESS_FOR_CHANGE)?;
                Some(Sample {
                    key,
                    thickness,
                    speed: m.speed,
                    series,
                })
            })
    }

    fn target_rate(&self, current_thickness: f32, change: &mut PointChange) -> f64 {
        let p = &self.params;
        let target = (p.target_thickness - current_thickness) / p.coats_to_apply as f32;
        change.target_deposition_rate = Some(target);
        if target > p.max_deposition_rate || target < p.min_deposition_rate {
            change.note = NOTE_RATE_LIMITED.to_owned();
        }
        target.max(p.min_deposition_rate).min(p.max_deposition_rate) as f64
    }

    /// `round(actual / target * speed)`, of which only a share is applied.
    fn proportional_speed(actual_rate: f64, target_rate: f64, speed: i32) -> Option<i32> {
        let proposed = actual_rate / target_rate * speed as f64;
        if !proposed.is_finite() {
            return None;
        }
        let delta = (round_speed(proposed) - speed) as f64 * PROPORTIONAL_STEP;
        Some(round_speed(delta) + speed)
    }

    fn measured_pass(
        &self,
        program: &mut ProgramDocument,
        travel: &[u32],
        series_count: usize,
        report: &mut DynaReport,
    ) -> Result<BTreeSet<u32>> {
        let mut adjusted = BTreeSet::new();
        let Some(series) = self.latest_series() else {
            debug!("No measurements, skipping the measurement pass");
            return Ok(adjusted);
        };

        for pair in travel.windows(2) {
            let (previous, number) = (pair[0], pair[1]);
            let limits = self.limits(number);
            if !limits.can_adjust {
                continue;
            }
            let Some(sample) = self.pick_sample(series, previous, number) else {
                trace!("P[{}] has no usable measurement", number);
                continue;
            };

            let change = if series_count == 1 {
                self.single_series_change(program, number, &sample)
            } else {
                self.multi_series_change(number, &sample)
            };
            let Some(mut change) = change else {
                warn!("P[{}]: computed speed is not a number, left as is", number);
                continue;
            };

            let rate_limited = change
                .target_deposition_rate
                .map_or(false, |t| t > self.params.max_deposition_rate || t < self.params.min_deposition_rate);
            let speed_limited = !limits.contains(change.attempted_speed);
            if speed_limited {
                change.note.push_str(NOTE_ROBOT_LIMITED);
            }
            if rate_limited || speed_limited {
                report.flags.insert(DynaResultFlag::SpeedsHaveBeenClipped);
            }
            change.final_speed = limits.clamp(change.attempted_speed);
            if series_count == 1 {
                // the rate the clipped speed will actually lay down
                let actual = change.current_deposition_rate.unwrap_or_default() as f64;
                let used = actual / (change.final_speed as f64 / change.original_speed as f64);
                change.deposition_rate_used = Some(used as f32);
            }
            if let Some(used) = change.deposition_rate_used {
                if used > self.params.max_deposition_rate {
                    report.flags.insert(DynaResultFlag::LargeDepositionRatesPresent);
                } else if used < self.params.min_deposition_rate {
                    report.flags.insert(DynaResultFlag::SmallDepositionRatesPresent);
                }
            }

            debug!(
                "P[{}] from {}: {} -> {} ({})",
                number, sample.key, change.original_speed, change.final_speed, change.note
            );
            program.set_speed(number, change.final_speed)?;
            report.changes.record(change);
            adjusted.insert(number);
        }
        Ok(adjusted)
    }

    fn single_series_change(&self, program: &ProgramDocument, number: u32, sample: &Sample) -> Option<PointChange> {
        let original = match program.speed(number) {
            Ok(speed) => speed,
            Err(e) => {
                warn!("P[{}]: {}", number, e);
                return None;
            }
        };
        let actual = sample.thickness / sample.series.coats as f32;

        let mut change = PointChange::new(number, original, original, original, "");
        change.current_thickness = Some(sample.thickness);
        change.current_deposition_rate = Some(actual);
        let target = self.target_rate(sample.thickness, &mut change);
        change.note.push_str(NOTE_NORMAL);

        change.attempted_speed = Self::proportional_speed(actual as f64, target, original)?;
        Some(change)
    }

    fn multi_series_change(&self, number: u32, sample: &Sample) -> Option<PointChange> {
        let current = self
            .history
            .latest_iteration()
            .map(|i| i.cumulative_thickness(&sample.key))
            .unwrap_or(sample.thickness);
        let actual = sample.thickness / sample.series.coats as f32;

        let mut change = PointChange::new(number, sample.speed, sample.speed, sample.speed, "");
        change.current_thickness = Some(current);
        let target = self.target_rate(current, &mut change);

        match self.history.best_fit_line(&sample.key) {
            Some(line) => {
                change.note.push_str(NOTE_FIT_LINE);
                let speed = line.speed_for_rate(target);
                if !speed.is_finite() {
                    return None;
                }
                change.attempted_speed = round_speed(speed);
                change.deposition_rate_used = Some(line.rate_for_speed(change.attempted_speed as f64) as f32);
            }
            None => {
                change.note.push_str(NOTE_NORMAL);
                let speed = Self::proportional_speed(actual as f64, target, sample.speed)?;
                change.attempted_speed = speed;
                change.deposition_rate_used =
                    Some((actual as f64 / (speed as f64 / sample.speed as f64)) as f32);
            }
        }
        Some(change)
    }

    fn current_speed(program: &ProgramDocument, number: u32) -> Option<i32> {
        program
            .speed(number)
            .map_err(|e| warn!("P[{}]: {}", number, e))
            .ok()
    }

    /// Give `number` an interpolated speed, clamped to its window.
    fn fill(&self, program: &mut ProgramDocument, number: u32, speed: i32, report: &mut DynaReport) -> Result<()> {
        let limits = self.limits(number);
        if !limits.can_adjust {
            report.skipped.push(number);
            return Ok(());
        }
        let Some(original) = Self::current_speed(program, number) else {
            report.skipped.push(number);
            return Ok(());
        };
        let clamped = limits.clamp(speed);
        let mut change = PointChange::new(number, original, speed, clamped, NOTE_GAP_FILL);
        if clamped != speed {
            change.note.push_str(NOTE_GAP_LIMITED);
            report.flags.insert(DynaResultFlag::SpeedsHaveBeenClipped);
        }
        trace!("Gap fill P[{}]: {} -> {}", number, original, clamped);
        program.set_speed(number, clamped)?;
        report.changes.record(change);
        Ok(())
    }

    fn gap_fill_pass(&self, program: &mut ProgramDocument, travel: &[u32], report: &mut DynaReport) -> Result<()> {
        let adjusted = report.adjusted.clone();
        for pair in adjusted.windows(2) {
            let (Some(from), Some(to)) = (position(travel, pair[0]), position(travel, pair[1])) else {
                continue;
            };
            if to <= from + 1 {
                continue;
            }
            let (Some(before), Some(after)) = (
                Self::current_speed(program, pair[0]),
                Self::current_speed(program, pair[1]),
            ) else {
                continue;
            };

            let between = to - from - 1;
            debug!("Filling {} points between P[{}] and P[{}]", between, pair[0], pair[1]);
            match between {
                1 => self.fill(program, travel[from + 1], (before + after) / 2, report)?,
                2 => {
                    let delta = (after - before) / 3;
                    self.fill(program, travel[from + 1], before + delta, report)?;
                    self.fill(program, travel[to - 1], before + delta * 2, report)?;
                }
                _ => {
                    let middle = (before + after) / 2;
                    self.fill(program, travel[from + 1], (before + middle) / 2, report)?;
                    self.fill(program, travel[to - 1], (after + middle) / 2, report)?;
                    for n in &travel[from + 2..to - 1] {
                        self.fill(program, *n, middle, report)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Move the point next to the adjusted run 75% towards its neighbour.
    fn pull_towards(
        &self,
        program: &mut ProgramDocument,
        outside: u32,
        inside: u32,
        note: &str,
        report: &mut DynaReport,
    ) -> Result<()> {
        let limits = self.limits(outside);
        if !limits.can_adjust {
            return Ok(());
        }
        let (Some(inside_speed), Some(outside_speed)) = (
            Self::current_speed(program, inside),
            Self::current_speed(program, outside),
        ) else {
            return Ok(());
        };
        let speed = ((inside_speed - outside_speed) as f64 * BOUNDARY_STEP) as i32 + outside_speed;
        let clamped = limits.clamp(speed);
        if clamped != speed {
            report.flags.insert(DynaResultFlag::SpeedsHaveBeenClipped);
        }
        debug!("{} P[{}]: {} -> {}", note, outside, outside_speed, clamped);
        program.set_speed(outside, clamped)?;
        report
            .changes
            .record(PointChange::new(outside, outside_speed, speed, clamped, note));
        Ok(())
    }

    fn boundary_pass(
        &self,
        program: &mut ProgramDocument,
        travel: &[u32],
        adjusted: &BTreeSet<u32>,
        report: &mut DynaReport,
    ) -> Result<()> {
        let first = travel.iter().position(|n| adjusted.contains(n));
        let last = travel.iter().rposition(|n| adjusted.contains(n));
        let (Some(first), Some(last)) = (first, last) else {
            return Ok(());
        };

        if first > 0 && !adjusted.contains(&travel[first - 1]) {
            self.pull_towards(program, travel[first - 1], travel[first], NOTE_FIRST_POINT, report)?;
        }
        if last + 1 < travel.len() && !adjusted.contains(&travel[last + 1]) {
            self.pull_towards(program, travel[last + 1], travel[last], NOTE_LAST_POINT, report)?;
        }
        Ok(())
    }

    fn outlier_pass(&self, program: &mut ProgramDocument, travel: &[u32], report: &mut DynaReport) -> Result<()> {
        for i in 1..travel.len().saturating_sub(1) {
            let speeds = (
                Self::current_speed(program, travel[i - 1]),
                Self::current_speed(program, travel[i]),
                Self::current_speed(program, travel[i + 1]),
            );
            let (Some(first), Some(middle), Some(third)) = speeds else {
                continue;
            };
            let Some(speed) = smoothed_speed(first, middle, third) else {
                continue;
            };

            let number = travel[i];
            let limits = self.limits(number);
            if !limits.can_adjust {
                continue;
            }
            let clamped = limits.clamp(speed);
            if clamped != speed {
                report.flags.insert(DynaResultFlag::SpeedsHaveBeenClipped);
            }
            debug!("Outlier P[{}]: {} -> {}", number, middle, clamped);
            program.set_speed(number, clamped)?;
            report
                .changes
                .record(PointChange::new(number, middle, speed, clamped, NOTE_OUTLIER));
        }
        Ok(())
    }
}

fn position(travel: &[u32], number: u32) -> Option<usize> {
    travel.iter().position(|n| *n == number)
}

/// New speed for `middle` when it leaves the band its neighbours allow by
/// more than half of the nearer bound.
fn smoothed_speed(first: i32, middle: i32, third: i32) -> Option<i32> {
    let (low, high) = (first.min(third), first.max(third));
    if middle > high + high / 2 || middle < low - low / 2 {
        Some(if first == third { first } else { (first + third) / 2 })
    } else {
        None
    }
}
