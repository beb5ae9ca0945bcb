mod config;
mod error;

pub mod axis;
pub mod box_plot;
pub mod collaborators;
pub mod diff;
pub mod dynacoat;
pub mod geometry;
pub mod limit_float_precission;
pub mod measurement;
pub mod program;
pub mod regression;

#[cfg(test)]
pub(crate) mod test_data;

use num_traits::Float;

pub use axis::{Axis, AxisSpec, AxisType};
pub use config::Config;
pub use diff::ProgramDiff;
pub use dynacoat::{
    ChangeLog, DynaCoat, DynaCoatParams, DynaReport, DynaResultFlag, DynaResultFlags,
    PointChange, PointSpeedLimits, SpeedLimits,
};
pub use error::{Error, Result};
pub use measurement::{
    MeasurementHistory, PaintIteration, PointKey, RobotMeasurementSeries, RobotPointMeasurement,
};
pub use program::{OutputMode, ProgramDocument};
pub use regression::BestFitLine;

/// Round a computed speed half to even, the way the controller tooling does.
pub(crate) fn round_speed(value: f64) -> i32 {
    value.round_ties_even() as i32
}

pub trait IDataPoint<T> {
    fn x(&self) -> T;
    fn y(&self) -> T;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DataPoint<T: Float + serde::Serialize> {
    x: T,
    y: T,
}

impl<T: Float + serde::Serialize> DataPoint<T> {
    pub fn new(x: T, y: T) -> Self {
        Self { x, y }
    }
}

impl<T: Float + serde::Serialize> IDataPoint<T> for DataPoint<T> {
    fn x(&self) -> T {
        self.x
    }

    fn y(&self) -> T {
        self.y
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn speeds_round_half_to_even() {
        assert_eq!(round_speed(780.5), 780);
        assert_eq!(round_speed(781.5), 782);
        assert_eq!(round_speed(-12.5), -12);
        assert_eq!(round_speed(99.49), 99);
    }
}
