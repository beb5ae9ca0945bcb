//! Straight line fit of deposition rate against speed.
//!
//! Paint thins out as the gun moves faster, so a usable line must fall with
//! speed, explain the samples reasonably well and stay above zero at rest.
//! Anything else is rejected and the caller falls back to proportional
//! adjustment.

use nalgebra::DVector;

use crate::{DataPoint, IDataPoint};

/// Smallest speed range the samples must cover.
pub const MIN_SPEED_SPREAD: f64 = 10.0;
/// Slopes above this are not physically meaningful.
pub const MAX_SLOPE: f64 = -0.000005;
pub const MIN_CORRELATION: f64 = 0.5;
pub const MIN_INTERCEPT: f64 = 0.001;

/// `rate = slope * speed + intercept`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestFitLine {
    slope: f64,
    intercept: f64,
    correlation: f64,
    samples: usize,
}

impl BestFitLine {
    /// Least squares fit without any sanity checks.
    /// `None` when there are fewer than two samples or all speeds are equal.
    pub fn fit(samples: &[DataPoint<f64>]) -> Option<Self> {
        if samples.len() < 2 {
            return None;
        }
        let x = DVector::from_iterator(samples.len(), samples.iter().map(|p| p.x()));
        let y = DVector::from_iterator(samples.len(), samples.iter().map(|p| p.y()));

        let dx = x.add_scalar(-x.mean());
        let dy = y.add_scalar(-y.mean());
        let sxx = dx.dot(&dx);
        let syy = dy.dot(&dy);
        let sxy = dx.dot(&dy);
        if sxx == 0.0 {
            return None;
        }

        let slope = sxy / sxx;
        Some(Self {
            slope,
            intercept: y.mean() - slope * x.mean(),
            correlation: sxy / (sxx * syy).sqrt(),
            samples: samples.len(),
        })
    }

    /// Fit and keep the line only if it passes all acceptance checks.
    pub fn fit_checked(samples: &[DataPoint<f64>]) -> Option<Self> {
        let (min, max) = samples.iter().fold((f64::MAX, f64::MIN), |(min, max), p| {
            (min.min(p.x()), max.max(p.x()))
        });
        if samples.len() < 2 || max - min < MIN_SPEED_SPREAD {
            return None;
        }
        Self::fit(samples).filter(|line| line.is_plausible())
    }

    pub fn is_plausible(&self) -> bool {
        // NaN correlation (all rates equal) fails the comparison
        self.slope <= MAX_SLOPE
            && self.correlation.abs() >= MIN_CORRELATION
            && self.intercept >= MIN_INTERCEPT
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Pearson correlation coefficient of the samples.
    pub fn correlation(&self) -> f64 {
        self.correlation
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn speed_for_rate(&self, rate: f64) -> f64 {
        (rate - self.intercept) / self.slope
    }

    pub fn rate_for_speed(&self, speed: f64) -> f64 {
        self.slope * speed + self.intercept
    }
}
