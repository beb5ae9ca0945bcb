use std::cmp::Ordering;

use num_traits::{Float, FromPrimitive};
use serde::Serialize;

/// Quartile summary of a set of thickness readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoxPlot<T> {
    median: T,
    q1: T,
    q3: T,
    iqr: T,
    lower_bound: T,
    upper_bound: T,
}

/// Median, 25% and 75% quartiles of the non NaN values.
fn median_q1q3<T: Float>(series: &[T]) -> (T, T, T) {
    let mut sorted = series.iter().filter(|v| !v.is_nan()).copied().collect::<Vec<_>>();
    if sorted.is_empty() {
        return (T::nan(), T::nan(), T::nan());
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let len = sorted.len();
    (sorted[len / 2], sorted[len / 4], sorted[len * 3 / 4])
}

impl<T> BoxPlot<T>
where
    T: Float + FromPrimitive,
{
    /// Fences are placed 1.5 IQR outside the quartiles.
    pub fn new(series: &[T]) -> Self {
        let fence = T::from_f64(1.5).unwrap_or_else(T::one);

        let (median, q1, q3) = median_q1q3(series);
        let iqr = q3 - q1;
        Self {
            median,
            q1,
            q3,
            iqr,
            lower_bound: q1 - fence * iqr,
            upper_bound: q3 + fence * iqr,
        }
    }

    pub fn median(&self) -> T {
        self.median
    }

    pub fn q1(&self) -> T {
        self.q1
    }

    pub fn q3(&self) -> T {
        self.q3
    }

    pub fn iqr(&self) -> T {
        self.iqr
    }

    pub fn lower_bound(&self) -> T {
        self.lower_bound
    }

    pub fn upper_bound(&self) -> T {
        self.upper_bound
    }

    /// Outside the fences.
    pub fn is_outlier(&self, value: T) -> bool {
        value < self.lower_bound || value > self.upper_bound
    }
}
