use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Per point speed window.
#[derive(Debug, Deserialize, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PointSpeedLimits {
    #[serde(rename = "CanAdjust")]
    pub can_adjust: bool,

    #[serde(rename = "MinSpeed")]
    pub min_speed: i32,

    #[serde(rename = "MaxSpeed")]
    pub max_speed: i32,
}

impl PointSpeedLimits {
    pub fn new(min_speed: i32, max_speed: i32) -> Self {
        Self {
            can_adjust: true,
            min_speed,
            max_speed,
        }
    }

    pub fn locked() -> Self {
        Self {
            can_adjust: false,
            min_speed: 0,
            max_speed: 0,
        }
    }

    pub fn clamp(&self, speed: i32) -> i32 {
        speed.max(self.min_speed).min(self.max_speed)
    }

    pub fn contains(&self, speed: i32) -> bool {
        (self.min_speed..=self.max_speed).contains(&speed)
    }
}

/// Speed limits of every point, with an optional fallback for points the
/// table does not list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeedLimits {
    points: HashMap<u32, PointSpeedLimits>,
    fallback: Option<PointSpeedLimits>,
}

impl SpeedLimits {
    pub fn new(points: HashMap<u32, PointSpeedLimits>) -> Result<Self> {
        if let Some((n, _)) = points.iter().find(|(_, l)| l.min_speed > l.max_speed) {
            return Err(Error::InvalidRecord(format!(
                "P[{}] has MinSpeed above MaxSpeed",
                n
            )));
        }
        Ok(Self {
            points,
            fallback: None,
        })
    }

    /// JSON object keyed by point number.
    pub fn from_json(text: &str) -> Result<Self> {
        Self::new(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn with_fallback(mut self, fallback: Option<PointSpeedLimits>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn get(&self, number: u32) -> Option<PointSpeedLimits> {
        self.points.get(&number).copied().or(self.fallback)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl FromIterator<(u32, PointSpeedLimits)> for SpeedLimits {
    fn from_iter<I: IntoIterator<Item = (u32, PointSpeedLimits)>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
            fallback: None,
        }
    }
}
