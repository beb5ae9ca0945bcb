use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dynacoat::{DynaCoatParams, PointSpeedLimits};
use crate::program::OutputMode;
use crate::{Error, Result};

#[derive(Debug, Deserialize, Clone, Serialize, PartialEq)]
pub struct Config {
    #[serde(rename = "CoatsToApply")]
    pub coats_to_apply: u32,

    #[serde(rename = "TargetThickness")]
    pub target_thickness: f32,

    #[serde(rename = "MinDepositionRate")]
    pub min_deposition_rate: f32,

    #[serde(rename = "MaxDepositionRate")]
    pub max_deposition_rate: f32,

    #[serde(rename = "SpeedChangeWarningPercent")]
    pub speed_change_warning_percent: f32,

    #[serde(rename = "ChangeLogFile", default)]
    pub change_log_file: Option<PathBuf>,

    #[serde(rename = "PaintProcess", default = "default_paint_process")]
    pub paint_process: bool,

    /// Used for points the limits file does not mention.
    #[serde(rename = "DefaultLimits", default)]
    pub default_limits: Option<PointSpeedLimits>,
}

fn default_paint_process() -> bool {
    true
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn default_path() -> Option<PathBuf> {
        directories::BaseDirs::new().map(|base_dirs| {
            base_dirs
                .config_dir()
                .join(Path::new("dynacoat"))
                .join(Path::new("config.json"))
        })
    }

    pub fn load() -> Result<(Self, PathBuf)> {
        let path = Self::default_path().ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Failed to get config directory",
            ))
        })?;
        let config = Self::load_from(&path)?;
        Ok((config, path))
    }

    pub fn params(&self) -> DynaCoatParams {
        DynaCoatParams {
            coats_to_apply: self.coats_to_apply,
            target_thickness: self.target_thickness,
            min_deposition_rate: self.min_deposition_rate,
            max_deposition_rate: self.max_deposition_rate,
            speed_change_warning_percent: self.speed_change_warning_percent,
        }
    }

    pub fn output_mode(&self) -> OutputMode {
        if self.paint_process {
            OutputMode::PaintProcess
        } else {
            OutputMode::NonPaint
        }
    }
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "CoatsToApply: {}", self.coats_to_apply)?;
        writeln!(f, "TargetThickness: {}", self.target_thickness)?;
        writeln!(f, "MinDepositionRate: {}", self.min_deposition_rate)?;
        writeln!(f, "MaxDepositionRate: {}", self.max_deposition_rate)?;
        writeln!(f, "SpeedChangeWarningPercent: {}", self.speed_change_warning_percent)?;
        writeln!(f, "ChangeLogFile: {:?}", self.change_log_file)?;
        writeln!(f, "PaintProcess: {}", self.paint_process)?;

        match &self.default_limits {
            Some(limits) => {
                writeln!(f, "DefaultLimits:")?;
                writeln!(f, "  CanAdjust: {}", limits.can_adjust)?;
                writeln!(f, "  MinSpeed: {}", limits.min_speed)?;
                writeln!(f, "  MaxSpeed: {}", limits.max_speed)?;
            }
            None => writeln!(f, "DefaultLimits: none")?,
        }
        Ok(())
    }
}
