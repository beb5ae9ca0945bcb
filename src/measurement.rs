//! Measured paint thickness history.
//!
//! A [`PaintIteration`] groups the measurement series of one part/paint run,
//! each series being one coat application together with the program that
//! painted it. Cumulative values stop at the first series that has no
//! measurement for a point.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

use crate::box_plot::BoxPlot;
use crate::program::ProgramDocument;
use crate::regression::BestFitLine;
use crate::{DataPoint, Error, Result};

pub const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A measured location: a program point or the midpoint between two points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "KeyRecord", into = "String")]
pub enum PointKey {
    Point(u32),
    Midpoint(u32, u32),
}

impl PointKey {
    /// Point number the key sorts by.
    pub fn base(&self) -> u32 {
        match self {
            PointKey::Point(n) | PointKey::Midpoint(n, _) => *n,
        }
    }

    pub fn is_midpoint(&self) -> bool {
        matches!(self, PointKey::Midpoint(..))
    }
}

impl Ord for PointKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let rank = |k: &PointKey| match k {
            PointKey::Point(n) => (*n, 0, 0),
            PointKey::Midpoint(a, b) => (*a, 1, *b),
        };
        rank(self).cmp(&rank(other))
    }
}

impl PartialOrd for PointKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointKey::Point(n) => write!(f, "{}", n),
            PointKey::Midpoint(a, b) => write!(f, "{}_{}", a, b),
        }
    }
}

impl FromStr for PointKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || Error::InvalidRecord(format!("bad point key `{}`", s));
        let s = s.trim();
        match s.split_once('_') {
            Some((a, b)) => Ok(PointKey::Midpoint(
                a.parse().map_err(|_| bad())?,
                b.parse().map_err(|_| bad())?,
            )),
            None => s.parse().map(PointKey::Point).map_err(|_| bad()),
        }
    }
}

impl From<PointKey> for String {
    fn from(key: PointKey) -> Self {
        key.to_string()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KeyRecord {
    Number(u32),
    Text(String),
}

impl TryFrom<KeyRecord> for PointKey {
    type Error = Error;

    fn try_from(value: KeyRecord) -> Result<Self> {
        match value {
            KeyRecord::Number(n) => Ok(PointKey::Point(n)),
            KeyRecord::Text(s) => s.parse(),
        }
    }
}

/// Negative thickness is the "not measured" marker of the data source.
fn measured_thickness<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<f32>, D::Error> {
    let value = Option::<f32>::deserialize(d)?;
    Ok(value.filter(|t| *t >= 0.0))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobotPointMeasurement {
    #[serde(rename = "Point")]
    pub key: PointKey,

    /// Paint thickness in mm, `None` when the point was not measured.
    #[serde(rename = "Thickness", default, deserialize_with = "measured_thickness")]
    pub thickness: Option<f32>,

    /// Speed the point was painted with.
    #[serde(rename = "Speed", default)]
    pub speed: i32,
}

impl RobotPointMeasurement {
    pub fn new(key: PointKey, thickness: Option<f32>, speed: i32) -> Self {
        Self {
            key,
            thickness,
            speed,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct SeriesRecord {
    #[serde(rename = "Id")]
    id: u32,
    #[serde(rename = "IterationId", default)]
    iteration_id: u32,
    #[serde(rename = "NumberOfCoats")]
    coats: u32,
    #[serde(rename = "Program")]
    program: String,
    #[serde(rename = "Measurements")]
    measurements: Vec<RobotPointMeasurement>,
}

/// One coat application: what was measured and the program that painted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SeriesRecord", into = "SeriesRecord")]
pub struct RobotMeasurementSeries {
    pub id: u32,
    pub iteration_id: u32,
    pub coats: u32,
    pub measurements: BTreeMap<PointKey, RobotPointMeasurement>,
    pub program: ProgramDocument,
}

impl TryFrom<SeriesRecord> for RobotMeasurementSeries {
    type Error = Error;

    fn try_from(r: SeriesRecord) -> Result<Self> {
        if r.coats == 0 {
            return Err(Error::InvalidRecord(format!("series {} has no coats", r.id)));
        }
        Ok(Self {
            id: r.id,
            iteration_id: r.iteration_id,
            coats: r.coats,
            measurements: r.measurements.into_iter().map(|m| (m.key, m)).collect(),
            program: ProgramDocument::parse(&r.program)?,
        })
    }
}

impl From<RobotMeasurementSeries> for SeriesRecord {
    fn from(s: RobotMeasurementSeries) -> Self {
        Self {
            id: s.id,
            iteration_id: s.iteration_id,
            coats: s.coats,
            program: s.program.to_string(),
            measurements: s.measurements.into_values().collect(),
        }
    }
}

impl RobotMeasurementSeries {
    pub fn measurement(&self, key: &PointKey) -> Option<&RobotPointMeasurement> {
        self.measurements.get(key)
    }

    /// Measured thickness, `None` when absent or not measured.
    pub fn thickness(&self, key: &PointKey) -> Option<f32> {
        self.measurements.get(key).and_then(|m| m.thickness)
    }

    /// Thickness added per coat.
    pub fn deposition_rate(&self, key: &PointKey) -> Option<f32> {
        self.thickness(key).map(|t| t / self.coats as f32)
    }

    /// Mean of the measured thicknesses, 0 when nothing was measured.
    pub fn average_thickness(&self) -> f32 {
        let values = self.all_thicknesses();
        if values.is_empty() {
            0.0
        } else {
            values.values().sum::<f32>() / values.len() as f32
        }
    }

    pub fn all_thicknesses(&self) -> BTreeMap<PointKey, f32> {
        self.measurements
            .iter()
            .filter_map(|(k, m)| m.thickness.map(|t| (*k, t)))
            .collect()
    }
}

mod start_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::START_TIME_FORMAT;

    pub fn serialize<S: Serializer>(t: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&t.format(START_TIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let text = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&text, START_TIME_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// All series painted for one part/paint run, in coat order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaintIteration {
    #[serde(rename = "Id")]
    pub id: u32,

    #[serde(rename = "Part")]
    pub part: String,

    #[serde(rename = "Paint")]
    pub paint: String,

    #[serde(rename = "StartTime", with = "start_time")]
    pub start_time: NaiveDateTime,

    #[serde(rename = "Series")]
    pub series: Vec<RobotMeasurementSeries>,
}

impl PaintIteration {
    /// Sum over every series that measured the point.
    pub fn cumulative_thickness(&self, key: &PointKey) -> f32 {
        self.series.iter().filter_map(|s| s.thickness(key)).sum()
    }

    /// Sum over the first `stop` series, `None` as soon as one of them lacks
    /// a measurement for the point.
    pub fn cumulative_thickness_until(&self, key: &PointKey, stop: usize) -> Option<f32> {
        if stop > self.series.len() {
            return None;
        }
        self.series[..stop]
            .iter()
            .map(|s| s.thickness(key))
            .sum::<Option<f32>>()
    }

    /// Every key measured in any series, sorted.
    pub fn keys(&self) -> Vec<PointKey> {
        self.series
            .iter()
            .flat_map(|s| s.measurements.keys().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Cumulative thickness up to `stop` of every point that has one.
    pub fn all_cumulative_thicknesses(&self, stop: usize) -> BTreeMap<PointKey, f32> {
        self.keys()
            .into_iter()
            .filter_map(|k| self.cumulative_thickness_until(&k, stop).map(|t| (k, t)))
            .collect()
    }

    /// Mean cumulative thickness up to `stop`, 0 when no point qualifies.
    pub fn average_thickness(&self, stop: usize) -> f32 {
        let all = self.all_cumulative_thicknesses(stop);
        if all.is_empty() {
            0.0
        } else {
            all.values().sum::<f32>() / all.len() as f32
        }
    }

    pub fn min_thickness(&self, stop: usize) -> Option<f32> {
        self.all_cumulative_thicknesses(stop)
            .into_values()
            .min_by(|a, b| a.total_cmp(b))
    }

    pub fn max_thickness(&self, stop: usize) -> Option<f32> {
        self.all_cumulative_thicknesses(stop)
            .into_values()
            .max_by(|a, b| a.total_cmp(b))
    }

    /// Quartiles of the cumulative thicknesses up to `stop`.
    pub fn thickness_summary(&self, stop: usize) -> BoxPlot<f32> {
        let values = self
            .all_cumulative_thicknesses(stop)
            .into_values()
            .collect::<Vec<_>>();
        BoxPlot::new(&values)
    }

    /// Speeds recorded by series `index`.
    pub fn speeds(&self, index: usize) -> BTreeMap<PointKey, i32> {
        self.series
            .get(index)
            .map(|s| s.measurements.iter().map(|(k, m)| (*k, m.speed)).collect())
            .unwrap_or_default()
    }

    fn samples<'a>(&self, series: impl Iterator<Item = &'a RobotMeasurementSeries>, key: &PointKey) -> Vec<DataPoint<f64>> {
        series
            .filter_map(|s| {
                let m = s.measurement(key)?;
                let rate = m.thickness? / s.coats as f32;
                Some(DataPoint::new(m.speed as f64, rate as f64))
            })
            .collect()
    }

    /// Speed/deposition rate line over all series, with acceptance checks.
    pub fn best_fit_line(&self, key: &PointKey) -> Option<BestFitLine> {
        BestFitLine::fit_checked(&self.samples(self.series.iter(), key))
    }

    pub fn best_fit_line_unchecked(&self, key: &PointKey) -> Option<BestFitLine> {
        BestFitLine::fit(&self.samples(self.series.iter(), key))
    }

    /// Checked line over series `0..=last`.
    pub fn best_fit_line_until(&self, key: &PointKey, last: usize) -> Option<BestFitLine> {
        BestFitLine::fit_checked(&self.samples(self.series.iter().take(last + 1), key))
    }
}

/// Every iteration known for a part/paint combination, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeasurementHistory {
    iterations: Vec<PaintIteration>,
}

impl MeasurementHistory {
    /// Iterations and their series are ordered by id.
    pub fn new(mut iterations: Vec<PaintIteration>) -> Self {
        iterations.sort_by_key(|i| i.id);
        for i in iterations.iter_mut() {
            i.series.sort_by_key(|s| s.id);
        }
        Self { iterations }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(text)?))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn iterations(&self) -> &[PaintIteration] {
        &self.iterations
    }

    pub fn series_count(&self) -> usize {
        self.iterations.iter().map(|i| i.series.len()).sum()
    }

    pub fn latest_iteration(&self) -> Option<&PaintIteration> {
        self.iterations.iter().rev().find(|i| !i.series.is_empty())
    }

    pub fn latest_series(&self) -> Option<&RobotMeasurementSeries> {
        self.latest_iteration().and_then(|i| i.series.last())
    }

    /// Checked line over the series of every iteration.
    pub fn best_fit_line(&self, key: &PointKey) -> Option<BestFitLine> {
        let samples = self
            .iterations
            .iter()
            .flat_map(|i| i.samples(i.series.iter(), key))
            .collect::<Vec<_>>();
        BestFitLine::fit_checked(&samples)
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::test_data::SAMPLE_PROGRAM;

    pub(crate) fn series(id: u32, coats: u32, data: &[(&str, Option<f32>, i32)]) -> RobotMeasurementSeries {
        RobotMeasurementSeries {
            id,
            iteration_id: 1,
            coats,
            measurements: data
                .iter()
                .map(|(k, t, s)| {
                    let key = k.parse().unwrap();
                    (key, RobotPointMeasurement::new(key, *t, *s))
                })
                .collect(),
            program: ProgramDocument::parse(SAMPLE_PROGRAM).unwrap(),
        }
    }

    pub(crate) fn iteration(id: u32, series: Vec<RobotMeasurementSeries>) -> PaintIteration {
        PaintIteration {
            id,
            part: "DOOR".to_owned(),
            paint: "WHITE".to_owned(),
            start_time: NaiveDateTime::parse_from_str("2015-03-12 10:22:33", START_TIME_FORMAT).unwrap(),
            series,
        }
    }

    fn p(n: u32) -> PointKey {
        PointKey::Point(n)
    }

    #[test]
    fn key_order_and_text() {
        let mut keys = vec!["12", "3_4", "4", "3", "2_3"]
            .into_iter()
            .map(|k| k.parse::<PointKey>().unwrap())
            .collect::<Vec<_>>();
        keys.sort();
        let text = keys.iter().map(|k| k.to_string()).collect::<Vec<_>>();
        assert_eq!(text, vec!["2_3", "3", "3_4", "4", "12"]);
        assert!("3_x".parse::<PointKey>().is_err());
        assert!("".parse::<PointKey>().is_err());
        assert_eq!(PointKey::Midpoint(3, 4).base(), 3);
    }

    #[test]
    fn cumulative_stops_at_gap() {
        let it = iteration(
            1,
            vec![
                series(1, 1, &[("1", Some(0.010), 800), ("2", Some(0.010), 800)]),
                series(2, 1, &[("1", Some(0.012), 800)]),
                series(3, 1, &[("1", Some(0.011), 800), ("2", Some(0.011), 800)]),
            ],
        );
        assert!((it.cumulative_thickness_until(&p(1), 3).unwrap() - 0.033).abs() < 1e-6);
        assert!(it.cumulative_thickness_until(&p(2), 2).is_none());
        assert!(it.cumulative_thickness_until(&p(2), 3).is_none());
        assert!((it.cumulative_thickness_until(&p(2), 1).unwrap() - 0.010).abs() < 1e-6);
        assert!(it.cumulative_thickness_until(&p(1), 4).is_none());
        assert_eq!(it.cumulative_thickness_until(&p(1), 0), Some(0.0));
        // plain sum skips the gap
        assert!((it.cumulative_thickness(&p(2)) - 0.021).abs() < 1e-6);
    }

    #[test]
    fn unmeasured_is_a_gap() {
        let it = iteration(
            1,
            vec![
                series(1, 1, &[("1", Some(0.010), 800), ("2", None, 800)]),
                series(2, 1, &[("1", Some(0.012), 800), ("2", Some(0.012), 800)]),
            ],
        );
        assert!(it.cumulative_thickness_until(&p(2), 2).is_none());
        assert_eq!(it.all_cumulative_thicknesses(2).len(), 1);
        assert!((it.average_thickness(2) - 0.022).abs() < 1e-6);
        assert!((it.series[0].average_thickness() - 0.010).abs() < 1e-6);
    }

    #[test]
    fn statistics() {
        let it = iteration(
            1,
            vec![series(
                1,
                2,
                &[("1", Some(0.010), 800), ("1_2", Some(0.014), 800), ("2", Some(0.012), 700)],
            )],
        );
        assert_eq!(it.min_thickness(1), Some(0.010));
        assert_eq!(it.max_thickness(1), Some(0.014));
        assert_eq!(it.min_thickness(2), None);
        assert_eq!(it.average_thickness(2), 0.0);
        assert_eq!(it.thickness_summary(1).median(), 0.012);
        assert_eq!(it.speeds(0)[&p(2)], 700);
        assert!(it.speeds(5).is_empty());
        assert_eq!(it.series[0].deposition_rate(&p(2)), Some(0.006));
    }

    #[test]
    fn fit_lines() {
        let it = iteration(
            1,
            vec![
                series(1, 1, &[("2", Some(0.010), 600)]),
                series(2, 1, &[("2", Some(0.008), 800)]),
                series(3, 2, &[("2", Some(0.0125), 900)]),
            ],
        );
        let line = it.best_fit_line_until(&p(2), 1).unwrap();
        assert!((line.speed_for_rate(0.006) - 1000.0).abs() < 0.01);
        assert_eq!(it.best_fit_line(&p(2)).unwrap().samples(), 3);
        assert!(it.best_fit_line_until(&p(2), 0).is_none());
        assert!(it.best_fit_line(&p(3)).is_none());
        assert!(it.best_fit_line_unchecked(&p(2)).is_some());
    }

    #[test]
    fn history_from_json() {
        let json = serde_json::json!([
            {
                "Id": 7, "Part": "DOOR", "Paint": "WHITE", "StartTime": "2015-03-12 10:22:33",
                "Series": [
                    { "Id": 12, "IterationId": 7, "NumberOfCoats": 2, "Program": SAMPLE_PROGRAM,
                      "Measurements": [ { "Point": "2", "Thickness": 0.012, "Speed": 500 },
                                        { "Point": 3, "Thickness": -1, "Speed": 800 } ] },
                    { "Id": 11, "IterationId": 7, "NumberOfCoats": 1, "Program": SAMPLE_PROGRAM,
                      "Measurements": [ { "Point": "1_2", "Thickness": null } ] }
                ]
            },
            { "Id": 3, "Part": "DOOR", "Paint": "WHITE", "StartTime": "2015-03-10 09:00:00", "Series": [] }
        ]);
        let history = MeasurementHistory::from_json(&json.to_string()).unwrap();
        assert_eq!(history.series_count(), 2);
        assert_eq!(history.iterations()[0].id, 3);
        let latest = history.latest_series().unwrap();
        assert_eq!(latest.id, 12);
        assert_eq!(latest.thickness(&p(2)), Some(0.012));
        assert_eq!(latest.thickness(&p(3)), None);
        assert_eq!(latest.measurement(&p(3)).unwrap().speed, 800);
        assert_eq!(latest.program.speed(2).unwrap(), 500);

        let back = serde_json::to_string(&history).unwrap();
        assert_eq!(MeasurementHistory::from_json(&back).unwrap(), history);

        let broken = json.to_string().replace("\"NumberOfCoats\":2", "\"NumberOfCoats\":0");
        assert!(MeasurementHistory::from_json(&broken).is_err());
    }
}
