use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::limit_float_precission::serialize_option_float_5dgt;
use crate::measurement::PointKey;
use crate::Result;

pub const CSV_HEADER: &str = "Point Number, Current Thickness, Current Deposition Rate, \
Target Deposition Rate, Deposition Rate Used, Original Speed, Proposed Speed Change, \
Speed Change Made, Notes";

/// What happened to the speed of one point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointChange {
    #[serde(rename = "Point")]
    pub key: PointKey,

    #[serde(rename = "CurrentThickness", serialize_with = "serialize_option_float_5dgt")]
    pub current_thickness: Option<f32>,

    #[serde(rename = "CurrentDepositionRate", serialize_with = "serialize_option_float_5dgt")]
    pub current_deposition_rate: Option<f32>,

    #[serde(rename = "TargetDepositionRate", serialize_with = "serialize_option_float_5dgt")]
    pub target_deposition_rate: Option<f32>,

    #[serde(rename = "DepositionRateUsed", serialize_with = "serialize_option_float_5dgt")]
    pub deposition_rate_used: Option<f32>,

    #[serde(rename = "OriginalSpeed")]
    pub original_speed: i32,

    /// Speed proposed before the robot speed window was applied.
    #[serde(rename = "AttemptedSpeed")]
    pub attempted_speed: i32,

    #[serde(rename = "FinalSpeed")]
    pub final_speed: i32,

    #[serde(rename = "Note")]
    pub note: String,
}

impl PointChange {
    pub fn new(number: u32, original_speed: i32, attempted_speed: i32, final_speed: i32, note: &str) -> Self {
        Self {
            key: PointKey::Point(number),
            current_thickness: None,
            current_deposition_rate: None,
            target_deposition_rate: None,
            deposition_rate_used: None,
            original_speed,
            attempted_speed,
            final_speed,
            note: note.to_owned(),
        }
    }

    pub fn speed_delta(&self) -> i32 {
        (self.final_speed - self.original_speed).abs()
    }

    /// Append `; note`, or just `note` when nothing was noted yet.
    pub fn add_note(&mut self, note: &str) {
        if !self.note.is_empty() {
            self.note.push_str("; ");
        }
        self.note.push_str(note);
    }

    fn csv_row(&self) -> String {
        let float = |v: Option<f32>| v.map(|v| v.to_string()).unwrap_or_default();
        format!(
            "{}, {}, {}, {}, {}, {}, {}, {}, {}",
            self.key,
            float(self.current_thickness),
            float(self.current_deposition_rate),
            float(self.target_deposition_rate),
            float(self.deposition_rate_used),
            self.original_speed,
            self.attempted_speed,
            self.final_speed,
            self.note
        )
    }
}

/// Changes in the order they were made, one entry per point.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ChangeLog {
    entries: Vec<PointChange>,
}

impl ChangeLog {
    pub fn entries(&self) -> &[PointChange] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &PointKey) -> Option<&PointChange> {
        self.entries.iter().find(|e| e.key == *key)
    }

    pub fn get_mut(&mut self, key: &PointKey) -> Option<&mut PointChange> {
        self.entries.iter_mut().find(|e| e.key == *key)
    }

    /// Record a change, merging it into an existing entry for the same point:
    /// the first original and attempted speeds are kept, the final speed is
    /// replaced and the note is appended.
    pub fn record(&mut self, change: PointChange) {
        match self.get_mut(&change.key) {
            Some(entry) => {
                entry.final_speed = change.final_speed;
                entry.add_note(&change.note);
            }
            None => self.entries.push(change),
        }
    }

    /// Entries sorted by point, midpoints after their base point.
    pub fn sorted(&self) -> Vec<&PointChange> {
        let mut sorted = self.entries.iter().collect::<Vec<_>>();
        sorted.sort_by_key(|e| e.key);
        sorted
    }

    pub fn write_csv<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        writeln!(out, "{}", CSV_HEADER)?;
        for entry in self.sorted() {
            writeln!(out, "{}", entry.csv_row())?;
        }
        Ok(())
    }

    pub fn save_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_csv(std::io::BufWriter::new(file))?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl<'a> IntoIterator for &'a ChangeLog {
    type Item = &'a PointChange;
    type IntoIter = std::slice::Iter<'a, PointChange>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn record_merges() {
        let mut log = ChangeLog::default();
        log.record(PointChange::new(4, 800, 600, 600, "Adjusted by gap fill"));
        log.record(PointChange::new(3, 700, 900, 900, "First point adjust"));
        log.record(PointChange::new(4, 600, 780, 780, "Toned down for being an outlier"));
        assert_eq!(log.len(), 2);
        let e = log.get(&PointKey::Point(4)).unwrap();
        assert_eq!((e.original_speed, e.attempted_speed, e.final_speed), (800, 600, 780));
        assert_eq!(e.note, "Adjusted by gap fill; Toned down for being an outlier");
        assert_eq!(e.speed_delta(), 20);
    }

    #[test]
    fn csv_sorted_by_key() {
        let mut log = ChangeLog::default();
        let mut mid = PointChange::new(3, 800, 893, 893, "; Normal Speed Adjust");
        mid.key = PointKey::Midpoint(3, 4);
        mid.current_thickness = Some(0.012);
        log.record(mid);
        log.record(PointChange::new(12, 800, 1600, 1500, "Adjusted by gap fill; Limited by Robot Speed"));
        log.record(PointChange::new(3, 900, 900, 900, "Last point adjust"));

        let mut out = vec![];
        log.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines[1], "3, , , , , 900, 900, 900, Last point adjust");
        assert_eq!(lines[2], "3_4, 0.012, , , , 800, 893, 893, ; Normal Speed Adjust");
        assert_eq!(lines[3], "12, , , , , 800, 1600, 1500, Adjusted by gap fill; Limited by Robot Speed");
        assert_eq!(lines.len(), 4);
        assert_eq!(CSV_HEADER.split(", ").count(), 9);
    }

    #[test]
    fn json_limits_precision() {
        let mut log = ChangeLog::default();
        let mut e = PointChange::new(2, 800, 893, 893, "; Normal Speed Adjust");
        e.deposition_rate_used = Some(0.010750279);
        log.record(e);
        let json = log.to_json().unwrap();
        assert!(json.contains("\"DepositionRateUsed\": 0.01075"));
        assert!(json.contains("\"Point\": \"2\""));
        assert!(json.contains("\"CurrentThickness\": null"));
    }
}
