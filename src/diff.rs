use std::fmt;

use itertools::{EitherOrBoth, Itertools};

use crate::program::{PointBlock, ProgramDocument};

#[derive(Debug, Clone, PartialEq)]
pub enum LineDifference {
    Changed { left: String, right: String },
    OnlyLeft(String),
    OnlyRight(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PointDifference {
    /// Present in the first program only.
    MissingInRight(u32),
    /// Present in the second program only.
    MissingInLeft(u32),
    /// Same number, different text. Holds the differing `(left, right)` fields.
    Changed {
        number: u32,
        fields: Vec<(String, String)>,
    },
}

/// Line and point differences between two programs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgramDiff {
    lines: Vec<LineDifference>,
    points: Vec<PointDifference>,
}

fn normalize_line(text: &str) -> String {
    text.trim_end_matches(['\r', '\n']).replace(',', " ")
}

fn field_differences(left: &PointBlock, right: &PointBlock) -> Vec<(String, String)> {
    left.fields()
        .into_iter()
        .zip_longest(right.fields())
        .filter_map(|pair| match pair {
            EitherOrBoth::Both(l, r) if l == r => None,
            EitherOrBoth::Both(l, r) => Some((l.to_owned(), r.to_owned())),
            EitherOrBoth::Left(l) => Some((l.to_owned(), String::new())),
            EitherOrBoth::Right(r) => Some((String::new(), r.to_owned())),
        })
        .collect()
}

impl ProgramDiff {
    pub fn new(left: &ProgramDocument, right: &ProgramDocument) -> Self {
        let lines = left
            .instructions()
            .entries()
            .iter()
            .zip_longest(right.instructions().entries())
            .filter_map(|pair| match pair {
                EitherOrBoth::Both(l, r) => {
                    let (l, r) = (normalize_line(l.text()), normalize_line(r.text()));
                    (l != r).then_some(LineDifference::Changed { left: l, right: r })
                }
                EitherOrBoth::Left(l) => Some(LineDifference::OnlyLeft(normalize_line(l.text()))),
                EitherOrBoth::Right(r) => Some(LineDifference::OnlyRight(normalize_line(r.text()))),
            })
            .collect();

        let sorted = |doc: &ProgramDocument| -> Vec<PointBlock> {
            doc.points()
                .entries()
                .iter()
                .cloned()
                .sorted_by_key(|p| p.number())
                .collect()
        };
        let (left_points, right_points) = (sorted(left), sorted(right));

        let points = left_points
            .iter()
            .merge_join_by(right_points.iter(), |l, r| l.number().cmp(&r.number()))
            .filter_map(|pair| match pair {
                EitherOrBoth::Left(l) => Some(PointDifference::MissingInRight(l.number())),
                EitherOrBoth::Right(r) => Some(PointDifference::MissingInLeft(r.number())),
                EitherOrBoth::Both(l, r) if l.text() == r.text() => None,
                EitherOrBoth::Both(l, r) => Some(PointDifference::Changed {
                    number: l.number(),
                    fields: field_differences(l, r),
                }),
            })
            .collect();

        Self { lines, points }
    }

    pub fn lines(&self) -> &[LineDifference] {
        &self.lines
    }

    pub fn points(&self) -> &[PointDifference] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.points.is_empty()
    }
}

impl fmt::Display for ProgramDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Program Line Differences:")?;
        writeln!(f, "Program 1 Values,,,,Program 2 Values")?;
        for line in &self.lines {
            match line {
                LineDifference::Changed { left, right } => writeln!(f, "{left},,,,{right}")?,
                LineDifference::OnlyLeft(left) => writeln!(f, "{left}")?,
                LineDifference::OnlyRight(right) => writeln!(f, ",,,,{right}")?,
            }
        }

        writeln!(f)?;
        writeln!(f, "Point Differences:")?;
        for point in &self.points {
            match point {
                PointDifference::MissingInRight(n) => {
                    writeln!(f, ",,,,Program 2 doesn't have a point with number {n}.")?
                }
                PointDifference::MissingInLeft(n) => {
                    writeln!(f, "Program 1 doesn't have a point with number {n}.")?
                }
                PointDifference::Changed { number, fields } => {
                    writeln!(f, "{number}")?;
                    for (l, r) in fields {
                        writeln!(
                            f,
                            ",{},,,{}",
                            l.replace(['\r', '\n'], " "),
                            r.replace(['\r', '\n'], " ")
                        )?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::axis::Axis;
    use crate::test_data::SAMPLE_PROGRAM;

    fn sample() -> ProgramDocument {
        ProgramDocument::parse(SAMPLE_PROGRAM).unwrap()
    }

    #[test]
    fn identical() {
        let diff = ProgramDiff::new(&sample(), &sample());
        assert!(diff.is_empty());
        assert_eq!(
            diff.to_string(),
            "Program Line Differences:\nProgram 1 Values,,,,Program 2 Values\n\nPoint Differences:\n"
        );
    }

    #[test]
    fn speed_line() {
        let mut right = sample();
        right.set_speed(2, 550).unwrap();

        let diff = ProgramDiff::new(&sample(), &right);
        assert!(diff.points().is_empty());
        assert_eq!(
            diff.lines(),
            &[LineDifference::Changed {
                left: "   4:L P[2] 500mm/sec CNT100    ;".to_owned(),
                right: "   4:L P[2] 550mm/sec CNT100    ;".to_owned(),
            }]
        );
        assert!(diff
            .to_string()
            .contains("   4:L P[2] 500mm/sec CNT100    ;,,,,   4:L P[2] 550mm/sec CNT100    ;\n"));
    }

    #[test]
    fn point_fields() {
        let mut right = sample();
        right.set_axis_value(3, Axis::Y, 210.0).unwrap();

        let diff = ProgramDiff::new(&sample(), &right);
        assert!(diff.lines().is_empty());
        match diff.points() {
            [PointDifference::Changed { number, fields }] => {
                assert_eq!(*number, 3);
                assert_eq!(fields.len(), 1);
                assert!(fields[0].0.contains("200.000"));
                assert!(fields[0].1.contains("210.000"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_points() {
        let mut left = sample();
        left.delete_points(2, 2);
        let mut right = sample();
        right.delete_points(7, 7);

        let diff = ProgramDiff::new(&left, &right);
        assert_eq!(
            diff.points(),
            &[
                PointDifference::MissingInLeft(2),
                PointDifference::MissingInRight(7)
            ]
        );
        let text = diff.to_string();
        assert!(text.contains("\nProgram 1 doesn't have a point with number 2.\n"));
        assert!(text.contains("\n,,,,Program 2 doesn't have a point with number 7.\n"));
    }
}
