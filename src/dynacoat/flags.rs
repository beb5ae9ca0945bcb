use std::fmt;

use serde::{Serialize, Serializer};

/// Conditions reported by a DynaCoat run. Several may be raised at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DynaResultFlag {
    /// The deposition rate a new speed implies is above the paint maximum.
    LargeDepositionRatesPresent,
    /// ... or below the paint minimum.
    SmallDepositionRatesPresent,
    /// At least one speed was limited by the robot speed window.
    SpeedsHaveBeenClipped,
    /// A speed moved further than the warning percentage allows.
    SpeedChangeOverPercentThreshold,
}

impl DynaResultFlag {
    pub const ALL: [DynaResultFlag; 4] = [
        DynaResultFlag::LargeDepositionRatesPresent,
        DynaResultFlag::SmallDepositionRatesPresent,
        DynaResultFlag::SpeedsHaveBeenClipped,
        DynaResultFlag::SpeedChangeOverPercentThreshold,
    ];

    fn bit(self) -> u8 {
        match self {
            DynaResultFlag::LargeDepositionRatesPresent => 1,
            DynaResultFlag::SmallDepositionRatesPresent => 2,
            DynaResultFlag::SpeedsHaveBeenClipped => 4,
            DynaResultFlag::SpeedChangeOverPercentThreshold => 8,
        }
    }
}

impl fmt::Display for DynaResultFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Set of [`DynaResultFlag`]s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DynaResultFlags(u8);

impl DynaResultFlags {
    pub fn insert(&mut self, flag: DynaResultFlag) {
        self.0 |= flag.bit();
    }

    pub fn set(&mut self, flag: DynaResultFlag, value: bool) {
        if value {
            self.insert(flag);
        }
    }

    pub fn contains(&self, flag: DynaResultFlag) -> bool {
        self.0 & flag.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Numeric value compatible with the controller side bit mask.
    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = DynaResultFlag> + '_ {
        DynaResultFlag::ALL.into_iter().filter(|f| self.contains(*f))
    }
}

impl FromIterator<DynaResultFlag> for DynaResultFlags {
    fn from_iter<I: IntoIterator<Item = DynaResultFlag>>(iter: I) -> Self {
        let mut flags = Self::default();
        iter.into_iter().for_each(|f| flags.insert(f));
        flags
    }
}

impl Serialize for DynaResultFlags {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(self.iter())
    }
}

impl fmt::Display for DynaResultFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "None");
        }
        let names = self.iter().map(|flag| flag.to_string()).collect::<Vec<_>>();
        write!(f, "{}", names.join(" | "))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn set_semantics() {
        let mut flags = DynaResultFlags::default();
        assert!(flags.is_empty());
        assert_eq!(flags.to_string(), "None");
        flags.insert(DynaResultFlag::SpeedsHaveBeenClipped);
        flags.set(DynaResultFlag::LargeDepositionRatesPresent, true);
        flags.set(DynaResultFlag::SmallDepositionRatesPresent, false);
        flags.insert(DynaResultFlag::SpeedsHaveBeenClipped);
        assert_eq!(flags.bits(), 5);
        assert!(flags.contains(DynaResultFlag::LargeDepositionRatesPresent));
        assert!(!flags.contains(DynaResultFlag::SmallDepositionRatesPresent));
        assert_eq!(flags.to_string(), "LargeDepositionRatesPresent | SpeedsHaveBeenClipped");
        assert_eq!(
            serde_json::to_string(&flags).unwrap(),
            r#"["LargeDepositionRatesPresent","SpeedsHaveBeenClipped"]"#
        );
        let all = DynaResultFlag::ALL.into_iter().collect::<DynaResultFlags>();
        assert_eq!(all.bits(), 15);
    }
}
