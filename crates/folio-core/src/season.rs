//! Calendar-driven seasonal overlay selection.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Decorative overlay shown around holidays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonalEffect {
    /// Falling snow, December 20 to 26.
    Snow,
    /// Fireworks on New Year's Eve and New Year's Day.
    Fireworks,
}

impl SeasonalEffect {
    /// Returns the effect active on `date`, if any.
    #[must_use]
    pub fn for_date(date: NaiveDate) -> Option<Self> {
        match (date.month(), date.day()) {
            (12, 20..=26) => Some(Self::Snow),
            (12, 31) | (1, 1) => Some(Self::Fireworks),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    #[test]
    fn test_christmas_week() {
        assert_eq!(SeasonalEffect::for_date(day(12, 20)), Some(SeasonalEffect::Snow));
        assert_eq!(SeasonalEffect::for_date(day(12, 26)), Some(SeasonalEffect::Snow));
        assert_eq!(SeasonalEffect::for_date(day(12, 19)), None);
        assert_eq!(SeasonalEffect::for_date(day(12, 27)), None);
    }

    #[test]
    fn test_new_year() {
        assert_eq!(
            SeasonalEffect::for_date(day(12, 31)),
            Some(SeasonalEffect::Fireworks)
        );
        assert_eq!(
            SeasonalEffect::for_date(day(1, 1)),
            Some(SeasonalEffect::Fireworks)
        );
        assert_eq!(SeasonalEffect::for_date(day(1, 2)), None);
    }
}
