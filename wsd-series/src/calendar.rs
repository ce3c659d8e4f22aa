//! Fixed 365-day calendar used to line up values from different years.
//!
//! Historical bands group values by calendar position. Leap years have one
//! day too many; [`LeapDayPolicy`] decides where that day goes.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Number of day-of-year buckets.
pub const DAYS_PER_YEAR: usize = 365;

/// Ordinal of February 28 in any year.
const FEB_28_ORDINAL: u32 = 59;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeapDayPolicy {
    /// Feb 29 shares Feb 28's bucket; later days use their non-leap position.
    #[default]
    FoldIntoFeb28,
    /// Feb 29 has no bucket; later days use their non-leap position.
    Skip,
    /// The plain ordinal day, so every day after Feb 28 of a leap year lands
    /// one bucket later. Dec 31 of a leap year (ordinal 366) folds into 365.
    CalendarOrdinal,
}

impl FromStr for LeapDayPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fold" | "fold_into_feb28" => Ok(LeapDayPolicy::FoldIntoFeb28),
            "skip" => Ok(LeapDayPolicy::Skip),
            "ordinal" | "calendar_ordinal" => Ok(LeapDayPolicy::CalendarOrdinal),
            other => Err(format!(
                "unknown leap day policy {other:?} (expected fold, skip, or ordinal)"
            )),
        }
    }
}

/// A calendar position in 1..=365.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DayOfYear(u16);

impl DayOfYear {
    pub fn new(day: u16) -> Option<DayOfYear> {
        if (1..=DAYS_PER_YEAR as u16).contains(&day) {
            Some(DayOfYear(day))
        } else {
            None
        }
    }

    /// Bucket for `date` under `policy`; `None` only for a skipped Feb 29.
    pub fn from_date(date: &NaiveDate, policy: LeapDayPolicy) -> Option<DayOfYear> {
        let ordinal = date.ordinal();
        let leap = date.leap_year();
        let day = match policy {
            LeapDayPolicy::CalendarOrdinal => ordinal.min(DAYS_PER_YEAR as u32),
            LeapDayPolicy::FoldIntoFeb28 | LeapDayPolicy::Skip if !leap => ordinal,
            LeapDayPolicy::FoldIntoFeb28 | LeapDayPolicy::Skip => {
                if ordinal <= FEB_28_ORDINAL {
                    ordinal
                } else if ordinal == FEB_28_ORDINAL + 1 {
                    match policy {
                        LeapDayPolicy::Skip => return None,
                        _ => FEB_28_ORDINAL,
                    }
                } else {
                    ordinal - 1
                }
            }
        };
        Some(DayOfYear(day as u16))
    }

    pub fn get(&self) -> u16 {
        self.0
    }

    /// Zero-based index into a 365-slot table.
    pub fn index(&self) -> usize {
        self.0 as usize - 1
    }

    pub fn all() -> impl Iterator<Item = DayOfYear> {
        (1..=DAYS_PER_YEAR as u16).map(DayOfYear)
    }
}

impl fmt::Display for DayOfYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
