use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};

/// Sentinel some upstream services use for "no value".
pub const MISSING_SENTINEL: f64 = -999999.0;

/// Text markers that mean "no value" in the raw tables we receive.
const MISSING_MARKERS: [&str; 6] = ["", "---", "NA", "N/A", "NaN", "nan"];

/// A single day's value.
/// - `Value(f64)`: an actual measurement in the parameter's canonical unit
/// - `Missing`: sentinel, gap, or a value rejected as implausible
///
/// Serialized as a nullable number.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum Reading {
    Value(f64),
    Missing,
}

impl Reading {
    /// Build a reading from a raw number; non-finite numbers and the
    /// upstream sentinel become `Missing`.
    pub fn from_f64(value: f64) -> Reading {
        if !value.is_finite() || value == MISSING_SENTINEL {
            Reading::Missing
        } else {
            Reading::Value(value)
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Reading::Value(v) => Some(*v),
            Reading::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Reading::Missing)
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Reading::Value(v) if *v == 0.0)
    }
}

impl From<Option<f64>> for Reading {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Reading::Missing, Reading::from_f64)
    }
}

impl From<Reading> for Option<f64> {
    fn from(value: Reading) -> Self {
        value.value()
    }
}

/// Raised when a raw value is neither a number nor a known missing marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingParseError(pub String);

impl fmt::Display for ReadingParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unparseable reading: {:?}", self.0)
    }
}

impl std::error::Error for ReadingParseError {}

impl FromStr for Reading {
    type Err = ReadingParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if MISSING_MARKERS.contains(&trimmed) {
            return Ok(Reading::Missing);
        }
        trimmed
            .parse::<f64>()
            .map(Reading::from_f64)
            .map_err(|_| ReadingParseError(s.to_string()))
    }
}

/// A single raw observation handed over by the ingestion side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub site_id: String,
    pub date: NaiveDate,
    pub parameter: String,
    pub value: Reading,
    pub unit: String,
    /// Set by the source when a zero has been verified as a true zero.
    #[serde(default)]
    pub confirmed_zero: bool,
}

impl Observation {
    pub fn new(site_id: &str, date: NaiveDate, parameter: &str, value: Reading, unit: &str) -> Self {
        Observation {
            site_id: site_id.to_string(),
            date,
            parameter: parameter.to_string(),
            value,
            unit: unit.to_string(),
            confirmed_zero: false,
        }
    }

    pub fn key(&self) -> SeriesKey {
        SeriesKey {
            site_id: self.site_id.clone(),
            parameter: self.parameter.clone(),
        }
    }
}

/// Identity of one normalized series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesKey {
    pub site_id: String,
    pub parameter: String,
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.site_id, self.parameter)
    }
}

/// Group a flat table of observations by (site_id, parameter).
///
/// Records keep their ingestion order inside each group, which the
/// normalizer relies on for last-write-wins.
pub fn group_by_series(observations: Vec<Observation>) -> BTreeMap<SeriesKey, Vec<Observation>> {
    let mut result: BTreeMap<SeriesKey, Vec<Observation>> = BTreeMap::new();
    for obs in observations {
        result.entry(obs.key()).or_default().push(obs);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(site: &str, day: u32, parameter: &str, value: f64) -> Observation {
        Observation::new(
            site,
            NaiveDate::from_ymd_opt(2022, 2, day).unwrap(),
            parameter,
            Reading::Value(value),
            "cfs",
        )
    }

    #[test]
    fn test_reading_from_str() {
        assert_eq!("9593".parse::<Reading>().unwrap(), Reading::Value(9593.0));
        assert_eq!(" 12.5 ".parse::<Reading>().unwrap(), Reading::Value(12.5));
        assert_eq!("---".parse::<Reading>().unwrap(), Reading::Missing);
        assert_eq!("".parse::<Reading>().unwrap(), Reading::Missing);
        assert_eq!("NA".parse::<Reading>().unwrap(), Reading::Missing);
        assert_eq!("-999999".parse::<Reading>().unwrap(), Reading::Missing);
        assert!("BRT".parse::<Reading>().is_err());
    }

    #[test]
    fn test_reading_option_conversions() {
        assert_eq!(Reading::from(Some(f64::NAN)), Reading::Missing);
        assert_eq!(Reading::from(None), Reading::Missing);
        assert_eq!(Reading::from(Some(3.0)), Reading::Value(3.0));
        let back: Option<f64> = Reading::Value(3.0).into();
        assert_eq!(back, Some(3.0));
        assert!(Reading::Value(0.0).is_zero());
        assert!(!Reading::Missing.is_zero());
    }

    #[test]
    fn test_group_by_series_preserves_order() {
        let records = vec![
            obs("B", 1, "discharge", 1.0),
            obs("A", 2, "discharge", 2.0),
            obs("A", 1, "discharge", 3.0),
            obs("A", 1, "stage", 4.0),
        ];
        let groups = group_by_series(records);
        assert_eq!(groups.len(), 3);
        let key = SeriesKey {
            site_id: "A".to_string(),
            parameter: "discharge".to_string(),
        };
        let a = &groups[&key];
        assert_eq!(a[0].value, Reading::Value(2.0));
        assert_eq!(a[1].value, Reading::Value(3.0));
        assert_eq!(groups.keys().next().unwrap().site_id, "A");
    }
}
