//! Turns one site's raw observations into a continuous daily series.
//!
//! Rules applied, in order, to each record as it was ingested:
//! - records for another site or parameter are rejected (`ForeignSeries`)
//! - records in a unit other than the canonical one are rejected (`IncompatibleUnit`)
//! - an unconfirmed zero becomes `Missing` when the parameter treats zeros as suspicious
//! - a later record for the same date replaces the earlier one, except that a
//!   missing value never replaces a real one
//!
//! Every calendar day between the first and last surviving record then gets
//! exactly one entry; days nobody reported are `Missing`. Nothing is
//! interpolated.

use crate::{
    date_range::DateRange,
    error::SeriesError,
    observation::{Observation, Reading},
    parameter::ParameterSpec,
};
use chrono::{Duration, NaiveDate};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{btree_map::Entry, BTreeMap};
use std::fmt;

/// Gap-filled, de-duplicated daily series for one site and parameter.
///
/// `values[i]` is the reading for `start + i` days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSeries {
    pub site_id: String,
    pub parameter: String,
    pub unit: String,
    pub start: NaiveDate,
    pub values: Vec<Reading>,
}

/// One dated entry of a series, as written to tabular outputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: Reading,
}

impl NormalizedSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Last covered day. Equals `start` for a one-day series.
    pub fn end(&self) -> NaiveDate {
        self.start + Duration::days(self.values.len().saturating_sub(1) as i64)
    }

    pub fn date_range(&self) -> DateRange {
        DateRange(self.start, self.end())
    }

    pub fn date_at(&self, index: usize) -> NaiveDate {
        self.start + Duration::days(index as i64)
    }

    pub fn get(&self, date: &NaiveDate) -> Option<Reading> {
        let offset = (*date - self.start).num_days();
        if offset < 0 {
            return None;
        }
        self.values.get(offset as usize).copied()
    }

    pub fn points(&self) -> impl Iterator<Item = SeriesPoint> + '_ {
        self.values.iter().enumerate().map(|(i, value)| SeriesPoint {
            date: self.date_at(i),
            value: *value,
        })
    }

    /// Same site and calendar coverage, different values.
    ///
    /// Used to carry derived series (e.g. the moving average) through code
    /// that expects a `NormalizedSeries`.
    pub fn with_values(&self, values: Vec<Reading>) -> NormalizedSeries {
        debug_assert_eq!(values.len(), self.values.len());
        NormalizedSeries {
            site_id: self.site_id.clone(),
            parameter: self.parameter.clone(),
            unit: self.unit.clone(),
            start: self.start,
            values,
        }
    }

    /// Latest non-missing value on or before `as_of`, or the latest overall.
    pub fn latest_value(&self, as_of: Option<NaiveDate>) -> Option<(NaiveDate, f64)> {
        let last_index = match as_of {
            Some(date) => {
                let offset = (date - self.start).num_days();
                if offset < 0 {
                    return None;
                }
                (offset as usize).min(self.values.len().saturating_sub(1))
            }
            None => self.values.len().checked_sub(1)?,
        };
        self.values[..=last_index]
            .iter()
            .enumerate()
            .rev()
            .find_map(|(i, reading)| reading.value().map(|v| (self.date_at(i), v)))
    }

    /// Back to raw records, one per day, in date order.
    ///
    /// A zero that survived normalization was either confirmed or belongs to
    /// a parameter where zero is plausible, so it comes back confirmed.
    pub fn to_observations(&self) -> Vec<Observation> {
        self.points()
            .map(|point| Observation {
                confirmed_zero: point.value.is_zero(),
                ..Observation::new(
                    &self.site_id,
                    point.date,
                    &self.parameter,
                    point.value,
                    &self.unit,
                )
            })
            .collect()
    }
}

/// Why a raw record was excluded from the series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionKind {
    IncompatibleUnit { found: String, expected: String },
    ForeignSeries { site_id: String, parameter: String },
}

/// A record excluded during normalization. `index` is its position in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRejection {
    pub index: usize,
    pub date: NaiveDate,
    pub kind: RejectionKind,
}

impl fmt::Display for RecordRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            RejectionKind::IncompatibleUnit { found, expected } => write!(
                f,
                "record {} ({}): incompatible unit {:?}, expected {:?}",
                self.index, self.date, found, expected
            ),
            RejectionKind::ForeignSeries { site_id, parameter } => write!(
                f,
                "record {} ({}): belongs to {}/{}",
                self.index, self.date, site_id, parameter
            ),
        }
    }
}

impl std::error::Error for RecordRejection {}

/// What normalization did to the input, so callers can audit data loss.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeReport {
    pub rejected: Vec<RecordRejection>,
    pub duplicates_resolved: usize,
    pub zeros_flagged: usize,
    pub gaps_filled: usize,
}

impl NormalizeReport {
    pub fn dropped(&self) -> usize {
        self.rejected.len()
    }

    pub fn incompatible_units(&self) -> usize {
        self.rejected
            .iter()
            .filter(|r| matches!(r.kind, RejectionKind::IncompatibleUnit { .. }))
            .count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub series: NormalizedSeries,
    pub report: NormalizeReport,
}

/// Normalize the raw records of `site_id` for the parameter described by `spec`.
///
/// `records` must be in ingestion order. Fails with `EmptyInput` when there
/// are no records, or when every record was rejected.
pub fn normalize(
    spec: &ParameterSpec,
    site_id: &str,
    records: &[Observation],
) -> Result<Normalized, SeriesError> {
    if records.is_empty() {
        return Err(SeriesError::EmptyInput { dropped: 0 });
    }

    let mut report = NormalizeReport::default();
    let mut by_date: BTreeMap<NaiveDate, Reading> = BTreeMap::new();

    for (index, obs) in records.iter().enumerate() {
        if obs.site_id != site_id || obs.parameter != spec.name {
            report.rejected.push(RecordRejection {
                index,
                date: obs.date,
                kind: RejectionKind::ForeignSeries {
                    site_id: obs.site_id.clone(),
                    parameter: obs.parameter.clone(),
                },
            });
            continue;
        }
        if !spec.unit_matches(&obs.unit) {
            report.rejected.push(RecordRejection {
                index,
                date: obs.date,
                kind: RejectionKind::IncompatibleUnit {
                    found: obs.unit.clone(),
                    expected: spec.canonical_unit.clone(),
                },
            });
            continue;
        }

        let mut value = obs.value;
        if spec.zero_is_suspicious && value.is_zero() && !obs.confirmed_zero {
            value = Reading::Missing;
            report.zeros_flagged += 1;
        }

        match by_date.entry(obs.date) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(mut slot) => {
                report.duplicates_resolved += 1;
                if !value.is_missing() || slot.get().is_missing() {
                    slot.insert(value);
                }
            }
        }
    }

    let (start, end) = match (by_date.keys().next(), by_date.keys().next_back()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => {
            warn!(
                "{}/{}: all {} records rejected",
                site_id,
                spec.name,
                report.dropped()
            );
            return Err(SeriesError::EmptyInput {
                dropped: report.dropped(),
            });
        }
    };

    let range = DateRange(start, end);
    let mut values = Vec::with_capacity(range.len_days());
    for date in range {
        match by_date.get(&date) {
            Some(reading) => values.push(*reading),
            None => {
                report.gaps_filled += 1;
                values.push(Reading::Missing);
            }
        }
    }

    if report.dropped() > 0 {
        warn!(
            "{}/{}: dropped {} of {} records ({} with incompatible units)",
            site_id,
            spec.name,
            report.dropped(),
            records.len(),
            report.incompatible_units()
        );
    }
    debug!(
        "{}/{}: {} days from {} to {}, {} gaps, {} duplicates, {} zeros flagged",
        site_id,
        spec.name,
        values.len(),
        start,
        end,
        report.gaps_filled,
        report.duplicates_resolved,
        report.zeros_flagged
    );

    Ok(Normalized {
        series: NormalizedSeries {
            site_id: site_id.to_string(),
            parameter: spec.name.clone(),
            unit: spec.canonical_unit.clone(),
            start,
            values,
        },
        report,
    })
}
