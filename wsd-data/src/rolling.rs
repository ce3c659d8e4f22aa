//! Smoothed, cumulative, and aggregated views of a normalized series.
//!
//! All functions are pure and take the normalized series as-is; missing
//! days are never treated as zeros unless stated.

use crate::percentile::quantile_of;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wsd_series::{AggregationMode, NormalizedSeries, Reading, SeriesPoint};
use wsd_utils::dates::{days_in_month, days_in_year, year_month};

/// Percentile used for monthly peaks.
pub const PEAK_PERCENTILE: f64 = 0.98;

/// Transform a derived series was computed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    MovingAverage { window: usize },
}

/// A series computed from a normalized series; same calendar coverage.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedSeries {
    pub transform: Transform,
    pub series: NormalizedSeries,
}

impl DerivedSeries {
    pub fn points(&self) -> impl Iterator<Item = SeriesPoint> + '_ {
        self.series.points()
    }
}

/// Trailing `window`-day mean of the non-missing values.
///
/// A day whose window holds fewer than half (rounded up) real values is
/// `Missing`. At the start of the series the window is truncated but the
/// same minimum applies.
pub fn moving_average(series: &NormalizedSeries, window: usize) -> DerivedSeries {
    let window = window.max(1);
    let min_count = window.div_ceil(2);
    let values = (0..series.values.len())
        .map(|i| {
            let from = (i + 1).saturating_sub(window);
            let present: Vec<f64> = series.values[from..=i]
                .iter()
                .filter_map(Reading::value)
                .collect();
            if present.len() < min_count {
                Reading::Missing
            } else {
                Reading::Value(present.iter().sum::<f64>() / present.len() as f64)
            }
        })
        .collect();
    DerivedSeries {
        transform: Transform::MovingAverage { window },
        series: series.with_values(values),
    }
}

/// Running total within a calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CumulativePoint {
    pub date: NaiveDate,
    pub year: i32,
    pub total: f64,
    /// Non-missing days that went into `total` so far this year.
    pub days_counted: u32,
}

impl CumulativePoint {
    /// Mean daily value so far this year, if any day was counted.
    pub fn mean_to_date(&self) -> Option<f64> {
        if self.days_counted == 0 {
            None
        } else {
            Some(self.total / self.days_counted as f64)
        }
    }
}

/// Cumulative sum that restarts at zero every January 1. Missing days add
/// nothing and are not counted.
pub fn cumulative_by_year(series: &NormalizedSeries) -> Vec<CumulativePoint> {
    let mut result = Vec::with_capacity(series.len());
    let mut year = None;
    let mut total = 0.0;
    let mut days_counted = 0;
    for point in series.points() {
        if year != Some(point.date.year()) {
            year = Some(point.date.year());
            total = 0.0;
            days_counted = 0;
        }
        if let Some(v) = point.value.value() {
            total += v;
            days_counted += 1;
        }
        result.push(CumulativePoint {
            date: point.date,
            year: point.date.year(),
            total,
            days_counted,
        });
    }
    result
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Month,
    Year,
}

/// Aggregate of one month or year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodAggregate {
    pub year: i32,
    /// `None` for annual aggregates.
    pub month: Option<u32>,
    pub value: Reading,
    pub days_observed: u32,
    pub days_in_period: u32,
}

/// Sum or mean of each period the series touches.
///
/// A period without a single non-missing day aggregates to `Missing`, not zero.
pub fn aggregate(
    series: &NormalizedSeries,
    period: Period,
    mode: AggregationMode,
) -> Vec<PeriodAggregate> {
    let mut periods: BTreeMap<(i32, u32), (f64, u32)> = BTreeMap::new();
    for point in series.points() {
        let key = match period {
            Period::Month => year_month(&point.date),
            Period::Year => (point.date.year(), 0),
        };
        let entry = periods.entry(key).or_insert((0.0, 0));
        if let Some(v) = point.value.value() {
            entry.0 += v;
            entry.1 += 1;
        }
    }
    periods
        .into_iter()
        .map(|((year, month), (sum, count))| {
            let value = match (count, mode) {
                (0, _) => Reading::Missing,
                (_, AggregationMode::Sum) => Reading::Value(sum),
                (_, AggregationMode::Mean) => Reading::Value(sum / count as f64),
            };
            let (month, days_in_period) = match period {
                Period::Month => (Some(month), days_in_month(year, month)),
                Period::Year => (None, days_in_year(year)),
            };
            PeriodAggregate {
                year,
                month,
                value,
                days_observed: count,
                days_in_period,
            }
        })
        .collect()
}

/// Percentile `p` of the non-missing readings in `window`.
pub fn peak(window: &[Reading], p: f64) -> Option<f64> {
    let present: Vec<f64> = window.iter().filter_map(Reading::value).collect();
    quantile_of(&present, p)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPeak {
    pub year: i32,
    pub month: u32,
    pub peak: Reading,
}

/// Peak (percentile `p`, usually [`PEAK_PERCENTILE`]) of every month the
/// series touches.
pub fn monthly_peaks(series: &NormalizedSeries, p: f64) -> Vec<MonthlyPeak> {
    let mut months: BTreeMap<(i32, u32), Vec<Reading>> = BTreeMap::new();
    for point in series.points() {
        months
            .entry(year_month(&point.date))
            .or_default()
            .push(point.value);
    }
    months
        .into_iter()
        .map(|((year, month), readings)| MonthlyPeak {
            year,
            month,
            peak: peak(&readings, p).map_or(Reading::Missing, Reading::Value),
        })
        .collect()
}
