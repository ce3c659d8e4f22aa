//! Data processing for normalized water supply series.
//!
//! This crate turns a normalized daily series into the forms the dashboard
//! charts and maps consume: smoothed and cumulative series, period
//! aggregates, historical day-of-year percentile bands, and the wet/dry
//! status of the latest value against those bands.

pub mod classify;
pub mod percentile;
pub mod rolling;

pub use classify::{classify, StatusLabel, Unclassifiable};
pub use percentile::{quantile, DayOfYearStats, PercentileBand, PercentileModel};
pub use rolling::{
    aggregate, cumulative_by_year, monthly_peaks, moving_average, peak, CumulativePoint,
    DerivedSeries, MonthlyPeak, Period, PeriodAggregate,
};
