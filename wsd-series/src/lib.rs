//! Core types for water supply monitoring series.
//!
//! Raw observations arrive from the ingestion side as flat records. This
//! crate defines those records, the per-parameter metadata every domain
//! pipeline is configured with, the fixed 365-day calendar used to line up
//! years, and the normalizer that turns one site's raw records into a
//! continuous daily series.

pub mod calendar;
pub mod date_range;
pub mod error;
pub mod normalizer;
pub mod observation;
pub mod parameter;

pub use calendar::{DayOfYear, LeapDayPolicy};
pub use date_range::DateRange;
pub use error::SeriesError;
pub use normalizer::{normalize, NormalizeReport, Normalized, NormalizedSeries, SeriesPoint};
pub use observation::{group_by_series, Observation, Reading, SeriesKey};
pub use parameter::{AggregationMode, BandSource, Domain, ParameterSpec, Polarity};
