use std::fmt;

/// Errors that abort normalization of a whole series.
///
/// Per-record problems never show up here; they are reported through
/// [`crate::NormalizeReport`] and the offending record is excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeriesError {
    /// No usable record was left to build a series from. `dropped` counts the
    /// records that were present but rejected.
    EmptyInput { dropped: usize },
}

impl fmt::Display for SeriesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesError::EmptyInput { dropped: 0 } => write!(f, "Empty input: no records"),
            SeriesError::EmptyInput { dropped } => {
                write!(f, "Empty input: all {dropped} records were rejected")
            }
        }
    }
}

impl std::error::Error for SeriesError {}
