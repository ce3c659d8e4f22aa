//! Wet/dry status of a value against its historical band.

use crate::percentile::PercentileBand;
use serde::{Deserialize, Serialize};
use std::fmt;
use wsd_series::Polarity;

/// Label used where no status could be computed.
pub const NO_DATA_LABEL: &str = "unknown";

/// Map colour used where no status could be computed.
pub const NO_DATA_COLOR: &str = "gray";

/// Six ordered wet/dry categories, driest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusLabel {
    ExtremelyDry,
    VeryDry,
    ModeratelyDry,
    ModeratelyWet,
    VeryWet,
    ExtremelyWet,
}

impl StatusLabel {
    pub const ALL: [StatusLabel; 6] = [
        StatusLabel::ExtremelyDry,
        StatusLabel::VeryDry,
        StatusLabel::ModeratelyDry,
        StatusLabel::ModeratelyWet,
        StatusLabel::VeryWet,
        StatusLabel::ExtremelyWet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusLabel::ExtremelyDry => "extremely_dry",
            StatusLabel::VeryDry => "very_dry",
            StatusLabel::ModeratelyDry => "moderately_dry",
            StatusLabel::ModeratelyWet => "moderately_wet",
            StatusLabel::VeryWet => "very_wet",
            StatusLabel::ExtremelyWet => "extremely_wet",
        }
    }

    /// Legend text shown on the dashboard.
    pub fn title(&self) -> &'static str {
        match self {
            StatusLabel::ExtremelyDry => "Extremely Dry",
            StatusLabel::VeryDry => "Very Dry",
            StatusLabel::ModeratelyDry => "Moderately Dry",
            StatusLabel::ModeratelyWet => "Moderately Wet",
            StatusLabel::VeryWet => "Very Wet",
            StatusLabel::ExtremelyWet => "Extremely Wet",
        }
    }

    /// Map marker colour.
    pub fn color(&self) -> &'static str {
        match self {
            StatusLabel::ExtremelyDry => "darkred",
            StatusLabel::VeryDry => "red",
            StatusLabel::ModeratelyDry => "orange",
            StatusLabel::ModeratelyWet => "cornflowerblue",
            StatusLabel::VeryWet => "blue",
            StatusLabel::ExtremelyWet => "navy",
        }
    }

    /// The label at the same distance from the other end of the ladder.
    pub fn mirrored(&self) -> StatusLabel {
        let rank = Self::ALL.iter().position(|l| l == self).unwrap_or(0);
        Self::ALL[Self::ALL.len() - 1 - rank]
    }
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why no status could be assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unclassifiable {
    MissingValue,
    MissingBand,
}

impl fmt::Display for Unclassifiable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unclassifiable::MissingValue => write!(f, "Unclassifiable: no current value"),
            Unclassifiable::MissingBand => write!(f, "Unclassifiable: no historical band for this day"),
        }
    }
}

impl std::error::Error for Unclassifiable {}

/// Place `value` in its band.
///
/// Boundaries belong to the lower category: `<= p10` is the driest label,
/// `(p10, p25]` the next, and so on up to `(p75, p90]`; only `> p90` reaches
/// the wettest label. With `Polarity::Inverted` the ladder is read from the
/// wet end instead.
pub fn classify(
    value: Option<f64>,
    band: Option<&PercentileBand>,
    polarity: Polarity,
) -> Result<StatusLabel, Unclassifiable> {
    let value = value
        .filter(|v| v.is_finite())
        .ok_or(Unclassifiable::MissingValue)?;
    let band = band.ok_or(Unclassifiable::MissingBand)?;

    let label = if value <= band.p10 {
        StatusLabel::ExtremelyDry
    } else if value <= band.p25 {
        StatusLabel::VeryDry
    } else if value <= band.p50 {
        StatusLabel::ModeratelyDry
    } else if value <= band.p75 {
        StatusLabel::ModeratelyWet
    } else if value <= band.p90 {
        StatusLabel::VeryWet
    } else {
        StatusLabel::ExtremelyWet
    };

    Ok(match polarity {
        Polarity::Direct => label,
        Polarity::Inverted => label.mirrored(),
    })
}
