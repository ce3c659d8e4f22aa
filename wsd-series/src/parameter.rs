//! Per-parameter metadata that parametrizes one pipeline run.
//!
//! Every domain (demand, streamflow, reservoir, precipitation, groundwater)
//! runs the same engine; what differs between them is captured here.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Default trailing window for the moving average, in days.
pub const DEFAULT_WINDOW: usize = 7;

/// How daily values combine into monthly and annual aggregates.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// Volumetric parameters (demand, precipitation) accumulate.
    Sum,
    /// Level and flow parameters average.
    Mean,
}

/// Direction in which a larger value means wetter conditions.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Larger is wetter (flow, storage, precipitation).
    Direct,
    /// Larger is drier (depth to groundwater).
    Inverted,
}

/// Which series feeds the percentile model and the current value.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandSource {
    Raw,
    /// The trailing moving average of the normalized series.
    Smoothed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Parameter name as it appears on raw observations.
    pub name: String,
    pub canonical_unit: String,
    pub aggregation: AggregationMode,
    /// Moving-average window in days.
    pub window: usize,
    /// A zero without confirmation is treated as missing.
    pub zero_is_suspicious: bool,
    pub polarity: Polarity,
    pub band_source: BandSource,
}

impl ParameterSpec {
    /// Units compare case-insensitively, ignoring surrounding whitespace.
    pub fn unit_matches(&self, unit: &str) -> bool {
        self.canonical_unit.trim().eq_ignore_ascii_case(unit.trim())
    }
}

/// The monitoring domains the dashboard publishes.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Demand,
    Streamflow,
    Reservoir,
    Precipitation,
    Groundwater,
}

impl Domain {
    pub const ALL: [Domain; 5] = [
        Domain::Demand,
        Domain::Streamflow,
        Domain::Reservoir,
        Domain::Precipitation,
        Domain::Groundwater,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Domain::Demand => "demand",
            Domain::Streamflow => "streamflow",
            Domain::Reservoir => "reservoir",
            Domain::Precipitation => "precipitation",
            Domain::Groundwater => "groundwater",
        }
    }

    /// Parameter metadata each domain runs with unless overridden.
    pub fn default_spec(&self) -> ParameterSpec {
        let (name, unit, aggregation, zero_is_suspicious, polarity, band_source) = match self {
            Domain::Demand => (
                "demand",
                "MGD",
                AggregationMode::Sum,
                true,
                Polarity::Direct,
                BandSource::Raw,
            ),
            Domain::Streamflow => (
                "discharge",
                "cfs",
                AggregationMode::Mean,
                true,
                Polarity::Direct,
                BandSource::Smoothed,
            ),
            Domain::Reservoir => (
                "percent_storage",
                "%",
                AggregationMode::Mean,
                false,
                Polarity::Direct,
                BandSource::Raw,
            ),
            Domain::Precipitation => (
                "precipitation",
                "in",
                AggregationMode::Sum,
                false,
                Polarity::Direct,
                BandSource::Raw,
            ),
            Domain::Groundwater => (
                "depth_to_water",
                "ft",
                AggregationMode::Mean,
                false,
                Polarity::Inverted,
                BandSource::Raw,
            ),
        };
        ParameterSpec {
            name: name.to_string(),
            canonical_unit: unit.to_string(),
            aggregation,
            window: DEFAULT_WINDOW,
            zero_is_suspicious,
            polarity,
            band_source,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Domain::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown domain {s:?}"))
    }
}
