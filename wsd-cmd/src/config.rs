//! Run configuration.
//!
//! A run starts from the domain preset, then applies an optional JSON file,
//! then command-line flags. Nothing is read from the environment or the
//! clock: the "as of" date is part of the config.

use anyhow::{bail, Context};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use wsd_data::rolling::PEAK_PERCENTILE;
use wsd_series::{AggregationMode, BandSource, Domain, LeapDayPolicy, ParameterSpec, Polarity};

/// Feature attribute holding the site id in the site registry's GeoJSON.
pub const DEFAULT_ID_PROPERTY: &str = "site";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub domain: Domain,
    pub parameter: ParameterSpec,
    pub leap_policy: LeapDayPolicy,
    pub peak_percentile: f64,
    pub id_property: String,
    /// Classify the latest value on or before this date; latest overall when unset.
    pub as_of: Option<NaiveDate>,
}

/// Parameter fields a config file may override.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ParameterOverrides {
    name: Option<String>,
    canonical_unit: Option<String>,
    aggregation: Option<AggregationMode>,
    window: Option<usize>,
    zero_is_suspicious: Option<bool>,
    polarity: Option<Polarity>,
    band_source: Option<BandSource>,
}

/// On-disk shape of a config file; every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    domain: Option<Domain>,
    #[serde(default)]
    parameter: ParameterOverrides,
    leap_policy: Option<LeapDayPolicy>,
    peak_percentile: Option<f64>,
    id_property: Option<String>,
    as_of: Option<NaiveDate>,
}

impl PipelineConfig {
    pub fn for_domain(domain: Domain) -> Self {
        PipelineConfig {
            domain,
            parameter: domain.default_spec(),
            leap_policy: LeapDayPolicy::default(),
            peak_percentile: PEAK_PERCENTILE,
            id_property: DEFAULT_ID_PROPERTY.to_string(),
            as_of: None,
        }
    }

    /// Preset for `domain` (or the file's own `domain`) with the file's
    /// overrides applied. `domain` from the command line wins over the file.
    pub fn from_json_str(json: &str, domain: Option<Domain>) -> anyhow::Result<Self> {
        let file: ConfigFile = serde_json::from_str(json).context("Failed to parse config JSON")?;
        let domain = match domain.or(file.domain) {
            Some(d) => d,
            None => bail!("config does not name a domain and none was given"),
        };
        let mut config = PipelineConfig::for_domain(domain);
        let p = file.parameter;
        let spec = &mut config.parameter;
        if let Some(name) = p.name {
            spec.name = name;
        }
        if let Some(unit) = p.canonical_unit {
            spec.canonical_unit = unit;
        }
        if let Some(aggregation) = p.aggregation {
            spec.aggregation = aggregation;
        }
        if let Some(window) = p.window {
            spec.window = window;
        }
        if let Some(zero) = p.zero_is_suspicious {
            spec.zero_is_suspicious = zero;
        }
        if let Some(polarity) = p.polarity {
            spec.polarity = polarity;
        }
        if let Some(band_source) = p.band_source {
            spec.band_source = band_source;
        }
        if let Some(policy) = file.leap_policy {
            config.leap_policy = policy;
        }
        if let Some(p) = file.peak_percentile {
            config.peak_percentile = p;
        }
        if let Some(id) = file.id_property {
            config.id_property = id;
        }
        config.as_of = file.as_of;
        Ok(config)
    }

    pub fn load(path: Option<&Path>, domain: Option<Domain>) -> anyhow::Result<Self> {
        let config = match path {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                PipelineConfig::from_json_str(&json, domain)?
            }
            None => match domain {
                Some(d) => PipelineConfig::for_domain(d),
                None => bail!("either --domain or --config must be given"),
            },
        };
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.parameter.window == 0 {
            bail!("moving-average window must be at least one day");
        }
        if !(0.0..=1.0).contains(&self.peak_percentile) {
            bail!(
                "peak percentile {} is outside [0, 1]",
                self.peak_percentile
            );
        }
        if self.parameter.name.trim().is_empty() || self.id_property.trim().is_empty() {
            bail!("parameter name and id property must not be empty");
        }
        Ok(())
    }
}
