//! Reading the tables handed over by the ingestion side.
//!
//! # CSV Format
//!
//! - **Observations** (has headers): `site_id,date,parameter,value,unit[,confirmed_zero]`
//!
//! ```text
//! site_id,date,parameter,value,unit
//! 08185065,2024-05-01,discharge,12.4,cfs
//! 08185065,2024-05-02,discharge,---,cfs
//! ```
//!
//! Rows whose date cannot be parsed are skipped and counted. Values that are
//! neither numbers nor a known missing marker are kept as missing and counted.

use anyhow::Context;
use log::{info, warn};
use serde::Deserialize;
use std::fmt;
use std::io::Read;
use std::path::Path;
use wsd_series::{Observation, Reading};
use wsd_sites::FeatureCollection;
use wsd_utils::dates::parse_observation_date;

#[derive(Debug, Deserialize)]
struct ObservationRow {
    site_id: String,
    date: String,
    parameter: String,
    value: String,
    unit: String,
    #[serde(default)]
    confirmed_zero: Option<String>,
}

/// What happened while reading an observation table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub rows: usize,
    pub skipped_rows: usize,
    pub unparsed_values: usize,
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows read, {} skipped, {} unparsed values",
            self.rows, self.skipped_rows, self.unparsed_values
        )
    }
}

fn parse_flag(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y"
    )
}

/// Read observations from CSV, keeping file order as ingestion order.
pub fn read_observations<R: Read>(reader: R) -> anyhow::Result<(Vec<Observation>, IngestReport)> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut report = IngestReport::default();
    let mut observations = Vec::new();
    for (line, result) in rdr.deserialize::<ObservationRow>().enumerate() {
        report.rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("row {}: {}", line + 1, e);
                report.skipped_rows += 1;
                continue;
            }
        };
        let date = match parse_observation_date(&row.date) {
            Ok(d) => d,
            Err(e) => {
                warn!("row {} ({}): {}", line + 1, row.site_id, e);
                report.skipped_rows += 1;
                continue;
            }
        };
        let value = row.value.parse::<Reading>().unwrap_or_else(|e| {
            warn!("row {} ({}): {}", line + 1, row.site_id, e);
            report.unparsed_values += 1;
            Reading::Missing
        });
        observations.push(Observation {
            site_id: row.site_id,
            date,
            parameter: row.parameter,
            value,
            unit: row.unit,
            confirmed_zero: row.confirmed_zero.as_deref().is_some_and(parse_flag),
        });
    }
    info!("Read {} observations ({})", observations.len(), report);
    Ok((observations, report))
}

pub fn read_observations_path(path: &Path) -> anyhow::Result<(Vec<Observation>, IngestReport)> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open observations {}", path.display()))?;
    read_observations(file)
}

/// Load the site registry's feature collection.
pub fn read_features_path(path: &Path) -> anyhow::Result<FeatureCollection> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read sites {}", path.display()))?;
    let collection = FeatureCollection::from_json_str(&json)
        .with_context(|| format!("Failed to parse GeoJSON {}", path.display()))?;
    info!("Loaded {} site features", collection.features.len());
    Ok(collection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const OBSERVATIONS: &str = "site_id,date,parameter,value,unit,confirmed_zero
08185065,2024-05-01,discharge,12.4,cfs,
08185065,20240502,discharge,---,cfs,
08185065,2024-05-03T00:00:00-05:00,discharge,0,cfs,true
08185065,May 4,discharge,3,cfs,
08186000,2024-05-01,discharge,BRT,cfs,
";

    #[test]
    fn test_read_observations() {
        let (observations, report) = read_observations(OBSERVATIONS.as_bytes()).unwrap();
        assert_eq!(report.rows, 5);
        assert_eq!(report.skipped_rows, 1);
        assert_eq!(report.unparsed_values, 1);
        assert_eq!(observations.len(), 4);

        assert_eq!(observations[0].site_id, "08185065");
        assert_eq!(observations[0].date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(observations[0].value, Reading::Value(12.4));
        assert!(!observations[0].confirmed_zero);

        assert_eq!(observations[1].date, NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
        assert_eq!(observations[1].value, Reading::Missing);

        assert_eq!(observations[2].value, Reading::Value(0.0));
        assert!(observations[2].confirmed_zero);

        assert_eq!(observations[3].site_id, "08186000");
        assert_eq!(observations[3].value, Reading::Missing);
        assert_eq!(report.to_string(), "5 rows read, 1 skipped, 1 unparsed values");
    }

    #[test]
    fn test_confirmed_zero_column_is_optional() {
        let csv = "site_id,date,parameter,value,unit\nA,2024-01-01,demand,1.5,MGD\n";
        let (observations, report) = read_observations(csv.as_bytes()).unwrap();
        assert_eq!(report.skipped_rows, 0);
        assert_eq!(observations.len(), 1);
        assert!(!observations[0].confirmed_zero);
    }
}
