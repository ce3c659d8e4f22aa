//! Tabular and GeoJSON outputs for the dashboard.
//!
//! # Output Files
//!
//! - `<domain>_series.csv`: `site_id,date,value,smoothed,cumulative,days_counted`
//! - `<domain>_aggregates.csv`: `site_id,period,year,month,value,days_observed,days_in_period`
//! - `<domain>_peaks.csv`: `site_id,year,month,peak`
//! - `<domain>_bands.csv`: `site_id,day_of_year,n_obs,min,p10,p25,p50,p75,p90,max,start_year,end_year`
//! - `<domain>_status.csv`: `site_id,date,value,status,color`
//! - `<domain>_sites.geojson`: the merged feature collection
//!
//! Missing values are written as empty fields. Rows follow site id order,
//! then date order.

use crate::pipeline::{PipelineOutput, SiteOutput};
use anyhow::Context;
use log::info;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use wsd_data::{classify::NO_DATA_COLOR, PercentileModel};
use wsd_series::Domain;
use wsd_sites::{FeatureCollection, SiteSnapshot};
use wsd_utils::dates::format_date;

#[derive(Debug, Serialize)]
struct SeriesRow<'a> {
    site_id: &'a str,
    date: String,
    value: Option<f64>,
    smoothed: Option<f64>,
    cumulative: f64,
    days_counted: u32,
}

#[derive(Debug, Serialize)]
struct AggregateRow<'a> {
    site_id: &'a str,
    period: &'static str,
    year: i32,
    month: Option<u32>,
    value: Option<f64>,
    days_observed: u32,
    days_in_period: u32,
}

#[derive(Debug, Serialize)]
struct PeakRow<'a> {
    site_id: &'a str,
    year: i32,
    month: u32,
    peak: Option<f64>,
}

#[derive(Debug, Serialize)]
struct BandRow<'a> {
    site_id: &'a str,
    day_of_year: u16,
    n_obs: usize,
    min: f64,
    p10: f64,
    p25: f64,
    p50: f64,
    p75: f64,
    p90: f64,
    max: f64,
    start_year: i32,
    end_year: i32,
}

#[derive(Debug, Serialize)]
struct StatusRow<'a> {
    site_id: &'a str,
    date: Option<String>,
    value: Option<f64>,
    status: &'static str,
    color: &'static str,
}

/// Daily raw, smoothed, and cumulative values for every site.
pub fn write_series<W: Write>(writer: W, sites: &[SiteOutput]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for site in sites {
        let rows = site
            .normalized
            .points()
            .zip(site.smoothed.points())
            .zip(&site.cumulative);
        for ((raw, smoothed), cumulative) in rows {
            wtr.serialize(SeriesRow {
                site_id: site.site_id(),
                date: format_date(&raw.date),
                value: raw.value.value(),
                smoothed: smoothed.value.value(),
                cumulative: cumulative.total,
                days_counted: cumulative.days_counted,
            })?;
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Monthly rows followed by annual rows, per site.
pub fn write_aggregates<W: Write>(writer: W, sites: &[SiteOutput]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for site in sites {
        let periods = site
            .monthly
            .iter()
            .map(|a| ("month", a))
            .chain(site.annual.iter().map(|a| ("year", a)));
        for (period, agg) in periods {
            wtr.serialize(AggregateRow {
                site_id: site.site_id(),
                period,
                year: agg.year,
                month: agg.month,
                value: agg.value.value(),
                days_observed: agg.days_observed,
                days_in_period: agg.days_in_period,
            })?;
        }
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_peaks<W: Write>(writer: W, sites: &[SiteOutput]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for site in sites {
        for peak in &site.peaks {
            wtr.serialize(PeakRow {
                site_id: site.site_id(),
                year: peak.year,
                month: peak.month,
                peak: peak.peak.value(),
            })?;
        }
    }
    wtr.flush()?;
    Ok(())
}

/// One row per populated day-of-year bucket of each model.
pub fn write_bands<'a, W, I>(writer: W, models: I) -> anyhow::Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a PercentileModel>,
{
    let mut wtr = csv::Writer::from_writer(writer);
    for model in models {
        for stats in model.iter() {
            wtr.serialize(BandRow {
                site_id: &model.site_id,
                day_of_year: stats.day_of_year.get(),
                n_obs: stats.n_obs,
                min: stats.min,
                p10: stats.band.p10,
                p25: stats.band.p25,
                p50: stats.band.p50,
                p75: stats.band.p75,
                p90: stats.band.p90,
                max: stats.max,
                start_year: stats.start_year,
                end_year: stats.end_year,
            })?;
        }
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_status<'a, W, I>(writer: W, snapshots: I) -> anyhow::Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a SiteSnapshot>,
{
    let mut wtr = csv::Writer::from_writer(writer);
    for snapshot in snapshots {
        let color = match &snapshot.status {
            Ok(label) => label.color(),
            Err(_) => NO_DATA_COLOR,
        };
        wtr.serialize(StatusRow {
            site_id: &snapshot.site_id,
            date: snapshot.date.as_ref().map(format_date),
            value: snapshot.value,
            status: snapshot.status_text(),
            color,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_features<W: Write>(mut writer: W, collection: &FeatureCollection) -> anyhow::Result<()> {
    let json = collection.to_json_string()?;
    writer.write_all(json.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// `<out_dir>/<domain>_<suffix>`
pub fn output_path(out_dir: &Path, domain: Domain, suffix: &str) -> PathBuf {
    out_dir.join(format!("{}_{}", domain.name(), suffix))
}

fn create(path: &Path) -> anyhow::Result<std::io::BufWriter<std::fs::File>> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    Ok(std::io::BufWriter::new(file))
}

/// Write every output of a run into `out_dir`, returning the paths written.
pub fn write_all(out_dir: &Path, output: &PipelineOutput) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;
    let domain = output.domain;
    let mut written = Vec::new();

    let path = output_path(out_dir, domain, "series.csv");
    write_series(create(&path)?, &output.sites)?;
    written.push(path);

    let path = output_path(out_dir, domain, "aggregates.csv");
    write_aggregates(create(&path)?, &output.sites)?;
    written.push(path);

    let path = output_path(out_dir, domain, "peaks.csv");
    write_peaks(create(&path)?, &output.sites)?;
    written.push(path);

    let path = output_path(out_dir, domain, "bands.csv");
    write_bands(create(&path)?, output.sites.iter().map(|s| &s.bands))?;
    written.push(path);

    let path = output_path(out_dir, domain, "status.csv");
    write_status(create(&path)?, output.snapshots().values())?;
    written.push(path);

    if let Some(merge) = &output.merge {
        let path = output_path(out_dir, domain, "sites.geojson");
        write_features(create(&path)?, &merge.collection)?;
        written.push(path);
    }

    for path in &written {
        info!("Wrote {}", path.display());
    }
    Ok(written)
}
