//! Command implementations for the WSD CLI.
//!
//! Reads raw observations (and optionally the site registry's GeoJSON),
//! runs one domain through the conditioning and classification engine, and
//! writes the dashboard's tables and map layer.

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};
use wsd_series::{Domain, LeapDayPolicy};
use wsd_utils::dates::parse_date;

pub mod config;
pub mod ingest;
pub mod pipeline;
pub mod sink;

use config::PipelineConfig;

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct RunOptions {
    /// Monitoring domain; required unless the config file names one
    #[arg(short = 'd', long)]
    pub domain: Option<Domain>,

    /// Path to the raw observations CSV
    #[arg(short = 'o', long)]
    pub observations: PathBuf,

    /// JSON config file overriding the domain preset
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Directory to write outputs into
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Moving-average window in days
    #[arg(short = 'w', long)]
    pub window: Option<usize>,

    /// Where Feb 29 goes: fold, skip, or ordinal
    #[arg(long)]
    pub leap_policy: Option<LeapDayPolicy>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Normalize, derive, classify, and publish one domain
    Run {
        #[command(flatten)]
        options: RunOptions,

        /// Site registry GeoJSON to stamp current values and status onto
        #[arg(short = 's', long)]
        sites: Option<PathBuf>,

        /// Feature attribute holding the site id
        #[arg(long)]
        id_property: Option<String>,

        /// Classify the latest value on or before this date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_as_of)]
        as_of: Option<NaiveDate>,
    },

    /// Compute day-of-year percentile bands only
    Bands {
        #[command(flatten)]
        options: RunOptions,
    },
}

fn parse_as_of(s: &str) -> Result<NaiveDate, String> {
    parse_date(s).map_err(|e| e.to_string())
}

impl RunOptions {
    /// Preset, then config file, then these flags.
    fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = PipelineConfig::load(self.config.as_deref(), self.domain)?;
        if let Some(window) = self.window {
            config.parameter.window = window;
        }
        if let Some(policy) = self.leap_policy {
            config.leap_policy = policy;
        }
        Ok(config)
    }
}

pub fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Run {
            options,
            sites,
            id_property,
            as_of,
        } => {
            let mut config = options.pipeline_config()?;
            if let Some(id_property) = id_property {
                config.id_property = id_property;
            }
            if as_of.is_some() {
                config.as_of = as_of;
            }
            config.validate()?;
            run_domain(&config, &options.observations, sites.as_deref(), &options.out_dir)
        }
        Command::Bands { options } => {
            let config = options.pipeline_config()?;
            config.validate()?;
            run_bands(&config, &options.observations, &options.out_dir)
        }
    }
}

fn run_domain(
    config: &PipelineConfig,
    observations: &Path,
    sites: Option<&Path>,
    out_dir: &Path,
) -> anyhow::Result<()> {
    info!("Running {} from {}", config.domain, observations.display());
    let (records, ingest_report) = ingest::read_observations_path(observations)?;
    let features = sites.map(ingest::read_features_path).transpose()?;

    let output = pipeline::run_pipeline(config, records, features.as_ref());
    let written = sink::write_all(out_dir, &output)?;
    info!(
        "{} complete. Input: {}. {} sites, {} failed, {} files written to {}",
        config.domain,
        ingest_report,
        output.sites.len(),
        output.failed.len(),
        written.len(),
        out_dir.display()
    );
    Ok(())
}

fn run_bands(config: &PipelineConfig, observations: &Path, out_dir: &Path) -> anyhow::Result<()> {
    let (records, ingest_report) = ingest::read_observations_path(observations)?;
    if ingest_report.skipped_rows > 0 || ingest_report.unparsed_values > 0 {
        warn!("{}: {}", observations.display(), ingest_report);
    }
    let (models, failed) = pipeline::build_bands(config, records);
    if !failed.is_empty() {
        warn!("{} sites had no usable records", failed.len());
    }

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;
    let path = sink::output_path(out_dir, config.domain, "bands.csv");
    let file = std::fs::File::create(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    sink::write_bands(std::io::BufWriter::new(file), &models)?;
    info!("Bands for {} sites written to {}", models.len(), path.display());
    Ok(())
}
