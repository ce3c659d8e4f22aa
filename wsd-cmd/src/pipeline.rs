//! One domain run: normalize every site, derive statistics, build bands,
//! classify the current value, and merge snapshots into the site features.

use crate::config::PipelineConfig;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use wsd_data::{
    aggregate, classify, cumulative_by_year, monthly_peaks, moving_average, CumulativePoint,
    DerivedSeries, MonthlyPeak, Period, PeriodAggregate, PercentileModel, Unclassifiable,
};
use wsd_series::{
    group_by_series, normalize, BandSource, Domain, NormalizeReport, NormalizedSeries,
    Observation, SeriesError,
};
use wsd_sites::{merge_snapshots, FeatureCollection, MergeOutcome, SiteSnapshot};

/// Everything derived for one site.
#[derive(Debug, Clone)]
pub struct SiteOutput {
    pub normalized: NormalizedSeries,
    pub report: NormalizeReport,
    pub smoothed: DerivedSeries,
    pub cumulative: Vec<CumulativePoint>,
    pub monthly: Vec<PeriodAggregate>,
    pub annual: Vec<PeriodAggregate>,
    pub peaks: Vec<MonthlyPeak>,
    pub bands: PercentileModel,
    pub snapshot: SiteSnapshot,
}

impl SiteOutput {
    pub fn site_id(&self) -> &str {
        &self.normalized.site_id
    }
}

/// A site whose series could not be built.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteFailure {
    pub site_id: String,
    pub error: SeriesError,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub domain: Domain,
    /// Successful sites in site id order.
    pub sites: Vec<SiteOutput>,
    pub failed: Vec<SiteFailure>,
    /// Records for parameters other than the configured one.
    pub skipped_records: usize,
    /// Present when features were supplied.
    pub merge: Option<MergeOutcome>,
}

impl PipelineOutput {
    /// Snapshot per site id, failed sites included as unclassifiable.
    pub fn snapshots(&self) -> BTreeMap<String, SiteSnapshot> {
        let mut snapshots: BTreeMap<String, SiteSnapshot> = self
            .sites
            .iter()
            .map(|site| (site.site_id().to_string(), site.snapshot.clone()))
            .collect();
        for failure in &self.failed {
            snapshots.insert(failure.site_id.clone(), no_data_snapshot(&failure.site_id));
        }
        snapshots
    }
}

fn no_data_snapshot(site_id: &str) -> SiteSnapshot {
    SiteSnapshot {
        site_id: site_id.to_string(),
        date: None,
        value: None,
        status: Err(Unclassifiable::MissingValue),
    }
}

/// The series bands are built from and the current value is read from.
fn band_series<'a>(
    source: BandSource,
    raw: &'a NormalizedSeries,
    smoothed: &'a DerivedSeries,
) -> &'a NormalizedSeries {
    match source {
        BandSource::Raw => raw,
        BandSource::Smoothed => &smoothed.series,
    }
}

/// Run every stage for one site's records.
pub fn process_site(
    config: &PipelineConfig,
    site_id: &str,
    records: &[Observation],
) -> Result<SiteOutput, SeriesError> {
    let spec = &config.parameter;
    let normalized = normalize(spec, site_id, records)?;
    let series = normalized.series;
    let report = normalized.report;

    let smoothed = moving_average(&series, spec.window);
    let cumulative = cumulative_by_year(&series);
    let monthly = aggregate(&series, Period::Month, spec.aggregation);
    let annual = aggregate(&series, Period::Year, spec.aggregation);
    let peaks = monthly_peaks(&series, config.peak_percentile);

    let source = band_series(spec.band_source, &series, &smoothed);
    let bands = PercentileModel::build(source, config.leap_policy);

    let current = source.latest_value(config.as_of);
    let band = current.and_then(|(date, _)| bands.band_for_date(&date));
    let status = classify(current.map(|(_, v)| v), band, spec.polarity);
    match &status {
        Ok(label) => debug!("{}: {} -> {}", site_id, current.map_or(0.0, |(_, v)| v), label),
        Err(e) => warn!("{}: {}", site_id, e),
    }
    let snapshot = SiteSnapshot {
        site_id: site_id.to_string(),
        date: current.map(|(date, _)| date),
        value: current.map(|(_, v)| v),
        status,
    };

    Ok(SiteOutput {
        normalized: series,
        report,
        smoothed,
        cumulative,
        monthly,
        annual,
        peaks,
        bands,
        snapshot,
    })
}

/// Percentile models only, for every site measuring the configured parameter.
pub fn build_bands(
    config: &PipelineConfig,
    observations: Vec<Observation>,
) -> (Vec<PercentileModel>, Vec<SiteFailure>) {
    let spec = &config.parameter;
    let mut models = Vec::new();
    let mut failed = Vec::new();
    for (key, records) in group_by_series(observations) {
        if key.parameter != spec.name {
            continue;
        }
        let series = match normalize(spec, &key.site_id, &records) {
            Ok(normalized) => normalized.series,
            Err(error) => {
                warn!("{}: {}", key, error);
                failed.push(SiteFailure {
                    site_id: key.site_id,
                    error,
                });
                continue;
            }
        };
        let smoothed = moving_average(&series, spec.window);
        let source = band_series(spec.band_source, &series, &smoothed);
        models.push(PercentileModel::build(source, config.leap_policy));
    }
    (models, failed)
}

/// Run the whole domain. Records of other parameters are counted and ignored.
pub fn run_pipeline(
    config: &PipelineConfig,
    observations: Vec<Observation>,
    features: Option<&FeatureCollection>,
) -> PipelineOutput {
    let total = observations.len();
    let mut skipped_records = 0;
    let mut sites = Vec::new();
    let mut failed = Vec::new();

    for (key, records) in group_by_series(observations) {
        if key.parameter != config.parameter.name {
            skipped_records += records.len();
            continue;
        }
        match process_site(config, &key.site_id, &records) {
            Ok(site) => sites.push(site),
            Err(error) => {
                warn!("{}: {}", key, error);
                failed.push(SiteFailure {
                    site_id: key.site_id,
                    error,
                });
            }
        }
    }
    if skipped_records > 0 {
        info!(
            "Skipped {} of {} records not measuring {}",
            skipped_records, total, config.parameter.name
        );
    }

    let mut output = PipelineOutput {
        domain: config.domain,
        sites,
        failed,
        skipped_records,
        merge: None,
    };
    if let Some(collection) = features {
        let merged = merge_snapshots(collection, &config.id_property, &output.snapshots());
        info!(
            "{}: updated {} of {} features",
            config.domain,
            merged.updated,
            collection.features.len()
        );
        output.merge = Some(merged);
    }
    info!(
        "{}: {} sites processed, {} failed",
        config.domain,
        output.sites.len(),
        output.failed.len()
    );
    output
}
