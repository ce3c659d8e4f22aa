//! Historical percentile bands by calendar position.
//!
//! Every historical value is assigned to a day-of-year bucket, and each
//! bucket gets the p10/p25/p50/p75/p90 of everything that landed in it.
//! The model is rebuilt from scratch from the full record; it is never
//! updated in place.

use chrono::Datelike;
use log::debug;
use serde::{Deserialize, Serialize};
use wsd_series::{
    calendar::DAYS_PER_YEAR, DayOfYear, LeapDayPolicy, NormalizedSeries,
};

/// Percentile of sorted values, linearly interpolated between the two
/// bracketing order statistics.
///
/// The rank is `1 + p * (n - 1)` counting from one, so for `[1, 2, 3, 4, 5]`
/// p90 sits at rank 4.6 and evaluates to 4.6. `p` is clamped to `[0, 1]`.
pub fn quantile(sorted: &[f64], p: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let h = p.clamp(0.0, 1.0) * last as f64;
    let lower = h.floor() as usize;
    let upper = h.ceil() as usize;
    let fraction = h - lower as f64;
    Some(sorted[lower] + fraction * (sorted[upper] - sorted[lower]))
}

/// Sort a copy of `values` and take its percentile.
pub fn quantile_of(values: &[f64], p: f64) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    quantile(&sorted, p)
}

/// The five-number historical distribution for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileBand {
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
}

impl PercentileBand {
    pub fn from_sorted(sorted: &[f64]) -> Option<PercentileBand> {
        let p10 = quantile(sorted, 0.10)?;
        // Interpolation rounding can put a higher percentile a hair below the
        // one before it; ties are fine, inversions are not.
        let p25 = quantile(sorted, 0.25)?.max(p10);
        let p50 = quantile(sorted, 0.50)?.max(p25);
        let p75 = quantile(sorted, 0.75)?.max(p50);
        let p90 = quantile(sorted, 0.90)?.max(p75);
        Some(PercentileBand {
            p10,
            p25,
            p50,
            p75,
            p90,
        })
    }

    pub fn is_ordered(&self) -> bool {
        self.p10 <= self.p25 && self.p25 <= self.p50 && self.p50 <= self.p75 && self.p75 <= self.p90
    }
}

/// Band plus the sample it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayOfYearStats {
    pub day_of_year: DayOfYear,
    pub n_obs: usize,
    pub min: f64,
    pub max: f64,
    pub start_year: i32,
    pub end_year: i32,
    pub band: PercentileBand,
}

/// Day-of-year percentile bands for one site and parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct PercentileModel {
    pub site_id: String,
    pub parameter: String,
    pub leap_policy: LeapDayPolicy,
    days: Vec<Option<DayOfYearStats>>,
}

impl PercentileModel {
    /// Build bands from every non-missing value of `history`.
    ///
    /// Buckets that received no value have no band. A single value is
    /// enough for a band; callers judge confidence from `n_obs`.
    pub fn build(history: &NormalizedSeries, leap_policy: LeapDayPolicy) -> PercentileModel {
        let mut buckets: Vec<Vec<(i32, f64)>> = vec![Vec::new(); DAYS_PER_YEAR];
        for point in history.points() {
            let Some(value) = point.value.value() else {
                continue;
            };
            if let Some(day) = DayOfYear::from_date(&point.date, leap_policy) {
                buckets[day.index()].push((point.date.year(), value));
            }
        }

        let days: Vec<Option<DayOfYearStats>> = DayOfYear::all()
            .zip(buckets)
            .map(|(day_of_year, bucket)| {
                let start_year = bucket.iter().map(|(year, _)| *year).min()?;
                let end_year = bucket.iter().map(|(year, _)| *year).max()?;
                let mut sorted: Vec<f64> = bucket.iter().map(|(_, v)| *v).collect();
                sorted.sort_by(|a, b| a.total_cmp(b));
                let band = PercentileBand::from_sorted(&sorted)?;
                Some(DayOfYearStats {
                    day_of_year,
                    n_obs: sorted.len(),
                    min: sorted[0],
                    max: sorted[sorted.len() - 1],
                    start_year,
                    end_year,
                    band,
                })
            })
            .collect();

        let model = PercentileModel {
            site_id: history.site_id.clone(),
            parameter: history.parameter.clone(),
            leap_policy,
            days,
        };
        debug!(
            "{}/{}: bands for {} of {} days",
            model.site_id,
            model.parameter,
            model.covered_days(),
            DAYS_PER_YEAR
        );
        model
    }

    pub fn stats(&self, day: DayOfYear) -> Option<&DayOfYearStats> {
        self.days[day.index()].as_ref()
    }

    pub fn band(&self, day: DayOfYear) -> Option<&PercentileBand> {
        self.stats(day).map(|s| &s.band)
    }

    /// Band for the bucket `date` falls in under this model's leap policy.
    pub fn band_for_date(&self, date: &chrono::NaiveDate) -> Option<&PercentileBand> {
        DayOfYear::from_date(date, self.leap_policy).and_then(|day| self.band(day))
    }

    /// Populated buckets in day order.
    pub fn iter(&self) -> impl Iterator<Item = &DayOfYearStats> {
        self.days.iter().flatten()
    }

    pub fn covered_days(&self) -> usize {
        self.iter().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use wsd_series::Reading;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// Daily series from `start` with the given values.
    fn series(start: NaiveDate, values: Vec<Reading>) -> NormalizedSeries {
        NormalizedSeries {
            site_id: "A".to_string(),
            parameter: "discharge".to_string(),
            unit: "cfs".to_string(),
            start,
            values,
        }
    }

    /// One value per year on January 15, nothing else.
    fn jan_15_history(values: &[f64]) -> NormalizedSeries {
        let start = NaiveDate::from_ymd_opt(2016, 1, 15).unwrap();
        let end = NaiveDate::from_ymd_opt(2016 + values.len() as i32 - 1, 1, 15).unwrap();
        let days = (end - start).num_days() as usize + 1;
        let mut readings = vec![Reading::Missing; days];
        for (i, v) in values.iter().enumerate() {
            let date = NaiveDate::from_ymd_opt(2016 + i as i32, 1, 15).unwrap();
            readings[(date - start).num_days() as usize] = Reading::Value(*v);
        }
        series(start, readings)
    }

    #[test]
    fn test_quantile_linear_interpolation() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(close(quantile(&sorted, 0.5).unwrap(), 3.0));
        assert!(close(quantile(&sorted, 0.9).unwrap(), 4.6));
        assert!(close(quantile(&sorted, 0.25).unwrap(), 2.0));
        assert!(close(quantile(&sorted, 0.0).unwrap(), 1.0));
        assert!(close(quantile(&sorted, 1.0).unwrap(), 5.0));
        assert!(close(quantile(&[7.0], 0.9).unwrap(), 7.0));
        assert_eq!(quantile(&[], 0.5), None);
        assert!(close(quantile_of(&[5.0, 1.0, 4.0, 2.0, 3.0], 0.9).unwrap(), 4.6));
    }

    #[test]
    fn test_day_15_scenario() {
        let history = jan_15_history(&[3.0, 1.0, 5.0, 2.0, 4.0]);
        let model = PercentileModel::build(&history, LeapDayPolicy::FoldIntoFeb28);
        let day = DayOfYear::new(15).unwrap();
        let stats = model.stats(day).unwrap();
        assert_eq!(stats.n_obs, 5);
        assert_eq!(stats.start_year, 2016);
        assert_eq!(stats.end_year, 2020);
        assert!(close(stats.min, 1.0));
        assert!(close(stats.max, 5.0));
        assert!(close(stats.band.p50, 3.0));
        assert!(close(stats.band.p90, 4.6));
        assert_eq!(model.covered_days(), 1);
        assert!(model.band(DayOfYear::new(16).unwrap()).is_none());
    }

    #[test]
    fn test_bands_are_ordered() {
        let start = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
        let values = (0..365 * 6)
            .map(|i| {
                let wobble = ((i * 7919) % 113) as f64 / 10.0;
                if i % 11 == 0 {
                    Reading::Missing
                } else {
                    Reading::Value(wobble + (i % 365) as f64 * 0.1)
                }
            })
            .collect();
        let model = PercentileModel::build(&series(start, values), LeapDayPolicy::FoldIntoFeb28);
        assert_eq!(model.covered_days(), 365);
        for stats in model.iter() {
            assert!(stats.band.is_ordered(), "day {}", stats.day_of_year);
            assert!(stats.min <= stats.band.p10 && stats.band.p90 <= stats.max);
        }
    }

    #[test]
    fn test_leap_day_policies() {
        let feb_28 = NaiveDate::from_ymd_opt(2020, 2, 28).unwrap();
        let history = series(feb_28, vec![Reading::Value(1.0), Reading::Value(9.0)]);
        let day_59 = DayOfYear::new(59).unwrap();
        let day_60 = DayOfYear::new(60).unwrap();

        let folded = PercentileModel::build(&history, LeapDayPolicy::FoldIntoFeb28);
        assert_eq!(folded.stats(day_59).unwrap().n_obs, 2);
        assert!(folded.stats(day_60).is_none());

        let skipped = PercentileModel::build(&history, LeapDayPolicy::Skip);
        assert_eq!(skipped.stats(day_59).unwrap().n_obs, 1);
        assert!(skipped.stats(day_60).is_none());

        let ordinal = PercentileModel::build(&history, LeapDayPolicy::CalendarOrdinal);
        assert_eq!(ordinal.stats(day_59).unwrap().n_obs, 1);
        assert!(close(ordinal.stats(day_60).unwrap().band.p50, 9.0));

        let feb_29 = NaiveDate::from_ymd_opt(2020, 2, 29).unwrap();
        assert!(folded.band_for_date(&feb_29).is_some());
        assert!(skipped.band_for_date(&feb_29).is_none());
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let history = jan_15_history(&[2.0, 8.0, 4.0, 6.0]);
        let first = PercentileModel::build(&history, LeapDayPolicy::FoldIntoFeb28);
        let second = PercentileModel::build(&history, LeapDayPolicy::FoldIntoFeb28);
        assert_eq!(first, second);
    }
}
