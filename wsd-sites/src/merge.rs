//! Stamp each site's latest value and status onto its map feature.

use crate::feature::{Feature, FeatureCollection};
use chrono::NaiveDate;
use log::warn;
use serde_json::{Number, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use wsd_data::{classify::NO_DATA_LABEL, StatusLabel, Unclassifiable};

/// Feature attribute holding the site's latest value.
pub const CURRENT_VALUE_KEY: &str = "current_value";

/// Feature attribute holding the site's status label.
pub const CURRENT_STATUS_KEY: &str = "current_status";

/// Latest value and classification for one site.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteSnapshot {
    pub site_id: String,
    /// Date the value was observed; `None` when the site has no value at all.
    pub date: Option<NaiveDate>,
    pub value: Option<f64>,
    pub status: Result<StatusLabel, Unclassifiable>,
}

impl SiteSnapshot {
    /// Status text written to the map; `"unknown"` when unclassifiable.
    pub fn status_text(&self) -> &'static str {
        match &self.status {
            Ok(label) => label.as_str(),
            Err(_) => NO_DATA_LABEL,
        }
    }

    fn value_json(&self) -> Value {
        self.value
            .and_then(Number::from_f64)
            .map_or(Value::Null, Value::Number)
    }

    fn apply(&self, feature: &mut Feature) {
        feature
            .properties
            .insert(CURRENT_VALUE_KEY.to_string(), self.value_json());
        feature.properties.insert(
            CURRENT_STATUS_KEY.to_string(),
            Value::String(self.status_text().to_string()),
        );
    }
}

/// A snapshot whose site has no feature in the collection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct UnmatchedSite {
    pub site_id: String,
}

impl fmt::Display for UnmatchedSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unmatched site: {} has no feature", self.site_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub collection: FeatureCollection,
    /// Features that received a snapshot.
    pub updated: usize,
    pub unmatched: Vec<UnmatchedSite>,
}

/// Produce a copy of `collection` where every feature whose site id (read
/// from `id_property`) has a snapshot gets the current value and status
/// attributes overwritten. Other features, geometry, and every other
/// attribute are left as they were. Snapshots without a feature come back
/// in `unmatched`.
pub fn merge_snapshots(
    collection: &FeatureCollection,
    id_property: &str,
    snapshots: &BTreeMap<String, SiteSnapshot>,
) -> MergeOutcome {
    let mut merged = collection.clone();
    let mut matched: BTreeSet<&str> = BTreeSet::new();
    let mut updated = 0;

    for feature in merged.features.iter_mut() {
        let Some(site_id) = feature.site_id(id_property) else {
            continue;
        };
        let found = snapshots.get_key_value(&site_id).or_else(|| {
            snapshots
                .iter()
                .find(|(key, _)| feature.matches_site(id_property, key))
        });
        if let Some((key, snapshot)) = found {
            snapshot.apply(feature);
            matched.insert(key.as_str());
            updated += 1;
        }
    }

    let unmatched: Vec<UnmatchedSite> = snapshots
        .keys()
        .filter(|site_id| !matched.contains(site_id.as_str()))
        .map(|site_id| UnmatchedSite {
            site_id: site_id.clone(),
        })
        .collect();
    for site in &unmatched {
        warn!("{}", site);
    }

    MergeOutcome {
        collection: merged,
        updated,
        unmatched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collection() -> FeatureCollection {
        let value = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature",
                 "geometry": {"type": "Point", "coordinates": [-98.73, 29.79]},
                 "properties": {"site": "A", "name": "Upper", "current_status": "stale"}},
                {"type": "Feature",
                 "geometry": {"type": "Point", "coordinates": [-98.61, 29.71]},
                 "properties": {"site": "B", "name": "Lower"}}
            ]
        });
        serde_json::from_value(value).unwrap()
    }

    fn snapshot(
        site_id: &str,
        value: Option<f64>,
        status: Result<StatusLabel, Unclassifiable>,
    ) -> SiteSnapshot {
        SiteSnapshot {
            site_id: site_id.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, 1),
            value,
            status,
        }
    }

    fn snapshots(list: Vec<SiteSnapshot>) -> BTreeMap<String, SiteSnapshot> {
        list.into_iter().map(|s| (s.site_id.clone(), s)).collect()
    }

    #[test]
    fn test_matching_feature_is_annotated() {
        let input = snapshots(vec![snapshot("A", Some(12.5), Ok(StatusLabel::VeryWet))]);
        let outcome = merge_snapshots(&collection(), "site", &input);
        assert_eq!(outcome.updated, 1);
        assert!(outcome.unmatched.is_empty());
        let a = &outcome.collection.features[0];
        assert_eq!(a.properties[CURRENT_VALUE_KEY], json!(12.5));
        assert_eq!(a.properties[CURRENT_STATUS_KEY], json!("very_wet"));
        assert_eq!(a.properties["name"], json!("Upper"));
        assert_eq!(a.geometry, collection().features[0].geometry);
        assert_eq!(outcome.collection.features[1], collection().features[1]);
    }

    #[test]
    fn test_unclassifiable_writes_unknown() {
        let input = snapshots(vec![snapshot("B", None, Err(Unclassifiable::MissingValue))]);
        let outcome = merge_snapshots(&collection(), "site", &input);
        let b = &outcome.collection.features[1];
        assert_eq!(b.properties[CURRENT_VALUE_KEY], Value::Null);
        assert_eq!(b.properties[CURRENT_STATUS_KEY], json!(NO_DATA_LABEL));
    }

    #[test]
    fn test_unmatched_sites_are_reported() {
        let input = snapshots(vec![
            snapshot("Z", Some(1.0), Ok(StatusLabel::VeryDry)),
            snapshot("A", Some(2.0), Ok(StatusLabel::VeryDry)),
        ]);
        let outcome = merge_snapshots(&collection(), "site", &input);
        assert_eq!(outcome.updated, 1);
        assert_eq!(
            outcome.unmatched,
            vec![UnmatchedSite {
                site_id: "Z".to_string()
            }]
        );
    }

    #[test]
    fn test_numeric_feature_id_matches_zero_padded_snapshot() {
        let collection: FeatureCollection = serde_json::from_value(json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "geometry": null, "properties": {"site": 8185065}}
            ]
        }))
        .unwrap();
        let input = snapshots(vec![snapshot("08185065", Some(7.0), Ok(StatusLabel::VeryWet))]);
        let outcome = merge_snapshots(&collection, "site", &input);
        assert_eq!(outcome.updated, 1);
        assert!(outcome.unmatched.is_empty());
        let feature = &outcome.collection.features[0];
        assert_eq!(feature.properties[CURRENT_STATUS_KEY], json!("very_wet"));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let input = snapshots(vec![
            snapshot("A", Some(3.0), Ok(StatusLabel::ModeratelyDry)),
            snapshot("B", Some(4.0), Err(Unclassifiable::MissingBand)),
        ]);
        let once = merge_snapshots(&collection(), "site", &input);
        let twice = merge_snapshots(&once.collection, "site", &input);
        assert_eq!(twice.collection, once.collection);
        assert_eq!(twice.unmatched, once.unmatched);
    }

    #[test]
    fn test_empty_snapshot_set_changes_nothing() {
        let outcome = merge_snapshots(&collection(), "site", &BTreeMap::new());
        assert_eq!(outcome.collection, collection());
        assert_eq!(outcome.updated, 0);
    }
}
