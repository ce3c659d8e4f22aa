use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// GeoJSON `type` of a single feature.
pub const FEATURE_TYPE: &str = "Feature";

/// GeoJSON `type` of a feature collection.
pub const FEATURE_COLLECTION_TYPE: &str = "FeatureCollection";

/// One GeoJSON feature. Geometry is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub geometry: Value,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Feature {
    /// Site id from the `id_property` attribute, falling back to the
    /// feature-level `id`. Numeric ids come back in their text form, so a
    /// registry that stored `08185065` as a number yields `"8185065"`; use
    /// [`Feature::matches_site`] to compare against zero-padded ids.
    pub fn site_id(&self, id_property: &str) -> Option<String> {
        self.id_value(id_property).and_then(id_text)
    }

    /// Whether this feature belongs to `site_id`. An id stored as a JSON
    /// number also matches the same digits with leading zeros.
    pub fn matches_site(&self, id_property: &str, site_id: &str) -> bool {
        let Some(value) = self.id_value(id_property) else {
            return false;
        };
        match (value, id_text(value)) {
            (_, Some(text)) if text == site_id => true,
            (Value::Number(_), Some(text)) => {
                !site_id.is_empty()
                    && site_id.bytes().all(|b| b.is_ascii_digit())
                    && site_id.trim_start_matches('0') == text.trim_start_matches('0')
            }
            _ => false,
        }
    }

    fn id_value(&self, id_property: &str) -> Option<&Value> {
        self.properties
            .get(id_property)
            .filter(|v| id_text(v).is_some())
            .or(self.id.as_ref())
    }
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A GeoJSON feature collection. Top-level members other than `type` and
/// `features` (`crs`, `name`, ...) are preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<Feature>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        FeatureCollection {
            kind: FEATURE_COLLECTION_TYPE.to_string(),
            features,
            extra: Map::new(),
        }
    }

    pub fn from_json_str(s: &str) -> serde_json::Result<FeatureCollection> {
        serde_json::from_str(s)
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn find(&self, id_property: &str, site_id: &str) -> Option<&Feature> {
        self.features
            .iter()
            .find(|f| f.matches_site(id_property, site_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITES: &str = r#"{
  "type": "FeatureCollection",
  "name": "usgs_sites",
  "features": [
    {"type": "Feature", "geometry": {"type": "Point", "coordinates": [-98.73, 29.79]},
     "properties": {"site": "08185065", "name": "Cibolo Ck nr Boerne"}},
    {"type": "Feature", "id": 3, "geometry": {"type": "Point", "coordinates": [-98.70, 29.80]},
     "properties": {"site": 8186000}},
    {"type": "Feature", "id": "well-7", "geometry": null, "properties": {}}
  ]
}"#;

    #[test]
    fn test_parse_geojson() {
        let collection = FeatureCollection::from_json_str(SITES).unwrap();
        assert_eq!(collection.kind, FEATURE_COLLECTION_TYPE);
        assert_eq!(collection.features.len(), 3);
        assert_eq!(collection.extra["name"], "usgs_sites");
        assert_eq!(collection.features[0].site_id("site").as_deref(), Some("08185065"));
        assert_eq!(collection.features[1].site_id("site").as_deref(), Some("8186000"));
        assert_eq!(collection.features[2].site_id("site").as_deref(), Some("well-7"));
        assert!(collection.find("site", "08185065").is_some());
        assert!(collection.find("site", "nope").is_none());
    }

    #[test]
    fn test_numeric_id_matches_zero_padded_site() {
        let collection = FeatureCollection::from_json_str(SITES).unwrap();
        let numeric = &collection.features[1];
        assert!(numeric.matches_site("site", "8186000"));
        assert!(numeric.matches_site("site", "08186000"));
        assert!(!numeric.matches_site("site", "8186001"));
        assert!(collection.find("site", "008186000").is_some());

        // String ids are compared exactly.
        let text = &collection.features[0];
        assert!(text.matches_site("site", "08185065"));
        assert!(!text.matches_site("site", "8185065"));
    }

    #[test]
    fn test_json_round_trip_keeps_extra_members() {
        let collection = FeatureCollection::from_json_str(SITES).unwrap();
        let text = collection.to_json_string().unwrap();
        let again = FeatureCollection::from_json_str(&text).unwrap();
        assert_eq!(again, collection);
        assert!(text.contains("\"name\": \"usgs_sites\""));
    }
}
