use std::collections::BTreeMap;

use aoi::AoiPolicy;
use foundation::{DatasetId, TimeDensity};
use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::params::DatasetEntry;
use crate::view::{ColorMapScale, DEFAULT_CENTER, DEFAULT_COLOR_MAP, DEFAULT_ZOOM, ViewMode};

/// A dataset the content layer knows about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetConfig {
    pub id: DatasetId,
    pub time_density: TimeDensity,
}

/// Session defaults supplied by the content/config collaborator.
///
/// Every field is optional in JSON; missing fields take the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExplorationConfig {
    pub center: [f64; 2],
    pub zoom: f64,
    pub color_map: String,
    pub color_map_scale: Option<ColorMapScale>,
    pub view_mode: ViewMode,
    pub aoi_policy: AoiPolicy,
    /// Padding in pixels for AOI `fit_bounds` calls.
    pub fit_padding: u32,
    /// Datasets opened when the URL names none. Also the density lookup for
    /// datasets restored from a permalink.
    pub datasets: Vec<DatasetConfig>,
    pub aoi_presets: BTreeMap<String, FeatureCollection>,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        let mut aoi_presets = BTreeMap::new();
        aoi_presets.insert("world".to_string(), world_preset());
        Self {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            color_map: DEFAULT_COLOR_MAP.to_string(),
            color_map_scale: None,
            view_mode: ViewMode::Default,
            aoi_policy: AoiPolicy::Single,
            fit_padding: 60,
            datasets: Vec::new(),
            aoi_presets,
        }
    }
}

impl ExplorationConfig {
    pub fn from_json(raw: &str) -> Result<Self, SessionError> {
        serde_json::from_str(raw).map_err(|e| SessionError::Config(e.to_string()))
    }

    /// Entries opened when the URL carries no `datasets` parameter.
    pub fn default_datasets(&self) -> Vec<DatasetEntry> {
        self.datasets
            .iter()
            .map(|d| DatasetEntry::new(d.id.clone()))
            .collect()
    }

    /// Density for `id`; datasets missing from the config load at day
    /// granularity.
    pub fn density_of(&self, id: &str) -> TimeDensity {
        self.datasets
            .iter()
            .find(|d| d.id.as_str() == id)
            .map(|d| d.time_density)
            .unwrap_or(TimeDensity::Day)
    }
}

fn world_preset() -> FeatureCollection {
    let ring = [
        [-180.0, -89.0],
        [180.0, -89.0],
        [180.0, 89.0],
        [-180.0, 89.0],
        [-180.0, -89.0],
    ]
    .iter()
    .map(|p: &[f64; 2]| p.to_vec())
    .collect();
    FeatureCollection {
        bbox: None,
        features: vec![Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Polygon(vec![ring]))),
            id: None,
            properties: None,
            foreign_members: None,
        }],
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ExplorationConfig::from_json(
            r#"{ "zoom": 3, "datasets": [{ "id": "no2", "timeDensity": "month" }] }"#,
        )
        .unwrap();
        assert_eq!(config.zoom, 3.0);
        assert_eq!(config.color_map, "viridis");
        assert_eq!(config.density_of("no2"), TimeDensity::Month);
        assert_eq!(config.density_of("unknown"), TimeDensity::Day);
        assert!(config.aoi_presets.contains_key("world"));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(matches!(
            ExplorationConfig::from_json("{ zoom: }"),
            Err(SessionError::Config(_))
        ));
    }
}
