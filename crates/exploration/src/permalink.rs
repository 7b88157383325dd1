use aoi::AoiCollection;
use chrono::NaiveDate;
use foundation::DateDomain;
use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use urlstate::{MemoryLocation, QueryParams};

use crate::config::ExplorationConfig;
use crate::error::SessionError;
use crate::params::{DatasetEntry, TaxonomyFilters, UrlParams};
use crate::view::{ColorMapScale, ViewMode};

/// Everything a permalink carries, as plain data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PermalinkState {
    pub datasets: Vec<DatasetEntry>,
    pub date: Option<NaiveDate>,
    pub date_compare: Option<NaiveDate>,
    pub date_range: Option<DateDomain>,
    pub aoi: Option<FeatureCollection>,
    pub center: [f64; 2],
    pub zoom: f64,
    pub color_map: String,
    pub color_map_scale: Option<ColorMapScale>,
    pub reverse_color_map: bool,
    pub view_mode: ViewMode,
    pub is_embedded: bool,
    pub taxonomy: TaxonomyFilters,
}

impl Default for PermalinkState {
    fn default() -> Self {
        Self::defaults(&ExplorationConfig::default())
    }
}

impl PermalinkState {
    pub fn defaults(config: &ExplorationConfig) -> Self {
        Self {
            datasets: config.default_datasets(),
            date: None,
            date_compare: None,
            date_range: None,
            aoi: None,
            center: config.center,
            zoom: config.zoom,
            color_map: config.color_map.clone(),
            color_map_scale: config.color_map_scale,
            reverse_color_map: false,
            view_mode: ViewMode::Default,
            is_embedded: false,
            taxonomy: TaxonomyFilters::new(),
        }
    }

    /// Hydrates every parameter; malformed ones fall back to defaults.
    pub fn from_query(search: &str, config: &ExplorationConfig) -> Result<Self, SessionError> {
        let params = UrlParams::hydrated(config, &MemoryLocation::new(search))?;
        Ok(Self::from_params(&params))
    }

    /// Like [`PermalinkState::from_query`], but a present-and-malformed
    /// parameter is an error.
    pub fn from_query_strict(search: &str, config: &ExplorationConfig) -> Result<Self, SessionError> {
        let params = UrlParams::new(config)?;
        params.check(&QueryParams::parse(search))?;
        Self::from_query(search, config)
    }

    pub fn from_params(params: &UrlParams) -> Self {
        let view = params.view();
        Self {
            datasets: params.datasets.get().clone(),
            date: *params.date.get(),
            date_compare: *params.date_compare.get(),
            date_range: *params.date_range.get(),
            aoi: params.aoi.get().as_ref().map(AoiCollection::to_geojson),
            center: view.center,
            zoom: view.zoom,
            color_map: view.color_map,
            color_map_scale: view.color_map_scale,
            reverse_color_map: view.reverse_color_map,
            view_mode: view.view_mode,
            is_embedded: view.is_embedded,
            taxonomy: params.taxonomy.get().clone(),
        }
    }

    /// Canonical query string: defaults omitted, fixed parameter order.
    pub fn to_query(&self, config: &ExplorationConfig) -> Result<String, SessionError> {
        let mut params = UrlParams::new(config)?;
        let aoi = match &self.aoi {
            Some(fc) => {
                let mut n = 0;
                AoiCollection::from_geojson(fc, || {
                    n += 1;
                    format!("aoi-{n}")
                })?
            }
            None => None,
        };

        params.datasets.stage(self.datasets.clone());
        params.date.stage(self.date);
        params.date_compare.stage(self.date_compare);
        params.date_range.stage(self.date_range);
        params.aoi.stage(aoi);
        params.center.stage(self.center);
        params.zoom.stage(self.zoom);
        params.color_map.stage(self.color_map.clone());
        params.color_map_scale.stage(self.color_map_scale);
        params.reverse.stage(self.reverse_color_map);
        params.view_mode.stage(self.view_mode);
        params.embed.stage(self.is_embedded);
        params.taxonomy.stage(self.taxonomy.clone());

        let mut query = QueryParams::new();
        params.flush_into(&mut query);
        Ok(query.to_query_string())
    }
}
