//! Codecs for the exploration state carried in the URL, and the bundle of
//! stores a session binds to it.

use std::collections::BTreeMap;

use aoi::{AoiCollection, polygon_url_decode, polygon_url_encode};
use chrono::NaiveDate;
use foundation::{DateDomain, DatasetId, format_iso_date, parse_iso_date};
use serde::{Deserialize, Serialize};
use timeline::LayerSettings;
use urlstate::{ParamCodec, ParamKeys, QueryParams, UrlPort, UrlStateError, UrlStore};

use crate::config::ExplorationConfig;
use crate::view::{
    CenterCodec, ColorMapCodec, ColorMapScaleCodec, FlagCodec, ViewModeCodec, ViewParams,
    ZoomCodec,
};

pub const CENTER: &str = "center";
pub const ZOOM: &str = "zoom";
pub const COLOR_MAP: &str = "colorMap";
pub const COLOR_MAP_SCALE: &str = "colorMapScale";
pub const VIEW_MODE: &str = "viewMode";
pub const EMBED: &str = "embed";
pub const REVERSE: &str = "reverse";
pub const DATE: &str = "date";
pub const DATE_COMPARE: &str = "dateCompare";
pub const DATE_RANGE: &str = "dateRange";
pub const DATASETS: &str = "datasets";
pub const TAXONOMY: &str = "taxonomy";
pub const AOI: &str = "aoi";

/// `YYYY-MM-DD`; absent means no date.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateCodec;

impl ParamCodec for DateCodec {
    type Value = Option<NaiveDate>;

    fn initial(&self) -> Option<NaiveDate> {
        None
    }

    fn try_hydrate(&self, raw: &str) -> Result<Option<NaiveDate>, String> {
        parse_iso_date(raw)
            .map(Some)
            .ok_or_else(|| format!("`{raw}` is not an ISO date"))
    }

    fn dehydrate(&self, value: &Option<NaiveDate>) -> String {
        value.map(format_iso_date).unwrap_or_default()
    }
}

/// `start|end`, both ISO dates.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateRangeCodec;

impl ParamCodec for DateRangeCodec {
    type Value = Option<DateDomain>;

    fn initial(&self) -> Option<DateDomain> {
        None
    }

    fn try_hydrate(&self, raw: &str) -> Result<Option<DateDomain>, String> {
        let Some((start, end)) = raw.split_once('|') else {
            return Err("expected `start|end`".to_string());
        };
        let (Some(start), Some(end)) = (parse_iso_date(start), parse_iso_date(end)) else {
            return Err(format!("`{raw}` does not hold two ISO dates"));
        };
        DateDomain::new(start, end)
            .map(Some)
            .ok_or_else(|| format!("inverted range {start} > {end}"))
    }

    fn dehydrate(&self, value: &Option<DateDomain>) -> String {
        match value {
            Some(d) => format!("{}|{}", format_iso_date(d.start()), format_iso_date(d.end())),
            None => String::new(),
        }
    }
}

/// One active dataset as persisted in the URL. Load status and domain are
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub id: DatasetId,
    #[serde(default)]
    pub settings: LayerSettings,
}

impl DatasetEntry {
    pub fn new(id: impl Into<DatasetId>) -> Self {
        Self {
            id: id.into(),
            settings: LayerSettings::default(),
        }
    }
}

/// JSON array of [`DatasetEntry`] in registry order.
///
/// An absent parameter means `default` (the configured datasets). When that
/// list is non-empty, an empty selection is written as `[]`.
#[derive(Debug, Clone, Default)]
pub struct DatasetsCodec {
    pub default: Vec<DatasetEntry>,
}

impl DatasetsCodec {
    pub fn with_default(default: Vec<DatasetEntry>) -> Self {
        Self { default }
    }
}

impl ParamCodec for DatasetsCodec {
    type Value = Vec<DatasetEntry>;

    fn initial(&self) -> Vec<DatasetEntry> {
        self.default.clone()
    }

    fn try_hydrate(&self, raw: &str) -> Result<Vec<DatasetEntry>, String> {
        let entries: Vec<DatasetEntry> = serde_json::from_str(raw).map_err(|e| e.to_string())?;
        Ok(entries
            .into_iter()
            .map(|e| DatasetEntry {
                settings: e.settings.normalized(),
                ..e
            })
            .collect())
    }

    fn dehydrate(&self, value: &Vec<DatasetEntry>) -> String {
        if *value == self.default {
            return String::new();
        }
        serde_json::to_string(value).unwrap_or_default()
    }
}

/// Taxonomy name to selected ids.
pub type TaxonomyFilters = BTreeMap<String, Vec<String>>;

/// JSON object; URL values win key by key over what is already stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaxonomyCodec;

impl ParamCodec for TaxonomyCodec {
    type Value = TaxonomyFilters;

    fn initial(&self) -> TaxonomyFilters {
        TaxonomyFilters::new()
    }

    fn try_hydrate(&self, raw: &str) -> Result<TaxonomyFilters, String> {
        serde_json::from_str(raw).map_err(|e| e.to_string())
    }

    fn dehydrate(&self, value: &TaxonomyFilters) -> String {
        if value.is_empty() {
            return String::new();
        }
        serde_json::to_string(value).unwrap_or_default()
    }

    fn reconcile(&self, from_url: TaxonomyFilters, stored: &TaxonomyFilters) -> TaxonomyFilters {
        let mut merged = stored.clone();
        merged.extend(from_url);
        merged
    }
}

/// Polygon string form of the committed AOI. Compared by geometry so that
/// re-reading a written AOI (which renumbers ids) is an echo.
#[derive(Debug, Clone, Copy, Default)]
pub struct AoiCodec;

impl ParamCodec for AoiCodec {
    type Value = Option<AoiCollection>;

    fn initial(&self) -> Option<AoiCollection> {
        None
    }

    fn try_hydrate(&self, raw: &str) -> Result<Option<AoiCollection>, String> {
        polygon_url_decode(raw).map(Some).map_err(|e| e.to_string())
    }

    fn dehydrate(&self, value: &Option<AoiCollection>) -> String {
        value.as_ref().map(polygon_url_encode).unwrap_or_default()
    }

    fn are_equal(&self, a: &Option<AoiCollection>, b: &Option<AoiCollection>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => a.same_geometry(b),
            _ => false,
        }
    }
}

/// Which groups of parameters an external URL change touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParamChanges {
    pub viewport: bool,
    pub display: bool,
    pub dates: bool,
    pub datasets: bool,
    pub taxonomy: bool,
    pub aoi: bool,
}

impl ParamChanges {
    pub fn any(&self) -> bool {
        self.viewport || self.display || self.dates || self.datasets || self.taxonomy || self.aoi
    }
}

/// Every URL-bound value of one exploration session.
///
/// Field order is the parameter order of a freshly written permalink.
#[derive(Debug)]
pub struct UrlParams {
    pub datasets: UrlStore<DatasetsCodec>,
    pub date: UrlStore<DateCodec>,
    pub date_compare: UrlStore<DateCodec>,
    pub date_range: UrlStore<DateRangeCodec>,
    pub aoi: UrlStore<AoiCodec>,
    pub center: UrlStore<CenterCodec>,
    pub zoom: UrlStore<ZoomCodec>,
    pub color_map: UrlStore<ColorMapCodec>,
    pub color_map_scale: UrlStore<ColorMapScaleCodec>,
    pub reverse: UrlStore<FlagCodec>,
    pub view_mode: UrlStore<ViewModeCodec>,
    pub embed: UrlStore<FlagCodec>,
    pub taxonomy: UrlStore<TaxonomyCodec>,
}

impl UrlParams {
    /// Unhydrated stores with defaults taken from `config`.
    pub fn new(config: &ExplorationConfig) -> Result<Self, UrlStateError> {
        let mut keys = ParamKeys::new();
        Ok(Self {
            datasets: keys.bind(DATASETS, DatasetsCodec::with_default(config.default_datasets()))?,
            date: keys.bind(DATE, DateCodec)?,
            date_compare: keys.bind(DATE_COMPARE, DateCodec)?,
            date_range: keys.bind(DATE_RANGE, DateRangeCodec)?,
            aoi: keys.bind(AOI, AoiCodec)?,
            center: keys.bind(
                CENTER,
                CenterCodec {
                    default: config.center,
                },
            )?,
            zoom: keys.bind(
                ZOOM,
                ZoomCodec {
                    default: config.zoom,
                },
            )?,
            color_map: keys.bind(
                COLOR_MAP,
                ColorMapCodec {
                    default: config.color_map.clone(),
                },
            )?,
            color_map_scale: keys.bind(
                COLOR_MAP_SCALE,
                ColorMapScaleCodec {
                    default: config.color_map_scale,
                },
            )?,
            reverse: keys.bind(REVERSE, FlagCodec)?,
            view_mode: keys.bind(VIEW_MODE, ViewModeCodec)?,
            embed: keys.bind(EMBED, FlagCodec)?,
            taxonomy: keys.bind(TAXONOMY, TaxonomyCodec)?,
        })
    }

    pub fn hydrated<P: UrlPort + ?Sized>(
        config: &ExplorationConfig,
        port: &P,
    ) -> Result<Self, UrlStateError> {
        let mut params = Self::new(config)?;
        params.sync_from_url(port);
        Ok(params)
    }

    /// Re-reads every parameter; only values that differ are replaced.
    pub fn sync_from_url<P: UrlPort + ?Sized>(&mut self, port: &P) -> ParamChanges {
        // Bitwise `|` so every store syncs.
        ParamChanges {
            viewport: self.center.sync_from_url(port) | self.zoom.sync_from_url(port),
            display: self.color_map.sync_from_url(port)
                | self.color_map_scale.sync_from_url(port)
                | self.reverse.sync_from_url(port)
                | self.view_mode.sync_from_url(port)
                | self.embed.sync_from_url(port),
            dates: self.date.sync_from_url(port)
                | self.date_compare.sync_from_url(port)
                | self.date_range.sync_from_url(port),
            datasets: self.datasets.sync_from_url(port),
            taxonomy: self.taxonomy.sync_from_url(port),
            aoi: self.aoi.sync_from_url(port),
        }
    }

    /// Writes every staged value into `params`. Returns `true` if anything
    /// changed.
    pub fn flush_into(&mut self, params: &mut QueryParams) -> bool {
        let mut changed = false;
        changed |= self.datasets.flush_into(params);
        changed |= self.date.flush_into(params);
        changed |= self.date_compare.flush_into(params);
        changed |= self.date_range.flush_into(params);
        changed |= self.aoi.flush_into(params);
        changed |= self.center.flush_into(params);
        changed |= self.zoom.flush_into(params);
        changed |= self.color_map.flush_into(params);
        changed |= self.color_map_scale.flush_into(params);
        changed |= self.reverse.flush_into(params);
        changed |= self.view_mode.flush_into(params);
        changed |= self.embed.flush_into(params);
        changed |= self.taxonomy.flush_into(params);
        changed
    }

    pub fn is_dirty(&self) -> bool {
        self.datasets.is_dirty()
            || self.date.is_dirty()
            || self.date_compare.is_dirty()
            || self.date_range.is_dirty()
            || self.aoi.is_dirty()
            || self.center.is_dirty()
            || self.zoom.is_dirty()
            || self.color_map.is_dirty()
            || self.color_map_scale.is_dirty()
            || self.reverse.is_dirty()
            || self.view_mode.is_dirty()
            || self.embed.is_dirty()
            || self.taxonomy.is_dirty()
    }

    pub fn view(&self) -> ViewParams {
        ViewParams {
            center: *self.center.get(),
            zoom: *self.zoom.get(),
            color_map: self.color_map.get().clone(),
            color_map_scale: *self.color_map_scale.get(),
            view_mode: *self.view_mode.get(),
            is_embedded: *self.embed.get(),
            reverse_color_map: *self.reverse.get(),
        }
    }

    /// Fails on the first parameter that is present but unparseable.
    pub fn check(&self, params: &QueryParams) -> Result<(), UrlStateError> {
        self.datasets.try_read(params)?;
        self.date.try_read(params)?;
        self.date_compare.try_read(params)?;
        self.date_range.try_read(params)?;
        self.aoi.try_read(params)?;
        self.center.try_read(params)?;
        self.zoom.try_read(params)?;
        self.color_map.try_read(params)?;
        self.color_map_scale.try_read(params)?;
        self.reverse.try_read(params)?;
        self.view_mode.try_read(params)?;
        self.embed.try_read(params)?;
        self.taxonomy.try_read(params)?;
        Ok(())
    }
}
