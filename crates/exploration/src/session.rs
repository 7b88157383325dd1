use aoi::{ActionOrigin, AoiController, AoiEvent, AoiState, AoiTransition, SyncDecision};
use chrono::NaiveDate;
use foundation::{Bbox, DateDomain, DatasetId, TimeDensity};
use runtime::{EventBus, TaskHandle, TaskSet};
use timeline::{
    DatasetRegistry, DatasetStatus, DateSelection, LayerSettings, LoadState, TemporalCursor,
    Timeline, TimelineDataset, TimelineUpdate,
};
use urlstate::{KeyValueStore, QueryParams, UrlPort, replace_query};

use crate::analysis::AnalysisController;
use crate::config::ExplorationConfig;
use crate::error::SessionError;
use crate::map::{FitOptions, LayerSpec, MapPort};
use crate::params::{DatasetEntry, ParamChanges, TaxonomyFilters, UrlParams};
use crate::permalink::PermalinkState;
use crate::view::{ColorMapScale, ViewMode, ViewParams};

/// Result reported by the data-fetch collaborator: the dataset's valid
/// domain, or an error message.
pub type LoadOutcome = Result<DateDomain, String>;

/// What a back/forward navigation changed, plus loads to start for datasets
/// it brought back.
#[derive(Debug)]
pub struct Navigation {
    pub changes: ParamChanges,
    pub loads: Vec<TaskHandle<DatasetId>>,
}

/// One exploration page: owns the registry, cursor, AOI and view state and
/// keeps them in step with the URL and the map.
///
/// Every mutator stages the URL stores it touched and then writes them in a
/// single history replace. Map-move gestures stage only, and write once on
/// [`ExplorationSession::commit_map_move`].
pub struct ExplorationSession<U: UrlPort, M: MapPort, K: KeyValueStore> {
    config: ExplorationConfig,
    url: U,
    map: M,
    kv: K,
    params: UrlParams,
    timeline: Timeline,
    aoi: AoiController,
    analysis: AnalysisController,
    loaders: TaskSet<DatasetId>,
    events: EventBus,
}

impl<U: UrlPort, M: MapPort, K: KeyValueStore> ExplorationSession<U, M, K> {
    /// Hydrates from the current URL. Datasets come from the `datasets`
    /// parameter, or from the config when the parameter is absent; loads are not
    /// started (see [`ExplorationSession::begin_pending_loads`]).
    pub fn new(config: ExplorationConfig, url: U, map: M, kv: K) -> Result<Self, SessionError> {
        let params = UrlParams::hydrated(&config, &url)?;
        let mut session = Self {
            aoi: AoiController::new(config.aoi_policy),
            config,
            url,
            map,
            kv,
            params,
            timeline: Timeline::new(),
            analysis: AnalysisController::new(),
            loaders: TaskSet::new(),
            events: EventBus::new(),
        };

        let entries = session.params.datasets.get().clone();
        for entry in entries {
            session.open_dataset(entry);
        }

        let (selected, compare, interval) = session.cursor_params();
        session.timeline.restore_cursor(selected, compare, interval);
        if let Some(collection) = session.params.aoi.get().clone() {
            session.aoi.restore(Some(collection));
        }
        session.stage_datasets();

        session.events.emit(
            "session.started",
            format!("datasets={}", session.timeline.registry().len()),
        );
        Ok(session)
    }

    pub fn config(&self) -> &ExplorationConfig {
        &self.config
    }

    pub fn url(&self) -> &U {
        &self.url
    }

    /// The location itself, for hosts that change it outside the session
    /// (back/forward). Follow such changes with
    /// [`ExplorationSession::handle_navigation`].
    pub fn url_mut(&mut self) -> &mut U {
        &mut self.url
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn registry(&self) -> &DatasetRegistry {
        self.timeline.registry()
    }

    pub fn cursor(&self) -> &TemporalCursor {
        self.timeline.cursor()
    }

    pub fn combined_domain(&self) -> Option<DateDomain> {
        self.timeline.combined_domain()
    }

    pub fn combined_status(&self) -> DatasetStatus {
        self.timeline.registry().combined_status()
    }

    pub fn view(&self) -> ViewParams {
        self.params.view()
    }

    pub fn taxonomy(&self) -> &TaxonomyFilters {
        self.params.taxonomy.get()
    }

    pub fn analysis(&self) -> &AnalysisController {
        &self.analysis
    }

    /// URL-facing state as plain data.
    pub fn snapshot(&self) -> PermalinkState {
        PermalinkState::from_params(&self.params)
    }

    // Datasets

    /// Registers `id`, puts its layer on the map and starts its load.
    pub fn add_dataset(
        &mut self,
        id: impl Into<DatasetId>,
        time_density: TimeDensity,
    ) -> Result<TaskHandle<DatasetId>, SessionError> {
        let id = id.into();
        let update = self.timeline.add_dataset(id.clone(), time_density)?;
        self.events.emit("dataset.added", id.as_str());
        self.put_layer(id.as_str());
        self.after_registry(update);
        self.invalidate_analysis();
        self.stage_datasets();
        let handle = self.start_load(id.as_str())?;
        self.flush();
        Ok(handle)
    }

    /// Starts (or restarts) the load for a registered dataset. Any load
    /// already in flight for it is cancelled.
    pub fn begin_load(&mut self, id: &str) -> Result<TaskHandle<DatasetId>, SessionError> {
        let handle = self.start_load(id)?;
        self.flush();
        Ok(handle)
    }

    /// Starts loads for every dataset still idle, e.g. right after
    /// construction.
    pub fn begin_pending_loads(&mut self) -> Vec<TaskHandle<DatasetId>> {
        let idle: Vec<DatasetId> = self
            .timeline
            .registry()
            .iter()
            .filter(|d| d.status() == DatasetStatus::Idle)
            .map(|d| d.id().clone())
            .collect();
        let handles = idle
            .iter()
            .filter_map(|id| self.start_load(id.as_str()).ok())
            .collect();
        self.flush();
        handles
    }

    /// Applies a fetch result. Results for cancelled tasks or removed
    /// datasets are discarded with [`SessionError::StaleLoad`].
    pub fn complete_load(
        &mut self,
        handle: &TaskHandle<DatasetId>,
        outcome: LoadOutcome,
    ) -> Result<TimelineUpdate, SessionError> {
        if !self.loaders.finish(handle) {
            tracing::debug!(id = %handle.key, "discarding stale load result");
            self.events.emit("load.discarded", handle.key.as_str());
            return Err(SessionError::StaleLoad(handle.key.clone()));
        }
        let state = match outcome {
            Ok(domain) => LoadState::Succeeded { domain },
            Err(error) => LoadState::Failed { error },
        };
        self.set_status(handle.key.as_str(), state)
    }

    /// Status entry point for the fetch collaborator. Unknown ids are
    /// reported and change nothing.
    pub fn set_status(&mut self, id: &str, state: LoadState) -> Result<TimelineUpdate, SessionError> {
        let status = state.status();
        let update = self.timeline.set_status(id, state)?;
        self.events
            .emit("dataset.status", format!("{id}={}", status_name(status)));
        self.after_registry(update);
        self.flush();
        Ok(update)
    }

    pub fn remove_dataset(&mut self, id: &str) -> Result<TimelineDataset, SessionError> {
        let (removed, update) = self.timeline.remove_dataset(id)?;
        self.loaders.cancel(removed.id());
        self.map.remove_layer(id);
        self.events.emit("dataset.removed", id);
        self.after_registry(update);
        self.invalidate_analysis();
        self.stage_datasets();
        self.flush();
        Ok(removed)
    }

    pub fn set_dataset_settings(
        &mut self,
        id: &str,
        settings: LayerSettings,
    ) -> Result<(), SessionError> {
        self.timeline.set_settings(id, settings)?;
        self.put_layer(id);
        self.stage_datasets();
        self.flush();
        Ok(())
    }

    // Dates

    /// Lenient selection: out-of-domain dates are clamped.
    pub fn select_date(&mut self, date: NaiveDate) -> DateSelection {
        let before = self.cursor().clone();
        let selection = self.timeline.select_date(date);
        if selection.clamped {
            self.events.emit(
                "cursor.clamped",
                format!("requested={date} stored={}", selection.date),
            );
        }
        self.after_cursor(&before);
        selection
    }

    /// Strict selection: out-of-domain dates are rejected.
    pub fn set_selected_date(&mut self, date: NaiveDate) -> Result<NaiveDate, SessionError> {
        let before = self.cursor().clone();
        let stored = self.timeline.set_selected_date(date)?;
        self.after_cursor(&before);
        Ok(stored)
    }

    pub fn set_compare_date(
        &mut self,
        date: Option<NaiveDate>,
    ) -> Result<Option<NaiveDate>, SessionError> {
        let before = self.cursor().clone();
        let stored = self.timeline.set_compare_date(date)?;
        self.after_cursor(&before);
        Ok(stored)
    }

    pub fn set_analysis_interval(&mut self, interval: Option<DateDomain>) -> Result<(), SessionError> {
        let before = self.cursor().clone();
        self.timeline.set_analysis_interval(interval)?;
        if before.analysis_interval() != interval {
            self.invalidate_analysis();
        }
        self.after_cursor(&before);
        Ok(())
    }

    // AOI

    pub fn aoi_state(&self) -> &AoiState {
        self.aoi.state()
    }

    pub fn aoi_revision(&self) -> u64 {
        self.aoi.revision()
    }

    pub fn aoi_bbox(&self) -> Option<Bbox> {
        self.aoi.bbox()
    }

    /// Literal midpoint of the AOI bounding box.
    pub fn aoi_center(&self) -> Option<[f64; 2]> {
        self.aoi.center()
    }

    pub fn aoi_area_label(&self) -> String {
        self.aoi.area_label()
    }

    /// Whether `surface` must re-initialise its drawing state.
    pub fn aoi_sync(&self, surface: ActionOrigin, seen_revision: u64) -> SyncDecision {
        self.aoi.sync_decision(surface, seen_revision)
    }

    pub fn dispatch_aoi(
        &mut self,
        origin: ActionOrigin,
        event: AoiEvent,
    ) -> Result<AoiTransition, SessionError> {
        let transition = self.aoi.dispatch(origin, event)?;
        if !transition.geometry_changed {
            return Ok(transition);
        }

        let collection = self.aoi.collection().cloned();
        let kind = if collection.is_some() {
            "aoi.committed"
        } else {
            "aoi.cleared"
        };
        self.events.emit(
            kind,
            format!("origin={origin:?} area={}", self.aoi.area_label()),
        );
        self.params.aoi.stage(collection);
        self.invalidate_analysis();
        // Map-origin edits are already where the user put them.
        if origin == ActionOrigin::Panel
            && let Some(bbox) = self.aoi.bbox()
        {
            let options = FitOptions {
                padding: self.config.fit_padding,
            };
            self.map.fit_bounds(bbox, options);
        }
        self.flush();
        Ok(transition)
    }

    pub fn apply_aoi_preset(&mut self, name: &str) -> Result<AoiTransition, SessionError> {
        let collection = self
            .config
            .aoi_presets
            .get(name)
            .cloned()
            .ok_or_else(|| SessionError::UnknownPreset(name.to_string()))?;
        self.dispatch_aoi(ActionOrigin::Panel, AoiEvent::Set { collection })
    }

    // View

    /// Non-finite coordinates are rejected and leave the view unchanged.
    pub fn set_center(&mut self, center: [f64; 2]) -> bool {
        if !finite_viewport(center, *self.params.zoom.get()) {
            return false;
        }
        self.params.center.stage(center);
        self.flush()
    }

    pub fn set_zoom(&mut self, zoom: f64) -> bool {
        if !finite_viewport(*self.params.center.get(), zoom) {
            return false;
        }
        self.params.zoom.stage(zoom);
        self.flush()
    }

    /// Moves the map and records the new viewport.
    pub fn fly_to(&mut self, center: [f64; 2], zoom: f64) -> bool {
        if !finite_viewport(center, zoom) {
            return false;
        }
        self.map.fly_to(center, zoom);
        self.params.center.stage(center);
        self.params.zoom.stage(zoom);
        self.flush()
    }

    /// Centres the map on the AOI midpoint. Returns `false` with no AOI.
    pub fn fly_to_aoi(&mut self, zoom: f64) -> bool {
        match self.aoi.center() {
            Some(center) => {
                self.fly_to(center, zoom);
                true
            }
            None => false,
        }
    }

    /// Viewport update while the user drags or zooms; nothing is written.
    pub fn map_moved(&mut self, center: [f64; 2], zoom: f64) {
        if !finite_viewport(center, zoom) {
            return;
        }
        self.params.center.stage(center);
        self.params.zoom.stage(zoom);
    }

    /// Ends a move gesture with at most one history write.
    pub fn commit_map_move(&mut self) -> bool {
        self.flush()
    }

    pub fn set_color_map(&mut self, name: impl Into<String>) -> bool {
        let changed = self.params.color_map.stage(name.into());
        self.after_display(changed)
    }

    pub fn set_color_map_scale(&mut self, scale: Option<ColorMapScale>) -> bool {
        let changed = self.params.color_map_scale.stage(scale);
        self.after_display(changed)
    }

    pub fn set_reverse_color_map(&mut self, reverse: bool) -> bool {
        let changed = self.params.reverse.stage(reverse);
        self.after_display(changed)
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) -> bool {
        self.params.view_mode.stage(mode);
        self.flush()
    }

    pub fn set_embedded(&mut self, embedded: bool) -> bool {
        self.params.embed.stage(embedded);
        self.flush()
    }

    /// Replaces the selection for one taxonomy; empty `ids` drops it.
    pub fn set_taxonomy(&mut self, name: &str, ids: Vec<String>) -> bool {
        let mut next = self.params.taxonomy.get().clone();
        if ids.is_empty() {
            next.remove(name);
        } else {
            next.insert(name.to_string(), ids);
        }
        self.params.taxonomy.stage(next);
        self.flush()
    }

    // Navigation

    /// Re-reads the URL after back/forward navigation and applies whatever
    /// changed. Values equal to the current state are echoes and are ignored.
    pub fn handle_navigation(&mut self) -> Navigation {
        let changes = self.params.sync_from_url(&self.url);
        let mut loads = Vec::new();
        if !changes.any() {
            return Navigation { changes, loads };
        }
        self.events.emit("url.navigated", self.url.search());

        // Read before dataset changes re-stage the cursor.
        let (selected, compare, interval) = self.cursor_params();

        if changes.datasets {
            loads = self.reconcile_datasets();
        }
        if changes.dates || changes.datasets {
            let before = self.cursor().clone();
            let report = self.timeline.restore_cursor(selected, compare, interval);
            if report.any() {
                self.events.emit("cursor.clamped", format!("{report:?}"));
            }
            if before.analysis_interval() != self.cursor().analysis_interval() {
                self.invalidate_analysis();
            }
            self.stage_cursor();
            self.refresh_layers();
        } else if changes.display {
            self.refresh_layers();
        }
        if changes.aoi {
            let transition = self.aoi.restore(self.params.aoi.get().clone());
            if transition.geometry_changed {
                self.invalidate_analysis();
            }
        }
        if changes.viewport {
            let view = self.params.view();
            self.map.fly_to(view.center, view.zoom);
        }
        // Only clamp corrections are written back.
        self.flush();
        Navigation { changes, loads }
    }

    // Analysis

    pub fn start_analysis(&mut self) -> Result<u64, SessionError> {
        let run_id = self.analysis.start(
            self.aoi.collection(),
            self.timeline.cursor().analysis_interval(),
            self.timeline.registry().ids(),
        )?;
        self.events.emit("analysis.started", format!("run={run_id}"));
        Ok(run_id)
    }

    pub fn set_analysis_status(
        &mut self,
        id: &str,
        run_id: u64,
        status: DatasetStatus,
        progress: u8,
    ) -> bool {
        self.analysis.set_status(id, run_id, status, progress)
    }

    // Persistence

    pub fn dismiss_banner(&mut self, key: &str) -> Result<(), SessionError> {
        self.kv.set(&banner_key(key), "true")?;
        Ok(())
    }

    /// Storage failures read as "not dismissed".
    pub fn is_banner_dismissed(&self, key: &str) -> bool {
        match self.kv.get(&banner_key(key)) {
            Ok(value) => value.is_some(),
            Err(error) => {
                tracing::debug!(key, %error, "banner flag unreadable");
                false
            }
        }
    }

    fn open_dataset(&mut self, entry: DatasetEntry) {
        let density = self.config.density_of(entry.id.as_str());
        if let Err(error) = self.timeline.add_dataset(entry.id.clone(), density) {
            tracing::debug!(%error, "skipping dataset");
            return;
        }
        // Registered just above.
        let _ = self.timeline.set_settings(entry.id.as_str(), entry.settings);
        self.events.emit("dataset.added", entry.id.as_str());
        self.put_layer(entry.id.as_str());
    }

    fn start_load(&mut self, id: &str) -> Result<TaskHandle<DatasetId>, SessionError> {
        let Some(dataset) = self.timeline.registry().get(id) else {
            return Err(timeline::RegistryError::NotFound(DatasetId::from(id)).into());
        };
        let handle = self.loaders.spawn(dataset.id().clone());
        let update = self.timeline.set_status(id, LoadState::Loading)?;
        self.events.emit("dataset.loading", id);
        self.after_registry(update);
        Ok(handle)
    }

    /// Makes the registry match the `datasets` parameter after navigation.
    fn reconcile_datasets(&mut self) -> Vec<TaskHandle<DatasetId>> {
        let wanted = self.params.datasets.get().clone();
        let stale: Vec<DatasetId> = self
            .timeline
            .registry()
            .ids()
            .into_iter()
            .filter(|id| !wanted.iter().any(|e| &e.id == id))
            .collect();
        for id in stale {
            if let Ok((removed, update)) = self.timeline.remove_dataset(id.as_str()) {
                self.loaders.cancel(removed.id());
                self.map.remove_layer(id.as_str());
                self.events.emit("dataset.removed", id.as_str());
                self.after_registry(update);
                self.invalidate_analysis();
            }
        }

        let mut loads = Vec::new();
        for entry in wanted {
            if self.timeline.registry().contains(entry.id.as_str()) {
                if self.timeline.set_settings(entry.id.as_str(), entry.settings).is_ok() {
                    self.put_layer(entry.id.as_str());
                }
                continue;
            }
            let id = entry.id.clone();
            self.open_dataset(entry);
            self.invalidate_analysis();
            if let Ok(handle) = self.start_load(id.as_str()) {
                loads.push(handle);
            }
        }
        loads
    }

    fn cursor_params(&self) -> (Option<NaiveDate>, Option<NaiveDate>, Option<DateDomain>) {
        (
            *self.params.date.get(),
            *self.params.date_compare.get(),
            *self.params.date_range.get(),
        )
    }

    fn after_registry(&mut self, update: TimelineUpdate) {
        if update.clamp.any() {
            self.events
                .emit("cursor.clamped", format!("{:?}", update.clamp));
        }
        if update.clamp.interval {
            self.invalidate_analysis();
        }
        self.stage_cursor();
        if update.clamp.selected || update.clamp.compare {
            self.refresh_layers();
        }
    }

    fn after_cursor(&mut self, before: &TemporalCursor) {
        self.stage_cursor();
        let cursor = self.cursor();
        if before.selected_date() != cursor.selected_date()
            || before.compare_date() != cursor.compare_date()
        {
            self.refresh_layers();
        }
        self.flush();
    }

    fn after_display(&mut self, changed: bool) -> bool {
        if changed {
            self.refresh_layers();
        }
        self.flush()
    }

    fn stage_cursor(&mut self) {
        let cursor = self.timeline.cursor();
        let (selected, compare, interval) = (
            cursor.selected_date(),
            cursor.compare_date(),
            cursor.analysis_interval(),
        );
        self.params.date.stage(selected);
        self.params.date_compare.stage(compare);
        self.params.date_range.stage(interval);
    }

    fn stage_datasets(&mut self) {
        let entries = self
            .timeline
            .registry()
            .iter()
            .map(|d| DatasetEntry {
                id: d.id().clone(),
                settings: d.settings().clone(),
            })
            .collect();
        self.params.datasets.stage(entries);
    }

    fn invalidate_analysis(&mut self) {
        if self.analysis.invalidate() {
            self.events.emit("analysis.obsolete", "");
        }
    }

    fn layer_spec(&self, dataset: &TimelineDataset) -> LayerSpec {
        let view = self.params.view();
        let cursor = self.timeline.cursor();
        LayerSpec {
            dataset: dataset.id().clone(),
            date: cursor.selected_date(),
            compare_date: cursor.compare_date(),
            visible: dataset.settings().is_visible,
            opacity: dataset.settings().opacity,
            color_map: view.color_map,
            reverse_color_map: view.reverse_color_map,
            color_map_scale: view.color_map_scale,
        }
    }

    fn put_layer(&mut self, id: &str) {
        let Some(dataset) = self.timeline.registry().get(id) else {
            return;
        };
        let spec = self.layer_spec(dataset);
        self.map.add_layer(id, &spec);
    }

    fn refresh_layers(&mut self) {
        let specs: Vec<(String, LayerSpec)> = self
            .timeline
            .registry()
            .iter()
            .map(|d| (d.id().to_string(), self.layer_spec(d)))
            .collect();
        for (id, spec) in specs {
            self.map.add_layer(&id, &spec);
        }
    }

    /// Writes every staged store in one history replace.
    fn flush(&mut self) -> bool {
        let mut query = QueryParams::parse(&self.url.search());
        if !self.params.flush_into(&mut query) {
            return false;
        }
        let written = replace_query(&mut self.url, &query);
        if written {
            self.events.emit("url.write", query.to_query_string());
        }
        written
    }
}

fn finite_viewport(center: [f64; 2], zoom: f64) -> bool {
    let finite = center.iter().all(|v| v.is_finite()) && zoom.is_finite();
    if !finite {
        tracing::debug!(?center, zoom, "ignoring non-finite viewport");
    }
    finite
}

fn banner_key(key: &str) -> String {
    format!("banner.{key}.dismissed")
}

fn status_name(status: DatasetStatus) -> &'static str {
    match status {
        DatasetStatus::Idle => "idle",
        DatasetStatus::Loading => "loading",
        DatasetStatus::Succeeded => "succeeded",
        DatasetStatus::Failed => "failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{MapCall, RecordingMap};
    use aoi::AoiPhase;
    use pretty_assertions::assert_eq;
    use urlstate::{MemoryKeyValueStore, MemoryLocation};

    type TestSession = ExplorationSession<MemoryLocation, RecordingMap, MemoryKeyValueStore>;

    fn session(search: &str) -> TestSession {
        ExplorationSession::new(
            ExplorationConfig::default(),
            MemoryLocation::new(search),
            RecordingMap::new(),
            MemoryKeyValueStore::new(),
        )
        .unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn dom(a: NaiveDate, b: NaiveDate) -> DateDomain {
        DateDomain::new(a, b).unwrap()
    }

    #[test]
    fn add_dataset_loads_and_writes_once() {
        let mut s = session("");
        let handle = s.add_dataset("no2", TimeDensity::Day).unwrap();
        assert_eq!(s.url().replace_count(), 1);
        assert_eq!(
            s.registry().get("no2").unwrap().status(),
            DatasetStatus::Loading
        );
        assert_eq!(s.map().layer_ids(), vec!["no2".to_string()]);

        s.complete_load(&handle, Ok(dom(d(2020, 1, 1), d(2020, 12, 31))))
            .unwrap();
        assert_eq!(s.cursor().selected_date(), Some(d(2020, 12, 31)));
        assert!(s.url().search().contains("date=2020-12-31"));
    }

    #[test]
    fn removed_dataset_load_is_discarded() {
        let mut s = session("");
        let handle = s.add_dataset("co2", TimeDensity::Month).unwrap();
        s.remove_dataset("co2").unwrap();
        assert!(handle.is_cancelled());

        let late = s.complete_load(&handle, Ok(dom(d(2020, 1, 1), d(2023, 1, 1))));
        assert_eq!(late, Err(SessionError::StaleLoad("co2".into())));
        assert!(!s.registry().contains("co2"));
        assert_eq!(s.events().count("load.discarded"), 1);
        assert!(s.map().layer_ids().is_empty());
    }

    #[test]
    fn reload_supersedes_in_flight_load() {
        let mut s = session("");
        let first = s.add_dataset("no2", TimeDensity::Day).unwrap();
        let second = s.begin_load("no2").unwrap();
        assert!(first.is_cancelled());
        assert!(s.complete_load(&first, Err("timeout".into())).is_err());
        s.complete_load(&second, Err("404".into())).unwrap();
        assert_eq!(s.combined_status(), DatasetStatus::Failed);
    }

    #[test]
    fn unknown_status_is_reported() {
        let mut s = session("");
        assert!(matches!(
            s.set_status("ghost", LoadState::Loading),
            Err(SessionError::Registry(_))
        ));
        assert_eq!(s.url().replace_count(), 0);
    }

    #[test]
    fn equal_view_values_never_write() {
        let mut s = session("zoom=3");
        assert!(!s.set_zoom(3.0));
        assert!(!s.set_center([0.0, 0.0]));
        assert!(!s.set_color_map("viridis"));
        assert_eq!(s.url().replace_count(), 0);

        assert!(s.set_zoom(2.5));
        assert_eq!(s.url().search(), "zoom=2.5");
        assert!(!s.set_zoom(2.5));
        assert_eq!(s.url().replace_count(), 1);
    }

    #[test]
    fn non_finite_viewport_is_rejected() {
        let mut s = session("zoom=3");
        assert!(!s.set_center([f64::NAN, f64::INFINITY]));
        assert!(!s.set_zoom(f64::NAN));
        assert!(!s.fly_to([1.0, f64::NEG_INFINITY], 4.0));
        s.map_moved([f64::NAN, 0.0], 2.0);
        assert!(!s.commit_map_move());

        assert_eq!(s.view().center, [0.0, 0.0]);
        assert_eq!(s.view().zoom, 3.0);
        assert_eq!(s.url().search(), "zoom=3");
        assert_eq!(s.url().replace_count(), 0);
        assert!(s.map().calls().is_empty());
    }

    #[test]
    fn map_drag_writes_once_on_commit() {
        let mut s = session("");
        for i in 0..20 {
            s.map_moved([i as f64, 1.0], 2.0 + f64::from(i));
        }
        assert_eq!(s.url().replace_count(), 0);
        assert!(s.commit_map_move());
        assert!(!s.commit_map_move());
        assert_eq!(s.url().replace_count(), 1);
        assert_eq!(s.url().search(), "center=19.000000,1.000000&zoom=21");
    }

    #[test]
    fn panel_aoi_fits_bounds_map_aoi_does_not() {
        let mut s = session("");
        s.apply_aoi_preset("world").unwrap();
        assert_eq!(s.aoi_state().phase(), AoiPhase::Committed);
        assert!(matches!(
            s.map().calls().last(),
            Some(MapCall::FitBounds { .. })
        ));
        assert_eq!(s.aoi_center(), Some([0.0, 0.0]));
        assert!(s.url().search().starts_with("aoi="));

        s.map_mut().take();
        s.dispatch_aoi(ActionOrigin::Map, AoiEvent::Clear).unwrap();
        assert!(s.map().calls().is_empty());
        assert_eq!(s.url().search(), "");
        assert_eq!(s.aoi_area_label(), "0");
        assert_eq!(s.events().count("aoi.cleared"), 1);
    }

    #[test]
    fn fly_to_aoi_uses_the_bbox_midpoint() {
        let mut s = session("");
        assert!(!s.fly_to_aoi(4.0));
        s.dispatch_aoi(
            ActionOrigin::Panel,
            AoiEvent::Set {
                collection: aoi::polygon_url_decode("10,0|30,0|30,20|10,20")
                    .unwrap()
                    .to_geojson(),
            },
        )
        .unwrap();
        assert!(s.fly_to_aoi(4.0));
        assert_eq!(
            s.map().calls().last(),
            Some(&MapCall::FlyTo {
                center: [20.0, 10.0],
                zoom: 4.0
            })
        );
        assert_eq!(s.view().center, [20.0, 10.0]);
    }

    #[test]
    fn unknown_preset_is_an_error() {
        let mut s = session("");
        assert_eq!(
            s.apply_aoi_preset("mars"),
            Err(SessionError::UnknownPreset("mars".into()))
        );
    }

    #[test]
    fn analysis_goes_obsolete_when_inputs_change() {
        let mut s = session("");
        let h = s.add_dataset("no2", TimeDensity::Day).unwrap();
        s.complete_load(&h, Ok(dom(d(2020, 1, 1), d(2020, 12, 31))))
            .unwrap();
        assert!(matches!(
            s.start_analysis(),
            Err(SessionError::AnalysisUnavailable(_))
        ));

        s.apply_aoi_preset("world").unwrap();
        s.set_analysis_interval(Some(dom(d(2020, 2, 1), d(2020, 3, 1))))
            .unwrap();
        let run = s.start_analysis().unwrap();
        assert!(s.set_analysis_status("no2", run, DatasetStatus::Succeeded, 100));

        s.set_analysis_interval(Some(dom(d(2020, 2, 1), d(2020, 4, 1))))
            .unwrap();
        assert_eq!(s.analysis().state(), crate::AnalysisState::Obsolete);
        assert!(s.url().search().contains("dateRange=2020-02-01%7C2020-04-01"));
    }

    #[test]
    fn banner_flag_persists_through_the_port() {
        let mut s = session("");
        assert!(!s.is_banner_dismissed("welcome"));
        s.dismiss_banner("welcome").unwrap();
        assert!(s.is_banner_dismissed("welcome"));
        assert!(!s.is_banner_dismissed("other"));
    }

    #[test]
    fn taxonomy_filters_are_url_bound() {
        let mut s = session("");
        assert!(s.set_taxonomy("topics", vec!["air".into()]));
        assert_eq!(
            s.url().search(),
            "taxonomy=%7B%22topics%22:%5B%22air%22%5D%7D"
        );
        assert!(s.set_taxonomy("topics", vec![]));
        assert_eq!(s.url().search(), "");
    }
}
