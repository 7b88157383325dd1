use chrono::NaiveDate;
use foundation::{Bbox, DatasetId};
use serde::Serialize;

use crate::view::ColorMapScale;

/// What the renderer needs to draw one dataset layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerSpec {
    pub dataset: DatasetId,
    pub date: Option<NaiveDate>,
    pub compare_date: Option<NaiveDate>,
    pub visible: bool,
    pub opacity: u8,
    pub color_map: String,
    pub reverse_color_map: bool,
    pub color_map_scale: Option<ColorMapScale>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FitOptions {
    pub padding: u32,
}

/// Rendering capability the session drives. The session never renders.
pub trait MapPort {
    /// Adding an id that is already on the map replaces its spec.
    fn add_layer(&mut self, id: &str, spec: &LayerSpec);
    fn remove_layer(&mut self, id: &str);
    fn fit_bounds(&mut self, bbox: Bbox, options: FitOptions);
    fn fly_to(&mut self, center: [f64; 2], zoom: f64);
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapCall {
    AddLayer { id: String, spec: LayerSpec },
    RemoveLayer { id: String },
    FitBounds { bbox: Bbox, options: FitOptions },
    FlyTo { center: [f64; 2], zoom: f64 },
}

/// Map that only records what it was asked to do. Used headless (tests,
/// tools).
#[derive(Debug, Default, Clone)]
pub struct RecordingMap {
    calls: Vec<MapCall>,
}

impl RecordingMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[MapCall] {
        &self.calls
    }

    pub fn take(&mut self) -> Vec<MapCall> {
        std::mem::take(&mut self.calls)
    }

    /// Ids currently on the map, in the order they were first added.
    pub fn layer_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for call in &self.calls {
            match call {
                MapCall::AddLayer { id, .. } if !ids.contains(id) => ids.push(id.clone()),
                MapCall::RemoveLayer { id } => ids.retain(|x| x != id),
                _ => {}
            }
        }
        ids
    }
}

impl MapPort for RecordingMap {
    fn add_layer(&mut self, id: &str, spec: &LayerSpec) {
        self.calls.push(MapCall::AddLayer {
            id: id.to_string(),
            spec: spec.clone(),
        });
    }

    fn remove_layer(&mut self, id: &str) {
        self.calls.push(MapCall::RemoveLayer { id: id.to_string() });
    }

    fn fit_bounds(&mut self, bbox: Bbox, options: FitOptions) {
        self.calls.push(MapCall::FitBounds { bbox, options });
    }

    fn fly_to(&mut self, center: [f64; 2], zoom: f64) {
        self.calls.push(MapCall::FlyTo { center, zoom });
    }
}
