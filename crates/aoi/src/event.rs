use geojson::{Feature, FeatureCollection};
use serde::{Deserialize, Serialize};

/// Which UI surface produced an AOI edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionOrigin {
    Panel,
    Map,
}

/// Pointer/hover context reported alongside a selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SelectionContext {
    pub feature_ids: Vec<String>,
    pub points: Vec<[f64; 2]>,
}

impl SelectionContext {
    pub fn is_empty(&self) -> bool {
        self.feature_ids.is_empty() && self.points.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AoiEvent {
    DrawClick,
    DrawFinish { feature: Feature },
    SelectClick,
    Selection { selected: bool, context: SelectionContext },
    Update { feature: Feature },
    /// Empty `ids` removes the current selection.
    TrashClick { ids: Vec<String> },
    Delete { ids: Vec<String> },
    Clear,
    Set { collection: FeatureCollection },
}

impl AoiEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AoiEvent::DrawClick => "aoi.draw-click",
            AoiEvent::DrawFinish { .. } => "aoi.draw-finish",
            AoiEvent::SelectClick => "aoi.select-click",
            AoiEvent::Selection { .. } => "aoi.selection",
            AoiEvent::Update { .. } => "aoi.update",
            AoiEvent::TrashClick { .. } => "aoi.trash-click",
            AoiEvent::Delete { .. } => "aoi.delete",
            AoiEvent::Clear => "aoi.clear",
            AoiEvent::Set { .. } => "aoi.set",
        }
    }
}
