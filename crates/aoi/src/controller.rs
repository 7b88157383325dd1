use foundation::Bbox;
use serde::{Deserialize, Serialize};

use crate::error::AoiError;
use crate::event::{ActionOrigin, AoiEvent, SelectionContext};
use crate::feature::{AoiCollection, AoiFeature};
use crate::measure::{area_km2, collection_bbox, format_area};

/// Whether a new drawing replaces the committed AOI or joins it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AoiPolicy {
    #[default]
    Single,
    Multiple,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AoiPhase {
    Empty,
    Drawing,
    Committed,
    Selected,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AoiState {
    pub drawing: bool,
    pub selected: bool,
    pub feature_collection: Option<AoiCollection>,
    pub selected_context: Option<SelectionContext>,
    pub action_origin: Option<ActionOrigin>,
}

impl AoiState {
    pub fn phase(&self) -> AoiPhase {
        if self.drawing {
            AoiPhase::Drawing
        } else if self.feature_collection.is_none() {
            AoiPhase::Empty
        } else if self.selected {
            AoiPhase::Selected
        } else {
            AoiPhase::Committed
        }
    }

    fn same_structure(&self, other: &AoiState) -> bool {
        self.drawing == other.drawing
            && self.selected == other.selected
            && self.feature_collection == other.feature_collection
    }
}

/// Result of one accepted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AoiTransition {
    pub revision: u64,
    /// Flags or geometry moved; context-only updates leave this false.
    pub changed: bool,
    pub geometry_changed: bool,
    pub phase: AoiPhase,
}

/// What a UI surface should do after the AOI state moved past the revision
/// it last rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDecision {
    UpToDate,
    /// Every unseen change came from this surface; skip re-initialising.
    IgnoreEcho,
    Reinitialize,
}

#[derive(Debug, Default, Clone, Copy)]
struct Touches {
    panel: u64,
    map: u64,
    restore: u64,
}

/// Event-driven AOI state machine.
///
/// Each mutating event is tagged with its origin; surfaces poll
/// [`AoiController::sync_decision`] to tell their own echoes from foreign
/// edits. Both surfaces always read the same [`AoiState`].
#[derive(Debug, Default, Clone)]
pub struct AoiController {
    state: AoiState,
    policy: AoiPolicy,
    revision: u64,
    touches: Touches,
    next_feature: u64,
}

impl AoiController {
    pub fn new(policy: AoiPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn state(&self) -> &AoiState {
        &self.state
    }

    pub fn policy(&self) -> AoiPolicy {
        self.policy
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn collection(&self) -> Option<&AoiCollection> {
        self.state.feature_collection.as_ref()
    }

    pub fn bbox(&self) -> Option<Bbox> {
        collection_bbox(self.collection())
    }

    /// Literal midpoint of the bounding box.
    pub fn center(&self) -> Option<[f64; 2]> {
        self.bbox().map(|b| b.center())
    }

    pub fn area_km2(&self) -> f64 {
        area_km2(self.collection())
    }

    pub fn area_label(&self) -> String {
        format_area(self.area_km2())
    }

    pub fn dispatch(
        &mut self,
        origin: ActionOrigin,
        event: AoiEvent,
    ) -> Result<AoiTransition, AoiError> {
        let name = event.name();
        let next = self.apply(event).inspect_err(|error| {
            tracing::warn!(event = name, ?origin, %error, "aoi event rejected");
        })?;
        Ok(self.commit(next, Some(origin)))
    }

    /// Replaces the committed AOI from outside both surfaces (URL hydration,
    /// back/forward navigation). Forces both surfaces to re-initialise.
    pub fn restore(&mut self, collection: Option<AoiCollection>) -> AoiTransition {
        let next = AoiState {
            feature_collection: collection,
            ..AoiState::default()
        };
        self.commit(next, None)
    }

    pub fn sync_decision(&self, surface: ActionOrigin, seen_revision: u64) -> SyncDecision {
        if seen_revision >= self.revision {
            return SyncDecision::UpToDate;
        }
        let foreign = match surface {
            ActionOrigin::Panel => self.touches.map,
            ActionOrigin::Map => self.touches.panel,
        }
        .max(self.touches.restore);
        if foreign > seen_revision {
            SyncDecision::Reinitialize
        } else {
            SyncDecision::IgnoreEcho
        }
    }

    fn apply(&mut self, event: AoiEvent) -> Result<AoiState, AoiError> {
        let mut next = self.state.clone();
        match event {
            AoiEvent::DrawClick => {
                next.drawing = true;
                next.selected = false;
                next.selected_context = None;
            }
            AoiEvent::DrawFinish { feature } => {
                let feature = AoiFeature::from_geojson(&feature, || self.fresh_id())?;
                next.feature_collection = Some(match (self.policy, next.feature_collection.take()) {
                    (AoiPolicy::Multiple, Some(mut existing)) => {
                        existing.upsert(feature);
                        existing
                    }
                    _ => AoiCollection::single(feature),
                });
                next.drawing = false;
                next.selected = false;
            }
            AoiEvent::SelectClick => {
                if next.feature_collection.is_none() {
                    return Err(AoiError::NothingToSelect);
                }
                next.selected = true;
                next.drawing = false;
            }
            AoiEvent::Selection { selected, context } => {
                if !next.drawing && selected != next.selected {
                    next.selected = selected && next.feature_collection.is_some();
                }
                next.selected_context = (!context.is_empty()).then_some(context);
            }
            AoiEvent::Update { feature } => {
                let Some(collection) = next.feature_collection.as_mut() else {
                    return Err(AoiError::UnknownFeature(String::new()));
                };
                let (id, rings) = AoiFeature::parse_geojson(&feature)?;
                let id = match id {
                    Some(id) => id,
                    // Single AOI drag-edits may arrive without an id.
                    None if collection.len() == 1 => collection.features()[0].id.clone(),
                    None => return Err(AoiError::UnknownFeature(String::new())),
                };
                if collection.get(&id).is_none() {
                    return Err(AoiError::UnknownFeature(id));
                }
                collection.upsert(AoiFeature::new(id, rings)?);
            }
            AoiEvent::TrashClick { ids } => {
                let ids = if !ids.is_empty() {
                    ids
                } else if let Some(ctx) = &next.selected_context
                    && !ctx.feature_ids.is_empty()
                {
                    ctx.feature_ids.clone()
                } else if next.selected {
                    next.feature_collection
                        .as_ref()
                        .map(AoiCollection::ids)
                        .unwrap_or_default()
                } else {
                    Vec::new()
                };
                remove_features(&mut next, &ids);
                next.selected = false;
                next.selected_context = None;
            }
            AoiEvent::Delete { ids } => remove_features(&mut next, &ids),
            AoiEvent::Clear => {
                next = AoiState {
                    action_origin: next.action_origin,
                    ..AoiState::default()
                };
            }
            AoiEvent::Set { collection } => {
                next.feature_collection =
                    AoiCollection::from_geojson(&collection, || self.fresh_id())?;
                next.drawing = false;
                next.selected = false;
                next.selected_context = None;
            }
        }
        Ok(next)
    }

    fn commit(&mut self, mut next: AoiState, origin: Option<ActionOrigin>) -> AoiTransition {
        let changed = !next.same_structure(&self.state);
        let geometry_changed = next.feature_collection != self.state.feature_collection;
        if changed {
            self.revision += 1;
            match origin {
                Some(ActionOrigin::Panel) => self.touches.panel = self.revision,
                Some(ActionOrigin::Map) => self.touches.map = self.revision,
                None => self.touches.restore = self.revision,
            }
            next.action_origin = origin;
        }
        self.state = next;
        AoiTransition {
            revision: self.revision,
            changed,
            geometry_changed,
            phase: self.state.phase(),
        }
    }

    fn fresh_id(&mut self) -> String {
        self.next_feature += 1;
        format!("aoi-{}", self.next_feature)
    }
}

fn remove_features(state: &mut AoiState, ids: &[String]) {
    if ids.is_empty() {
        return;
    }
    state.feature_collection = state
        .feature_collection
        .take()
        .and_then(|c| c.without(ids));
    if state.feature_collection.is_none() {
        state.selected = false;
    }
    if let Some(ctx) = state.selected_context.as_mut() {
        ctx.feature_ids.retain(|id| !ids.contains(id));
    }
}
