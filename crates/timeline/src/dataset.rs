use foundation::{DateDomain, DatasetId, TimeDensity};
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Load status of one dataset, as reported by the fetch collaborator.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetStatus {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

/// Status together with the data only that status may carry.
///
/// A domain exists exactly when the load succeeded and an error message
/// exactly when it failed; the variants make any other pairing
/// unrepresentable.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Succeeded { domain: DateDomain },
    Failed { error: String },
}

impl LoadState {
    pub fn status(&self) -> DatasetStatus {
        match self {
            LoadState::Idle => DatasetStatus::Idle,
            LoadState::Loading => DatasetStatus::Loading,
            LoadState::Succeeded { .. } => DatasetStatus::Succeeded,
            LoadState::Failed { .. } => DatasetStatus::Failed,
        }
    }

    /// Builds a state from loosely typed parts (e.g. a JS bridge), enforcing
    /// the domain/error pairing.
    pub fn from_parts(
        status: DatasetStatus,
        domain: Option<DateDomain>,
        error: Option<String>,
    ) -> Result<Self, RegistryError> {
        match (status, domain, error) {
            (DatasetStatus::Idle, None, None) => Ok(LoadState::Idle),
            (DatasetStatus::Loading, None, None) => Ok(LoadState::Loading),
            (DatasetStatus::Succeeded, Some(domain), None) => Ok(LoadState::Succeeded { domain }),
            (DatasetStatus::Failed, None, Some(error)) => Ok(LoadState::Failed { error }),
            (DatasetStatus::Succeeded, None, _) => Err(RegistryError::InvalidStatusPayload(
                "succeeded status requires a domain".to_string(),
            )),
            (DatasetStatus::Failed, _, None) => Err(RegistryError::InvalidStatusPayload(
                "failed status requires an error".to_string(),
            )),
            (status, domain, error) => Err(RegistryError::InvalidStatusPayload(format!(
                "{status:?} status cannot carry domain={} error={}",
                domain.is_some(),
                error.is_some()
            ))),
        }
    }
}

/// Per-layer display settings persisted with the dataset list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayerSettings {
    pub is_visible: bool,
    /// Percent, `0..=100`.
    pub opacity: u8,
    pub analysis_metrics: Vec<String>,
}

impl Default for LayerSettings {
    fn default() -> Self {
        Self {
            is_visible: true,
            opacity: 100,
            analysis_metrics: Vec::new(),
        }
    }
}

impl LayerSettings {
    /// Caps opacity at 100 and drops duplicate metrics, keeping first
    /// occurrences.
    pub fn normalized(mut self) -> Self {
        self.opacity = self.opacity.min(100);
        let mut seen: Vec<String> = Vec::with_capacity(self.analysis_metrics.len());
        self.analysis_metrics.retain(|m| {
            if seen.contains(m) {
                return false;
            }
            seen.push(m.clone());
            true
        });
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimelineDataset {
    id: DatasetId,
    time_density: TimeDensity,
    state: LoadState,
    settings: LayerSettings,
}

impl TimelineDataset {
    pub fn new(id: DatasetId, time_density: TimeDensity) -> Self {
        Self {
            id,
            time_density,
            state: LoadState::Idle,
            settings: LayerSettings::default(),
        }
    }

    pub fn id(&self) -> &DatasetId {
        &self.id
    }

    pub fn time_density(&self) -> TimeDensity {
        self.time_density
    }

    pub fn status(&self) -> DatasetStatus {
        self.state.status()
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    /// Only present once the load succeeded.
    pub fn domain(&self) -> Option<DateDomain> {
        match &self.state {
            LoadState::Succeeded { domain } => Some(*domain),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            LoadState::Failed { error } => Some(error),
            _ => None,
        }
    }

    pub fn settings(&self) -> &LayerSettings {
        &self.settings
    }

    pub(crate) fn set_state(&mut self, state: LoadState) {
        self.state = state;
    }

    pub(crate) fn set_settings(&mut self, settings: LayerSettings) {
        self.settings = settings.normalized();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn domain() -> DateDomain {
        DateDomain::new(
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn from_parts_enforces_pairing() {
        assert_eq!(
            LoadState::from_parts(DatasetStatus::Succeeded, Some(domain()), None),
            Ok(LoadState::Succeeded { domain: domain() })
        );
        assert_eq!(
            LoadState::from_parts(DatasetStatus::Failed, None, Some("boom".into())),
            Ok(LoadState::Failed {
                error: "boom".into()
            })
        );
        assert!(LoadState::from_parts(DatasetStatus::Succeeded, None, None).is_err());
        assert!(LoadState::from_parts(DatasetStatus::Failed, None, None).is_err());
        assert!(LoadState::from_parts(DatasetStatus::Loading, Some(domain()), None).is_err());
        assert!(LoadState::from_parts(DatasetStatus::Idle, None, Some("x".into())).is_err());
        assert!(
            LoadState::from_parts(DatasetStatus::Succeeded, Some(domain()), Some("x".into()))
                .is_err()
        );
    }

    #[test]
    fn domain_and_error_follow_state() {
        let mut ds = TimelineDataset::new(DatasetId::from("no2"), TimeDensity::Month);
        assert_eq!(ds.status(), DatasetStatus::Idle);
        assert_eq!(ds.domain(), None);

        ds.set_state(LoadState::Succeeded { domain: domain() });
        assert_eq!(ds.domain(), Some(domain()));
        assert_eq!(ds.error(), None);

        ds.set_state(LoadState::Failed {
            error: "timeout".into(),
        });
        assert_eq!(ds.domain(), None);
        assert_eq!(ds.error(), Some("timeout"));
    }

    #[test]
    fn settings_are_normalized() {
        let s = LayerSettings {
            is_visible: false,
            opacity: 250,
            analysis_metrics: vec!["mean".into(), "max".into(), "mean".into()],
        }
        .normalized();
        assert_eq!(s.opacity, 100);
        assert_eq!(s.analysis_metrics, vec!["mean".to_string(), "max".to_string()]);
    }
}
