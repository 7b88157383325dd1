use std::collections::BTreeMap;

use aoi::AoiCollection;
use foundation::{DateDomain, DatasetId};
use serde::Serialize;
use timeline::DatasetStatus;

use crate::error::SessionError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum AnalysisState {
    #[default]
    Idle,
    Running {
        run_id: u64,
    },
    /// Inputs changed after the last run; its results no longer apply.
    Obsolete,
    Complete {
        run_id: u64,
    },
}

/// Inputs an analysis run was started with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRequest {
    pub aoi: AoiCollection,
    pub interval: DateDomain,
    pub datasets: Vec<DatasetId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DatasetAnalysis {
    pub status: DatasetStatus,
    /// Percent, `0..=100`.
    pub progress: u8,
}

/// Tracks one analysis run at a time over the committed AOI and interval.
#[derive(Debug, Default, Clone)]
pub struct AnalysisController {
    state: AnalysisState,
    last_run: u64,
    request: Option<AnalysisRequest>,
    datasets: BTreeMap<DatasetId, DatasetAnalysis>,
}

impl AnalysisController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AnalysisState {
        self.state
    }

    pub fn request(&self) -> Option<&AnalysisRequest> {
        self.request.as_ref()
    }

    pub fn dataset(&self, id: &str) -> Option<DatasetAnalysis> {
        self.datasets.get(id).copied()
    }

    /// Mean progress over the run's datasets.
    pub fn progress(&self) -> u8 {
        if self.datasets.is_empty() {
            return 0;
        }
        let total: u32 = self.datasets.values().map(|d| u32::from(d.progress)).sum();
        (total / self.datasets.len() as u32) as u8
    }

    /// Starts a new run, superseding any previous one. Returns its run id.
    pub fn start(
        &mut self,
        aoi: Option<&AoiCollection>,
        interval: Option<DateDomain>,
        datasets: Vec<DatasetId>,
    ) -> Result<u64, SessionError> {
        let aoi = aoi.ok_or(SessionError::AnalysisUnavailable("an area of interest"))?;
        let interval = interval.ok_or(SessionError::AnalysisUnavailable("an analysis interval"))?;
        if datasets.is_empty() {
            return Err(SessionError::AnalysisUnavailable("at least one dataset"));
        }

        self.last_run += 1;
        let run_id = self.last_run;
        self.datasets = datasets
            .iter()
            .map(|id| {
                let entry = DatasetAnalysis {
                    status: DatasetStatus::Loading,
                    progress: 0,
                };
                (id.clone(), entry)
            })
            .collect();
        self.request = Some(AnalysisRequest {
            aoi: aoi.clone(),
            interval,
            datasets,
        });
        self.state = AnalysisState::Running { run_id };
        tracing::info!(run_id, "analysis started");
        Ok(run_id)
    }

    /// Applies one dataset's progress. Updates from an older run, or for a
    /// dataset outside the run, are discarded and return `false`.
    pub fn set_status(
        &mut self,
        id: &str,
        run_id: u64,
        status: DatasetStatus,
        progress: u8,
    ) -> bool {
        let AnalysisState::Running { run_id: current } = self.state else {
            tracing::debug!(id, run_id, "analysis update outside a running run");
            return false;
        };
        if run_id != current {
            tracing::debug!(id, run_id, current, "stale analysis update");
            return false;
        }
        let Some(entry) = self.datasets.get_mut(id) else {
            return false;
        };
        entry.status = status;
        entry.progress = match status {
            DatasetStatus::Succeeded => 100,
            _ => progress.min(100),
        };

        let finished = self
            .datasets
            .values()
            .all(|d| matches!(d.status, DatasetStatus::Succeeded | DatasetStatus::Failed));
        if finished {
            self.state = AnalysisState::Complete { run_id };
        }
        true
    }

    /// Called whenever the AOI, the interval or the dataset set changes.
    /// Returns `true` if a running or completed run became obsolete.
    pub fn invalidate(&mut self) -> bool {
        match self.state {
            AnalysisState::Running { .. } | AnalysisState::Complete { .. } => {
                self.state = AnalysisState::Obsolete;
                true
            }
            AnalysisState::Idle | AnalysisState::Obsolete => false,
        }
    }

    pub fn reset(&mut self) {
        self.state = AnalysisState::Idle;
        self.request = None;
        self.datasets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aoi::polygon_url_decode;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn interval() -> Option<DateDomain> {
        DateDomain::new(
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 6, 1).unwrap(),
        )
    }

    fn aoi() -> AoiCollection {
        polygon_url_decode("0,0|1,0|1,1|0,1").unwrap()
    }

    #[test]
    fn start_needs_every_input() {
        let mut a = AnalysisController::new();
        let ids = vec![DatasetId::from("no2")];
        assert_eq!(
            a.start(None, interval(), ids.clone()),
            Err(SessionError::AnalysisUnavailable("an area of interest"))
        );
        assert_eq!(
            a.start(Some(&aoi()), None, ids),
            Err(SessionError::AnalysisUnavailable("an analysis interval"))
        );
        assert_eq!(
            a.start(Some(&aoi()), interval(), vec![]),
            Err(SessionError::AnalysisUnavailable("at least one dataset"))
        );
        assert_eq!(a.state(), AnalysisState::Idle);
    }

    #[test]
    fn run_completes_when_every_dataset_finishes() {
        let mut a = AnalysisController::new();
        let run = a
            .start(Some(&aoi()), interval(), vec!["no2".into(), "co2".into()])
            .unwrap();
        assert!(a.set_status("no2", run, DatasetStatus::Loading, 50));
        assert_eq!(a.progress(), 25);
        assert!(a.set_status("no2", run, DatasetStatus::Succeeded, 0));
        assert_eq!(a.state(), AnalysisState::Running { run_id: run });
        assert!(a.set_status("co2", run, DatasetStatus::Failed, 10));
        assert_eq!(a.state(), AnalysisState::Complete { run_id: run });
        assert!(!a.set_status("ghost", run, DatasetStatus::Succeeded, 100));
    }

    #[test]
    fn stale_run_updates_are_discarded() {
        let mut a = AnalysisController::new();
        let first = a.start(Some(&aoi()), interval(), vec!["no2".into()]).unwrap();
        let second = a.start(Some(&aoi()), interval(), vec!["no2".into()]).unwrap();
        assert!(second > first);
        assert!(!a.set_status("no2", first, DatasetStatus::Succeeded, 100));
        assert_eq!(a.dataset("no2").unwrap().status, DatasetStatus::Loading);
    }

    #[test]
    fn input_change_makes_runs_obsolete() {
        let mut a = AnalysisController::new();
        assert!(!a.invalidate());
        let run = a.start(Some(&aoi()), interval(), vec!["no2".into()]).unwrap();
        assert!(a.invalidate());
        assert_eq!(a.state(), AnalysisState::Obsolete);
        assert!(!a.set_status("no2", run, DatasetStatus::Succeeded, 100));
        a.reset();
        assert_eq!(a.state(), AnalysisState::Idle);
        assert_eq!(a.request(), None);
    }
}
