use foundation::{DateDomain, DatasetId, TimeDensity};
use indexmap::IndexMap;

use crate::dataset::{DatasetStatus, LayerSettings, LoadState, TimelineDataset};
use crate::error::RegistryError;

/// Active timeline datasets, keyed by id, in insertion order.
///
/// `combined_domain` and `combined_status` are re-derived inside every
/// mutation before it returns, so readers never observe a stale aggregate.
#[derive(Debug, Default, Clone)]
pub struct DatasetRegistry {
    datasets: IndexMap<DatasetId, TimelineDataset>,
    combined_domain: Option<DateDomain>,
    combined_status: DatasetStatus,
}

impl DatasetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.datasets.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&TimelineDataset> {
        self.datasets.get(id)
    }

    /// Datasets in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &TimelineDataset> + '_ {
        self.datasets.values()
    }

    pub fn ids(&self) -> Vec<DatasetId> {
        self.datasets.keys().cloned().collect()
    }

    /// Intersection of all succeeded domains.
    pub fn combined_domain(&self) -> Option<DateDomain> {
        self.combined_domain
    }

    pub fn combined_status(&self) -> DatasetStatus {
        self.combined_status
    }

    /// Finest time density among the active datasets.
    pub fn finest_density(&self) -> Option<TimeDensity> {
        self.datasets.values().map(|d| d.time_density()).max()
    }

    /// Inserts a new dataset in `Idle` status. Re-adding an id is an error.
    pub fn add_dataset(
        &mut self,
        id: DatasetId,
        time_density: TimeDensity,
    ) -> Result<(), RegistryError> {
        if self.datasets.contains_key(&id) {
            return Err(RegistryError::Duplicate(id));
        }
        let dataset = TimelineDataset::new(id.clone(), time_density);
        self.datasets.insert(id, dataset);
        self.recompute();
        Ok(())
    }

    /// Removes the dataset, preserving the order of the rest.
    pub fn remove_dataset(&mut self, id: &str) -> Result<TimelineDataset, RegistryError> {
        let Some(removed) = self.datasets.shift_remove(id) else {
            tracing::debug!(id, "remove for unknown dataset ignored");
            return Err(RegistryError::NotFound(DatasetId::from(id)));
        };
        self.recompute();
        Ok(removed)
    }

    /// Applies a status transition. Updates for ids that are not (or no
    /// longer) registered are rejected without touching any state, so a late
    /// fetch result can never resurrect a removed dataset.
    pub fn set_status(&mut self, id: &str, state: LoadState) -> Result<(), RegistryError> {
        let Some(dataset) = self.datasets.get_mut(id) else {
            tracing::debug!(id, status = ?state.status(), "status for unknown dataset ignored");
            return Err(RegistryError::NotFound(DatasetId::from(id)));
        };
        if let LoadState::Failed { error } = &state {
            tracing::warn!(id, %error, "dataset failed to load");
        }
        dataset.set_state(state);
        self.recompute();
        Ok(())
    }

    pub fn set_settings(&mut self, id: &str, settings: LayerSettings) -> Result<(), RegistryError> {
        let Some(dataset) = self.datasets.get_mut(id) else {
            return Err(RegistryError::NotFound(DatasetId::from(id)));
        };
        dataset.set_settings(settings);
        Ok(())
    }

    fn recompute(&mut self) {
        self.combined_domain = combine_domains(self.datasets.values());
        self.combined_status = combine_status(self.datasets.values());
    }
}

/// `[max(starts), min(ends)]` over succeeded datasets; `None` when nothing
/// succeeded or the overlap is empty.
pub fn combine_domains<'a, I>(datasets: I) -> Option<DateDomain>
where
    I: IntoIterator<Item = &'a TimelineDataset>,
{
    let mut bounds: Option<(chrono::NaiveDate, chrono::NaiveDate)> = None;
    for domain in datasets.into_iter().filter_map(|d| d.domain()) {
        bounds = Some(match bounds {
            None => (domain.start(), domain.end()),
            Some((start, end)) => (start.max(domain.start()), end.min(domain.end())),
        });
    }
    let (start, end) = bounds?;
    DateDomain::new(start, end)
}

/// Precedence: `Failed` > `Loading` > `Succeeded` > `Idle`.
pub fn combine_status<'a, I>(datasets: I) -> DatasetStatus
where
    I: IntoIterator<Item = &'a TimelineDataset>,
{
    let mut any_loading = false;
    let mut any_succeeded = false;
    for dataset in datasets {
        match dataset.status() {
            DatasetStatus::Failed => return DatasetStatus::Failed,
            DatasetStatus::Loading => any_loading = true,
            DatasetStatus::Succeeded => any_succeeded = true,
            DatasetStatus::Idle => {}
        }
    }
    if any_loading {
        DatasetStatus::Loading
    } else if any_succeeded {
        DatasetStatus::Succeeded
    } else {
        DatasetStatus::Idle
    }
}
