use chrono::NaiveDate;
use foundation::{DateDomain, DatasetId, TimeDensity};

use crate::cursor::{ClampReport, TemporalCursor};
use crate::dataset::{LayerSettings, LoadState, TimelineDataset};
use crate::error::{CursorError, RegistryError};
use crate::registry::DatasetRegistry;

/// Registry plus cursor, kept consistent with each other.
///
/// Every registry mutation clamps the cursor before returning, so the selected
/// date is never observable outside the combined domain.
#[derive(Debug, Default, Clone)]
pub struct Timeline {
    registry: DatasetRegistry,
    cursor: TemporalCursor,
}

/// What a registry mutation did to the derived state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimelineUpdate {
    pub domain_changed: bool,
    pub clamp: ClampReport,
}

/// Outcome of a lenient date selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSelection {
    pub date: NaiveDate,
    /// The requested date lay outside the domain and was moved to a boundary.
    pub clamped: bool,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &DatasetRegistry {
        &self.registry
    }

    pub fn cursor(&self) -> &TemporalCursor {
        &self.cursor
    }

    pub fn combined_domain(&self) -> Option<DateDomain> {
        self.registry.combined_domain()
    }

    pub fn add_dataset(
        &mut self,
        id: DatasetId,
        time_density: TimeDensity,
    ) -> Result<TimelineUpdate, RegistryError> {
        let before = self.registry.combined_domain();
        self.registry.add_dataset(id, time_density)?;
        Ok(self.settle(before))
    }

    pub fn remove_dataset(
        &mut self,
        id: &str,
    ) -> Result<(TimelineDataset, TimelineUpdate), RegistryError> {
        let before = self.registry.combined_domain();
        let removed = self.registry.remove_dataset(id)?;
        Ok((removed, self.settle(before)))
    }

    pub fn set_status(&mut self, id: &str, state: LoadState) -> Result<TimelineUpdate, RegistryError> {
        let before = self.registry.combined_domain();
        self.registry.set_status(id, state)?;
        Ok(self.settle(before))
    }

    pub fn set_settings(&mut self, id: &str, settings: LayerSettings) -> Result<(), RegistryError> {
        self.registry.set_settings(id, settings)
    }

    /// Strict selection: fails when `date` lies outside a known domain.
    ///
    /// The stored date is snapped to the finest density in the registry.
    pub fn set_selected_date(&mut self, date: NaiveDate) -> Result<NaiveDate, CursorError> {
        let domain = self.registry.combined_domain();
        if let Some(domain) = domain
            && !domain.contains(date)
        {
            return Err(CursorError::OutOfDomain { date, domain });
        }
        let stored = self.snap_within(date, domain);
        self.cursor.set_selected_date(stored, domain)?;
        Ok(stored)
    }

    /// Lenient selection: out-of-domain dates are clamped instead of rejected.
    pub fn select_date(&mut self, date: NaiveDate) -> DateSelection {
        let domain = self.registry.combined_domain();
        let within = domain.map_or(date, |d| d.clamp(date));
        let stored = self.snap_within(within, domain);
        self.cursor.place_selected(stored);
        if within != date {
            tracing::debug!(%date, %stored, "selected date clamped to domain");
        }
        DateSelection {
            date: stored,
            clamped: within != date,
        }
    }

    pub fn set_compare_date(
        &mut self,
        date: Option<NaiveDate>,
    ) -> Result<Option<NaiveDate>, CursorError> {
        let domain = self.registry.combined_domain();
        let Some(date) = date else {
            self.cursor.set_compare_date(None, domain)?;
            return Ok(None);
        };
        if let Some(domain) = domain
            && !domain.contains(date)
        {
            return Err(CursorError::OutOfDomain { date, domain });
        }
        let stored = self.snap_within(date, domain);
        self.cursor.set_compare_date(Some(stored), domain)?;
        Ok(Some(stored))
    }

    pub fn set_analysis_interval(&mut self, interval: Option<DateDomain>) -> Result<(), CursorError> {
        let domain = self.registry.combined_domain();
        self.cursor.set_analysis_interval(interval, domain)
    }

    /// Restores cursor values from a permalink, then clamps them against the
    /// current domain.
    pub fn restore_cursor(
        &mut self,
        selected: Option<NaiveDate>,
        compare: Option<NaiveDate>,
        analysis_interval: Option<DateDomain>,
    ) -> ClampReport {
        self.cursor.restore(selected, compare, analysis_interval);
        self.cursor.clamp_to_domain(self.registry.combined_domain())
    }

    fn snap_within(&self, date: NaiveDate, domain: Option<DateDomain>) -> NaiveDate {
        let snapped = match self.registry.finest_density() {
            Some(density) => density.snap(date),
            None => date,
        };
        // Flooring can step below the domain start; pull it back in.
        domain.map_or(snapped, |d| d.clamp(snapped))
    }

    fn settle(&mut self, before: Option<DateDomain>) -> TimelineUpdate {
        let after = self.registry.combined_domain();
        let clamp = self.cursor.clamp_to_domain(after);
        if clamp.any() {
            tracing::debug!(?clamp, "cursor clamped after registry change");
        }
        TimelineUpdate {
            domain_changed: before != after,
            clamp,
        }
    }
}
