use chrono::NaiveDate;
use foundation::DateDomain;
use serde::Serialize;

use crate::error::CursorError;

/// Selected date, optional comparison date and optional analysis interval.
///
/// Every setter takes the current combined domain. When that domain is known
/// the value must fall within it; when it is unknown any value is kept as-is
/// and validated later by [`TemporalCursor::clamp_to_domain`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TemporalCursor {
    selected: Option<NaiveDate>,
    compare: Option<NaiveDate>,
    analysis_interval: Option<DateDomain>,
}

/// Which cursor fields a clamp pass moved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClampReport {
    pub selected: bool,
    pub compare: bool,
    pub interval: bool,
}

impl ClampReport {
    pub fn any(&self) -> bool {
        self.selected || self.compare || self.interval
    }
}

fn check(date: NaiveDate, domain: Option<DateDomain>) -> Result<(), CursorError> {
    match domain {
        Some(domain) if !domain.contains(date) => Err(CursorError::OutOfDomain { date, domain }),
        _ => Ok(()),
    }
}

impl TemporalCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.selected
    }

    pub fn compare_date(&self) -> Option<NaiveDate> {
        self.compare
    }

    /// Comparison mode is active exactly while a compare date is set.
    pub fn is_compare_active(&self) -> bool {
        self.compare.is_some()
    }

    pub fn analysis_interval(&self) -> Option<DateDomain> {
        self.analysis_interval
    }

    pub fn set_selected_date(
        &mut self,
        date: NaiveDate,
        domain: Option<DateDomain>,
    ) -> Result<(), CursorError> {
        check(date, domain)?;
        self.selected = Some(date);
        Ok(())
    }

    /// Stores a date the caller has already placed within the domain.
    pub(crate) fn place_selected(&mut self, date: NaiveDate) {
        self.selected = Some(date);
    }

    pub fn set_compare_date(
        &mut self,
        date: Option<NaiveDate>,
        domain: Option<DateDomain>,
    ) -> Result<(), CursorError> {
        if let Some(date) = date {
            check(date, domain)?;
        }
        self.compare = date;
        Ok(())
    }

    pub fn set_analysis_interval(
        &mut self,
        interval: Option<DateDomain>,
        domain: Option<DateDomain>,
    ) -> Result<(), CursorError> {
        if let (Some(interval), Some(domain)) = (interval, domain)
            && !domain.contains_domain(&interval)
        {
            return Err(CursorError::IntervalOutOfDomain { interval, domain });
        }
        self.analysis_interval = interval;
        Ok(())
    }

    /// Replaces all fields without validation (restoring from a permalink).
    pub fn restore(
        &mut self,
        selected: Option<NaiveDate>,
        compare: Option<NaiveDate>,
        analysis_interval: Option<DateDomain>,
    ) {
        self.selected = selected;
        self.compare = compare;
        self.analysis_interval = analysis_interval;
    }

    /// Pulls every field back inside `domain`.
    ///
    /// - Dates outside move to the nearest boundary.
    /// - A missing selected date defaults to `domain.end` (most recent data).
    /// - The analysis interval shrinks to its overlap with `domain`, or is
    ///   cleared when there is none.
    /// - With no domain, nothing changes: the last known values are kept.
    ///
    /// Idempotent: a second pass with the same domain reports no change.
    pub fn clamp_to_domain(&mut self, domain: Option<DateDomain>) -> ClampReport {
        let mut report = ClampReport::default();
        let Some(domain) = domain else {
            return report;
        };

        let selected = match self.selected {
            Some(date) => domain.clamp(date),
            None => domain.end(),
        };
        if self.selected != Some(selected) {
            self.selected = Some(selected);
            report.selected = true;
        }

        if let Some(compare) = self.compare {
            let clamped = domain.clamp(compare);
            if clamped != compare {
                self.compare = Some(clamped);
                report.compare = true;
            }
        }

        if let Some(interval) = self.analysis_interval {
            let next = interval.intersect(&domain);
            if next != Some(interval) {
                self.analysis_interval = next;
                report.interval = true;
            }
        }

        report
    }
}
