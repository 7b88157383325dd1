//! Calendar primitives for timeline datasets.
//!
//! Dates are plain calendar days (`chrono::NaiveDate`); timelines never carry
//! a time of day or a zone.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Inclusive date range over which a dataset has valid data.
///
/// Construction guarantees `start <= end`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDomain")]
pub struct DateDomain {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawDomain {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawDomain> for DateDomain {
    type Error = String;

    fn try_from(raw: RawDomain) -> Result<Self, Self::Error> {
        DateDomain::new(raw.start, raw.end)
            .ok_or_else(|| format!("inverted date domain: {} > {}", raw.start, raw.end))
    }
}

impl DateDomain {
    /// Returns `None` when the range is inverted.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn instant(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Endpoints are inclusive.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn contains_domain(&self, other: &DateDomain) -> bool {
        self.contains(other.start) && self.contains(other.end)
    }

    /// Moves `date` to the nearest boundary when it falls outside.
    pub fn clamp(&self, date: NaiveDate) -> NaiveDate {
        date.clamp(self.start, self.end)
    }

    /// `[max(starts), min(ends)]`, or `None` when the overlap is empty.
    pub fn intersect(&self, other: &DateDomain) -> Option<DateDomain> {
        DateDomain::new(self.start.max(other.start), self.end.min(other.end))
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

/// Granularity at which a dataset's timeline is indexed.
///
/// Variants are ordered coarse to fine, so `max` picks the finest density.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeDensity {
    Year,
    Month,
    Day,
}

impl TimeDensity {
    /// Floors `date` to the first day of its year or month.
    pub fn snap(self, date: NaiveDate) -> NaiveDate {
        let snapped = match self {
            TimeDensity::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1),
            TimeDensity::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1),
            TimeDensity::Day => Some(date),
        };
        // The first of a month always exists for a year chrono can represent.
        snapped.unwrap_or(date)
    }

    /// Display label for a date at this granularity.
    pub fn format(self, date: NaiveDate) -> String {
        match self {
            TimeDensity::Year => date.format("%Y").to_string(),
            TimeDensity::Month => date.format("%b %Y").to_string(),
            TimeDensity::Day => date.format("%Y-%m-%d").to_string(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeDensity::Year => "year",
            TimeDensity::Month => "month",
            TimeDensity::Day => "day",
        }
    }
}

/// Parses `YYYY-MM-DD`, also accepting a full ISO timestamp whose date part
/// comes first (`2020-01-01T00:00:00.000Z`).
pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = match raw.split_once('T') {
        Some((date, _time)) => date,
        None => raw,
    };
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

pub fn format_iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
