use chrono::NaiveDate;
use foundation::{DateDomain, DatasetId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("dataset `{0}` not found")]
    NotFound(DatasetId),

    #[error("dataset `{0}` is already in the timeline")]
    Duplicate(DatasetId),

    #[error("invalid status payload: {0}")]
    InvalidStatusPayload(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CursorError {
    #[error("{date} is outside the available range {}..={}", .domain.start(), .domain.end())]
    OutOfDomain { date: NaiveDate, domain: DateDomain },

    #[error(
        "interval {}..={} is not within {}..={}",
        .interval.start(),
        .interval.end(),
        .domain.start(),
        .domain.end()
    )]
    IntervalOutOfDomain {
        interval: DateDomain,
        domain: DateDomain,
    },
}
