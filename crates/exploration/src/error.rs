use aoi::AoiError;
use foundation::DatasetId;
use thiserror::Error;
use timeline::{CursorError, RegistryError};
use urlstate::{KvError, UrlStateError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Cursor(#[from] CursorError),

    #[error(transparent)]
    Aoi(#[from] AoiError),

    #[error(transparent)]
    Url(#[from] UrlStateError),

    #[error(transparent)]
    Storage(#[from] KvError),

    #[error("invalid exploration config: {0}")]
    Config(String),

    #[error("analysis needs {0}")]
    AnalysisUnavailable(&'static str),

    #[error("load result for `{0}` is stale")]
    StaleLoad(DatasetId),

    #[error("unknown AOI preset `{0}`")]
    UnknownPreset(String),
}
