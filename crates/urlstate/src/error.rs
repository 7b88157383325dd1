use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlStateError {
    #[error("malformed `{key}` parameter: {reason}")]
    Malformed { key: String, reason: String },

    #[error("url parameter `{0}` is bound twice")]
    DuplicateParam(String),

    #[error("browser location unavailable")]
    BrowserUnavailable,
}
