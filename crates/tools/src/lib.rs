//! Permalink decoding and encoding shared by the `veda-permalink` binary.

use std::fs;
use std::path::{Path, PathBuf};

use exploration::{ExplorationConfig, PermalinkState, SessionError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn load_config(path: Option<&Path>) -> Result<ExplorationConfig, ToolError> {
    let Some(path) = path else {
        return Ok(ExplorationConfig::default());
    };
    let raw = read(path)?;
    Ok(ExplorationConfig::from_json(&raw)?)
}

/// Hydrated state of `query` as pretty JSON. A leading `?` is ignored.
pub fn decode(query: &str, config: &ExplorationConfig, strict: bool) -> Result<String, ToolError> {
    let query = query.strip_prefix('?').unwrap_or(query);
    let state = if strict {
        PermalinkState::from_query_strict(query, config)?
    } else {
        PermalinkState::from_query(query, config)?
    };
    tracing::debug!(datasets = state.datasets.len(), "decoded permalink");
    Ok(serde_json::to_string_pretty(&state)?)
}

/// Canonical query string for a JSON state document. Missing fields take
/// their defaults.
pub fn encode(state_json: &str, config: &ExplorationConfig) -> Result<String, ToolError> {
    let state: PermalinkState = serde_json::from_str(state_json)?;
    Ok(state.to_query(config)?)
}

pub fn encode_file(path: &Path, config: &ExplorationConfig) -> Result<String, ToolError> {
    let raw = read(path)?;
    let state: PermalinkState = serde_json::from_str(&raw).map_err(|source| ToolError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(state.to_query(config)?)
}

fn read(path: &Path) -> Result<String, ToolError> {
    fs::read_to_string(path).map_err(|source| ToolError::Read {
        path: path.to_path_buf(),
        source,
    })
}
