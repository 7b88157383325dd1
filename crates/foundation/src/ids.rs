use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of a timeline dataset (e.g. `no2-monthly`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetId(String);

impl DatasetId {
    pub fn new(id: impl Into<String>) -> Self {
        DatasetId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DatasetId {
    fn from(s: &str) -> Self {
        DatasetId(s.to_string())
    }
}

impl From<String> for DatasetId {
    fn from(s: String) -> Self {
        DatasetId(s)
    }
}

impl Borrow<str> for DatasetId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
