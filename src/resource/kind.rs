use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::StoreError;

/// The two resource kinds mirrored from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Vacuums,
    Cleanings,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Vacuums => "vacuums",
            ResourceKind::Cleanings => "cleanings",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vacuums" => Ok(ResourceKind::Vacuums),
            "cleanings" => Ok(ResourceKind::Cleanings),
            other => Err(StoreError::UnknownKind(other.to_string())),
        }
    }
}
