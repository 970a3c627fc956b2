use bytes::Bytes;
use serde::Deserialize;
use serde::Serialize;

use super::MapArtifact;
use super::ObjectMeta;
use super::Position;
use super::ResourceKind;
use super::WatchedResource;

/// Task-state resource: one object per cleaning run, terminal once the run
/// has ended.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cleaning {
    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub status: CleaningStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleaningStatus {
    #[serde(default)]
    pub state: String,

    /// Cleaned area in square millimetres.
    #[serde(default)]
    pub area: u64,

    #[serde(default)]
    pub duration_seconds: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub begin_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<MapArtifact>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<Position>,
}

impl WatchedResource for Cleaning {
    const KIND: ResourceKind = ResourceKind::Cleanings;

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn strip_payload(&self) -> Self {
        let mut smaller = self.clone();
        smaller.status.map = None;
        smaller.status.path = Vec::new();
        smaller
    }

    fn map_data(&self) -> Option<&Bytes> {
        self.status.map.as_ref().map(|m| &m.data)
    }
}
