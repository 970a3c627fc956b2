use bytes::Bytes;
use serde::Deserialize;
use serde::Serialize;

use super::base64_bytes;
use super::ObjectMeta;
use super::ResourceKind;
use super::WatchedResource;

/// Device-state resource: one object per robot vacuum.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Vacuum {
    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub status: VacuumStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VacuumStatus {
    #[serde(default)]
    pub state: String,

    #[serde(default)]
    pub battery: u32,

    #[serde(default)]
    pub fan_power: u32,

    #[serde(default)]
    pub error_code: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map: Option<MapArtifact>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<Position>,
}

/// Binary map payload reported by a device. Base64 on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapArtifact {
    #[serde(with = "base64_bytes")]
    pub data: Bytes,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl WatchedResource for Vacuum {
    const KIND: ResourceKind = ResourceKind::Vacuums;

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
