//! Typed model of the watched resource kinds.
//!
//! Two versioned, namespaced object kinds are mirrored from the store: the
//! device-state resource ([`Vacuum`]) and the task-state resource
//! ([`Cleaning`]). Both carry a status sub-structure with a potentially large
//! map artifact that is stripped from list responses and streamed out-of-band
//! by the gateway.

mod cleaning;
mod kind;
mod meta;
mod vacuum;

pub use cleaning::*;
pub use kind::*;
pub use meta::*;
pub use vacuum::*;

#[cfg(test)]
mod resource_test;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;

/// Capability of an object kind that can be mirrored by a watch controller:
/// it has a namespaced identity and may carry a binary map artifact.
pub trait WatchedResource:
    Clone + Send + Sync + Serialize + DeserializeOwned + 'static
{
    const KIND: ResourceKind;

    fn metadata(&self) -> &ObjectMeta;

    /// Cache key of this object. Derived from metadata only, so it stays
    /// valid for delete events where the rest of the object may already be
    /// torn down on the store side.
    fn key(&self) -> ObjectKey {
        ObjectKey::from(self.metadata())
    }

    /// Copy of the object with the large payload fields removed, for list
    /// responses.
    fn strip_payload(&self) -> Self;

    /// The binary map artifact, if the device has reported one.
    fn map_data(&self) -> Option<&Bytes>;
}

/// Wire shape of a list response from the store, re-used by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceList<R> {
    #[serde(default = "Vec::new")]
    pub items: Vec<R>,
}

/// Base64 representation for binary payloads in JSON bodies.
pub(crate) mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use bytes::Bytes;
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(data: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}
