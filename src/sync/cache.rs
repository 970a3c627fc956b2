use dashmap::DashMap;

use crate::ObjectKey;
use crate::WatchedResource;

/// Thread-safe key→object store for one watched resource kind.
///
/// Writes come only from the watch consumer and are last-write-wins per key;
/// reads are served concurrently to the gateway and the workers. Cache writes
/// never block on downstream processing.
pub struct Cache<R> {
    objects: DashMap<ObjectKey, R>,
}

impl<R: WatchedResource> Cache<R> {
    pub fn new() -> Self {
        Self {
            objects: DashMap::new(),
        }
    }

    pub fn insert(&self, object: R) {
        self.objects.insert(object.key(), object);
    }

    pub fn remove(&self, key: &ObjectKey) {
        self.objects.remove(key);
    }

    pub fn get(&self, key: &ObjectKey) -> Option<R> {
        self.objects.get(key).map(|entry| entry.value().clone())
    }

    pub fn list(&self) -> Vec<R> {
        self.objects
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl<R: WatchedResource> Default for Cache<R> {
    fn default() -> Self {
        Self::new()
    }
}
