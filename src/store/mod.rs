//! Access to the external resource store.
//!
//! The store is a black box providing list+watch semantics per resource
//! kind, plus a substrate endpoint that runs execution units to completion.
//! Everything behind [`ListWatch`] is replaceable in tests.

mod rest;

pub use rest::*;


use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::StoreError;
use crate::WatchedResource;

/// One mutation observed on the watch stream.
#[derive(Debug, Clone)]
pub enum WatchEvent<R> {
    Added(R),
    Modified(R),
    Deleted(R),
}

/// Live stream of watch events, ending when the store drops the connection.
pub type EventStream<R> = BoxStream<'static, std::result::Result<WatchEvent<R>, StoreError>>;

/// List+watch access to one resource kind.
///
/// `list` must return a consistent full listing; incremental `watch` events
/// are only trusted after that listing has been applied (cache-sync barrier).
#[async_trait]
pub trait ListWatch<R: WatchedResource>: Send + Sync + 'static {
    async fn list(&self) -> std::result::Result<Vec<R>, StoreError>;

    async fn watch(&self) -> std::result::Result<EventStream<R>, StoreError>;
}
