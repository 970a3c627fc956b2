//! Change-propagation pipeline.
//!
//! A [`Controller`] drives the store's list+watch stream into a local
//! [`Cache`] and converts every observed mutation into a key enqueued on a
//! de-duplicating, rate-limited [`WorkQueue`]. Worker loops dequeue keys and
//! invoke a [`Syncer`] with bounded retry; terminal failures go to an
//! [`ErrorSink`] and never crash the loop.

mod cache;
mod controller;
mod queue;

pub use cache::*;
pub use controller::*;
pub use queue::*;

#[cfg(test)]
mod controller_test;
