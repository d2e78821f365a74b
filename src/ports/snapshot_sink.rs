//! Observability port trait.

use crate::domain::engine::EngineSnapshot;

pub trait SnapshotSink {
    fn publish(&mut self, snapshot: &EngineSnapshot);
}

/// Sink that drops every snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl SnapshotSink for NullSink {
    fn publish(&mut self, _snapshot: &EngineSnapshot) {}
}
