//! Persisted provenance events
//!
//! `ProvenanceRepository` is the append-only store finalizers flush a
//! session's buffered events into. Event ids are assigned here, in the
//! order events are registered.

use flowfile_core::ProvenanceEvent;
use parking_lot::RwLock;

/// Append-only, in-memory provenance event store
#[derive(Debug, Default)]
pub struct ProvenanceRepository {
    events: RwLock<Vec<ProvenanceEvent>>,
}

impl ProvenanceRepository {
    /// Empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist a batch of events, assigning consecutive ids
    ///
    /// The whole batch is appended under one write lock, so readers see
    /// either none or all of it. Returns the assigned ids.
    pub fn register<I>(&self, batch: I) -> Vec<u64>
    where
        I: IntoIterator<Item = ProvenanceEvent>,
    {
        let mut events = self.events.write();
        let mut ids = Vec::new();
        for mut event in batch {
            let id = events.len() as u64;
            event.event_id = Some(id);
            events.push(event);
            ids.push(id);
        }
        ids
    }

    /// Number of persisted events
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Whether nothing has been persisted
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// All events, in registration order
    pub fn events(&self) -> Vec<ProvenanceEvent> {
        self.events.read().clone()
    }

    /// Event by id
    pub fn event(&self, id: u64) -> Option<ProvenanceEvent> {
        self.events.read().get(id as usize).cloned()
    }

    /// Events that mention `uuid` as subject, parent or child
    pub fn lineage(&self, uuid: &str) -> Vec<ProvenanceEvent> {
        self.events
            .read()
            .iter()
            .filter(|event| event.references(uuid))
            .cloned()
            .collect()
    }
}
