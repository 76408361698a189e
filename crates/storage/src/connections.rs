//! Relationship-to-queue wiring
//!
//! `Connections` maps each relationship a component routes to onto the
//! destination queue that receives its records. `publish` is the step a
//! finalizer uses to make a session's staged output visible: every affected
//! destination queue is locked before any of them is extended, so another
//! thread never observes half of a commit.

use crate::queue::FlowFileQueue;
use flowfile_core::{FlowFile, Relationship};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::trace;

/// Destination queues keyed by relationship
#[derive(Debug, Default)]
pub struct Connections {
    destinations: RwLock<BTreeMap<Relationship, Arc<FlowFileQueue>>>,
}

impl Connections {
    /// No connections
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `relationship` to `queue`, replacing any previous destination
    pub fn connect(&self, relationship: Relationship, queue: Arc<FlowFileQueue>) {
        self.destinations.write().insert(relationship, queue);
    }

    /// Stop routing `relationship`; records sent to it are then dropped
    pub fn disconnect(&self, relationship: &Relationship) -> Option<Arc<FlowFileQueue>> {
        self.destinations.write().remove(relationship)
    }

    /// Destination queue of `relationship`
    pub fn destination(&self, relationship: &Relationship) -> Option<Arc<FlowFileQueue>> {
        self.destinations.read().get(relationship).cloned()
    }

    /// Append each batch to its relationship's destination queue atomically
    ///
    /// Batches for relationships without a destination are returned
    /// untouched so the caller can decide what dropping them means.
    pub fn publish(
        &self,
        batches: BTreeMap<Relationship, Vec<FlowFile>>,
    ) -> BTreeMap<Relationship, Vec<FlowFile>> {
        let destinations = self.destinations.read();

        let mut unrouted = BTreeMap::new();
        // Several relationships may share one queue; merge their batches so
        // each queue is locked once.
        let mut per_queue: Vec<(Arc<FlowFileQueue>, Vec<FlowFile>)> = Vec::new();
        for (relationship, records) in batches {
            if records.is_empty() {
                continue;
            }
            match destinations.get(&relationship) {
                Some(queue) => {
                    trace!(
                        relationship = %relationship,
                        queue = queue.name(),
                        count = records.len(),
                        "Publishing staged records"
                    );
                    match per_queue.iter_mut().find(|(q, _)| Arc::ptr_eq(q, queue)) {
                        Some((_, pending)) => pending.extend(records),
                        None => per_queue.push((Arc::clone(queue), records)),
                    }
                }
                None => {
                    unrouted.insert(relationship, records);
                }
            }
        }

        // Lock in address order so concurrent publishers cannot deadlock.
        per_queue.sort_by_key(|(queue, _)| Arc::as_ptr(queue) as usize);
        let (queues, pending): (Vec<_>, Vec<_>) = per_queue.into_iter().unzip();
        let mut guards: Vec<_> = queues.iter().map(|queue| queue.lock()).collect();
        for (guard, records) in guards.iter_mut().zip(pending) {
            guard.extend(records);
        }
        drop(guards);

        unrouted
    }
}
