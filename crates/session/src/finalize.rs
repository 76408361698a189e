//! Commit finalization
//!
//! `ProcessSession::commit` validates its bookkeeping and then hands a
//! [`CommitBatch`] to the session's finalizer. The finalizer publishes
//! whatever it takes out of the batch; whatever it leaves behind goes back
//! into the session so callers can still inspect it after commit.

use flowfile_core::{
    FlowFile, ProvenanceEvent, ProvenanceEventType, Relationship, Result, SessionId,
};
use flowfile_storage::{Connections, CounterRepository, ProvenanceRepository};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Everything a session stages for publication on commit
#[derive(Debug)]
pub struct CommitBatch {
    session: SessionId,
    /// Staged output per relationship, in transfer order
    pub outputs: BTreeMap<Relationship, Vec<FlowFile>>,
    /// Buffered provenance events, in emission order
    pub events: Vec<ProvenanceEvent>,
    /// Counter deltas accumulated by the session
    pub counters: BTreeMap<String, i64>,
}

impl CommitBatch {
    pub(crate) fn new(
        session: SessionId,
        outputs: BTreeMap<Relationship, Vec<FlowFile>>,
        events: Vec<ProvenanceEvent>,
        counters: BTreeMap<String, i64>,
    ) -> Self {
        Self {
            session,
            outputs,
            events,
            counters,
        }
    }

    /// Session being committed
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Records staged for `relationship`, in transfer order
    pub fn records(&self, relationship: &Relationship) -> &[FlowFile] {
        self.outputs
            .get(relationship)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of staged records
    pub fn record_count(&self) -> usize {
        self.outputs.values().map(Vec::len).sum()
    }

    /// Take the staged output
    pub fn take_outputs(&mut self) -> BTreeMap<Relationship, Vec<FlowFile>> {
        std::mem::take(&mut self.outputs)
    }

    /// Take the buffered provenance events
    pub fn take_events(&mut self) -> Vec<ProvenanceEvent> {
        std::mem::take(&mut self.events)
    }

    /// Take the counter deltas
    pub fn take_counters(&mut self) -> BTreeMap<String, i64> {
        std::mem::take(&mut self.counters)
    }
}

/// The publication step run once by a successful commit
///
/// An error aborts the commit: the session stays active and the caller
/// decides whether to retry or roll back.
pub trait SessionFinalizer: Send {
    /// Publish (part of) `batch`
    fn finalize(&mut self, batch: &mut CommitBatch) -> Result<()>;
}

impl<F> SessionFinalizer for F
where
    F: FnMut(&mut CommitBatch) -> Result<()> + Send,
{
    fn finalize(&mut self, batch: &mut CommitBatch) -> Result<()> {
        self(batch)
    }
}

/// Default finalizer: queues, provenance repository and counters
///
/// Staged records go to the destination queues in `connections`; records
/// staged for a relationship without a destination are auto-terminated and
/// get a DROP event. Provenance is registered as one batch and counter
/// deltas are applied last.
pub struct Publisher {
    connections: Arc<Connections>,
    provenance: Arc<ProvenanceRepository>,
    counters: Arc<CounterRepository>,
}

impl Publisher {
    /// Publisher over shared repositories
    pub fn new(
        connections: Arc<Connections>,
        provenance: Arc<ProvenanceRepository>,
        counters: Arc<CounterRepository>,
    ) -> Self {
        Self {
            connections,
            provenance,
            counters,
        }
    }
}

impl SessionFinalizer for Publisher {
    fn finalize(&mut self, batch: &mut CommitBatch) -> Result<()> {
        let session = batch.session();
        let outputs = batch.take_outputs();
        let published = outputs.values().map(Vec::len).sum::<usize>();

        let unrouted = self.connections.publish(outputs);
        for (relationship, records) in unrouted {
            warn!(
                session = %session,
                relationship = %relationship,
                count = records.len(),
                "No destination for relationship, auto-terminating records"
            );
            for record in &records {
                let mut event = ProvenanceEvent::new(ProvenanceEventType::Drop, record);
                event.relationship = Some(relationship.name().to_string());
                event.transit.details = Some(format!("Auto-terminated by {}", relationship));
                batch.events.push(event);
            }
        }

        let ids = self.provenance.register(batch.take_events());
        for (name, delta) in batch.take_counters() {
            self.counters.adjust(&name, delta);
        }

        debug!(
            session = %session,
            records = published,
            events = ids.len(),
            "Published session output"
        );
        Ok(())
    }
}
