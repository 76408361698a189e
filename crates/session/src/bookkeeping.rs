//! Per-session record bookkeeping
//!
//! Tracks, for every record a session touches, which version is current,
//! which version was dequeued (for rollback), and where the record is in
//! its lifecycle:
//!
//! ```text
//! DEQUEUED / CREATED ──► BEING_PROCESSED ──► TRANSFERRED(destination)
//!                                       ├──► REMOVED
//!                                       └──► MIGRATED (leaves this session)
//! ```
//!
//! A record id is in at most one of {being-processed, staged, removed} at
//! any time. Every mutation goes through the methods below, which keep the
//! structures in step.

use flowfile_core::{Error, FlowFile, RecordId, Relationship, Result};
use indexmap::{IndexMap, IndexSet};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use std::fmt;

/// Where a transferred record will go on commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// A declared relationship
    Relationship(Relationship),
    /// Back onto the session's own input queue
    Input,
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Relationship(rel) => write!(f, "{}", rel),
            Destination::Input => f.write_str("input queue"),
        }
    }
}

/// Lifecycle state of a record inside a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordState {
    /// Fetched or created, not yet resolved
    BeingProcessed,
    /// Staged for a destination
    Transferred(Destination),
    /// Removed from the flow
    Removed,
}

/// Everything a session knows about one record, detached for migration
#[derive(Debug, Clone)]
pub(crate) struct OwnedRecord {
    pub current: FlowFile,
    pub original: Option<FlowFile>,
    pub destination: Option<Destination>,
    pub penalized: bool,
}

#[derive(Debug, Default)]
pub(crate) struct Bookkeeping {
    /// Latest version of each record the component may reference
    current: FxHashMap<RecordId, FlowFile>,
    /// Versions as dequeued, in acquisition order
    original: IndexMap<RecordId, FlowFile>,
    being_processed: IndexSet<RecordId>,
    /// Staged output per relationship, in transfer order
    staged: BTreeMap<Relationship, Vec<FlowFile>>,
    /// Records routed back to the input queue, in transfer order
    requeued: Vec<FlowFile>,
    destinations: FxHashMap<RecordId, Destination>,
    penalized: IndexSet<RecordId>,
    removed: FxHashSet<RecordId>,
    counters: BTreeMap<String, i64>,
}

impl Bookkeeping {
    /// Track a record dequeued from the input
    pub fn acquire(&mut self, record: FlowFile) {
        let id = record.id();
        self.original.insert(id, record.clone());
        self.current.insert(id, record);
        self.being_processed.insert(id);
    }

    /// Track a record created in this session
    pub fn adopt(&mut self, record: FlowFile) {
        let id = record.id();
        self.current.insert(id, record);
        self.being_processed.insert(id);
    }

    /// The current version `record` refers to
    ///
    /// Fails with `UnknownRecord` for ids this session does not own and for
    /// superseded revisions.
    pub fn resolve(&self, record: &FlowFile) -> Result<&FlowFile> {
        match self.current.get(&record.id()) {
            Some(current) if current.revision() == record.revision() => Ok(current),
            _ => Err(Error::UnknownRecord { id: record.id() }),
        }
    }

    /// Resolve `record` and require that it has not been staged
    pub fn validate_state(&self, record: &FlowFile) -> Result<&FlowFile> {
        let current = self.resolve(record)?;
        if let Some(destination) = self.destinations.get(&record.id()) {
            return Err(Error::AlreadyTransferred {
                id: record.id(),
                destination: destination.to_string(),
            });
        }
        Ok(current)
    }

    /// Resolve `record` and require that it is still being processed
    pub fn require_being_processed(&self, record: &FlowFile) -> Result<&FlowFile> {
        let current = self.resolve(record)?;
        if !self.being_processed.contains(&record.id()) {
            return Err(Error::NotFound { id: record.id() });
        }
        Ok(current)
    }

    /// Install a new version of a record this session already owns
    pub fn replace(&mut self, record: FlowFile) {
        debug_assert!(self.current.contains_key(&record.id()));
        self.current.insert(record.id(), record);
    }

    /// Move a record from being-processed to a destination
    pub fn stage(&mut self, record: FlowFile, destination: Destination) {
        let id = record.id();
        self.being_processed.shift_remove(&id);
        match &destination {
            Destination::Relationship(rel) => self
                .staged
                .entry(rel.clone())
                .or_default()
                .push(record.clone()),
            Destination::Input => self.requeued.push(record.clone()),
        }
        self.destinations.insert(id, destination);
        self.current.insert(id, record);
    }

    /// Drop a being-processed record from the flow
    pub fn remove(&mut self, id: RecordId) {
        self.being_processed.shift_remove(&id);
        self.current.remove(&id);
        self.penalized.shift_remove(&id);
        self.removed.insert(id);
    }

    pub fn mark_penalized(&mut self, id: RecordId, penalized: bool) {
        if penalized {
            self.penalized.insert(id);
        } else {
            self.penalized.shift_remove(&id);
        }
    }

    pub fn adjust_counter(&mut self, name: &str, delta: i64) {
        *self.counters.entry(name.to_string()).or_insert(0) += delta;
    }

    /// Lifecycle state of `id`, if this session tracks it
    pub fn state(&self, id: RecordId) -> Option<RecordState> {
        if self.being_processed.contains(&id) {
            Some(RecordState::BeingProcessed)
        } else if let Some(destination) = self.destinations.get(&id) {
            Some(RecordState::Transferred(destination.clone()))
        } else if self.removed.contains(&id) {
            Some(RecordState::Removed)
        } else {
            None
        }
    }

    pub fn being_processed(&self) -> Vec<RecordId> {
        self.being_processed.iter().copied().collect()
    }

    pub fn being_processed_count(&self) -> usize {
        self.being_processed.len()
    }

    pub fn original(&self, id: RecordId) -> Option<&FlowFile> {
        self.original.get(&id)
    }

    /// Dequeued versions of every record still owned, in acquisition order
    pub fn originals(&self) -> impl Iterator<Item = &FlowFile> {
        self.original.values()
    }

    pub fn staged(&self) -> &BTreeMap<Relationship, Vec<FlowFile>> {
        &self.staged
    }

    pub fn staged_for(&self, relationship: &Relationship) -> &[FlowFile] {
        self.staged
            .get(relationship)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn staged_count(&self) -> usize {
        self.staged.values().map(Vec::len).sum::<usize>() + self.requeued.len()
    }

    pub fn requeued(&self) -> &[FlowFile] {
        &self.requeued
    }

    pub fn take_requeued(&mut self) -> Vec<FlowFile> {
        std::mem::take(&mut self.requeued)
    }

    pub fn take_staged(&mut self) -> BTreeMap<Relationship, Vec<FlowFile>> {
        std::mem::take(&mut self.staged)
    }

    pub fn restore_staged(&mut self, staged: BTreeMap<Relationship, Vec<FlowFile>>) {
        self.staged = staged;
    }

    pub fn penalized(&self) -> impl Iterator<Item = &FlowFile> {
        self.penalized.iter().filter_map(|id| self.current.get(id))
    }

    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }

    pub fn counters(&self) -> &BTreeMap<String, i64> {
        &self.counters
    }

    pub fn take_counters(&mut self) -> BTreeMap<String, i64> {
        std::mem::take(&mut self.counters)
    }

    pub fn restore_counters(&mut self, counters: BTreeMap<String, i64>) {
        self.counters = counters;
    }

    /// True when nothing would be lost by dropping this bookkeeping
    pub fn is_empty(&self) -> bool {
        self.current.is_empty() && self.original.is_empty() && self.removed.is_empty()
    }

    /// Forget per-record state after a successful commit
    ///
    /// Staged output and removal counts stay readable.
    pub fn clear_after_commit(&mut self) {
        self.current.clear();
        self.original.clear();
        self.being_processed.clear();
        self.destinations.clear();
        self.penalized.clear();
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.clear_after_commit();
        self.staged.clear();
        self.requeued.clear();
        self.removed.clear();
        self.counters.clear();
    }

    /// Detach a record so another session can adopt it
    pub fn extract(&mut self, id: RecordId) -> Option<OwnedRecord> {
        let current = self.current.remove(&id)?;
        let original = self.original.shift_remove(&id);
        self.being_processed.shift_remove(&id);
        let penalized = self.penalized.shift_remove(&id);
        let destination = self.destinations.remove(&id);

        match &destination {
            Some(Destination::Relationship(rel)) => {
                if let Some(records) = self.staged.get_mut(rel) {
                    records.retain(|r| r.id() != id);
                    if records.is_empty() {
                        self.staged.remove(rel);
                    }
                }
            }
            Some(Destination::Input) => self.requeued.retain(|r| r.id() != id),
            None => {}
        }

        Some(OwnedRecord {
            current,
            original,
            destination,
            penalized,
        })
    }

    /// Adopt a record detached from another session
    pub fn insert(&mut self, record: OwnedRecord) {
        let id = record.current.id();
        if let Some(original) = record.original {
            self.original.insert(id, original);
        }
        if record.penalized {
            self.penalized.insert(id);
        }
        match record.destination {
            Some(destination) => self.stage(record.current, destination),
            None => {
                self.current.insert(id, record.current);
                self.being_processed.insert(id);
            }
        }
    }
}
