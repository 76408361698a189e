//! The processing session
//!
//! A `ProcessSession` is the unit of work one component invocation runs
//! in. It dequeues records from a shared input queue, lets the component
//! derive new versions of them, stages each one for a relationship (or
//! removes it), and finally either commits or rolls back:
//!
//! ```text
//! Active ──commit()──► Committed
//!    │
//!    └──rollback()──► RolledBack
//! ```
//!
//! Nothing the session stages is visible outside it until the finalizer
//! runs inside `commit()`. Rollback puts every dequeued record back on the
//! input queue as it was dequeued.
//!
//! A session is owned by one thread at a time; it is `Send` but not
//! `Sync`. Only the input queue, content repository and enqueue sequence
//! are shared with other sessions.

use crate::bookkeeping::{Bookkeeping, Destination, RecordState};
use crate::config::SessionConfig;
use crate::finalize::{CommitBatch, SessionFinalizer};
use crate::provenance::ProvenanceCollector;
use chrono::{Duration, Utc};
use flowfile_core::{
    intersect_attributes, is_immutable_key, Attributes, Content, ContentRepository, Error,
    FlowFile, ProvenanceEventType, RelationshipCatalog, Relationship, Result, SessionId,
};
use flowfile_storage::{EnqueueSequence, FilterResult, FlowFileQueue};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Accepting operations
    Active,
    /// Commit succeeded (terminal)
    Committed,
    /// Rolled back (terminal)
    RolledBack,
}

/// Transactional context for one component invocation
pub struct ProcessSession {
    pub(crate) id: SessionId,
    pub(crate) status: SessionStatus,
    pub(crate) input: Arc<FlowFileQueue>,
    pub(crate) content: Arc<dyn ContentRepository>,
    relationships: Arc<dyn RelationshipCatalog>,
    sequence: Arc<EnqueueSequence>,
    penalty: Duration,
    max_batch_size: usize,
    finalizer: Option<Box<dyn SessionFinalizer>>,
    pub(crate) records: Bookkeeping,
    pub(crate) provenance: ProvenanceCollector,
}

impl ProcessSession {
    /// New active session draining `input`
    ///
    /// Without a finalizer, `commit` only validates and clears bookkeeping;
    /// staged output stays readable through [`transferred`](Self::transferred).
    pub fn new(
        id: SessionId,
        input: Arc<FlowFileQueue>,
        content: Arc<dyn ContentRepository>,
        relationships: Arc<dyn RelationshipCatalog>,
        sequence: Arc<EnqueueSequence>,
    ) -> Self {
        let defaults = SessionConfig::default();
        debug!(session = %id, input = input.name(), "Session opened");
        Self {
            id,
            status: SessionStatus::Active,
            input,
            content,
            relationships,
            sequence,
            penalty: defaults.penalty_duration(),
            max_batch_size: defaults.max_batch_size,
            finalizer: None,
            records: Bookkeeping::default(),
            provenance: ProvenanceCollector::new(),
        }
    }

    /// Apply penalty and batch settings from `config`
    pub fn with_config(mut self, config: &SessionConfig) -> Self {
        self.penalty = config.penalty_duration();
        self.max_batch_size = config.max_batch_size.max(1);
        self
    }

    /// How long `penalize` and `rollback(true)` delay a record
    pub fn with_penalty_duration(mut self, penalty: Duration) -> Self {
        self.penalty = penalty;
        self
    }

    /// Install the commit finalizer
    pub fn with_finalizer(mut self, finalizer: impl SessionFinalizer + 'static) -> Self {
        self.finalizer = Some(Box::new(finalizer));
        self
    }

    /// Install a closure as the commit finalizer
    pub fn on_commit<F>(self, finalizer: F) -> Self
    where
        F: FnMut(&mut CommitBatch) -> Result<()> + Send + 'static,
    {
        self.with_finalizer(finalizer)
    }

    // ========================================================================
    // State
    // ========================================================================

    /// Session id
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current lifecycle state
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Whether operations are still accepted
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Fail unless the session is active
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(Error::SessionNotActive {
                session: self.id,
                state: format!("{:?}", self.status),
            })
        }
    }

    /// Lifecycle state of `record` inside this session
    pub fn state_of(&self, record: &FlowFile) -> Option<RecordState> {
        self.records.state(record.id())
    }

    /// Records staged for `relationship`, in transfer order
    pub fn transferred(&self, relationship: &Relationship) -> &[FlowFile] {
        self.records.staged_for(relationship)
    }

    /// All staged output, by relationship
    pub fn staged(&self) -> &BTreeMap<Relationship, Vec<FlowFile>> {
        self.records.staged()
    }

    /// Records routed back to the input queue, waiting for commit
    pub fn requeued(&self) -> &[FlowFile] {
        self.records.requeued()
    }

    /// Number of records removed in this session
    pub fn removed_count(&self) -> usize {
        self.records.removed_count()
    }

    /// Number of records neither transferred nor removed
    pub fn being_processed_count(&self) -> usize {
        self.records.being_processed_count()
    }

    /// Current versions of the records penalized in this session
    pub fn penalized(&self) -> Vec<FlowFile> {
        self.records.penalized().cloned().collect()
    }

    /// Counter deltas accumulated so far
    pub fn counters(&self) -> &BTreeMap<String, i64> {
        self.records.counters()
    }

    /// Buffered provenance events
    pub fn provenance(&self) -> &ProvenanceCollector {
        &self.provenance
    }

    /// Buffered provenance events, for component-reported events
    pub fn provenance_mut(&mut self) -> &mut ProvenanceCollector {
        &mut self.provenance
    }

    /// Queue this session drains
    pub fn input(&self) -> &Arc<FlowFileQueue> {
        &self.input
    }

    // ========================================================================
    // Queue
    // ========================================================================

    /// Dequeue the next available record
    pub fn get(&mut self) -> Result<Option<FlowFile>> {
        self.ensure_active()?;
        let record = self.input.poll();
        if let Some(record) = &record {
            self.acquire(record.clone());
        }
        Ok(record)
    }

    /// Dequeue up to `max` records, capped by the configured batch size
    pub fn get_batch(&mut self, max: usize) -> Result<Vec<FlowFile>> {
        self.ensure_active()?;
        let records = self.input.poll_batch(max.min(self.max_batch_size));
        for record in &records {
            self.acquire(record.clone());
        }
        Ok(records)
    }

    /// Dequeue the records `filter` accepts
    ///
    /// Rejected records stay on the input queue in their original order.
    pub fn get_matching<F>(&mut self, filter: F) -> Result<Vec<FlowFile>>
    where
        F: FnMut(&FlowFile) -> FilterResult,
    {
        self.ensure_active()?;
        let records = self.input.poll_matching(filter);
        for record in &records {
            self.acquire(record.clone());
        }
        Ok(records)
    }

    fn acquire(&mut self, record: FlowFile) {
        trace!(session = %self.id, record = %record.id(), "Dequeued record");
        self.records.acquire(record);
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// New empty record owned by this session
    ///
    /// It has no original version, so rollback makes it vanish.
    pub fn create(&mut self) -> Result<FlowFile> {
        self.ensure_active()?;
        let record = FlowFile::builder().build();
        self.provenance.create(&record);
        self.records.adopt(record.clone());
        Ok(record)
    }

    /// New record inheriting every attribute of `parent` (FORK)
    pub fn create_child(&mut self, parent: &FlowFile) -> Result<FlowFile> {
        self.create_from(std::slice::from_ref(parent))
    }

    /// New record derived from `parents`
    ///
    /// One parent passes on all its attributes (FORK); several pass on
    /// only the attributes they agree on (JOIN). `uuid` is always fresh.
    pub fn create_from(&mut self, parents: &[FlowFile]) -> Result<FlowFile> {
        self.ensure_active()?;
        if parents.is_empty() {
            return self.create();
        }
        let mut current = Vec::with_capacity(parents.len());
        for parent in parents {
            current.push(self.records.validate_state(parent)?);
        }

        let inherited = intersect_attributes(current.iter().map(|p| p.attributes()));
        let lineage_start = current
            .iter()
            .map(|p| p.lineage_start())
            .min()
            .unwrap_or_else(Utc::now);
        let parent_uuids: Vec<&str> = current.iter().map(|p| p.uuid()).collect();

        let record = FlowFile::builder()
            .attributes(inherited)
            .lineage_start(lineage_start)
            .build();
        let event_type = if parents.len() == 1 {
            ProvenanceEventType::Fork
        } else {
            ProvenanceEventType::Join
        };
        self.provenance
            .record(event_type, &record, &parent_uuids, None);
        self.records.adopt(record.clone());
        Ok(record)
    }

    /// Independent copy of `record` sharing its content (CLONE)
    pub fn clone_record(&mut self, record: &FlowFile) -> Result<FlowFile> {
        self.ensure_active()?;
        let source = self.records.validate_state(record)?;
        let copy = source.duplicate();
        self.provenance
            .record(ProvenanceEventType::Clone, &copy, &[source.uuid()], None);
        self.records.adopt(copy.clone());
        Ok(copy)
    }

    /// Copy of `record` carrying `size` bytes of its content from `offset`
    pub fn clone_range(&mut self, record: &FlowFile, offset: u64, size: u64) -> Result<FlowFile> {
        self.ensure_active()?;
        let source = self.records.validate_state(record)?;
        let total = source.size();
        let out_of_bounds = || Error::Bounds {
            offset,
            length: size,
            size: total,
        };
        let end = offset.checked_add(size).ok_or_else(out_of_bounds)?;
        if end > total {
            return Err(out_of_bounds());
        }

        let content = match source.content() {
            _ if size == 0 => Content::Empty,
            Content::Empty => Content::Empty,
            // end <= total == bytes.len(), so the casts cannot truncate
            Content::Inline(bytes) => Content::Inline(Arc::from(&bytes[offset as usize..end as usize])),
            Content::Claim(claim) => Content::Claim(claim.slice(offset, size).ok_or_else(out_of_bounds)?),
        };
        let copy = source.duplicate().with_content(content);
        self.provenance
            .record(ProvenanceEventType::Clone, &copy, &[source.uuid()], None);
        self.records.adopt(copy.clone());
        Ok(copy)
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    /// Set one attribute
    pub fn put_attribute(
        &mut self,
        record: &FlowFile,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<FlowFile> {
        let key = key.into();
        let value = value.into();
        self.update_attributes(record, std::iter::once(key.as_str()), |attributes| {
            attributes.insert(key.clone(), value);
        })
    }

    /// Set several attributes
    pub fn put_all_attributes<I, K, V>(&mut self, record: &FlowFile, pairs: I) -> Result<FlowFile>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let pairs: Vec<(String, String)> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.update_attributes(record, pairs.iter().map(|(k, _)| k.as_str()), |attributes| {
            attributes.extend(pairs.iter().cloned());
        })
    }

    /// Remove one attribute
    pub fn remove_attribute(&mut self, record: &FlowFile, key: &str) -> Result<FlowFile> {
        self.update_attributes(record, std::iter::once(key), |attributes| {
            attributes.remove(key);
        })
    }

    /// Remove several attributes
    pub fn remove_all_attributes<I, K>(&mut self, record: &FlowFile, keys: I) -> Result<FlowFile>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let keys: Vec<K> = keys.into_iter().collect();
        self.update_attributes(record, keys.iter().map(|k| k.as_ref()), |attributes| {
            for key in &keys {
                attributes.remove(key.as_ref());
            }
        })
    }

    /// Remove every attribute whose key `matches`; `uuid` is always kept
    pub fn remove_attributes_matching<P>(&mut self, record: &FlowFile, matches: P) -> Result<FlowFile>
    where
        P: Fn(&str) -> bool,
    {
        self.update_attributes(record, std::iter::empty::<&str>(), |attributes| {
            attributes.retain(|key, _| is_immutable_key(key) || !matches(key.as_str()));
        })
    }

    fn update_attributes<'k, K, F>(&mut self, record: &FlowFile, touched: K, edit: F) -> Result<FlowFile>
    where
        K: IntoIterator<Item = &'k str>,
        F: FnOnce(&mut Attributes),
    {
        self.ensure_active()?;
        let current = self.records.validate_state(record)?;
        if let Some(key) = touched.into_iter().find(|key| is_immutable_key(key)) {
            return Err(Error::IllegalMutation {
                attribute: key.to_string(),
            });
        }
        let mut attributes = current.attributes().clone();
        edit(&mut attributes);
        let next = current.with_attributes(attributes);
        self.records.replace(next.clone());
        Ok(next)
    }

    // ========================================================================
    // Penalties and counters
    // ========================================================================

    /// Delay re-availability of `record` by the configured penalty
    pub fn penalize(&mut self, record: &FlowFile) -> Result<FlowFile> {
        self.ensure_active()?;
        let current = self.records.validate_state(record)?;
        let next = current.penalized_until(Utc::now() + self.penalty);
        self.records.mark_penalized(next.id(), true);
        self.records.replace(next.clone());
        Ok(next)
    }

    /// Clear a penalty set on `record`
    pub fn unpenalize(&mut self, record: &FlowFile) -> Result<FlowFile> {
        self.ensure_active()?;
        let current = self.records.validate_state(record)?;
        let next = current.unpenalized();
        self.records.mark_penalized(next.id(), false);
        self.records.replace(next.clone());
        Ok(next)
    }

    /// Add `delta` to the session's view of counter `name`
    pub fn adjust_counter(&mut self, name: &str, delta: i64) -> Result<()> {
        self.ensure_active()?;
        self.records.adjust_counter(name, delta);
        Ok(())
    }

    // ========================================================================
    // Routing
    // ========================================================================

    /// Stage `record` for `relationship`
    ///
    /// The self relationship routes back to the input queue, see
    /// [`transfer_back`](Self::transfer_back).
    pub fn transfer(&mut self, record: &FlowFile, relationship: &Relationship) -> Result<()> {
        self.ensure_active()?;
        let current = self.records.require_being_processed(record)?.clone();
        if relationship.is_self() {
            return self.stage_for_input(current);
        }
        if !self.relationships.is_declared(relationship) {
            return Err(Error::UnknownRelationship {
                name: relationship.name().to_string(),
            });
        }
        trace!(
            session = %self.id,
            record = %current.id(),
            relationship = %relationship,
            "Transferred record"
        );
        self.stage(current, Destination::Relationship(relationship.clone()));
        Ok(())
    }

    /// Stage every record in `records` for `relationship`
    pub fn transfer_all(&mut self, records: &[FlowFile], relationship: &Relationship) -> Result<()> {
        for record in records {
            self.transfer(record, relationship)?;
        }
        Ok(())
    }

    /// Route `record` back to the input queue on commit
    ///
    /// Only records dequeued from the input may go back to it. The record
    /// is held by the session until the finalizer succeeds and only then
    /// offered to the input, so other sessions cannot dequeue it early and
    /// a rollback or failed commit never leaves a copy behind on the input.
    pub fn transfer_back(&mut self, record: &FlowFile) -> Result<()> {
        self.ensure_active()?;
        let current = self.records.require_being_processed(record)?.clone();
        self.stage_for_input(current)
    }

    fn stage_for_input(&mut self, current: FlowFile) -> Result<()> {
        if self.records.original(current.id()).is_none() {
            return Err(Error::SelfLoop { id: current.id() });
        }
        trace!(session = %self.id, record = %current.id(), "Routed record back to input");
        self.stage(current, Destination::Input);
        Ok(())
    }

    fn stage(&mut self, current: FlowFile, destination: Destination) {
        let attributes_changed = self
            .records
            .original(current.id())
            .map_or(false, |original| original.attributes() != current.attributes());
        if attributes_changed {
            self.provenance.modify_attributes(&current);
        }
        let stamped = current.queued(Utc::now(), self.sequence.next());
        self.records.stage(stamped, destination);
    }

    /// Drop `record` from the flow
    pub fn remove(&mut self, record: &FlowFile) -> Result<()> {
        self.ensure_active()?;
        let current = self.records.require_being_processed(record)?;
        self.provenance.drop_record(current, "Removed by session");
        trace!(session = %self.id, record = %record.id(), "Removed record");
        self.records.remove(record.id());
        Ok(())
    }

    /// Drop every record in `records`
    pub fn remove_all(&mut self, records: &[FlowFile]) -> Result<()> {
        for record in records {
            self.remove(record)?;
        }
        Ok(())
    }

    // ========================================================================
    // Transaction boundary
    // ========================================================================

    /// Publish the session's work
    ///
    /// Fails with `IncompleteWork` while any record is still being
    /// processed; nothing is published in that case. The finalizer then
    /// runs once. If it fails its error is returned and the session stays
    /// active so the caller can roll back. On success records routed back
    /// to the input are enqueued and per-record bookkeeping is cleared;
    /// staged output and provenance the finalizer did not take stay
    /// readable.
    pub fn commit(&mut self) -> Result<()> {
        self.ensure_active()?;
        let pending = self.records.being_processed();
        if !pending.is_empty() {
            return Err(Error::IncompleteWork { pending });
        }

        let transferred = self.records.staged_count();
        if let Some(mut finalizer) = self.finalizer.take() {
            let mut batch = CommitBatch::new(
                self.id,
                self.records.take_staged(),
                self.provenance.take_events(),
                self.records.take_counters(),
            );
            let outcome = finalizer.finalize(&mut batch);
            self.records.restore_staged(batch.outputs);
            self.provenance.restore(batch.events);
            self.records.restore_counters(batch.counters);
            if let Err(e) = outcome {
                error!(session = %self.id, error = %e, "Session finalization failed");
                self.finalizer = Some(finalizer);
                return Err(e);
            }
        }

        let requeued = self.records.take_requeued();
        if !requeued.is_empty() {
            self.input.offer_all(requeued);
        }
        self.records.clear_after_commit();
        self.status = SessionStatus::Committed;

        debug!(
            session = %self.id,
            transferred,
            removed = self.records.removed_count(),
            "Session committed"
        );
        Ok(())
    }

    /// Undo the session's work
    ///
    /// Every record dequeued by this session goes back on the input queue
    /// as it was dequeued, in dequeue order, optionally penalized. Records
    /// created here vanish. Staged output, provenance and counters are
    /// discarded. A no-op once the session has committed or rolled back.
    pub fn rollback(&mut self, penalize: bool) {
        if !self.is_active() {
            return;
        }

        let until = Utc::now() + self.penalty;
        let restored: Vec<FlowFile> = self
            .records
            .originals()
            .map(|original| {
                if penalize {
                    original.penalized_until(until)
                } else {
                    original.clone()
                }
            })
            .collect();
        let count = restored.len();
        self.input.offer_all(restored);

        self.records.clear();
        self.provenance.clear();
        self.status = SessionStatus::RolledBack;

        debug!(session = %self.id, restored = count, penalize, "Session rolled back");
    }
}

impl fmt::Debug for ProcessSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessSession")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("input", &self.input.name())
            .field("being_processed", &self.records.being_processed_count())
            .field("staged", &self.records.staged_count())
            .field("removed", &self.records.removed_count())
            .field("events", &self.provenance.len())
            .finish()
    }
}

impl Drop for ProcessSession {
    fn drop(&mut self) {
        if self.is_active() && !self.records.is_empty() {
            warn!(
                session = %self.id,
                being_processed = self.records.being_processed_count(),
                staged = self.records.staged_count(),
                "Session dropped with unresolved records, nothing was committed or rolled back"
            );
        }
    }
}
