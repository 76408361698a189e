//! Session factory for one component
//!
//! Owns the resources every session of a component shares and hands out
//! sessions wired to them:
//!
//! ```text
//! SessionFactory
//!   ├── input queue ─────────────► get() / rollback()
//!   ├── content repository ──────► read/write/clone
//!   ├── relationship catalog ────► transfer() validation
//!   ├── enqueue sequence ────────► transfer() stamps
//!   └── Publisher
//!         ├── connections ───────► staged output on commit
//!         ├── provenance repo ───► events on commit
//!         └── counter repo ──────► deltas on commit
//! ```
//!
//! Session ids come from the process-wide [`SessionId::next`] counter, so
//! sessions from different factories never share one and can migrate
//! records between each other. Stamps come from
//! [`EnqueueSequence::global`] unless a test injects its own sequence.

use crate::config::SessionConfig;
use crate::finalize::Publisher;
use crate::session::ProcessSession;
use flowfile_core::{ContentRepository, RelationshipCatalog, Result, SessionId};
use flowfile_storage::{
    Connections, CounterRepository, EnqueueSequence, FileContentRepository, FlowFileQueue,
    MemoryContentRepository, ProvenanceRepository,
};
use std::sync::Arc;
use tracing::info;

/// Builds sessions over a shared set of resources
pub struct SessionFactory {
    config: SessionConfig,
    input: Arc<FlowFileQueue>,
    content: Arc<dyn ContentRepository>,
    relationships: Arc<dyn RelationshipCatalog>,
    connections: Arc<Connections>,
    provenance: Arc<ProvenanceRepository>,
    counters: Arc<CounterRepository>,
    sequence: Arc<EnqueueSequence>,
}

impl SessionFactory {
    /// Factory with fresh shared repositories
    ///
    /// Content lives under `config.content_directory` when set, in memory
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns `Error::ContentAccess` if the content directory cannot be
    /// opened.
    pub fn new(
        config: SessionConfig,
        input: Arc<FlowFileQueue>,
        relationships: Arc<dyn RelationshipCatalog>,
    ) -> Result<Self> {
        let content: Arc<dyn ContentRepository> = match &config.content_directory {
            Some(dir) => Arc::new(FileContentRepository::open(dir)?),
            None => Arc::new(MemoryContentRepository::new()),
        };
        info!(
            input = input.name(),
            on_disk = config.content_directory.is_some(),
            penalty_ms = config.penalty_duration_ms,
            "Session factory ready"
        );
        Ok(Self {
            config,
            input,
            content,
            relationships,
            connections: Arc::new(Connections::new()),
            provenance: Arc::new(ProvenanceRepository::new()),
            counters: Arc::new(CounterRepository::new()),
            sequence: EnqueueSequence::global(),
        })
    }

    /// Share a content repository with other factories
    pub fn with_content_repository(mut self, content: Arc<dyn ContentRepository>) -> Self {
        self.content = content;
        self
    }

    /// Share a connection map with other factories
    pub fn with_connections(mut self, connections: Arc<Connections>) -> Self {
        self.connections = connections;
        self
    }

    /// Share a provenance repository with other factories
    pub fn with_provenance_repository(mut self, provenance: Arc<ProvenanceRepository>) -> Self {
        self.provenance = provenance;
        self
    }

    /// Share a counter repository with other factories
    pub fn with_counter_repository(mut self, counters: Arc<CounterRepository>) -> Self {
        self.counters = counters;
        self
    }

    /// Stamp from `sequence` instead of the process-wide one
    ///
    /// Meant for tests that need stamps isolated from other factories.
    pub fn with_sequence(mut self, sequence: Arc<EnqueueSequence>) -> Self {
        self.sequence = sequence;
        self
    }

    /// Open a session whose commit publishes through the shared resources
    pub fn create_session(&self) -> ProcessSession {
        let id = SessionId::next();
        let publisher = Publisher::new(
            Arc::clone(&self.connections),
            Arc::clone(&self.provenance),
            Arc::clone(&self.counters),
        );
        ProcessSession::new(
            id,
            Arc::clone(&self.input),
            Arc::clone(&self.content),
            Arc::clone(&self.relationships),
            Arc::clone(&self.sequence),
        )
        .with_config(&self.config)
        .with_finalizer(publisher)
    }

    /// Configuration applied to every session
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Input queue
    pub fn input(&self) -> &Arc<FlowFileQueue> {
        &self.input
    }

    /// Content repository
    pub fn content(&self) -> &Arc<dyn ContentRepository> {
        &self.content
    }

    /// Relationship → destination queue map
    pub fn connections(&self) -> &Arc<Connections> {
        &self.connections
    }

    /// Persisted provenance
    pub fn provenance(&self) -> &Arc<ProvenanceRepository> {
        &self.provenance
    }

    /// Shared counters
    pub fn counters(&self) -> &Arc<CounterRepository> {
        &self.counters
    }

    /// Enqueue sequence
    pub fn sequence(&self) -> &Arc<EnqueueSequence> {
        &self.sequence
    }
}
