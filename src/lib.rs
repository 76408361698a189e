//! FlowFile - transactional processing sessions for record pipelines
//!
//! A component works on records (FlowFiles: attributes plus content)
//! through a [`ProcessSession`]. The session tracks every record it
//! dequeues or creates, lets the component derive new versions, stages
//! each record for a named relationship, and then either commits (staged
//! output becomes visible downstream in one step) or rolls back (every
//! dequeued record returns to the input queue unchanged).
//!
//! # Quick Start
//!
//! ```no_run
//! use flowfile::{FlowFile, FlowFileQueue, Relationship, SessionConfig, SessionFactory,
//!     StaticRelationships};
//! use std::io::Write;
//! use std::sync::Arc;
//!
//! let success = Relationship::new("success", "");
//! let input = Arc::new(FlowFileQueue::new("input"));
//! input.offer(FlowFile::builder().content("hello").build());
//!
//! let factory = SessionFactory::new(
//!     SessionConfig::default(),
//!     Arc::clone(&input),
//!     Arc::new(StaticRelationships::new([success.clone()])),
//! )?;
//! let out = Arc::new(FlowFileQueue::new("out"));
//! factory.connections().connect(success.clone(), Arc::clone(&out));
//!
//! let mut session = factory.create_session();
//! let record = session.get()?.expect("queued above");
//! let record = session.write(&record, |sink| sink.write_all(b"HELLO"))?;
//! session.transfer(&record, &success)?;
//! session.commit()?;
//! assert_eq!(out.len(), 1);
//! # Ok::<(), flowfile::Error>(())
//! ```
//!
//! # Architecture
//!
//! - `flowfile-core`: record, attribute, relationship and provenance types,
//!   the content repository contract and the error taxonomy
//! - `flowfile-storage`: shared queues, content repositories, provenance
//!   and counter repositories, relationship connections
//! - `flowfile-session`: the session itself, migration, finalization and
//!   the session factory

pub use flowfile_core::{
    intersect_attributes, is_immutable_key, Attributes, ClaimWriter, Content, ContentClaim,
    ContentRepository, CoreAttribute, DynamicRelationships, Error, FlowFile, FlowFileBuilder,
    ProvenanceEvent, ProvenanceEventType, RecordId, RecordSnapshot, Relationship,
    RelationshipCatalog, ResourceId, Result, SessionId, StaticRelationships, TransitDetails,
    SELF_RELATIONSHIP, UUID,
};
pub use flowfile_session::{
    CommitBatch, ContentSink, Destination, MergeFormat, ProcessSession, ProvenanceCollector,
    Publisher, RecordState, SessionConfig, SessionFactory, SessionFinalizer, SessionStatus,
    CONFIG_FILE_NAME,
};
pub use flowfile_storage::{
    Connections, CounterRepository, EnqueueSequence, FileContentRepository, FilterResult,
    FlowFileQueue, MemoryContentRepository, ProvenanceRepository,
};
