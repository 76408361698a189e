//! Shared test utilities for the integration test suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::io::Read;
use std::sync::{Arc, Once};

pub use flowfile::{
    CommitBatch, Content, ContentRepository, Error, FilterResult, FlowFile, FlowFileQueue,
    MemoryContentRepository, ProcessSession, ProvenanceEventType, RecordState, Relationship,
    SessionConfig, SessionFactory, SessionId, SessionStatus, StaticRelationships,
};
pub use flowfile::EnqueueSequence;

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output through the test harness (`--nocapture` shows it).
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

// ============================================================================
// Relationships
// ============================================================================

pub fn success() -> Relationship {
    Relationship::new("success", "records processed without error")
}

pub fn failure() -> Relationship {
    Relationship::new("failure", "records that could not be processed")
}

// ============================================================================
// Harness - shared resources for hand-built sessions
// ============================================================================

/// Input queue, content repository and sequence shared by test sessions.
pub struct Harness {
    pub input: Arc<FlowFileQueue>,
    pub content: MemoryContentRepository,
    pub relationships: Arc<StaticRelationships>,
    pub sequence: Arc<EnqueueSequence>,
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();
        Harness {
            input: Arc::new(FlowFileQueue::new("input")),
            content: MemoryContentRepository::new(),
            relationships: Arc::new(StaticRelationships::new([success(), failure()])),
            sequence: Arc::new(EnqueueSequence::new()),
        }
    }

    /// Harness whose input already holds `records`.
    pub fn with_input(records: &[FlowFile]) -> Self {
        let harness = Self::new();
        harness.input.offer_all(records.iter().cloned());
        harness
    }

    /// Session without a finalizer.
    pub fn session(&self) -> ProcessSession {
        ProcessSession::new(
            SessionId::next(),
            Arc::clone(&self.input),
            Arc::new(self.content.clone()),
            self.relationships.clone(),
            Arc::clone(&self.sequence),
        )
    }

    /// Full content of `record`, read outside any session.
    pub fn content_of(&self, record: &FlowFile) -> Vec<u8> {
        read_content(&self.content, record)
    }
}

// ============================================================================
// Records
// ============================================================================

/// Record with the given attributes and inline content.
pub fn record(attributes: &[(&str, &str)], content: &str) -> FlowFile {
    FlowFile::builder()
        .attributes(attributes.iter().copied())
        .content(content)
        .build()
}

/// Attributes of `record` other than the core ones (uuid, filename, path).
pub fn user_attributes(record: &FlowFile) -> Vec<(String, String)> {
    record
        .attributes()
        .iter()
        .filter(|(k, _)| !matches!(k.as_str(), "uuid" | "filename" | "path"))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Full content of `record`.
pub fn read_content(repo: &dyn ContentRepository, record: &FlowFile) -> Vec<u8> {
    match record.content() {
        Content::Empty => Vec::new(),
        Content::Inline(bytes) => bytes.to_vec(),
        Content::Claim(claim) => {
            let mut bytes = Vec::new();
            repo.open_read(claim)
                .expect("open content")
                .read_to_end(&mut bytes)
                .expect("read content");
            bytes
        }
    }
}

/// Pairs as owned strings, for comparing against `user_attributes`.
pub fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
