//! Shared storage layer for FlowFile sessions
//!
//! This crate implements the resources sessions share with each other:
//! - FlowFileQueue: mutex-protected FIFO polled and offered by many sessions
//! - EnqueueSequence: process-wide monotonically increasing enqueue stamps
//! - Content repositories: in-memory (DashMap) and local-disk
//! - ProvenanceRepository: append-only persisted lineage events
//! - CounterRepository: named counters updated on commit
//! - Connections: relationship → destination queue wiring
//!
//! Everything in this crate is `Send + Sync`; session-private state lives
//! in `flowfile-session`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod connections;
pub mod content;
pub mod counters;
pub mod provenance;
pub mod queue;
pub mod sequence;

pub use connections::Connections;
pub use content::{FileContentRepository, MemoryContentRepository};
pub use counters::CounterRepository;
pub use provenance::ProvenanceRepository;
pub use queue::{FilterResult, FlowFileQueue};
pub use sequence::EnqueueSequence;
