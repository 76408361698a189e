//! Transactional processing sessions over FlowFile records
//!
//! This crate implements the unit of work a component runs in:
//! - ProcessSession: record bookkeeping, attribute and content operations,
//!   routing, commit and rollback
//! - ProvenanceCollector: session-local lineage event buffer
//! - Migration: moving in-flight records between open sessions
//! - ContentSink: write handle that publishes a new version on finish
//! - SessionFinalizer / Publisher: the publication step run by commit
//! - SessionConfig / SessionFactory: configuration and shared wiring
//!
//! ## Example
//!
//! ```no_run
//! use flowfile_core::{Relationship, StaticRelationships};
//! use flowfile_session::{SessionConfig, SessionFactory};
//! use flowfile_storage::FlowFileQueue;
//! use std::sync::Arc;
//!
//! let success = Relationship::new("success", "processed records");
//! let factory = SessionFactory::new(
//!     SessionConfig::default(),
//!     Arc::new(FlowFileQueue::new("input")),
//!     Arc::new(StaticRelationships::new([success.clone()])),
//! )?;
//!
//! let mut session = factory.create_session();
//! if let Some(record) = session.get()? {
//!     let record = session.put_attribute(&record, "seen", "true")?;
//!     session.transfer(&record, &success)?;
//! }
//! session.commit()?;
//! # Ok::<(), flowfile_core::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod bookkeeping;
pub mod config;
pub mod content;
pub mod finalize;
pub mod manager;
mod migration;
pub mod provenance;
pub mod session;
pub mod sink;

pub use bookkeeping::{Destination, RecordState};
pub use config::{SessionConfig, CONFIG_FILE_NAME};
pub use content::MergeFormat;
pub use finalize::{CommitBatch, Publisher, SessionFinalizer};
pub use manager::SessionFactory;
pub use provenance::ProvenanceCollector;
pub use session::{ProcessSession, SessionStatus};
pub use sink::ContentSink;
