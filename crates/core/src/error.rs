//! Error types for flowfile sessions
//!
//! Every invariant check performed by a session surfaces as a distinct
//! variant so the invoking component can decide whether to roll back.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use crate::types::{RecordId, SessionId};
use std::io;
use thiserror::Error;

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for flowfile sessions
#[derive(Debug, Error)]
pub enum Error {
    /// The record is not the current version owned by this session
    ///
    /// Raised for stale references, records owned by another session, and
    /// records already finalized by commit or rollback.
    #[error("Unknown record {id}: not a current version owned by this session")]
    UnknownRecord {
        /// Offending record id
        id: RecordId,
    },

    /// The record was already staged for output and can no longer change
    #[error("Record {id} was already transferred to '{destination}'")]
    AlreadyTransferred {
        /// Offending record id
        id: RecordId,
        /// Relationship (or input queue) the record was staged for
        destination: String,
    },

    /// Attempt to change a session-immutable attribute
    #[error("Attribute '{attribute}' cannot be modified")]
    IllegalMutation {
        /// Attribute name
        attribute: String,
    },

    /// Transfer to a relationship the component did not declare
    #[error("Unknown relationship '{name}'")]
    UnknownRelationship {
        /// Relationship name
        name: String,
    },

    /// Transfer of a session-created record back to the input queue
    #[error("Record {id} was created in this session and cannot be routed back to the input")]
    SelfLoop {
        /// Offending record id
        id: RecordId,
    },

    /// Commit attempted while records are still being processed
    #[error("Cannot commit: {} record(s) were neither transferred nor removed", .pending.len())]
    IncompleteWork {
        /// Records still in the being-processed state
        pending: Vec<RecordId>,
    },

    /// I/O failure reported by the content repository or a callback
    #[error("Content access failed: {message}")]
    ContentAccess {
        /// What was being attempted
        message: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// `remove()`/`transfer()` on a record that is not being processed
    #[error("Record {id} is not being processed by this session")]
    NotFound {
        /// Offending record id
        id: RecordId,
    },

    /// Partial clone window runs past the end of the content
    #[error("Range {offset}+{length} exceeds content size {size}")]
    Bounds {
        /// Requested start
        offset: u64,
        /// Requested length
        length: u64,
        /// Actual content size
        size: u64,
    },

    /// Source and target of a migration are the same session
    #[error("Cannot migrate records from {0} into itself")]
    SelfMigration(SessionId),

    /// Migration requested with no records
    #[error("Cannot migrate an empty set of records")]
    EmptyMigration,

    /// Operation on a session that already committed or rolled back
    #[error("{session} is not active: {state}")]
    SessionNotActive {
        /// Session id
        session: SessionId,
        /// Terminal state the session is in
        state: String,
    },

    /// The finalization callback reported a failure
    #[error("Finalization failed: {0}")]
    Finalization(String),

    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Wrap an I/O error with a description of the failed step
    pub fn content(message: impl Into<String>, source: io::Error) -> Self {
        Error::ContentAccess {
            message: message.into(),
            source,
        }
    }

    /// True for [`Error::UnknownRecord`]
    pub fn is_unknown_record(&self) -> bool {
        matches!(self, Error::UnknownRecord { .. })
    }

    /// True for [`Error::AlreadyTransferred`]
    pub fn is_already_transferred(&self) -> bool {
        matches!(self, Error::AlreadyTransferred { .. })
    }

    /// True for [`Error::IncompleteWork`]
    pub fn is_incomplete_work(&self) -> bool {
        matches!(self, Error::IncompleteWork { .. })
    }

    /// True for [`Error::ContentAccess`]
    pub fn is_content_access(&self) -> bool {
        matches!(self, Error::ContentAccess { .. })
    }
}

impl From<io::Error> for Error {
    fn from(source: io::Error) -> Self {
        Error::content("I/O error", source)
    }
}
