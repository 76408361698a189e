//! Core identifier types
//!
//! This module defines the foundational identifiers:
//! - RecordId: process-local, monotonically assigned record identity
//! - SessionId: identity of one processing session
//! - ResourceId: identity of a blob held by a content repository
//! - ContentClaim: (resource, offset, length) window into a blob

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_RECORD_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-local identity of a record
///
/// Every record version derived from the same logical record shares one
/// `RecordId`. Ids are handed out from a process-wide atomic counter, so
/// they are unique within the process but carry no meaning across restarts.
/// Not to be confused with the user-visible `uuid` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(u64);

impl RecordId {
    /// Allocate the next id from the process-wide counter
    pub fn next() -> Self {
        Self(NEXT_RECORD_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap a raw id
    ///
    /// Used when rebuilding records from persisted state; ids created this
    /// way are not checked against the counter.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a processing session
///
/// Unique within the process no matter which factory opened the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(u64);

impl SessionId {
    /// Allocate the next id from the process-wide counter
    pub fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap a raw session id
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Identity of one blob inside a content repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(u64);

impl ResourceId {
    /// Wrap a raw resource id
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// A window of bytes inside a repository blob
///
/// Several records may hold claims over the same resource, possibly with
/// overlapping ranges (clones and partial clones). Repositories never
/// mutate a resource once its writer has finished, so shared claims stay
/// valid after any of their holders is rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentClaim {
    /// Blob holding the bytes
    pub resource: ResourceId,
    /// First byte of the window
    pub offset: u64,
    /// Window length in bytes
    pub length: u64,
}

impl ContentClaim {
    /// Create a claim covering `length` bytes of `resource` from `offset`
    pub fn new(resource: ResourceId, offset: u64, length: u64) -> Self {
        Self {
            resource,
            offset,
            length,
        }
    }

    /// Narrow this claim to a sub-window
    ///
    /// Returns `None` when `offset + length` runs past the end of the claim.
    pub fn slice(&self, offset: u64, length: u64) -> Option<Self> {
        let end = offset.checked_add(length)?;
        if end > self.length {
            return None;
        }
        Some(Self {
            resource: self.resource,
            offset: self.offset + offset,
            length,
        })
    }
}

impl fmt::Display for ContentClaim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}+{}]", self.resource, self.offset, self.length)
    }
}
