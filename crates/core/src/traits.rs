//! Core traits for content access
//!
//! This module defines the ContentRepository and ClaimWriter traits that
//! let sessions read and replace record content without knowing where the
//! bytes live (memory, local disk, or anything else).

use crate::error::Result;
use crate::types::ContentClaim;
use std::io::{Read, Write};

/// Byte storage for record content
///
/// Resources are write-once: a writer produces a new resource and the
/// claim returned by [`ClaimWriter::finish`] addresses it. Existing claims
/// are never invalidated by later writes, which is what lets several
/// records share (ranges of) one resource after a clone.
///
/// Thread safety: all methods must be safe to call concurrently from
/// multiple sessions (requires Send + Sync). Calls are blocking; there is
/// no timeout or cancellation at this layer.
pub trait ContentRepository: Send + Sync {
    /// Open a stream over the bytes addressed by `claim`
    ///
    /// # Errors
    ///
    /// Returns `Error::ContentAccess` if the resource is missing or cannot
    /// be read.
    fn open_read(&self, claim: &ContentClaim) -> Result<Box<dyn Read + Send>>;

    /// Open a sink for a brand-new resource (full replace semantics)
    ///
    /// # Errors
    ///
    /// Returns `Error::ContentAccess` if the resource cannot be created.
    fn open_write(&self) -> Result<Box<dyn ClaimWriter>>;

    /// Open a sink for a new resource pre-seeded with the bytes of `claim`
    ///
    /// The source resource is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `Error::ContentAccess` if the source cannot be read or the
    /// new resource cannot be created.
    fn open_append(&self, claim: &ContentClaim) -> Result<Box<dyn ClaimWriter>>;

    /// Size of the content addressed by `claim`
    ///
    /// # Errors
    ///
    /// Returns `Error::ContentAccess` if the resource no longer exists.
    fn size(&self, claim: &ContentClaim) -> Result<u64>;
}

/// Sink for a resource being written
pub trait ClaimWriter: Write + Send {
    /// Bytes accepted so far, including any seeded prefix
    fn bytes_written(&self) -> u64;

    /// Seal the resource and return a claim covering all of it
    ///
    /// # Errors
    ///
    /// Returns `Error::ContentAccess` if buffered bytes cannot be flushed.
    fn finish(self: Box<Self>) -> Result<ContentClaim>;
}
