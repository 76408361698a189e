//! In-memory content repository
//!
//! Resources are immutable `Arc<Vec<u8>>` blobs in a DashMap, so readers
//! never block writers and a clone of a claim costs nothing.

use dashmap::DashMap;
use flowfile_core::{ClaimWriter, ContentClaim, ContentRepository, Error, ResourceId, Result};
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Resources {
    blobs: DashMap<ResourceId, Arc<Vec<u8>>>,
    next_id: AtomicU64,
}

impl Resources {
    fn get(&self, claim: &ContentClaim) -> Result<Arc<Vec<u8>>> {
        let blob = self
            .blobs
            .get(&claim.resource)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| {
                Error::content(
                    format!("reading {}", claim),
                    io::Error::new(io::ErrorKind::NotFound, "resource does not exist"),
                )
            })?;

        let end = claim.offset.saturating_add(claim.length);
        if end > blob.len() as u64 {
            return Err(Error::content(
                format!("reading {}", claim),
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("resource holds only {} bytes", blob.len()),
                ),
            ));
        }
        Ok(blob)
    }
}

/// Content repository keeping every resource in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryContentRepository {
    resources: Arc<Resources>,
}

impl MemoryContentRepository {
    /// Empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resources held
    pub fn resource_count(&self) -> usize {
        self.resources.blobs.len()
    }

    /// Store `bytes` as a new resource and return a claim over all of it
    pub fn import(&self, bytes: &[u8]) -> ContentClaim {
        let resource = ResourceId::new(self.resources.next_id.fetch_add(1, Ordering::Relaxed));
        self.resources.blobs.insert(resource, Arc::new(bytes.to_vec()));
        ContentClaim::new(resource, 0, bytes.len() as u64)
    }
}

impl ContentRepository for MemoryContentRepository {
    fn open_read(&self, claim: &ContentClaim) -> Result<Box<dyn Read + Send>> {
        let blob = self.resources.get(claim)?;
        let start = claim.offset as usize;
        Ok(Box::new(BlobReader {
            blob,
            position: start,
            end: start + claim.length as usize,
        }))
    }

    fn open_write(&self) -> Result<Box<dyn ClaimWriter>> {
        Ok(Box::new(MemoryClaimWriter {
            resources: Arc::clone(&self.resources),
            buffer: Vec::new(),
        }))
    }

    fn open_append(&self, claim: &ContentClaim) -> Result<Box<dyn ClaimWriter>> {
        let blob = self.resources.get(claim)?;
        let start = claim.offset as usize;
        let end = start + claim.length as usize;
        Ok(Box::new(MemoryClaimWriter {
            resources: Arc::clone(&self.resources),
            buffer: blob[start..end].to_vec(),
        }))
    }

    fn size(&self, claim: &ContentClaim) -> Result<u64> {
        self.resources.get(claim)?;
        Ok(claim.length)
    }
}

struct BlobReader {
    blob: Arc<Vec<u8>>,
    position: usize,
    end: usize,
}

impl Read for BlobReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.end - self.position;
        let n = available.min(buf.len());
        buf[..n].copy_from_slice(&self.blob[self.position..self.position + n]);
        self.position += n;
        Ok(n)
    }
}

struct MemoryClaimWriter {
    resources: Arc<Resources>,
    buffer: Vec<u8>,
}

impl Write for MemoryClaimWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ClaimWriter for MemoryClaimWriter {
    fn bytes_written(&self) -> u64 {
        self.buffer.len() as u64
    }

    fn finish(self: Box<Self>) -> Result<ContentClaim> {
        let resource =
            ResourceId::new(self.resources.next_id.fetch_add(1, Ordering::Relaxed));
        let length = self.buffer.len() as u64;
        self.resources.blobs.insert(resource, Arc::new(self.buffer));
        Ok(ContentClaim::new(resource, 0, length))
    }
}
