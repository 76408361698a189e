//! Commit-on-finish content sink
//!
//! `ContentSink` is the handle-based alternative to the callback `write`.
//! The new record version is published only by [`ContentSink::finish`];
//! a sink that is dropped instead (early return, `?`, panic unwinding)
//! discards its bytes and the record keeps its previous content.

use crate::session::ProcessSession;
use flowfile_core::{ClaimWriter, FlowFile, Result};
use std::io::{self, Write};
use tracing::warn;

/// Write handle that replaces a record's content on `finish`
pub struct ContentSink<'s> {
    session: &'s mut ProcessSession,
    record: FlowFile,
    writer: Option<Box<dyn ClaimWriter>>,
}

impl<'s> ContentSink<'s> {
    pub(crate) fn new(
        session: &'s mut ProcessSession,
        record: FlowFile,
        writer: Box<dyn ClaimWriter>,
    ) -> Self {
        Self {
            session,
            record,
            writer: Some(writer),
        }
    }

    /// Version the sink will replace
    pub fn record(&self) -> &FlowFile {
        &self.record
    }

    /// Bytes written so far
    pub fn bytes_written(&self) -> u64 {
        self.writer.as_ref().map_or(0, |w| w.bytes_written())
    }

    /// Seal the content and publish the new record version
    pub fn finish(mut self) -> Result<FlowFile> {
        let Some(writer) = self.writer.take() else {
            return Err(closed().into());
        };
        let claim = writer.finish()?;
        Ok(self.session.install_content(&self.record, claim, "write"))
    }

    /// Discard what was written without publishing
    pub fn abandon(mut self) {
        self.writer = None;
    }

    fn writer(&mut self) -> io::Result<&mut Box<dyn ClaimWriter>> {
        self.writer.as_mut().ok_or_else(closed)
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "content sink is closed")
}

impl Write for ContentSink<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer()?.flush()
    }
}

impl Drop for ContentSink<'_> {
    fn drop(&mut self) {
        if let Some(writer) = &self.writer {
            warn!(
                session = %self.session.id(),
                record = %self.record.id(),
                bytes = writer.bytes_written(),
                "Content sink dropped without finish, discarding written content"
            );
        }
    }
}
