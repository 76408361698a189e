//! Content I/O on session records
//!
//! Every operation here validates its record arguments first: each must be
//! the current version owned by the session and must not be staged for
//! output yet. Writes never touch existing bytes; they produce a new claim
//! and a new record version pointing at it, so clones made earlier keep
//! seeing the old content.

use crate::session::ProcessSession;
use crate::sink::ContentSink;
use flowfile_core::{ClaimWriter, Content, ContentClaim, Error, FlowFile, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Read, Write};
use std::path::Path;
use std::sync::Arc;

/// Framing bytes for [`ProcessSession::merge`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeFormat {
    /// Written once before the first source
    pub header: Option<Vec<u8>>,
    /// Written once after the last source
    pub footer: Option<Vec<u8>>,
    /// Written between consecutive sources
    pub demarcator: Option<Vec<u8>>,
}

impl MergeFormat {
    /// Plain concatenation
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the header
    pub fn header(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.header = Some(bytes.into());
        self
    }

    /// Set the footer
    pub fn footer(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.footer = Some(bytes.into());
        self
    }

    /// Set the demarcator
    pub fn demarcator(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.demarcator = Some(bytes.into());
        self
    }
}

impl ProcessSession {
    /// Stream the content of `record` to `reader`
    ///
    /// The stream is only valid inside the callback.
    pub fn read<T, F>(&self, record: &FlowFile, reader: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Read) -> io::Result<T>,
    {
        self.ensure_active()?;
        let current = self.records.validate_state(record)?;
        let mut stream = self.open_content(current.content())?;
        reader(&mut stream)
            .map_err(|e| Error::content(format!("reading content of record {}", record.id()), e))
    }

    /// Whole content of `record`
    pub fn read_bytes(&self, record: &FlowFile) -> Result<Vec<u8>> {
        self.read(record, |stream| {
            let mut bytes = Vec::new();
            stream.read_to_end(&mut bytes)?;
            Ok(bytes)
        })
    }

    /// Replace the content of `record` with what `writer` produces
    pub fn write<F>(&mut self, record: &FlowFile, writer: F) -> Result<FlowFile>
    where
        F: FnOnce(&mut dyn Write) -> io::Result<()>,
    {
        self.ensure_active()?;
        let current = self.records.validate_state(record)?.clone();
        let mut sink = self.content.open_write()?;
        writer(&mut sink)
            .map_err(|e| Error::content(format!("writing content of record {}", record.id()), e))?;
        let claim = sink.finish()?;
        Ok(self.install_content(&current, claim, "write"))
    }

    /// Replace the content of `record` with `bytes`
    pub fn write_bytes(&mut self, record: &FlowFile, bytes: impl AsRef<[u8]>) -> Result<FlowFile> {
        self.write(record, |sink| sink.write_all(bytes.as_ref()))
    }

    /// Open a sink whose content replaces that of `record` on `finish`
    ///
    /// Dropping the sink without finishing discards what was written and
    /// leaves `record` current.
    pub fn write_sink(&mut self, record: &FlowFile) -> Result<ContentSink<'_>> {
        self.ensure_active()?;
        let current = self.records.validate_state(record)?.clone();
        let writer = self.content.open_write()?;
        Ok(ContentSink::new(self, current, writer))
    }

    /// Append what `writer` produces to the content of `record`
    pub fn append<F>(&mut self, record: &FlowFile, writer: F) -> Result<FlowFile>
    where
        F: FnOnce(&mut dyn Write) -> io::Result<()>,
    {
        self.ensure_active()?;
        let current = self.records.validate_state(record)?.clone();
        let mut sink = self.open_appender(current.content())?;
        writer(&mut sink).map_err(|e| {
            Error::content(format!("appending to content of record {}", record.id()), e)
        })?;
        let claim = sink.finish()?;
        Ok(self.install_content(&current, claim, "append"))
    }

    /// Transform the content of `record` in one pass
    pub fn rewrite<F>(&mut self, record: &FlowFile, transform: F) -> Result<FlowFile>
    where
        F: FnOnce(&mut dyn Read, &mut dyn Write) -> io::Result<()>,
    {
        self.ensure_active()?;
        let current = self.records.validate_state(record)?.clone();
        let mut source = self.open_content(current.content())?;
        let mut sink = self.content.open_write()?;
        transform(&mut source, &mut sink).map_err(|e| {
            Error::content(format!("rewriting content of record {}", record.id()), e)
        })?;
        let claim = sink.finish()?;
        Ok(self.install_content(&current, claim, "rewrite"))
    }

    /// Replace the content of `record` with everything `source` yields
    pub fn import_from<R: Read>(&mut self, mut source: R, record: &FlowFile) -> Result<FlowFile> {
        self.write(record, |sink| io::copy(&mut source, sink).map(|_| ()))
    }

    /// Replace the content of `record` with the file at `path`
    pub fn import_from_path(&mut self, path: impl AsRef<Path>, record: &FlowFile) -> Result<FlowFile> {
        self.ensure_active()?;
        self.records.validate_state(record)?;
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| Error::content(format!("opening '{}' for import", path.display()), e))?;
        self.import_from(file, record)
    }

    /// Copy the content of `record` into `sink`, returning the byte count
    pub fn export_to<W: Write>(&self, record: &FlowFile, mut sink: W) -> Result<u64> {
        let copied = self.read(record, |stream| io::copy(stream, &mut sink))?;
        sink.flush()
            .map_err(|e| Error::content(format!("flushing export of record {}", record.id()), e))?;
        Ok(copied)
    }

    /// Copy the content of `record` into the file at `path`
    ///
    /// With `append` the file is extended, otherwise it is truncated.
    pub fn export_to_path(&self, record: &FlowFile, path: impl AsRef<Path>, append: bool) -> Result<u64> {
        self.ensure_active()?;
        self.records.validate_state(record)?;
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(path)
            .map_err(|e| Error::content(format!("opening '{}' for export", path.display()), e))?;
        self.export_to(record, file)
    }

    /// Concatenate the content of `sources` into `destination`
    ///
    /// `destination` may be one of the sources; its old content is read
    /// before it is replaced.
    pub fn merge(
        &mut self,
        sources: &[FlowFile],
        destination: &FlowFile,
        format: &MergeFormat,
    ) -> Result<FlowFile> {
        self.ensure_active()?;
        let mut contents = Vec::with_capacity(sources.len());
        for source in sources {
            contents.push(self.records.validate_state(source)?.content().clone());
        }
        let target = self.records.validate_state(destination)?.clone();

        let failed = |e: io::Error| {
            Error::content(format!("merging {} records into {}", sources.len(), target.id()), e)
        };
        let mut sink = self.content.open_write()?;
        if let Some(header) = &format.header {
            sink.write_all(header).map_err(failed)?;
        }
        for (i, content) in contents.iter().enumerate() {
            if i > 0 {
                if let Some(demarcator) = &format.demarcator {
                    sink.write_all(demarcator).map_err(failed)?;
                }
            }
            let mut stream = self.open_content(content)?;
            io::copy(&mut stream, &mut sink).map_err(failed)?;
        }
        if let Some(footer) = &format.footer {
            sink.write_all(footer).map_err(failed)?;
        }
        let claim = sink.finish()?;
        Ok(self.install_content(&target, claim, "merge"))
    }

    pub(crate) fn open_content(&self, content: &Content) -> Result<Box<dyn Read + Send>> {
        match content {
            Content::Empty => Ok(Box::new(io::empty())),
            Content::Inline(bytes) => Ok(Box::new(Cursor::new(Arc::clone(bytes)))),
            Content::Claim(claim) => self.content.open_read(claim),
        }
    }

    fn open_appender(&self, content: &Content) -> Result<Box<dyn ClaimWriter>> {
        match content {
            Content::Empty => self.content.open_write(),
            Content::Inline(bytes) => {
                let mut sink = self.content.open_write()?;
                sink.write_all(bytes)
                    .map_err(|e| Error::content("seeding append with inline content", e))?;
                Ok(sink)
            }
            Content::Claim(claim) => self.content.open_append(claim),
        }
    }

    /// Point `current` at `claim` and make the result the current version
    pub(crate) fn install_content(
        &mut self,
        current: &FlowFile,
        claim: ContentClaim,
        operation: &str,
    ) -> FlowFile {
        let content = if claim.length == 0 {
            Content::Empty
        } else {
            Content::Claim(claim)
        };
        let next = current.with_content(content);
        self.provenance.modify_content(&next, Some(operation));
        self.records.replace(next.clone());
        next
    }
}
