//! Local-disk content repository
//!
//! Each resource is one file `<root>/<resource>.bin`, written once and
//! never modified afterwards. Claims address byte windows of those files.
//! On open, the resource counter resumes after the highest id found on
//! disk so a reopened repository never overwrites existing resources.

use flowfile_core::{ClaimWriter, ContentClaim, ContentRepository, Error, ResourceId, Result};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

const RESOURCE_EXTENSION: &str = "bin";

/// Content repository backed by files in one directory
#[derive(Debug)]
pub struct FileContentRepository {
    root: PathBuf,
    next_id: AtomicU64,
}

impl FileContentRepository {
    /// Open (creating if needed) a repository rooted at `root`
    ///
    /// # Errors
    ///
    /// Returns `Error::ContentAccess` if the directory cannot be created or
    /// listed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .map_err(|e| Error::content(format!("creating {}", root.display()), e))?;

        let mut next = 0u64;
        let entries = fs::read_dir(&root)
            .map_err(|e| Error::content(format!("listing {}", root.display()), e))?;
        for entry in entries {
            let entry = entry.map_err(|e| Error::content(format!("listing {}", root.display()), e))?;
            if let Some(id) = parse_resource_name(&entry.path()) {
                next = next.max(id + 1);
            }
        }

        debug!(root = %root.display(), next_resource = next, "Opened file content repository");
        Ok(Self {
            root,
            next_id: AtomicU64::new(next),
        })
    }

    /// Directory holding the resources
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, resource: ResourceId) -> PathBuf {
        self.root.join(format!("{}.{}", resource, RESOURCE_EXTENSION))
    }

    fn create_writer(&self) -> Result<FileClaimWriter> {
        let resource = ResourceId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let path = self.path_for(resource);
        let file = File::create(&path)
            .map_err(|e| Error::content(format!("creating {}", path.display()), e))?;
        Ok(FileClaimWriter {
            resource,
            path,
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    fn check_bounds(&self, claim: &ContentClaim) -> Result<PathBuf> {
        let path = self.path_for(claim.resource);
        let metadata = fs::metadata(&path)
            .map_err(|e| Error::content(format!("reading {}", claim), e))?;
        let end = claim.offset.saturating_add(claim.length);
        if end > metadata.len() {
            return Err(Error::content(
                format!("reading {}", claim),
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("resource holds only {} bytes", metadata.len()),
                ),
            ));
        }
        Ok(path)
    }
}

fn parse_resource_name(path: &Path) -> Option<u64> {
    if path.extension()?.to_str()? != RESOURCE_EXTENSION {
        return None;
    }
    u64::from_str_radix(path.file_stem()?.to_str()?, 16).ok()
}

impl ContentRepository for FileContentRepository {
    fn open_read(&self, claim: &ContentClaim) -> Result<Box<dyn Read + Send>> {
        let path = self.check_bounds(claim)?;
        let mut file =
            File::open(&path).map_err(|e| Error::content(format!("opening {}", claim), e))?;
        file.seek(SeekFrom::Start(claim.offset))
            .map_err(|e| Error::content(format!("seeking {}", claim), e))?;
        Ok(Box::new(BufReader::new(file).take(claim.length)))
    }

    fn open_write(&self) -> Result<Box<dyn ClaimWriter>> {
        Ok(Box::new(self.create_writer()?))
    }

    fn open_append(&self, claim: &ContentClaim) -> Result<Box<dyn ClaimWriter>> {
        let mut source = self.open_read(claim)?;
        let mut writer = self.create_writer()?;
        io::copy(&mut source, &mut writer)
            .map_err(|e| Error::content(format!("seeding append from {}", claim), e))?;
        Ok(Box::new(writer))
    }

    fn size(&self, claim: &ContentClaim) -> Result<u64> {
        self.check_bounds(claim)?;
        Ok(claim.length)
    }
}

struct FileClaimWriter {
    resource: ResourceId,
    path: PathBuf,
    writer: BufWriter<File>,
    written: u64,
}

impl Write for FileClaimWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.writer.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl ClaimWriter for FileClaimWriter {
    fn bytes_written(&self) -> u64 {
        self.written
    }

    fn finish(mut self: Box<Self>) -> Result<ContentClaim> {
        self.writer
            .flush()
            .map_err(|e| Error::content(format!("flushing {}", self.path.display()), e))?;
        Ok(ContentClaim::new(self.resource, 0, self.written))
    }
}
