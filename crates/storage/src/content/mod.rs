//! Content repository implementations
//!
//! - `MemoryContentRepository`: blobs in a DashMap, for tests and
//!   short-lived flows
//! - `FileContentRepository`: one file per resource in a local directory

pub mod file;
pub mod memory;

pub use file::FileContentRepository;
pub use memory::MemoryContentRepository;
