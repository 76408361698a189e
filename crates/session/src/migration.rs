//! Moving in-flight records between open sessions
//!
//! `migrate` hands records, with everything the source session knows about
//! them, to another active session without a commit in between. Every
//! argument is validated before anything moves, so a failed migration
//! leaves both sessions untouched.

use crate::session::ProcessSession;
use flowfile_core::{Error, FlowFile, Result};
use rustc_hash::FxHashSet;
use tracing::debug;

impl ProcessSession {
    /// Move `records` from this session into `target`
    ///
    /// Carried along: current and original versions, being-processed or
    /// staged membership (including staged-for-input), penalty tracking,
    /// and buffered provenance events about the records. Afterwards this
    /// session rejects the records as unknown and `target` owns them.
    ///
    /// # Errors
    ///
    /// - `SelfMigration` when `target` is this session
    /// - `EmptyMigration` when `records` is empty
    /// - `UnknownRecord` when a record is not a current version owned here
    /// - `SessionNotActive` when either session has already finished
    pub fn migrate(&mut self, target: &mut ProcessSession, records: &[FlowFile]) -> Result<()> {
        self.ensure_active()?;
        target.ensure_active()?;
        if self.id == target.id {
            return Err(Error::SelfMigration(self.id));
        }
        if records.is_empty() {
            return Err(Error::EmptyMigration);
        }

        let mut ids = Vec::with_capacity(records.len());
        let mut seen = FxHashSet::default();
        let mut uuids = FxHashSet::default();
        for record in records {
            let current = self.records.resolve(record)?;
            if seen.insert(current.id()) {
                ids.push(current.id());
                uuids.insert(current.uuid().to_string());
            }
        }

        for id in &ids {
            if let Some(owned) = self.records.extract(*id) {
                target.records.insert(owned);
            }
        }
        let events = self.provenance.migrate(&mut target.provenance, &uuids);

        debug!(
            source = %self.id,
            target = %target.id,
            records = ids.len(),
            events,
            "Migrated records"
        );
        Ok(())
    }
}
