//! Shared FIFO of records
//!
//! The queue is the one piece of session-facing state that is shared
//! between threads: any number of sessions may poll and offer against the
//! same queue concurrently. A single mutex around a `VecDeque` keeps every
//! operation atomic; polling never reorders what it leaves behind.
//!
//! Records whose penalty has not expired stay in place and are skipped by
//! every `poll*` method.

use chrono::{DateTime, Utc};
use flowfile_core::FlowFile;
use parking_lot::{Mutex, MutexGuard};
use std::collections::VecDeque;

/// Verdict of a queue filter for one candidate record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterResult {
    /// Take the record and keep scanning
    AcceptAndContinue,
    /// Take the record and stop
    AcceptAndTerminate,
    /// Leave the record and keep scanning
    RejectAndContinue,
    /// Leave the record and stop
    RejectAndTerminate,
}

impl FilterResult {
    /// Whether the record is taken
    pub fn accepts(&self) -> bool {
        matches!(
            self,
            FilterResult::AcceptAndContinue | FilterResult::AcceptAndTerminate
        )
    }

    /// Whether scanning continues after this record
    pub fn continues(&self) -> bool {
        matches!(
            self,
            FilterResult::AcceptAndContinue | FilterResult::RejectAndContinue
        )
    }
}

/// Concurrency-safe FIFO of records
#[derive(Debug)]
pub struct FlowFileQueue {
    name: String,
    records: Mutex<VecDeque<FlowFile>>,
}

impl FlowFileQueue {
    /// Empty queue
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: Mutex::new(VecDeque::new()),
        }
    }

    /// Queue name (for logging)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append one record
    pub fn offer(&self, record: FlowFile) {
        self.records.lock().push_back(record);
    }

    /// Append records, keeping their relative order
    pub fn offer_all<I: IntoIterator<Item = FlowFile>>(&self, records: I) {
        self.records.lock().extend(records);
    }

    /// Take the oldest available record
    pub fn poll(&self) -> Option<FlowFile> {
        self.poll_at(Utc::now())
    }

    /// Take the oldest record available at `now`
    pub fn poll_at(&self, now: DateTime<Utc>) -> Option<FlowFile> {
        let mut records = self.records.lock();
        let position = records.iter().position(|r| !r.is_penalty_active(now))?;
        records.remove(position)
    }

    /// Take up to `max` available records, oldest first
    pub fn poll_batch(&self, max: usize) -> Vec<FlowFile> {
        if max == 0 {
            return Vec::new();
        }
        let mut remaining = max;
        self.poll_matching(|_| {
            remaining -= 1;
            if remaining == 0 {
                FilterResult::AcceptAndTerminate
            } else {
                FilterResult::AcceptAndContinue
            }
        })
    }

    /// Take the available records a filter accepts
    ///
    /// The filter sees available records oldest first. Rejected and
    /// penalized records keep their positions.
    pub fn poll_matching<F>(&self, mut filter: F) -> Vec<FlowFile>
    where
        F: FnMut(&FlowFile) -> FilterResult,
    {
        let now = Utc::now();
        let mut records = self.records.lock();
        let mut accepted = Vec::new();
        let mut kept = VecDeque::with_capacity(records.len());

        while let Some(record) = records.pop_front() {
            if record.is_penalty_active(now) {
                kept.push_back(record);
                continue;
            }
            let verdict = filter(&record);
            if verdict.accepts() {
                accepted.push(record);
            } else {
                kept.push_back(record);
            }
            if !verdict.continues() {
                break;
            }
        }

        kept.append(&mut records);
        *records = kept;
        accepted
    }

    /// Number of queued records, penalized ones included
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether the queue holds no records at all
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Copy of the queue contents, oldest first
    pub fn snapshot(&self) -> Vec<FlowFile> {
        self.records.lock().iter().cloned().collect()
    }

    /// Remove and return everything, oldest first
    pub fn drain(&self) -> Vec<FlowFile> {
        self.records.lock().drain(..).collect()
    }

    /// Lock the queue for a multi-queue publish
    pub(crate) fn lock(&self) -> MutexGuard<'_, VecDeque<FlowFile>> {
        self.records.lock()
    }
}
