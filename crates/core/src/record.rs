//! The record type (`FlowFile`)
//!
//! A `FlowFile` is an immutable value: attributes, a content reference and
//! a few queueing timestamps. Every change produces a new value with a
//! higher `revision`, and the session keeps only the newest revision of each
//! `RecordId` reachable. Holding on to an older value is harmless, but the
//! session rejects it as stale.

use crate::attributes::{Attributes, CoreAttribute, UUID};
use crate::types::{ContentClaim, RecordId};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Where a record's bytes live
#[derive(Clone, PartialEq, Eq, Default)]
pub enum Content {
    /// No content (size 0)
    #[default]
    Empty,
    /// Bytes held directly by the record
    Inline(Arc<[u8]>),
    /// Window into a content repository blob
    Claim(ContentClaim),
}

impl Content {
    /// Content size in bytes, without reading anything
    pub fn size(&self) -> u64 {
        match self {
            Content::Empty => 0,
            Content::Inline(bytes) => bytes.len() as u64,
            Content::Claim(claim) => claim.length,
        }
    }

    /// The repository claim, if the content lives in a repository
    pub fn claim(&self) -> Option<&ContentClaim> {
        match self {
            Content::Claim(claim) => Some(claim),
            _ => None,
        }
    }
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Empty => write!(f, "Empty"),
            Content::Inline(bytes) => write!(f, "Inline({} bytes)", bytes.len()),
            Content::Claim(claim) => write!(f, "Claim({})", claim),
        }
    }
}

/// One unit of data: attributes plus a content reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowFile {
    id: RecordId,
    revision: u64,
    attributes: Attributes,
    content: Content,
    entry_date: DateTime<Utc>,
    lineage_start: DateTime<Utc>,
    last_queued: Option<DateTime<Utc>>,
    queue_index: Option<u64>,
    penalized: bool,
    penalty_expiration: Option<DateTime<Utc>>,
}

impl FlowFile {
    /// Start building a brand-new record
    pub fn builder() -> FlowFileBuilder {
        FlowFileBuilder::new()
    }

    /// Process-local identity shared by all versions of this record
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Version number within this record's chain
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Value of the `uuid` attribute
    pub fn uuid(&self) -> &str {
        self.attribute(UUID).unwrap_or_default()
    }

    /// All attributes
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// One attribute value
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Content reference
    pub fn content(&self) -> &Content {
        &self.content
    }

    /// Content size in bytes
    pub fn size(&self) -> u64 {
        self.content.size()
    }

    /// When this record (or its oldest ancestor chain link) entered the flow
    pub fn entry_date(&self) -> DateTime<Utc> {
        self.entry_date
    }

    /// When the oldest ancestor in this record's lineage was created
    pub fn lineage_start(&self) -> DateTime<Utc> {
        self.lineage_start
    }

    /// When the record was last placed on a queue
    pub fn last_queued(&self) -> Option<DateTime<Utc>> {
        self.last_queued
    }

    /// Global enqueue order stamped at the last queueing
    pub fn queue_index(&self) -> Option<u64> {
        self.queue_index
    }

    /// Whether the record is penalized
    pub fn is_penalized(&self) -> bool {
        self.penalized
    }

    /// When the penalty ends, if one is set
    pub fn penalty_expiration(&self) -> Option<DateTime<Utc>> {
        self.penalty_expiration
    }

    /// True when the record is penalized and its penalty has not yet expired
    pub fn is_penalty_active(&self, now: DateTime<Utc>) -> bool {
        self.penalized && self.penalty_expiration.map_or(true, |until| until > now)
    }

    /// Same record, replaced attribute map
    pub fn with_attributes(&self, attributes: Attributes) -> Self {
        let mut next = self.next_revision();
        next.attributes = attributes;
        next
    }

    /// Same record, replaced content
    pub fn with_content(&self, content: Content) -> Self {
        let mut next = self.next_revision();
        next.content = content;
        next
    }

    /// Same record, penalty set until `until`
    pub fn penalized_until(&self, until: DateTime<Utc>) -> Self {
        let mut next = self.next_revision();
        next.penalized = true;
        next.penalty_expiration = Some(until);
        next
    }

    /// Same record, penalty cleared
    pub fn unpenalized(&self) -> Self {
        let mut next = self.next_revision();
        next.penalized = false;
        next.penalty_expiration = None;
        next
    }

    /// Same record, stamped as queued at `at` with global order `index`
    ///
    /// The stamp is bookkeeping, not a new version: the revision is kept so
    /// handles taken before the stamp still resolve.
    pub fn queued(&self, at: DateTime<Utc>, index: u64) -> Self {
        let mut next = self.clone();
        next.last_queued = Some(at);
        next.queue_index = Some(index);
        next
    }

    /// A distinct record carrying the same attributes and content
    ///
    /// The copy gets a fresh `RecordId` and `uuid`, starts its own revision
    /// chain and keeps the lineage start of its source.
    pub fn duplicate(&self) -> Self {
        let mut attributes = self.attributes.clone();
        attributes.insert(UUID.to_string(), Uuid::new_v4().to_string());
        FlowFile {
            id: RecordId::next(),
            revision: 0,
            attributes,
            content: self.content.clone(),
            entry_date: Utc::now(),
            lineage_start: self.lineage_start,
            last_queued: None,
            queue_index: None,
            penalized: false,
            penalty_expiration: None,
        }
    }

    fn next_revision(&self) -> Self {
        let mut next = self.clone();
        next.revision += 1;
        next
    }
}

/// Builder for records created outside a session
///
/// Assigns a fresh `RecordId`, a random `uuid`, a default `filename` and
/// `path`, and the current time as entry and lineage start.
#[derive(Debug, Default)]
pub struct FlowFileBuilder {
    attributes: Attributes,
    content: Content,
    lineage_start: Option<DateTime<Utc>>,
}

impl FlowFileBuilder {
    /// Empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one attribute (`uuid` is always generated and cannot be set)
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        if key != UUID {
            self.attributes.insert(key, value.into());
        }
        self
    }

    /// Set several attributes
    pub fn attributes<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in pairs {
            self = self.attribute(key, value);
        }
        self
    }

    /// Inline content
    pub fn content(mut self, bytes: impl AsRef<[u8]>) -> Self {
        let bytes = bytes.as_ref();
        self.content = if bytes.is_empty() {
            Content::Empty
        } else {
            Content::Inline(Arc::from(bytes))
        };
        self
    }

    /// Repository-backed content
    pub fn claim(mut self, claim: ContentClaim) -> Self {
        self.content = Content::Claim(claim);
        self
    }

    /// Inherit lineage start from an ancestor
    pub fn lineage_start(mut self, at: DateTime<Utc>) -> Self {
        self.lineage_start = Some(at);
        self
    }

    /// Finish the record
    pub fn build(self) -> FlowFile {
        let id = RecordId::next();
        let now = Utc::now();
        let mut attributes = self.attributes;
        attributes.insert(UUID.to_string(), Uuid::new_v4().to_string());
        attributes
            .entry(CoreAttribute::Filename.key().to_string())
            .or_insert_with(|| format!("{}", id));
        attributes
            .entry(CoreAttribute::Path.key().to_string())
            .or_insert_with(|| "./".to_string());

        FlowFile {
            id,
            revision: 0,
            attributes,
            content: self.content,
            entry_date: now,
            lineage_start: self.lineage_start.unwrap_or(now),
            last_queued: None,
            queue_index: None,
            penalized: false,
            penalty_expiration: None,
        }
    }
}
