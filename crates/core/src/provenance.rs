//! Provenance event types
//!
//! Provenance events are immutable lineage facts about records. Sessions
//! buffer them and hand them to the finalizer on commit; repositories
//! assign the persistent event id.

use crate::attributes::Attributes;
use crate::record::FlowFile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of lifecycle transition an event describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProvenanceEventType {
    /// Record created from nothing
    Create,
    /// Children derived from one parent
    Fork,
    /// One child derived from several parents
    Join,
    /// Exact copy of a parent
    Clone,
    /// Content sent to an external system
    Send,
    /// Content received from an external system
    Receive,
    /// Content of an existing record replaced by data from an external system
    Fetch,
    /// Record removed from the flow
    Drop,
    /// Content changed
    ContentModified,
    /// Attributes changed
    AttributesModified,
    /// Record routed to a relationship for a stated reason
    Route,
}

impl fmt::Display for ProvenanceEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProvenanceEventType::Create => "CREATE",
            ProvenanceEventType::Fork => "FORK",
            ProvenanceEventType::Join => "JOIN",
            ProvenanceEventType::Clone => "CLONE",
            ProvenanceEventType::Send => "SEND",
            ProvenanceEventType::Receive => "RECEIVE",
            ProvenanceEventType::Fetch => "FETCH",
            ProvenanceEventType::Drop => "DROP",
            ProvenanceEventType::ContentModified => "CONTENT_MODIFIED",
            ProvenanceEventType::AttributesModified => "ATTRIBUTES_MODIFIED",
            ProvenanceEventType::Route => "ROUTE",
        };
        f.write_str(name)
    }
}

/// Snapshot of the record an event is about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    /// `uuid` attribute of the record
    pub uuid: String,
    /// Attributes at the time of the event
    pub attributes: Attributes,
    /// Content size at the time of the event
    pub size: u64,
    /// Lineage start of the record
    pub lineage_start: DateTime<Utc>,
}

impl From<&FlowFile> for RecordSnapshot {
    fn from(record: &FlowFile) -> Self {
        Self {
            uuid: record.uuid().to_string(),
            attributes: record.attributes().clone(),
            size: record.size(),
            lineage_start: record.lineage_start(),
        }
    }
}

/// Optional transit information for SEND/RECEIVE/FETCH events
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitDetails {
    /// URI of the remote system
    pub transit_uri: Option<String>,
    /// Free-form details
    pub details: Option<String>,
    /// Milliseconds spent on the transfer
    pub duration_ms: Option<u64>,
}

impl TransitDetails {
    /// Transit to or from `uri`
    pub fn uri(uri: impl Into<String>) -> Self {
        Self {
            transit_uri: Some(uri.into()),
            ..Self::default()
        }
    }

    /// Free-form details only
    pub fn details(details: impl Into<String>) -> Self {
        Self {
            details: Some(details.into()),
            ..Self::default()
        }
    }
}

/// An immutable lineage event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceEvent {
    /// Id assigned by the provenance repository when persisted
    pub event_id: Option<u64>,
    /// Kind of event
    pub event_type: ProvenanceEventType,
    /// When the event happened
    pub timestamp: DateTime<Utc>,
    /// The record the event is about
    pub record: RecordSnapshot,
    /// Parent record uuids (FORK/JOIN/CLONE)
    pub parent_uuids: Vec<String>,
    /// Child record uuids (FORK/CLONE)
    pub child_uuids: Vec<String>,
    /// Relationship involved, for ROUTE events
    pub relationship: Option<String>,
    /// Transit details
    pub transit: TransitDetails,
}

impl ProvenanceEvent {
    /// New event about `record`
    pub fn new(event_type: ProvenanceEventType, record: &FlowFile) -> Self {
        Self {
            event_id: None,
            event_type,
            timestamp: Utc::now(),
            record: RecordSnapshot::from(record),
            parent_uuids: Vec::new(),
            child_uuids: Vec::new(),
            relationship: None,
            transit: TransitDetails::default(),
        }
    }

    /// Uuid of the record the event is about
    pub fn record_uuid(&self) -> &str {
        &self.record.uuid
    }

    /// Whether this event mentions `uuid` as subject, parent or child
    pub fn references(&self, uuid: &str) -> bool {
        self.record.uuid == uuid
            || self.parent_uuids.iter().any(|p| p == uuid)
            || self.child_uuids.iter().any(|c| c == uuid)
    }
}
