//! Core types and traits for FlowFile sessions
//!
//! This crate defines the foundational types used throughout the system:
//! - RecordId, SessionId, ResourceId, ContentClaim: identifiers
//! - FlowFile: the immutable record value and its builder
//! - Attributes: ordered attribute maps and core attribute names
//! - Relationship: named outputs and relationship catalogs
//! - Provenance: lineage event types
//! - Error: error taxonomy shared by every layer
//! - Traits: the content repository contract

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod attributes;
pub mod error;
pub mod provenance;
pub mod record;
pub mod relationship;
pub mod traits;
pub mod types;

pub use attributes::{intersect_attributes, is_immutable_key, Attributes, CoreAttribute, UUID};
pub use error::{Error, Result};
pub use provenance::{ProvenanceEvent, ProvenanceEventType, RecordSnapshot, TransitDetails};
pub use record::{Content, FlowFile, FlowFileBuilder};
pub use relationship::{
    DynamicRelationships, Relationship, RelationshipCatalog, StaticRelationships,
    SELF_RELATIONSHIP,
};
pub use traits::{ClaimWriter, ContentRepository};
pub use types::{ContentClaim, RecordId, ResourceId, SessionId};
