//! Relationships and relationship catalogs
//!
//! A relationship is a named output a component may route records to. The
//! session never caches the declared set; it asks the catalog on every
//! transfer so that catalogs maintained elsewhere may change between calls.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Name of the reserved relationship that routes back to the input queue
pub const SELF_RELATIONSHIP: &str = "self";

/// Immutable (name, description) pair
///
/// Equality, hashing and ordering consider the name only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    name: String,
    description: String,
}

impl Relationship {
    /// Create a relationship
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }

    /// The reserved relationship that re-queues to the session's input
    pub fn self_relationship() -> Self {
        Self::new(SELF_RELATIONSHIP, "Routes back to the input queue")
    }

    /// Relationship name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// True for the reserved self relationship
    pub fn is_self(&self) -> bool {
        self.name == SELF_RELATIONSHIP
    }
}

impl PartialEq for Relationship {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Relationship {}

impl Hash for Relationship {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl Ord for Relationship {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl PartialOrd for Relationship {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Source of the relationships a component declares
pub trait RelationshipCatalog: Send + Sync {
    /// The currently declared relationships
    fn declared_relationships(&self) -> BTreeSet<Relationship>;

    /// Whether `relationship` is currently declared
    fn is_declared(&self, relationship: &Relationship) -> bool {
        self.declared_relationships().contains(relationship)
    }
}

/// A fixed set of relationships
#[derive(Debug, Clone, Default)]
pub struct StaticRelationships {
    relationships: BTreeSet<Relationship>,
}

impl StaticRelationships {
    /// Declare the given relationships
    pub fn new<I: IntoIterator<Item = Relationship>>(relationships: I) -> Self {
        Self {
            relationships: relationships.into_iter().collect(),
        }
    }
}

impl RelationshipCatalog for StaticRelationships {
    fn declared_relationships(&self) -> BTreeSet<Relationship> {
        self.relationships.clone()
    }

    fn is_declared(&self, relationship: &Relationship) -> bool {
        self.relationships.contains(relationship)
    }
}

/// A relationship set that can change while sessions are open
#[derive(Debug, Default)]
pub struct DynamicRelationships {
    relationships: RwLock<BTreeSet<Relationship>>,
}

impl DynamicRelationships {
    /// Start with the given relationships
    pub fn new<I: IntoIterator<Item = Relationship>>(relationships: I) -> Self {
        Self {
            relationships: RwLock::new(relationships.into_iter().collect()),
        }
    }

    /// Declare another relationship; returns false if it was already declared
    pub fn add(&self, relationship: Relationship) -> bool {
        self.relationships.write().insert(relationship)
    }

    /// Withdraw a relationship; returns false if it was not declared
    pub fn remove(&self, relationship: &Relationship) -> bool {
        self.relationships.write().remove(relationship)
    }
}

impl RelationshipCatalog for DynamicRelationships {
    fn declared_relationships(&self) -> BTreeSet<Relationship> {
        self.relationships.read().clone()
    }

    fn is_declared(&self, relationship: &Relationship) -> bool {
        self.relationships.read().contains(relationship)
    }
}
