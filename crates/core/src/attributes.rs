//! Attribute maps and the core attribute names
//!
//! Attributes are an ordered `String -> String` map. A handful of keys are
//! assigned by the session itself; `uuid` is additionally immutable for the
//! lifetime of a record version chain.

use std::collections::BTreeMap;

/// Ordered attribute map
pub type Attributes = BTreeMap<String, String>;

/// Attributes every record carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreAttribute {
    /// Globally unique, user-visible identifier (immutable)
    Uuid,
    /// Logical file name
    Filename,
    /// Logical directory path
    Path,
    /// MIME type of the content, when known
    MimeType,
}

impl CoreAttribute {
    /// Attribute key
    pub const fn key(&self) -> &'static str {
        match self {
            CoreAttribute::Uuid => "uuid",
            CoreAttribute::Filename => "filename",
            CoreAttribute::Path => "path",
            CoreAttribute::MimeType => "mime.type",
        }
    }

    /// Whether the session rejects direct changes to this attribute
    pub const fn is_immutable(&self) -> bool {
        matches!(self, CoreAttribute::Uuid)
    }

    /// Look up a core attribute by key
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "uuid" => Some(CoreAttribute::Uuid),
            "filename" => Some(CoreAttribute::Filename),
            "path" => Some(CoreAttribute::Path),
            "mime.type" => Some(CoreAttribute::MimeType),
            _ => None,
        }
    }
}

/// Key of the immutable `uuid` attribute
pub const UUID: &str = CoreAttribute::Uuid.key();

/// True when `key` names a session-immutable attribute
pub fn is_immutable_key(key: &str) -> bool {
    CoreAttribute::from_key(key).map_or(false, |attr| attr.is_immutable())
}

/// Attributes shared, with identical values, by every source
///
/// A single source is copied as-is rather than run through the general
/// rule; the two are equivalent but the single-parent path mirrors how a
/// forked child inherits from its parent. No sources yields an empty map.
pub fn intersect_attributes<'a, I>(sources: I) -> Attributes
where
    I: IntoIterator<Item = &'a Attributes>,
{
    let mut iter = sources.into_iter();
    let Some(first) = iter.next() else {
        return Attributes::new();
    };
    let rest: Vec<&Attributes> = iter.collect();
    if rest.is_empty() {
        return first.clone();
    }

    first
        .iter()
        .filter(|(key, value)| rest.iter().all(|other| other.get(*key) == Some(*value)))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
