//! Person record model
//!
//! A record is an opaque JSON payload plus a version counter. The counter
//! is mirrored into the payload's `version` field so that clients always
//! see the version they must echo back on the next modification.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::access::TreeId;

/// Person identity, unique within a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(u64);

impl PersonId {
    /// Creates a person id from a raw value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Full store key: every key carries the tree identity (STO-K1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    /// Owning tree
    pub tree_id: TreeId,
    /// Person within that tree
    pub person_id: PersonId,
}

impl RecordKey {
    pub const fn new(tree_id: TreeId, person_id: PersonId) -> Self {
        Self { tree_id, person_id }
    }

    /// Smallest key for a tree, for range scans.
    pub(crate) const fn tree_start(tree_id: TreeId) -> Self {
        Self::new(tree_id, PersonId::new(u64::MIN))
    }

    /// Largest key for a tree, for range scans.
    pub(crate) const fn tree_end(tree_id: TreeId) -> Self {
        Self::new(tree_id, PersonId::new(u64::MAX))
    }
}

/// A stored person row: payload plus its version counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRecord {
    /// Person identity within the owning tree
    pub person_id: PersonId,

    /// Opaque structured payload (name, dates, relations, ...)
    pub payload: Value,

    /// Monotonic version counter; starts at 0, +1 per successful update
    pub version: u64,
}

impl PersonRecord {
    /// Build a record, mirroring `version` into the payload.
    ///
    /// The payload is expected to be a JSON object (the batch layer rejects
    /// anything else before it reaches the store).
    pub fn new(person_id: PersonId, mut payload: Value, version: u64) -> Self {
        if let Value::Object(map) = &mut payload {
            map.insert("version".to_string(), Value::from(version));
        }
        Self {
            person_id,
            payload,
            version,
        }
    }
}
