//! Engine snapshots
//!
//! A point-in-time JSON export of the whole engine: trees, person rows,
//! and invitations. Used for backup and for carrying state across process
//! restarts. Restore replaces all state; it is meant to run at startup,
//! before the engine is shared with request handlers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::access::{Tree, TreeId};
use crate::invite::Invitation;
use crate::store::{PersonId, PersonRecord};

/// Current snapshot format version. Bumped on incompatible layout changes.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// One person row with its owning tree, flattened for serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonRow {
    /// Owning tree
    pub tree_id: TreeId,
    /// Person identity within the tree
    pub person_id: PersonId,
    /// Version counter at snapshot time
    pub version: u64,
    /// Opaque payload
    pub payload: Value,
}

impl PersonRow {
    pub(super) fn from_record(tree_id: TreeId, record: PersonRecord) -> Self {
        Self {
            tree_id,
            person_id: record.person_id,
            version: record.version,
            payload: record.payload,
        }
    }

    pub(super) fn into_record(self) -> (TreeId, PersonRecord) {
        let record = PersonRecord {
            person_id: self.person_id,
            payload: self.payload,
            version: self.version,
        };
        (self.tree_id, record)
    }
}

/// The complete serializable state of an engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot {
    /// Snapshot layout version
    pub format_version: u32,
    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,
    /// All trees with their membership
    pub trees: Vec<Tree>,
    /// All person rows
    pub persons: Vec<PersonRow>,
    /// All invitations, including expired ones
    pub invitations: Vec<Invitation>,
}

impl EngineSnapshot {
    pub(super) fn new(
        trees: Vec<Tree>,
        persons: Vec<PersonRow>,
        invitations: Vec<Invitation>,
    ) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            taken_at: Utc::now(),
            trees,
            persons,
            invitations,
        }
    }
}
