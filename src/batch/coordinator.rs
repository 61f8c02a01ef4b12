//! Batch mutation coordinator
//!
//! The four-phase algorithm, executed inside one store transaction:
//!
//! 1. Validation: lock the batch's whole key set, then check every modify
//!    entry's expected version against the committed row (BAT-A2). Add
//!    entries are checked for id collisions here too.
//! 2. Deletes: staged; absent ids are no-ops (BAT-A3).
//! 3. Modifies: staged with `version = expected + 1`.
//! 4. Adds: staged with `version = 0`.
//!
//! Then one atomic commit, and a single `updated_at` bump if anything
//! actually changed (BAT-A4). Any validation failure returns before a
//! single write is staged, so an aborted batch needs no compensation.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use serde_json::Value;

use crate::access::{AccessControlManager, TreeId};
use crate::store::{PersonId, PersonRecord, VersionedRecordStore};

use super::errors::{BatchError, BatchResult};
use super::request::{person_id_of, BatchRequest};
use super::sanitize;

/// Per-phase counts of what a committed batch changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Persons inserted
    pub added: usize,
    /// Persons rewritten with a bumped version
    pub modified: usize,
    /// Persons actually removed
    pub deleted: usize,
}

impl BatchOutcome {
    /// Total rows the batch changed.
    pub fn changed(&self) -> usize {
        self.added + self.modified + self.deleted
    }
}

/// Applies batches of person mutations atomically under optimistic
/// concurrency control.
pub struct BatchMutationCoordinator {
    store: Arc<VersionedRecordStore>,
    access: Arc<AccessControlManager>,
}

impl BatchMutationCoordinator {
    pub fn new(store: Arc<VersionedRecordStore>, access: Arc<AccessControlManager>) -> Self {
        Self { store, access }
    }

    /// Apply one batch against `tree_id`. All-or-nothing.
    ///
    /// The caller must already be authorized as editor or owner; this
    /// method performs no permission checks of its own.
    pub fn apply_batch(
        &self,
        tree_id: TreeId,
        mut request: BatchRequest,
    ) -> BatchResult<BatchOutcome> {
        // Payload shape and URL checks need no locks; reject cheap and
        // early. Accepted string fields are HTML-cleaned before storage.
        let mut add_entries: Vec<(PersonId, Value)> = Vec::with_capacity(request.add.len());
        for payload in &request.add {
            let person_id = person_id_of(payload)?;
            sanitize::check_payload(payload)?;
            let mut payload = payload.clone();
            sanitize::clean_strings(&mut payload);
            add_entries.push((person_id, payload));
        }
        for entry in &mut request.modify {
            if !entry.payload.is_object() {
                return Err(BatchError::InvalidPayload);
            }
            sanitize::check_payload(&entry.payload)?;
            sanitize::clean_strings(&mut entry.payload);
        }

        // Lock the whole key set up front.
        let mut keys: BTreeSet<PersonId> = BTreeSet::new();
        keys.extend(add_entries.iter().map(|(id, _)| *id));
        keys.extend(request.modify.iter().map(|entry| entry.person_id));
        keys.extend(request.delete.iter().copied());
        let mut txn = self.store.begin(tree_id, keys)?;

        // The tree can be deleted between the caller's authorization and
        // this point; re-check now that the key set is held so a batch
        // never commits into a swept keyspace.
        self.access.get_tree(tree_id)?;

        // Phase 1: validation. Completes for every entry before any write
        // is staged, so a mid-batch conflict aborts with zero effects.
        for entry in &request.modify {
            let committed = txn.read(entry.person_id)?;
            match committed {
                Some(record) if record.version == entry.expected_version => {}
                Some(record) => {
                    return Err(BatchError::VersionConflict {
                        person_id: entry.person_id,
                        expected: entry.expected_version,
                        actual: Some(record.version),
                    });
                }
                None => {
                    return Err(BatchError::VersionConflict {
                        person_id: entry.person_id,
                        expected: entry.expected_version,
                        actual: None,
                    });
                }
            }
        }

        let deleted_ids: HashSet<PersonId> = request.delete.iter().copied().collect();
        let mut new_ids: HashSet<PersonId> = HashSet::new();
        for (person_id, _) in &add_entries {
            // An id being deleted in this same batch may be re-added.
            let occupied = txn.read(*person_id)?.is_some() && !deleted_ids.contains(person_id);
            if occupied || !new_ids.insert(*person_id) {
                return Err(BatchError::DuplicateId {
                    person_id: *person_id,
                });
            }
        }

        // Phase 2: deletes.
        for person_id in &request.delete {
            txn.stage_delete(*person_id);
        }

        // Phase 3: modifies.
        for entry in request.modify {
            txn.stage_update(PersonRecord::new(
                entry.person_id,
                entry.payload,
                entry.expected_version + 1,
            ));
        }

        // Phase 4: adds.
        for (person_id, payload) in add_entries {
            txn.stage_insert(PersonRecord::new(person_id, payload, 0));
        }

        let stats = txn.commit()?;

        // Phase 5: bookkeeping. One bump regardless of how many rows changed.
        if stats.changed() > 0 {
            self.access.touch(tree_id)?;
        }

        Ok(BatchOutcome {
            added: stats.inserted,
            modified: stats.updated,
            deleted: stats.deleted,
        })
    }
}
