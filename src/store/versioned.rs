//! In-memory versioned record store
//!
//! A single ordered map keyed by `(tree_id, person_id)` behind a `RwLock`,
//! plus the row lock table. Point reads and tree scans take the read lock;
//! transaction commits take the write lock exactly once, so readers observe
//! either all of a transaction's effects or none of them.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use crate::access::TreeId;

use super::errors::{StoreError, StoreResult};
use super::lock_table::{LockTable, TreeLockGuard};
use super::record::{PersonId, PersonRecord, RecordKey};
use super::transaction::StoreTransaction;

/// Durable storage of person records with row-level transaction locking.
#[derive(Debug, Default)]
pub struct VersionedRecordStore {
    records: RwLock<BTreeMap<RecordKey, PersonRecord>>,
    lock_table: LockTable,
}

impl VersionedRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the committed record for `(tree_id, person_id)`, if any.
    pub fn get(&self, tree_id: TreeId, person_id: PersonId) -> StoreResult<Option<PersonRecord>> {
        let records = self.read_lock()?;
        Ok(records.get(&RecordKey::new(tree_id, person_id)).cloned())
    }

    /// All committed records of one tree, in person-id order.
    pub fn list_tree(&self, tree_id: TreeId) -> StoreResult<Vec<PersonRecord>> {
        let records = self.read_lock()?;
        Ok(records
            .range(RecordKey::tree_start(tree_id)..=RecordKey::tree_end(tree_id))
            .map(|(_, record)| record.clone())
            .collect())
    }

    /// The highest person id currently stored for a tree.
    pub fn max_person_id(&self, tree_id: TreeId) -> StoreResult<Option<PersonId>> {
        let records = self.read_lock()?;
        Ok(records
            .range(RecordKey::tree_start(tree_id)..=RecordKey::tree_end(tree_id))
            .next_back()
            .map(|(key, _)| key.person_id))
    }

    /// Take the tree-wide barrier: waits for every open transaction on
    /// the tree, then blocks new ones until the guard drops.
    ///
    /// Tree deletion holds this across its whole cascade so a batch can
    /// never commit into a keyspace that is being swept.
    pub fn lock_tree(&self, tree_id: TreeId) -> StoreResult<TreeLockGuard<'_>> {
        self.lock_table.acquire_tree(tree_id)
    }

    /// Drop every record belonging to `tree_id` (tree deletion cascade).
    ///
    /// Callers serialize against open transactions via [`Self::lock_tree`];
    /// this only sweeps the map. Returns the number of records removed.
    pub fn remove_tree(&self, tree_id: TreeId) -> StoreResult<usize> {
        let mut records = self.write_lock()?;
        let keys: Vec<RecordKey> = records
            .range(RecordKey::tree_start(tree_id)..=RecordKey::tree_end(tree_id))
            .map(|(key, _)| *key)
            .collect();
        for key in &keys {
            records.remove(key);
        }
        Ok(keys.len())
    }

    /// Begin a transaction holding exclusive locks on the given person ids.
    ///
    /// Blocks until every requested row lock is free (STO-V2). The locks
    /// are released when the transaction commits or is dropped.
    pub fn begin(
        &self,
        tree_id: TreeId,
        person_ids: impl IntoIterator<Item = PersonId>,
    ) -> StoreResult<StoreTransaction<'_>> {
        let keys: BTreeSet<RecordKey> = person_ids
            .into_iter()
            .map(|person_id| RecordKey::new(tree_id, person_id))
            .collect();
        let guard = self.lock_table.acquire(keys)?;
        Ok(StoreTransaction::new(self, tree_id, guard))
    }

    /// Every committed record with its owning tree, for snapshot export.
    pub fn dump(&self) -> StoreResult<Vec<(TreeId, PersonRecord)>> {
        let records = self.read_lock()?;
        Ok(records
            .iter()
            .map(|(key, record)| (key.tree_id, record.clone()))
            .collect())
    }

    /// Replace all records, for snapshot restore.
    pub fn restore(&self, rows: Vec<(TreeId, PersonRecord)>) -> StoreResult<()> {
        let mut records = self.write_lock()?;
        *records = rows
            .into_iter()
            .map(|(tree_id, record)| (RecordKey::new(tree_id, record.person_id), record))
            .collect();
        Ok(())
    }

    pub(super) fn read_lock(
        &self,
    ) -> StoreResult<std::sync::RwLockReadGuard<'_, BTreeMap<RecordKey, PersonRecord>>> {
        self.records.read().map_err(|_| StoreError::LockPoisoned)
    }

    pub(super) fn write_lock(
        &self,
    ) -> StoreResult<std::sync::RwLockWriteGuard<'_, BTreeMap<RecordKey, PersonRecord>>> {
        self.records.write().map_err(|_| StoreError::LockPoisoned)
    }
}
