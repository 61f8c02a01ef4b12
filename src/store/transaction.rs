//! Store transactions
//!
//! A transaction stages writes in memory while holding exclusive row locks,
//! then publishes them in one critical section at commit. Reads go through
//! to committed state; the batch coordinator does all of its validation
//! before staging anything, so a transaction never needs to read its own
//! staged writes.
//!
//! Commit verifies structural preconditions (insert targets vacant, update
//! targets present) for the whole write set before touching the map, so a
//! commit either applies every staged write or none (STO-T1).

use crate::access::TreeId;

use super::errors::{StoreError, StoreResult};
use super::lock_table::RowLockGuard;
use super::record::{PersonId, PersonRecord, RecordKey};
use super::versioned::VersionedRecordStore;

/// A staged write, applied at commit in staging order.
#[derive(Debug, Clone)]
enum WriteOp {
    Insert(PersonRecord),
    Update(PersonRecord),
    Delete(PersonId),
}

/// Counts of effective writes applied by a commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitStats {
    /// Rows inserted
    pub inserted: usize,
    /// Rows updated
    pub updated: usize,
    /// Rows actually removed (deletes of absent rows are no-ops)
    pub deleted: usize,
}

impl CommitStats {
    /// Total number of rows the commit changed.
    pub fn changed(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }
}

/// An open transaction holding row locks on its key set.
///
/// Dropping the transaction without committing discards all staged writes
/// and releases the locks; the store is left untouched.
#[derive(Debug)]
pub struct StoreTransaction<'a> {
    store: &'a VersionedRecordStore,
    tree_id: TreeId,
    guard: RowLockGuard<'a>,
    writes: Vec<WriteOp>,
}

impl<'a> StoreTransaction<'a> {
    pub(super) fn new(
        store: &'a VersionedRecordStore,
        tree_id: TreeId,
        guard: RowLockGuard<'a>,
    ) -> Self {
        Self {
            store,
            tree_id,
            guard,
            writes: Vec::new(),
        }
    }

    /// The tree this transaction is scoped to.
    pub fn tree_id(&self) -> TreeId {
        self.tree_id
    }

    /// Read the committed record for a locked row.
    ///
    /// The row lock guarantees the value cannot change for the lifetime of
    /// this transaction, so a version read here stays valid through commit.
    pub fn read(&self, person_id: PersonId) -> StoreResult<Option<PersonRecord>> {
        debug_assert!(
            self.guard.holds(&RecordKey::new(self.tree_id, person_id)),
            "transaction read outside its locked key set"
        );
        let records = self.store.read_lock()?;
        Ok(records
            .get(&RecordKey::new(self.tree_id, person_id))
            .cloned())
    }

    /// Stage an insert of a new row.
    pub fn stage_insert(&mut self, record: PersonRecord) {
        self.writes.push(WriteOp::Insert(record));
    }

    /// Stage an overwrite of an existing row.
    pub fn stage_update(&mut self, record: PersonRecord) {
        self.writes.push(WriteOp::Update(record));
    }

    /// Stage a delete. Deleting an absent row is a no-op at commit.
    pub fn stage_delete(&mut self, person_id: PersonId) {
        self.writes.push(WriteOp::Delete(person_id));
    }

    /// Number of staged writes.
    pub fn staged(&self) -> usize {
        self.writes.len()
    }

    /// Apply all staged writes atomically and release the row locks.
    pub fn commit(self) -> StoreResult<CommitStats> {
        let mut records = self.store.write_lock()?;

        // Verify pass: nothing is mutated until the whole write set is
        // known to be applicable. Deletes track keys removed earlier in
        // the same write set so delete-then-insert of one id is legal.
        let mut pending_deletes = std::collections::HashSet::new();
        for op in &self.writes {
            match op {
                WriteOp::Insert(record) => {
                    let key = RecordKey::new(self.tree_id, record.person_id);
                    if records.contains_key(&key) && !pending_deletes.contains(&key) {
                        return Err(StoreError::DuplicateId {
                            person_id: record.person_id,
                        });
                    }
                    pending_deletes.remove(&key);
                }
                WriteOp::Update(record) => {
                    let key = RecordKey::new(self.tree_id, record.person_id);
                    if !records.contains_key(&key) || pending_deletes.contains(&key) {
                        return Err(StoreError::RecordNotFound {
                            person_id: record.person_id,
                        });
                    }
                }
                WriteOp::Delete(person_id) => {
                    pending_deletes.insert(RecordKey::new(self.tree_id, *person_id));
                }
            }
        }

        // Apply pass: cannot fail.
        let mut stats = CommitStats::default();
        for op in self.writes.iter() {
            match op {
                WriteOp::Insert(record) => {
                    let key = RecordKey::new(self.tree_id, record.person_id);
                    records.insert(key, record.clone());
                    stats.inserted += 1;
                }
                WriteOp::Update(record) => {
                    let key = RecordKey::new(self.tree_id, record.person_id);
                    records.insert(key, record.clone());
                    stats.updated += 1;
                }
                WriteOp::Delete(person_id) => {
                    let key = RecordKey::new(self.tree_id, *person_id);
                    if records.remove(&key).is_some() {
                        stats.deleted += 1;
                    }
                }
            }
        }

        // Row locks release when `self.guard` drops here.
        Ok(stats)
    }
}
