//! Row lock table
//!
//! Transaction-scoped exclusive locks on record keys, plus a tree-wide
//! barrier used by tree deletion.
//!
//! Acquisition is all-or-nothing over the transaction's whole key set: a
//! waiter holds none of its keys until every one is free, then takes them
//! all under the table mutex. Two transactions therefore can never hold
//! partial, mutually-blocking key sets (no deadlock), and transactions on
//! disjoint key sets never wait on each other.
//!
//! The tree barrier waits for every open transaction on the tree and
//! blocks new ones while held, so a deletion cascade never interleaves
//! with a commit into the same keyspace.

use std::collections::{BTreeSet, HashSet};
use std::sync::{Condvar, Mutex};

use crate::access::TreeId;

use super::errors::{StoreError, StoreResult};
use super::record::RecordKey;

#[derive(Debug, Default)]
struct LockState {
    rows: HashSet<RecordKey>,
    trees: HashSet<TreeId>,
}

/// Tracks which record keys and trees are currently locked.
#[derive(Debug, Default)]
pub struct LockTable {
    state: Mutex<LockState>,
    released: Condvar,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until every key in `keys` is free and none of their trees is
    /// barred, then lock them all.
    ///
    /// The returned guard releases the keys on drop.
    pub fn acquire(&self, keys: BTreeSet<RecordKey>) -> StoreResult<RowLockGuard<'_>> {
        let mut state = self.state.lock().map_err(|_| StoreError::LockPoisoned)?;
        while keys
            .iter()
            .any(|key| state.rows.contains(key) || state.trees.contains(&key.tree_id))
        {
            state = self
                .released
                .wait(state)
                .map_err(|_| StoreError::LockPoisoned)?;
        }
        for key in &keys {
            state.rows.insert(*key);
        }
        Ok(RowLockGuard { table: self, keys })
    }

    /// Block until no transaction holds a row of `tree_id`, then bar the
    /// whole tree until the guard drops.
    pub fn acquire_tree(&self, tree_id: TreeId) -> StoreResult<TreeLockGuard<'_>> {
        let mut state = self.state.lock().map_err(|_| StoreError::LockPoisoned)?;
        while state.trees.contains(&tree_id)
            || state.rows.iter().any(|key| key.tree_id == tree_id)
        {
            state = self
                .released
                .wait(state)
                .map_err(|_| StoreError::LockPoisoned)?;
        }
        state.trees.insert(tree_id);
        Ok(TreeLockGuard {
            table: self,
            tree_id,
        })
    }

    /// Number of row keys currently held, across all transactions.
    #[cfg(test)]
    pub(crate) fn held(&self) -> usize {
        self.state.lock().map(|state| state.rows.len()).unwrap_or(0)
    }
}

/// Holds a transaction's row locks; releases them on drop.
#[derive(Debug)]
pub struct RowLockGuard<'a> {
    table: &'a LockTable,
    keys: BTreeSet<RecordKey>,
}

impl RowLockGuard<'_> {
    /// Whether this guard holds the given key.
    pub fn holds(&self, key: &RecordKey) -> bool {
        self.keys.contains(key)
    }
}

impl Drop for RowLockGuard<'_> {
    fn drop(&mut self) {
        // Release even if another thread poisoned the table mutex, so a
        // panic elsewhere cannot strand these keys.
        let mut state = self
            .table
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for key in &self.keys {
            state.rows.remove(key);
        }
        self.table.released.notify_all();
    }
}

/// Holds the barrier on one tree; releases it on drop.
#[derive(Debug)]
pub struct TreeLockGuard<'a> {
    table: &'a LockTable,
    tree_id: TreeId,
}

impl Drop for TreeLockGuard<'_> {
    fn drop(&mut self) {
        let mut state = self
            .table
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.trees.remove(&self.tree_id);
        self.table.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PersonId;
    use std::sync::Arc;
    use uuid::Uuid;

    fn keys(tree: Uuid, ids: &[u64]) -> BTreeSet<RecordKey> {
        ids.iter()
            .map(|id| RecordKey::new(tree, PersonId::new(*id)))
            .collect()
    }

    #[test]
    fn test_acquire_and_release() {
        let table = LockTable::new();
        let tree = Uuid::new_v4();

        let guard = table.acquire(keys(tree, &[1, 2, 3])).unwrap();
        assert_eq!(table.held(), 3);
        assert!(guard.holds(&RecordKey::new(tree, PersonId::new(2))));

        drop(guard);
        assert_eq!(table.held(), 0);
    }

    #[test]
    fn test_disjoint_sets_coexist() {
        let table = LockTable::new();
        let tree = Uuid::new_v4();

        let _a = table.acquire(keys(tree, &[1, 2])).unwrap();
        let _b = table.acquire(keys(tree, &[3, 4])).unwrap();
        assert_eq!(table.held(), 4);
    }

    #[test]
    fn test_different_trees_never_contend() {
        let table = LockTable::new();
        let _a = table.acquire(keys(Uuid::new_v4(), &[1])).unwrap();
        let _b = table.acquire(keys(Uuid::new_v4(), &[1])).unwrap();
        assert_eq!(table.held(), 2);
    }

    #[test]
    fn test_overlapping_waiter_proceeds_after_release() {
        let table = Arc::new(LockTable::new());
        let tree = Uuid::new_v4();

        let guard = table.acquire(keys(tree, &[1, 2])).unwrap();

        let waiter = {
            let table = Arc::clone(&table);
            std::thread::spawn(move || {
                // Blocks until the first guard drops
                let _g = table.acquire(keys(tree, &[2, 3])).unwrap();
            })
        };

        std::thread::sleep(std::time::Duration::from_millis(20));
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.join().unwrap();
        assert_eq!(table.held(), 0);
    }

    #[test]
    fn test_tree_barrier_waits_for_rows() {
        let table = Arc::new(LockTable::new());
        let tree = Uuid::new_v4();

        let rows = table.acquire(keys(tree, &[1])).unwrap();
        let waiter = {
            let table = Arc::clone(&table);
            std::thread::spawn(move || {
                let _barrier = table.acquire_tree(tree).unwrap();
            })
        };

        std::thread::sleep(std::time::Duration::from_millis(20));
        assert!(!waiter.is_finished());

        drop(rows);
        waiter.join().unwrap();
    }

    #[test]
    fn test_barred_tree_blocks_new_rows() {
        let table = Arc::new(LockTable::new());
        let tree = Uuid::new_v4();

        let barrier = table.acquire_tree(tree).unwrap();

        // Another tree's rows proceed immediately
        let _other = table.acquire(keys(Uuid::new_v4(), &[1])).unwrap();

        let waiter = {
            let table = Arc::clone(&table);
            std::thread::spawn(move || {
                let _g = table.acquire(keys(tree, &[1])).unwrap();
            })
        };

        std::thread::sleep(std::time::Duration::from_millis(20));
        assert!(!waiter.is_finished());

        drop(barrier);
        waiter.join().unwrap();
    }

    #[test]
    fn test_empty_key_set() {
        let table = LockTable::new();
        let guard = table.acquire(BTreeSet::new()).unwrap();
        assert_eq!(table.held(), 0);
        drop(guard);
    }
}
