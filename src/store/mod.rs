//! # Versioned Record Store
//!
//! Durable storage of person records, each carrying a monotonic version
//! counter. The unit of optimistic-locking truth.
//!
//! ## Invariants
//! - STO-V1: `version` starts at 0 on insert and increases by exactly 1 on
//!   every successful update
//! - STO-V2: A row is never written without its transaction holding that
//!   row's exclusive lock
//! - STO-K1: Every key includes the tree identity, so cross-tree access is
//!   impossible by construction
//! - STO-T1: A transaction's staged writes become visible atomically at
//!   commit, or not at all
//!
//! Locking model: a transaction acquires exclusive locks on its whole key
//! set up front (all-or-nothing, so two transactions can never deadlock on
//! each other's rows) and holds them until commit or drop. Transactions on
//! disjoint key sets proceed in parallel.

mod errors;
mod lock_table;
mod record;
mod transaction;
mod versioned;

pub use errors::{StoreError, StoreResult};
pub use lock_table::{LockTable, RowLockGuard, TreeLockGuard};
pub use record::{PersonId, PersonRecord, RecordKey};
pub use transaction::{CommitStats, StoreTransaction};
pub use versioned::VersionedRecordStore;
