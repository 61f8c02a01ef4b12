//! # Batch Mutation
//!
//! Validates and applies a batch of add/modify/delete operations against
//! the record store as one atomic, isolated transaction.
//!
//! ## Invariants
//! - BAT-A1: A batch commits all of its effects or none of them
//! - BAT-A2: Every modify entry's expected version is checked against the
//!   committed row while that row's exclusive lock is held, before any
//!   write is staged
//! - BAT-A3: Deleting an absent id is a no-op, not an error
//! - BAT-A4: `updated_at` is bumped once per batch that changed anything,
//!   and not at all otherwise
//!
//! Validating the whole batch up front (rather than check-then-write per
//! record) is what keeps a multi-person edit, such as moving a subtree,
//! from half-applying when one of its records is stale. Holding row locks
//! from validation through commit closes the window where two batches
//! could both pass validation against the same stale version.

mod coordinator;
mod errors;
mod request;
mod sanitize;

pub use coordinator::{BatchMutationCoordinator, BatchOutcome};
pub use errors::{BatchError, BatchResult};
pub use request::{person_id_of, BatchRequest, ModifyEntry};
