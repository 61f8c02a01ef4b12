//! # Access Control
//!
//! Per-tree role membership and authorization.
//!
//! ## Invariants
//! - ACC-R1: An identity holds exactly one role per tree, or none
//! - ACC-R2: The owner is never present in the editor or viewer sets
//! - ACC-R3: Roles are totally ordered: viewer < editor < owner
//! - ACC-R4: Only the owner grants, changes, or revokes roles
//!
//! Membership is the only mutable shared state here; it is mutated
//! exclusively through [`AccessControlManager`] so ACC-R1/ACC-R2 cannot be
//! broken from outside.

mod errors;
mod manager;
mod role;
mod tree;

pub use errors::{AccessError, AccessResult};
pub use manager::AccessControlManager;
pub use role::Role;
pub use tree::{Tree, TreeId, UserId};
