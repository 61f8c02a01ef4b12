//! lineagedb - a collaborative family-tree engine
//!
//! Multiple collaborators edit a shared tree of person records without
//! clobbering each other. The crate provides:
//!
//! - a versioned record store with row-level transaction locking
//! - an atomic batch-mutation coordinator (optimistic concurrency)
//! - per-tree role membership (owner / editor / viewer)
//! - time-limited, usage-capped invitation tokens

pub mod access;
pub mod batch;
pub mod engine;
pub mod invite;
pub mod observability;
pub mod store;
