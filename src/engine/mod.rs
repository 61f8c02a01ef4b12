//! # Engine facade
//!
//! Ties the components together behind the surface the request layer
//! calls: tree lifecycle, batch mutation, sharing, and invitations.
//!
//! Every operation authorizes the caller first, before reading any mutable
//! state, and emits one structured log event on completion or rejection.
//! The facade owns no logic of its own beyond authorization, cascade
//! ordering, and logging; the invariants live in the components.

mod errors;
mod facade;
mod snapshot;

pub use errors::{EngineError, EngineResult};
pub use facade::{TreeEngine, TreeInfo};
pub use snapshot::{EngineSnapshot, PersonRow, SNAPSHOT_FORMAT_VERSION};
