//! Observability for lineagedb
//!
//! Structured JSON logging only. Principles:
//!
//! 1. Observability is read-only
//! 2. No side effects on engine execution
//! 3. Synchronous, no buffering, no background threads
//! 4. Deterministic output (alphabetical field ordering)
//!
//! The engine facade emits one event per completed or rejected operation;
//! the core components stay silent.

mod logger;

pub use logger::{Logger, Severity};
