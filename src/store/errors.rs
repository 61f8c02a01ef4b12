//! Error types for the record store.

use thiserror::Error;

use super::record::PersonId;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Record-store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Update targeted a row that does not exist
    #[error("Record {person_id} not found")]
    RecordNotFound {
        /// The missing person id
        person_id: PersonId,
    },

    /// Insert targeted a row that already exists
    #[error("Record {person_id} already exists")]
    DuplicateId {
        /// The colliding person id
        person_id: PersonId,
    },

    /// Store lock poisoned by a panicking writer
    #[error("Record store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::RecordNotFound { .. } => 404,
            StoreError::DuplicateId { .. } => 409,
            StoreError::LockPoisoned => 500,
        }
    }
}
