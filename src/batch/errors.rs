//! Error types for batch mutation.

use thiserror::Error;

use crate::access::AccessError;
use crate::store::{PersonId, StoreError};

/// Result type for batch operations
pub type BatchResult<T> = Result<T, BatchError>;

/// Batch-mutation errors. Any of these aborts the whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    /// A modify entry's expected version does not match the committed row
    /// (`actual: None` means the row no longer exists)
    #[error(
        "Version conflict on person {person_id}: expected version {expected}, found {}",
        .actual.map_or_else(|| "no record".to_string(), |v| v.to_string())
    )]
    VersionConflict {
        /// The stale person id
        person_id: PersonId,
        /// Version the caller expected
        expected: u64,
        /// Committed version, or None if the row is missing
        actual: Option<u64>,
    },

    /// An add entry collides with an existing or duplicated person id
    #[error("Person {person_id} already exists")]
    DuplicateId {
        /// The colliding person id
        person_id: PersonId,
    },

    /// A person entry is not a JSON object
    #[error("Invalid payload: JSON object expected")]
    InvalidPayload,

    /// A person entry has no numeric `id` field
    #[error("Person entry is missing a numeric 'id' field")]
    MissingId,

    /// A modify entry has no `version` field to validate against
    #[error("Modify entry for person {person_id} is missing its expected version")]
    MissingVersion {
        /// The entry's person id
        person_id: PersonId,
    },

    /// A payload URL uses a disallowed scheme
    #[error("Security check failed: illegal URL scheme in {field}")]
    IllegalUrl {
        /// Which payload field carried the URL
        field: String,
    },

    /// Store-level failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Tree bookkeeping failure
    #[error(transparent)]
    Access(#[from] AccessError),
}

impl BatchError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            BatchError::VersionConflict { .. } => 409,
            BatchError::DuplicateId { .. } => 409,
            BatchError::InvalidPayload => 400,
            BatchError::MissingId => 400,
            BatchError::MissingVersion { .. } => 400,
            BatchError::IllegalUrl { .. } => 400,
            BatchError::Store(err) => err.status_code(),
            BatchError::Access(err) => err.status_code(),
        }
    }
}
