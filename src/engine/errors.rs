//! Engine-level error aggregation.
//!
//! Each component keeps its own typed errors; the facade folds them into
//! one enum so the request layer matches on a single type and maps it to
//! an HTTP status.

use thiserror::Error;

use crate::access::AccessError;
use crate::batch::BatchError;
use crate::invite::InvitationError;
use crate::store::StoreError;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Any failure the engine surface can report.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Authorization or membership failure
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Batch validation or commit failure
    #[error(transparent)]
    Batch(#[from] BatchError),

    /// Invitation failure
    #[error(transparent)]
    Invitation(#[from] InvitationError),

    /// Store failure outside a batch
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Every person id up to the maximum is already taken in this tree
    #[error("No free person id left in this tree")]
    IdSpaceExhausted,

    /// Snapshot file could not be read or written
    #[error("Snapshot I/O failed: {0}")]
    SnapshotIo(#[from] std::io::Error),

    /// Snapshot content could not be encoded or decoded
    #[error("Snapshot encoding failed: {0}")]
    SnapshotEncoding(#[from] serde_json::Error),

    /// Snapshot written by an incompatible engine version
    #[error("Unsupported snapshot format version {0}")]
    SnapshotFormat(u32),
}

impl EngineError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            EngineError::Access(err) => err.status_code(),
            EngineError::Batch(err) => err.status_code(),
            EngineError::Invitation(err) => err.status_code(),
            EngineError::Store(err) => err.status_code(),
            EngineError::IdSpaceExhausted => 409,
            EngineError::SnapshotIo(_) => 500,
            EngineError::SnapshotEncoding(_) => 500,
            EngineError::SnapshotFormat(_) => 500,
        }
    }

    /// Whether the failure is the caller's fault
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Role;
    use crate::store::PersonId;

    #[test]
    fn test_status_codes_delegate() {
        let unauthorized = EngineError::Access(AccessError::Unauthorized {
            required: Role::Editor,
        });
        assert_eq!(unauthorized.status_code(), 403);
        assert!(unauthorized.is_client_error());

        let conflict = EngineError::Batch(BatchError::VersionConflict {
            person_id: PersonId::new(1),
            expected: 0,
            actual: Some(1),
        });
        assert_eq!(conflict.status_code(), 409);

        assert_eq!(EngineError::SnapshotFormat(9).status_code(), 500);
    }
}
