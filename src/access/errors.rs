//! Error types for the access-control module.

use thiserror::Error;

use super::role::Role;

/// Result type for access-control operations
pub type AccessResult<T> = Result<T, AccessError>;

/// Access-control errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// Tree does not exist
    #[error("Tree not found")]
    TreeNotFound,

    /// Caller's role is below the required role (or caller is anonymous)
    #[error("Permission denied: requires {required} role")]
    Unauthorized {
        /// The minimum role the operation demands
        required: Role,
    },

    /// Target identity holds no role on this tree
    #[error("The specified user does not have access to this tree")]
    NotAMember,

    /// The owner's role cannot be granted over, changed, or revoked
    #[error("The owner's role is immutable")]
    OwnerImmutable,

    /// Role name not recognized, or role not grantable
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    /// Membership lock poisoned by a panicking writer
    #[error("Membership state lock poisoned")]
    LockPoisoned,
}

impl AccessError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            AccessError::TreeNotFound => 404,
            AccessError::Unauthorized { .. } => 403,
            AccessError::NotAMember => 404,
            AccessError::OwnerImmutable => 400,
            AccessError::InvalidRole(_) => 400,
            AccessError::LockPoisoned => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(AccessError::TreeNotFound.status_code(), 404);
        assert_eq!(
            AccessError::Unauthorized {
                required: Role::Editor
            }
            .status_code(),
            403
        );
        assert_eq!(AccessError::OwnerImmutable.status_code(), 400);
        assert_eq!(AccessError::LockPoisoned.status_code(), 500);
    }

    #[test]
    fn test_unauthorized_names_required_role() {
        let err = AccessError::Unauthorized {
            required: Role::Owner,
        };
        assert!(err.to_string().contains("owner"));
    }
}
