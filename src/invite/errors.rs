//! Error types for the invitation module.

use thiserror::Error;

use crate::access::AccessError;

/// Result type for invitation operations
pub type InvitationResult<T> = Result<T, InvitationError>;

/// Invitation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvitationError {
    /// Token unknown, or not issued for the named tree
    #[error("Invitation not found")]
    NotFound,

    /// Past `expires_at`
    #[error("Invitation has expired")]
    Expired,

    /// Usage limit already met by distinct redeemers
    #[error("Invitation usage limit reached")]
    UsageExceeded,

    /// Invitations only carry grantable roles (editor or viewer)
    #[error("Invitations cannot grant the {0} role")]
    InvalidRole(String),

    /// Underlying membership failure (issuer unauthorized, tree missing, ...)
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Invitation state lock poisoned
    #[error("Invitation state lock poisoned")]
    LockPoisoned,
}

impl InvitationError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            InvitationError::NotFound => 404,
            InvitationError::Expired => 410,
            InvitationError::UsageExceeded => 410,
            InvitationError::InvalidRole(_) => 400,
            InvitationError::Access(err) => err.status_code(),
            InvitationError::LockPoisoned => 500,
        }
    }
}
