//! Role model
//!
//! Roles are totally ordered by capability: `viewer < editor < owner`.
//! Authorization checks compare with `>=`, so an owner passes every check
//! an editor or viewer would.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::AccessError;

/// A collaborator's role on a single tree.
///
/// The derive order matters: `Ord` follows declaration order, which encodes
/// the capability ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May only read tree data
    Viewer,
    /// May mutate person data
    Editor,
    /// Full control: sharing, invitations, tree deletion
    Owner,
}

impl Role {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Editor => "editor",
            Role::Owner => "owner",
        }
    }

    /// Whether this role can be handed out via grants or invitations.
    ///
    /// Ownership is established at tree creation and never reassigned
    /// through the sharing surface.
    pub fn is_grantable(&self) -> bool {
        matches!(self, Role::Viewer | Role::Editor)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "viewer" => Ok(Role::Viewer),
            "editor" => Ok(Role::Editor),
            "owner" => Ok(Role::Owner),
            other => Err(AccessError::InvalidRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_capability_ordering() {
        assert!(Role::Viewer < Role::Editor);
        assert!(Role::Editor < Role::Owner);
        assert!(Role::Owner >= Role::Viewer);
    }

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Viewer, Role::Editor, Role::Owner] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn test_unknown_role_rejected() {
        assert!(matches!(
            "admin".parse::<Role>(),
            Err(AccessError::InvalidRole(_))
        ));
    }

    #[test]
    fn test_owner_not_grantable() {
        assert!(Role::Viewer.is_grantable());
        assert!(Role::Editor.is_grantable());
        assert!(!Role::Owner.is_grantable());
    }
}
