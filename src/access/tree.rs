//! Tree model
//!
//! A tree carries its own membership: one owner plus disjoint editor and
//! viewer sets. All mutation goes through [`crate::access::AccessControlManager`],
//! which upholds the disjointness invariants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::AccessError;
use super::role::Role;

/// Tree identity
pub type TreeId = Uuid;

/// Collaborator identity (already authenticated by the caller)
pub type UserId = Uuid;

/// A family tree and its sharing state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    /// Unique tree identifier
    pub id: TreeId,

    /// Display name
    pub name: String,

    /// The owning identity; immutable for the tree's lifetime
    pub owner_id: UserId,

    /// Identities with edit permission (never contains the owner)
    pub editor_ids: Vec<UserId>,

    /// Identities with read permission (never contains the owner)
    pub viewer_ids: Vec<UserId>,

    /// Whether anonymous reads are allowed
    pub is_public: bool,

    /// Demo trees restrict file handling for non-editors
    pub is_demo: bool,

    /// Whether file uploads are enabled for this tree
    pub allow_file_uploads: bool,

    /// When the tree was created
    pub created_at: DateTime<Utc>,

    /// Bumped once per effective batch mutation
    pub updated_at: DateTime<Utc>,
}

impl Tree {
    /// Create a new tree owned by `owner_id`, with empty membership sets.
    pub fn new(name: impl Into<String>, owner_id: UserId, is_public: bool) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            owner_id,
            editor_ids: Vec::new(),
            viewer_ids: Vec::new(),
            is_public,
            is_demo: false,
            allow_file_uploads: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// The role `user` holds on this tree, if any.
    pub fn role_of(&self, user: UserId) -> Option<Role> {
        if user == self.owner_id {
            Some(Role::Owner)
        } else if self.editor_ids.contains(&user) {
            Some(Role::Editor)
        } else if self.viewer_ids.contains(&user) {
            Some(Role::Viewer)
        } else {
            None
        }
    }

    /// Whether `user` holds any role on this tree.
    pub fn is_member(&self, user: UserId) -> bool {
        self.role_of(user).is_some()
    }

    /// Remove `user` from the editor and viewer sets.
    ///
    /// Returns true if the user held either role. The owner is untouched.
    pub(crate) fn remove_member(&mut self, user: UserId) -> bool {
        let before = self.editor_ids.len() + self.viewer_ids.len();
        self.editor_ids.retain(|id| *id != user);
        self.viewer_ids.retain(|id| *id != user);
        before != self.editor_ids.len() + self.viewer_ids.len()
    }

    /// Upsert `user` into exactly one role set.
    ///
    /// Removes the user from any other set first so that an identity holds
    /// at most one role. The owner's role is immutable.
    pub(crate) fn set_role(&mut self, user: UserId, role: Role) -> Result<(), AccessError> {
        if !role.is_grantable() {
            return Err(AccessError::InvalidRole(role.as_str().to_string()));
        }
        if user == self.owner_id {
            return Err(AccessError::OwnerImmutable);
        }
        self.remove_member(user);
        match role {
            Role::Editor => self.editor_ids.push(user),
            Role::Viewer => self.viewer_ids.push(user),
            Role::Owner => unreachable!("rejected by is_grantable above"),
        }
        Ok(())
    }
}
