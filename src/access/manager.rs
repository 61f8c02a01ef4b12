//! Access-control manager
//!
//! Owns the tree registry and is the sole writer of membership state.
//!
//! ## Invariants
//! - ACC-R1/ACC-R2 (disjoint role sets) are enforced by `Tree::set_role`
//! - Authorization is evaluated against the committed membership state
//!   under the registry read lock, so a grant and a check never interleave
//!   mid-update

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use super::errors::{AccessError, AccessResult};
use super::role::Role;
use super::tree::{Tree, TreeId, UserId};

/// Maintains per-tree role membership and authorizes operations against it.
#[derive(Debug, Default)]
pub struct AccessControlManager {
    trees: RwLock<HashMap<TreeId, Tree>>,
}

impl AccessControlManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tree owned by `owner_id`.
    pub fn create_tree(
        &self,
        name: impl Into<String>,
        owner_id: UserId,
        is_public: bool,
    ) -> AccessResult<Tree> {
        let tree = Tree::new(name, owner_id, is_public);
        let mut trees = self.write_lock()?;
        trees.insert(tree.id, tree.clone());
        Ok(tree)
    }

    /// Fetch a tree by id.
    pub fn get_tree(&self, tree_id: TreeId) -> AccessResult<Tree> {
        let trees = self.read_lock()?;
        trees.get(&tree_id).cloned().ok_or(AccessError::TreeNotFound)
    }

    /// Remove a tree from the registry, returning it.
    ///
    /// Cascading deletion of persons and invitations is the engine's job;
    /// this only forgets the membership state.
    pub fn remove_tree(&self, tree_id: TreeId) -> AccessResult<Tree> {
        let mut trees = self.write_lock()?;
        trees.remove(&tree_id).ok_or(AccessError::TreeNotFound)
    }

    /// Bump the tree's `updated_at` timestamp.
    pub fn touch(&self, tree_id: TreeId) -> AccessResult<()> {
        let mut trees = self.write_lock()?;
        let tree = trees.get_mut(&tree_id).ok_or(AccessError::TreeNotFound)?;
        tree.updated_at = Utc::now();
        Ok(())
    }

    /// The role `user` holds on the tree, if any.
    pub fn role_of(&self, tree_id: TreeId, user: UserId) -> AccessResult<Option<Role>> {
        let trees = self.read_lock()?;
        let tree = trees.get(&tree_id).ok_or(AccessError::TreeNotFound)?;
        Ok(tree.role_of(user))
    }

    /// Check that `caller` may perform an operation requiring `required`.
    ///
    /// Anonymous callers (`None`) pass only viewer-level checks on public
    /// trees. Everything else requires a role at least as capable as
    /// `required`.
    pub fn authorize(
        &self,
        tree_id: TreeId,
        caller: Option<UserId>,
        required: Role,
    ) -> AccessResult<()> {
        let trees = self.read_lock()?;
        let tree = trees.get(&tree_id).ok_or(AccessError::TreeNotFound)?;

        if required == Role::Viewer && tree.is_public {
            return Ok(());
        }

        let caller = caller.ok_or(AccessError::Unauthorized { required })?;
        match tree.role_of(caller) {
            Some(role) if role >= required => Ok(()),
            _ => Err(AccessError::Unauthorized { required }),
        }
    }

    /// Upsert a role for `target`, removing it from any other role set first.
    ///
    /// # Invariant
    /// ACC-R1: an identity holds exactly one role per tree, or none.
    pub fn grant_role(&self, tree_id: TreeId, target: UserId, role: Role) -> AccessResult<()> {
        let mut trees = self.write_lock()?;
        let tree = trees.get_mut(&tree_id).ok_or(AccessError::TreeNotFound)?;
        tree.set_role(target, role)
    }

    /// Remove `target` from all role sets.
    ///
    /// Revoking the owner or a non-member is an error.
    pub fn revoke(&self, tree_id: TreeId, target: UserId) -> AccessResult<()> {
        let mut trees = self.write_lock()?;
        let tree = trees.get_mut(&tree_id).ok_or(AccessError::TreeNotFound)?;
        if target == tree.owner_id {
            return Err(AccessError::OwnerImmutable);
        }
        if tree.remove_member(target) {
            Ok(())
        } else {
            Err(AccessError::NotAMember)
        }
    }

    /// All registered trees, for snapshot export.
    pub fn dump(&self) -> AccessResult<Vec<Tree>> {
        let trees = self.read_lock()?;
        Ok(trees.values().cloned().collect())
    }

    /// Replace all membership state, for snapshot restore.
    pub fn restore(&self, snapshot: Vec<Tree>) -> AccessResult<()> {
        let mut trees = self.write_lock()?;
        *trees = snapshot.into_iter().map(|t| (t.id, t)).collect();
        Ok(())
    }

    fn read_lock(&self) -> AccessResult<std::sync::RwLockReadGuard<'_, HashMap<TreeId, Tree>>> {
        self.trees.read().map_err(|_| AccessError::LockPoisoned)
    }

    fn write_lock(&self) -> AccessResult<std::sync::RwLockWriteGuard<'_, HashMap<TreeId, Tree>>> {
        self.trees.write().map_err(|_| AccessError::LockPoisoned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn manager_with_tree() -> (AccessControlManager, Tree, UserId) {
        let manager = AccessControlManager::new();
        let owner = Uuid::new_v4();
        let tree = manager.create_tree("test tree", owner, false).unwrap();
        (manager, tree, owner)
    }

    #[test]
    fn test_authorize_role_ordering() {
        let (manager, tree, owner) = manager_with_tree();
        let editor = Uuid::new_v4();
        let viewer = Uuid::new_v4();
        manager.grant_role(tree.id, editor, Role::Editor).unwrap();
        manager.grant_role(tree.id, viewer, Role::Viewer).unwrap();

        // Owner passes every check
        for required in [Role::Viewer, Role::Editor, Role::Owner] {
            assert!(manager.authorize(tree.id, Some(owner), required).is_ok());
        }

        // Editor passes viewer and editor checks, not owner
        assert!(manager.authorize(tree.id, Some(editor), Role::Editor).is_ok());
        assert_eq!(
            manager.authorize(tree.id, Some(editor), Role::Owner),
            Err(AccessError::Unauthorized {
                required: Role::Owner
            })
        );

        // Viewer passes only viewer checks
        assert!(manager.authorize(tree.id, Some(viewer), Role::Viewer).is_ok());
        assert!(manager
            .authorize(tree.id, Some(viewer), Role::Editor)
            .is_err());
    }

    #[test]
    fn test_anonymous_read_on_public_tree() {
        let manager = AccessControlManager::new();
        let tree = manager
            .create_tree("public tree", Uuid::new_v4(), true)
            .unwrap();

        assert!(manager.authorize(tree.id, None, Role::Viewer).is_ok());
        // Public visibility never grants write access
        assert!(manager.authorize(tree.id, None, Role::Editor).is_err());
    }

    #[test]
    fn test_private_tree_rejects_strangers() {
        let (manager, tree, _) = manager_with_tree();
        let stranger = Uuid::new_v4();
        assert!(manager.authorize(tree.id, None, Role::Viewer).is_err());
        assert!(manager
            .authorize(tree.id, Some(stranger), Role::Viewer)
            .is_err());
    }

    #[test]
    fn test_grant_is_upsert() {
        let (manager, tree, _) = manager_with_tree();
        let user = Uuid::new_v4();

        manager.grant_role(tree.id, user, Role::Viewer).unwrap();
        manager.grant_role(tree.id, user, Role::Editor).unwrap();

        let tree = manager.get_tree(tree.id).unwrap();
        assert_eq!(tree.role_of(user), Some(Role::Editor));
        assert_eq!(tree.editor_ids.len() + tree.viewer_ids.len(), 1);
    }

    #[test]
    fn test_revoke_paths() {
        let (manager, tree, owner) = manager_with_tree();
        let user = Uuid::new_v4();
        manager.grant_role(tree.id, user, Role::Viewer).unwrap();

        assert!(manager.revoke(tree.id, user).is_ok());
        assert_eq!(manager.revoke(tree.id, user), Err(AccessError::NotAMember));
        assert_eq!(
            manager.revoke(tree.id, owner),
            Err(AccessError::OwnerImmutable)
        );
    }

    #[test]
    fn test_missing_tree() {
        let manager = AccessControlManager::new();
        let missing = Uuid::new_v4();
        assert_eq!(
            manager.authorize(missing, None, Role::Viewer),
            Err(AccessError::TreeNotFound)
        );
        assert_eq!(manager.touch(missing), Err(AccessError::TreeNotFound));
    }

    #[test]
    fn test_touch_bumps_updated_at() {
        let (manager, tree, _) = manager_with_tree();
        let before = manager.get_tree(tree.id).unwrap().updated_at;
        std::thread::sleep(std::time::Duration::from_millis(2));
        manager.touch(tree.id).unwrap();
        let after = manager.get_tree(tree.id).unwrap().updated_at;
        assert!(after > before);
    }
}
