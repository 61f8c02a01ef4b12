//! The engine facade.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use crate::access::{AccessControlManager, Role, Tree, TreeId, UserId};
use crate::batch::{BatchMutationCoordinator, BatchOutcome, BatchRequest};
use crate::invite::{Invitation, InvitationConfig, InvitationService, RedeemOutcome};
use crate::observability::Logger;
use crate::store::{PersonId, VersionedRecordStore};

use super::errors::{EngineError, EngineResult};
use super::snapshot::{EngineSnapshot, PersonRow, SNAPSHOT_FORMAT_VERSION};

/// What a caller is allowed to do with a tree, shaped for the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeInfo {
    /// Display name
    pub name: String,
    /// Whether the caller may mutate person data
    pub editable: bool,
    /// Whether the caller may attach files; demo trees disable this for
    /// non-editors
    pub file_uploads: bool,
    /// Demo flag
    pub demo: bool,
}

/// The collaborative family-tree engine.
///
/// Safe to share across request handlers (`Arc<TreeEngine>`); all interior
/// state is lock-protected by the components.
pub struct TreeEngine {
    access: Arc<AccessControlManager>,
    store: Arc<VersionedRecordStore>,
    coordinator: BatchMutationCoordinator,
    invitations: InvitationService,
}

impl Default for TreeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeEngine {
    pub fn new() -> Self {
        Self::with_config(InvitationConfig::default())
    }

    pub fn with_config(config: InvitationConfig) -> Self {
        let access = Arc::new(AccessControlManager::new());
        let store = Arc::new(VersionedRecordStore::new());
        let coordinator = BatchMutationCoordinator::new(Arc::clone(&store), Arc::clone(&access));
        let invitations = InvitationService::with_config(Arc::clone(&access), config);
        Self {
            access,
            store,
            coordinator,
            invitations,
        }
    }

    /// Direct access to membership state, mainly for tests and embedders.
    pub fn access(&self) -> &AccessControlManager {
        &self.access
    }

    // ------------------------------------------------------------------
    // Tree lifecycle
    // ------------------------------------------------------------------

    /// Create a tree owned by `caller`.
    pub fn create_tree(
        &self,
        caller: UserId,
        name: &str,
        is_public: bool,
    ) -> EngineResult<Tree> {
        let tree = self.access.create_tree(name, caller, is_public)?;
        Logger::info(
            "TREE_CREATE",
            &[
                ("tree", &tree.id.to_string()),
                ("owner", &caller.to_string()),
            ],
        );
        Ok(tree)
    }

    /// Delete a tree and everything it owns. Owner only.
    ///
    /// Waits for in-flight batches on the tree, then holds the tree
    /// barrier across the whole cascade so no batch can commit into the
    /// keyspace mid-delete.
    pub fn delete_tree(&self, caller: UserId, tree_id: TreeId) -> EngineResult<()> {
        self.access.authorize(tree_id, Some(caller), Role::Owner)?;

        let barrier = self.store.lock_tree(tree_id)?;
        let persons = self.store.remove_tree(tree_id)?;
        let invitations = self.invitations.remove_tree(tree_id)?;
        self.access.remove_tree(tree_id)?;
        drop(barrier);

        Logger::info(
            "TREE_DELETE",
            &[
                ("tree", &tree_id.to_string()),
                ("persons", &persons.to_string()),
                ("invitations", &invitations.to_string()),
            ],
        );
        Ok(())
    }

    /// Tree metadata as the caller sees it. Viewer level (public trees are
    /// readable anonymously).
    pub fn tree_info(&self, caller: Option<UserId>, tree_id: TreeId) -> EngineResult<TreeInfo> {
        self.access.authorize(tree_id, caller, Role::Viewer)?;
        let tree = self.access.get_tree(tree_id)?;

        let editable = caller
            .map(|user| {
                self.access
                    .authorize(tree_id, Some(user), Role::Editor)
                    .is_ok()
            })
            .unwrap_or(false);

        Ok(TreeInfo {
            name: tree.name.clone(),
            editable,
            file_uploads: tree.allow_file_uploads && !(tree.is_demo && !editable),
            demo: tree.is_demo,
        })
    }

    /// All person payloads of a tree. Viewer level.
    pub fn tree_data(&self, caller: Option<UserId>, tree_id: TreeId) -> EngineResult<Vec<Value>> {
        self.access.authorize(tree_id, caller, Role::Viewer)?;
        let records = self.store.list_tree(tree_id)?;
        Ok(records.into_iter().map(|record| record.payload).collect())
    }

    /// Next free person id for a tree. Editor level.
    ///
    /// Client-supplied ids are honored on add, so the highest stored id
    /// may sit at the top of the id space; allocation reports that rather
    /// than wrapping.
    pub fn allocate_person_id(&self, caller: UserId, tree_id: TreeId) -> EngineResult<PersonId> {
        self.access.authorize(tree_id, Some(caller), Role::Editor)?;
        let next = match self.store.max_person_id(tree_id)? {
            Some(max) => max
                .value()
                .checked_add(1)
                .map(PersonId::new)
                .ok_or(EngineError::IdSpaceExhausted)?,
            None => PersonId::new(1),
        };
        Ok(next)
    }

    // ------------------------------------------------------------------
    // Batch mutation
    // ------------------------------------------------------------------

    /// Apply a batch of person mutations. Editor level.
    pub fn apply_batch(
        &self,
        caller: UserId,
        tree_id: TreeId,
        request: BatchRequest,
    ) -> EngineResult<BatchOutcome> {
        self.access.authorize(tree_id, Some(caller), Role::Editor)?;

        match self.coordinator.apply_batch(tree_id, request) {
            Ok(outcome) => {
                Logger::info(
                    "BATCH_COMMIT",
                    &[
                        ("tree", &tree_id.to_string()),
                        ("added", &outcome.added.to_string()),
                        ("modified", &outcome.modified.to_string()),
                        ("deleted", &outcome.deleted.to_string()),
                    ],
                );
                Ok(outcome)
            }
            Err(err) => {
                Logger::warn(
                    "BATCH_REJECTED",
                    &[("tree", &tree_id.to_string()), ("error", &err.to_string())],
                );
                Err(err.into())
            }
        }
    }

    // ------------------------------------------------------------------
    // Sharing
    // ------------------------------------------------------------------

    /// Upsert a role for `target`. Owner only.
    pub fn grant_role(
        &self,
        caller: UserId,
        tree_id: TreeId,
        target: UserId,
        role: Role,
    ) -> EngineResult<()> {
        self.access.authorize(tree_id, Some(caller), Role::Owner)?;
        self.access.grant_role(tree_id, target, role)?;
        Logger::info(
            "ROLE_GRANT",
            &[
                ("tree", &tree_id.to_string()),
                ("target", &target.to_string()),
                ("role", role.as_str()),
            ],
        );
        Ok(())
    }

    /// Remove `target` from all role sets. Owner only.
    pub fn revoke_role(
        &self,
        caller: UserId,
        tree_id: TreeId,
        target: UserId,
    ) -> EngineResult<()> {
        self.access.authorize(tree_id, Some(caller), Role::Owner)?;
        self.access.revoke(tree_id, target)?;
        Logger::info(
            "ROLE_REVOKE",
            &[
                ("tree", &tree_id.to_string()),
                ("target", &target.to_string()),
            ],
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Invitations
    // ------------------------------------------------------------------

    /// Issue an invitation. Editor level, and never above the caller's role.
    pub fn issue_invitation(
        &self,
        caller: UserId,
        tree_id: TreeId,
        role: Role,
        usage_limit: Option<u32>,
    ) -> EngineResult<Invitation> {
        let invitation = self.invitations.issue(tree_id, caller, role, usage_limit)?;
        Logger::info(
            "INVITE_ISSUE",
            &[
                ("tree", &tree_id.to_string()),
                ("role", role.as_str()),
                ("expires_at", &invitation.expires_at.to_rfc3339()),
            ],
        );
        Ok(invitation)
    }

    /// Redeem an invitation token for `caller`.
    pub fn redeem_invitation(
        &self,
        caller: UserId,
        token: &str,
    ) -> EngineResult<RedeemOutcome> {
        match self.invitations.redeem(token, caller) {
            Ok(outcome) => {
                Logger::info(
                    "INVITE_REDEEM",
                    &[
                        ("tree", &outcome.tree_id.to_string()),
                        ("role", outcome.role.as_str()),
                        ("new", &outcome.newly_redeemed.to_string()),
                    ],
                );
                Ok(outcome)
            }
            Err(err) => {
                // Token values never reach the log.
                Logger::warn("INVITE_REJECTED", &[("error", &err.to_string())]);
                Err(err.into())
            }
        }
    }

    /// Delete an invitation. Owner only; already-granted roles survive.
    pub fn revoke_invitation(
        &self,
        caller: UserId,
        tree_id: TreeId,
        token: &str,
    ) -> EngineResult<()> {
        self.access.authorize(tree_id, Some(caller), Role::Owner)?;
        self.invitations.revoke(tree_id, token)?;
        Logger::info("INVITE_REVOKE", &[("tree", &tree_id.to_string())]);
        Ok(())
    }

    /// List a tree's invitations. Owner only.
    pub fn list_invitations(
        &self,
        caller: UserId,
        tree_id: TreeId,
    ) -> EngineResult<Vec<Invitation>> {
        self.access.authorize(tree_id, Some(caller), Role::Owner)?;
        Ok(self.invitations.list_for_tree(tree_id)?)
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Export the complete engine state.
    pub fn export_snapshot(&self) -> EngineResult<EngineSnapshot> {
        let trees = self.access.dump()?;
        let persons = self
            .store
            .dump()?
            .into_iter()
            .map(|(tree_id, record)| PersonRow::from_record(tree_id, record))
            .collect();
        let invitations = self.invitations.dump()?;
        Ok(EngineSnapshot::new(trees, persons, invitations))
    }

    /// Replace all engine state from a snapshot. Run at startup, before
    /// the engine is shared.
    pub fn restore_snapshot(&self, snapshot: EngineSnapshot) -> EngineResult<()> {
        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(EngineError::SnapshotFormat(snapshot.format_version));
        }
        self.access.restore(snapshot.trees)?;
        self.store.restore(
            snapshot
                .persons
                .into_iter()
                .map(PersonRow::into_record)
                .collect(),
        )?;
        self.invitations.restore(snapshot.invitations)?;
        Ok(())
    }

    /// Write the engine state to a JSON file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> EngineResult<()> {
        let snapshot = self.export_snapshot()?;
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), &snapshot)?;
        Ok(())
    }

    /// Load engine state from a JSON file written by [`Self::save_to`].
    pub fn load_from(&self, path: impl AsRef<Path>) -> EngineResult<()> {
        let file = File::open(path)?;
        let snapshot: EngineSnapshot = serde_json::from_reader(BufReader::new(file))?;
        self.restore_snapshot(snapshot)
    }
}
