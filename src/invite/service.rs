//! Invitation service
//!
//! Issues, redeems, and revokes invitations, feeding grants into the
//! access-control manager. The redeemer-set update happens under the
//! invitation write lock, so two racing redemptions of the last slot of a
//! capped link serialize and exactly one wins.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{Duration, Utc};

use crate::access::{AccessControlManager, Role, TreeId, UserId};

use super::errors::{InvitationError, InvitationResult};
use super::invitation::{Invitation, InvitationStatus};

/// Invitation issuance configuration.
#[derive(Debug, Clone)]
pub struct InvitationConfig {
    /// Validity window from issuance to expiry
    pub validity: Duration,
}

impl Default for InvitationConfig {
    fn default() -> Self {
        Self {
            validity: Duration::days(14),
        }
    }
}

/// What a successful redemption produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedeemOutcome {
    /// Tree the redeemer now has access to
    pub tree_id: TreeId,
    /// Role held after redemption
    pub role: Role,
    /// False when this identity had already redeemed the token
    pub newly_redeemed: bool,
}

/// Issues and redeems role-granting invitation tokens.
pub struct InvitationService {
    invitations: RwLock<HashMap<String, Invitation>>,
    access: Arc<AccessControlManager>,
    config: InvitationConfig,
}

impl InvitationService {
    pub fn new(access: Arc<AccessControlManager>) -> Self {
        Self::with_config(access, InvitationConfig::default())
    }

    pub fn with_config(access: Arc<AccessControlManager>, config: InvitationConfig) -> Self {
        Self {
            invitations: RwLock::new(HashMap::new()),
            access,
            config,
        }
    }

    /// Issue an invitation for `tree_id` granting `role`.
    ///
    /// The issuer must hold a role at least as capable as both editor and
    /// the issued role, so nobody hands out capability they lack.
    pub fn issue(
        &self,
        tree_id: TreeId,
        issuer: UserId,
        role: Role,
        usage_limit: Option<u32>,
    ) -> InvitationResult<Invitation> {
        if !role.is_grantable() {
            return Err(InvitationError::InvalidRole(role.as_str().to_string()));
        }
        let required = Role::Editor.max(role);
        self.access.authorize(tree_id, Some(issuer), required)?;

        let invitation = Invitation::new(tree_id, role, usage_limit, self.config.validity);
        let mut invitations = self.write_lock()?;
        invitations.insert(invitation.token.clone(), invitation.clone());
        Ok(invitation)
    }

    /// Redeem a token for `redeemer`, granting the invitation's role.
    ///
    /// # Invariants
    /// INV-T2, INV-T3, INV-T4. The check-and-append runs under the write
    /// lock so the cap cannot be oversubscribed by concurrent redeemers.
    pub fn redeem(&self, token: &str, redeemer: UserId) -> InvitationResult<RedeemOutcome> {
        let mut invitations = self.write_lock()?;
        let invitation = invitations
            .get_mut(token)
            .ok_or(InvitationError::NotFound)?;

        let now = Utc::now();
        if invitation.status(now) == InvitationStatus::Expired {
            return Err(InvitationError::Expired);
        }

        // Idempotent re-redemption: no second grant, no second charge.
        if invitation.has_redeemed(redeemer) {
            return Ok(RedeemOutcome {
                tree_id: invitation.tree_id,
                role: invitation.role,
                newly_redeemed: false,
            });
        }

        if invitation.is_exhausted() {
            return Err(InvitationError::UsageExceeded);
        }

        // The owner redeeming their own link keeps the owner role.
        let tree = self.access.get_tree(invitation.tree_id)?;
        if tree.owner_id != redeemer {
            self.access
                .grant_role(invitation.tree_id, redeemer, invitation.role)?;
        }

        invitation.redeemed_by.push(redeemer);
        Ok(RedeemOutcome {
            tree_id: invitation.tree_id,
            role: invitation.role,
            newly_redeemed: true,
        })
    }

    /// Delete an invitation issued for `tree_id`.
    ///
    /// Does not retroactively revoke roles already granted through it.
    pub fn revoke(&self, tree_id: TreeId, token: &str) -> InvitationResult<Invitation> {
        let mut invitations = self.write_lock()?;
        match invitations.remove(token) {
            Some(invitation) if invitation.tree_id == tree_id => Ok(invitation),
            Some(invitation) => {
                // Token exists but was issued for another tree; put it back.
                invitations.insert(invitation.token.clone(), invitation);
                Err(InvitationError::NotFound)
            }
            None => Err(InvitationError::NotFound),
        }
    }

    /// All invitations issued for one tree.
    pub fn list_for_tree(&self, tree_id: TreeId) -> InvitationResult<Vec<Invitation>> {
        let invitations = self.read_lock()?;
        let mut list: Vec<Invitation> = invitations
            .values()
            .filter(|inv| inv.tree_id == tree_id)
            .cloned()
            .collect();
        list.sort_by_key(|inv| inv.created_at);
        Ok(list)
    }

    /// Drop every invitation of a deleted tree. Returns how many.
    pub fn remove_tree(&self, tree_id: TreeId) -> InvitationResult<usize> {
        let mut invitations = self.write_lock()?;
        let before = invitations.len();
        invitations.retain(|_, inv| inv.tree_id != tree_id);
        Ok(before - invitations.len())
    }

    /// All invitations, for snapshot export.
    pub fn dump(&self) -> InvitationResult<Vec<Invitation>> {
        let invitations = self.read_lock()?;
        Ok(invitations.values().cloned().collect())
    }

    /// Replace all invitation state, for snapshot restore.
    pub fn restore(&self, snapshot: Vec<Invitation>) -> InvitationResult<()> {
        let mut invitations = self.write_lock()?;
        *invitations = snapshot
            .into_iter()
            .map(|inv| (inv.token.clone(), inv))
            .collect();
        Ok(())
    }

    fn read_lock(
        &self,
    ) -> InvitationResult<std::sync::RwLockReadGuard<'_, HashMap<String, Invitation>>> {
        self.invitations
            .read()
            .map_err(|_| InvitationError::LockPoisoned)
    }

    fn write_lock(
        &self,
    ) -> InvitationResult<std::sync::RwLockWriteGuard<'_, HashMap<String, Invitation>>> {
        self.invitations
            .write()
            .map_err(|_| InvitationError::LockPoisoned)
    }
}
