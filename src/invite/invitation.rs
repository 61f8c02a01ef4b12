//! Invitation model
//!
//! An invitation's lifecycle state is derived at the moment of use from its
//! expiry timestamp and redeemer count. Expiry wins over exhaustion: a
//! link that is both past its window and fully used reports `Expired`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::access::{Role, TreeId, UserId};

use super::token::generate_token;

/// Derived lifecycle state of an invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    /// Redeemable
    Active,
    /// Usage limit met; no further distinct redeemers accepted
    Exhausted,
    /// Past `expires_at`; never transitions back
    Expired,
}

/// A redeemable invitation link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    /// Unguessable credential, unique across all trees
    pub token: String,

    /// Tree the invitation grants access to
    pub tree_id: TreeId,

    /// Role granted on redemption (editor or viewer)
    pub role: Role,

    /// Identities that have already redeemed this invitation
    pub redeemed_by: Vec<UserId>,

    /// Maximum number of distinct redeemers; unbounded if absent
    pub usage_limit: Option<u32>,

    /// When the invitation was issued
    pub created_at: DateTime<Utc>,

    /// Hard cutoff for redemption
    pub expires_at: DateTime<Utc>,
}

impl Invitation {
    /// Issue a fresh invitation valid for `validity` from now.
    pub fn new(tree_id: TreeId, role: Role, usage_limit: Option<u32>, validity: Duration) -> Self {
        let now = Utc::now();
        Self {
            token: generate_token(),
            tree_id,
            role,
            redeemed_by: Vec::new(),
            usage_limit,
            created_at: now,
            expires_at: now + validity,
        }
    }

    /// Lifecycle state as of `now`.
    pub fn status(&self, now: DateTime<Utc>) -> InvitationStatus {
        if now > self.expires_at {
            InvitationStatus::Expired
        } else if self.is_exhausted() {
            InvitationStatus::Exhausted
        } else {
            InvitationStatus::Active
        }
    }

    /// Whether the distinct-redeemer count has met the usage limit.
    pub fn is_exhausted(&self) -> bool {
        self.usage_limit
            .is_some_and(|limit| self.redeemed_by.len() >= limit as usize)
    }

    /// Redemptions left, or None if unbounded.
    pub fn remaining_uses(&self) -> Option<u32> {
        self.usage_limit
            .map(|limit| limit.saturating_sub(self.redeemed_by.len() as u32))
    }

    /// Whether `user` has already redeemed this invitation.
    pub fn has_redeemed(&self, user: UserId) -> bool {
        self.redeemed_by.contains(&user)
    }
}
