//! # Invitations
//!
//! Time-limited, usage-capped tokens that grant a role to whoever redeems
//! them, without further action from the grantor.
//!
//! ## Invariants
//! - INV-T1: Tokens are unguessable (256 bits of OS randomness)
//! - INV-T2: The distinct-redeemer count never exceeds the usage limit
//! - INV-T3: Redemption after expiry is rejected; expiry is evaluated at
//!   redemption time, never by a background sweep
//! - INV-T4: Re-redemption by the same identity is idempotent: no second
//!   grant, no second charge against the cap
//!
//! State is derived, not stored: an invitation is expired or exhausted by
//! comparing its timestamp and redeemer count at the moment of use.

mod errors;
mod invitation;
mod service;
mod token;

pub use errors::{InvitationError, InvitationResult};
pub use invitation::{Invitation, InvitationStatus};
pub use service::{InvitationConfig, InvitationService, RedeemOutcome};
pub use token::generate_token;
