//! Invitation token generation

use rand::rngs::OsRng;
use rand::RngCore;

/// Generate a cryptographically random invitation token.
///
/// Returns a 256-bit (32-byte) random value as URL-safe base64, so the
/// token can sit directly in an invitation link.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, bytes)
}
