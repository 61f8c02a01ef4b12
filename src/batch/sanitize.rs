//! Payload sanitation
//!
//! Person payloads are opaque to the engine except for two fields the UI
//! later renders as links: `photo` and `documents[].url`. Both must use an
//! `http:`/`https:` scheme or be site-relative; script-carrying schemes are
//! rejected outright so a crafted payload cannot smuggle executable URLs
//! into a collaborator's browser.
//!
//! Every accepted string field is additionally HTML-cleaned at the storage
//! boundary, so a stored payload never carries script content to another
//! collaborator regardless of how the presentation layer renders it.

use serde_json::Value;

use super::errors::{BatchError, BatchResult};

const BLOCKED_SCHEMES: [&str; 3] = ["javascript:", "data:", "vbscript:"];

/// Whether a URL value is acceptable for storage. Empty strings pass (the
/// field is simply unset).
fn url_is_safe(url: &str) -> bool {
    let url = url.trim().to_ascii_lowercase();
    if url.is_empty() {
        return true;
    }
    let allowed =
        url.starts_with("http:") || url.starts_with("https:") || url.starts_with('/');
    let blocked = BLOCKED_SCHEMES.iter().any(|scheme| url.starts_with(scheme));
    allowed && !blocked
}

/// Check every URL-bearing field of one person payload.
pub(super) fn check_payload(payload: &Value) -> BatchResult<()> {
    if let Some(Value::String(photo)) = payload.get("photo") {
        if !url_is_safe(photo) {
            return Err(BatchError::IllegalUrl {
                field: "photo".to_string(),
            });
        }
    }

    if let Some(Value::Array(documents)) = payload.get("documents") {
        for document in documents {
            if let Some(Value::String(url)) = document.get("url") {
                if !url_is_safe(url) {
                    return Err(BatchError::IllegalUrl {
                        field: "documents.url".to_string(),
                    });
                }
            }
        }
    }

    Ok(())
}

/// Strip unsafe HTML from every string field of a payload, recursively.
///
/// Strings without markup pass through unchanged.
pub(super) fn clean_strings(value: &mut Value) {
    match value {
        Value::String(text) => {
            // Markup-free text passes through byte-identical; cleaning
            // would entity-encode ampersands in ordinary names.
            if text.contains('<') {
                *text = ammonia::clean(text);
            }
        }
        Value::Array(items) => {
            for item in items {
                clean_strings(item);
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                clean_strings(item);
            }
        }
        _ => {}
    }
}
