use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use thiserror::Error;

/// Hex chars kept from the BLAKE3 digest when assigning an id.
const ASSIGNED_LEN: usize = 20;

/// Longest id accepted from a URL. Covers assigned ids and curated names.
const MAX_LEN: usize = 64;

static ASSIGN_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Identifier of a stored mixtape document.
///
/// Assigned ids are short opaque hex strings in the style document stores
/// hand out. Curated names like `awesome-mix` are also valid, which is how
/// the default mixtape gets a memorable address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MixtapeId(String);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid mixtape id")]
pub struct InvalidMixtapeId;

impl MixtapeId {
    /// Derives a fresh id for a new document: BLAKE3 over the creation
    /// instant, a process-local counter and the document bytes, truncated
    /// to 20 hex chars. The counter keeps two identical documents created
    /// in the same millisecond from colliding.
    pub fn assign(created_at_millis: i64, doc: &[u8]) -> Self {
        let counter = ASSIGN_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut hasher = blake3::Hasher::new();
        hasher.update(&created_at_millis.to_be_bytes());
        hasher.update(&counter.to_be_bytes());
        hasher.update(doc);
        let hex = hasher.finalize().to_hex().to_string();
        Self(hex[..ASSIGNED_LEN].to_string())
    }

    /// Validates an id that came in from a URL or the command line.
    /// Accepts ASCII alphanumerics plus `-` and `_`, up to 64 chars.
    pub fn parse(raw: &str) -> Result<Self, InvalidMixtapeId> {
        let ok = !raw.is_empty()
            && raw.len() <= MAX_LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if ok {
            Ok(Self(raw.to_string()))
        } else {
            Err(InvalidMixtapeId)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for MixtapeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
