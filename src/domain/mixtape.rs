use serde::{Deserialize, Serialize};

use crate::domain::id::MixtapeId;

/// Hard cap on how many tracks fit on one tape.
pub const MAX_TRACKS: usize = 5;

/// Longest recipient label that still fits on the cassette sticker.
pub const MAX_RECIPIENT_CHARS: usize = 15;

/// Label used when the sender leaves the recipient field blank.
pub const DEFAULT_RECIPIENT: &str = "FOR YOU";

/// One user-supplied link.
///
/// `id` is list-local: unique within a mixtape, meaningless outside it.
/// The playable video id is never stored on the raw track, it is derived
/// from `url` on every read (see `domain::resolve`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: u64,
    pub url: String,
}

impl Track {
    pub fn new(id: u64, url: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
        }
    }
}

/// A named, ordered collection of tracks persisted under one store id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mixtape {
    pub id: MixtapeId,
    pub recipient_name: String,
    pub tracks: Vec<Track>,
    /// unix millis, stamped by the store at creation
    pub created_at: i64,
}

/// Payload for creating a mixtape. The store assigns the id and the
/// creation timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMixtape {
    pub recipient_name: String,
    pub tracks: Vec<Track>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MixtapeUpdate {
    pub recipient_name: Option<String>,
    pub tracks: Option<Vec<Track>>,
}

/// Blank labels become the default one; surrounding whitespace never makes
/// it onto the sticker.
pub fn normalize_recipient(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        DEFAULT_RECIPIENT.to_string()
    } else {
        trimmed.to_string()
    }
}
