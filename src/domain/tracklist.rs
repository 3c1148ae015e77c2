//! Editing and validating a mixtape's track list.
//!
//! The same rules gate both the creation form and the remix editor: a tape
//! holds one to five tracks, every slot needs a non-blank link, and the
//! recipient label has to fit the sticker.

use std::collections::HashSet;

use thiserror::Error;

use crate::domain::mixtape::{Track, MAX_RECIPIENT_CHARS, MAX_TRACKS};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidateError {
    #[error("a mixtape needs at least one track")]
    NoTracks,

    #[error("a mixtape holds at most 5 tracks, got {0}")]
    TooManyTracks(usize),

    #[error("track {0} has a blank url")]
    BlankUrl(usize),

    #[error("duplicate track id {0}")]
    DuplicateTrackId(u64),

    #[error("recipient label is longer than 15 characters")]
    RecipientTooLong,
}

/// Checks a recipient label that has already been normalized.
pub fn validate_recipient(recipient_name: &str) -> Result<(), ValidateError> {
    if recipient_name.chars().count() > MAX_RECIPIENT_CHARS {
        return Err(ValidateError::RecipientTooLong);
    }
    Ok(())
}

/// Checks a track list before it is written to the store.
pub fn validate_tracks(tracks: &[Track]) -> Result<(), ValidateError> {
    if tracks.is_empty() {
        return Err(ValidateError::NoTracks);
    }
    if tracks.len() > MAX_TRACKS {
        return Err(ValidateError::TooManyTracks(tracks.len()));
    }
    let mut seen = HashSet::new();
    for (i, track) in tracks.iter().enumerate() {
        if track.url.trim().is_empty() {
            // positions are 1-indexed in messages, like on the sticker
            return Err(ValidateError::BlankUrl(i + 1));
        }
        if !seen.insert(track.id) {
            return Err(ValidateError::DuplicateTrackId(track.id));
        }
    }
    Ok(())
}

/// Full pre-save check for a complete document.
pub fn validate_for_save(recipient_name: &str, tracks: &[Track]) -> Result<(), ValidateError> {
    validate_recipient(recipient_name)?;
    validate_tracks(tracks)
}

/// In-memory editor state for one mixtape's track list. All mutations are
/// bounds-checked no-ops when they don't apply, mirroring buttons that the
/// pages disable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackList {
    tracks: Vec<Track>,
}

impl TrackList {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn into_tracks(self) -> Vec<Track> {
        self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Appends an empty slot with a fresh list-local id. Returns false when
    /// the tape is already full.
    pub fn add(&mut self) -> bool {
        if self.tracks.len() >= MAX_TRACKS {
            return false;
        }
        let id = self.tracks.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        self.tracks.push(Track::new(id, ""));
        true
    }

    /// Replaces the link of the track with the given id. Returns false when
    /// no track has that id.
    pub fn update_url(&mut self, id: u64, url: &str) -> bool {
        match self.tracks.iter_mut().find(|t| t.id == id) {
            Some(track) => {
                track.url = url.to_string();
                true
            }
            None => false,
        }
    }

    /// Removes the track at `index`, shifting everything after it up.
    pub fn remove(&mut self, index: usize) -> Option<Track> {
        if index < self.tracks.len() {
            Some(self.tracks.remove(index))
        } else {
            None
        }
    }

    /// Moves the track at `from` so it lands at `to`, shifting the range in
    /// between. Out-of-range positions leave the list untouched.
    pub fn move_track(&mut self, from: usize, to: usize) {
        if from == to || from >= self.tracks.len() || to >= self.tracks.len() {
            return;
        }
        let track = self.tracks.remove(from);
        self.tracks.insert(to, track);
    }
}
