//! Turning raw pasted links into playable tracks.
//!
//! A mixtape stores whatever the sender pasted; the playable video id is
//! derived on every read and never written back. Links that don't match a
//! known YouTube shape are silently dropped from playback, so one bad link
//! never takes the whole tape down.

use serde::{Deserialize, Serialize};

use crate::domain::mixtape::Track;

/// A track whose link resolved to a playable video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTrack {
    pub id: u64,
    /// canonical watch URL, rebuilt from the video id
    pub url: String,
    #[serde(rename = "videoID")]
    pub video_id: String,
}

const WATCH_MARKER: &str = "youtube.com/watch";
const SHORT_MARKER: &str = "youtu.be/";
const SHORTS_MARKER: &str = "youtube.com/shorts/";

/// The canonical form every resolved track advertises, whatever shape the
/// sender pasted.
pub fn canonical_watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/// Extracts the bare video id from one raw link, or `None` when the link
/// doesn't name a video.
///
/// Three shapes are recognized, checked in this order:
/// 1. `youtube.com/watch` with a `v` query parameter (full URL parsing, so
///    a scheme is required);
/// 2. `youtu.be/<id>`;
/// 3. `youtube.com/shorts/<id>`.
///
/// The short forms take everything after the marker up to the first `?`.
pub fn extract_video_id(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    if url.contains(WATCH_MARKER) {
        return watch_param(url);
    }
    if let Some(rest) = after_marker(url, SHORT_MARKER) {
        return until_query(rest);
    }
    if let Some(rest) = after_marker(url, SHORTS_MARKER) {
        return until_query(rest);
    }
    None
}

/// Resolves a track, rewriting the link to its canonical watch form.
pub fn resolve_track(track: &Track) -> Option<ResolvedTrack> {
    let video_id = extract_video_id(&track.url)?;
    Some(ResolvedTrack {
        id: track.id,
        url: canonical_watch_url(&video_id),
        video_id,
    })
}

/// Resolves a whole track list, keeping order and skipping dead links.
pub fn resolve_tracks(tracks: &[Track]) -> Vec<ResolvedTrack> {
    tracks.iter().filter_map(resolve_track).collect()
}

/// The `v` parameter of a watch URL. The watch form goes through structural
/// URL parsing, so a schemeless `youtube.com/watch?v=...` is malformed here
/// even though the substring forms below would have accepted it.
fn watch_param(url: &str) -> Option<String> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return None;
    }
    let (_, query) = url.split_once('?')?;
    let query = query.split('#').next().unwrap_or(query);
    for pair in query.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if key == "v" && !value.is_empty() {
            return Some(value.to_string());
        }
    }
    None
}

fn after_marker<'a>(url: &'a str, marker: &str) -> Option<&'a str> {
    url.split_once(marker).map(|(_, rest)| rest)
}

fn until_query(rest: &str) -> Option<String> {
    let id = rest.split('?').next().unwrap_or(rest);
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}
