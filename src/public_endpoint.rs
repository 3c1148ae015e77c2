use crate::{config::PublicEndpoint, domain::id::MixtapeId};

/// returns the shareable link to a mixtape's playback page, the one that
/// gets sent to the recipient
pub fn playback_url(conf: &PublicEndpoint, id: &MixtapeId) -> String {
    let url = &conf.base_url.trim_end_matches('/');
    format!("{url}/playback/{id}")
}
