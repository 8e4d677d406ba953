//! Identifier and URL normalization.
//!
//! Every identifier must pass through here before it is used as a merge key,
//! otherwise `abc&t=10` and `abc` would archive as two different videos.

use super::item::RecordError;

/// URL stem for a single video
pub const VIDEO_URL_STEM: &str = "https://www.youtube.com/watch?v=";

/// URL stem for a playlist
pub const PLAYLIST_URL_STEM: &str = "https://www.youtube.com/playlist?list=";

/// A bare identifier together with its canonical URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedIdentifier {
    pub id: String,
    pub url: String,
}

/// Split an id or URL into `(id, canonical url)` for the given stem.
///
/// Trailing `&`-delimited query parameters are dropped and the stem is
/// stripped if present.
pub fn parse_identifier(id_or_url: &str, stem: &str) -> Result<ParsedIdentifier, RecordError> {
    let head = id_or_url.split('&').next().unwrap_or_default();
    let id = head.replace(stem, "");
    let id = id.trim();

    if id.is_empty() {
        return Err(RecordError::MalformedRecord {
            reason: format!("no identifier in '{}'", id_or_url),
        });
    }

    Ok(ParsedIdentifier {
        id: id.to_string(),
        url: format!("{}{}", stem, id),
    })
}

/// Canonical URL for an already-bare video id
pub fn video_url(id: &str) -> String {
    format!("{}{}", VIDEO_URL_STEM, id)
}
