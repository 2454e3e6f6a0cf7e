use crate::error::{Error, Result};
use tracing::debug;

const MAX_VIDEO_ID_LEN: usize = 128;

/// Pull the video id out of a ledger URL cell.
///
/// Accepts `...watch?v=<id>[&...]` and `youtu.be/<id>[?...]`. Anything else,
/// including a bare id, is rejected so that stray text in the URL column is
/// never sent to the caption source.
pub fn extract_video_id(url: &str) -> Option<String> {
    let raw_id = if let Some(v_param) = url.split("v=").nth(1) {
        v_param.split('&').next().unwrap_or(v_param)
    } else if let Some(youtu_be) = url.split("youtu.be/").nth(1) {
        youtu_be.split(['?', '&', '#']).next().unwrap_or(youtu_be)
    } else {
        return None;
    };

    validate_video_id(raw_id.split('#').next().unwrap_or(raw_id))
        .map_err(|e| debug!(%url, error = %e, "rejected video URL"))
        .ok()
}

/// Check the id cut out of a ledger URL before it reaches the caption API:
/// non-empty, at most 128 chars, ASCII letters, digits, `-` and `_` only.
fn validate_video_id(candidate: &str) -> Result<String> {
    let id = candidate.trim();

    if id.is_empty() {
        return Err(Error::custom("video URL carries an empty id"));
    }
    if id.len() > MAX_VIDEO_ID_LEN {
        return Err(Error::custom(format!(
            "video id in URL is {} chars, limit is {MAX_VIDEO_ID_LEN}",
            id.len()
        )));
    }
    if let Some(bad) = id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_')))
    {
        return Err(Error::custom(format!(
            "video id `{id}` in URL contains `{bad}`"
        )));
    }

    Ok(id.to_string())
}
