use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackKind {
    /// Human-authored captions.
    Standard,
    /// Speech-recognition captions.
    Automatic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionTrack {
    pub id: String,
    pub language: String,
    pub kind: TrackKind,
}

impl CaptionTrack {
    pub fn new(id: impl Into<String>, language: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            id: id.into(),
            language: language.into(),
            kind,
        }
    }
}

/// Pick one track: target-language standard, then target-language automatic,
/// then whatever the source listed first. `None` only for an empty list.
pub fn select_track<'a>(tracks: &'a [CaptionTrack], language: &str) -> Option<&'a CaptionTrack> {
    let in_language = |kind: TrackKind| {
        tracks
            .iter()
            .find(|t| t.kind == kind && t.language.eq_ignore_ascii_case(language))
    };

    in_language(TrackKind::Standard)
        .or_else(|| in_language(TrackKind::Automatic))
        .or_else(|| tracks.first())
}
