use crate::core::backend::CaptionSource;
use crate::core::track::{CaptionTrack, TrackKind};
use crate::error::{Error, Result};
use crate::google::api;
use crate::google::auth::AuthorizedSession;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const SERVICE: &str = "youtube";

/// Caption tracks through the YouTube Data API v3 `captions` resource.
pub struct YouTubeCaptions {
    client: Client,
    session: AuthorizedSession,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CaptionList {
    #[serde(default)]
    items: Vec<CaptionItem>,
}

#[derive(Debug, Deserialize)]
struct CaptionItem {
    id: String,
    snippet: CaptionSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionSnippet {
    #[serde(default)]
    language: String,
    #[serde(default)]
    track_kind: String,
}

impl From<CaptionItem> for CaptionTrack {
    fn from(item: CaptionItem) -> Self {
        let kind = if item.snippet.track_kind.eq_ignore_ascii_case("asr") {
            TrackKind::Automatic
        } else {
            TrackKind::Standard
        };
        CaptionTrack::new(item.id, item.snippet.language, kind)
    }
}

impl YouTubeCaptions {
    pub fn new(client: Client, session: AuthorizedSession, base_url: impl Into<String>) -> Self {
        Self {
            client,
            session,
            base_url: base_url.into(),
        }
    }

    fn captions_url(&self) -> String {
        format!("{}/youtube/v3/captions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CaptionSource for YouTubeCaptions {
    async fn list_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>> {
        debug!(%video_id, "youtube captions.list");
        let response = self
            .client
            .get(self.captions_url())
            .bearer_auth(self.session.bearer())
            .query(&[("part", "id,snippet"), ("videoId", video_id)])
            .send()
            .await?;
        let list: CaptionList = api::check(response, SERVICE).await?.json().await?;
        Ok(list.items.into_iter().map(CaptionTrack::from).collect())
    }

    async fn download_track(&self, track_id: &str, format: &str) -> Result<String> {
        debug!(%track_id, %format, "youtube captions.download");
        let response = self
            .client
            .get(format!("{}/{track_id}", self.captions_url()))
            .bearer_auth(self.session.bearer())
            .query(&[("tfmt", format)])
            .send()
            .await?;
        let bytes = api::check(response, SERVICE).await?.bytes().await?;
        String::from_utf8(bytes.to_vec()).map_err(|e| {
            Error::custom(format!("caption track {track_id} is not valid UTF-8: {e}"))
        })
    }
}
