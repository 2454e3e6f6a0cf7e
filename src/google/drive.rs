use crate::core::backend::{ArchiveFile, FileStore};
use crate::error::{Error, Result};
use crate::google::api;
use crate::google::auth::AuthorizedSession;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

const SERVICE: &str = "drive";
const BOUNDARY_PREFIX: &str = "vidarchive-part";

static UPLOADS: AtomicU64 = AtomicU64::new(0);

/// Drive v3 file store; every archive is a single multipart upload.
pub struct DriveStore {
    client: Client,
    session: AuthorizedSession,
    upload_url: String,
}

#[derive(Debug, Serialize)]
struct FileMetadata<'a> {
    name: &'a str,
    parents: [&'a str; 1],
    #[serde(rename = "mimeType")]
    mime_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: Option<String>,
}

impl DriveStore {
    pub fn new(client: Client, session: AuthorizedSession, upload_url: impl Into<String>) -> Self {
        Self {
            client,
            session,
            upload_url: upload_url.into(),
        }
    }
}

fn fresh_boundary() -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let seq = UPLOADS.fetch_add(1, Ordering::Relaxed);
    format!("{BOUNDARY_PREFIX}-{nanos:x}-{seq}")
}

/// First candidate from `next` that does not occur anywhere in `content`.
fn pick_boundary(content: &str, mut next: impl FnMut() -> String) -> String {
    loop {
        let boundary = next();
        if !content.contains(&boundary) {
            return boundary;
        }
    }
}

/// `multipart/related` body: JSON metadata part followed by the media part.
fn multipart_body(file: &ArchiveFile, boundary: &str) -> Result<Vec<u8>> {
    let metadata = serde_json::to_string(&FileMetadata {
        name: &file.name,
        parents: [&file.parent_folder],
        mime_type: &file.mime_type,
    })?;

    let mut body = Vec::with_capacity(metadata.len() + file.content.len() + 256);
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Type: {}; charset=UTF-8\r\n\r\n",
            file.mime_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(file.content.as_bytes());
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    Ok(body)
}

#[async_trait]
impl FileStore for DriveStore {
    async fn create_file(&self, file: &ArchiveFile) -> Result<String> {
        debug!(name = %file.name, folder = %file.parent_folder, "drive files.create");
        let url = format!(
            "{}/upload/drive/v3/files",
            self.upload_url.trim_end_matches('/')
        );
        let boundary = pick_boundary(&file.content, fresh_boundary);
        let response = self
            .client
            .post(url)
            .bearer_auth(self.session.bearer())
            .query(&[
                ("uploadType", "multipart"),
                ("fields", "id"),
                ("supportsAllDrives", "true"),
            ])
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(multipart_body(file, &boundary)?)
            .send()
            .await?;

        let created: CreatedFile = api::check(response, SERVICE).await?.json().await?;
        created
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::custom("drive returned no file id"))
    }
}
