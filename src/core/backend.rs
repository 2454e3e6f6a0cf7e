//! Contracts for the three remote collaborators the archiver talks to.

use crate::core::track::CaptionTrack;
use crate::error::Result;
use async_trait::async_trait;

pub const CAPTION_FORMAT: &str = "vtt";
pub const TEXT_MIME_TYPE: &str = "text/plain";

/// Spreadsheet-like row store.
#[async_trait]
pub trait Ledger {
    /// Rows of the range in sheet order; trailing empty cells may be missing.
    async fn read(&self, range: &str) -> Result<Vec<Vec<String>>>;

    async fn write(&self, cell: &str, value: &str) -> Result<()>;
}

#[async_trait]
pub trait CaptionSource {
    async fn list_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>>;

    async fn download_track(&self, track_id: &str, format: &str) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFile {
    pub name: String,
    pub parent_folder: String,
    pub mime_type: String,
    pub content: String,
}

#[async_trait]
pub trait FileStore {
    /// Returns the id the store assigned to the new file.
    async fn create_file(&self, file: &ArchiveFile) -> Result<String>;
}
