//! Ledger scan and per-row archival.
//!
//! Rows are handled strictly in sheet order, one at a time, because the row
//! index is the only key used to write the status marker back. A row is
//! picked up by a run if and only if its status cell is empty; once a file id
//! or the no-captions sentinel is written it is never touched again.

use crate::core::backend::{
    ArchiveFile, CAPTION_FORMAT, CaptionSource, FileStore, Ledger, TEXT_MIME_TYPE,
};
use crate::core::filename::archive_file_name;
use crate::core::ledger::{LedgerLayout, LedgerRow, NO_CAPTIONS_SENTINEL, RowStatus};
use crate::core::normalize::normalize_vtt;
use crate::core::track::select_track;
use crate::core::video::extract_video_id;
use crate::error::Result;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct ArchiveSettings {
    pub layout: LedgerLayout,
    pub folder_id: String,
    pub language: String,
    /// Rows allowed to enter the pipeline per run.
    pub run_limit: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StopReason {
    /// Every fetched row was looked at.
    #[default]
    Exhausted,
    LimitReached,
    QuotaExceeded,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub processed: usize,
    pub archived: usize,
    pub no_captions: usize,
    pub failed: usize,
    pub skipped_done: usize,
    pub skipped_no_url: usize,
    pub skipped_bad_url: usize,
    pub stop: StopReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Archived { file_id: String, file_name: String },
    NoCaptions,
}

/// Read-only view of the ledger for the `status` command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerSummary {
    pub pending: usize,
    pub archived: usize,
    pub no_captions: usize,
    pub no_url: usize,
    pub bad_url: usize,
    /// Rows the next run would send through the pipeline, in order.
    pub next_run: Vec<LedgerRow>,
}

enum Eligibility {
    NoUrl,
    BadUrl,
    Ready(String),
}

fn eligibility(row: &LedgerRow) -> Eligibility {
    if row.url.is_empty() {
        return Eligibility::NoUrl;
    }
    match extract_video_id(&row.url) {
        Some(video_id) => Eligibility::Ready(video_id),
        None => Eligibility::BadUrl,
    }
}

pub struct Archiver<C, F, L> {
    captions: C,
    files: F,
    ledger: L,
    settings: ArchiveSettings,
}

impl<C, F, L> Archiver<C, F, L>
where
    C: CaptionSource + Sync,
    F: FileStore + Sync,
    L: Ledger + Sync,
{
    pub fn new(captions: C, files: F, ledger: L, settings: ArchiveSettings) -> Self {
        Self {
            captions,
            files,
            ledger,
            settings,
        }
    }

    async fn fetch_rows(&self) -> Result<Vec<LedgerRow>> {
        let range = self.settings.layout.read_range();
        debug!(%range, "reading ledger");
        let cells = self.ledger.read(&range).await?;
        let columns = self.settings.layout.columns;
        Ok(cells
            .iter()
            .enumerate()
            .map(|(index, row)| LedgerRow::parse(index, row, &columns))
            .collect())
    }

    /// One archival run. Errors returned here happened before any row was
    /// touched (ledger read); per-row failures end up in the report.
    pub async fn run(&self) -> Result<RunReport> {
        let rows = self.fetch_rows().await?;
        let limit = self.settings.run_limit;
        let mut report = RunReport::default();

        info!("Scanning {} ledger rows (limit {limit} this run)", rows.len());

        for row in &rows {
            match &row.status {
                RowStatus::Pending => {}
                RowStatus::Archived(file_id) => {
                    debug!(row = self.sheet_row(row), %file_id, "already archived");
                    report.skipped_done += 1;
                    continue;
                }
                RowStatus::NoCaptions => {
                    report.skipped_done += 1;
                    continue;
                }
            }

            if report.processed >= limit {
                info!("Run limit of {limit} reached; remaining rows left for the next run");
                report.stop = StopReason::LimitReached;
                break;
            }

            let video_id = match eligibility(row) {
                Eligibility::NoUrl => {
                    report.skipped_no_url += 1;
                    continue;
                }
                Eligibility::BadUrl => {
                    warn!(
                        row = self.sheet_row(row),
                        url = %row.url,
                        "Skipping row: no video id in URL"
                    );
                    report.skipped_bad_url += 1;
                    continue;
                }
                Eligibility::Ready(video_id) => video_id,
            };

            report.processed += 1;
            info!(
                row = self.sheet_row(row),
                %video_id,
                "[{}/{limit}] Processing: {}",
                report.processed,
                row.title
            );

            match self.archive_row(row, &video_id).await {
                Ok(RowOutcome::Archived { file_id, file_name }) => {
                    report.archived += 1;
                    info!(%file_id, "Saved {file_name}");
                }
                Ok(RowOutcome::NoCaptions) => {
                    report.no_captions += 1;
                    info!("No captions available; marked as {NO_CAPTIONS_SENTINEL}");
                }
                Err(err) if err.is_quota_exceeded() => {
                    error!("{err}; stopping this run");
                    report.stop = StopReason::QuotaExceeded;
                    break;
                }
                Err(err) => {
                    report.failed += 1;
                    warn!(row = self.sheet_row(row), "Row left for retry: {err}");
                }
            }
        }

        Ok(report)
    }

    /// List tracks, pick one, download, normalize, upload, mark the row.
    pub async fn archive_row(&self, row: &LedgerRow, video_id: &str) -> Result<RowOutcome> {
        let cell = self.settings.layout.status_cell(row.index);

        let tracks = self.captions.list_tracks(video_id).await?;
        let Some(track) = select_track(&tracks, &self.settings.language) else {
            self.ledger.write(&cell, NO_CAPTIONS_SENTINEL).await?;
            return Ok(RowOutcome::NoCaptions);
        };
        debug!(
            track_id = %track.id,
            language = %track.language,
            kind = ?track.kind,
            "selected caption track"
        );

        let raw = self
            .captions
            .download_track(&track.id, CAPTION_FORMAT)
            .await?;
        let content = normalize_vtt(&raw);

        let file = ArchiveFile {
            name: archive_file_name(&row.date, &row.title),
            parent_folder: self.settings.folder_id.clone(),
            mime_type: TEXT_MIME_TYPE.to_string(),
            content,
        };
        let file_id = self.files.create_file(&file).await?;

        if let Err(err) = self.ledger.write(&cell, &file_id).await {
            // The upload exists but the ledger does not know it; the next run
            // will upload again.
            error!(%file_id, %cell, "Uploaded {} but could not record it", file.name);
            return Err(err);
        }

        Ok(RowOutcome::Archived {
            file_id,
            file_name: file.name,
        })
    }

    /// Classify every row without writing anything.
    pub async fn plan(&self) -> Result<LedgerSummary> {
        let rows = self.fetch_rows().await?;
        let mut summary = LedgerSummary::default();

        for row in rows {
            match &row.status {
                RowStatus::Archived(_) => summary.archived += 1,
                RowStatus::NoCaptions => summary.no_captions += 1,
                RowStatus::Pending => match eligibility(&row) {
                    Eligibility::NoUrl => summary.no_url += 1,
                    Eligibility::BadUrl => summary.bad_url += 1,
                    Eligibility::Ready(_) => {
                        summary.pending += 1;
                        if summary.next_run.len() < self.settings.run_limit {
                            summary.next_run.push(row);
                        }
                    }
                },
            }
        }

        Ok(summary)
    }

    pub fn sheet_row(&self, row: &LedgerRow) -> u64 {
        row.index as u64 + u64::from(self.settings.layout.first_row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::track::{CaptionTrack, TrackKind};
    use crate::error::Error;
    use async_trait::async_trait;
    use std::collections::{BTreeMap, HashMap, HashSet};
    use std::sync::Mutex;

    const VTT: &str = "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nhello\nhello\n";

    #[derive(Default)]
    struct FakeLedger {
        rows: Vec<Vec<String>>,
        writes: Mutex<BTreeMap<String, String>>,
        fail_writes: bool,
    }

    impl FakeLedger {
        fn with_rows(rows: Vec<Vec<&str>>) -> Self {
            Self {
                rows: rows
                    .iter()
                    .map(|r| r.iter().map(|c| c.to_string()).collect())
                    .collect(),
                ..Self::default()
            }
        }

        fn writes(&self) -> BTreeMap<String, String> {
            self.writes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Ledger for FakeLedger {
        async fn read(&self, range: &str) -> Result<Vec<Vec<String>>> {
            assert_eq!(range, "A2:G2000");
            Ok(self.rows.clone())
        }

        async fn write(&self, cell: &str, value: &str) -> Result<()> {
            if self.fail_writes {
                return Err(Error::custom("sheets unavailable"));
            }
            let previous = self
                .writes
                .lock()
                .unwrap()
                .insert(cell.to_string(), value.to_string());
            assert!(previous.is_none(), "cell {cell} written twice");
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeCaptions {
        tracks: HashMap<String, Vec<CaptionTrack>>,
        failing: HashSet<String>,
        quota_on: HashSet<String>,
        listed: Mutex<Vec<String>>,
        downloaded: Mutex<Vec<String>>,
    }

    impl FakeCaptions {
        fn with_track(mut self, video_id: &str, track: CaptionTrack) -> Self {
            self.tracks.entry(video_id.to_string()).or_default().push(track);
            self
        }

        fn listed(&self) -> Vec<String> {
            self.listed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CaptionSource for FakeCaptions {
        async fn list_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>> {
            self.listed.lock().unwrap().push(video_id.to_string());
            if self.quota_on.contains(video_id) {
                return Err(Error::QuotaExceeded {
                    service: "youtube",
                    message: "quotaExceeded".into(),
                });
            }
            if self.failing.contains(video_id) {
                return Err(Error::Api {
                    service: "youtube",
                    status: 500,
                    message: "backendError".into(),
                });
            }
            Ok(self.tracks.get(video_id).cloned().unwrap_or_default())
        }

        async fn download_track(&self, track_id: &str, format: &str) -> Result<String> {
            assert_eq!(format, "vtt");
            self.downloaded.lock().unwrap().push(track_id.to_string());
            Ok(VTT.to_string())
        }
    }

    #[derive(Default)]
    struct FakeFiles {
        created: Mutex<Vec<ArchiveFile>>,
    }

    impl FakeFiles {
        fn created(&self) -> Vec<ArchiveFile> {
            self.created.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FileStore for FakeFiles {
        async fn create_file(&self, file: &ArchiveFile) -> Result<String> {
            let mut created = self.created.lock().unwrap();
            created.push(file.clone());
            Ok(format!("file-{}", created.len()))
        }
    }

    fn settings(run_limit: usize) -> ArchiveSettings {
        ArchiveSettings {
            layout: LedgerLayout::default(),
            folder_id: "folder-1".into(),
            language: "ja".into(),
            run_limit,
        }
    }

    fn url(id: &str) -> String {
        format!("https://www.youtube.com/watch?v={id}")
    }

    fn ja(id: &str, kind: TrackKind) -> CaptionTrack {
        CaptionTrack::new(id, "ja", kind)
    }

    #[tokio::test]
    async fn archives_standard_track_and_records_file_id() {
        let link = url("XYZ123");
        let ledger =
            FakeLedger::with_rows(vec![vec!["2024-01-01", "My Talk", link.as_str(), "", "", ""]]);
        let captions = FakeCaptions::default()
            .with_track("XYZ123", ja("asr-1", TrackKind::Automatic))
            .with_track("XYZ123", ja("std-1", TrackKind::Standard));
        let files = FakeFiles::default();

        let archiver = Archiver::new(captions, files, ledger, settings(3));
        let report = archiver.run().await.unwrap();

        assert_eq!(report.archived, 1);
        assert_eq!(report.stop, StopReason::Exhausted);
        assert_eq!(*archiver.captions.downloaded.lock().unwrap(), vec!["std-1"]);

        let created = archiver.files.created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].name, "2024-01-01_My Talk.txt");
        assert_eq!(created[0].parent_folder, "folder-1");
        assert_eq!(created[0].mime_type, "text/plain");
        assert_eq!(created[0].content, "0:00:01.000,0:00:02.000\nhello");

        assert_eq!(archiver.ledger.writes().get("F2").map(String::as_str), Some("file-1"));
    }

    #[tokio::test]
    async fn empty_caption_list_writes_sentinel_without_upload() {
        let link = url("XYZ123");
        let ledger = FakeLedger::with_rows(vec![vec!["2024-01-01", "My Talk", link.as_str()]]);
        let captions = FakeCaptions::default();
        let files = FakeFiles::default();

        let archiver = Archiver::new(captions, files, ledger, settings(3));
        let report = archiver.run().await.unwrap();

        assert_eq!(report.no_captions, 1);
        assert!(archiver.files.created().is_empty());
        assert_eq!(
            archiver.ledger.writes().get("F2").map(String::as_str),
            Some(NO_CAPTIONS_SENTINEL)
        );
    }

    #[tokio::test]
    async fn bad_and_missing_urls_do_not_count_against_limit() {
        let (a, b) = (url("AAA"), url("BBB"));
        let ledger = FakeLedger::with_rows(vec![
            vec!["d", "no url"],
            vec!["d", "bad", "bad-url-no-v-param"],
            vec!["d", "a", a.as_str()],
            vec!["d", "b", b.as_str()],
        ]);
        let captions = FakeCaptions::default()
            .with_track("AAA", ja("a", TrackKind::Standard))
            .with_track("BBB", ja("b", TrackKind::Standard));
        let files = FakeFiles::default();

        let archiver = Archiver::new(captions, files, ledger, settings(2));
        let report = archiver.run().await.unwrap();

        assert_eq!(report.processed, 2);
        assert_eq!(report.skipped_no_url, 1);
        assert_eq!(report.skipped_bad_url, 1);
        let writes = archiver.ledger.writes();
        assert!(!writes.contains_key("F2"));
        assert!(!writes.contains_key("F3"));
        assert_eq!(writes.len(), 2);
    }

    #[tokio::test]
    async fn limit_stops_the_scan_and_leaves_the_rest_untouched() {
        let links: Vec<String> = (0..5).map(|i| url(&format!("VID{i}"))).collect();
        let rows: Vec<Vec<&str>> = links.iter().map(|l| vec!["d", "t", l.as_str()]).collect();
        let ledger = FakeLedger::with_rows(rows);
        let mut captions = FakeCaptions::default();
        for i in 0..5 {
            let track = ja(&format!("t{i}"), TrackKind::Standard);
            captions = captions.with_track(&format!("VID{i}"), track);
        }
        let files = FakeFiles::default();

        let archiver = Archiver::new(captions, files, ledger, settings(3));
        let report = archiver.run().await.unwrap();

        assert_eq!(report.processed, 3);
        assert_eq!(report.stop, StopReason::LimitReached);
        assert_eq!(archiver.captions.listed(), vec!["VID0", "VID1", "VID2"]);
        let writes = archiver.ledger.writes();
        assert_eq!(writes.keys().collect::<Vec<_>>(), vec!["F2", "F3", "F4"]);
    }

    #[tokio::test]
    async fn completed_rows_are_skipped_without_counting() {
        let (a, b) = (url("AAA"), url("BBB"));
        let ledger = FakeLedger::with_rows(vec![
            vec!["d", "done", a.as_str(), "", "", "file-old"],
            vec!["d", "none", a.as_str(), "", "", NO_CAPTIONS_SENTINEL],
            vec!["d", "b", b.as_str()],
        ]);
        let captions = FakeCaptions::default().with_track("BBB", ja("b", TrackKind::Standard));
        let files = FakeFiles::default();

        let archiver = Archiver::new(captions, files, ledger, settings(1));
        let report = archiver.run().await.unwrap();

        assert_eq!(report.skipped_done, 2);
        assert_eq!(report.archived, 1);
        assert_eq!(archiver.captions.listed(), vec!["BBB"]);
        assert_eq!(archiver.ledger.writes().keys().collect::<Vec<_>>(), vec!["F4"]);
    }

    #[tokio::test]
    async fn transient_failure_leaves_row_for_retry_and_counts() {
        let (a, b) = (url("AAA"), url("BBB"));
        let ledger = FakeLedger::with_rows(vec![
            vec!["d", "a", a.as_str()],
            vec!["d", "b", b.as_str()],
        ]);
        let mut captions = FakeCaptions::default().with_track("BBB", ja("b", TrackKind::Standard));
        captions.failing.insert("AAA".into());
        let files = FakeFiles::default();

        let archiver = Archiver::new(captions, files, ledger, settings(2));
        let report = archiver.run().await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.archived, 1);
        assert_eq!(report.processed, 2);
        let writes = archiver.ledger.writes();
        assert!(!writes.contains_key("F2"));
        assert!(writes.contains_key("F3"));
    }

    #[tokio::test]
    async fn quota_exhaustion_aborts_the_run() {
        let links: Vec<String> = ["AAA", "BBB", "CCC"].iter().map(|id| url(id)).collect();
        let ledger = FakeLedger::with_rows(vec![
            vec!["d", "a", links[0].as_str()],
            vec!["d", "b", links[1].as_str()],
            vec!["d", "c", links[2].as_str()],
        ]);
        let mut captions = FakeCaptions::default()
            .with_track("AAA", ja("a", TrackKind::Standard))
            .with_track("CCC", ja("c", TrackKind::Standard));
        captions.quota_on.insert("BBB".into());
        let files = FakeFiles::default();

        let archiver = Archiver::new(captions, files, ledger, settings(10));
        let report = archiver.run().await.unwrap();

        assert_eq!(report.stop, StopReason::QuotaExceeded);
        assert_eq!(report.archived, 1);
        assert_eq!(archiver.captions.listed(), vec!["AAA", "BBB"]);
        assert_eq!(archiver.ledger.writes().keys().collect::<Vec<_>>(), vec!["F2"]);
    }

    #[tokio::test]
    async fn failed_ledger_write_is_a_row_failure() {
        let link = url("AAA");
        let mut ledger = FakeLedger::with_rows(vec![vec!["d", "a", link.as_str()]]);
        ledger.fail_writes = true;
        let captions = FakeCaptions::default().with_track("AAA", ja("a", TrackKind::Standard));
        let files = FakeFiles::default();

        let archiver = Archiver::new(captions, files, ledger, settings(3));
        let report = archiver.run().await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.archived, 0);
        assert_eq!(archiver.files.created().len(), 1);
    }

    #[tokio::test]
    async fn plan_counts_rows_and_previews_next_run() {
        let (a, b, c) = (url("AAA"), url("BBB"), url("CCC"));
        let ledger = FakeLedger::with_rows(vec![
            vec!["d", "done", a.as_str(), "", "", "file-old"],
            vec!["d", "none", a.as_str(), "", "", NO_CAPTIONS_SENTINEL],
            vec!["d", "no url"],
            vec!["d", "bad", "bad-url-no-v-param"],
            vec!["d", "b", b.as_str()],
            vec!["d", "c", c.as_str()],
        ]);
        let captions = FakeCaptions::default();
        let files = FakeFiles::default();

        let archiver = Archiver::new(captions, files, ledger, settings(1));
        let summary = archiver.plan().await.unwrap();

        assert_eq!(summary.archived, 1);
        assert_eq!(summary.no_captions, 1);
        assert_eq!(summary.no_url, 1);
        assert_eq!(summary.bad_url, 1);
        assert_eq!(summary.pending, 2);
        assert_eq!(summary.next_run.len(), 1);
        assert_eq!(summary.next_run[0].title, "b");
        assert!(archiver.ledger.writes().is_empty());
        assert!(archiver.captions.listed().is_empty());
    }
}
