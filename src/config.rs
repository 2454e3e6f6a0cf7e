use crate::core::ledger::{
    ColumnLayout, LedgerLayout, column_index, parse_folder_id, parse_spreadsheet_id,
};
use crate::error::{Error, Result};
use crate::google::api::{DEFAULT_DRIVE_URL, DEFAULT_SHEETS_URL, DEFAULT_YOUTUBE_URL};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "vidarchive.toml";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub spreadsheet_id: String,
    pub folder_id: String,
    pub run_limit: usize,
    pub language: String,
    pub layout: LedgerLayout,
    pub storage_token: PathBuf,
    pub captions_token: PathBuf,
    pub api: ApiEndpoints,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    pub sheets: String,
    pub drive: String,
    pub youtube: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AppConfigFile {
    spreadsheet: Option<String>,
    folder: Option<String>,
    run_limit: Option<usize>,
    language: Option<String>,
    #[serde(default)]
    ledger: LedgerSection,
    #[serde(default)]
    credentials: CredentialsSection,
    #[serde(default)]
    api: ApiSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LedgerSection {
    sheet: Option<String>,
    first_row: Option<u32>,
    last_row: Option<u32>,
    last_column: Option<String>,
    date_column: Option<String>,
    title_column: Option<String>,
    url_column: Option<String>,
    status_column: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CredentialsSection {
    storage_token: Option<String>,
    captions_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ApiSection {
    sheets_url: Option<String>,
    drive_url: Option<String>,
    youtube_url: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|s| {
        let s = s.trim().to_string();
        if s.is_empty() { None } else { Some(s) }
    })
}

fn column(value: Option<String>, default: &str) -> Result<usize> {
    column_index(non_empty(value).as_deref().unwrap_or(default))
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let file: AppConfigFile = toml::from_str(raw)?;
        Self::resolve(file)
    }

    fn resolve(file: AppConfigFile) -> Result<Self> {
        let spreadsheet = non_empty(file.spreadsheet)
            .ok_or_else(|| Error::config("`spreadsheet` is required"))?;
        let folder =
            non_empty(file.folder).ok_or_else(|| Error::config("`folder` is required"))?;

        let ledger = file.ledger;
        let layout = LedgerLayout {
            sheet: non_empty(ledger.sheet),
            first_row: ledger.first_row.unwrap_or(2),
            last_row: ledger.last_row.unwrap_or(2000),
            last_column: column(ledger.last_column, "G")?,
            columns: ColumnLayout {
                date: column(ledger.date_column, "A")?,
                title: column(ledger.title_column, "B")?,
                url: column(ledger.url_column, "C")?,
                status: column(ledger.status_column, "F")?,
            },
        };
        layout.validate()?;

        let language = match file.language {
            None => "ja".to_string(),
            Some(language) => non_empty(Some(language))
                .ok_or_else(|| Error::config("`language` must not be empty"))?,
        };

        let cfg = Self {
            spreadsheet_id: parse_spreadsheet_id(&spreadsheet)?,
            folder_id: parse_folder_id(&folder)?,
            run_limit: file.run_limit.unwrap_or(3),
            language,
            layout,
            storage_token: PathBuf::from(
                non_empty(file.credentials.storage_token)
                    .unwrap_or_else(|| "token_main.json".to_string()),
            ),
            captions_token: PathBuf::from(
                non_empty(file.credentials.captions_token)
                    .unwrap_or_else(|| "token_brand.json".to_string()),
            ),
            api: ApiEndpoints {
                sheets: non_empty(file.api.sheets_url)
                    .unwrap_or_else(|| DEFAULT_SHEETS_URL.to_string()),
                drive: non_empty(file.api.drive_url)
                    .unwrap_or_else(|| DEFAULT_DRIVE_URL.to_string()),
                youtube: non_empty(file.api.youtube_url)
                    .unwrap_or_else(|| DEFAULT_YOUTUBE_URL.to_string()),
            },
        };

        if cfg.run_limit == 0 {
            return Err(Error::config("`run_limit` must be a positive integer"));
        }

        Ok(cfg)
    }

    /// Apply a one-off `--limit` from the command line.
    pub fn with_run_limit(mut self, limit: Option<usize>) -> Result<Self> {
        match limit {
            Some(0) => Err(Error::config("--limit must be a positive integer")),
            Some(limit) => {
                self.run_limit = limit;
                Ok(self)
            }
            None => Ok(self),
        }
    }
}
