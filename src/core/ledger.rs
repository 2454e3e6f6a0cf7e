//! Spreadsheet ledger model: column layout, row parsing and status markers.

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Written to the status cell when a video has no caption tracks at all.
pub const NO_CAPTIONS_SENTINEL: &str = "NO_CAPTIONS";

const UNKNOWN_DATE: &str = "unknown-date";
const UNTITLED: &str = "untitled";

static SPREADSHEET_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/d/([A-Za-z0-9_-]+)").expect("spreadsheet id pattern"));
static FOLDER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/folders/([A-Za-z0-9_-]+)").expect("folder id pattern"));

/// Zero-based column positions inside the fetched range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub date: usize,
    pub title: usize,
    pub url: usize,
    pub status: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerLayout {
    pub sheet: Option<String>,
    /// Sheet row number of the first data row (the header offset).
    pub first_row: u32,
    pub last_row: u32,
    pub last_column: usize,
    pub columns: ColumnLayout,
}

impl LedgerLayout {
    pub fn validate(&self) -> Result<()> {
        if self.first_row == 0 {
            return Err(Error::config("ledger.first_row must be at least 1"));
        }
        if self.last_row < self.first_row {
            return Err(Error::config(format!(
                "ledger.last_row ({}) is before ledger.first_row ({})",
                self.last_row, self.first_row
            )));
        }
        let ColumnLayout {
            date,
            title,
            url,
            status,
        } = self.columns;
        if [date, title, url, status]
            .iter()
            .any(|&col| col > self.last_column)
        {
            return Err(Error::config(format!(
                "ledger columns must lie within A..{}",
                column_letter(self.last_column)
            )));
        }
        Ok(())
    }

    /// `[Sheet!]A2:G2000`
    pub fn read_range(&self) -> String {
        format!(
            "{}A{}:{}{}",
            self.sheet_prefix(),
            self.first_row,
            column_letter(self.last_column),
            self.last_row
        )
    }

    /// Cell address of the status marker for the `index`-th fetched row.
    pub fn status_cell(&self, index: usize) -> String {
        format!(
            "{}{}{}",
            self.sheet_prefix(),
            column_letter(self.columns.status),
            index as u64 + u64::from(self.first_row)
        )
    }

    fn sheet_prefix(&self) -> String {
        match &self.sheet {
            Some(sheet) if !sheet.chars().all(|c| c.is_alphanumeric() || c == '_') => {
                format!("'{}'!", sheet.replace('\'', "''"))
            }
            Some(sheet) => format!("{sheet}!"),
            None => String::new(),
        }
    }
}

impl Default for LedgerLayout {
    fn default() -> Self {
        Self {
            sheet: None,
            first_row: 2,
            last_row: 2000,
            last_column: 6,
            columns: ColumnLayout {
                date: 0,
                title: 1,
                url: 2,
                status: 5,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowStatus {
    Pending,
    Archived(String),
    NoCaptions,
}

impl RowStatus {
    pub fn from_cell(cell: &str) -> Self {
        match cell.trim() {
            "" => Self::Pending,
            NO_CAPTIONS_SENTINEL => Self::NoCaptions,
            file_id => Self::Archived(file_id.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRow {
    /// Position within the fetched range; sheet row is `index + first_row`.
    pub index: usize,
    pub date: String,
    pub title: String,
    pub url: String,
    pub status: RowStatus,
}

impl LedgerRow {
    /// Sparse rows (the API trims trailing empty cells) default at this boundary.
    pub fn parse(index: usize, cells: &[String], columns: &ColumnLayout) -> Self {
        let cell = |col: usize| cells.get(col).map(String::as_str);

        Self {
            index,
            date: cell(columns.date).unwrap_or(UNKNOWN_DATE).to_string(),
            title: cell(columns.title).unwrap_or(UNTITLED).to_string(),
            url: cell(columns.url).unwrap_or_default().trim().to_string(),
            status: RowStatus::from_cell(cell(columns.status).unwrap_or_default()),
        }
    }
}

/// `A` -> 0, `F` -> 5, `AA` -> 26.
pub fn column_index(letters: &str) -> Result<usize> {
    let letters = letters.trim();
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(Error::config(format!("invalid column `{letters}`")));
    }
    let number = letters
        .chars()
        .try_fold(0usize, |acc, c| {
            let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
            acc.checked_mul(26)?.checked_add(digit)
        })
        .ok_or_else(|| Error::config(format!("column `{letters}` is out of range")))?;
    Ok(number - 1)
}

pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Accepts a spreadsheet URL (`.../d/<id>/edit`) or a bare id.
pub fn parse_spreadsheet_id(reference: &str) -> Result<String> {
    parse_reference(reference, &SPREADSHEET_ID, "spreadsheet")
}

/// Accepts a folder URL (`.../folders/<id>`) or a bare id.
pub fn parse_folder_id(reference: &str) -> Result<String> {
    parse_reference(reference, &FOLDER_ID, "folder")
}

fn parse_reference(reference: &str, pattern: &Regex, what: &str) -> Result<String> {
    let reference = reference.trim();
    if let Some(caps) = pattern.captures(reference) {
        return Ok(caps[1].to_string());
    }
    let bare_id = !reference.is_empty()
        && reference
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
    if bare_id {
        Ok(reference.to_string())
    } else {
        Err(Error::config(format!(
            "cannot find a {what} id in `{reference}`"
        )))
    }
}
