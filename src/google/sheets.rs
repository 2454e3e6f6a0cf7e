use crate::core::backend::Ledger;
use crate::error::{Error, Result};
use crate::google::api;
use crate::google::auth::AuthorizedSession;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

const SERVICE: &str = "sheets";

/// Spreadsheet ledger over the Sheets v4 values API.
pub struct SheetsLedger {
    client: Client,
    session: AuthorizedSession,
    base_url: String,
    spreadsheet_id: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Serialize)]
struct ValueUpdate<'a> {
    range: &'a str,
    #[serde(rename = "majorDimension")]
    major_dimension: &'a str,
    values: [[&'a str; 1]; 1],
}

impl SheetsLedger {
    pub fn new(
        client: Client,
        session: AuthorizedSession,
        base_url: impl Into<String>,
        spreadsheet_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            session,
            base_url: base_url.into(),
            spreadsheet_id: spreadsheet_id.into(),
        }
    }

    /// The A1 range is one percent-encoded path segment, so sheet names
    /// with `#`, `/`, `?` or `%` stay inside it.
    fn values_url(&self, range: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| Error::config(format!("invalid sheets url `{}`: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| Error::config(format!("sheets url `{}` cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str(), "values", range]);
        Ok(url)
    }
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl Ledger for SheetsLedger {
    async fn read(&self, range: &str) -> Result<Vec<Vec<String>>> {
        debug!(%range, "sheets values.get");
        let response = self
            .client
            .get(self.values_url(range)?)
            .bearer_auth(self.session.bearer())
            .query(&[("majorDimension", "ROWS")])
            .send()
            .await?;
        let body: ValueRange = api::check(response, SERVICE).await?.json().await?;

        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    async fn write(&self, cell: &str, value: &str) -> Result<()> {
        debug!(%cell, "sheets values.update");
        let update = ValueUpdate {
            range: cell,
            major_dimension: "ROWS",
            values: [[value]],
        };
        let response = self
            .client
            .put(self.values_url(cell)?)
            .bearer_auth(self.session.bearer())
            .query(&[("valueInputOption", "RAW")])
            .json(&update)
            .send()
            .await?;
        api::check(response, SERVICE).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ledger(server: &MockServer) -> SheetsLedger {
        SheetsLedger::new(
            Client::new(),
            AuthorizedSession::new("storage", "tok"),
            server.uri(),
            "sheet-1",
        )
    }

    #[tokio::test]
    async fn reads_sparse_rows_as_strings() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/sheet-1/values/A2:G2000"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "range": "Sheet1!A2:G2000",
                "majorDimension": "ROWS",
                "values": [
                    ["2024-01-01", "My Talk", "https://youtu.be/abc"],
                    ["2024-01-02", "Other", "", "", "", "file-9"],
                    [],
                    ["2024-01-03", 42]
                ]
            })))
            .mount(&server)
            .await;

        let rows = ledger(&server).read("A2:G2000").await.unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], vec!["2024-01-01", "My Talk", "https://youtu.be/abc"]);
        assert_eq!(rows[1][5], "file-9");
        assert!(rows[2].is_empty());
        assert_eq!(rows[3][1], "42");
    }

    #[tokio::test]
    async fn empty_sheet_has_no_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "range": "Sheet1!A2:G2000",
                "majorDimension": "ROWS"
            })))
            .mount(&server)
            .await;

        assert!(ledger(&server).read("A2:G2000").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn writes_single_cell_raw() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v4/spreadsheets/sheet-1/values/F7"))
            .and(query_param("valueInputOption", "RAW"))
            .and(body_json(serde_json::json!({
                "range": "F7",
                "majorDimension": "ROWS",
                "values": [["file-1"]]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "updatedCells": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        ledger(&server).write("F7", "file-1").await.unwrap();
    }

    #[tokio::test]
    async fn special_sheet_names_stay_in_one_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/spreadsheets/sheet-1/values/'%231%20Videos'!A2:G2000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "values": [["2024-01-01", "Talk"]]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/v4/spreadsheets/sheet-1/values/'Q1%2FQ2'!F3"))
            .and(body_json(serde_json::json!({
                "range": "'Q1/Q2'!F3",
                "majorDimension": "ROWS",
                "values": [["file-2"]]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "updatedCells": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let ledger = ledger(&server);
        let rows = ledger.read("'#1 Videos'!A2:G2000").await.unwrap();
        assert_eq!(rows, vec![vec!["2024-01-01", "Talk"]]);
        ledger.write("'Q1/Q2'!F3", "file-2").await.unwrap();
    }

    #[test]
    fn base_url_path_is_kept() {
        let ledger = SheetsLedger::new(
            Client::new(),
            AuthorizedSession::new("storage", "tok"),
            "http://localhost:9000/sheets/",
            "abc",
        );
        assert_eq!(
            ledger.values_url("A2:G2000").unwrap().as_str(),
            "http://localhost:9000/sheets/v4/spreadsheets/abc/values/A2:G2000"
        );
    }

    #[tokio::test]
    async fn quota_on_write_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": {
                    "code": 403,
                    "message": "Quota exceeded for quota metric 'Write requests per day'",
                    "errors": [{ "reason": "quotaExceeded" }]
                }
            })))
            .mount(&server)
            .await;

        let err = ledger(&server).write("F2", "x").await.unwrap_err();
        assert!(err.is_quota_exceeded());
    }

    #[tokio::test]
    async fn throttled_write_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {
                    "code": 429,
                    "message": "Quota exceeded for quota metric 'Write requests' per minute",
                    "errors": [{ "reason": "rateLimitExceeded" }]
                }
            })))
            .mount(&server)
            .await;

        let err = ledger(&server).write("F2", "x").await.unwrap_err();
        assert!(!err.is_quota_exceeded());
    }
}
