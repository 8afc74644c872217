//! Access to the spreadsheet holding the records.
//!
//! `TabularStore` is the seam between the sync controller and the outside
//! world. `SheetsClient` talks to the Google Sheets v4 REST API,
//! `InMemoryStore` keeps a table in memory for tests and `--demo`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

pub const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("failed to fetch data: {0}")]
    Fetch(String),
    #[error("failed to delete row: {0}")]
    Delete(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Body of a range read. `values` is absent when the range is empty.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ValueRange {
    #[serde(default, deserialize_with = "deserialize_cells")]
    pub values: Option<Vec<Vec<String>>>,
}

#[async_trait]
pub trait TabularStore: Send + Sync {
    async fn fetch_range(&self, store_id: &str, range: &str) -> Result<ValueRange, StoreError>;

    /// Delete the 0-based, half-open row range `[start, end)`.
    async fn delete_rows(&self, store_id: &str, start: usize, end: usize) -> Result<(), StoreError>;
}

// Sheets returns numbers and booleans unquoted when asked for unformatted
// values; render every cell as text.
fn deserialize_cells<'de, D>(deserializer: D) -> Result<Option<Vec<Vec<String>>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<Vec<Vec<Value>>> = Option::deserialize(deserializer)?;
    Ok(raw.map(|rows| {
        rows.into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| match cell {
                        Value::String(s) => s,
                        Value::Null => String::new(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .collect()
    }))
}

#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub base_url: String,
    pub api_key: String,
    /// Bearer token for writes. The API key is sent instead when unset.
    pub access_token: Option<String>,
    /// Numeric id of the tab rows are deleted from.
    pub sheet_id: u32,
}

#[derive(Clone)]
pub struct SheetsClient {
    http: Client,
    config: SheetsConfig,
}

impl SheetsClient {
    pub fn new(config: SheetsConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    fn values_url(&self, store_id: &str, range: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.config.base_url.trim_end_matches('/'),
            store_id,
            range
        )
    }

    fn batch_update_url(&self, store_id: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}:batchUpdate",
            self.config.base_url.trim_end_matches('/'),
            store_id
        )
    }

    fn delete_body(&self, start: usize, end: usize) -> Value {
        json!({
            "requests": [{
                "deleteDimension": {
                    "range": {
                        "sheetId": self.config.sheet_id,
                        "dimension": "ROWS",
                        "startIndex": start,
                        "endIndex": end,
                    }
                }
            }]
        })
    }

    fn bearer(&self) -> &str {
        self.config
            .access_token
            .as_deref()
            .unwrap_or(&self.config.api_key)
    }
}

#[async_trait]
impl TabularStore for SheetsClient {
    #[instrument(skip(self))]
    async fn fetch_range(&self, store_id: &str, range: &str) -> Result<ValueRange, StoreError> {
        let res = self
            .http
            .get(self.values_url(store_id, range))
            .query(&[("key", self.config.api_key.as_str())])
            .send()
            .await
            .map_err(|e| StoreError::Fetch(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            debug!("Fetch rejected: {status} {body}");
            return Err(StoreError::Fetch(format!("status {status}")));
        }
        res.json::<ValueRange>()
            .await
            .map_err(|e| StoreError::Fetch(e.to_string()))
    }

    #[instrument(skip(self))]
    async fn delete_rows(
        &self,
        store_id: &str,
        start: usize,
        end: usize,
    ) -> Result<(), StoreError> {
        let res = self
            .http
            .post(self.batch_update_url(store_id))
            .bearer_auth(self.bearer())
            .json(&self.delete_body(start, end))
            .send()
            .await
            .map_err(|e| StoreError::Delete(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            debug!("Delete rejected: {status} {body}");
            return Err(StoreError::Delete(format!("status {status}")));
        }
        Ok(())
    }
}

/// Table kept in memory. Row 0 is the sheet's first row.
#[derive(Default)]
pub struct InMemoryStore {
    values: Mutex<Option<Vec<Vec<String>>>>,
    fail_fetch: Mutex<Option<String>>,
    fail_delete: Mutex<Option<String>>,
}

impl InMemoryStore {
    pub fn new(values: Vec<Vec<String>>) -> Self {
        Self {
            values: Mutex::new(Some(values)),
            ..Self::default()
        }
    }

    /// A small job board to browse without network access.
    pub fn demo() -> Self {
        let rows: [[&str; 10]; 4] = [
            [
                "currentDate", "title", "company_name", "location", "type", "experience",
                "salary", "description", "skills", "company_website",
            ],
            [
                "2024-01-05", "Backend Engineer", "Ferrous Systems", "Berlin", "Full-time", "3",
                "€70k - €85k", "Build and run the services behind our embedded toolchain.",
                r#"["rust","postgres","kubernetes"]"#, "https://example.com/jobs/backend",
            ],
            [
                "2024-02-11", "Data Engineer", "Tabular Ltd", "Remote", "Contract", "5", "",
                "Own the ingestion pipelines feeding our analytics warehouse.",
                r#"["python","sql","airflow"]"#, "https://example.com/jobs/data",
            ],
            [
                "2024-03-02", "Embedded Developer", "Blinky GmbH", "Vienna", "Full-time", "2",
                "€55k", "Firmware for battery powered sensors.", r#"["c","rust","rtos"]"#, "",
            ],
        ];
        Self::new(
            rows.iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[cfg(test)]
    pub async fn set_values(&self, values: Option<Vec<Vec<String>>>) {
        *self.values.lock().await = values;
    }

    #[cfg(test)]
    pub async fn values(&self) -> Option<Vec<Vec<String>>> {
        self.values.lock().await.clone()
    }

    #[cfg(test)]
    pub async fn fail_fetch_with(&self, message: Option<&str>) {
        *self.fail_fetch.lock().await = message.map(str::to_string);
    }

    #[cfg(test)]
    pub async fn fail_delete_with(&self, message: Option<&str>) {
        *self.fail_delete.lock().await = message.map(str::to_string);
    }
}

#[async_trait]
impl TabularStore for InMemoryStore {
    async fn fetch_range(&self, _store_id: &str, _range: &str) -> Result<ValueRange, StoreError> {
        if let Some(message) = self.fail_fetch.lock().await.clone() {
            return Err(StoreError::Fetch(message));
        }
        Ok(ValueRange {
            values: self.values.lock().await.clone(),
        })
    }

    async fn delete_rows(
        &self,
        _store_id: &str,
        start: usize,
        end: usize,
    ) -> Result<(), StoreError> {
        if let Some(message) = self.fail_delete.lock().await.clone() {
            return Err(StoreError::Delete(message));
        }
        let mut guard = self.values.lock().await;
        let rows = guard
            .as_mut()
            .ok_or_else(|| StoreError::Delete("sheet is empty".into()))?;
        if start >= end || end > rows.len() {
            return Err(StoreError::Delete(format!(
                "rows {start}..{end} out of range for {} rows",
                rows.len()
            )));
        }
        rows.drain(start..end);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(access_token: Option<&str>) -> SheetsClient {
        SheetsClient::new(SheetsConfig {
            base_url: "https://sheets.example.com/".into(),
            api_key: "key-123".into(),
            access_token: access_token.map(str::to_string),
            sheet_id: 7,
        })
    }

    fn table(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn builds_sheet_urls() {
        let c = client(None);
        assert_eq!(
            c.values_url("abc", "Sheet1!A1:Z"),
            "https://sheets.example.com/v4/spreadsheets/abc/values/Sheet1!A1:Z"
        );
        assert_eq!(
            c.batch_update_url("abc"),
            "https://sheets.example.com/v4/spreadsheets/abc:batchUpdate"
        );
    }

    #[test]
    fn delete_body_targets_configured_sheet() {
        let body = client(None).delete_body(3, 4);
        let range = &body["requests"][0]["deleteDimension"]["range"];
        assert_eq!(range["sheetId"], 7);
        assert_eq!(range["dimension"], "ROWS");
        assert_eq!(range["startIndex"], 3);
        assert_eq!(range["endIndex"], 4);
    }

    #[test]
    fn bearer_prefers_access_token() {
        assert_eq!(client(None).bearer(), "key-123");
        assert_eq!(client(Some("tok")).bearer(), "tok");
    }

    #[test]
    fn value_range_parses_mixed_cells() {
        let body = r#"{"range":"Sheet1!A1:C3","majorDimension":"ROWS",
            "values":[["title","experience"],["Dev",3],["Ops",null,true]]}"#;
        let parsed: ValueRange = serde_json::from_str(body).unwrap();
        assert_eq!(
            parsed.values,
            Some(table(&[&["title", "experience"], &["Dev", "3"], &["Ops", "", "true"]]))
        );
    }

    #[test]
    fn value_range_without_values() {
        let parsed: ValueRange = serde_json::from_str(r#"{"range":"Sheet1"}"#).unwrap();
        assert_eq!(parsed.values, None);
    }

    #[tokio::test]
    async fn in_memory_fetch_and_delete() {
        let store = InMemoryStore::new(table(&[&["title"], &["A"], &["B"], &["C"]]));
        store.delete_rows("id", 2, 3).await.unwrap();
        let fetched = store.fetch_range("id", "Sheet1").await.unwrap();
        assert_eq!(fetched.values, Some(table(&[&["title"], &["A"], &["C"]])));
    }

    #[tokio::test]
    async fn in_memory_rejects_out_of_range_delete() {
        let store = InMemoryStore::new(table(&[&["title"], &["A"]]));
        let err = store.delete_rows("id", 2, 3).await.unwrap_err();
        assert!(matches!(err, StoreError::Delete(_)));
        assert_eq!(store.values().await.map(|v| v.len()), Some(2));
    }

    #[tokio::test]
    async fn in_memory_failure_injection() {
        let store = InMemoryStore::demo();
        store.fail_fetch_with(Some("offline")).await;
        assert_eq!(
            store.fetch_range("id", "Sheet1").await,
            Err(StoreError::Fetch("offline".into()))
        );
        store.fail_delete_with(Some("forbidden")).await;
        let err = store.delete_rows("id", 1, 2).await.unwrap_err();
        assert_eq!(err.to_string(), "failed to delete row: forbidden");
        assert_eq!(store.values().await.map(|v| v.len()), Some(4));
    }
}
