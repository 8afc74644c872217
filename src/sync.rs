use std::fmt;
use std::sync::Arc;

use tracing::{error, info, instrument, warn};
use tracing_error::SpanTrace;

use crate::records::{RecordSequence, store_row_index};
use crate::sheet_ref::range_start_row;
use crate::store::{StoreError, TabularStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Loading,
    Ready,
    Deleting,
    Error(String),
}

impl SyncState {
    /// A request is outstanding; navigation and further requests are ignored.
    pub fn is_busy(&self) -> bool {
        matches!(self, SyncState::Loading | SyncState::Deleting)
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::Idle => write!(f, "Idle"),
            SyncState::Loading => write!(f, "Loading"),
            SyncState::Ready => write!(f, "Ready"),
            SyncState::Deleting => write!(f, "Deleting"),
            SyncState::Error(message) => write!(f, "Error: {message}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// A1 range handed to the store as is.
    pub range: String,
}

/// Keeps a `RecordSequence` in step with the remote sheet.
pub struct SyncController {
    store: Arc<dyn TabularStore>,
    config: SyncConfig,
    store_id: Option<String>,
    records: Option<RecordSequence>,
    state: SyncState,
}

impl SyncController {
    pub fn new(store: Arc<dyn TabularStore>, config: SyncConfig) -> Self {
        Self {
            store,
            config,
            store_id: None,
            records: None,
            state: SyncState::Idle,
        }
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn store_id(&self) -> Option<&str> {
        self.store_id.as_deref()
    }

    pub fn records(&self) -> Option<&RecordSequence> {
        self.records.as_ref()
    }

    pub fn go_previous(&mut self) {
        if let Some(records) = self.records.as_mut() {
            records.go_previous();
        }
    }

    pub fn go_next(&mut self) {
        if let Some(records) = self.records.as_mut() {
            records.go_next();
        }
    }

    fn set_state(&mut self, state: SyncState) {
        info!("Sync state {} -> {}", self.state, state);
        self.state = state;
    }

    fn fail(&mut self, err: StoreError) -> StoreError {
        error!(error = %err, span_trace = %SpanTrace::capture(), "Store operation failed");
        self.set_state(SyncState::Error(err.to_string()));
        err
    }

    pub fn connect(&mut self, store_id: impl Into<String>) {
        self.store_id = Some(store_id.into());
        self.records = None;
        self.set_state(SyncState::Loading);
    }

    /// Fetch the configured range and rebuild the records, newest first.
    #[instrument(skip(self), fields(store_id = ?self.store_id))]
    pub async fn refresh(&mut self) -> Result<(), StoreError> {
        let Some(store_id) = self.store_id.clone() else {
            warn!("Refresh without a connected sheet");
            return Ok(());
        };
        if self.state == SyncState::Deleting {
            warn!("Refresh ignored while a delete is in flight");
            return Ok(());
        }
        self.set_state(SyncState::Loading);

        let fetched = self.store.fetch_range(&store_id, &self.config.range).await;
        let mut values = match fetched {
            Ok(range) => match range.values {
                Some(values) if !values.is_empty() => values,
                _ => {
                    return Err(self.fail(StoreError::MalformedResponse(
                        "no values in the requested range".into(),
                    )));
                }
            },
            Err(err) => return Err(self.fail(err)),
        };

        let header = values.remove(0);
        values.reverse();
        let records = RecordSequence::new(header, values);
        info!("Fetched {} records from {store_id}", records.len());
        self.records = Some(records);
        self.set_state(SyncState::Ready);
        Ok(())
    }

    /// Delete the record under the cursor remotely, then locally.
    ///
    /// Only runs from `Ready` with a record under the cursor. A failed remote
    /// delete leaves the records untouched.
    #[instrument(skip(self), fields(store_id = ?self.store_id))]
    pub async fn delete_current(&mut self) -> Result<(), StoreError> {
        if self.state != SyncState::Ready {
            warn!("Delete ignored in state {}", self.state);
            return Ok(());
        }
        let (Some(store_id), Some(records)) = (self.store_id.clone(), self.records.as_ref()) else {
            return Ok(());
        };
        let Some(cursor) = records.cursor() else {
            warn!("Delete ignored, no record selected");
            return Ok(());
        };

        let row =
            range_start_row(&self.config.range) + store_row_index(records.total_rows(), cursor);
        self.set_state(SyncState::Deleting);
        info!("Deleting sheet row {row} (cursor {cursor})");

        if let Err(err) = self.store.delete_rows(&store_id, row, row + 1).await {
            return Err(self.fail(err));
        }
        if let Some(records) = self.records.as_mut() {
            records.delete_current();
        }
        self.set_state(SyncState::Ready);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.store_id = None;
        self.records = None;
        self.set_state(SyncState::Idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn table(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn controller(store: Arc<InMemoryStore>, range: &str) -> SyncController {
        SyncController::new(
            store,
            SyncConfig {
                range: range.into(),
            },
        )
    }

    fn abc_store() -> Arc<InMemoryStore> {
        Arc::new(InMemoryStore::new(table(&[&["title"], &["A"], &["B"], &["C"]])))
    }

    fn titles(sync: &SyncController) -> Vec<String> {
        let mut records = sync.records().cloned().unwrap();
        while records.can_go_previous() {
            records.go_previous();
        }
        let mut seen = vec![records.field_value("title").to_string()];
        while records.can_go_next() {
            records.go_next();
            seen.push(records.field_value("title").to_string());
        }
        seen
    }

    #[tokio::test]
    async fn starts_idle_and_connect_loads() {
        let mut sync = controller(abc_store(), "Sheet1");
        assert_eq!(sync.state(), &SyncState::Idle);
        sync.connect("sheet-1");
        assert_eq!(sync.state(), &SyncState::Loading);
        assert!(sync.state().is_busy());
        assert_eq!(sync.store_id(), Some("sheet-1"));
    }

    #[tokio::test]
    async fn refresh_reverses_rows() {
        let mut sync = controller(abc_store(), "Sheet1");
        sync.connect("sheet-1");
        sync.refresh().await.unwrap();
        assert_eq!(sync.state(), &SyncState::Ready);
        let records = sync.records().unwrap();
        assert_eq!(records.cursor(), Some(1));
        assert_eq!(records.field_value("title"), "C");
        assert_eq!(titles(&sync), vec!["C", "B", "A"]);
    }

    #[tokio::test]
    async fn refresh_without_store_is_ignored() {
        let mut sync = controller(abc_store(), "Sheet1");
        sync.refresh().await.unwrap();
        assert_eq!(sync.state(), &SyncState::Idle);
        assert!(sync.records().is_none());
    }

    #[tokio::test]
    async fn fetch_failure_is_surfaced() {
        let store = abc_store();
        store.fail_fetch_with(Some("status 403 Forbidden")).await;
        let mut sync = controller(store, "Sheet1");
        sync.connect("sheet-1");
        let err = sync.refresh().await.unwrap_err();
        assert!(matches!(err, StoreError::Fetch(_)));
        assert_eq!(
            sync.state(),
            &SyncState::Error("failed to fetch data: status 403 Forbidden".into())
        );
        assert!(sync.records().is_none());
    }

    #[tokio::test]
    async fn missing_or_empty_values_are_malformed() {
        let store = abc_store();
        let mut sync = controller(store.clone(), "Sheet1");
        sync.connect("sheet-1");

        store.set_values(None).await;
        let err = sync.refresh().await.unwrap_err();
        assert!(matches!(err, StoreError::MalformedResponse(_)));

        store.set_values(Some(Vec::new())).await;
        let err = sync.refresh().await.unwrap_err();
        assert!(matches!(err, StoreError::MalformedResponse(_)));
        assert!(matches!(sync.state(), SyncState::Error(_)));
    }

    #[tokio::test]
    async fn header_only_sheet_is_ready_but_empty() {
        let store = Arc::new(InMemoryStore::new(table(&[&["title"]])));
        let mut sync = controller(store, "Sheet1");
        sync.connect("sheet-1");
        sync.refresh().await.unwrap();
        assert_eq!(sync.state(), &SyncState::Ready);
        assert_eq!(sync.records().unwrap().cursor(), None);

        // nothing to delete
        sync.delete_current().await.unwrap();
        assert_eq!(sync.state(), &SyncState::Ready);
    }

    #[tokio::test]
    async fn delete_removes_same_row_remotely_and_locally() {
        let store = abc_store();
        let mut sync = controller(store.clone(), "Sheet1");
        sync.connect("sheet-1");
        sync.refresh().await.unwrap();

        sync.go_next(); // on B
        sync.delete_current().await.unwrap();

        assert_eq!(sync.state(), &SyncState::Ready);
        assert_eq!(store.values().await, Some(table(&[&["title"], &["A"], &["C"]])));
        assert_eq!(titles(&sync), vec!["C", "A"]);

        // A refresh agrees with the local view
        sync.refresh().await.unwrap();
        assert_eq!(titles(&sync), vec!["C", "A"]);
    }

    #[tokio::test]
    async fn delete_newest_record() {
        let store = abc_store();
        let mut sync = controller(store.clone(), "Sheet1");
        sync.connect("sheet-1");
        sync.refresh().await.unwrap();

        sync.delete_current().await.unwrap();
        assert_eq!(store.values().await, Some(table(&[&["title"], &["A"], &["B"]])));
        assert_eq!(sync.records().unwrap().field_value("title"), "B");
    }

    #[tokio::test]
    async fn delete_honours_range_offset() {
        // Sheet has a banner row above the header; the range starts at row 2
        let store = Arc::new(InMemoryStore::new(table(&[&["title"], &["A"], &["B"]])));
        let mut sync = controller(store.clone(), "Sheet1!A2:Z");
        sync.connect("sheet-1");
        sync.refresh().await.unwrap();
        store
            .set_values(Some(table(&[&["Jobs export"], &["title"], &["A"], &["B"]])))
            .await;

        sync.delete_current().await.unwrap(); // B is sheet row 3
        assert_eq!(
            store.values().await,
            Some(table(&[&["Jobs export"], &["title"], &["A"]]))
        );
    }

    #[tokio::test]
    async fn delete_with_digits_in_tab_name() {
        let store = abc_store();
        let mut sync = controller(store.clone(), "Q3!A:Z");
        sync.connect("sheet-1");
        sync.refresh().await.unwrap();

        sync.delete_current().await.unwrap(); // C is sheet row 3
        assert_eq!(sync.state(), &SyncState::Ready);
        assert_eq!(store.values().await, Some(table(&[&["title"], &["A"], &["B"]])));
        assert_eq!(titles(&sync), vec!["B", "A"]);
    }

    #[tokio::test]
    async fn navigation_moves_the_cursor_only() {
        let store = abc_store();
        let mut sync = controller(store.clone(), "Sheet1");
        sync.go_next(); // nothing loaded yet
        sync.connect("sheet-1");
        sync.refresh().await.unwrap();

        sync.go_next();
        sync.go_next();
        sync.go_next();
        assert_eq!(sync.records().unwrap().cursor(), Some(3));
        sync.go_previous();
        assert_eq!(sync.records().unwrap().field_value("title"), "B");
        assert_eq!(store.values().await.map(|v| v.len()), Some(4));
    }

    #[tokio::test]
    async fn failed_delete_leaves_records_untouched() {
        let store = abc_store();
        let mut sync = controller(store.clone(), "Sheet1");
        sync.connect("sheet-1");
        sync.refresh().await.unwrap();
        sync.go_next();

        store.fail_delete_with(Some("status 401 Unauthorized")).await;
        let err = sync.delete_current().await.unwrap_err();
        assert_eq!(err, StoreError::Delete("status 401 Unauthorized".into()));
        assert_eq!(
            sync.state(),
            &SyncState::Error("failed to delete row: status 401 Unauthorized".into())
        );
        let records = sync.records().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records.cursor(), Some(2));
        assert_eq!(store.values().await.map(|v| v.len()), Some(4));
    }

    #[tokio::test]
    async fn delete_outside_ready_is_ignored() {
        let store = abc_store();
        let mut sync = controller(store.clone(), "Sheet1");
        sync.connect("sheet-1");
        sync.delete_current().await.unwrap();
        assert_eq!(sync.state(), &SyncState::Loading);
        assert_eq!(store.values().await.map(|v| v.len()), Some(4));
    }

    #[tokio::test]
    async fn reset_forgets_everything() {
        let mut sync = controller(abc_store(), "Sheet1");
        sync.connect("sheet-1");
        sync.refresh().await.unwrap();
        sync.reset();
        assert_eq!(sync.state(), &SyncState::Idle);
        assert_eq!(sync.store_id(), None);
        assert!(sync.records().is_none());
    }
}
