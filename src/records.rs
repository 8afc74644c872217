use tracing::{debug, trace};

/// Index of the record under `cursor` in retrieval order, counted from the
/// store side.
///
/// `total_rows` counts the header plus all data rows. Because the data rows are
/// held newest first, the record under cursor `c` is the `total_rows - c`-th
/// data row the store returned. With the header on the store's first row this
/// is also the record's 0-based row offset from the header.
pub fn store_row_index(total_rows: usize, cursor: usize) -> usize {
    total_rows - cursor
}

/// A header row plus data rows with a cursor over the data rows.
///
/// Cursor positions are table positions: the header sits at 0, so a valid
/// cursor is always in `1..=len()`. With no data rows there is no cursor.
#[derive(Debug, Default, Clone)]
pub struct RecordSequence {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    cursor: Option<usize>,
}

impl RecordSequence {
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let mut records = Self::default();
        records.load(header, rows);
        records
    }

    /// Replace the table. Rows are padded (or cut) to the header width.
    pub fn load(&mut self, header: Vec<String>, rows: Vec<Vec<String>>) {
        let width = header.len();
        self.rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        self.header = header;
        self.cursor = if self.rows.is_empty() { None } else { Some(1) };
        debug!(
            "Loaded {} records with {} fields",
            self.rows.len(),
            self.header.len()
        );
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header plus data rows.
    pub fn total_rows(&self) -> usize {
        self.rows.len() + 1
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn current_row(&self) -> Option<&[String]> {
        self.cursor
            .and_then(|c| self.rows.get(c - 1))
            .map(|row| row.as_slice())
    }

    fn column(&self, name: &str) -> Option<usize> {
        let name = name.to_lowercase();
        self.header.iter().position(|h| h.to_lowercase() == name)
    }

    /// Cell of the current record in the column called `name` (ignoring case).
    pub fn field_value(&self, name: &str) -> &str {
        match (self.column(name), self.current_row()) {
            (Some(idx), Some(row)) => row.get(idx).map(String::as_str).unwrap_or(""),
            _ => "",
        }
    }

    pub fn can_go_previous(&self) -> bool {
        self.cursor.is_some_and(|c| c > 1)
    }

    pub fn can_go_next(&self) -> bool {
        self.cursor.is_some_and(|c| c < self.total_rows() - 1)
    }

    pub fn go_previous(&mut self) {
        if self.can_go_previous() {
            self.cursor = self.cursor.map(|c| c - 1);
            trace!("Cursor moved back to {:?}", self.cursor);
        }
    }

    pub fn go_next(&mut self) {
        if self.can_go_next() {
            self.cursor = self.cursor.map(|c| c + 1);
            trace!("Cursor moved forward to {:?}", self.cursor);
        }
    }

    /// Remove the record under the cursor and return it.
    ///
    /// When the cursor ends up on or past the new last position it is pulled
    /// back to `max(1, new_total - 2)`.
    pub fn delete_current(&mut self) -> Option<Vec<String>> {
        let cursor = self.cursor?;
        let removed = self.rows.remove(cursor - 1);

        let new_total = self.total_rows();
        self.cursor = if self.rows.is_empty() {
            None
        } else if cursor >= new_total - 1 {
            Some(std::cmp::max(1, new_total.saturating_sub(2)))
        } else {
            Some(cursor)
        };
        debug!(
            "Removed record at {cursor}, {} left, cursor {:?}",
            self.rows.len(),
            self.cursor
        );
        Some(removed)
    }
}
