use std::sync::LazyLock;

use regex::Regex;

static SPREADSHEET_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/spreadsheets/d/([a-zA-Z0-9_-]+)").expect("valid regex"));
static SPREADSHEET_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("valid regex"));
// Cell part of a range (`A3:Z`, `$B$10`, `5:9`). Column letters are capped at
// three so a bare `Sheet5` reads as a sheet name.
static RANGE_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$?[A-Za-z]{0,3}\$?(\d+)(?::\$?[A-Za-z]{0,3}\$?\d*)?$").expect("valid regex")
});

/// Pull the spreadsheet id out of a Google Sheets URL, or accept a bare id.
pub fn extract_spreadsheet_id(input: &str) -> Option<String> {
    let input = input.trim();
    if let Some(caps) = SPREADSHEET_URL.captures(input) {
        return Some(caps[1].to_string());
    }
    if SPREADSHEET_ID.is_match(input) {
        return Some(input.to_string());
    }
    None
}

/// 0-based sheet row of the first cell of an A1 range. Ranges without a row
/// number (`Sheet1`, `A:Z`) start at the top of the sheet.
pub fn range_start_row(range: &str) -> usize {
    let range = range.trim();
    // Tab names may hold digits of their own; only the part after `!` counts
    let cells = range.rsplit_once('!').map_or(range, |(_, cells)| cells);
    RANGE_START
        .captures(cells)
        .and_then(|caps| caps[1].parse::<usize>().ok())
        .map(|row| row.saturating_sub(1))
        .unwrap_or(0)
}
