use arboard::Clipboard;
use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::decoder::{decode_date, decode_list};
use crate::domain::*;
use crate::gesture::{GestureSession, Intent};
use crate::inputter::{InputResult, Inputter};
use crate::records::RecordSequence;
use crate::sheet_ref::extract_spreadsheet_id;
use crate::sync::{SyncController, SyncState};

#[derive(Debug, PartialEq)]
pub enum Status {
    RUNNING,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Modus {
    SELECT,
    CARDS,
    CONFIRM,
    HELP,
}

/// Everything the UI shows for the record under the cursor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardView {
    pub position: usize,
    pub total: usize,
    pub posted: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub kind: String,
    pub experience: String,
    pub salary: String,
    pub description: String,
    pub skills: Vec<String>,
    pub website: String,
    pub extras: Vec<(String, String)>, // Columns without a dedicated slot on the card
    pub has_previous: bool,
    pub has_next: bool,
}

impl CardView {
    fn from_records(records: &RecordSequence) -> Option<Self> {
        let position = records.cursor()?;
        let row = records.current_row()?;
        let field = |name: &str| records.field_value(name).to_string();

        let extras = records
            .header()
            .iter()
            .zip(row.iter())
            .filter(|(h, _)| !CARD_FIELDS.iter().any(|f| f.eq_ignore_ascii_case(h)))
            .map(|(h, v)| (h.clone(), v.clone()))
            .collect();

        Some(CardView {
            position,
            total: records.len(),
            posted: decode_date(records.field_value(FIELD_POSTED)),
            title: field(FIELD_TITLE),
            company: field(FIELD_COMPANY),
            location: field(FIELD_LOCATION),
            kind: field(FIELD_TYPE),
            experience: field(FIELD_EXPERIENCE),
            salary: field(FIELD_SALARY),
            description: field(FIELD_DESCRIPTION),
            skills: decode_list(records.field_value(FIELD_SKILLS)),
            website: field(FIELD_WEBSITE),
            extras,
            has_previous: records.can_go_previous(),
            has_next: records.can_go_next(),
        })
    }
}

pub struct Model {
    config: DeckConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    sync: SyncController,
    gesture: GestureSession,
    input: Inputter,
    last_input: InputResult,
    select_error: Option<String>,
    clipboard: Option<Clipboard>,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(config: &DeckConfig, sync: SyncController) -> Self {
        Self {
            config: config.clone(),
            status: Status::RUNNING,
            modus: Modus::SELECT,
            previous_modus: Modus::SELECT,
            sync,
            gesture: GestureSession::with_threshold(config.swipe_threshold),
            input: Inputter::default(),
            last_input: InputResult::default(),
            select_error: None,
            clipboard: None,
            status_message: "Started sheetdeck!".to_string(),
            last_status_message_update: Instant::now(),
        }
    }

    // -------------------- Accessors for the UI ---------------------- //

    pub fn modus(&self) -> Modus {
        self.modus
    }

    pub fn sync_state(&self) -> &SyncState {
        self.sync.state()
    }

    pub fn card(&self) -> Option<CardView> {
        self.sync.records().and_then(CardView::from_records)
    }

    pub fn record_count(&self) -> usize {
        self.sync.records().map(|r| r.len()).unwrap_or(0)
    }

    /// Live drag offset in terminal columns.
    pub fn drag_columns(&self) -> i32 {
        if !self.gesture.is_active() {
            return 0;
        }
        (self.gesture.offset() / self.config.cell_width).round() as i32
    }

    pub fn input(&self) -> &InputResult {
        &self.last_input
    }

    pub fn select_error(&self) -> Option<&str> {
        self.select_error.as_deref()
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn last_status_message_update(&self) -> Instant {
        self.last_status_message_update
    }

    /// In the selection screen every key goes to the text input.
    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::SELECT
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
    }

    fn is_ready(&self) -> bool {
        *self.sync.state() == SyncState::Ready
    }

    // -------------------- Message handling ---------------------- //

    /// Apply a message. Remote work is returned for the caller to `execute`.
    pub fn update(&mut self, message: Option<Message>) -> Option<Command> {
        let msg = message?;
        trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);
        if msg == Message::PointerUp && self.modus != Modus::CARDS {
            // A drag ending under a popup still ends, but does not navigate
            self.gesture.on_end();
            return None;
        }
        match self.modus {
            Modus::SELECT => {
                if let Message::RawKey(key) = msg {
                    return self.raw_input(key);
                }
                None
            }
            Modus::CARDS => match msg {
                Message::Quit => {
                    self.quit();
                    None
                }
                Message::Previous => {
                    self.navigate(Intent::Previous);
                    None
                }
                Message::Next => {
                    self.navigate(Intent::Next);
                    None
                }
                Message::Delete => self.request_delete(),
                Message::Refresh => self.refresh(),
                Message::ChangeSheet => {
                    self.change_sheet();
                    None
                }
                Message::CopyLink => {
                    self.copy_link();
                    None
                }
                Message::CopyRecord => {
                    self.copy_record();
                    None
                }
                Message::Help => {
                    self.show_help();
                    None
                }
                Message::PointerDown(x) => {
                    self.gesture.on_start(x);
                    None
                }
                Message::PointerMove(x) => {
                    self.gesture.on_move(x);
                    None
                }
                Message::PointerUp => {
                    let intent = self.gesture.on_end();
                    self.navigate(intent);
                    None
                }
                _ => None,
            },
            Modus::CONFIRM => match msg {
                Message::Quit => {
                    self.quit();
                    None
                }
                Message::Confirm => {
                    self.modus = Modus::CARDS;
                    Some(Command::DeleteCurrent)
                }
                Message::Exit => {
                    trace!("Delete cancelled");
                    self.modus = Modus::CARDS;
                    None
                }
                _ => None,
            },
            Modus::HELP => match msg {
                Message::Quit => {
                    self.quit();
                    None
                }
                Message::Exit | Message::Help => {
                    self.modus = self.previous_modus;
                    self.previous_modus = Modus::HELP;
                    None
                }
                _ => None,
            },
        }
    }

    /// Run remote work requested by `update`.
    pub async fn execute(&mut self, command: Command) {
        debug!("Executing {command:?}");
        match command {
            Command::Refresh => match self.sync.refresh().await {
                Ok(()) => {
                    if self.is_ready() {
                        let n = self.record_count();
                        self.set_status_message(format!("Loaded {n} records"));
                    }
                }
                Err(e) => self.set_status_message(e.to_string()),
            },
            Command::DeleteCurrent => {
                let before = self.record_count();
                match self.sync.delete_current().await {
                    Ok(()) if self.record_count() < before => {
                        self.set_status_message("Deleted record")
                    }
                    Ok(()) => {}
                    Err(e) => self.set_status_message(e.to_string()),
                }
            }
        }
    }

    fn raw_input(&mut self, key: KeyEvent) -> Option<Command> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.quit();
            return None;
        }
        self.last_input = self.input.read(key);
        if self.last_input.submitted {
            self.input.rearm();
            let text = self.last_input.input.clone();
            return self.connect(&text);
        }
        None
    }

    /// Connect to the sheet named by a URL or id and ask for the first load.
    pub fn connect(&mut self, sheet: &str) -> Option<Command> {
        match extract_spreadsheet_id(sheet) {
            Some(id) => {
                info!("Connecting to sheet {id}");
                self.select_error = None;
                self.sync.connect(id);
                self.modus = Modus::CARDS;
                Some(Command::Refresh)
            }
            None => {
                warn!("Invalid Google Sheets URL: {sheet:?}");
                self.select_error = Some("Invalid Google Sheets URL".to_string());
                None
            }
        }
    }

    fn navigate(&mut self, intent: Intent) {
        if !self.is_ready() {
            return;
        }
        match intent {
            Intent::Previous => self.sync.go_previous(),
            Intent::Next => self.sync.go_next(),
            Intent::None => {}
        }
    }

    fn request_delete(&mut self) -> Option<Command> {
        let has_record = self.sync.records().and_then(|r| r.cursor()).is_some();
        if !self.is_ready() || !has_record {
            return None;
        }
        if self.config.confirm_delete {
            self.modus = Modus::CONFIRM;
            None
        } else {
            Some(Command::DeleteCurrent)
        }
    }

    fn refresh(&mut self) -> Option<Command> {
        if self.sync.state().is_busy() || self.sync.store_id().is_none() {
            return None;
        }
        self.set_status_message("Reloading ...");
        Some(Command::Refresh)
    }

    fn change_sheet(&mut self) {
        if self.sync.state().is_busy() {
            return;
        }
        self.sync.reset();
        self.input.clear();
        self.last_input = self.input.get();
        self.select_error = None;
        self.modus = Modus::SELECT;
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::HELP;
    }

    fn copy_link(&mut self) {
        if !self.is_ready() {
            return;
        }
        let link = self.card().map(|c| c.website).unwrap_or_default();
        if link.is_empty() {
            self.set_status_message("No posting link for this record");
        } else {
            self.copy_to_clipboard(link, "posting link");
        }
    }

    fn copy_record(&mut self) {
        if !self.is_ready() {
            return;
        }
        let row = self
            .sync
            .records()
            .and_then(|r| r.current_row())
            .map(record_as_csv);
        if let Some(row) = row {
            self.copy_to_clipboard(row, "record");
        }
    }

    fn copy_to_clipboard(&mut self, text: String, what: &str) {
        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(c) => self.clipboard = Some(c),
                Err(e) => {
                    warn!("Clipboard unavailable: {e:?}");
                    self.set_status_message(format!("Clipboard unavailable: {e}"));
                    return;
                }
            }
        }
        if let Some(clipboard) = self.clipboard.as_mut() {
            match clipboard.set_text(text) {
                Ok(_) => {
                    trace!("Copied {what} to clipboard.");
                    self.set_status_message(format!("Copied {what}"));
                }
                Err(e) => {
                    warn!("Error copying to clipboard: {e:?}");
                    self.set_status_message(format!("Copy failed: {e}"));
                }
            }
        }
    }
}

fn wrap_cell_content(c: &str) -> String {
    let needs_escaping = c.contains('"');
    let needs_wrapping = c.chars().any(|c| c.is_whitespace() || c == ',');

    if needs_escaping || needs_wrapping {
        format!("\"{}\"", c.replace('"', "\"\""))
    } else {
        c.to_string()
    }
}

/// One CSV line for a record.
pub fn record_as_csv(row: &[String]) -> String {
    row.iter()
        .map(|c| wrap_cell_content(c))
        .collect::<Vec<String>>()
        .join(",")
}
