use std::fmt;
use std::io::Error;

use derive_setters::Setters;
use ratatui::crossterm::event::KeyEvent;

use crate::gesture::SWIPE_THRESHOLD;

pub const HELP_TEXT: &str = "\
←/h      previous card
→/l      next card
drag     swipe the card left or right
d        delete the current record
r        reload the sheet
s        change sheet
c        copy the posting link
C        copy the record as CSV
?        this help
Esc      close popup
q        quit";

// Column names the card layout knows about
pub const FIELD_POSTED: &str = "currentDate";
pub const FIELD_TITLE: &str = "title";
pub const FIELD_COMPANY: &str = "company_name";
pub const FIELD_LOCATION: &str = "location";
pub const FIELD_TYPE: &str = "type";
pub const FIELD_EXPERIENCE: &str = "experience";
pub const FIELD_SALARY: &str = "salary";
pub const FIELD_DESCRIPTION: &str = "description";
pub const FIELD_SKILLS: &str = "skills";
pub const FIELD_WEBSITE: &str = "company_website";

pub const CARD_FIELDS: [&str; 10] = [
    FIELD_POSTED,
    FIELD_TITLE,
    FIELD_COMPANY,
    FIELD_LOCATION,
    FIELD_TYPE,
    FIELD_EXPERIENCE,
    FIELD_SALARY,
    FIELD_DESCRIPTION,
    FIELD_SKILLS,
    FIELD_WEBSITE,
];

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    Previous,
    Next,
    Delete,
    Confirm,
    Exit,
    Refresh,
    ChangeSheet,
    CopyLink,
    CopyRecord,
    Help,
    RawKey(KeyEvent),
    PointerDown(f64),
    PointerMove(f64),
    PointerUp,
}

/// Remote work the model hands back to the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Refresh,
    DeleteCurrent,
}

#[derive(Debug, Clone, Setters)]
pub struct DeckConfig {
    pub event_poll_time: u64,
    pub swipe_threshold: f64,
    /// Gesture units per terminal column.
    pub cell_width: f64,
    pub confirm_delete: bool,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            swipe_threshold: SWIPE_THRESHOLD,
            cell_width: 10.0,
            confirm_delete: true,
        }
    }
}

#[derive(Debug)]
pub enum DeckError {
    IoError(Error),
    InvalidSheet(String),
    LoggingFailed(String),
}

impl fmt::Display for DeckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeckError::IoError(e) => write!(f, "{e}"),
            DeckError::InvalidSheet(s) => write!(f, "Invalid Google Sheets URL: {s}"),
            DeckError::LoggingFailed(s) => write!(f, "Could not set up logging: {s}"),
        }
    }
}

impl From<Error> for DeckError {
    fn from(err: Error) -> Self {
        DeckError::IoError(err)
    }
}
