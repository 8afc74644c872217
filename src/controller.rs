use std::time::Duration;
use tracing::trace;

use crate::domain::{DeckConfig, DeckError, Message};
use crate::model::{Model, Modus};
use ratatui::crossterm::event::{
    self, Event, KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind,
};

pub struct Controller {
    event_poll_time: u64,
    cell_width: f64,
}

impl Controller {
    pub fn new(cfg: &DeckConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
            cell_width: cfg.cell_width,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, DeckError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(self.map_event(model, event::read()?));
        }
        Ok(None)
    }

    fn map_event(&self, model: &Model, event: Event) -> Option<Message> {
        match event {
            Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                if model.raw_keyevents() {
                    Some(Message::RawKey(key))
                } else {
                    self.handle_key(model.modus(), key)
                }
            }
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            _ => None,
        }
    }

    fn handle_key(&self, modus: Modus, key: KeyEvent) -> Option<Message> {
        let message = match (modus, key.code) {
            (_, KeyCode::Char('q')) => Some(Message::Quit),
            (Modus::CONFIRM, KeyCode::Char('y') | KeyCode::Enter) => Some(Message::Confirm),
            (_, KeyCode::Char('n') | KeyCode::Esc) => Some(Message::Exit),
            (_, KeyCode::Left | KeyCode::Char('h')) => Some(Message::Previous),
            (_, KeyCode::Right | KeyCode::Char('l')) => Some(Message::Next),
            (_, KeyCode::Char('d') | KeyCode::Delete) => Some(Message::Delete),
            (_, KeyCode::Char('r')) => Some(Message::Refresh),
            (_, KeyCode::Char('s')) => Some(Message::ChangeSheet),
            (_, KeyCode::Char('c')) => Some(Message::CopyLink),
            (_, KeyCode::Char('C')) => Some(Message::CopyRecord),
            (_, KeyCode::Char('?')) => Some(Message::Help),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }

    fn handle_mouse(&self, mouse: MouseEvent) -> Option<Message> {
        let x = f64::from(mouse.column) * self.cell_width;
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => Some(Message::PointerDown(x)),
            MouseEventKind::Drag(MouseButton::Left) => Some(Message::PointerMove(x)),
            MouseEventKind::Up(MouseButton::Left) => Some(Message::PointerUp),
            _ => None,
        }
    }
}
