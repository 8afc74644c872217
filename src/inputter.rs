use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::trace;

/// Line editor for the sheet URL on the selection screen.
#[derive(Default)]
pub struct Inputter {
    current_input: String,
    curser_pos: usize, // in chars
    submitted: bool,
}

#[derive(Default, Clone, Debug, PartialEq)]
pub struct InputResult {
    pub input: String,
    pub submitted: bool,
    pub curser_pos: usize,
}

impl Inputter {
    pub fn read(&mut self, key: KeyEvent) -> InputResult {
        match (key.code, key.modifiers) {
            (KeyCode::Enter, _) => self.submitted = true,
            (KeyCode::Esc, _) => self.clear(),
            (KeyCode::Backspace, _) => self.backspace(),
            (KeyCode::Delete, _) => self.delete(),
            (KeyCode::Left, _) => self.curser_pos = self.curser_pos.saturating_sub(1),
            (KeyCode::Right, _) => self.curser_pos = (self.curser_pos + 1).min(self.char_len()),
            (KeyCode::Home, _) => self.curser_pos = 0,
            (KeyCode::End, _) => self.curser_pos = self.char_len(),
            (KeyCode::Char(c), m) if !m.contains(KeyModifiers::CONTROL) => self.insert(c),
            _ => trace!("Ignored input key {key:?}"),
        }
        self.get()
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            input: self.current_input.clone(),
            submitted: self.submitted,
            curser_pos: self.curser_pos,
        }
    }

    pub fn clear(&mut self) {
        self.current_input.clear();
        self.curser_pos = 0;
        self.submitted = false;
    }

    /// Keep the text but allow another submit.
    pub fn rearm(&mut self) {
        self.submitted = false;
    }

    fn char_len(&self) -> usize {
        self.current_input.chars().count()
    }

    fn insert(&mut self, c: char) {
        let at = self.byte_pos(self.curser_pos);
        self.current_input.insert(at, c);
        self.curser_pos += 1;
    }

    fn backspace(&mut self) {
        if self.curser_pos > 0 {
            self.curser_pos -= 1;
            let at = self.byte_pos(self.curser_pos);
            self.current_input.remove(at);
        }
    }

    fn delete(&mut self) {
        if self.curser_pos < self.char_len() {
            let at = self.byte_pos(self.curser_pos);
            self.current_input.remove(at);
        }
    }

    fn byte_pos(&self, char_pos: usize) -> usize {
        self.current_input
            .char_indices()
            .nth(char_pos)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.current_input.len())
    }
}
