use std::time::Duration;

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Stylize},
    symbols::border,
    text::{Line, Span, Text},
    widgets::{Block, Clear, Paragraph, Wrap},
};

use crate::domain::{Command, DeckConfig, HELP_TEXT};
use crate::model::{CardView, Model, Modus};
use crate::sync::SyncState;

pub const CARD_MAX_WIDTH: u16 = 80;
pub const HEADER_HEIGHT: u16 = 1;
pub const FOOTER_HEIGHT: u16 = 2;
const STATUS_MESSAGE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub struct DeckUI {
    confirm_delete: bool,
}

impl DeckUI {
    pub fn new(cfg: &DeckConfig) -> Self {
        Self {
            confirm_delete: cfg.confirm_delete,
        }
    }

    /// `pending` is remote work about to run; its progress screen is shown
    /// before the loop blocks on it.
    pub fn draw(&self, model: &Model, pending: Option<Command>, frame: &mut Frame) {
        let area = frame.area();
        match (model.modus(), model.sync_state()) {
            (Modus::SELECT, _) => self.draw_select(model, frame, area),
            _ if pending == Some(Command::DeleteCurrent) => {
                Self::draw_centered(frame, area, Line::from("Deleting..."))
            }
            _ if pending == Some(Command::Refresh) => {
                Self::draw_centered(frame, area, Line::from("Loading..."))
            }
            (_, SyncState::Loading) => Self::draw_centered(frame, area, Line::from("Loading...")),
            (_, SyncState::Deleting) => Self::draw_centered(frame, area, Line::from("Deleting...")),
            (_, SyncState::Error(message)) => self.draw_error(frame, area, message),
            _ => self.draw_cards(model, frame, area),
        }

        match model.modus() {
            Modus::CONFIRM => Self::draw_popup(
                frame,
                " Delete ",
                "Are you sure you want to delete this job posting?\n\n<y> delete   <n> keep",
            ),
            Modus::HELP => Self::draw_popup(frame, " Help ", HELP_TEXT),
            _ => {}
        }
    }

    fn draw_select(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let form = popup_area(area, 70, 8);
        let block = Block::bordered()
            .title(Line::from(" Job Database Viewer ".bold()).centered())
            .title_bottom(Line::from(vec![" Load ".into(), "<Enter> ".blue().bold()]).centered())
            .border_set(border::THICK);
        let inner = block.inner(form);
        frame.render_widget(block, form);

        let [label, input, _, error] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
        ])
        .areas(inner);

        frame.render_widget(Paragraph::new("Enter Google Sheets URL".gray()), label);
        let result = model.input();
        let text = if result.input.is_empty() {
            Line::from("https://docs.google.com/spreadsheets/d/...".dark_gray())
        } else {
            Line::from(result.input.as_str())
        };
        frame.render_widget(Paragraph::new(text), input);
        let cursor_x = input.x + (result.curser_pos as u16).min(input.width.saturating_sub(1));
        frame.set_cursor_position((cursor_x, input.y));

        if let Some(message) = model.select_error() {
            frame.render_widget(
                Paragraph::new(message.red()).wrap(Wrap { trim: true }),
                error,
            );
        }
    }

    fn draw_error(&self, frame: &mut Frame, area: Rect, message: &str) {
        let text = Text::from(vec![
            Line::from(format!("Error: {message}").red()),
            Line::from(""),
            Line::from(vec![
                "<r>".blue().bold(),
                " reload  ".into(),
                "<s>".blue().bold(),
                " change sheet  ".into(),
                "<q>".blue().bold(),
                " quit".into(),
            ]),
        ]);
        let [_, middle, _] = Layout::vertical([
            Constraint::Fill(1),
            Constraint::Length(3),
            Constraint::Fill(1),
        ])
        .areas(area);
        frame.render_widget(Paragraph::new(text).centered().wrap(Wrap { trim: true }), middle);
    }

    fn draw_centered(frame: &mut Frame, area: Rect, line: Line) {
        let [_, middle, _] = Layout::vertical([
            Constraint::Fill(1),
            Constraint::Length(1),
            Constraint::Fill(1),
        ])
        .areas(area);
        frame.render_widget(Paragraph::new(line.bold()).centered(), middle);
    }

    fn draw_cards(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let [header, body, footer] = Layout::vertical([
            Constraint::Length(HEADER_HEIGHT),
            Constraint::Min(3),
            Constraint::Length(FOOTER_HEIGHT),
        ])
        .areas(area);

        let card = model.card();
        frame.render_widget(Paragraph::new(position_line(card.as_ref())), header);

        match card {
            Some(card) => {
                let width = std::cmp::min(CARD_MAX_WIDTH, body.width);
                let centered_x = body.x + (body.width - width) / 2;
                let max_x = body.x + body.width - width;
                let x = (i32::from(centered_x) + model.drag_columns())
                    .clamp(i32::from(body.x), i32::from(max_x)) as u16;
                let card_area = Rect { x, width, ..body };

                let hint = Line::from(" Swipe left or right to navigate ".dark_gray()).centered();
                let block = Block::bordered()
                    .border_set(border::ROUNDED)
                    .title_bottom(hint);
                frame.render_widget(
                    Paragraph::new(card_text(&card))
                        .block(block)
                        .wrap(Wrap { trim: false }),
                    card_area,
                );
            }
            None => Self::draw_centered(frame, body, Line::from("This sheet has no records")),
        }

        let mut instructions = vec![
            " Prev ".into(),
            "<←>".blue().bold(),
            " Next ".into(),
            "<→>".blue().bold(),
            " Delete ".into(),
            "<d>".blue().bold(),
        ];
        if !self.confirm_delete {
            instructions.push(" (no confirm)".red());
        }
        instructions.extend([
            " Reload ".into(),
            "<r>".blue().bold(),
            " Change Sheet ".into(),
            "<s>".blue().bold(),
            " Help ".into(),
            "<?>".blue().bold(),
            " Quit ".into(),
            "<q>".blue().bold(),
        ]);
        let status = if model.last_status_message_update().elapsed() < STATUS_MESSAGE_TIMEOUT {
            Line::from(model.status_message().yellow())
        } else {
            Line::from("")
        };
        frame.render_widget(
            Paragraph::new(Text::from(vec![Line::from(instructions), status])),
            footer,
        );
    }

    fn draw_popup(frame: &mut Frame, title: &str, message: &str) {
        let height = message.lines().count() as u16 + 2;
        let width = message.lines().map(|l| l.chars().count()).max().unwrap_or(0) as u16 + 4;
        let area = popup_area(frame.area(), width, height);
        let block = Block::bordered()
            .title(Line::from(title.bold()).centered())
            .border_set(border::THICK);
        frame.render_widget(Clear, area);
        frame.render_widget(Paragraph::new(message).block(block), area);
    }
}

fn position_line(card: Option<&CardView>) -> Line<'static> {
    let (position, total, has_previous, has_next) = card
        .map(|c| (c.position, c.total, c.has_previous, c.has_next))
        .unwrap_or((0, 0, false, false));
    let arrow = |s: &'static str, enabled: bool| {
        if enabled { s.blue().bold() } else { s.dark_gray() }
    };
    Line::from(vec![
        arrow(" ◀ ", has_previous),
        Span::from(format!(" Job {position} of {total} ")).on_dark_gray(),
        arrow(" ▶ ", has_next),
    ])
}

fn card_text(card: &CardView) -> Text<'static> {
    let mut lines = vec![
        Line::from(format!("Posted: {}", card.posted).gray()),
        Line::from(""),
        Line::from(card.title.clone().bold().fg(Color::LightBlue)),
        Line::from(card.company.clone().bold()),
        Line::from(""),
        Line::from(vec![
            Span::from(format!("{:<30}", card.location)),
            Span::from(card.kind.clone()),
        ]),
    ];

    let mut details = vec![Span::from(format!(
        "{:<30}",
        format!("{}+ years experience", card.experience)
    ))];
    if !card.salary.is_empty() {
        details.push(card.salary.clone().into());
    }
    lines.push(Line::from(details));
    lines.push(Line::from(""));

    lines.push(Line::from("Description".bold().fg(Color::LightBlue)));
    lines.extend(card.description.lines().map(|l| Line::from(l.to_string())));

    if !card.skills.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from("Skills".bold().fg(Color::LightBlue)));
        let mut skills = Vec::with_capacity(card.skills.len() * 2);
        for skill in &card.skills {
            skills.push(format!(" {skill} ").fg(Color::LightBlue).bg(Color::Blue));
            skills.push(" ".into());
        }
        lines.push(Line::from(skills));
    }

    if !card.website.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            "View Job Posting: ".fg(Color::LightBlue),
            card.website.clone().underlined(),
        ]));
    }

    if !card.extras.is_empty() {
        lines.push(Line::from(""));
        for (name, value) in &card.extras {
            lines.push(Line::from(vec![format!("{name}: ").gray(), value.clone().into()]));
        }
    }
    Text::from(lines)
}

fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use crate::sync::{SyncConfig, SyncController};

    fn card() -> CardView {
        CardView {
            position: 2,
            total: 5,
            posted: "Jan 5, 2024".into(),
            title: "Backend Engineer".into(),
            experience: "3".into(),
            skills: vec!["rust".into()],
            extras: vec![("team".into(), "core".into())],
            has_previous: true,
            ..CardView::default()
        }
    }

    fn plain(text: &Text) -> Vec<String> {
        text.lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn card_lists_present_fields_only() {
        let lines = plain(&card_text(&card()));
        assert_eq!(lines[0], "Posted: Jan 5, 2024");
        assert!(lines.iter().any(|l| l.trim_end() == "3+ years experience"));
        assert!(lines.iter().any(|l| l.contains(" rust ")));
        assert!(lines.iter().any(|l| l == "team: core"));
        assert!(!lines.iter().any(|l| l.contains("View Job Posting")));
    }

    #[test]
    fn position_reads_job_n_of_total() {
        let line = position_line(Some(&card()));
        assert_eq!(line.to_string(), " ◀  Job 2 of 5  ▶ ");
        assert_eq!(position_line(None).to_string(), " ◀  Job 0 of 0  ▶ ");
    }

    fn rendered(model: &Model, pending: Option<Command>) -> String {
        let backend = ratatui::backend::TestBackend::new(60, 12);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        let ui = DeckUI::new(&DeckConfig::default());
        terminal.draw(|f| ui.draw(model, pending, f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[tokio::test]
    async fn pending_reload_shows_loading() {
        let store = std::sync::Arc::new(InMemoryStore::demo());
        let sync = SyncController::new(
            store,
            SyncConfig {
                range: "Sheet1".into(),
            },
        );
        let mut model = Model::init(&DeckConfig::default(), sync);
        let cmd = model.connect("demo-sheet");
        model.execute(cmd.unwrap()).await;
        assert_eq!(model.sync_state(), &SyncState::Ready);

        assert!(rendered(&model, None).contains("Job 1 of 3"));
        let screen = rendered(&model, Some(Command::Refresh));
        assert!(screen.contains("Loading..."));
        assert!(!screen.contains("Job 1 of 3"));
        assert!(rendered(&model, Some(Command::DeleteCurrent)).contains("Deleting..."));
    }

    #[test]
    fn popup_fits_inside_area() {
        let area = Rect::new(0, 0, 20, 10);
        assert_eq!(popup_area(area, 40, 4), Rect::new(0, 3, 20, 4));
        assert_eq!(popup_area(area, 10, 4), Rect::new(5, 3, 10, 4));
    }
}
