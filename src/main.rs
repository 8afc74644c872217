use std::fs::OpenOptions;
use std::io::stdout;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use clap::Parser;
use ratatui::crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use ratatui::crossterm::execute;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod controller;
mod decoder;
mod domain;
mod gesture;
mod inputter;
mod model;
mod records;
mod sheet_ref;
mod store;
mod sync;
mod ui;

use controller::Controller;
use domain::{DeckConfig, DeckError};
use model::{Model, Status};
use store::{InMemoryStore, SHEETS_BASE_URL, SheetsClient, SheetsConfig, TabularStore};
use sync::{SyncConfig, SyncController};
use ui::DeckUI;

/// Browse the rows of a Google Sheet as a deck of cards.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Google Sheets URL or spreadsheet id. Opens the selection screen when omitted.
    sheet: Option<String>,

    /// API key used for reading the sheet.
    #[arg(long, env = "SHEETDECK_API_KEY", default_value = "", hide_env_values = true)]
    api_key: String,

    /// OAuth access token used for deleting rows. Defaults to the API key.
    #[arg(long, env = "SHEETDECK_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// A1 range holding the header row and the records.
    #[arg(long, env = "SHEETDECK_RANGE", default_value = "Sheet1")]
    range: String,

    /// Numeric id of the tab rows are deleted from.
    #[arg(long, default_value_t = 0)]
    sheet_id: u32,

    /// Horizontal drag distance that counts as a swipe.
    #[arg(long, default_value_t = gesture::SWIPE_THRESHOLD)]
    swipe_threshold: f64,

    /// Swipe distance covered by one terminal column.
    #[arg(long, default_value_t = 10.0)]
    cell_width: f64,

    /// Delete without asking first.
    #[arg(long)]
    no_confirm: bool,

    #[arg(long, default_value = "~/.sheetdeck.log")]
    log_file: String,

    /// Event poll interval in milliseconds.
    #[arg(long, default_value_t = 100)]
    event_poll_time: u64,

    /// Browse a built-in sample sheet instead of Google Sheets.
    #[arg(long)]
    demo: bool,
}

impl Args {
    fn deck_config(&self) -> DeckConfig {
        DeckConfig::default()
            .event_poll_time(self.event_poll_time)
            .swipe_threshold(self.swipe_threshold)
            .cell_width(self.cell_width)
            .confirm_delete(!self.no_confirm)
    }

    fn store(&self) -> Arc<dyn TabularStore> {
        if self.demo {
            return Arc::new(InMemoryStore::demo());
        }
        Arc::new(SheetsClient::new(SheetsConfig {
            base_url: SHEETS_BASE_URL.to_string(),
            api_key: self.api_key.clone(),
            access_token: self.access_token.clone(),
            sheet_id: self.sheet_id,
        }))
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let result = run(args);
    let _ = execute!(stdout(), DisableMouseCapture);
    ratatui::restore();
    match result {
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn init_logging(path: &str) -> Result<(), DeckError> {
    let path = shellexpand::full(path).map_err(|e| DeckError::LoggingFailed(e.to_string()))?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&*path)?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(log_file)),
        )
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| DeckError::LoggingFailed(e.to_string()))
}

fn run(args: Args) -> Result<(), DeckError> {
    init_logging(&args.log_file)?;
    info!("Starting sheetdeck!");

    let cfg = args.deck_config();
    let sync = SyncController::new(
        args.store(),
        SyncConfig {
            range: args.range.clone(),
        },
    );
    let mut model = Model::init(&cfg, sync);
    let ui = DeckUI::new(&cfg);
    let controller = Controller::new(&cfg);

    // Network calls are awaited in place; nothing else runs meanwhile.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let mut pending = match args.sheet.as_deref() {
        Some(sheet) => Some(
            model
                .connect(sheet)
                .ok_or_else(|| DeckError::InvalidSheet(sheet.to_string()))?,
        ),
        None => None,
    };

    let mut terminal = ratatui::init();
    execute!(stdout(), EnableMouseCapture)?;

    while model.status != Status::QUITTING {
        // Render the current view, including Loading/Deleting before blocking
        terminal.draw(|f| ui.draw(&model, pending, f))?;

        if let Some(command) = pending.take() {
            runtime.block_on(model.execute(command));
            continue;
        }

        // Handle events and map to a Message
        let message = controller.handle_event(&model)?;
        pending = model.update(message);
    }

    info!("Quitting sheetdeck");
    Ok(())
}
