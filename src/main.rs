use std::io::stdout;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Instant;

use clap::Parser;
use ratatui::crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use ratatui::crossterm::execute;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod controller;
mod dataset;
mod domain;
mod filter;
mod inputter;
mod model;
mod ui;
mod viewport;

use controller::Controller;
use dataset::Dataset;
use domain::{CVConfig, CVError};
use model::{Model, Status};
use ui::TableUI;

/// Browse and filter a table of cryptocurrencies in the terminal.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON dataset to show instead of the bundled one
    #[arg(short, long)]
    data: Option<String>,

    /// Height of one table row in lines
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    row_height: u16,

    /// Rows prepared beyond each edge of the viewport
    #[arg(long, default_value_t = 2)]
    buffer: usize,

    /// Upper bound for the width of a column
    #[arg(long, default_value_t = 30)]
    max_column_width: usize,

    /// Write logs to this file. Nothing is logged without it.
    #[arg(long)]
    log_file: Option<String>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn to_config(&self) -> CVConfig {
        CVConfig::default()
            .with_row_height(self.row_height)
            .with_render_buffer(self.buffer)
            .with_max_column_width(self.max_column_width)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = init_logging(&args) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    let result = run(&args);
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

fn expand_path(path: &str) -> Result<PathBuf, CVError> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| CVError::LoadingFailed(format!("Can not expand {path}: {e}")))
}

fn init_logging(args: &Args) -> Result<(), CVError> {
    let fmt_layer = match &args.log_file {
        Some(log_file) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(expand_path(log_file)?)?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false),
            )
        }
        None => None,
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn load(args: &Args) -> Result<Dataset, CVError> {
    match &args.data {
        Some(path) => Dataset::load(expand_path(path)?),
        None => Dataset::bundled(),
    }
}

fn run(args: &Args) -> Result<(), CVError> {
    info!("Starting coinview!");
    let cfg = args.to_config();

    let mut terminal = ratatui::init();
    execute!(stdout(), EnableMouseCapture)?;

    let size = terminal.size()?;
    let mut model = Model::init(&cfg, size.width as usize, size.height as usize)?;
    let mut ui = TableUI::new(&cfg);
    let controller = Controller::new(&cfg);

    // Show the loading state while the dataset is parsed
    terminal.draw(|f| ui.draw(&model, f))?;
    model.load_dataset(load(args)?);

    let mut drawn_at: Option<Instant> = None;
    while model.status != Status::QUITTING {
        // Render only when the view changed since the last frame
        if drawn_at.is_none_or(|t| model.get_uidata().last_update >= t) {
            terminal.draw(|f| ui.draw(&model, f))?;
            drawn_at = Some(Instant::now());
        }

        // Handle events and map to a Message
        if let Some(message) = controller.handle_event(&model)? {
            model.update(message)?;
        };
    }

    Ok(())
}
