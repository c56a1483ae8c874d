use std::fmt;
use std::io::Error;

use derive_setters::Setters;
use ratatui::crossterm::event::KeyEvent;
use tracing_error::SpanTrace;

pub const HELP_TEXT: &str = "\
Navigation
  Up / k          scroll up one row
  Down / j        scroll down one row
  PageUp / b      scroll up one page
  PageDown / f    scroll down one page
  Home / g        jump to the first row
  End / G         jump to the last row
  Mouse wheel     scroll

Filter
  /               edit the filter (matches any column, case-insensitive)
  Enter           keep the filter and return to the table
  Esc             clear the filter and return to the table

General
  ?               show this help
  Esc / q         close this help
  q               quit
  Ctrl-C          quit, also while editing the filter";

#[derive(Debug)]
pub enum CVError {
    IoError(Error),
    JsonError(serde_json::Error, SpanTrace),
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
}

impl From<Error> for CVError {
    fn from(err: Error) -> Self {
        CVError::IoError(err)
    }
}

impl From<serde_json::Error> for CVError {
    fn from(err: serde_json::Error) -> Self {
        CVError::JsonError(err, SpanTrace::capture())
    }
}

impl fmt::Display for CVError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CVError::IoError(e) => write!(f, "I/O error: {e}"),
            CVError::JsonError(e, span_trace) => {
                write!(f, "Malformed dataset: {e}")?;
                if span_trace.status() == tracing_error::SpanTraceStatus::CAPTURED {
                    write!(f, "\n{span_trace}")?;
                }
                Ok(())
            }
            CVError::LoadingFailed(reason) => write!(f, "Loading failed: {reason}"),
            CVError::FileNotFound => write!(f, "Dataset file not found"),
            CVError::PermissionDenied => write!(f, "Permission denied reading dataset file"),
        }
    }
}

impl std::error::Error for CVError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CVError::IoError(e) => Some(e),
            CVError::JsonError(e, _) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct CVConfig {
    pub event_poll_time: u64,
    /// Height of one table row in terminal lines.
    pub row_height: u16,
    /// Rows materialized beyond each edge of the viewport.
    pub render_buffer: usize,
    pub max_column_width: usize,
    pub column_width_margin: usize,
}

impl Default for CVConfig {
    fn default() -> Self {
        CVConfig {
            event_poll_time: 100,
            row_height: 1,
            render_buffer: 2,
            max_column_width: 30,
            column_width_margin: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    /// Ctrl-C, quits from every mode.
    ForceQuit,
    MoveUp,
    MoveDown,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    /// Mouse wheel, in rows. Negative scrolls up.
    Scroll(i32),
    Resize(usize, usize),
    Filter,
    Help,
    Enter,
    Exit,
    RawKey(KeyEvent),
}
