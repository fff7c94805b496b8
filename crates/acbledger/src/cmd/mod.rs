//! Command implementations for CLI tools.
//!
//! Each module contains the full implementation for a command,
//! which can be invoked by thin wrapper binaries.

pub mod completions;
pub mod edit_cmd;
pub mod import_cmd;
pub mod plan_cmd;
pub mod report_cmd;

use acbledger_loader::{default_book_path, TransactionBook, BOOK_ENV};
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

/// Environment variable naming the home currency for reports.
pub const HOME_CURRENCY_ENV: &str = "ACBLEDGER_HOME_CURRENCY";

/// Location of the transaction book, shared by every command.
#[derive(clap::Args, Debug, Clone)]
pub struct BookArgs {
    /// Transaction book to read and write
    #[arg(long, value_name = "PATH", env = BOOK_ENV, global = true)]
    pub book: Option<PathBuf>,
}

impl BookArgs {
    /// The book path, falling back to the platform data directory.
    pub fn path(&self) -> Result<PathBuf> {
        match &self.book {
            Some(path) => Ok(path.clone()),
            None => default_book_path()
                .context("no data directory on this platform; pass --book or set ACBLEDGER_BOOK"),
        }
    }

    /// Open the book.
    pub fn open(&self) -> Result<TransactionBook> {
        let path = self.path()?;
        TransactionBook::open(&path).with_context(|| format!("failed to open book {}", path.display()))
    }
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins when set; otherwise `--verbose` selects `debug` and the
/// default is `warn`.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Parse a `KEY=VALUE` pair with a decimal value, e.g. `AAPL=150.25`.
pub fn parse_assignment(s: &str) -> Result<(String, Decimal), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{s}'"));
    }
    let value = Decimal::from_str(value.trim())
        .or_else(|_| Decimal::from_scientific(value.trim()))
        .map_err(|e| format!("invalid number '{}': {e}", value.trim()))?;
    Ok((key.to_string(), value))
}
