//! acb-edit - Edit the transaction book by hand.
//!
//! # Usage
//!
//! ```bash
//! acb-edit add --kind buy --symbol AAPL --date 2024-01-15 --time 10:00 \
//!     --quantity 10 --price 185.50 --commission 1 --fx 1.35
//! acb-edit remove manual-3
//! acb-edit clear --yes
//! ```
//!
//! Every added transaction is validated before the book is written, and the
//! resulting book must still produce a ledger.

use crate::cmd::completions::ShellType;
use crate::cmd::{init_logging, BookArgs};
use acbledger_core::{NaiveDate, RawTransaction, TransactionKind};
use acbledger_engine::compute_ledger;
use acbledger_importer::currency_for_symbol;
use acbledger_loader::TransactionBook;
use anyhow::{bail, Context, Result};
use chrono::NaiveTime;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::process::ExitCode;
use tracing::debug;

/// Edit the transaction book by hand.
#[derive(Parser, Debug)]
#[command(name = "acb-edit")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Generate shell completions and exit
    #[arg(long, value_name = "SHELL", hide = true)]
    generate_completions: Option<ShellType>,

    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    book: BookArgs,

    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add one transaction
    Add(AddArgs),
    /// Remove transactions by id
    Remove {
        /// Ids of the transactions to remove
        #[arg(value_name = "ID", required = true)]
        ids: Vec<String>,
    },
    /// Remove every transaction from the book
    Clear {
        /// Confirm that the whole book should be erased
        #[arg(long)]
        yes: bool,
    },
}

#[derive(clap::Args, Debug)]
struct AddArgs {
    /// Transaction kind: buy, sell, or split
    #[arg(short, long, value_parser = parse_kind)]
    kind: TransactionKind,

    /// Instrument symbol
    #[arg(short, long)]
    symbol: String,

    /// Trade date (YYYY-MM-DD)
    #[arg(short, long)]
    date: NaiveDate,

    /// Wall-clock trade time (HH:MM or HH:MM:SS)
    #[arg(short, long, value_parser = parse_time, default_value = "12:00:00")]
    time: NaiveTime,

    /// Shares bought or sold; for a split, the signed change in shares
    #[arg(short, long, allow_hyphen_values = true)]
    quantity: Decimal,

    /// Price per share in native currency
    #[arg(short, long, default_value = "0")]
    price: Decimal,

    /// Commission in native currency
    #[arg(short, long, default_value = "0")]
    commission: Decimal,

    /// Native-to-home exchange rate
    #[arg(long = "fx", default_value = "1")]
    fx_rate: Decimal,

    /// Native currency (defaults from the symbol suffix)
    #[arg(long)]
    currency: Option<String>,

    /// Transaction id (defaults to the next free `manual-N`)
    #[arg(long)]
    id: Option<String>,

    /// Free-text description
    #[arg(long)]
    description: Option<String>,
}

fn parse_kind(s: &str) -> Result<TransactionKind, String> {
    s.parse()
}

fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|e| format!("invalid time '{s}': {e}"))
}

/// Main entry point for the edit command.
pub fn main() -> ExitCode {
    main_with_name("acb-edit")
}

/// Main entry point with custom binary name.
pub fn main_with_name(bin_name: &str) -> ExitCode {
    let args = Args::parse();

    if let Some(shell) = args.generate_completions {
        crate::cmd::completions::generate_completions::<Args>(shell, bin_name);
        return ExitCode::SUCCESS;
    }

    let Some(command) = &args.command else {
        eprintln!("error: a subcommand is required (add, remove, clear)");
        eprintln!("For more information, try '--help'");
        return ExitCode::from(2);
    };

    init_logging(args.verbose);

    match run(command, &args.book) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(command: &Command, book_args: &BookArgs) -> Result<()> {
    let mut book = book_args.open()?;

    match command {
        Command::Add(add) => {
            let txn = build_transaction(add, &book)?;
            let id = txn.id.clone();
            book.transactions.push(txn);
            // Reject anything the engine would refuse before it reaches disk.
            compute_ledger(&book.transactions).context("transaction not added")?;
            save(&book)?;
            eprintln!("Added {id} to {}", book.path.display());
        }
        Command::Remove { ids } => {
            let mut removed = 0;
            for id in ids {
                if book.remove(id) {
                    removed += 1;
                } else {
                    eprintln!("warning: no transaction with id {id}");
                }
            }
            if removed == 0 {
                bail!("nothing removed");
            }
            save(&book)?;
            eprintln!("Removed {removed} transactions from {}", book.path.display());
        }
        Command::Clear { yes } => {
            if !yes {
                bail!(
                    "refusing to erase {} transactions without --yes",
                    book.len()
                );
            }
            let count = book.len();
            book.clear();
            save(&book)?;
            eprintln!("Cleared {count} transactions from {}", book.path.display());
        }
    }
    Ok(())
}

fn build_transaction(add: &AddArgs, book: &TransactionBook) -> Result<RawTransaction> {
    let symbol = add.symbol.trim().to_uppercase();
    let id = match &add.id {
        Some(id) => {
            if book.get(id).is_some() {
                bail!("a transaction with id {id} already exists");
            }
            id.clone()
        }
        None => next_manual_id(book),
    };
    let currency = add
        .currency
        .as_deref()
        .map_or_else(|| currency_for_symbol(&symbol).to_string(), str::to_uppercase);

    let mut txn = RawTransaction::new(
        add.kind,
        symbol,
        add.date.and_time(add.time),
        add.quantity,
        add.price,
    )
    .with_id(id)
    .with_currency(currency)
    .with_commission(add.commission)
    .with_fx_rate(add.fx_rate);
    if let Some(description) = &add.description {
        txn = txn.with_description(description);
    }

    txn.validate()
        .with_context(|| format!("invalid {} of {}", txn.kind, txn.symbol))?;
    debug!(id = %txn.id, kind = %txn.kind, symbol = %txn.symbol, "built manual transaction");
    Ok(txn)
}

/// First `manual-N` id not already in the book.
fn next_manual_id(book: &TransactionBook) -> String {
    (book.len() + 1..)
        .map(|n| format!("manual-{n}"))
        .find(|id| book.get(id).is_none())
        .unwrap_or_else(|| "manual".to_string())
}

fn save(book: &TransactionBook) -> Result<()> {
    book.save()
        .with_context(|| format!("failed to save book {}", book.path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::path::PathBuf;

    fn empty_book() -> TransactionBook {
        TransactionBook {
            path: PathBuf::from("unused.json"),
            transactions: Vec::new(),
        }
    }

    fn add_args(extra: &[&str]) -> AddArgs {
        let mut argv = vec!["acb-edit", "add"];
        argv.extend_from_slice(extra);
        match Args::try_parse_from(argv).unwrap().command {
            Some(Command::Add(add)) => add,
            other => panic!("expected add, got {other:?}"),
        }
    }

    #[test]
    fn test_add_builds_transaction() {
        let add = add_args(&[
            "--kind", "BUY", "--symbol", "shop.to", "--date", "2024-01-15", "--time", "10:00",
            "--quantity", "10", "--price", "101.5", "--commission", "4.95",
        ]);
        let txn = build_transaction(&add, &empty_book()).unwrap();

        assert_eq!(txn.id, "manual-1");
        assert_eq!(txn.symbol, "SHOP.TO");
        assert_eq!(txn.currency, "CAD");
        assert_eq!(txn.kind, TransactionKind::Buy);
        assert_eq!(txn.timestamp.to_string(), "2024-01-15 10:00:00");
        assert_eq!(txn.commission, dec!(4.95));
        assert_eq!(txn.fx_rate, Decimal::ONE);
    }

    #[test]
    fn test_add_split_accepts_negative_delta() {
        let add = add_args(&[
            "--kind", "split", "--symbol", "XYZ", "--date", "2024-06-10", "--quantity", "-50",
        ]);
        let txn = build_transaction(&add, &empty_book()).unwrap();
        assert_eq!(txn.quantity, dec!(-50));
        assert_eq!(txn.currency, "USD");
        assert_eq!(txn.timestamp.to_string(), "2024-06-10 12:00:00");
    }

    #[test]
    fn test_add_rejects_invalid_and_duplicate() {
        let negative = add_args(&[
            "--kind", "buy", "--symbol", "XYZ", "--date", "2024-01-15", "--quantity", "-1",
        ]);
        assert!(build_transaction(&negative, &empty_book()).is_err());

        let mut book = empty_book();
        let first = add_args(&[
            "--kind", "buy", "--symbol", "XYZ", "--date", "2024-01-15", "--quantity", "1",
        ]);
        let txn = build_transaction(&first, &book).unwrap();
        book.transactions.push(txn);
        let duplicate = add_args(&[
            "--kind", "buy", "--symbol", "XYZ", "--date", "2024-01-15", "--quantity", "1",
            "--id", "manual-1",
        ]);
        assert!(build_transaction(&duplicate, &book).is_err());
        assert_eq!(next_manual_id(&book), "manual-2");
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("09:30").unwrap().to_string(), "09:30:00");
        assert_eq!(parse_time("16:00:05").unwrap().to_string(), "16:00:05");
        assert!(parse_time("noon").is_err());
    }
}
