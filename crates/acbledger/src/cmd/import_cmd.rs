//! acb-import - Import broker exports into the transaction book.
//!
//! Each file is read by the importer that recognizes it (or the one named
//! with `--format`). Rows that cannot be read are reported as warnings and
//! skipped. Transactions whose id is already in the book are not added
//! again, so re-importing the same export is harmless.
//!
//! # Usage
//!
//! ```bash
//! acb-import flex_2023.csv flex_2024.csv
//! acb-import trades.csv --format csv --dry-run
//! ```

use crate::cmd::completions::ShellType;
use crate::cmd::{init_logging, BookArgs};
use acbledger_core::RawTransaction;
use acbledger_importer::{ImportResult, Importer, ImporterConfig, ImporterRegistry};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::collections::HashSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

/// Header of the plain CSV import format.
pub(crate) const IMPORT_COLUMNS: [&str; 10] = [
    "id",
    "symbol",
    "currency",
    "timestamp",
    "kind",
    "quantity",
    "price",
    "commission",
    "fx_rate",
    "description",
];

/// Import formats accepted by `--format`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum ImportFormat {
    /// Detect the format from the file contents
    #[default]
    Auto,
    /// Interactive Brokers Flex Query CSV
    Ibkr,
    /// Plain CSV with one transaction per row
    Csv,
}

impl ImportFormat {
    const fn importer_name(self) -> Option<&'static str> {
        match self {
            Self::Auto => None,
            Self::Ibkr => Some("ibkr"),
            Self::Csv => Some("csv"),
        }
    }
}

/// Import broker exports into the transaction book.
#[derive(Parser, Debug)]
#[command(name = "acb-import")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Generate shell completions and exit
    #[arg(long, value_name = "SHELL", hide = true)]
    generate_completions: Option<ShellType>,

    /// Files to import
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Input format
    #[arg(short, long, value_enum, default_value_t = ImportFormat::Auto)]
    format: ImportFormat,

    /// Prefix for generated transaction ids
    #[arg(long, value_name = "TAG")]
    batch_tag: Option<String>,

    /// Additional symbols to skip (repeatable)
    #[arg(long, value_name = "SYMBOL")]
    ignore: Vec<String>,

    /// Print the transactions that would be added instead of saving them
    #[arg(short = 'n', long)]
    dry_run: bool,

    #[command(flatten)]
    book: BookArgs,

    /// Show debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// Main entry point for the import command.
pub fn main() -> ExitCode {
    main_with_name("acb-import")
}

/// Main entry point with custom binary name.
pub fn main_with_name(bin_name: &str) -> ExitCode {
    let args = Args::parse();

    if let Some(shell) = args.generate_completions {
        crate::cmd::completions::generate_completions::<Args>(shell, bin_name);
        return ExitCode::SUCCESS;
    }

    if args.files.is_empty() {
        eprintln!("error: at least one FILE is required");
        eprintln!("For more information, try '--help'");
        return ExitCode::from(2);
    }

    init_logging(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let config = importer_config(args);
    let registry = ImporterRegistry::with_defaults(&config);

    let mut imported = ImportResult::empty();
    for file in &args.files {
        let result = extract(&registry, args.format, file)?;
        for warning in &result.warnings {
            eprintln!("warning: {}: {warning}", file.display());
        }
        eprintln!(
            "Read {} transactions from {}",
            result.transactions.len(),
            file.display()
        );
        imported.merge(result);
    }

    let mut book = args.book.open()?;

    if args.dry_run {
        let mut seen: HashSet<&str> = book.transactions.iter().map(|t| t.id.as_str()).collect();
        let fresh: Vec<&RawTransaction> = imported
            .transactions
            .iter()
            .filter(|t| seen.insert(t.id.as_str()))
            .collect();
        write_transactions_csv(&fresh, io::stdout().lock())?;
        eprintln!(
            "Dry run: {} of {} transactions would be added to {}",
            fresh.len(),
            imported.transactions.len(),
            book.path.display()
        );
        return Ok(());
    }

    let total = imported.transactions.len();
    let added = book.append(imported.transactions);
    if added > 0 {
        book.save()
            .with_context(|| format!("failed to save book {}", book.path.display()))?;
    }
    info!(added, total, book = %book.path.display(), "import finished");
    eprintln!(
        "Added {added} new transactions ({} already in book) to {}",
        total - added,
        book.path.display()
    );
    Ok(())
}

fn importer_config(args: &Args) -> ImporterConfig {
    let mut builder = ImporterConfig::builder();
    if let Some(tag) = &args.batch_tag {
        builder = builder.batch_tag(tag);
    }
    for symbol in &args.ignore {
        builder = builder.ignore_symbol(symbol);
    }
    builder.build()
}

fn extract(registry: &ImporterRegistry, format: ImportFormat, file: &Path) -> Result<ImportResult> {
    match format.importer_name() {
        None => registry.extract(file),
        Some(name) => {
            let importer = registry
                .get(name)
                .with_context(|| format!("no importer named {name}"))?;
            importer
                .extract(file)
                .with_context(|| format!("failed to extract from {}", file.display()))
        }
    }
}

/// Write transactions in the plain CSV import format.
pub(crate) fn write_transactions_csv<W: Write>(
    transactions: &[&RawTransaction],
    writer: W,
) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(IMPORT_COLUMNS)?;
    for txn in transactions {
        out.write_record(transaction_fields(txn))?;
    }
    out.flush()?;
    Ok(())
}

/// The ten import-format columns of one transaction.
pub(crate) fn transaction_fields(txn: &RawTransaction) -> [String; 10] {
    [
        txn.id.clone(),
        txn.symbol.clone(),
        txn.currency.clone(),
        txn.timestamp.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
        txn.kind.as_str().to_string(),
        txn.quantity.normalize().to_string(),
        txn.price.normalize().to_string(),
        txn.commission.normalize().to_string(),
        txn.fx_rate.normalize().to_string(),
        txn.description.clone().unwrap_or_default(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use acbledger_core::NaiveDate;
    use acbledger_importer::CsvImporter;
    use rust_decimal_macros::dec;

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "acb-import",
            "a.csv",
            "b.csv",
            "--format",
            "ibkr",
            "--batch-tag",
            "q1",
            "--ignore",
            "EUR.USD",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(args.files.len(), 2);
        assert_eq!(args.format, ImportFormat::Ibkr);
        assert!(args.dry_run);

        let config = importer_config(&args);
        assert!(config.is_ignored("EUR.USD"));
        assert!(config.is_ignored("USD.CAD"));
        assert_eq!(config.make_id("trade-2"), "q1-trade-2");
    }

    #[test]
    fn test_csv_output_reimports() {
        let at = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 30, 15)
            .unwrap();
        let buy = RawTransaction::buy("AAPL", at, dec!(10), dec!(185.50))
            .with_id("b1")
            .with_commission(dec!(1.00))
            .with_fx_rate(dec!(1.3512))
            .with_description("first, lot");
        let split = RawTransaction::split("AAPL", at, dec!(30)).with_id("s1");

        let mut buffer = Vec::new();
        write_transactions_csv(&[&buy, &split], &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        let result = CsvImporter::new(ImporterConfig::default())
            .extract_str(&text)
            .unwrap();
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
        assert_eq!(result.transactions[0].id, buy.id);
        assert_eq!(result.transactions[0].timestamp, at);
        assert_eq!(result.transactions[0].fx_rate, dec!(1.3512));
        assert_eq!(result.transactions[0].description.as_deref(), Some("first, lot"));
        assert_eq!(result.transactions[1].quantity, dec!(30));
    }
}
