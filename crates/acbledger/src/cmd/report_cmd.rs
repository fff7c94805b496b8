//! acb-report - Reports over the computed ledger.
//!
//! # Usage
//!
//! ```bash
//! acb-report positions
//! acb-report tax --year 2024
//! acb-report ledger --symbol AAPL --from 2024-01-01 --to 2024-06-30
//! acb-report overview --json
//! ```
//!
//! The ledger is always computed from the whole book. Filters only choose
//! which entries a report looks at, so a filtered view never changes any
//! cost pool. Positions always reflect the full history; the symbol filter
//! only selects which rows are shown.

use crate::cmd::completions::ShellType;
use crate::cmd::import_cmd::{transaction_fields, IMPORT_COLUMNS};
use crate::cmd::{init_logging, BookArgs, HOME_CURRENCY_ENV};
use acbledger_core::{
    format_entry, format_money, format_positions, format_tax_years, FormatConfig, LedgerEntry,
    NaiveDate, PositionSummary,
};
use acbledger_engine::{
    compute_ledger_with, tax_year_summaries, DateRange, EngineOptions, Ledger, LedgerFilter,
    PortfolioOverview, SymbolFilter, DEFAULT_WINDOW_DAYS,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::{self, Write};
use std::process::ExitCode;

/// Reports over the computed adjusted cost base ledger.
#[derive(Parser, Debug)]
#[command(name = "acb-report")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Generate shell completions and exit
    #[arg(long, value_name = "SHELL", hide = true)]
    generate_completions: Option<ShellType>,

    /// The report to generate
    #[command(subcommand)]
    report: Option<Report>,

    #[command(flatten)]
    filter: FilterArgs,

    /// Output as JSON
    #[arg(long, global = true, conflicts_with = "csv")]
    json: bool,

    /// Output as CSV
    #[arg(long, global = true)]
    csv: bool,

    /// Home currency label for report headers
    #[arg(long, env = HOME_CURRENCY_ENV, default_value = "CAD", global = true)]
    home_currency: String,

    /// Superficial-loss window in days on each side of a sale
    #[arg(long, default_value_t = DEFAULT_WINDOW_DAYS, global = true)]
    window_days: u32,

    #[command(flatten)]
    book: BookArgs,

    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Report {
    /// Open positions with their cost pools
    Positions,
    /// Realized gains and losses per calendar year
    Tax,
    /// The audit trail: every transaction with its pool before and after
    Ledger,
    /// Portfolio totals across open positions
    Overview,
}

/// Which part of the ledger a report looks at.
#[derive(clap::Args, Debug, Clone)]
struct FilterArgs {
    /// Only this symbol (`ALL` for every symbol)
    #[arg(short, long, global = true, default_value = "ALL", value_parser = parse_symbol)]
    symbol: SymbolFilter,

    /// Only this calendar year
    #[arg(short, long, global = true, conflicts_with_all = ["from", "to"])]
    year: Option<i32>,

    /// First day of a custom date range (YYYY-MM-DD)
    #[arg(long, global = true, requires = "to")]
    from: Option<NaiveDate>,

    /// Last day of a custom date range, inclusive (YYYY-MM-DD)
    #[arg(long, global = true, requires = "from")]
    to: Option<NaiveDate>,
}

fn parse_symbol(s: &str) -> Result<SymbolFilter, String> {
    s.to_uppercase().parse()
}

impl FilterArgs {
    fn to_filter(&self) -> LedgerFilter {
        let dates = match (self.year, self.from, self.to) {
            (Some(year), _, _) => DateRange::Year(year),
            (None, Some(start), Some(end)) => DateRange::between_dates(start, end),
            _ => DateRange::All,
        };
        LedgerFilter::all()
            .with_dates(dates)
            .with_symbol(self.symbol.clone())
    }
}

/// Output encoding for a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    Text,
    Json,
    Csv,
}

/// Main entry point for the report command.
pub fn main() -> ExitCode {
    main_with_name("acb-report")
}

/// Main entry point with custom binary name.
pub fn main_with_name(bin_name: &str) -> ExitCode {
    let args = Args::parse();

    if let Some(shell) = args.generate_completions {
        crate::cmd::completions::generate_completions::<Args>(shell, bin_name);
        return ExitCode::SUCCESS;
    }

    let Some(report) = args.report else {
        eprintln!("error: a report is required (positions, tax, ledger, overview)");
        eprintln!("For more information, try '--help'");
        return ExitCode::from(2);
    };

    init_logging(args.verbose);

    match run(&args, report) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(args: &Args, report: Report) -> Result<()> {
    let book = args.book.open()?;
    let options = EngineOptions::default()
        .with_window_days(args.window_days)
        .with_home_currency(&args.home_currency);
    let ledger = compute_ledger_with(&book.transactions, &options)
        .with_context(|| format!("failed to compute ledger from {}", book.path.display()))?;

    let output = if args.json {
        Output::Json
    } else if args.csv {
        Output::Csv
    } else {
        Output::Text
    };
    let filter = args.filter.to_filter();
    let config = FormatConfig::with_home_currency(&args.home_currency);
    let mut stdout = io::stdout().lock();

    match report {
        Report::Positions => report_positions(&ledger, &filter, output, &config, &mut stdout),
        Report::Tax => report_tax(&ledger, &filter, output, &config, &mut stdout),
        Report::Ledger => report_ledger(&ledger, &filter, output, &config, &mut stdout),
        Report::Overview => report_overview(&ledger, &filter, output, &config, &mut stdout),
    }
}

/// Current positions, computed from the whole ledger.
fn report_positions<W: Write>(
    ledger: &Ledger,
    filter: &LedgerFilter,
    output: Output,
    config: &FormatConfig,
    writer: &mut W,
) -> Result<()> {
    let positions: Vec<PositionSummary> = ledger
        .positions()
        .into_iter()
        .filter(|p| filter.symbol.matches(&p.symbol))
        .collect();

    match output {
        Output::Json => write_json(&positions, writer),
        Output::Csv => write_csv(&positions, writer),
        Output::Text => {
            if positions.is_empty() {
                writeln!(writer, "No open positions")?;
                return Ok(());
            }
            write!(writer, "{}", format_positions(&positions, config))?;
            let total = positions.iter().map(|p| p.cost_pool).sum();
            writeln!(
                writer,
                "\nTotal cost pool: {} {}",
                format_money(total, config.money_places),
                config.home_currency
            )?;
            Ok(())
        }
    }
}

/// Realized gains and losses per year over the filtered entries.
fn report_tax<W: Write>(
    ledger: &Ledger,
    filter: &LedgerFilter,
    output: Output,
    config: &FormatConfig,
    writer: &mut W,
) -> Result<()> {
    let summaries = tax_year_summaries(ledger.filter(filter));

    match output {
        Output::Json => write_json(&summaries, writer),
        Output::Csv => write_csv(&summaries, writer),
        Output::Text => {
            writeln!(writer, "Realized gains and losses ({filter})")?;
            writeln!(writer)?;
            if summaries.is_empty() {
                writeln!(writer, "No disposals")?;
                return Ok(());
            }
            write!(writer, "{}", format_tax_years(&summaries, config))?;
            Ok(())
        }
    }
}

/// The filtered audit trail.
fn report_ledger<W: Write>(
    ledger: &Ledger,
    filter: &LedgerFilter,
    output: Output,
    config: &FormatConfig,
    writer: &mut W,
) -> Result<()> {
    let entries: Vec<&LedgerEntry> = ledger.filter(filter).collect();

    match output {
        Output::Json => write_json(&entries, writer),
        Output::Csv => write_ledger_csv(&entries, writer),
        Output::Text => {
            writeln!(writer, "Ledger ({filter})")?;
            writeln!(writer)?;
            for entry in &entries {
                writeln!(writer, "{}", format_entry(entry, config))?;
            }
            let realized: Decimal = entries.iter().map(|e| e.realized_gain_loss).sum();
            let superficial = entries.iter().filter(|e| e.superficial).count();
            writeln!(writer)?;
            writeln!(
                writer,
                "{} entries, realized {} {}, {superficial} superficial",
                entries.len(),
                format_money(realized, config.money_places),
                config.home_currency
            )?;
            Ok(())
        }
    }
}

/// Totals across open positions, with superficial losses counted in the filtered view.
fn report_overview<W: Write>(
    ledger: &Ledger,
    filter: &LedgerFilter,
    output: Output,
    config: &FormatConfig,
    writer: &mut W,
) -> Result<()> {
    let positions: Vec<PositionSummary> = ledger
        .positions()
        .into_iter()
        .filter(|p| filter.symbol.matches(&p.symbol))
        .collect();
    let overview = PortfolioOverview::build(&positions, ledger.filter(filter));
    let money = |v: Decimal| format_money(v, config.money_places);

    match output {
        Output::Json => write_json(&overview, writer),
        Output::Csv => {
            let mut out = csv::Writer::from_writer(writer);
            out.write_record(["metric", "currency", "value"])?;
            let home = config.home_currency.as_str();
            let mut rows = vec![
                ("open_positions", "", overview.open_positions.to_string()),
                ("total_cost_pool", home, overview.total_cost_pool.to_string()),
                ("foreign_cost_pool", home, overview.foreign_cost_pool.to_string()),
            ];
            for (currency, cost) in &overview.native_cost_by_currency {
                rows.push(("native_cost", currency.as_str(), cost.to_string()));
            }
            rows.push(("superficial_count", "", overview.superficial_count.to_string()));
            for (metric, currency, value) in &rows {
                out.write_record([*metric, *currency, value.as_str()])?;
            }
            out.flush()?;
            Ok(())
        }
        Output::Text => {
            let home = &config.home_currency;
            writeln!(writer, "Portfolio overview")?;
            writeln!(writer, "{}", "=".repeat(40))?;
            writeln!(writer, "Open positions:     {}", overview.open_positions)?;
            writeln!(
                writer,
                "Total cost pool:    {} {home}",
                money(overview.total_cost_pool)
            )?;
            writeln!(
                writer,
                "Foreign cost pool:  {} {home}",
                money(overview.foreign_cost_pool)
            )?;
            for (currency, cost) in &overview.native_cost_by_currency {
                writeln!(writer, "Native cost:        {} {currency}", money(*cost))?;
            }
            writeln!(
                writer,
                "Superficial losses: {} ({filter})",
                overview.superficial_count
            )?;
            Ok(())
        }
    }
}

fn write_json<T: Serialize + ?Sized, W: Write>(value: &T, writer: &mut W) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, value)?;
    writeln!(writer)?;
    Ok(())
}

fn write_csv<T: Serialize, W: Write>(rows: &[T], writer: &mut W) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    for row in rows {
        out.serialize(row)?;
    }
    out.flush()?;
    Ok(())
}

/// Ledger rows: the import columns followed by the computed pool figures.
fn write_ledger_csv<W: Write>(entries: &[&LedgerEntry], writer: &mut W) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    let mut header: Vec<&str> = IMPORT_COLUMNS.to_vec();
    header.extend([
        "shares_after",
        "cost_pool_before",
        "cost_pool_after",
        "cost_per_share",
        "realized_gain_loss",
        "superficial",
        "denied_loss",
    ]);
    out.write_record(&header)?;

    for entry in entries {
        let mut record: Vec<String> = transaction_fields(&entry.transaction).to_vec();
        record.extend([
            entry.after.shares.normalize().to_string(),
            entry.before.cost_pool.to_string(),
            entry.after.cost_pool.to_string(),
            entry.cost_per_share.to_string(),
            entry.realized_gain_loss.to_string(),
            entry.superficial.to_string(),
            entry.denied_loss.to_string(),
        ]);
        out.write_record(&record)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use acbledger_core::RawTransaction;
    use acbledger_engine::compute_ledger;
    use rust_decimal_macros::dec;

    fn sample_ledger() -> Ledger {
        let at = |y, m, d| {
            NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap()
        };
        compute_ledger(&[
            RawTransaction::buy("AAA", at(2023, 3, 1), dec!(100), dec!(10))
                .with_id("a1")
                .with_currency("CAD"),
            RawTransaction::sell("AAA", at(2023, 9, 1), dec!(50), dec!(12))
                .with_id("a2")
                .with_currency("CAD"),
            RawTransaction::buy("BBB", at(2024, 1, 10), dec!(10), dec!(50))
                .with_id("b1")
                .with_currency("USD")
                .with_fx_rate(dec!(1.35)),
            RawTransaction::sell("AAA", at(2024, 2, 1), dec!(10), dec!(8))
                .with_id("a3")
                .with_currency("CAD"),
        ])
        .unwrap()
    }

    fn render(report: Report, argv: &[&str], output: Output) -> String {
        let mut full = vec!["acb-report"];
        full.extend_from_slice(argv);
        let args = Args::try_parse_from(full).unwrap();
        let filter = args.filter.to_filter();
        let config = FormatConfig::default();
        let ledger = sample_ledger();
        let mut buffer = Vec::new();
        match report {
            Report::Positions => report_positions(&ledger, &filter, output, &config, &mut buffer),
            Report::Tax => report_tax(&ledger, &filter, output, &config, &mut buffer),
            Report::Ledger => report_ledger(&ledger, &filter, output, &config, &mut buffer),
            Report::Overview => report_overview(&ledger, &filter, output, &config, &mut buffer),
        }
        .unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_filter_args() {
        let args =
            Args::try_parse_from(["acb-report", "tax", "--year", "2024", "--symbol", "aaa"]).unwrap();
        assert_eq!(args.report, Some(Report::Tax));
        let filter = args.filter.to_filter();
        assert_eq!(filter.dates, DateRange::Year(2024));
        assert!(filter.symbol.matches("AAA"));

        assert!(Args::try_parse_from(["acb-report", "tax", "--year", "2024", "--from", "2024-01-01"])
            .is_err());
        assert!(Args::try_parse_from(["acb-report", "tax", "--from", "2024-01-01"]).is_err());
        assert!(Args::try_parse_from(["acb-report", "tax", "--json", "--csv"]).is_err());
    }

    #[test]
    fn test_tax_report_respects_year() {
        let json = render(Report::Tax, &["tax", "--year", "2024"], Output::Json);
        let years: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(years.as_array().unwrap().len(), 1);
        assert_eq!(years[0]["year"], 2024);

        let text = render(Report::Tax, &["tax"], Output::Text);
        assert!(text.contains("2023"));
        assert!(text.contains("2024"));
    }

    #[test]
    fn test_positions_ignore_date_filter() {
        let csv = render(Report::Positions, &["positions", "--year", "2023"], Output::Csv);
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("symbol,shares,costPool"));
        let rows: Vec<&str> = lines.collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("AAA,40,"));
    }

    #[test]
    fn test_ledger_csv_has_import_columns_first() {
        let csv = render(Report::Ledger, &["ledger", "--symbol", "AAA"], Output::Csv);
        let header = csv.lines().next().unwrap();
        assert!(header.starts_with(&IMPORT_COLUMNS.join(",")));
        assert_eq!(csv.lines().count(), 4);
        assert!(!csv.contains("BBB"));
    }

    #[test]
    fn test_overview_text() {
        let text = render(Report::Overview, &["overview"], Output::Text);
        assert!(text.contains("Open positions:     2"));
        assert!(text.contains("Foreign cost pool:  675.00 CAD"));
        assert!(text.contains("Native cost:        400.00 CAD"));
        assert!(text.contains("Native cost:        500.00 USD"));
    }
}
