//! acb-plan - Tax-loss harvest planning.
//!
//! Shows what selling each priced position would realize, and which
//! positions under water could offset the year's net realized gain.
//!
//! # Usage
//!
//! ```bash
//! acb-plan --price AAPL=150 --price SHOP.TO=80 --fx USD=1.36
//! acb-plan --price XYZ=6 --year 2024 --on 2024-12-20 --json
//! ```

use crate::cmd::completions::ShellType;
use crate::cmd::{init_logging, parse_assignment, BookArgs, HOME_CURRENCY_ENV};
use acbledger_core::{format_money, format_shares, NaiveDate};
use acbledger_engine::{
    compute_ledger_with, EngineOptions, HarvestPlan, HarvestPlanner, Ledger, RepurchaseIndex,
    DEFAULT_WINDOW_DAYS,
};
use acbledger_loader::TransactionBook;
use anyhow::{Context, Result};
use chrono::{Datelike, Local, NaiveTime};
use clap::Parser;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::debug;

/// Plan tax-loss harvesting at target prices.
#[derive(Parser, Debug)]
#[command(name = "acb-plan")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Generate shell completions and exit
    #[arg(long, value_name = "SHELL", hide = true)]
    generate_completions: Option<ShellType>,

    /// Target price in native currency (repeatable)
    #[arg(short, long = "price", value_name = "SYMBOL=PRICE", value_parser = parse_assignment)]
    prices: Vec<(String, Decimal)>,

    /// Exchange rate override for a currency (repeatable)
    #[arg(long = "fx", value_name = "CURRENCY=RATE", value_parser = parse_assignment)]
    fx_rates: Vec<(String, Decimal)>,

    /// Tax year whose net realized gain should be offset (default: year of --on)
    #[arg(short, long)]
    year: Option<i32>,

    /// Planned sale date, used for the superficial-loss check (default: today)
    #[arg(long, value_name = "DATE")]
    on: Option<NaiveDate>,

    /// Home currency
    #[arg(long, env = HOME_CURRENCY_ENV, default_value = "CAD")]
    home_currency: String,

    /// Superficial-loss window in days on each side of a sale
    #[arg(long, default_value_t = DEFAULT_WINDOW_DAYS)]
    window_days: u32,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    book: BookArgs,

    /// Show debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// A plan together with the context it was built in.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanReport {
    year: i32,
    sale_date: NaiveDate,
    #[serde(flatten)]
    plan: HarvestPlan,
    /// Candidates bought within the window of the sale date.
    superficial_risk: Vec<String>,
}

/// Main entry point for the plan command.
pub fn main() -> ExitCode {
    main_with_name("acb-plan")
}

/// Main entry point with custom binary name.
pub fn main_with_name(bin_name: &str) -> ExitCode {
    let args = Args::parse();

    if let Some(shell) = args.generate_completions {
        crate::cmd::completions::generate_completions::<Args>(shell, bin_name);
        return ExitCode::SUCCESS;
    }

    if args.prices.is_empty() {
        eprintln!("error: at least one --price SYMBOL=PRICE is required");
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
    let book = args.book.open()?;
    let options = EngineOptions::default()
        .with_window_days(args.window_days)
        .with_home_currency(&args.home_currency);
    let ledger = compute_ledger_with(&book.transactions, &options)
        .with_context(|| format!("failed to compute ledger from {}", book.path.display()))?;

    let sale_date = args.on.unwrap_or_else(|| Local::now().date_naive());
    let year = args.year.unwrap_or_else(|| sale_date.year());
    let report = build_report(args, &book, &ledger, year, sale_date)?;

    let mut stdout = io::stdout().lock();
    if args.json {
        serde_json::to_writer_pretty(&mut stdout, &report)?;
        writeln!(stdout)?;
    } else {
        write_text(&report, &args.home_currency, &mut stdout)?;
    }
    Ok(())
}

fn build_report(
    args: &Args,
    book: &TransactionBook,
    ledger: &Ledger,
    year: i32,
    sale_date: NaiveDate,
) -> Result<PlanReport> {
    let net_realized = ledger
        .tax_years()
        .iter()
        .find(|s| s.year == year)
        .map_or(Decimal::ZERO, |s| s.net);
    debug!(year, %net_realized, "planning against net realized");

    let planner = args.prices.iter().fold(
        HarvestPlanner::new(&args.home_currency),
        |planner, (symbol, price)| planner.with_price(symbol.to_uppercase(), *price),
    );
    let planner = args.fx_rates.iter().fold(planner, |planner, (currency, rate)| {
        planner.with_fx_rate(currency.to_uppercase(), *rate)
    });
    let plan = planner
        .plan(&ledger.positions(), net_realized)
        .context("cannot build plan")?;

    let repurchases = RepurchaseIndex::build(&book.transactions);
    let sale_at = sale_date.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN));
    let superficial_risk = plan
        .candidates
        .iter()
        .filter(|c| repurchases.has_buy_within(&c.symbol, sale_at, args.window_days))
        .map(|c| c.symbol.clone())
        .collect();

    Ok(PlanReport {
        year,
        sale_date,
        plan,
        superficial_risk,
    })
}

fn write_text<W: Write>(report: &PlanReport, home: &str, writer: &mut W) -> Result<()> {
    let money = |v: Decimal| format_money(v, 2);
    let plan = &report.plan;

    writeln!(
        writer,
        "Net realized in {}: {} {home}",
        report.year,
        money(plan.net_realized)
    )?;
    writeln!(writer)?;

    writeln!(writer, "Full disposal at target price")?;
    writeln!(
        writer,
        "{:<10}  {:>12}  {:>12}  {:>8}  {:>16}  {:>16}",
        "Symbol", "Shares", "Target", "Fx", "Proceeds", "Gain/Loss"
    )?;
    writeln!(writer, "{}", "-".repeat(84))?;
    for d in &plan.disposals {
        writeln!(
            writer,
            "{:<10}  {:>12}  {:>12}  {:>8}  {:>16}  {:>16}",
            d.symbol,
            format_shares(d.shares),
            money(d.target_price),
            d.fx_rate.normalize(),
            money(d.proceeds),
            money(d.gain_loss),
        )?;
    }
    writeln!(writer)?;

    if plan.candidates.is_empty() {
        writeln!(writer, "No priced position is below its cost per share")?;
        return Ok(());
    }
    writeln!(writer, "Harvest candidates")?;
    writeln!(
        writer,
        "{:<10}  {:>14}  {:>12}  {:>16}  {:<6}",
        "Symbol", "Loss/share", "Sell", "Deduction", "Offset"
    )?;
    writeln!(writer, "{}", "-".repeat(68))?;
    for c in &plan.candidates {
        writeln!(
            writer,
            "{:<10}  {:>14}  {:>12}  {:>16}  {:<6}",
            c.symbol,
            money(c.unrealized_per_share),
            format_shares(c.suggested_shares),
            money(c.predicted_deduction),
            if c.full_offset { "full" } else { "partial" },
        )?;
    }
    for symbol in &report.superficial_risk {
        writeln!(
            writer,
            "warning: {symbol} was bought near {}; a loss realized then may be superficial",
            report.sale_date
        )?;
    }
    Ok(())
}
