//! Plain-text rendering of ledger entries and summaries.
//!
//! Money is shown rounded to a fixed number of places with thousands
//! separators; share counts are shown with trailing zeros removed.

use crate::{LedgerEntry, PositionSummary, TaxYearSummary, TransactionKind};
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt::Write;

/// Formatter configuration.
#[derive(Debug, Clone)]
pub struct FormatConfig {
    /// Decimal places for money figures (default: 2).
    pub money_places: u32,
    /// Home currency label shown in headers (default: `CAD`).
    pub home_currency: String,
    /// Column separator.
    pub separator: String,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            money_places: 2,
            home_currency: "CAD".to_string(),
            separator: "  ".to_string(),
        }
    }
}

impl FormatConfig {
    /// Create a config labelled with the given home currency.
    #[must_use]
    pub fn with_home_currency(currency: impl Into<String>) -> Self {
        Self {
            home_currency: currency.into(),
            ..Default::default()
        }
    }
}

/// Format a money figure, e.g. `-1,234.50`.
pub fn format_money(value: Decimal, places: u32) -> String {
    let rounded = value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded < Decimal::ZERO;
    let text = format!("{:.*}", places as usize, rounded.abs());
    let (whole, fraction) = match text.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (text.as_str(), None),
    };

    let mut grouped = String::with_capacity(text.len() + whole.len() / 3 + 1);
    if negative {
        grouped.push('-');
    }
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(fraction) = fraction {
        grouped.push('.');
        grouped.push_str(fraction);
    }
    grouped
}

/// Format a share count without trailing zeros.
pub fn format_shares(value: Decimal) -> String {
    value.normalize().to_string()
}

/// Format one audit-trail line for a ledger entry.
pub fn format_entry(entry: &LedgerEntry, config: &FormatConfig) -> String {
    let txn = &entry.transaction;
    let money = |v: Decimal| format_money(v, config.money_places);
    let sep = &config.separator;

    let mut out = String::new();
    let _ = write!(
        out,
        "{}{sep}{:<5}{sep}{:<10}{sep}{:>12}",
        txn.timestamp.format("%Y-%m-%d %H:%M"),
        txn.kind.as_str(),
        txn.symbol,
        format_shares(txn.quantity),
    );
    match txn.kind {
        TransactionKind::Split => {
            let _ = write!(out, "{sep}{:>26}", "");
        }
        TransactionKind::Buy | TransactionKind::Sell => {
            let _ = write!(
                out,
                "{sep}{:>12} {:<3}{sep}fx {:<8}",
                money(txn.price),
                txn.currency,
                txn.fx_rate.normalize()
            );
        }
    }
    let _ = write!(
        out,
        "{sep}{:>14} -> {:<14}{sep}{:>12} sh{sep}{:>12}/sh",
        money(entry.before.cost_pool),
        money(entry.after.cost_pool),
        format_shares(entry.after.shares),
        money(entry.cost_per_share),
    );
    if entry.is_disposal() {
        let _ = write!(out, "{sep}G/L {:>12}", money(entry.realized_gain_loss));
    }
    if entry.superficial {
        let _ = write!(out, "{sep}SUPERFICIAL (+{} to pool)", money(entry.denied_loss));
    }
    out
}

/// Format a table of open positions.
pub fn format_positions(positions: &[PositionSummary], config: &FormatConfig) -> String {
    let money = |v: Decimal| format_money(v, config.money_places);
    let sep = &config.separator;
    let cost_header = format!("Cost pool ({})", config.home_currency);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<10}{sep}{:>12}{sep}{:>18}{sep}{:>14}{sep}{:>18}{sep}{:<4}{sep}{:>10}",
        "Symbol", "Shares", cost_header, "Per share", "Native cost", "Cur", "Last fx"
    );
    let _ = writeln!(out, "{}", "-".repeat(100));
    for p in positions {
        let _ = writeln!(
            out,
            "{:<10}{sep}{:>12}{sep}{:>18}{sep}{:>14}{sep}{:>18}{sep}{:<4}{sep}{:>10}",
            p.symbol,
            format_shares(p.shares),
            money(p.cost_pool),
            money(p.cost_per_share),
            money(p.native_cost),
            p.currency,
            p.last_fx_rate.normalize(),
        );
    }
    out
}

/// Format a table of tax-year summaries.
pub fn format_tax_years(summaries: &[TaxYearSummary], config: &FormatConfig) -> String {
    let money = |v: Decimal| format_money(v, config.money_places);
    let sep = &config.separator;

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<6}{sep}{:>16}{sep}{:>16}{sep}{:>16}",
        "Year", "Gains", "Losses", "Net"
    );
    let _ = writeln!(out, "{}", "-".repeat(60));
    for s in summaries {
        let _ = writeln!(
            out,
            "{:<6}{sep}{:>16}{sep}{:>16}{sep}{:>16}",
            s.year,
            money(s.gains),
            money(s.losses),
            money(s.net),
        );
    }
    out
}
