//! Plain CSV importer.
//!
//! Reads one transaction per row from a file with the header
//! `id,symbol,currency,timestamp,kind,quantity,price,commission,fx_rate,description`.
//! Only `symbol`, `timestamp`, `kind` and `quantity` are required; the other
//! columns may be missing or empty.

use crate::config::ImporterConfig;
use crate::parse::{currency_for_symbol, parse_datetime, parse_decimal};
use crate::{ImportResult, Importer};
use acbledger_core::transaction::timestamp_format;
use acbledger_core::{RawTransaction, TransactionKind};
use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use tracing::warn;

/// Columns that must be present in the header.
const REQUIRED_COLUMNS: [&str; 4] = ["symbol", "timestamp", "kind", "quantity"];

/// One row as read from the file, before any field is interpreted.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    id: String,
    symbol: String,
    #[serde(default)]
    currency: String,
    timestamp: String,
    kind: String,
    quantity: String,
    #[serde(default)]
    price: String,
    #[serde(default)]
    commission: String,
    #[serde(default)]
    fx_rate: String,
    #[serde(default)]
    description: String,
}

/// CSV file importer.
pub struct CsvImporter {
    config: ImporterConfig,
}

impl CsvImporter {
    /// Create an importer with the given configuration.
    pub const fn new(config: ImporterConfig) -> Self {
        Self { config }
    }

    /// Whether `content` starts with a header this importer understands.
    pub fn identify_content(content: &str) -> bool {
        let Some(header) = content.lines().next() else {
            return false;
        };
        let columns: Vec<String> = header
            .split(',')
            .map(|c| c.trim().trim_matches('"').to_lowercase())
            .collect();
        REQUIRED_COLUMNS
            .iter()
            .all(|required| columns.iter().any(|c| c == required))
    }

    fn parse_row(&self, row: CsvRow, line: u64) -> Result<RawTransaction> {
        let symbol = row.symbol.trim();
        let kind: TransactionKind = row
            .kind
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?;
        let timestamp = timestamp_format::parse(&row.timestamp)
            .ok()
            .or_else(|| parse_datetime(&row.timestamp, self.config.default_time))
            .with_context(|| format!("unparseable timestamp '{}'", row.timestamp))?;
        let quantity = parse_decimal(&row.quantity)
            .with_context(|| format!("unparseable quantity '{}'", row.quantity))?;

        let currency = if row.currency.trim().is_empty() {
            currency_for_symbol(symbol).to_string()
        } else {
            row.currency.trim().to_string()
        };

        let mut txn = RawTransaction::new(
            kind,
            symbol,
            timestamp,
            quantity,
            parse_decimal(&row.price).unwrap_or(Decimal::ZERO),
        )
        .with_currency(currency)
        .with_commission(parse_decimal(&row.commission).unwrap_or(Decimal::ZERO))
        .with_fx_rate(parse_decimal(&row.fx_rate).unwrap_or(Decimal::ONE));
        if !row.description.trim().is_empty() {
            txn = txn.with_description(row.description.trim());
        }
        txn.id = if row.id.trim().is_empty() {
            self.config.row_id("csv", line, &txn)
        } else {
            row.id.trim().to_string()
        };

        txn.validate()?;
        Ok(txn)
    }
}

impl Importer for CsvImporter {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn identify(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
            && std::fs::read_to_string(path).is_ok_and(|content| Self::identify_content(&content))
    }

    fn extract_str(&self, content: &str) -> Result<ImportResult> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers = reader.headers().context("failed to read CSV header")?.clone();
        let lowered: Vec<String> = headers.iter().map(str::to_lowercase).collect();
        for required in REQUIRED_COLUMNS {
            if !lowered.iter().any(|h| h == required) {
                bail!("CSV header is missing the '{required}' column");
            }
        }
        let headers = csv::StringRecord::from(lowered);

        let mut result = ImportResult::empty();
        for record in reader.records() {
            let outcome = record.map_err(anyhow::Error::from).and_then(|record| {
                let line = record.position().map_or(0, csv::Position::line);
                record
                    .deserialize::<CsvRow>(Some(&headers))
                    .map_err(anyhow::Error::from)
                    .and_then(|row| self.parse_row(row, line))
                    .with_context(|| format!("line {line}"))
            });
            match outcome {
                Ok(txn) => result.transactions.push(txn),
                Err(e) => {
                    let message = format!("{e:#}");
                    warn!(%message, "skipping row");
                    result.warnings.push(message);
                }
            }
        }
        Ok(result)
    }

    fn description(&self) -> &'static str {
        "CSV with id, symbol, currency, timestamp, kind, quantity, price, commission, fx_rate, description"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    const CONTENT: &str = "\
id,symbol,currency,timestamp,kind,quantity,price,commission,fx_rate,description
b1,AAPL,USD,2024-01-15T09:30:00,BUY,10,185.50,1,1.35,first lot
,SHOP.TO,,2024-03-01 10:00:00,buy,20,101,4.95,,
s1,AAPL,USD,2024-02-20T14:05:10-05:00,SELL,4,190.25,1.02,1.3498,
sp,NVDA,USD,2024-06-10,SPLIT,90,0,0,1,10 for 1
";

    fn import(content: &str) -> ImportResult {
        CsvImporter::new(ImporterConfig::default())
            .extract_str(content)
            .unwrap()
    }

    #[test]
    fn test_csv_import_basic() {
        let result = import(CONTENT);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
        assert_eq!(result.transactions.len(), 4);

        let first = &result.transactions[0];
        assert_eq!(first.id, "b1");
        assert_eq!(first.kind, TransactionKind::Buy);
        assert_eq!(first.fx_rate, dec!(1.35));
        assert_eq!(first.description.as_deref(), Some("first lot"));

        let shop = &result.transactions[1];
        assert!(shop.id.starts_with("csv-3-"), "{}", shop.id);
        assert_eq!(shop.currency, "CAD");
        assert_eq!(shop.fx_rate, Decimal::ONE);
        assert_eq!(shop.description, None);

        let sell = &result.transactions[2];
        assert_eq!(
            sell.timestamp,
            NaiveDate::from_ymd_opt(2024, 2, 20)
                .unwrap()
                .and_hms_opt(14, 5, 10)
                .unwrap()
        );

        let split = &result.transactions[3];
        assert_eq!(split.kind, TransactionKind::Split);
        assert_eq!(split.timestamp.date(), NaiveDate::from_ymd_opt(2024, 6, 10).unwrap());
    }

    #[test]
    fn test_invalid_rows_are_reported() {
        let content = "\
symbol,timestamp,kind,quantity,price
AAPL,2024-01-15,DIVIDEND,10,1
AAPL,2024-01-15,BUY,-10,1
AAPL,someday,BUY,10,1
AAPL,2024-01-15,BUY,10,1
";
        let result = import(content);
        assert_eq!(result.transactions.len(), 1);
        assert_eq!(result.warnings.len(), 3);
        assert!(result.warnings[0].starts_with("line 2:"));
        assert!(result.warnings[2].contains("someday"));
        assert!(result.transactions[0].id.starts_with("csv-5-"));
    }

    #[test]
    fn test_missing_required_column() {
        let err = CsvImporter::new(ImporterConfig::default())
            .extract_str("symbol,timestamp,quantity\nAAPL,2024-01-15,1\n")
            .unwrap_err();
        assert!(err.to_string().contains("'kind'"));
    }

    #[test]
    fn test_identify_content() {
        assert!(CsvImporter::identify_content(CONTENT));
        assert!(CsvImporter::identify_content("Symbol,Kind,Timestamp,Quantity\n"));
        assert!(!CsvImporter::identify_content("Date,Description,Amount\n"));
        assert!(!CsvImporter::identify_content(""));
    }
}
