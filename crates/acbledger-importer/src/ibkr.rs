//! Interactive Brokers Flex Query importer.
//!
//! A Flex Query CSV export holds several sections back to back, each
//! introduced by its own header row. Two are read here:
//!
//! - Trades, whose header mentions `FXRateToBase` and `TradePrice`. Columns
//!   are currency, fx rate to base, symbol, date-time, signed quantity,
//!   trade price and commission.
//! - Corporate actions, whose header mentions `Report Date`, `Quantity` and
//!   `Description`. Columns are currency, symbol, report date, quantity,
//!   description and type. Only forward splits (`FS`) are imported.
//!
//! Rows in any other section are ignored.

use crate::config::ImporterConfig;
use crate::parse::{currency_for_symbol, parse_datetime, parse_decimal};
use crate::{ImportResult, Importer};
use acbledger_core::{RawTransaction, TransactionKind};
use anyhow::Result;
use rust_decimal::Decimal;
use std::path::Path;
use tracing::{debug, warn};

/// Section of the export the reader is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Trades,
    CorporateActions,
}

impl Section {
    /// Detect a section header row.
    fn from_header(record: &csv::StringRecord) -> Option<Self> {
        let joined = record.iter().collect::<Vec<_>>().join(",").to_lowercase();
        if joined.contains("fxratetobase") && joined.contains("tradeprice") {
            Some(Self::Trades)
        } else if joined.contains("report date")
            && joined.contains("quantity")
            && joined.contains("description")
        {
            Some(Self::CorporateActions)
        } else {
            None
        }
    }
}

/// Importer for Interactive Brokers Flex Query CSV exports.
pub struct IbkrImporter {
    config: ImporterConfig,
}

impl IbkrImporter {
    /// Create an importer with the given configuration.
    pub const fn new(config: ImporterConfig) -> Self {
        Self { config }
    }

    /// Whether `content` looks like a Flex Query export with a trades section.
    pub fn identify_content(content: &str) -> bool {
        let lower = content.to_lowercase();
        lower.contains("fxratetobase") && lower.contains("tradeprice")
    }

    fn trade_row(&self, row: &Row<'_>, result: &mut ImportResult) {
        let symbol = row.field(2);
        if symbol.is_empty() || symbol == "Symbol" || self.config.is_ignored(symbol) {
            return;
        }

        let Some(timestamp) = parse_datetime(row.field(3), self.config.default_time) else {
            row.skip(result, format!("unparseable date-time '{}'", row.field(3)));
            return;
        };
        let quantity = match parse_decimal(row.field(4)) {
            Some(q) if !q.is_zero() => q,
            _ => {
                row.skip(result, format!("unusable quantity '{}'", row.field(4)));
                return;
            }
        };

        let kind = if quantity > Decimal::ZERO {
            TransactionKind::Buy
        } else {
            TransactionKind::Sell
        };
        let price = parse_decimal(row.field(5)).unwrap_or(Decimal::ZERO);
        let commission = parse_decimal(row.field(6)).map_or(Decimal::ZERO, |c| c.abs());
        let fx_rate = parse_decimal(row.field(1))
            .filter(|fx| !fx.is_zero())
            .unwrap_or(Decimal::ONE);

        let txn = RawTransaction::new(kind, symbol, timestamp, quantity.abs(), price)
            .with_currency(row.currency(0, symbol))
            .with_commission(commission)
            .with_fx_rate(fx_rate);
        let id = self.config.row_id("trade", row.line, &txn);
        row.push(result, txn.with_id(id));
    }

    fn corporate_action_row(&self, row: &Row<'_>, result: &mut ImportResult) {
        let symbol = row.field(1);
        let action = row.field(5);
        if symbol.is_empty() || symbol == "Symbol" || action.is_empty() {
            return;
        }
        if action != "FS" {
            debug!(line = row.line, symbol, action, "corporate action type not imported");
            return;
        }

        let Some(timestamp) = parse_datetime(row.field(2), self.config.default_time) else {
            row.skip(result, format!("unparseable report date '{}'", row.field(2)));
            return;
        };
        let delta = match parse_decimal(row.field(3)) {
            Some(q) if !q.is_zero() => q,
            _ => {
                row.skip(result, format!("unusable split quantity '{}'", row.field(3)));
                return;
            }
        };

        let mut txn =
            RawTransaction::split(symbol, timestamp, delta).with_currency(row.currency(0, symbol));
        let description = row.field(4);
        if !description.is_empty() {
            txn = txn.with_description(description);
        }
        let id = self.config.row_id("split", row.line, &txn);
        row.push(result, txn.with_id(id));
    }
}

impl Importer for IbkrImporter {
    fn name(&self) -> &'static str {
        "ibkr"
    }

    fn identify(&self, path: &Path) -> bool {
        std::fs::read_to_string(path).is_ok_and(|content| Self::identify_content(&content))
    }

    fn extract_str(&self, content: &str) -> Result<ImportResult> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let mut result = ImportResult::empty();
        let mut section = Section::None;
        let mut saw_section = false;

        for record in reader.records() {
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    let line = e.position().map_or(0, csv::Position::line);
                    warn!(line, error = %e, "skipping malformed row");
                    result.warnings.push(format!("line {line}: parse error: {e}"));
                    continue;
                }
            };
            if record.iter().all(str::is_empty) {
                continue;
            }
            if let Some(next) = Section::from_header(&record) {
                section = next;
                saw_section = true;
                continue;
            }

            let row = Row {
                record: &record,
                line: record.position().map_or(0, csv::Position::line),
            };
            match section {
                Section::Trades => self.trade_row(&row, &mut result),
                Section::CorporateActions => self.corporate_action_row(&row, &mut result),
                Section::None => {}
            }
        }

        if !saw_section {
            result
                .warnings
                .push("no trades or corporate actions section found".to_string());
        }
        Ok(result)
    }

    fn description(&self) -> &'static str {
        "Interactive Brokers Flex Query CSV (trades and forward splits)"
    }
}

/// One data row with its source line number.
struct Row<'a> {
    record: &'a csv::StringRecord,
    line: u64,
}

impl Row<'_> {
    fn field(&self, index: usize) -> &str {
        self.record.get(index).unwrap_or("")
    }

    fn currency(&self, index: usize, symbol: &str) -> String {
        let currency = self.field(index);
        if currency.is_empty() {
            currency_for_symbol(symbol).to_string()
        } else {
            currency.to_string()
        }
    }

    fn skip(&self, result: &mut ImportResult, reason: String) {
        warn!(line = self.line, %reason, "skipping row");
        result.warnings.push(format!("line {}: {reason}", self.line));
    }

    fn push(&self, result: &mut ImportResult, txn: RawTransaction) {
        match txn.validate() {
            Ok(()) => result.transactions.push(txn),
            Err(e) => self.skip(result, e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use rust_decimal_macros::dec;

    const EXPORT: &str = r#""CurrencyPrimary","FXRateToBase","Symbol","DateTime","Quantity","TradePrice","IBCommission"
"USD","1.3512","AAPL","20240115;093000","10","185.50","-1.00"
"USD","1.3498","AAPL","2024-02-20;14:05:10","-4","190.25","-1.02"
"USD","1","USD.CAD","20240115;093000","1000","1.35","-2"
"CAD","1","SHOP.TO","2024-03-01 10:00:00","20","101.00","-4.95"
"","","Symbol","","","",""
"CurrencyPrimary","Symbol","Report Date","Quantity","Description","Type"
"USD","NVDA","20240610","90","NVDA(US67066G1040) SPLIT 10 FOR 1","FS"
"USD","XYZ","20240611","5","XYZ SPINOFF","SO"
"#;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    fn import(content: &str) -> ImportResult {
        IbkrImporter::new(ImporterConfig::default())
            .extract_str(content)
            .unwrap()
    }

    #[test]
    fn test_trades_and_splits() {
        let result = import(EXPORT);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
        assert_eq!(result.transactions.len(), 4);

        let buy = &result.transactions[0];
        assert!(buy.id.starts_with("trade-2-"), "{}", buy.id);
        assert_eq!(buy.kind, TransactionKind::Buy);
        assert_eq!(buy.symbol, "AAPL");
        assert_eq!(buy.currency, "USD");
        assert_eq!(buy.timestamp, at(2024, 1, 15, 9, 30, 0));
        assert_eq!(buy.quantity, dec!(10));
        assert_eq!(buy.price, dec!(185.50));
        assert_eq!(buy.commission, dec!(1.00));
        assert_eq!(buy.fx_rate, dec!(1.3512));

        let sell = &result.transactions[1];
        assert_eq!(sell.kind, TransactionKind::Sell);
        assert_eq!(sell.quantity, dec!(4));
        assert_eq!(sell.timestamp, at(2024, 2, 20, 14, 5, 10));

        let shop = &result.transactions[2];
        assert_eq!(shop.currency, "CAD");
        assert_eq!(shop.fx_rate, Decimal::ONE);

        let split = &result.transactions[3];
        assert!(split.id.starts_with("split-8-"), "{}", split.id);
        assert_eq!(split.kind, TransactionKind::Split);
        assert_eq!(split.quantity, dec!(90));
        assert_eq!(split.price, Decimal::ZERO);
        assert_eq!(split.timestamp, at(2024, 6, 10, 12, 0, 0));
        assert_eq!(
            split.description.as_deref(),
            Some("NVDA(US67066G1040) SPLIT 10 FOR 1")
        );
    }

    #[test]
    fn test_bad_rows_become_warnings() {
        let content = "\
CurrencyPrimary,FXRateToBase,Symbol,DateTime,Quantity,TradePrice,IBCommission
USD,1.35,AAPL,not-a-date,10,185,-1
USD,1.35,AAPL,20240115;093000,abc,185,-1
USD,1.35,AAPL,20240115;093000,0,185,-1
USD,,AAPL,20240116,5,oops,
";
        let result = import(content);
        assert_eq!(result.warnings.len(), 3);
        assert!(result.warnings[0].starts_with("line 2:"));

        assert_eq!(result.transactions.len(), 1);
        let txn = &result.transactions[0];
        assert_eq!(txn.price, Decimal::ZERO);
        assert_eq!(txn.commission, Decimal::ZERO);
        assert_eq!(txn.fx_rate, Decimal::ONE);
        assert_eq!(txn.timestamp, at(2024, 1, 16, 12, 0, 0));
    }

    #[test]
    fn test_currency_fallback_and_batch_tag() {
        let content = "\
CurrencyPrimary,FXRateToBase,Symbol,DateTime,Quantity,TradePrice,IBCommission
,1,RY.TO,20240115,10,130,0
,1,0700.HK,20240115,10,300,0
,1.35,MSFT,20240115,10,400,0
";
        let config = ImporterConfig::builder().batch_tag("jan").build();
        let result = IbkrImporter::new(config).extract_str(content).unwrap();

        let currencies: Vec<_> = result.transactions.iter().map(|t| t.currency.as_str()).collect();
        assert_eq!(currencies, vec!["CAD", "HKD", "USD"]);
        assert!(result.transactions[0].id.starts_with("jan-trade-2-"));
    }

    #[test]
    fn test_separate_exports_get_distinct_ids() {
        let header = "CurrencyPrimary,FXRateToBase,Symbol,DateTime,Quantity,TradePrice,IBCommission\n";
        let first = import(&format!("{header}USD,1.35,AAPL,20230315;100000,10,150,-1\n"));
        let second = import(&format!("{header}USD,1.36,MSFT,20240315;100000,5,400,-1\n"));

        let a = &first.transactions[0];
        let b = &second.transactions[0];
        assert!(a.id.starts_with("trade-2-"));
        assert!(b.id.starts_with("trade-2-"));
        assert_ne!(a.id, b.id);

        let again = import(&format!("{header}USD,1.35,AAPL,20230315;100000,10,150,-1\n"));
        assert_eq!(again.transactions[0].id, a.id);
    }

    #[test]
    fn test_rows_before_any_section_are_ignored() {
        let result = import("Statement,Header,Field\nfoo,bar,baz\n");
        assert!(result.transactions.is_empty());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_identify_content() {
        assert!(IbkrImporter::identify_content(EXPORT));
        assert!(!IbkrImporter::identify_content("id,symbol,currency\n"));
    }
}
