//! Configuration for importers.

use acbledger_core::RawTransaction;
use chrono::NaiveTime;
use sha2::{Digest, Sha256};
use std::fmt::Write;

/// Bytes of the content digest kept in generated ids.
const FINGERPRINT_BYTES: usize = 6;

/// Symbols skipped by default: currency conversions reported as trades.
pub const DEFAULT_IGNORED_SYMBOLS: [&str; 2] = ["USD.CAD", "CAD.USD"];

/// Settings shared by all importers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImporterConfig {
    /// Prefix for generated transaction ids.
    pub batch_tag: Option<String>,
    /// Symbols whose rows are skipped.
    pub ignored_symbols: Vec<String>,
    /// Time of day used when a row carries only a date.
    pub default_time: NaiveTime,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        ImporterConfigBuilder::new().build()
    }
}

impl ImporterConfig {
    /// Start building a configuration.
    pub fn builder() -> ImporterConfigBuilder {
        ImporterConfigBuilder::new()
    }

    /// Whether rows for `symbol` should be skipped.
    pub fn is_ignored(&self, symbol: &str) -> bool {
        self.ignored_symbols.iter().any(|s| s == symbol)
    }

    /// Build a transaction id from a per-row base id.
    pub fn make_id(&self, base: &str) -> String {
        match &self.batch_tag {
            Some(tag) => format!("{tag}-{base}"),
            None => base.to_string(),
        }
    }

    /// Id for an imported row: `<kind>-<line>-<fingerprint>`, batch-tagged.
    ///
    /// The fingerprint is a digest of the row's content, so importing the
    /// same file again yields the same ids while rows from different files
    /// that share a line number do not collide.
    pub fn row_id(&self, kind: &str, line: u64, txn: &RawTransaction) -> String {
        self.make_id(&format!("{kind}-{line}-{}", fingerprint(txn)))
    }
}

/// Hex prefix of a SHA-256 digest over the fields that identify a transaction.
fn fingerprint(txn: &RawTransaction) -> String {
    let mut hasher = Sha256::new();
    for field in [
        txn.kind.as_str().to_string(),
        txn.symbol.clone(),
        txn.currency.clone(),
        txn.timestamp.to_string(),
        txn.quantity.normalize().to_string(),
        txn.price.normalize().to_string(),
        txn.commission.normalize().to_string(),
        txn.fx_rate.normalize().to_string(),
        txn.description.clone().unwrap_or_default(),
    ] {
        hasher.update(field.as_bytes());
        hasher.update(b"\x1f");
    }

    let digest = hasher.finalize();
    digest[..FINGERPRINT_BYTES]
        .iter()
        .fold(String::with_capacity(FINGERPRINT_BYTES * 2), |mut hex, byte| {
            let _ = write!(hex, "{byte:02x}");
            hex
        })
}

/// Builder for [`ImporterConfig`].
pub struct ImporterConfigBuilder {
    config: ImporterConfig,
}

impl ImporterConfigBuilder {
    /// Create a builder with the default settings.
    pub fn new() -> Self {
        Self {
            config: ImporterConfig {
                batch_tag: None,
                ignored_symbols: DEFAULT_IGNORED_SYMBOLS
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
                default_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN),
            },
        }
    }

    /// Set the id prefix.
    pub fn batch_tag(mut self, tag: impl Into<String>) -> Self {
        self.config.batch_tag = Some(tag.into());
        self
    }

    /// Skip rows for one more symbol.
    pub fn ignore_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.config.ignored_symbols.push(symbol.into());
        self
    }

    /// Drop the default ignore list.
    pub fn clear_ignored(mut self) -> Self {
        self.config.ignored_symbols.clear();
        self
    }

    /// Set the time used for date-only rows.
    pub const fn default_time(mut self, time: NaiveTime) -> Self {
        self.config.default_time = time;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ImporterConfig {
        self.config
    }
}

impl Default for ImporterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
