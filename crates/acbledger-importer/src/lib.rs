//! Import framework for acbledger.
//!
//! This crate turns broker exports into [`RawTransaction`]s ready for the
//! engine. Each file format is handled by a type implementing the
//! [`Importer`] trait; the [`ImporterRegistry`] picks the right one for a
//! file.
//!
//! Importers never fail on a single bad row. Rows that cannot be read are
//! skipped and reported in [`ImportResult::warnings`], so only well-formed
//! transactions reach the engine.
//!
//! # Example
//!
//! ```rust,no_run
//! use acbledger_importer::{extract_from_file, ImporterConfig};
//! use std::path::Path;
//!
//! let config = ImporterConfig::builder().batch_tag("2024").build();
//! let result = extract_from_file(Path::new("flex_query.csv"), &config)?;
//! for warning in &result.warnings {
//!     eprintln!("warning: {warning}");
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod csv_importer;
pub mod ibkr;
mod parse;
pub mod registry;

use acbledger_core::RawTransaction;
use anyhow::{Context, Result};
use std::path::Path;

pub use config::{ImporterConfig, ImporterConfigBuilder};
pub use csv_importer::CsvImporter;
pub use ibkr::IbkrImporter;
pub use parse::currency_for_symbol;
pub use registry::ImporterRegistry;

/// Result of an import operation.
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    /// The extracted transactions, in file order.
    pub transactions: Vec<RawTransaction>,
    /// Rows that were skipped, and why.
    pub warnings: Vec<String>,
}

impl ImportResult {
    /// Create a new import result.
    pub const fn new(transactions: Vec<RawTransaction>) -> Self {
        Self {
            transactions,
            warnings: Vec::new(),
        }
    }

    /// Create an empty import result.
    pub const fn empty() -> Self {
        Self {
            transactions: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add a warning to the result.
    #[must_use]
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    /// Append another result's transactions and warnings.
    pub fn merge(&mut self, other: Self) {
        self.transactions.extend(other.transactions);
        self.warnings.extend(other.warnings);
    }
}

/// Trait for file importers.
///
/// Implementors extract transactions from one export format.
pub trait Importer: Send + Sync {
    /// Returns the name of this importer.
    fn name(&self) -> &str;

    /// Check if this importer can handle the given file.
    fn identify(&self, path: &Path) -> bool;

    /// Extract transactions from file contents.
    fn extract_str(&self, content: &str) -> Result<ImportResult>;

    /// Extract transactions from the given file.
    fn extract(&self, path: &Path) -> Result<ImportResult> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        self.extract_str(&content)
    }

    /// Returns a description of what this importer handles.
    fn description(&self) -> &str {
        self.name()
    }
}

/// Extract transactions from a file, detecting its format.
pub fn extract_from_file(path: &Path, config: &ImporterConfig) -> Result<ImportResult> {
    ImporterRegistry::with_defaults(config).extract(path)
}

/// Extract transactions from file contents with the named importer.
pub fn extract_from_string(
    content: &str,
    format: &str,
    config: &ImporterConfig,
) -> Result<ImportResult> {
    let registry = ImporterRegistry::with_defaults(config);
    let importer = registry
        .get(format)
        .with_context(|| format!("Unknown import format: {format}"))?;
    importer.extract_str(content)
}
