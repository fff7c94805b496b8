//! Registry for importers.

use crate::{CsvImporter, IbkrImporter, ImportResult, Importer, ImporterConfig};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

/// Registry of importers.
///
/// The registry holds a collection of importers and can automatically
/// identify which importer to use for a given file. Importers are tried in
/// registration order.
pub struct ImporterRegistry {
    importers: Vec<Arc<dyn Importer>>,
}

impl ImporterRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            importers: Vec::new(),
        }
    }

    /// A registry with the built-in importers, most specific first.
    pub fn with_defaults(config: &ImporterConfig) -> Self {
        let mut registry = Self::new();
        registry.register(IbkrImporter::new(config.clone()));
        registry.register(CsvImporter::new(config.clone()));
        registry
    }

    /// Register a new importer.
    pub fn register(&mut self, importer: impl Importer + 'static) {
        self.importers.push(Arc::new(importer));
    }

    /// Find an importer that can handle the given file.
    pub fn identify(&self, path: &Path) -> Option<Arc<dyn Importer>> {
        self.importers
            .iter()
            .find(|importer| importer.identify(path))
            .cloned()
    }

    /// Look up an importer by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Importer>> {
        self.importers
            .iter()
            .find(|importer| importer.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Extract transactions from a file using the appropriate importer.
    pub fn extract(&self, path: &Path) -> Result<ImportResult> {
        let importer = self
            .identify(path)
            .with_context(|| format!("No importer found for file: {}", path.display()))?;

        importer
            .extract(path)
            .with_context(|| format!("Failed to extract from: {}", path.display()))
    }

    /// List all registered importers.
    pub fn list_importers(&self) -> Vec<(&str, &str)> {
        self.importers
            .iter()
            .map(|i| (i.name(), i.description()))
            .collect()
    }

    /// Get the number of registered importers.
    pub fn len(&self) -> usize {
        self.importers.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.importers.is_empty()
    }
}

impl Default for ImporterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
