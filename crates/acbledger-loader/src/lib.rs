//! Transaction book storage.
//!
//! The book is the persisted list of raw transactions, kept as a pretty
//! printed JSON array. Ledgers are never stored: they are recomputed from
//! the book whenever they are needed.
//!
//! # Example
//!
//! ```no_run
//! use acbledger_loader::{default_book_path, TransactionBook};
//!
//! let path = default_book_path().expect("no data directory");
//! let book = TransactionBook::open(&path)?;
//! println!("{} transactions", book.len());
//! # Ok::<(), acbledger_loader::BookError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use acbledger_core::RawTransaction;
use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Environment variable that overrides the book location.
pub const BOOK_ENV: &str = "ACBLEDGER_BOOK";

/// File name of the book inside the data directory.
pub const BOOK_FILE_NAME: &str = "transactions.json";

/// Errors that can occur while reading or writing the book.
#[derive(Debug, Error)]
pub enum BookError {
    /// IO error on the book file.
    #[error("failed to access {path}: {source}")]
    Io {
        /// The path that failed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The book file is not a valid transaction array.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// The book file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The transactions could not be encoded.
    #[error("failed to encode transactions: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Default book location: `<data dir>/acbledger/transactions.json`.
///
/// Returns `None` when the platform has no data directory.
pub fn default_book_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("acbledger").join(BOOK_FILE_NAME))
}

/// The persisted transaction list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionBook {
    /// Where the book is stored.
    pub path: PathBuf,
    /// Transactions in the order they were added.
    pub transactions: Vec<RawTransaction>,
}

impl TransactionBook {
    /// Load the book at `path`. A missing file is an empty book.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, BookError> {
        let path = path.into();
        let transactions = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => Vec::new(),
            Ok(content) => {
                serde_json::from_str(&content).map_err(|source| BookError::Parse {
                    path: path.clone(),
                    source,
                })?
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no book yet, starting empty");
                Vec::new()
            }
            Err(source) => return Err(BookError::Io { path, source }),
        };
        Ok(Self { path, transactions })
    }

    /// Write the book back to its path.
    ///
    /// The file is replaced atomically: the JSON is written to a temporary
    /// file next to it and renamed over it. An empty book removes the file.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be created or the file cannot be written.
    pub fn save(&self) -> Result<(), BookError> {
        let io_err = |source: io::Error| BookError::Io {
            path: self.path.clone(),
            source,
        };

        if self.transactions.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(io_err(e)),
            };
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(&self.transactions).map_err(BookError::Encode)?;
        let temp = temp_path(&self.path);
        let written = fs::File::create(&temp).and_then(|mut file| {
            file.write_all(json.as_bytes())?;
            file.write_all(b"\n")?;
            file.sync_all()
        });
        if let Err(e) = written.and_then(|()| fs::rename(&temp, &self.path)) {
            if let Err(cleanup) = fs::remove_file(&temp) {
                debug!(path = %temp.display(), error = %cleanup, "temporary book file not removed");
            }
            return Err(io_err(e));
        }

        debug!(path = %self.path.display(), count = self.transactions.len(), "book saved");
        Ok(())
    }

    /// Add transactions whose ids are not already in the book.
    ///
    /// Returns the number added. Duplicates within `incoming` are also
    /// dropped after their first occurrence.
    pub fn append(&mut self, incoming: impl IntoIterator<Item = RawTransaction>) -> usize {
        let mut seen: HashSet<String> = self.transactions.iter().map(|t| t.id.clone()).collect();
        let before = self.transactions.len();
        for txn in incoming {
            if seen.insert(txn.id.clone()) {
                self.transactions.push(txn);
            } else {
                debug!(id = %txn.id, "skipping transaction already in book");
            }
        }
        self.transactions.len() - before
    }

    /// Remove the transaction with `id`. Returns whether one was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.transactions.len();
        self.transactions.retain(|t| t.id != id);
        self.transactions.len() != before
    }

    /// Remove every transaction.
    pub fn clear(&mut self) {
        self.transactions.clear();
    }

    /// The transaction with `id`, if present.
    pub fn get(&self, id: &str) -> Option<&RawTransaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    /// Number of transactions.
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Whether the book has no transactions.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

/// Sibling path used while writing.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
