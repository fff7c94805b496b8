//! Adjusted cost base CLI tools.
//!
//! This crate provides the command-line front end over the acbledger
//! engine and transaction book:
//!
//! - `acb-import`: Import broker exports into the book
//! - `acb-edit`: Add, remove, or clear transactions by hand
//! - `acb-report`: Positions, tax years, the ledger, and a portfolio overview
//! - `acb-plan`: Tax-loss harvest planning at target prices
//!
//! # Example Usage
//!
//! ```bash
//! acb-import flex_query.csv
//! acb-report tax --year 2024
//! acb-report ledger --symbol AAPL --csv > aapl.csv
//! acb-plan --price AAPL=150 --fx USD=1.36
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cmd;
