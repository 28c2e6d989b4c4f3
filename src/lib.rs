//! # fints-ofx
//!
//! Exports bank account statements as Open Financial Exchange (OFX 2.2)
//! documents that personal finance software can import.
//!
//! ## Design Principles
//!
//! - **Streaming output**: documents are written element by element, in call order
//! - **Strict nesting**: the writer tracks open elements and never auto-closes
//! - **Exact amounts**: money stays in integer minor units until formatted via `rust_decimal`
//! - **One file per account**: each account owns its writer and sink for the duration of its export
//!
//! ## Example
//!
//! ```no_run
//! use fints_ofx::{AppConfig, CsvConnector, ExportOptions, Exporter};
//!
//! let config = AppConfig::load("config.yaml").unwrap();
//! let exporter = Exporter::new(CsvConnector::new("exports"), ExportOptions::default());
//! exporter.run(&config, &mut std::io::stdout()).unwrap();
//! ```

pub mod account;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod money;
pub mod statement;
pub mod transaction;
pub mod writer;

pub use account::{BankAccountRef, RemoteAccount};
pub use client::{BankingClient, Connector, CsvConnector};
pub use config::{AccountConfig, AppConfig, DateRange, Institution};
pub use engine::{output_filename, ExportOptions, Exporter};
pub use error::{ExportError, Phase, Result};
pub use money::{Currency, DecimalMoneyFormatter, LocaleMoneyFormatter, Money, MoneyFormatter};
pub use statement::StatementExporter;
pub use transaction::{CreditDebit, Statement, Transaction, TransactionRecord};
pub use writer::DocumentWriter;
