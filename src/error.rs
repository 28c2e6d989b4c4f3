//! Error types for the OFX exporter.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for exporter operations
pub type Result<T> = std::result::Result<T, ExportError>;

/// Step of a per-account export during which an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connect,
    Resolve,
    Fetch,
    Write,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Connect => "connect",
            Phase::Resolve => "resolve",
            Phase::Fetch => "fetch",
            Phase::Write => "write",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while exporting statements.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Generic I/O failure on an already opened resource
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The output document could not be created
    #[error("cannot open output file {}: {source}", path.display())]
    Sink {
        path: PathBuf,
        source: std::io::Error,
    },

    /// No configuration file in any of the searched locations
    #[error("config.yaml not found. Please run fints-ofx configure.")]
    ConfigNotFound,

    /// Configuration file exists but could not be read
    #[error("cannot read configuration {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Configuration is not valid YAML or does not match the schema
    #[error("invalid configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Configuration parsed but failed validation
    #[error("invalid configuration at {field}: {message}")]
    InvalidConfig { field: String, message: String },

    /// `configure` refuses to overwrite an existing file
    #[error("configuration file {} already exists", path.display())]
    ConfigExists { path: PathBuf },

    /// Not a three-letter ISO 4217 code
    #[error("invalid currency code '{0}'")]
    InvalidCurrency(String),

    /// A configured account is missing from the bank's account list
    #[error("account {account} not found at institution {institution}")]
    AccountNotFound {
        institution: String,
        account: String,
    },

    /// Element open/close discipline violated inside the document writer
    #[error("document structure violated: {0}")]
    Structural(String),

    /// Transaction magnitude does not fit a signed amount
    #[error("amount {0} exceeds the supported range")]
    AmountOutOfRange(u64),

    /// Failure reported by the banking client
    #[error("banking protocol error: {0}")]
    Protocol(String),

    /// CSV parsing error inside the CSV banking client
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// Failure that concerns a whole institution rather than one account
    #[error("institution '{institution}', {phase} failed: {source}")]
    Institution {
        institution: String,
        phase: Phase,
        #[source]
        source: Box<ExportError>,
    },

    /// Failure tagged with the account and export step it happened in
    #[error("institution '{institution}', account '{account}', {phase} failed: {source}")]
    Account {
        institution: String,
        account: String,
        phase: Phase,
        #[source]
        source: Box<ExportError>,
    },
}

impl ExportError {
    /// Wraps `self` with the institution/account/phase it occurred in.
    pub fn in_account(self, institution: &str, account: &str, phase: Phase) -> Self {
        ExportError::Account {
            institution: institution.to_string(),
            account: account.to_string(),
            phase,
            source: Box::new(self),
        }
    }

    /// Wraps `self` with the institution and phase it occurred in.
    pub fn in_institution(self, institution: &str, phase: Phase) -> Self {
        ExportError::Institution {
            institution: institution.to_string(),
            phase,
            source: Box::new(self),
        }
    }

    pub(crate) fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        ExportError::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }
}
