//! Banking client interface and the CSV export backed implementation.
//!
//! The exporter never speaks a banking protocol itself. It asks a
//! [`Connector`] for one [`BankingClient`] session per institution and uses
//! that session to enumerate accounts and fetch statements.

use crate::account::RemoteAccount;
use crate::config::{DateRange, Institution};
use crate::engine::normalize_name;
use crate::error::{ExportError, Result};
use crate::transaction::{Statement, TransactionRecord};
use csv::{ReaderBuilder, Trim};
use log::{debug, warn};
use std::fs::File;
use std::path::{Path, PathBuf};

/// A session with one institution.
pub trait BankingClient {
    /// Accounts the authenticated user can access.
    fn list_accounts(&mut self) -> Result<Vec<RemoteAccount>>;

    /// Statements of `account` within `range`, in the order the bank
    /// delivers them.
    fn fetch_statements(
        &mut self,
        account: &RemoteAccount,
        range: &DateRange,
    ) -> Result<Vec<Statement>>;
}

/// Opens banking sessions.
pub trait Connector {
    fn connect(&self, institution: &Institution) -> Result<Box<dyn BankingClient>>;
}

/// Serves statements from bank CSV exports on disk.
///
/// Layout, one directory per institution named like its normalized name:
///
/// ```text
/// <source>/<institution>/accounts.csv   number,iban,bic,bank_code
/// <source>/<institution>/<number>.csv   statement_date,booking_date,credit_debit,amount,description,name
/// ```
#[derive(Debug, Clone)]
pub struct CsvConnector {
    source_dir: PathBuf,
}

impl CsvConnector {
    pub fn new<P: Into<PathBuf>>(source_dir: P) -> Self {
        CsvConnector {
            source_dir: source_dir.into(),
        }
    }
}

impl Connector for CsvConnector {
    fn connect(&self, institution: &Institution) -> Result<Box<dyn BankingClient>> {
        let dir = self.source_dir.join(normalize_name(&institution.name));
        if !dir.is_dir() {
            return Err(ExportError::Protocol(format!(
                "no export directory {} for institution {}",
                dir.display(),
                institution.name
            )));
        }
        debug!("Reading exports of {} from {}", institution.name, dir.display());
        Ok(Box::new(CsvBankingClient { dir }))
    }
}

/// Session over one institution's export directory.
#[derive(Debug)]
pub struct CsvBankingClient {
    dir: PathBuf,
}

impl BankingClient for CsvBankingClient {
    fn list_accounts(&mut self) -> Result<Vec<RemoteAccount>> {
        let path = self.dir.join("accounts.csv");
        let mut reader = open_csv(&path)?;

        let mut accounts = Vec::new();
        for result in reader.deserialize::<RemoteAccount>() {
            accounts.push(result?);
        }
        Ok(accounts)
    }

    fn fetch_statements(
        &mut self,
        account: &RemoteAccount,
        range: &DateRange,
    ) -> Result<Vec<Statement>> {
        let path = self
            .dir
            .join(format!("{}.csv", account.account_number.trim()));
        if !path.is_file() {
            warn!(
                "No transactions file {} for account {}",
                path.display(),
                account.account_number
            );
            return Ok(Vec::new());
        }

        let mut reader = open_csv(&path)?;
        let mut statements: Vec<Statement> = Vec::new();

        for (row_idx, result) in reader.deserialize::<TransactionRecord>().enumerate() {
            let row_num = row_idx + 2; // 1-indexed, accounting for header row
            let (statement_date, transaction) = result
                .map_err(ExportError::from)
                .and_then(|record| record.parse())
                .map_err(|e| {
                    ExportError::Protocol(format!("{} row {}: {}", path.display(), row_num, e))
                })?;

            if !range.contains(transaction.booking_date) {
                debug!(
                    "Row {}: booking date {} outside {} - {}, skipped",
                    row_num, transaction.booking_date, range.start, range.end
                );
                continue;
            }

            match statements.last_mut() {
                Some(statement) if statement.date == statement_date => {
                    statement.transactions.push(transaction)
                }
                _ => statements.push(Statement::new(statement_date, vec![transaction])),
            }
        }

        Ok(statements)
    }
}

fn open_csv(path: &Path) -> Result<csv::Reader<File>> {
    let file = File::open(path).map_err(|e| {
        ExportError::Protocol(format!("cannot open {}: {}", path.display(), e))
    })?;
    Ok(ReaderBuilder::new().trim(Trim::All).from_reader(file))
}
