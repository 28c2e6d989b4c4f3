//! Statement and transaction models, plus the raw CSV row they are read from.

use crate::error::{ExportError, Result};
use crate::money::{Currency, Money};
use chrono::NaiveDate;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Direction of a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditDebit {
    Credit,
    Debit,
}

impl CreditDebit {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditDebit::Credit => "credit",
            CreditDebit::Debit => "debit",
        }
    }
}

impl FromStr for CreditDebit {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "credit" | "c" => Ok(CreditDebit::Credit),
            "debit" | "d" => Ok(CreditDebit::Debit),
            other => Err(ExportError::Protocol(format!(
                "unknown credit/debit indicator '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for CreditDebit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single booking on an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub booking_date: NaiveDate,

    /// Unsigned magnitude in minor currency units. The sign lives in
    /// `credit_debit`.
    pub amount: u64,

    pub credit_debit: CreditDebit,

    /// Raw free-text booking description.
    pub description: String,

    /// Counterparty display name.
    pub name: String,
}

impl Transaction {
    /// The signed amount: negative for debits, unchanged for credits.
    pub fn signed_money(&self, currency: &Currency) -> Result<Money> {
        let magnitude =
            i64::try_from(self.amount).map_err(|_| ExportError::AmountOutOfRange(self.amount))?;
        let amount = match self.credit_debit {
            CreditDebit::Credit => magnitude,
            CreditDebit::Debit => -magnitude,
        };
        Ok(Money::new(amount, currency.clone()))
    }
}

/// A dated group of transactions as delivered by the bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub date: NaiveDate,
    pub transactions: Vec<Transaction>,
}

impl Statement {
    pub fn new(date: NaiveDate, transactions: Vec<Transaction>) -> Self {
        Statement { date, transactions }
    }
}

/// Raw transaction row as read from a bank CSV export.
///
/// All fields are strings so that a malformed value can be reported with its
/// row instead of failing the whole deserialization.
#[derive(Debug, Deserialize)]
pub struct TransactionRecord {
    pub statement_date: String,
    pub booking_date: String,
    pub credit_debit: String,

    /// Magnitude in minor units
    pub amount: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub name: String,
}

impl TransactionRecord {
    /// Parses the raw record into its statement date and transaction.
    pub fn parse(&self) -> Result<(NaiveDate, Transaction)> {
        let statement_date = parse_date("statement_date", &self.statement_date)?;
        let booking_date = parse_date("booking_date", &self.booking_date)?;
        let credit_debit = CreditDebit::from_str(&self.credit_debit)?;
        let amount = self.amount.trim().parse::<u64>().map_err(|e| {
            ExportError::Protocol(format!("invalid amount '{}': {}", self.amount, e))
        })?;

        Ok((
            statement_date,
            Transaction {
                booking_date,
                amount,
                credit_debit,
                description: self.description.clone(),
                name: self.name.clone(),
            },
        ))
    }
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| ExportError::Protocol(format!("invalid {} '{}': {}", field, value, e)))
}
