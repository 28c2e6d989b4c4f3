//! Statement export: the fixed OFX bank statement grammar.
//!
//! [`StatementExporter`] drives a [`DocumentWriter`] through the phases of a
//! bank statement response. Each phase is available on its own so callers can
//! compose documents piecewise; [`export`] runs all of them in order and ends
//! the document.

use crate::account::BankAccountRef;
use crate::error::Result;
use crate::money::MoneyFormatter;
use crate::transaction::{Statement, Transaction};
use crate::writer::DocumentWriter;
use chrono::{Local, NaiveDate, NaiveDateTime};
use log::debug;
use md5::{Digest, Md5};
use std::io::Write;

const STATUS_CODE_OK: &str = "0";
const SEVERITY_INFO: &str = "INFO";
const LANGUAGE: &str = "GER";
const TRANSACTION_UID: &str = "0";

/// Writes bank statement data into a document.
pub struct StatementExporter<'a, W: Write, F: MoneyFormatter> {
    writer: &'a mut DocumentWriter<W>,
    formatter: &'a F,
}

impl<'a, W: Write, F: MoneyFormatter> StatementExporter<'a, W, F> {
    pub fn new(writer: &'a mut DocumentWriter<W>, formatter: &'a F) -> Self {
        StatementExporter { writer, formatter }
    }

    /// Writes the complete body of a statement document, from the sign-on
    /// block to the closed transaction list and message sets.
    ///
    /// The document itself must already be started; it is left open for the
    /// caller to end.
    pub fn write_statement_document(
        &mut self,
        account: &BankAccountRef,
        statements: &[Statement],
        server_time: Option<NaiveDateTime>,
    ) -> Result<()> {
        self.write_sign_on_message_set(server_time)?;
        self.start_banking_message_set()?;
        self.start_statement_transaction_wrapper()?;
        self.start_statement_response(account)?;
        self.start_transaction_list(statements)?;
        for statement in statements {
            debug!(
                "Statement {} with {} transactions",
                statement.date,
                statement.transactions.len()
            );
            for transaction in &statement.transactions {
                self.write_transaction(account, transaction)?;
            }
        }
        self.end_transaction_list()?;
        self.end_statement_response()?;
        self.end_statement_transaction_wrapper()?;
        self.end_banking_message_set()
    }

    /// `SIGNONMSGSRSV1`: success status, server time and language.
    ///
    /// Uses the current local time when `server_time` is `None`.
    pub fn write_sign_on_message_set(&mut self, server_time: Option<NaiveDateTime>) -> Result<()> {
        let server_time = server_time.unwrap_or_else(|| Local::now().naive_local());

        self.writer.start_element("SIGNONMSGSRSV1")?;
        self.writer.start_element("SONRS")?;
        self.write_status()?;
        self.writer.write_date_time("DTSERVER", &server_time)?;
        self.writer.write_element("LANGUAGE", LANGUAGE)?;
        self.writer.end_element()?; // SONRS
        self.writer.end_element() // SIGNONMSGSRSV1
    }

    pub fn start_banking_message_set(&mut self) -> Result<()> {
        self.writer.start_element("BANKMSGSRSV1")
    }

    pub fn end_banking_message_set(&mut self) -> Result<()> {
        self.writer.end_element()
    }

    /// `STMTTRNRS` with a placeholder transaction uid and success status.
    pub fn start_statement_transaction_wrapper(&mut self) -> Result<()> {
        self.writer.start_element("STMTTRNRS")?;
        self.writer.write_element("TRNUID", TRANSACTION_UID)?;
        self.write_status()
    }

    pub fn end_statement_transaction_wrapper(&mut self) -> Result<()> {
        self.writer.end_element()
    }

    /// `STMTRS` with the default currency and the account identification.
    pub fn start_statement_response(&mut self, account: &BankAccountRef) -> Result<()> {
        self.writer.start_element("STMTRS")?;
        self.writer.write_element("CURDEF", account.currency.code())?;

        self.writer.start_element("BANKACCTFROM")?;
        self.writer.write_element("BANKID", &account.bank_code)?;
        self.writer.write_element("ACCTID", &account.account_number)?;
        self.writer.write_element("ACCTTYPE", account.account_type())?;
        self.writer.end_element() // BANKACCTFROM
    }

    pub fn end_statement_response(&mut self) -> Result<()> {
        self.writer.end_element()
    }

    /// `BANKTRANLIST` spanning the first to the last statement.
    ///
    /// Statements are expected in ascending date order; the boundaries are
    /// taken positionally and not recomputed.
    pub fn start_transaction_list(&mut self, statements: &[Statement]) -> Result<()> {
        self.writer.start_element("BANKTRANLIST")?;
        if let (Some(first), Some(last)) = (statements.first(), statements.last()) {
            self.writer.write_date_time("DTSTART", &midnight(first.date))?;
            self.writer.write_date_time("DTEND", &midnight(last.date))?;
        }
        Ok(())
    }

    pub fn end_transaction_list(&mut self) -> Result<()> {
        self.writer.end_element()
    }

    /// One `STMTTRN` record.
    pub fn write_transaction(
        &mut self,
        account: &BankAccountRef,
        transaction: &Transaction,
    ) -> Result<()> {
        let money = transaction.signed_money(&account.currency)?;

        self.writer.start_element("STMTTRN")?;
        self.writer
            .write_element("TRNTYPE", &transaction.credit_debit.as_str().to_uppercase())?;
        self.writer
            .write_date_time("DTPOSTED", &midnight(transaction.booking_date))?;
        self.writer
            .write_element("TRNAMT", &self.formatter.format(&money))?;
        self.writer
            .write_element("FITID", &fit_id(&transaction.description))?;
        self.writer.write_element("NAME", &transaction.name)?;
        self.writer.end_element() // STMTTRN
    }

    fn write_status(&mut self) -> Result<()> {
        self.writer.start_element("STATUS")?;
        self.writer.write_element("CODE", STATUS_CODE_OK)?;
        self.writer.write_element("SEVERITY", SEVERITY_INFO)?;
        self.writer.end_element()
    }
}

/// Writes a complete document for one account and ends it, releasing the
/// writer's sink.
pub fn export<W: Write, F: MoneyFormatter>(
    mut writer: DocumentWriter<W>,
    formatter: &F,
    account: &BankAccountRef,
    statements: &[Statement],
    server_time: Option<NaiveDateTime>,
) -> Result<W> {
    writer.start_document()?;
    StatementExporter::new(&mut writer, formatter).write_statement_document(
        account,
        statements,
        server_time,
    )?;
    writer.end_document()
}

/// Transaction id used by importing software for deduplication.
///
/// Derived from the raw description only, so two bookings with the same
/// description share an id.
pub fn fit_id(description: &str) -> String {
    format!("{:x}", Md5::digest(description.as_bytes()))
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}
