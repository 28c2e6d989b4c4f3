//! Export orchestration.
//!
//! Walks the configured institutions and accounts strictly in order. Each
//! account gets its own output file and its own [`DocumentWriter`], which is
//! closed before the next account starts. The first failure aborts the run.

use crate::account::RemoteAccount;
use crate::client::{BankingClient, Connector};
use crate::config::{AccountConfig, AppConfig, DateRange, Institution};
use crate::error::{ExportError, Phase, Result};
use crate::money::{Currency, DecimalMoneyFormatter, LocaleMoneyFormatter, MoneyFormatter};
use crate::statement;
use crate::transaction::Statement;
use crate::writer::DocumentWriter;
use chrono::{Local, NaiveDate, NaiveDateTime};
use comfy_table::presets::NOTHING;
use comfy_table::Table;
use log::info;
use std::io::Write;
use std::path::PathBuf;

/// Settings of one export run.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Directory the `.ofx` files are written to.
    pub output_dir: PathBuf,

    /// Print a table of the exported transactions per account.
    pub verbose: bool,

    /// Suppress the per-file confirmation.
    pub quiet: bool,

    /// Reference date for relative period expressions.
    pub today: NaiveDate,

    /// Fixed `DTSERVER` value; the current time when `None`.
    pub server_time: Option<NaiveDateTime>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            output_dir: PathBuf::from("."),
            verbose: false,
            quiet: false,
            today: Local::now().date_naive(),
            server_time: None,
        }
    }
}

/// Runs exports for every configured account.
pub struct Exporter<C: Connector> {
    connector: C,
    options: ExportOptions,
}

impl<C: Connector> Exporter<C> {
    pub fn new(connector: C, options: ExportOptions) -> Self {
        Exporter { connector, options }
    }

    /// Exports all accounts of all institutions in `config`.
    ///
    /// Console messages go to `out`. Returns the written files in order.
    pub fn run<O: Write>(&self, config: &AppConfig, out: &mut O) -> Result<Vec<PathBuf>> {
        config.validate_fields()?;
        let range = config.date_range(self.options.today)?;
        info!("Exporting period {} - {}", range.start, range.end);

        let mut written = Vec::new();
        for institution in &config.institutions {
            info!(
                "Exporting {} account(s) of {}",
                institution.accounts.len(),
                institution.name
            );
            let mut client = self
                .connector
                .connect(institution)
                .map_err(|e| e.in_institution(&institution.name, Phase::Connect))?;
            let remote_accounts = client
                .list_accounts()
                .map_err(|e| e.in_institution(&institution.name, Phase::Resolve))?;

            for account in &institution.accounts {
                let path = self.export_account(
                    client.as_mut(),
                    institution,
                    &remote_accounts,
                    account,
                    &range,
                    out,
                )?;
                written.push(path);
            }
        }

        Ok(written)
    }

    fn export_account<O: Write>(
        &self,
        client: &mut dyn BankingClient,
        institution: &Institution,
        remote_accounts: &[RemoteAccount],
        account: &AccountConfig,
        range: &DateRange,
        out: &mut O,
    ) -> Result<PathBuf> {
        let remote = remote_accounts
            .iter()
            .find(|remote| remote.matches_number(&account.number))
            .ok_or_else(|| ExportError::AccountNotFound {
                institution: institution.name.clone(),
                account: account.number.clone(),
            })
            .map_err(|e| e.in_account(&institution.name, &account.name, Phase::Resolve))?;
        let account_ref = institution
            .bank_account_ref(account)
            .map_err(|e| e.in_account(&institution.name, &account.name, Phase::Resolve))?;

        let statements = client
            .fetch_statements(remote, range)
            .map_err(|e| e.in_account(&institution.name, &account.name, Phase::Fetch))?;

        let path = self
            .options
            .output_dir
            .join(output_filename(&account.name, range));
        DocumentWriter::create(&path)
            .and_then(|writer| {
                statement::export(
                    writer,
                    &DecimalMoneyFormatter,
                    &account_ref,
                    &statements,
                    self.options.server_time,
                )
            })
            .map_err(|e| e.in_account(&institution.name, &account.name, Phase::Write))?;
        info!(
            "Wrote {} statement(s) of {} to {}",
            statements.len(),
            account.name,
            path.display()
        );

        if self.options.verbose {
            let table = transaction_table(&statements, &account_ref.currency)?;
            writeln!(out, "{}", table)?;
        }
        if !self.options.quiet {
            writeln!(out, "file {} saved.", path.display())?;
        }

        Ok(path)
    }
}

/// `{normalized name}_{start}_{end}.ofx`
pub fn output_filename(account_name: &str, range: &DateRange) -> String {
    format!(
        "{}_{}_{}.ofx",
        normalize_name(account_name),
        range.start.format("%Y-%m-%d"),
        range.end.format("%Y-%m-%d")
    )
}

/// Lower-cases `name` and replaces whitespace with underscores.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Human readable listing of the exported transactions.
pub fn transaction_table(statements: &[Statement], currency: &Currency) -> Result<Table> {
    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_header(vec!["Booking date", "Name", "Amount"]);

    for transaction in statements.iter().flat_map(|s| s.transactions.iter()) {
        let money = transaction.signed_money(currency)?;
        table.add_row(vec![
            transaction.booking_date.format("%Y-%m-%d").to_string(),
            transaction.name.clone(),
            LocaleMoneyFormatter.format(&money),
        ]);
    }
    Ok(table)
}
