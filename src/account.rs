//! Bank account identification.

use crate::money::Currency;
use serde::Deserialize;

/// Account type written into `BANKACCTFROM`. Only checking accounts are
/// modelled.
pub const ACCOUNT_TYPE_CHECKING: &str = "CHECKING";

/// Identifies the account a document belongs to.
///
/// Built from configuration: the bank code and currency come from the
/// institution, the account number from the configured account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankAccountRef {
    /// Routing code of the institution (`BANKID`).
    pub bank_code: String,

    /// Account number (`ACCTID`).
    pub account_number: String,

    /// Default currency of the account (`CURDEF`).
    pub currency: Currency,
}

impl BankAccountRef {
    pub fn new(
        bank_code: impl Into<String>,
        account_number: impl Into<String>,
        currency: Currency,
    ) -> Self {
        BankAccountRef {
            bank_code: bank_code.into(),
            account_number: account_number.into(),
            currency,
        }
    }

    pub fn account_type(&self) -> &'static str {
        ACCOUNT_TYPE_CHECKING
    }
}

/// An account as enumerated by a banking client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteAccount {
    #[serde(rename = "number")]
    pub account_number: String,
    pub iban: String,
    pub bic: String,
    pub bank_code: String,
}

impl RemoteAccount {
    /// Returns `true` if this is the account with the given number.
    ///
    /// Leading zeros and surrounding whitespace are not significant, banks
    /// disagree on whether to pad account numbers.
    pub fn matches_number(&self, number: &str) -> bool {
        normalize_number(&self.account_number) == normalize_number(number)
    }
}

fn normalize_number(number: &str) -> &str {
    let trimmed = number.trim().trim_start_matches('0');
    if trimmed.is_empty() && !number.trim().is_empty() {
        "0"
    } else {
        trimmed
    }
}
