//! Monetary amounts and their string formatting.
//!
//! Amounts travel through the exporter as signed integers in minor currency
//! units. Turning them into decimal strings is the job of a [`MoneyFormatter`];
//! the document always uses [`DecimalMoneyFormatter`], while
//! [`LocaleMoneyFormatter`] exists only for human-readable console output.

use crate::error::{ExportError, Result};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

/// Currencies whose minor unit is not 1/100.
const EXPONENTS: &[(&str, u32)] = &[
    ("BIF", 0),
    ("CLP", 0),
    ("DJF", 0),
    ("GNF", 0),
    ("ISK", 0),
    ("JPY", 0),
    ("KMF", 0),
    ("KRW", 0),
    ("PYG", 0),
    ("RWF", 0),
    ("UGX", 0),
    ("UYI", 0),
    ("VND", 0),
    ("VUV", 0),
    ("XAF", 0),
    ("XOF", 0),
    ("XPF", 0),
    ("BHD", 3),
    ("IQD", 3),
    ("JOD", 3),
    ("KWD", 3),
    ("LYD", 3),
    ("OMR", 3),
    ("TND", 3),
    ("CLF", 4),
    ("UYW", 4),
];

/// An ISO 4217 currency code.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use fints_ofx::Currency;
///
/// let eur = Currency::from_str("EUR").unwrap();
/// assert_eq!(eur.exponent(), 2);
/// assert_eq!(Currency::from_str("JPY").unwrap().exponent(), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Currency(String);

impl Currency {
    /// Returns the three-letter code.
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Number of decimal places of the currency's minor unit.
    pub fn exponent(&self) -> u32 {
        EXPONENTS
            .iter()
            .find(|(code, _)| *code == self.0)
            .map(|(_, exponent)| *exponent)
            .unwrap_or(2)
    }
}

impl FromStr for Currency {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        let code = s.trim();
        if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
            Ok(Currency(code.to_string()))
        } else {
            Err(ExportError::InvalidCurrency(s.to_string()))
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A signed amount in minor units of a currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Money {
    /// Amount in minor units (cents for EUR).
    pub amount: i64,
    pub currency: Currency,
}

impl Money {
    pub fn new(amount: i64, currency: Currency) -> Self {
        Money { amount, currency }
    }

    /// The amount as a decimal scaled to the currency's exponent.
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.amount, self.currency.exponent())
    }
}

/// Converts [`Money`] into a string.
pub trait MoneyFormatter {
    fn format(&self, money: &Money) -> String;
}

/// Canonical decimal formatting: `.` as decimal point, leading `-` for
/// negative amounts, no digit grouping, always the full currency precision.
///
/// ```
/// use std::str::FromStr;
/// use fints_ofx::{Currency, DecimalMoneyFormatter, Money, MoneyFormatter};
///
/// let money = Money::new(-1000, Currency::from_str("EUR").unwrap());
/// assert_eq!(DecimalMoneyFormatter.format(&money), "-10.00");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DecimalMoneyFormatter;

impl MoneyFormatter for DecimalMoneyFormatter {
    fn format(&self, money: &Money) -> String {
        money.to_decimal().to_string()
    }
}

/// en_US style display formatting with `,` thousands separators.
///
/// Only meant for console tables; documents never go through it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocaleMoneyFormatter;

impl MoneyFormatter for LocaleMoneyFormatter {
    fn format(&self, money: &Money) -> String {
        let plain = DecimalMoneyFormatter.format(money);
        let (sign, unsigned) = match plain.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", plain.as_str()),
        };
        let (integer, fraction) = match unsigned.split_once('.') {
            Some((integer, fraction)) => (integer, Some(fraction)),
            None => (unsigned, None),
        };

        let mut grouped = String::with_capacity(plain.len() + integer.len() / 3);
        for (i, digit) in integer.chars().enumerate() {
            if i > 0 && (integer.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(digit);
        }

        match fraction {
            Some(fraction) => format!("{}{}.{}", sign, grouped, fraction),
            None => format!("{}{}", sign, grouped),
        }
    }
}
