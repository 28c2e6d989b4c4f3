//! Application configuration: institutions, accounts and the export period.
//!
//! The configuration is a YAML file. It is fully validated before any bank is
//! contacted, so a typo never leaves a half finished export behind.

use crate::account::BankAccountRef;
use crate::error::{ExportError, Result};
use crate::money::Currency;
use chrono::{Days, Local, Months, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// File name searched for in the working directory and the user config dir.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

const DEFAULT_START_DATE: &str = "1 month ago";
const DEFAULT_END_DATE: &str = "now";

const TEMPLATE: &str = r#"# Export period. Accepts YYYY-MM-DD, now, today, yesterday or
# relative expressions such as "2 weeks ago".
start_date: 1 month ago
end_date: now
institutions:
  - name: My Bank
    # FinTS url, see https://www.hbci-zka.de/institute/institut_auswahl.htm
    url: https://fints.example.com/fints
    port: 443
    # bank routing code
    code: ""
    # bank identifier code
    bic: ""
    username: ""
    password: ""
    currency: EUR
    accounts:
      - name: Checking
        number: ""
        iban: ""
      - name: Credit Card
        number: ""
        iban: ""
"#;

/// Root of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_start_date")]
    pub start_date: String,

    #[serde(default = "default_end_date")]
    pub end_date: String,

    #[serde(default)]
    pub institutions: Vec<Institution>,
}

/// A bank reachable through the banking protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Institution {
    pub name: String,
    pub url: String,
    pub port: u16,

    /// Bank routing code
    #[serde(deserialize_with = "string_or_number")]
    pub code: String,

    /// Bank identifier code
    pub bic: String,

    #[serde(deserialize_with = "string_or_number")]
    pub username: String,

    #[serde(deserialize_with = "string_or_number")]
    pub password: String,

    /// Default currency of all accounts at this institution
    pub currency: String,

    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

/// An account to export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Display name, also used for the output file name
    pub name: String,

    #[serde(deserialize_with = "string_or_number")]
    pub number: String,

    pub iban: String,
}

/// Inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl AppConfig {
    /// Parses a configuration without validating it.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Reads, parses and validates the configuration at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path).map_err(|source| ExportError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = AppConfig::from_yaml(&yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks everything that can be checked without contacting a bank,
    /// resolving the period against the current local date.
    pub fn validate(&self) -> Result<()> {
        self.validate_fields()?;
        self.date_range(Local::now().date_naive())?;
        Ok(())
    }

    /// Checks institutions and accounts. The period is left to
    /// [`AppConfig::date_range`].
    pub fn validate_fields(&self) -> Result<()> {
        if self.institutions.is_empty() {
            return Err(ExportError::invalid_config(
                "institutions",
                "at least one institution is required",
            ));
        }

        for (i, institution) in self.institutions.iter().enumerate() {
            institution.validate(&format!("institutions[{}]", i))?;
        }
        Ok(())
    }

    /// Resolves the configured period relative to `today`.
    pub fn date_range(&self, today: NaiveDate) -> Result<DateRange> {
        let start = parse_date_expression(&self.start_date, today).ok_or_else(|| {
            ExportError::invalid_config(
                "start_date",
                format!("cannot interpret '{}' as a date", self.start_date),
            )
        })?;
        let end = parse_date_expression(&self.end_date, today).ok_or_else(|| {
            ExportError::invalid_config(
                "end_date",
                format!("cannot interpret '{}' as a date", self.end_date),
            )
        })?;

        if start > end {
            return Err(ExportError::invalid_config(
                "start_date",
                format!("start {} is after end {}", start, end),
            ));
        }
        Ok(DateRange::new(start, end))
    }
}

impl Institution {
    fn validate(&self, path: &str) -> Result<()> {
        require_non_empty(path, "name", &self.name)?;
        require_non_empty(path, "url", &self.url)?;
        require_non_empty(path, "code", &self.code)?;
        require_non_empty(path, "bic", &self.bic)?;
        require_non_empty(path, "username", &self.username)?;
        require_non_empty(path, "password", &self.password)?;
        require_non_empty(path, "currency", &self.currency)?;
        Currency::from_str(&self.currency).map_err(|e| {
            ExportError::invalid_config(format!("{}.currency", path), e.to_string())
        })?;

        if self.accounts.is_empty() {
            return Err(ExportError::invalid_config(
                format!("{}.accounts", path),
                "at least one account is required",
            ));
        }
        for (i, account) in self.accounts.iter().enumerate() {
            let account_path = format!("{}.accounts[{}]", path, i);
            require_non_empty(&account_path, "name", &account.name)?;
            require_non_empty(&account_path, "number", &account.number)?;
            require_non_empty(&account_path, "iban", &account.iban)?;
        }
        Ok(())
    }

    pub fn currency(&self) -> Result<Currency> {
        Currency::from_str(&self.currency)
    }

    /// Identification of `account` as written into the document.
    pub fn bank_account_ref(&self, account: &AccountConfig) -> Result<BankAccountRef> {
        Ok(BankAccountRef::new(
            self.code.clone(),
            account.number.clone(),
            self.currency()?,
        ))
    }
}

/// Finds the configuration file.
///
/// An explicit path wins; otherwise `./config.yaml`, then
/// `~/.config/fints-ofx/config.yaml`.
pub fn locate(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    search_paths(dirs::home_dir())
        .into_iter()
        .find(|candidate| candidate.is_file())
        .ok_or(ExportError::ConfigNotFound)
}

/// Locations searched for the configuration, in order.
fn search_paths(home: Option<PathBuf>) -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(home) = home {
        candidates.push(
            home.join(".config")
                .join("fints-ofx")
                .join(CONFIG_FILE_NAME),
        );
    }
    candidates
}

/// Writes a configuration template to `path`. Never overwrites.
pub fn write_template<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        return Err(ExportError::ConfigExists {
            path: path.to_path_buf(),
        });
    }
    fs::write(path, TEMPLATE)?;
    Ok(())
}

/// Interprets a date expression relative to `today`.
///
/// Accepts `now`, `today`, `yesterday`, `YYYY-MM-DD` and
/// `<n> day(s)|week(s)|month(s)|year(s) ago`.
pub fn parse_date_expression(expression: &str, today: NaiveDate) -> Option<NaiveDate> {
    let expression = expression.trim().to_lowercase();
    match expression.as_str() {
        "now" | "today" => return Some(today),
        "yesterday" => return today.checked_sub_days(Days::new(1)),
        _ => {}
    }

    if let Ok(date) = NaiveDate::parse_from_str(&expression, "%Y-%m-%d") {
        return Some(date);
    }

    let words: Vec<&str> = expression.split_whitespace().collect();
    let [count, unit, "ago"] = words.as_slice() else {
        return None;
    };
    let count: u32 = match *count {
        "a" | "an" | "one" => 1,
        n => n.parse().ok()?,
    };

    match unit.trim_end_matches('s') {
        "day" => today.checked_sub_days(Days::new(u64::from(count))),
        "week" => today.checked_sub_days(Days::new(u64::from(count) * 7)),
        "month" => today.checked_sub_months(Months::new(count)),
        "year" => today.checked_sub_months(Months::new(count.checked_mul(12)?)),
        _ => None,
    }
}

fn require_non_empty(path: &str, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(ExportError::invalid_config(
            format!("{}.{}", path, field),
            "must not be empty",
        ))
    } else {
        Ok(())
    }
}

fn default_start_date() -> String {
    DEFAULT_START_DATE.to_string()
}

fn default_end_date() -> String {
    DEFAULT_END_DATE.to_string()
}

/// Routing codes and account numbers are often written unquoted in YAML.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Unsigned(u64),
        Signed(i64),
    }

    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Text(s) => s,
        Scalar::Unsigned(n) => n.to_string(),
        Scalar::Signed(n) => n.to_string(),
    })
}
