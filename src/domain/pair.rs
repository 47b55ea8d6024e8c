use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A currency pair such as `USDINR`: six ASCII letters, base then quote.
///
/// The base currency is the one being bought or sold; direction `UP` means
/// the base strengthens against the quote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyPair {
    code: String,
}

impl CurrencyPair {
    pub fn new(code: &str) -> Result<Self> {
        let code = code.trim().to_uppercase();
        if code.len() != 6 || !code.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(anyhow!(
                "Invalid currency pair: '{}'. Expected six letters, e.g. USDINR",
                code
            ));
        }
        Ok(Self { code })
    }

    /// The first three letters, e.g. `USD` in `USDINR`.
    pub fn base(&self) -> &str {
        &self.code[..3]
    }

    /// The last three letters, e.g. `INR` in `USDINR`.
    pub fn quote(&self) -> &str {
        &self.code[3..]
    }

    pub fn as_str(&self) -> &str {
        &self.code
    }

    /// Whether the given currency is either leg of the pair.
    pub fn involves(&self, currency: &str) -> bool {
        currency.eq_ignore_ascii_case(self.base()) || currency.eq_ignore_ascii_case(self.quote())
    }
}

impl FromStr for CurrencyPair {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for CurrencyPair {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<CurrencyPair> for String {
    fn from(pair: CurrencyPair) -> Self {
        pair.code
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}
