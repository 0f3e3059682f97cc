use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Filing jurisdiction
///
/// Only the exact lower-case codes `us` and `sg` are supported. Anything
/// else, including `US` or ` sg`, is kept verbatim in `Unsupported`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Country {
    Us,
    Sg,
    Unsupported(String),
}

impl Country {
    pub fn code(&self) -> &str {
        match self {
            Country::Us => "us",
            Country::Sg => "sg",
            Country::Unsupported(code) => code,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Country::Us => "United States",
            Country::Sg => "Singapore",
            Country::Unsupported(code) => code,
        }
    }

    /// Tax authority collecting the liability
    pub fn authority(&self) -> Option<&'static str> {
        match self {
            Country::Us => Some("IRS"),
            Country::Sg => Some("IRAS"),
            Country::Unsupported(_) => None,
        }
    }

    /// Flat rate applied to the whole taxable total.
    ///
    /// Unsupported countries get the Singapore rate, which is what any
    /// non-US profile was charged historically.
    pub fn flat_rate(&self) -> Decimal {
        match self {
            Country::Us => dec!(0.25),
            Country::Sg | Country::Unsupported(_) => dec!(0.08),
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Country::Unsupported(_))
    }
}

impl From<&str> for Country {
    fn from(code: &str) -> Self {
        match code {
            "us" => Country::Us,
            "sg" => Country::Sg,
            _ => Country::Unsupported(code.to_string()),
        }
    }
}

impl From<String> for Country {
    fn from(code: String) -> Self {
        Country::from(code.as_str())
    }
}

impl From<Country> for String {
    fn from(country: Country) -> Self {
        country.code().to_string()
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Declared purpose of holding crypto assets (Singapore only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    #[default]
    Investment,
    Trading,
}

impl Intent {
    pub fn from_str(s: &str) -> Option<Intent> {
        match s.trim().to_lowercase().as_str() {
            "investment" => Some(Intent::Investment),
            "trading" => Some(Intent::Trading),
            _ => None,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::Investment => f.write_str("investment"),
            Intent::Trading => f.write_str("trading"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JurisdictionConfig {
    pub country: Country,
    #[serde(default)]
    pub intent: Option<Intent>,
}

impl JurisdictionConfig {
    pub fn new(country: Country) -> Self {
        JurisdictionConfig {
            country,
            intent: None,
        }
    }

    pub fn with_intent(mut self, intent: Intent) -> Self {
        self.intent = Some(intent);
        self
    }

    /// Declared intent, defaulting to investment when none was given
    pub fn effective_intent(&self) -> Intent {
        self.intent.unwrap_or_default()
    }
}
