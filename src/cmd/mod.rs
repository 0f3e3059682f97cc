pub mod classify;
pub mod html_report;
pub mod schema;
pub mod settlement;
pub mod strategies;
pub mod summary;
pub mod validate;

use crate::tax::{
    self, Country, Intent, JurisdictionConfig, TaxResult, Transaction,
};
use anyhow::Context;
use clap::{Args, ValueEnum};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

/// Inputs shared by every command that classifies a wallet history
#[derive(Args, Debug)]
pub struct AnalysisArgs {
    /// JSON or CSV file containing wallet transactions ("-" for stdin)
    #[arg(short, long)]
    pub transactions: PathBuf,

    /// Jurisdiction country code (us, sg); overrides the profile
    #[arg(short, long)]
    pub country: Option<String>,

    /// Declared holding intent, consulted for Singapore trades
    #[arg(short, long, value_enum)]
    pub intent: Option<IntentArg>,

    /// Saved tax profile (JSON) providing country, intent and tax year
    #[arg(short, long)]
    pub profile: Option<PathBuf>,

    /// Only include transactions from this calendar year
    #[arg(short, long)]
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum IntentArg {
    Investment,
    Trading,
}

impl From<IntentArg> for Intent {
    fn from(arg: IntentArg) -> Self {
        match arg {
            IntentArg::Investment => Intent::Investment,
            IntentArg::Trading => Intent::Trading,
        }
    }
}

/// A classified wallet history with the settings that produced it
#[derive(Debug)]
pub struct Analysis {
    pub config: JurisdictionConfig,
    pub year: Option<i32>,
    pub result: TaxResult,
}

impl AnalysisArgs {
    /// Resolve the jurisdiction, read and filter transactions, then classify
    pub fn analyze(&self) -> anyhow::Result<Analysis> {
        let profile = match &self.profile {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("opening profile {}", path.display()))?;
                Some(tax::read_profile_json(BufReader::new(file))?)
            }
            None => None,
        };

        let mut config = profile
            .as_ref()
            .map(|p| p.jurisdiction())
            .unwrap_or_else(|| JurisdictionConfig::new(Country::Us));
        if let Some(country) = &self.country {
            config.country = Country::from(country.as_str());
        }
        if let Some(intent) = self.intent {
            config.intent = Some(intent.into());
        }
        if !config.country.is_supported() {
            log::warn!(
                "Country '{}' has no tax rules; every transaction will be non-taxable",
                config.country
            );
        }

        let year = self.year.or_else(|| profile.as_ref().and_then(|p| p.tax_year()));

        let transactions = read_transactions(&self.transactions)?;
        let transactions = filter_year(transactions, year);
        let result = tax::classify(&transactions, &config);

        Ok(Analysis {
            config,
            year,
            result,
        })
    }
}

/// Read transactions from a file (CSV by extension, JSON otherwise) or stdin with "-"
pub fn read_transactions(path: &Path) -> anyhow::Result<Vec<Transaction>> {
    if path.as_os_str() == "-" {
        return read_from_stdin();
    }

    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = BufReader::new(file);
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let transactions = if is_csv {
        tax::read_transactions_csv(reader)
    } else {
        tax::read_transactions_json(reader)
    };
    transactions.with_context(|| format!("reading transactions from {}", path.display()))
}

fn read_from_stdin() -> anyhow::Result<Vec<Transaction>> {
    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin.lock());

    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;

    if buffer.is_empty() {
        anyhow::bail!("No input received. Provide a file or pipe data to stdin.");
    }

    tax::read_transactions_json(io::Cursor::new(buffer))
}

fn filter_year(transactions: Vec<Transaction>, year: Option<i32>) -> Vec<Transaction> {
    let Some(year) = year else {
        return transactions;
    };
    transactions
        .into_iter()
        .filter(|tx| match tx.year() {
            Some(y) => y == year,
            None => {
                log::warn!(
                    "Excluding transaction {} from year filter: unreadable timestamp '{}'",
                    tx.id,
                    tx.timestamp
                );
                false
            }
        })
        .collect()
}

/// Read a whole file, or stdin with "-"
pub fn read_to_string(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut s = String::new();
        io::stdin().read_to_string(&mut s)?;
        return Ok(s);
    }
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

pub fn format_money(amount: rust_decimal::Decimal) -> String {
    if amount.is_sign_negative() && !amount.is_zero() {
        format!("-${:.2}", amount.abs())
    } else {
        format!("${:.2}", amount)
    }
}

pub fn format_rate(rate: rust_decimal::Decimal) -> String {
    format!("{:.1}%", rate * rust_decimal_macros::dec!(100))
}
