use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use kitetax_derive::CsvSchema;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::io::Read;
use std::str::FromStr;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("duplicate transaction id: {0}")]
    DuplicateTransactionId(String),
    #[error("negative {field} on transaction {id}")]
    NegativeAmount { id: String, field: &'static str },
    #[error("no transaction list found in input")]
    MissingTransactions,
}

/// Column description generated by `CsvSchema`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvField {
    pub name: &'static str,
    pub required: bool,
    pub description: &'static str,
}

/// Input root for transaction JSON, as returned by the wallet service
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TransactionInput {
    pub transactions: Vec<Transaction>,
    /// Number of transactions reported by the service (informational)
    #[serde(default)]
    pub count: Option<usize>,
}

/// A wallet transaction with its fiat valuation at the time it happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, CsvSchema)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Unique identifier for this transaction
    pub id: String,
    /// When the transaction occurred (kept verbatim)
    #[serde(deserialize_with = "deserialize_timestamp")]
    #[schemars(with = "String")]
    pub timestamp: String,
    /// On-chain transaction hash
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// trade, receive, send, staking or airdrop
    #[serde(rename = "type")]
    #[schemars(with = "String")]
    pub tx_type: TransactionType,
    /// Asset given up (empty when there is no outgoing leg)
    #[serde(default)]
    pub from_asset: String,
    /// Quantity of the asset given up
    #[serde(default, deserialize_with = "deserialize_amount")]
    #[schemars(with = "f64")]
    pub from_amount: Decimal,
    /// Asset received (empty when there is no incoming leg)
    #[serde(default)]
    pub to_asset: String,
    /// Quantity of the asset received
    #[serde(default, deserialize_with = "deserialize_amount")]
    #[schemars(with = "f64")]
    pub to_amount: Decimal,
    /// Fiat value of the transaction when it occurred
    #[serde(deserialize_with = "deserialize_amount")]
    #[schemars(with = "f64")]
    pub fiat_value_at_time: Decimal,
    /// Fiat originally paid for the disposed asset
    #[serde(
        default,
        deserialize_with = "deserialize_optional_amount",
        skip_serializing_if = "Option::is_none"
    )]
    #[schemars(with = "Option<f64>")]
    pub cost_basis: Option<Decimal>,
}

/// Transaction kind as tagged by the data source.
///
/// Tags match exactly. Unknown tags, including other spellings such as
/// `TRADE`, are kept in `Other` so they reach the classifier instead of
/// failing the whole read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionType {
    Trade,
    Receive,
    Send,
    Staking,
    Airdrop,
    Other(String),
}

impl TransactionType {
    pub fn as_str(&self) -> &str {
        match self {
            TransactionType::Trade => "trade",
            TransactionType::Receive => "receive",
            TransactionType::Send => "send",
            TransactionType::Staking => "staking",
            TransactionType::Airdrop => "airdrop",
            TransactionType::Other(tag) => tag,
        }
    }
}

impl From<String> for TransactionType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "trade" => TransactionType::Trade,
            "receive" => TransactionType::Receive,
            "send" => TransactionType::Send,
            "staking" => TransactionType::Staking,
            "airdrop" => TransactionType::Airdrop,
            _ => TransactionType::Other(s),
        }
    }
}

impl From<&str> for TransactionType {
    fn from(s: &str) -> Self {
        TransactionType::from(s.to_string())
    }
}

impl From<TransactionType> for String {
    fn from(t: TransactionType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Transaction {
    /// Cost basis with an absent value treated as zero
    pub fn cost_basis_or_zero(&self) -> Decimal {
        self.cost_basis.unwrap_or(Decimal::ZERO)
    }

    /// Best-effort parse of the verbatim timestamp
    pub fn datetime(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.timestamp)
    }

    /// Calendar year of the transaction, if the timestamp can be parsed
    pub fn year(&self) -> Option<i32> {
        self.datetime().map(|dt| dt.year())
    }

    /// Display string for the outgoing leg, e.g. "1.5 ETH"
    pub fn from_leg(&self) -> Option<String> {
        leg(&self.from_asset, self.from_amount)
    }

    /// Display string for the incoming leg, e.g. "4200 USDC"
    pub fn to_leg(&self) -> Option<String> {
        leg(&self.to_asset, self.to_amount)
    }
}

fn leg(asset: &str, amount: Decimal) -> Option<String> {
    if asset.trim().is_empty() && amount.is_zero() {
        None
    } else {
        Some(format!("{} {}", amount.normalize(), asset).trim().to_string())
    }
}

/// Read transactions from JSON.
///
/// Accepts the service envelope (`{"transactions": [...]}`, optionally nested
/// under `data`) or a bare array. Input order is kept.
pub fn read_transactions_json<R: Read>(reader: R) -> anyhow::Result<Vec<Transaction>> {
    let value: Value = serde_json::from_reader(reader)?;
    let transactions: Vec<Transaction> = match value {
        Value::Array(_) => serde_json::from_value(value)?,
        _ => {
            let list = super::service::find_payload(&value, "transactions")
                .and_then(|payload| payload.get("transactions"))
                .ok_or(TransactionError::MissingTransactions)?;
            serde_json::from_value(list.clone())?
        }
    };
    validate_transactions(&transactions)?;
    log::info!("Read {} transactions", transactions.len());
    Ok(transactions)
}

/// Read transactions from CSV with camelCase column headers
pub fn read_transactions_csv<R: Read>(reader: R) -> anyhow::Result<Vec<Transaction>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut transactions = Vec::new();
    for result in rdr.deserialize() {
        let tx: Transaction = result?;
        transactions.push(tx);
    }
    validate_transactions(&transactions)?;
    log::info!("Read {} csv records", transactions.len());
    Ok(transactions)
}

/// Reject duplicate ids and negative amounts
pub fn validate_transactions(transactions: &[Transaction]) -> Result<(), TransactionError> {
    let mut seen = HashSet::new();

    for tx in transactions {
        if !seen.insert(tx.id.as_str()) {
            return Err(TransactionError::DuplicateTransactionId(tx.id.clone()));
        }

        let amounts = [
            ("fromAmount", Some(tx.from_amount)),
            ("toAmount", Some(tx.to_amount)),
            ("fiatValueAtTime", Some(tx.fiat_value_at_time)),
            ("costBasis", tx.cost_basis),
        ];
        for (field, amount) in amounts {
            if amount.is_some_and(|a| a.is_sign_negative() && !a.is_zero()) {
                return Err(TransactionError::NegativeAmount {
                    id: tx.id.clone(),
                    field,
                });
            }
        }
    }

    Ok(())
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for format in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    // Unix timestamps; anything past 1e11 is taken as milliseconds
    let n: i64 = s.parse().ok()?;
    let dt = if n.abs() >= 100_000_000_000 {
        DateTime::from_timestamp_millis(n)?
    } else {
        DateTime::from_timestamp(n, 0)?
    };
    Some(dt.naive_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct TimestampVisitor;

    impl Visitor<'_> for TimestampVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a timestamp string or number")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(TimestampVisitor)
}

/// Amount from a JSON number, numeric string, or CSV cell. Blank means absent.
struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Option<Decimal>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal amount")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        let v = v.trim();
        if v.is_empty() {
            return Ok(None);
        }
        Decimal::from_str(v)
            .or_else(|_| Decimal::from_scientific(v))
            .map(Some)
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Some(Decimal::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Some(Decimal::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        // Display gives the shortest round-trip form, so 0.1 stays 0.1
        self.visit_str(&v.to_string())
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}

pub(crate) fn deserialize_amount<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserializer
        .deserialize_any(AmountVisitor)?
        .unwrap_or(Decimal::ZERO))
}

pub(crate) fn deserialize_optional_amount<'de, D>(
    deserializer: D,
) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_option(AmountVisitor)
}
