pub mod classify;
pub mod jurisdiction;
pub mod profile;
pub mod service;
pub mod transaction;
pub mod warnings;

// Flat public surface for domain types and functions.
#[allow(unused_imports)]
pub use classify::{classify, AnalyzedTransaction, TaxCategory, TaxResult};
pub use jurisdiction::{Country, Intent, JurisdictionConfig};
#[allow(unused_imports)]
pub use profile::{read_profile_json, TaxProfile};
#[allow(unused_imports)]
pub use service::{
    parse_settlement, parse_strategy_comparison, CompareStrategiesResult, SettlementOutcome,
    SettlementReceipt,
};
#[allow(unused_imports)]
pub use transaction::{
    read_transactions_csv, read_transactions_json, CsvField, Transaction, TransactionInput,
    TransactionType,
};
#[allow(unused_imports)]
pub use warnings::Warning;
