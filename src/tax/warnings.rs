use serde::{Deserialize, Serialize};

/// Diagnostics attached to a classified transaction.
///
/// Warnings never change the computed amounts; they make the fallback
/// branches of the rule table visible to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Warning {
    /// Country has no rule set; the transaction was left out of the tax base.
    UnsupportedJurisdiction { country: String },
    /// Transaction type tag is outside the known set; left out of the tax base.
    UnrecognizedTransactionType { tx_type: String },
    /// Taxable trade without a cost basis; the gain was computed against zero.
    MissingCostBasis,
    /// Singapore trade with no declared intent; treated as investment.
    IntentNotDeclared,
}

impl Warning {
    /// True when the classifier had no rule for the transaction
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Warning::UnsupportedJurisdiction { .. } | Warning::UnrecognizedTransactionType { .. }
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Warning::UnsupportedJurisdiction { .. } => "UnsupportedJurisdiction",
            Warning::UnrecognizedTransactionType { .. } => "UnrecognizedType",
            Warning::MissingCostBasis => "MissingCostBasis",
            Warning::IntentNotDeclared => "IntentNotDeclared",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Warning::UnsupportedJurisdiction { country } => {
                format!("No tax rules for country '{country}' - treated as non-taxable")
            }
            Warning::UnrecognizedTransactionType { tx_type } => {
                format!("Unknown transaction type '{tx_type}' - treated as non-taxable")
            }
            Warning::MissingCostBasis => {
                "No cost basis recorded - full proceeds counted as gain".to_string()
            }
            Warning::IntentNotDeclared => {
                "No trading intent declared - trade treated as investment".to_string()
            }
        }
    }
}
