//! Saved responses from the tax service: strategy comparison and settlement.
//!
//! The service wraps payloads inconsistently, sometimes at the top level and
//! sometimes under `data`, so every reader looks in both places.

use super::transaction::deserialize_amount;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid strategy comparison response")]
    InvalidStrategyComparison,
    #[error("recommended strategy {0} is not in the comparison")]
    UnknownRecommendation(CostBasisMethod),
    #[error("invalid settlement response")]
    InvalidSettlement,
    #[error("on-chain settlement without a transaction hash")]
    MissingTxHash,
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Object holding `key`, either at the top level or under `data`
pub(crate) fn find_payload<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    if value.get(key).is_some() {
        return Some(value);
    }
    value.get("data").filter(|data| data.get(key).is_some())
}

/// Lot-matching method used by the service when computing cost basis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CostBasisMethod {
    Fifo,
    Lifo,
    Hifo,
}

impl fmt::Display for CostBasisMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostBasisMethod::Fifo => f.write_str("FIFO"),
            CostBasisMethod::Lifo => f.write_str("LIFO"),
            CostBasisMethod::Hifo => f.write_str("HIFO"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyComparison {
    pub strategy: CostBasisMethod,
    #[serde(deserialize_with = "deserialize_amount")]
    pub tax_amount: Decimal,
    #[serde(deserialize_with = "deserialize_amount")]
    pub capital_gains: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareStrategiesResult {
    pub strategies: Vec<StrategyComparison>,
    pub recommended: CostBasisMethod,
}

impl CompareStrategiesResult {
    pub fn recommended_strategy(&self) -> Option<&StrategyComparison> {
        self.strategies
            .iter()
            .find(|s| s.strategy == self.recommended)
    }

    /// Tax saved by the recommendation against the most expensive method
    pub fn savings(&self) -> Decimal {
        let worst = self
            .strategies
            .iter()
            .map(|s| s.tax_amount)
            .max()
            .unwrap_or(Decimal::ZERO);
        self.recommended_strategy()
            .map_or(Decimal::ZERO, |r| worst - r.tax_amount)
    }
}

/// Parse a strategy comparison from either response envelope
pub fn parse_strategy_comparison(json: &str) -> Result<CompareStrategiesResult, ServiceError> {
    let value: Value = serde_json::from_str(json)?;
    let payload =
        find_payload(&value, "strategies").ok_or(ServiceError::InvalidStrategyComparison)?;
    let result: CompareStrategiesResult = serde_json::from_value(payload.clone())?;
    if result.recommended_strategy().is_none() {
        return Err(ServiceError::UnknownRecommendation(result.recommended));
    }
    Ok(result)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SettlementMode {
    OnChain,
    InitializationRequired,
}

/// Receipt returned after asking the service to pay the tax due
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementReceipt {
    #[serde(default)]
    pub success: bool,
    pub mode: SettlementMode,
    #[serde(deserialize_with = "deserialize_amount")]
    pub tax_amount: Decimal,
    pub authority: String,
    #[serde(default)]
    pub tx_hash: String,
    pub user_address: String,
    #[serde(default)]
    pub aa_wallet_address: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub instruction: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome<'a> {
    Settled {
        tx_hash: &'a str,
    },
    /// Payer smart wallet is not deployed yet
    InitializationRequired {
        wallet: Option<&'a str>,
        instruction: Option<&'a str>,
    },
}

impl SettlementReceipt {
    pub fn outcome(&self) -> SettlementOutcome<'_> {
        match self.mode {
            SettlementMode::OnChain => SettlementOutcome::Settled {
                tx_hash: &self.tx_hash,
            },
            SettlementMode::InitializationRequired => SettlementOutcome::InitializationRequired {
                wallet: self.aa_wallet_address.as_deref(),
                instruction: self.instruction.as_deref(),
            },
        }
    }
}

/// Parse a settlement receipt from either response envelope
pub fn parse_settlement(json: &str) -> Result<SettlementReceipt, ServiceError> {
    let value: Value = serde_json::from_str(json)?;
    let payload = find_payload(&value, "mode").ok_or(ServiceError::InvalidSettlement)?;
    let receipt: SettlementReceipt = serde_json::from_value(payload.clone())?;
    if receipt.mode == SettlementMode::OnChain && receipt.tx_hash.trim().is_empty() {
        return Err(ServiceError::MissingTxHash);
    }
    Ok(receipt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const COMPARISON: &str = r#"{
        "strategies": [
            {"strategy": "FIFO", "taxAmount": 695, "capitalGains": 1400},
            {"strategy": "LIFO", "taxAmount": 540.5, "capitalGains": 780},
            {"strategy": "HIFO", "taxAmount": 410, "capitalGains": 260}
        ],
        "recommended": "HIFO"
    }"#;

    #[test]
    fn parses_top_level_comparison() {
        let result = parse_strategy_comparison(COMPARISON).unwrap();
        assert_eq!(result.strategies.len(), 3);
        assert_eq!(result.recommended, CostBasisMethod::Hifo);
        assert_eq!(result.strategies[1].tax_amount, dec!(540.5));
        assert_eq!(
            result.recommended_strategy().map(|s| s.capital_gains),
            Some(dec!(260))
        );
        assert_eq!(result.savings(), dec!(285));
    }

    #[test]
    fn parses_comparison_nested_under_data() {
        let json = format!(r#"{{"success": true, "data": {COMPARISON}}}"#);
        let result = parse_strategy_comparison(&json).unwrap();
        assert_eq!(result.recommended, CostBasisMethod::Hifo);
    }

    #[test]
    fn rejects_comparison_without_strategies() {
        let err = parse_strategy_comparison(r#"{"success": true, "data": {}}"#).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidStrategyComparison));
    }

    #[test]
    fn rejects_recommendation_not_in_list() {
        let json = r#"{"strategies": [{"strategy": "FIFO", "taxAmount": 1, "capitalGains": 1}], "recommended": "LIFO"}"#;
        let err = parse_strategy_comparison(json).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::UnknownRecommendation(CostBasisMethod::Lifo)
        ));
    }

    #[test]
    fn on_chain_settlement() {
        let json = r#"{
            "success": true,
            "mode": "on-chain",
            "taxAmount": 695,
            "authority": "IRS",
            "txHash": "0xabc",
            "userAddress": "0x123"
        }"#;
        let receipt = parse_settlement(json).unwrap();
        assert_eq!(receipt.tax_amount, dec!(695));
        assert_eq!(receipt.outcome(), SettlementOutcome::Settled { tx_hash: "0xabc" });
    }

    #[test]
    fn settlement_needing_initialization() {
        let json = r#"{"data": {
            "success": false,
            "mode": "initialization-required",
            "taxAmount": "110.4",
            "authority": "IRAS",
            "txHash": "",
            "userAddress": "0x123",
            "aaWalletAddress": "0xaa",
            "instruction": "Fund the wallet to deploy it"
        }}"#;
        let receipt = parse_settlement(json).unwrap();
        assert_eq!(
            receipt.outcome(),
            SettlementOutcome::InitializationRequired {
                wallet: Some("0xaa"),
                instruction: Some("Fund the wallet to deploy it"),
            }
        );
    }

    #[test]
    fn on_chain_settlement_requires_hash() {
        let json = r#"{"mode": "on-chain", "taxAmount": 1, "authority": "IRS", "userAddress": "0x1"}"#;
        assert!(matches!(
            parse_settlement(json).unwrap_err(),
            ServiceError::MissingTxHash
        ));
    }
}
