use super::jurisdiction::{Country, Intent, JurisdictionConfig};
use super::service::find_payload;
use super::transaction::deserialize_optional_amount;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Read;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilingStatus {
    Single,
    Married,
}

/// Saved tax profile for a wallet.
///
/// Filing status, income and residency are collected by the wizard but the
/// flat-rate model does not use them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxProfile {
    #[serde(default)]
    pub user_address: Option<String>,
    pub country: String,
    #[serde(default)]
    pub tax_residency: Option<String>,
    #[serde(default)]
    pub tax_year: Option<String>,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub filing_status: Option<FilingStatus>,
    #[serde(default, deserialize_with = "deserialize_optional_amount")]
    pub annual_income: Option<Decimal>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl TaxProfile {
    pub fn jurisdiction(&self) -> JurisdictionConfig {
        let intent = self.intent.as_deref().and_then(|s| {
            let intent = Intent::from_str(s);
            if intent.is_none() && !s.trim().is_empty() {
                log::warn!("Ignoring unknown intent '{}' in tax profile", s);
            }
            intent
        });
        JurisdictionConfig {
            country: Country::from(self.country.as_str()),
            intent,
        }
    }

    pub fn tax_year(&self) -> Option<i32> {
        self.tax_year.as_deref().and_then(|y| y.trim().parse().ok())
    }
}

/// Read a profile, bare or wrapped as `{"profile": ...}` (optionally under `data`)
pub fn read_profile_json<R: Read>(reader: R) -> anyhow::Result<TaxProfile> {
    let value: Value = serde_json::from_reader(reader)?;
    let profile = match find_payload(&value, "profile") {
        Some(payload) => payload["profile"].clone(),
        None => value,
    };
    Ok(serde_json::from_value(profile)?)
}
