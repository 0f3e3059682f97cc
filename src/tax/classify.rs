//! Per-transaction tax classification and flat-rate aggregation.

use super::jurisdiction::{Country, Intent, JurisdictionConfig};
use super::transaction::{Transaction, TransactionType};
use super::warnings::Warning;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// Tax treatment label shown for a classified transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TaxCategory {
    #[serde(rename = "Capital Gain")]
    CapitalGain,
    #[serde(rename = "Ordinary Income")]
    OrdinaryIncome,
    #[serde(rename = "Income Tax (Trading)")]
    TradingIncome,
    #[serde(rename = "Other Income")]
    OtherIncome,
    #[serde(rename = "Non-Taxable")]
    NonTaxable,
}

impl TaxCategory {
    pub fn label(self) -> &'static str {
        match self {
            TaxCategory::CapitalGain => "Capital Gain",
            TaxCategory::OrdinaryIncome => "Ordinary Income",
            TaxCategory::TradingIncome => "Income Tax (Trading)",
            TaxCategory::OtherIncome => "Other Income",
            TaxCategory::NonTaxable => "Non-Taxable",
        }
    }
}

impl fmt::Display for TaxCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of the rule table for one (country, type, intent) combination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Treatment {
    /// Taxed on fiat value less cost basis
    Gain(TaxCategory),
    /// Taxed on the full fiat value
    Income(TaxCategory),
    /// Known combination that is not taxable
    Exempt,
    /// No rule exists; reported as non-taxable with the reason attached
    Unsupported(Warning),
}

/// The rule table. Every combination lands in exactly one arm.
pub fn rule(country: &Country, intent: Option<Intent>, tx_type: &TransactionType) -> Treatment {
    use TransactionType::*;

    match (country, tx_type) {
        (Country::Unsupported(code), _) => Treatment::Unsupported(Warning::UnsupportedJurisdiction {
            country: code.clone(),
        }),
        (_, Other(tag)) => Treatment::Unsupported(Warning::UnrecognizedTransactionType {
            tx_type: tag.clone(),
        }),
        (Country::Us, Trade) => Treatment::Gain(TaxCategory::CapitalGain),
        (Country::Us, Airdrop | Staking) => Treatment::Income(TaxCategory::OrdinaryIncome),
        (Country::Sg, Trade) => match intent {
            Some(Intent::Trading) => Treatment::Gain(TaxCategory::TradingIncome),
            Some(Intent::Investment) | None => Treatment::Exempt,
        },
        (Country::Sg, Airdrop | Staking) => Treatment::Income(TaxCategory::OtherIncome),
        (Country::Us | Country::Sg, Receive | Send) => Treatment::Exempt,
    }
}

/// A transaction together with its classification
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub is_taxable: bool,
    /// Gain (possibly negative) for trades, full value for income
    pub gain_or_income: Decimal,
    pub tax_category: TaxCategory,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

impl AnalyzedTransaction {
    pub fn is_unsupported(&self) -> bool {
        self.warnings.iter().any(Warning::is_unsupported)
    }
}

/// Result of classifying a batch of transactions
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxResult {
    /// Same order and length as the input
    pub analyzed_txs: Vec<AnalyzedTransaction>,
    /// Sum of gain/income over taxable rows; losses are not floored
    pub taxable_total: Decimal,
    pub tax_rate: Decimal,
    /// `taxable_total * tax_rate`, unrounded
    pub tax_due: Decimal,
}

/// Classify every transaction and total the taxable amounts.
///
/// Each transaction is classified on its own; nothing carries over between
/// rows. Unknown countries and types fall to non-taxable with a warning.
pub fn classify(transactions: &[Transaction], config: &JurisdictionConfig) -> TaxResult {
    let mut taxable_total = Decimal::ZERO;

    let analyzed_txs: Vec<AnalyzedTransaction> = transactions
        .iter()
        .map(|tx| {
            let analyzed = analyze(tx, config);
            if analyzed.is_taxable {
                taxable_total = taxable_total.saturating_add(analyzed.gain_or_income);
            }
            analyzed
        })
        .collect();

    let tax_rate = config.country.flat_rate();
    let tax_due = taxable_total.saturating_mul(tax_rate);

    log::debug!(
        "Classified {} transactions for {}: taxable {} @ {} = {}",
        analyzed_txs.len(),
        config.country,
        taxable_total,
        tax_rate,
        tax_due
    );

    TaxResult {
        analyzed_txs,
        taxable_total,
        tax_rate,
        tax_due,
    }
}

fn analyze(tx: &Transaction, config: &JurisdictionConfig) -> AnalyzedTransaction {
    let mut warnings = Vec::new();

    if config.country == Country::Sg
        && tx.tx_type == TransactionType::Trade
        && config.intent.is_none()
    {
        warnings.push(Warning::IntentNotDeclared);
    }

    let (is_taxable, gain_or_income, tax_category) =
        match rule(&config.country, config.intent, &tx.tx_type) {
            Treatment::Gain(category) => {
                if tx.cost_basis.is_none() {
                    warnings.push(Warning::MissingCostBasis);
                }
                (true, tx.fiat_value_at_time - tx.cost_basis_or_zero(), category)
            }
            Treatment::Income(category) => (true, tx.fiat_value_at_time, category),
            Treatment::Exempt => (false, Decimal::ZERO, TaxCategory::NonTaxable),
            Treatment::Unsupported(warning) => {
                log::warn!("Transaction {}: {}", tx.id, warning.message());
                warnings.push(warning);
                (false, Decimal::ZERO, TaxCategory::NonTaxable)
            }
        };

    log::debug!(
        "{} {} -> {} {}",
        tx.id,
        tx.tx_type,
        tax_category,
        gain_or_income
    );

    AnalyzedTransaction {
        transaction: tx.clone(),
        is_taxable,
        gain_or_income,
        tax_category,
        warnings,
    }
}

impl TaxResult {
    pub fn transaction_count(&self) -> usize {
        self.analyzed_txs.len()
    }

    /// Fiat value across every transaction, taxable or not
    pub fn total_volume(&self) -> Decimal {
        self.analyzed_txs
            .iter()
            .map(|a| a.transaction.fiat_value_at_time)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    /// Positive trade gains only
    pub fn estimated_capital_gains(&self) -> Decimal {
        self.analyzed_txs
            .iter()
            .filter(|a| a.transaction.tx_type == TransactionType::Trade)
            .filter(|a| a.gain_or_income > Decimal::ZERO)
            .map(|a| a.gain_or_income)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    /// Taxable totals per category, in the order categories first appear
    pub fn category_totals(&self) -> Vec<(TaxCategory, Decimal)> {
        let mut totals: Vec<(TaxCategory, Decimal)> = Vec::new();
        for a in self.analyzed_txs.iter().filter(|a| a.is_taxable) {
            match totals.iter_mut().find(|(c, _)| *c == a.tax_category) {
                Some((_, total)) => *total = total.saturating_add(a.gain_or_income),
                None => totals.push((a.tax_category, a.gain_or_income)),
            }
        }
        totals
    }

    /// Every warning paired with the id of the transaction it belongs to
    pub fn warnings(&self) -> impl Iterator<Item = (&str, &Warning)> {
        self.analyzed_txs.iter().flat_map(|a| {
            a.warnings
                .iter()
                .map(move |w| (a.transaction.id.as_str(), w))
        })
    }

    pub fn unsupported_count(&self) -> usize {
        self.analyzed_txs
            .iter()
            .filter(|a| a.is_unsupported())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::transaction::tests::tx;
    use rust_decimal_macros::dec;

    fn us() -> JurisdictionConfig {
        JurisdictionConfig::new(Country::Us)
    }

    fn sg(intent: Option<Intent>) -> JurisdictionConfig {
        JurisdictionConfig {
            country: Country::Sg,
            intent,
        }
    }

    fn wallet() -> Vec<Transaction> {
        vec![
            tx("1", "trade", dec!(4200), Some(dec!(2800))),
            tx("2", "airdrop", dec!(1200), None),
            tx("3", "staking", dec!(180), None),
            tx("4", "send", dec!(700), None),
        ]
    }

    #[test]
    fn empty_input() {
        let result = classify(&[], &us());
        assert!(result.analyzed_txs.is_empty());
        assert_eq!(result.taxable_total, Decimal::ZERO);
        assert_eq!(result.tax_due, Decimal::ZERO);
        assert_eq!(result.tax_rate, dec!(0.25));
    }

    #[test]
    fn us_trade_is_capital_gain() {
        let result = classify(&[tx("1", "trade", dec!(4200), Some(dec!(2800)))], &us());
        let a = &result.analyzed_txs[0];
        assert!(a.is_taxable);
        assert_eq!(a.gain_or_income, dec!(1400));
        assert_eq!(a.tax_category, TaxCategory::CapitalGain);
        assert_eq!(result.taxable_total, dec!(1400));
        assert_eq!(result.tax_rate, dec!(0.25));
        assert_eq!(result.tax_due, dec!(350));
    }

    #[test]
    fn us_airdrop_is_ordinary_income() {
        let result = classify(&[tx("2", "airdrop", dec!(1200), None)], &us());
        let a = &result.analyzed_txs[0];
        assert!(a.is_taxable);
        assert_eq!(a.gain_or_income, dec!(1200));
        assert_eq!(a.tax_category, TaxCategory::OrdinaryIncome);
        assert!(a.warnings.is_empty());
    }

    #[test]
    fn sg_trade_with_investment_intent_is_exempt() {
        let result = classify(
            &[tx("1", "trade", dec!(4200), Some(dec!(2800)))],
            &sg(Some(Intent::Investment)),
        );
        let a = &result.analyzed_txs[0];
        assert!(!a.is_taxable);
        assert_eq!(a.gain_or_income, Decimal::ZERO);
        assert_eq!(a.tax_category, TaxCategory::NonTaxable);
        assert!(a.warnings.is_empty());
    }

    #[test]
    fn sg_trade_with_trading_intent_is_income() {
        let result = classify(
            &[tx("1", "trade", dec!(4200), Some(dec!(2800)))],
            &sg(Some(Intent::Trading)),
        );
        let a = &result.analyzed_txs[0];
        assert!(a.is_taxable);
        assert_eq!(a.gain_or_income, dec!(1400));
        assert_eq!(a.tax_category, TaxCategory::TradingIncome);
        assert_eq!(result.tax_due, dec!(112));
    }

    #[test]
    fn sg_trade_without_intent_is_exempt_with_warning() {
        let result = classify(&[tx("1", "trade", dec!(4200), Some(dec!(2800)))], &sg(None));
        let a = &result.analyzed_txs[0];
        assert!(!a.is_taxable);
        assert_eq!(a.tax_category, TaxCategory::NonTaxable);
        assert_eq!(a.warnings, vec![Warning::IntentNotDeclared]);
        assert!(!a.is_unsupported());
    }

    #[test]
    fn sg_staking_is_other_income() {
        let result = classify(&[tx("3", "staking", dec!(180), None)], &sg(None));
        let a = &result.analyzed_txs[0];
        assert!(a.is_taxable);
        assert_eq!(a.tax_category, TaxCategory::OtherIncome);
        assert_eq!(result.tax_due, dec!(14.4));
    }

    #[test]
    fn send_and_receive_never_taxable() {
        let txs = vec![
            tx("4", "send", dec!(700), None),
            tx("5", "receive", dec!(700), Some(dec!(10))),
        ];
        for config in [us(), sg(None), sg(Some(Intent::Trading)), sg(Some(Intent::Investment))] {
            let result = classify(&txs, &config);
            for a in &result.analyzed_txs {
                assert!(!a.is_taxable);
                assert_eq!(a.gain_or_income, Decimal::ZERO);
                assert_eq!(a.tax_category, TaxCategory::NonTaxable);
            }
            assert_eq!(result.taxable_total, Decimal::ZERO);
        }
    }

    #[test]
    fn missing_cost_basis_counts_full_value() {
        let result = classify(&[tx("1", "trade", dec!(4200), None)], &us());
        let a = &result.analyzed_txs[0];
        assert_eq!(a.gain_or_income, dec!(4200));
        assert_eq!(a.warnings, vec![Warning::MissingCostBasis]);
    }

    #[test]
    fn unknown_country_is_non_taxable_and_reported() {
        let config = JurisdictionConfig::new(Country::from("uk"));
        let result = classify(&wallet(), &config);
        assert_eq!(result.analyzed_txs.len(), 4);
        for a in &result.analyzed_txs {
            assert!(!a.is_taxable);
            assert_eq!(a.gain_or_income, Decimal::ZERO);
            assert_eq!(a.tax_category, TaxCategory::NonTaxable);
            assert_eq!(
                a.warnings,
                vec![Warning::UnsupportedJurisdiction {
                    country: "uk".to_string()
                }]
            );
        }
        assert_eq!(result.tax_rate, dec!(0.08));
        assert_eq!(result.tax_due, Decimal::ZERO);
        assert_eq!(result.unsupported_count(), 4);
    }

    #[test]
    fn unknown_type_is_non_taxable_and_reported() {
        let result = classify(&[tx("9", "bridge", dec!(500), None)], &us());
        let a = &result.analyzed_txs[0];
        assert!(!a.is_taxable);
        assert!(a.is_unsupported());
        assert_eq!(result.unsupported_count(), 1);
    }

    #[test]
    fn codes_in_other_case_are_not_supported() {
        let result = classify(
            &[tx("1", "trade", dec!(4200), Some(dec!(2800)))],
            &JurisdictionConfig::new(Country::from("US")),
        );
        let a = &result.analyzed_txs[0];
        assert!(!a.is_taxable);
        assert_eq!(a.gain_or_income, Decimal::ZERO);
        assert_eq!(a.tax_category, TaxCategory::NonTaxable);
        assert_eq!(
            a.warnings,
            vec![Warning::UnsupportedJurisdiction {
                country: "US".to_string()
            }]
        );
        assert_eq!(result.tax_due, Decimal::ZERO);

        let result = classify(&[tx("2", "TRADE", dec!(4200), Some(dec!(2800)))], &us());
        let a = &result.analyzed_txs[0];
        assert!(!a.is_taxable);
        assert_eq!(a.tax_category, TaxCategory::NonTaxable);
        assert_eq!(
            a.warnings,
            vec![Warning::UnrecognizedTransactionType {
                tx_type: "TRADE".to_string()
            }]
        );
        assert_eq!(result.tax_due, Decimal::ZERO);
    }

    #[test]
    fn huge_totals_saturate() {
        let txs = vec![
            tx("1", "airdrop", Decimal::MAX, None),
            tx("2", "staking", Decimal::MAX, None),
        ];
        let result = classify(&txs, &us());
        assert_eq!(result.taxable_total, Decimal::MAX);
        assert_eq!(result.tax_due, Decimal::MAX * dec!(0.25));
        assert_eq!(result.total_volume(), Decimal::MAX);
        assert_eq!(
            result.category_totals(),
            vec![(TaxCategory::OrdinaryIncome, Decimal::MAX)]
        );
    }

    #[test]
    fn losses_reduce_total_and_can_make_tax_negative() {
        let txs = vec![
            tx("1", "trade", dec!(1000), Some(dec!(3000))),
            tx("2", "trade", dec!(500), Some(dec!(100))),
        ];
        let result = classify(&txs, &us());
        assert_eq!(result.analyzed_txs[0].gain_or_income, dec!(-2000));
        assert_eq!(result.taxable_total, dec!(-1600));
        assert_eq!(result.tax_due, dec!(-400));
    }

    #[test]
    fn order_and_length_preserved() {
        let txs = wallet();
        let result = classify(&txs, &us());
        let ids: Vec<_> = result
            .analyzed_txs
            .iter()
            .map(|a| a.transaction.id.as_str())
            .collect();
        assert_eq!(ids, vec!["1", "2", "3", "4"]);
        assert_eq!(result.analyzed_txs[0].transaction, txs[0]);
    }

    #[test]
    fn total_matches_sum_of_taxable_rows() {
        for config in [us(), sg(Some(Intent::Trading)), sg(None)] {
            let result = classify(&wallet(), &config);
            let sum: Decimal = result
                .analyzed_txs
                .iter()
                .filter(|a| a.is_taxable)
                .map(|a| a.gain_or_income)
                .sum();
            assert_eq!(result.taxable_total, sum);
            assert_eq!(result.tax_due, result.taxable_total * result.tax_rate);
        }
    }

    #[test]
    fn wallet_totals() {
        let result = classify(&wallet(), &us());
        assert_eq!(result.taxable_total, dec!(2780));
        assert_eq!(result.tax_due, dec!(695));

        let result = classify(&wallet(), &sg(Some(Intent::Trading)));
        assert_eq!(result.taxable_total, dec!(2780));
        assert_eq!(result.tax_due, dec!(222.4));

        let result = classify(&wallet(), &sg(Some(Intent::Investment)));
        assert_eq!(result.taxable_total, dec!(1380));
        assert_eq!(result.tax_due, dec!(110.4));
    }

    #[test]
    fn classification_is_deterministic() {
        let txs = wallet();
        assert_eq!(classify(&txs, &us()), classify(&txs, &us()));
    }

    #[test]
    fn dashboard_statistics() {
        let mut txs = wallet();
        txs.push(tx("5", "trade", dec!(100), Some(dec!(300))));
        let result = classify(&txs, &us());
        assert_eq!(result.transaction_count(), 5);
        assert_eq!(result.total_volume(), dec!(6380));
        assert_eq!(result.estimated_capital_gains(), dec!(1400));
        assert_eq!(
            result.category_totals(),
            vec![
                (TaxCategory::CapitalGain, dec!(1200)),
                (TaxCategory::OrdinaryIncome, dec!(1380)),
            ]
        );
    }

    #[test]
    fn warnings_iterate_with_ids() {
        let txs = vec![
            tx("1", "trade", dec!(10), None),
            tx("2", "bridge", dec!(10), None),
        ];
        let result = classify(&txs, &us());
        let warnings: Vec<_> = result.warnings().collect();
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0], ("1", &Warning::MissingCostBasis));
        assert_eq!(warnings[1].0, "2");
    }

    #[test]
    fn serializes_with_camel_case_and_labels() {
        let result = classify(&[tx("1", "trade", dec!(4200), Some(dec!(2800)))], &us());
        let json = serde_json::to_value(&result).unwrap();
        let row = &json["analyzedTxs"][0];
        assert_eq!(row["taxCategory"], "Capital Gain");
        assert_eq!(row["isTaxable"], true);
        assert_eq!(row["type"], "trade");
        assert_eq!(row["id"], "1");
        assert!(row.get("warnings").is_none());
        assert!(json.get("taxDue").is_some());
    }

    #[test]
    fn rule_table() {
        let trading = Some(Intent::Trading);
        assert_eq!(
            rule(&Country::Us, None, &TransactionType::Staking),
            Treatment::Income(TaxCategory::OrdinaryIncome)
        );
        assert_eq!(
            rule(&Country::Us, trading, &TransactionType::Trade),
            Treatment::Gain(TaxCategory::CapitalGain)
        );
        assert_eq!(
            rule(&Country::Sg, trading, &TransactionType::Airdrop),
            Treatment::Income(TaxCategory::OtherIncome)
        );
        assert_eq!(
            rule(&Country::Sg, trading, &TransactionType::Receive),
            Treatment::Exempt
        );
    }
}
