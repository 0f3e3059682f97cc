//! Summary command - aggregated totals and flat-rate tax due

use super::{format_money, format_rate, Analysis, AnalysisArgs};
use crate::tax::Country;
use clap::Args;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct SummaryCommand {
    #[command(flatten)]
    analysis: AnalysisArgs,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

/// Summary data for JSON output
#[derive(Debug, Serialize)]
struct SummaryData {
    country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    intent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    authority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    year: Option<i32>,
    transaction_count: usize,
    total_volume: String,
    estimated_capital_gains: String,
    categories: Vec<CategoryTotal>,
    taxable_total: String,
    tax_rate: String,
    tax_due: String,
    warning_count: usize,
    unsupported_count: usize,
}

#[derive(Debug, Serialize)]
struct CategoryTotal {
    category: String,
    total: String,
}

impl SummaryCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let analysis = self.analysis.analyze()?;
        if self.json {
            let data = summary_data(&analysis);
            println!("{}", serde_json::to_string_pretty(&data)?);
        } else {
            print_summary(&analysis);
        }
        Ok(())
    }
}

fn summary_data(analysis: &Analysis) -> SummaryData {
    let Analysis {
        config,
        year,
        result,
    } = analysis;

    SummaryData {
        country: config.country.code().to_string(),
        intent: config.intent.map(|i| i.to_string()),
        authority: config.country.authority().map(str::to_string),
        year: *year,
        transaction_count: result.transaction_count(),
        total_volume: format!("{:.2}", result.total_volume()),
        estimated_capital_gains: format!("{:.2}", result.estimated_capital_gains()),
        categories: result
            .category_totals()
            .into_iter()
            .map(|(category, total)| CategoryTotal {
                category: category.to_string(),
                total: format!("{:.2}", total),
            })
            .collect(),
        taxable_total: format!("{:.2}", result.taxable_total),
        tax_rate: result.tax_rate.to_string(),
        tax_due: format!("{:.2}", result.tax_due),
        warning_count: result.warnings().count(),
        unsupported_count: result.unsupported_count(),
    }
}

fn print_summary(analysis: &Analysis) {
    let Analysis {
        config,
        year,
        result,
    } = analysis;

    let year_str = year.map_or("All Years".to_string(), |y| y.to_string());
    let intent_str = match (config.intent, &config.country) {
        (Some(intent), _) => format!(" - {} intent", intent),
        (None, Country::Sg) => format!(" - {} intent (not declared)", config.effective_intent()),
        (None, _) => String::new(),
    };

    println!();
    println!(
        "TAX SUMMARY ({}, {}){}",
        config.country.display_name(),
        year_str,
        intent_str
    );
    println!();

    println!("ACTIVITY");
    println!("  Transactions: {}", result.transaction_count());
    println!("  Volume: {}", format_money(result.total_volume()));
    println!(
        "  Estimated capital gains: {}",
        format_money(result.estimated_capital_gains())
    );
    println!();

    println!("TAXABLE");
    let categories = result.category_totals();
    if categories.is_empty() {
        println!("  Nothing taxable");
    }
    for (category, total) in categories {
        println!("  {}: {}", category, format_money(total));
    }
    println!("  Total: {}", format_money(result.taxable_total));
    println!();

    let warnings = result.warnings().count();
    if warnings > 0 {
        println!(
            "WARNINGS: {} ({} unsupported) - run `validate` for details",
            warnings,
            result.unsupported_count()
        );
        println!();
    }

    match config.country.authority() {
        Some(authority) => println!(
            "TAX DUE: {} @ {} ({})",
            format_money(result.tax_due),
            format_rate(result.tax_rate),
            authority
        ),
        None => println!(
            "TAX DUE: {} @ {}",
            format_money(result.tax_due),
            format_rate(result.tax_rate)
        ),
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::transaction::tests::tx;
    use crate::tax::{classify, Intent, JurisdictionConfig};
    use rust_decimal_macros::dec;

    #[test]
    fn summary_data_for_singapore_trader() {
        let config = JurisdictionConfig::new(Country::Sg).with_intent(Intent::Trading);
        let txs = vec![
            tx("1", "trade", dec!(4200), Some(dec!(2800))),
            tx("2", "airdrop", dec!(1200), None),
        ];
        let analysis = Analysis {
            result: classify(&txs, &config),
            config,
            year: Some(2024),
        };

        let data = summary_data(&analysis);
        assert_eq!(data.country, "sg");
        assert_eq!(data.intent.as_deref(), Some("trading"));
        assert_eq!(data.authority.as_deref(), Some("IRAS"));
        assert_eq!(data.taxable_total, "2600.00");
        assert_eq!(data.tax_due, "208.00");
        assert_eq!(data.categories.len(), 2);
        assert_eq!(data.categories[0].category, "Income Tax (Trading)");
        assert_eq!(data.warning_count, 0);
    }
}
