//! Strategies command - render a saved cost-basis strategy comparison

use super::{format_money, read_to_string};
use crate::tax::{parse_strategy_comparison, CompareStrategiesResult};
use clap::Args;
use std::path::PathBuf;
use tabled::{settings::Style, Table, Tabled};

#[derive(Args, Debug)]
pub struct StrategiesCommand {
    /// Strategy comparison response saved from the tax service ("-" for stdin)
    #[arg(short, long)]
    file: PathBuf,

    /// Output as JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Tabled)]
struct StrategyRow {
    #[tabled(rename = "Method")]
    method: String,
    #[tabled(rename = "Capital Gains")]
    capital_gains: String,
    #[tabled(rename = "Tax")]
    tax: String,
    #[tabled(rename = "")]
    marker: String,
}

impl StrategiesCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let comparison = parse_strategy_comparison(&read_to_string(&self.file)?)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&comparison)?);
            return Ok(());
        }

        println!("{}", Table::new(rows(&comparison)).with(Style::rounded()));
        println!();
        println!(
            "Recommended: {} (saves {} against the most expensive method)",
            comparison.recommended,
            format_money(comparison.savings())
        );
        Ok(())
    }
}

fn rows(comparison: &CompareStrategiesResult) -> Vec<StrategyRow> {
    comparison
        .strategies
        .iter()
        .map(|s| StrategyRow {
            method: s.strategy.to_string(),
            capital_gains: format_money(s.capital_gains),
            tax: format_money(s.tax_amount),
            marker: if s.strategy == comparison.recommended {
                "recommended".to_string()
            } else {
                String::new()
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_recommended_row() {
        let json = r#"{"strategies": [
            {"strategy": "FIFO", "taxAmount": 695, "capitalGains": 1400},
            {"strategy": "HIFO", "taxAmount": 410, "capitalGains": 260}
        ], "recommended": "HIFO"}"#;
        let comparison = parse_strategy_comparison(json).unwrap();
        let rows = rows(&comparison);
        assert_eq!(rows[0].marker, "");
        assert_eq!(rows[1].method, "HIFO");
        assert_eq!(rows[1].marker, "recommended");
        assert_eq!(rows[1].tax, "$410.00");
    }
}
