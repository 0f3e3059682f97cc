//! Validate command - surface classification warnings without a full report

use super::{format_money, AnalysisArgs};
use crate::tax::TaxResult;
use clap::Args;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct ValidateCommand {
    #[command(flatten)]
    analysis: AnalysisArgs,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

/// A validation issue for output
#[derive(Debug, Clone, Serialize)]
struct ValidationIssue {
    #[serde(rename = "type")]
    issue_type: String,
    id: String,
    timestamp: String,
    tx_type: String,
    fiat_value: String,
    message: String,
}

/// JSON output structure
#[derive(Debug, Serialize)]
struct ValidationOutput {
    country: String,
    issue_count: usize,
    issues: Vec<ValidationIssue>,
}

impl ValidateCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let analysis = self.analysis.analyze()?;
        let issues = collect_issues(&analysis.result);

        if self.json {
            let output = ValidationOutput {
                country: analysis.config.country.code().to_string(),
                issue_count: issues.len(),
                issues: issues.clone(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print_text(&issues);
        }

        // Exit with code 1 if issues found
        if !issues.is_empty() {
            std::process::exit(1);
        }
        Ok(())
    }
}

fn collect_issues(result: &TaxResult) -> Vec<ValidationIssue> {
    result
        .analyzed_txs
        .iter()
        .flat_map(|a| {
            a.warnings.iter().map(move |w| ValidationIssue {
                issue_type: w.kind().to_string(),
                id: a.transaction.id.clone(),
                timestamp: a.transaction.timestamp.clone(),
                tx_type: a.transaction.tx_type.to_string(),
                fiat_value: format!("{:.2}", a.transaction.fiat_value_at_time),
                message: w.message(),
            })
        })
        .collect()
}

fn print_text(issues: &[ValidationIssue]) {
    println!();
    println!("VALIDATION RESULTS");
    println!();

    if issues.is_empty() {
        println!("\u{2713} No issues found.");
        return;
    }

    println!("\u{26A0} {} issue(s) found:", issues.len());
    println!();

    for (i, issue) in issues.iter().enumerate() {
        let value = issue
            .fiat_value
            .parse::<rust_decimal::Decimal>()
            .map(format_money)
            .unwrap_or_else(|_| issue.fiat_value.clone());
        println!(
            "  {}. [{}] {} {} {} worth {}",
            i + 1,
            issue.issue_type,
            issue.timestamp,
            issue.tx_type,
            issue.id,
            value
        );
        println!("     {}", issue.message);
        println!();
    }
}
