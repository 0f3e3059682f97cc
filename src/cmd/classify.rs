//! Classify command - per-transaction view of the tax treatment

use super::{format_money, format_rate, AnalysisArgs};
use crate::tax::{AnalyzedTransaction, TaxResult, TransactionType};
use clap::{Args, ValueEnum};
use std::io;
use tabled::{
    settings::{object::Columns, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct ClassifyCommand {
    #[command(flatten)]
    analysis: AnalysisArgs,

    /// Filter by transaction type
    #[arg(long = "type", value_enum)]
    tx_type: Option<TypeFilter>,

    /// Only show taxable transactions
    #[arg(long)]
    taxable_only: bool,

    /// Output the full result as JSON
    #[arg(long, conflicts_with = "csv")]
    json: bool,

    /// Output rows as CSV instead of a formatted table
    #[arg(long)]
    csv: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TypeFilter {
    Trade,
    Receive,
    Send,
    Staking,
    Airdrop,
}

impl TypeFilter {
    fn matches(self, tx_type: &TransactionType) -> bool {
        matches!(
            (self, tx_type),
            (TypeFilter::Trade, TransactionType::Trade)
                | (TypeFilter::Receive, TransactionType::Receive)
                | (TypeFilter::Send, TransactionType::Send)
                | (TypeFilter::Staking, TransactionType::Staking)
                | (TypeFilter::Airdrop, TransactionType::Airdrop)
        )
    }
}

impl ClassifyCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let analysis = self.analysis.analyze()?;

        if self.json {
            // Filters only apply to the row views; the JSON is the whole result
            println!("{}", serde_json::to_string_pretty(&analysis.result)?);
            return Ok(());
        }

        let rows = build_rows(&analysis.result, self.tx_type, self.taxable_only);
        if self.csv {
            write_csv(&rows)
        } else {
            print_table(&rows, &analysis.result);
            Ok(())
        }
    }
}

/// Row for the classification table and CSV output
#[derive(Debug, Clone, Tabled, serde::Serialize)]
pub struct ClassifiedRow {
    #[tabled(rename = "#")]
    #[serde(rename = "row_num")]
    pub row_num: usize,

    #[tabled(rename = "ID")]
    pub id: String,

    #[tabled(rename = "Timestamp")]
    pub timestamp: String,

    #[tabled(rename = "Type")]
    #[serde(rename = "type")]
    pub tx_type: String,

    #[tabled(rename = "From")]
    pub from: String,

    #[tabled(rename = "To")]
    pub to: String,

    #[tabled(rename = "Fiat Value")]
    pub fiat_value: String,

    #[tabled(rename = "Cost Basis")]
    pub cost_basis: String,

    #[tabled(rename = "Gain/Income")]
    pub gain_or_income: String,

    #[tabled(rename = "Category")]
    pub category: String,

    #[tabled(rename = "Taxable")]
    pub taxable: String,

    #[tabled(rename = "Notes")]
    pub notes: String,
}

fn build_rows(
    result: &TaxResult,
    type_filter: Option<TypeFilter>,
    taxable_only: bool,
) -> Vec<ClassifiedRow> {
    result
        .analyzed_txs
        .iter()
        .enumerate()
        .filter(|(_, a)| type_filter.is_none_or(|f| f.matches(&a.transaction.tx_type)))
        .filter(|(_, a)| !taxable_only || a.is_taxable)
        .map(|(idx, a)| to_row(idx + 1, a))
        .collect()
}

fn to_row(row_num: usize, a: &AnalyzedTransaction) -> ClassifiedRow {
    let tx = &a.transaction;
    ClassifiedRow {
        row_num,
        id: tx.id.clone(),
        timestamp: tx.timestamp.clone(),
        tx_type: tx.tx_type.to_string(),
        from: tx.from_leg().unwrap_or_else(|| "-".to_string()),
        to: tx.to_leg().unwrap_or_else(|| "-".to_string()),
        fiat_value: format_money(tx.fiat_value_at_time),
        cost_basis: tx
            .cost_basis
            .map_or_else(|| "-".to_string(), format_money),
        gain_or_income: if a.is_taxable {
            format_money(a.gain_or_income)
        } else {
            "-".to_string()
        },
        category: a.tax_category.to_string(),
        taxable: if a.is_taxable { "yes" } else { "no" }.to_string(),
        notes: a
            .warnings
            .iter()
            .map(|w| w.kind())
            .collect::<Vec<_>>()
            .join(", "),
    }
}

fn print_table(rows: &[ClassifiedRow], result: &TaxResult) {
    if rows.is_empty() {
        println!("No transactions found matching filters");
    } else {
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Columns::new(6..9)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
    }

    println!();
    println!(
        "Taxable total: {} | Rate: {} | Tax due: {}",
        format_money(result.taxable_total),
        format_rate(result.tax_rate),
        format_money(result.tax_due)
    );
}

fn write_csv(rows: &[ClassifiedRow]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(io::stdout());
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::transaction::tests::tx;
    use crate::tax::{classify, Country, JurisdictionConfig};
    use rust_decimal_macros::dec;

    fn result() -> TaxResult {
        let txs = vec![
            tx("1", "trade", dec!(4200), Some(dec!(2800))),
            tx("2", "airdrop", dec!(1200), None),
            tx("4", "send", dec!(700), None),
        ];
        classify(&txs, &JurisdictionConfig::new(Country::Us))
    }

    #[test]
    fn rows_keep_original_numbering_when_filtered() {
        let rows = build_rows(&result(), Some(TypeFilter::Airdrop), false);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row_num, 2);
        assert_eq!(rows[0].category, "Ordinary Income");
        assert_eq!(rows[0].gain_or_income, "$1200.00");
    }

    #[test]
    fn taxable_only_drops_exempt_rows() {
        let rows = build_rows(&result(), None, true);
        let ids: Vec<_> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn non_taxable_row_shows_dash() {
        let rows = build_rows(&result(), Some(TypeFilter::Send), false);
        assert_eq!(rows[0].gain_or_income, "-");
        assert_eq!(rows[0].taxable, "no");
        assert_eq!(rows[0].category, "Non-Taxable");
        assert_eq!(rows[0].cost_basis, "-");
    }
}
