//! HTML report generation for a classified wallet history
//!
//! Generates a self-contained HTML file with embedded CSS/JS for interactive filtering.

use super::{format_money, format_rate, Analysis, AnalysisArgs};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct HtmlCommand {
    #[command(flatten)]
    analysis: AnalysisArgs,

    /// Output file path (default: opens in browser)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl HtmlCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let analysis = self.analysis.analyze()?;
        let html = generate(&analysis);

        if let Some(ref output_path) = self.output {
            std::fs::write(output_path, &html)?;
            println!("HTML report written to: {}", output_path.display());
        } else {
            let temp_path = std::env::temp_dir().join("kitetax-report.html");
            std::fs::write(&temp_path, &html)?;
            opener::open(&temp_path)?;
            println!("Opened HTML report in browser: {}", temp_path.display());
        }

        Ok(())
    }
}

/// Data structure for embedding in HTML as JSON
#[derive(Serialize)]
pub struct HtmlReportData {
    pub transactions: Vec<TransactionRow>,
    pub summary: Summary,
}

#[derive(Serialize)]
pub struct TransactionRow {
    pub id: String,
    pub timestamp: String,
    pub tx_type: String,
    pub from: String,
    pub to: String,
    pub fiat_value: String,
    pub gain_or_income: String,
    pub category: String,
    pub taxable: bool,
    pub warnings: Vec<String>,
}

#[derive(Serialize)]
pub struct Summary {
    pub jurisdiction: String,
    pub transaction_count: usize,
    pub total_volume: String,
    pub estimated_capital_gains: String,
    pub taxable_total: String,
    pub tax_rate: String,
    pub tax_due: String,
    pub categories: Vec<String>,
}

/// Generate HTML report content
pub fn generate(analysis: &Analysis) -> String {
    let data = build_report_data(analysis);
    let json_data = serde_json::to_string(&data)
        .unwrap_or_else(|_| "{}".to_string())
        // keep "</script>" in user data from closing the script block
        .replace("</", "<\\/");

    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Crypto Tax Report</title>
    <style>
{css}
    </style>
</head>
<body>
    <header>
        <h1>Crypto Tax Report <span class="jurisdiction" id="jurisdiction"></span></h1>
        <div class="filters">
            <div class="filter-group">
                <label for="type-filter">Type</label>
                <select id="type-filter" onchange="applyFilters()">
                    <option value="">All Types</option>
                    <option value="trade">Trade</option>
                    <option value="receive">Receive</option>
                    <option value="send">Send</option>
                    <option value="staking">Staking</option>
                    <option value="airdrop">Airdrop</option>
                </select>
            </div>
            <div class="filter-group">
                <label for="category-filter">Category</label>
                <select id="category-filter" onchange="applyFilters()">
                    <option value="">All Categories</option>
                </select>
            </div>
            <div class="filter-group">
                <label><input type="checkbox" id="taxable-only" onchange="applyFilters()"> Taxable only</label>
            </div>
        </div>
    </header>

    <main>
        <section class="summary-cards">
            <div class="card"><h3>Transactions</h3><p class="value" id="summary-count">-</p></div>
            <div class="card"><h3>Volume</h3><p class="value" id="summary-volume">-</p></div>
            <div class="card"><h3>Est. Capital Gains</h3><p class="value" id="summary-gains">-</p></div>
            <div class="card"><h3>Taxable Total</h3><p class="value" id="summary-taxable">-</p></div>
            <div class="card"><h3>Rate</h3><p class="value" id="summary-rate">-</p></div>
            <div class="card due"><h3>Tax Due</h3><p class="value" id="summary-due">-</p></div>
        </section>

        <section class="data-section">
            <h2>Transactions <span class="count" id="tx-count"></span></h2>
            <div class="table-container">
                <table>
                    <thead>
                        <tr>
                            <th>Timestamp</th>
                            <th>Type</th>
                            <th>From</th>
                            <th>To</th>
                            <th>Fiat Value</th>
                            <th>Gain/Income</th>
                            <th>Category</th>
                            <th>Notes</th>
                        </tr>
                    </thead>
                    <tbody id="tx-body"></tbody>
                </table>
            </div>
        </section>
    </main>

    <script>
const DATA = {json_data};

function escapeHtml(s) {{
    return String(s).replace(/[&<>"']/g, c => ({{'&': '&amp;', '<': '&lt;', '>': '&gt;', '"': '&quot;', "'": '&#39;'}})[c]);
}}

function init() {{
    const s = DATA.summary;
    document.getElementById('jurisdiction').textContent = s.jurisdiction;
    document.getElementById('summary-count').textContent = s.transaction_count;
    document.getElementById('summary-volume').textContent = s.total_volume;
    document.getElementById('summary-gains').textContent = s.estimated_capital_gains;
    document.getElementById('summary-taxable').textContent = s.taxable_total;
    document.getElementById('summary-rate').textContent = s.tax_rate;
    document.getElementById('summary-due').textContent = s.tax_due;

    const categorySelect = document.getElementById('category-filter');
    s.categories.forEach(c => {{
        const opt = document.createElement('option');
        opt.value = c;
        opt.textContent = c;
        categorySelect.appendChild(opt);
    }});

    applyFilters();
}}

function applyFilters() {{
    const type = document.getElementById('type-filter').value;
    const category = document.getElementById('category-filter').value;
    const taxableOnly = document.getElementById('taxable-only').checked;

    const rows = DATA.transactions.filter(t => {{
        if (type && t.tx_type !== type) return false;
        if (category && t.category !== category) return false;
        if (taxableOnly && !t.taxable) return false;
        return true;
    }});

    document.getElementById('tx-body').innerHTML = rows.map(t => `
        <tr class="${{t.taxable ? 'taxable' : ''}}">
            <td>${{escapeHtml(t.timestamp)}}</td>
            <td><span class="badge badge-${{escapeHtml(t.tx_type)}}">${{escapeHtml(t.tx_type)}}</span></td>
            <td>${{escapeHtml(t.from)}}</td>
            <td>${{escapeHtml(t.to)}}</td>
            <td class="number">${{escapeHtml(t.fiat_value)}}</td>
            <td class="number ${{t.gain_or_income.startsWith('-$') ? 'loss' : ''}}">${{escapeHtml(t.gain_or_income)}}</td>
            <td>${{escapeHtml(t.category)}}</td>
            <td class="warn">${{t.warnings.map(escapeHtml).join('<br>')}}</td>
        </tr>
    `).join('');
    document.getElementById('tx-count').textContent = `(${{rows.length}})`;
}}

document.addEventListener('DOMContentLoaded', init);
    </script>
</body>
</html>"##,
        css = CSS,
        json_data = json_data
    )
}

fn build_report_data(analysis: &Analysis) -> HtmlReportData {
    let result = &analysis.result;
    let config = &analysis.config;

    let transactions = result
        .analyzed_txs
        .iter()
        .map(|a| {
            let tx = &a.transaction;
            TransactionRow {
                id: tx.id.clone(),
                timestamp: tx.timestamp.clone(),
                tx_type: tx.tx_type.to_string(),
                from: tx.from_leg().unwrap_or_default(),
                to: tx.to_leg().unwrap_or_default(),
                fiat_value: format_money(tx.fiat_value_at_time),
                gain_or_income: if a.is_taxable {
                    format_money(a.gain_or_income)
                } else {
                    "-".to_string()
                },
                category: a.tax_category.to_string(),
                taxable: a.is_taxable,
                warnings: a.warnings.iter().map(|w| w.message()).collect(),
            }
        })
        .collect();

    let mut categories: Vec<String> = Vec::new();
    for a in &result.analyzed_txs {
        let label = a.tax_category.to_string();
        if !categories.contains(&label) {
            categories.push(label);
        }
    }

    let jurisdiction = match (config.intent, analysis.year) {
        (Some(intent), Some(year)) => {
            format!("{} {} ({})", config.country.display_name(), year, intent)
        }
        (Some(intent), None) => format!("{} ({})", config.country.display_name(), intent),
        (None, Some(year)) => format!("{} {}", config.country.display_name(), year),
        (None, None) => config.country.display_name().to_string(),
    };

    HtmlReportData {
        transactions,
        summary: Summary {
            jurisdiction,
            transaction_count: result.transaction_count(),
            total_volume: format_money(result.total_volume()),
            estimated_capital_gains: format_money(result.estimated_capital_gains()),
            taxable_total: format_money(result.taxable_total),
            tax_rate: format_rate(result.tax_rate),
            tax_due: format_money(result.tax_due),
            categories,
        },
    }
}

const CSS: &str = r#"
:root {
    --primary: #0891b2;
    --danger: #dc2626;
    --gray-50: #f9fafb;
    --gray-200: #e5e7eb;
    --gray-500: #6b7280;
    --gray-900: #111827;
    --type-trade: #2563eb;
    --type-trade-bg: #dbeafe;
    --type-income: #7c3aed;
    --type-income-bg: #ede9fe;
    --type-transfer: #6b7280;
    --type-transfer-bg: #f3f4f6;
}

* {
    margin: 0;
    padding: 0;
    box-sizing: border-box;
}

body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, 'Helvetica Neue', Arial, sans-serif;
    background: var(--gray-50);
    color: var(--gray-900);
    line-height: 1.5;
}

header {
    background: white;
    border-bottom: 1px solid var(--gray-200);
    padding: 1.5rem 2rem;
    position: sticky;
    top: 0;
}

header h1 {
    font-size: 1.5rem;
    font-weight: 600;
    margin-bottom: 1rem;
}

.jurisdiction {
    color: var(--gray-500);
    font-weight: 400;
    font-size: 1rem;
}

.filters {
    display: flex;
    flex-wrap: wrap;
    gap: 1.5rem;
    align-items: flex-end;
}

.filter-group {
    display: flex;
    flex-direction: column;
    gap: 0.375rem;
    font-size: 0.875rem;
}

select {
    padding: 0.5rem 0.75rem;
    border: 1px solid var(--gray-200);
    border-radius: 0.375rem;
    min-width: 160px;
}

main {
    padding: 2rem;
}

.summary-cards {
    display: grid;
    grid-template-columns: repeat(auto-fit, minmax(160px, 1fr));
    gap: 1rem;
    margin-bottom: 2rem;
}

.card {
    background: white;
    border: 1px solid var(--gray-200);
    border-radius: 0.5rem;
    padding: 1rem;
}

.card h3 {
    font-size: 0.75rem;
    color: var(--gray-500);
    text-transform: uppercase;
    letter-spacing: 0.05em;
}

.card .value {
    font-size: 1.5rem;
    font-weight: 600;
}

.card.due {
    border-color: var(--primary);
}

.data-section h2 {
    font-size: 1.125rem;
    margin-bottom: 0.75rem;
}

.count {
    color: var(--gray-500);
    font-weight: 400;
}

.table-container {
    background: white;
    border: 1px solid var(--gray-200);
    border-radius: 0.5rem;
    overflow-x: auto;
}

table {
    width: 100%;
    border-collapse: collapse;
    font-size: 0.875rem;
}

th, td {
    padding: 0.625rem 1rem;
    text-align: left;
    border-bottom: 1px solid var(--gray-200);
    white-space: nowrap;
}

th {
    background: var(--gray-50);
    font-weight: 500;
    color: var(--gray-500);
}

td.number {
    text-align: right;
    font-variant-numeric: tabular-nums;
}

td.loss {
    color: var(--danger);
}

td.warn {
    color: #b45309;
    white-space: normal;
}

.badge {
    display: inline-block;
    padding: 0.125rem 0.5rem;
    border-radius: 9999px;
    font-size: 0.75rem;
    font-weight: 500;
}

.badge-trade { color: var(--type-trade); background: var(--type-trade-bg); }
.badge-staking, .badge-airdrop { color: var(--type-income); background: var(--type-income-bg); }
.badge-send, .badge-receive { color: var(--type-transfer); background: var(--type-transfer-bg); }
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::transaction::tests::tx;
    use crate::tax::{classify, Country, JurisdictionConfig};
    use rust_decimal_macros::dec;

    fn analysis() -> Analysis {
        let config = JurisdictionConfig::new(Country::Us);
        let mut send = tx("2", "send", dec!(700), None);
        send.from_asset = "</script>".to_string();
        let txs = vec![tx("1", "trade", dec!(4200), Some(dec!(2800))), send];
        Analysis {
            result: classify(&txs, &config),
            config,
            year: None,
        }
    }

    #[test]
    fn report_data_summary() {
        let data = build_report_data(&analysis());
        assert_eq!(data.summary.jurisdiction, "United States");
        assert_eq!(data.summary.tax_due, "$350.00");
        assert_eq!(data.summary.tax_rate, "25.0%");
        assert_eq!(data.summary.categories, vec!["Capital Gain", "Non-Taxable"]);
        assert_eq!(data.transactions[0].gain_or_income, "$1400.00");
        assert_eq!(data.transactions[1].gain_or_income, "-");
    }

    #[test]
    fn embedded_data_cannot_close_script() {
        let html = generate(&analysis());
        assert_eq!(html.matches("</script>").count(), 1);
        assert!(html.contains("const DATA = {"));
    }
}
