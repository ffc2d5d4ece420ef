use crate::{ReportRenderer, TableView};
use analysis_core::{AlertTag, AnalysisConfig, CreditReport};
use std::sync::Arc;

const RED: &str = "#c21807";
const GREEN: &str = "#008000";

pub struct HtmlReport {
    config: Arc<AnalysisConfig>,
}

impl HtmlReport {
    pub fn new(config: Arc<AnalysisConfig>) -> Self {
        Self { config }
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn table(view: &TableView) -> String {
    let head: String = view
        .header
        .iter()
        .map(|h| format!(r#"<th style="padding:6px 10px;border-bottom:2px solid #1e293b;">{}</th>"#, escape(h)))
        .collect();
    let body: String = view
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let bg = if i % 2 == 1 { r#" style="background:#f8fafc;""# } else { "" };
            let cells: String = row
                .iter()
                .enumerate()
                .map(|(j, c)| {
                    let align = if j == 0 { "left" } else { "center" };
                    format!(r#"<td style="padding:6px 10px;text-align:{align};">{}</td>"#, escape(c))
                })
                .collect();
            format!("<tr{bg}>{cells}</tr>\n")
        })
        .collect();
    format!(
        r#"<table style="border-collapse:collapse;width:100%;font-size:13px;">
<thead><tr>{head}</tr></thead>
<tbody>
{body}</tbody>
</table>"#
    )
}

impl ReportRenderer for HtmlReport {
    fn extension(&self) -> &'static str {
        "html"
    }

    fn render(&self, report: &CreditReport) -> String {
        let rating = &report.rating;
        let target = escape(&report.target);
        let year = report.year;
        let generated = report.generated_at.format("%Y-%m-%d %H:%M:%S");
        let grade = escape(&rating.rating);
        let score = rating.final_score;
        let liquidity = rating.categories.liquidity;
        let leverage = rating.categories.leverage;
        let profitability = rating.categories.profitability;

        let alerts: String = report
            .alerts
            .iter()
            .map(|a| {
                let color = match a.tag {
                    AlertTag::Red => RED,
                    AlertTag::Green => GREEN,
                };
                format!(r#"<li style="color:{color};margin:4px 0;">{}</li>"#, escape(&a.to_string()))
            })
            .collect::<Vec<_>>()
            .join("\n");
        let comparison = table(&TableView::indicators_as_rows(&report.comparison, &self.config));
        let full = table(&TableView::companies_as_rows(&report.full, &self.config));
        let excluded = if report.excluded.is_empty() {
            String::new()
        } else {
            let items: String = report
                .excluded
                .iter()
                .map(|e| format!("<li>{}: {}</li>", escape(&e.ticker), escape(&e.reason)))
                .collect();
            format!(r#"<h2 style="font-size:16px;">Excluded Companies</h2><ul style="color:#64748b;">{items}</ul>"#)
        };

        format!(
            r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Credit Analysis Report: {target} ({year})</title></head>
<body style="margin:0;padding:32px;background:#f1f5f9;font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,sans-serif;">
<div style="max-width:800px;margin:0 auto;background:#ffffff;border-radius:8px;padding:24px 32px;box-shadow:0 1px 3px rgba(0,0,0,0.1);">
  <h1 style="text-align:center;font-size:22px;margin:0;">Credit Analysis Report</h1>
  <p style="text-align:center;font-size:16px;font-weight:700;">Target: {target} | Year: {year}</p>
  <p style="text-align:center;font-size:11px;color:#94a3b8;">Generated at {generated} UTC</p>
  <h2 style="font-size:16px;">Credit Rating (absolute)</h2>
  <div style="font-size:32px;font-weight:700;">{grade}</div>
  <p>Final score (0-100): {score:.2}</p>
  <p style="font-size:11px;color:#64748b;">Details: Liquidity ({liquidity:.0}) | Leverage ({leverage:.0}) | Profitability ({profitability:.0})</p>
  <h2 style="font-size:16px;">Findings and Alerts (vs. sector average)</h2>
  <ul style="padding-left:20px;">
{alerts}
  </ul>
  <h2 style="font-size:16px;">Comparative Analysis (target vs. sector average)</h2>
  {comparison}
  <h2 style="font-size:16px;">Detailed Indicators (all peers)</h2>
  {full}
  {excluded}
</div>
</body>
</html>
"#
        )
    }
}
