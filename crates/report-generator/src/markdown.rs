use crate::{ReportRenderer, TableView};
use analysis_core::{AlertTag, AnalysisConfig, CreditReport};
use std::fmt::Write;
use std::sync::Arc;

pub struct MarkdownReport {
    config: Arc<AnalysisConfig>,
}

impl MarkdownReport {
    pub fn new(config: Arc<AnalysisConfig>) -> Self {
        Self { config }
    }
}

fn table(out: &mut String, view: &TableView) {
    let _ = writeln!(out, "| {} |", view.header.join(" | "));
    let _ = writeln!(
        out,
        "|{}",
        view.header.iter().map(|_| "---|").collect::<String>()
    );
    for row in &view.rows {
        let _ = writeln!(out, "| {} |", row.join(" | "));
    }
}

impl ReportRenderer for MarkdownReport {
    fn extension(&self) -> &'static str {
        "md"
    }

    fn render(&self, report: &CreditReport) -> String {
        let rating = &report.rating;
        let mut out = String::new();

        let _ = writeln!(out, "# Credit Analysis Report\n");
        let _ = writeln!(out, "**Target:** {} | **Year:** {}\n", report.target, report.year);
        let _ = writeln!(
            out,
            "_Generated at {} UTC_\n",
            report.generated_at.format("%Y-%m-%d %H:%M:%S")
        );

        let _ = writeln!(out, "## Credit Rating (absolute)\n");
        let _ = writeln!(out, "**{}**\n", rating.rating);
        let _ = writeln!(out, "Final score (0-100): {:.2}\n", rating.final_score);
        let _ = writeln!(
            out,
            "Details: Liquidity ({:.0}) | Leverage ({:.0}) | Profitability ({:.0})\n",
            rating.categories.liquidity, rating.categories.leverage, rating.categories.profitability
        );

        let _ = writeln!(out, "## Findings and Alerts (vs. sector average)\n");
        for alert in &report.alerts {
            let marker = match alert.tag {
                AlertTag::Red => "🔴",
                AlertTag::Green => "🟢",
            };
            let _ = writeln!(out, "- {} {}", marker, alert);
        }
        out.push('\n');

        let _ = writeln!(out, "## Comparative Analysis (target vs. sector average)\n");
        table(&mut out, &TableView::indicators_as_rows(&report.comparison, &self.config));
        out.push('\n');

        let _ = writeln!(out, "## Detailed Indicators (all peers)\n");
        table(&mut out, &TableView::companies_as_rows(&report.full, &self.config));

        if !report.excluded.is_empty() {
            let _ = writeln!(out, "\n## Excluded Companies\n");
            for e in &report.excluded {
                let _ = writeln!(out, "- {}: {}", e.ticker, e.reason);
            }
        }
        out
    }
}
