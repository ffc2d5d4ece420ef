pub mod html;
pub mod markdown;
pub mod tables;

pub use html::HtmlReport;
pub use markdown::MarkdownReport;
pub use tables::TableWriter;

use analysis_core::{AnalysisConfig, AnalysisError, CreditReport, Indicator, IndicatorTable};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Renders a finished credit report into a document.
pub trait ReportRenderer: Send + Sync {
    /// File extension of the rendered document, without the dot.
    fn extension(&self) -> &'static str;

    fn render(&self, report: &CreditReport) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Markdown,
    Html,
}

impl ReportFormat {
    pub fn renderer(&self, config: Arc<AnalysisConfig>) -> Box<dyn ReportRenderer> {
        match self {
            ReportFormat::Markdown => Box::new(MarkdownReport::new(config)),
            ReportFormat::Html => Box::new(HtmlReport::new(config)),
        }
    }
}

impl FromStr for ReportFormat {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "md" | "markdown" => Ok(ReportFormat::Markdown),
            "html" | "htm" => Ok(ReportFormat::Html),
            other => Err(AnalysisError::InvalidInput(format!(
                "unknown report format '{other}' (expected markdown or html)"
            ))),
        }
    }
}

/// `x.xx%` for percentage indicators, `x.xx` otherwise, `N/A` when undefined.
pub fn format_value(value: Option<f64>, percentage: bool) -> String {
    match value {
        Some(v) if v.is_finite() && percentage => format!("{:.2}%", v * 100.0),
        Some(v) if v.is_finite() => format!("{:.2}", v),
        _ => "N/A".to_string(),
    }
}

/// A table already formatted for display.
#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableView {
    /// One row per indicator, one column per series.
    pub fn indicators_as_rows(table: &IndicatorTable, config: &AnalysisConfig) -> Self {
        let mut header = vec![table.index_name.clone()];
        header.extend(table.columns.iter().cloned());
        let rows = table
            .rows
            .iter()
            .map(|row| {
                let pct = config.is_percentage(row.indicator);
                let mut cells = vec![config.label(row.indicator).to_string()];
                cells.extend(row.values.iter().map(|v| format_value(*v, pct)));
                cells
            })
            .collect();
        Self { header, rows }
    }

    /// One row per company, one column per indicator.
    pub fn companies_as_rows(table: &IndicatorTable, config: &AnalysisConfig) -> Self {
        let indicators: Vec<Indicator> = table.rows.iter().map(|r| r.indicator).collect();
        let mut header = vec!["Company".to_string()];
        header.extend(indicators.iter().map(|i| config.label(*i).to_string()));
        let rows = table
            .columns
            .iter()
            .map(|company| {
                let mut cells = vec![company.clone()];
                cells.extend(indicators.iter().map(|i| {
                    format_value(table.value(*i, company), config.is_percentage(*i))
                }));
                cells
            })
            .collect();
        Self { header, rows }
    }
}

pub fn report_file_name(target: &str, year: i32, extension: &str) -> String {
    format!("credit_report_{}_{}.{}", target.to_uppercase(), year, extension)
}

/// Render `report` and write it under `dir`, returning the written path.
pub fn write_report(
    dir: impl AsRef<Path>,
    report: &CreditReport,
    renderer: &dyn ReportRenderer,
) -> Result<PathBuf, AnalysisError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let path = dir.join(report_file_name(&report.target, report.year, renderer.extension()));
    std::fs::write(&path, renderer.render(report))?;
    tracing::info!("Report written to {}", path.display());
    Ok(path)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(Some(0.1234), true), "12.34%");
        assert_eq!(format_value(Some(1.5), false), "1.50");
        assert_eq!(format_value(None, true), "N/A");
        assert_eq!(format_value(Some(f64::NAN), false), "N/A");
    }

    #[test]
    fn test_report_format_parse() {
        assert_eq!("HTML".parse::<ReportFormat>().unwrap(), ReportFormat::Html);
        assert_eq!("md".parse::<ReportFormat>().unwrap(), ReportFormat::Markdown);
        assert!("pdf".parse::<ReportFormat>().is_err());
    }

    #[test]
    fn test_table_views() {
        let config = AnalysisConfig::default();
        let report = sample::report();

        let comparison = TableView::indicators_as_rows(&report.comparison, &config);
        assert_eq!(comparison.header, vec!["Indicator", "Target (AAAA3)", "Sector Average"]);
        assert_eq!(comparison.rows[1], vec!["Overall Leverage (%)", "50.00%", "40.00%"]);

        let full = TableView::companies_as_rows(&report.full, &config);
        assert_eq!(full.header[0], "Company");
        assert_eq!(full.rows.len(), 2);
        assert_eq!(full.rows[1], vec!["BBBB3", "2.40", "30.00%", "N/A", "20.00%"]);
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let config = Arc::new(AnalysisConfig::default());
        let renderer = ReportFormat::Markdown.renderer(config);
        let path = write_report(dir.path().join("reports"), &sample::report(), renderer.as_ref()).unwrap();
        assert!(path.ends_with("credit_report_AAAA3_2023.md"));
        assert!(std::fs::read_to_string(&path).unwrap().contains("A+"));
    }
}
