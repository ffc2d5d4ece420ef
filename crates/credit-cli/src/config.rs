use analysis_core::{AnalysisConfig, DocumentType};
use anyhow::{Context, Result};
use report_generator::ReportFormat;
use std::env;
use std::path::PathBuf;

/// Runtime settings, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Settings {
    /// Root of the download cache and processed tables
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    /// `;`-separated `registry_id;ticker;name` file
    pub ticker_map: PathBuf,
    pub cvm_base_url: Option<String>,
    pub cvm_registry_url: Option<String>,
    /// JSON overrides for accounts, rubrics, weights and the rating scale
    pub analysis_config: Option<PathBuf>,
    pub report_format: ReportFormat,
    pub document_type: DocumentType,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_dir = PathBuf::from(lookup("CREDIT_DATA_DIR").unwrap_or_else(|| "data".to_string()));
        let ticker_map = lookup("CREDIT_TICKER_MAP")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("processed").join("mapa_ticker_cnpj.csv"));

        let report_format = lookup("CREDIT_REPORT_FORMAT")
            .unwrap_or_else(|| "markdown".to_string())
            .parse::<ReportFormat>()
            .context("Invalid CREDIT_REPORT_FORMAT")?;
        let document_type = parse_document_type(
            &lookup("CREDIT_DOCUMENT_TYPE").unwrap_or_else(|| "dfp".to_string()),
        )
        .context("Invalid CREDIT_DOCUMENT_TYPE")?;

        Ok(Self {
            output_dir: PathBuf::from(
                lookup("CREDIT_OUTPUT_DIR").unwrap_or_else(|| "output/reports".to_string()),
            ),
            ticker_map,
            cvm_base_url: lookup("CVM_BASE_URL"),
            cvm_registry_url: lookup("CVM_REGISTRY_URL"),
            analysis_config: lookup("CREDIT_ANALYSIS_CONFIG").map(PathBuf::from),
            report_format,
            document_type,
            data_dir,
        })
    }

    /// Where the per-run CSV tables are written.
    pub fn tables_dir(&self) -> PathBuf {
        self.data_dir.join("processed")
    }

    /// The configured analysis parameters, or the built-in defaults.
    pub fn load_analysis_config(&self) -> Result<AnalysisConfig> {
        match &self.analysis_config {
            Some(path) => AnalysisConfig::from_json_file(path)
                .with_context(|| format!("Failed to load analysis config {}", path.display())),
            None => Ok(AnalysisConfig::default()),
        }
    }
}

pub fn parse_document_type(value: &str) -> Result<DocumentType> {
    match value.trim().to_lowercase().as_str() {
        "dfp" => Ok(DocumentType::Dfp),
        "itr" => Ok(DocumentType::Itr),
        other => anyhow::bail!("unknown document type '{}' (expected dfp or itr)", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.data_dir, PathBuf::from("data"));
        assert_eq!(s.output_dir, PathBuf::from("output/reports"));
        assert_eq!(s.ticker_map, PathBuf::from("data/processed/mapa_ticker_cnpj.csv"));
        assert_eq!(s.tables_dir(), PathBuf::from("data/processed"));
        assert_eq!(s.report_format, ReportFormat::Markdown);
        assert_eq!(s.document_type, DocumentType::Dfp);
        assert!(s.cvm_base_url.is_none());
        assert_eq!(s.load_analysis_config().unwrap(), AnalysisConfig::default());
    }

    #[test]
    fn test_overrides() {
        let s = settings(&[
            ("CREDIT_DATA_DIR", "/tmp/cache"),
            ("CREDIT_REPORT_FORMAT", "html"),
            ("CREDIT_DOCUMENT_TYPE", "ITR"),
            ("CVM_BASE_URL", "http://localhost:8080"),
        ])
        .unwrap();
        assert_eq!(s.ticker_map, PathBuf::from("/tmp/cache/processed/mapa_ticker_cnpj.csv"));
        assert_eq!(s.report_format, ReportFormat::Html);
        assert_eq!(s.document_type, DocumentType::Itr);
        assert_eq!(s.cvm_base_url.as_deref(), Some("http://localhost:8080"));
    }

    #[test]
    fn test_invalid_values() {
        assert!(settings(&[("CREDIT_REPORT_FORMAT", "pdf")]).is_err());
        assert!(settings(&[("CREDIT_DOCUMENT_TYPE", "annual")]).is_err());
    }

    #[test]
    fn test_missing_config_file() {
        let s = settings(&[("CREDIT_ANALYSIS_CONFIG", "/nonexistent/config.json")]).unwrap();
        assert!(s.load_analysis_config().is_err());
    }
}
