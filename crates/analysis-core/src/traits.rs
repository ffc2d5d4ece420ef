use crate::{AnalysisError, CompanyIndicators, DocumentType};
use async_trait::async_trait;
use std::path::PathBuf;

/// Makes a year's filing archive available on local disk.
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    /// Return the local path of the archive, downloading it first if absent.
    async fn ensure_archive(
        &self,
        year: i32,
        document_type: DocumentType,
    ) -> Result<PathBuf, AnalysisError>;
}

/// Maps a ticker symbol to the regulator's company identifier.
pub trait TickerResolver: Send + Sync {
    fn resolve_identifier(&self, symbol: &str) -> Option<String>;
}

/// Produces a company's indicators for a filing year.
#[async_trait]
pub trait IndicatorSource: Send {
    /// `Ok(None)` when the company has no usable data for the year.
    async fn extract(
        &mut self,
        registry_id: &str,
        year: i32,
    ) -> Result<Option<CompanyIndicators>, AnalysisError>;
}
