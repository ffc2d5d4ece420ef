pub mod archive;
pub mod ratios;

pub use archive::{FilingArchive, ScanMode};
pub use ratios::compute_indicators;

use analysis_core::{
    Account, AnalysisConfig, AnalysisError, ArchiveFetcher, CompanyIndicators, DocumentType,
    IndicatorSource, Ordered, RawFinancials, StatementKind, StatementRow, StatementVariant,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Rows of the three statements for one company in one variant.
struct StatementSet {
    variant: StatementVariant,
    income: Vec<StatementRow>,
    assets: Vec<StatementRow>,
    liabilities_equity: Vec<StatementRow>,
}

impl StatementSet {
    fn rows(&self, kind: StatementKind) -> &[StatementRow] {
        match kind {
            StatementKind::Income => &self.income,
            StatementKind::Assets => &self.assets,
            StatementKind::LiabilitiesEquity => &self.liabilities_equity,
        }
    }

    fn is_complete(&self) -> bool {
        StatementKind::ALL.iter().all(|k| !self.rows(*k).is_empty())
    }

    /// Currency scale of the filing, taken from the first asset row.
    fn scale_factor(&self) -> f64 {
        self.assets
            .first()
            .and_then(|r| r.scale)
            .unwrap_or_default()
            .factor()
    }
}

/// Pulls a company's statements out of the yearly filing archive and turns
/// them into the indicator set.
///
/// The opened archive is kept for the year it belongs to; asking for a
/// different year drops it and loads the new one through the fetcher.
pub struct IndicatorExtractor<F: ArchiveFetcher> {
    fetcher: F,
    config: Arc<AnalysisConfig>,
    document_type: DocumentType,
    scan_mode: ScanMode,
    archive: Option<FilingArchive>,
}

impl<F: ArchiveFetcher> IndicatorExtractor<F> {
    pub fn new(fetcher: F, config: Arc<AnalysisConfig>) -> Self {
        Self {
            fetcher,
            config,
            document_type: DocumentType::Dfp,
            scan_mode: ScanMode::default(),
            archive: None,
        }
    }

    pub fn with_document_type(mut self, document_type: DocumentType) -> Self {
        self.document_type = document_type;
        self
    }

    pub fn with_scan_mode(mut self, scan_mode: ScanMode) -> Self {
        self.scan_mode = scan_mode;
        self
    }

    pub fn cached_year(&self) -> Option<i32> {
        self.archive.as_ref().map(FilingArchive::year)
    }

    /// Extract raw financials and indicators for `registry_id` from the
    /// `year` filing.
    ///
    /// `Ok(None)` means the company has no usable data: neither variant has
    /// all three statements, or a required account is missing. Errors are
    /// reserved for an unavailable or unreadable archive and malformed rows.
    pub async fn extract(
        &mut self,
        registry_id: &str,
        year: i32,
    ) -> Result<Option<CompanyIndicators>, AnalysisError> {
        self.load_year(year).await?;

        let config = &self.config;
        let scan_mode = self.scan_mode;
        let Some(archive) = self.archive.as_mut() else {
            return Err(AnalysisError::Archive(format!("archive for {year} not loaded")));
        };

        let variants = Ordered::new(config.variant_preference.clone());
        let marker = config.final_period_marker.as_str();
        let statements = variants.try_first_map(
            |&variant| -> Result<Option<StatementSet>, AnalysisError> {
                let set = read_variant(archive, variant, registry_id, marker, scan_mode)?;
                if set.is_complete() {
                    return Ok(Some(set));
                }
                tracing::info!(
                    "No complete {} statements for {} in {}",
                    variant,
                    registry_id,
                    year
                );
                Ok(None)
            },
        )?;

        let Some(statements) = statements else {
            tracing::warn!(
                "Missing data: {} has no final-period statements in any variant for {}",
                registry_id,
                year
            );
            return Ok(None);
        };
        tracing::info!(
            "Using {} statements for {} ({})",
            statements.variant,
            registry_id,
            year
        );

        let Some(raw) = resolve_accounts(config, &statements, registry_id)? else {
            return Ok(None);
        };

        Ok(Some(CompanyIndicators {
            registry_id: registry_id.to_string(),
            variant: statements.variant,
            indicators: compute_indicators(&raw),
            raw,
        }))
    }

    async fn load_year(&mut self, year: i32) -> Result<(), AnalysisError> {
        if self.cached_year() == Some(year) {
            return Ok(());
        }
        // Drop the previous year before fetching the next one
        self.archive = None;

        let path = self.fetcher.ensure_archive(year, self.document_type).await?;
        let archive = FilingArchive::open(&path, year, self.document_type)?;
        tracing::info!("Loaded {} filings for {}", self.document_type.code(), year);
        self.archive = Some(archive);
        Ok(())
    }
}

#[async_trait]
impl<F: ArchiveFetcher> IndicatorSource for IndicatorExtractor<F> {
    async fn extract(
        &mut self,
        registry_id: &str,
        year: i32,
    ) -> Result<Option<CompanyIndicators>, AnalysisError> {
        IndicatorExtractor::extract(self, registry_id, year).await
    }
}

fn read_variant(
    archive: &mut FilingArchive,
    variant: StatementVariant,
    registry_id: &str,
    marker: &str,
    mode: ScanMode,
) -> Result<StatementSet, AnalysisError> {
    let mut read = |kind| archive.read_filtered(kind, variant, registry_id, marker, mode);
    Ok(StatementSet {
        variant,
        income: read(StatementKind::Income)?,
        assets: read(StatementKind::Assets)?,
        liabilities_equity: read(StatementKind::LiabilitiesEquity)?,
    })
}

/// `Ok(None)` when a required account is absent; `InvalidData` when it is
/// present but its amount does not parse. Other rows are never inspected.
fn resolve_accounts(
    config: &AnalysisConfig,
    statements: &StatementSet,
    registry_id: &str,
) -> Result<Option<RawFinancials>, AnalysisError> {
    let factor = statements.scale_factor();
    let value = |account: Account| -> Result<Option<f64>, AnalysisError> {
        let Some(code) = config.account_code(account) else {
            return Ok(None);
        };
        let Some(row) = statements
            .rows(account.statement())
            .iter()
            .find(|r| r.account_code == code)
        else {
            tracing::warn!(
                "Missing account {} ({:?}) for {}",
                code,
                account,
                registry_id
            );
            return Ok(None);
        };
        match row.amount {
            Some(amount) => Ok(Some(amount * factor)),
            None => Err(AnalysisError::InvalidData(format!(
                "account {} ({:?}) of {} has no numeric amount",
                code, account, registry_id
            ))),
        }
    };

    let (
        Some(current_assets),
        Some(total_assets),
        Some(current_liabilities),
        Some(non_current_liabilities),
        Some(equity),
        Some(net_income),
    ) = (
        value(Account::CurrentAssets)?,
        value(Account::TotalAssets)?,
        value(Account::CurrentLiabilities)?,
        value(Account::NonCurrentLiabilities)?,
        value(Account::Equity)?,
        value(Account::NetIncome)?,
    )
    else {
        return Ok(None);
    };

    Ok(Some(RawFinancials {
        current_assets,
        total_assets,
        current_liabilities,
        non_current_liabilities,
        equity,
        net_income,
    }))
}
