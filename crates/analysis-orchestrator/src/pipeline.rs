use crate::peers::PeerAnalyzer;
use alert_flags::AlertGenerator;
use analysis_core::{
    AnalysisConfig, AnalysisError, CreditReport, IndicatorSource, TickerResolver,
};
use chrono::{Datelike, Local, Utc};
use credit_rating::RatingModel;
use serde::{Deserialize, Serialize};

/// First year with standardized filings in the open data portal.
pub const FIRST_FILING_YEAR: i32 = 2010;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub target: String,
    pub peers: Vec<String>,
    pub year: i32,
}

impl AnalysisRequest {
    pub fn new(target: impl Into<String>, peers: Vec<String>, year: i32) -> Self {
        Self {
            target: target.into(),
            peers,
            year,
        }
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        let current_year = Local::now().year();
        if !(FIRST_FILING_YEAR..=current_year).contains(&self.year) {
            return Err(AnalysisError::InvalidInput(format!(
                "year {} must be between {} and {}",
                self.year, FIRST_FILING_YEAR, current_year
            )));
        }
        if self.target.trim().is_empty() {
            return Err(AnalysisError::InvalidInput("target ticker cannot be empty".to_string()));
        }
        if self.peers.iter().all(|p| p.trim().is_empty()) {
            return Err(AnalysisError::InvalidInput(
                "at least one peer ticker is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// End-to-end credit analysis: peer comparison, alerts, rating.
pub struct CreditAnalysis<S: IndicatorSource, R: TickerResolver> {
    peers: PeerAnalyzer<S, R>,
    alerts: AlertGenerator,
    rating: RatingModel,
}

impl<S: IndicatorSource, R: TickerResolver> CreditAnalysis<S, R> {
    pub fn new(source: S, resolver: R, config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        Ok(Self {
            peers: PeerAnalyzer::new(source, resolver, config.sanity),
            alerts: AlertGenerator::new(),
            rating: RatingModel::new(config)?,
        })
    }

    pub async fn run(&mut self, request: &AnalysisRequest) -> Result<CreditReport, AnalysisError> {
        request.validate()?;
        tracing::info!(
            "Starting credit analysis for {} ({}) against {} peers",
            request.target,
            request.year,
            request.peers.len()
        );

        let analysis = self
            .peers
            .analyze(&request.target, &request.peers, request.year)
            .await?;
        let alerts = self.alerts.alerts(&analysis.target, &analysis.comparison)?;
        let rating = self.rating.score(&analysis.target_indicators)?;

        tracing::info!(
            "Credit analysis for {} complete: {} ({:.2})",
            analysis.target,
            rating.rating,
            rating.final_score
        );

        Ok(CreditReport {
            target: analysis.target,
            year: analysis.year,
            generated_at: Utc::now(),
            rating,
            alerts,
            comparison: analysis.comparison,
            full: analysis.full,
            excluded: analysis.excluded,
        })
    }
}
