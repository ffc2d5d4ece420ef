use alert_flags::{target_column, SECTOR_AVERAGE_COLUMN};
use analysis_core::{
    AnalysisError, Exclusion, Indicator, IndicatorSet, IndicatorSource, IndicatorTable,
    PeerAnalysis, SanityBounds, TickerResolver,
};
use std::collections::{BTreeMap, BTreeSet};

pub const INDEX_NAME: &str = "Indicator";

/// Reject indicator sets that are undefined or outside plausible bounds.
pub fn validate_indicators(set: &IndicatorSet, bounds: &SanityBounds) -> Result<(), AnalysisError> {
    if let Some(indicator) = set.undefined().first() {
        return Err(AnalysisError::InvalidData(format!(
            "indicator {} is undefined (zero denominator?)",
            indicator
        )));
    }
    let value = |i: Indicator| set.get(i).unwrap_or(f64::NAN);

    let current = value(Indicator::CurrentRatio);
    if current < bounds.min_current_ratio {
        return Err(AnalysisError::InvalidData(format!(
            "current_ratio is negative ({:.2})",
            current
        )));
    }
    let roe = value(Indicator::ReturnOnEquity);
    if roe.abs() > bounds.max_abs_roe {
        return Err(AnalysisError::InvalidData(format!(
            "return_on_equity is extreme ({:.2}%)",
            roe * 100.0
        )));
    }
    let leverage = value(Indicator::OverallLeverage);
    if leverage > bounds.max_leverage {
        return Err(AnalysisError::InvalidData(format!(
            "overall_leverage is extreme ({:.2}%)",
            leverage * 100.0
        )));
    }
    Ok(())
}

/// Compares a target company against its peers for one filing year.
pub struct PeerAnalyzer<S: IndicatorSource, R: TickerResolver> {
    source: S,
    resolver: R,
    bounds: SanityBounds,
}

impl<S: IndicatorSource, R: TickerResolver> PeerAnalyzer<S, R> {
    pub fn new(source: S, resolver: R, bounds: SanityBounds) -> Self {
        Self {
            source,
            resolver,
            bounds,
        }
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Extract, validate and aggregate the target and its peers.
    ///
    /// Companies that cannot be resolved, have no usable data or fail
    /// validation are dropped and reported in `excluded`. The call fails when
    /// the target is among them, when nothing survives, or when the year's
    /// archive itself is unavailable.
    pub async fn analyze(
        &mut self,
        target: &str,
        peers: &[String],
        year: i32,
    ) -> Result<PeerAnalysis, AnalysisError> {
        let target = target.trim().to_uppercase();
        let tickers: BTreeSet<String> = peers
            .iter()
            .map(|p| p.trim().to_uppercase())
            .filter(|p| !p.is_empty())
            .chain(std::iter::once(target.clone()))
            .collect();
        tracing::info!(
            "Peer analysis for {} ({}): {} companies",
            target,
            year,
            tickers.len()
        );

        let mut excluded = Vec::new();
        let mut resolved = Vec::new();
        for ticker in &tickers {
            match self.resolver.resolve_identifier(ticker) {
                Some(id) => resolved.push((ticker.clone(), id)),
                None if *ticker == target => {
                    return Err(AnalysisError::TargetUnresolved(target));
                }
                None => {
                    tracing::warn!("Ticker {} not found, skipping", ticker);
                    excluded.push(Exclusion {
                        ticker: ticker.clone(),
                        reason: "ticker not found in ticker map".to_string(),
                    });
                }
            }
        }

        let mut survivors: BTreeMap<String, IndicatorSet> = BTreeMap::new();
        for (ticker, id) in resolved {
            let reason = match self.source.extract(&id, year).await {
                Ok(Some(company)) => match validate_indicators(&company.indicators, &self.bounds) {
                    Ok(()) => {
                        survivors.insert(ticker, company.indicators);
                        continue;
                    }
                    Err(e) => e.to_string(),
                },
                Ok(None) => format!("no usable statements for {}", year),
                Err(e) if e.is_per_company() => e.to_string(),
                Err(e) => return Err(e),
            };

            tracing::warn!("Excluding {}: {}", ticker, reason);
            if ticker == target {
                return Err(AnalysisError::TargetRejected { target, reason });
            }
            excluded.push(Exclusion { ticker, reason });
        }

        if survivors.is_empty() {
            return Err(AnalysisError::NoSurvivors);
        }
        let Some(target_indicators) = survivors.get(&target).copied() else {
            return Err(AnalysisError::TargetRejected {
                target,
                reason: "not among surviving companies".to_string(),
            });
        };

        let sector_average = IndicatorSet::mean(survivors.values());
        let columns: Vec<(String, IndicatorSet)> = survivors
            .iter()
            .map(|(ticker, set)| (ticker.clone(), *set))
            .collect();
        let full = IndicatorTable::from_columns(INDEX_NAME, &columns);
        let comparison = IndicatorTable::from_columns(
            INDEX_NAME,
            &[
                (target_column(&target), target_indicators),
                (SECTOR_AVERAGE_COLUMN.to_string(), sector_average),
            ],
        );

        tracing::info!(
            "Peer analysis complete: {} survivors, {} excluded",
            survivors.len(),
            excluded.len()
        );

        Ok(PeerAnalysis {
            target,
            year,
            full,
            comparison,
            target_indicators,
            sector_average,
            survivors: survivors.into_keys().collect(),
            excluded,
        })
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use analysis_core::{
        AnalysisError, CompanyIndicators, IndicatorSet, IndicatorSource, RawFinancials,
        StatementVariant, TickerResolver,
    };
    use async_trait::async_trait;
    use std::collections::HashMap;

    pub fn set(current: f64, leverage: f64, de: f64, roe: f64) -> IndicatorSet {
        IndicatorSet {
            current_ratio: Some(current),
            overall_leverage: Some(leverage),
            debt_to_equity: Some(de),
            return_on_equity: Some(roe),
        }
    }

    pub enum Outcome {
        Found(IndicatorSet),
        Missing,
        Fail(fn() -> AnalysisError),
    }

    /// Registry id is `ID-{ticker}`.
    pub struct FakeResolver(pub Vec<&'static str>);

    impl TickerResolver for FakeResolver {
        fn resolve_identifier(&self, symbol: &str) -> Option<String> {
            self.0
                .iter()
                .find(|t| t.eq_ignore_ascii_case(symbol))
                .map(|t| format!("ID-{}", t))
        }
    }

    #[derive(Default)]
    pub struct FakeSource {
        pub outcomes: HashMap<String, Outcome>,
        pub calls: Vec<String>,
    }

    impl FakeSource {
        pub fn with(mut self, ticker: &str, outcome: Outcome) -> Self {
            self.outcomes.insert(format!("ID-{}", ticker), outcome);
            self
        }
    }

    #[async_trait]
    impl IndicatorSource for FakeSource {
        async fn extract(
            &mut self,
            registry_id: &str,
            _year: i32,
        ) -> Result<Option<CompanyIndicators>, AnalysisError> {
            self.calls.push(registry_id.to_string());
            match self.outcomes.get(registry_id) {
                Some(Outcome::Found(indicators)) => Ok(Some(CompanyIndicators {
                    registry_id: registry_id.to_string(),
                    variant: StatementVariant::Consolidated,
                    raw: RawFinancials {
                        current_assets: 0.0,
                        total_assets: 0.0,
                        current_liabilities: 0.0,
                        non_current_liabilities: 0.0,
                        equity: 0.0,
                        net_income: 0.0,
                    },
                    indicators: *indicators,
                })),
                Some(Outcome::Fail(make)) => Err(make()),
                Some(Outcome::Missing) | None => Ok(None),
            }
        }
    }
}
