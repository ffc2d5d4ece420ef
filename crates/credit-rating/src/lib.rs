pub mod rubric;

pub use rubric::Rubric;

use analysis_core::{
    AnalysisConfig, AnalysisError, CategoryScores, CategoryWeights, Indicator, IndicatorSet,
    Ordered, RatingBand, RatingResult,
};

/// Scores an indicator set against the rubrics and maps the weighted score
/// to a letter grade.
#[derive(Debug, Clone)]
pub struct RatingModel {
    current_ratio: Rubric,
    overall_leverage: Rubric,
    debt_to_equity: Rubric,
    return_on_equity: Rubric,
    weights: CategoryWeights,
    scale: Ordered<RatingBand>,
}

impl RatingModel {
    pub fn new(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        let rubrics = &config.rubrics;
        Ok(Self {
            current_ratio: Rubric::from_table(&rubrics.current_ratio),
            overall_leverage: Rubric::from_table(&rubrics.overall_leverage),
            debt_to_equity: Rubric::from_table(&rubrics.debt_to_equity),
            return_on_equity: Rubric::from_table(&rubrics.return_on_equity),
            weights: config.weights,
            scale: Ordered::sorted_by_key(config.rating_scale.clone(), true, |b| b.threshold),
        })
    }

    pub fn score(&self, indicators: &IndicatorSet) -> Result<RatingResult, AnalysisError> {
        let value = |indicator: Indicator| {
            indicators
                .get(indicator)
                .ok_or_else(|| AnalysisError::MissingData(format!("indicator {} is undefined", indicator)))
        };

        let liquidity = self.current_ratio.score(value(Indicator::CurrentRatio)?);
        let leverage = (self.overall_leverage.score(value(Indicator::OverallLeverage)?)
            + self.debt_to_equity.score(value(Indicator::DebtToEquity)?))
            / 2.0;
        let profitability = self.return_on_equity.score(value(Indicator::ReturnOnEquity)?);

        let weighted = liquidity * self.weights.liquidity
            + leverage * self.weights.leverage
            + profitability * self.weights.profitability;
        let rating = self.rating_for(weighted).to_string();
        let final_score = (weighted * 100.0).round() / 100.0;

        tracing::info!(
            "Rating: {} (score {:.2}; liquidity {}, leverage {}, profitability {})",
            rating,
            final_score,
            liquidity,
            leverage,
            profitability
        );

        Ok(RatingResult {
            final_score,
            rating,
            categories: CategoryScores {
                liquidity,
                leverage,
                profitability,
            },
        })
    }

    /// Label of the highest threshold the score strictly exceeds; scores
    /// that exceed none get the lowest grade.
    pub fn rating_for(&self, score: f64) -> &str {
        self.scale
            .first_match(|b| score > b.threshold)
            .or_else(|| self.scale.last())
            .map(|b| b.label.as_str())
            .unwrap_or("D")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn model() -> RatingModel {
        RatingModel::new(&AnalysisConfig::default()).unwrap()
    }

    fn set(current: f64, leverage: f64, de: f64, roe: f64) -> IndicatorSet {
        IndicatorSet {
            current_ratio: Some(current),
            overall_leverage: Some(leverage),
            debt_to_equity: Some(de),
            return_on_equity: Some(roe),
        }
    }

    #[test]
    fn test_rating_lookup() {
        let model = model();
        assert_eq!(model.rating_for(72.0), "A");
        assert_eq!(model.rating_for(95.0), "AA+");
        assert_eq!(model.rating_for(95.01), "AAA");
        assert_eq!(model.rating_for(0.5), "D");
        assert_eq!(model.rating_for(0.0), "D");
        assert_eq!(model.rating_for(-3.0), "D");
    }

    #[test]
    fn test_weighted_score() {
        let result = model().score(&set(1.6, 0.5, 1.5, 0.12)).unwrap();
        assert_eq!(result.categories.liquidity, 80.0);
        assert_eq!(result.categories.leverage, 80.0);
        assert_eq!(result.categories.profitability, 70.0);
        assert_relative_eq!(result.final_score, 77.0);
        assert_eq!(result.rating, "A+");
    }

    #[test]
    fn test_leverage_category_is_mean_of_two() {
        let result = model().score(&set(1.6, 0.35, 2.5, 0.12)).unwrap();
        assert_eq!(result.categories.leverage, 75.0);
    }

    #[test]
    fn test_final_score_rounded() {
        let config = AnalysisConfig {
            weights: CategoryWeights {
                liquidity: 1.0 / 3.0,
                leverage: 1.0 / 3.0,
                profitability: 1.0 / 3.0,
            },
            ..AnalysisConfig::default()
        };
        let model = RatingModel::new(&config).unwrap();
        let result = model.score(&set(1.6, 0.5, 1.5, 0.12)).unwrap();
        assert_eq!(result.final_score, 76.67);
    }

    #[test]
    fn test_score_range() {
        let model = model();
        let best = model.score(&set(5.0, 0.1, 0.2, 0.5)).unwrap();
        assert_relative_eq!(best.final_score, 100.0);
        assert_eq!(best.rating, "AAA");

        let worst = model.score(&set(0.0, 5.0, 9.0, -1.0)).unwrap();
        assert!(worst.final_score >= 0.0 && worst.final_score <= 100.0);
        assert_relative_eq!(worst.final_score, 11.0);
        assert_eq!(worst.rating, "CC");
    }

    #[test]
    fn test_missing_indicator_is_error() {
        let mut indicators = set(1.6, 0.5, 1.5, 0.12);
        indicators.return_on_equity = None;
        let err = model().score(&indicators).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingData(_)));
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let config = AnalysisConfig {
            weights: CategoryWeights {
                liquidity: 0.5,
                leverage: 0.5,
                profitability: 0.5,
            },
            ..AnalysisConfig::default()
        };
        assert!(RatingModel::new(&config).is_err());
    }
}
