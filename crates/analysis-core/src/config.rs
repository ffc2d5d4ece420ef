use crate::error::{AnalysisError, Result};
use crate::types::{Account, Indicator, StatementVariant};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Business rules of the analysis: account map, rubrics, weights and rating
/// scale. Built-in defaults match the regulator's DFP chart of accounts;
/// every field can be overridden from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Account -> regulator account code (`CD_CONTA`)
    pub account_codes: BTreeMap<Account, String>,
    /// Display names used by report renderers
    pub indicator_labels: BTreeMap<Indicator, String>,
    /// Indicators rendered as percentages
    pub percentage_indicators: Vec<Indicator>,
    pub rubrics: RubricSet,
    pub weights: CategoryWeights,
    /// Score threshold -> rating label, scanned from the highest threshold
    pub rating_scale: Vec<RatingBand>,
    pub sanity: SanityBounds,
    /// `ORDEM_EXERC` value marking the most recent period of a filing
    pub final_period_marker: String,
    /// Statement variants in the order they are tried
    pub variant_preference: Vec<StatementVariant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Score is set by the first threshold the value strictly exceeds,
    /// thresholds scanned in descending order.
    HigherIsBetter,
    /// Score is set by the first threshold the value is strictly below,
    /// thresholds scanned in ascending order.
    LowerIsBetter,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RubricBand {
    #[serde(with = "unbounded")]
    pub threshold: f64,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricTable {
    pub direction: Direction,
    pub bands: Vec<RubricBand>,
}

impl RubricTable {
    pub fn new(direction: Direction, bands: &[(f64, f64)]) -> Self {
        Self {
            direction,
            bands: bands
                .iter()
                .map(|&(threshold, points)| RubricBand { threshold, points })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricSet {
    pub current_ratio: RubricTable,
    pub overall_leverage: RubricTable,
    pub debt_to_equity: RubricTable,
    pub return_on_equity: RubricTable,
}

impl RubricSet {
    pub fn get(&self, indicator: Indicator) -> &RubricTable {
        match indicator {
            Indicator::CurrentRatio => &self.current_ratio,
            Indicator::OverallLeverage => &self.overall_leverage,
            Indicator::DebtToEquity => &self.debt_to_equity,
            Indicator::ReturnOnEquity => &self.return_on_equity,
        }
    }
}

impl Default for RubricSet {
    fn default() -> Self {
        Self {
            current_ratio: RubricTable::new(
                Direction::HigherIsBetter,
                &[(2.0, 100.0), (1.5, 80.0), (1.0, 60.0), (0.8, 40.0), (0.0, 20.0)],
            ),
            overall_leverage: RubricTable::new(
                Direction::LowerIsBetter,
                &[(0.4, 100.0), (0.6, 80.0), (0.8, 50.0), (f64::INFINITY, 20.0)],
            ),
            debt_to_equity: RubricTable::new(
                Direction::LowerIsBetter,
                &[(1.0, 100.0), (2.0, 80.0), (3.5, 50.0), (f64::INFINITY, 20.0)],
            ),
            return_on_equity: RubricTable::new(
                Direction::HigherIsBetter,
                &[
                    (0.20, 100.0),
                    (0.15, 90.0),
                    (0.10, 70.0),
                    (0.05, 50.0),
                    (0.00, 30.0),
                    (f64::NEG_INFINITY, 10.0),
                ],
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryWeights {
    pub liquidity: f64,
    pub leverage: f64,
    pub profitability: f64,
}

impl CategoryWeights {
    pub fn sum(&self) -> f64 {
        self.liquidity + self.leverage + self.profitability
    }
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            liquidity: 0.30,
            leverage: 0.40,
            profitability: 0.30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingBand {
    pub threshold: f64,
    pub label: String,
}

/// Bounds a company's indicators must respect to enter the peer set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SanityBounds {
    pub min_current_ratio: f64,
    pub max_abs_roe: f64,
    pub max_leverage: f64,
}

impl Default for SanityBounds {
    fn default() -> Self {
        Self {
            min_current_ratio: 0.0,
            max_abs_roe: 5.0,
            max_leverage: 10.0,
        }
    }
}

const DEFAULT_RATING_SCALE: &[(f64, &str)] = &[
    (95.0, "AAA"),
    (90.0, "AA+"),
    (85.0, "AA"),
    (80.0, "AA-"),
    (75.0, "A+"),
    (70.0, "A"),
    (65.0, "A-"),
    (60.0, "BBB+"),
    (55.0, "BBB"),
    (50.0, "BBB-"),
    (45.0, "BB+"),
    (40.0, "BB"),
    (35.0, "BB-"),
    (30.0, "B+"),
    (25.0, "B"),
    (20.0, "B-"),
    (15.0, "CCC"),
    (10.0, "CC"),
    (0.0, "D"),
];

impl Default for AnalysisConfig {
    fn default() -> Self {
        let account_codes = [
            (Account::TotalAssets, "1"),
            (Account::CurrentAssets, "1.01"),
            (Account::CurrentLiabilities, "2.01"),
            (Account::NonCurrentLiabilities, "2.02"),
            (Account::Equity, "2.03"),
            (Account::NetIncome, "3.11"),
        ]
        .into_iter()
        .map(|(a, code)| (a, code.to_string()))
        .collect();

        let indicator_labels = [
            (Indicator::CurrentRatio, "Current Ratio"),
            (Indicator::OverallLeverage, "Overall Leverage (%)"),
            (Indicator::DebtToEquity, "Debt/Equity"),
            (Indicator::ReturnOnEquity, "ROE (%)"),
        ]
        .into_iter()
        .map(|(i, label)| (i, label.to_string()))
        .collect();

        Self {
            account_codes,
            indicator_labels,
            percentage_indicators: vec![Indicator::OverallLeverage, Indicator::ReturnOnEquity],
            rubrics: RubricSet::default(),
            weights: CategoryWeights::default(),
            rating_scale: DEFAULT_RATING_SCALE
                .iter()
                .map(|&(threshold, label)| RatingBand {
                    threshold,
                    label: label.to_string(),
                })
                .collect(),
            sanity: SanityBounds::default(),
            final_period_marker: "ÚLTIMO".to_string(),
            variant_preference: vec![StatementVariant::Consolidated, StatementVariant::Standalone],
        }
    }
}

impl AnalysisConfig {
    /// Load overrides from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: AnalysisConfig = serde_json::from_str(&raw).map_err(|e| {
            AnalysisError::Config(format!("{}: {}", path.display(), e))
        })?;
        config.validate()?;
        tracing::info!("Loaded analysis config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let sum = self.weights.sum();
        if (sum - 1.0).abs() > 1e-9 {
            return Err(AnalysisError::Config(format!(
                "category weights must sum to 1.0, got {sum}"
            )));
        }
        for account in Account::ALL {
            if !self.account_codes.contains_key(&account) {
                return Err(AnalysisError::Config(format!(
                    "no account code configured for {account:?}"
                )));
            }
        }
        for indicator in Indicator::ALL {
            if self.rubrics.get(indicator).bands.is_empty() {
                return Err(AnalysisError::Config(format!("empty rubric for {indicator}")));
            }
        }
        if self.rating_scale.is_empty() {
            return Err(AnalysisError::Config("rating scale is empty".to_string()));
        }
        if self.variant_preference.is_empty() {
            return Err(AnalysisError::Config("no statement variant configured".to_string()));
        }
        Ok(())
    }

    pub fn account_code(&self, account: Account) -> Option<&str> {
        self.account_codes.get(&account).map(String::as_str)
    }

    pub fn label(&self, indicator: Indicator) -> &str {
        self.indicator_labels
            .get(&indicator)
            .map(String::as_str)
            .unwrap_or(indicator.key())
    }

    pub fn is_percentage(&self, indicator: Indicator) -> bool {
        self.percentage_indicators.contains(&indicator)
    }
}

/// JSON has no infinity, so unbounded thresholds travel as `"inf"` / `"-inf"`.
mod unbounded {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
        if *value == f64::INFINITY {
            s.serialize_str("inf")
        } else if *value == f64::NEG_INFINITY {
            s.serialize_str("-inf")
        } else {
            s.serialize_f64(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Str(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        match Raw::deserialize(d)? {
            Raw::Num(v) => Ok(v),
            Raw::Str(s) => match s.trim().to_lowercase().as_str() {
                "inf" | "+inf" | "infinity" => Ok(f64::INFINITY),
                "-inf" | "-infinity" => Ok(f64::NEG_INFINITY),
                other => other
                    .parse()
                    .map_err(|_| serde::de::Error::custom(format!("invalid threshold '{s}'"))),
            },
        }
    }
}
