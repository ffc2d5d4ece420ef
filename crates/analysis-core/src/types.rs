use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Denominators with an absolute value at or below this are treated as zero.
pub const NEAR_ZERO: f64 = 1e-9;

/// Filing document type published by the regulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DocumentType {
    /// Annual standardized financial statements
    #[default]
    Dfp,
    /// Quarterly information
    Itr,
}

impl DocumentType {
    pub fn code(&self) -> &'static str {
        match self {
            DocumentType::Dfp => "DFP",
            DocumentType::Itr => "ITR",
        }
    }

    /// File name of the yearly archive, e.g. `dfp_cia_aberta_2024.zip`.
    pub fn archive_name(&self, year: i32) -> String {
        format!("{}_cia_aberta_{}.zip", self.code().to_lowercase(), year)
    }
}

/// The three statements read from a filing archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementKind {
    /// Income statement (DRE)
    Income,
    /// Balance sheet, asset side (BPA)
    Assets,
    /// Balance sheet, liabilities and equity side (BPP)
    LiabilitiesEquity,
}

impl StatementKind {
    pub const ALL: [StatementKind; 3] = [
        StatementKind::Income,
        StatementKind::Assets,
        StatementKind::LiabilitiesEquity,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            StatementKind::Income => "DRE",
            StatementKind::Assets => "BPA",
            StatementKind::LiabilitiesEquity => "BPP",
        }
    }
}

/// Accounting scope of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementVariant {
    Consolidated,
    Standalone,
}

impl StatementVariant {
    pub fn code(&self) -> &'static str {
        match self {
            StatementVariant::Consolidated => "con",
            StatementVariant::Standalone => "ind",
        }
    }
}

impl fmt::Display for StatementVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementVariant::Consolidated => write!(f, "consolidated"),
            StatementVariant::Standalone => write!(f, "standalone"),
        }
    }
}

/// Currency scale a statement row is reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ScaleUnit {
    #[default]
    Unit,
    Thousand,
    Million,
}

impl ScaleUnit {
    /// Parse the regulator's `ESCALA_MOEDA` field. Unknown values yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "UNIDADE" | "UNIT" => Some(ScaleUnit::Unit),
            "MIL" => Some(ScaleUnit::Thousand),
            "MILHAO" | "MILHÃO" => Some(ScaleUnit::Million),
            _ => None,
        }
    }

    pub fn factor(&self) -> f64 {
        match self {
            ScaleUnit::Unit => 1.0,
            ScaleUnit::Thousand => 1_000.0,
            ScaleUnit::Million => 1_000_000.0,
        }
    }
}

/// A single account line of a statement, already filtered to one company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementRow {
    pub account_code: String,
    /// `None` when the amount field is blank or not a number
    pub amount: Option<f64>,
    pub scale: Option<ScaleUnit>,
}

/// Line items a company record is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Account {
    TotalAssets,
    CurrentAssets,
    CurrentLiabilities,
    NonCurrentLiabilities,
    Equity,
    NetIncome,
}

impl Account {
    pub const ALL: [Account; 6] = [
        Account::TotalAssets,
        Account::CurrentAssets,
        Account::CurrentLiabilities,
        Account::NonCurrentLiabilities,
        Account::Equity,
        Account::NetIncome,
    ];

    /// Statement the account is published in.
    pub fn statement(&self) -> StatementKind {
        match self {
            Account::TotalAssets | Account::CurrentAssets => StatementKind::Assets,
            Account::CurrentLiabilities | Account::NonCurrentLiabilities | Account::Equity => {
                StatementKind::LiabilitiesEquity
            }
            Account::NetIncome => StatementKind::Income,
        }
    }
}

/// Company raw financials, normalized to unit scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawFinancials {
    pub current_assets: f64,
    pub total_assets: f64,
    pub current_liabilities: f64,
    pub non_current_liabilities: f64,
    pub equity: f64,
    pub net_income: f64,
}

impl RawFinancials {
    pub fn total_debt(&self) -> f64 {
        self.current_liabilities + self.non_current_liabilities
    }
}

/// The four ratios the rating works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    CurrentRatio,
    OverallLeverage,
    DebtToEquity,
    ReturnOnEquity,
}

impl Indicator {
    pub const ALL: [Indicator; 4] = [
        Indicator::CurrentRatio,
        Indicator::OverallLeverage,
        Indicator::DebtToEquity,
        Indicator::ReturnOnEquity,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Indicator::CurrentRatio => "current_ratio",
            Indicator::OverallLeverage => "overall_leverage",
            Indicator::DebtToEquity => "debt_to_equity",
            Indicator::ReturnOnEquity => "return_on_equity",
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Derived ratios for one company. `None` marks an undefined ratio
/// (near-zero denominator), never a computed zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub current_ratio: Option<f64>,
    pub overall_leverage: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub return_on_equity: Option<f64>,
}

impl IndicatorSet {
    pub fn get(&self, indicator: Indicator) -> Option<f64> {
        match indicator {
            Indicator::CurrentRatio => self.current_ratio,
            Indicator::OverallLeverage => self.overall_leverage,
            Indicator::DebtToEquity => self.debt_to_equity,
            Indicator::ReturnOnEquity => self.return_on_equity,
        }
    }

    pub fn set(&mut self, indicator: Indicator, value: Option<f64>) {
        match indicator {
            Indicator::CurrentRatio => self.current_ratio = value,
            Indicator::OverallLeverage => self.overall_leverage = value,
            Indicator::DebtToEquity => self.debt_to_equity = value,
            Indicator::ReturnOnEquity => self.return_on_equity = value,
        }
    }

    /// Indicators that are undefined or not finite.
    pub fn undefined(&self) -> Vec<Indicator> {
        Indicator::ALL
            .into_iter()
            .filter(|i| !self.get(*i).is_some_and(f64::is_finite))
            .collect()
    }

    /// Column-wise arithmetic mean. Undefined values are skipped per column.
    pub fn mean<'a>(sets: impl IntoIterator<Item = &'a IndicatorSet>) -> IndicatorSet {
        let sets: Vec<&IndicatorSet> = sets.into_iter().collect();
        let mut out = IndicatorSet::default();
        for indicator in Indicator::ALL {
            let values: Vec<f64> = sets.iter().filter_map(|s| s.get(indicator)).collect();
            if !values.is_empty() {
                out.set(indicator, Some(values.iter().sum::<f64>() / values.len() as f64));
            }
        }
        out
    }
}

/// Result of extracting one company from a filing archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyIndicators {
    pub registry_id: String,
    pub variant: StatementVariant,
    pub raw: RawFinancials,
    pub indicators: IndicatorSet,
}

/// Numeric table whose rows are indicators and whose columns are named series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorTable {
    pub index_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<IndicatorRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub indicator: Indicator,
    pub values: Vec<Option<f64>>,
}

impl IndicatorTable {
    /// Build a table from named indicator sets, one column per set.
    pub fn from_columns(index_name: &str, columns: &[(String, IndicatorSet)]) -> Self {
        let rows = Indicator::ALL
            .into_iter()
            .map(|indicator| IndicatorRow {
                indicator,
                values: columns.iter().map(|(_, set)| set.get(indicator)).collect(),
            })
            .collect();
        Self {
            index_name: index_name.to_string(),
            columns: columns.iter().map(|(name, _)| name.clone()).collect(),
            rows,
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn value(&self, indicator: Indicator, column: &str) -> Option<f64> {
        let idx = self.column_index(column)?;
        self.rows
            .iter()
            .find(|r| r.indicator == indicator)
            .and_then(|r| r.values.get(idx).copied().flatten())
    }
}

/// Output of the peer analysis step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerAnalysis {
    pub target: String,
    pub year: i32,
    /// Indicator x company, companies in sorted ticker order.
    pub full: IndicatorTable,
    /// Indicator x {target, sector average}.
    pub comparison: IndicatorTable,
    pub target_indicators: IndicatorSet,
    pub sector_average: IndicatorSet,
    pub survivors: Vec<String>,
    pub excluded: Vec<Exclusion>,
}

/// A company dropped from the peer set and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exclusion {
    pub ticker: String,
    pub reason: String,
}

/// Per-category rubric scores, each in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryScores {
    pub liquidity: f64,
    pub leverage: f64,
    pub profitability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingResult {
    pub final_score: f64,
    pub rating: String,
    pub categories: CategoryScores,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertTag {
    Red,
    Green,
}

impl AlertTag {
    pub fn label(&self) -> &'static str {
        match self {
            AlertTag::Red => "[RED FLAG]",
            AlertTag::Green => "[GREEN FLAG]",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub tag: AlertTag,
    pub message: String,
}

impl Alert {
    pub fn red(message: impl Into<String>) -> Self {
        Self { tag: AlertTag::Red, message: message.into() }
    }

    pub fn green(message: impl Into<String>) -> Self {
        Self { tag: AlertTag::Green, message: message.into() }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.tag.label(), self.message)
    }
}

/// Everything a report renderer needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditReport {
    pub target: String,
    pub year: i32,
    pub generated_at: DateTime<Utc>,
    pub rating: RatingResult,
    pub alerts: Vec<Alert>,
    pub comparison: IndicatorTable,
    pub full: IndicatorTable,
    pub excluded: Vec<Exclusion>,
}
