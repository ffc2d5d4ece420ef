use analysis_core::{Alert, AnalysisError, Indicator, IndicatorTable};

pub const SECTOR_AVERAGE_COLUMN: &str = "Sector Average";

/// Column holding the target's values in a comparison table.
pub fn target_column(ticker: &str) -> String {
    format!("Target ({})", ticker.trim().to_uppercase())
}

fn pct(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

/// Turns a target-vs-sector comparison into RED/GREEN flags.
#[derive(Debug, Clone, Default)]
pub struct AlertGenerator;

impl AlertGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Flags, in a fixed order: liquidity, leverage, debt/equity,
    /// profitability.
    pub fn alerts(&self, target: &str, comparison: &IndicatorTable) -> Result<Vec<Alert>, AnalysisError> {
        let target_col = target_column(target);
        for column in [target_col.as_str(), SECTOR_AVERAGE_COLUMN] {
            if comparison.column_index(column).is_none() {
                return Err(AnalysisError::MissingColumn(column.to_string()));
            }
        }

        let lookup = |indicator: Indicator, column: &str| {
            comparison
                .value(indicator, column)
                .ok_or_else(|| AnalysisError::MissingColumn(format!("{} / {}", indicator, column)))
        };
        let pair = |indicator: Indicator| -> Result<(f64, f64), AnalysisError> {
            Ok((
                lookup(indicator, &target_col)?,
                lookup(indicator, SECTOR_AVERAGE_COLUMN)?,
            ))
        };

        let (current, current_avg) = pair(Indicator::CurrentRatio)?;
        let (leverage, leverage_avg) = pair(Indicator::OverallLeverage)?;
        let (de, de_avg) = pair(Indicator::DebtToEquity)?;
        let (roe, roe_avg) = pair(Indicator::ReturnOnEquity)?;

        let mut alerts = Vec::new();

        if current < 1.0 {
            alerts.push(Alert::red(format!(
                "Current Ratio ({:.2}) is below 1.0. Signals potential short-term liquidity risk.",
                current
            )));
        } else {
            alerts.push(Alert::green(format!(
                "Current Ratio ({:.2}) is at or above 1.0. Sound short-term position.",
                current
            )));
        }

        if current < current_avg {
            alerts.push(Alert::red(format!(
                "Current Ratio is below the sector average ({:.2}).",
                current_avg
            )));
        }

        if leverage > leverage_avg {
            alerts.push(Alert::red(format!(
                "Overall Leverage ({}) is ABOVE the sector average ({}).",
                pct(leverage),
                pct(leverage_avg)
            )));
        } else {
            alerts.push(Alert::green(format!(
                "Overall Leverage ({}) is at or below the sector average.",
                pct(leverage)
            )));
        }

        if de > de_avg {
            alerts.push(Alert::red(format!(
                "Debt/Equity ({:.2}) is ABOVE the sector average ({:.2}).",
                de, de_avg
            )));
        }

        if roe < 0.0 {
            alerts.push(Alert::red(format!(
                "Return on Equity is negative ({}). The company is posting a loss.",
                pct(roe)
            )));
        }

        if roe < roe_avg {
            alerts.push(Alert::red(format!(
                "Return on Equity ({}) is below the sector average ({}).",
                pct(roe),
                pct(roe_avg)
            )));
        } else {
            alerts.push(Alert::green(format!(
                "Return on Equity ({}) is at or above the sector average ({}).",
                pct(roe),
                pct(roe_avg)
            )));
        }

        for alert in &alerts {
            tracing::info!("{}", alert);
        }
        Ok(alerts)
    }
}
