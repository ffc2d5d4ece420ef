use analysis_core::{IndicatorSet, RawFinancials, NEAR_ZERO};

/// `numerator / denominator`, undefined when the denominator is near zero.
pub fn safe_ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator.abs() > NEAR_ZERO {
        Some(numerator / denominator)
    } else {
        None
    }
}

pub fn calculate_current_ratio(current_assets: f64, current_liabilities: f64) -> Option<f64> {
    safe_ratio(current_assets, current_liabilities)
}

pub fn calculate_overall_leverage(total_debt: f64, total_assets: f64) -> Option<f64> {
    safe_ratio(total_debt, total_assets)
}

pub fn calculate_debt_to_equity(total_debt: f64, equity: f64) -> Option<f64> {
    safe_ratio(total_debt, equity)
}

/// Return on equity as a fraction (0.15 = 15%).
pub fn calculate_roe(net_income: f64, equity: f64) -> Option<f64> {
    safe_ratio(net_income, equity)
}

pub fn compute_indicators(raw: &RawFinancials) -> IndicatorSet {
    let total_debt = raw.total_debt();
    IndicatorSet {
        current_ratio: calculate_current_ratio(raw.current_assets, raw.current_liabilities),
        overall_leverage: calculate_overall_leverage(total_debt, raw.total_assets),
        debt_to_equity: calculate_debt_to_equity(total_debt, raw.equity),
        return_on_equity: calculate_roe(raw.net_income, raw.equity),
    }
}
