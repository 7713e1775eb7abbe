use serde::{Deserialize, Serialize};

/// One user-supplied data point of known income for a past year.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct EarningsEntry {
    pub year: i32,
    pub amount: f64,
}

#[derive(Debug, Clone)]
pub struct Inputs {
    pub current_savings: f64,
    pub savings_growth_rate: f64,
    pub current_investments: f64,
    pub investments_growth_rate: f64,

    pub current_annual_income: f64,
    pub income_growth_rate: f64,

    pub spend_percentage: f64,
    pub savings_percentage: f64,
    pub investment_percentage: f64,

    pub inflation_rate: f64,

    pub first_earning_year: i32,
    pub first_year_earnings: f64,
    pub historical_earnings: Vec<EarningsEntry>,
}

/// Derived financial state for a single calendar year. `spending` is
/// omitted from the serialized record when no spending flow was modeled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearPoint {
    pub year: i32,
    pub income: f64,
    pub savings: f64,
    pub investments: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spending: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub past: Vec<YearPoint>,
    pub future: Vec<YearPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStatistics {
    pub total_income: f64,
    pub final_savings: f64,
    pub final_investments: f64,
    pub total_value: f64,
    /// First year where the 4% rule covers assumed spending; 0 means the
    /// threshold is never reached within the projected horizon.
    pub fire_year: i32,
}
