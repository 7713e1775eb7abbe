mod allocation;
mod engine;
mod types;

pub use allocation::{Allocation, AllocationField, rebalance_allocation, validate_allocation};
pub use engine::{
    FUTURE_HORIZON_YEARS, INCOME_HORIZON_YEARS, build_future_series, build_past_series,
    compute_statistics, run_projection,
};
pub use types::{EarningsEntry, Inputs, Projection, SummaryStatistics, YearPoint};
