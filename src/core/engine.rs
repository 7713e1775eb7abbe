use std::collections::BTreeMap;

use super::types::{Inputs, Projection, SummaryStatistics, YearPoint};

pub const FUTURE_HORIZON_YEARS: u32 = 40;
pub const INCOME_HORIZON_YEARS: u32 = 20;

const FIRE_WITHDRAWAL_RATE: f64 = 0.04;
const FIRE_SPEND_ASSUMPTION: f64 = 0.70;
const RECONCILE_TOLERANCE: f64 = 0.01;

pub fn run_projection(inputs: &Inputs, current_year: i32) -> Projection {
    Projection {
        past: build_past_series(inputs, current_year),
        future: build_future_series(inputs, current_year, FUTURE_HORIZON_YEARS),
    }
}

/// Reconstructs the historical series from the first earning year through
/// the current year: anchored income lookup with linear interpolation for
/// unknown years, a spend/save/invest cash waterfall, and a final
/// reconciliation pass so the last record lands on the stated balances.
pub fn build_past_series(inputs: &Inputs, current_year: i32) -> Vec<YearPoint> {
    let mut known_incomes = BTreeMap::new();
    for entry in &inputs.historical_earnings {
        known_incomes.insert(entry.year, entry.amount);
    }
    // Anchors win over conflicting user entries for the same year.
    known_incomes.insert(inputs.first_earning_year, inputs.first_year_earnings);
    known_incomes.insert(current_year, inputs.current_annual_income);

    let mut points = Vec::new();
    let mut running_savings = 0.0_f64;
    let mut running_investments = 0.0_f64;

    for year in inputs.first_earning_year..=current_year {
        let income = income_for_year(&known_incomes, year);

        let spending = income * inputs.spend_percentage / 100.0;
        let savings_flow = income * inputs.savings_percentage / 100.0;
        let investment_flow = income * inputs.investment_percentage / 100.0;

        if year > inputs.first_earning_year {
            running_savings *= 1.0 + inputs.savings_growth_rate / 100.0;
            running_investments *= 1.0 + inputs.investments_growth_rate / 100.0;
        }

        running_savings += savings_flow;
        let shortfall = if spending > running_savings {
            let uncovered = spending - running_savings;
            running_savings = 0.0;
            uncovered
        } else {
            running_savings -= spending;
            0.0
        };

        running_investments += investment_flow;
        if shortfall > 0.0 {
            running_investments = (running_investments - shortfall).max(0.0);
        }

        points.push(YearPoint {
            year,
            income,
            savings: running_savings,
            investments: running_investments,
            spending: Some(spending),
        });
    }

    reconcile_balances(
        &mut points,
        inputs.current_savings,
        |p| p.savings,
        |p, v| p.savings = v,
    );
    reconcile_balances(
        &mut points,
        inputs.current_investments,
        |p| p.investments,
        |p, v| p.investments = v,
    );

    points
}

fn income_for_year(known_incomes: &BTreeMap<i32, f64>, year: i32) -> f64 {
    if let Some(&amount) = known_incomes.get(&year) {
        return amount;
    }

    // Both anchors are always present, so an unknown year is strictly
    // between two known ones.
    let prev = known_incomes.range(..year).next_back();
    let next = known_incomes.range(year + 1..).next();
    match (prev, next) {
        (Some((&prev_year, &prev_value)), Some((&next_year, &next_value))) => {
            if next_year == prev_year {
                return prev_value;
            }
            prev_value
                + (next_value - prev_value) * (year - prev_year) as f64
                    / (next_year - prev_year) as f64
        }
        (Some((_, &value)), None) | (None, Some((_, &value))) => value,
        (None, None) => 0.0,
    }
}

/// The reconstructed history is a rough simulation and rarely lands
/// exactly on the stated present-day balance. Scale the whole series to
/// meet it, or fall back to a linear ramp when the simulation bottomed
/// out at zero and scaling has nothing to work with.
fn reconcile_balances<G, S>(points: &mut [YearPoint], target: f64, get: G, set: S)
where
    G: Fn(&YearPoint) -> f64,
    S: Fn(&mut YearPoint, f64),
{
    let Some(last) = points.last() else {
        return;
    };
    let simulated_final = get(last);

    if simulated_final > 0.0 {
        if (simulated_final - target).abs() > RECONCILE_TOLERANCE {
            let ratio = target / simulated_final;
            for point in points.iter_mut() {
                let scaled = get(point) * ratio;
                set(point, scaled);
            }
        }
        return;
    }

    if target > 0.0 {
        let last_index = points.len() - 1;
        if last_index == 0 {
            set(&mut points[0], target);
            return;
        }
        for (index, point) in points.iter_mut().enumerate() {
            set(point, target * index as f64 / last_index as f64);
        }
    }
}

/// Projects `horizon_years` forward from the stated balances. Income grows
/// only inside the earning window (20 years, or the whole horizon if
/// shorter) and reports as 0 beyond it; balances keep compounding either
/// way. Inflation discounts the reported record only, never the running
/// state.
pub fn build_future_series(inputs: &Inputs, current_year: i32, horizon_years: u32) -> Vec<YearPoint> {
    let mut points = Vec::with_capacity(horizon_years as usize);

    let mut running_income = inputs.current_annual_income;
    let mut running_savings = inputs.current_savings;
    let mut running_investments = inputs.current_investments;

    let income_horizon = INCOME_HORIZON_YEARS.min(horizon_years);

    for offset in 1..=horizon_years {
        let year = current_year + offset as i32;

        let (income, spending, savings_flow, investment_flow) = if offset <= income_horizon {
            running_income *= 1.0 + inputs.income_growth_rate / 100.0;
            (
                running_income,
                running_income * inputs.spend_percentage / 100.0,
                running_income * inputs.savings_percentage / 100.0,
                running_income * inputs.investment_percentage / 100.0,
            )
        } else {
            (0.0, 0.0, 0.0, 0.0)
        };

        running_savings *= 1.0 + inputs.savings_growth_rate / 100.0;
        running_investments *= 1.0 + inputs.investments_growth_rate / 100.0;

        running_savings += savings_flow;
        let shortfall = if spending > running_savings {
            let uncovered = spending - running_savings;
            running_savings = 0.0;
            uncovered
        } else {
            running_savings -= spending;
            0.0
        };

        running_investments += investment_flow;
        if shortfall > 0.0 {
            running_investments = (running_investments - shortfall).max(0.0);
        }

        let inflation_factor = (1.0 - inputs.inflation_rate / 100.0).powi(offset as i32);
        points.push(YearPoint {
            year,
            income: income * inflation_factor,
            savings: running_savings * inflation_factor,
            investments: running_investments * inflation_factor,
            spending: Some(spending * inflation_factor),
        });
    }

    points
}

/// Summary figures over the combined series. The FIRE year is the first
/// year where a 4% withdrawal covers assumed annual spending, taken as a
/// fixed 70% of the last known past income regardless of the configured
/// spend percentage (kept verbatim from the product's original heuristic).
pub fn compute_statistics(
    past: &[YearPoint],
    future: &[YearPoint],
    last_known_past_income: f64,
) -> SummaryStatistics {
    let total_income = past.iter().map(|p| p.income).sum::<f64>()
        + future
            .iter()
            .take(INCOME_HORIZON_YEARS as usize)
            .map(|p| p.income)
            .sum::<f64>();

    let (final_savings, final_investments) = future
        .last()
        .or_else(|| past.last())
        .map(|p| (p.savings, p.investments))
        .unwrap_or((0.0, 0.0));

    let annual_spending = last_known_past_income * FIRE_SPEND_ASSUMPTION;
    let fire_year = past
        .iter()
        .chain(future.iter())
        .find(|p| p.investments * FIRE_WITHDRAWAL_RATE >= annual_spending)
        .map(|p| p.year)
        .unwrap_or(0);

    SummaryStatistics {
        total_income,
        final_savings,
        final_investments,
        total_value: final_savings + final_investments,
        fire_year,
    }
}
