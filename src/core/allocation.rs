/// Income allocation split in percent. Valid states sum to 100.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Allocation {
    pub spend: f64,
    pub savings: f64,
    pub investment: f64,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AllocationField {
    Spend,
    Savings,
    Investment,
}

const SUM_TOLERANCE: f64 = 0.01;

/// True iff spend + savings + investment sums to 100 within tolerance.
pub fn validate_allocation(spend: f64, savings: f64, investment: f64) -> bool {
    let sum = spend + savings + investment;
    (sum - 100.0).abs() < SUM_TOLERANCE
}

/// Applies a single slider change to an allocation triple, absorbing the
/// delta in the other two fields so the total stays at 100.
///
/// The compensation is split proportionally to the other fields' current
/// values (evenly when both are zero) and each field is floored at 0, so
/// a large enough delta can push the total below 100; the form keeps the
/// submit path closed until `validate_allocation` passes again.
pub fn rebalance_allocation(
    current: Allocation,
    changed: AllocationField,
    new_value: f64,
) -> Allocation {
    let new_value = new_value.clamp(0.0, 100.0);
    let (old_value, first, second) = match changed {
        AllocationField::Spend => (current.spend, current.savings, current.investment),
        AllocationField::Savings => (current.savings, current.spend, current.investment),
        AllocationField::Investment => (current.investment, current.spend, current.savings),
    };
    let delta = new_value - old_value;

    let other_total = first + second;
    let (first_share, second_share) = if other_total == 0.0 {
        (0.5, 0.5)
    } else {
        (first / other_total, second / other_total)
    };
    let first = (first - delta * first_share).max(0.0);
    let second = (second - delta * second_share).max(0.0);

    match changed {
        AllocationField::Spend => Allocation {
            spend: new_value,
            savings: first,
            investment: second,
        },
        AllocationField::Savings => Allocation {
            spend: first,
            savings: new_value,
            investment: second,
        },
        AllocationField::Investment => Allocation {
            spend: first,
            savings: second,
            investment: new_value,
        },
    }
}
