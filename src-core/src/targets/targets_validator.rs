use rust_decimal::Decimal;
use std::str::FromStr;

use crate::constants::{COUNT_SANITY_CEILING, MONETARY_SANITY_CEILING, SALES_SUM_TOLERANCE};
use crate::targets::targets_model::{TargetField, UserTarget};

/// Bounds applied to every proposed aggregate state. The ceilings exist to
/// catch duplication bugs, not to enforce business rules.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    pub monetary_ceiling: Decimal,
    pub count_ceiling: i32,
    pub sales_sum_tolerance: Decimal,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        ValidatorConfig {
            monetary_ceiling: Decimal::from_str(MONETARY_SANITY_CEILING).unwrap_or(Decimal::MAX),
            count_ceiling: COUNT_SANITY_CEILING,
            sales_sum_tolerance: Decimal::from_str(SALES_SUM_TOLERANCE).unwrap_or_default(),
        }
    }
}

/// Checks that a proposed aggregate keeps every counter inside sane bounds
/// and the derived sales amount consistent with its components. Pure: the
/// caller decides whether to log, abort or surface the issues.
pub fn validate_aggregate(
    target: &UserTarget,
    config: &ValidatorConfig,
) -> std::result::Result<(), Vec<String>> {
    let mut issues = Vec::new();

    for field in TargetField::MONETARY {
        let value = target.current_of(field);
        if value < Decimal::ZERO {
            issues.push(format!("{} is negative: {}", field.as_str(), value));
        }
        if value > config.monetary_ceiling {
            issues.push(format!(
                "{} exceeds the sanity ceiling {}: {}",
                field.as_str(),
                config.monetary_ceiling,
                value
            ));
        }
    }

    for field in TargetField::COUNTS {
        let value = target.current_of(field);
        if value < Decimal::ZERO {
            issues.push(format!("{} is negative: {}", field.as_str(), value));
        }
        if value > Decimal::from(config.count_ceiling) {
            issues.push(format!(
                "{} exceeds the sanity ceiling {}: {}",
                field.as_str(),
                config.count_ceiling,
                value
            ));
        }
    }

    let component_sum = target.current_quotations_amount + target.current_orders_amount;
    if (target.current_sales_amount - component_sum).abs() > config.sales_sum_tolerance {
        issues.push(format!(
            "currentSalesAmount {} does not match quotations {} + orders {}",
            target.current_sales_amount,
            target.current_quotations_amount,
            target.current_orders_amount
        ));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}
