// src/optimization/formulas.rs

//! Closed-form inventory formulas (EOQ and reorder point).
//!
//! Each returns a [`Validated`] so degenerate inputs (zero holding cost,
//! missing lead time, negative demand) land on a documented default rather
//! than leaking NaN or infinity into the output tables.

use crate::model::validation::{round_non_negative, Validated};

/// Annual cost of holding one unit: H = unit cost x rate.
pub fn holding_cost(unit_cost: f64, holding_cost_rate: f64) -> f64 {
    unit_cost * holding_cost_rate
}

/// Economic Order Quantity.
///
/// # Formula
/// EOQ = sqrt((2 * D * S) / (H + epsilon))
///
/// `epsilon` keeps a zero holding cost finite; the resulting very large
/// quantity is the intended output for products with no known unit cost.
///
/// # Arguments
/// * `annual_demand` - Units sold over the period (D).
/// * `ordering_cost` - Fixed cost per order (S).
/// * `holding_cost` - Annual cost of holding one unit (H).
/// * `epsilon` - Guard added to H.
pub fn economic_order_quantity(
    annual_demand: f64,
    ordering_cost: f64,
    holding_cost: f64,
    epsilon: f64,
) -> Validated<u64> {
    let eoq = ((2.0 * annual_demand * ordering_cost) / (holding_cost + epsilon)).sqrt();
    round_non_negative(eoq)
}

/// Reorder Point.
///
/// # Formula
/// ROP = AvgDailyDemand * AvgLeadTime + SafetyStock
///
/// Without any lead time the point cannot be placed and clamps to 0.
pub fn reorder_point(
    avg_daily_demand: f64,
    avg_lead_time_days: Option<f64>,
    safety_stock: f64,
) -> Validated<u64> {
    match avg_lead_time_days {
        Some(lead_time) => round_non_negative(avg_daily_demand * lead_time + safety_stock),
        None => Validated::Clamped {
            value: 0,
            reason: "no lead time available",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eoq_textbook_case() {
        // sqrt(2 * 730 * 50 / 2) = sqrt(36500) = 191.05
        assert_eq!(economic_order_quantity(730.0, 50.0, 2.0, 1e-6), Validated::Valid(191));
    }

    #[test]
    fn eoq_with_zero_holding_cost_is_large_but_finite() {
        // sqrt(2 * 730 * 50 / 1e-6) = sqrt(7.3e10) = 270185.1
        assert_eq!(
            economic_order_quantity(730.0, 50.0, 0.0, 1e-6),
            Validated::Valid(270_185)
        );
    }

    #[test]
    fn eoq_degenerate_inputs_clamp_to_zero() {
        assert_eq!(economic_order_quantity(0.0, 50.0, 2.0, 1e-6), Validated::Valid(0));
        // Net returns give negative demand and a NaN square root.
        assert_eq!(economic_order_quantity(-10.0, 50.0, 2.0, 1e-6).value(), Some(0));
        assert!(!economic_order_quantity(-10.0, 50.0, 2.0, 1e-6).is_valid());
    }

    #[test]
    fn reorder_point_textbook_case() {
        assert_eq!(reorder_point(2.0, Some(7.0), 0.0), Validated::Valid(14));
        assert_eq!(reorder_point(2.0, Some(7.0), 5.0), Validated::Valid(19));
    }

    #[test]
    fn reorder_point_without_lead_time_or_with_negative_lead_time() {
        assert_eq!(reorder_point(2.0, None, 0.0).value(), Some(0));
        assert!(!reorder_point(2.0, None, 0.0).is_valid());
        assert_eq!(reorder_point(2.0, Some(-3.0), 0.0).value(), Some(0));
    }

    #[test]
    fn holding_cost_is_a_rate_on_unit_cost() {
        assert!((holding_cost(10.0, 0.20) - 2.0).abs() < 1e-12);
        assert_eq!(holding_cost(0.0, 0.20), 0.0);
    }
}
