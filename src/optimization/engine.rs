// src/optimization/engine.rs

use crate::model::product::{Keyed, ProductKey};
use crate::model::records::{
    AbcCategory, EoqRecord, ProductProfitSummary, PurchaseRecord, SalesMasterRecord,
};
use crate::model::validation::{mean, ratio};
use crate::optimization::formulas::{economic_order_quantity, holding_cost, reorder_point};
use crate::pipeline::config::OptimizationConfig;
use crate::pipeline::diagnostics::{IssueKind, StageDiagnostics};
use crate::pipeline::reconcile::mean_purchase_price_by_key;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Quantity sold and the distinct days it sold on, per product.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DemandStats {
    pub annual_demand: i64,
    pub sale_dates: BTreeSet<NaiveDate>,
}

pub fn demand_by_product(sales: &[SalesMasterRecord]) -> BTreeMap<ProductKey, DemandStats> {
    let mut demand: BTreeMap<ProductKey, DemandStats> = BTreeMap::new();
    for sale in sales {
        let stats = demand.entry(sale.product_key()).or_default();
        stats.annual_demand += sale.sales_quantity;
        if let Some(date) = sale.sales_date {
            stats.sale_dates.insert(date);
        }
    }
    demand
}

/// Mean LeadTime_Days per product over lines that have one.
pub fn mean_lead_time_by_key(purchases: &[PurchaseRecord]) -> BTreeMap<ProductKey, f64> {
    let mut lead_times: BTreeMap<ProductKey, Vec<f64>> = BTreeMap::new();
    for purchase in purchases {
        if let Some(days) = purchase.lead_time_days {
            lead_times
                .entry(purchase.product_key())
                .or_default()
                .push(days as f64);
        }
    }
    lead_times
        .into_iter()
        .filter_map(|(key, days)| mean(days).map(|m| (key, m)))
        .collect()
}

/// Mean lead time over every purchase line; the fallback for products
/// without purchase history.
pub fn global_mean_lead_time(purchases: &[PurchaseRecord]) -> Option<f64> {
    mean(
        purchases
            .iter()
            .filter_map(|p| p.lead_time_days)
            .map(|d| d as f64),
    )
}

#[derive(Debug, Clone)]
pub struct OptimizationOutcome {
    /// One row per product that sold, in ProductKey order.
    pub records: Vec<EoqRecord>,
    pub global_lead_time: Option<f64>,
    pub diagnostics: StageDiagnostics,
}

/// EOQ / reorder-point engine. Cost parameters are fixed at construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryOptimizer {
    config: OptimizationConfig,
}

impl InventoryOptimizer {
    pub fn new(config: OptimizationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OptimizationConfig {
        &self.config
    }

    pub fn optimize(
        &self,
        sales: &[SalesMasterRecord],
        purchases: &[PurchaseRecord],
        abc: &[ProductProfitSummary],
    ) -> OptimizationOutcome {
        let mut diag = StageDiagnostics::new("optimize");

        let demand = demand_by_product(sales);
        let unit_costs = mean_purchase_price_by_key(purchases);
        let lead_times = mean_lead_time_by_key(purchases);
        let global_lead_time = global_mean_lead_time(purchases);
        let categories: BTreeMap<ProductKey, AbcCategory> = abc
            .iter()
            .map(|p| (p.product_key(), p.abc_category))
            .collect();

        info!(
            products = demand.len(),
            priced = unit_costs.len(),
            with_lead_time = lead_times.len(),
            global_lead_time = ?global_lead_time,
            "computing EOQ and reorder points"
        );

        let cfg = &self.config;
        let records = demand
            .into_iter()
            .map(|(key, stats)| {
                let avg_daily_demand = ratio(stats.annual_demand as f64, cfg.days_per_year);
                diag.note(IssueKind::NumericDegeneracy, "Avg_Daily_Demand", &avg_daily_demand);
                let avg_daily_demand = avg_daily_demand.value_or(0.0);

                let avg_unit_cost = match unit_costs.get(&key) {
                    Some(cost) => *cost,
                    None => {
                        diag.record(IssueKind::JoinMismatch, "product without purchase price; unit cost set to 0");
                        0.0
                    }
                };
                let holding = holding_cost(avg_unit_cost, cfg.holding_cost_rate);

                let eoq = economic_order_quantity(
                    stats.annual_demand as f64,
                    cfg.ordering_cost,
                    holding,
                    cfg.epsilon,
                );
                diag.note(IssueKind::NumericDegeneracy, "EOQ", &eoq);

                let avg_lead_time = match lead_times.get(&key) {
                    Some(days) => Some(*days),
                    None => {
                        diag.record(IssueKind::JoinMismatch, "product without lead time; global mean used");
                        global_lead_time
                    }
                };
                let rop = reorder_point(avg_daily_demand, avg_lead_time, cfg.safety_stock);
                diag.note(IssueKind::NumericDegeneracy, "Reorder_Point_ROP", &rop);

                let abc_category = categories.get(&key).copied();
                if abc_category.is_none() {
                    diag.record(IssueKind::JoinMismatch, "product without ABC category");
                }

                debug!(product = %key, eoq = ?eoq, rop = ?rop, "optimized");

                EoqRecord {
                    brand: key.brand,
                    description: key.description,
                    size: key.size,
                    annual_demand: stats.annual_demand,
                    total_sales_days: stats.sale_dates.len(),
                    avg_daily_demand,
                    avg_unit_cost,
                    holding_cost: holding,
                    eoq: eoq.value_or(0),
                    avg_lead_time_days: avg_lead_time,
                    reorder_point: rop.value_or(0),
                    abc_category,
                }
            })
            .collect();

        OptimizationOutcome {
            records,
            global_lead_time,
            diagnostics: diag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sale(brand: &str, quantity: i64, day: u32) -> SalesMasterRecord {
        SalesMasterRecord {
            brand: brand.to_string(),
            description: format!("Product {}", brand),
            size: "750mL".to_string(),
            inventory_id: format!("1_HARDERSFIELD_{}", brand),
            store: "1".to_string(),
            sales_date: NaiveDate::from_ymd_opt(2016, 1, day),
            sales_quantity: quantity,
            sales_dollars: quantity as f64 * 20.0,
            vendor_no: None,
            vendor_name: None,
            beg_on_hand: None,
            end_on_hand: None,
            avg_price: None,
            avg_purchase_price: 0.0,
            cost_imputed: false,
            cogs: 0.0,
            gross_profit: 0.0,
        }
    }

    fn purchase(brand: &str, price: Option<f64>, lead_time: Option<i64>) -> PurchaseRecord {
        PurchaseRecord {
            brand: brand.to_string(),
            description: format!("Product {}", brand),
            size: "750mL".to_string(),
            vendor_number: Some("4466".to_string()),
            vendor_name: Some("AMERICAN VINTAGE BEVERAGE".to_string()),
            po_number: Some("8124".to_string()),
            po_date: None,
            receiving_date: None,
            invoice_date: None,
            pay_date: None,
            purchase_price: price,
            quantity: 12,
            dollars: 0.0,
            lead_time_days: lead_time,
        }
    }

    fn profit(brand: &str, category: AbcCategory) -> ProductProfitSummary {
        ProductProfitSummary {
            brand: brand.to_string(),
            description: format!("Product {}", brand),
            size: "750mL".to_string(),
            total_gross_profit: 1.0,
            cumulative_profit: 1.0,
            profit_percentage: 1.0,
            cumulative_profit_percentage: 1.0,
            abc_category: category,
        }
    }

    #[test]
    fn demand_counts_quantity_and_distinct_days() {
        let sales = vec![sale("1", 3, 1), sale("1", 2, 1), sale("1", 5, 2)];
        let demand = demand_by_product(&sales);
        let stats = demand.values().next().unwrap();
        assert_eq!(stats.annual_demand, 10);
        assert_eq!(stats.sale_dates.len(), 2);
    }

    #[test]
    fn textbook_product_gets_expected_eoq_and_rop() {
        // 730 units/year at $10 -> H = 2.0; lead time 7 days.
        let sales = vec![sale("1", 365, 1), sale("1", 365, 2)];
        let purchases = vec![purchase("1", Some(9.0), Some(6)), purchase("1", Some(11.0), Some(8))];
        let abc = vec![profit("1", AbcCategory::A)];

        let outcome = InventoryOptimizer::default().optimize(&sales, &purchases, &abc);
        let record = &outcome.records[0];
        assert_eq!(record.annual_demand, 730);
        assert_eq!(record.total_sales_days, 2);
        assert!((record.avg_daily_demand - 2.0).abs() < 1e-12);
        assert!((record.avg_unit_cost - 10.0).abs() < 1e-12);
        assert!((record.holding_cost - 2.0).abs() < 1e-12);
        assert_eq!(record.eoq, 191);
        assert_eq!(record.avg_lead_time_days, Some(7.0));
        assert_eq!(record.reorder_point, 14);
        assert_eq!(record.abc_category, Some(AbcCategory::A));
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn unpurchased_product_uses_zero_cost_and_global_lead_time() {
        let sales = vec![sale("1", 365, 1), sale("2", 730, 1)];
        let purchases = vec![purchase("1", Some(10.0), Some(4)), purchase("1", Some(10.0), Some(10))];

        let outcome = InventoryOptimizer::default().optimize(&sales, &purchases, &[]);
        assert_eq!(outcome.global_lead_time, Some(7.0));

        let orphan = &outcome.records[1];
        assert_eq!(orphan.brand, "2");
        assert_eq!(orphan.avg_unit_cost, 0.0);
        assert_eq!(orphan.holding_cost, 0.0);
        assert_eq!(orphan.eoq, 270_185);
        assert_eq!(orphan.avg_lead_time_days, Some(7.0));
        assert_eq!(orphan.reorder_point, 14);
        assert_eq!(orphan.abc_category, None);
        assert!(outcome.diagnostics.count(IssueKind::JoinMismatch) >= 3);
    }

    #[test]
    fn no_lead_times_anywhere_clamps_rop() {
        let sales = vec![sale("1", 365, 1)];
        let purchases = vec![purchase("1", Some(10.0), None)];
        let outcome = InventoryOptimizer::default().optimize(&sales, &purchases, &[]);
        assert_eq!(outcome.records[0].avg_lead_time_days, None);
        assert_eq!(outcome.records[0].reorder_point, 0);
        assert_eq!(outcome.diagnostics.count(IssueKind::NumericDegeneracy), 1);
    }

    #[test]
    fn cost_parameters_come_from_the_config() {
        let config = OptimizationConfig {
            ordering_cost: 200.0,
            safety_stock: 6.0,
            ..OptimizationConfig::default()
        };
        let sales = vec![sale("1", 730, 1)];
        let purchases = vec![purchase("1", Some(10.0), Some(7))];
        let outcome = InventoryOptimizer::new(config).optimize(&sales, &purchases, &[]);
        // sqrt(2 * 730 * 200 / 2) = 382.1
        assert_eq!(outcome.records[0].eoq, 382);
        assert_eq!(outcome.records[0].reorder_point, 20);
    }
}
