// src/pipeline/abc.rs

//! Pareto (ABC) classification of products by total gross profit.

use crate::model::product::{Keyed, ProductKey};
use crate::model::records::{AbcCategory, CategorySummary, ProductProfitSummary, SalesMasterRecord};
use crate::model::validation::ratio;
use crate::pipeline::config::AbcThresholds;
use crate::pipeline::diagnostics::{IssueKind, StageDiagnostics};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Clone)]
pub struct AbcAnalysis {
    /// Ranked by TotalGrossProfit descending, ties by ProductKey.
    pub products: Vec<ProductProfitSummary>,
    pub summary: Vec<CategorySummary>,
    pub diagnostics: StageDiagnostics,
}

/// A if p <= a, B if a < p <= b, C otherwise.
pub fn classify(cumulative_share: f64, thresholds: &AbcThresholds) -> AbcCategory {
    if cumulative_share <= thresholds.a_threshold {
        AbcCategory::A
    } else if cumulative_share <= thresholds.b_threshold {
        AbcCategory::B
    } else {
        AbcCategory::C
    }
}

pub fn total_profit_by_product(sales: &[SalesMasterRecord]) -> BTreeMap<ProductKey, f64> {
    let mut totals = BTreeMap::new();
    for sale in sales {
        *totals.entry(sale.product_key()).or_insert(0.0) += sale.gross_profit;
    }
    totals
}

/// Descending by profit; equal profits fall back to key order.
pub fn rank_products(totals: BTreeMap<ProductKey, f64>) -> Vec<(ProductKey, f64)> {
    let mut ranked: Vec<(ProductKey, f64)> = totals.into_iter().collect();
    ranked.sort_by(|(ka, a), (kb, b)| match b.total_cmp(a) {
        Ordering::Equal => ka.cmp(kb),
        other => other,
    });
    ranked
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AbcClassifier {
    thresholds: AbcThresholds,
}

impl AbcClassifier {
    pub fn new(thresholds: AbcThresholds) -> Self {
        Self { thresholds }
    }

    pub fn classify_products(&self, sales: &[SalesMasterRecord]) -> AbcAnalysis {
        let mut diag = StageDiagnostics::new("abc");
        let ranked = rank_products(total_profit_by_product(sales));
        let grand_total: f64 = ranked.iter().map(|(_, p)| p).sum();

        if grand_total == 0.0 && !ranked.is_empty() {
            // Every share is undefined: report 0% and place everything in C.
            diag.record_n(
                IssueKind::NumericDegeneracy,
                "grand total profit is zero; shares set to 0 and category C",
                ranked.len(),
            );
        }

        let mut cumulative = 0.0;
        let products: Vec<ProductProfitSummary> = ranked
            .into_iter()
            .map(|(key, total)| {
                cumulative += total;
                let share = ratio(total, grand_total).value_or(0.0);
                let cumulative_share = ratio(cumulative, grand_total).value_or(0.0);
                let category = if grand_total == 0.0 {
                    AbcCategory::C
                } else {
                    classify(cumulative_share, &self.thresholds)
                };
                ProductProfitSummary {
                    brand: key.brand,
                    description: key.description,
                    size: key.size,
                    total_gross_profit: total,
                    cumulative_profit: cumulative,
                    profit_percentage: share,
                    cumulative_profit_percentage: cumulative_share,
                    abc_category: category,
                }
            })
            .collect();

        let summary = summarize(&products);
        for row in &summary {
            info!(
                category = %row.abc_category,
                products = row.total_products,
                profit = row.total_profit,
                profit_share = row.profit_share,
                "ABC tier"
            );
        }

        AbcAnalysis {
            products,
            summary,
            diagnostics: diag,
        }
    }
}

/// Category rollup; shares are percentages of all products and profit.
pub fn summarize(products: &[ProductProfitSummary]) -> Vec<CategorySummary> {
    let grand_total: f64 = products.iter().map(|p| p.total_gross_profit).sum();
    let product_count = products.len() as f64;

    let mut tiers: BTreeMap<AbcCategory, Vec<f64>> = BTreeMap::new();
    for product in products {
        tiers
            .entry(product.abc_category)
            .or_default()
            .push(product.total_gross_profit);
    }

    tiers
        .into_iter()
        .map(|(category, profits)| {
            let total: f64 = profits.iter().sum();
            CategorySummary {
                abc_category: category,
                total_products: profits.len(),
                total_profit: total,
                min_profit: profits.iter().copied().fold(f64::INFINITY, f64::min),
                max_profit: profits.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                profit_share: ratio(total, grand_total).value_or(0.0) * 100.0,
                product_share: ratio(profits.len() as f64, product_count).value_or(0.0) * 100.0,
            }
        })
        .collect()
}
