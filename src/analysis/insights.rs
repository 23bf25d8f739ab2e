// src/analysis/insights.rs

use crate::model::backfill::{BackfillMap, TieBreak};
use crate::model::product::{Keyed, ProductKey};
use crate::model::records::{InventoryMasterRecord, SalesMasterRecord};
use crate::model::validation::{mean, median, ratio};
use crate::pipeline::diagnostics::{IssueKind, StageDiagnostics};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitySales {
    #[serde(rename = "City")]
    pub city: Option<String>,
    #[serde(rename = "Total_Sales_Dollars")]
    pub total_sales_dollars: f64,
    #[serde(rename = "Total_Sales_Quantity")]
    pub total_sales_quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryTurnover {
    #[serde(rename = "Total_COGS")]
    pub total_cogs: f64,
    #[serde(rename = "Beg_Inventory_Value")]
    pub beg_inventory_value: f64,
    #[serde(rename = "End_Inventory_Value")]
    pub end_inventory_value: f64,
    #[serde(rename = "Avg_Inventory_Value")]
    pub avg_inventory_value: f64,
    #[serde(rename = "Inventory_Turnover_Ratio")]
    pub turnover_ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductMargin {
    #[serde(rename = "Brand")]
    pub brand: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Size")]
    pub size: String,
    #[serde(rename = "Avg_GPM")]
    pub avg_gpm: Option<f64>,
    #[serde(rename = "Total_Sales_Dollars")]
    pub total_sales_dollars: f64,
    #[serde(rename = "Total_Sales_Quantity")]
    pub total_sales_quantity: i64,
}

#[derive(Debug, Clone)]
pub struct Insights {
    pub city_sales: Vec<CitySales>,
    pub turnover: InventoryTurnover,
    /// Products selling at least the median quantity.
    pub margins: Vec<ProductMargin>,
    pub top_margins: Vec<ProductMargin>,
    pub bottom_margins: Vec<ProductMargin>,
    pub diagnostics: StageDiagnostics,
}

/// Sales dollars and quantity per city, largest first. Stores missing from
/// the inventory master land under a null city.
pub fn city_sales(
    sales: &[SalesMasterRecord],
    inventory_master: &[InventoryMasterRecord],
    diag: &mut StageDiagnostics,
) -> Vec<CitySales> {
    let cities = BackfillMap::build(
        inventory_master
            .iter()
            .map(|r| (r.store.clone(), r.city.clone())),
        TieBreak::FirstSeen,
    );

    let mut totals: BTreeMap<Option<String>, (f64, i64)> = BTreeMap::new();
    for sale in sales {
        let city = cities.get(&sale.store).cloned();
        if city.is_none() {
            diag.record(IssueKind::JoinMismatch, "sale store without city");
        }
        let entry = totals.entry(city).or_insert((0.0, 0));
        entry.0 += sale.sales_dollars;
        entry.1 += sale.sales_quantity;
    }

    let mut rows: Vec<CitySales> = totals
        .into_iter()
        .map(|(city, (dollars, quantity))| CitySales {
            city,
            total_sales_dollars: dollars,
            total_sales_quantity: quantity,
        })
        .collect();
    rows.sort_by(|a, b| b.total_sales_dollars.total_cmp(&a.total_sales_dollars));
    rows
}

/// COGS over the mean of beginning and ending inventory value.
pub fn inventory_turnover(
    sales: &[SalesMasterRecord],
    inventory_master: &[InventoryMasterRecord],
    diag: &mut StageDiagnostics,
) -> InventoryTurnover {
    let total_cogs: f64 = sales.iter().map(|s| s.cogs).sum();
    let beg_value: f64 = inventory_master
        .iter()
        .map(|r| r.beg_on_hand as f64 * r.beg_price)
        .sum();
    let end_value: f64 = inventory_master
        .iter()
        .map(|r| r.end_on_hand as f64 * r.end_price)
        .sum();
    let avg_value = (beg_value + end_value) / 2.0;

    let turnover = ratio(total_cogs, avg_value);
    diag.note(IssueKind::NumericDegeneracy, "Inventory_Turnover_Ratio", &turnover);

    InventoryTurnover {
        total_cogs,
        beg_inventory_value: beg_value,
        end_inventory_value: end_value,
        avg_inventory_value: avg_value,
        turnover_ratio: turnover.is_valid().then(|| turnover.value_or(0.0)),
    }
}

/// Mean per-sale gross-profit margin (percent) for every product. Sales
/// with zero dollars have no margin and are left out of the mean.
pub fn product_margins(
    sales: &[SalesMasterRecord],
    diag: &mut StageDiagnostics,
) -> Vec<ProductMargin> {
    struct Acc {
        margins: Vec<f64>,
        dollars: f64,
        quantity: i64,
    }

    let mut by_product: BTreeMap<ProductKey, Acc> = BTreeMap::new();
    for sale in sales {
        let acc = by_product.entry(sale.product_key()).or_insert(Acc {
            margins: Vec::new(),
            dollars: 0.0,
            quantity: 0,
        });
        let margin = ratio(sale.gross_profit, sale.sales_dollars);
        if margin.is_valid() {
            acc.margins.push(margin.value_or(0.0) * 100.0);
        } else {
            diag.note(IssueKind::NumericDegeneracy, "GPM", &margin);
        }
        acc.dollars += sale.sales_dollars;
        acc.quantity += sale.sales_quantity;
    }

    by_product
        .into_iter()
        .map(|(key, acc)| ProductMargin {
            brand: key.brand,
            description: key.description,
            size: key.size,
            avg_gpm: mean(acc.margins),
            total_sales_dollars: acc.dollars,
            total_sales_quantity: acc.quantity,
        })
        .collect()
}

/// Keeps products whose quantity reaches the median product quantity.
pub fn filter_low_volume(margins: Vec<ProductMargin>) -> Vec<ProductMargin> {
    let quantities: Vec<f64> = margins
        .iter()
        .map(|m| m.total_sales_quantity as f64)
        .collect();
    let Some(threshold) = median(&quantities) else {
        return margins;
    };
    margins
        .into_iter()
        .filter(|m| m.total_sales_quantity as f64 >= threshold)
        .collect()
}

/// Highest and lowest `n` average margins among products that have one.
pub fn margin_leaders(margins: &[ProductMargin], n: usize) -> (Vec<ProductMargin>, Vec<ProductMargin>) {
    let mut ranked: Vec<&ProductMargin> = margins.iter().filter(|m| m.avg_gpm.is_some()).collect();
    ranked.sort_by(|a, b| {
        b.avg_gpm
            .unwrap_or(0.0)
            .total_cmp(&a.avg_gpm.unwrap_or(0.0))
    });
    let top = ranked.iter().take(n).map(|m| (*m).clone()).collect();
    let bottom = ranked.iter().rev().take(n).map(|m| (*m).clone()).collect();
    (top, bottom)
}

pub fn build_insights(
    sales: &[SalesMasterRecord],
    inventory_master: &[InventoryMasterRecord],
    leaders: usize,
) -> Insights {
    let mut diag = StageDiagnostics::new("insights");
    let city_sales = city_sales(sales, inventory_master, &mut diag);
    let turnover = inventory_turnover(sales, inventory_master, &mut diag);
    let margins = filter_low_volume(product_margins(sales, &mut diag));
    let (top_margins, bottom_margins) = margin_leaders(&margins, leaders);
    Insights {
        city_sales,
        turnover,
        margins,
        top_margins,
        bottom_margins,
        diagnostics: diag,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sale(brand: &str, store: &str, quantity: i64, dollars: f64, cogs: f64) -> SalesMasterRecord {
        SalesMasterRecord {
            brand: brand.into(),
            description: format!("Product {}", brand),
            size: "750mL".into(),
            inventory_id: format!("{}_X_{}", store, brand),
            store: store.into(),
            sales_date: None,
            sales_quantity: quantity,
            sales_dollars: dollars,
            vendor_no: None,
            vendor_name: None,
            beg_on_hand: None,
            end_on_hand: None,
            avg_price: None,
            avg_purchase_price: 0.0,
            cost_imputed: false,
            cogs,
            gross_profit: dollars - cogs,
        }
    }

    fn master(store: &str, city: &str, beg: (i64, f64), end: (i64, f64)) -> InventoryMasterRecord {
        InventoryMasterRecord {
            inventory_id: format!("{}_{}_58", store, city),
            store: store.into(),
            city: Some(city.into()),
            brand: "58".into(),
            description: "Gekkeikan Black & Gold Sake".into(),
            size: "750mL".into(),
            beg_on_hand: beg.0,
            beg_price: beg.1,
            end_on_hand: end.0,
            end_price: end.1,
            avg_price: (beg.1 + end.1) / 2.0,
        }
    }

    #[test]
    fn city_totals_follow_the_store_map() {
        let inventory = vec![master("1", "HARDERSFIELD", (1, 1.0), (1, 1.0)), master("2", "ASHBORNE", (1, 1.0), (1, 1.0))];
        let sales = vec![
            sale("1", "1", 2, 20.0, 10.0),
            sale("2", "2", 1, 50.0, 10.0),
            sale("3", "1", 1, 5.0, 1.0),
            sale("4", "9", 1, 1.0, 1.0),
        ];
        let mut diag = StageDiagnostics::new("insights");
        let rows = city_sales(&sales, &inventory, &mut diag);
        assert_eq!(rows[0].city.as_deref(), Some("ASHBORNE"));
        assert_eq!(rows[1].city.as_deref(), Some("HARDERSFIELD"));
        assert_eq!(rows[1].total_sales_dollars, 25.0);
        assert_eq!(rows[1].total_sales_quantity, 3);
        assert_eq!(rows[2].city, None);
        assert_eq!(diag.count(IssueKind::JoinMismatch), 1);
    }

    #[test]
    fn turnover_divides_cogs_by_average_inventory_value() {
        let inventory = vec![master("1", "HARDERSFIELD", (10, 5.0), (20, 5.0))];
        let sales = vec![sale("1", "1", 1, 100.0, 75.0)];
        let mut diag = StageDiagnostics::new("insights");
        let turnover = inventory_turnover(&sales, &inventory, &mut diag);
        assert_eq!(turnover.avg_inventory_value, 75.0);
        assert_eq!(turnover.turnover_ratio, Some(1.0));

        let empty = inventory_turnover(&sales, &[], &mut diag);
        assert_eq!(empty.turnover_ratio, None);
        assert_eq!(diag.count(IssueKind::NumericDegeneracy), 1);
    }

    #[test]
    fn margins_skip_zero_dollar_sales_and_low_volume_products() {
        let sales = vec![
            sale("1", "1", 10, 100.0, 60.0),
            sale("1", "1", 0, 0.0, 0.0),
            sale("2", "1", 5, 100.0, 90.0),
            sale("3", "1", 1, 100.0, 10.0),
        ];
        let mut diag = StageDiagnostics::new("insights");
        let margins = product_margins(&sales, &mut diag);
        assert_eq!(margins[0].avg_gpm, Some(40.0));
        assert_eq!(diag.count(IssueKind::NumericDegeneracy), 1);

        // Quantities 10, 5, 1 -> median 5 keeps products 1 and 2.
        let kept = filter_low_volume(margins);
        assert_eq!(kept.len(), 2);
        let (top, bottom) = margin_leaders(&kept, 1);
        assert_eq!(top[0].brand, "1");
        assert_eq!(bottom[0].brand, "2");
    }
}
