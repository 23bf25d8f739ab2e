// src/io/reporting.rs

//! Console previews of each stage's results. The row types here are
//! preview-only: numbers are pre-formatted so `tabled` can lay them out as
//! Markdown.

use crate::analysis::insights::{CitySales, InventoryTurnover, ProductMargin};
use crate::analysis::vendors::{by_payment_lag, LeadTimeOverview, VendorPerformance};
use crate::forecast::ForecastPoint;
use crate::model::records::{CategorySummary, EoqRecord, ProductProfitSummary};
use tabled::settings::Style;
use tabled::{Table, Tabled};

fn money(value: f64) -> String {
    format!("{:.2}", value)
}

fn optional(value: Option<f64>) -> String {
    value.map(money).unwrap_or_else(|| "-".to_string())
}

#[derive(Debug, Tabled, Clone)]
pub struct AbcSummaryView {
    #[tabled(rename = "Category")]
    pub category: String,
    #[tabled(rename = "Products")]
    pub products: usize,
    #[tabled(rename = "Total Profit")]
    pub total_profit: String,
    #[tabled(rename = "Min")]
    pub min_profit: String,
    #[tabled(rename = "Max")]
    pub max_profit: String,
    #[tabled(rename = "Profit %")]
    pub profit_share: String,
    #[tabled(rename = "Product %")]
    pub product_share: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct TopProductView {
    #[tabled(rename = "Brand")]
    pub brand: String,
    #[tabled(rename = "Description")]
    pub description: String,
    #[tabled(rename = "Size")]
    pub size: String,
    #[tabled(rename = "Gross Profit")]
    pub gross_profit: String,
    #[tabled(rename = "Cum %")]
    pub cumulative_share: String,
    #[tabled(rename = "ABC")]
    pub abc: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct EoqView {
    #[tabled(rename = "Brand")]
    pub brand: String,
    #[tabled(rename = "Description")]
    pub description: String,
    #[tabled(rename = "Size")]
    pub size: String,
    #[tabled(rename = "Annual Demand")]
    pub annual_demand: i64,
    #[tabled(rename = "EOQ")]
    pub eoq: u64,
    #[tabled(rename = "Lead Time")]
    pub lead_time: String,
    #[tabled(rename = "ROP")]
    pub reorder_point: u64,
    #[tabled(rename = "ABC")]
    pub abc: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct LeadTimeView {
    #[tabled(rename = "Observations")]
    pub observations: usize,
    #[tabled(rename = "Mean")]
    pub mean: String,
    #[tabled(rename = "Median")]
    pub median: String,
    #[tabled(rename = "Std Dev")]
    pub std_dev: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct VendorView {
    #[tabled(rename = "Vendor")]
    pub vendor_number: String,
    #[tabled(rename = "Name")]
    pub vendor_name: String,
    #[tabled(rename = "POs")]
    pub purchase_orders: usize,
    #[tabled(rename = "Dollars")]
    pub dollars: String,
    #[tabled(rename = "Lead Time")]
    pub lead_time: String,
    #[tabled(rename = "Lead Std")]
    pub lead_time_std_dev: String,
    #[tabled(rename = "Pay Lag")]
    pub payment_lag: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct PaymentLagView {
    #[tabled(rename = "Vendor")]
    pub vendor_number: String,
    #[tabled(rename = "Name")]
    pub vendor_name: String,
    #[tabled(rename = "Avg Payment Lag (days)")]
    pub payment_lag: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct CityView {
    #[tabled(rename = "City")]
    pub city: String,
    #[tabled(rename = "Sales Dollars")]
    pub dollars: String,
    #[tabled(rename = "Quantity")]
    pub quantity: i64,
}

#[derive(Debug, Tabled, Clone)]
pub struct TurnoverView {
    #[tabled(rename = "COGS")]
    pub cogs: String,
    #[tabled(rename = "Beg Value")]
    pub beg_value: String,
    #[tabled(rename = "End Value")]
    pub end_value: String,
    #[tabled(rename = "Avg Value")]
    pub avg_value: String,
    #[tabled(rename = "ITR")]
    pub turnover_ratio: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct MarginView {
    #[tabled(rename = "Brand")]
    pub brand: String,
    #[tabled(rename = "Description")]
    pub description: String,
    #[tabled(rename = "Size")]
    pub size: String,
    #[tabled(rename = "Avg GPM %")]
    pub avg_gpm: String,
    #[tabled(rename = "Quantity")]
    pub quantity: i64,
}

#[derive(Debug, Tabled, Clone)]
pub struct ForecastView {
    #[tabled(rename = "Week Ending")]
    pub week_ending: String,
    #[tabled(rename = "Forecast")]
    pub quantity: u64,
    #[tabled(rename = "Method")]
    pub method: String,
}

// =========================================================================
// Stage summaries
// =========================================================================

pub fn abc_summary_rows(summary: &[CategorySummary]) -> Vec<AbcSummaryView> {
    summary
        .iter()
        .map(|row| AbcSummaryView {
            category: row.abc_category.to_string(),
            products: row.total_products,
            total_profit: money(row.total_profit),
            min_profit: money(row.min_profit),
            max_profit: money(row.max_profit),
            profit_share: format!("{:.1}", row.profit_share),
            product_share: format!("{:.1}", row.product_share),
        })
        .collect()
}

/// The `n` most profitable products, already ranked.
pub fn top_product_rows(products: &[ProductProfitSummary], n: usize) -> Vec<TopProductView> {
    products
        .iter()
        .take(n)
        .map(|p| TopProductView {
            brand: p.brand.clone(),
            description: p.description.clone(),
            size: p.size.clone(),
            gross_profit: money(p.total_gross_profit),
            cumulative_share: format!("{:.1}", p.cumulative_profit_percentage * 100.0),
            abc: p.abc_category.to_string(),
        })
        .collect()
}

/// The `n` products with the largest EOQ.
pub fn eoq_rows(records: &[EoqRecord], n: usize) -> Vec<EoqView> {
    let mut ranked: Vec<&EoqRecord> = records.iter().collect();
    ranked.sort_by(|a, b| b.eoq.cmp(&a.eoq));
    ranked
        .into_iter()
        .take(n)
        .map(|r| EoqView {
            brand: r.brand.clone(),
            description: r.description.clone(),
            size: r.size.clone(),
            annual_demand: r.annual_demand,
            eoq: r.eoq,
            lead_time: optional(r.avg_lead_time_days),
            reorder_point: r.reorder_point,
            abc: r.abc_category.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string()),
        })
        .collect()
}

pub fn lead_time_rows(overview: &LeadTimeOverview) -> Vec<LeadTimeView> {
    vec![LeadTimeView {
        observations: overview.observations,
        mean: optional(overview.mean),
        median: optional(overview.median),
        std_dev: optional(overview.std_dev),
    }]
}

pub fn vendor_rows(vendors: &[VendorPerformance], n: usize) -> Vec<VendorView> {
    vendors
        .iter()
        .take(n)
        .map(|v| VendorView {
            vendor_number: v.vendor_number.clone().unwrap_or_default(),
            vendor_name: v.vendor_name.clone().unwrap_or_default(),
            purchase_orders: v.total_purchases,
            dollars: money(v.total_purchase_dollars),
            lead_time: optional(v.avg_lead_time_days),
            lead_time_std_dev: optional(v.lead_time_std_dev),
            payment_lag: optional(v.avg_payment_lag_days),
        })
        .collect()
}

/// The `n` slowest-paying vendors.
pub fn payment_lag_rows(vendors: &[VendorPerformance], n: usize) -> Vec<PaymentLagView> {
    by_payment_lag(vendors)
        .into_iter()
        .take(n)
        .map(|v| PaymentLagView {
            vendor_number: v.vendor_number.clone().unwrap_or_default(),
            vendor_name: v.vendor_name.clone().unwrap_or_default(),
            payment_lag: optional(v.avg_payment_lag_days),
        })
        .collect()
}

pub fn city_rows(cities: &[CitySales], n: usize) -> Vec<CityView> {
    cities
        .iter()
        .take(n)
        .map(|c| CityView {
            city: c.city.clone().unwrap_or_else(|| "(unknown)".to_string()),
            dollars: money(c.total_sales_dollars),
            quantity: c.total_sales_quantity,
        })
        .collect()
}

pub fn turnover_rows(turnover: &InventoryTurnover) -> Vec<TurnoverView> {
    vec![TurnoverView {
        cogs: money(turnover.total_cogs),
        beg_value: money(turnover.beg_inventory_value),
        end_value: money(turnover.end_inventory_value),
        avg_value: money(turnover.avg_inventory_value),
        turnover_ratio: optional(turnover.turnover_ratio),
    }]
}

pub fn margin_rows(margins: &[ProductMargin]) -> Vec<MarginView> {
    margins
        .iter()
        .map(|m| MarginView {
            brand: m.brand.clone(),
            description: m.description.clone(),
            size: m.size.clone(),
            avg_gpm: optional(m.avg_gpm),
            quantity: m.total_sales_quantity,
        })
        .collect()
}

pub fn forecast_rows(points: &[ForecastPoint]) -> Vec<ForecastView> {
    points
        .iter()
        .map(|p| ForecastView {
            week_ending: p.week_ending.to_string(),
            quantity: p.quantity,
            method: p.method.clone(),
        })
        .collect()
}

pub fn render_markdown<T: Tabled>(rows: Vec<T>) -> String {
    Table::new(rows).with(Style::markdown()).to_string()
}

/// Prints a titled table to stdout; empty tables print a placeholder.
pub fn print_table<T: Tabled>(title: &str, rows: Vec<T>) {
    println!("\n### {}\n", title);
    if rows.is_empty() {
        println!("(no rows)");
    } else {
        println!("{}", render_markdown(rows));
    }
}
