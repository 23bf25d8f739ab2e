// src/model/records.rs

//! Row types for the raw extracts and for every derived table the stages
//! hand to each other. Column names follow the source extracts.

use crate::model::product::{Keyed, ProductKey};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// =========================================================================
// Raw extracts
// =========================================================================

/// One row of the beginning or ending inventory snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InventoryRow {
    pub inventory_id: String,
    pub store: String,
    #[serde(default)]
    pub city: Option<String>,
    pub brand: String,
    pub description: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(rename = "onHand", default, deserialize_with = "csv::invalid_option")]
    pub on_hand: Option<i64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub price: Option<f64>,
}

/// One purchase-order line as it arrives, before Size backfill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PurchaseRow {
    pub brand: String,
    pub description: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub vendor_number: Option<String>,
    #[serde(default)]
    pub vendor_name: Option<String>,
    #[serde(rename = "PONumber", default)]
    pub po_number: Option<String>,
    #[serde(rename = "PODate", default)]
    pub po_date: Option<String>,
    #[serde(default)]
    pub receiving_date: Option<String>,
    #[serde(default)]
    pub invoice_date: Option<String>,
    #[serde(default)]
    pub pay_date: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub purchase_price: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub quantity: Option<i64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub dollars: Option<f64>,
}

/// One sale as it arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SaleRow {
    pub inventory_id: String,
    pub store: String,
    pub brand: String,
    pub description: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub sales_quantity: Option<i64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub sales_dollars: Option<f64>,
    #[serde(default)]
    pub sales_date: Option<String>,
    #[serde(default)]
    pub vendor_no: Option<String>,
    #[serde(default)]
    pub vendor_name: Option<String>,
}

// =========================================================================
// Stage 1 outputs
// =========================================================================

/// Beginning and ending snapshots merged on the full inventory key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryMasterRecord {
    #[serde(rename = "InventoryId")]
    pub inventory_id: String,
    #[serde(rename = "Store")]
    pub store: String,
    #[serde(rename = "City")]
    pub city: Option<String>,
    #[serde(rename = "Brand")]
    pub brand: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Size")]
    pub size: String,
    #[serde(rename = "Beg_onHand")]
    pub beg_on_hand: i64,
    #[serde(rename = "Beg_Price")]
    pub beg_price: f64,
    #[serde(rename = "End_onHand")]
    pub end_on_hand: i64,
    #[serde(rename = "End_Price")]
    pub end_price: f64,
    #[serde(rename = "Avg_Price")]
    pub avg_price: f64,
}

/// A purchase line with a resolved Size and a derived lead time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    #[serde(rename = "Brand")]
    pub brand: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Size")]
    pub size: String,
    #[serde(rename = "VendorNumber")]
    pub vendor_number: Option<String>,
    #[serde(rename = "VendorName")]
    pub vendor_name: Option<String>,
    #[serde(rename = "PONumber")]
    pub po_number: Option<String>,
    #[serde(rename = "PODate")]
    pub po_date: Option<NaiveDate>,
    #[serde(rename = "ReceivingDate")]
    pub receiving_date: Option<NaiveDate>,
    #[serde(rename = "InvoiceDate")]
    pub invoice_date: Option<NaiveDate>,
    #[serde(rename = "PayDate")]
    pub pay_date: Option<NaiveDate>,
    #[serde(rename = "PurchasePrice")]
    pub purchase_price: Option<f64>,
    #[serde(rename = "Quantity")]
    pub quantity: i64,
    #[serde(rename = "Dollars")]
    pub dollars: f64,
    #[serde(rename = "LeadTime_Days")]
    pub lead_time_days: Option<i64>,
}

impl PurchaseRecord {
    /// PayDate - InvoiceDate in whole days.
    pub fn payment_lag_days(&self) -> Option<i64> {
        match (self.pay_date, self.invoice_date) {
            (Some(paid), Some(invoiced)) => Some((paid - invoiced).num_days()),
            _ => None,
        }
    }
}

/// One sale enriched with inventory context, imputed cost and profit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesMasterRecord {
    #[serde(rename = "Brand")]
    pub brand: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Size")]
    pub size: String,
    #[serde(rename = "InventoryId")]
    pub inventory_id: String,
    #[serde(rename = "Store")]
    pub store: String,
    #[serde(rename = "SalesDate")]
    pub sales_date: Option<NaiveDate>,
    #[serde(rename = "SalesQuantity")]
    pub sales_quantity: i64,
    #[serde(rename = "SalesDollars")]
    pub sales_dollars: f64,
    #[serde(rename = "VendorNo")]
    pub vendor_no: Option<String>,
    #[serde(rename = "VendorName")]
    pub vendor_name: Option<String>,
    #[serde(rename = "Beg_onHand")]
    pub beg_on_hand: Option<i64>,
    #[serde(rename = "End_onHand")]
    pub end_on_hand: Option<i64>,
    #[serde(rename = "Avg_Price")]
    pub avg_price: Option<f64>,
    #[serde(rename = "Avg_PurchasePrice")]
    pub avg_purchase_price: f64,
    /// True when no purchase price matched and the cost defaulted to 0,
    /// which understates COGS for this row.
    #[serde(rename = "CostImputed")]
    pub cost_imputed: bool,
    #[serde(rename = "COGS")]
    pub cogs: f64,
    #[serde(rename = "GrossProfit")]
    pub gross_profit: f64,
}

// =========================================================================
// Stage 2 and 3 outputs
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AbcCategory {
    A,
    B,
    C,
}

impl fmt::Display for AbcCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AbcCategory::A => "A",
            AbcCategory::B => "B",
            AbcCategory::C => "C",
        };
        f.write_str(label)
    }
}

/// Per-product profit contribution and its ABC tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductProfitSummary {
    #[serde(rename = "Brand")]
    pub brand: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Size")]
    pub size: String,
    #[serde(rename = "TotalGrossProfit")]
    pub total_gross_profit: f64,
    #[serde(rename = "CumulativeProfit")]
    pub cumulative_profit: f64,
    #[serde(rename = "ProfitPercentage")]
    pub profit_percentage: f64,
    #[serde(rename = "CumulativeProfitPercentage")]
    pub cumulative_profit_percentage: f64,
    #[serde(rename = "ABC_Category")]
    pub abc_category: AbcCategory,
}

/// Category-level rollup of the ABC results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    #[serde(rename = "ABC_Category")]
    pub abc_category: AbcCategory,
    #[serde(rename = "Total_Products")]
    pub total_products: usize,
    #[serde(rename = "Total_Profit")]
    pub total_profit: f64,
    #[serde(rename = "Min_Profit")]
    pub min_profit: f64,
    #[serde(rename = "Max_Profit")]
    pub max_profit: f64,
    #[serde(rename = "Profit_Share")]
    pub profit_share: f64,
    #[serde(rename = "Product_Share")]
    pub product_share: f64,
}

/// Per-product EOQ / reorder-point metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EoqRecord {
    #[serde(rename = "Brand")]
    pub brand: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Size")]
    pub size: String,
    #[serde(rename = "Annual_Demand")]
    pub annual_demand: i64,
    #[serde(rename = "Total_Sales_Days")]
    pub total_sales_days: usize,
    #[serde(rename = "Avg_Daily_Demand")]
    pub avg_daily_demand: f64,
    #[serde(rename = "Avg_Unit_Cost")]
    pub avg_unit_cost: f64,
    #[serde(rename = "Holding_Cost_H")]
    pub holding_cost: f64,
    #[serde(rename = "EOQ")]
    pub eoq: u64,
    #[serde(rename = "Avg_LeadTime_Days")]
    pub avg_lead_time_days: Option<f64>,
    #[serde(rename = "Reorder_Point_ROP")]
    pub reorder_point: u64,
    #[serde(rename = "ABC_Category")]
    pub abc_category: Option<AbcCategory>,
}

macro_rules! keyed {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Keyed for $ty {
                fn product_key(&self) -> ProductKey {
                    ProductKey::new(
                        self.brand.clone(),
                        self.description.clone(),
                        self.size.clone(),
                    )
                }
            }
        )*
    };
}

keyed!(
    InventoryMasterRecord,
    PurchaseRecord,
    SalesMasterRecord,
    ProductProfitSummary,
    EoqRecord,
);
