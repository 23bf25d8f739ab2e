// src/io/synthetic.rs

//! Seeded generator for a small, internally consistent set of the six raw
//! extracts, so every stage can run without the production files.

use crate::error::{PipelineError, PipelineResult};
use crate::io::tables::write_table;
use crate::model::records::{InventoryRow, PurchaseRow, SaleRow};
use crate::pipeline::config::ExtractFiles;
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::Serialize;
use std::path::Path;
use tracing::info;

const CITIES: [&str; 6] = [
    "HARDERSFIELD",
    "ASHBORNE",
    "MOUNTMEND",
    "EANVERNESS",
    "GARIGILL",
    "LARNWICK",
];
const SIZES: [&str; 4] = ["750mL", "1.75L", "375mL", "50mL"];
const VENDORS: [(&str, &str); 4] = [
    ("105", "ALTAMAR BRANDS LLC"),
    ("4466", "AMERICAN VINTAGE BEVERAGE"),
    ("3960", "DIAGEO NORTH AMERICA INC"),
    ("12546", "JIM BEAM BRANDS COMPANY"),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticConfig {
    pub products: usize,
    pub stores: usize,
    pub seed: u64,
    /// Sales days drawn per store and product.
    pub sales_days: usize,
    /// Every n-th purchase line loses its Size.
    pub missing_size_every: usize,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            products: 40,
            stores: 5,
            seed: 42,
            sales_days: 12,
            missing_size_every: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyntheticSummary {
    pub inventory_rows: usize,
    pub purchase_rows: usize,
    pub sale_rows: usize,
}

#[derive(Debug, Clone)]
struct Product {
    brand: String,
    description: String,
    size: String,
    retail_price: f64,
    vendor: (&'static str, &'static str),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PurchasePriceRow {
    brand: String,
    description: String,
    price: f64,
    size: String,
    purchase_price: f64,
    vendor_number: String,
    vendor_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
struct InvoiceRow {
    vendor_number: String,
    vendor_name: String,
    invoice_date: String,
    #[serde(rename = "PONumber")]
    po_number: String,
    #[serde(rename = "PODate")]
    po_date: String,
    pay_date: String,
    quantity: i64,
    dollars: f64,
}

fn normal(mean: f64, std_dev: f64) -> PipelineResult<Normal<f64>> {
    Normal::new(mean, std_dev).map_err(|e| PipelineError::Config(e.to_string()))
}

/// Draws from `dist`, rounded and clamped at `min`.
fn draw(dist: &Normal<f64>, rng: &mut StdRng, min: i64) -> i64 {
    (dist.sample(rng).round() as i64).max(min)
}

fn day(start: NaiveDate, offset: i64) -> String {
    (start + Duration::days(offset)).format("%Y-%m-%d").to_string()
}

fn build_products(config: &SyntheticConfig, rng: &mut StdRng) -> Vec<Product> {
    (0..config.products)
        .map(|i| {
            let brand = (1000 + i * 7).to_string();
            Product {
                description: format!("Reserve Blend No {}", i + 1),
                size: SIZES[rng.gen_range(0..SIZES.len())].to_string(),
                retail_price: (rng.gen_range(6.0..60.0_f64) * 100.0).round() / 100.0,
                vendor: VENDORS[i % VENDORS.len()],
                brand,
            }
        })
        .collect()
}

/// Writes the six extracts named by `files` into `dir`.
pub fn generate_extracts(
    config: &SyntheticConfig,
    dir: &Path,
    files: &ExtractFiles,
) -> PipelineResult<SyntheticSummary> {
    if config.products == 0 || config.stores == 0 {
        return Err(PipelineError::Config(
            "synthetic data needs at least one product and one store".to_string(),
        ));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let products = build_products(config, &mut rng);
    let year_start = NaiveDate::from_ymd_opt(2016, 1, 1)
        .ok_or_else(|| PipelineError::Config("invalid calendar start".to_string()))?;

    let on_hand = normal(20.0, 8.0)?;
    let lead_time = normal(7.5, 2.0)?;
    let sale_quantity = normal(3.0, 2.0)?;
    let order_quantity = normal(48.0, 12.0)?;

    // Inventory snapshots: one row per store and product.
    let mut beginning = Vec::new();
    let mut ending = Vec::new();
    for store in 1..=config.stores {
        let city = CITIES[(store - 1) % CITIES.len()];
        for product in &products {
            let inventory_id = format!("{}_{}_{}", store, city, product.brand);
            let row = |count: i64, price: f64| InventoryRow {
                inventory_id: inventory_id.clone(),
                store: store.to_string(),
                city: Some(city.to_string()),
                brand: product.brand.clone(),
                description: product.description.clone(),
                size: Some(product.size.clone()),
                on_hand: Some(count),
                price: Some(price),
            };
            beginning.push(row(draw(&on_hand, &mut rng, 0), product.retail_price));
            let mut closing = row(draw(&on_hand, &mut rng, 0), product.retail_price + 1.0);
            // Ending snapshots in the source routinely lack City.
            if rng.gen_bool(0.2) {
                closing.city = None;
            }
            ending.push(closing);
        }
    }

    // Purchases: a few purchase orders per product.
    let mut purchases = Vec::new();
    let mut invoices = Vec::new();
    let mut po_number = 8000;
    for product in &products {
        for _ in 0..rng.gen_range(1..=4) {
            po_number += 1;
            let ordered = rng.gen_range(0..330);
            let received = ordered + draw(&lead_time, &mut rng, 1);
            let invoiced = received + rng.gen_range(0..5);
            let paid = invoiced + rng.gen_range(20..45);
            let quantity = draw(&order_quantity, &mut rng, 1);
            let unit_cost = (product.retail_price * 0.7 * 100.0).round() / 100.0;
            let dollars = quantity as f64 * unit_cost;

            let size = if config.missing_size_every > 0
                && purchases.len() % config.missing_size_every == config.missing_size_every - 1
            {
                None
            } else {
                Some(product.size.clone())
            };
            purchases.push(PurchaseRow {
                brand: product.brand.clone(),
                description: product.description.clone(),
                size,
                vendor_number: Some(product.vendor.0.to_string()),
                vendor_name: Some(product.vendor.1.to_string()),
                po_number: Some(po_number.to_string()),
                po_date: Some(day(year_start, ordered)),
                receiving_date: Some(day(year_start, received)),
                invoice_date: Some(day(year_start, invoiced)),
                pay_date: Some(day(year_start, paid)),
                purchase_price: Some(unit_cost),
                quantity: Some(quantity),
                dollars: Some(dollars),
            });
            invoices.push(InvoiceRow {
                vendor_number: product.vendor.0.to_string(),
                vendor_name: product.vendor.1.to_string(),
                invoice_date: day(year_start, invoiced),
                po_number: po_number.to_string(),
                po_date: day(year_start, ordered),
                pay_date: day(year_start, paid),
                quantity,
                dollars,
            });
        }
    }

    // Sales: a handful of January and February days per store and product.
    let mut sales = Vec::new();
    for row in &beginning {
        let Some(product) = products.iter().find(|p| p.brand == row.brand) else {
            continue;
        };
        for _ in 0..config.sales_days {
            let quantity = draw(&sale_quantity, &mut rng, 1);
            sales.push(SaleRow {
                inventory_id: row.inventory_id.clone(),
                store: row.store.clone(),
                brand: product.brand.clone(),
                description: product.description.clone(),
                size: Some(product.size.clone()),
                sales_quantity: Some(quantity),
                sales_dollars: Some(quantity as f64 * product.retail_price),
                sales_date: Some(day(year_start, rng.gen_range(0..59))),
                vendor_no: Some(product.vendor.0.to_string()),
                vendor_name: Some(product.vendor.1.to_string()),
            });
        }
    }

    let price_list: Vec<PurchasePriceRow> = products
        .iter()
        .map(|p| PurchasePriceRow {
            brand: p.brand.clone(),
            description: p.description.clone(),
            price: p.retail_price,
            size: p.size.clone(),
            purchase_price: (p.retail_price * 0.7 * 100.0).round() / 100.0,
            vendor_number: p.vendor.0.to_string(),
            vendor_name: p.vendor.1.to_string(),
        })
        .collect();

    write_table(&dir.join(&files.beginning_inventory), &beginning)?;
    write_table(&dir.join(&files.ending_inventory), &ending)?;
    write_table(&dir.join(&files.purchases), &purchases)?;
    write_table(&dir.join(&files.sales), &sales)?;
    write_table(&dir.join(&files.purchase_prices), &price_list)?;
    write_table(&dir.join(&files.invoice_purchases), &invoices)?;

    let summary = SyntheticSummary {
        inventory_rows: beginning.len(),
        purchase_rows: purchases.len(),
        sale_rows: sales.len(),
    };
    info!(
        seed = config.seed,
        products = config.products,
        stores = config.stores,
        purchases = summary.purchase_rows,
        sales = summary.sale_rows,
        dir = %dir.display(),
        "generated synthetic extracts"
    );
    Ok(summary)
}
