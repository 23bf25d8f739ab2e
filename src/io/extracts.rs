// src/io/extracts.rs

//! Loading of the six raw extracts. All six must be present before any of
//! them is parsed; the price and invoice extracts are only row-counted.

use crate::error::PipelineResult;
use crate::io::tables::{count_rows, read_table, require};
use crate::model::records::{InventoryRow, PurchaseRow, SaleRow};
use crate::pipeline::config::PipelineConfig;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct RawExtracts {
    pub beginning_inventory: Vec<InventoryRow>,
    pub ending_inventory: Vec<InventoryRow>,
    pub purchases: Vec<PurchaseRow>,
    pub sales: Vec<SaleRow>,
    pub purchase_price_rows: usize,
    pub invoice_rows: usize,
}

/// (artifact name, path) for every extract, in load order.
pub fn extract_paths(config: &PipelineConfig) -> Vec<(&'static str, PathBuf)> {
    let dir = &config.input_dir;
    let files = &config.extracts;
    vec![
        ("beginning inventory", dir.join(&files.beginning_inventory)),
        ("ending inventory", dir.join(&files.ending_inventory)),
        ("purchases", dir.join(&files.purchases)),
        ("sales", dir.join(&files.sales)),
        ("purchase prices", dir.join(&files.purchase_prices)),
        ("invoice purchases", dir.join(&files.invoice_purchases)),
    ]
}

pub fn load_extracts(config: &PipelineConfig) -> PipelineResult<RawExtracts> {
    let paths = extract_paths(config);
    for (artifact, path) in &paths {
        require(path, artifact)?;
    }

    let extracts = RawExtracts {
        beginning_inventory: read_table(&paths[0].1, paths[0].0)?,
        ending_inventory: read_table(&paths[1].1, paths[1].0)?,
        purchases: read_table(&paths[2].1, paths[2].0)?,
        sales: read_table(&paths[3].1, paths[3].0)?,
        purchase_price_rows: count_rows(&paths[4].1, paths[4].0)?,
        invoice_rows: count_rows(&paths[5].1, paths[5].0)?,
    };

    info!(
        beginning = extracts.beginning_inventory.len(),
        ending = extracts.ending_inventory.len(),
        purchases = extracts.purchases.len(),
        sales = extracts.sales.len(),
        purchase_prices = extracts.purchase_price_rows,
        invoices = extracts.invoice_rows,
        "loaded raw extracts"
    );
    Ok(extracts)
}
