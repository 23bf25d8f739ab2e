// src/pipeline/reconcile.rs

//! Reconciliation of the raw extracts into the inventory master, the
//! cleaned purchase lines and the sales-master fact table.

use crate::io::extracts::RawExtracts;
use crate::model::backfill::{BackfillMap, TieBreak};
use crate::model::product::{Keyed, ProductKey};
use crate::model::records::{
    InventoryMasterRecord, InventoryRow, PurchaseRecord, PurchaseRow, SaleRow, SalesMasterRecord,
};
use crate::model::validation::{
    coerce_amount, coerce_quantity, mean, parse_date, partition_rows, Dropped, Partitioned,
};
use crate::pipeline::config::{LeadTimePolicy, PipelineConfig};
use crate::pipeline::diagnostics::{IssueKind, StageDiagnostics};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Everything stage 1 hands downstream.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub inventory_master: Vec<InventoryMasterRecord>,
    pub purchases: Partitioned<PurchaseRecord, PurchaseRow>,
    pub sales_master: Vec<SalesMasterRecord>,
    pub diagnostics: StageDiagnostics,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler {
    tie_break: TieBreak,
    lead_time_policy: LeadTimePolicy,
}

impl Reconciler {
    pub fn new(tie_break: TieBreak, lead_time_policy: LeadTimePolicy) -> Self {
        Self {
            tie_break,
            lead_time_policy,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.backfill_tie_break, config.negative_lead_time)
    }

    pub fn reconcile(&self, extracts: &RawExtracts) -> Reconciliation {
        let mut diag = StageDiagnostics::new("prepare");

        let city_map = store_city_map(&extracts.beginning_inventory, self.tie_break);
        if city_map.is_empty() {
            debug!("beginning inventory carries no Store -> City pairs");
        }
        diag.record_n(
            IssueKind::AmbiguousBackfill,
            "Store maps to several cities",
            city_map.ambiguous_keys(),
        );
        let ending = backfill_city(&extracts.ending_inventory, &city_map, &mut diag);
        let inventory_master =
            merge_inventory(&extracts.beginning_inventory, &ending, &mut diag);

        let size_map = brand_size_map(&extracts.sales, self.tie_break);
        debug!(brands = size_map.len(), tie_break = ?self.tie_break, "built Brand -> Size map");
        diag.record_n(
            IssueKind::AmbiguousBackfill,
            "Brand maps to several sizes",
            size_map.ambiguous_keys(),
        );
        let purchases = clean_purchases(
            &extracts.purchases,
            &size_map,
            self.lead_time_policy,
            &mut diag,
        );

        let avg_purchase_price = mean_purchase_price_by_key(&purchases.kept);
        let sales_master = build_sales_master(
            &extracts.sales,
            &inventory_master,
            &avg_purchase_price,
            &mut diag,
        );

        info!(
            inventory_master = inventory_master.len(),
            purchases_kept = purchases.kept.len(),
            purchases_dropped = purchases.dropped.len(),
            sales_master = sales_master.len(),
            "reconciliation complete"
        );

        Reconciliation {
            inventory_master,
            purchases,
            sales_master,
            diagnostics: diag,
        }
    }
}

// =========================================================================
// Backfill maps
// =========================================================================

/// Store -> City from the beginning snapshot.
pub fn store_city_map(rows: &[InventoryRow], tie_break: TieBreak) -> BackfillMap<String, String> {
    BackfillMap::build(
        rows.iter().map(|r| (r.store.clone(), r.city.clone())),
        tie_break,
    )
}

/// Brand -> Size from the sales extract.
pub fn brand_size_map(rows: &[SaleRow], tie_break: TieBreak) -> BackfillMap<String, String> {
    BackfillMap::build(
        rows.iter().map(|r| (r.brand.clone(), r.size.clone())),
        tie_break,
    )
}

/// Fills a null City on ending-snapshot rows; unknown stores stay null.
pub fn backfill_city(
    rows: &[InventoryRow],
    city_map: &BackfillMap<String, String>,
    diag: &mut StageDiagnostics,
) -> Vec<InventoryRow> {
    rows.iter()
        .map(|row| {
            let mut row = row.clone();
            if row.city.is_none() {
                row.city = city_map.fill(&row.store, None);
                if row.city.is_none() {
                    diag.record(IssueKind::JoinMismatch, "ending inventory store without city");
                }
            }
            row
        })
        .collect()
}

// =========================================================================
// Inventory merge
// =========================================================================

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct InventoryKey {
    inventory_id: String,
    store: String,
    city: Option<String>,
    brand: String,
    description: String,
    size: String,
}

#[derive(Debug, Clone, Copy, Default)]
struct SnapshotSide {
    on_hand: i64,
    price_sum: f64,
    price_rows: usize,
}

impl SnapshotSide {
    fn price(&self) -> f64 {
        if self.price_rows == 0 {
            0.0
        } else {
            self.price_sum / self.price_rows as f64
        }
    }
}

fn accumulate_snapshot(
    rows: &[InventoryRow],
    side: &'static str,
    diag: &mut StageDiagnostics,
) -> BTreeMap<InventoryKey, SnapshotSide> {
    let mut sides: BTreeMap<InventoryKey, SnapshotSide> = BTreeMap::new();
    for row in rows {
        let Some(size) = row.size.clone() else {
            diag.record(IssueKind::UnresolvableKey, format!("{} inventory row without Size", side));
            continue;
        };
        let key = InventoryKey {
            inventory_id: row.inventory_id.clone(),
            store: row.store.clone(),
            city: row.city.clone(),
            brand: row.brand.clone(),
            description: row.description.clone(),
            size,
        };

        let on_hand = coerce_quantity(row.on_hand);
        diag.note(IssueKind::CoercedField, "onHand", &on_hand);
        let price = coerce_amount(row.price);
        diag.note(IssueKind::CoercedField, "Price", &price);

        let entry = sides.entry(key).or_default();
        entry.on_hand += on_hand.value_or(0);
        entry.price_sum += price.value_or(0.0);
        entry.price_rows += 1;
    }
    sides
}

/// Outer join of the two snapshots on the full inventory key. A side that
/// is absent contributes zeros; Avg_Price is taken after that zero-fill.
pub fn merge_inventory(
    beginning: &[InventoryRow],
    ending: &[InventoryRow],
    diag: &mut StageDiagnostics,
) -> Vec<InventoryMasterRecord> {
    let beg = accumulate_snapshot(beginning, "beginning", diag);
    let end = accumulate_snapshot(ending, "ending", diag);

    let mut keys: Vec<&InventoryKey> = beg.keys().chain(end.keys()).collect();
    keys.sort();
    keys.dedup();

    keys.into_iter()
        .map(|key| {
            let b = beg.get(key).copied().unwrap_or_default();
            let e = end.get(key).copied().unwrap_or_default();
            let (beg_price, end_price) = (b.price(), e.price());
            InventoryMasterRecord {
                inventory_id: key.inventory_id.clone(),
                store: key.store.clone(),
                city: key.city.clone(),
                brand: key.brand.clone(),
                description: key.description.clone(),
                size: key.size.clone(),
                beg_on_hand: b.on_hand,
                beg_price,
                end_on_hand: e.on_hand,
                end_price,
                avg_price: (beg_price + end_price) / 2.0,
            }
        })
        .collect()
}

// =========================================================================
// Purchases
// =========================================================================

fn parse_field(raw: &Option<String>, field: &str, diag: &mut StageDiagnostics) -> Option<NaiveDate> {
    let parsed = parse_date(raw.as_deref());
    // A missing date is not a coercion; only count text that failed to parse.
    if raw.as_deref().map_or(false, |t| !t.trim().is_empty()) {
        diag.note(IssueKind::CoercedField, field, &parsed);
    }
    parsed.value()
}

/// ReceivingDate - PODate in whole days, with the negative-value policy.
pub fn lead_time_days(
    po_date: Option<NaiveDate>,
    receiving_date: Option<NaiveDate>,
    policy: LeadTimePolicy,
    diag: &mut StageDiagnostics,
) -> Option<i64> {
    let days = (receiving_date? - po_date?).num_days();
    if days >= 0 {
        return Some(days);
    }
    diag.record(IssueKind::NegativeLeadTime, "ReceivingDate before PODate");
    match policy {
        LeadTimePolicy::PassThrough => Some(days),
        LeadTimePolicy::Clamp => Some(0),
        LeadTimePolicy::Null => None,
    }
}

/// Resolves Size through the Brand map and derives the lead time. Rows
/// whose Size stays unknown are dropped with a reason.
pub fn clean_purchases(
    rows: &[PurchaseRow],
    size_map: &BackfillMap<String, String>,
    policy: LeadTimePolicy,
    diag: &mut StageDiagnostics,
) -> Partitioned<PurchaseRecord, PurchaseRow> {
    let parts = partition_rows(rows.iter().cloned(), |row| {
        let Some(size) = size_map.fill(&row.brand, row.size.clone()) else {
            return Err(Dropped {
                row,
                reason: "Size missing and Brand has no size in sales".to_string(),
            });
        };

        let po_date = parse_field(&row.po_date, "PODate", diag);
        let receiving_date = parse_field(&row.receiving_date, "ReceivingDate", diag);
        let invoice_date = parse_field(&row.invoice_date, "InvoiceDate", diag);
        let pay_date = parse_field(&row.pay_date, "PayDate", diag);

        let quantity = coerce_quantity(row.quantity);
        diag.note(IssueKind::CoercedField, "Quantity", &quantity);
        let dollars = coerce_amount(row.dollars);
        diag.note(IssueKind::CoercedField, "Dollars", &dollars);
        let purchase_price = row.purchase_price.filter(|p| p.is_finite());
        if purchase_price.is_none() {
            diag.record(IssueKind::CoercedField, "PurchasePrice: missing or non-numeric");
        }

        Ok(PurchaseRecord {
            brand: row.brand,
            description: row.description,
            size,
            vendor_number: row.vendor_number,
            vendor_name: row.vendor_name,
            po_number: row.po_number,
            po_date,
            receiving_date,
            invoice_date,
            pay_date,
            purchase_price,
            quantity: quantity.value_or(0),
            dollars: dollars.value_or(0.0),
            lead_time_days: lead_time_days(po_date, receiving_date, policy, diag),
        })
    });

    diag.record_n(
        IssueKind::UnresolvableKey,
        "purchase dropped: Size unresolvable",
        parts.dropped.len(),
    );
    debug!(kept = parts.kept.len(), dropped = parts.dropped.len(), "purchases partitioned");
    parts
}

/// Mean PurchasePrice per product over lines that carry a price.
pub fn mean_purchase_price_by_key(purchases: &[PurchaseRecord]) -> BTreeMap<ProductKey, f64> {
    let mut prices: BTreeMap<ProductKey, Vec<f64>> = BTreeMap::new();
    for purchase in purchases {
        if let Some(price) = purchase.purchase_price {
            prices.entry(purchase.product_key()).or_default().push(price);
        }
    }
    prices
        .into_iter()
        .filter_map(|(key, values)| mean(values).map(|m| (key, m)))
        .collect()
}

// =========================================================================
// Sales master
// =========================================================================

/// One output row per sale with a Size: inventory context joined by
/// InventoryId, cost joined by ProductKey (0 and flagged when unmatched).
pub fn build_sales_master(
    sales: &[SaleRow],
    inventory_master: &[InventoryMasterRecord],
    avg_purchase_price: &BTreeMap<ProductKey, f64>,
    diag: &mut StageDiagnostics,
) -> Vec<SalesMasterRecord> {
    let mut by_inventory_id: BTreeMap<&str, &InventoryMasterRecord> = BTreeMap::new();
    for record in inventory_master {
        by_inventory_id
            .entry(record.inventory_id.as_str())
            .or_insert(record);
    }

    let parts = partition_rows(sales.iter(), |sale| match &sale.size {
        Some(size) => Ok((sale, size.clone())),
        None => Err(Dropped {
            row: sale,
            reason: "sale without Size".to_string(),
        }),
    });
    diag.record_n(IssueKind::UnresolvableKey, "sale dropped: Size missing", parts.dropped.len());

    parts
        .kept
        .into_iter()
        .map(|(sale, size)| {
            let quantity = coerce_quantity(sale.sales_quantity);
            diag.note(IssueKind::CoercedField, "SalesQuantity", &quantity);
            let dollars = coerce_amount(sale.sales_dollars);
            diag.note(IssueKind::CoercedField, "SalesDollars", &dollars);
            let sales_date = parse_field(&sale.sales_date, "SalesDate", diag);

            let inventory = by_inventory_id.get(sale.inventory_id.as_str());
            if inventory.is_none() {
                diag.record(IssueKind::JoinMismatch, "sale without inventory master row");
            }

            let key = ProductKey::new(sale.brand.clone(), sale.description.clone(), size.clone());
            let matched_price = avg_purchase_price.get(&key).copied();
            if matched_price.is_none() {
                diag.record(IssueKind::JoinMismatch, "sale without purchase price; cost set to 0");
            }
            let avg_price = matched_price.unwrap_or(0.0);

            let sales_quantity = quantity.value_or(0);
            let sales_dollars = dollars.value_or(0.0);
            let cogs = sales_quantity as f64 * avg_price;

            SalesMasterRecord {
                brand: sale.brand.clone(),
                description: sale.description.clone(),
                size,
                inventory_id: sale.inventory_id.clone(),
                store: sale.store.clone(),
                sales_date,
                sales_quantity,
                sales_dollars,
                vendor_no: sale.vendor_no.clone(),
                vendor_name: sale.vendor_name.clone(),
                beg_on_hand: inventory.map(|r| r.beg_on_hand),
                end_on_hand: inventory.map(|r| r.end_on_hand),
                avg_price: inventory.map(|r| r.avg_price),
                avg_purchase_price: avg_price,
                cost_imputed: matched_price.is_none(),
                cogs,
                gross_profit: sales_dollars - cogs,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::tables::read_rows;

    const BEG_INV: &str = "\
InventoryId,Store,City,Brand,Description,Size,onHand,Price
1_HARDERSFIELD_58,1,HARDERSFIELD,58,Gekkeikan Black & Gold Sake,750mL,8,12.99
1_HARDERSFIELD_62,1,HARDERSFIELD,62,Herradura Silver Tequila,750mL,6,36.99
2_ASHBORNE_58,2,ASHBORNE,58,Gekkeikan Black & Gold Sake,750mL,4,12.99
";

    const END_INV: &str = "\
InventoryId,Store,City,Brand,Description,Size,onHand,Price
1_HARDERSFIELD_58,1,,58,Gekkeikan Black & Gold Sake,750mL,11,13.99
1_HARDERSFIELD_63,1,,63,Herradura Reposado Tequila,750mL,10,38.99
9_NOWHERE_58,9,,58,Gekkeikan Black & Gold Sake,750mL,2,12.99
";

    const PURCHASES: &str = "\
Brand,Description,Size,VendorNumber,VendorName,PONumber,PODate,ReceivingDate,InvoiceDate,PayDate,PurchasePrice,Quantity,Dollars
58,Gekkeikan Black & Gold Sake,750mL,4466,AMERICAN VINTAGE BEVERAGE,8124,2016-01-01,2016-01-08,2016-01-10,2016-02-01,9.00,12,108.00
58,Gekkeikan Black & Gold Sake,,4466,AMERICAN VINTAGE BEVERAGE,8125,2016-01-05,2016-01-09,2016-01-10,2016-02-01,11.00,12,132.00
62,Herradura Silver Tequila,750mL,3960,DIAGEO NORTH AMERICA INC,8126,2016-01-10,2016-01-03,garbage,2016-02-01,27.00,6,162.00
999,Unknown Spirit,,1,NOBODY,8127,2016-01-01,2016-01-02,2016-01-02,2016-01-03,5.00,1,5.00
";

    const SALES: &str = "\
InventoryId,Store,Brand,Description,Size,SalesQuantity,SalesDollars,SalesDate
1_HARDERSFIELD_58,1,58,Gekkeikan Black & Gold Sake,750mL,2,25.98,2016-01-01
1_HARDERSFIELD_62,1,62,Herradura Silver Tequila,750mL,1,36.99,2016-01-02
7_UNKNOWN_77,7,77,Never Purchased Gin,1L,3,30.00,2016-01-02
1_HARDERSFIELD_58,1,58,Gekkeikan Black & Gold Sake,750mL,n/a,12.99,bad-date
";

    fn extracts() -> RawExtracts {
        RawExtracts {
            beginning_inventory: read_rows(BEG_INV.as_bytes()).unwrap(),
            ending_inventory: read_rows(END_INV.as_bytes()).unwrap(),
            purchases: read_rows(PURCHASES.as_bytes()).unwrap(),
            sales: read_rows(SALES.as_bytes()).unwrap(),
            purchase_price_rows: 0,
            invoice_rows: 0,
        }
    }

    fn find<'a>(rows: &'a [InventoryMasterRecord], id: &str) -> &'a InventoryMasterRecord {
        rows.iter().find(|r| r.inventory_id == id).unwrap()
    }

    #[test]
    fn ending_city_is_backfilled_from_beginning_snapshot() {
        let result = Reconciler::default().reconcile(&extracts());
        let merged = find(&result.inventory_master, "1_HARDERSFIELD_58");
        assert_eq!(merged.city.as_deref(), Some("HARDERSFIELD"));
        let unknown = find(&result.inventory_master, "9_NOWHERE_58");
        assert_eq!(unknown.city, None);
    }

    #[test]
    fn merge_preserves_both_sides_and_zero_fills_the_missing_one() {
        let result = Reconciler::default().reconcile(&extracts());
        let master = &result.inventory_master;
        assert_eq!(master.len(), 5);

        let both = find(master, "1_HARDERSFIELD_58");
        assert_eq!((both.beg_on_hand, both.end_on_hand), (8, 11));
        assert!((both.avg_price - 13.49).abs() < 1e-9);

        let beg_only = find(master, "1_HARDERSFIELD_62");
        assert_eq!((beg_only.beg_on_hand, beg_only.end_on_hand), (6, 0));
        assert_eq!(beg_only.end_price, 0.0);

        let end_only = find(master, "1_HARDERSFIELD_63");
        assert_eq!((end_only.beg_on_hand, end_only.end_on_hand), (0, 10));
        assert!((end_only.avg_price - 38.99 / 2.0).abs() < 1e-9);

        let beg_total: i64 = master.iter().map(|r| r.beg_on_hand).sum();
        let end_total: i64 = master.iter().map(|r| r.end_on_hand).sum();
        assert_eq!((beg_total, end_total), (18, 23));
    }

    #[test]
    fn purchases_backfill_size_and_account_for_drops() {
        let raw = extracts();
        let result = Reconciler::default().reconcile(&raw);
        let purchases = &result.purchases;
        assert_eq!(purchases.kept.len(), 3);
        assert_eq!(purchases.dropped.len(), 1);
        assert_eq!(purchases.total(), raw.purchases.len());
        assert_eq!(purchases.kept[1].size, "750mL");
        assert_eq!(purchases.dropped[0].row.brand, "999");
        assert_eq!(result.diagnostics.count(IssueKind::UnresolvableKey), 1);
    }

    #[test]
    fn lead_time_is_kept_even_when_dates_are_bad_or_negative() {
        let result = Reconciler::default().reconcile(&extracts());
        let kept = &result.purchases.kept;
        assert_eq!(kept[0].lead_time_days, Some(7));
        assert_eq!(kept[1].lead_time_days, Some(4));
        assert_eq!(kept[2].lead_time_days, Some(-7));
        assert_eq!(kept[2].invoice_date, None);
        assert_eq!(result.diagnostics.count(IssueKind::NegativeLeadTime), 1);

        let clamped =
            Reconciler::new(TieBreak::Lexicographic, LeadTimePolicy::Clamp).reconcile(&extracts());
        assert_eq!(clamped.purchases.kept[2].lead_time_days, Some(0));
        let nulled =
            Reconciler::new(TieBreak::Lexicographic, LeadTimePolicy::Null).reconcile(&extracts());
        assert_eq!(nulled.purchases.kept[2].lead_time_days, None);
    }

    #[test]
    fn sales_master_imputes_cost_and_keeps_every_sale() {
        let result = Reconciler::default().reconcile(&extracts());
        let sales = &result.sales_master;
        assert_eq!(sales.len(), 4);

        let sake = &sales[0];
        assert!((sake.avg_purchase_price - 10.0).abs() < 1e-9);
        assert!((sake.cogs - 20.0).abs() < 1e-9);
        assert!((sake.gross_profit - 5.98).abs() < 1e-9);
        assert_eq!(sake.beg_on_hand, Some(8));
        assert!(!sake.cost_imputed);

        let gin = &sales[2];
        assert_eq!(gin.avg_purchase_price, 0.0);
        assert!(gin.cost_imputed);
        assert_eq!(gin.beg_on_hand, None);
        assert_eq!(gin.avg_price, None);

        let malformed = &sales[3];
        assert_eq!(malformed.sales_quantity, 0);
        assert_eq!(malformed.sales_date, None);
        assert!((malformed.gross_profit - 12.99).abs() < 1e-9);

        for row in sales {
            assert!((row.gross_profit + row.cogs - row.sales_dollars).abs() < 1e-9);
        }
    }

    #[test]
    fn reconciliation_is_idempotent() {
        let first = Reconciler::default().reconcile(&extracts());
        let second = Reconciler::default().reconcile(&extracts());
        assert_eq!(first.inventory_master, second.inventory_master);
        assert_eq!(first.sales_master, second.sales_master);
        assert_eq!(first.purchases.kept, second.purchases.kept);
    }

    #[test]
    fn duplicate_snapshot_rows_are_combined_not_multiplied() {
        let beg: Vec<InventoryRow> = read_rows(
            "InventoryId,Store,City,Brand,Description,Size,onHand,Price\n\
             1_A_5,1,A,5,Gin,1L,3,10.0\n\
             1_A_5,1,A,5,Gin,1L,4,12.0\n"
                .as_bytes(),
        )
        .unwrap();
        let mut diag = StageDiagnostics::new("prepare");
        let master = merge_inventory(&beg, &[], &mut diag);
        assert_eq!(master.len(), 1);
        assert_eq!(master[0].beg_on_hand, 7);
        assert!((master[0].beg_price - 11.0).abs() < 1e-9);
    }

    #[test]
    fn inventory_and_sales_without_size_are_dropped_as_unresolvable() {
        let mut raw = extracts();
        raw.beginning_inventory.extend(
            read_rows::<InventoryRow, _>(
                "InventoryId,Store,City,Brand,Description,Size,onHand,Price\n\
                 2_ASHBORNE_70,2,ASHBORNE,70,Unsized Vodka,,9,15.00\n"
                    .as_bytes(),
            )
            .unwrap(),
        );
        raw.sales.extend(
            read_rows::<SaleRow, _>(
                "InventoryId,Store,Brand,Description,Size,SalesQuantity,SalesDollars,SalesDate\n\
                 2_ASHBORNE_70,2,70,Unsized Vodka,,1,15.00,2016-01-03\n"
                    .as_bytes(),
            )
            .unwrap(),
        );
        assert_eq!(raw.beginning_inventory[3].size, None);
        assert_eq!(raw.sales[4].size, None);

        let result = Reconciler::default().reconcile(&raw);
        assert_eq!(result.inventory_master.len(), 5);
        assert!(result.inventory_master.iter().all(|r| r.inventory_id != "2_ASHBORNE_70"));
        assert!(result.sales_master.iter().all(|s| s.brand != "70"));

        // The unsized purchase of brand 999 accounts for the third drop.
        assert_eq!(result.diagnostics.count(IssueKind::UnresolvableKey), 3);

        let ids: Vec<&str> = result.sales_master.iter().map(|s| s.inventory_id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["1_HARDERSFIELD_58", "1_HARDERSFIELD_62", "7_UNKNOWN_77", "1_HARDERSFIELD_58"]
        );
    }
}
