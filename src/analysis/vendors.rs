// src/analysis/vendors.rs

//! Lead-time and payment behaviour of suppliers.

use crate::model::records::PurchaseRecord;
use crate::model::validation::{mean, median, sample_std_dev};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorPerformance {
    #[serde(rename = "VendorNumber")]
    pub vendor_number: Option<String>,
    #[serde(rename = "VendorName")]
    pub vendor_name: Option<String>,
    #[serde(rename = "Avg_LeadTime_Days")]
    pub avg_lead_time_days: Option<f64>,
    /// Distinct purchase orders.
    #[serde(rename = "Total_Purchases")]
    pub total_purchases: usize,
    #[serde(rename = "Total_Purchase_Dollars")]
    pub total_purchase_dollars: f64,
    #[serde(rename = "LeadTime_StdDev")]
    pub lead_time_std_dev: Option<f64>,
    #[serde(rename = "Avg_Payment_Lag_Days")]
    pub avg_payment_lag_days: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LeadTimeOverview {
    pub observations: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std_dev: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct VendorReport {
    pub overview: LeadTimeOverview,
    /// Sorted by purchase dollars, largest first.
    pub vendors: Vec<VendorPerformance>,
}

pub fn lead_time_overview(purchases: &[PurchaseRecord]) -> LeadTimeOverview {
    let days: Vec<f64> = purchases
        .iter()
        .filter_map(|p| p.lead_time_days)
        .map(|d| d as f64)
        .collect();
    LeadTimeOverview {
        observations: days.len(),
        mean: mean(days.iter().copied()),
        median: median(&days),
        std_dev: sample_std_dev(&days),
    }
}

#[derive(Default)]
struct VendorAccumulator {
    lead_times: Vec<f64>,
    payment_lags: Vec<f64>,
    po_numbers: BTreeSet<String>,
    dollars: f64,
}

pub fn analyze_vendors(purchases: &[PurchaseRecord]) -> VendorReport {
    let mut by_vendor: BTreeMap<(Option<String>, Option<String>), VendorAccumulator> =
        BTreeMap::new();

    for purchase in purchases {
        let acc = by_vendor
            .entry((purchase.vendor_number.clone(), purchase.vendor_name.clone()))
            .or_default();
        if let Some(days) = purchase.lead_time_days {
            acc.lead_times.push(days as f64);
        }
        if let Some(lag) = purchase.payment_lag_days() {
            acc.payment_lags.push(lag as f64);
        }
        if let Some(po) = &purchase.po_number {
            acc.po_numbers.insert(po.clone());
        }
        acc.dollars += purchase.dollars;
    }

    let mut vendors: Vec<VendorPerformance> = by_vendor
        .into_iter()
        .map(|((vendor_number, vendor_name), acc)| VendorPerformance {
            vendor_number,
            vendor_name,
            avg_lead_time_days: mean(acc.lead_times.iter().copied()),
            total_purchases: acc.po_numbers.len(),
            total_purchase_dollars: acc.dollars,
            lead_time_std_dev: sample_std_dev(&acc.lead_times),
            avg_payment_lag_days: mean(acc.payment_lags),
        })
        .collect();

    // Stable sort keeps vendor-key order among equal totals.
    vendors.sort_by(|a, b| b.total_purchase_dollars.total_cmp(&a.total_purchase_dollars));

    VendorReport {
        overview: lead_time_overview(purchases),
        vendors,
    }
}

/// Vendors ordered by average payment lag, slowest payer first. Vendors
/// without a measurable lag go last.
pub fn by_payment_lag(vendors: &[VendorPerformance]) -> Vec<&VendorPerformance> {
    let mut ranked: Vec<&VendorPerformance> = vendors.iter().collect();
    ranked.sort_by(|a, b| match (a.avg_payment_lag_days, b.avg_payment_lag_days) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (a, b) => b.is_some().cmp(&a.is_some()),
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn purchase(vendor: &str, po: &str, lead: Option<i64>, dollars: f64) -> PurchaseRecord {
        PurchaseRecord {
            brand: "58".into(),
            description: "Gekkeikan Black & Gold Sake".into(),
            size: "750mL".into(),
            vendor_number: Some(vendor.into()),
            vendor_name: Some(format!("VENDOR {}", vendor)),
            po_number: Some(po.into()),
            po_date: None,
            receiving_date: None,
            invoice_date: NaiveDate::from_ymd_opt(2016, 1, 10),
            pay_date: NaiveDate::from_ymd_opt(2016, 2, 9),
            purchase_price: Some(9.0),
            quantity: 1,
            dollars,
            lead_time_days: lead,
        }
    }

    #[test]
    fn overview_uses_sample_statistics() {
        let purchases = vec![
            purchase("1", "a", Some(5), 1.0),
            purchase("1", "b", Some(7), 1.0),
            purchase("2", "c", Some(12), 1.0),
            purchase("2", "d", None, 1.0),
        ];
        let overview = lead_time_overview(&purchases);
        assert_eq!(overview.observations, 3);
        assert_eq!(overview.mean, Some(8.0));
        assert_eq!(overview.median, Some(7.0));
        let std = overview.std_dev.unwrap();
        assert!((std - 3.605_551_275).abs() < 1e-6);
    }

    #[test]
    fn vendors_are_ranked_by_dollars_with_distinct_po_counts() {
        let purchases = vec![
            purchase("1", "a", Some(5), 100.0),
            purchase("1", "a", Some(7), 50.0),
            purchase("2", "c", Some(12), 400.0),
        ];
        let report = analyze_vendors(&purchases);
        assert_eq!(report.vendors.len(), 2);

        let top = &report.vendors[0];
        assert_eq!(top.vendor_number.as_deref(), Some("2"));
        assert_eq!(top.lead_time_std_dev, None);

        let second = &report.vendors[1];
        assert_eq!(second.total_purchases, 1);
        assert_eq!(second.total_purchase_dollars, 150.0);
        assert_eq!(second.avg_lead_time_days, Some(6.0));
        assert_eq!(second.avg_payment_lag_days, Some(30.0));
    }

    #[test]
    fn payment_lag_view_puts_slowest_payers_first() {
        let mut late = purchase("3", "e", Some(4), 10.0);
        late.pay_date = NaiveDate::from_ymd_opt(2016, 3, 20);
        let mut unpaid = purchase("4", "f", Some(4), 900.0);
        unpaid.pay_date = None;
        let purchases = vec![
            purchase("1", "a", Some(5), 500.0),
            late,
            unpaid,
            purchase("2", "c", Some(12), 400.0),
        ];
        let report = analyze_vendors(&purchases);
        assert_eq!(report.vendors[0].vendor_number.as_deref(), Some("4"));

        let ranked: Vec<Option<&str>> = by_payment_lag(&report.vendors)
            .into_iter()
            .map(|v| v.vendor_number.as_deref())
            .collect();
        // Vendor 1 outspends vendor 2 at the same lag, so the stable sort keeps it ahead.
        assert_eq!(ranked, vec![Some("3"), Some("1"), Some("2"), Some("4")]);
    }
}
