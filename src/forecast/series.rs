// src/forecast/series.rs

use crate::model::records::SalesMasterRecord;
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Total quantity sold in the week ending on `week_ending` (a Sunday).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyPoint {
    #[serde(rename = "WeekEnding")]
    pub week_ending: NaiveDate,
    #[serde(rename = "SalesQuantity")]
    pub quantity: f64,
}

/// The Sunday closing the week that contains `date`.
pub fn week_ending(date: NaiveDate) -> NaiveDate {
    let days_to_sunday = 6 - date.weekday().num_days_from_monday();
    date + Duration::days(i64::from(days_to_sunday))
}

/// Weekly totals from the first to the last week with a dated sale; weeks
/// without sales are present with 0. Undated sales are ignored.
pub fn weekly_demand<'a, I>(sales: I) -> Vec<WeeklyPoint>
where
    I: IntoIterator<Item = &'a SalesMasterRecord>,
{
    let mut weeks: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for sale in sales {
        if let Some(date) = sale.sales_date {
            *weeks.entry(week_ending(date)).or_insert(0.0) += sale.sales_quantity as f64;
        }
    }

    let (Some(first), Some(last)) = (
        weeks.keys().next().copied(),
        weeks.keys().next_back().copied(),
    ) else {
        return Vec::new();
    };

    let mut series = Vec::new();
    let mut week = first;
    while week <= last {
        series.push(WeeklyPoint {
            week_ending: week,
            quantity: weeks.get(&week).copied().unwrap_or(0.0),
        });
        week += Duration::days(7);
    }
    series
}
