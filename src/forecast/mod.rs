// src/forecast/mod.rs

pub mod implementations;
pub mod series;
pub mod traits;

use crate::forecast::series::{weekly_demand, WeeklyPoint};
use crate::forecast::traits::Forecaster;
use crate::model::product::Keyed;
use crate::model::records::{AbcCategory, ProductProfitSummary, SalesMasterRecord};
use crate::model::validation::round_non_negative;
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    #[serde(rename = "Subject")]
    pub subject: String,
    #[serde(rename = "Method")]
    pub method: String,
    #[serde(rename = "WeekEnding")]
    pub week_ending: NaiveDate,
    #[serde(rename = "Forecasted_SalesQuantity")]
    pub quantity: u64,
}

#[derive(Debug, Clone)]
pub struct DemandForecast {
    /// The product forecast, or "all products" for the company series.
    pub subject: String,
    pub history: Vec<WeeklyPoint>,
    pub points: Vec<ForecastPoint>,
}

/// The highest-profit A-category product, if any.
pub fn top_a_product(abc: &[ProductProfitSummary]) -> Option<&ProductProfitSummary> {
    abc.iter()
        .filter(|p| p.abc_category == AbcCategory::A)
        .fold(None, |best: Option<&ProductProfitSummary>, p| match best {
            Some(b) if b.total_gross_profit >= p.total_gross_profit => Some(b),
            _ => Some(p),
        })
}

/// Forecasts weekly demand of the top A product, or of the whole company
/// when there is none.
pub fn forecast_demand(
    sales: &[SalesMasterRecord],
    abc: &[ProductProfitSummary],
    forecaster: &mut dyn Forecaster,
    horizon_weeks: usize,
) -> DemandForecast {
    let (subject, history) = match top_a_product(abc) {
        Some(top) => {
            let key = top.product_key();
            info!(product = %key, profit = top.total_gross_profit, "forecasting top A-category product");
            let history = weekly_demand(sales.iter().filter(|s| s.product_key() == key));
            (key.to_string(), history)
        }
        None => {
            warn!("no A-category product; forecasting company-wide demand");
            ("all products".to_string(), weekly_demand(sales))
        }
    };

    let values: Vec<f64> = history.iter().map(|p| p.quantity).collect();
    let forecasts = forecaster.forecast(&values, horizon_weeks);
    let last_week = history.last().map(|p| p.week_ending);

    let points = forecasts
        .into_iter()
        .enumerate()
        .filter_map(|(i, value)| {
            let week_ending = last_week? + Duration::days(7 * (i as i64 + 1));
            Some(ForecastPoint {
                subject: subject.clone(),
                method: forecaster.name().to_string(),
                week_ending,
                quantity: round_non_negative(value).value_or(0),
            })
        })
        .collect();

    DemandForecast {
        subject,
        history,
        points,
    }
}
