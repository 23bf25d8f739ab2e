// src/pipeline/config.rs

use crate::error::{PipelineError, PipelineResult};
use crate::model::backfill::TieBreak;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const CONFIG_PATH_ENV: &str = "INVENTORY_ANALYTICS_CONFIG";
pub const INPUT_DIR_ENV: &str = "INVENTORY_ANALYTICS_INPUT_DIR";
pub const OUTPUT_DIR_ENV: &str = "INVENTORY_ANALYTICS_OUTPUT_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Where the six raw extracts live.
    pub input_dir: PathBuf,
    /// Where every stage reads and writes its derived tables.
    pub output_dir: PathBuf,
    pub extracts: ExtractFiles,
    pub abc: AbcThresholds,
    pub optimization: OptimizationConfig,
    pub backfill_tie_break: TieBreak,
    pub negative_lead_time: LeadTimePolicy,
    pub forecast: ForecastConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
            extracts: ExtractFiles::default(),
            abc: AbcThresholds::default(),
            optimization: OptimizationConfig::default(),
            backfill_tie_break: TieBreak::default(),
            negative_lead_time: LeadTimePolicy::default(),
            forecast: ForecastConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Defaults, then the TOML file named by `path` (or by the
    /// `INVENTORY_ANALYTICS_CONFIG` variable), then directory overrides from
    /// the environment.
    pub fn load(path: Option<&Path>) -> PipelineResult<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        if let Some(dir) = std::env::var_os(INPUT_DIR_ENV) {
            config.input_dir = PathBuf::from(dir);
        }
        if let Some(dir) = std::env::var_os(OUTPUT_DIR_ENV) {
            config.output_dir = PathBuf::from(dir);
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> PipelineResult<Self> {
        if !path.exists() {
            return Err(PipelineError::MissingInput {
                artifact: "configuration file".to_string(),
                path: path.to_path_buf(),
            });
        }
        let text = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        let config = Self::from_toml(&text)?;
        info!(path = %path.display(), "loaded configuration file");
        Ok(config)
    }

    pub fn from_toml(text: &str) -> PipelineResult<Self> {
        toml::from_str(text).map_err(|e| PipelineError::Config(e.to_string()))
    }

    pub fn validate(&self) -> PipelineResult<()> {
        self.abc.validate()?;
        self.optimization.validate()?;
        self.forecast.validate()
    }
}

/// File names of the raw extracts inside `input_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractFiles {
    pub beginning_inventory: String,
    pub ending_inventory: String,
    pub purchases: String,
    pub sales: String,
    pub purchase_prices: String,
    pub invoice_purchases: String,
}

impl Default for ExtractFiles {
    fn default() -> Self {
        Self {
            beginning_inventory: "BegInvFINAL12312016.csv".to_string(),
            ending_inventory: "EndInvFINAL12312016.csv".to_string(),
            purchases: "PurchasesFINAL12312016.csv".to_string(),
            sales: "SalesFINAL12312016.csv".to_string(),
            purchase_prices: "2017PurchasePricesDec.csv".to_string(),
            invoice_purchases: "InvoicePurchases12312016.csv".to_string(),
        }
    }
}

/// Cumulative-profit-share cut-offs for the ABC tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbcThresholds {
    pub a_threshold: f64,
    pub b_threshold: f64,
}

impl Default for AbcThresholds {
    fn default() -> Self {
        Self {
            a_threshold: 0.80,
            b_threshold: 0.95,
        }
    }
}

impl AbcThresholds {
    pub fn validate(&self) -> PipelineResult<()> {
        let in_range = |t: f64| t > 0.0 && t <= 1.0;
        if !in_range(self.a_threshold) || !in_range(self.b_threshold) {
            return Err(PipelineError::Config(format!(
                "ABC thresholds must lie in (0, 1], got a={} b={}",
                self.a_threshold, self.b_threshold
            )));
        }
        if self.a_threshold > self.b_threshold {
            return Err(PipelineError::Config(format!(
                "a_threshold ({}) must not exceed b_threshold ({})",
                self.a_threshold, self.b_threshold
            )));
        }
        Ok(())
    }
}

/// Cost parameters of the EOQ / reorder-point model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationConfig {
    /// Fixed cost per order (S).
    pub ordering_cost: f64,
    /// Annual holding cost as a share of unit cost.
    pub holding_cost_rate: f64,
    /// Length of the observed period; demand is divided by it.
    pub days_per_year: f64,
    /// Added to the holding cost so a zero unit cost cannot divide by zero.
    pub epsilon: f64,
    /// Units added on top of lead-time demand.
    pub safety_stock: f64,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            ordering_cost: 50.0,
            holding_cost_rate: 0.20,
            days_per_year: 365.0,
            epsilon: 1e-6,
            safety_stock: 0.0,
        }
    }
}

impl OptimizationConfig {
    pub fn validate(&self) -> PipelineResult<()> {
        if !(self.days_per_year > 0.0) {
            return Err(PipelineError::Config(format!(
                "days_per_year must be positive, got {}",
                self.days_per_year
            )));
        }
        if !(self.epsilon > 0.0) {
            return Err(PipelineError::Config(format!(
                "epsilon must be positive, got {}",
                self.epsilon
            )));
        }
        for (name, value) in [
            ("ordering_cost", self.ordering_cost),
            ("holding_cost_rate", self.holding_cost_rate),
            ("safety_stock", self.safety_stock),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PipelineError::Config(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// What to do with a purchase received before it was ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LeadTimePolicy {
    /// Keep the negative value; it still enters the means.
    #[default]
    PassThrough,
    /// Replace it with 0 days.
    Clamp,
    /// Treat it as unknown.
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMethod {
    Naive,
    MovingAverage,
    #[default]
    ExponentialSmoothing,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub method: ForecastMethod,
    pub horizon_weeks: usize,
    /// Smoothing factor for exponential smoothing.
    pub alpha: f64,
    /// Window length for the moving average.
    pub window: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            method: ForecastMethod::default(),
            horizon_weeks: 4,
            alpha: 0.3,
            window: 4,
        }
    }
}

impl ForecastConfig {
    pub fn validate(&self) -> PipelineResult<()> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(PipelineError::Config(format!(
                "forecast alpha must lie in (0, 1], got {}",
                self.alpha
            )));
        }
        if self.window == 0 {
            return Err(PipelineError::Config(
                "forecast window must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
