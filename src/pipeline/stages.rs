// src/pipeline/stages.rs

use crate::analysis::insights::build_insights;
use crate::analysis::vendors::analyze_vendors;
use crate::error::PipelineResult;
use crate::forecast::forecast_demand;
use crate::forecast::implementations::build_forecaster;
use crate::io::extracts::load_extracts;
use crate::io::reporting::{self, print_table};
use crate::io::tables::{read_table, require, write_table};
use crate::model::records::{
    InventoryMasterRecord, ProductProfitSummary, PurchaseRecord, SalesMasterRecord,
};
use crate::optimization::engine::InventoryOptimizer;
use crate::pipeline::abc::AbcClassifier;
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::diagnostics::{IssueKind, StageDiagnostics};
use crate::pipeline::reconcile::Reconciler;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

// =========================================================================
// 1. ARTIFACTS
// Every stage hands its tables to the next through these files.
// =========================================================================

pub const SALES_MASTER: &str = "sales_master.csv";
pub const PURCHASES_CLEANED: &str = "purchases_cleaned.csv";
pub const INVENTORY_MASTER: &str = "inventory_master.csv";
pub const ABC_RESULTS: &str = "abc_analysis_results.csv";
pub const ABC_SUMMARY: &str = "abc_summary.csv";
pub const OPTIMIZATION_METRICS: &str = "inventory_optimization_metrics.csv";
pub const VENDOR_PERFORMANCE: &str = "vendor_performance.csv";
pub const CITY_SALES: &str = "city_sales.csv";
pub const PRODUCT_MARGINS: &str = "product_margins.csv";
pub const INVENTORY_TURNOVER: &str = "inventory_turnover.csv";
pub const DEMAND_FORECAST: &str = "demand_forecast.csv";

/// Rows shown in console top-N views.
const TOP_N: usize = 10;
/// Products listed at each end of the margin ranking.
const MARGIN_LEADERS: usize = 5;

// =========================================================================
// 2. STAGE SELECTION
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Prepare,
    Abc,
    Optimize,
    Vendors,
    Insights,
    Forecast,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Prepare,
        Stage::Abc,
        Stage::Optimize,
        Stage::Vendors,
        Stage::Insights,
        Stage::Forecast,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Prepare => "prepare",
            Stage::Abc => "abc",
            Stage::Optimize => "optimize",
            Stage::Vendors => "vendors",
            Stage::Insights => "insights",
            Stage::Forecast => "forecast",
        }
    }

    pub fn number(self) -> usize {
        match self {
            Stage::Prepare => 1,
            Stage::Abc => 2,
            Stage::Optimize => 3,
            Stage::Vendors => 4,
            Stage::Insights => 5,
            Stage::Forecast => 6,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.number(), self.name())
    }
}

/// One stage, or every stage in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageSelection {
    One(Stage),
    All,
}

impl StageSelection {
    pub fn stages(self) -> Vec<Stage> {
        match self {
            StageSelection::One(stage) => vec![stage],
            StageSelection::All => Stage::ALL.to_vec(),
        }
    }
}

impl fmt::Display for StageSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageSelection::One(stage) => write!(f, "{}", stage),
            StageSelection::All => f.write_str("all"),
        }
    }
}

impl FromStr for StageSelection {
    type Err = String;

    /// Accepts a stage name, its number (1-6) or "all".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s == "all" {
            return Ok(StageSelection::All);
        }
        Stage::ALL
            .into_iter()
            .find(|stage| stage.name() == s || stage.number().to_string() == s)
            .map(StageSelection::One)
            .ok_or_else(|| {
                format!(
                    "unknown stage '{}'; expected 1-6, all, or one of prepare, abc, optimize, vendors, insights, forecast",
                    s
                )
            })
    }
}

// =========================================================================
// 3. RUNNER
// =========================================================================

pub struct PipelineRunner {
    config: PipelineConfig,
    /// Print Markdown summaries to stdout after each stage.
    pub print_summaries: bool,
}

impl PipelineRunner {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            print_summaries: true,
        }
    }

    fn output(&self, name: &str) -> PathBuf {
        self.config.output_dir.join(name)
    }

    /// Fails before reading anything unless every artifact exists.
    fn require_upstream(&self, artifacts: &[&str]) -> PipelineResult<()> {
        for name in artifacts {
            require(&self.output(name), name)?;
        }
        Ok(())
    }

    /// Runs the selected stages in order, stopping at the first fatal error.
    pub fn run(&self, selection: StageSelection) -> PipelineResult<Vec<PathBuf>> {
        let mut written = Vec::new();
        for stage in selection.stages() {
            written.extend(self.run_stage(stage)?);
        }
        Ok(written)
    }

    pub fn run_stage(&self, stage: Stage) -> PipelineResult<Vec<PathBuf>> {
        info!(stage = %stage, output_dir = %self.config.output_dir.display(), "starting stage");
        let (mut written, diagnostics) = match stage {
            Stage::Prepare => self.prepare()?,
            Stage::Abc => self.abc()?,
            Stage::Optimize => self.optimize()?,
            Stage::Vendors => self.vendors()?,
            Stage::Insights => self.insights()?,
            Stage::Forecast => self.forecast()?,
        };

        diagnostics.log_summary();
        let diag_path = self.output(&format!("{}_diagnostics.csv", stage.name()));
        write_table(&diag_path, &diagnostics.rows())?;
        written.push(diag_path);

        info!(stage = %stage, files = written.len(), "stage complete");
        Ok(written)
    }

    fn write<T: serde::Serialize>(&self, name: &str, rows: &[T]) -> PipelineResult<PathBuf> {
        let path = self.output(name);
        write_table(&path, rows)?;
        Ok(path)
    }

    // ---------------------------------------------------------------------
    // Stage 1: reconcile the raw extracts
    // ---------------------------------------------------------------------
    fn prepare(&self) -> PipelineResult<(Vec<PathBuf>, StageDiagnostics)> {
        let extracts = load_extracts(&self.config)?;
        let result = Reconciler::from_config(&self.config).reconcile(&extracts);

        let written = vec![
            self.write(SALES_MASTER, &result.sales_master)?,
            self.write(PURCHASES_CLEANED, &result.purchases.kept)?,
            self.write(INVENTORY_MASTER, &result.inventory_master)?,
        ];

        let imputed = result.sales_master.iter().filter(|s| s.cost_imputed).count();
        info!(
            purchases_total = result.purchases.total(),
            purchases_dropped = result.purchases.dropped.len(),
            sales_cost_imputed = imputed,
            unresolvable_keys = result.diagnostics.count(IssueKind::UnresolvableKey),
            "prepared master tables"
        );
        Ok((written, result.diagnostics))
    }

    // ---------------------------------------------------------------------
    // Stage 2: ABC classification
    // ---------------------------------------------------------------------
    fn abc(&self) -> PipelineResult<(Vec<PathBuf>, StageDiagnostics)> {
        self.require_upstream(&[SALES_MASTER])?;
        let sales: Vec<SalesMasterRecord> = read_table(&self.output(SALES_MASTER), SALES_MASTER)?;

        let analysis = AbcClassifier::new(self.config.abc).classify_products(&sales);
        let written = vec![
            self.write(ABC_RESULTS, &analysis.products)?,
            self.write(ABC_SUMMARY, &analysis.summary)?,
        ];

        if self.print_summaries {
            print_table("ABC category summary", reporting::abc_summary_rows(&analysis.summary));
            print_table(
                "Top products by gross profit",
                reporting::top_product_rows(&analysis.products, TOP_N),
            );
        }
        Ok((written, analysis.diagnostics))
    }

    // ---------------------------------------------------------------------
    // Stage 3: EOQ and reorder points
    // ---------------------------------------------------------------------
    fn optimize(&self) -> PipelineResult<(Vec<PathBuf>, StageDiagnostics)> {
        self.require_upstream(&[SALES_MASTER, PURCHASES_CLEANED, INVENTORY_MASTER, ABC_RESULTS])?;
        let sales: Vec<SalesMasterRecord> = read_table(&self.output(SALES_MASTER), SALES_MASTER)?;
        let purchases: Vec<PurchaseRecord> =
            read_table(&self.output(PURCHASES_CLEANED), PURCHASES_CLEANED)?;
        let abc: Vec<ProductProfitSummary> = read_table(&self.output(ABC_RESULTS), ABC_RESULTS)?;

        let optimizer = InventoryOptimizer::new(self.config.optimization);
        let cost = optimizer.config();
        info!(
            ordering_cost = cost.ordering_cost,
            holding_cost_rate = cost.holding_cost_rate,
            days_per_year = cost.days_per_year,
            safety_stock = cost.safety_stock,
            "optimizer parameters"
        );
        let outcome = optimizer.optimize(&sales, &purchases, &abc);
        match outcome.global_lead_time {
            Some(days) => info!(
                global_lead_time_days = days,
                products = outcome.records.len(),
                "products without lead-time history use the global mean"
            ),
            None => warn!(
                products = outcome.records.len(),
                "no purchase lead times observed; no global lead-time fallback"
            ),
        }
        let written = vec![self.write(OPTIMIZATION_METRICS, &outcome.records)?];

        if self.print_summaries {
            print_table(
                "Largest economic order quantities",
                reporting::eoq_rows(&outcome.records, TOP_N),
            );
        }
        Ok((written, outcome.diagnostics))
    }

    // ---------------------------------------------------------------------
    // Stage 4: vendor lead time and payment performance
    // ---------------------------------------------------------------------
    fn vendors(&self) -> PipelineResult<(Vec<PathBuf>, StageDiagnostics)> {
        self.require_upstream(&[PURCHASES_CLEANED])?;
        let purchases: Vec<PurchaseRecord> =
            read_table(&self.output(PURCHASES_CLEANED), PURCHASES_CLEANED)?;

        let report = analyze_vendors(&purchases);
        let written = vec![self.write(VENDOR_PERFORMANCE, &report.vendors)?];

        let mut diag = StageDiagnostics::new("vendors");
        diag.record_n(
            IssueKind::JoinMismatch,
            "purchase line without lead time",
            purchases.len().saturating_sub(report.overview.observations),
        );

        if self.print_summaries {
            print_table("Lead time (days)", reporting::lead_time_rows(&report.overview));
            print_table("Vendors by purchase dollars", reporting::vendor_rows(&report.vendors, TOP_N));
            print_table(
                "Vendors by average payment lag",
                reporting::payment_lag_rows(&report.vendors, TOP_N),
            );
        }
        Ok((written, diag))
    }

    // ---------------------------------------------------------------------
    // Stage 5: city sales, turnover and margins
    // ---------------------------------------------------------------------
    fn insights(&self) -> PipelineResult<(Vec<PathBuf>, StageDiagnostics)> {
        self.require_upstream(&[SALES_MASTER, INVENTORY_MASTER])?;
        let sales: Vec<SalesMasterRecord> = read_table(&self.output(SALES_MASTER), SALES_MASTER)?;
        let inventory: Vec<InventoryMasterRecord> =
            read_table(&self.output(INVENTORY_MASTER), INVENTORY_MASTER)?;

        let insights = build_insights(&sales, &inventory, MARGIN_LEADERS);
        let written = vec![
            self.write(CITY_SALES, &insights.city_sales)?,
            self.write(PRODUCT_MARGINS, &insights.margins)?,
            self.write(INVENTORY_TURNOVER, std::slice::from_ref(&insights.turnover))?,
        ];

        if self.print_summaries {
            print_table("Sales by city", reporting::city_rows(&insights.city_sales, TOP_N));
            print_table("Inventory turnover", reporting::turnover_rows(&insights.turnover));
            print_table("Highest margins", reporting::margin_rows(&insights.top_margins));
            print_table("Lowest margins", reporting::margin_rows(&insights.bottom_margins));
        }
        Ok((written, insights.diagnostics))
    }

    // ---------------------------------------------------------------------
    // Stage 6: weekly demand forecast
    // ---------------------------------------------------------------------
    fn forecast(&self) -> PipelineResult<(Vec<PathBuf>, StageDiagnostics)> {
        self.require_upstream(&[SALES_MASTER, ABC_RESULTS])?;
        let sales: Vec<SalesMasterRecord> = read_table(&self.output(SALES_MASTER), SALES_MASTER)?;
        let abc: Vec<ProductProfitSummary> = read_table(&self.output(ABC_RESULTS), ABC_RESULTS)?;

        let mut forecaster = build_forecaster(&self.config.forecast);
        let forecast = forecast_demand(
            &sales,
            &abc,
            forecaster.as_mut(),
            self.config.forecast.horizon_weeks,
        );

        let mut diag = StageDiagnostics::new("forecast");
        if forecast.history.is_empty() {
            diag.record(
                IssueKind::NumericDegeneracy,
                "no dated sales; nothing to forecast",
            );
        }
        info!(
            subject = %forecast.subject,
            history_weeks = forecast.history.len(),
            horizon = forecast.points.len(),
            "demand forecast ready"
        );

        let written = vec![self.write(DEMAND_FORECAST, &forecast.points)?];
        if self.print_summaries {
            print_table(
                &format!("Forecast for {}", forecast.subject),
                reporting::forecast_rows(&forecast.points),
            );
        }
        Ok((written, diag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::io::synthetic::{generate_extracts, SyntheticConfig};
    use crate::model::records::{AbcCategory, EoqRecord};
    use std::path::Path;

    fn runner(dir: &Path) -> PipelineRunner {
        let input_dir = dir.join("data");
        generate_extracts(
            &SyntheticConfig {
                products: 12,
                stores: 3,
                seed: 11,
                sales_days: 4,
                missing_size_every: 5,
            },
            &input_dir,
            &PipelineConfig::default().extracts,
        )
        .unwrap();

        let mut runner = PipelineRunner::new(PipelineConfig {
            input_dir,
            output_dir: dir.join("output"),
            ..PipelineConfig::default()
        });
        runner.print_summaries = false;
        runner
    }

    #[test]
    fn stage_names_and_numbers_parse() {
        assert_eq!("abc".parse::<StageSelection>(), Ok(StageSelection::One(Stage::Abc)));
        assert_eq!("3".parse::<StageSelection>(), Ok(StageSelection::One(Stage::Optimize)));
        assert_eq!("ALL".parse::<StageSelection>(), Ok(StageSelection::All));
        assert!("7".parse::<StageSelection>().is_err());
        assert_eq!(StageSelection::All.stages().len(), 6);
    }

    #[test]
    fn selection_displays_for_error_context() {
        assert_eq!(StageSelection::One(Stage::Abc).to_string(), "2 (abc)");
        assert_eq!(StageSelection::All.to_string(), "all");
        assert_eq!(format!("stage {} failed", StageSelection::One(Stage::Forecast)), "stage 6 (forecast) failed");
    }

    #[test]
    fn full_pipeline_writes_every_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(dir.path());
        let written = runner.run(StageSelection::All).unwrap();
        // 11 tables and 6 diagnostics files.
        assert_eq!(written.len(), 17);
        for path in &written {
            assert!(path.is_file(), "{} missing", path.display());
        }

        let metrics: Vec<EoqRecord> =
            read_table(&runner.output(OPTIMIZATION_METRICS), OPTIMIZATION_METRICS).unwrap();
        assert_eq!(metrics.len(), 12);
        assert!(metrics.iter().all(|m| m.abc_category.is_some()));
        assert!(metrics.iter().any(|m| m.abc_category == Some(AbcCategory::A)));
    }

    #[test]
    fn stage_fails_fast_without_upstream_table() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(dir.path());
        match runner.run_stage(Stage::Optimize) {
            Err(PipelineError::MissingInput { artifact, .. }) => assert_eq!(artifact, SALES_MASTER),
            other => panic!("expected MissingInput, got {:?}", other),
        }
        assert!(!runner.output(OPTIMIZATION_METRICS).exists());
    }

    #[test]
    fn missing_abc_results_stop_optimization_before_any_output() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(dir.path());
        runner.run_stage(Stage::Prepare).unwrap();
        match runner.run_stage(Stage::Optimize) {
            Err(PipelineError::MissingInput { artifact, .. }) => assert_eq!(artifact, ABC_RESULTS),
            other => panic!("expected MissingInput, got {:?}", other),
        }
    }

    #[test]
    fn reconciliation_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(dir.path());
        runner.run_stage(Stage::Prepare).unwrap();
        let first = std::fs::read(runner.output(SALES_MASTER)).unwrap();
        let first_inventory = std::fs::read(runner.output(INVENTORY_MASTER)).unwrap();
        runner.run_stage(Stage::Prepare).unwrap();
        assert_eq!(first, std::fs::read(runner.output(SALES_MASTER)).unwrap());
        assert_eq!(first_inventory, std::fs::read(runner.output(INVENTORY_MASTER)).unwrap());
    }

    #[test]
    fn sales_master_round_trips_through_its_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(dir.path());
        runner.run_stage(Stage::Prepare).unwrap();
        let sales: Vec<SalesMasterRecord> =
            read_table(&runner.output(SALES_MASTER), SALES_MASTER).unwrap();
        assert_eq!(sales.len(), 12 * 3 * 4);
        for sale in &sales {
            assert!((sale.gross_profit + sale.cogs - sale.sales_dollars).abs() < 1e-6);
        }
    }
}
