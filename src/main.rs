mod analysis;
mod error;
mod forecast;
mod io;
mod model;
mod optimization;
mod pipeline;

use crate::io::synthetic::{generate_extracts, SyntheticConfig};
use crate::model::backfill::TieBreak;
use crate::pipeline::config::{ForecastMethod, LeadTimePolicy, PipelineConfig};
use crate::pipeline::stages::{PipelineRunner, StageSelection};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "inventory-analytics", version, about = "Retail inventory and sales analytics pipeline")]
struct Cli {
    /// TOML configuration file (falls back to INVENTORY_ANALYTICS_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one pipeline stage (name or 1-6), or all of them
    Run(RunArgs),
    /// Write a synthetic set of the six raw extracts
    Generate(GenerateArgs),
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// prepare, abc, optimize, vendors, insights, forecast, all, or 1-6
    #[arg(short, long, default_value = "all")]
    stage: StageSelection,

    #[arg(long)]
    input_dir: Option<PathBuf>,

    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Fixed cost per order (S)
    #[arg(long)]
    ordering_cost: Option<f64>,

    /// Annual holding cost as a fraction of unit cost
    #[arg(long)]
    holding_rate: Option<f64>,

    #[arg(long)]
    days_per_year: Option<f64>,

    #[arg(long)]
    safety_stock: Option<f64>,

    #[arg(long)]
    a_threshold: Option<f64>,

    #[arg(long)]
    b_threshold: Option<f64>,

    /// How Store -> City and Brand -> Size conflicts resolve
    #[arg(long, value_enum)]
    tie_break: Option<TieBreak>,

    #[arg(long, value_enum)]
    negative_lead_time: Option<LeadTimePolicy>,

    #[arg(long, value_enum)]
    forecast_method: Option<ForecastMethod>,

    #[arg(long)]
    horizon_weeks: Option<usize>,

    /// Skip the Markdown summaries on stdout
    #[arg(long)]
    quiet: bool,
}

#[derive(clap::Args, Debug)]
struct GenerateArgs {
    #[arg(long, default_value = "data")]
    output_dir: PathBuf,

    #[arg(long, default_value_t = 40)]
    products: usize,

    #[arg(long, default_value_t = 5)]
    stores: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

impl RunArgs {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(dir) = &self.input_dir {
            config.input_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        let opt = &mut config.optimization;
        if let Some(v) = self.ordering_cost {
            opt.ordering_cost = v;
        }
        if let Some(v) = self.holding_rate {
            opt.holding_cost_rate = v;
        }
        if let Some(v) = self.days_per_year {
            opt.days_per_year = v;
        }
        if let Some(v) = self.safety_stock {
            opt.safety_stock = v;
        }
        if let Some(v) = self.a_threshold {
            config.abc.a_threshold = v;
        }
        if let Some(v) = self.b_threshold {
            config.abc.b_threshold = v;
        }
        if let Some(tie_break) = self.tie_break {
            config.backfill_tie_break = tie_break;
        }
        if let Some(policy) = self.negative_lead_time {
            config.negative_lead_time = policy;
        }
        if let Some(method) = self.forecast_method {
            config.forecast.method = method;
        }
        if let Some(weeks) = self.horizon_weeks {
            config.forecast.horizon_weeks = weeks;
        }
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let default = if verbose {
        "inventory_analytics=debug"
    } else {
        "inventory_analytics=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // Logs go to stderr so stdout stays clean for the summaries.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json);

    match cli.command {
        Command::Run(args) => {
            let mut config = PipelineConfig::load(cli.config.as_deref())
                .context("failed to load configuration")?;
            args.apply(&mut config);
            config.validate().context("invalid configuration")?;

            info!(
                input_dir = %config.input_dir.display(),
                output_dir = %config.output_dir.display(),
                stage = %args.stage,
                "inventory analytics starting"
            );

            let mut runner = PipelineRunner::new(config);
            runner.print_summaries = !args.quiet;
            let written = runner
                .run(args.stage)
                .with_context(|| format!("stage {} failed", args.stage))?;
            info!(files = written.len(), "pipeline finished");
        }
        Command::Generate(args) => {
            let config = PipelineConfig::load(cli.config.as_deref())
                .context("failed to load configuration")?;
            let synthetic = SyntheticConfig {
                products: args.products,
                stores: args.stores,
                seed: args.seed,
                ..SyntheticConfig::default()
            };
            let summary = generate_extracts(&synthetic, &args.output_dir, &config.extracts)
                .context("failed to generate extracts")?;
            println!(
                "Wrote {} inventory, {} purchase and {} sales rows to {}",
                summary.inventory_rows,
                summary.purchase_rows,
                summary.sale_rows,
                args.output_dir.display()
            );
        }
    }
    Ok(())
}
