//! ovenflow demo driver
//!
//! Places a batch of concurrent orders against the pipeline and prints the
//! resulting metrics snapshot as JSON.
//!
//! # Usage
//!
//! ```bash
//! # Ten pizzas with fast ticks, cancelling the first one after 2s
//! ovenflow-demo --orders 10 --tick-ms 100 --cancel-after-ms 2000
//!
//! # Load a config file and log as JSON
//! ovenflow-demo --config bakery.json --env prod
//! ```
//!
//! # Environment Variables
//!
//! - `OVENFLOW_ENV`: `dev` or `prod`
//! - `OVENFLOW_TICK_MS`: length of one duration tick in milliseconds
//! - `OVENFLOW_BURNT_THRESHOLD`: bake ticks above which a product burns
//! - `RUST_LOG`: overrides the log filter

use anyhow::{Context, Result};
use clap::Parser;
use ovenflow::prelude::*;
use ovenflow::core::ProductKind;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "ovenflow-demo")]
#[command(about = "Run a batch of orders through the bakery pipeline", long_about = None)]
struct Cli {
    /// Number of concurrent orders
    #[arg(short, long, default_value_t = 5)]
    orders: usize,

    /// Product to order
    #[arg(short, long, default_value = "pizza")]
    product: ProductKind,

    /// Cancel the first order after this many milliseconds
    #[arg(long)]
    cancel_after_ms: Option<u64>,

    /// Path to a JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the tick length in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Logging environment (dev or prod)
    #[arg(long, env = "OVENFLOW_ENV")]
    env: Option<Environment>,
}

fn load_config(cli: &Cli) -> Result<BakeryConfig> {
    let mut config = match &cli.config {
        Some(path) => BakeryConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => BakeryConfig::default(),
    };
    config = config.with_env_overrides()?;

    if let Some(tick_ms) = cli.tick_ms {
        config = config.with_tick(Duration::from_millis(tick_ms));
    }
    if let Some(environment) = cli.env {
        config = config.with_environment(environment);
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(&config.logging)?;

    info!(
        orders = cli.orders,
        product = %cli.product,
        tick_ms = config.tick_ms,
        "Starting ovenflow demo"
    );

    let metrics = Arc::new(MetricsRecorder::new());
    let sink: Arc<dyn Instrumentation> = Arc::new(
        CompositeInstrumentation::new()
            .with(Arc::new(LoggingInstrumentation))
            .with(metrics.clone()),
    );

    let orchestrator = PipelineOrchestrator::builder(config)
        .instrumentation(Arc::clone(&sink))
        .build()
        .context("invalid bakery configuration")?;
    let intake = OrderIntake::new(Arc::new(orchestrator)).with_instrumentation(sink);

    let mut tasks = JoinSet::new();
    for n in 0..cli.orders {
        let token = CancellationToken::new();
        if n == 0 {
            if let Some(ms) = cli.cancel_after_ms {
                token.cancel_after(Duration::from_millis(ms), "cancelled by demo driver");
            }
        }

        let intake = intake.clone();
        let request = OrderRequest::new(format!("client-{n}"), cli.product);
        tasks.spawn(async move { intake.place_order(request, &token).await });
    }

    let mut finished = 0usize;
    let mut cancelled = 0usize;
    while let Some(joined) = tasks.join_next().await {
        match joined.context("order task panicked")? {
            Ok(item) => {
                finished += 1;
                info!(item_id = %item.id, "Order delivered");
            }
            Err(failure) => {
                cancelled += 1;
                warn!(%failure, "Order not delivered");
            }
        }
    }

    info!(finished, cancelled, "All orders settled");
    println!("{}", serde_json::to_string_pretty(&metrics.snapshot())?);

    Ok(())
}
