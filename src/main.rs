//! Shuttle GW - Contour Shuttle surface gateway
//!
//! Replays device event scripts against a surface instance and prints the
//! resulting host events.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shuttle_gw::config::AppConfig;
use shuttle_gw::console::ConsoleContext;
use shuttle_gw::geometry::ShuttleModel;
use shuttle_gw::instance::{DeviceEvent, SurfaceInstance};
use shuttle_gw::script::{self, ScriptStep};

/// Shuttle Gateway - Contour ShuttleXpress / ShuttlePro event normalizer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Device model (shuttle-xpress, shuttle-pro-v1, shuttle-pro-v1a, shuttle-pro-v2)
    #[arg(short, long)]
    model: Option<ShuttleModel>,

    /// Print the surface layout as JSON and exit
    #[arg(long)]
    layout: bool,

    /// Device event script to replay ("-" reads stdin line by line)
    #[arg(long, default_value = "-")]
    script: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level)?;

    let mut config = load_config(&args.config).await?;
    if let Some(model) = args.model {
        config.surface.model = model;
    }

    let model = config.surface.model;
    model
        .geometry()
        .validate()
        .with_context(|| format!("Invalid geometry table for {}", model))?;

    if args.layout {
        let layout = model.geometry().layout();
        println!("{}", serde_json::to_string_pretty(&layout)?);
        return Ok(());
    }

    info!("Starting Shuttle GW for {} ({})", config.surface.id, model.product_name());

    run_script(&config, &args.script).await?;

    info!("Shuttle GW shutdown complete");
    Ok(())
}

async fn load_config(path: &str) -> Result<AppConfig> {
    if Path::new(path).exists() {
        let config = AppConfig::load(path).await?;
        info!("Configuration loaded from {}", path);
        Ok(config)
    } else {
        info!("No configuration at {}, using defaults", path);
        Ok(AppConfig::default())
    }
}

async fn run_script(config: &AppConfig, source: &str) -> Result<()> {
    let ctx = Arc::new(ConsoleContext::new(config.surface.id.clone()));
    let (handle, tx) = SurfaceInstance::new(config, ctx.clone()).spawn();

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let replay = async {
        if source == "-" {
            info!("Reading device events from stdin");
            replay_stdin(&tx).await
        } else {
            let content = tokio::fs::read_to_string(source)
                .await
                .with_context(|| format!("Failed to read script: {}", source))?;
            let steps = script::parse_script(&content)
                .with_context(|| format!("Invalid script: {}", source))?;
            info!("Replaying {} steps from {}", steps.len(), source);
            replay_steps(&tx, steps).await;
            Ok(())
        }
    };

    tokio::select! {
        result = replay => result?,
        _ = &mut shutdown => {}
    }

    handle.close().await?;
    info!("{} events emitted", ctx.event_count());
    Ok(())
}

async fn replay_steps(tx: &mpsc::Sender<DeviceEvent>, steps: Vec<ScriptStep>) {
    for step in steps {
        if !apply_step(tx, step).await {
            break;
        }
    }
}

async fn replay_stdin(tx: &mpsc::Sender<DeviceEvent>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_no = 0;

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        line_no += 1;
        match script::parse_line(line_no, &line) {
            Ok(Some(step)) => {
                if !apply_step(tx, step).await {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Skipping {}", e),
        }
    }

    Ok(())
}

/// Run one step; false once the instance has stopped taking events
async fn apply_step(tx: &mpsc::Sender<DeviceEvent>, step: ScriptStep) -> bool {
    match step {
        ScriptStep::Wait(duration) => {
            tokio::time::sleep(duration).await;
            true
        }
        ScriptStep::Event(event) => {
            if tx.send(event).await.is_err() {
                warn!("Surface stopped, ignoring the rest of the script");
                return false;
            }
            true
        }
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install CTRL+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
