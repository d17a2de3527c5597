//! Simulated training job driven through the goodput recorder.
//!
//! Example:
//!   goodput-simulate --recorder_type=goodput \
//!     --recorder_spec=name=demo --recorder_spec=upload_dir=/tmp/goodput \
//!     --recorder_spec=upload_interval=1 --recorder_spec=rolling_window_size=5,10 \
//!     --steps 20

use anyhow::{Context, Result};
use clap::Parser;
use goodput_recorder::backend::LocalBackend;
use goodput_recorder::environment::StaticEnvironment;
use goodput_recorder::measurement::{self, Event};
use goodput_recorder::metrics::{install_metrics_recorder, render_metrics, MetricsConfig};
use goodput_recorder::RecorderFlags;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "goodput-simulate")]
#[command(version, about = "Run a simulated training job under the goodput recorder", long_about = None)]
struct Cli {
    #[command(flatten)]
    recorder: RecorderFlags,

    /// Index of this process in the job; only process 0 records
    #[arg(long, default_value = "0")]
    process_index: usize,

    /// Number of training steps
    #[arg(long, default_value = "10")]
    steps: u32,

    /// Duration of each step
    #[arg(long, default_value = "200")]
    step_millis: u64,

    /// Accelerator initialization time before the first step
    #[arg(long, default_value = "100")]
    init_millis: u64,

    /// Data loading time before each step
    #[arg(long, default_value = "50")]
    data_loading_millis: u64,

    /// Serve Prometheus metrics on this address while the job runs
    #[arg(long)]
    metrics_addr: Option<SocketAddr>,

    /// Print rendered Prometheus metrics when the job finishes
    #[arg(long)]
    print_metrics: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();

    if cli.metrics_addr.is_some() || cli.print_metrics {
        install_metrics_recorder(MetricsConfig {
            listen_addr: cli.metrics_addr,
        })
        .context("installing metrics recorder")?;
    }

    let backend = LocalBackend::new();
    let environment = StaticEnvironment::from_flags(&cli.recorder, cli.process_index);
    let installed = measurement::initialize(
        &cli.recorder,
        Arc::new(backend.clone()),
        Arc::new(environment),
    )
    .context("initializing recorder")?;

    if !installed {
        tracing::warn!("No recorder installed; pass --recorder_type=goodput to measure");
        return Ok(());
    }
    let recorder = measurement::global_recorder().context("recorder missing after initialization")?;

    let monitors = recorder.maybe_monitor_all_goodput()?;
    {
        let _job = recorder.record_event(Event::Job)?;

        recorder.with_event(Event::AcceleratorInit, || {
            std::thread::sleep(Duration::from_millis(cli.init_millis))
        })?;

        for step in 0..cli.steps {
            {
                let _loading = recorder.record_event(Event::DataLoading)?;
                tokio::time::sleep(Duration::from_millis(cli.data_loading_millis)).await;
            }
            let _step = recorder.record_event(Event::Step)?;
            tokio::time::sleep(Duration::from_millis(cli.step_millis)).await;
            tracing::debug!("Finished step {}", step);
        }
    }
    monitors.finish()?;

    let config = recorder.config();
    match backend.summary(config.name(), config.include_badput_breakdown()) {
        Some(summary) => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
            if config.rolling_window_enabled() {
                if let Some(report) = backend.rolling_window(config.name(), config.rolling_window_size()) {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
            }
        }
        None => tracing::info!(
            "Process {} is not the coordinator; nothing recorded",
            cli.process_index
        ),
    }

    if cli.print_metrics {
        if let Some(rendered) = render_metrics() {
            println!("{rendered}");
        }
    }

    Ok(())
}
