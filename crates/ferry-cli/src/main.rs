//! Ferry CLI: drive a cancellable work queue from the command line.
//!
//! Queue defaults come from FERRY_QUEUE_NAME and FERRY_QUEUE_CAPACITY (or a
//! `.env` file); flags override them.

use anyhow::Context;
use clap::{Parser, Subcommand};
use ferry_cli::{init_tracing, run_demo, DemoOptions};
use ferry_core::QueueConfig;
use serde::Serialize;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "ferry", about = "Bounded, cancellable work queue")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Feed a slow consumer faster than it can keep up, then stop the queue
    Demo {
        /// Buffer capacity (defaults to FERRY_QUEUE_CAPACITY)
        #[arg(long)]
        capacity: Option<usize>,
        /// Number of items to push
        #[arg(long, default_value = "15")]
        items: usize,
        /// Delay between pushes in milliseconds
        #[arg(long, default_value = "50")]
        push_interval_ms: u64,
        /// Time the consumer spends per item in milliseconds
        #[arg(long, default_value = "100")]
        handler_delay_ms: u64,
        /// Time to keep the queue running after the last push, in milliseconds
        #[arg(long, default_value = "2000")]
        grace_ms: u64,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the queue configuration resolved from the environment
    Config,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = QueueConfig::from_env().context("Failed to load queue configuration")?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Demo {
            capacity,
            items,
            push_interval_ms,
            handler_delay_ms,
            grace_ms,
            json,
        } => {
            let options = DemoOptions {
                capacity: capacity.unwrap_or(config.capacity),
                items,
                push_interval: Duration::from_millis(push_interval_ms),
                handler_delay: Duration::from_millis(handler_delay_ms),
                grace: Duration::from_millis(grace_ms),
                ..DemoOptions::from_config(&config)
            };
            let report = run_demo(&options).await?;

            if json {
                print_json(&report)?;
            } else {
                for rejection in &report.rejected {
                    println!("Could not push {}: {}", rejection.item, rejection.reason);
                }
                println!(
                    "processed {} of {} items ({} rejected, {} unfinished at stop)",
                    report.processed.len(),
                    options.items,
                    report.rejected.len(),
                    report
                        .stats
                        .accepted
                        .saturating_sub(report.stats.completed + report.stats.failed),
                );
            }
        }
        Commands::Config => {
            print_json(&serde_json::json!({
                "name": config.name,
                "capacity": config.capacity,
            }))?;
        }
    }

    Ok(())
}
