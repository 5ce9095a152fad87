use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use loadtest_panel::config::PanelConfig;
use loadtest_panel::panel::{LoadTestPanel, TriggerRequest};
use loadtest_panel::reconcile::{TestId, TestResult};

#[derive(Parser)]
#[command(
    name = "loadtest-panel",
    about = "Control panel for load tests executed by GitHub Actions",
    version,
    long_about = None
)]
struct Cli {
    /// TOML config file
    #[arg(long, global = true, env = "LOADTEST_PANEL_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Bind address
        #[arg(long, default_value = "0.0.0.0:3000", env = "LOADTEST_PANEL_BIND")]
        bind: String,
    },

    /// Dispatch a new load test run
    Trigger {
        /// 64-character hex inbox id to load
        #[arg(long)]
        inbox_id: String,

        #[arg(long, default_value = "dev")]
        network: String,

        /// Test duration in seconds
        #[arg(long, default_value = "30")]
        duration: u32,

        #[arg(long, default_value = "5")]
        num_groups: u32,

        #[arg(long, default_value = "5")]
        num_dms: u32,

        /// Seconds between message batches
        #[arg(long, default_value = "1")]
        interval: u32,

        #[arg(long, default_value = "3")]
        messages_per_batch: u32,

        /// Comma-separated inbox ids to reuse
        #[arg(long)]
        existing_inbox_ids: Option<String>,

        /// Comma-separated group names to reuse
        #[arg(long)]
        existing_group_names: Option<String>,

        /// Use this test id instead of generating one
        #[arg(long)]
        test_id: Option<String>,
    },

    /// Show the status of one test
    Status {
        test_id: String,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// List the most recent tests
    History {
        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Cancel a running test
    Cancel { test_id: String },
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_result(result: &TestResult) {
    println!("\n=== Load Test {} ===", result.test_id);
    println!("Status:     {}", result.status);
    if let Some(message) = &result.message {
        println!("Note:       {}", message);
    }
    if let Some(reason) = &result.failure_reason {
        println!("Reason:     {}", reason);
    }
    if let Some(start) = result.start_time {
        println!("Started:    {}", start.to_rfc3339());
    }
    if let Some(secs) = result.duration {
        println!("Duration:   {}s", secs);
    }
    if let Some(network) = &result.metadata.network {
        println!("Network:    {}", network);
    }
    if let Some(groups) = result.metadata.groups {
        println!("Groups:     {}", groups);
    }
    if let Some(inbox) = &result.metadata.inbox_id {
        println!("Inbox:      {}", inbox);
    }
    if let Some(total) = result.metrics.total_messages {
        println!("Messages:   {}", total);
    }
    if let Some(rate) = result.metrics.messages_per_second {
        println!("Rate:       {:.2} msg/s", rate);
    }
    if let Some(url) = &result.github_url {
        println!("Run:        {}", url);
    }
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = PanelConfig::resolve(cli.config.as_deref());

    match cli.command {
        Commands::Serve { bind } => {
            tracing::info!(%bind, "Starting loadtest-panel");
            loadtest_panel::serve(&bind, config).await?;
        }
        Commands::Trigger {
            inbox_id,
            network,
            duration,
            num_groups,
            num_dms,
            interval,
            messages_per_batch,
            existing_inbox_ids,
            existing_group_names,
            test_id,
        } => {
            let panel = LoadTestPanel::from_config(config)?;
            let test_id =
                test_id.unwrap_or_else(|| TestId::generate(chrono::Utc::now()).to_string());
            let outcome = panel
                .trigger(TriggerRequest {
                    inbox_id: Some(inbox_id),
                    network: Some(network),
                    duration: Some(duration.to_string()),
                    num_groups: Some(num_groups.to_string()),
                    num_dms: Some(num_dms.to_string()),
                    interval: Some(interval.to_string()),
                    messages_per_batch: Some(messages_per_batch.to_string()),
                    test_id: Some(test_id),
                    existing_inbox_ids,
                    existing_group_names,
                })
                .await?;
            println!("{} ({})", outcome.message, outcome.test_id);
        }
        Commands::Status { test_id, json } => {
            let panel = LoadTestPanel::from_config(config)?;
            let result = panel.status(&TestId::new(test_id)).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_result(&result);
            }
        }
        Commands::History { json } => {
            let panel = LoadTestPanel::from_config(config)?;
            let tests = panel.history().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tests)?);
            } else if tests.is_empty() {
                println!("No test runs found.");
            } else {
                println!(
                    "{:<32} | {:<9} | {:<10} | {:<6} | Messages",
                    "Test", "Status", "Network", "Secs"
                );
                println!("{:-<32}-|-{:-<9}-|-{:-<10}-|-{:-<6}-|-{:-<8}", "", "", "", "", "");
                for t in &tests {
                    println!(
                        "{:<32} | {:<9} | {:<10} | {:<6} | {}",
                        t.test_id.as_str(),
                        t.status.to_string(),
                        t.metadata.network.as_deref().unwrap_or("-"),
                        t.duration.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
                        t.metrics
                            .total_messages
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| "-".into()),
                    );
                }
            }
        }
        Commands::Cancel { test_id } => {
            let panel = LoadTestPanel::from_config(config)?;
            let outcome = panel.cancel(&TestId::new(test_id)).await?;
            println!(
                "{} (run {}, {})",
                outcome.message, outcome.workflow_id, outcome.test_id
            );
        }
    }

    Ok(())
}
