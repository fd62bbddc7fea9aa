//! RedWhisper CLI - Main entry point

mod cli;

use clap::{Parser, Subcommand};
use redwhisper_foundation::AppConfig;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// RedWhisper - security assessment orchestrator
#[derive(Parser, Debug)]
#[command(name = "redwhisper")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file (default: global + project redwhisper.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a security test and print the report
    Run {
        /// Test type (sql_injection, xss, phishing, comprehensive)
        task_type: String,

        /// Target URL
        target: String,

        /// Test types for a comprehensive run (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        tests: Vec<String>,

        /// Extra task parameter (key=value, value parsed as JSON when possible)
        #[arg(short, long = "param")]
        params: Vec<String>,

        /// Task priority (lower is more urgent)
        #[arg(long)]
        priority: Option<i32>,

        /// Save the report under the configured report directory
        #[arg(short, long)]
        save: bool,
    },
    /// List built-in agents and their capabilities
    Agents,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match args.command {
        Command::Agents => {
            cli::list_agents();
            Ok(())
        }
        Command::Run {
            task_type,
            target,
            tests,
            params,
            priority,
            save,
        } => {
            let config = match &args.config {
                Some(path) => AppConfig::load_from(path)?,
                None => AppConfig::load().unwrap_or_else(|e| {
                    eprintln!("Warning: Failed to load config: {}", e);
                    AppConfig::default()
                }),
            };

            let request = cli::build_request(&task_type, &target, &tests, &params, priority)?;
            cli::run_once(&config, request, save).await
        }
    }
}
