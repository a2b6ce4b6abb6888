//! CLI entry point for the rebalancer.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use rebalancer::config::Config;
use rebalancer::error::Error;
use rebalancer::execution::{self, RunOptions};
use rebalancer::target::TargetSpec;

#[derive(Parser)]
#[command(name = "rebalancer")]
#[command(about = "Crypto portfolio rebalancer: plan and execute minimum-cost spot trades")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute the rebalance plan, confirm, and execute it
    Run {
        /// Path to target.json
        target: PathBuf,

        /// Show the plan without submitting any orders
        #[arg(long)]
        dry_run: bool,

        /// Skip the confirmation prompt (for automation/cron)
        #[arg(long)]
        force: bool,
    },

    /// Compute and print the rebalance plan without executing it
    Plan {
        /// Path to target.json
        target: PathBuf,
    },

    /// Show current balances and their portfolio weights
    Positions,

    /// Check exchange connectivity
    Status,

    /// Compare current weights against a target and report drift
    Reconcile {
        /// Path to target.json
        target: PathBuf,
    },
}

fn load_target(path: &PathBuf) -> TargetSpec {
    match TargetSpec::load(path) {
        Ok(spec) => spec,
        Err(e) => {
            eprintln!("Error loading target: {e}");
            process::exit(1);
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Run {
            target,
            dry_run,
            force,
        } => {
            let spec = load_target(&target);
            let opts = RunOptions { dry_run, force };
            execution::run(&config, &spec, &opts)
        }
        Command::Plan { target } => {
            let spec = load_target(&target);
            execution::show_plan(&config, &spec)
        }
        Command::Positions => execution::show_positions(&config),
        Command::Status => execution::check_status(&config),
        Command::Reconcile { target } => {
            let spec = load_target(&target);
            execution::run_reconcile(&config, &spec)
        }
    };

    if let Err(e) = result {
        match &e {
            Error::TooManyOrders(msg) => {
                eprintln!("\nAborted: {msg}");
                process::exit(2);
            }
            Error::Aborted(msg) => {
                eprintln!("{msg}");
                process::exit(0);
            }
            _ => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    }
}
