//! CLI entry point for the futsim runner.

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use futsim_runner::config::Config;
use futsim_runner::error::Error;
use futsim_runner::run::{self, RunOptions};

#[derive(Parser)]
#[command(name = "futsim")]
#[command(about = "Futures portfolio simulation: signals in, NAV and trade records out")]
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
    /// Simulate the configured portfolios and append their records
    Run {
        /// Only this portfolio id
        #[arg(long)]
        portfolio: Option<String>,

        /// Simulate without writing any output
        #[arg(long)]
        dry_run: bool,
    },

    /// Evaluate stored NAV series
    Eval {
        /// Only this portfolio id
        #[arg(long)]
        portfolio: Option<String>,

        /// Print metrics as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Load every input file and report what was found
    Check,
}

fn dispatch(cli: Cli, config: &Config) -> Result<()> {
    match cli.command {
        Command::Run { portfolio, dry_run } => {
            let opts = RunOptions {
                only: portfolio,
                dry_run,
            };
            let summaries = run::run(config, &opts).context("simulation failed")?;
            run::print_summary(&summaries, &config.output.dir);
            run::ensure_continuous(&summaries)?;
        }
        Command::Eval { portfolio, json } => {
            let evaluated = run::evaluate(config, portfolio.as_deref()).context("evaluation failed")?;
            for (id, metrics) in &evaluated {
                if json {
                    let line = serde_json::json!({ "id": id, "metrics": metrics });
                    println!("{line}");
                } else {
                    println!("\n[{id}]\n{metrics}");
                }
            }
        }
        Command::Check => run::check(config).context("input check failed")?,
    }
    Ok(())
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

    if let Err(e) = dispatch(cli, &config) {
        match e.downcast_ref::<Error>() {
            Some(Error::Discontinuous { .. }) => {
                eprintln!("\nRefused: {e}");
                process::exit(2);
            }
            _ => {
                eprintln!("Error: {e:#}");
                process::exit(1);
            }
        }
    }
}
