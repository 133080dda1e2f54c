mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::covenants::CovenantTestArgs;
use commands::debt::DebtScheduleArgs;
use commands::decision::DecideArgs;
use commands::evaluate::EvaluateArgs;
use commands::normalize::NormalizeArgs;
use commands::projection::ProjectArgs;
use commands::stress::{SensitivityArgs, StressArgs};

/// Leveraged acquisition viability screening
#[derive(Parser)]
#[command(
    name = "lbov",
    version,
    about = "Leveraged acquisition viability screening",
    long_about = "A CLI for screening leveraged acquisitions with decimal precision. \
                  Normalizes EBITDA, builds amortization schedules, projects cash \
                  flows, stress tests, tracks covenants, and renders a GO / WATCH / \
                  NO-GO decision."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize an operating result into bank and equity EBITDA
    Normalize(NormalizeArgs),
    /// Build an aggregated debt amortization schedule
    DebtSchedule(DebtScheduleArgs),
    /// Project the multi-year cash flow trajectory
    Project(ProjectArgs),
    /// Run the stress scenario suite
    Stress(StressArgs),
    /// Compute a revenue/margin sensitivity grid
    Sensitivity(SensitivityArgs),
    /// Run covenant compliance tests over the projected trajectory
    CovenantTest(CovenantTestArgs),
    /// Score the trajectory into a GO / WATCH / NO-GO decision
    Decide(DecideArgs),
    /// Run the full screening pipeline
    Evaluate(EvaluateArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Normalize(args) => commands::normalize::run_normalize(args),
        Commands::DebtSchedule(args) => commands::debt::run_debt_schedule(args),
        Commands::Project(args) => commands::projection::run_project(args),
        Commands::Stress(args) => commands::stress::run_stress(args),
        Commands::Sensitivity(args) => commands::stress::run_sensitivity(args),
        Commands::CovenantTest(args) => commands::covenants::run_covenant_test(args),
        Commands::Decide(args) => commands::decision::run_decide(args),
        Commands::Evaluate(args) => commands::evaluate::run_evaluate(args),
        Commands::Version => {
            println!("lbov {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
