mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::health::{ClassifyArgs, PortfolioArgs};
use commands::refinance::RefinanceOptionsArgs;
use commands::schedule::ScheduleArgs;

/// Microloan repayment health and refinance analytics
#[derive(Parser)]
#[command(
    name = "loanhealth",
    version,
    about = "Microloan repayment health and refinance analytics",
    long_about = "A CLI over the loan-health core: amortization schedules, \
                  delinquency classification with decimal precision, portfolio \
                  health projections, and refinance quoting."
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
    /// Compute an amortization schedule
    Schedule(ScheduleArgs),
    /// Classify one loan's repayment health
    Classify(ClassifyArgs),
    /// Classify a book of loans and summarize by status
    Portfolio(PortfolioArgs),
    /// Quote refinance options for a loan
    RefinanceOptions(RefinanceOptionsArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Schedule(args) => commands::schedule::run_schedule(args),
        Commands::Classify(args) => commands::health::run_classify(args),
        Commands::Portfolio(args) => commands::health::run_portfolio(args),
        Commands::RefinanceOptions(args) => commands::refinance::run_refinance_options(args),
        Commands::Version => {
            println!("loanhealth {}", env!("CARGO_PKG_VERSION"));
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
