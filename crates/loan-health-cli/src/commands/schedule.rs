use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use loan_health_core::amortization::compute_schedule;

use crate::input;

/// Arguments for amortization schedule computation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ScheduleArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Principal amount
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Annual rate in basis points (e.g. 1200 for 12%)
    #[arg(long, alias = "bps")]
    pub annual_rate_bps: Option<Decimal>,

    /// Term in months
    #[arg(long)]
    pub term_months: Option<u32>,

    /// Due date of the first installment (YYYY-MM-DD)
    #[arg(long)]
    pub first_due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
struct ScheduleInput {
    principal: Decimal,
    annual_rate_bps: Decimal,
    term_months: u32,
    first_due_date: NaiveDate,
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let schedule_input: ScheduleInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        ScheduleInput {
            principal: args
                .principal
                .ok_or("--principal is required (or provide --input)")?,
            annual_rate_bps: args
                .annual_rate_bps
                .ok_or("--annual-rate-bps is required (or provide --input)")?,
            term_months: args
                .term_months
                .ok_or("--term-months is required (or provide --input)")?,
            first_due_date: args
                .first_due_date
                .ok_or("--first-due-date is required (or provide --input)")?,
        }
    };

    let schedule = compute_schedule(
        schedule_input.principal,
        schedule_input.annual_rate_bps,
        schedule_input.term_months,
        schedule_input.first_due_date,
    )?;
    Ok(serde_json::to_value(schedule)?)
}
