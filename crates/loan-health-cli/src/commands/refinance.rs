use chrono::NaiveDate;
use clap::Args;
use serde_json::Value;

use loan_health_core::refinance::quote;

use crate::commands::{as_of_or_today, ClassifyBundle};
use crate::input;

/// Arguments for refinance quoting
#[derive(Args)]
pub struct RefinanceOptionsArgs {
    /// Path to a JSON bundle: { loan, schedule, repayments?, policy? }
    #[arg(long)]
    pub input: Option<String>,

    /// Quote date (YYYY-MM-DD); defaults to today
    #[arg(long)]
    pub as_of: Option<NaiveDate>,
}

pub fn run_refinance_options(
    args: RefinanceOptionsArgs,
) -> Result<Value, Box<dyn std::error::Error>> {
    let bundle: ClassifyBundle = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input file or piped JSON is required for refinance-options".into());
    };
    bundle.policy.validate()?;

    let result = quote(
        &bundle.entry.loan,
        &bundle.entry.schedule,
        &bundle.entry.repayments,
        &bundle.policy,
        as_of_or_today(args.as_of),
    )?;
    Ok(serde_json::to_value(result)?)
}
