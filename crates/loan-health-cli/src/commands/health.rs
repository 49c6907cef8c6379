use chrono::NaiveDate;
use clap::Args;
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

use loan_health_core::classifier::classify;
use loan_health_core::{HealthSnapshot, LoanStatus};

use crate::commands::{as_of_or_today, ClassifyBundle, PortfolioBundle};
use crate::input;

/// Arguments for single-loan classification
#[derive(Args)]
pub struct ClassifyArgs {
    /// Path to a JSON bundle: { loan, schedule, repayments?, policy? }
    #[arg(long)]
    pub input: Option<String>,

    /// Classification date (YYYY-MM-DD); defaults to today
    #[arg(long)]
    pub as_of: Option<NaiveDate>,
}

/// Arguments for portfolio classification
#[derive(Args)]
pub struct PortfolioArgs {
    /// Path to a JSON bundle: { policy?, loans: [{ loan, schedule, repayments? }] }
    #[arg(long)]
    pub input: Option<String>,

    /// Classification date (YYYY-MM-DD); defaults to today
    #[arg(long)]
    pub as_of: Option<NaiveDate>,

    /// Only report loans classifying into this status
    #[arg(long)]
    pub status: Option<String>,
}

pub fn run_classify(args: ClassifyArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let bundle: ClassifyBundle = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input file or piped JSON is required for classify".into());
    };
    bundle.policy.validate()?;

    let snapshot = classify(
        &bundle.entry.loan,
        &bundle.entry.schedule.installments,
        &bundle.entry.repayments,
        as_of_or_today(args.as_of),
        &bundle.policy,
    );
    Ok(serde_json::to_value(snapshot)?)
}

pub fn run_portfolio(args: PortfolioArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let bundle: PortfolioBundle = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input file or piped JSON is required for portfolio".into());
    };
    bundle.policy.validate()?;

    let filter = match args.status.as_deref() {
        Some(s) => Some(LoanStatus::from_str(s)?),
        None => None,
    };
    let as_of = as_of_or_today(args.as_of);

    let mut snapshots: Vec<HealthSnapshot> = bundle
        .loans
        .iter()
        .map(|entry| {
            classify(
                &entry.loan,
                &entry.schedule.installments,
                &entry.repayments,
                as_of,
                &bundle.policy,
            )
        })
        .collect();

    let mut by_status: BTreeMap<&'static str, u64> = BTreeMap::new();
    for snap in &snapshots {
        *by_status.entry(snap.health_status.as_str()).or_insert(0) += 1;
    }

    if let Some(status) = filter {
        snapshots.retain(|s| s.health_status == status);
    }

    Ok(serde_json::json!({
        "as_of": as_of,
        "total": bundle.loans.len(),
        "by_status": by_status
            .into_iter()
            .map(|(status, count)| serde_json::json!({ "status": status, "count": count }))
            .collect::<Vec<Value>>(),
        "snapshots": snapshots,
    }))
}
