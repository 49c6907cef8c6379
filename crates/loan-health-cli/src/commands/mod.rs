pub mod health;
pub mod refinance;
pub mod schedule;

use chrono::NaiveDate;
use serde::Deserialize;

use loan_health_core::policy::HealthPolicy;
use loan_health_core::{Loan, Repayment, ScheduleVersion};

/// Everything needed to judge one loan offline: the loan row, its current
/// schedule version, and the posted repayments for that version.
#[derive(Debug, Clone, Deserialize)]
pub struct LoanBundle {
    pub loan: Loan,
    pub schedule: ScheduleVersion,
    #[serde(default)]
    pub repayments: Vec<Repayment>,
}

/// A book of loans sharing one policy.
#[derive(Debug, Clone, Deserialize)]
pub struct PortfolioBundle {
    #[serde(default)]
    pub policy: HealthPolicy,
    pub loans: Vec<LoanBundle>,
}

/// Classification input for a single loan.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifyBundle {
    #[serde(default)]
    pub policy: HealthPolicy,
    #[serde(flatten)]
    pub entry: LoanBundle,
}

pub fn as_of_or_today(as_of: Option<NaiveDate>) -> NaiveDate {
    as_of.unwrap_or_else(|| chrono::Utc::now().date_naive())
}
