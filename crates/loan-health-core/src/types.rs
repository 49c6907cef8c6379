use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Lifecycle state of a loan.
///
/// `PaidOff` is terminal. `Refinanced` belongs to the status vocabulary for
/// rows imported from the legacy book; this core never produces it (a
/// refinance keeps the loan and resets it to `Active`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Active,
    Late,
    AtRisk,
    Defaulted,
    Recovering,
    Refinanced,
    PaidOff,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::Late => "late",
            LoanStatus::AtRisk => "at_risk",
            LoanStatus::Defaulted => "defaulted",
            LoanStatus::Recovering => "recovering",
            LoanStatus::Refinanced => "refinanced",
            LoanStatus::PaidOff => "paid_off",
        }
    }

    /// States this core will never transition out of on its own.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoanStatus::PaidOff | LoanStatus::Refinanced)
    }

    pub fn is_delinquent(&self) -> bool {
        matches!(
            self,
            LoanStatus::Late | LoanStatus::AtRisk | LoanStatus::Defaulted
        )
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(LoanStatus::Active),
            "late" => Ok(LoanStatus::Late),
            "at_risk" => Ok(LoanStatus::AtRisk),
            "defaulted" => Ok(LoanStatus::Defaulted),
            "recovering" => Ok(LoanStatus::Recovering),
            "refinanced" => Ok(LoanStatus::Refinanced),
            "paid_off" => Ok(LoanStatus::PaidOff),
            other => Err(format!("unknown loan status '{other}'")),
        }
    }
}

/// A microloan as this core sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub id: String,
    pub borrower_id: String,
    /// Original principal at origination.
    pub principal: Money,
    /// Annual interest rate in basis points, fixed at origination from the
    /// borrower's credit tier; changes only through refinance.
    pub annual_rate_bps: Decimal,
    /// Months in the current repayment schedule.
    pub term_months: u32,
    /// Cached from the current schedule version.
    pub monthly_payment: Money,
    pub originated_at: NaiveDate,
    pub status: LoanStatus,
    /// Index of the current schedule version (0 at origination).
    pub schedule_version: u32,
    /// Consecutive qualifying payments while `Recovering`; 0 otherwise.
    pub recovery_progress: u8,
}

/// One expected payment in a schedule version. Immutable once generated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installment {
    /// 1-based position within the schedule.
    pub sequence: u32,
    pub due_date: NaiveDate,
    pub principal_portion: Money,
    pub interest_portion: Money,
    pub amount_due: Money,
}

/// A posted repayment from the external ledger. Read-only to this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repayment {
    pub id: String,
    pub loan_id: String,
    pub amount: Money,
    pub posted_at: NaiveDate,
    pub schedule_version: u32,
}

/// One immutable generation of a loan's expected schedule.
///
/// Refinance appends a new version and stamps `superseded_at` on the old one;
/// versions are never edited or deleted (audit trail).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleVersion {
    pub loan_id: String,
    pub version: u32,
    /// Principal amortized by this version (the remaining balance at the
    /// refinance that created it, or the original principal for version 0).
    pub principal: Money,
    pub monthly_payment: Money,
    pub created_at: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superseded_at: Option<NaiveDate>,
    pub installments: Vec<Installment>,
}

impl ScheduleVersion {
    pub fn is_current(&self) -> bool {
        self.superseded_at.is_none()
    }
}

/// Audit record written once per successful refinance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinanceRecord {
    pub loan_id: String,
    /// Remaining term, in months, at the moment of refinance.
    pub previous_term: u32,
    pub new_term: u32,
    pub previous_monthly_payment: Money,
    pub new_monthly_payment: Money,
    pub fee: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub created_at: NaiveDate,
}

/// Result of one classification run over a loan's current schedule version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub loan_id: String,
    pub as_of: NaiveDate,
    /// Days since the due date of the oldest unsatisfied past-due
    /// installment; 0 when none.
    pub days_behind: i64,
    /// Past-grace installments whose allocation falls short of the amount due.
    pub missed_payments: u32,
    pub health_status: LoanStatus,
    pub recovery_progress: u8,
    pub remaining_balance: Money,
}
