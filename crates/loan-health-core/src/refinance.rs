//! Refinance quoting and validation.
//!
//! A quote reprices the remaining balance over the remaining term plus each
//! policy-configured extension, at the loan's existing rate. Quotes are
//! advisory: the service re-quotes at commit time and `select_option` rejects
//! a chosen term that no longer matches an offered option (`StaleQuote`).
//! The fee is a flat fraction of the remaining balance, independent of the
//! chosen term.

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::amortization::compute_schedule;
use crate::classifier::{allocate, remaining_balance};
use crate::error::LoanHealthError;
use crate::policy::HealthPolicy;
use crate::types::{Loan, LoanStatus, Money, Repayment, ScheduleVersion};
use crate::LoanHealthResult;

/// One candidate repayment plan at an extended term.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinanceOption {
    /// Months added to the remaining term.
    pub offset_months: u32,
    /// Total term of the replacement schedule.
    pub term_months: u32,
    pub monthly_payment: Money,
    pub total_interest: Money,
}

/// Advisory refinance terms for one loan at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinanceQuote {
    pub loan_id: String,
    pub eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub remaining_balance: Money,
    /// Unsatisfied installments left in the current schedule version.
    pub remaining_term: u32,
    pub current_monthly_payment: Money,
    pub fee: Money,
    pub options: Vec<RefinanceOption>,
}

/// Quote refinance options against the current schedule version.
///
/// Ineligibility is reported in-band (`eligible: false` with a reason), not
/// as an error: the dashboard renders both cases from the same projection.
pub fn quote(
    loan: &Loan,
    schedule: &ScheduleVersion,
    repayments: &[Repayment],
    policy: &HealthPolicy,
    as_of: NaiveDate,
) -> LoanHealthResult<RefinanceQuote> {
    let coverage = allocate(&schedule.installments, repayments);
    let remaining = remaining_balance(&schedule.installments, &coverage);
    let remaining_term = coverage.iter().filter(|c| !c.satisfied).count() as u32;

    let reason = ineligibility_reason(loan.status, remaining);
    let eligible = reason.is_none();
    let fee = (remaining * policy.refinance_fee_rate).round_dp(2);

    let mut options = Vec::new();
    if eligible {
        let first_due = as_of.checked_add_months(Months::new(1)).ok_or_else(|| {
            LoanHealthError::DateError(format!("First due date overflow from {as_of}"))
        })?;
        for &offset in &policy.refinance_term_offsets {
            let term_months = remaining_term + offset;
            let candidate =
                compute_schedule(remaining, loan.annual_rate_bps, term_months, first_due)?;
            options.push(RefinanceOption {
                offset_months: offset,
                term_months,
                monthly_payment: candidate.monthly_payment,
                total_interest: candidate.total_interest,
            });
        }
    }

    Ok(RefinanceQuote {
        loan_id: loan.id.clone(),
        eligible,
        reason,
        remaining_balance: remaining,
        remaining_term,
        current_monthly_payment: loan.monthly_payment,
        fee,
        options,
    })
}

/// Pick the option matching the requested term, or explain why there is none.
pub fn select_option<'a>(
    quote: &'a RefinanceQuote,
    new_term: u32,
) -> LoanHealthResult<&'a RefinanceOption> {
    if !quote.eligible {
        return Err(LoanHealthError::IneligibleLoan {
            loan_id: quote.loan_id.clone(),
            reason: quote
                .reason
                .clone()
                .unwrap_or_else(|| "not eligible".into()),
        });
    }
    quote
        .options
        .iter()
        .find(|o| o.term_months == new_term)
        .ok_or(LoanHealthError::StaleQuote {
            requested_term: new_term,
            remaining_term: quote.remaining_term,
        })
}

fn ineligibility_reason(status: LoanStatus, remaining: Money) -> Option<String> {
    match status {
        LoanStatus::Defaulted => {
            Some("defaulted loans require a workout process, not a refinance".into())
        }
        LoanStatus::PaidOff => Some("loan is already paid off".into()),
        LoanStatus::Refinanced => Some("loan was closed by a refinance".into()),
        _ if remaining <= Decimal::ZERO => Some("remaining balance is zero".into()),
        _ => None,
    }
}
