//! Amortization schedule generation.
//!
//! Pure arithmetic: given principal, an annual rate in basis points, and a
//! term in months, produce the level monthly payment and the full installment
//! schedule. The final installment absorbs the rounding remainder so that the
//! principal portions sum exactly to the principal — the rest of the crate
//! relies on that invariant when deriving remaining balances.
//!
//! All arithmetic uses `rust_decimal::Decimal`. No `f64`.

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::LoanHealthError;
use crate::types::{Installment, Money, Rate};
use crate::LoanHealthResult;

/// Minor-unit precision for USD-style currencies.
const MINOR_UNIT_DP: u32 = 2;

const BPS_PER_UNIT: Decimal = dec!(10_000);
const MONTHS_PER_YEAR: Decimal = dec!(12);

/// A complete expected schedule for one loan term.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub monthly_payment: Money,
    pub total_interest: Money,
    pub installments: Vec<Installment>,
}

/// Convert an annual rate in basis points to a monthly decimal rate.
pub fn monthly_rate_from_bps(annual_rate_bps: Decimal) -> Rate {
    annual_rate_bps / BPS_PER_UNIT / MONTHS_PER_YEAR
}

/// Build the installment schedule for `principal` amortized over
/// `term_months` at `annual_rate_bps`, with due dates spaced monthly from
/// `first_due_date`.
///
/// Deterministic: identical inputs always yield identical schedules.
pub fn compute_schedule(
    principal: Money,
    annual_rate_bps: Decimal,
    term_months: u32,
    first_due_date: NaiveDate,
) -> LoanHealthResult<AmortizationSchedule> {
    if term_months == 0 {
        return Err(LoanHealthError::InvalidTerm { months: 0 });
    }
    if principal <= Decimal::ZERO {
        return Err(LoanHealthError::InvalidPrincipal { amount: principal });
    }
    if annual_rate_bps < Decimal::ZERO {
        return Err(LoanHealthError::InvalidInput {
            field: "annual_rate_bps".into(),
            reason: "Annual rate cannot be negative".into(),
        });
    }

    let monthly_rate = monthly_rate_from_bps(annual_rate_bps);
    let monthly_payment = level_payment(principal, monthly_rate, term_months);

    let mut installments = Vec::with_capacity(term_months as usize);
    let mut balance = principal;
    let mut total_interest = Decimal::ZERO;

    for sequence in 1..=term_months {
        let due_date = first_due_date
            .checked_add_months(Months::new(sequence - 1))
            .ok_or_else(|| {
                LoanHealthError::DateError(format!(
                    "Due date overflow at installment {sequence} from {first_due_date}"
                ))
            })?;

        let interest = (balance * monthly_rate).round_dp(MINOR_UNIT_DP);
        let principal_portion = if sequence == term_months {
            // Remainder absorption: the last installment retires whatever
            // principal rounding left behind.
            balance
        } else {
            (monthly_payment - interest).max(Decimal::ZERO).min(balance)
        };

        balance -= principal_portion;
        total_interest += interest;

        installments.push(Installment {
            sequence,
            due_date,
            principal_portion,
            interest_portion: interest,
            amount_due: principal_portion + interest,
        });
    }

    let principal_sum: Decimal = installments.iter().map(|i| i.principal_portion).sum();
    if principal_sum != principal {
        return Err(LoanHealthError::InvariantViolation(format!(
            "Schedule principal portions sum to {principal_sum}, expected {principal}"
        )));
    }

    Ok(AmortizationSchedule {
        monthly_payment,
        total_interest,
        installments,
    })
}

/// Level payment `M = P·r·(1+r)^n / ((1+r)^n − 1)`, or `P/n` at zero rate,
/// rounded to the currency minor unit.
fn level_payment(principal: Money, monthly_rate: Rate, term_months: u32) -> Money {
    let n = Decimal::from(term_months);
    if monthly_rate.is_zero() {
        return (principal / n).round_dp(MINOR_UNIT_DP);
    }
    let growth = (Decimal::ONE + monthly_rate).powd(n);
    let payment = principal * monthly_rate * growth / (growth - Decimal::ONE);
    payment.round_dp(MINOR_UNIT_DP)
}
