//! Delinquency classification.
//!
//! Derives a loan's health from the expected schedule and the posted
//! repayment ledger:
//! 1. **FIFO allocation** -- repayment money fills the oldest unpaid
//!    installment first; a satisfied installment never reopens.
//! 2. **Days behind** -- measured from the oldest unsatisfied past-due
//!    installment.
//! 3. **Band table** -- days behind mapped onto `HealthPolicy` thresholds.
//!
//! Classification is pure and idempotent; event emission on status change is
//! the service's job.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::policy::HealthPolicy;
use crate::types::{HealthSnapshot, Installment, Loan, LoanStatus, Money, Repayment};

/// How much of one installment the ledger has covered so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallmentCoverage {
    pub sequence: u32,
    pub allocated: Money,
    pub satisfied: bool,
}

/// Allocate the posted repayment pot against installments, oldest first.
///
/// Allocation is cumulative: the total posted amount fills installments in
/// schedule order until it runs out, so an installment satisfied by an
/// earlier run can never be reopened by a later repayment.
pub fn allocate(installments: &[Installment], repayments: &[Repayment]) -> Vec<InstallmentCoverage> {
    let mut pot: Money = repayments.iter().map(|r| r.amount).sum();
    installments
        .iter()
        .map(|inst| {
            let take = inst.amount_due.min(pot);
            pot -= take;
            InstallmentCoverage {
                sequence: inst.sequence,
                allocated: take,
                satisfied: take >= inst.amount_due,
            }
        })
        .collect()
}

/// Principal not yet retired: the principal portions of installments the
/// ledger has not fully covered. Partial allocations retire principal only
/// once their installment completes, which keeps the balance from ever going
/// negative.
pub fn remaining_balance(installments: &[Installment], coverage: &[InstallmentCoverage]) -> Money {
    installments
        .iter()
        .zip(coverage)
        .filter(|(_, c)| !c.satisfied)
        .map(|(i, _)| i.principal_portion)
        .sum()
}

/// Classify one loan against its current schedule version.
///
/// A loan already in `Recovering` is exempt from reclassification by the band
/// table alone; the recovery tracker owns its exits. Terminal states are
/// passed through untouched.
pub fn classify(
    loan: &Loan,
    installments: &[Installment],
    repayments: &[Repayment],
    as_of: NaiveDate,
    policy: &HealthPolicy,
) -> HealthSnapshot {
    let coverage = allocate(installments, repayments);
    let remaining = remaining_balance(installments, &coverage);
    let all_satisfied = coverage.iter().all(|c| c.satisfied);

    let oldest_unsatisfied = installments
        .iter()
        .zip(&coverage)
        .find(|(_, c)| !c.satisfied)
        .map(|(inst, _)| inst);

    let days_behind = oldest_unsatisfied
        .map(|inst| (as_of - inst.due_date).num_days().max(0))
        .unwrap_or(0);

    let grace = Duration::days(policy.grace_period_days);
    let missed_payments = installments
        .iter()
        .zip(&coverage)
        .filter(|(inst, c)| !c.satisfied && inst.due_date + grace < as_of)
        .count() as u32;

    let health_status = if loan.status.is_terminal() {
        loan.status
    } else if all_satisfied {
        LoanStatus::PaidOff
    } else if loan.status == LoanStatus::Recovering {
        LoanStatus::Recovering
    } else {
        policy.status_for_days_behind(days_behind)
    };

    let recovery_progress = if health_status == LoanStatus::Recovering {
        loan.recovery_progress
    } else {
        0
    };

    HealthSnapshot {
        loan_id: loan.id.clone(),
        as_of,
        days_behind,
        missed_payments,
        health_status,
        recovery_progress,
        remaining_balance: if all_satisfied { Decimal::ZERO } else { remaining },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amortization::compute_schedule;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn zero_rate_loan(principal: Decimal, term: u32) -> (Loan, Vec<Installment>) {
        let schedule =
            compute_schedule(principal, Decimal::ZERO, term, date(2025, 1, 15)).unwrap();
        let loan = Loan {
            id: "L001".into(),
            borrower_id: "B001".into(),
            principal,
            annual_rate_bps: Decimal::ZERO,
            term_months: term,
            monthly_payment: schedule.monthly_payment,
            originated_at: date(2024, 12, 15),
            status: LoanStatus::Active,
            schedule_version: 0,
            recovery_progress: 0,
        };
        (loan, schedule.installments)
    }

    fn repayment(id: &str, amount: Decimal, posted: NaiveDate) -> Repayment {
        Repayment {
            id: id.into(),
            loan_id: "L001".into(),
            amount,
            posted_at: posted,
            schedule_version: 0,
        }
    }

    #[test]
    fn test_allocation_fills_oldest_first() {
        let (_, installments) = zero_rate_loan(dec!(1200), 12);
        let reps = vec![repayment("R1", dec!(150), date(2025, 1, 10))];
        let coverage = allocate(&installments, &reps);
        assert!(coverage[0].satisfied);
        assert_eq!(coverage[1].allocated, dec!(50));
        assert!(!coverage[1].satisfied);
        assert!(!coverage[2].satisfied);
    }

    #[test]
    fn test_allocation_never_reopens() {
        let (_, installments) = zero_rate_loan(dec!(1200), 12);
        // Two payments posted out of order still cover the first two
        // installments in full.
        let reps = vec![
            repayment("R2", dec!(100), date(2025, 3, 1)),
            repayment("R1", dec!(100), date(2025, 1, 10)),
        ];
        let coverage = allocate(&installments, &reps);
        assert!(coverage[0].satisfied);
        assert!(coverage[1].satisfied);
        assert!(!coverage[2].satisfied);
    }

    #[test]
    fn test_current_loan_is_active() {
        let (loan, installments) = zero_rate_loan(dec!(1200), 12);
        let reps = vec![repayment("R1", dec!(100), date(2025, 1, 10))];
        let snap = classify(&loan, &installments, &reps, date(2025, 2, 1), &HealthPolicy::default());
        assert_eq!(snap.health_status, LoanStatus::Active);
        assert_eq!(snap.days_behind, 0);
        assert_eq!(snap.missed_payments, 0);
        assert_eq!(snap.remaining_balance, dec!(1100));
    }

    #[test]
    fn test_forty_five_days_behind_is_at_risk() {
        // One installment 45 days overdue, the next still inside a 14-day
        // grace window: exactly one missed payment.
        let (loan, installments) = zero_rate_loan(dec!(1200), 12);
        let policy = HealthPolicy {
            grace_period_days: 14,
            ..HealthPolicy::default()
        };
        let snap = classify(&loan, &installments, &[], date(2025, 3, 1), &policy);
        assert_eq!(snap.days_behind, 45);
        assert_eq!(snap.missed_payments, 1);
        assert_eq!(snap.health_status, LoanStatus::AtRisk);
    }

    #[test]
    fn test_defaulted_beyond_ninety_days() {
        let (loan, installments) = zero_rate_loan(dec!(1200), 12);
        let snap = classify(
            &loan,
            &installments,
            &[],
            date(2025, 4, 16),
            &HealthPolicy::default(),
        );
        assert_eq!(snap.days_behind, 91);
        assert_eq!(snap.health_status, LoanStatus::Defaulted);
    }

    #[test]
    fn test_grace_period_defers_missed_count() {
        let (loan, installments) = zero_rate_loan(dec!(1200), 12);
        let policy = HealthPolicy {
            grace_period_days: 10,
            ..HealthPolicy::default()
        };
        // 6 days past due: behind, but not yet missed.
        let snap = classify(&loan, &installments, &[], date(2025, 1, 21), &policy);
        assert_eq!(snap.days_behind, 6);
        assert_eq!(snap.missed_payments, 0);
        assert_eq!(snap.health_status, LoanStatus::Late);
    }

    #[test]
    fn test_partial_payment_does_not_retire_principal() {
        let (loan, installments) = zero_rate_loan(dec!(1200), 12);
        let reps = vec![repayment("R1", dec!(60), date(2025, 1, 10))];
        let snap = classify(&loan, &installments, &reps, date(2025, 1, 20), &HealthPolicy::default());
        assert_eq!(snap.remaining_balance, dec!(1200));
        assert_eq!(snap.health_status, LoanStatus::Late);
    }

    #[test]
    fn test_recovering_exempt_from_band_table() {
        let (mut loan, installments) = zero_rate_loan(dec!(1200), 12);
        loan.status = LoanStatus::Recovering;
        loan.recovery_progress = 2;
        let reps = vec![repayment("R1", dec!(200), date(2025, 2, 10))];
        // 0 days behind would map to Active, but mid-recovery stays put.
        let snap = classify(&loan, &installments, &reps, date(2025, 2, 20), &HealthPolicy::default());
        assert_eq!(snap.health_status, LoanStatus::Recovering);
        assert_eq!(snap.recovery_progress, 2);
    }

    #[test]
    fn test_fully_covered_is_paid_off() {
        let (loan, installments) = zero_rate_loan(dec!(1200), 12);
        let reps = vec![repayment("R1", dec!(1200), date(2025, 6, 1))];
        let snap = classify(&loan, &installments, &reps, date(2025, 6, 2), &HealthPolicy::default());
        assert_eq!(snap.health_status, LoanStatus::PaidOff);
        assert_eq!(snap.remaining_balance, Decimal::ZERO);
        assert_eq!(snap.days_behind, 0);
    }

    #[test]
    fn test_paid_off_is_terminal() {
        let (mut loan, installments) = zero_rate_loan(dec!(1200), 12);
        loan.status = LoanStatus::PaidOff;
        let snap = classify(
            &loan,
            &installments,
            &[],
            date(2026, 1, 1),
            &HealthPolicy::default(),
        );
        assert_eq!(snap.health_status, LoanStatus::PaidOff);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let (loan, installments) = zero_rate_loan(dec!(1200), 12);
        let reps = vec![repayment("R1", dec!(100), date(2025, 1, 10))];
        let policy = HealthPolicy::default();
        let a = classify(&loan, &installments, &reps, date(2025, 3, 1), &policy);
        let b = classify(&loan, &installments, &reps, date(2025, 3, 1), &policy);
        assert_eq!(a, b);
    }
}
