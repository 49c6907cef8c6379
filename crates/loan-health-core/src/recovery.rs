//! Recovery tracking for delinquent loans.
//!
//! A delinquent loan (`late`, `at_risk`, `defaulted`) enters `recovering` the
//! moment a repayment clears its arrears and covers the current installment
//! on time. Each further consecutive on-time, in-full payment advances the
//! count; reaching the policy target (default 3) completes recovery back to
//! `active`. A late or short payment against a due installment resets the
//! count and hands the loan back to the classifier's band table. While
//! `recovering`, these rules take
//! precedence over the band table so a caught-up loan does not flap between
//! states.

use serde::{Deserialize, Serialize};

use crate::classifier::allocate;
use crate::policy::HealthPolicy;
use crate::types::{Installment, LoanStatus, Repayment};

/// How a single posted repayment measures up against the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentQuality {
    /// Cleared the then-oldest unsatisfied installment, and the newest
    /// installment it completed fell due on or after the posting date.
    OnTimeInFull,
    /// Completed one or more installments, all after their due dates.
    LateSettlement,
    /// Completed nothing (or nothing was owed).
    Partial,
}

/// Judge one repayment by comparing coverage before and after it posts.
///
/// FIFO allocation guarantees that when installment `k` completes, every
/// earlier installment is complete too, so "caught up and current paid on
/// time" reduces to: the highest-sequence installment this payment completed
/// is due on or after `posted_at`.
pub fn payment_quality(
    installments: &[Installment],
    prior_repayments: &[Repayment],
    repayment: &Repayment,
) -> PaymentQuality {
    let before = allocate(installments, prior_repayments);
    let mut all: Vec<Repayment> = prior_repayments.to_vec();
    all.push(repayment.clone());
    let after = allocate(installments, &all);

    let newly_satisfied = installments
        .iter()
        .zip(before.iter().zip(&after))
        .filter(|(_, (b, a))| !b.satisfied && a.satisfied)
        .map(|(inst, _)| inst)
        .last();

    match newly_satisfied {
        None => PaymentQuality::Partial,
        Some(inst) if inst.due_date >= repayment.posted_at => PaymentQuality::OnTimeInFull,
        Some(_) => PaymentQuality::LateSettlement,
    }
}

/// Status and progress after observing one repayment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryDecision {
    pub status: LoanStatus,
    pub progress: u8,
}

/// Pure transition for the recovery state machine.
///
/// `days_behind_after` and `all_satisfied` describe the post-payment
/// classification inputs; the band table is consulted only on the paths the
/// tracker does not own.
pub fn observe_repayment(
    status: LoanStatus,
    progress: u8,
    quality: PaymentQuality,
    days_behind_after: i64,
    all_satisfied: bool,
    policy: &HealthPolicy,
) -> RecoveryDecision {
    if status.is_terminal() {
        return RecoveryDecision {
            status,
            progress: 0,
        };
    }
    if all_satisfied {
        return RecoveryDecision {
            status: LoanStatus::PaidOff,
            progress: 0,
        };
    }

    match status {
        LoanStatus::Late | LoanStatus::AtRisk | LoanStatus::Defaulted => match quality {
            PaymentQuality::OnTimeInFull => {
                if policy.recovery_payments_required <= 1 {
                    RecoveryDecision {
                        status: LoanStatus::Active,
                        progress: 0,
                    }
                } else {
                    RecoveryDecision {
                        status: LoanStatus::Recovering,
                        progress: 1,
                    }
                }
            }
            _ => RecoveryDecision {
                status: policy.status_for_days_behind(days_behind_after),
                progress: 0,
            },
        },
        LoanStatus::Recovering => match quality {
            PaymentQuality::OnTimeInFull => {
                let next = progress.saturating_add(1);
                if next >= policy.recovery_payments_required {
                    RecoveryDecision {
                        status: LoanStatus::Active,
                        progress: 0,
                    }
                } else {
                    RecoveryDecision {
                        status: LoanStatus::Recovering,
                        progress: next,
                    }
                }
            }
            // Money toward an installment that has not fallen due yet is a
            // prepayment in progress, not a failed payment; the streak holds.
            PaymentQuality::Partial if days_behind_after == 0 => RecoveryDecision {
                status: LoanStatus::Recovering,
                progress,
            },
            _ => RecoveryDecision {
                status: policy.status_for_days_behind(days_behind_after),
                progress: 0,
            },
        },
        _ => RecoveryDecision {
            status: policy.status_for_days_behind(days_behind_after),
            progress: 0,
        },
    }
}
