//! Delinquency and refinance policy knobs.
//!
//! Thresholds live here rather than at call sites; the embedding application
//! loads one `HealthPolicy` at startup (JSON via serde) and passes it through.
//! The defaults mirror the product configuration; `validate` rejects
//! combinations the classifier cannot interpret.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::LoanHealthError;
use crate::types::{LoanStatus, Rate};
use crate::LoanHealthResult;

/// Policy configuration for classification, recovery, and refinance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthPolicy {
    /// Days past the due date before an unpaid installment counts as missed.
    pub grace_period_days: i64,
    /// Upper bound of the `late` band (1..=late_threshold_days days behind).
    pub late_threshold_days: i64,
    /// Upper bound of the `at_risk` band; beyond it the loan is `defaulted`.
    pub at_risk_threshold_days: i64,
    /// Consecutive on-time, in-full payments required to complete recovery.
    pub recovery_payments_required: u8,
    /// Term extensions, in months, offered on top of the remaining term.
    pub refinance_term_offsets: Vec<u32>,
    /// Flat refinance fee as a fraction of the remaining balance.
    pub refinance_fee_rate: Rate,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        HealthPolicy {
            grace_period_days: 5,
            late_threshold_days: 30,
            at_risk_threshold_days: 90,
            recovery_payments_required: 3,
            refinance_term_offsets: vec![6, 12, 18],
            refinance_fee_rate: dec!(0.02),
        }
    }
}

impl HealthPolicy {
    pub fn validate(&self) -> LoanHealthResult<()> {
        if self.grace_period_days < 0 {
            return Err(LoanHealthError::InvalidInput {
                field: "grace_period_days".into(),
                reason: "Grace period cannot be negative".into(),
            });
        }
        if self.late_threshold_days < 1 {
            return Err(LoanHealthError::InvalidInput {
                field: "late_threshold_days".into(),
                reason: "Late threshold must be at least 1 day".into(),
            });
        }
        if self.at_risk_threshold_days <= self.late_threshold_days {
            return Err(LoanHealthError::InvalidInput {
                field: "at_risk_threshold_days".into(),
                reason: "At-risk threshold must exceed the late threshold".into(),
            });
        }
        if self.recovery_payments_required == 0 {
            return Err(LoanHealthError::InvalidInput {
                field: "recovery_payments_required".into(),
                reason: "Recovery requires at least one qualifying payment".into(),
            });
        }
        if self.refinance_term_offsets.is_empty() {
            return Err(LoanHealthError::InvalidInput {
                field: "refinance_term_offsets".into(),
                reason: "At least one term offset must be offered".into(),
            });
        }
        if self.refinance_term_offsets.contains(&0) {
            return Err(LoanHealthError::InvalidInput {
                field: "refinance_term_offsets".into(),
                reason: "Term offsets must be positive".into(),
            });
        }
        if self.refinance_fee_rate < Decimal::ZERO || self.refinance_fee_rate >= Decimal::ONE {
            return Err(LoanHealthError::InvalidInput {
                field: "refinance_fee_rate".into(),
                reason: "Fee rate must be in [0, 1)".into(),
            });
        }
        Ok(())
    }

    /// Map days behind onto the delinquency band table.
    pub fn status_for_days_behind(&self, days_behind: i64) -> LoanStatus {
        if days_behind <= 0 {
            LoanStatus::Active
        } else if days_behind <= self.late_threshold_days {
            LoanStatus::Late
        } else if days_behind <= self.at_risk_threshold_days {
            LoanStatus::AtRisk
        } else {
            LoanStatus::Defaulted
        }
    }
}
