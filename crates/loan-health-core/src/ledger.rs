//! Repayment ledger seam.
//!
//! The ledger is owned by the external payment collaborator; this core reads
//! posted entries and appends the ones it is told about, keyed by repayment
//! id so at-least-once delivery collapses to exactly-once state.

use parking_lot::Mutex;

use crate::types::Repayment;

pub trait RepaymentLedger: Send + Sync {
    /// Posted repayments for one loan and schedule version, oldest first.
    fn repayments_for(&self, loan_id: &str, schedule_version: u32) -> Vec<Repayment>;

    /// Whether a repayment id has already been posted for this loan.
    fn contains(&self, loan_id: &str, repayment_id: &str) -> bool;

    /// Append a repayment; returns false (and stores nothing) on a duplicate
    /// id for the same loan.
    fn append(&self, repayment: Repayment) -> bool;
}

/// Reference ledger for tests and single-process deployments.
#[derive(Default)]
pub struct InMemoryRepaymentLedger {
    entries: Mutex<Vec<Repayment>>,
}

impl InMemoryRepaymentLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RepaymentLedger for InMemoryRepaymentLedger {
    fn repayments_for(&self, loan_id: &str, schedule_version: u32) -> Vec<Repayment> {
        let entries = self.entries.lock();
        let mut matches: Vec<Repayment> = entries
            .iter()
            .filter(|r| r.loan_id == loan_id && r.schedule_version == schedule_version)
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.posted_at.cmp(&b.posted_at).then(a.id.cmp(&b.id)));
        matches
    }

    fn contains(&self, loan_id: &str, repayment_id: &str) -> bool {
        self.entries
            .lock()
            .iter()
            .any(|r| r.loan_id == loan_id && r.id == repayment_id)
    }

    fn append(&self, repayment: Repayment) -> bool {
        let mut entries = self.entries.lock();
        if entries
            .iter()
            .any(|r| r.loan_id == repayment.loan_id && r.id == repayment.id)
        {
            return false;
        }
        entries.push(repayment);
        true
    }
}
