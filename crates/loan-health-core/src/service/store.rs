//! In-process loan store with per-loan write serialization.
//!
//! Every loan lives behind its own mutex; holding it is the single-writer
//! boundary for that loan. An operation takes the record lock once, does all
//! of its reads and mutations, and releases — never re-acquiring while held.
//! Schedule versions form an append-only arena per loan: refinance pushes a
//! new version and stamps the old one, nothing is edited in place.

use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::LoanHealthError;
use crate::types::{Loan, LoanStatus, RefinanceRecord, ScheduleVersion};
use crate::LoanHealthResult;

/// One loan plus everything this core owns about it.
#[derive(Debug)]
pub struct LoanRecord {
    pub loan: Loan,
    /// Schedule version arena, oldest first; the last entry is current.
    pub schedules: Vec<ScheduleVersion>,
    pub refinances: Vec<RefinanceRecord>,
}

impl LoanRecord {
    pub fn current_schedule(&self) -> Option<&ScheduleVersion> {
        self.schedules.last()
    }
}

#[derive(Default)]
pub struct LoanStore {
    records: RwLock<BTreeMap<String, Arc<Mutex<LoanRecord>>>>,
}

impl LoanStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: LoanRecord) -> LoanHealthResult<()> {
        let mut records = self.records.write();
        let id = record.loan.id.clone();
        if records.contains_key(&id) {
            return Err(LoanHealthError::InvalidInput {
                field: "id".into(),
                reason: format!("Loan '{id}' is already registered"),
            });
        }
        records.insert(id, Arc::new(Mutex::new(record)));
        Ok(())
    }

    pub fn get(&self, loan_id: &str) -> LoanHealthResult<Arc<Mutex<LoanRecord>>> {
        self.records
            .read()
            .get(loan_id)
            .cloned()
            .ok_or_else(|| LoanHealthError::UnknownLoan(loan_id.to_string()))
    }

    pub fn loan_ids(&self) -> Vec<String> {
        self.records.read().keys().cloned().collect()
    }

    /// Point-in-time copies of every loan, in id order.
    pub fn loans(&self) -> Vec<Loan> {
        let records: Vec<Arc<Mutex<LoanRecord>>> =
            self.records.read().values().cloned().collect();
        records.iter().map(|r| r.lock().loan.clone()).collect()
    }

    pub fn loans_by_status(&self, status: LoanStatus) -> Vec<Loan> {
        self.loans()
            .into_iter()
            .filter(|l| l.status == status)
            .collect()
    }
}
