//! Loan health orchestration.
//!
//! The only component that mutates loan state. Every mutation (repayment
//! posting, classification, refinance execution) runs under the loan's
//! record lock, so there is exactly one in-flight writer per loan. Reads
//! (snapshots, quotes) take the lock only long enough to copy, and quotes
//! are advisory — `execute_refinance` re-validates everything at commit.
//!
//! Commit discipline: every fallible step of a mutation (schedule math,
//! wallet debit) happens before the first store write, so a failure leaves
//! committed state untouched.

mod store;

pub use store::{LoanRecord, LoanStore};

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::amortization;
use crate::classifier;
use crate::error::LoanHealthError;
use crate::events::{EventSink, LoanEvent, RepaymentPosted};
use crate::ledger::RepaymentLedger;
use crate::policy::HealthPolicy;
use crate::recovery;
use crate::refinance::{self, RefinanceQuote};
use crate::types::{
    HealthSnapshot, Installment, Loan, LoanStatus, Money, RefinanceRecord, Repayment,
    ScheduleVersion,
};
use crate::wallet::BorrowerWallet;
use crate::LoanHealthResult;

/// Intake data for a loan originated by the upstream platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanOrigination {
    pub id: String,
    pub borrower_id: String,
    pub principal: Money,
    pub annual_rate_bps: Decimal,
    pub term_months: u32,
    pub originated_at: NaiveDate,
    pub first_due_date: NaiveDate,
}

pub struct LoanHealthService {
    policy: HealthPolicy,
    store: LoanStore,
    ledger: Arc<dyn RepaymentLedger>,
    wallet: Arc<dyn BorrowerWallet>,
    events: Arc<dyn EventSink>,
}

impl LoanHealthService {
    pub fn new(
        policy: HealthPolicy,
        ledger: Arc<dyn RepaymentLedger>,
        wallet: Arc<dyn BorrowerWallet>,
        events: Arc<dyn EventSink>,
    ) -> LoanHealthResult<Self> {
        policy.validate()?;
        Ok(LoanHealthService {
            policy,
            store: LoanStore::new(),
            ledger,
            wallet,
            events,
        })
    }

    pub fn policy(&self) -> &HealthPolicy {
        &self.policy
    }

    /// Register a freshly originated loan: schedule version 0, status active.
    pub fn register_loan(&self, origination: LoanOrigination) -> LoanHealthResult<Loan> {
        let schedule = amortization::compute_schedule(
            origination.principal,
            origination.annual_rate_bps,
            origination.term_months,
            origination.first_due_date,
        )?;

        let loan = Loan {
            id: origination.id.clone(),
            borrower_id: origination.borrower_id,
            principal: origination.principal,
            annual_rate_bps: origination.annual_rate_bps,
            term_months: origination.term_months,
            monthly_payment: schedule.monthly_payment,
            originated_at: origination.originated_at,
            status: LoanStatus::Active,
            schedule_version: 0,
            recovery_progress: 0,
        };

        let version = ScheduleVersion {
            loan_id: origination.id,
            version: 0,
            principal: loan.principal,
            monthly_payment: schedule.monthly_payment,
            created_at: loan.originated_at,
            superseded_at: None,
            installments: schedule.installments,
        };

        self.store.insert(LoanRecord {
            loan: loan.clone(),
            schedules: vec![version],
            refinances: Vec::new(),
        })?;

        Ok(loan)
    }

    /// Handle a payment confirmation from the external ledger collaborator.
    ///
    /// Safe under at-least-once delivery: a repayment id seen before is a
    /// silent no-op that returns the current snapshot.
    pub fn on_repayment_posted(
        &self,
        posted: &RepaymentPosted,
    ) -> LoanHealthResult<HealthSnapshot> {
        let record = self.store.get(&posted.loan_id)?;
        let mut rec = record.lock();
        let version = rec.loan.schedule_version;
        let installments = current_installments(&rec)?;

        let prior = self.ledger.repayments_for(&posted.loan_id, version);
        if self.ledger.contains(&posted.loan_id, &posted.repayment_id) {
            return Ok(classifier::classify(
                &rec.loan,
                &installments,
                &prior,
                posted.posted_at,
                &self.policy,
            ));
        }

        let repayment = Repayment {
            id: posted.repayment_id.clone(),
            loan_id: posted.loan_id.clone(),
            amount: posted.amount,
            posted_at: posted.posted_at,
            schedule_version: version,
        };
        let quality = recovery::payment_quality(&installments, &prior, &repayment);

        if !self.ledger.append(repayment) {
            // Lost a race with a concurrent delivery of the same id.
            let reps = self.ledger.repayments_for(&posted.loan_id, version);
            return Ok(classifier::classify(
                &rec.loan,
                &installments,
                &reps,
                posted.posted_at,
                &self.policy,
            ));
        }

        let reps = self.ledger.repayments_for(&posted.loan_id, version);
        let mut snapshot = classifier::classify(
            &rec.loan,
            &installments,
            &reps,
            posted.posted_at,
            &self.policy,
        );
        ensure_balance_invariant(&snapshot)?;

        let all_satisfied = snapshot.health_status == LoanStatus::PaidOff;
        let decision = recovery::observe_repayment(
            rec.loan.status,
            rec.loan.recovery_progress,
            quality,
            snapshot.days_behind,
            all_satisfied,
            &self.policy,
        );

        let old_status = rec.loan.status;
        rec.loan.status = decision.status;
        rec.loan.recovery_progress = decision.progress;
        snapshot.health_status = decision.status;
        snapshot.recovery_progress = decision.progress;

        if old_status != decision.status {
            self.events.emit(LoanEvent::HealthChanged {
                loan_id: rec.loan.id.clone(),
                old_status,
                new_status: decision.status,
                days_behind: snapshot.days_behind,
            });
        }

        Ok(snapshot)
    }

    /// Reclassify one loan as of a date; the periodic external caller invokes
    /// this per loan. Idempotent: rerunning with the same inputs emits
    /// nothing new.
    pub fn run_classification(
        &self,
        loan_id: &str,
        as_of: NaiveDate,
    ) -> LoanHealthResult<HealthSnapshot> {
        let record = self.store.get(loan_id)?;
        let mut rec = record.lock();
        let installments = current_installments(&rec)?;
        let reps = self
            .ledger
            .repayments_for(loan_id, rec.loan.schedule_version);

        let mut snapshot =
            classifier::classify(&rec.loan, &installments, &reps, as_of, &self.policy);
        ensure_balance_invariant(&snapshot)?;

        // A missed installment while recovering breaks the streak; the band
        // table takes back over.
        let (new_status, new_progress) = if rec.loan.status == LoanStatus::Recovering
            && snapshot.health_status == LoanStatus::Recovering
            && snapshot.missed_payments > 0
        {
            (self.policy.status_for_days_behind(snapshot.days_behind), 0)
        } else if snapshot.health_status == LoanStatus::Recovering {
            (LoanStatus::Recovering, rec.loan.recovery_progress)
        } else {
            (snapshot.health_status, 0)
        };

        let old_status = rec.loan.status;
        rec.loan.status = new_status;
        rec.loan.recovery_progress = new_progress;
        snapshot.health_status = new_status;
        snapshot.recovery_progress = new_progress;

        if old_status != new_status {
            self.events.emit(LoanEvent::HealthChanged {
                loan_id: rec.loan.id.clone(),
                old_status,
                new_status,
                days_behind: snapshot.days_behind,
            });
        }

        Ok(snapshot)
    }

    /// Advisory refinance quote; never mutates.
    pub fn get_refinance_options(
        &self,
        loan_id: &str,
        as_of: NaiveDate,
    ) -> LoanHealthResult<RefinanceQuote> {
        let record = self.store.get(loan_id)?;
        let (loan, schedule) = {
            let rec = record.lock();
            let schedule = rec
                .current_schedule()
                .ok_or_else(|| missing_schedule(&rec.loan.id))?
                .clone();
            (rec.loan.clone(), schedule)
        };
        let reps = self.ledger.repayments_for(loan_id, loan.schedule_version);
        refinance::quote(&loan, &schedule, &reps, &self.policy, as_of)
    }

    /// Commit a refinance at one of the quoted terms.
    ///
    /// Re-quotes under the lock, so a balance or term that moved since the
    /// advisory quote surfaces as `StaleQuote` rather than a silent repricing.
    pub fn execute_refinance(
        &self,
        loan_id: &str,
        new_term: u32,
        reason: Option<String>,
        as_of: NaiveDate,
    ) -> LoanHealthResult<RefinanceRecord> {
        let record = self.store.get(loan_id)?;
        let mut rec = record.lock();
        let schedule = rec
            .current_schedule()
            .ok_or_else(|| missing_schedule(&rec.loan.id))?
            .clone();
        let reps = self
            .ledger
            .repayments_for(loan_id, rec.loan.schedule_version);

        let quote = refinance::quote(&rec.loan, &schedule, &reps, &self.policy, as_of)?;
        refinance::select_option(&quote, new_term)?;

        let first_due = as_of.checked_add_months(Months::new(1)).ok_or_else(|| {
            LoanHealthError::DateError(format!("First due date overflow from {as_of}"))
        })?;
        let replacement = amortization::compute_schedule(
            quote.remaining_balance,
            rec.loan.annual_rate_bps,
            new_term,
            first_due,
        )?;

        // Last fallible step; everything after this commits atomically.
        self.wallet.debit(&rec.loan.borrower_id, quote.fee)?;

        let next_version = rec.loan.schedule_version + 1;
        let replacement_version = ScheduleVersion {
            loan_id: rec.loan.id.clone(),
            version: next_version,
            principal: quote.remaining_balance,
            monthly_payment: replacement.monthly_payment,
            created_at: as_of,
            superseded_at: None,
            installments: replacement.installments,
        };
        if let Some(current) = rec.schedules.last_mut() {
            current.superseded_at = Some(as_of);
        }
        rec.schedules.push(replacement_version);

        let refinance_record = RefinanceRecord {
            loan_id: rec.loan.id.clone(),
            previous_term: quote.remaining_term,
            new_term,
            previous_monthly_payment: rec.loan.monthly_payment,
            new_monthly_payment: replacement.monthly_payment,
            fee: quote.fee,
            reason,
            created_at: as_of,
        };
        rec.refinances.push(refinance_record.clone());

        let old_status = rec.loan.status;
        rec.loan.schedule_version = next_version;
        rec.loan.term_months = new_term;
        rec.loan.monthly_payment = replacement.monthly_payment;
        rec.loan.status = LoanStatus::Active;
        rec.loan.recovery_progress = 0;

        self.events.emit(LoanEvent::RefinanceCompleted {
            loan_id: rec.loan.id.clone(),
            record: refinance_record.clone(),
        });
        if old_status != LoanStatus::Active {
            self.events.emit(LoanEvent::HealthChanged {
                loan_id: rec.loan.id.clone(),
                old_status,
                new_status: LoanStatus::Active,
                days_behind: 0,
            });
        }

        Ok(refinance_record)
    }

    // -----------------------------------------------------------------------
    // Read-only projections for the dashboard/admin surface
    // -----------------------------------------------------------------------

    pub fn loan(&self, loan_id: &str) -> LoanHealthResult<Loan> {
        Ok(self.store.get(loan_id)?.lock().loan.clone())
    }

    pub fn loans(&self) -> Vec<Loan> {
        self.store.loans()
    }

    pub fn loans_by_status(&self, status: LoanStatus) -> Vec<Loan> {
        self.store.loans_by_status(status)
    }

    /// Classification of the stored state, without applying transitions.
    pub fn snapshot(&self, loan_id: &str, as_of: NaiveDate) -> LoanHealthResult<HealthSnapshot> {
        let record = self.store.get(loan_id)?;
        let rec = record.lock();
        let installments = current_installments(&rec)?;
        let reps = self
            .ledger
            .repayments_for(loan_id, rec.loan.schedule_version);
        Ok(classifier::classify(
            &rec.loan,
            &installments,
            &reps,
            as_of,
            &self.policy,
        ))
    }

    /// A schedule version (current when `version` is `None`); old versions
    /// stay readable for audit.
    pub fn schedule(
        &self,
        loan_id: &str,
        version: Option<u32>,
    ) -> LoanHealthResult<ScheduleVersion> {
        let record = self.store.get(loan_id)?;
        let rec = record.lock();
        match version {
            None => rec
                .current_schedule()
                .cloned()
                .ok_or_else(|| missing_schedule(loan_id)),
            Some(v) => rec
                .schedules
                .iter()
                .find(|s| s.version == v)
                .cloned()
                .ok_or_else(|| LoanHealthError::InvalidInput {
                    field: "version".into(),
                    reason: format!("Loan '{loan_id}' has no schedule version {v}"),
                }),
        }
    }

    pub fn refinance_history(&self, loan_id: &str) -> LoanHealthResult<Vec<RefinanceRecord>> {
        Ok(self.store.get(loan_id)?.lock().refinances.clone())
    }
}

fn current_installments(rec: &LoanRecord) -> LoanHealthResult<Vec<Installment>> {
    rec.current_schedule()
        .map(|s| s.installments.clone())
        .ok_or_else(|| missing_schedule(&rec.loan.id))
}

fn missing_schedule(loan_id: &str) -> LoanHealthError {
    LoanHealthError::InvariantViolation(format!("Loan '{loan_id}' has no schedule versions"))
}

fn ensure_balance_invariant(snapshot: &HealthSnapshot) -> LoanHealthResult<()> {
    if snapshot.remaining_balance < Decimal::ZERO {
        return Err(LoanHealthError::InvariantViolation(format!(
            "Loan '{}' computed a negative remaining balance {}",
            snapshot.loan_id, snapshot.remaining_balance
        )));
    }
    Ok(())
}
