//! Borrower wallet seam.
//!
//! The wallet belongs to the external funding collaborator; the refinance
//! flow only checks affordability and debits the fee. The debit is the last
//! fallible step before the commit, so a failure leaves loan state untouched.

use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::error::LoanHealthError;
use crate::types::Money;
use crate::LoanHealthResult;

pub trait BorrowerWallet: Send + Sync {
    fn available_balance(&self, borrower_id: &str) -> Money;

    /// Debit `amount`; fails with `InsufficientFunds` when not covered.
    fn debit(&self, borrower_id: &str, amount: Money) -> LoanHealthResult<()>;
}

/// Reference wallet for tests and single-process deployments.
#[derive(Default)]
pub struct InMemoryWallet {
    balances: Mutex<BTreeMap<String, Money>>,
}

impl InMemoryWallet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credit(&self, borrower_id: &str, amount: Money) {
        let mut balances = self.balances.lock();
        *balances.entry(borrower_id.to_string()).or_insert(Decimal::ZERO) += amount;
    }
}

impl BorrowerWallet for InMemoryWallet {
    fn available_balance(&self, borrower_id: &str) -> Money {
        self.balances
            .lock()
            .get(borrower_id)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    fn debit(&self, borrower_id: &str, amount: Money) -> LoanHealthResult<()> {
        let mut balances = self.balances.lock();
        let available = balances
            .get(borrower_id)
            .copied()
            .unwrap_or(Decimal::ZERO);
        if available < amount {
            return Err(LoanHealthError::InsufficientFunds {
                required: amount,
                available,
            });
        }
        balances.insert(borrower_id.to_string(), available - amount);
        Ok(())
    }
}
