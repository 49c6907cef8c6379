//! Outbound events and the sink seam.
//!
//! Downstream systems (notifications, credit tiers) consume these as
//! at-least-once deliveries; both event kinds are safe to replay. The sink is
//! a trait so the embedding application chooses the transport: a channel for
//! a worker, `MemorySink` for tests, `NullSink` to discard.

use chrono::NaiveDate;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::types::{LoanStatus, Money, RefinanceRecord};

/// Inbound confirmation from the external payment/ledger collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepaymentPosted {
    pub loan_id: String,
    pub repayment_id: String,
    pub amount: Money,
    pub posted_at: NaiveDate,
}

/// Events this core emits on loan state transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoanEvent {
    HealthChanged {
        loan_id: String,
        old_status: LoanStatus,
        new_status: LoanStatus,
        days_behind: i64,
    },
    RefinanceCompleted {
        loan_id: String,
        record: RefinanceRecord,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: LoanEvent);
}

/// Forwards events onto a crossbeam channel; a dropped receiver is ignored
/// (delivery is at-least-once, and the worker owns its own durability).
pub struct ChannelSink {
    tx: crossbeam_channel::Sender<LoanEvent>,
}

impl ChannelSink {
    pub fn new(tx: crossbeam_channel::Sender<LoanEvent>) -> Self {
        ChannelSink { tx }
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: LoanEvent) {
        let _ = self.tx.send(event);
    }
}

/// Discards everything.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: LoanEvent) {}
}

/// Collects events in memory; used by tests and synchronous embedders.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<LoanEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything collected so far.
    pub fn take(&self) -> Vec<LoanEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: LoanEvent) {
        self.events.lock().push(event);
    }
}
