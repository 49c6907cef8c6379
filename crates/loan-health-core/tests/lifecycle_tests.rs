use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use loan_health_core::events::{LoanEvent, MemorySink, RepaymentPosted};
use loan_health_core::ledger::InMemoryRepaymentLedger;
use loan_health_core::policy::HealthPolicy;
use loan_health_core::service::{LoanHealthService, LoanOrigination};
use loan_health_core::wallet::InMemoryWallet;
use loan_health_core::LoanStatus;

// ===========================================================================
// Fixtures
// ===========================================================================

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn service() -> (Arc<LoanHealthService>, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let svc = LoanHealthService::new(
        HealthPolicy::default(),
        Arc::new(InMemoryRepaymentLedger::new()),
        Arc::new(InMemoryWallet::new()),
        sink.clone(),
    )
    .unwrap();
    (Arc::new(svc), sink)
}

/// 1,200 at zero rate over 12 months: 12 x 100.00 due on the 15th from
/// January 2025.
fn register_zero_rate_loan(svc: &LoanHealthService, id: &str) {
    svc.register_loan(LoanOrigination {
        id: id.into(),
        borrower_id: format!("B-{id}"),
        principal: dec!(1200),
        annual_rate_bps: Decimal::ZERO,
        term_months: 12,
        originated_at: date(2024, 12, 15),
        first_due_date: date(2025, 1, 15),
    })
    .unwrap();
}

fn pay(svc: &LoanHealthService, loan: &str, id: &str, amount: Decimal, posted: NaiveDate) {
    svc.on_repayment_posted(&RepaymentPosted {
        loan_id: loan.into(),
        repayment_id: id.into(),
        amount,
        posted_at: posted,
    })
    .unwrap();
}

// ===========================================================================
// Delinquency escalation
// ===========================================================================

#[test]
fn test_escalates_through_bands_as_time_passes() {
    let (svc, _) = service();
    register_zero_rate_loan(&svc, "L001");

    let snap = svc.run_classification("L001", date(2025, 2, 1)).unwrap();
    assert_eq!(snap.days_behind, 17);
    assert_eq!(snap.health_status, LoanStatus::Late);

    let snap = svc.run_classification("L001", date(2025, 3, 1)).unwrap();
    assert_eq!(snap.days_behind, 45);
    assert_eq!(snap.health_status, LoanStatus::AtRisk);

    let snap = svc.run_classification("L001", date(2025, 4, 16)).unwrap();
    assert_eq!(snap.days_behind, 91);
    assert_eq!(snap.health_status, LoanStatus::Defaulted);
}

#[test]
fn test_escalation_emits_health_changed_per_transition() {
    let (svc, sink) = service();
    register_zero_rate_loan(&svc, "L001");

    svc.run_classification("L001", date(2025, 2, 1)).unwrap();
    svc.run_classification("L001", date(2025, 3, 1)).unwrap();
    svc.run_classification("L001", date(2025, 3, 2)).unwrap(); // no change
    let events = sink.take();
    assert_eq!(events.len(), 2);
    assert!(matches!(
        &events[1],
        LoanEvent::HealthChanged {
            old_status: LoanStatus::Late,
            new_status: LoanStatus::AtRisk,
            ..
        }
    ));
}

#[test]
fn test_on_time_payer_stays_active() {
    let (svc, sink) = service();
    register_zero_rate_loan(&svc, "L001");

    pay(&svc, "L001", "R1", dec!(100), date(2025, 1, 10));
    pay(&svc, "L001", "R2", dec!(100), date(2025, 2, 10));
    let snap = svc.run_classification("L001", date(2025, 2, 20)).unwrap();
    assert_eq!(snap.health_status, LoanStatus::Active);
    assert_eq!(snap.days_behind, 0);
    assert_eq!(snap.remaining_balance, dec!(1000));
    assert!(sink.take().is_empty());
}

// ===========================================================================
// Recovery path
// ===========================================================================

#[test]
fn test_three_on_time_payments_cure_a_late_loan() {
    let (svc, sink) = service();
    register_zero_rate_loan(&svc, "L001");

    svc.run_classification("L001", date(2025, 2, 1)).unwrap();
    let _ = sink.take();

    // Clears the January arrears and covers February before it falls due.
    let snap = svc
        .on_repayment_posted(&RepaymentPosted {
            loan_id: "L001".into(),
            repayment_id: "R1".into(),
            amount: dec!(200),
            posted_at: date(2025, 2, 10),
        })
        .unwrap();
    assert_eq!(snap.health_status, LoanStatus::Recovering);
    assert_eq!(snap.recovery_progress, 1);

    pay(&svc, "L001", "R2", dec!(100), date(2025, 3, 10));
    let snap = svc.snapshot("L001", date(2025, 3, 10)).unwrap();
    assert_eq!(snap.recovery_progress, 2);

    let snap = svc
        .on_repayment_posted(&RepaymentPosted {
            loan_id: "L001".into(),
            repayment_id: "R3".into(),
            amount: dec!(100),
            posted_at: date(2025, 4, 12),
        })
        .unwrap();
    assert_eq!(snap.health_status, LoanStatus::Active);
    assert_eq!(snap.recovery_progress, 0);

    let events = sink.take();
    let transitions: Vec<(LoanStatus, LoanStatus)> = events
        .iter()
        .filter_map(|e| match e {
            LoanEvent::HealthChanged {
                old_status,
                new_status,
                ..
            } => Some((*old_status, *new_status)),
            _ => None,
        })
        .collect();
    assert_eq!(
        transitions,
        vec![
            (LoanStatus::Late, LoanStatus::Recovering),
            (LoanStatus::Recovering, LoanStatus::Active),
        ]
    );
}

#[test]
fn test_missed_payment_resets_recovery_progress() {
    let (svc, _) = service();
    register_zero_rate_loan(&svc, "L001");

    svc.run_classification("L001", date(2025, 2, 1)).unwrap();
    pay(&svc, "L001", "R1", dec!(200), date(2025, 2, 10));
    pay(&svc, "L001", "R2", dec!(100), date(2025, 3, 10));
    let snap = svc.snapshot("L001", date(2025, 3, 10)).unwrap();
    assert_eq!(snap.health_status, LoanStatus::Recovering);
    assert_eq!(snap.recovery_progress, 2);

    // April's installment passes its grace window unpaid.
    let snap = svc.run_classification("L001", date(2025, 4, 21)).unwrap();
    assert_eq!(snap.health_status, LoanStatus::Late);
    assert_eq!(snap.recovery_progress, 0);
    assert_eq!(snap.days_behind, 6);
}

#[test]
fn test_short_payment_against_due_installment_resets() {
    let (svc, _) = service();
    register_zero_rate_loan(&svc, "L001");

    svc.run_classification("L001", date(2025, 2, 1)).unwrap();
    pay(&svc, "L001", "R1", dec!(200), date(2025, 2, 10));

    // 40 toward March's 100, posted after the due date.
    let snap = svc
        .on_repayment_posted(&RepaymentPosted {
            loan_id: "L001".into(),
            repayment_id: "R2".into(),
            amount: dec!(40),
            posted_at: date(2025, 3, 20),
        })
        .unwrap();
    assert_eq!(snap.health_status, LoanStatus::Late);
    assert_eq!(snap.recovery_progress, 0);
}

#[test]
fn test_early_partial_prepayment_does_not_break_streak() {
    let (svc, _) = service();
    register_zero_rate_loan(&svc, "L001");

    svc.run_classification("L001", date(2025, 2, 1)).unwrap();
    pay(&svc, "L001", "R1", dec!(200), date(2025, 2, 10));

    // 40 toward March's installment, posted well before it falls due.
    let snap = svc
        .on_repayment_posted(&RepaymentPosted {
            loan_id: "L001".into(),
            repayment_id: "R2".into(),
            amount: dec!(40),
            posted_at: date(2025, 3, 1),
        })
        .unwrap();
    assert_eq!(snap.health_status, LoanStatus::Recovering);
    assert_eq!(snap.recovery_progress, 1);

    // Topping it up on time still counts as the next streak payment.
    let snap = svc
        .on_repayment_posted(&RepaymentPosted {
            loan_id: "L001".into(),
            repayment_id: "R3".into(),
            amount: dec!(60),
            posted_at: date(2025, 3, 12),
        })
        .unwrap();
    assert_eq!(snap.health_status, LoanStatus::Recovering);
    assert_eq!(snap.recovery_progress, 2);
}

#[test]
fn test_recovering_loan_does_not_flap_to_active_between_payments() {
    let (svc, _) = service();
    register_zero_rate_loan(&svc, "L001");

    svc.run_classification("L001", date(2025, 2, 1)).unwrap();
    pay(&svc, "L001", "R1", dec!(200), date(2025, 2, 10));

    // Fully caught up (0 days behind), but only one qualifying payment in.
    let snap = svc.run_classification("L001", date(2025, 3, 1)).unwrap();
    assert_eq!(snap.days_behind, 0);
    assert_eq!(snap.health_status, LoanStatus::Recovering);
    assert_eq!(snap.recovery_progress, 1);
}

// ===========================================================================
// Pay-off
// ===========================================================================

#[test]
fn test_full_settlement_reaches_paid_off() {
    let (svc, sink) = service();
    register_zero_rate_loan(&svc, "L001");

    let snap = svc
        .on_repayment_posted(&RepaymentPosted {
            loan_id: "L001".into(),
            repayment_id: "R1".into(),
            amount: dec!(1200),
            posted_at: date(2025, 1, 10),
        })
        .unwrap();
    assert_eq!(snap.health_status, LoanStatus::PaidOff);
    assert_eq!(snap.remaining_balance, Decimal::ZERO);

    let events = sink.take();
    assert!(events.iter().any(|e| matches!(
        e,
        LoanEvent::HealthChanged {
            new_status: LoanStatus::PaidOff,
            ..
        }
    )));
}

#[test]
fn test_paid_off_is_terminal_for_classification_and_payments() {
    let (svc, sink) = service();
    register_zero_rate_loan(&svc, "L001");
    pay(&svc, "L001", "R1", dec!(1200), date(2025, 1, 10));
    let _ = sink.take();

    let snap = svc.run_classification("L001", date(2026, 1, 1)).unwrap();
    assert_eq!(snap.health_status, LoanStatus::PaidOff);

    // An overpayment confirmation arrives later; nothing moves.
    let snap = svc
        .on_repayment_posted(&RepaymentPosted {
            loan_id: "L001".into(),
            repayment_id: "R2".into(),
            amount: dec!(50),
            posted_at: date(2026, 1, 5),
        })
        .unwrap();
    assert_eq!(snap.health_status, LoanStatus::PaidOff);
    assert!(sink.take().is_empty());
}

// ===========================================================================
// Grace period
// ===========================================================================

#[test]
fn test_grace_window_defers_missed_but_not_days_behind() {
    let sink = Arc::new(MemorySink::new());
    let svc = LoanHealthService::new(
        HealthPolicy {
            grace_period_days: 14,
            ..HealthPolicy::default()
        },
        Arc::new(InMemoryRepaymentLedger::new()),
        Arc::new(InMemoryWallet::new()),
        sink,
    )
    .unwrap();
    register_zero_rate_loan(&svc, "L001");

    // 45 days past the January due date; February is still inside grace.
    let snap = svc.run_classification("L001", date(2025, 3, 1)).unwrap();
    assert_eq!(snap.days_behind, 45);
    assert_eq!(snap.missed_payments, 1);
    assert_eq!(snap.health_status, LoanStatus::AtRisk);
}
