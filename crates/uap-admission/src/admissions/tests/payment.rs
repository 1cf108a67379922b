use super::common::*;
use chrono::Duration;
use std::sync::Arc;

use crate::admissions::domain::ApplicationStatus;
use crate::admissions::payment::{PaymentEvent, PaymentSimulator};
use crate::admissions::repository::ApplicationStore;
use crate::admissions::sources::{Clock, ScriptedRandom};
use crate::admissions::{LifecycleError, LifecycleScheduler};
use crate::config::SchedulerConfig;
use crate::storage::{MemoryKeyValueStore, PersistenceAdapter};

#[test]
fn payment_settles_once_progress_reaches_complete() {
    let (service, _, clock) = build_service_with_random(ScriptedRandom::constant(1.0));
    let record = service
        .submit(submission("Nadia Islam", "CSE", "masters"))
        .expect("submission succeeds");

    let pending = service
        .begin_payment(record.id())
        .expect("payment starts")
        .expect("record exists");
    assert_eq!(pending.status(), ApplicationStatus::PaymentPending);
    assert!(service.payments().is_active(record.id()));

    let mut progress = Vec::new();
    let mut receipt = None;
    for _ in 0..4 {
        let now = clock.advance(Duration::milliseconds(450));
        for event in service.advance_payments(now).expect("advance") {
            match event {
                PaymentEvent::Progressed { progress: step, .. } => progress.push(step),
                PaymentEvent::Completed { receipt: text, .. } => receipt = Some(text),
                other => panic!("unexpected payment event {other:?}"),
            }
        }
    }

    assert_eq!(progress, vec![30, 60, 90]);
    let receipt = receipt.expect("payment completed");
    assert!(receipt.starts_with("UAP RECEIPT\n"));
    assert!(receipt.contains(&format!("AppID: {}", record.id())));
    assert!(receipt.contains("Program: masters"));
    assert!(receipt.contains("Dept: CSE"));
    assert!(receipt.contains("Amount: 700 BDT"));
    assert!(receipt.ends_with("PaidAt: 2025-01-15T09:00:01.800Z"));

    let paid = service
        .get(record.id())
        .expect("lookup")
        .expect("record exists");
    assert_eq!(paid.status(), ApplicationStatus::Paid);
    assert_eq!(paid.receipt(), Some(receipt.as_str()));
    assert_eq!(paid.paid_at(), Some(clock.now()));
    assert!(!service.payments().is_active(record.id()));
}

#[test]
fn zero_steps_leave_payment_pending() {
    let (service, _, _) = build_service_with_random(ScriptedRandom::constant(0.0));
    let record = service
        .submit(submission("Nadia Islam", "CSE", ""))
        .expect("submission succeeds");
    service.begin_payment(record.id()).expect("payment starts");

    for _ in 0..10 {
        service.advance_payments(start()).expect("advance");
    }

    let active = service.payments().active();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].progress, 0);
    let stored = service.get(record.id()).expect("lookup").expect("exists");
    assert_eq!(stored.status(), ApplicationStatus::PaymentPending);
}

#[test]
fn paying_twice_is_refused_and_status_stays_paid() {
    let (service, _, _) = build_service_with_random(ScriptedRandom::constant(1.0));
    let record = service
        .submit(submission("Nadia Islam", "CSE", ""))
        .expect("submission succeeds");
    service.begin_payment(record.id()).expect("payment starts");
    for _ in 0..4 {
        service.advance_payments(start()).expect("advance");
    }

    match service.begin_payment(record.id()) {
        Err(LifecycleError::PaymentRefused { status, .. }) => {
            assert_eq!(status, ApplicationStatus::Paid);
        }
        other => panic!("expected payment refusal, got {other:?}"),
    }
    let stored = service.get(record.id()).expect("lookup").expect("exists");
    assert_eq!(stored.status(), ApplicationStatus::Paid);
    assert!(!service.payments().is_active(record.id()));
}

#[test]
fn restarting_an_active_payment_is_refused() {
    let (service, _, _) = build_service();
    let record = service
        .submit(submission("Nadia Islam", "CSE", ""))
        .expect("submission succeeds");
    service.begin_payment(record.id()).expect("payment starts");

    assert!(matches!(
        service.begin_payment(record.id()),
        Err(LifecycleError::PaymentInProgress { .. })
    ));
}

#[test]
fn terminal_applications_cannot_pay() {
    let (service, _, _) = build_service();
    let record = service
        .submit(submission("Nadia Islam", "CSE", ""))
        .expect("submission succeeds");
    service.reject(record.id()).expect("reject");

    assert!(matches!(
        service.begin_payment(record.id()),
        Err(LifecycleError::PaymentRefused {
            status: ApplicationStatus::Rejected,
            ..
        })
    ));
}

#[test]
fn rejecting_mid_payment_cancels_the_session() {
    let (service, _, _) = build_service_with_random(ScriptedRandom::constant(1.0));
    let record = service
        .submit(submission("Nadia Islam", "CSE", ""))
        .expect("submission succeeds");
    service.begin_payment(record.id()).expect("payment starts");
    service.advance_payments(start()).expect("advance");

    service.reject(record.id()).expect("reject");
    assert!(service.payments().active().is_empty());
    for _ in 0..4 {
        assert!(service.advance_payments(start()).expect("advance").is_empty());
    }
    let stored = service.get(record.id()).expect("lookup").expect("exists");
    assert_eq!(stored.status(), ApplicationStatus::Rejected);
    assert!(stored.receipt().is_none());
}

#[test]
fn vanished_record_abandons_its_session() {
    let backend = Arc::new(MemoryKeyValueStore::default());
    let store = ApplicationStore::new(PersistenceAdapter::new(backend));
    let record = store
        .create(
            submission("Nadia Islam", "CSE", "")
                .validate()
                .expect("valid submission"),
            start(),
        )
        .expect("record stored");

    let simulator = PaymentSimulator::new();
    simulator
        .begin(&store, record.id())
        .expect("payment starts");
    store.delete(record.id()).expect("delete");

    let random = ScriptedRandom::constant(1.0);
    for _ in 0..3 {
        let events = simulator
            .advance(&store, &random, start())
            .expect("advance");
        assert!(matches!(
            events.as_slice(),
            [PaymentEvent::Progressed { .. }]
        ));
    }

    let events = simulator
        .advance(&store, &random, start())
        .expect("advance");
    assert_eq!(
        events,
        vec![PaymentEvent::Abandoned {
            application_id: record.id().clone(),
            status: None,
        }]
    );
}

#[test]
fn settling_a_record_that_left_pending_writes_nothing() {
    let backend = Arc::new(CountingStore::default());
    let store = ApplicationStore::new(PersistenceAdapter::new(backend.clone()));
    let record = store
        .create(
            submission("Nadia Islam", "CSE", "")
                .validate()
                .expect("valid submission"),
            start(),
        )
        .expect("record stored");

    let simulator = PaymentSimulator::new();
    simulator
        .begin(&store, record.id())
        .expect("payment starts");
    store
        .update(record.id(), |stored| -> Result<(), LifecycleError> {
            Ok(stored.transition(ApplicationStatus::Rejected)?)
        })
        .expect("reject behind the simulator");

    let writes_before = backend.writes();
    let random = ScriptedRandom::constant(1.0);
    let mut events = Vec::new();
    for _ in 0..4 {
        events = simulator
            .advance(&store, &random, start())
            .expect("advance");
    }

    assert_eq!(
        events,
        vec![PaymentEvent::Abandoned {
            application_id: record.id().clone(),
            status: Some(ApplicationStatus::Rejected),
        }]
    );
    assert_eq!(backend.writes(), writes_before);
    let stored = store.find(record.id()).expect("lookup").expect("exists");
    assert_eq!(stored.status(), ApplicationStatus::Rejected);
    assert_eq!(stored.receipt(), None);
}

#[test]
fn receipt_is_kept_once_verified() {
    let (service, _, _) = build_service_with_random(ScriptedRandom::constant(1.0));
    let record = service
        .submit(with_photo(submission("Nadia Islam", "CSE", "")))
        .expect("submission succeeds");
    service.begin_payment(record.id()).expect("payment starts");
    for _ in 0..4 {
        service.advance_payments(start()).expect("advance");
    }
    let paid = service.get(record.id()).expect("lookup").expect("exists");

    service.sweep().expect("sweep");
    let verified = service.get(record.id()).expect("lookup").expect("exists");
    assert_eq!(verified.status(), ApplicationStatus::Verified);
    assert_eq!(verified.receipt(), paid.receipt());
    assert_eq!(verified.paid_at(), paid.paid_at());
}

#[test]
fn scheduler_runs_jobs_on_their_own_cadence() {
    let (service, _, _) = build_service_with_random(ScriptedRandom::constant(1.0));
    let record = service
        .submit(with_photo(submission("Nadia Islam", "CSE", "")))
        .expect("submission succeeds");
    service.begin_payment(record.id()).expect("payment starts");

    let mut scheduler = LifecycleScheduler::new(&SchedulerConfig::default(), start());
    let at = |millis: i64| start() + Duration::milliseconds(millis);

    assert!(scheduler.tick(&service, at(100)).expect("tick").is_idle());

    let report = scheduler.tick(&service, at(450)).expect("tick");
    assert_eq!(report.swept, 0);
    assert_eq!(
        report.payments,
        vec![PaymentEvent::Progressed {
            application_id: record.id().clone(),
            progress: 30,
        }]
    );

    assert!(scheduler.tick(&service, at(600)).expect("tick").is_idle());

    for millis in [900, 1350] {
        scheduler.tick(&service, at(millis)).expect("tick");
    }
    let report = scheduler.tick(&service, at(1800)).expect("tick");
    assert!(matches!(
        report.payments.as_slice(),
        [PaymentEvent::Completed { .. }]
    ));

    let report = scheduler.tick(&service, at(2500)).expect("tick");
    assert_eq!(report.swept, 1);
    let stored = service.get(record.id()).expect("lookup").expect("exists");
    assert_eq!(stored.status(), ApplicationStatus::Verified);
}

#[test]
fn scheduler_resumes_after_clock_steps_backwards() {
    let (service, _, _) = build_service_with_random(ScriptedRandom::constant(1.0));
    let record = service
        .submit(submission("Nadia Islam", "CSE", ""))
        .expect("submission succeeds");
    service.begin_payment(record.id()).expect("payment starts");

    let mut scheduler = LifecycleScheduler::new(&SchedulerConfig::default(), start());
    let earlier = start() - Duration::minutes(10);

    assert!(scheduler.tick(&service, earlier).expect("tick").is_idle());

    let report = scheduler
        .tick(&service, earlier + Duration::milliseconds(450))
        .expect("tick");
    assert_eq!(
        report.payments,
        vec![PaymentEvent::Progressed {
            application_id: record.id().clone(),
            progress: 30,
        }]
    );
}
