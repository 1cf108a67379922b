use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use super::lifecycle::{AdmissionService, LifecycleError};
use super::payment::PaymentEvent;
use crate::config::SchedulerConfig;
use crate::storage::KeyValueStore;

/// Cooperative timer for the status sweep and payment simulator.
///
/// The host calls [`LifecycleScheduler::tick`] as often as it likes; each job runs at most once
/// per tick and only when its interval has elapsed since its last run.
#[derive(Debug, Clone)]
pub struct LifecycleScheduler {
    sweep_interval: Duration,
    payment_interval: Duration,
    last_sweep: DateTime<Utc>,
    last_payment: DateTime<Utc>,
}

/// What a tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub swept: usize,
    pub payments: Vec<PaymentEvent>,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        self.swept == 0 && self.payments.is_empty()
    }
}

impl LifecycleScheduler {
    pub fn new(config: &SchedulerConfig, started_at: DateTime<Utc>) -> Self {
        Self {
            sweep_interval: config.sweep_interval,
            payment_interval: config.payment_interval,
            last_sweep: started_at,
            last_payment: started_at,
        }
    }

    pub fn tick<S: KeyValueStore>(
        &mut self,
        service: &AdmissionService<S>,
        now: DateTime<Utc>,
    ) -> Result<TickReport, LifecycleError> {
        let mut report = TickReport::default();
        self.rewind(now);

        if due(self.last_payment, self.payment_interval, now) {
            self.last_payment = now;
            report.payments = service.advance_payments(now)?;
        }

        if due(self.last_sweep, self.sweep_interval, now) {
            self.last_sweep = now;
            report.swept = service.sweep()?;
        }

        if !report.is_idle() {
            debug!(
                swept = report.swept,
                payment_events = report.payments.len(),
                "scheduler tick"
            );
        }
        Ok(report)
    }

    /// Pull the last-run marks back to `now` when the clock steps backwards.
    fn rewind(&mut self, now: DateTime<Utc>) {
        if now < self.last_payment || now < self.last_sweep {
            warn!(
                %now,
                last_sweep = %self.last_sweep,
                last_payment = %self.last_payment,
                "clock moved backwards, rescheduling jobs"
            );
        }
        self.last_payment = self.last_payment.min(now);
        self.last_sweep = self.last_sweep.min(now);
    }
}

fn due(last: DateTime<Utc>, interval: Duration, now: DateTime<Utc>) -> bool {
    (now - last)
        .to_std()
        .map(|elapsed| elapsed >= interval)
        .unwrap_or(false)
}
