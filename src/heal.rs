//! decides which alerts get remediated and drives the restarts
use once_cell::sync::Lazy;
use prometheus::IntCounterVec;

use crate::{alert::AlertBatch, restart_gate::RestartGate};

static RESTARTS: Lazy<IntCounterVec> = Lazy::new(|| {
    use prometheus::{opts, register_int_counter_vec};

    register_int_counter_vec!(
        opts!("restarts", "total number of restart invocations by outcome")
            .namespace("remediator")
            .subsystem("heal"),
        &["result"]
    )
    .expect("failed to register restart counter")
});

/// dispatches restarts for the remediable alerts of a batch
#[derive(Clone)]
pub struct HealDispatcher {
    gate: RestartGate,
}

impl HealDispatcher {
    pub fn new(gate: RestartGate) -> Self {
        Self { gate }
    }

    /// run the filter → restart pipeline over one batch
    ///
    /// Alerts are processed strictly in batch order, one restart at a
    /// time. A failed invocation is logged and counted but never stops
    /// the remaining alerts, and nothing here reaches the webhook caller.
    pub async fn dispatch(&self, batch: AlertBatch) {
        for alert in batch.alerts.iter().filter(|alert| alert.wants_heal()) {
            let target = alert.job();

            tracing::info!(container = target, "restarting container");
            let outcome = self.gate.restart(target).await;

            if outcome.success {
                RESTARTS.with_label_values(&["success"]).inc();
                tracing::info!(container = outcome.target.as_str(), "restarted container");
            } else {
                RESTARTS.with_label_values(&["failure"]).inc();
                tracing::warn!(
                    container = outcome.target.as_str(),
                    output = outcome.combined_output.as_str(),
                    error = ?outcome.error,
                    "failed to restart container"
                );
            }
        }
    }
}
