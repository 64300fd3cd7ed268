use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::transport::RegistryTransport;

/// What a single lease renewal came back with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    Renewed,
    /// The registry answered with something other than 200.
    Rejected(StatusCode),
    /// No answer at all.
    Failed,
}

#[derive(Debug, Clone)]
pub(crate) struct LeaseTarget {
    pub app: String,
    pub host: String,
}

pub(crate) async fn renew_lease<T: RegistryTransport>(transport: &T, target: &LeaseTarget) -> HeartbeatOutcome {
    match transport.renew(&target.app, &target.host).await {
        Ok(StatusCode::OK) => {
            tracing::debug!(app = %target.app, host = %target.host, "lease renewed");
            metrics::counter!("frontend_registry_heartbeats_total", "outcome" => "renewed").increment(1);
            HeartbeatOutcome::Renewed
        }
        Ok(status) => {
            tracing::warn!("Heartbeat failed: {}", status);
            metrics::counter!("frontend_registry_heartbeats_total", "outcome" => "rejected").increment(1);
            HeartbeatOutcome::Rejected(status)
        }
        Err(e) => {
            tracing::error!("Heartbeat error: {}", e);
            metrics::counter!("frontend_registry_heartbeats_total", "outcome" => "failed").increment(1);
            HeartbeatOutcome::Failed
        }
    }
}

/// A running heartbeat timer.
///
/// Dropping the handle cancels the timer; once cancelled, no further
/// renewals are started.
#[derive(Debug)]
pub struct HeartbeatHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl HeartbeatHandle {
    /// Arms a timer that renews the lease every `period`, first firing one
    /// full period from now. Must be called from within a tokio runtime.
    pub(crate) fn spawn<T: RegistryTransport>(transport: Arc<T>, target: LeaseTarget, period: Duration) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let first_tick = Instant::now() + period;

        let task = tokio::spawn(async move {
            let mut ticks = time::interval_at(first_tick, period);
            // A renewal that overruns the period pushes the schedule back
            // instead of queueing a burst.
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticks.tick() => {}
                }

                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = renew_lease(transport.as_ref(), &target) => {}
                }
            }

            tracing::debug!(app = %target.app, "heartbeat timer exited");
        });

        Self { cancel, task }
    }

    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for HeartbeatHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
    }
}
