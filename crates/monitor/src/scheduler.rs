//! Monitoring Loop
//!
//! Runs [`Monitor::run_cycle`] on a fixed interval until stopped. Each cycle
//! runs in its own task so a panic ends that cycle, not the loop. A stop
//! waits for the cycle in flight; past the shutdown grace the cycle is
//! aborted together with the loop.

use crate::error::CycleError;
use crate::monitor::Monitor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info, warn};

/// Start/stop control over the periodic cycle
pub struct MonitoringLoop {
    monitor: Arc<Monitor>,
    stop_tx: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl MonitoringLoop {
    pub fn new(monitor: Arc<Monitor>) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            monitor,
            stop_tx,
            handle: Mutex::new(None),
        }
    }

    pub fn monitor(&self) -> &Arc<Monitor> {
        &self.monitor
    }

    /// Spawn the loop. Returns false if it is already running.
    pub async fn start(&self) -> bool {
        let mut handle = self.handle.lock().await;
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            debug!("Monitoring loop already running");
            return false;
        }

        self.stop_tx.send_replace(false);
        let stop_rx = self.stop_tx.subscribe();
        let monitor = Arc::clone(&self.monitor);
        monitor.set_active(true);
        *handle = Some(tokio::spawn(run(monitor, stop_rx)));
        true
    }

    /// Signal the loop to stop after its current cycle and wait for it.
    /// Safe to call when not running.
    pub async fn stop(&self) {
        let Some(mut handle) = self.handle.lock().await.take() else {
            return;
        };

        info!("Stopping monitoring loop");
        self.stop_tx.send_replace(true);

        let grace = self.monitor.config().shutdown_grace();
        let outcome = tokio::time::timeout(grace, &mut handle).await;
        match outcome {
            Ok(Ok(())) => info!("Monitoring loop stopped"),
            Ok(Err(e)) => error!("Monitoring loop ended abnormally: {}", e),
            Err(_) => {
                warn!(
                    "Monitoring loop did not stop within {:?}, abandoning the cycle in flight",
                    grace
                );
                handle.abort();
                // Dropping the loop's future aborts its cycle task too
                let _ = handle.await;
            }
        }
        self.monitor.set_active(false);
    }

    pub fn is_running(&self) -> bool {
        self.monitor.is_active()
    }
}

async fn run(monitor: Arc<Monitor>, mut stop_rx: watch::Receiver<bool>) {
    let interval = monitor.config().interval();
    let backoff = monitor.config().failure_backoff();
    info!("Monitoring loop started, interval {:?}", interval);

    loop {
        if *stop_rx.borrow() {
            break;
        }

        let cycle_monitor = Arc::clone(&monitor);
        let cycle = tokio::spawn(async move { cycle_monitor.run_cycle().await });
        let _guard = CycleGuard(cycle.abort_handle());
        let wait = match cycle.await {
            Ok(report) => {
                debug!(
                    "Cycle done: {} new triggers, {} degraded steps",
                    report.new_triggers.len(),
                    report.degraded.len()
                );
                interval
            }
            Err(e) => {
                let err = CycleError::from(e);
                let failures = monitor.record_failure().await;
                error!("{} ({} consecutive), backing off {:?}", err, failures, backoff);
                backoff
            }
        };

        if wait_or_stop(&mut stop_rx, wait).await {
            break;
        }
    }

    monitor.set_active(false);
    info!("Monitoring loop exited");
}

/// Aborts the cycle task when dropped, so aborting the loop never leaves a
/// detached cycle writing to the sink. A no-op once the cycle has finished.
struct CycleGuard(AbortHandle);

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Sleep for `wait`; true if a stop was requested meanwhile
async fn wait_or_stop(stop_rx: &mut watch::Receiver<bool>, wait: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(wait) => *stop_rx.borrow(),
        changed = stop_rx.changed() => changed.is_err() || *stop_rx.borrow(),
    }
}
