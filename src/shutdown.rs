//! Process lifecycle: `Running → Draining → Stopped`.
//!
//! The coordinator does not listen for signals itself. The binary calls
//! [`ShutdownCoordinator::begin_drain`] on SIGTERM / Ctrl-C, and tests call it directly.
//!
//! Every request admitted by the pipeline holds an [`InFlightGuard`]. The guard is
//! released on drop, so a request future cancelled by a client disconnect or a timeout
//! still leaves the count correct.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{Notify, watch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    Draining,
    Stopped,
}

#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error("drain timed out after {timeout:?} with {outstanding} request(s) in flight")]
    DrainTimeout { timeout: Duration, outstanding: usize },
}

#[derive(Debug)]
pub struct ShutdownCoordinator {
    phase: watch::Sender<Phase>,
    in_flight: AtomicUsize,
    idle: Notify,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (phase, _) = watch::channel(Phase::Running);
        Self {
            phase,
            in_flight: AtomicUsize::new(0),
            idle: Notify::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Registers a request. Returns `None` once draining has begun.
    pub fn try_enter(self: &Arc<Self>) -> Option<InFlightGuard> {
        // Count before checking the phase so a concurrent drain cannot miss this request.
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlightGuard {
            coordinator: Arc::clone(self),
        };

        if self.phase() == Phase::Running {
            Some(guard)
        } else {
            None
        }
    }

    /// Moves `Running → Draining`. Returns `false` if already past `Running`.
    pub fn begin_drain(&self) -> bool {
        let started = self.phase.send_if_modified(|phase| {
            if *phase == Phase::Running {
                *phase = Phase::Draining;
                true
            } else {
                false
            }
        });
        if started {
            tracing::info!(in_flight = self.in_flight(), "Shutdown requested, draining");
        }
        started
    }

    /// Marks the process as stopped. Idempotent.
    pub fn stop(&self) {
        self.phase.send_replace(Phase::Stopped);
    }

    /// Resolves once draining has begun. Suitable for `with_graceful_shutdown`.
    pub fn draining(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut phase = self.phase.subscribe();
        async move {
            // An error means the coordinator was dropped, which also ends the server.
            let _ = phase.wait_for(|p| *p != Phase::Running).await;
        }
    }

    /// Waits until no request is in flight, for at most `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError::DrainTimeout`] with the number of requests still
    /// running when the timeout elapsed.
    pub async fn wait_drained(&self, timeout: Duration) -> Result<(), ShutdownError> {
        let drained = async {
            loop {
                let notified = self.idle.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();

                if self.in_flight() == 0 {
                    return;
                }
                notified.await;
            }
        };

        tokio::time::timeout(timeout, drained)
            .await
            .map_err(|_| ShutdownError::DrainTimeout {
                timeout,
                outstanding: self.in_flight(),
            })
    }
}

/// Keeps a request counted as in flight until dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    coordinator: Arc<ShutdownCoordinator>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.coordinator.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.coordinator.idle.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_counts_in_flight() {
        let coordinator = Arc::new(ShutdownCoordinator::new());

        let first = coordinator.try_enter().unwrap();
        let second = coordinator.try_enter().unwrap();
        assert_eq!(coordinator.in_flight(), 2);

        drop(first);
        assert_eq!(coordinator.in_flight(), 1);
        drop(second);
        assert_eq!(coordinator.in_flight(), 0);
    }

    #[test]
    fn test_rejects_after_drain_begins() {
        let coordinator = Arc::new(ShutdownCoordinator::new());

        assert!(coordinator.begin_drain());
        assert!(!coordinator.begin_drain());
        assert_eq!(coordinator.phase(), Phase::Draining);

        assert!(coordinator.try_enter().is_none());
        assert_eq!(coordinator.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_wait_drained_returns_when_last_request_finishes() {
        let coordinator = Arc::new(ShutdownCoordinator::new());
        let guard = coordinator.try_enter().unwrap();
        coordinator.begin_drain();

        let waiter = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.wait_drained(Duration::from_secs(5)).await })
        };

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_drained_times_out() {
        let coordinator = Arc::new(ShutdownCoordinator::new());
        let _guard = coordinator.try_enter().unwrap();
        coordinator.begin_drain();

        let err = coordinator
            .wait_drained(Duration::from_secs(30))
            .await
            .unwrap_err();

        let ShutdownError::DrainTimeout { outstanding, .. } = err;
        assert_eq!(outstanding, 1);
    }

    #[tokio::test]
    async fn test_draining_future_resolves() {
        let coordinator = ShutdownCoordinator::new();
        let draining = coordinator.draining();

        coordinator.begin_drain();
        tokio::time::timeout(Duration::from_secs(1), draining)
            .await
            .unwrap();

        coordinator.stop();
        assert_eq!(coordinator.phase(), Phase::Stopped);
    }
}
