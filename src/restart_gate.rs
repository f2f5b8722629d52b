//! per-target single-flight collapsing of concurrent restarts
//!
//! The container runtime is a shared resource with no synchronization of
//! its own. Two webhook deliveries naming the same target would otherwise
//! race independent restarts; the gate collapses them into one in-flight
//! invocation whose [RestartOutcome] every waiter observes.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use futures::{
    future::{BoxFuture, Shared},
    FutureExt,
};

use crate::container::{ContainerManager, RestartOutcome};

type InFlightRestart = Shared<BoxFuture<'static, RestartOutcome>>;

/// serializes restarts per target name
///
/// A call for a target with no restart in flight starts one; concurrent
/// calls for the same target await that same invocation. The entry is
/// removed once the invocation finishes, so a later call issues a fresh
/// restart (no dedup across time, only across overlap).
#[derive(Clone)]
pub struct RestartGate {
    manager: Arc<dyn ContainerManager>,
    in_flight: Arc<Mutex<HashMap<String, InFlightRestart>>>,
}

impl RestartGate {
    pub fn new(manager: Arc<dyn ContainerManager>) -> Self {
        Self {
            manager,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// restart `target`, joining an already in-flight restart for the
    /// same target if one exists
    pub async fn restart(&self, target: &str) -> RestartOutcome {
        let restart = {
            let mut in_flight = self.in_flight.lock().unwrap();

            match in_flight.get(target) {
                Some(restart) => restart.clone(),
                None => {
                    let manager = Arc::clone(&self.manager);
                    let entries = Arc::clone(&self.in_flight);
                    let target = target.to_string();
                    let key = target.clone();

                    let restart = async move {
                        let outcome = manager.restart(&target).await;
                        entries.lock().unwrap().remove(&target);
                        outcome
                    }
                    .boxed()
                    .shared();

                    in_flight.insert(key, restart.clone());
                    restart
                }
            }
        };

        restart.await
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use async_trait::async_trait;

    use super::*;

    struct SlowManager {
        invocations: AtomicUsize,
    }

    #[async_trait]
    impl ContainerManager for SlowManager {
        async fn restart(&self, target: &str) -> RestartOutcome {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;

            RestartOutcome {
                target: target.to_string(),
                success: true,
                combined_output: String::new(),
                error: None,
            }
        }
    }

    #[tokio::test]
    async fn concurrent_same_target_restarts_collapse() {
        let manager = Arc::new(SlowManager {
            invocations: AtomicUsize::new(0),
        });
        let gate = RestartGate::new(manager.clone());

        let (a, b) = tokio::join!(gate.restart("checkout-api"), gate.restart("checkout-api"));

        assert_eq!(manager.invocations.load(Ordering::SeqCst), 1);
        assert!(a.success);
        assert!(b.success);
        assert_eq!(a.target, "checkout-api");
        assert_eq!(b.target, "checkout-api");
    }

    #[tokio::test]
    async fn concurrent_distinct_targets_run_independently() {
        let manager = Arc::new(SlowManager {
            invocations: AtomicUsize::new(0),
        });
        let gate = RestartGate::new(manager.clone());

        tokio::join!(gate.restart("checkout-api"), gate.restart("cart-api"));

        assert_eq!(manager.invocations.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn sequential_restarts_are_not_deduplicated() {
        let manager = Arc::new(SlowManager {
            invocations: AtomicUsize::new(0),
        });
        let gate = RestartGate::new(manager.clone());

        gate.restart("checkout-api").await;
        gate.restart("checkout-api").await;

        assert_eq!(manager.invocations.load(Ordering::SeqCst), 2);
    }
}
