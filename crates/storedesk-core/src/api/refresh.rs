//! Single-flight coordination of token refreshes.
//!
//! The first request to hit a 401 starts the refresh; every request that
//! fails while it is running awaits the same future and gets the same
//! outcome. The slot is emptied once the refresh settles so the next expiry
//! starts a fresh one.

use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::debug;

use super::ApiError;

/// New access token, or the shared cause of the failure
pub(crate) type RefreshOutcome = Result<String, Arc<ApiError>>;

type InFlight = Shared<BoxFuture<'static, RefreshOutcome>>;

#[derive(Default)]
struct Slot {
    running: Option<InFlight>,
    /// Token produced by the last successful refresh
    last_issued: Option<String>,
}

#[derive(Default)]
pub(crate) struct RefreshCoordinator {
    slot: Mutex<Slot>,
}

impl RefreshCoordinator {
    /// Get a token to replace `stale`: join the running refresh, reuse the
    /// token a finished refresh already issued, or start one with `start`.
    ///
    /// The decision is made under one lock, so a refresh that settles
    /// concurrently never causes a second one for the same stale token.
    pub(crate) async fn run<F>(&self, stale: &str, start: F) -> RefreshOutcome
    where
        F: FnOnce() -> BoxFuture<'static, RefreshOutcome>,
    {
        let refresh = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(ref running) = slot.running {
                debug!("Joining in-flight token refresh");
                running.clone()
            } else if let Some(issued) = slot.last_issued.as_ref().filter(|t| t.as_str() != stale) {
                debug!("Token already refreshed, reusing it");
                return Ok(issued.clone());
            } else {
                let started = start().shared();
                slot.running = Some(started.clone());
                started
            }
        };

        let outcome = refresh.clone().await;

        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.running.as_ref().is_some_and(|current| current.ptr_eq(&refresh)) {
            slot.running = None;
            if let Ok(ref token) = outcome {
                slot.last_issued = Some(token.clone());
            }
        }
        outcome
    }

    /// Forget the last issued token when the session is replaced
    pub(crate) fn reset(&self) {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).last_issued = None;
    }

    #[cfg(test)]
    pub(crate) fn is_idle(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .running
            .is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counting_refresh(calls: Arc<AtomicUsize>, outcome: RefreshOutcome) -> BoxFuture<'static, RefreshOutcome> {
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            outcome
        }
        .boxed()
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let coordinator = RefreshCoordinator::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let outcomes = futures::future::join_all((0..5).map(|_| {
            let calls = calls.clone();
            coordinator.run("expired", move || counting_refresh(calls, Ok("fresh".to_string())))
        }))
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(outcomes.iter().all(|o| matches!(o.as_deref(), Ok("fresh"))));
        assert!(coordinator.is_idle());
    }

    #[tokio::test]
    async fn test_failure_is_shared_and_slot_cleared() {
        let coordinator = RefreshCoordinator::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let outcomes = futures::future::join_all((0..3).map(|_| {
            let calls = calls.clone();
            coordinator.run("expired", move || counting_refresh(calls, Err(Arc::new(ApiError::Unauthorized))))
        }))
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(outcomes.iter().all(|o| o.is_err()));
        assert!(coordinator.is_idle());

        // A later expiry starts a new refresh
        let outcome = coordinator
            .run("expired", || counting_refresh(calls.clone(), Ok("second".to_string())))
            .await;
        assert!(matches!(outcome.as_deref(), Ok("second")));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_late_caller_reuses_finished_refresh() {
        let coordinator = RefreshCoordinator::default();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = coordinator
            .run("expired", || counting_refresh(calls.clone(), Ok("fresh".to_string())))
            .await;
        assert!(matches!(first.as_deref(), Ok("fresh")));

        // Its 401 was for the old token; the refresh already happened
        let late = coordinator
            .run("expired", || counting_refresh(calls.clone(), Ok("unexpected".to_string())))
            .await;
        assert!(matches!(late.as_deref(), Ok("fresh")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // The refreshed token itself was rejected: refresh again
        let again = coordinator
            .run("fresh", || counting_refresh(calls.clone(), Ok("fresher".to_string())))
            .await;
        assert!(matches!(again.as_deref(), Ok("fresher")));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_reset_forgets_issued_token() {
        let coordinator = RefreshCoordinator::default();
        let calls = Arc::new(AtomicUsize::new(0));

        coordinator
            .run("expired", || counting_refresh(calls.clone(), Ok("old-session".to_string())))
            .await
            .unwrap();
        coordinator.reset();

        let outcome = coordinator
            .run("expired", || counting_refresh(calls.clone(), Ok("new-session".to_string())))
            .await;
        assert!(matches!(outcome.as_deref(), Ok("new-session")));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
