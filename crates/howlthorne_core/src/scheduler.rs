//! Debounced leaderboard refresh.
//!
//! The first `schedule()` call arms a single timer; calls made while it is
//! pending are absorbed. When the quiet period ends the target runs once and
//! the scheduler returns to idle, whatever the outcome.

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::Mutex;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::Result;

/// Work performed when the quiet period ends.
#[async_trait]
pub trait RefreshTarget: Send + Sync + 'static {
    async fn refresh(&self) -> Result<()>;
}

enum State {
    Idle,
    Pending(JoinHandle<()>),
    Closed,
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            State::Idle => "idle",
            State::Pending(_) => "pending",
            State::Closed => "closed",
        }
    }
}

pub struct RefreshScheduler {
    quiet_period: Duration,
    target: Arc<dyn RefreshTarget>,
    state: Arc<Mutex<State>>,
}

impl fmt::Debug for RefreshScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshScheduler")
            .field("quiet_period", &self.quiet_period)
            .field("state", &self.state.lock().name())
            .finish()
    }
}

/// Puts a pending scheduler back to idle when the refresh task ends, even by
/// unwinding or abort.
struct ResetOnDrop(Arc<Mutex<State>>);

impl Drop for ResetOnDrop {
    fn drop(&mut self) {
        let mut state = self.0.lock();
        if matches!(*state, State::Pending(_)) {
            *state = State::Idle;
        }
    }
}

impl RefreshScheduler {
    pub fn new(quiet_period: Duration, target: Arc<dyn RefreshTarget>) -> Self {
        Self {
            quiet_period,
            target,
            state: Arc::new(Mutex::new(State::Idle)),
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Arms the timer if idle. Returns whether this call armed it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self) -> bool {
        let mut state = self.state.lock();
        if !matches!(*state, State::Idle) {
            debug!(state = state.name(), "refresh already scheduled or closed");
            return false;
        }

        let target = Arc::clone(&self.target);
        let shared = Arc::clone(&self.state);
        let quiet_period = self.quiet_period;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;
            let _reset = ResetOnDrop(shared);

            match AssertUnwindSafe(target.refresh()).catch_unwind().await {
                Ok(Ok(())) => debug!("leaderboard refresh complete"),
                Ok(Err(e)) => error!(error = ?e, "leaderboard refresh failed"),
                Err(_) => error!("leaderboard refresh panicked"),
            }
        });

        *state = State::Pending(handle);
        debug!(quiet_period_secs = quiet_period.as_secs_f64(), "refresh scheduled");
        true
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.state.lock(), State::Pending(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(*self.state.lock(), State::Closed)
    }

    /// Cancels any pending refresh and refuses further scheduling.
    pub fn shutdown(&self) {
        let previous = std::mem::replace(&mut *self.state.lock(), State::Closed);
        if let State::Pending(handle) = previous {
            handle.abort();
            info!("pending leaderboard refresh cancelled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl RefreshTarget for Counting {
        async fn refresh(&self) -> Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing {
        runs: AtomicUsize,
        panic: bool,
    }

    #[async_trait]
    impl RefreshTarget for Failing {
        async fn refresh(&self) -> Result<()> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.panic {
                panic!("refresh blew up");
            }
            Err(CoreError::RefreshFailed {
                reason: "channel unavailable".to_string(),
                cause: None,
            })
        }
    }

    async fn wait(secs: u64) {
        tokio::time::sleep(Duration::from_secs(secs)).await;
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_into_one_refresh() {
        let target = Arc::new(Counting::default());
        let scheduler = RefreshScheduler::new(Duration::from_secs(15), target.clone());

        assert!(scheduler.schedule());
        for _ in 0..9 {
            assert!(!scheduler.schedule());
        }
        assert!(scheduler.is_pending());

        wait(10).await;
        assert_eq!(target.runs.load(Ordering::SeqCst), 0);

        wait(6).await;
        assert_eq!(target.runs.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_call_wins_timing() {
        let target = Arc::new(Counting::default());
        let scheduler = RefreshScheduler::new(Duration::from_secs(15), target.clone());

        scheduler.schedule();
        wait(14).await;
        scheduler.schedule();
        wait(2).await;
        assert_eq!(target.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_returns_to_idle() {
        let target = Arc::new(Failing {
            runs: AtomicUsize::new(0),
            panic: false,
        });
        let scheduler = RefreshScheduler::new(Duration::from_secs(1), target.clone());

        scheduler.schedule();
        wait(2).await;
        assert!(!scheduler.is_pending());

        assert!(scheduler.schedule());
        wait(2).await;
        assert_eq!(target.runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panic_returns_to_idle() {
        let target = Arc::new(Failing {
            runs: AtomicUsize::new(0),
            panic: true,
        });
        let scheduler = RefreshScheduler::new(Duration::from_secs(1), target.clone());

        scheduler.schedule();
        wait(2).await;
        assert!(!scheduler.is_pending());
        assert!(scheduler.schedule());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_refresh() {
        let target = Arc::new(Counting::default());
        let scheduler = RefreshScheduler::new(Duration::from_secs(15), target.clone());

        scheduler.schedule();
        scheduler.shutdown();
        assert!(scheduler.is_closed());
        assert!(!scheduler.schedule());

        wait(30).await;
        assert_eq!(target.runs.load(Ordering::SeqCst), 0);
    }
}
