//! Per-source circuit breaker.
//!
//! One instance guards one adapter. State lives behind a mutex and is shared
//! by every concurrent call to that adapter within the process.

use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Runtime circuit state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Thresholds and timers.
///
/// `timeout` is informational: the guarded call enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub timeout: Duration,
    pub reset_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            timeout: Duration::from_secs(5),
            reset_timeout: Duration::from_secs(60),
        }
    }
}

/// Outcome of a guarded call that did not succeed.
#[derive(Debug, thiserror::Error)]
pub enum BreakerError<E> {
    /// Fast-fail: the wrapped call was not invoked.
    #[error("circuit open")]
    Open,
    #[error(transparent)]
    Inner(E),
}

impl<E> BreakerError<E> {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Point-in-time view for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub last_failure_at: Option<Instant>,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
    probe_in_flight: bool,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_failure_at: None,
            probe_in_flight: false,
        }
    }
}

#[derive(Debug)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(BreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn config(&self) -> BreakerConfig {
        self.config
    }

    /// Run `call` unless the circuit is open.
    ///
    /// An open circuit whose reset window has elapsed moves to half-open and
    /// lets exactly this call through as the probe; callers arriving while
    /// the probe is in flight are rejected with [`BreakerError::Open`].
    pub async fn execute<T, E, F, Fut>(&self, call: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let probing = self.admit()?;
        let mut guard = ProbeGuard {
            breaker: self,
            probing,
            settled: false,
        };

        let outcome = call().await;
        guard.settled = true;
        match outcome {
            Ok(value) => {
                self.on_success(probing);
                Ok(value)
            }
            Err(err) => {
                self.on_failure(probing);
                Err(BreakerError::Inner(err))
            }
        }
    }

    /// Decide whether a call may proceed. Returns whether it is the half-open probe.
    fn admit<E>(&self) -> Result<bool, BreakerError<E>> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Ok(false),
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    Err(BreakerError::Open)
                } else {
                    inner.probe_in_flight = true;
                    Ok(true)
                }
            }
            CircuitState::Open => {
                let elapsed = inner
                    .last_failure_at
                    .map(|at| at.elapsed() >= self.config.reset_timeout)
                    .unwrap_or(true);
                if elapsed {
                    inner.state = CircuitState::HalfOpen;
                    inner.probe_in_flight = true;
                    Ok(true)
                } else {
                    Err(BreakerError::Open)
                }
            }
        }
    }

    /// Only the half-open probe may close the circuit. A call admitted while
    /// Closed that finishes after the state moved on leaves it untouched.
    fn on_success(&self, probing: bool) {
        let mut inner = self.lock();
        if probing {
            inner.state = CircuitState::Closed;
            inner.consecutive_failures = 0;
            inner.probe_in_flight = false;
        } else if inner.state == CircuitState::Closed {
            inner.consecutive_failures = 0;
        }
    }

    fn on_failure(&self, probing: bool) {
        let mut inner = self.lock();
        if probing {
            inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
            inner.state = CircuitState::Open;
            inner.last_failure_at = Some(Instant::now());
            inner.probe_in_flight = false;
            return;
        }
        // Stale outcome of a call admitted before the circuit opened.
        if inner.state != CircuitState::Closed {
            return;
        }

        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        inner.last_failure_at = Some(Instant::now());
        if inner.consecutive_failures >= self.config.failure_threshold {
            inner.state = CircuitState::Open;
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        BreakerSnapshot {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            last_failure_at: inner.last_failure_at,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Re-opens the circuit if a half-open probe is dropped before it settles
/// (e.g. the caller's own timeout fired); otherwise the probe slot would stay taken.
struct ProbeGuard<'a> {
    breaker: &'a CircuitBreaker,
    probing: bool,
    settled: bool,
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if self.probing && !self.settled {
            self.breaker.on_failure(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn breaker(threshold: u32, reset_ms: u64) -> CircuitBreaker {
        CircuitBreaker::new(BreakerConfig {
            failure_threshold: threshold,
            timeout: Duration::from_millis(100),
            reset_timeout: Duration::from_millis(reset_ms),
        })
    }

    async fn fail(b: &CircuitBreaker, calls: &AtomicU32) -> Result<(), BreakerError<&'static str>> {
        b.execute(move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>("boom")
        })
        .await
    }

    async fn succeed(b: &CircuitBreaker, calls: &AtomicU32) -> Result<u8, BreakerError<&'static str>> {
        b.execute(move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, &'static str>(7)
        })
        .await
    }

    #[tokio::test(start_paused = true)]
    async fn opens_after_threshold_and_stops_calling() {
        let b = breaker(2, 1_000);
        let calls = AtomicU32::new(0);

        assert!(matches!(fail(&b, &calls).await, Err(BreakerError::Inner("boom"))));
        assert_eq!(b.state(), CircuitState::Closed);
        assert!(fail(&b, &calls).await.is_err());
        assert_eq!(b.state(), CircuitState::Open);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let r = succeed(&b, &calls).await;
        assert!(matches!(r, Err(BreakerError::Open)));
        assert_eq!(calls.load(Ordering::SeqCst), 2, "wrapped call must not run while open");
    }

    #[tokio::test(start_paused = true)]
    async fn success_in_closed_resets_failure_count() {
        let b = breaker(3, 1_000);
        let calls = AtomicU32::new(0);
        let _ = fail(&b, &calls).await;
        let _ = fail(&b, &calls).await;
        assert_eq!(b.consecutive_failures(), 2);
        assert_eq!(succeed(&b, &calls).await.unwrap(), 7);
        assert_eq!(b.consecutive_failures(), 0);
        assert_eq!(b.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_probe_success_closes() {
        let b = breaker(1, 500);
        let calls = AtomicU32::new(0);
        let _ = fail(&b, &calls).await;
        assert_eq!(b.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_millis(499)).await;
        assert!(succeed(&b, &calls).await.unwrap_err().is_open());

        tokio::time::advance(Duration::from_millis(2)).await;
        assert_eq!(succeed(&b, &calls).await.unwrap(), 7);
        assert_eq!(b.state(), CircuitState::Closed);
        assert_eq!(b.consecutive_failures(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_probe_failure_reopens_and_restamps() {
        let b = breaker(1, 500);
        let calls = AtomicU32::new(0);
        let _ = fail(&b, &calls).await;
        let first_stamp = b.snapshot().last_failure_at.unwrap();

        tokio::time::advance(Duration::from_millis(600)).await;
        let _ = fail(&b, &calls).await;
        let snap = b.snapshot();
        assert_eq!(snap.state, CircuitState::Open);
        assert!(snap.last_failure_at.unwrap() > first_stamp);

        // Fresh window: still rejected shortly after the failed probe.
        tokio::time::advance(Duration::from_millis(100)).await;
        assert!(succeed(&b, &calls).await.unwrap_err().is_open());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn window_elapsed_moves_to_half_open_before_outcome() {
        let b = breaker(1, 100);
        let calls = AtomicU32::new(0);
        let _ = fail(&b, &calls).await;
        tokio::time::advance(Duration::from_millis(150)).await;

        let br = &b;
        let seen = b
            .execute(move || async move {
                let during = br.state();
                Ok::<_, &'static str>(during)
            })
            .await
            .unwrap();
        assert_eq!(seen, CircuitState::HalfOpen);
        assert_eq!(b.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_are_rejected_while_probe_runs() {
        let b = breaker(1, 100);
        let calls = AtomicU32::new(0);
        let _ = fail(&b, &calls).await;
        tokio::time::advance(Duration::from_millis(150)).await;

        let probe = b.execute(|| async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<_, &'static str>(1u8)
        });
        let other = async {
            tokio::task::yield_now().await;
            succeed(&b, &calls).await
        };
        let (p, o) = tokio::join!(probe, other);
        assert_eq!(p.unwrap(), 1);
        assert!(o.unwrap_err().is_open());
        assert_eq!(b.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn late_success_does_not_close_an_open_circuit() {
        let b = breaker(1, 60_000);
        let calls = AtomicU32::new(0);

        let slow = b.execute(|| async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok::<_, &'static str>(1u8)
        });
        let fast = fail(&b, &calls);
        let (s, f) = tokio::join!(slow, fast);

        assert_eq!(s.unwrap(), 1);
        assert!(matches!(f, Err(BreakerError::Inner("boom"))));
        assert_eq!(b.state(), CircuitState::Open);
        assert_eq!(b.consecutive_failures(), 1);
        assert!(succeed(&b, &calls).await.unwrap_err().is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn late_failure_leaves_running_probe_alone() {
        let b = breaker(1, 100);
        let calls = AtomicU32::new(0);

        // Admitted while Closed, fails at t=300ms while the probe is in flight.
        let stale = b.execute(|| async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Err::<u8, _>("late")
        });
        let rest = async {
            let _ = fail(&b, &calls).await;
            tokio::time::sleep(Duration::from_millis(150)).await;
            let probe = b.execute(|| async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                Ok::<_, &'static str>(1u8)
            });
            let check = async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                (b.state(), succeed(&b, &calls).await)
            };
            tokio::join!(probe, check)
        };
        let (s, (p, (mid_state, other))) = tokio::join!(stale, rest);

        assert!(matches!(s, Err(BreakerError::Inner("late"))));
        assert_eq!(mid_state, CircuitState::HalfOpen);
        assert!(other.unwrap_err().is_open());
        assert_eq!(p.unwrap(), 1);
        assert_eq!(b.state(), CircuitState::Closed);
        assert_eq!(b.consecutive_failures(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_probe_reopens_instead_of_wedging() {
        let b = breaker(1, 100);
        let calls = AtomicU32::new(0);
        let _ = fail(&b, &calls).await;
        tokio::time::advance(Duration::from_millis(150)).await;

        let slow = b.execute(|| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, &'static str>(0u8)
        });
        assert!(tokio::time::timeout(Duration::from_millis(10), slow).await.is_err());
        assert_eq!(b.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_millis(150)).await;
        assert_eq!(succeed(&b, &calls).await.unwrap(), 7);
        assert_eq!(b.state(), CircuitState::Closed);
    }
}
