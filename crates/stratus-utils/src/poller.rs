//! Bounded convergence polling.
//!
//! A probe is invoked immediately and then once per interval until a
//! caller-supplied predicate accepts its result or the next tick would start
//! after the deadline. Probe errors are not terminal by themselves: the
//! predicate sees every `Result` and decides.
//!
//! The async poller also bounds each probe: a probe still running at the
//! deadline or on cancel is dropped.

use crate::errors::{PolicyError, Result};
use log::{debug, trace, warn};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// Interval and overall budget for one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub total_timeout: Duration,
    pub interval: Duration,
}

impl Default for PollPolicy {
    /// 5 minutes, checking every 10 seconds
    fn default() -> Self {
        Self {
            total_timeout: Duration::from_secs(300),
            interval: Duration::from_secs(10),
        }
    }
}

impl PollPolicy {
    pub fn new(total_timeout: Duration, interval: Duration) -> Result<Self> {
        let policy = Self {
            total_timeout,
            interval,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(PolicyError::ZeroInterval.into());
        }
        if self.total_timeout < self.interval {
            return Err(PolicyError::TimeoutShorterThanInterval {
                timeout: self.total_timeout,
                interval: self.interval,
            }
            .into());
        }
        Ok(())
    }
}

/// How a poll ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Converged,
    TimedOut,
    Cancelled,
}

/// Result of one poll invocation.
///
/// `result` is the last completed probe's output. It is `None` only when the
/// async poller cut off the first probe before it returned.
#[derive(Debug)]
pub struct PollOutcome<T, E> {
    pub result: Option<std::result::Result<T, E>>,
    pub timed_out: bool,
    pub cancelled: bool,
    pub elapsed: Duration,
    pub attempts: u32,
}

impl<T, E> PollOutcome<T, E> {
    fn finish(
        result: Option<std::result::Result<T, E>>,
        state: PollState,
        elapsed: Duration,
        attempts: u32,
    ) -> Self {
        debug!(
            "poll finished: {:?} after {} attempt(s) in {:?}",
            state, attempts, elapsed
        );
        Self {
            result,
            timed_out: state == PollState::TimedOut,
            cancelled: state == PollState::Cancelled,
            elapsed,
            attempts,
        }
    }

    pub fn state(&self) -> PollState {
        if self.timed_out {
            PollState::TimedOut
        } else if self.cancelled {
            PollState::Cancelled
        } else {
            PollState::Converged
        }
    }

    /// True when the predicate accepted the final result
    pub fn converged(&self) -> bool {
        self.state() == PollState::Converged
    }

    pub fn value(&self) -> Option<&T> {
        self.result.as_ref()?.as_ref().ok()
    }

    pub fn error(&self) -> Option<&E> {
        self.result.as_ref()?.as_ref().err()
    }

    /// Collapse into the final result, mapping a timeout or cancellation to an error.
    ///
    /// `on_stopped` receives the elapsed time and attempt count.
    pub fn into_result<F>(self, on_stopped: F) -> std::result::Result<T, E>
    where
        F: FnOnce(Duration, u32) -> E,
    {
        let converged = self.converged();
        match self.result {
            Some(result) if converged => result,
            _ => Err(on_stopped(self.elapsed, self.attempts)),
        }
    }
}

/// Time source for the blocking poller
pub trait Clock {
    /// Monotonic time since an arbitrary origin
    fn now(&self) -> Duration;
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `Instant` and `thread::sleep`
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Shared flag that stops in-flight polls between ticks
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel` has been called
    pub async fn cancelled(&self) {
        loop {
            // Register before checking the flag so a concurrent cancel is not missed
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Deadline used when `total_timeout` overflows the timer
const FAR_FUTURE_SECS: u64 = 86_400 * 365 * 30;

fn warn_on_invalid(policy: &PollPolicy) {
    if let Err(e) = policy.validate() {
        warn!("polling with an invalid policy: {}", e);
    }
}

/// Poll on the calling thread with the system clock
pub fn poll<T, E, P, F>(probe: P, predicate: F, policy: &PollPolicy) -> PollOutcome<T, E>
where
    P: FnMut() -> std::result::Result<T, E>,
    F: Fn(&std::result::Result<T, E>) -> bool,
{
    poll_with_clock(probe, predicate, policy, &SystemClock::default(), None)
}

/// Blocking poll with an explicit clock and optional cancellation.
///
/// Cancellation is observed between ticks, so a cancelled poll returns at
/// most one interval late.
pub fn poll_with_clock<T, E, P, F, C>(
    mut probe: P,
    predicate: F,
    policy: &PollPolicy,
    clock: &C,
    cancel: Option<&CancelToken>,
) -> PollOutcome<T, E>
where
    P: FnMut() -> std::result::Result<T, E>,
    F: Fn(&std::result::Result<T, E>) -> bool,
    C: Clock + ?Sized,
{
    warn_on_invalid(policy);

    let start = clock.now();
    let deadline = start.saturating_add(policy.total_timeout);
    let is_cancelled = || cancel.is_some_and(|c| c.is_cancelled());
    let mut attempts = 0u32;

    loop {
        let result = probe();
        attempts += 1;
        let now = clock.now();
        let elapsed = now.saturating_sub(start);
        trace!("poll attempt {} at {:?}", attempts, elapsed);

        if predicate(&result) {
            return PollOutcome::finish(Some(result), PollState::Converged, elapsed, attempts);
        }
        if now.saturating_add(policy.interval) > deadline {
            return PollOutcome::finish(Some(result), PollState::TimedOut, elapsed, attempts);
        }
        if is_cancelled() {
            return PollOutcome::finish(Some(result), PollState::Cancelled, elapsed, attempts);
        }

        clock.sleep(policy.interval);

        if is_cancelled() {
            let elapsed = clock.now().saturating_sub(start);
            return PollOutcome::finish(Some(result), PollState::Cancelled, elapsed, attempts);
        }
    }
}

/// Async poll on the tokio timer, for adapters running inside a runtime.
///
/// Semantics match [`poll_with_clock`], with two additions: a cancel
/// interrupts the inter-tick sleep immediately, and a probe still running at
/// the deadline or on cancel is dropped. The outcome then carries the last
/// completed result, if any.
pub async fn poll_async<T, E, P, Fut, F>(
    mut probe: P,
    predicate: F,
    policy: &PollPolicy,
    cancel: Option<&CancelToken>,
) -> PollOutcome<T, E>
where
    P: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    F: Fn(&std::result::Result<T, E>) -> bool,
{
    warn_on_invalid(policy);

    let start = tokio::time::Instant::now();
    let deadline = start
        .checked_add(policy.total_timeout)
        .unwrap_or_else(|| start + Duration::from_secs(FAR_FUTURE_SECS));
    let mut last: Option<std::result::Result<T, E>> = None;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let attempt = tokio::time::timeout_at(deadline, probe());

        let completed = match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    completed = attempt => completed,
                    _ = token.cancelled() => {
                        debug!("poll cancelled during attempt {}", attempts);
                        let elapsed = start.elapsed();
                        return PollOutcome::finish(last, PollState::Cancelled, elapsed, attempts);
                    }
                }
            }
            None => attempt.await,
        };

        let Ok(result) = completed else {
            debug!("attempt {} still running at the deadline", attempts);
            return PollOutcome::finish(last, PollState::TimedOut, start.elapsed(), attempts);
        };

        let elapsed = start.elapsed();
        trace!("poll attempt {} at {:?}", attempts, elapsed);

        if predicate(&result) {
            return PollOutcome::finish(Some(result), PollState::Converged, elapsed, attempts);
        }
        if elapsed.saturating_add(policy.interval) > policy.total_timeout {
            return PollOutcome::finish(Some(result), PollState::TimedOut, elapsed, attempts);
        }
        last = Some(result);

        match cancel {
            Some(token) => {
                tokio::select! {
                    _ = tokio::time::sleep(policy.interval) => {}
                    _ = token.cancelled() => {
                        let elapsed = start.elapsed();
                        return PollOutcome::finish(last, PollState::Cancelled, elapsed, attempts);
                    }
                }
            }
            None => tokio::time::sleep(policy.interval).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::UtilsError;
    use std::cell::Cell;

    /// Virtual clock: sleeping advances time instantly
    #[derive(Default)]
    struct ManualClock {
        now: Cell<Duration>,
    }

    impl Clock for ManualClock {
        fn now(&self) -> Duration {
            self.now.get()
        }

        fn sleep(&self, duration: Duration) {
            self.now.set(self.now.get() + duration);
        }
    }

    fn policy(total_secs: u64, interval_secs: u64) -> PollPolicy {
        PollPolicy::new(
            Duration::from_secs(total_secs),
            Duration::from_secs(interval_secs),
        )
        .unwrap()
    }

    #[test]
    fn test_policy_validation() {
        assert!(matches!(
            PollPolicy::new(Duration::from_secs(3), Duration::ZERO),
            Err(UtilsError::Policy(PolicyError::ZeroInterval))
        ));
        assert!(matches!(
            PollPolicy::new(Duration::from_secs(1), Duration::from_secs(2)),
            Err(UtilsError::Policy(
                PolicyError::TimeoutShorterThanInterval { .. }
            ))
        ));
        assert!(PollPolicy::new(Duration::from_secs(1), Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn test_immediate_convergence_probes_once() {
        let clock = ManualClock::default();
        let calls = Cell::new(0);

        let outcome = poll_with_clock(
            || {
                calls.set(calls.get() + 1);
                Ok::<_, String>("running")
            },
            |r| matches!(r, Ok("running")),
            &policy(3, 1),
            &clock,
            None,
        );

        assert!(!outcome.timed_out);
        assert!(outcome.converged());
        assert_eq!(calls.get(), 1);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.elapsed, Duration::ZERO);
        assert_eq!(outcome.value(), Some(&"running"));
    }

    #[test]
    fn test_never_converging_times_out() {
        let clock = ManualClock::default();
        let calls = Cell::new(0u32);

        let outcome = poll_with_clock(
            || {
                calls.set(calls.get() + 1);
                Err::<(), _>(format!("pending #{}", calls.get()))
            },
            |_| false,
            &policy(3, 1),
            &clock,
            None,
        );

        assert!(outcome.timed_out);
        assert!((3..=4).contains(&calls.get()));
        assert_eq!(outcome.attempts, calls.get());
        // The last error is surfaced, not swallowed
        assert_eq!(
            outcome.error().cloned(),
            Some(format!("pending #{}", calls.get()))
        );
        assert!(outcome.elapsed <= Duration::from_secs(3));
    }

    #[test]
    fn test_never_converging_times_out_in_real_time() {
        let calls = Cell::new(0u32);
        let outcome = poll(
            || {
                calls.set(calls.get() + 1);
                Ok::<u32, ()>(calls.get())
            },
            |_| false,
            &PollPolicy::new(Duration::from_millis(300), Duration::from_millis(100)).unwrap(),
        );

        assert!(outcome.timed_out);
        assert!((3..=4).contains(&calls.get()));
    }

    #[test]
    fn test_predicate_decides_on_errors() {
        let clock = ManualClock::default();
        let states = ["not found", "not found", "pending", "ready"];
        let idx = Cell::new(0usize);

        // "not found" is transient; the probe keeps going until "ready"
        let outcome = poll_with_clock(
            || {
                let state = states[idx.get()];
                idx.set(idx.get() + 1);
                if state == "not found" {
                    Err(state)
                } else {
                    Ok(state)
                }
            },
            |r| matches!(r, Ok("ready")),
            &policy(60, 5),
            &clock,
            None,
        );

        assert!(outcome.converged());
        assert_eq!(outcome.attempts, 4);
        assert_eq!(outcome.elapsed, Duration::from_secs(15));
    }

    #[test]
    fn test_terminal_error_stops_polling() {
        let clock = ManualClock::default();
        let outcome = poll_with_clock(
            || Err::<(), _>("entered error state"),
            |r| r.is_err(),
            &policy(60, 5),
            &clock,
            None,
        );

        assert!(outcome.converged());
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.into_result(|_, _| "timeout"), Err("entered error state"));
    }

    #[test]
    fn test_into_result_maps_timeout() {
        let clock = ManualClock::default();
        let outcome = poll_with_clock(
            || Ok::<_, String>("pending"),
            |r| matches!(r, Ok("ready")),
            &policy(10, 5),
            &clock,
            None,
        );

        let mapped = outcome.into_result(|elapsed, attempts| {
            format!("gave up after {:?} ({} attempts)", elapsed, attempts)
        });
        assert_eq!(mapped, Err("gave up after 10s (3 attempts)".to_string()));
    }

    #[test]
    fn test_cancellation_between_ticks() {
        let clock = ManualClock::default();
        let token = CancelToken::new();
        let calls = Cell::new(0u32);

        let outcome = poll_with_clock(
            || {
                calls.set(calls.get() + 1);
                if calls.get() == 2 {
                    token.cancel();
                }
                Ok::<_, ()>(calls.get())
            },
            |_| false,
            &policy(60, 1),
            &clock,
            Some(&token),
        );

        assert!(outcome.cancelled);
        assert!(!outcome.timed_out);
        assert_eq!(outcome.state(), PollState::Cancelled);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.value(), Some(&2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_poll_converges() {
        let calls = Arc::new(std::sync::atomic::AtomicU32::new(0));

        let outcome = poll_async(
            || {
                let calls = Arc::clone(&calls);
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        Err("booting")
                    } else {
                        Ok("active")
                    }
                }
            },
            |r| r.is_ok(),
            &policy(30, 2),
            None,
        )
        .await;

        assert!(outcome.converged());
        assert_eq!(outcome.attempts, 3);
        assert!(outcome.elapsed >= Duration::from_secs(4));
        assert!(outcome.elapsed < Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_poll_times_out() {
        let outcome = poll_async(
            || async { Err::<(), _>("pending") },
            |r| r.is_ok(),
            &policy(3, 1),
            None,
        )
        .await;

        assert!(outcome.timed_out);
        assert!((3..=4).contains(&outcome.attempts));
        assert_eq!(outcome.error(), Some(&"pending"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_poll_cancelled_during_sleep() {
        let token = CancelToken::new();
        let canceller = token.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(25)).await;
            canceller.cancel();
        });

        let outcome = poll_async(
            || async { Ok::<_, ()>("pending") },
            |r| matches!(r, Ok("ready")),
            &policy(300, 10),
            Some(&token),
        )
        .await;

        assert!(outcome.cancelled);
        assert_eq!(outcome.attempts, 3);
        assert!(outcome.elapsed >= Duration::from_secs(25));
        assert!(outcome.elapsed < Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_attempt_is_cut_off_at_deadline() {
        let outcome = poll_async(
            || async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, ()>("ready")
            },
            |r| r.is_ok(),
            &policy(3, 1),
            None,
        )
        .await;

        assert!(outcome.timed_out);
        assert_eq!(outcome.attempts, 1);
        assert!(outcome.result.is_none());
        assert!(outcome.elapsed >= Duration::from_secs(3));
        assert!(outcome.elapsed < Duration::from_secs(4));
        assert_eq!(outcome.into_result(|_, _| ()), Err(()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_attempt_keeps_previous_result() {
        let calls = Arc::new(std::sync::atomic::AtomicU32::new(0));

        let outcome = poll_async(
            || {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        return Err("pending");
                    }
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok("ready")
                }
            },
            |r| r.is_ok(),
            &policy(3, 1),
            None,
        )
        .await;

        assert!(outcome.timed_out);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.error(), Some(&"pending"));
        assert!(outcome.elapsed < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_running_attempt() {
        let token = CancelToken::new();
        let canceller = token.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            canceller.cancel();
        });

        let outcome = poll_async(
            || async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, ()>("ready")
            },
            |r| r.is_ok(),
            &policy(3, 1),
            Some(&token),
        )
        .await;

        assert!(outcome.cancelled);
        assert!(!outcome.timed_out);
        assert_eq!(outcome.attempts, 1);
        assert!(outcome.result.is_none());
        assert!(outcome.elapsed >= Duration::from_secs(2));
        assert!(outcome.elapsed < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_cancel_token_resolves() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());

        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.cancelled().await })
        };
        token.cancel();

        waiter.await.unwrap();
        assert!(token.is_cancelled());
        // Already-cancelled tokens resolve immediately
        token.cancelled().await;
    }
}
