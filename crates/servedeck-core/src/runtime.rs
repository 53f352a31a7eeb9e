//! Task spawning and timers.
//!
//! The core never talks to an executor directly. Production code runs on
//! [`SmolRuntime`]; tests drive [`crate::testing::ManualRuntime`] by hand.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;

pub type TickFn = Arc<dyn Fn() + Send + Sync>;

/// Shortest period a timer runs at. A zero period would spin.
pub const MIN_TIMER_PERIOD: Duration = Duration::from_millis(1);

pub trait Runtime: Send + Sync {
    /// Run `task` to completion in the background.
    fn spawn(&self, task: BoxFuture<'static, ()>);

    /// Call `tick` every `period` until the returned handle is dropped.
    fn interval(&self, period: Duration, tick: TickFn) -> TimerHandle;

    /// Resolve after the executor has had a chance to run other tasks.
    fn yield_turn(&self) -> BoxFuture<'static, ()>;
}

/// Owns a running timer. Dropping it cancels the timer.
pub struct TimerHandle {
    _cancel_on_drop: Box<dyn Send>,
}

impl TimerHandle {
    pub fn new(cancel_on_drop: impl Send + 'static) -> Self {
        Self {
            _cancel_on_drop: Box::new(cancel_on_drop),
        }
    }
}

impl std::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TimerHandle")
    }
}

/// [`Runtime`] backed by a `smol` executor.
#[derive(Clone, Default)]
pub struct SmolRuntime {
    executor: Arc<smol::Executor<'static>>,
}

impl SmolRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive the executor on the current thread until `future` resolves.
    pub fn block_on<T>(&self, future: impl Future<Output = T>) -> T {
        smol::block_on(self.executor.run(future))
    }
}

impl Runtime for SmolRuntime {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        self.executor.spawn(task).detach();
    }

    fn interval(&self, period: Duration, tick: TickFn) -> TimerHandle {
        let period = period.max(MIN_TIMER_PERIOD);
        // Each wait starts after the previous tick returned, so two ticks are
        // never closer than `period` on the monotonic clock.
        let task = self.executor.spawn(async move {
            loop {
                smol::Timer::after(period).await;
                tick();
            }
        });
        TimerHandle::new(task)
    }

    fn yield_turn(&self) -> BoxFuture<'static, ()> {
        Box::pin(smol::future::yield_now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_smol_spawn_runs_task() {
        let runtime = SmolRuntime::new();
        let (tx, rx) = futures::channel::oneshot::channel();
        runtime.spawn(Box::pin(async move {
            let _ = tx.send(7);
        }));
        assert_eq!(runtime.block_on(rx).unwrap(), 7);
    }

    #[test]
    fn test_smol_interval_ticks_until_dropped() {
        let runtime = SmolRuntime::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let handle = runtime.interval(
            Duration::from_millis(5),
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        runtime.block_on(smol::Timer::after(Duration::from_millis(60)));
        drop(handle);
        let seen = count.load(Ordering::SeqCst);
        assert!(seen >= 2, "expected several ticks, saw {}", seen);

        runtime.block_on(smol::Timer::after(Duration::from_millis(30)));
        assert_eq!(count.load(Ordering::SeqCst), seen);
    }

    #[test]
    fn test_smol_interval_zero_period_is_floored() {
        let runtime = SmolRuntime::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let handle = runtime.interval(
            Duration::ZERO,
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        runtime.block_on(smol::Timer::after(Duration::from_millis(20)));
        drop(handle);
        let seen = count.load(Ordering::SeqCst);
        assert!(seen >= 1, "timer should still tick");
        assert!(seen <= 25, "zero period must not spin, saw {} ticks", seen);
    }

    #[test]
    fn test_smol_interval_ticks_are_spaced_by_period() {
        let runtime = SmolRuntime::new();
        let stamps = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = stamps.clone();
        let period = Duration::from_millis(5);
        let handle = runtime.interval(
            period,
            Arc::new(move || {
                sink.lock().unwrap().push(std::time::Instant::now());
            }),
        );

        runtime.block_on(smol::Timer::after(Duration::from_millis(40)));
        drop(handle);
        let stamps = stamps.lock().unwrap();
        assert!(stamps.len() >= 2);
        for pair in stamps.windows(2) {
            assert!(pair[1] - pair[0] >= period);
        }
    }
}
