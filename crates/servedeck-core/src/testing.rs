//! Deterministic doubles for the core's collaborator ports.
//!
//! [`ManualRuntime`] runs spawned tasks only when asked and fires timers
//! against a [`ManualClock`], so tests control exactly when fetches run and
//! when they settle.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures::channel::oneshot;
use futures::future::BoxFuture;
use futures::task::{ArcWake, waker_ref};
use serde_json::Value;

use crate::clock::Clock;
use crate::confirm::ConfirmPrompt;
use crate::errors::InvokeError;
use crate::lock;
use crate::ports::CommandInvoker;
use crate::runtime::{MIN_TIMER_PERIOD, Runtime, TickFn, TimerHandle};

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *lock(&self.offset) += by;
    }

    /// Time since the clock was created.
    pub fn elapsed(&self) -> Duration {
        *lock(&self.offset)
    }

    /// Move forward to `elapsed`. Never moves backwards.
    fn advance_to(&self, elapsed: Duration) {
        let mut offset = lock(&self.offset);
        if elapsed > *offset {
            *offset = elapsed;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.elapsed()
    }
}

type ReadyQueue = Mutex<VecDeque<Arc<ManualTask>>>;

struct ManualTask {
    future: Mutex<Option<BoxFuture<'static, ()>>>,
    ready: Weak<ReadyQueue>,
    queued: AtomicBool,
}

impl ArcWake for ManualTask {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        if !arc_self.queued.swap(true, Ordering::SeqCst)
            && let Some(ready) = arc_self.ready.upgrade()
        {
            lock(&ready).push_back(arc_self.clone());
        }
    }
}

struct ManualTimer {
    period: Duration,
    next_due: Duration,
    tick: TickFn,
}

#[derive(Default)]
struct TimerTable {
    next_id: u64,
    timers: BTreeMap<u64, ManualTimer>,
}

struct TimerRegistration {
    id: u64,
    table: Weak<Mutex<TimerTable>>,
}

impl Drop for TimerRegistration {
    fn drop(&mut self) {
        if let Some(table) = self.table.upgrade() {
            lock(&table).timers.remove(&self.id);
        }
    }
}

/// Single-threaded [`Runtime`] driven explicitly by the test.
///
/// Spawned tasks are queued and only polled by [`ManualRuntime::run_until_stalled`]
/// (or by `advance`, which calls it). Wakers re-queue their task.
pub struct ManualRuntime {
    clock: Arc<ManualClock>,
    ready: Arc<ReadyQueue>,
    timers: Arc<Mutex<TimerTable>>,
    pending: Arc<AtomicUsize>,
    yields: Arc<AtomicUsize>,
}

impl ManualRuntime {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            ready: Arc::new(Mutex::new(VecDeque::new())),
            timers: Arc::new(Mutex::new(TimerTable::default())),
            pending: Arc::new(AtomicUsize::new(0)),
            yields: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn clock(&self) -> &Arc<ManualClock> {
        &self.clock
    }

    /// Poll queued tasks until none is ready. Returns the number of polls.
    pub fn run_until_stalled(&self) -> usize {
        let mut polls = 0;
        loop {
            let Some(task) = lock(&self.ready).pop_front() else {
                break;
            };
            task.queued.store(false, Ordering::SeqCst);

            let mut slot = lock(&task.future);
            if let Some(mut future) = slot.take() {
                let waker = waker_ref(&task);
                let mut cx = Context::from_waker(&waker);
                if future.as_mut().poll(&mut cx).is_pending() {
                    *slot = Some(future);
                } else {
                    self.pending.fetch_sub(1, Ordering::SeqCst);
                }
                polls += 1;
            }
        }
        polls
    }

    /// Move the clock forward, firing every timer that falls due on the way
    /// at its due time, and run tasks after each tick.
    pub fn advance(&self, by: Duration) {
        let target = self.clock.elapsed() + by;
        loop {
            self.run_until_stalled();
            let due = lock(&self.timers)
                .timers
                .iter()
                .filter(|(_, timer)| timer.next_due <= target)
                .min_by_key(|(id, timer)| (timer.next_due, **id))
                .map(|(id, timer)| (*id, timer.next_due, timer.tick.clone()));
            let Some((id, due_at, tick)) = due else {
                break;
            };

            self.clock.advance_to(due_at);
            if let Some(timer) = lock(&self.timers).timers.get_mut(&id) {
                timer.next_due = due_at + timer.period;
            }
            tick();
        }
        self.clock.advance_to(target);
        self.run_until_stalled();
    }

    /// Fire every active timer once, right now, then run tasks.
    pub fn fire_timers(&self) {
        let ticks: Vec<TickFn> = lock(&self.timers)
            .timers
            .values()
            .map(|timer| timer.tick.clone())
            .collect();
        for tick in ticks {
            tick();
        }
        self.run_until_stalled();
    }

    pub fn active_timers(&self) -> usize {
        lock(&self.timers).timers.len()
    }

    /// Spawned tasks that have not completed.
    pub fn pending_tasks(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Number of `yield_turn` futures that have yielded.
    pub fn yield_count(&self) -> usize {
        self.yields.load(Ordering::SeqCst)
    }

    /// Spawn `future` and hand back a receiver for its output.
    pub fn spawn_with_output<T: Send + 'static>(
        &self,
        future: impl Future<Output = T> + Send + 'static,
    ) -> oneshot::Receiver<T> {
        let (tx, rx) = oneshot::channel();
        self.spawn(Box::pin(async move {
            let _ = tx.send(future.await);
        }));
        rx
    }
}

impl Runtime for ManualRuntime {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        let task = Arc::new(ManualTask {
            future: Mutex::new(Some(task)),
            ready: Arc::downgrade(&self.ready),
            queued: AtomicBool::new(true),
        });
        lock(&self.ready).push_back(task);
    }

    fn interval(&self, period: Duration, tick: TickFn) -> TimerHandle {
        let period = period.max(MIN_TIMER_PERIOD);
        let mut table = lock(&self.timers);
        table.next_id += 1;
        let id = table.next_id;
        table.timers.insert(
            id,
            ManualTimer {
                period,
                next_due: self.clock.elapsed() + period,
                tick,
            },
        );
        TimerHandle::new(TimerRegistration {
            id,
            table: Arc::downgrade(&self.timers),
        })
    }

    fn yield_turn(&self) -> BoxFuture<'static, ()> {
        Box::pin(YieldOnce {
            yielded: false,
            yields: self.yields.clone(),
        })
    }
}

struct YieldOnce {
    yielded: bool,
    yields: Arc<AtomicUsize>,
}

impl Future for YieldOnce {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        self.yields.fetch_add(1, Ordering::SeqCst);
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

type Reply = Result<Value, InvokeError>;

enum Scripted {
    Ready(Reply),
    Gated(oneshot::Receiver<Reply>),
}

#[derive(Default)]
struct ScriptState {
    queued: HashMap<String, VecDeque<Scripted>>,
    fallback: HashMap<String, Reply>,
    calls: Vec<(String, Value)>,
}

/// [`CommandInvoker`] answering from per-command scripts.
///
/// Queued replies are consumed in order; once a command's queue is empty
/// its `always` reply is used; with neither, the call fails as unavailable.
#[derive(Default)]
pub struct ScriptedInvoker {
    state: Mutex<ScriptState>,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, command: &str, reply: Reply) {
        lock(&self.state)
            .queued
            .entry(command.to_string())
            .or_default()
            .push_back(Scripted::Ready(reply));
    }

    pub fn reply_ok(&self, command: &str, data: Value) {
        self.reply(command, Ok(data));
    }

    pub fn reply_err(&self, command: &str, message: &str) {
        self.reply(command, Err(InvokeError::rejected(command, message)));
    }

    pub fn always(&self, command: &str, reply: Reply) {
        lock(&self.state)
            .fallback
            .insert(command.to_string(), reply);
    }

    /// Queue a reply that stays pending until the returned gate is resolved.
    pub fn gate(&self, command: &str) -> Gate {
        let (tx, rx) = oneshot::channel();
        lock(&self.state)
            .queued
            .entry(command.to_string())
            .or_default()
            .push_back(Scripted::Gated(rx));
        Gate { sender: tx }
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        lock(&self.state).calls.clone()
    }

    pub fn call_count(&self, command: &str) -> usize {
        lock(&self.state)
            .calls
            .iter()
            .filter(|(c, _)| c == command)
            .count()
    }
}

impl CommandInvoker for ScriptedInvoker {
    fn invoke(&self, command: &str, params: Value) -> BoxFuture<'static, Reply> {
        let mut state = lock(&self.state);
        state.calls.push((command.to_string(), params));
        let scripted = state
            .queued
            .get_mut(command)
            .and_then(VecDeque::pop_front)
            .or_else(|| state.fallback.get(command).cloned().map(Scripted::Ready));
        drop(state);

        let command = command.to_string();
        match scripted {
            Some(Scripted::Ready(reply)) => Box::pin(async move { reply }),
            Some(Scripted::Gated(rx)) => Box::pin(async move {
                rx.await.unwrap_or_else(|_| {
                    Err(InvokeError::Transport {
                        command,
                        message: "gate dropped".to_string(),
                    })
                })
            }),
            None => Box::pin(async move {
                Err(InvokeError::Unavailable {
                    message: format!("no scripted reply for {}", command),
                })
            }),
        }
    }
}

/// Pending reply created by [`ScriptedInvoker::gate`].
pub struct Gate {
    sender: oneshot::Sender<Reply>,
}

impl Gate {
    pub fn resolve(self, reply: Reply) {
        let _ = self.sender.send(reply);
    }

    pub fn ok(self, data: Value) {
        self.resolve(Ok(data));
    }

    pub fn fail(self, command: &str, message: &str) {
        self.resolve(Err(InvokeError::rejected(command, message)));
    }
}

/// [`ConfirmPrompt`] answering from a fixed list. Answers `false` once the
/// list runs out.
#[derive(Default)]
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<bool>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn asked(&self) -> Vec<String> {
        lock(&self.asked).clone()
    }
}

impl ConfirmPrompt for ScriptedPrompt {
    fn ask(&self, message: &str) -> BoxFuture<'static, bool> {
        lock(&self.asked).push(message.to_string());
        let answer = lock(&self.answers).pop_front().unwrap_or(false);
        Box::pin(async move { answer })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_manual_runtime_runs_only_when_asked() {
        let runtime = ManualRuntime::new(Arc::new(ManualClock::new()));
        let mut rx = runtime.spawn_with_output(async { 5 });
        assert_eq!(runtime.pending_tasks(), 1);
        assert_eq!(rx.try_recv().unwrap(), None);

        runtime.run_until_stalled();
        assert_eq!(runtime.pending_tasks(), 0);
        assert_eq!(rx.try_recv().unwrap(), Some(5));
    }

    #[test]
    fn test_yield_turn_requeues_task() {
        let runtime = Arc::new(ManualRuntime::new(Arc::new(ManualClock::new())));
        let inner = runtime.clone();
        let mut rx = runtime.spawn_with_output(async move {
            inner.yield_turn().await;
            "done"
        });
        assert_eq!(runtime.run_until_stalled(), 2);
        assert_eq!(runtime.yield_count(), 1);
        assert_eq!(rx.try_recv().unwrap(), Some("done"));
    }

    #[test]
    fn test_advance_fires_timers_at_due_times() {
        let clock = Arc::new(ManualClock::new());
        let runtime = ManualRuntime::new(clock.clone());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let tick_clock = clock.clone();
        let _timer = runtime.interval(
            Duration::from_millis(300),
            Arc::new(move || sink.lock().unwrap().push(tick_clock.elapsed())),
        );

        runtime.advance(Duration::from_millis(1000));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                Duration::from_millis(300),
                Duration::from_millis(600),
                Duration::from_millis(900)
            ]
        );
        assert_eq!(clock.elapsed(), Duration::from_millis(1000));
    }

    #[test]
    fn test_gated_reply_waits_for_resolve() {
        let runtime = ManualRuntime::new(Arc::new(ManualClock::new()));
        let invoker = ScriptedInvoker::new();
        let gate = invoker.gate("list_apis");
        let mut rx = runtime.spawn_with_output(invoker.invoke("list_apis", json!({})));

        runtime.run_until_stalled();
        assert_eq!(rx.try_recv().unwrap(), None);

        gate.ok(json!([]));
        runtime.run_until_stalled();
        assert_eq!(rx.try_recv().unwrap(), Some(Ok(json!([]))));
        assert_eq!(invoker.call_count("list_apis"), 1);
    }

    #[test]
    fn test_unscripted_command_is_unavailable() {
        let invoker = ScriptedInvoker::new();
        invoker.always("list_alerts", Ok(json!([])));
        let reply = futures::executor::block_on(invoker.invoke("stop_api", json!({})));
        assert!(matches!(reply, Err(InvokeError::Unavailable { .. })));
        let reply = futures::executor::block_on(invoker.invoke("list_alerts", json!({})));
        assert_eq!(reply, Ok(json!([])));
    }
}
