//! Interval polling with enable/disable, visibility suspension, and a manual
//! "fetch now" trigger.
//!
//! ```text
//! Idle --start--> Armed <--set_enabled--> Suspended
//!                   \                        /
//!                    +------teardown--------+--> TornDown
//! ```

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::lock;
use crate::ports::{AlwaysVisible, VisibilitySource};
use crate::runtime::{Runtime, TimerHandle};
use crate::throttle::RequestThrottle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOptions {
    pub interval: Duration,
    pub min_request_interval: Duration,
    pub enabled: bool,
    pub skip_when_hidden: bool,
    pub skip_initial_load: bool,
}

impl PollOptions {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            min_request_interval: Duration::from_secs(1),
            enabled: true,
            skip_when_hidden: true,
            skip_initial_load: false,
        }
    }

    pub fn min_request_interval(mut self, min: Duration) -> Self {
        self.min_request_interval = min;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn skip_when_hidden(mut self, skip: bool) -> Self {
        self.skip_when_hidden = skip;
        self
    }

    pub fn skip_initial_load(mut self, skip: bool) -> Self {
        self.skip_initial_load = skip;
        self
    }

    /// Minimum spacing between tick-issued requests.
    fn tick_gate(&self) -> Duration {
        self.interval.min(self.min_request_interval)
    }
}

/// Why a fetch was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTrigger {
    /// Immediate fetch when polling is armed.
    Initial,
    /// Timer tick that passed the visibility and throttle gates.
    Tick,
    /// `refresh()`.
    Manual,
}

impl PollTrigger {
    pub fn is_forced(&self) -> bool {
        !matches!(self, PollTrigger::Tick)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    Idle,
    Armed,
    Suspended,
    TornDown,
}

pub type FetchFn = Arc<dyn Fn(PollTrigger) -> BoxFuture<'static, ()> + Send + Sync>;

/// Runtime, clock and visibility shared by every scheduler of a consumer.
#[derive(Clone)]
pub struct PollContext {
    pub runtime: Arc<dyn Runtime>,
    pub clock: Arc<dyn Clock>,
    pub visibility: Arc<dyn VisibilitySource>,
}

impl PollContext {
    pub fn new(runtime: Arc<dyn Runtime>) -> Self {
        Self {
            runtime,
            clock: Arc::new(SystemClock),
            visibility: Arc::new(AlwaysVisible),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_visibility(mut self, visibility: Arc<dyn VisibilitySource>) -> Self {
        self.visibility = visibility;
        self
    }
}

/// Handle to one polling subscription. Clones share the subscription.
///
/// Holds at most one timer. The timer always calls the latest callback
/// passed to [`PollScheduler::set_callback`]. Fetches are spawned on the
/// runtime; their failures are the callback's business and never stop the
/// timer.
#[derive(Clone)]
pub struct PollScheduler {
    shared: Arc<Shared>,
}

struct Shared {
    name: String,
    state: Mutex<PollState>,
    callback: Mutex<FetchFn>,
    ctx: PollContext,
}

struct PollState {
    options: PollOptions,
    phase: PollPhase,
    has_run_initial: bool,
    tick_throttle: RequestThrottle,
    timer: Option<TimerHandle>,
}

impl PollScheduler {
    pub fn new(
        name: impl Into<String>,
        options: PollOptions,
        callback: FetchFn,
        ctx: PollContext,
    ) -> Self {
        let tick_throttle = RequestThrottle::new(options.tick_gate(), ctx.clock.clone());
        Self {
            shared: Arc::new(Shared {
                name: name.into(),
                state: Mutex::new(PollState {
                    options,
                    phase: PollPhase::Idle,
                    has_run_initial: false,
                    tick_throttle,
                    timer: None,
                }),
                callback: Mutex::new(callback),
                ctx,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Leave `Idle`. Arms the timer if enabled, otherwise suspends.
    pub fn start(&self) {
        let mut state = lock(&self.shared.state);
        if state.phase != PollPhase::Idle {
            return;
        }
        let fire_initial = if state.options.enabled {
            self.arm(&mut state)
        } else {
            state.phase = PollPhase::Suspended;
            false
        };
        drop(state);

        if fire_initial {
            self.dispatch(PollTrigger::Initial);
        }
    }

    /// Returns whether an initial fetch is due.
    fn arm(&self, state: &mut PollState) -> bool {
        let fire_initial = !state.options.skip_initial_load;
        state.has_run_initial = true;

        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        state.timer = Some(self.shared.ctx.runtime.interval(
            state.options.interval,
            Arc::new(move || {
                if let Some(shared) = weak.upgrade() {
                    PollScheduler { shared }.tick();
                }
            }),
        ));
        state.phase = PollPhase::Armed;

        info!(
            event = "core.poll.armed",
            poll = %self.shared.name,
            interval_ms = state.options.interval.as_millis() as u64,
            initial_fetch = fire_initial,
        );
        fire_initial
    }

    /// One timer tick. Public so hosts can drive ticks themselves.
    ///
    /// No-op unless armed. A hidden host skips the tick without consuming
    /// the throttle.
    pub fn tick(&self) {
        let mut state = lock(&self.shared.state);
        if state.phase != PollPhase::Armed {
            return;
        }
        if state.options.skip_when_hidden && self.shared.ctx.visibility.is_hidden() {
            debug!(
                event = "core.poll.tick_skipped",
                poll = %self.shared.name,
                reason = "hidden",
            );
            return;
        }
        if !state.tick_throttle.can_request(false) {
            debug!(
                event = "core.poll.tick_skipped",
                poll = %self.shared.name,
                reason = "throttled",
            );
            return;
        }
        state.tick_throttle.record_request();
        drop(state);

        self.dispatch(PollTrigger::Tick);
    }

    /// Disabling clears the timer and the initial-fetch marker. Re-enabling
    /// re-arms exactly as `start` does.
    pub fn set_enabled(&self, enabled: bool) {
        let mut state = lock(&self.shared.state);
        let was_enabled = state.options.enabled;
        state.options.enabled = enabled;
        if matches!(state.phase, PollPhase::Idle | PollPhase::TornDown) {
            return;
        }

        let fire_initial = match (was_enabled, enabled) {
            (true, false) => {
                state.timer = None;
                state.has_run_initial = false;
                state.phase = PollPhase::Suspended;
                info!(event = "core.poll.suspended", poll = %self.shared.name);
                false
            }
            (false, true) => self.arm(&mut state),
            _ => false,
        };
        drop(state);

        if fire_initial {
            self.dispatch(PollTrigger::Initial);
        }
    }

    /// Forced fetch now. Leaves the timer cadence and the throttle alone.
    pub fn refresh(&self) {
        if lock(&self.shared.state).phase == PollPhase::TornDown {
            return;
        }
        self.dispatch(PollTrigger::Manual);
    }

    /// Swap the fetch callback. The running timer is kept.
    pub fn set_callback(&self, callback: FetchFn) {
        *lock(&self.shared.callback) = callback;
    }

    pub fn teardown(&self) {
        let mut state = lock(&self.shared.state);
        if state.phase == PollPhase::TornDown {
            return;
        }
        state.timer = None;
        state.phase = PollPhase::TornDown;
        info!(event = "core.poll.torn_down", poll = %self.shared.name);
    }

    pub fn phase(&self) -> PollPhase {
        lock(&self.shared.state).phase
    }

    pub fn has_active_timer(&self) -> bool {
        lock(&self.shared.state).timer.is_some()
    }

    pub fn has_run_initial(&self) -> bool {
        lock(&self.shared.state).has_run_initial
    }

    pub fn options(&self) -> PollOptions {
        lock(&self.shared.state).options.clone()
    }

    fn dispatch(&self, trigger: PollTrigger) {
        let callback = lock(&self.shared.callback).clone();
        debug!(
            event = "core.poll.fetch_dispatched",
            poll = %self.shared.name,
            trigger = ?trigger,
        );
        self.shared.ctx.runtime.spawn(callback(trigger));
    }
}

impl std::fmt::Debug for PollScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollScheduler")
            .field("name", &self.shared.name)
            .field("phase", &self.phase())
            .finish()
    }
}
