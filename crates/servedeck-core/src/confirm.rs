//! Multi-step confirmation in front of destructive actions.

use std::future::Future;

use futures::future::BoxFuture;
use tracing::info;

use crate::runtime::Runtime;

/// Asks the user a yes/no question.
pub trait ConfirmPrompt: Send + Sync {
    fn ask(&self, message: &str) -> BoxFuture<'static, bool>;
}

pub struct ConfirmationStep {
    pub message: String,
    on_cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl ConfirmationStep {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            on_cancel: None,
        }
    }

    /// Runs if the user declines this step.
    pub fn on_cancel(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_cancel = Some(Box::new(f));
        self
    }
}

impl std::fmt::Debug for ConfirmationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationStep")
            .field("message", &self.message)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationOutcome<T> {
    /// Every step was confirmed and the action ran.
    Confirmed(T),
    /// The user declined step `step` (zero-based).
    Cancelled { step: usize },
}

impl<T> ConfirmationOutcome<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ConfirmationOutcome::Cancelled { .. })
    }
}

/// Linear chain of prompts ending in one action.
///
/// Each prompt after the first is asked only after a `yield_turn`, never
/// inside the previous answer. A declined step ends the flow: later prompts
/// are not asked and the action never runs.
#[derive(Debug, Default)]
pub struct ConfirmationSequence {
    steps: Vec<ConfirmationStep>,
}

impl ConfirmationSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, step: ConfirmationStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub async fn run<T, F, Fut>(
        self,
        prompt: &dyn ConfirmPrompt,
        runtime: &dyn Runtime,
        action: F,
    ) -> ConfirmationOutcome<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        for (index, step) in self.steps.into_iter().enumerate() {
            if index > 0 {
                runtime.yield_turn().await;
            }
            if !prompt.ask(&step.message).await {
                info!(event = "core.confirm.cancelled", step = index);
                if let Some(on_cancel) = step.on_cancel {
                    on_cancel();
                }
                return ConfirmationOutcome::Cancelled { step: index };
            }
        }
        ConfirmationOutcome::Confirmed(action().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ManualClock, ManualRuntime, ScriptedPrompt};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    fn two_steps(cancelled: Arc<AtomicUsize>) -> ConfirmationSequence {
        let first = cancelled.clone();
        ConfirmationSequence::new()
            .step(ConfirmationStep::new("first?").on_cancel(move || {
                first.fetch_add(1, Ordering::SeqCst);
            }))
            .step(ConfirmationStep::new("second?").on_cancel(move || {
                cancelled.fetch_add(10, Ordering::SeqCst);
            }))
    }

    #[test]
    fn test_all_confirmed_runs_action_after_deferred_tick() {
        let runtime = Arc::new(ManualRuntime::new(Arc::new(ManualClock::new())));
        let prompt = Arc::new(ScriptedPrompt::new([true, true]));
        let cancelled = Arc::new(AtomicUsize::new(0));
        let sequence = two_steps(cancelled.clone());

        let (rt, p) = (runtime.clone(), prompt.clone());
        let mut rx = runtime.spawn_with_output(async move {
            sequence.run(p.as_ref(), rt.as_ref(), || async { 42 }).await
        });
        runtime.run_until_stalled();

        assert_eq!(rx.try_recv().unwrap(), Some(ConfirmationOutcome::Confirmed(42)));
        assert_eq!(prompt.asked(), vec!["first?", "second?"]);
        assert_eq!(runtime.yield_count(), 1);
        assert_eq!(cancelled.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancel_at_first_step_stops_everything() {
        let runtime = Arc::new(ManualRuntime::new(Arc::new(ManualClock::new())));
        let prompt = Arc::new(ScriptedPrompt::new([false, true]));
        let cancelled = Arc::new(AtomicUsize::new(0));
        let ran = Arc::new(AtomicBool::new(false));
        let sequence = two_steps(cancelled.clone());

        let (rt, p, flag) = (runtime.clone(), prompt.clone(), ran.clone());
        let mut rx = runtime.spawn_with_output(async move {
            sequence
                .run(p.as_ref(), rt.as_ref(), || async move {
                    flag.store(true, Ordering::SeqCst);
                })
                .await
        });
        runtime.run_until_stalled();

        assert_eq!(
            rx.try_recv().unwrap(),
            Some(ConfirmationOutcome::Cancelled { step: 0 })
        );
        assert_eq!(prompt.asked(), vec!["first?"]);
        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(cancelled.load(Ordering::SeqCst), 1);
        assert_eq!(runtime.yield_count(), 0);
    }

    #[test]
    fn test_cancel_at_second_step() {
        let runtime = Arc::new(ManualRuntime::new(Arc::new(ManualClock::new())));
        let prompt = Arc::new(ScriptedPrompt::new([true, false]));
        let cancelled = Arc::new(AtomicUsize::new(0));
        let sequence = two_steps(cancelled.clone());

        let (rt, p) = (runtime.clone(), prompt.clone());
        let mut rx = runtime.spawn_with_output(async move {
            sequence.run(p.as_ref(), rt.as_ref(), || async { 1 }).await
        });
        runtime.run_until_stalled();

        assert_eq!(
            rx.try_recv().unwrap(),
            Some(ConfirmationOutcome::Cancelled { step: 1 })
        );
        assert_eq!(cancelled.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_empty_sequence_runs_action() {
        let runtime = ManualRuntime::new(Arc::new(ManualClock::new()));
        let prompt = ScriptedPrompt::new([]);
        let outcome = futures::executor::block_on(
            ConfirmationSequence::new().run(&prompt, &runtime, || async { "ok" }),
        );
        assert_eq!(outcome, ConfirmationOutcome::Confirmed("ok"));
        assert!(prompt.asked().is_empty());
    }
}
