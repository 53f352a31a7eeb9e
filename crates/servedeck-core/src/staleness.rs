//! Discarding results that arrive after they stopped mattering.
//!
//! A [`StalenessGuard`] belongs to one consumer and dies exactly once, at
//! teardown. Async work captures a [`LiveToken`] at call time and checks it
//! after every await before touching shared state. [`TrackedId`] does the
//! same for a mutable selection: the id is captured at call time and
//! compared after completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::lock;

#[derive(Debug)]
pub struct StalenessGuard {
    live: Arc<AtomicBool>,
}

impl StalenessGuard {
    pub fn new() -> Self {
        Self {
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn token(&self) -> LiveToken {
        LiveToken {
            live: self.live.clone(),
        }
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Returns true only for the call that flipped the guard.
    pub fn dispose(&self) -> bool {
        self.live.swap(false, Ordering::SeqCst)
    }
}

impl Default for StalenessGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for StalenessGuard {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[derive(Debug, Clone)]
pub struct LiveToken {
    live: Arc<AtomicBool>,
}

impl LiveToken {
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

/// Shared, mutable selection. Clones observe the same value.
#[derive(Debug)]
pub struct TrackedId<K> {
    current: Arc<Mutex<Option<K>>>,
}

impl<K> Clone for TrackedId<K> {
    fn clone(&self) -> Self {
        Self {
            current: self.current.clone(),
        }
    }
}

impl<K: Clone + PartialEq> TrackedId<K> {
    pub fn new(initial: Option<K>) -> Self {
        Self {
            current: Arc::new(Mutex::new(initial)),
        }
    }

    /// Replace the selection. Returns true if it changed.
    pub fn set(&self, next: Option<K>) -> bool {
        let mut current = lock(&self.current);
        if *current == next {
            return false;
        }
        *current = next;
        true
    }

    pub fn get(&self) -> Option<K> {
        lock(&self.current).clone()
    }

    pub fn capture(&self) -> IdTicket<K> {
        IdTicket {
            captured: self.get(),
            current: self.current.clone(),
        }
    }
}

/// Selection as it was when a request started.
#[derive(Debug)]
pub struct IdTicket<K> {
    captured: Option<K>,
    current: Arc<Mutex<Option<K>>>,
}

impl<K: PartialEq> IdTicket<K> {
    pub fn key(&self) -> Option<&K> {
        self.captured.as_ref()
    }

    /// Whether the selection still matches the captured one.
    pub fn is_current(&self) -> bool {
        *lock(&self.current) == self.captured
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_dies_once() {
        let guard = StalenessGuard::new();
        let token = guard.token();
        assert!(guard.is_live());
        assert!(token.is_live());

        assert!(guard.dispose());
        assert!(!guard.dispose());
        assert!(!token.is_live());
    }

    #[test]
    fn test_drop_disposes() {
        let guard = StalenessGuard::new();
        let token = guard.token();
        drop(guard);
        assert!(!token.is_live());
    }

    #[test]
    fn test_ticket_detects_moved_selection() {
        let selection = TrackedId::new(Some("a".to_string()));
        let ticket = selection.capture();
        assert_eq!(ticket.key().map(String::as_str), Some("a"));
        assert!(ticket.is_current());

        assert!(selection.set(Some("b".to_string())));
        assert!(!ticket.is_current());

        selection.set(Some("a".to_string()));
        assert!(ticket.is_current());
    }

    #[test]
    fn test_set_same_value_is_not_a_change() {
        let selection = TrackedId::new(Some(1));
        assert!(!selection.set(Some(1)));
        assert!(selection.set(None));
        assert_eq!(selection.get(), None);
    }
}
