use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::debug;

use crate::lock;
use crate::ports::{EventHandler, EventSource, Subscription};

/// In-process event registry.
///
/// Cheap to clone; clones share handlers. Handlers run outside the registry
/// lock, so a handler may subscribe or unsubscribe.
#[derive(Clone, Default)]
pub struct EventHub {
    inner: Arc<Mutex<HubInner>>,
}

#[derive(Default)]
struct HubInner {
    next_id: u64,
    handlers: Vec<Registration>,
}

struct Registration {
    id: u64,
    event: String,
    handler: EventHandler,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `payload` to every handler registered for `event`, in
    /// registration order. Returns the number of handlers called.
    pub fn emit(&self, event: &str, payload: &Value) -> usize {
        let handlers: Vec<EventHandler> = lock(&self.inner)
            .handlers
            .iter()
            .filter(|r| r.event == event)
            .map(|r| r.handler.clone())
            .collect();

        if handlers.is_empty() {
            debug!(event = "core.events.emit_dropped", name = event);
        }
        for handler in &handlers {
            handler(payload);
        }
        handlers.len()
    }

    pub fn handler_count(&self, event: &str) -> usize {
        lock(&self.inner)
            .handlers
            .iter()
            .filter(|r| r.event == event)
            .count()
    }
}

impl EventSource for EventHub {
    fn subscribe(&self, event: &str, handler: EventHandler) -> Subscription {
        let id = {
            let mut inner = lock(&self.inner);
            inner.next_id += 1;
            let id = inner.next_id;
            inner.handlers.push(Registration {
                id,
                event: event.to_string(),
                handler,
            });
            id
        };

        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                lock(&inner).handlers.retain(|r| r.id != id);
            }
        })
    }
}
