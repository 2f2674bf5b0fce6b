//! In-process change notifications.
//!
//! Synchronous pub/sub: handlers run on the caller's thread, in registration
//! order, before the emitting call returns. Nothing is persisted or replayed.

use serde::Serialize;
use std::sync::{Arc, RwLock};
use tracing::warn;

/// What happened to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Set,
    Remove,
}

/// Events emitted by the cache manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum CacheEvent {
    /// The manager was bound to an account.
    Initialized { owner: String },
    /// One key was written or removed.
    DataChanged { key: String, action: ChangeAction },
    /// Every key of one data type was removed.
    DataCleared { type_key: String, count: usize },
    /// Every exportable key was removed.
    AllDataCleared { count: usize },
}

/// Receives cache events.
pub trait CacheEventHandler: Send + Sync {
    fn on_event(&self, event: &CacheEvent);
}

impl<F> CacheEventHandler for F
where
    F: Fn(&CacheEvent) + Send + Sync,
{
    fn on_event(&self, event: &CacheEvent) {
        self(event)
    }
}

/// Ordered list of subscribed handlers.
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<Vec<Arc<dyn CacheEventHandler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler. Handlers are called in registration order.
    pub fn subscribe(&self, handler: Arc<dyn CacheEventHandler>) {
        match self.handlers.write() {
            Ok(mut handlers) => handlers.push(handler),
            Err(_) => warn!("event bus lock poisoned; handler not registered"),
        }
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.read().map(|h| h.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers an event to every handler.
    pub fn emit(&self, event: &CacheEvent) {
        // Snapshot the list so a handler may subscribe without deadlocking.
        let handlers: Vec<Arc<dyn CacheEventHandler>> = match self.handlers.read() {
            Ok(h) => h.clone(),
            Err(_) => {
                warn!("event bus lock poisoned; dropping {:?}", event);
                return;
            }
        };
        for handler in handlers {
            handler.on_event(event);
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").field("handlers", &self.len()).finish()
    }
}
