//! Listener registry.
//!
//! Listeners run in registration order. A failing or panicking listener is
//! reported and skipped; the remaining listeners still run. Listeners may
//! register or unregister (themselves included) while an event is being
//! delivered.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::Weak;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

use estate_core::error::AppError;
use estate_core::result::AppResult;
use estate_core::traits::ErrorReporter;

/// A registered callback.
pub type Listener = Arc<dyn Fn(&Value) -> AppResult<()> + Send + Sync>;

#[derive(Clone)]
struct Entry {
    id: u64,
    once: bool,
    callback: Listener,
}

type Registry = DashMap<String, Vec<Entry>>;

/// Event name to ordered listeners.
pub struct EventEmitter {
    /// Event name → listeners in registration order.
    listeners: Arc<Registry>,
    /// Next listener id.
    next_id: AtomicU64,
    /// Receives listener failures.
    reporter: Arc<dyn ErrorReporter>,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("events", &self.listeners.len())
            .finish()
    }
}

impl EventEmitter {
    /// Creates an empty registry.
    pub fn new(reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            listeners: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(1),
            reporter,
        }
    }

    /// Registers `callback` for `event`.
    pub fn on<F>(&self, event: &str, callback: F) -> ListenerHandle
    where
        F: Fn(&Value) -> AppResult<()> + Send + Sync + 'static,
    {
        self.register(event, Arc::new(callback), false)
    }

    /// Registers `callback` for the next delivery of `event` only.
    pub fn once<F>(&self, event: &str, callback: F) -> ListenerHandle
    where
        F: Fn(&Value) -> AppResult<()> + Send + Sync + 'static,
    {
        self.register(event, Arc::new(callback), true)
    }

    fn register(&self, event: &str, callback: Listener, once: bool) -> ListenerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .entry(event.to_string())
            .or_default()
            .push(Entry { id, once, callback });

        ListenerHandle {
            event: event.to_string(),
            id,
            registry: Arc::downgrade(&self.listeners),
        }
    }

    /// Delivers `payload` to every listener of `event`.
    ///
    /// Returns the number of listeners that completed without error.
    pub fn emit(&self, event: &str, payload: &Value) -> usize {
        // Snapshot so listeners can mutate the registry while we iterate.
        let snapshot: Vec<Entry> = match self.listeners.get(event) {
            Some(entries) => entries.clone(),
            None => return 0,
        };

        let mut delivered = 0;
        for entry in snapshot {
            let still_registered = if entry.once {
                remove(&self.listeners, event, entry.id)
            } else {
                contains(&self.listeners, event, entry.id)
            };
            if !still_registered {
                continue;
            }

            match catch_unwind(AssertUnwindSafe(|| (entry.callback)(payload))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => self.reporter.report(
                    &AppError::listener(format!("Listener for `{event}` failed: {}", e.message)),
                    "realtime.emit",
                ),
                Err(panic) => self.reporter.report(
                    &AppError::listener(format!(
                        "Listener for `{event}` panicked: {}",
                        panic_message(panic.as_ref())
                    )),
                    "realtime.emit",
                ),
            }
        }

        debug!(event, delivered, "Event emitted");
        delivered
    }

    /// Removes every listener.
    pub fn clear(&self) {
        self.listeners.clear();
    }
}

/// Unregisters one listener.
#[derive(Debug, Clone)]
pub struct ListenerHandle {
    event: String,
    id: u64,
    registry: Weak<Registry>,
}

impl ListenerHandle {
    /// Event this listener is registered for.
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Removes the listener. Returns `false` if it was already gone.
    pub fn unsubscribe(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| remove(&registry, &self.event, self.id))
    }
}

fn remove(registry: &Registry, event: &str, id: u64) -> bool {
    let Some(mut entries) = registry.get_mut(event) else {
        return false;
    };
    let before = entries.len();
    entries.retain(|e| e.id != id);
    entries.len() < before
}

fn contains(registry: &Registry, event: &str, id: u64) -> bool {
    registry
        .get(event)
        .is_some_and(|entries| entries.iter().any(|e| e.id == id))
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
