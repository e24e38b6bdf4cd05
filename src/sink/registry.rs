//! Callback registry.
//!
//! Maps event names to ordered listener lists, plus a global list invoked
//! for every event.
//!
//! # Dispatch
//!
//! For one inbound message, listeners registered for its event run first,
//! then global listeners, each in registration order. Dispatch iterates a
//! snapshot, so listeners may register or dispose (themselves or others)
//! while running:
//!
//! - a listener disposed before its turn is skipped
//! - a listener registered mid-dispatch runs from the next message on
//!
//! A panicking listener is caught, logged and reported in the
//! [`DispatchOutcome`]; the remaining listeners still run.

// ============================================================================
// Imports
// ============================================================================

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::{debug, error, trace};

use crate::error::Error;
use crate::identifiers::ListenerId;
use crate::protocol::InboundMessage;

// ============================================================================
// Types
// ============================================================================

/// Listener callback.
///
/// Receives the event object (`data` of the inbound frame).
pub type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

// ============================================================================
// EventFilter
// ============================================================================

/// Which events a listener receives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventFilter {
    /// Only events with this name.
    Named(String),
    /// Every event (global listener).
    Any,
}

impl From<&str> for EventFilter {
    fn from(event: &str) -> Self {
        Self::Named(event.to_owned())
    }
}

impl From<String> for EventFilter {
    fn from(event: String) -> Self {
        Self::Named(event)
    }
}

impl<T: Into<EventFilter>> From<Option<T>> for EventFilter {
    fn from(event: Option<T>) -> Self {
        event.map_or(Self::Any, Into::into)
    }
}

// ============================================================================
// Entry
// ============================================================================

/// A registered listener.
struct Entry {
    id: ListenerId,
    filter: EventFilter,
    once: bool,
    /// Cleared on removal; dispatch skips inactive entries.
    active: AtomicBool,
    handler: Handler,
}

/// Listener tables (shared with handles).
#[derive(Default)]
struct Tables {
    by_event: FxHashMap<String, Vec<Arc<Entry>>>,
    global: Vec<Arc<Entry>>,
}

impl Tables {
    fn bucket_mut(&mut self, filter: &EventFilter) -> Option<&mut Vec<Arc<Entry>>> {
        match filter {
            EventFilter::Named(event) => self.by_event.get_mut(event),
            EventFilter::Any => Some(&mut self.global),
        }
    }

    /// Removes one listener. Returns `false` if it was not registered.
    fn remove(&mut self, filter: &EventFilter, id: ListenerId) -> bool {
        let Some(bucket) = self.bucket_mut(filter) else {
            return false;
        };
        let Some(index) = bucket.iter().position(|entry| entry.id == id) else {
            return false;
        };

        let entry = bucket.remove(index);
        entry.active.store(false, Ordering::Release);

        if let EventFilter::Named(event) = filter
            && bucket.is_empty()
        {
            self.by_event.remove(event);
        }

        true
    }
}

fn deactivate_all(entries: &[Arc<Entry>]) {
    for entry in entries {
        entry.active.store(false, Ordering::Release);
    }
}

// ============================================================================
// ListenerHandle
// ============================================================================

/// Disposer for one registration.
///
/// Dropping the handle does not remove the listener; call
/// [`dispose`](Self::dispose).
#[derive(Clone)]
pub struct ListenerHandle {
    id: ListenerId,
    filter: EventFilter,
    tables: Weak<Mutex<Tables>>,
}

impl ListenerHandle {
    /// Returns the listener id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Returns the filter the listener was registered with.
    #[inline]
    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    /// Removes the listener.
    ///
    /// Returns `true` if this call removed it. Calling again is a no-op.
    pub fn dispose(&self) -> bool {
        let Some(tables) = self.tables.upgrade() else {
            return false;
        };
        let removed = tables.lock().remove(&self.filter, self.id);
        if removed {
            debug!(listener_id = %self.id, "Listener disposed");
        }
        removed
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("id", &self.id)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// DispatchOutcome
// ============================================================================

/// Result of dispatching one message.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    /// Listeners that returned normally.
    pub delivered: usize,
    /// One [`Error::Listener`] per panicking listener.
    pub failures: Vec<Error>,
}

// ============================================================================
// CallbackRegistry
// ============================================================================

/// Event name → listeners, plus global listeners.
///
/// Cloning shares the same tables.
#[derive(Clone, Default)]
pub struct CallbackRegistry {
    tables: Arc<Mutex<Tables>>,
}

impl CallbackRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `filter`.
    pub fn on<F>(&self, filter: impl Into<EventFilter>, handler: F) -> ListenerHandle
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.register(filter.into(), Arc::new(handler), false)
    }

    /// Registers `handler` for the first matching event only.
    pub fn once<F>(&self, filter: impl Into<EventFilter>, handler: F) -> ListenerHandle
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.register(filter.into(), Arc::new(handler), true)
    }

    /// Removes a listener by id.
    ///
    /// Returns `true` if it was registered.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut tables = self.tables.lock();

        let filter = tables
            .by_event
            .iter()
            .find(|(_, bucket)| bucket.iter().any(|entry| entry.id == id))
            .map(|(event, _)| EventFilter::Named(event.clone()))
            .or_else(|| {
                tables
                    .global
                    .iter()
                    .any(|entry| entry.id == id)
                    .then_some(EventFilter::Any)
            });

        filter.is_some_and(|filter| tables.remove(&filter, id))
    }

    /// Removes listeners.
    ///
    /// - `Named(event)`: every listener for `event`; global listeners stay.
    /// - `Any`: every listener, global ones included.
    pub fn clear_listeners(&self, filter: impl Into<EventFilter>) {
        let filter = filter.into();
        let mut tables = self.tables.lock();

        match &filter {
            EventFilter::Named(event) => {
                if let Some(bucket) = tables.by_event.remove(event) {
                    deactivate_all(&bucket);
                }
            }
            EventFilter::Any => {
                for bucket in tables.by_event.values() {
                    deactivate_all(bucket);
                }
                deactivate_all(&tables.global);
                tables.by_event.clear();
                tables.global.clear();
            }
        }

        debug!(?filter, "Listeners cleared");
    }

    /// Returns the number of listeners registered for exactly `filter`.
    #[must_use]
    pub fn listener_count(&self, filter: impl Into<EventFilter>) -> usize {
        let tables = self.tables.lock();
        match filter.into() {
            EventFilter::Named(event) => tables.by_event.get(&event).map_or(0, Vec::len),
            EventFilter::Any => tables.global.len(),
        }
    }

    /// Returns `true` if no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let tables = self.tables.lock();
        tables.global.is_empty() && tables.by_event.is_empty()
    }

    /// Invokes every listener for `message`.
    ///
    /// The registry lock is not held while listeners run.
    pub fn dispatch(&self, message: &InboundMessage) -> DispatchOutcome {
        let snapshot: Vec<Arc<Entry>> = {
            let tables = self.tables.lock();
            tables
                .by_event
                .get(message.event())
                .into_iter()
                .flatten()
                .chain(tables.global.iter())
                .cloned()
                .collect()
        };

        let mut outcome = DispatchOutcome::default();

        for entry in snapshot {
            if entry.once {
                // Claim before invoking so the handler runs at most once.
                if !entry.active.swap(false, Ordering::AcqRel) {
                    continue;
                }
            } else if !entry.active.load(Ordering::Acquire) {
                continue;
            }

            let result = catch_unwind(AssertUnwindSafe(|| (entry.handler)(message.data())));

            if entry.once {
                self.tables.lock().remove(&entry.filter, entry.id);
            }

            match result {
                Ok(()) => outcome.delivered += 1,
                Err(panic) => {
                    let err = Error::listener(entry.id, panic_message(panic.as_ref()));
                    error!(
                        listener_id = %entry.id,
                        event = message.event(),
                        error = %err,
                        "Listener failed"
                    );
                    outcome.failures.push(err);
                }
            }
        }

        trace!(
            event = message.event(),
            delivered = outcome.delivered,
            failed = outcome.failures.len(),
            "Message dispatched"
        );

        outcome
    }

    fn register(&self, filter: EventFilter, handler: Handler, once: bool) -> ListenerHandle {
        let id = ListenerId::generate();
        let entry = Arc::new(Entry {
            id,
            filter: filter.clone(),
            once,
            active: AtomicBool::new(true),
            handler,
        });

        {
            let mut tables = self.tables.lock();
            match &filter {
                EventFilter::Named(event) => {
                    tables.by_event.entry(event.clone()).or_default().push(entry);
                }
                EventFilter::Any => tables.global.push(entry),
            }
        }

        debug!(listener_id = %id, ?filter, once, "Listener registered");

        ListenerHandle {
            id,
            filter,
            tables: Arc::downgrade(&self.tables),
        }
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tables = self.tables.lock();
        f.debug_struct("CallbackRegistry")
            .field("events", &tables.by_event.len())
            .field("global", &tables.global.len())
            .finish()
    }
}

/// Extracts a printable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "listener panicked".to_owned())
}

// ============================================================================
// Tests
// ============================================================================
