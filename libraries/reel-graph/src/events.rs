//! Event/listener bus
//!
//! Each service carries one bus. Two consumption modes share a single
//! ordered subscriber list, so asynchronous listeners and blocking
//! wait-for tokens observe events in the same firing order:
//!
//! - `listen` registers a callback invoked on the firing thread every
//!   time the named event fires, until the returned `Listener` is
//!   dropped.
//! - `setup_wait_for` registers interest and returns a handle;
//!   `wait_for` blocks until the event has fired at least once since
//!   setup. Registration happens before the check, so an event firing
//!   between the two calls is never missed.
//!
//! Registering on an event name nothing ever fires is accepted; the
//! subscriber simply never runs.

use crate::playlist::ClipInfo;
use std::sync::{Arc, Condvar, Mutex, Weak};
use std::time::Duration;

/// Payload carried by a fired event
#[derive(Clone, Debug, Default)]
pub enum EventData {
    /// No payload
    #[default]
    None,
    /// A numeric payload (e.g. an entry index)
    Index(i64),
    /// A playlist clip description
    Clip(ClipInfo),
}

type Callback = Arc<dyn Fn(&EventData) + Send + Sync>;

/// Wait-for flag shared between the bus and a `WaitHandle`
struct WaitState {
    fired: Mutex<bool>,
    cond: Condvar,
}

enum SubscriberSink {
    Callback(Callback),
    Flag(Arc<WaitState>),
}

struct Subscriber {
    id: u64,
    event: String,
    sink: SubscriberSink,
}

#[derive(Default)]
struct BusInner {
    subscribers: Vec<Subscriber>,
    next_id: u64,
}

/// Per-service event dispatcher
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(BusInner::default())),
        }
    }

    /// Register an asynchronous listener
    ///
    /// The callback runs on the firing thread (for frame-driven events,
    /// the pull-loop worker), so it must not block indefinitely.
    /// Listeners on the same event fire in registration order. Dropping
    /// the returned handle deregisters the callback.
    pub fn listen(
        &self,
        event: &str,
        callback: impl Fn(&EventData) + Send + Sync + 'static,
    ) -> Listener {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push(Subscriber {
            id,
            event: event.to_string(),
            sink: SubscriberSink::Callback(Arc::new(callback)),
        });
        Listener {
            bus: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Register interest in an event ahead of a blocking wait
    pub fn setup_wait_for(&self, event: &str) -> WaitHandle {
        let state = Arc::new(WaitState {
            fired: Mutex::new(false),
            cond: Condvar::new(),
        });
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push(Subscriber {
            id,
            event: event.to_string(),
            sink: SubscriberSink::Flag(Arc::clone(&state)),
        });
        WaitHandle {
            bus: Arc::downgrade(&self.inner),
            id,
            state,
        }
    }

    /// Block until the handle's event has fired at least once since
    /// `setup_wait_for`
    pub fn wait_for(&self, handle: &WaitHandle) {
        handle.wait();
    }

    /// Fire a named event, dispatching to subscribers in registration
    /// order
    pub fn fire(&self, event: &str, data: &EventData) {
        // Collect sinks under the lock, dispatch outside it so a
        // callback may register or drop subscribers on the same bus.
        let sinks: Vec<SubscriberSink> = {
            let inner = self.inner.lock().unwrap();
            inner
                .subscribers
                .iter()
                .filter(|s| s.event == event)
                .map(|s| match &s.sink {
                    SubscriberSink::Callback(cb) => SubscriberSink::Callback(Arc::clone(cb)),
                    SubscriberSink::Flag(state) => SubscriberSink::Flag(Arc::clone(state)),
                })
                .collect()
        };

        for sink in sinks {
            match sink {
                SubscriberSink::Callback(cb) => cb(data),
                SubscriberSink::Flag(state) => {
                    *state.fired.lock().unwrap() = true;
                    state.cond.notify_all();
                }
            }
        }
    }
}

/// Handle keeping an asynchronous listener registered
///
/// Dropping the handle deregisters the callback.
pub struct Listener {
    bus: Weak<Mutex<BusInner>>,
    id: u64,
}

impl Drop for Listener {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.lock().unwrap().subscribers.retain(|s| s.id != self.id);
        }
    }
}

/// Token returned by `setup_wait_for`
///
/// Dropping the handle deregisters the interest.
pub struct WaitHandle {
    bus: Weak<Mutex<BusInner>>,
    id: u64,
    state: Arc<WaitState>,
}

impl WaitHandle {
    /// Block the calling thread until the event has fired at least once
    /// since this handle was set up
    ///
    /// Waits on a condition variable with a bounded poll interval, so
    /// the call stays responsive to the event firing without spinning.
    pub fn wait(&self) {
        let mut fired = self.state.fired.lock().unwrap();
        while !*fired {
            let (guard, _) = self
                .state
                .cond
                .wait_timeout(fired, Duration::from_millis(100))
                .unwrap();
            fired = guard;
        }
    }

    /// Non-blocking check of whether the event has fired
    pub fn has_fired(&self) -> bool {
        *self.state.fired.lock().unwrap()
    }
}

impl Drop for WaitHandle {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.lock().unwrap().subscribers.retain(|s| s.id != self.id);
        }
    }
}
