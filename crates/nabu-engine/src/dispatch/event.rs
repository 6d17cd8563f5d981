use std::any::Any;
use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::input::TouchData;

pub type EventName = Cow<'static, str>;

/// Payload delivered with an event.
#[derive(Clone, Default)]
pub enum EventData {
    #[default]
    None,
    Touch(TouchData),
    /// Arbitrary application payload.
    Value(Rc<dyn Any>),
}

impl EventData {
    pub fn value<V: Any>(value: V) -> Self {
        EventData::Value(Rc::new(value))
    }

    #[inline]
    pub fn touch(&self) -> Option<&TouchData> {
        match self {
            EventData::Touch(t) => Some(t),
            _ => None,
        }
    }

    pub fn downcast<V: Any>(&self) -> Option<&V> {
        match self {
            EventData::Value(v) => v.downcast_ref(),
            _ => None,
        }
    }
}

impl fmt::Debug for EventData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventData::None => f.write_str("None"),
            EventData::Touch(t) => f.debug_tuple("Touch").field(t).finish(),
            EventData::Value(_) => f.write_str("Value(..)"),
        }
    }
}

/// Identity under which listeners are registered and later removed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Allocates a new, globally unique listener id.
    pub fn new() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

type Action = Rc<dyn Fn(&EventData)>;

struct Listener {
    id: ListenerId,
    action: Action,
}

#[derive(Default)]
struct Inner {
    events: HashMap<EventName, Vec<Listener>>,
    deferred: Vec<(EventName, EventData)>,
}

/// Synchronous publish/subscribe plus a deferred event queue.
///
/// `dispatch` fans out over a snapshot of the listeners registered for the
/// event, so listeners added or removed by a handler only take effect for the
/// next dispatch. `defer` queues an event until `dispatch_deferred`, which swaps
/// the queue out before draining it.
#[derive(Clone, Default)]
pub struct EventDispatch {
    inner: Rc<RefCell<Inner>>,
}

impl fmt::Debug for EventDispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("EventDispatch")
            .field("listeners", &inner.events.values().map(Vec::len).sum::<usize>())
            .field("deferred", &inner.deferred.len())
            .finish()
    }
}

impl EventDispatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(
        &self,
        id: ListenerId,
        name: impl Into<EventName>,
        action: impl Fn(&EventData) + 'static,
    ) {
        self.inner
            .borrow_mut()
            .events
            .entry(name.into())
            .or_default()
            .push(Listener { id, action: Rc::new(action) });
    }

    /// Removes `id`'s listeners for `name`, or for every event when `name` is `None`.
    pub fn remove_listener(&self, id: ListenerId, name: Option<&str>) {
        let mut removed: Vec<Listener> = Vec::new();
        {
            let mut inner = self.inner.borrow_mut();
            for (event, listeners) in inner.events.iter_mut() {
                if name.is_some_and(|n| n != &**event) {
                    continue;
                }
                let (gone, kept): (Vec<_>, Vec<_>) =
                    std::mem::take(listeners).into_iter().partition(|l| l.id == id);
                *listeners = kept;
                removed.extend(gone);
            }
            inner.events.retain(|_, listeners| !listeners.is_empty());
        }
        drop(removed);
    }

    /// Drops every listener and any queued events.
    pub fn remove_all(&self) {
        let (events, deferred) = {
            let mut inner = self.inner.borrow_mut();
            (std::mem::take(&mut inner.events), std::mem::take(&mut inner.deferred))
        };
        drop(events);
        drop(deferred);
    }

    pub fn has_listeners(&self, name: &str) -> bool {
        self.inner.borrow().events.get(name).is_some_and(|l| !l.is_empty())
    }

    /// Total number of registered listeners across all events.
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().events.values().map(Vec::len).sum()
    }

    /// Calls every listener of `name` now.
    pub fn dispatch(&self, name: &str, data: &EventData) {
        let actions: Vec<Action> = match self.inner.borrow().events.get(name) {
            Some(listeners) => listeners.iter().map(|l| Rc::clone(&l.action)).collect(),
            None => return,
        };
        for action in actions {
            action(data);
        }
    }

    /// Queues `name` until the next [`dispatch_deferred`](Self::dispatch_deferred).
    pub fn defer(&self, name: impl Into<EventName>, data: EventData) {
        self.inner.borrow_mut().deferred.push((name.into(), data));
    }

    pub fn pending(&self) -> usize {
        self.inner.borrow().deferred.len()
    }

    /// Dispatches every queued event in FIFO order.
    ///
    /// Events deferred while draining wait for the next call.
    pub fn dispatch_deferred(&self) {
        let queued = std::mem::take(&mut self.inner.borrow_mut().deferred);
        for (name, data) in queued {
            self.dispatch(&name, &data);
        }
    }
}

/// Binds one [`ListenerId`] to an [`EventDispatch`].
///
/// Dropping or disposing the handler removes everything it registered.
pub struct EventHandler {
    dispatch: EventDispatch,
    id: ListenerId,
    did_listen: Cell<bool>,
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandler")
            .field("id", &self.id)
            .field("did_listen", &self.did_listen.get())
            .finish()
    }
}

impl EventHandler {
    pub fn new(dispatch: &EventDispatch) -> Self {
        Self {
            dispatch: dispatch.clone(),
            id: ListenerId::new(),
            did_listen: Cell::new(false),
        }
    }

    #[inline]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    #[inline]
    pub fn did_listen(&self) -> bool {
        self.did_listen.get()
    }

    #[inline]
    pub fn event_dispatch(&self) -> &EventDispatch {
        &self.dispatch
    }

    pub fn listen(&self, name: impl Into<EventName>, action: impl Fn(&EventData) + 'static) {
        self.did_listen.set(true);
        self.dispatch.add_listener(self.id, name, action);
    }

    /// Removes this handler's listeners for `name`, or all of them.
    pub fn unlisten(&self, name: Option<&str>) {
        self.dispatch.remove_listener(self.id, name);
        if name.is_none() {
            self.did_listen.set(false);
        }
    }

    pub fn dispatch(&self, name: &str, data: &EventData) {
        self.dispatch.dispatch(name, data);
    }

    pub fn defer(&self, name: impl Into<EventName>, data: EventData) {
        self.dispatch.defer(name, data);
    }

    pub fn dispose(&self) {
        if self.did_listen.get() {
            self.unlisten(None);
        }
    }
}

impl Drop for EventHandler {
    fn drop(&mut self) {
        self.dispose();
    }
}
