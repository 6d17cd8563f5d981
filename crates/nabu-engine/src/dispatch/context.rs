use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use super::{EventData, EventDispatch, FrameDispatch, ListenerId};

/// Dispatched on every other branch of the tree when a context is derived, and
/// on a context just before it is disposed.
pub const EVENT_INTERRUPT: &str = "event_interrupt_context";
/// Dispatched on a context as it is disposed.
pub const EVENT_DISPOSE: &str = "event_dispose_context";

struct ContextInner {
    parent: RefCell<Weak<ContextInner>>,
    frame_dispatch: FrameDispatch,
    event_dispatch: EventDispatch,
    flags: RefCell<HashMap<String, Rc<dyn Any>>>,
    derived: RefCell<Vec<Context>>,
    disposed: Cell<bool>,
}

/// A scope owning one [`FrameDispatch`] and one [`EventDispatch`].
///
/// Contexts form a tree. Deriving a child (for a modal panel, say) interrupts
/// every other context in the tree so in-flight gestures there are cancelled,
/// and new input is routed to [`get_active`](Self::get_active). Disposing a
/// context tears down its derivatives first, so nothing scheduled in a
/// disposed scope can fire afterwards.
#[derive(Clone)]
pub struct Context(Rc<ContextInner>);

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Context {}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("derived", &self.0.derived.borrow().len())
            .field("disposed", &self.0.disposed.get())
            .field("frame_dispatch", &self.0.frame_dispatch)
            .field("event_dispatch", &self.0.event_dispatch)
            .finish()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Creates a root context.
    pub fn new() -> Self {
        Context(Rc::new(ContextInner {
            parent: RefCell::new(Weak::new()),
            frame_dispatch: FrameDispatch::new(),
            event_dispatch: EventDispatch::new(),
            flags: RefCell::new(HashMap::new()),
            derived: RefCell::new(Vec::new()),
            disposed: Cell::new(false),
        }))
    }

    #[inline]
    pub fn frame_dispatch(&self) -> &FrameDispatch {
        &self.0.frame_dispatch
    }

    #[inline]
    pub fn event_dispatch(&self) -> &EventDispatch {
        &self.0.event_dispatch
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.0.disposed.get()
    }

    pub fn parent(&self) -> Option<Context> {
        self.0.parent.borrow().upgrade().map(Context)
    }

    pub fn root(&self) -> Context {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// Derived children, oldest first.
    pub fn derived(&self) -> Vec<Context> {
        self.0.derived.borrow().clone()
    }

    // ── flags ─────────────────────────────────────────────────────────────

    /// Sets a flag on this context. Derived contexts see it unless they override it.
    pub fn set<V: Any>(&self, name: impl Into<String>, value: V) {
        self.0.flags.borrow_mut().insert(name.into(), Rc::new(value));
    }

    /// Looks `name` up here, then in each ancestor.
    ///
    /// A flag stored with a different type is treated as absent at that level.
    pub fn get<V: Any + Clone>(&self, name: &str) -> Option<V> {
        let local = self
            .0
            .flags
            .borrow()
            .get(name)
            .and_then(|v| v.downcast_ref::<V>().cloned());
        match local {
            Some(v) => Some(v),
            None => self.parent().and_then(|p| p.get(name)),
        }
    }

    pub fn get_or<V: Any + Clone>(&self, name: &str, default: V) -> V {
        self.get(name).unwrap_or(default)
    }

    // ── tree ──────────────────────────────────────────────────────────────

    /// Creates a child context and makes it the active branch.
    ///
    /// Every other context in the tree receives [`EVENT_INTERRUPT`].
    pub fn derive(&self) -> Context {
        let child = Context::new();
        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        self.0.derived.borrow_mut().push(child.clone());
        log::debug!("context derived (depth {})", child.depth());

        self.root().interrupt_except(&child);
        child
    }

    fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent();
        while let Some(parent) = current {
            depth += 1;
            current = parent.parent();
        }
        depth
    }

    fn interrupt_except(&self, except: &Context) {
        if self != except {
            self.0.event_dispatch.dispatch(EVENT_INTERRUPT, &EventData::None);
        }
        for derived in self.derived() {
            derived.interrupt_except(except);
        }
    }

    /// Sends [`EVENT_INTERRUPT`] to this context and all of its derivatives.
    pub fn interrupt(&self) {
        self.0.event_dispatch.dispatch(EVENT_INTERRUPT, &EventData::None);
        for derived in self.derived() {
            derived.interrupt();
        }
    }

    /// The most recently derived leaf below this context (or this context).
    pub fn get_active(&self) -> Context {
        let mut current = self.clone();
        loop {
            let last = current.0.derived.borrow().last().cloned();
            match last {
                Some(next) => current = next,
                None => return current,
            }
        }
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    /// Runs one tick: frame dispatch, then queued events, then derived contexts.
    ///
    /// Callbacks scheduled by an event handler therefore run on a later tick.
    pub fn update(&self) {
        if self.is_disposed() {
            return;
        }
        self.0.frame_dispatch.update();
        self.0.event_dispatch.dispatch_deferred();
        for derived in self.derived() {
            derived.update();
        }
    }

    /// Calls `f` once when this context is disposed.
    pub fn on_dispose(&self, id: ListenerId, f: impl FnOnce() + 'static) {
        let f = RefCell::new(Some(f));
        self.0.event_dispatch.add_listener(id, EVENT_DISPOSE, move |_| {
            if let Some(f) = f.borrow_mut().take() {
                f();
            }
        });
    }

    /// Disposes derived contexts (depth first), fires interrupt then dispose
    /// locally, detaches from the parent and clears both dispatchers.
    ///
    /// Idempotent.
    pub fn dispose(&self) {
        if self.0.disposed.replace(true) {
            return;
        }

        for derived in self.derived() {
            derived.dispose();
        }

        self.0.event_dispatch.dispatch(EVENT_INTERRUPT, &EventData::None);
        self.0.event_dispatch.dispatch(EVENT_DISPOSE, &EventData::None);

        if let Some(parent) = self.parent() {
            parent.0.derived.borrow_mut().retain(|c| c != self);
        }
        *self.0.parent.borrow_mut() = Weak::new();

        self.0.frame_dispatch.clear();
        self.0.event_dispatch.remove_all();
        let flags = std::mem::take(&mut *self.0.flags.borrow_mut());
        drop(flags);
        log::debug!("context disposed");
    }
}
