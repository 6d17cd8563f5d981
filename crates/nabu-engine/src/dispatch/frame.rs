use std::cell::{Cell, RefCell};
use std::fmt;

use super::{Tag, UpdateList};

enum Callback {
    Once(Option<Box<dyn FnOnce()>>),
    Repeat(Box<dyn FnMut()>),
}

struct Scheduled {
    /// `None` repeats forever.
    remaining: Cell<Option<u32>>,
    callback: RefCell<Callback>,
}

impl Scheduled {
    /// Advances one tick. Returns `true` once the entry is finished.
    fn tick(&self) -> bool {
        if let Callback::Repeat(f) = &mut *self.callback.borrow_mut() {
            f();
        }

        let Some(remaining) = self.remaining.get() else {
            return false;
        };
        let remaining = remaining.saturating_sub(1);
        self.remaining.set(Some(remaining));
        if remaining > 0 {
            return false;
        }

        let once = match &mut *self.callback.borrow_mut() {
            Callback::Once(f) => f.take(),
            Callback::Repeat(_) => None,
        };
        if let Some(f) = once {
            f();
        }
        true
    }
}

/// Schedules callbacks against discrete update ticks.
///
/// - [`delay`](Self::delay): once, on the `n`th tick from now
/// - [`recur`](Self::recur): on each of the next `n` ticks
/// - [`hook`](Self::hook): on every tick until removed
///
/// Tagged entries can be cancelled with [`remove`](Self::remove). Handles are
/// cheap to clone and share the same schedule.
#[derive(Clone, Default)]
pub struct FrameDispatch {
    list: UpdateList<Scheduled>,
}

impl fmt::Debug for FrameDispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameDispatch").field("scheduled", &self.list.len()).finish()
    }
}

impl FrameDispatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires `f` once on the `frames`th tick. `0` is treated as `1`.
    pub fn delay(&self, frames: u32, f: impl FnOnce() + 'static) {
        self.schedule(Some(frames.max(1)), Callback::Once(Some(Box::new(f))), None);
    }

    pub fn delay_tagged(&self, frames: u32, tag: impl Into<Tag>, f: impl FnOnce() + 'static) {
        self.schedule(Some(frames.max(1)), Callback::Once(Some(Box::new(f))), Some(tag.into()));
    }

    /// Fires `f` on each of the next `frames` ticks. `0` is treated as `1`.
    pub fn recur(&self, frames: u32, f: impl FnMut() + 'static) {
        self.schedule(Some(frames.max(1)), Callback::Repeat(Box::new(f)), None);
    }

    pub fn recur_tagged(&self, frames: u32, tag: impl Into<Tag>, f: impl FnMut() + 'static) {
        self.schedule(Some(frames.max(1)), Callback::Repeat(Box::new(f)), Some(tag.into()));
    }

    /// Fires `f` on every tick until removed or cleared.
    pub fn hook(&self, f: impl FnMut() + 'static) {
        self.schedule(None, Callback::Repeat(Box::new(f)), None);
    }

    pub fn hook_tagged(&self, tag: impl Into<Tag>, f: impl FnMut() + 'static) {
        self.schedule(None, Callback::Repeat(Box::new(f)), Some(tag.into()));
    }

    /// Fires `f` on the next tick only.
    pub fn once(&self, f: impl FnMut() + 'static) {
        self.recur(1, f);
    }

    pub fn once_tagged(&self, tag: impl Into<Tag>, f: impl FnMut() + 'static) {
        self.recur_tagged(1, tag, f);
    }

    fn schedule(&self, remaining: Option<u32>, callback: Callback, tag: Option<Tag>) {
        let entry = Scheduled {
            remaining: Cell::new(remaining),
            callback: RefCell::new(callback),
        };
        match tag {
            Some(tag) => self.list.add_tagged(entry, tag),
            None => self.list.add(entry),
        }
    }

    /// Advances every scheduled entry by one tick.
    pub fn update(&self) {
        self.list.update(Scheduled::tick, true);
    }

    /// Cancels every entry scheduled with `tag`.
    pub fn remove(&self, tag: impl Into<Tag>) -> bool {
        self.list.remove(tag)
    }

    pub fn clear(&self) {
        self.list.clear();
    }

    #[inline]
    pub fn is_clear(&self) -> bool {
        self.list.is_clear()
    }

    pub fn dispose(&self) {
        self.clear();
    }
}
