use std::fmt;
use std::future::Future;

use super::{Coroutine, Yielder};
use crate::dispatch::{Tag, UpdateList};

/// Steps every running coroutine once per tick, dropping finished ones.
#[derive(Clone, Default)]
pub struct CoroutineManager {
    coroutines: UpdateList<Coroutine>,
}

impl fmt::Debug for CoroutineManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoroutineManager").field("running", &self.coroutines.len()).finish()
    }
}

impl CoroutineManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `f`'s body on the next [`update`](Self::update).
    pub fn run<F, Fut>(&self, f: F) -> Coroutine
    where
        F: FnOnce(Yielder) -> Fut,
        Fut: Future<Output = ()> + 'static,
    {
        self.add(Coroutine::with_yielder(f))
    }

    pub fn run_tagged<F, Fut>(&self, tag: impl Into<Tag>, f: F) -> Coroutine
    where
        F: FnOnce(Yielder) -> Fut,
        Fut: Future<Output = ()> + 'static,
    {
        let coroutine = Coroutine::with_yielder(f);
        self.coroutines.add_tagged(coroutine.clone(), tag);
        coroutine
    }

    pub fn add(&self, coroutine: Coroutine) -> Coroutine {
        self.coroutines.add(coroutine.clone());
        coroutine
    }

    pub fn remove(&self, tag: impl Into<Tag>) -> bool {
        self.coroutines.remove(tag)
    }

    pub fn update(&self) {
        self.coroutines.update(Coroutine::update, true);
    }

    pub fn clear(&self) {
        for coroutine in self.coroutines.values() {
            coroutine.cancel();
        }
        self.coroutines.clear();
    }

    #[inline]
    pub fn is_clear(&self) -> bool {
        self.coroutines.is_clear()
    }

    pub fn dispose(&self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn completed_coroutines_are_removed() {
        let manager = CoroutineManager::new();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        manager.run(move |co| async move {
            h.set(h.get() + 1);
            co.frames(2).await;
            h.set(h.get() + 1);
        });
        manager.update();
        assert_eq!(hits.get(), 1);
        manager.update();
        assert!(!manager.is_clear());
        manager.update();
        assert_eq!(hits.get(), 2);
        assert!(manager.is_clear());
    }

    #[test]
    fn coroutine_can_start_another() {
        let manager = CoroutineManager::new();
        let order = Rc::new(Cell::new(0));
        let m = manager.clone();
        let o = Rc::clone(&order);
        manager.run(move |_| async move {
            let o2 = Rc::clone(&o);
            m.run(move |_| async move {
                o2.set(2);
            });
            o.set(1);
        });
        manager.update();
        assert_eq!(order.get(), 1);
        manager.update();
        assert_eq!(order.get(), 2);
        assert!(manager.is_clear());
    }

    #[test]
    fn clear_cancels_suspended_bodies() {
        let manager = CoroutineManager::new();
        let reached = Rc::new(Cell::new(false));
        let r = Rc::clone(&reached);
        let co = manager.run(move |co| async move {
            co.frame().await;
            r.set(true);
        });
        manager.update();
        manager.clear();
        assert!(co.is_complete());
        manager.update();
        assert!(!reached.get());
    }
}
