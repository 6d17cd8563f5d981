use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::Tag;

struct Entry<T> {
    value: T,
    tag: Option<Tag>,
    removed: Cell<bool>,
}

/// Bookkeeping for the traversal currently running inside [`UpdateList::update`].
struct Pass<T> {
    /// Index of the entry whose callback is running (fast path only).
    cursor: usize,
    forked: bool,
    /// Entries that followed the cursor when the list was first mutated mid-pass.
    suffix: Option<Vec<Rc<Entry<T>>>>,
}

struct Inner<T> {
    entries: Vec<Rc<Entry<T>>>,
    pass: Option<Pass<T>>,
}

impl<T> Inner<T> {
    /// Captures the not-yet-visited entries the first time the list changes during a pass.
    fn fork(&mut self) {
        if let Some(pass) = self.pass.as_mut() {
            if !pass.forked {
                pass.forked = true;
                pass.suffix = Some(
                    self.entries
                        .get(pass.cursor + 1..)
                        .map(<[_]>::to_vec)
                        .unwrap_or_default(),
                );
            }
        }
    }

    fn detach(&mut self, entry: &Rc<Entry<T>>) -> Option<Rc<Entry<T>>> {
        let index = self.entries.iter().position(|e| Rc::ptr_eq(e, entry))?;
        let removed = self.entries.remove(index);
        removed.removed.set(true);
        Some(removed)
    }
}

/// Ordered collection of active objects that may be mutated while it is being updated.
///
/// `update` walks the live list by index. The first `add`/`remove`/`clear` issued
/// from inside a callback forks the pass: the entries that had not been visited
/// yet are captured, and the rest of the pass walks that capture, skipping
/// anything removed in the meantime. Entries added mid-pass are first visited on
/// the next pass; no entry is visited twice.
///
/// Handles are cheap to clone and share the same list.
pub struct UpdateList<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T> Clone for UpdateList<T> {
    fn clone(&self) -> Self {
        Self { inner: Rc::clone(&self.inner) }
    }
}

impl<T> Default for UpdateList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for UpdateList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("UpdateList")
            .field("len", &inner.entries.len())
            .field("updating", &inner.pass.is_some())
            .finish()
    }
}

impl<T> UpdateList<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner { entries: Vec::new(), pass: None })),
        }
    }

    pub fn add(&self, value: T) {
        self.push(value, None);
    }

    pub fn add_tagged(&self, value: T, tag: impl Into<Tag>) {
        self.push(value, Some(tag.into()));
    }

    fn push(&self, value: T, tag: Option<Tag>) {
        let mut inner = self.inner.borrow_mut();
        inner.fork();
        inner.entries.push(Rc::new(Entry { value, tag, removed: Cell::new(false) }));
    }

    /// Removes every entry carrying `tag`. Returns whether anything was removed.
    pub fn remove(&self, tag: impl Into<Tag>) -> bool {
        let tag = tag.into();
        self.remove_where(|_, t| t == Some(&tag))
    }

    /// Removes every entry equal to `value`. Returns whether anything was removed.
    pub fn remove_value(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.remove_where(|v, _| v == value)
    }

    fn remove_where(&self, mut matches: impl FnMut(&T, Option<&Tag>) -> bool) -> bool {
        let removed: Vec<Rc<Entry<T>>> = {
            let mut inner = self.inner.borrow_mut();
            if !inner.entries.iter().any(|e| matches(&e.value, e.tag.as_ref())) {
                return false;
            }
            inner.fork();
            let (gone, kept) = std::mem::take(&mut inner.entries)
                .into_iter()
                .partition(|e| matches(&e.value, e.tag.as_ref()));
            inner.entries = kept;
            gone
        };
        for entry in &removed {
            entry.removed.set(true);
        }
        // Values are dropped here, after the list is released.
        drop(removed);
        true
    }

    pub fn clear(&self) {
        let removed = {
            let mut inner = self.inner.borrow_mut();
            inner.fork();
            std::mem::take(&mut inner.entries)
        };
        for entry in &removed {
            entry.removed.set(true);
        }
    }

    #[inline]
    pub fn is_clear(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.is_clear()
    }

    /// Snapshot of the current values in order.
    pub fn values(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.inner.borrow().entries.iter().map(|e| e.value.clone()).collect()
    }

    /// Calls `f` once for every entry present when the pass starts, in insertion order.
    ///
    /// When `remove_if_true` is set, entries for which `f` returns `true` are
    /// removed after their call.
    ///
    /// # Panics
    /// Panics if called from inside a callback of an `update` on the same list.
    pub fn update(&self, mut f: impl FnMut(&T) -> bool, remove_if_true: bool) {
        {
            let mut inner = self.inner.borrow_mut();
            assert!(
                inner.pass.is_none(),
                "UpdateList::update called re-entrantly on the same list"
            );
            inner.pass = Some(Pass { cursor: 0, forked: false, suffix: None });
        }
        let _guard = PassGuard(&self.inner);

        // Fast path: walk the live list until a callback mutates it.
        let mut index = 0;
        loop {
            let entry = {
                let mut inner = self.inner.borrow_mut();
                let Some(entry) = inner.entries.get(index).cloned() else {
                    break;
                };
                if let Some(pass) = inner.pass.as_mut() {
                    pass.cursor = index;
                }
                entry
            };

            let done = f(&entry.value) && remove_if_true;

            let mut inner = self.inner.borrow_mut();
            let forked = inner.pass.as_ref().is_some_and(|p| p.forked);
            if forked {
                let detached = if done { inner.detach(&entry) } else { None };
                drop(inner);
                drop(detached);
                break;
            }
            if done {
                let removed = inner.entries.remove(index);
                removed.removed.set(true);
                drop(inner);
                drop(removed);
            } else {
                index += 1;
            }
        }

        // Slow path: finish over the entries captured at the fork.
        let suffix = self
            .inner
            .borrow_mut()
            .pass
            .as_mut()
            .and_then(|p| p.suffix.take());
        let Some(suffix) = suffix else {
            return;
        };
        for entry in suffix {
            if entry.removed.get() {
                continue;
            }
            if f(&entry.value) && remove_if_true {
                let detached = self.inner.borrow_mut().detach(&entry);
                drop(detached);
            }
        }
    }
}

/// Ends the pass even if a callback unwinds.
struct PassGuard<'a, T>(&'a Rc<RefCell<Inner<T>>>);

impl<T> Drop for PassGuard<'_, T> {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.0.try_borrow_mut() {
            inner.pass = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashSet;

    fn visit_all(list: &UpdateList<&'static str>) -> Vec<&'static str> {
        let mut seen = Vec::new();
        list.update(|v| { seen.push(*v); false }, false);
        seen
    }

    // ── basics ────────────────────────────────────────────────────────────

    #[test]
    fn visits_in_insertion_order() {
        let list = UpdateList::new();
        list.add("a");
        list.add("b");
        list.add("c");
        assert_eq!(visit_all(&list), vec!["a", "b", "c"]);
    }

    #[test]
    fn remove_if_true_drops_done_entries() {
        let list = UpdateList::new();
        for v in [1, 2, 3, 4] {
            list.add(v);
        }
        list.update(|v| v % 2 == 0, true);
        assert_eq!(list.values(), vec![1, 3]);
    }

    #[test]
    fn done_ignored_without_remove_flag() {
        let list = UpdateList::new();
        list.add(1);
        list.update(|_| true, false);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn remove_by_tag_and_value() {
        let list = UpdateList::new();
        list.add_tagged(1, "one");
        list.add_tagged(2, "two");
        list.add(3);
        assert!(list.remove("one"));
        assert!(!list.remove("one"));
        assert!(list.remove_value(&3));
        assert_eq!(list.values(), vec![2]);
    }

    #[test]
    fn clear_empties() {
        let list = UpdateList::new();
        list.add(1);
        assert!(!list.is_clear());
        list.clear();
        assert!(list.is_clear());
    }

    // ── re-entrant mutation ───────────────────────────────────────────────

    #[test]
    fn remove_later_and_add_during_pass() {
        let list: UpdateList<&'static str> = UpdateList::new();
        list.add_tagged("A", "A");
        list.add_tagged("B", "B");
        list.add_tagged("C", "C");

        let handle = list.clone();
        let mut seen = Vec::new();
        list.update(
            |v| {
                seen.push(*v);
                if *v == "A" {
                    handle.remove("B");
                    handle.add_tagged("D", "D");
                }
                false
            },
            false,
        );
        assert_eq!(seen, vec!["A", "C"]);
        assert_eq!(visit_all(&list), vec!["A", "C", "D"]);
    }

    #[test]
    fn entry_removing_itself_is_not_revisited() {
        let list: UpdateList<&'static str> = UpdateList::new();
        list.add_tagged("A", "A");
        list.add_tagged("B", "B");
        list.add_tagged("C", "C");

        let handle = list.clone();
        let mut seen = Vec::new();
        list.update(
            |v| {
                seen.push(*v);
                if *v == "B" {
                    handle.remove("B");
                }
                false
            },
            false,
        );
        assert_eq!(seen, vec!["A", "B", "C"]);
        assert_eq!(list.values(), vec!["A", "C"]);
    }

    #[test]
    fn removing_earlier_entry_does_not_skip_next() {
        let list: UpdateList<&'static str> = UpdateList::new();
        list.add_tagged("A", "A");
        list.add_tagged("B", "B");
        list.add_tagged("C", "C");

        let handle = list.clone();
        let mut seen = Vec::new();
        list.update(
            |v| {
                seen.push(*v);
                if *v == "B" {
                    handle.remove("A");
                }
                false
            },
            false,
        );
        assert_eq!(seen, vec!["A", "B", "C"]);
    }

    #[test]
    fn clear_mid_pass_stops_remaining_entries() {
        let list = UpdateList::new();
        for v in [1, 2, 3] {
            list.add(v);
        }
        let handle = list.clone();
        let mut seen = Vec::new();
        list.update(
            |v| {
                seen.push(*v);
                if *v == 1 {
                    handle.clear();
                }
                false
            },
            false,
        );
        assert_eq!(seen, vec![1]);
        assert!(list.is_clear());
    }

    #[test]
    fn done_entry_removed_after_fork() {
        let list = UpdateList::new();
        for v in [1, 2, 3] {
            list.add(v);
        }
        let handle = list.clone();
        list.update(
            |v| {
                if *v == 1 {
                    handle.add(4);
                }
                *v != 2
            },
            true,
        );
        assert_eq!(list.values(), vec![2, 4]);
    }

    // ── mixed sequences ───────────────────────────────────────────────────

    #[derive(Debug, Clone, Copy)]
    enum Op {
        Add(u32),
        Remove(u32),
        Clear,
    }

    #[test]
    fn mixed_mutation_visits_each_live_entry_once_in_order() {
        for seed in 0..500 {
            let mut rng = StdRng::seed_from_u64(seed);
            let initial: Vec<u32> = (0..rng.gen_range(0..10u32)).collect();
            let list = UpdateList::new();
            for &id in &initial {
                list.add(id);
            }

            // Run one pass with random mutations, recording what each callback did.
            let handle = list.clone();
            let mut next_id = initial.len() as u32;
            let mut trace: Vec<(u32, Vec<Op>, bool)> = Vec::new();
            list.update(
                |&id| {
                    let mut ops = Vec::new();
                    for _ in 0..rng.gen_range(0..3) {
                        let op = match rng.gen_range(0..20) {
                            0 => Op::Clear,
                            1..=9 => Op::Remove(rng.gen_range(0..next_id)),
                            _ => {
                                next_id += 1;
                                Op::Add(next_id - 1)
                            }
                        };
                        match op {
                            Op::Add(new) => handle.add(new),
                            Op::Remove(old) => {
                                handle.remove_value(&old);
                            }
                            Op::Clear => handle.clear(),
                        }
                        ops.push(op);
                    }
                    let done = rng.gen_bool(0.3);
                    trace.push((id, ops, done));
                    done
                },
                true,
            );

            // Replay the trace against a plain model of the list.
            let mut live = initial.clone();
            let mut gone = HashSet::new();
            let mut steps = trace.iter();
            for &id in &initial {
                if gone.contains(&id) {
                    continue;
                }
                let Some((visited, ops, done)) = steps.next() else {
                    panic!("seed {seed}: {id} was never visited");
                };
                assert_eq!(*visited, id, "seed {seed}");
                for op in ops {
                    match *op {
                        Op::Add(new) => live.push(new),
                        Op::Remove(old) => {
                            if live.contains(&old) {
                                gone.insert(old);
                                live.retain(|&v| v != old);
                            }
                        }
                        Op::Clear => gone.extend(live.drain(..)),
                    }
                }
                if *done {
                    live.retain(|&v| v != id);
                }
            }
            assert!(steps.next().is_none(), "seed {seed}: visited an entry twice or after removal");
            assert_eq!(list.values(), live, "seed {seed}");

            let mut seen = Vec::new();
            list.update(|v| { seen.push(*v); false }, false);
            assert_eq!(seen, live, "seed {seed}");
        }
    }

    #[test]
    #[should_panic(expected = "re-entrantly")]
    fn nested_update_same_list_panics() {
        let list = UpdateList::new();
        list.add(1);
        let handle = list.clone();
        list.update(|_| { handle.update(|_| false, false); false }, false);
    }

    #[test]
    fn list_usable_after_panicking_pass() {
        let list = UpdateList::new();
        list.add(1);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            list.update(|_| panic!("boom"), false);
        }));
        assert!(result.is_err());
        let mut count = 0;
        list.update(|_| { count += 1; false }, false);
        assert_eq!(count, 1);
    }
}
