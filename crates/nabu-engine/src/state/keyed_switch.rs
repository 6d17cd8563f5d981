use std::fmt;

type KeyFn<K> = Box<dyn FnMut() -> Option<K>>;
type ActionFn = Box<dyn FnMut()>;

/// Picks the first key function that yields a key and runs its action when
/// that key differs from the previous pick.
///
/// Key functions are tried in the order they were added; a `None` defers to
/// the next one. When no function yields a key the current pick is kept.
pub struct KeyedSwitch<K> {
    current: Option<K>,
    entries: Vec<(KeyFn<K>, ActionFn)>,
}

impl<K> Default for KeyedSwitch<K> {
    fn default() -> Self {
        Self { current: None, entries: Vec::new() }
    }
}

impl<K: fmt::Debug> fmt::Debug for KeyedSwitch<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedSwitch")
            .field("current", &self.current)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl<K: PartialEq + fmt::Debug> KeyedSwitch<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: impl FnMut() -> Option<K> + 'static, action: impl FnMut() + 'static) -> &mut Self {
        self.entries.push((Box::new(key), Box::new(action)));
        self
    }

    #[inline]
    pub fn current(&self) -> Option<&K> {
        self.current.as_ref()
    }

    /// Re-evaluates the keys. Returns `true` if an action ran.
    pub fn update(&mut self) -> bool {
        for (key, action) in &mut self.entries {
            let Some(result) = key() else {
                continue;
            };
            if self.current.as_ref() == Some(&result) {
                return false;
            }
            log::debug!("switch to {result:?}");
            self.current = Some(result);
            action();
            return true;
        }
        false
    }
}
