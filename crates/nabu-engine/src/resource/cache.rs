use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Json,
    Image,
    Text,
    Bundle,
}

impl AssetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AssetKind::Json => "json",
            AssetKind::Image => "image",
            AssetKind::Text => "text",
            AssetKind::Bundle => "asset",
        }
    }
}

/// Identity of a cached asset: kind, logical name and source URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetKey {
    pub kind: AssetKind,
    pub name: String,
    pub url: String,
}

impl AssetKey {
    pub fn new(kind: AssetKind, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self { kind, name: name.into(), url: url.into() }
    }

    /// Key for assets whose name is their URL.
    pub fn url(kind: AssetKind, url: impl Into<String>) -> Self {
        let url = url.into();
        Self { kind, name: url.clone(), url }
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.kind.as_str(), self.name, self.url)
    }
}

enum Entry<T> {
    Pending,
    Ready(T),
}

/// Poll-until-ready cache that issues each fetch at most once while in flight.
///
/// A failed fetch clears its entry, so the next request issues it again.
pub struct AssetCache<T> {
    entries: RefCell<HashMap<AssetKey, Entry<T>>>,
}

impl<T> Default for AssetCache<T> {
    fn default() -> Self {
        Self { entries: RefCell::new(HashMap::new()) }
    }
}

impl<T> fmt::Debug for AssetCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.borrow();
        let pending = entries.values().filter(|e| matches!(e, Entry::Pending)).count();
        f.debug_struct("AssetCache")
            .field("entries", &entries.len())
            .field("pending", &pending)
            .finish()
    }
}

impl<T: Clone> AssetCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the asset once ready.
    ///
    /// The first request for `key` records it as pending and calls `issue`;
    /// later requests only observe. `issue` may resolve the key synchronously.
    pub fn require(&self, key: &AssetKey, issue: impl FnOnce(&AssetKey)) -> Option<T> {
        {
            let mut entries = self.entries.borrow_mut();
            match entries.get(key) {
                Some(Entry::Ready(value)) => return Some(value.clone()),
                Some(Entry::Pending) => return None,
                None => {
                    entries.insert(key.clone(), Entry::Pending);
                }
            }
        }
        log::debug!("fetching {key}");
        issue(key);
        self.get(key)
    }

    pub fn get(&self, key: &AssetKey) -> Option<T> {
        match self.entries.borrow().get(key) {
            Some(Entry::Ready(value)) => Some(value.clone()),
            _ => None,
        }
    }

    /// Stores a fetched asset. Returns `false` if nothing was requested under `key`.
    pub fn resolve(&self, key: &AssetKey, value: T) -> bool {
        let mut entries = self.entries.borrow_mut();
        let requested = entries.contains_key(key);
        entries.insert(key.clone(), Entry::Ready(value));
        requested
    }

    /// Forgets a request so it is issued again next time.
    pub fn fail(&self, key: &AssetKey) -> bool {
        let removed = self.entries.borrow_mut().remove(key);
        if removed.is_some() {
            log::warn!("fetch failed: {key}");
        }
        removed.is_some()
    }

    pub fn is_pending(&self, key: &AssetKey) -> bool {
        matches!(self.entries.borrow().get(key), Some(Entry::Pending))
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn key() -> AssetKey {
        AssetKey::url(AssetKind::Image, "sheet.png")
    }

    #[test]
    fn key_display_joins_parts() {
        assert_eq!(key().to_string(), "image:sheet.png:sheet.png");
    }

    #[test]
    fn in_flight_request_is_not_reissued() {
        let cache = AssetCache::<u32>::new();
        let issued = Cell::new(0);
        assert_eq!(cache.require(&key(), |_| issued.set(issued.get() + 1)), None);
        assert_eq!(cache.require(&key(), |_| issued.set(issued.get() + 1)), None);
        assert_eq!(issued.get(), 1);
        assert!(cache.is_pending(&key()));

        assert!(cache.resolve(&key(), 7));
        assert_eq!(cache.require(&key(), |_| issued.set(issued.get() + 1)), Some(7));
        assert_eq!(issued.get(), 1);
    }

    #[test]
    fn failure_allows_retry() {
        let cache = AssetCache::<u32>::new();
        let issued = Cell::new(0);
        cache.require(&key(), |_| issued.set(issued.get() + 1));
        assert!(cache.fail(&key()));
        assert!(cache.is_empty());
        cache.require(&key(), |_| issued.set(issued.get() + 1));
        assert_eq!(issued.get(), 2);
    }

    #[test]
    fn synchronous_fetch_resolves_immediately() {
        let cache = AssetCache::<&'static str>::new();
        let got = cache.require(&key(), |k| {
            cache.resolve(k, "pixels");
        });
        assert_eq!(got, Some("pixels"));
    }
}
