use rustc_hash::FxHashMap;
use std::hash::Hash;

pub trait InternKey: From<usize> + Into<usize> + Clone + Copy + PartialEq + Eq + Hash {}

impl InternKey for usize {}

/// Interns values of `T` behind a small `Copy` key, so repeated equal values
/// (method names, above all) compare and hash as a single integer instead of
/// re-hashing the underlying string on every lookup.
#[derive(Debug, Clone)]
pub struct InternTable<T: Clone + Eq + Hash, Key: InternKey = usize> {
    items: Vec<T>,
    item_map: FxHashMap<T, Key>,
}

impl<T: Clone + Eq + Hash, Key: InternKey> Default for InternTable<T, Key> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            item_map: FxHashMap::default(),
        }
    }
}

impl<T: Clone + Eq + Hash, Key: InternKey> InternTable<T, Key> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, item: T) -> Key {
        if let Some(key) = self.item_map.get(&item) {
            return *key;
        }
        let key = Key::from(self.items.len());
        self.items.push(item.clone());
        self.item_map.insert(item, key);
        key
    }

    pub fn resolve(&self, key: Key) -> Option<&T> {
        self.items.get(key.into())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
