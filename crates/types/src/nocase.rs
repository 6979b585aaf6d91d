//! The insertion-ordered, case-insensitively keyed map used for every
//! named child collection in the CIM object model.

use indexmap::{map, Equivalent, IndexMap};
use std::fmt::{self, Debug, Formatter};
use std::hash::{Hash, Hasher};

/// An insertion-ordered map whose string keys compare case-insensitively.
///
/// CIM requires every name-keyed child collection (properties, methods,
/// parameters, qualifiers, keybindings) to preserve the order in which the
/// server delivered its entries while treating `Name`, `NAME`, and `name`
/// as the same key. Keys keep the casing they were first inserted with.
///
/// Equality ignores entry order, matching the mapping semantics of the
/// model: two collections are equal when they hold the same keys (case-
/// insensitively) with equal values.
///
/// ```
/// use wbem_types::NocaseMap;
///
/// let mut map = NocaseMap::new();
/// map.insert("CreationClassName", 1);
/// map.insert("Name", 2);
/// assert_eq!(map.get("NAME"), Some(&2));
/// assert_eq!(map.keys().collect::<Vec<_>>(), ["CreationClassName", "Name"]);
/// ```
#[derive(Clone)]
pub struct NocaseMap<V> {
    inner: IndexMap<Key, V>,
}

#[derive(Clone)]
struct Key(String);

fn fold_hash<H: Hasher>(s: &str, state: &mut H) {
    for c in s.chars().flat_map(char::to_lowercase) {
        state.write_u32(c as u32);
    }
    state.write_u8(0xff);
}

fn fold_eq(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        fold_hash(&self.0, state);
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        fold_eq(&self.0, &other.0)
    }
}

impl Eq for Key {}

impl Debug for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

struct Lookup<'a>(&'a str);

impl Hash for Lookup<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        fold_hash(self.0, state);
    }
}

impl Equivalent<Key> for Lookup<'_> {
    fn equivalent(&self, key: &Key) -> bool {
        fold_eq(self.0, &key.0)
    }
}

impl<V> NocaseMap<V> {
    /// Constructs an empty map.
    pub fn new() -> Self {
        Self {
            inner: IndexMap::new(),
        }
    }

    /// Constructs an empty map with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: IndexMap::with_capacity(capacity),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Inserts an entry, returning the previous value for the key if any.
    ///
    /// When the key (case-insensitively) already exists, the stored key
    /// casing and position are preserved and only the value is replaced.
    pub fn insert(&mut self, name: impl Into<String>, value: V) -> Option<V> {
        self.inner.insert(Key(name.into()), value)
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&V> {
        self.inner.get(&Lookup(name))
    }

    /// Case-insensitive mutable lookup.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut V> {
        self.inner.get_mut(&Lookup(name))
    }

    /// Case-insensitive lookup returning the stored key casing as well.
    pub fn get_key_value(&self, name: &str) -> Option<(&str, &V)> {
        self.inner
            .get_key_value(&Lookup(name))
            .map(|(k, v)| (k.0.as_str(), v))
    }

    /// Entry by insertion position.
    pub fn get_index(&self, index: usize) -> Option<(&str, &V)> {
        self.inner.get_index(index).map(|(k, v)| (k.0.as_str(), v))
    }

    /// True when the key is present, compared case-insensitively.
    pub fn contains_key(&self, name: &str) -> bool {
        self.inner.contains_key(&Lookup(name))
    }

    /// Removes an entry, preserving the order of the remaining entries.
    pub fn remove(&mut self, name: &str) -> Option<V> {
        self.inner.shift_remove(&Lookup(name))
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter(self.inner.iter())
    }

    /// Iterates entries in insertion order with mutable values.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut V)> {
        self.inner.iter_mut().map(|(k, v)| (k.0.as_str(), v))
    }

    /// Iterates keys in insertion order, with their stored casing.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(|k| k.0.as_str())
    }

    /// Iterates values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.inner.values()
    }

    /// Iterates values in insertion order, mutably.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.inner.values_mut()
    }
}

impl<V> Default for NocaseMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Debug> Debug for NocaseMap<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<V: PartialEq> PartialEq for NocaseMap<V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|ov| ov == v))
    }
}

impl<V: Eq> Eq for NocaseMap<V> {}

impl<V: Hash> Hash for NocaseMap<V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut entries: Vec<(String, &V)> = self
            .iter()
            .map(|(k, v)| (k.chars().flat_map(char::to_lowercase).collect(), v))
            .collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        for (k, v) in entries {
            k.hash(state);
            v.hash(state);
        }
    }
}

impl<S: Into<String>, V> FromIterator<(S, V)> for NocaseMap<V> {
    fn from_iter<I: IntoIterator<Item = (S, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<S: Into<String>, V> Extend<(S, V)> for NocaseMap<V> {
    fn extend<I: IntoIterator<Item = (S, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}

/// Borrowing iterator over a [`NocaseMap`], in insertion order.
#[derive(Debug)]
pub struct Iter<'a, V>(map::Iter<'a, Key, V>);

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(k, v)| (k.0.as_str(), v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<'a, V> IntoIterator for &'a NocaseMap<V> {
    type Item = (&'a str, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Owning iterator over a [`NocaseMap`], in insertion order.
#[derive(Debug)]
pub struct IntoIter<V>(map::IntoIter<Key, V>);

impl<V> Iterator for IntoIter<V> {
    type Item = (String, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(k, v)| (k.0, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<V> IntoIterator for NocaseMap<V> {
    type Item = (String, V);
    type IntoIter = IntoIter<V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter(self.inner.into_iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        let mut map = NocaseMap::new();
        map.insert("Name", 1);
        assert_eq!(map.get("name"), Some(&1));
        assert_eq!(map.get("NAME"), Some(&1));
        assert_eq!(map.get("nAmE"), Some(&1));
        assert!(map.contains_key("NaMe"));
        assert_eq!(map.get("Nam"), None);
    }

    #[test]
    fn insertion_order_preserved() {
        let mut map = NocaseMap::new();
        map.insert("b", 1);
        map.insert("A", 2);
        map.insert("c", 3);
        map.insert("a", 4); // replaces value, keeps position and casing
        assert_eq!(map.keys().collect::<Vec<_>>(), ["b", "A", "c"]);
        assert_eq!(map.values().copied().collect::<Vec<_>>(), [1, 4, 3]);
    }

    #[test]
    fn equality_ignores_order_and_case() {
        let left: NocaseMap<i32> = [("Alpha", 1), ("Beta", 2)].into_iter().collect();
        let right: NocaseMap<i32> = [("BETA", 2), ("alpha", 1)].into_iter().collect();
        assert_eq!(left, right);

        let different: NocaseMap<i32> = [("alpha", 1), ("beta", 3)].into_iter().collect();
        assert_ne!(left, different);
    }

    #[test]
    fn hash_consistent_with_eq() {
        use std::collections::hash_map::DefaultHasher;

        fn hash_of<V: Hash>(map: &NocaseMap<V>) -> u64 {
            let mut h = DefaultHasher::new();
            map.hash(&mut h);
            h.finish()
        }

        let left: NocaseMap<i32> = [("Alpha", 1), ("Beta", 2)].into_iter().collect();
        let right: NocaseMap<i32> = [("BETA", 2), ("alpha", 1)].into_iter().collect();
        assert_eq!(hash_of(&left), hash_of(&right));
    }

    #[test]
    fn remove_preserves_order() {
        let mut map: NocaseMap<i32> = [("a", 1), ("b", 2), ("c", 3)].into_iter().collect();
        assert_eq!(map.remove("B"), Some(2));
        assert_eq!(map.keys().collect::<Vec<_>>(), ["a", "c"]);
        assert_eq!(map.remove("b"), None);
    }
}
