//! Keep-alive connection reuse, keyed by origin (`host:port`).
//!
//! Sharing model: the pool is cheaply cloneable, each origin holds a
//! bounded lock-free queue of parked transports, and an expired entry is
//! silently dropped when a candidate is taken.

use crossbeam_queue::ArrayQueue;
use dashmap::{mapref::entry::Entry, DashMap};
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use std::time::Instant;

/// Parked transports kept per origin.
pub(crate) const DEFAULT_POOL_SIZE: usize = 16;

pub(crate) struct PoolEntry<V> {
    item: V,
    expiry: Option<Instant>,
}

impl<V: Debug> Debug for PoolEntry<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolEntry")
            .field("item", &self.item)
            .field("expiry", &self.expiry)
            .finish()
    }
}

impl<V> PoolEntry<V> {
    pub fn new(item: V, expiry: Option<Instant>) -> Self {
        Self { item, expiry }
    }

    pub fn is_expired(&self) -> bool {
        match self.expiry {
            None => false,
            Some(instant) => instant < Instant::now(),
        }
    }

    pub fn take(self) -> Option<V> {
        if self.is_expired() {
            None
        } else {
            Some(self.item)
        }
    }
}

struct PoolSet<V>(Arc<ArrayQueue<PoolEntry<V>>>);

impl<V> Clone for PoolSet<V> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<V> PoolSet<V> {
    fn new(size: usize) -> Self {
        Self(Arc::new(ArrayQueue::new(size)))
    }

    fn insert(&self, entry: PoolEntry<V>) {
        self.0.force_push(entry);
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V> Iterator for PoolSet<V> {
    type Item = PoolEntry<V>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.pop()
    }
}

pub(crate) struct Pool<V> {
    max_set_size: usize,
    connections: Arc<DashMap<String, PoolSet<V>>>,
}

impl<V> Clone for Pool<V> {
    fn clone(&self) -> Self {
        Self {
            max_set_size: self.max_set_size,
            connections: Arc::clone(&self.connections),
        }
    }
}

impl<V> Debug for Pool<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for item in self.connections.iter() {
            map.entry(item.key(), &item.value().0.len());
        }
        map.finish()
    }
}

impl<V> Default for Pool<V> {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}

impl<V> Pool<V> {
    pub fn new(max_set_size: usize) -> Self {
        Self {
            max_set_size,
            connections: Default::default(),
        }
    }

    pub fn insert(&self, origin: String, entry: PoolEntry<V>) {
        log::debug!("parking connection to {origin}");
        match self.connections.entry(origin) {
            Entry::Occupied(occupied) => {
                occupied.get().insert(entry);
            }
            Entry::Vacant(vacant) => {
                let set = PoolSet::new(self.max_set_size);
                set.insert(entry);
                vacant.insert(set);
            }
        }
    }

    /// Unexpired parked transports for the origin, most recently parked
    /// last. Taking a candidate removes it from the pool.
    pub fn candidates(&self, origin: &str) -> impl Iterator<Item = V> {
        self.connections
            .get(origin)
            .map(|set| set.clone().filter_map(PoolEntry::take))
            .into_iter()
            .flatten()
    }

    /// Drops empty origin queues.
    #[allow(dead_code)]
    pub fn cleanup(&self) {
        self.connections.retain(|_, set| !set.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn takes_in_fifo_order() {
        let pool = Pool::default();
        for n in 0..5 {
            pool.insert("srv:5988".to_string(), PoolEntry::new(n, None));
        }
        assert_eq!(pool.candidates("srv:5988").next(), Some(0));
        assert_eq!(pool.candidates("srv:5988").collect::<Vec<_>>(), [1, 2, 3, 4]);
        assert!(pool.candidates("srv:5988").next().is_none());
    }

    #[test]
    fn bounded_per_origin() {
        let pool = Pool::new(3);
        for n in 0..6 {
            pool.insert("srv:5988".to_string(), PoolEntry::new(n, None));
        }
        assert_eq!(pool.candidates("srv:5988").collect::<Vec<_>>(), [3, 4, 5]);
    }

    #[test]
    fn origins_are_separate() {
        let pool = Pool::default();
        pool.insert("a:5988".to_string(), PoolEntry::new(1, None));
        pool.insert("b:5988".to_string(), PoolEntry::new(2, None));
        assert_eq!(pool.candidates("a:5988").collect::<Vec<_>>(), [1]);
        assert_eq!(pool.candidates("b:5988").collect::<Vec<_>>(), [2]);
    }

    #[test]
    fn expired_entries_are_dropped() {
        let pool = Pool::default();
        pool.insert(
            "srv:5988".to_string(),
            PoolEntry::new(1, Some(Instant::now() - Duration::from_secs(1))),
        );
        pool.insert("srv:5988".to_string(), PoolEntry::new(2, None));
        assert_eq!(pool.candidates("srv:5988").collect::<Vec<_>>(), [2]);
    }
}
