use std::collections::HashMap;
use std::hash::{BuildHasher, RandomState};

use parking_lot::Mutex;

use crate::identity::ExecutionIdentity;

type Shard<V> = Mutex<HashMap<ExecutionIdentity, Vec<V>>>;

/// Ordered pending lists keyed by execution identity.
///
/// Keys are spread over independently locked shards, so executions only
/// contend when their identities hash to the same shard. An identity has an
/// entry only while it has at least one pending value.
pub struct RegistryStore<V> {
    shards: Box<[Shard<V>]>,
    hasher: RandomState,
}

impl<V> RegistryStore<V> {
    /// Create a store with `shard_count` shards (at least one).
    #[must_use]
    pub fn new(shard_count: usize) -> Self {
        let shards = (0..shard_count.max(1))
            .map(|_| Mutex::new(HashMap::new()))
            .collect();
        Self {
            shards,
            hasher: RandomState::new(),
        }
    }

    #[must_use]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard(&self, key: &ExecutionIdentity) -> &Shard<V> {
        let index = self.hasher.hash_one(key) % self.shards.len() as u64;
        &self.shards[usize::try_from(index).unwrap_or_default()]
    }

    /// Append `value` to the end of `key`'s list, creating the list if needed.
    ///
    /// Returns the length of the list after the append.
    pub fn append(&self, key: &ExecutionIdentity, value: V) -> usize {
        let mut shard = self.shard(key).lock();
        let list = shard.entry(key.clone()).or_default();
        list.push(value);
        list.len()
    }

    /// Run `f` against `key`'s list, if one exists.
    pub fn with_list<R>(&self, key: &ExecutionIdentity, f: impl FnOnce(&[V]) -> R) -> Option<R> {
        self.shard(key).lock().get(key).map(|list| f(list))
    }

    #[must_use]
    pub fn len(&self, key: &ExecutionIdentity) -> usize {
        self.with_list(key, <[V]>::len).unwrap_or(0)
    }

    #[must_use]
    pub fn contains(&self, key: &ExecutionIdentity) -> bool {
        self.shard(key).lock().contains_key(key)
    }

    /// Remove and return `key`'s whole list. A missing key is a no-op.
    pub fn remove(&self, key: &ExecutionIdentity) -> Option<Vec<V>> {
        self.shard(key).lock().remove(key)
    }

    /// Remove the first value in `key`'s list that satisfies `predicate`.
    pub fn remove_first(
        &self,
        key: &ExecutionIdentity,
        predicate: impl FnMut(&V) -> bool,
    ) -> Option<V> {
        let mut shard = self.shard(key).lock();
        let list = shard.get_mut(key)?;
        let index = list.iter().position(predicate)?;
        let removed = list.remove(index);
        if list.is_empty() {
            shard.remove(key);
        }
        Some(removed)
    }

    /// Identities that currently have pending values.
    #[must_use]
    pub fn identities(&self) -> Vec<ExecutionIdentity> {
        self.shards
            .iter()
            .flat_map(|shard| shard.lock().keys().cloned().collect::<Vec<_>>())
            .collect()
    }

    /// Total number of pending values across all identities.
    #[must_use]
    pub fn total_pending(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.lock().values().map(Vec::len).sum::<usize>())
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.lock().is_empty())
    }
}
