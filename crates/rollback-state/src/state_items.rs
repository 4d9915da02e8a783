use std::any::Any;
use std::collections::HashMap;
use std::fmt;

/// Data a rollback handler needs to undo one mutation.
///
/// Values are type-erased; the coordinator hands the map to the handler
/// untouched, and the handler downcasts with [`StateItems::get`].
#[derive(Default)]
pub struct StateItems {
    items: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl StateItems {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`StateItems::insert`].
    #[must_use]
    pub fn with<T>(mut self, key: impl Into<String>, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        self.insert(key, value);
        self
    }

    /// Store `value` under `key`, returning `true` if a previous value was replaced.
    pub fn insert<T>(&mut self, key: impl Into<String>, value: T) -> bool
    where
        T: Any + Send + Sync,
    {
        self.items.insert(key.into(), Box::new(value)).is_some()
    }

    /// Returns the value under `key` if it exists and has type `T`.
    #[must_use]
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.items.get(key).and_then(|value| value.downcast_ref::<T>())
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl fmt::Debug for StateItems {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.keys().collect();
        keys.sort_unstable();
        f.debug_struct("StateItems").field("keys", &keys).finish()
    }
}
