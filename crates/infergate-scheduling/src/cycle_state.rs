//! Request-scoped state shared by plugins.
//!
//! One `CycleState` is created per schedule call and dropped when the call
//! returns. Profiles running in the same wave may read and write it
//! concurrently; writes made in one round are visible in the next.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

type StateValue = Arc<dyn Any + Send + Sync>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CycleStateError {
    #[error("cycle state key not found: {0}")]
    NotFound(String),

    #[error("cycle state key {key} holds a value of a different type than {expected}")]
    TypeMismatch { key: String, expected: &'static str },
}

/// Concurrency-safe key/value store for one scheduling cycle.
#[derive(Default)]
pub struct CycleState {
    data: RwLock<HashMap<String, StateValue>>,
}

impl CycleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a typed value.
    pub fn read<T: Any + Send + Sync>(&self, key: &str) -> Result<Arc<T>, CycleStateError> {
        let value = self
            .data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .ok_or_else(|| CycleStateError::NotFound(key.to_string()))?;

        value
            .downcast::<T>()
            .map_err(|_| CycleStateError::TypeMismatch {
                key: key.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// Store a value, replacing whatever the key held before.
    pub fn write<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) {
        self.data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), Arc::new(value));
    }

    /// Read-modify-write under a single write lock.
    ///
    /// `f` receives the current value if one of type `T` is present.
    pub fn update<T, F>(&self, key: impl Into<String>, f: F) -> Arc<T>
    where
        T: Any + Send + Sync,
        F: FnOnce(Option<&T>) -> T,
    {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        let key = key.into();
        let current = data.get(&key).and_then(|v| v.downcast_ref::<T>());
        let next = Arc::new(f(current));
        data.insert(key, next.clone());
        next
    }

    /// Remove a key. Returns whether it was present.
    pub fn delete(&self, key: &str) -> bool {
        self.data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.data.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

impl std::fmt::Debug for CycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CycleState").field("keys", &self.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let state = CycleState::new();
        state.write("prefix-hits", 3usize);

        let value = state.read::<usize>("prefix-hits").unwrap();
        assert_eq!(*value, 3);
    }

    #[test]
    fn missing_key_is_not_found() {
        let state = CycleState::new();
        assert_eq!(
            state.read::<u32>("nope").unwrap_err(),
            CycleStateError::NotFound("nope".to_string())
        );
    }

    #[test]
    fn wrong_type_is_mismatch() {
        let state = CycleState::new();
        state.write("k", String::from("v"));
        assert!(matches!(
            state.read::<u64>("k"),
            Err(CycleStateError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn write_overwrites() {
        let state = CycleState::new();
        state.write("k", 1u32);
        state.write("k", 2u32);
        assert_eq!(*state.read::<u32>("k").unwrap(), 2);
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn update_sees_previous_value() {
        let state = CycleState::new();
        let first = state.update("rounds", |prev: Option<&u32>| prev.copied().unwrap_or(0) + 1);
        let second = state.update("rounds", |prev: Option<&u32>| prev.copied().unwrap_or(0) + 1);
        assert_eq!(*first, 1);
        assert_eq!(*second, 2);
    }

    #[test]
    fn delete_and_contains() {
        let state = CycleState::new();
        state.write("k", ());
        assert!(state.contains("k"));
        assert!(state.delete("k"));
        assert!(!state.delete("k"));
        assert!(state.is_empty());
    }

    #[test]
    fn keys_are_sorted() {
        let state = CycleState::new();
        state.write("b", 1u8);
        state.write("a", 1u8);
        state.write("c", 1u8);
        assert_eq!(state.keys(), vec!["a", "b", "c"]);
    }

    #[test]
    fn concurrent_writers_do_not_race() {
        let state = Arc::new(CycleState::new());
        let mut handles = Vec::new();

        for t in 0..4 {
            let state = state.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..100 {
                    state.write(format!("t{t}-{i}"), i);
                    state.update("counter", |prev: Option<&u64>| prev.copied().unwrap_or(0) + 1);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(state.len(), 401);
        assert_eq!(*state.read::<u64>("counter").unwrap(), 400);
    }
}
