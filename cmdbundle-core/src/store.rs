//! In-memory variable scopes shared by every invocation of a session.
//!
//! Two independent partitions are kept: a global map and one map per actor.
//! Keys are case-insensitive (stored lowercased) and values are opaque
//! strings; JSON documents stored as values are read back through
//! [`crate::eval::json_path`]. Nothing here is persisted.

use std::collections::HashMap;

use dashmap::DashMap;

use crate::actor::{Actor, ActorId};

#[derive(Debug, Default)]
pub struct VariableStore {
    global: DashMap<String, String>,
    actors: DashMap<ActorId, HashMap<String, String>>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_global(&self, key: &str, value: &str) {
        self.global.insert(key.to_lowercase(), value.to_string());
    }

    /// Unset keys read as the empty string.
    pub fn get_global(&self, key: &str) -> String {
        self.global
            .get(&key.to_lowercase())
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    pub fn has_global(&self, key: &str) -> bool {
        self.global.contains_key(&key.to_lowercase())
    }

    pub fn set_actor(&self, id: ActorId, key: &str, value: &str) {
        self.actors
            .entry(id)
            .or_default()
            .insert(key.to_lowercase(), value.to_string());
    }

    pub fn get_actor(&self, id: ActorId, key: &str) -> String {
        self.actors
            .get(&id)
            .and_then(|vars| vars.get(&key.to_lowercase()).cloned())
            .unwrap_or_default()
    }

    pub fn has_actor(&self, id: ActorId, key: &str) -> bool {
        self.actors
            .get(&id)
            .map(|vars| vars.contains_key(&key.to_lowercase()))
            .unwrap_or(false)
    }

    pub fn clear_actor(&self, id: ActorId) {
        self.actors.remove(&id);
    }

    pub fn clear_all(&self) {
        self.global.clear();
        self.actors.clear();
    }

    /// Writes to the actor's scope, or to the global scope for the console.
    pub fn set_for(&self, actor: &Actor, key: &str, value: &str) {
        match actor.id() {
            Some(id) => self.set_actor(id, key, value),
            None => self.set_global(key, value),
        }
    }

    /// Actor scope first, falling back to global when the actor value is empty.
    pub fn resolve(&self, actor: &Actor, key: &str) -> String {
        if let Some(id) = actor.id() {
            let value = self.get_actor(id, key);
            if !value.is_empty() {
                return value;
            }
        }
        self.get_global(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_actor_round_trip_case_insensitive() {
        let store = VariableStore::new();
        let id = Uuid::new_v4();
        store.set_actor(id, "Coins", "10");
        assert_eq!(store.get_actor(id, "coins"), "10");
        assert_eq!(store.get_actor(id, "COINS"), "10");
        assert!(store.has_actor(id, "coins"));
    }

    #[test]
    fn test_unset_is_empty() {
        let store = VariableStore::new();
        assert_eq!(store.get_global("nothing"), "");
        assert_eq!(store.get_actor(Uuid::new_v4(), "nothing"), "");
        assert!(!store.has_global("nothing"));
    }

    #[test]
    fn test_scopes_are_independent() {
        let store = VariableStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        store.set_actor(alice, "k", "a");
        store.set_global("k", "g");
        assert_eq!(store.get_actor(bob, "k"), "");
        assert_eq!(store.resolve(&Actor::Player(alice), "k"), "a");
        assert_eq!(store.resolve(&Actor::Player(bob), "k"), "g");
        assert_eq!(store.resolve(&Actor::Console, "k"), "g");
    }

    #[test]
    fn test_clear_actor_keeps_global() {
        let store = VariableStore::new();
        let id = Uuid::new_v4();
        store.set_actor(id, "k", "v");
        store.set_global("k", "g");
        store.clear_actor(id);
        assert!(!store.has_actor(id, "k"));
        assert_eq!(store.get_global("k"), "g");
        store.clear_all();
        assert!(!store.has_global("k"));
    }

    #[test]
    fn test_set_for_console_goes_global() {
        let store = VariableStore::new();
        store.set_for(&Actor::Console, "Mode", "pvp");
        assert_eq!(store.get_global("mode"), "pvp");
    }
}
