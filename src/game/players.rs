//! Per-room player registry

use std::collections::btree_map::{BTreeMap, Values};

use serde::{Deserialize, Serialize};

use super::state::{PlayerId, PlayerState};

/// Mapping from player id to player state for one room.
///
/// Ordered by id so "first remaining player" is stable across runs. Colors are
/// not checked here; the coordinator enforces uniqueness at join time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerRegistry {
    players: BTreeMap<PlayerId, PlayerState>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace by `player.id`, returning the previous entry
    pub fn upsert(&mut self, player: PlayerState) -> Option<PlayerState> {
        self.players.insert(player.id.clone(), player)
    }

    pub fn get(&self, id: &str) -> Option<&PlayerState> {
        self.players.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.players.contains_key(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<PlayerState> {
        self.players.remove(id)
    }

    pub fn values(&self) -> Values<'_, PlayerId, PlayerState> {
        self.players.values()
    }

    /// First id in iteration order
    pub fn first_id(&self) -> Option<&PlayerId> {
        self.players.keys().next()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Rightmost x of any registered player
    pub fn max_x(&self) -> Option<f64> {
        self.players.values().map(|p| p.x).reduce(f64::max)
    }

    /// Whether any registered player already wears `color`
    pub fn color_in_use(&self, color: &str) -> bool {
        self.players.values().any(|p| p.color == color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: &str, x: f64, color: &str) -> PlayerState {
        PlayerState::spawn(id.to_string(), color.to_string(), x, 300.0)
    }

    #[test]
    fn upsert_replaces_by_id() {
        let mut registry = PlayerRegistry::new();
        assert!(registry.upsert(player("a", 50.0, "#FF5733")).is_none());

        let previous = registry.upsert(player("a", 75.0, "#FF5733"));
        assert_eq!(previous.map(|p| p.x), Some(50.0));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("a").map(|p| p.x), Some(75.0));
    }

    #[test]
    fn remove_and_lookup() {
        let mut registry = PlayerRegistry::new();
        registry.upsert(player("a", 50.0, "#FF5733"));
        registry.upsert(player("b", 110.0, "#33FF57"));

        assert!(registry.remove("a").is_some());
        assert!(registry.remove("a").is_none());
        assert!(!registry.contains("a"));
        assert_eq!(registry.first_id().map(String::as_str), Some("b"));
    }

    #[test]
    fn max_x_and_colors() {
        let mut registry = PlayerRegistry::new();
        assert_eq!(registry.max_x(), None);

        registry.upsert(player("a", 50.0, "#FF5733"));
        registry.upsert(player("b", 170.0, "#33FF57"));
        registry.upsert(player("c", 110.0, "#FF5733"));

        assert_eq!(registry.max_x(), Some(170.0));
        assert!(registry.color_in_use("#33FF57"));
        assert!(!registry.color_in_use("#3357FF"));
        assert_eq!(registry.values().count(), 3);
    }

    #[test]
    fn serializes_as_plain_object() {
        let mut registry = PlayerRegistry::new();
        registry.upsert(player("a", 50.0, "#FF5733"));

        let json = serde_json::to_value(&registry).unwrap();
        assert_eq!(json["a"]["x"], 50.0);
    }
}
