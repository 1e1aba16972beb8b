//! Mirrored player and coin collections.
//!
//! Reducer-style mutations applied by the event dispatcher. Both collections
//! are keyed by id with a separate arrival-order index, so adds are naturally
//! idempotent and the presentation layer still sees a stable order.

use std::collections::HashMap;

use tracing::debug;

use crate::protocol::{Coin, Player, Position};

/// Players and coins of the current room.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    /// Players indexed by id
    players: HashMap<String, Player>,

    /// Player ids in arrival order
    player_order: Vec<String>,

    /// Coins indexed by id
    coins: HashMap<String, Coin>,

    /// Coin ids in announcement order
    coin_order: Vec<String>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Players

    /// Add a player. Returns false if the id is already present, in which case
    /// the existing entry is left untouched.
    pub fn on_player_joined(&mut self, player: Player) -> bool {
        if self.players.contains_key(&player.id) {
            debug!("Ignoring duplicate join for player {}", player.id);
            return false;
        }
        self.player_order.push(player.id.clone());
        self.players.insert(player.id.clone(), player);
        true
    }

    /// Same operation as `on_player_joined`; the server announces players
    /// under two event names.
    pub fn on_new_player(&mut self, player: Player) -> bool {
        self.on_player_joined(player)
    }

    /// Remove a player. No-op if absent.
    pub fn on_player_left(&mut self, player_id: &str) -> Option<Player> {
        let player = self.players.remove(player_id)?;
        self.player_order.retain(|id| id != player_id);
        Some(player)
    }

    /// Replace positions of known players that appear in `positions`.
    /// Unknown ids are ignored. Returns how many players moved.
    pub fn on_positions_updated(&mut self, positions: &HashMap<String, Position>) -> usize {
        let mut updated = 0;
        for (id, position) in positions {
            if let Some(player) = self.players.get_mut(id) {
                player.position = *position;
                updated += 1;
            }
        }
        updated
    }

    pub fn get_player(&self, player_id: &str) -> Option<&Player> {
        self.players.get(player_id)
    }

    pub fn has_player(&self, player_id: &str) -> bool {
        self.players.contains_key(player_id)
    }

    /// Players in arrival order.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.player_order
            .iter()
            .filter_map(|id| self.players.get(id))
    }

    /// Player ids in arrival order. This is the room's client list.
    pub fn player_ids(&self) -> &[String] {
        &self.player_order
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    // Coins

    /// Replace the whole coin collection.
    pub fn on_coins_generated(&mut self, coins: Vec<Coin>) {
        self.coins.clear();
        self.coin_order.clear();
        for coin in coins {
            if self.coins.contains_key(&coin.id) {
                continue;
            }
            self.coin_order.push(coin.id.clone());
            self.coins.insert(coin.id.clone(), coin);
        }
    }

    /// Remove a grabbed coin. No-op if already gone.
    pub fn on_coin_grabbed(&mut self, coin_id: &str) -> Option<Coin> {
        let coin = self.coins.remove(coin_id)?;
        self.coin_order.retain(|id| id != coin_id);
        Some(coin)
    }

    pub fn get_coin(&self, coin_id: &str) -> Option<&Coin> {
        self.coins.get(coin_id)
    }

    pub fn has_coin(&self, coin_id: &str) -> bool {
        self.coins.contains_key(coin_id)
    }

    /// Coins in announcement order.
    pub fn coins(&self) -> impl Iterator<Item = &Coin> {
        self.coin_order.iter().filter_map(|id| self.coins.get(id))
    }

    pub fn coin_count(&self) -> usize {
        self.coins.len()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.players.clear();
        self.player_order.clear();
        self.coins.clear();
        self.coin_order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: &str, x: f64) -> Player {
        Player::new(id, Position::new(x, 0.0, 0.0))
    }

    fn coin(id: &str) -> Coin {
        Coin::new(id, Position::new(1.0, 0.0, 1.0))
    }

    #[test]
    fn test_player_join_and_leave() {
        let mut store = EntityStore::new();

        assert!(store.on_player_joined(player("a", 1.0)));
        assert!(store.on_new_player(player("b", 2.0)));
        assert_eq!(store.player_ids(), ["a", "b"]);

        assert!(store.on_player_left("a").is_some());
        assert_eq!(store.player_ids(), ["b"]);
        assert!(!store.has_player("a"));

        // Absent is a no-op
        assert!(store.on_player_left("a").is_none());
        assert_eq!(store.player_count(), 1);
    }

    #[test]
    fn test_duplicate_join_is_ignored() {
        let mut store = EntityStore::new();

        assert!(store.on_player_joined(player("a", 1.0)));
        assert!(!store.on_player_joined(player("a", 9.0)));
        assert!(!store.on_new_player(player("a", 9.0)));

        assert_eq!(store.player_count(), 1);
        assert_eq!(store.player_ids().len(), 1);
        assert_eq!(store.get_player("a").unwrap().position.x, 1.0);
    }

    #[test]
    fn test_selective_position_merge() {
        let mut store = EntityStore::new();
        store.on_player_joined(player("A", 1.0));
        store.on_player_joined(player("B", 2.0));
        store.on_player_joined(player("C", 3.0));

        let positions = HashMap::from([
            ("A".to_string(), Position::new(10.0, 0.0, 0.0)),
            ("C".to_string(), Position::new(30.0, 0.0, 0.0)),
            ("D".to_string(), Position::new(40.0, 0.0, 0.0)),
        ]);
        assert_eq!(store.on_positions_updated(&positions), 2);

        assert_eq!(store.get_player("A").unwrap().position.x, 10.0);
        assert_eq!(store.get_player("B").unwrap().position.x, 2.0);
        assert_eq!(store.get_player("C").unwrap().position.x, 30.0);
        assert!(!store.has_player("D"));
        assert_eq!(store.player_count(), 3);
    }

    #[test]
    fn test_coins_snapshot_semantics() {
        let mut store = EntityStore::new();
        store.on_coins_generated(vec![coin("1"), coin("2")]);
        assert_eq!(store.coin_count(), 2);

        store.on_coins_generated(vec![coin("3")]);
        assert_eq!(store.coin_count(), 1);
        assert!(!store.has_coin("1"));
        assert!(store.has_coin("3"));
    }

    #[test]
    fn test_coin_grab_idempotent() {
        let mut store = EntityStore::new();
        store.on_coins_generated(vec![coin("1"), coin("2")]);

        assert!(store.on_coin_grabbed("1").is_some());
        let after_first: Vec<String> = store.coins().map(|c| c.id.clone()).collect();

        assert!(store.on_coin_grabbed("1").is_none());
        let after_second: Vec<String> = store.coins().map(|c| c.id.clone()).collect();

        assert_eq!(after_first, after_second);
        assert_eq!(after_second, vec!["2".to_string()]);
    }

    #[test]
    fn test_grabbed_coin_returns_only_on_regeneration() {
        let mut store = EntityStore::new();
        store.on_coins_generated(vec![coin("1")]);
        store.on_coin_grabbed("1");
        assert!(!store.has_coin("1"));

        store.on_coins_generated(vec![coin("1")]);
        assert!(store.has_coin("1"));
    }

    #[test]
    fn test_order_is_stable() {
        let mut store = EntityStore::new();
        for id in ["c", "a", "b"] {
            store.on_player_joined(player(id, 1.0));
        }
        let ids: Vec<&str> = store.players().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["c", "a", "b"]);

        store.clear();
        assert_eq!(store.player_count(), 0);
        assert_eq!(store.coin_count(), 0);
    }
}
