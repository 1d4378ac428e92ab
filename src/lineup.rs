// src/lineup.rs
// Local program lineup for the program-pick step, updated optimistically

use crate::state::AppState;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineupCache {
    keys: Vec<String>,
}

impl LineupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Adopt the server lineup unless a local pick is still ahead of it
    pub fn sync_from_state(&mut self, state: &AppState) {
        if state.session_lineup.len() >= self.keys.len() {
            self.keys = state.session_lineup.clone();
        }
    }

    /// Append a pick and return the lineup to post
    pub fn push(&mut self, key: &str) -> Vec<String> {
        self.keys.push(key.trim().to_uppercase());
        self.keys.clone()
    }

    /// Undo the pick made at `slot` after the server rejected it.
    /// Later picks stay; nothing happens if a snapshot already replaced that slot.
    pub fn revert(&mut self, slot: usize, key: &str) -> bool {
        if self.keys.get(slot).map(String::as_str) != Some(key) {
            return false;
        }
        self.keys.remove(slot);
        true
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn is_complete(&self, total_games: u32) -> bool {
        total_games > 0 && self.keys.len() >= total_games as usize
    }

    /// Question asked for the next pick, e.g. "What type is Game 2?"
    pub fn prompt(&self) -> String {
        format!("What type is Game {}?", self.keys.len() + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_lineup(keys: &[&str], total: u32) -> AppState {
        AppState {
            session_lineup: keys.iter().map(|k| k.to_string()).collect(),
            session_total_games: Some(total),
            ..AppState::default()
        }
    }

    #[test]
    fn test_optimistic_push_and_revert() {
        let mut lineup = LineupCache::new();
        assert_eq!(lineup.prompt(), "What type is Game 1?");
        assert_eq!(lineup.push(" classic "), vec!["CLASSIC".to_string()]);
        assert_eq!(lineup.prompt(), "What type is Game 2?");

        // an older snapshot does not undo the local pick
        lineup.sync_from_state(&state_with_lineup(&[], 2));
        assert_eq!(lineup.keys(), ["CLASSIC"]);

        assert!(lineup.revert(0, "CLASSIC"));
        assert!(lineup.is_empty());
    }

    #[test]
    fn test_revert_only_the_rejected_pick() {
        let mut lineup = LineupCache::new();
        lineup.push("CLASSIC");
        lineup.push("LUCKY_7");

        // the first request fails after the second pick was made
        assert!(lineup.revert(0, "CLASSIC"));
        assert_eq!(lineup.keys(), ["LUCKY_7"]);

        // slot no longer holds the rejected key
        assert!(!lineup.revert(1, "CLASSIC"));
        assert!(!lineup.revert(0, "CLASSIC"));
        assert_eq!(lineup.keys(), ["LUCKY_7"]);
    }

    #[test]
    fn test_sync_and_complete() {
        let mut lineup = LineupCache::new();
        lineup.push("CLASSIC");
        lineup.sync_from_state(&state_with_lineup(&["CLASSIC", "LUCKY_7"], 2));
        assert_eq!(lineup.len(), 2);
        assert!(lineup.is_complete(2));
        assert!(!lineup.is_complete(3));
        assert!(!LineupCache::new().is_complete(0));

        lineup.clear();
        assert!(lineup.is_empty());
    }
}
