use std::collections::HashMap;

use crate::character::CharacterId;

/// Per-monster accumulated threat, keyed by monster instance id.
#[derive(Debug, Clone, Default)]
pub struct ThreatTable {
    tables: HashMap<String, HashMap<CharacterId, i64>>,
}

impl ThreatTable {
    /// Add (or with a negative amount, shed) threat. Totals never drop
    /// below zero.
    pub fn add_threat(&mut self, monster_id: &str, character_id: CharacterId, amount: i64) {
        let entry = self
            .tables
            .entry(monster_id.to_string())
            .or_default()
            .entry(character_id)
            .or_insert(0);
        *entry = (*entry + amount).max(0);
    }

    pub fn get(&self, monster_id: &str) -> Option<&HashMap<CharacterId, i64>> {
        self.tables.get(monster_id)
    }

    pub fn threat_of(&self, monster_id: &str, character_id: CharacterId) -> i64 {
        self.get(monster_id)
            .and_then(|t| t.get(&character_id))
            .copied()
            .unwrap_or(0)
    }

    /// Character holding the most threat on the monster; ties keep the
    /// lower id.
    pub fn top(&self, monster_id: &str) -> Option<CharacterId> {
        self.get(monster_id)?
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(id, _)| *id)
    }

    pub fn reset(&mut self) {
        self.tables.clear();
    }
}
