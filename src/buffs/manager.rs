//! Per-entity timed effects.
//!
//! Characters and monsters live in separate maps with a mirrored API. Each
//! map sits behind its own read/write lock; queries take the read side.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use super::types::*;
use crate::character::CharacterId;

/// One lock-guarded map of entity -> effect id -> instance.
#[derive(Debug)]
struct EffectStore<K> {
    entries: RwLock<HashMap<K, HashMap<String, BuffInstance>>>,
}

impl<K: Eq + Hash + Clone> EffectStore<K> {
    fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<K, HashMap<String, BuffInstance>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<K, HashMap<String, BuffInstance>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(&self, key: &K, spec: BuffSpec) {
        let policy = StackPolicy::for_effect(&spec.effect_id);
        let mut entries = self.write();
        let effects = entries.entry(key.clone()).or_default();

        match effects.get_mut(&spec.effect_id) {
            Some(existing) => match policy {
                StackPolicy::Refresh => {
                    existing.duration = existing.duration.max(spec.duration);
                }
                StackPolicy::Stack => {
                    existing.duration = spec.duration;
                    existing.value += spec.value;
                }
                StackPolicy::Replace => {
                    *existing = spec.into_instance();
                }
            },
            None => {
                effects.insert(spec.effect_id.clone(), spec.into_instance());
            }
        }
    }

    fn remove(&self, key: &K, effect_id: &str) -> Option<BuffInstance> {
        self.write()
            .get_mut(key)
            .and_then(|effects| effects.remove(effect_id))
    }

    fn tick(&self, key: &K) -> Vec<ExpiredBuff> {
        let mut entries = self.write();
        let Some(effects) = entries.get_mut(key) else {
            return Vec::new();
        };

        let mut expired = Vec::new();
        effects.retain(|_, buff| {
            buff.duration = buff.duration.saturating_sub(1);
            if buff.duration == 0 {
                expired.push(ExpiredBuff {
                    effect_id: buff.effect_id.clone(),
                    name: buff.name.clone(),
                });
                false
            } else {
                true
            }
        });
        expired.sort_by(|a, b| a.effect_id.cmp(&b.effect_id));
        expired
    }

    fn snapshot(&self, key: &K) -> Vec<BuffInstance> {
        let entries = self.read();
        let mut buffs: Vec<BuffInstance> = entries
            .get(key)
            .map(|effects| effects.values().cloned().collect())
            .unwrap_or_default();
        buffs.sort_by(|a, b| a.effect_id.cmp(&b.effect_id));
        buffs
    }

    fn sum_stat(&self, key: &K, stat: BuffStat) -> f64 {
        self.read()
            .get(key)
            .map(|effects| {
                effects
                    .values()
                    .filter(|b| b.stat == stat)
                    .map(|b| b.value)
                    .sum()
            })
            .unwrap_or(0.0)
    }

    /// Buffs count positive, debuffs negative.
    fn net_stat(&self, key: &K, stat: BuffStat) -> f64 {
        self.read()
            .get(key)
            .map(|effects| {
                effects
                    .values()
                    .filter(|b| b.stat == stat)
                    .map(|b| if b.is_buff { b.value } else { -b.value })
                    .sum()
            })
            .unwrap_or(0.0)
    }

    fn has_effect(&self, key: &K, effect_id: &str) -> bool {
        self.read()
            .get(key)
            .is_some_and(|effects| effects.contains_key(effect_id))
    }

    fn has_stat(&self, key: &K, stat: BuffStat) -> bool {
        self.read()
            .get(key)
            .is_some_and(|effects| effects.values().any(|b| b.stat == stat))
    }

    fn process_periodic(&self, key: &K, round: u32) -> PeriodicTotals {
        let mut totals = PeriodicTotals::default();
        let mut entries = self.write();
        let Some(effects) = entries.get_mut(key) else {
            return totals;
        };

        for buff in effects.values_mut() {
            let value = buff.value.round() as i32;
            let Some(periodic) = buff.periodic.as_mut() else {
                continue;
            };
            let elapsed = round as i64 - periodic.last_tick as i64;
            if elapsed < periodic.interval as i64 {
                continue;
            }
            periodic.last_tick = round;
            match periodic.kind {
                PeriodicKind::Damage => totals.damage += value,
                PeriodicKind::Heal => totals.healing += value,
            }
        }
        totals
    }

    fn absorb(&self, key: &K, damage: i32) -> (i32, i32) {
        let mut entries = self.write();
        let Some(effects) = entries.get_mut(key) else {
            return (damage, 0);
        };

        let mut remaining = damage.max(0);
        let mut absorbed = 0;
        let mut depleted = Vec::new();
        let mut shield_ids: Vec<String> = effects
            .values()
            .filter(|b| b.stat == BuffStat::Shield)
            .map(|b| b.effect_id.clone())
            .collect();
        shield_ids.sort();

        for id in shield_ids {
            if remaining == 0 {
                break;
            }
            if let Some(shield) = effects.get_mut(&id) {
                let pool = shield.value.max(0.0).round() as i32;
                let taken = pool.min(remaining);
                shield.value -= taken as f64;
                remaining -= taken;
                absorbed += taken;
                if shield.value <= 0.0 {
                    depleted.push(id);
                }
            }
        }
        for id in depleted {
            effects.remove(&id);
        }
        (remaining, absorbed)
    }

    fn clear(&self, key: &K) {
        self.write().remove(key);
    }

    fn clear_all(&self) {
        self.write().clear();
    }
}

/// Timed buffs on characters and debuffs on monsters.
#[derive(Debug)]
pub struct BuffManager {
    character_buffs: EffectStore<CharacterId>,
    enemy_debuffs: EffectStore<String>,
}

impl Default for BuffManager {
    fn default() -> Self {
        Self::new()
    }
}

impl BuffManager {
    pub fn new() -> Self {
        Self {
            character_buffs: EffectStore::new(),
            enemy_debuffs: EffectStore::new(),
        }
    }

    // ── Characters ──────────────────────────────────────────────

    /// Insert an effect, or refresh/stack/replace the existing instance
    /// according to the effect id's [`StackPolicy`].
    pub fn apply_buff(&self, character_id: CharacterId, spec: BuffSpec) {
        debug!(character_id, effect = %spec.effect_id, duration = spec.duration, "apply buff");
        self.character_buffs.apply(&character_id, spec);
    }

    pub fn remove_buff(&self, character_id: CharacterId, effect_id: &str) -> Option<BuffInstance> {
        self.character_buffs.remove(&character_id, effect_id)
    }

    /// Decrement every duration by one round and report what expired.
    pub fn tick_buffs(&self, character_id: CharacterId) -> Vec<ExpiredBuff> {
        self.character_buffs.tick(&character_id)
    }

    pub fn get_buffs(&self, character_id: CharacterId) -> Vec<BuffInstance> {
        self.character_buffs.snapshot(&character_id)
    }

    /// Sum of values of every effect on `stat`.
    pub fn get_buff_value(&self, character_id: CharacterId, stat: BuffStat) -> f64 {
        self.character_buffs.sum_stat(&character_id, stat)
    }

    pub fn has_buff(&self, character_id: CharacterId, effect_id: &str) -> bool {
        self.character_buffs.has_effect(&character_id, effect_id)
    }

    pub fn has_buff_stat(&self, character_id: CharacterId, stat: BuffStat) -> bool {
        self.character_buffs.has_stat(&character_id, stat)
    }

    /// Fire periodic effects due this round.
    pub fn process_dot_effects(&self, character_id: CharacterId, round: u32) -> PeriodicTotals {
        self.character_buffs.process_periodic(&character_id, round)
    }

    /// Multiplier for incoming damage from `damage_taken` (and, for
    /// physical hits, `physical_damage_taken`) effects. Only a net
    /// reduction is applied.
    pub fn damage_taken_multiplier(&self, character_id: CharacterId, physical: bool) -> f64 {
        let mut total = self.get_buff_value(character_id, BuffStat::DamageTaken);
        if physical {
            total += self.get_buff_value(character_id, BuffStat::PhysicalDamageTaken);
        }
        if total < 0.0 {
            (1.0 + total / 100.0).max(0.0)
        } else {
            1.0
        }
    }

    /// Scale a hit by [`damage_taken_multiplier`](Self::damage_taken_multiplier).
    pub fn calculate_damage_taken_with_buffs(
        &self,
        damage: i32,
        character_id: CharacterId,
        physical: bool,
    ) -> i32 {
        (damage as f64 * self.damage_taken_multiplier(character_id, physical)) as i32
    }

    /// Soak damage into shield effects. Returns (damage left, absorbed).
    pub fn absorb_with_shield(&self, character_id: CharacterId, damage: i32) -> (i32, i32) {
        self.character_buffs.absorb(&character_id, damage)
    }

    pub fn clear_buffs(&self, character_id: CharacterId) {
        self.character_buffs.clear(&character_id);
    }

    // ── Monsters ────────────────────────────────────────────────

    pub fn apply_enemy_debuff(&self, enemy_id: &str, spec: BuffSpec) {
        debug!(enemy_id, effect = %spec.effect_id, duration = spec.duration, "apply debuff");
        self.enemy_debuffs.apply(&enemy_id.to_string(), spec);
    }

    /// Timed self-buff on a monster. Shares the monster's effect map with
    /// its debuffs, so it ticks and clears with them.
    pub fn apply_enemy_buff(&self, enemy_id: &str, spec: BuffSpec) {
        debug!(enemy_id, effect = %spec.effect_id, duration = spec.duration, "apply enemy buff");
        self.enemy_debuffs.apply(
            &enemy_id.to_string(),
            BuffSpec {
                is_buff: true,
                ..spec
            },
        );
    }

    pub fn remove_enemy_debuff(&self, enemy_id: &str, effect_id: &str) -> Option<BuffInstance> {
        self.enemy_debuffs.remove(&enemy_id.to_string(), effect_id)
    }

    pub fn tick_enemy_debuffs(&self, enemy_id: &str) -> Vec<ExpiredBuff> {
        self.enemy_debuffs.tick(&enemy_id.to_string())
    }

    pub fn get_enemy_debuffs(&self, enemy_id: &str) -> Vec<BuffInstance> {
        self.enemy_debuffs.snapshot(&enemy_id.to_string())
    }

    pub fn get_enemy_debuff_value(&self, enemy_id: &str, stat: BuffStat) -> f64 {
        self.enemy_debuffs.sum_stat(&enemy_id.to_string(), stat)
    }

    /// Net percent change to a monster's defense: guard buffs raise it,
    /// armor debuffs lower it.
    pub fn enemy_defense_modifier(&self, enemy_id: &str) -> f64 {
        self.enemy_debuffs.net_stat(&enemy_id.to_string(), BuffStat::Defense)
    }

    pub fn has_enemy_debuff(&self, enemy_id: &str, effect_id: &str) -> bool {
        self.enemy_debuffs.has_effect(&enemy_id.to_string(), effect_id)
    }

    /// True while any `stun` effect is active on the monster.
    pub fn is_enemy_stunned(&self, enemy_id: &str) -> bool {
        self.enemy_debuffs.has_stat(&enemy_id.to_string(), BuffStat::Stun)
    }

    pub fn process_enemy_dot_effects(&self, enemy_id: &str, round: u32) -> PeriodicTotals {
        self.enemy_debuffs.process_periodic(&enemy_id.to_string(), round)
    }

    pub fn clear_enemy_debuffs(&self, enemy_id: &str) {
        self.enemy_debuffs.clear(&enemy_id.to_string());
    }

    pub fn clear_all_enemy_debuffs(&self) {
        self.enemy_debuffs.clear_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::DamageType;

    fn poison(value: f64, duration: u32, interval: u32) -> BuffSpec {
        BuffSpec::dot("dot_poison", "Poison", value, duration, interval, DamageType::Nature)
    }

    // =========================================================================
    // Stacking
    // =========================================================================

    #[test]
    fn test_stack_policy_sums_values_and_resets_duration() {
        let manager = BuffManager::new();
        manager.apply_buff(1, poison(10.0, 5, 0));
        manager.apply_buff(1, poison(10.0, 3, 0));

        let buffs = manager.get_buffs(1);
        assert_eq!(buffs.len(), 1);
        assert_eq!(buffs[0].value, 20.0);
        assert_eq!(buffs[0].duration, 3);
    }

    #[test]
    fn test_refresh_policy_keeps_value_and_max_duration() {
        let manager = BuffManager::new();
        let shout = |value, duration| {
            BuffSpec::buff("battle_shout", "Battle Shout", BuffStat::Attack, value, duration)
        };
        manager.apply_buff(1, shout(15.0, 5));
        manager.apply_buff(1, shout(40.0, 2));

        let buffs = manager.get_buffs(1);
        assert_eq!(buffs[0].value, 15.0);
        assert_eq!(buffs[0].duration, 5);

        manager.apply_buff(1, shout(40.0, 9));
        assert_eq!(manager.get_buffs(1)[0].duration, 9);
    }

    #[test]
    fn test_replace_policy_overwrites() {
        let manager = BuffManager::new();
        let shout =
            |value, duration| BuffSpec::debuff("demoralizing_shout", "Shout", BuffStat::Attack, value, duration);
        manager.apply_enemy_debuff("m1", shout(-10.0, 4));
        manager.apply_enemy_debuff("m1", shout(-25.0, 2));
        let debuffs = manager.get_enemy_debuffs("m1");
        assert_eq!(debuffs[0].value, -25.0);
        assert_eq!(debuffs[0].duration, 2);
    }

    // =========================================================================
    // Ticking
    // =========================================================================

    #[test]
    fn test_tick_decrements_once_and_expires_once() {
        let manager = BuffManager::new();
        manager.apply_buff(1, BuffSpec::buff("shield_wall", "Shield Wall", BuffStat::DamageTaken, -50.0, 2));

        assert!(manager.tick_buffs(1).is_empty());
        assert_eq!(manager.get_buffs(1)[0].duration, 1);

        let expired = manager.tick_buffs(1);
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].effect_id, "shield_wall");
        assert!(!manager.has_buff(1, "shield_wall"));

        assert!(manager.tick_buffs(1).is_empty());
    }

    #[test]
    fn test_unknown_entity_is_safe() {
        let manager = BuffManager::new();
        assert!(manager.tick_buffs(404).is_empty());
        assert!(manager.get_buffs(404).is_empty());
        assert_eq!(manager.get_buff_value(404, BuffStat::Attack), 0.0);
        assert_eq!(manager.process_dot_effects(404, 3), PeriodicTotals::default());
        assert!(manager.tick_enemy_debuffs("ghost").is_empty());
        assert!(!manager.is_enemy_stunned("ghost"));
    }

    // =========================================================================
    // Periodic effects
    // =========================================================================

    #[test]
    fn test_interval_zero_fires_every_round() {
        let manager = BuffManager::new();
        manager.apply_enemy_debuff("m1", poison(6.0, 10, 0));
        for round in 1..=4 {
            assert_eq!(manager.process_enemy_dot_effects("m1", round).damage, 6);
        }
    }

    #[test]
    fn test_interval_gates_firing_and_last_tick_moves_only_on_fire() {
        let manager = BuffManager::new();
        manager.apply_enemy_debuff("m1", poison(5.0, 10, 3));

        // last_tick starts at 0, so round 3 is the first firing
        assert_eq!(manager.process_enemy_dot_effects("m1", 1).damage, 0);
        assert_eq!(manager.process_enemy_dot_effects("m1", 2).damage, 0);
        assert_eq!(manager.process_enemy_dot_effects("m1", 3).damage, 5);
        assert_eq!(manager.process_enemy_dot_effects("m1", 4).damage, 0);
        assert_eq!(manager.process_enemy_dot_effects("m1", 5).damage, 0);
        assert_eq!(manager.process_enemy_dot_effects("m1", 6).damage, 5);

        let last = manager.get_enemy_debuffs("m1")[0].periodic.map(|p| p.last_tick);
        assert_eq!(last, Some(6));
    }

    #[test]
    fn test_dot_and_hot_are_summed_separately() {
        let manager = BuffManager::new();
        manager.apply_buff(7, poison(4.0, 3, 0));
        manager.apply_buff(7, BuffSpec::hot("hot_regen", "Regrowth", 9.0, 3, 0));
        let totals = manager.process_dot_effects(7, 1);
        assert_eq!(totals, PeriodicTotals { damage: 4, healing: 9 });
    }

    // =========================================================================
    // Mitigation
    // =========================================================================

    #[test]
    fn test_damage_taken_multiplier() {
        let manager = BuffManager::new();
        manager.apply_buff(1, BuffSpec::buff("shield_block", "Shield Block", BuffStat::PhysicalDamageTaken, -30.0, 2));
        assert!((manager.damage_taken_multiplier(1, true) - 0.7).abs() < 1e-9);
        assert_eq!(manager.damage_taken_multiplier(1, false), 1.0);
        assert_eq!(manager.calculate_damage_taken_with_buffs(100, 1, true), 70);

        // A net increase is not applied.
        manager.apply_buff(2, BuffSpec::debuff("recklessness_damage", "Reckless", BuffStat::DamageTaken, 20.0, 2));
        assert_eq!(manager.calculate_damage_taken_with_buffs(100, 2, false), 100);
    }

    #[test]
    fn test_shield_absorbs_then_breaks() {
        let manager = BuffManager::new();
        manager.apply_buff(1, BuffSpec::buff("unbreakable_barrier", "Barrier", BuffStat::Shield, 30.0, 4));

        assert_eq!(manager.absorb_with_shield(1, 20), (0, 20));
        assert_eq!(manager.get_buff_value(1, BuffStat::Shield), 10.0);

        assert_eq!(manager.absorb_with_shield(1, 25), (15, 10));
        assert!(!manager.has_buff(1, "unbreakable_barrier"));
        assert_eq!(manager.absorb_with_shield(1, 5), (5, 0));
    }

    #[test]
    fn test_stun_and_clear() {
        let manager = BuffManager::new();
        manager.apply_enemy_debuff("m1", BuffSpec::debuff("stun", "Stunned", BuffStat::Stun, 1.0, 1));
        assert!(manager.is_enemy_stunned("m1"));
        manager.tick_enemy_debuffs("m1");
        assert!(!manager.is_enemy_stunned("m1"));

        manager.apply_enemy_debuff("m2", poison(1.0, 5, 0));
        manager.clear_all_enemy_debuffs();
        assert!(manager.get_enemy_debuffs("m2").is_empty());
    }

    #[test]
    fn test_enemy_guard_offsets_armor_debuffs_and_refreshes() {
        let manager = BuffManager::new();
        let guard = || BuffSpec::buff("harden_guard", "Harden", BuffStat::Defense, 50.0, 3);
        manager.apply_enemy_buff("m1", guard());
        manager.apply_enemy_debuff("m1", BuffSpec::debuff("sunder_armor", "Sunder", BuffStat::Defense, 20.0, 4));
        assert_eq!(manager.enemy_defense_modifier("m1"), 30.0);

        // Reuse extends the guard without adding to it
        manager.tick_enemy_debuffs("m1");
        manager.apply_enemy_buff("m1", guard());
        manager.apply_enemy_buff("m1", guard());
        assert_eq!(manager.enemy_defense_modifier("m1"), 30.0);
        let guard = manager
            .get_enemy_debuffs("m1")
            .into_iter()
            .find(|b| b.effect_id == "harden_guard")
            .unwrap();
        assert!(guard.is_buff);
        assert_eq!(guard.duration, 3);

        for _ in 0..4 {
            manager.tick_enemy_debuffs("m1");
        }
        assert_eq!(manager.enemy_defense_modifier("m1"), 0.0);
    }
}
