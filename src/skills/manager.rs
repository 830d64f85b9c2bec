//! Per-character active skills: cooldowns, availability and damage.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rand::Rng;
use tracing::warn;

use super::types::*;
use crate::buffs::{BuffManager, BuffStat};
use crate::character::{Character, CharacterId};
use crate::combat::Combatant;
use crate::core::constants::*;
use crate::core::{BattleError, Result};
use crate::monsters::Monster;
use crate::passives::{PassiveKind, PassiveSkillManager, PassiveStat};
use crate::repository::{RepositoryError, SkillRepository};

type SkillMap = HashMap<CharacterId, Vec<CharacterSkillState>>;

#[derive(Debug, Default)]
pub struct SkillManager {
    skills: RwLock<SkillMap>,
}

impl SkillManager {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Loading ─────────────────────────────────────────────────

    /// Load a character's learned skills. Unknown skill ids are skipped.
    /// Returns the number loaded.
    pub fn load_character_skills(
        &self,
        character_id: CharacterId,
        repo: &dyn SkillRepository,
    ) -> Result<usize> {
        let learned = repo.get_character_skills(character_id)?;
        let mut states = Vec::with_capacity(learned.len());
        for entry in learned {
            match repo.get_skill_by_id(&entry.skill_id) {
                Ok(definition) => states.push(CharacterSkillState::new(definition, entry.level)),
                Err(RepositoryError::NotFound { .. }) => {
                    warn!(character_id, skill_id = %entry.skill_id, "unknown skill skipped");
                }
                Err(err) => return Err(err.into()),
            }
        }
        let count = states.len();
        self.write().insert(character_id, states);
        Ok(count)
    }

    /// Install skills directly, bypassing the repository.
    pub fn set_character_skills(
        &self,
        character_id: CharacterId,
        skills: Vec<(SkillDefinition, u32)>,
    ) {
        let states = skills
            .into_iter()
            .map(|(definition, level)| CharacterSkillState::new(definition, level))
            .collect();
        self.write().insert(character_id, states);
    }

    pub fn is_loaded(&self, character_id: CharacterId) -> bool {
        self.read().contains_key(&character_id)
    }

    pub fn clear_character_skills(&self, character_id: CharacterId) {
        self.write().remove(&character_id);
    }

    // ── Queries ─────────────────────────────────────────────────

    pub fn get_skill_states(&self, character_id: CharacterId) -> Vec<CharacterSkillState> {
        self.read().get(&character_id).cloned().unwrap_or_default()
    }

    pub fn get_skill_state(
        &self,
        character_id: CharacterId,
        skill_id: &str,
    ) -> Option<CharacterSkillState> {
        self.read()
            .get(&character_id)
            .and_then(|list| list.iter().find(|s| s.skill_id == skill_id))
            .cloned()
    }

    /// Skills that are off cooldown, affordable, and whose use condition
    /// holds for a target at `target_hp_percent` (0-100).
    pub fn get_available_skills(
        &self,
        character_id: CharacterId,
        current_resource: i32,
        target_hp_percent: Option<f64>,
    ) -> Vec<CharacterSkillState> {
        self.read()
            .get(&character_id)
            .map(|list| {
                list.iter()
                    .filter(|s| s.is_ready())
                    .filter(|s| s.resource_cost() <= current_resource)
                    .filter(|s| s.condition_met(target_hp_percent))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_skill_available(
        &self,
        character_id: CharacterId,
        skill_id: &str,
        current_resource: i32,
        target_hp_percent: Option<f64>,
    ) -> bool {
        self.get_available_skills(character_id, current_resource, target_hp_percent)
            .iter()
            .any(|s| s.skill_id == skill_id)
    }

    /// Fallback choice when no strategy decides: an AoE skill against
    /// groups, an execute skill against a low target, else the hardest
    /// hitting available skill.
    pub fn select_best_skill(
        &self,
        character_id: CharacterId,
        current_resource: i32,
        target_hp_percent: f64,
        has_multiple_enemies: bool,
    ) -> Option<CharacterSkillState> {
        let available =
            self.get_available_skills(character_id, current_resource, Some(target_hp_percent));

        if has_multiple_enemies {
            if let Some(aoe) = available.iter().find(|s| s.definition.is_aoe()) {
                return Some(aoe.clone());
            }
        }

        if target_hp_percent < EXECUTE_HP_THRESHOLD * 100.0 {
            if let Some(execute) = available.iter().find(|s| s.definition.is_execute()) {
                return Some(execute.clone());
            }
        }

        available
            .into_iter()
            .filter(|s| s.definition.deals_damage())
            .fold(None, |best: Option<CharacterSkillState>, s| match best {
                Some(b) if b.payload.damage_multiplier >= s.payload.damage_multiplier => Some(b),
                _ => Some(s),
            })
    }

    // ── Cooldowns ───────────────────────────────────────────────

    /// Put a skill on cooldown and return its state as used.
    pub fn use_skill(
        &self,
        character_id: CharacterId,
        skill_id: &str,
    ) -> Result<CharacterSkillState> {
        let mut skills = self.write();
        let state = skills
            .get_mut(&character_id)
            .and_then(|list| list.iter_mut().find(|s| s.skill_id == skill_id))
            .ok_or_else(|| BattleError::not_found("skill", skill_id))?;

        if !state.is_ready() {
            return Err(BattleError::StateConflict(format!(
                "skill '{}' is on cooldown for {} more rounds",
                skill_id, state.cooldown_left
            )));
        }

        state.cooldown_left = state.cooldown_on_use();
        Ok(state.clone())
    }

    /// Decrement every cooldown by one round, never below zero.
    pub fn tick_cooldowns(&self, character_id: CharacterId) {
        if let Some(list) = self.write().get_mut(&character_id) {
            for state in list.iter_mut() {
                state.cooldown_left = state.cooldown_left.saturating_sub(1);
            }
        }
    }

    pub fn reset_cooldowns(&self, character_id: CharacterId) {
        if let Some(list) = self.write().get_mut(&character_id) {
            for state in list.iter_mut() {
                state.cooldown_left = 0;
            }
        }
    }

    // ── Damage ──────────────────────────────────────────────────

    /// Damage of `state` cast by `character` on `target`.
    ///
    /// Effective attack stacks the passive attack modifier, the low-HP
    /// frenzy bonus and attack buffs. Half of the target's buff- and
    /// debuff-adjusted defense is subtracted, then ±20% variance is applied. Damaging
    /// skills never deal less than 1; skills without a damage formula
    /// return 0.
    pub fn calculate_skill_damage(
        &self,
        state: &CharacterSkillState,
        character: &Character,
        target: &Monster,
        passives: &PassiveSkillManager,
        buffs: &BuffManager,
        rng: &mut impl Rng,
    ) -> i32 {
        let definition = &state.definition;
        if !definition.deals_damage() {
            return 0;
        }

        let attack = effective_attack(character, definition.damage_type.is_physical(), passives, buffs);

        let mut base_damage = match definition.formula {
            DamageFormula::Scaled { .. } => attack * state.payload.damage_multiplier,
            DamageFormula::AttackDefenseBlend { .. } => {
                let defense_mod = passives.get_passive_modifier(character.id, PassiveStat::Defense);
                let defense = character.physical_defense.max(0) as f64 * (1.0 + defense_mod / 100.0);
                attack * state.payload.damage_multiplier + defense * state.payload.defense_multiplier
            }
            DamageFormula::NoDamage => 0.0,
        };

        let damage_mod = passives.get_passive_modifier(character.id, PassiveStat::Damage);
        base_damage *= 1.0 + damage_mod / 100.0;

        let mut target_defense = target.defense_against(definition.damage_type).max(0) as f64;
        let defense_mod = buffs.enemy_defense_modifier(&target.id);
        if defense_mod != 0.0 {
            target_defense = (target_defense * (1.0 + defense_mod / 100.0)).max(0.0);
        }

        let damage = (base_damage - target_defense * SKILL_DEFENSE_FACTOR).max(MIN_DAMAGE as f64);
        let variance = damage * SKILL_DAMAGE_VARIANCE * rng.gen_range(-1.0..=1.0);
        ((damage + variance).round() as i32).max(MIN_DAMAGE)
    }

    fn read(&self) -> RwLockReadGuard<'_, SkillMap> {
        self.skills.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SkillMap> {
        self.skills.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Attack after passive, low-HP frenzy and buff modifiers.
pub fn effective_attack(
    character: &Character,
    physical: bool,
    passives: &PassiveSkillManager,
    buffs: &BuffManager,
) -> f64 {
    let base = if physical {
        character.physical_attack
    } else {
        character.magic_attack
    };
    let mut attack = base.max(0) as f64;

    let attack_mod = passives.get_passive_modifier(character.id, PassiveStat::Attack);
    attack *= 1.0 + attack_mod / 100.0;

    let hp_fraction = character.hp_percent() / 100.0;
    for frenzy in passives.passives_of_kind(character.id, PassiveKind::LowHpFrenzy) {
        let steps = frenzy.level.saturating_sub(1) as f64;
        let threshold = FRENZY_HP_THRESHOLD_BASE - steps * FRENZY_HP_THRESHOLD_STEP;
        if hp_fraction < threshold {
            let bonus = FRENZY_ATTACK_BONUS_BASE + steps * FRENZY_ATTACK_BONUS_STEP;
            attack *= 1.0 + bonus / 100.0;
        }
    }

    let buff_attack = buffs.get_buff_value(character.id, BuffStat::Attack);
    if buff_attack > 0.0 {
        attack *= 1.0 + buff_attack / 100.0;
    }
    attack
}
