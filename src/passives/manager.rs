use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tracing::warn;

use super::types::*;
use crate::character::CharacterId;
use crate::core::Result;
use crate::repository::{PassiveSkillRepository, RepositoryError};

/// Unlocked passives per character, values precomputed at load.
#[derive(Debug, Default)]
pub struct PassiveSkillManager {
    passives: RwLock<HashMap<CharacterId, Vec<CharacterPassiveState>>>,
}

impl PassiveSkillManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a character's passives from the repository. Unknown passive ids
    /// are skipped. Returns the number loaded.
    pub fn load_character_passives(
        &self,
        character_id: CharacterId,
        repo: &dyn PassiveSkillRepository,
    ) -> Result<usize> {
        let learned = repo.get_character_passives(character_id)?;
        let mut states = Vec::with_capacity(learned.len());
        for entry in learned {
            match repo.get_passive_by_id(&entry.skill_id) {
                Ok(definition) => states.push(CharacterPassiveState::new(definition, entry.level)),
                Err(RepositoryError::NotFound { .. }) => {
                    warn!(character_id, passive_id = %entry.skill_id, "unknown passive skipped");
                }
                Err(err) => return Err(err.into()),
            }
        }
        let count = states.len();
        self.write().insert(character_id, states);
        Ok(count)
    }

    /// Install passives directly, bypassing the repository.
    pub fn set_character_passives(
        &self,
        character_id: CharacterId,
        passives: Vec<(PassiveDefinition, u32)>,
    ) {
        let states = passives
            .into_iter()
            .map(|(definition, level)| CharacterPassiveState::new(definition, level))
            .collect();
        self.write().insert(character_id, states);
    }

    pub fn is_loaded(&self, character_id: CharacterId) -> bool {
        self.read().contains_key(&character_id)
    }

    pub fn get_passive_skills(&self, character_id: CharacterId) -> Vec<CharacterPassiveState> {
        self.read().get(&character_id).cloned().unwrap_or_default()
    }

    /// Passives of one kind, in unlock order.
    pub fn passives_of_kind(
        &self,
        character_id: CharacterId,
        kind: PassiveKind,
    ) -> Vec<CharacterPassiveState> {
        self.read()
            .get(&character_id)
            .map(|list| list.iter().filter(|p| p.kind() == kind).cloned().collect())
            .unwrap_or_default()
    }

    /// Sum of values for passives of `kind`; when `stat` is given only
    /// passives affecting it count.
    pub fn get_passive_effect_value(
        &self,
        character_id: CharacterId,
        kind: PassiveKind,
        stat: Option<PassiveStat>,
    ) -> f64 {
        self.read()
            .get(&character_id)
            .map(|list| {
                list.iter()
                    .filter(|p| p.kind() == kind)
                    .filter(|p| match (stat, p.definition.stat) {
                        (None, _) => true,
                        (Some(wanted), Some(declared)) => declared.affects(wanted),
                        (Some(_), None) => false,
                    })
                    .map(|p| p.value)
                    .sum()
            })
            .unwrap_or(0.0)
    }

    /// Percent modifier to `stat` from `stat_mod` passives.
    pub fn get_passive_modifier(&self, character_id: CharacterId, stat: PassiveStat) -> f64 {
        self.get_passive_effect_value(character_id, PassiveKind::StatMod, Some(stat))
    }

    pub fn has_passive_skill(&self, character_id: CharacterId, passive_id: &str) -> bool {
        self.get_passive_skill_level(character_id, passive_id) > 0
    }

    /// Learned level, or 0 when not unlocked.
    pub fn get_passive_skill_level(&self, character_id: CharacterId, passive_id: &str) -> u32 {
        self.read()
            .get(&character_id)
            .and_then(|list| list.iter().find(|p| p.passive_id == passive_id))
            .map(|p| p.level)
            .unwrap_or(0)
    }

    pub fn clear_character_passives(&self, character_id: CharacterId) {
        self.write().remove(&character_id);
    }

    fn read(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, HashMap<CharacterId, Vec<CharacterPassiveState>>> {
        self.passives.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<CharacterId, Vec<CharacterPassiveState>>> {
        self.passives.write().unwrap_or_else(PoisonError::into_inner)
    }
}
