//! In-memory repository implementations for tests, the simulator and
//! local runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::error::{RepoResult, RepositoryError};
use super::traits::*;
use crate::character::{Character, CharacterId, UserId};
use crate::monsters::MonsterTemplate;
use crate::passives::{warrior_passives, PassiveDefinition};
use crate::skills::{warrior_skills, LearnedSkill, SkillDefinition};
use crate::strategy::BattleStrategy;
use crate::zones::{get_all_zones, get_zone_monsters, Zone};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

// ── Characters ──────────────────────────────────────────────────────

/// Character store that also counts write-backs.
#[derive(Debug, Default)]
pub struct InMemoryCharacterRepository {
    characters: RwLock<HashMap<CharacterId, Character>>,
    battle_writes: AtomicUsize,
    death_writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl InMemoryCharacterRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_characters(characters: impl IntoIterator<Item = Character>) -> Self {
        let repo = Self::new();
        for character in characters {
            repo.insert(character);
        }
        repo
    }

    pub fn insert(&self, character: Character) {
        write(&self.characters).insert(character.id, character);
    }

    /// Snapshot of the stored record.
    pub fn get(&self, id: CharacterId) -> Option<Character> {
        read(&self.characters).get(&id).cloned()
    }

    pub fn battle_writes(&self) -> usize {
        self.battle_writes.load(Ordering::Relaxed)
    }

    pub fn death_writes(&self) -> usize {
        self.death_writes.load(Ordering::Relaxed)
    }

    /// Make every subsequent write fail with `Unavailable`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    fn check_writable(&self) -> RepoResult<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(RepositoryError::Unavailable("writes disabled".into()));
        }
        Ok(())
    }
}

impl CharacterRepository for InMemoryCharacterRepository {
    fn get_by_id(&self, id: CharacterId) -> RepoResult<Character> {
        self.get(id)
            .ok_or_else(|| RepositoryError::not_found("character", id))
    }

    fn get_by_user(&self, user_id: UserId) -> RepoResult<Vec<Character>> {
        let mut roster: Vec<Character> = read(&self.characters)
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        roster.sort_by_key(|c| c.id);
        Ok(roster)
    }

    fn update_after_battle(&self, character: &Character) -> RepoResult<()> {
        self.check_writable()?;
        self.battle_writes.fetch_add(1, Ordering::Relaxed);
        write(&self.characters).insert(character.id, character.clone());
        Ok(())
    }

    fn update_after_death(&self, character: &Character) -> RepoResult<()> {
        self.check_writable()?;
        self.death_writes.fetch_add(1, Ordering::Relaxed);
        let mut characters = write(&self.characters);
        let stored = characters
            .entry(character.id)
            .or_insert_with(|| character.clone());
        stored.total_deaths = character.total_deaths;
        stored.is_dead = character.is_dead;
        stored.hp = character.hp;
        Ok(())
    }
}

// ── Zones ───────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemoryZoneRepository {
    zones: RwLock<HashMap<String, Zone>>,
    monsters: RwLock<HashMap<String, Vec<MonsterTemplate>>>,
}

impl InMemoryZoneRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loaded with the built-in zone catalogue.
    pub fn with_starter_data() -> Self {
        let repo = Self::new();
        for zone in get_all_zones() {
            let monsters = get_zone_monsters(&zone.id);
            repo.add_zone(zone, monsters);
        }
        repo
    }

    pub fn add_zone(&self, zone: Zone, monsters: Vec<MonsterTemplate>) {
        write(&self.monsters).insert(zone.id.clone(), monsters);
        write(&self.zones).insert(zone.id.clone(), zone);
    }
}

impl ZoneRepository for InMemoryZoneRepository {
    fn get_zone_by_id(&self, zone_id: &str) -> RepoResult<Zone> {
        read(&self.zones)
            .get(zone_id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found("zone", zone_id))
    }

    fn get_monsters_by_zone(&self, zone_id: &str) -> RepoResult<Vec<MonsterTemplate>> {
        Ok(read(&self.monsters)
            .get(zone_id)
            .cloned()
            .unwrap_or_default())
    }
}

// ── Strategies ──────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemoryStrategyRepository {
    active: RwLock<HashMap<CharacterId, BattleStrategy>>,
}

impl InMemoryStrategyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the character's active strategy.
    pub fn set_active(&self, strategy: BattleStrategy) {
        write(&self.active).insert(strategy.character_id, strategy);
    }

    pub fn clear_active(&self, character_id: CharacterId) {
        write(&self.active).remove(&character_id);
    }
}

impl StrategyRepository for InMemoryStrategyRepository {
    fn get_active_by_character_id(
        &self,
        character_id: CharacterId,
    ) -> RepoResult<Option<BattleStrategy>> {
        Ok(read(&self.active)
            .get(&character_id)
            .filter(|s| s.is_active)
            .cloned())
    }
}

// ── Skills and passives ─────────────────────────────────────────────

/// Active and passive skill definitions plus per-character unlocks.
#[derive(Debug, Default)]
pub struct InMemorySkillRepository {
    skills: RwLock<HashMap<String, SkillDefinition>>,
    passives: RwLock<HashMap<String, PassiveDefinition>>,
    learned_skills: RwLock<HashMap<CharacterId, Vec<LearnedSkill>>>,
    learned_passives: RwLock<HashMap<CharacterId, Vec<LearnedSkill>>>,
}

impl InMemorySkillRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loaded with the warrior skill and passive catalogues.
    pub fn with_warrior_catalogue() -> Self {
        let repo = Self::new();
        for skill in warrior_skills() {
            repo.add_skill(skill);
        }
        for passive in warrior_passives() {
            repo.add_passive(passive);
        }
        repo
    }

    pub fn add_skill(&self, skill: SkillDefinition) {
        write(&self.skills).insert(skill.id.clone(), skill);
    }

    pub fn add_passive(&self, passive: PassiveDefinition) {
        write(&self.passives).insert(passive.id.clone(), passive);
    }

    /// Learn or re-level a skill; learning order is kept.
    pub fn learn_skill(&self, character_id: CharacterId, learned: LearnedSkill) {
        upsert(&self.learned_skills, character_id, learned);
    }

    pub fn learn_passive(&self, character_id: CharacterId, learned: LearnedSkill) {
        upsert(&self.learned_passives, character_id, learned);
    }
}

fn upsert(
    lock: &RwLock<HashMap<CharacterId, Vec<LearnedSkill>>>,
    character_id: CharacterId,
    learned: LearnedSkill,
) {
    let mut map = write(lock);
    let list = map.entry(character_id).or_default();
    match list.iter_mut().find(|l| l.skill_id == learned.skill_id) {
        Some(existing) => existing.level = learned.level,
        None => list.push(learned),
    }
}

impl SkillRepository for InMemorySkillRepository {
    fn get_skill_by_id(&self, skill_id: &str) -> RepoResult<SkillDefinition> {
        read(&self.skills)
            .get(skill_id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found("skill", skill_id))
    }

    fn get_character_skills(&self, character_id: CharacterId) -> RepoResult<Vec<LearnedSkill>> {
        Ok(read(&self.learned_skills)
            .get(&character_id)
            .cloned()
            .unwrap_or_default())
    }
}

impl PassiveSkillRepository for InMemorySkillRepository {
    fn get_passive_by_id(&self, passive_id: &str) -> RepoResult<PassiveDefinition> {
        read(&self.passives)
            .get(passive_id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found("passive", passive_id))
    }

    fn get_character_passives(&self, character_id: CharacterId) -> RepoResult<Vec<LearnedSkill>> {
        Ok(read(&self.learned_passives)
            .get(&character_id)
            .cloned()
            .unwrap_or_default())
    }
}
