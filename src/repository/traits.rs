//! Collaborator contracts consumed by the engine.
//!
//! Static definitions (zones, monsters, skills, strategies) are read-only
//! here. Characters are the only records the engine writes back, and only
//! after a kill, death, level-up or rest outcome.

use super::error::RepoResult;
use crate::character::{Character, CharacterId, UserId};
use crate::monsters::MonsterTemplate;
use crate::passives::PassiveDefinition;
use crate::skills::{LearnedSkill, SkillDefinition};
use crate::strategy::BattleStrategy;
use crate::zones::Zone;

/// Character roster persistence.
pub trait CharacterRepository: Send + Sync {
    fn get_by_id(&self, id: CharacterId) -> RepoResult<Character>;

    /// Every character owned by the user, in roster order
    fn get_by_user(&self, user_id: UserId) -> RepoResult<Vec<Character>>;

    /// Persist hp/resource/exp/level/stats/kills after a fight or rest
    fn update_after_battle(&self, character: &Character) -> RepoResult<()>;

    /// Persist the death counter and dead flag
    fn update_after_death(&self, character: &Character) -> RepoResult<()>;
}

/// Zone and spawn-pool lookups.
pub trait ZoneRepository: Send + Sync {
    fn get_zone_by_id(&self, zone_id: &str) -> RepoResult<Zone>;

    /// Spawn templates for the zone, including their spawn weights
    fn get_monsters_by_zone(&self, zone_id: &str) -> RepoResult<Vec<MonsterTemplate>>;
}

/// Battle strategy lookups.
pub trait StrategyRepository: Send + Sync {
    /// The character's active strategy, if any
    fn get_active_by_character_id(
        &self,
        character_id: CharacterId,
    ) -> RepoResult<Option<BattleStrategy>>;
}

/// Active skill definitions and what each character has learned.
pub trait SkillRepository: Send + Sync {
    fn get_skill_by_id(&self, skill_id: &str) -> RepoResult<SkillDefinition>;

    fn get_character_skills(&self, character_id: CharacterId) -> RepoResult<Vec<LearnedSkill>>;
}

/// Passive skill definitions and what each character has unlocked.
pub trait PassiveSkillRepository: Send + Sync {
    fn get_passive_by_id(&self, passive_id: &str) -> RepoResult<PassiveDefinition>;

    fn get_character_passives(&self, character_id: CharacterId) -> RepoResult<Vec<LearnedSkill>>;
}
