// Crit and dodge
pub const MAX_CRIT_RATE: f64 = 0.5;
pub const MAX_DODGE_RATE: f64 = 0.5;
pub const BASE_CRIT_RATE: f64 = 0.05;
pub const BASE_CRIT_DAMAGE: f64 = 1.5;
pub const CRIT_DAMAGE_PER_STRENGTH: f64 = 0.003;
pub const AGILITY_PER_CRIT_PERCENT: f64 = 20.0;

// Derived stat weights
pub const PHYS_ATTACK_PER_STRENGTH: f64 = 0.4;
pub const PHYS_ATTACK_PER_AGILITY: f64 = 0.2;
pub const MAGIC_ATTACK_PER_INTELLECT: f64 = 1.0;
pub const MAGIC_ATTACK_PER_SPIRIT: f64 = 0.2;
pub const HP_PER_STAMINA: i32 = 2;
pub const MANA_PER_SPIRIT: i32 = 2;
pub const MANA_REGEN_PER_SPIRIT: f64 = 0.1;

// Safe defaults for missing combatants
pub const MIN_DAMAGE: i32 = 1;
pub const DEFAULT_SPEED: i32 = 10;

// Skill damage
pub const SKILL_DAMAGE_VARIANCE: f64 = 0.2;
pub const SKILL_DEFENSE_FACTOR: f64 = 0.5;
pub const EXECUTE_HP_THRESHOLD: f64 = 0.2;
pub const SHIELD_BLEND_ATTACK_MULT: f64 = 1.0;
pub const SHIELD_BLEND_DEFENSE_MULT: f64 = 0.5;

// Low-HP passive archetypes: value = base - (level-1) * step
pub const FRENZY_HP_THRESHOLD_BASE: f64 = 0.50;
pub const FRENZY_HP_THRESHOLD_STEP: f64 = 0.05;
pub const FRENZY_ATTACK_BONUS_BASE: f64 = 20.0;
pub const FRENZY_ATTACK_BONUS_STEP: f64 = 10.0;
pub const LAST_STAND_HP_THRESHOLD_BASE: f64 = 0.30;
pub const LAST_STAND_HP_THRESHOLD_STEP: f64 = 0.05;
pub const LAST_STAND_REDUCTION_BASE: f64 = 25.0;
pub const LAST_STAND_REDUCTION_STEP: f64 = 10.0;
pub const REVENGE_DAMAGE_BASE: f64 = 100.0;
pub const REVENGE_DAMAGE_STEP: f64 = 20.0;

// Monster AI defaults
pub const AI_DEFAULT_DEFENSE_THRESHOLD: f64 = 0.3;
pub const AI_HIGH_DAMAGE_BASE_VALUE: f64 = 50.0;
/// Rounds a monster's defense skill stays up
pub const MONSTER_GUARD_DURATION: u32 = 3;

// Passive-granted battle shield
pub const PASSIVE_HP_SHIELD_ID: &str = "passive_hp_shield";
/// Outlasts any fight; cleared with the other battle effects
pub const PASSIVE_HP_SHIELD_DURATION: u32 = 10_000;

// Spawning
pub const MIN_SPAWN_WEIGHT: u32 = 1;
pub const SPAWN_WEIGHT_BASE: i32 = 5;
pub const SPAWN_WEIGHT_PER_DIFF: i32 = 2;

// Rest
pub const REST_SECONDS_FOR_FULL_LOSS: f64 = 50.0;
pub const REVIVE_HP_FRACTION: f64 = 0.5;

// Experience
pub const BASE_EXP_TO_NEXT: i64 = 100;
pub const LEVEL_UP_STAT_GAIN: i32 = 1;
pub const LEVEL_UP_HP_GAIN: i32 = 10;
pub const LEVEL_UP_MANA_GAIN: i32 = 5;
