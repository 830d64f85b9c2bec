use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::combat::DamageType;
use crate::core::constants::DEFAULT_SPEED;
use crate::skills::SkillKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonsterType {
    #[default]
    Normal,
    Elite,
    Boss,
    Special,
}

impl MonsterType {
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "elite" => MonsterType::Elite,
            "boss" => MonsterType::Boss,
            "special" => MonsterType::Special,
            _ => MonsterType::Normal,
        }
    }
}

/// Coarse AI archetype; selects the default behavior profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiType {
    Aggressive,
    Defensive,
    Special,
    #[default]
    Balanced,
}

impl AiType {
    /// Lenient parse; unknown names are balanced.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "aggressive" => AiType::Aggressive,
            "defensive" => AiType::Defensive,
            "special" => AiType::Special,
            _ => AiType::Balanced,
        }
    }
}

/// Category a monster skill is slotted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonsterSkillType {
    #[default]
    Attack,
    Defense,
    Heal,
    Control,
    Special,
}

/// Static part of a monster skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonsterSkillDef {
    pub id: String,
    pub name: String,
    pub kind: SkillKind,
    #[serde(default)]
    pub damage_type: DamageType,
    /// Attack bonus percent for damaging skills, heal/guard percent otherwise
    pub base_value: f64,
    #[serde(default)]
    pub resource_cost: i32,
}

/// HP bounds a monster skill requires, all as fractions of max HP.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MonsterUseCondition {
    #[serde(default)]
    pub hp_min: Option<f64>,
    #[serde(default)]
    pub hp_max: Option<f64>,
    #[serde(default)]
    pub target_hp_min: Option<f64>,
    #[serde(default)]
    pub target_hp_max: Option<f64>,
}

impl MonsterUseCondition {
    /// Parse a JSON condition. Malformed input means "no condition".
    pub fn from_json(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            return None;
        }
        match serde_json::from_str(raw) {
            Ok(condition) => Some(condition),
            Err(err) => {
                warn!(error = %err, "ignoring malformed monster skill condition");
                None
            }
        }
    }

    /// `self_hp` and `target_hp` are fractions of max HP. Target bounds are
    /// ignored without a target.
    pub fn is_met(&self, self_hp: f64, target_hp: Option<f64>) -> bool {
        if self.hp_min.is_some_and(|min| self_hp < min) {
            return false;
        }
        if self.hp_max.is_some_and(|max| self_hp > max) {
            return false;
        }
        if let Some(target_hp) = target_hp {
            if self.target_hp_min.is_some_and(|min| target_hp < min) {
                return false;
            }
            if self.target_hp_max.is_some_and(|max| target_hp > max) {
                return false;
            }
        }
        true
    }
}

/// A skill slotted on a monster, with its own cooldown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonsterSkill {
    pub skill: MonsterSkillDef,
    pub skill_type: MonsterSkillType,
    /// Higher is preferred
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub cooldown: u32,
    #[serde(default)]
    pub cooldown_left: u32,
    #[serde(default)]
    pub use_condition: Option<MonsterUseCondition>,
}

impl MonsterSkill {
    pub fn new(skill: MonsterSkillDef, skill_type: MonsterSkillType, priority: i32, cooldown: u32) -> Self {
        Self {
            skill,
            skill_type,
            priority,
            cooldown,
            cooldown_left: 0,
            use_condition: None,
        }
    }

    pub fn with_condition(mut self, condition: MonsterUseCondition) -> Self {
        self.use_condition = Some(condition);
        self
    }

    pub fn is_ready(&self) -> bool {
        self.cooldown_left == 0
    }

    pub fn is_attack(&self) -> bool {
        self.skill.kind == SkillKind::Attack
    }
}

/// Spawnable monster record from a zone's pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonsterTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub zone_id: String,
    pub level: u32,
    #[serde(default)]
    pub monster_type: MonsterType,
    pub hp: i32,
    pub mp: i32,
    pub physical_attack: i32,
    pub magic_attack: i32,
    pub physical_defense: i32,
    pub magic_defense: i32,
    #[serde(default)]
    pub attack_type: DamageType,
    pub crit_rate: f64,
    pub crit_damage: f64,
    pub dodge_rate: f64,
    pub speed: i32,
    pub exp_reward: i64,
    pub gold_min: i64,
    pub gold_max: i64,
    /// Relative draw weight; values ≤ 0 count as 1
    pub spawn_weight: i32,
    #[serde(default)]
    pub ai_type: AiType,
    /// Declarative behavior profile overriding the AI type's default
    #[serde(default)]
    pub ai_behavior: Option<String>,
    #[serde(default)]
    pub skills: Vec<MonsterSkill>,
}

impl MonsterTemplate {
    /// A plain melee monster with level-derived rewards.
    pub fn new(id: impl Into<String>, name: impl Into<String>, level: u32) -> Self {
        let level = level.max(1);
        Self {
            id: id.into(),
            name: name.into(),
            zone_id: String::new(),
            level,
            monster_type: MonsterType::Normal,
            hp: 40 + level as i32 * 10,
            mp: 100,
            physical_attack: 5 + level as i32 * 2,
            magic_attack: 0,
            physical_defense: 2 + level as i32,
            magic_defense: 1 + level as i32 / 2,
            attack_type: DamageType::Physical,
            crit_rate: 0.05,
            crit_damage: 1.5,
            dodge_rate: 0.05,
            speed: DEFAULT_SPEED,
            exp_reward: level as i64 * 5,
            gold_min: level as i64,
            gold_max: level as i64 * 3,
            spawn_weight: 1,
            ai_type: AiType::Balanced,
            ai_behavior: None,
            skills: Vec::new(),
        }
    }

    pub fn effective_weight(&self) -> u32 {
        self.spawn_weight.max(1) as u32
    }

    /// Fresh instance with full HP/MP and a unique id.
    pub fn spawn(&self) -> Monster {
        Monster {
            id: Uuid::new_v4().to_string(),
            template_id: self.id.clone(),
            name: self.name.clone(),
            level: self.level,
            monster_type: self.monster_type,
            hp: self.hp.max(1),
            max_hp: self.hp.max(1),
            mp: self.mp.max(0),
            max_mp: self.mp.max(0),
            physical_attack: self.physical_attack,
            magic_attack: self.magic_attack,
            physical_defense: self.physical_defense,
            magic_defense: self.magic_defense,
            attack_type: self.attack_type,
            crit_rate: self.crit_rate,
            crit_damage: self.crit_damage,
            dodge_rate: self.dodge_rate,
            speed: self.speed,
            exp_reward: self.exp_reward,
            gold_min: self.gold_min,
            gold_max: self.gold_max,
            ai_type: self.ai_type,
            ai_behavior: self.ai_behavior.clone(),
            skills: self
                .skills
                .iter()
                .cloned()
                .map(|mut s| {
                    s.cooldown_left = 0;
                    s
                })
                .collect(),
        }
    }
}

/// A live enemy. Ephemeral; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monster {
    /// Unique per spawn; keys debuffs and threat
    pub id: String,
    pub template_id: String,
    pub name: String,
    pub level: u32,
    pub monster_type: MonsterType,
    pub hp: i32,
    pub max_hp: i32,
    pub mp: i32,
    pub max_mp: i32,
    pub physical_attack: i32,
    pub magic_attack: i32,
    pub physical_defense: i32,
    pub magic_defense: i32,
    pub attack_type: DamageType,
    pub crit_rate: f64,
    pub crit_damage: f64,
    pub dodge_rate: f64,
    pub speed: i32,
    pub exp_reward: i64,
    pub gold_min: i64,
    pub gold_max: i64,
    pub ai_type: AiType,
    pub ai_behavior: Option<String>,
    pub skills: Vec<MonsterSkill>,
}

impl Monster {
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Current HP as a fraction of max (0.0-1.0).
    pub fn hp_fraction(&self) -> f64 {
        if self.max_hp <= 0 {
            return 0.0;
        }
        self.hp.max(0) as f64 / self.max_hp as f64
    }

    pub fn hp_percent(&self) -> f64 {
        self.hp_fraction() * 100.0
    }

    pub fn attack_for(&self, damage_type: DamageType) -> i32 {
        if damage_type.is_physical() {
            self.physical_attack
        } else {
            self.magic_attack
        }
    }

    /// Returns HP actually lost.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let before = self.hp.max(0);
        self.hp = self.hp.saturating_sub(amount.max(0)).max(0);
        before - self.hp
    }

    /// Returns HP actually restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.hp;
        self.hp = self.hp.saturating_add(amount.max(0)).min(self.max_hp);
        self.hp - before
    }
}
