use serde::{Deserialize, Serialize};

use crate::buffs::BuffStat;
use crate::combat::DamageType;

/// A skill a character has learned, at a given level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnedSkill {
    pub skill_id: String,
    pub level: u32,
}

impl LearnedSkill {
    pub fn new(skill_id: impl Into<String>, level: u32) -> Self {
        Self {
            skill_id: skill_id.into(),
            level,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillKind {
    Attack,
    Buff,
    Debuff,
    Heal,
    Control,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillTarget {
    #[default]
    Enemy,
    EnemyAll,
    SelfOnly,
}

/// How a skill turns stats into raw damage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DamageFormula {
    /// effective attack × ratio
    Scaled { ratio: f64 },
    /// effective attack × attack + effective defense × defense
    AttackDefenseBlend { attack: f64, defense: f64 },
    /// Deals no direct damage
    NoDamage,
}

/// Gate on when a skill may be used.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SkillUseCondition {
    /// Target HP percent (0-100) strictly below the value
    TargetHpBelow { percent: f64 },
}

/// Typed side effect resolved once at load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SkillEffect {
    SelfBuff {
        effect_id: String,
        name: String,
        stat: BuffStat,
        value: f64,
        duration: u32,
    },
    TargetDebuff {
        effect_id: String,
        name: String,
        stat: BuffStat,
        value: f64,
        duration: u32,
    },
    AllEnemiesDebuff {
        effect_id: String,
        name: String,
        stat: BuffStat,
        value: f64,
        duration: u32,
    },
    /// Periodic damage on the target, value% of the caster's attack per tick
    TargetDot {
        effect_id: String,
        name: String,
        attack_percent: f64,
        duration: u32,
        interval: u32,
    },
    HealMaxHpPercent { percent: f64 },
    /// Heal for a share of the damage the skill just dealt
    HealDamagePercent { percent: f64 },
    ShieldMaxHpPercent {
        effect_id: String,
        name: String,
        percent: f64,
        duration: u32,
    },
    ResourceGain { amount: i32 },
    Stun { chance: f64, duration: u32 },
}

/// Static skill definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDefinition {
    pub id: String,
    pub name: String,
    pub kind: SkillKind,
    #[serde(default)]
    pub target: SkillTarget,
    #[serde(default)]
    pub damage_type: DamageType,
    #[serde(default)]
    pub resource_cost: i32,
    /// Cooldown in rounds
    #[serde(default)]
    pub cooldown: u32,
    pub formula: DamageFormula,
    /// Added to the damage ratio per level above 1
    #[serde(default)]
    pub level_scaling: f64,
    /// Per-level cooldown overrides, index 0 = level 1
    #[serde(default)]
    pub level_cooldowns: Vec<u32>,
    #[serde(default)]
    pub ignores_dodge: bool,
    #[serde(default)]
    pub use_condition: Option<SkillUseCondition>,
    #[serde(default)]
    pub effects: Vec<SkillEffect>,
}

impl SkillDefinition {
    pub fn is_aoe(&self) -> bool {
        self.target == SkillTarget::EnemyAll
    }

    pub fn is_execute(&self) -> bool {
        matches!(
            self.use_condition,
            Some(SkillUseCondition::TargetHpBelow { .. })
        )
    }

    pub fn deals_damage(&self) -> bool {
        !matches!(self.formula, DamageFormula::NoDamage)
    }

    /// Level-adjusted payload.
    pub fn payload_at(&self, level: u32) -> SkillPayload {
        let steps = level.max(1).saturating_sub(1) as f64;
        let (damage_multiplier, defense_multiplier) = match self.formula {
            DamageFormula::Scaled { ratio } => (ratio + steps * self.level_scaling, 0.0),
            DamageFormula::AttackDefenseBlend { attack, defense } => {
                (attack + steps * self.level_scaling, defense)
            }
            DamageFormula::NoDamage => (0.0, 0.0),
        };
        let cooldown = self
            .level_cooldowns
            .get(level.max(1) as usize - 1)
            .copied();
        SkillPayload {
            damage_multiplier,
            defense_multiplier,
            cooldown,
        }
    }
}

/// Values computed from a definition at the learned level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkillPayload {
    pub damage_multiplier: f64,
    pub defense_multiplier: f64,
    /// None falls back to the definition's cooldown
    pub cooldown: Option<u32>,
}

/// Cooldown-tracked state of one learned skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterSkillState {
    pub skill_id: String,
    pub level: u32,
    pub cooldown_left: u32,
    pub definition: SkillDefinition,
    pub payload: SkillPayload,
}

impl CharacterSkillState {
    pub fn new(definition: SkillDefinition, level: u32) -> Self {
        let level = level.max(1);
        Self {
            skill_id: definition.id.clone(),
            level,
            cooldown_left: 0,
            payload: definition.payload_at(level),
            definition,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.cooldown_left == 0
    }

    pub fn resource_cost(&self) -> i32 {
        self.definition.resource_cost.max(0)
    }

    /// Cooldown set by a use: payload first, then the definition.
    pub fn cooldown_on_use(&self) -> u32 {
        self.payload.cooldown.unwrap_or(self.definition.cooldown)
    }

    /// Whether the use condition holds for a target at `target_hp_percent`.
    pub fn condition_met(&self, target_hp_percent: Option<f64>) -> bool {
        match self.definition.use_condition {
            None => true,
            Some(SkillUseCondition::TargetHpBelow { percent }) => {
                target_hp_percent.is_some_and(|hp| hp < percent)
            }
        }
    }
}
