//! Target and skill selection for monsters.
//!
//! Each monster gets a behavior profile, either the default for its AI
//! type or one parsed from its declarative JSON. Profiles are parsed once
//! into typed priorities; unknown priority names are dropped.

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::types::*;
use crate::character::{Character, CharacterId};
use crate::core::constants::{AI_HIGH_DAMAGE_BASE_VALUE, EXECUTE_HP_THRESHOLD};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiTargetPriority {
    LowestHp,
    HighestThreat,
    LowestDefense,
    /// Random pick, gated by the profile's random factor
    Random,
}

impl AiTargetPriority {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "lowest_hp" => Some(Self::LowestHp),
            "highest_threat" => Some(Self::HighestThreat),
            "lowest_defense" => Some(Self::LowestDefense),
            "random" => Some(Self::Random),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiSkillPriority {
    /// Attack skills with a large base value
    HighDamage,
    /// Attack skills while the target is below 20% HP
    Execute,
    Attack,
    Defense,
    Heal,
    Control,
    Special,
    /// Matches anything
    Balanced,
}

impl AiSkillPriority {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "high_damage" => Some(Self::HighDamage),
            "execute" => Some(Self::Execute),
            "attack" => Some(Self::Attack),
            "defense" => Some(Self::Defense),
            "heal" => Some(Self::Heal),
            "control" => Some(Self::Control),
            "special" => Some(Self::Special),
            "balanced" => Some(Self::Balanced),
            _ => None,
        }
    }

    /// `target_hp` is a fraction of max HP.
    pub fn matches(&self, skill: &MonsterSkill, target_hp: Option<f64>) -> bool {
        match self {
            Self::HighDamage => {
                skill.is_attack() && skill.skill.base_value > AI_HIGH_DAMAGE_BASE_VALUE
            }
            Self::Execute => {
                skill.is_attack() && target_hp.is_some_and(|hp| hp < EXECUTE_HP_THRESHOLD)
            }
            Self::Attack => skill.skill_type == MonsterSkillType::Attack,
            Self::Defense => skill.skill_type == MonsterSkillType::Defense,
            Self::Heal => skill.skill_type == MonsterSkillType::Heal,
            Self::Control => skill.skill_type == MonsterSkillType::Control,
            Self::Special => skill.skill_type == MonsterSkillType::Special,
            Self::Balanced => true,
        }
    }
}

/// HP-gated behavior stage for bosses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiPhase {
    /// Fraction of max HP at or above which the phase applies
    pub hp_threshold: f64,
    /// Archetype whose skill priorities lead while the phase is active
    pub behavior: AiType,
    /// Skill ids usable in this phase; empty allows all
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiBehavior {
    pub target_priority: Vec<AiTargetPriority>,
    pub skill_priority: Vec<AiSkillPriority>,
    /// Below this HP fraction, defense/heal skills come first
    pub defense_threshold: f64,
    /// Chance (0-1) that a `random` target priority fires
    pub random_factor: f64,
    /// Sorted by descending threshold
    pub phases: Vec<AiPhase>,
}

#[derive(Debug, Deserialize)]
struct RawPhase {
    hp_threshold: f64,
    #[serde(default)]
    behavior: String,
    #[serde(default)]
    skills: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawBehavior {
    #[serde(default)]
    target_priority: Vec<String>,
    #[serde(default)]
    skill_priority: Vec<String>,
    #[serde(default)]
    defense_threshold: f64,
    #[serde(default)]
    random_factor: f64,
    #[serde(default)]
    phases: Vec<RawPhase>,
}

impl From<RawBehavior> for AiBehavior {
    fn from(raw: RawBehavior) -> Self {
        let mut phases: Vec<AiPhase> = raw
            .phases
            .into_iter()
            .map(|p| AiPhase {
                hp_threshold: p.hp_threshold,
                behavior: AiType::parse(&p.behavior),
                skills: p.skills,
            })
            .collect();
        phases.sort_by(|a, b| b.hp_threshold.total_cmp(&a.hp_threshold));

        AiBehavior {
            target_priority: raw
                .target_priority
                .iter()
                .filter_map(|s| AiTargetPriority::parse(s))
                .collect(),
            skill_priority: raw
                .skill_priority
                .iter()
                .filter_map(|s| AiSkillPriority::parse(s))
                .collect(),
            defense_threshold: raw.defense_threshold,
            random_factor: raw.random_factor.clamp(0.0, 1.0),
            phases,
        }
    }
}

impl AiBehavior {
    /// Parse a declarative profile.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RawBehavior>(raw).map(AiBehavior::from)
    }

    /// Built-in profile for an AI archetype.
    pub fn default_for(monster_type: MonsterType, ai_type: AiType) -> Self {
        use AiSkillPriority as S;
        use AiTargetPriority as T;

        let profile = |targets: Vec<T>, skills: Vec<S>, defense: f64, random: f64| AiBehavior {
            target_priority: targets,
            skill_priority: skills,
            defense_threshold: defense,
            random_factor: random,
            phases: Vec::new(),
        };

        match ai_type {
            AiType::Aggressive => profile(
                vec![T::LowestHp, T::LowestDefense],
                vec![S::HighDamage, S::Execute],
                0.2,
                0.1,
            ),
            AiType::Defensive => profile(
                vec![T::HighestThreat],
                vec![S::Defense, S::Heal, S::Attack],
                0.5,
                0.1,
            ),
            AiType::Special if monster_type == MonsterType::Boss => {
                let mut boss = profile(
                    vec![T::HighestThreat, T::LowestHp],
                    vec![S::Special, S::HighDamage],
                    0.3,
                    0.05,
                );
                boss.phases = vec![
                    AiPhase {
                        hp_threshold: 1.0,
                        behavior: AiType::Aggressive,
                        skills: Vec::new(),
                    },
                    AiPhase {
                        hp_threshold: 0.5,
                        behavior: AiType::Defensive,
                        skills: Vec::new(),
                    },
                ];
                boss
            }
            AiType::Special => profile(vec![T::Random, T::LowestHp], vec![S::Balanced], 0.3, 0.2),
            AiType::Balanced => profile(vec![T::Random, T::LowestHp], vec![S::Balanced], 0.3, 0.3),
        }
    }
}

/// Decision maker for one monster.
#[derive(Debug, Clone, PartialEq)]
pub struct MonsterAI {
    pub ai_type: AiType,
    pub behavior: AiBehavior,
}

impl MonsterAI {
    /// Resolve the monster's profile. A behavior blob that fails to parse
    /// falls back to the AI type's default.
    pub fn new(monster: &Monster) -> Self {
        let behavior = match monster.ai_behavior.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(raw) => AiBehavior::from_json(raw).unwrap_or_else(|err| {
                warn!(monster = %monster.template_id, error = %err, "invalid AI behavior, using default");
                AiBehavior::default_for(monster.monster_type, monster.ai_type)
            }),
            None => AiBehavior::default_for(monster.monster_type, monster.ai_type),
        };
        Self {
            ai_type: monster.ai_type,
            behavior,
        }
    }

    pub fn with_behavior(ai_type: AiType, behavior: AiBehavior) -> Self {
        Self { ai_type, behavior }
    }

    /// Index into `candidates` of the character to attack. Only living
    /// characters are considered; `None` when nobody is alive.
    pub fn select_target(
        &self,
        candidates: &[Character],
        threat: Option<&HashMap<CharacterId, i64>>,
        rng: &mut impl Rng,
    ) -> Option<usize> {
        let alive: Vec<usize> = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_alive())
            .map(|(i, _)| i)
            .collect();

        let first = *alive.first()?;
        if alive.len() == 1 {
            return Some(first);
        }

        for priority in &self.behavior.target_priority {
            let pick = match priority {
                AiTargetPriority::LowestHp => alive
                    .iter()
                    .copied()
                    .min_by_key(|&i| candidates[i].hp),
                AiTargetPriority::LowestDefense => alive
                    .iter()
                    .copied()
                    .min_by_key(|&i| candidates[i].physical_defense + candidates[i].magic_defense),
                AiTargetPriority::HighestThreat => match threat {
                    Some(table) if !table.is_empty() => {
                        // min_by_key keeps the first of equal keys
                        alive.iter().copied().min_by_key(|&i| {
                            std::cmp::Reverse(table.get(&candidates[i].id).copied().unwrap_or(0))
                        })
                    }
                    _ => Some(first),
                },
                AiTargetPriority::Random => {
                    if rng.gen::<f64>() < self.behavior.random_factor {
                        Some(alive[rng.gen_range(0..alive.len())])
                    } else {
                        None
                    }
                }
            };
            if pick.is_some() {
                return pick;
            }
        }

        Some(first)
    }

    /// Active phase, if the profile has any.
    pub fn get_current_phase(&self, monster: &Monster) -> Option<&AiPhase> {
        let hp = monster.hp_fraction();
        self.behavior
            .phases
            .iter()
            .find(|phase| hp >= phase.hp_threshold)
            .or_else(|| self.behavior.phases.last())
    }

    /// Index into `monster.skills` of the skill to use, or `None` for a
    /// normal attack.
    pub fn select_skill(&self, monster: &Monster, target: Option<&Character>) -> Option<usize> {
        if monster.skills.is_empty() {
            return None;
        }

        let self_hp = monster.hp_fraction();
        let target_hp = target.map(|t| t.hp_percent() / 100.0);

        if self_hp < self.behavior.defense_threshold {
            let defensive = monster.skills.iter().position(|s| {
                s.is_ready()
                    && matches!(s.skill_type, MonsterSkillType::Defense | MonsterSkillType::Heal)
            });
            if defensive.is_some() {
                return defensive;
            }
        }

        let phase = self.get_current_phase(monster);
        let mut available: Vec<usize> = monster
            .skills
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_ready())
            .filter(|(_, s)| s.skill.resource_cost <= monster.mp)
            .filter(|(_, s)| {
                s.use_condition
                    .map_or(true, |c| c.is_met(self_hp, target_hp))
            })
            .filter(|(_, s)| {
                phase.map_or(true, |p| p.skills.is_empty() || p.skills.contains(&s.skill.id))
            })
            .map(|(i, _)| i)
            .collect();

        if available.is_empty() {
            return None;
        }

        // Stable: equal priorities keep slot order
        available.sort_by_key(|&i| std::cmp::Reverse(monster.skills[i].priority));

        let phase_priorities = phase
            .map(|p| AiBehavior::default_for(monster.monster_type, p.behavior).skill_priority)
            .unwrap_or_default();

        for priority in phase_priorities.iter().chain(self.behavior.skill_priority.iter()) {
            if let Some(&index) = available
                .iter()
                .find(|&&i| priority.matches(&monster.skills[i], target_hp))
            {
                return Some(index);
            }
        }

        available.first().copied()
    }

    /// One round passes for every skill.
    pub fn tick_cooldowns(&self, monster: &mut Monster) {
        for skill in &mut monster.skills {
            skill.cooldown_left = skill.cooldown_left.saturating_sub(1);
        }
    }

    /// Start the skill's cooldown and pay its cost, MP floored at 0.
    pub fn use_skill(&self, monster: &mut Monster, index: usize) {
        if let Some(skill) = monster.skills.get_mut(index) {
            skill.cooldown_left = skill.cooldown;
            monster.mp = (monster.mp - skill.skill.resource_cost.max(0)).max(0);
        }
    }
}
