//! Evaluates a character's strategy against a battle snapshot.

use tracing::debug;

use super::types::*;
use crate::buffs::BuffManager;
use crate::character::Character;
use crate::monsters::Monster;
use crate::skills::SkillManager;

/// Read-only view of the battle for one character's decision.
#[derive(Debug, Clone, Copy)]
pub struct BattleContext<'a> {
    pub character: &'a Character,
    pub enemies: &'a [Monster],
    /// The whole party, including `character`
    pub allies: &'a [Character],
    /// Current focus target, if any
    pub target: Option<&'a Monster>,
    pub current_round: u32,
    pub skills: &'a SkillManager,
    pub buffs: &'a BuffManager,
}

impl BattleContext<'_> {
    fn target_hp_percent(&self) -> Option<f64> {
        self.target.map(|t| t.hp_percent())
    }

    /// Off cooldown, affordable and usable on the current target.
    pub fn is_skill_available(&self, skill_id: &str) -> bool {
        self.skills.is_skill_available(
            self.character.id,
            skill_id,
            self.character.resource,
            self.target_hp_percent(),
        )
    }

    fn alive_enemies(&self) -> impl Iterator<Item = (usize, &Monster)> {
        self.enemies.iter().enumerate().filter(|(_, e)| e.is_alive())
    }
}

/// Outcome of a strategy evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillDecision {
    pub skill_id: Option<String>,
    pub is_normal_attack: bool,
    /// Index into the context's enemy list
    pub target_index: usize,
    pub reason: String,
}

impl SkillDecision {
    pub fn normal_attack(target_index: usize, reason: impl Into<String>) -> Self {
        Self {
            skill_id: None,
            is_normal_attack: true,
            target_index,
            reason: reason.into(),
        }
    }

    pub fn use_skill(skill_id: impl Into<String>, target_index: usize, reason: impl Into<String>) -> Self {
        Self {
            skill_id: Some(skill_id.into()),
            is_normal_attack: false,
            target_index,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StrategyExecutor;

impl StrategyExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Pick an action. `None` means nothing applied and the caller should
    /// fall back to its own choice.
    pub fn execute_strategy(
        &self,
        strategy: &BattleStrategy,
        ctx: &BattleContext<'_>,
    ) -> Option<SkillDecision> {
        if ctx.character.resource_percent() < strategy.resource_threshold {
            if let Some(decision) = self.check_urgent_rules(strategy, ctx) {
                return Some(decision);
            }
            debug!(
                character_id = ctx.character.id,
                resource = ctx.character.resource,
                "below resource threshold, normal attack"
            );
            return Some(SkillDecision::normal_attack(
                self.select_target(strategy, ctx, None),
                "resource below threshold",
            ));
        }

        for rule in strategy.conditional_rules.iter().filter(|r| r.enabled) {
            if !self.evaluate_condition(&rule.condition, ctx) {
                continue;
            }
            match &rule.action {
                RuleAction::NormalAttack { comment } => {
                    return Some(SkillDecision::normal_attack(
                        self.select_target(strategy, ctx, None),
                        format!("rule {}: {}", rule.id, comment),
                    ));
                }
                RuleAction::UseSkill { skill_id, .. } => {
                    if self.is_usable(strategy, skill_id, ctx) {
                        return Some(SkillDecision::use_skill(
                            skill_id.clone(),
                            self.select_target(strategy, ctx, Some(skill_id)),
                            format!("rule {}", rule.id),
                        ));
                    }
                }
            }
        }

        strategy
            .skill_priority
            .iter()
            .find(|id| self.is_usable(strategy, id, ctx))
            .map(|id| {
                SkillDecision::use_skill(
                    id.clone(),
                    self.select_target(strategy, ctx, Some(id)),
                    "skill priority",
                )
            })
    }

    /// Low-HP self-preservation rules, allowed below the resource gate.
    fn check_urgent_rules(
        &self,
        strategy: &BattleStrategy,
        ctx: &BattleContext<'_>,
    ) -> Option<SkillDecision> {
        strategy
            .conditional_rules
            .iter()
            .filter(|r| r.enabled && r.condition.is_urgent())
            .filter(|r| self.evaluate_condition(&r.condition, ctx))
            .find_map(|rule| {
                let skill_id = rule.action.skill_id()?;
                if !self.is_usable(strategy, skill_id, ctx) {
                    return None;
                }
                Some(SkillDecision::use_skill(
                    skill_id,
                    self.select_target(strategy, ctx, Some(skill_id)),
                    format!("urgent rule {}", rule.id),
                ))
            })
    }

    fn is_usable(&self, strategy: &BattleStrategy, skill_id: &str, ctx: &BattleContext<'_>) -> bool {
        ctx.is_skill_available(skill_id) && !self.is_reserved(strategy, skill_id, ctx)
    }

    /// Reserved skills stay withheld while their own condition is unmet.
    pub fn is_reserved(&self, strategy: &BattleStrategy, skill_id: &str, ctx: &BattleContext<'_>) -> bool {
        strategy
            .reserved_skills
            .iter()
            .filter(|r| r.skill_id == skill_id)
            .any(|r| !self.evaluate_condition(&r.condition, ctx))
    }

    pub fn evaluate_condition(&self, condition: &RuleCondition, ctx: &BattleContext<'_>) -> bool {
        let character = ctx.character;
        let current = match condition.kind {
            ConditionKind::SelfHpPercent => character.hp_percent(),
            ConditionKind::SelfResourcePercent => character.resource_percent(),
            ConditionKind::SelfResource => character.resource as f64,
            ConditionKind::AliveEnemyCount => ctx.alive_enemies().count() as f64,
            ConditionKind::TargetHpPercent => ctx
                .target
                .filter(|t| t.max_hp > 0)
                .map_or(0.0, |t| t.hp_percent()),
            ConditionKind::LowestEnemyHpPercent => ctx
                .alive_enemies()
                .filter(|(_, e)| e.max_hp > 0)
                .map(|(_, e)| e.hp_percent())
                .fold(100.0, f64::min),
            ConditionKind::HighestEnemyHpPercent => ctx
                .alive_enemies()
                .filter(|(_, e)| e.max_hp > 0)
                .map(|(_, e)| e.hp_percent())
                .fold(0.0, f64::max),
            ConditionKind::AliveAllyCount => ctx.allies.iter().filter(|a| a.hp > 0).count() as f64,
            ConditionKind::LowestAllyHpPercent => ctx
                .allies
                .iter()
                .filter(|a| a.hp > 0 && a.max_hp > 0)
                .map(|a| a.hp_percent())
                .fold(100.0, f64::min),
            ConditionKind::BattleRound => ctx.current_round as f64,
            ConditionKind::SkillReady => {
                return condition
                    .skill_id
                    .as_deref()
                    .is_some_and(|id| ctx.is_skill_available(id));
            }
            ConditionKind::SkillOnCooldown => {
                return condition
                    .skill_id
                    .as_deref()
                    .is_some_and(|id| !ctx.is_skill_available(id));
            }
            ConditionKind::SelfHasBuff => {
                return condition
                    .buff_id
                    .as_deref()
                    .is_some_and(|id| ctx.buffs.has_buff(character.id, id));
            }
            ConditionKind::SelfMissingBuff => {
                return condition
                    .buff_id
                    .as_deref()
                    .map_or(true, |id| !ctx.buffs.has_buff(character.id, id));
            }
            ConditionKind::Always => return true,
            ConditionKind::Unknown => return false,
        };

        condition
            .operator
            .is_some_and(|op| op.compare(current, condition.value))
    }

    /// Enemy index for `skill_id` (or a normal attack when `None`). Returns
    /// 0 when no enemy is alive.
    pub fn select_target(
        &self,
        strategy: &BattleStrategy,
        ctx: &BattleContext<'_>,
        skill_id: Option<&str>,
    ) -> usize {
        let alive: Vec<usize> = ctx.alive_enemies().map(|(i, _)| i).collect();
        let Some(&first) = alive.first() else {
            return 0;
        };

        let is_execute = skill_id
            .and_then(|id| ctx.skills.get_skill_state(ctx.character.id, id))
            .is_some_and(|s| s.definition.is_execute());
        let priority = if is_execute && strategy.auto_target_settings.execute_auto_target {
            TargetPriority::LowestHp
        } else {
            strategy.target_priority_for(skill_id)
        };

        match priority {
            TargetPriority::LowestHp => alive
                .iter()
                .copied()
                .min_by_key(|&i| ctx.enemies[i].hp)
                .unwrap_or(first),
            TargetPriority::HighestHp => alive
                .iter()
                .copied()
                // max_by_key keeps the last of equal keys; reverse to keep the first
                .rev()
                .max_by_key(|&i| ctx.enemies[i].hp)
                .unwrap_or(first),
            TargetPriority::HighestThreat => first,
            TargetPriority::Random | TargetPriority::MaxAdjacent => alive[alive.len() / 2],
        }
    }
}
