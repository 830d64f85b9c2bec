use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::character::CharacterId;
use crate::core::BattleError;

/// What a rule condition measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    SelfHpPercent,
    SelfResourcePercent,
    SelfResource,
    AliveEnemyCount,
    TargetHpPercent,
    LowestEnemyHpPercent,
    HighestEnemyHpPercent,
    AliveAllyCount,
    LowestAllyHpPercent,
    BattleRound,
    SkillReady,
    SkillOnCooldown,
    SelfHasBuff,
    SelfMissingBuff,
    Always,
    /// Unrecognized type; never holds
    Unknown,
}

impl ConditionKind {
    pub fn parse(name: &str) -> Self {
        match name {
            "self_hp_percent" => Self::SelfHpPercent,
            "self_resource_percent" => Self::SelfResourcePercent,
            "self_resource" => Self::SelfResource,
            "alive_enemy_count" => Self::AliveEnemyCount,
            "target_hp_percent" => Self::TargetHpPercent,
            "lowest_enemy_hp_percent" => Self::LowestEnemyHpPercent,
            "highest_enemy_hp_percent" => Self::HighestEnemyHpPercent,
            "alive_ally_count" => Self::AliveAllyCount,
            "lowest_ally_hp_percent" => Self::LowestAllyHpPercent,
            "battle_round" => Self::BattleRound,
            "skill_ready" => Self::SkillReady,
            "skill_on_cooldown" => Self::SkillOnCooldown,
            "self_has_buff" => Self::SelfHasBuff,
            "self_missing_buff" => Self::SelfMissingBuff,
            "always" => Self::Always,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelfHpPercent => "self_hp_percent",
            Self::SelfResourcePercent => "self_resource_percent",
            Self::SelfResource => "self_resource",
            Self::AliveEnemyCount => "alive_enemy_count",
            Self::TargetHpPercent => "target_hp_percent",
            Self::LowestEnemyHpPercent => "lowest_enemy_hp_percent",
            Self::HighestEnemyHpPercent => "highest_enemy_hp_percent",
            Self::AliveAllyCount => "alive_ally_count",
            Self::LowestAllyHpPercent => "lowest_ally_hp_percent",
            Self::BattleRound => "battle_round",
            Self::SkillReady => "skill_ready",
            Self::SkillOnCooldown => "skill_on_cooldown",
            Self::SelfHasBuff => "self_has_buff",
            Self::SelfMissingBuff => "self_missing_buff",
            Self::Always => "always",
            Self::Unknown => "unknown",
        }
    }
}

/// Comparison operator of a numeric condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

impl Operator {
    /// `=` and `==` are both equality.
    pub fn parse(symbol: &str) -> Result<Self, BattleError> {
        match symbol.trim() {
            "<" => Ok(Self::Lt),
            ">" => Ok(Self::Gt),
            "<=" => Ok(Self::Le),
            ">=" => Ok(Self::Ge),
            "=" | "==" => Ok(Self::Eq),
            "!=" => Ok(Self::Ne),
            other => Err(BattleError::InvalidOperator(other.to_string())),
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }

    pub fn compare(&self, current: f64, target: f64) -> bool {
        match self {
            Self::Lt => current < target,
            Self::Gt => current > target,
            Self::Le => current <= target,
            Self::Ge => current >= target,
            Self::Eq => current == target,
            Self::Ne => current != target,
        }
    }
}

/// Wire form of a condition, as stored by the strategy editor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCondition {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buff_id: Option<String>,
}

/// A typed, validated rule condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCondition", into = "RawCondition")]
pub struct RuleCondition {
    pub kind: ConditionKind,
    /// `None` for conditions that do not compare a value
    pub operator: Option<Operator>,
    pub value: f64,
    pub skill_id: Option<String>,
    pub buff_id: Option<String>,
}

impl TryFrom<RawCondition> for RuleCondition {
    type Error = BattleError;

    fn try_from(raw: RawCondition) -> Result<Self, Self::Error> {
        let operator = if raw.operator.trim().is_empty() {
            None
        } else {
            Some(Operator::parse(&raw.operator)?)
        };
        Ok(Self {
            kind: ConditionKind::parse(&raw.kind),
            operator,
            value: raw.value,
            skill_id: raw.skill_id.filter(|s| !s.is_empty()),
            buff_id: raw.buff_id.filter(|s| !s.is_empty()),
        })
    }
}

impl From<RuleCondition> for RawCondition {
    fn from(condition: RuleCondition) -> Self {
        Self {
            kind: condition.kind.as_str().to_string(),
            operator: condition
                .operator
                .map(|op| op.symbol().to_string())
                .unwrap_or_default(),
            value: condition.value,
            skill_id: condition.skill_id,
            buff_id: condition.buff_id,
        }
    }
}

impl RuleCondition {
    pub fn compare(kind: ConditionKind, operator: Operator, value: f64) -> Self {
        Self {
            kind,
            operator: Some(operator),
            value,
            skill_id: None,
            buff_id: None,
        }
    }

    pub fn always() -> Self {
        Self {
            kind: ConditionKind::Always,
            operator: None,
            value: 0.0,
            skill_id: None,
            buff_id: None,
        }
    }

    pub fn skill(kind: ConditionKind, skill_id: impl Into<String>) -> Self {
        Self {
            skill_id: Some(skill_id.into()),
            ..Self::always_of(kind)
        }
    }

    pub fn buff(kind: ConditionKind, buff_id: impl Into<String>) -> Self {
        Self {
            buff_id: Some(buff_id.into()),
            ..Self::always_of(kind)
        }
    }

    fn always_of(kind: ConditionKind) -> Self {
        Self {
            kind,
            ..Self::always()
        }
    }

    /// Low-HP rules may fire even below the resource threshold.
    pub fn is_urgent(&self) -> bool {
        self.kind == ConditionKind::SelfHpPercent && self.operator == Some(Operator::Lt)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawAction {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_id: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

/// What a rule does when its condition holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAction", into = "RawAction")]
pub enum RuleAction {
    UseSkill { skill_id: String, comment: String },
    NormalAttack { comment: String },
}

impl TryFrom<RawAction> for RuleAction {
    type Error = BattleError;

    fn try_from(raw: RawAction) -> Result<Self, Self::Error> {
        match raw.kind.as_str() {
            "use_skill" => match raw.skill_id.filter(|s| !s.is_empty()) {
                Some(skill_id) => Ok(Self::UseSkill {
                    skill_id,
                    comment: raw.comment,
                }),
                None => Err(BattleError::InvalidInput(
                    "use_skill action without a skill_id".into(),
                )),
            },
            "normal_attack" => Ok(Self::NormalAttack {
                comment: raw.comment,
            }),
            other => Err(BattleError::InvalidInput(format!(
                "unknown rule action '{other}'"
            ))),
        }
    }
}

impl From<RuleAction> for RawAction {
    fn from(action: RuleAction) -> Self {
        match action {
            RuleAction::UseSkill { skill_id, comment } => Self {
                kind: "use_skill".into(),
                skill_id: Some(skill_id),
                comment,
            },
            RuleAction::NormalAttack { comment } => Self {
                kind: "normal_attack".into(),
                skill_id: None,
                comment,
            },
        }
    }
}

impl RuleAction {
    pub fn use_skill(skill_id: impl Into<String>) -> Self {
        Self::UseSkill {
            skill_id: skill_id.into(),
            comment: String::new(),
        }
    }

    pub fn skill_id(&self) -> Option<&str> {
        match self {
            Self::UseSkill { skill_id, .. } => Some(skill_id),
            Self::NormalAttack { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalRule {
    pub id: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "enabled")]
    pub enabled: bool,
    pub condition: RuleCondition,
    pub action: RuleAction,
}

fn enabled() -> bool {
    true
}

impl ConditionalRule {
    pub fn new(id: impl Into<String>, priority: i32, condition: RuleCondition, action: RuleAction) -> Self {
        Self {
            id: id.into(),
            priority,
            enabled: true,
            condition,
            action,
        }
    }
}

/// A skill withheld from the priority list until its condition holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservedSkill {
    pub skill_id: String,
    pub condition: RuleCondition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetPriority {
    #[default]
    LowestHp,
    HighestHp,
    /// Placeholder: first living enemy
    HighestThreat,
    /// Placeholder: middle living enemy
    Random,
    /// Placeholder: middle living enemy
    MaxAdjacent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoTargetSettings {
    #[serde(default = "enabled")]
    pub positional_auto_optimize: bool,
    /// Execute-style skills always go to the lowest-HP enemy
    #[serde(default = "enabled")]
    pub execute_auto_target: bool,
    #[serde(default = "enabled")]
    pub heal_auto_target: bool,
}

impl Default for AutoTargetSettings {
    fn default() -> Self {
        Self {
            positional_auto_optimize: true,
            execute_auto_target: true,
            heal_auto_target: true,
        }
    }
}

/// A character's configured decision policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleStrategy {
    pub character_id: CharacterId,
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub skill_priority: Vec<String>,
    #[serde(default)]
    pub conditional_rules: Vec<ConditionalRule>,
    #[serde(default)]
    pub target_priority: TargetPriority,
    #[serde(default)]
    pub skill_target_overrides: HashMap<String, TargetPriority>,
    /// Resource percent under which only urgent rules may fire
    #[serde(default)]
    pub resource_threshold: f64,
    #[serde(default)]
    pub reserved_skills: Vec<ReservedSkill>,
    #[serde(default)]
    pub auto_target_settings: AutoTargetSettings,
}

impl BattleStrategy {
    fn blank(character_id: CharacterId, name: impl Into<String>) -> Self {
        Self {
            character_id,
            name: name.into(),
            is_active: false,
            skill_priority: Vec::new(),
            conditional_rules: Vec::new(),
            target_priority: TargetPriority::LowestHp,
            skill_target_overrides: HashMap::new(),
            resource_threshold: 0.0,
            reserved_skills: Vec::new(),
            auto_target_settings: AutoTargetSettings::default(),
        }
    }

    /// Starter strategy: shield wall under 30% HP, lowest-HP targeting.
    pub fn default_for(character_id: CharacterId, name: impl Into<String>) -> Self {
        Self {
            conditional_rules: vec![ConditionalRule::new(
                "rule_1",
                1,
                RuleCondition::compare(ConditionKind::SelfHpPercent, Operator::Lt, 30.0),
                RuleAction::use_skill("shield_wall"),
            )],
            resource_threshold: 20.0,
            ..Self::blank(character_id, name)
        }
    }

    /// Named presets offered to players.
    pub fn templates(character_id: CharacterId) -> Vec<(&'static str, BattleStrategy)> {
        use ConditionKind::*;
        use Operator::*;

        let rule = |id: &str, priority, condition, action| {
            ConditionalRule::new(id, priority, condition, action)
        };

        vec![
            (
                "aggressive",
                Self {
                    resource_threshold: 10.0,
                    conditional_rules: vec![
                        rule("rule_1", 1, RuleCondition::compare(AliveEnemyCount, Ge, 3.0), RuleAction::use_skill("whirlwind")),
                        rule("rule_2", 2, RuleCondition::compare(TargetHpPercent, Lt, 20.0), RuleAction::use_skill("execute")),
                    ],
                    ..Self::blank(character_id, "Aggressive")
                },
            ),
            (
                "defensive",
                Self {
                    resource_threshold: 20.0,
                    conditional_rules: vec![
                        rule("rule_1", 1, RuleCondition::compare(SelfHpPercent, Lt, 20.0), RuleAction::use_skill("last_stand")),
                        rule("rule_2", 2, RuleCondition::compare(SelfHpPercent, Lt, 30.0), RuleAction::use_skill("shield_wall")),
                        rule("rule_3", 3, RuleCondition::compare(AliveEnemyCount, Ge, 3.0), RuleAction::use_skill("whirlwind")),
                        rule("rule_4", 4, RuleCondition::compare(TargetHpPercent, Lt, 20.0), RuleAction::use_skill("execute")),
                        rule(
                            "rule_5",
                            5,
                            RuleCondition::compare(TargetHpPercent, Lt, 10.0),
                            RuleAction::NormalAttack {
                                comment: "finish low targets without spending".into(),
                            },
                        ),
                    ],
                    ..Self::blank(character_id, "Defensive")
                },
            ),
            (
                "aoe",
                Self {
                    resource_threshold: 15.0,
                    target_priority: TargetPriority::HighestHp,
                    conditional_rules: vec![
                        rule("rule_1", 1, RuleCondition::compare(SelfHpPercent, Lt, 30.0), RuleAction::use_skill("shield_wall")),
                        rule("rule_2", 2, RuleCondition::compare(AliveEnemyCount, Ge, 3.0), RuleAction::use_skill("whirlwind")),
                        rule("rule_3", 3, RuleCondition::compare(AliveEnemyCount, Ge, 2.0), RuleAction::use_skill("cleave")),
                    ],
                    ..Self::blank(character_id, "Area Clear")
                },
            ),
        ]
    }

    pub fn target_priority_for(&self, skill_id: Option<&str>) -> TargetPriority {
        skill_id
            .and_then(|id| self.skill_target_overrides.get(id))
            .copied()
            .unwrap_or(self.target_priority)
    }
}
