use serde::{Deserialize, Serialize};

/// Stat a `stat_mod` passive modifies. Compound variants cover passives
/// that touch several stats at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassiveStat {
    Attack,
    Defense,
    Damage,
    /// Percent of max HP granted as a shield at the start of each battle
    Hp,
    Threat,
    /// Percent reduction of non-physical damage taken
    Resistance,
    /// Crit chance in percent points, any school
    CritRate,
    PhysCritRate,
    SpellCritRate,
    /// Dodge chance in percent points
    DodgeRate,
    ThreatAndDefense,
    HpDefenseResistance,
}

impl PassiveStat {
    /// Whether a passive declared on `self` modifies `stat`.
    pub fn affects(&self, stat: PassiveStat) -> bool {
        match self {
            PassiveStat::ThreatAndDefense => {
                matches!(stat, PassiveStat::Threat | PassiveStat::Defense)
            }
            PassiveStat::HpDefenseResistance => matches!(
                stat,
                PassiveStat::Hp | PassiveStat::Defense | PassiveStat::Resistance
            ),
            other => *other == stat,
        }
    }
}

/// When and how a passive contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassiveKind {
    /// Percent modifier to a stat, read by damage formulas
    StatMod,
    /// Percent bonus on rage generated
    RageGeneration,
    /// Heal value% of max HP on every landed hit
    OnHitHeal,
    OnHitResource,
    /// Heal value% of the crit's damage
    OnCritHeal,
    OnCritResource,
    /// Heal value% of max HP on a kill
    OnKillHeal,
    OnKillResource,
    OnSkillUseResource,
    /// value% chance to strike back when hit
    CounterAttack,
    /// Return value% of damage taken
    Reflect,
    /// Attack bonus below an HP threshold (both scale with level)
    LowHpFrenzy,
    /// Damage reduction below an HP threshold (both scale with level)
    LowHpDamageReduction,
    /// Survive one lethal hit per battle at 1 HP
    Survival,
}

/// Static passive definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassiveDefinition {
    pub id: String,
    pub name: String,
    pub kind: PassiveKind,
    #[serde(default)]
    pub stat: Option<PassiveStat>,
    pub base_value: f64,
    #[serde(default)]
    pub level_scaling: f64,
}

impl PassiveDefinition {
    /// value = base + (level - 1) × scaling
    pub fn value_at(&self, level: u32) -> f64 {
        self.base_value + level.saturating_sub(1) as f64 * self.level_scaling
    }
}

/// An unlocked passive with its value precomputed for the learned level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterPassiveState {
    pub passive_id: String,
    pub level: u32,
    pub definition: PassiveDefinition,
    pub value: f64,
}

impl CharacterPassiveState {
    pub fn new(definition: PassiveDefinition, level: u32) -> Self {
        let level = level.max(1);
        Self {
            passive_id: definition.id.clone(),
            level,
            value: definition.value_at(level),
            definition,
        }
    }

    pub fn kind(&self) -> PassiveKind {
        self.definition.kind
    }
}
