use serde::{Deserialize, Serialize};

use crate::combat::DamageType;

/// Stat or mechanic a timed effect modifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuffStat {
    /// Percent attack bonus
    Attack,
    /// Percent defense change (debuffs reduce the target's defense)
    Defense,
    /// Percent change to all incoming damage; negative reduces
    DamageTaken,
    /// Percent change to incoming physical damage; negative reduces
    PhysicalDamageTaken,
    /// Flat crit chance in percent points
    CritRate,
    /// Absorb pool; value is remaining absorb
    Shield,
    /// Percent of damage taken returned to the attacker
    Reflect,
    /// Percent of physical attack dealt back when hit
    CounterAttack,
    /// Percent reduction of incoming healing
    HealingReceived,
    /// Skips the holder's turn
    Stun,
    CcImmune,
    /// Periodic damage
    Dot,
    /// Periodic healing
    Hot,
}

/// Policy applied when an effect id is applied to an entity that already
/// holds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackPolicy {
    /// Keep the longer duration and the existing value
    Refresh,
    /// Reset duration to the new application and sum the values
    Stack,
    /// Drop the old instance entirely
    Replace,
}

impl StackPolicy {
    /// Resolves the policy for an effect id. Unknown ids refresh.
    pub fn for_effect(effect_id: &str) -> Self {
        match effect_id {
            "dot_poison" | "dot_bleed" | "hot_regen" => StackPolicy::Stack,
            "demoralizing_shout" | "sunder_armor" => StackPolicy::Replace,
            _ => StackPolicy::Refresh,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodicKind {
    Damage,
    Heal,
}

/// Interval bookkeeping for DOT/HOT effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Periodic {
    pub kind: PeriodicKind,
    /// Rounds between firings; 0 fires every round
    pub interval: u32,
    /// Round of the last firing (0 = never fired)
    pub last_tick: u32,
}

/// A live timed effect on one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuffInstance {
    pub effect_id: String,
    pub name: String,
    pub is_buff: bool,
    /// Remaining duration in rounds
    pub duration: u32,
    pub value: f64,
    pub stat: BuffStat,
    pub damage_type: Option<DamageType>,
    pub periodic: Option<Periodic>,
}

impl BuffInstance {
    pub fn is_dot(&self) -> bool {
        matches!(
            self.periodic,
            Some(Periodic {
                kind: PeriodicKind::Damage,
                ..
            })
        )
    }

    pub fn is_hot(&self) -> bool {
        matches!(
            self.periodic,
            Some(Periodic {
                kind: PeriodicKind::Heal,
                ..
            })
        )
    }
}

/// Description of an effect to apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuffSpec {
    pub effect_id: String,
    pub name: String,
    pub is_buff: bool,
    pub duration: u32,
    pub value: f64,
    pub stat: BuffStat,
    #[serde(default)]
    pub damage_type: Option<DamageType>,
    #[serde(default)]
    pub periodic: Option<(PeriodicKind, u32)>,
}

impl BuffSpec {
    pub fn buff(
        effect_id: impl Into<String>,
        name: impl Into<String>,
        stat: BuffStat,
        value: f64,
        duration: u32,
    ) -> Self {
        Self {
            effect_id: effect_id.into(),
            name: name.into(),
            is_buff: true,
            duration,
            value,
            stat,
            damage_type: None,
            periodic: None,
        }
    }

    pub fn debuff(
        effect_id: impl Into<String>,
        name: impl Into<String>,
        stat: BuffStat,
        value: f64,
        duration: u32,
    ) -> Self {
        Self {
            is_buff: false,
            ..Self::buff(effect_id, name, stat, value, duration)
        }
    }

    pub fn dot(
        effect_id: impl Into<String>,
        name: impl Into<String>,
        damage_per_tick: f64,
        duration: u32,
        interval: u32,
        damage_type: DamageType,
    ) -> Self {
        Self {
            damage_type: Some(damage_type),
            periodic: Some((PeriodicKind::Damage, interval)),
            ..Self::debuff(effect_id, name, BuffStat::Dot, damage_per_tick, duration)
        }
    }

    pub fn hot(
        effect_id: impl Into<String>,
        name: impl Into<String>,
        heal_per_tick: f64,
        duration: u32,
        interval: u32,
    ) -> Self {
        Self {
            periodic: Some((PeriodicKind::Heal, interval)),
            ..Self::buff(effect_id, name, BuffStat::Hot, heal_per_tick, duration)
        }
    }

    pub(crate) fn into_instance(self) -> BuffInstance {
        BuffInstance {
            effect_id: self.effect_id,
            name: self.name,
            is_buff: self.is_buff,
            duration: self.duration,
            value: self.value,
            stat: self.stat,
            damage_type: self.damage_type,
            periodic: self.periodic.map(|(kind, interval)| Periodic {
                kind,
                interval,
                last_tick: 0,
            }),
        }
    }
}

/// An effect removed by a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiredBuff {
    pub effect_id: String,
    pub name: String,
}

/// Sum of periodic effects that fired in one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PeriodicTotals {
    pub damage: i32,
    pub healing: i32,
}
