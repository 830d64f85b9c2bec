use serde::{Deserialize, Serialize};
use std::fmt;

use crate::character::Character;
use crate::core::constants::DEFAULT_SPEED;
use crate::monsters::Monster;

/// School of an incoming hit. Everything except `Physical` is mitigated by
/// magic defense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    #[default]
    Physical,
    Magic,
    Fire,
    Frost,
    Shadow,
    Holy,
    Nature,
}

impl DamageType {
    /// Lenient parse; unknown names fall back to physical.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "magic" => DamageType::Magic,
            "fire" => DamageType::Fire,
            "frost" => DamageType::Frost,
            "shadow" => DamageType::Shadow,
            "holy" => DamageType::Holy,
            "nature" => DamageType::Nature,
            _ => DamageType::Physical,
        }
    }

    pub fn is_physical(&self) -> bool {
        matches!(self, DamageType::Physical)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DamageType::Physical => "physical",
            DamageType::Magic => "magic",
            DamageType::Fire => "fire",
            DamageType::Frost => "frost",
            DamageType::Shadow => "shadow",
            DamageType::Holy => "holy",
            DamageType::Nature => "nature",
        }
    }
}

impl fmt::Display for DamageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only combat view shared by characters and monsters.
pub trait Combatant {
    fn hp(&self) -> i32;
    fn max_hp(&self) -> i32;
    fn physical_defense(&self) -> i32;
    fn magic_defense(&self) -> i32;
    /// Crit chance for hits of the given school, unclamped.
    fn crit_rate(&self, damage_type: DamageType) -> f64;
    fn crit_damage(&self, damage_type: DamageType) -> f64;
    fn dodge_rate(&self) -> f64;
    fn speed(&self) -> i32;

    fn defense_against(&self, damage_type: DamageType) -> i32 {
        if damage_type.is_physical() {
            self.physical_defense()
        } else {
            self.magic_defense()
        }
    }
}

impl Combatant for Character {
    fn hp(&self) -> i32 {
        self.hp
    }

    fn max_hp(&self) -> i32 {
        self.max_hp
    }

    fn physical_defense(&self) -> i32 {
        self.physical_defense
    }

    fn magic_defense(&self) -> i32 {
        self.magic_defense
    }

    fn crit_rate(&self, damage_type: DamageType) -> f64 {
        if damage_type.is_physical() {
            self.phys_crit_rate
        } else {
            self.spell_crit_rate
        }
    }

    fn crit_damage(&self, damage_type: DamageType) -> f64 {
        if damage_type.is_physical() {
            self.phys_crit_damage
        } else {
            self.spell_crit_damage
        }
    }

    fn dodge_rate(&self) -> f64 {
        self.dodge_rate
    }

    fn speed(&self) -> i32 {
        self.agility.max(1)
    }
}

impl Combatant for Monster {
    fn hp(&self) -> i32 {
        self.hp
    }

    fn max_hp(&self) -> i32 {
        self.max_hp
    }

    fn physical_defense(&self) -> i32 {
        self.physical_defense
    }

    fn magic_defense(&self) -> i32 {
        self.magic_defense
    }

    fn crit_rate(&self, _damage_type: DamageType) -> f64 {
        self.crit_rate
    }

    fn crit_damage(&self, _damage_type: DamageType) -> f64 {
        self.crit_damage
    }

    fn dodge_rate(&self) -> f64 {
        self.dodge_rate
    }

    fn speed(&self) -> i32 {
        if self.speed > 0 {
            self.speed
        } else {
            DEFAULT_SPEED
        }
    }
}

/// Breakdown of a resolved hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageResult {
    /// baseAttack × multiplier
    pub base_damage: f64,
    /// Defense that was subtracted
    pub defense: i32,
    /// Damage after defense, before crit (minimum 1)
    pub damage_after_defense: f64,
    pub is_crit: bool,
    pub is_dodged: bool,
    /// Rounded damage to apply; 0 only when dodged
    pub final_damage: i32,
}

impl DamageResult {
    pub(crate) fn minimum() -> Self {
        Self {
            base_damage: 0.0,
            defense: 0,
            damage_after_defense: 1.0,
            is_crit: false,
            is_dodged: false,
            final_damage: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HealingResult {
    pub base_healing: i32,
    pub actual_healing: i32,
    pub overhealing: i32,
}
