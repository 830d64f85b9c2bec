use super::types::{Character, ResourceType};
use crate::core::constants::*;

/// Combat stats derived from a character's core attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedStats {
    pub max_hp: i32,
    pub max_mana: i32,
    pub physical_attack: i32,
    pub magic_attack: i32,
    pub phys_crit_rate: f64,
    pub phys_crit_damage: f64,
    pub dodge_rate: f64,
    pub mana_regen: i32,
}

impl DerivedStats {
    /// Calculates derived stats from core attributes and class base pools.
    pub fn calculate_derived_stats(character: &Character, base_hp: i32, base_mana: i32) -> Self {
        Self {
            max_hp: max_hp(base_hp, character.stamina),
            max_mana: max_mana(base_mana, character.spirit),
            physical_attack: physical_attack(character.strength, character.agility),
            magic_attack: magic_attack(character.intellect, character.spirit),
            phys_crit_rate: agility_rate(character.agility),
            phys_crit_damage: phys_crit_damage(character.strength),
            dodge_rate: agility_rate(character.agility),
            mana_regen: mana_regen(0, character.spirit),
        }
    }
}

/// Physical Attack = round(STR × 0.4 + AGI × 0.2), minimum 1
pub fn physical_attack(strength: i32, agility: i32) -> i32 {
    let raw = strength.max(0) as f64 * PHYS_ATTACK_PER_STRENGTH
        + agility.max(0) as f64 * PHYS_ATTACK_PER_AGILITY;
    (raw.round() as i32).max(1)
}

/// Magic Attack = round(INT × 1.0 + SPI × 0.2)
pub fn magic_attack(intellect: i32, spirit: i32) -> i32 {
    let raw = intellect.max(0) as f64 * MAGIC_ATTACK_PER_INTELLECT
        + spirit.max(0) as f64 * MAGIC_ATTACK_PER_SPIRIT;
    raw.round() as i32
}

pub fn max_hp(base_hp: i32, stamina: i32) -> i32 {
    (base_hp + stamina.max(0) * HP_PER_STAMINA).max(1)
}

pub fn max_mana(base_mana: i32, spirit: i32) -> i32 {
    (base_mana + spirit.max(0) * MANA_PER_SPIRIT).max(0)
}

/// Crit and dodge share one curve: 5% + 1% per 20 agility, capped at 50%.
pub fn agility_rate(agility: i32) -> f64 {
    let rate = BASE_CRIT_RATE + agility.max(0) as f64 / AGILITY_PER_CRIT_PERCENT / 100.0;
    rate.min(MAX_CRIT_RATE)
}

pub fn phys_crit_damage(strength: i32) -> f64 {
    BASE_CRIT_DAMAGE + strength.max(0) as f64 * CRIT_DAMAGE_PER_STRENGTH
}

pub fn mana_regen(base_regen: i32, spirit: i32) -> i32 {
    base_regen + (spirit.max(0) as f64 * MANA_REGEN_PER_SPIRIT).round() as i32
}

/// Rage gain after a percentage bonus, rounded.
pub fn rage_gain(base: i32, bonus_percent: f64) -> i32 {
    (base as f64 * (1.0 + bonus_percent / 100.0)).round() as i32
}

/// Rewrites a character's derived fields from its core attributes.
///
/// Rage pools are left alone since their size is fixed by configuration.
pub fn recalculate_derived(character: &mut Character, base_hp: i32, base_mana: i32) {
    let derived = DerivedStats::calculate_derived_stats(character, base_hp, base_mana);
    character.max_hp = derived.max_hp;
    character.hp = character.hp.min(character.max_hp);
    character.physical_attack = derived.physical_attack;
    character.magic_attack = derived.magic_attack;
    character.phys_crit_rate = derived.phys_crit_rate;
    character.phys_crit_damage = derived.phys_crit_damage;
    character.dodge_rate = derived.dodge_rate;
    if character.resource_type == ResourceType::Mana {
        character.max_resource = derived.max_mana;
        character.resource = character.resource.min(character.max_resource);
    }
}
