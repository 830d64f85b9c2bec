//! Combat math shared by every turn pipeline.
//!
//! These are pure, total functions: bad input is clamped rather than
//! rejected, because they sit on the per-tick hot path. Missing combatants
//! produce the safe minimums (1 damage, 0 healing, speed 10).

use rand::Rng;

use super::types::{Combatant, DamageResult, DamageType, HealingResult};
use crate::core::constants::*;

/// Resolve one hit from `attacker` against `defender`.
///
/// # Arguments
/// * `base_attack` - Attack stat the hit scales from (negative clamps to 0)
/// * `multiplier` - Skill or weapon multiplier (negative clamps to 0)
/// * `damage_type` - Physical hits use physical defense and can be dodged;
///   every other school uses magic defense and cannot
/// * `ignore_dodge` - Skip the dodge roll even for physical hits
///
/// # Returns
/// DamageResult whose `final_damage` is at least 1 unless dodged
pub fn calculate_damage(
    attacker: Option<&dyn Combatant>,
    defender: Option<&dyn Combatant>,
    base_attack: i32,
    multiplier: f64,
    damage_type: DamageType,
    ignore_dodge: bool,
    rng: &mut impl Rng,
) -> DamageResult {
    calculate_damage_with_crit_bonus(
        attacker,
        defender,
        base_attack,
        multiplier,
        damage_type,
        ignore_dodge,
        0.0,
        rng,
    )
}

/// [`calculate_damage`] with extra crit chance (e.g. from buffs) added to
/// the attacker's rate before clamping.
#[allow(clippy::too_many_arguments)]
pub fn calculate_damage_with_crit_bonus(
    attacker: Option<&dyn Combatant>,
    defender: Option<&dyn Combatant>,
    base_attack: i32,
    multiplier: f64,
    damage_type: DamageType,
    ignore_dodge: bool,
    crit_bonus: f64,
    rng: &mut impl Rng,
) -> DamageResult {
    let (Some(attacker), Some(defender)) = (attacker, defender) else {
        return DamageResult::minimum();
    };

    let base_attack = base_attack.max(0);
    let multiplier = if multiplier.is_finite() {
        multiplier.max(0.0)
    } else {
        0.0
    };

    let base_damage = base_attack as f64 * multiplier;
    let defense = defender.defense_against(damage_type).max(0);
    let damage_after_defense = (base_damage - defense as f64).max(MIN_DAMAGE as f64);

    let is_crit = should_crit(attacker.crit_rate(damage_type) + crit_bonus, rng);
    let mut damage = damage_after_defense;
    if is_crit {
        damage *= attacker.crit_damage(damage_type).max(1.0);
    }

    let is_dodged =
        damage_type.is_physical() && !ignore_dodge && should_dodge(defender.dodge_rate(), rng);

    let final_damage = if is_dodged {
        0
    } else {
        (damage.round() as i32).max(MIN_DAMAGE)
    };

    DamageResult {
        base_damage,
        defense,
        damage_after_defense,
        is_crit,
        is_dodged,
        final_damage,
    }
}

/// Resolve a heal on `target`.
///
/// base = round(amount × multiplier × (1 + bonus%)); the part that would
/// exceed max HP is reported as overhealing.
pub fn calculate_healing(
    target: Option<&dyn Combatant>,
    base_amount: i32,
    multiplier: f64,
    bonus_percent: f64,
) -> HealingResult {
    let Some(target) = target else {
        return HealingResult::default();
    };

    let amount = base_amount.max(0) as f64;
    let multiplier = multiplier.max(0.0);
    let bonus = (1.0 + bonus_percent / 100.0).max(0.0);
    let base_healing = (amount * multiplier * bonus).round() as i32;

    // A target above its max has nothing left to heal.
    let max_healable = (target.max_hp() - target.hp().max(0)).max(0);
    let actual_healing = base_healing.min(max_healable);

    HealingResult {
        base_healing,
        actual_healing,
        overhealing: base_healing - actual_healing,
    }
}

/// Roll for a critical hit with the rate clamped to [0, 0.5].
pub fn should_crit(crit_rate: f64, rng: &mut impl Rng) -> bool {
    roll_clamped(crit_rate, MAX_CRIT_RATE, rng)
}

/// Roll for a dodge with the rate clamped to [0, 0.5].
pub fn should_dodge(dodge_rate: f64, rng: &mut impl Rng) -> bool {
    roll_clamped(dodge_rate, MAX_DODGE_RATE, rng)
}

pub fn clamp_rate(rate: f64, cap: f64) -> f64 {
    if rate.is_nan() {
        return 0.0;
    }
    rate.clamp(0.0, cap)
}

fn roll_clamped(rate: f64, cap: f64, rng: &mut impl Rng) -> bool {
    let rate = clamp_rate(rate, cap);
    rate > 0.0 && rng.gen::<f64>() < rate
}

/// Turn-order speed: agility for characters, configured speed for monsters.
pub fn calculate_speed(combatant: Option<&dyn Combatant>) -> i32 {
    match combatant {
        Some(c) => c.speed().max(1),
        None => DEFAULT_SPEED,
    }
}
