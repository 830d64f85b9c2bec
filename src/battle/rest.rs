//! Out-of-combat recovery between fights.
//!
//! Rest length is proportional to the largest missing share of HP or
//! (non-rage) resource across the party. Progress is computed from elapsed
//! wall-clock time whenever the session is ticked; nothing advances between
//! calls.

use crate::character::Character;
use crate::core::constants::REVIVE_HP_FRACTION;
use crate::core::EngineConfig;

/// Largest missing percentage (0-100) of HP or non-rage resource.
pub fn missing_percent(character: &Character) -> f64 {
    let hp_missing = if character.max_hp > 0 {
        (character.max_hp - character.hp.max(0)).max(0) as f64 / character.max_hp as f64 * 100.0
    } else {
        0.0
    };
    let resource_missing = if !character.resource_type.is_rage() && character.max_resource > 0 {
        (character.max_resource - character.resource).max(0) as f64
            / character.max_resource as f64
            * 100.0
    } else {
        0.0
    };
    hp_missing.max(resource_missing)
}

/// Seconds one character needs to recover; 0 when nothing is missing.
pub fn rest_seconds(character: &Character, config: &EngineConfig) -> f64 {
    let missing = missing_percent(character);
    if missing <= 0.0 {
        return 0.0;
    }
    (missing * config.rest_seconds_per_percent).max(config.min_rest_seconds)
}

/// Rest window for the whole party: the slowest member decides.
pub fn party_rest_seconds(characters: &[Character], config: &EngineConfig) -> f64 {
    characters
        .iter()
        .map(|c| rest_seconds(c, config))
        .fold(0.0, f64::max)
}

pub fn is_fully_recovered(character: &Character) -> bool {
    !character.is_dead && missing_percent(character) <= 0.0
}

/// Regenerate `elapsed_seconds` worth of HP and non-rage resource. Dead
/// characters wait for the end of the window. Anything missing regains at
/// least one point.
pub fn regenerate(character: &mut Character, elapsed_seconds: f64, config: &EngineConfig) {
    if character.is_dead || elapsed_seconds <= 0.0 {
        return;
    }
    let share = config.rest_regen_percent_per_second / 100.0 * elapsed_seconds;

    if character.hp < character.max_hp {
        let amount = ((character.max_hp as f64 * share) as i32).max(1);
        character.heal(amount);
    }
    if !character.resource_type.is_rage() && character.resource < character.max_resource {
        let amount = ((character.max_resource as f64 * share) as i32).max(1);
        character.gain_resource(amount);
    }
}

/// Window elapsed: the living fill up, the dead return at half HP.
pub fn finish_rest(character: &mut Character) {
    if character.is_dead || character.hp <= 0 {
        revive(character);
    } else {
        character.hp = character.max_hp;
    }
    if !character.resource_type.is_rage() {
        character.resource = character.max_resource;
    }
}

pub fn revive(character: &mut Character) {
    character.is_dead = false;
    character.hp = ((character.max_hp as f64 * REVIVE_HP_FRACTION) as i32).max(1);
}
