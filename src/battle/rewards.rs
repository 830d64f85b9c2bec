use rand::Rng;

use crate::character::Character;
use crate::core::constants::{LEVEL_UP_HP_GAIN, LEVEL_UP_MANA_GAIN, LEVEL_UP_STAT_GAIN};
use crate::monsters::Monster;
use crate::zones::Zone;

/// Exp and gold for one kill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KillReward {
    pub exp: i64,
    pub gold: i64,
}

/// Exp is the monster's flat reward, gold a uniform roll in
/// [gold_min, gold_max]; both scaled by the zone multipliers when a zone
/// is known.
pub fn roll_kill_reward(monster: &Monster, zone: Option<&Zone>, rng: &mut impl Rng) -> KillReward {
    let gold_min = monster.gold_min.max(0);
    let gold_max = monster.gold_max.max(gold_min);
    let mut exp = monster.exp_reward.max(0);
    let mut gold = rng.gen_range(gold_min..=gold_max);

    if let Some(zone) = zone {
        exp = (exp as f64 * zone.exp_multiplier()) as i64;
        gold = (gold as f64 * zone.gold_multiplier()) as i64;
    }
    KillReward { exp, gold }
}

/// Add exp and resolve every level-up it pays for. Surplus exp carries
/// over; each level multiplies the next threshold by `curve`. Returns the
/// number of levels gained.
pub fn apply_exp(character: &mut Character, exp: i64, curve: f64) -> u32 {
    character.exp += exp.max(0);
    let mut gained = 0;
    while character.exp_to_next > 0 && character.exp >= character.exp_to_next {
        character.exp -= character.exp_to_next;
        character.exp_to_next = ((character.exp_to_next as f64 * curve) as i64).max(1);
        level_up(character);
        gained += 1;
    }
    gained
}

/// One level: primary stats, HP and non-rage resource pools grow, then
/// refill. Rage keeps its current value.
pub fn level_up(character: &mut Character) {
    character.level += 1;

    character.strength += LEVEL_UP_STAT_GAIN;
    character.agility += LEVEL_UP_STAT_GAIN;
    character.intellect += LEVEL_UP_STAT_GAIN;
    character.stamina += LEVEL_UP_STAT_GAIN;
    character.spirit += LEVEL_UP_STAT_GAIN;
    character.physical_attack += LEVEL_UP_STAT_GAIN;
    character.magic_attack += LEVEL_UP_STAT_GAIN;
    character.physical_defense += LEVEL_UP_STAT_GAIN;
    character.magic_defense += LEVEL_UP_STAT_GAIN;

    character.max_hp += LEVEL_UP_HP_GAIN;
    character.hp = character.max_hp;
    if !character.resource_type.is_rage() {
        character.max_resource += LEVEL_UP_MANA_GAIN;
        character.resource = character.max_resource;
    }
}
