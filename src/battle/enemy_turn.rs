//! A monster's turn and the incoming-hit pipeline on the character side:
//! buff and passive mitigation, shields, survival, rage, counters and
//! reflects.

use rand::Rng;
use tracing::debug;

use super::manager::BattleManager;
use super::session::{BattleSession, LogKind};
use crate::buffs::{BuffSpec, BuffStat};
use crate::character::{rage_gain, Character, CharacterId};
use crate::combat::{calculate_damage, Combatant, DamageType};
use crate::core::constants::{
    LAST_STAND_HP_THRESHOLD_BASE, LAST_STAND_HP_THRESHOLD_STEP, LAST_STAND_REDUCTION_BASE,
    LAST_STAND_REDUCTION_STEP, MIN_DAMAGE, MONSTER_GUARD_DURATION, REVENGE_DAMAGE_BASE,
    REVENGE_DAMAGE_STEP,
};
use crate::monsters::{MonsterAI, MonsterSkillType};
use crate::passives::{PassiveKind, PassiveStat};
use crate::skills::effective_attack;

impl BattleManager {
    pub(super) fn enemy_turn(
        &self,
        session: &mut BattleSession,
        characters: &mut [Character],
        enemy_id: &str,
    ) {
        let Some(ei) = session.enemy_index(enemy_id) else {
            return;
        };

        let periodic = self.buffs.process_enemy_dot_effects(enemy_id, session.round);
        if periodic.healing > 0 {
            session.enemies[ei].heal(periodic.healing);
        }
        if periodic.damage > 0 {
            let dealt = session.enemies[ei].take_damage(periodic.damage);
            session.add_log(
                LogKind::Combat,
                format!(
                    "{} suffers {} periodic damage",
                    session.enemies[ei].name, dealt
                ),
            );
            if !session.enemies[ei].is_alive() {
                // Credit the kill to whoever the monster hated most.
                let killer = session
                    .threat
                    .top(enemy_id)
                    .and_then(|id| characters.iter().position(|c| c.id == id && c.is_alive()))
                    .or_else(|| characters.iter().position(|c| c.is_alive()));
                if let Some(killer) = killer {
                    self.enemy_killed(session, characters, killer, ei);
                }
                return;
            }
        }

        let ai = MonsterAI::new(&session.enemies[ei]);
        if self.buffs.is_enemy_stunned(enemy_id) {
            session.add_log(
                LogKind::Combat,
                format!("{} is stunned and cannot act", session.enemies[ei].name),
            );
            self.end_enemy_turn(session, ei, &ai);
            return;
        }

        let Some(ti) = ai.select_target(characters, session.threat.get(enemy_id), &mut session.rng)
        else {
            return;
        };
        let choice = ai
            .select_skill(&session.enemies[ei], Some(&characters[ti]))
            .map(|index| (index, session.enemies[ei].skills[index].clone()));
        debug!(
            enemy = %session.enemies[ei].name,
            target = characters[ti].id,
            skill = choice.as_ref().map(|(_, s)| s.skill.id.as_str()).unwrap_or("attack"),
            "monster decision"
        );

        match choice {
            Some((index, skill)) => {
                ai.use_skill(&mut session.enemies[ei], index);
                let base_value = skill.skill.base_value;
                match skill.skill_type {
                    MonsterSkillType::Heal => {
                        let enemy = &session.enemies[ei];
                        let mut amount = enemy.max_hp as f64 * base_value / 100.0;
                        let healing_mod =
                            self.buffs.get_enemy_debuff_value(enemy_id, BuffStat::HealingReceived);
                        if healing_mod < 0.0 {
                            amount *= (1.0 + healing_mod / 100.0).max(0.0);
                        }
                        let healed = session.enemies[ei].heal((amount.round() as i32).max(1));
                        session.add_log(
                            LogKind::Heal,
                            format!(
                                "{} uses {} and recovers {} HP",
                                session.enemies[ei].name, skill.skill.name, healed
                            ),
                        );
                    }
                    MonsterSkillType::Defense => {
                        // Refreshes on reuse, so the bonus never compounds.
                        self.buffs.apply_enemy_buff(
                            enemy_id,
                            BuffSpec::buff(
                                format!("{}_guard", skill.skill.id),
                                skill.skill.name.clone(),
                                BuffStat::Defense,
                                base_value,
                                MONSTER_GUARD_DURATION,
                            ),
                        );
                        session.add_log(
                            LogKind::Buff,
                            format!(
                                "{} uses {} and hardens its defenses",
                                session.enemies[ei].name, skill.skill.name
                            ),
                        );
                    }
                    kind => {
                        self.monster_attack(
                            session,
                            characters,
                            ei,
                            ti,
                            1.0 + base_value / 100.0,
                            skill.skill.damage_type,
                            Some(skill.skill.name.as_str()),
                        );
                        let target_id = characters[ti].id;
                        if kind == MonsterSkillType::Control
                            && characters[ti].is_alive()
                            && !self.buffs.has_buff_stat(target_id, BuffStat::CcImmune)
                        {
                            self.buffs.apply_buff(
                                target_id,
                                BuffSpec::debuff(
                                    format!("{}_stun", skill.skill.id),
                                    "Stunned",
                                    BuffStat::Stun,
                                    1.0,
                                    1,
                                ),
                            );
                            session.stats.record_cc_received(target_id);
                            session.add_log(
                                LogKind::Buff,
                                format!("{} is stunned", characters[ti].name),
                            );
                        }
                    }
                }
            }
            None => {
                let damage_type = session.enemies[ei].attack_type;
                self.monster_attack(session, characters, ei, ti, 1.0, damage_type, None);
            }
        }

        self.end_enemy_turn(session, ei, &ai);
    }

    #[allow(clippy::too_many_arguments)]
    fn monster_attack(
        &self,
        session: &mut BattleSession,
        characters: &mut [Character],
        ei: usize,
        ti: usize,
        multiplier: f64,
        damage_type: DamageType,
        skill_name: Option<&str>,
    ) {
        let enemy = &session.enemies[ei];
        let mut attack = enemy.attack_for(damage_type) as f64;
        let attack_mod = self.buffs.get_enemy_debuff_value(&enemy.id, BuffStat::Attack);
        if attack_mod != 0.0 {
            attack *= (1.0 + attack_mod / 100.0).max(0.0);
        }

        let defender = self.fortified_view(&characters[ti]);
        let result = calculate_damage(
            Some(enemy as &dyn Combatant),
            Some(&defender as &dyn Combatant),
            attack.round() as i32,
            multiplier,
            damage_type,
            false,
            &mut session.rng,
        );

        let action = match skill_name {
            Some(name) => format!("{}'s {}", session.enemies[ei].name, name),
            None => format!("{}'s attack", session.enemies[ei].name),
        };
        if result.is_dodged {
            session.stats.record_dodge(characters[ti].id);
            session.add_log(
                LogKind::Combat,
                format!("{} dodges {}", characters[ti].name, action),
            );
            return;
        }

        self.receive_hit(
            session,
            characters,
            ti,
            ei,
            result.final_damage,
            damage_type,
            result.is_crit,
            &action,
        );
    }

    /// Mitigation, damage and every retaliation for one landed hit.
    #[allow(clippy::too_many_arguments)]
    fn receive_hit(
        &self,
        session: &mut BattleSession,
        characters: &mut [Character],
        ti: usize,
        ei: usize,
        raw_damage: i32,
        damage_type: DamageType,
        is_crit: bool,
        action: &str,
    ) {
        let character_id = characters[ti].id;
        let mut damage = self.buffs.calculate_damage_taken_with_buffs(
            raw_damage,
            character_id,
            damage_type.is_physical(),
        );
        damage = self.resist(character_id, damage, damage_type);
        damage = self.low_hp_reduction(&characters[ti], damage);

        let (left, absorbed) = self.buffs.absorb_with_shield(character_id, damage);
        damage = left;

        if damage >= characters[ti].hp
            && !session.survival_used.contains(&character_id)
            && !self.passives.passives_of_kind(character_id, PassiveKind::Survival).is_empty()
        {
            damage = (characters[ti].hp - 1).max(0);
            session.survival_used.insert(character_id);
            session.add_log(
                LogKind::Buff,
                format!("{} refuses to fall!", characters[ti].name),
            );
        }

        characters[ti].take_damage(damage);
        session
            .stats
            .record_damage_taken(character_id, damage, damage_type, absorbed);
        let mut message = format!(
            "{} hits {} for {}{}",
            action,
            characters[ti].name,
            damage,
            if is_crit { " (critical)" } else { "" }
        );
        if absorbed > 0 {
            message.push_str(&format!(", {absorbed} absorbed"));
        }
        session.add_combat_log(message, damage_type);

        if characters[ti].resource_type.is_rage() && damage > 0 {
            let max_hp = characters[ti].max_hp.max(1) as f64;
            let base = ((damage as f64 / max_hp * self.config.rage_from_damage_scale).round()
                as i32)
                .max(1);
            let gain = rage_gain(base, self.rage_bonus(character_id));
            let gained = characters[ti].gain_resource(gain);
            session.stats.record_resource_generated(character_id, gained);
        }

        if !characters[ti].is_alive() {
            self.character_died(session, characters, ti);
            return;
        }

        self.retaliate(session, characters, ti, ei, damage);
    }

    /// Counter-attacks and reflects against the attacker.
    fn retaliate(
        &self,
        session: &mut BattleSession,
        characters: &mut [Character],
        ti: usize,
        ei: usize,
        damage_taken: i32,
    ) {
        let character_id = characters[ti].id;

        let counter = self.buffs.get_buff_value(character_id, BuffStat::CounterAttack);
        if counter > 0.0 && session.enemies[ei].is_alive() {
            let amount = ((characters[ti].physical_attack as f64 * counter / 100.0).round()
                as i32)
                .max(MIN_DAMAGE);
            self.strike_back(session, &characters[ti], ei, amount, "counter-attacks");
        }

        for revenge in self.passives.passives_of_kind(character_id, PassiveKind::CounterAttack) {
            if !session.enemies[ei].is_alive() {
                break;
            }
            if session.rng.gen::<f64>() * 100.0 >= revenge.value {
                continue;
            }
            let steps = revenge.level.saturating_sub(1) as f64;
            let percent = REVENGE_DAMAGE_BASE + steps * REVENGE_DAMAGE_STEP;
            let attack = effective_attack(&characters[ti], true, &self.passives, &self.buffs);
            let defense = self.guarded_view(&session.enemies[ei]).physical_defense.max(0) as f64 / 2.0;
            let amount = ((attack * percent / 100.0 - defense).round() as i32).max(MIN_DAMAGE);
            self.strike_back(session, &characters[ti], ei, amount, "retaliates");
        }

        let reflect = self.buffs.get_buff_value(character_id, BuffStat::Reflect)
            + self.passives.get_passive_effect_value(character_id, PassiveKind::Reflect, None);
        if reflect > 0.0 && damage_taken > 0 && session.enemies[ei].is_alive() {
            let amount = (damage_taken as f64 * reflect / 100.0).round() as i32;
            if amount > 0 {
                self.strike_back(session, &characters[ti], ei, amount, "reflects");
            }
        }

        if !session.enemies[ei].is_alive() {
            self.enemy_killed(session, characters, ti, ei);
        }
    }

    fn strike_back(
        &self,
        session: &mut BattleSession,
        character: &Character,
        ei: usize,
        amount: i32,
        verb: &str,
    ) {
        let dealt = session.enemies[ei].take_damage(amount);
        session
            .stats
            .record_damage_dealt(character.id, dealt, DamageType::Physical, false);
        self.add_threat(session, ei, character.id, dealt);
        session.add_combat_log(
            format!(
                "{} {} {} damage to {}",
                character.name, verb, dealt, session.enemies[ei].name
            ),
            DamageType::Physical,
        );
    }

    /// Resistance passives cut non-physical hits. Never below 1.
    fn resist(&self, character_id: CharacterId, damage: i32, damage_type: DamageType) -> i32 {
        if damage <= 0 || damage_type.is_physical() {
            return damage;
        }
        let resistance = self
            .passives
            .get_passive_modifier(character_id, PassiveStat::Resistance);
        if resistance <= 0.0 {
            return damage;
        }
        let scale = (1.0 - resistance / 100.0).max(0.0);
        ((damage as f64 * scale).round() as i32).max(MIN_DAMAGE)
    }

    /// Low-HP damage reduction passives. Never reduces a hit below 1.
    fn low_hp_reduction(&self, character: &Character, damage: i32) -> i32 {
        if damage <= 0 {
            return damage;
        }
        let hp_fraction = character.hp_percent() / 100.0;
        let mut reduced = damage as f64;
        for passive in self
            .passives
            .passives_of_kind(character.id, PassiveKind::LowHpDamageReduction)
        {
            let steps = passive.level.saturating_sub(1) as f64;
            let threshold = LAST_STAND_HP_THRESHOLD_BASE - steps * LAST_STAND_HP_THRESHOLD_STEP;
            if hp_fraction < threshold {
                let reduction = LAST_STAND_REDUCTION_BASE + steps * LAST_STAND_REDUCTION_STEP;
                reduced *= (1.0 - reduction / 100.0).max(0.0);
            }
        }
        (reduced.round() as i32).max(MIN_DAMAGE)
    }

    /// The character as seen through defense and dodge passives and buffs.
    fn fortified_view(&self, character: &Character) -> Character {
        let mut view = character.clone();
        let dodge = self
            .passives
            .get_passive_modifier(character.id, PassiveStat::DodgeRate);
        if dodge != 0.0 {
            view.dodge_rate = (view.dodge_rate + dodge / 100.0).max(0.0);
        }
        let bonus = self.passives.get_passive_modifier(character.id, PassiveStat::Defense)
            + self.buffs.get_buff_value(character.id, BuffStat::Defense);
        if bonus != 0.0 {
            let scale = (1.0 + bonus / 100.0).max(0.0);
            view.physical_defense = (view.physical_defense as f64 * scale).round() as i32;
            view.magic_defense = (view.magic_defense as f64 * scale).round() as i32;
        }
        view
    }

    fn end_enemy_turn(&self, session: &mut BattleSession, ei: usize, ai: &MonsterAI) {
        let enemy_id = session.enemies[ei].id.clone();
        ai.tick_cooldowns(&mut session.enemies[ei]);
        for expired in self.buffs.tick_enemy_debuffs(&enemy_id) {
            debug!(enemy = %enemy_id, effect = %expired.effect_id, "debuff expired");
            session.add_log(
                LogKind::Buff,
                format!("{} wears off {}", expired.name, session.enemies[ei].name),
            );
        }
    }
}
