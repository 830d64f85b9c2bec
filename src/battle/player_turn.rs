//! A character's turn: strategy or fallback choice, then skill or basic
//! attack resolution and every on-hit, on-crit and on-kill trigger.

use rand::Rng;
use tracing::{debug, info, warn};

use super::manager::BattleManager;
use super::rewards::{apply_exp, roll_kill_reward};
use super::session::{BattleSession, LogKind};
use super::stats::SkillCast;
use super::turn_order::{remove_actor, Actor};
use crate::buffs::{BuffSpec, BuffStat};
use crate::character::{rage_gain, Character, CharacterId};
use crate::combat::{
    calculate_damage_with_crit_bonus, calculate_healing, should_crit, should_dodge, Combatant,
    DamageType,
};
use crate::core::Result;
use crate::monsters::Monster;
use crate::passives::{PassiveKind, PassiveStat};
use crate::skills::{effective_attack, CharacterSkillState, SkillEffect, SkillTarget};
use crate::strategy::{BattleContext, BattleStrategy};

/// What a character does this turn. Targets index the session's enemies.
enum PlayerAction {
    Skill {
        state: CharacterSkillState,
        target: usize,
    },
    Attack {
        target: usize,
    },
}

impl BattleManager {
    pub(super) fn player_turn(
        &self,
        session: &mut BattleSession,
        characters: &mut [Character],
        character_id: CharacterId,
    ) -> Result<()> {
        let Some(ci) = characters.iter().position(|c| c.id == character_id) else {
            return Ok(());
        };
        // Lookup failures abort before anything changes.
        let strategy = self.repos.strategies.get_active_by_character_id(character_id)?;

        let periodic = self.buffs.process_dot_effects(character_id, session.round);
        if periodic.healing > 0 {
            let healed = characters[ci].heal(periodic.healing);
            session
                .stats
                .record_healing(character_id, healed, periodic.healing, true);
            if healed > 0 {
                session.add_log(
                    LogKind::Heal,
                    format!("{} regenerates {} HP", characters[ci].name, healed),
                );
            }
        }
        if periodic.damage > 0 {
            characters[ci].take_damage(periodic.damage);
            session
                .stats
                .record_damage_taken(character_id, periodic.damage, DamageType::Physical, 0);
            session.add_log(
                LogKind::Combat,
                format!(
                    "{} suffers {} periodic damage",
                    characters[ci].name, periodic.damage
                ),
            );
            if !characters[ci].is_alive() {
                self.character_died(session, characters, ci);
                return Ok(());
            }
        }

        if self.buffs.has_buff_stat(character_id, BuffStat::Stun) {
            session.add_log(
                LogKind::Combat,
                format!("{} is stunned and cannot act", characters[ci].name),
            );
            self.end_player_turn(session, &characters[ci]);
            return Ok(());
        }

        match self.choose_action(session, characters, ci, strategy.as_ref()) {
            Some(PlayerAction::Skill { state, target }) => {
                self.cast_skill(session, characters, ci, state, target)
            }
            Some(PlayerAction::Attack { target }) => {
                self.normal_attack(session, characters, ci, target)
            }
            None => {}
        }

        if characters[ci].is_alive() {
            self.end_player_turn(session, &characters[ci]);
        }
        Ok(())
    }

    fn choose_action(
        &self,
        session: &BattleSession,
        characters: &[Character],
        ci: usize,
        strategy: Option<&BattleStrategy>,
    ) -> Option<PlayerAction> {
        let character = &characters[ci];
        let focus = session.enemies.iter().position(|e| e.is_alive())?;
        let is_live_target =
            |index: usize| session.enemies.get(index).is_some_and(|e| e.is_alive());

        let Some(strategy) = strategy else {
            let alive = session.enemies.iter().filter(|e| e.is_alive()).count();
            let target_hp = session.enemies[focus].hp_percent();
            return Some(
                match self
                    .skills
                    .select_best_skill(character.id, character.resource, target_hp, alive > 1)
                {
                    Some(state) => PlayerAction::Skill { state, target: focus },
                    None => PlayerAction::Attack { target: focus },
                },
            );
        };

        let ctx = BattleContext {
            character,
            enemies: &session.enemies,
            allies: characters,
            target: Some(&session.enemies[focus]),
            current_round: session.round,
            skills: &self.skills,
            buffs: &self.buffs,
        };

        let Some(decision) = self.executor.execute_strategy(strategy, &ctx) else {
            let target = self.executor.select_target(strategy, &ctx, None);
            let target = if is_live_target(target) { target } else { focus };
            debug!(character_id = character.id, "no strategy decision, normal attack");
            return Some(PlayerAction::Attack { target });
        };

        debug!(
            character_id = character.id,
            skill = decision.skill_id.as_deref().unwrap_or("attack"),
            reason = %decision.reason,
            "strategy decision"
        );
        let target = if is_live_target(decision.target_index) {
            decision.target_index
        } else {
            focus
        };
        let state = decision
            .skill_id
            .filter(|_| !decision.is_normal_attack)
            .and_then(|id| self.skills.get_skill_state(character.id, &id));
        Some(match state {
            Some(state) => PlayerAction::Skill { state, target },
            None => PlayerAction::Attack { target },
        })
    }

    // ── Skills ──────────────────────────────────────────────────

    fn cast_skill(
        &self,
        session: &mut BattleSession,
        characters: &mut [Character],
        ci: usize,
        state: CharacterSkillState,
        target: usize,
    ) {
        let character_id = characters[ci].id;
        let cost = state.resource_cost();
        if characters[ci].resource < cost {
            return self.normal_attack(session, characters, ci, target);
        }
        let state = match self.skills.use_skill(character_id, &state.skill_id) {
            Ok(state) => state,
            Err(err) => {
                debug!(character_id, error = %err, "skill unusable, normal attack");
                return self.normal_attack(session, characters, ci, target);
            }
        };

        characters[ci].spend_resource(cost);
        let refund = self
            .passives
            .get_passive_effect_value(character_id, PassiveKind::OnSkillUseResource, None);
        if refund > 0.0 {
            let gained = characters[ci].gain_resource(refund.round() as i32);
            session.stats.record_resource_generated(character_id, gained);
        }

        let definition = &state.definition;
        let damage_type = definition.damage_type;
        session.add_log(
            LogKind::Combat,
            format!("{} uses {}", characters[ci].name, definition.name),
        );

        let targets: Vec<usize> = match definition.target {
            SkillTarget::EnemyAll => alive_indices(&session.enemies),
            SkillTarget::Enemy => vec![target],
            SkillTarget::SelfOnly => Vec::new(),
        };
        let is_crit = definition.deals_damage()
            && should_crit(
                characters[ci].crit_rate(damage_type) + self.crit_bonus(character_id, damage_type),
                &mut session.rng,
            );

        let mut total_damage = 0;
        let mut hits = 0;
        for ti in targets {
            if !session.enemies[ti].is_alive() {
                continue;
            }
            if definition.deals_damage() {
                let dodged = damage_type.is_physical()
                    && !definition.ignores_dodge
                    && should_dodge(session.enemies[ti].dodge_rate, &mut session.rng);
                if dodged {
                    session.add_log(
                        LogKind::Combat,
                        format!("{} dodges {}", session.enemies[ti].name, definition.name),
                    );
                    continue;
                }

                let mut damage = self.skills.calculate_skill_damage(
                    &state,
                    &characters[ci],
                    &session.enemies[ti],
                    &self.passives,
                    &self.buffs,
                    &mut session.rng,
                );
                if is_crit {
                    damage = (damage as f64 * characters[ci].crit_damage(damage_type).max(1.0))
                        .round() as i32;
                }
                let dealt = session.enemies[ti].take_damage(damage);
                total_damage += dealt;
                hits += 1;
                session
                    .stats
                    .record_damage_dealt(character_id, dealt, damage_type, is_crit);
                self.add_threat(session, ti, character_id, dealt);
                session.add_combat_log(
                    format!(
                        "{} hits {} for {}{}",
                        definition.name,
                        session.enemies[ti].name,
                        dealt,
                        if is_crit { " (critical)" } else { "" }
                    ),
                    damage_type,
                );
            }

            if session.enemies[ti].is_alive() {
                self.apply_target_effects(session, &characters[ci], &state, ti);
            } else {
                self.enemy_killed(session, characters, ci, ti);
            }
        }

        session.stats.record_skill_cast(
            character_id,
            SkillCast {
                skill_id: &state.skill_id,
                cost,
                damage: total_damage,
                hits,
                is_crit,
                missed: definition.deals_damage() && hits == 0,
            },
        );

        if total_damage > 0 {
            self.trigger_on_hit(session, &mut characters[ci], total_damage, is_crit);
        }
        self.apply_self_effects(session, &mut characters[ci], &state, total_damage);
    }

    /// Debuffs, periodic damage and stuns landing on one enemy.
    fn apply_target_effects(
        &self,
        session: &mut BattleSession,
        character: &Character,
        state: &CharacterSkillState,
        ti: usize,
    ) {
        let definition = &state.definition;
        let enemy_id = session.enemies[ti].id.clone();
        for effect in &definition.effects {
            match effect {
                SkillEffect::TargetDebuff {
                    effect_id,
                    name,
                    stat,
                    value,
                    duration,
                } => {
                    self.buffs.apply_enemy_debuff(
                        &enemy_id,
                        BuffSpec::debuff(effect_id, name, *stat, *value, *duration),
                    );
                }
                SkillEffect::TargetDot {
                    effect_id,
                    name,
                    attack_percent,
                    duration,
                    interval,
                } => {
                    let attack = effective_attack(
                        character,
                        definition.damage_type.is_physical(),
                        &self.passives,
                        &self.buffs,
                    );
                    let per_tick = (attack * attack_percent / 100.0).round().max(1.0);
                    self.buffs.apply_enemy_debuff(
                        &enemy_id,
                        BuffSpec::dot(
                            effect_id,
                            name,
                            per_tick,
                            *duration,
                            *interval,
                            definition.damage_type,
                        ),
                    );
                }
                SkillEffect::Stun { chance, duration } => {
                    if session.rng.gen::<f64>() < *chance {
                        self.buffs.apply_enemy_debuff(
                            &enemy_id,
                            BuffSpec::debuff(
                                format!("{}_stun", state.skill_id),
                                "Stunned",
                                BuffStat::Stun,
                                1.0,
                                *duration,
                            ),
                        );
                        session.stats.record_cc_applied(character.id);
                        session.add_log(
                            LogKind::Buff,
                            format!("{} is stunned", session.enemies[ti].name),
                        );
                    }
                }
                _ => {}
            }
        }
    }

    /// Buffs, heals, shields and resource on the caster, plus party-wide
    /// debuffs on every living enemy.
    fn apply_self_effects(
        &self,
        session: &mut BattleSession,
        character: &mut Character,
        state: &CharacterSkillState,
        damage_dealt: i32,
    ) {
        for effect in &state.definition.effects {
            match effect {
                SkillEffect::SelfBuff {
                    effect_id,
                    name,
                    stat,
                    value,
                    duration,
                } => {
                    self.buffs.apply_buff(
                        character.id,
                        BuffSpec::buff(effect_id, name, *stat, *value, *duration),
                    );
                    session.add_log(
                        LogKind::Buff,
                        format!("{} gains {}", character.name, name),
                    );
                }
                SkillEffect::AllEnemiesDebuff {
                    effect_id,
                    name,
                    stat,
                    value,
                    duration,
                } => {
                    for enemy in session.enemies.iter().filter(|e| e.is_alive()) {
                        self.buffs.apply_enemy_debuff(
                            &enemy.id,
                            BuffSpec::debuff(effect_id, name, *stat, *value, *duration),
                        );
                    }
                }
                SkillEffect::HealMaxHpPercent { percent } => {
                    let heal = calculate_healing(
                        Some(&*character as &dyn Combatant),
                        character.max_hp,
                        percent / 100.0,
                        0.0,
                    );
                    self.heal_character(session, character, heal.actual_healing);
                }
                SkillEffect::HealDamagePercent { percent } => {
                    if damage_dealt > 0 {
                        let amount = (damage_dealt as f64 * percent / 100.0).round() as i32;
                        self.heal_character(session, character, amount);
                    }
                }
                SkillEffect::ShieldMaxHpPercent {
                    effect_id,
                    name,
                    percent,
                    duration,
                } => {
                    let pool = (character.max_hp as f64 * percent / 100.0).round();
                    self.buffs.apply_buff(
                        character.id,
                        BuffSpec::buff(effect_id, name, BuffStat::Shield, pool, *duration),
                    );
                    session.add_log(
                        LogKind::Buff,
                        format!("{} is shielded for {}", character.name, pool),
                    );
                }
                SkillEffect::ResourceGain { amount } => {
                    let amount = if character.resource_type.is_rage() {
                        rage_gain(*amount, self.rage_bonus(character.id))
                    } else {
                        *amount
                    };
                    self.grant_resource(session, character, amount);
                }
                SkillEffect::TargetDebuff { .. }
                | SkillEffect::TargetDot { .. }
                | SkillEffect::Stun { .. } => {}
            }
        }
    }

    // ── Basic attack ────────────────────────────────────────────

    fn normal_attack(
        &self,
        session: &mut BattleSession,
        characters: &mut [Character],
        ci: usize,
        ti: usize,
    ) {
        if !session.enemies.get(ti).is_some_and(|e| e.is_alive()) {
            return;
        }
        let character_id = characters[ci].id;
        let damage_mod = self.passives.get_passive_modifier(character_id, PassiveStat::Damage);
        let attack = (effective_attack(&characters[ci], true, &self.passives, &self.buffs)
            * (1.0 + damage_mod / 100.0))
            .round() as i32;

        let defender = self.guarded_view(&session.enemies[ti]);
        let result = calculate_damage_with_crit_bonus(
            Some(&characters[ci] as &dyn Combatant),
            Some(&defender as &dyn Combatant),
            attack,
            1.0,
            DamageType::Physical,
            false,
            self.crit_bonus(character_id, DamageType::Physical),
            &mut session.rng,
        );

        if result.is_dodged {
            session.add_log(
                LogKind::Combat,
                format!(
                    "{} dodges {}'s attack",
                    session.enemies[ti].name, characters[ci].name
                ),
            );
            return;
        }

        let dealt = session.enemies[ti].take_damage(result.final_damage);
        session
            .stats
            .record_damage_dealt(character_id, dealt, DamageType::Physical, result.is_crit);
        self.add_threat(session, ti, character_id, dealt);
        session.add_combat_log(
            format!(
                "{} attacks {} for {}{}",
                characters[ci].name,
                session.enemies[ti].name,
                dealt,
                if result.is_crit { " (critical)" } else { "" }
            ),
            DamageType::Physical,
        );

        if characters[ci].resource_type.is_rage() {
            let base = if result.is_crit {
                self.config.rage_on_crit
            } else {
                self.config.rage_on_hit
            };
            let gained =
                characters[ci].gain_resource(rage_gain(base, self.rage_bonus(character_id)));
            session.stats.record_resource_generated(character_id, gained);
        }
        self.trigger_on_hit(session, &mut characters[ci], dealt, result.is_crit);

        if !session.enemies[ti].is_alive() {
            self.enemy_killed(session, characters, ci, ti);
        }
    }

    // ── Triggers ────────────────────────────────────────────────

    fn trigger_on_hit(
        &self,
        session: &mut BattleSession,
        character: &mut Character,
        damage: i32,
        is_crit: bool,
    ) {
        let id = character.id;
        let heal_percent = self.passives.get_passive_effect_value(id, PassiveKind::OnHitHeal, None);
        if heal_percent > 0.0 {
            let amount = ((character.max_hp as f64 * heal_percent / 100.0).round() as i32).max(1);
            self.heal_character(session, character, amount);
        }
        let resource = self.passives.get_passive_effect_value(id, PassiveKind::OnHitResource, None);
        if resource > 0.0 {
            self.grant_resource(session, character, resource.round() as i32);
        }

        if !is_crit {
            return;
        }
        let crit_heal = self.passives.get_passive_effect_value(id, PassiveKind::OnCritHeal, None);
        if crit_heal > 0.0 {
            let amount = (damage as f64 * crit_heal / 100.0).round() as i32;
            self.heal_character(session, character, amount);
        }
        let crit_resource =
            self.passives.get_passive_effect_value(id, PassiveKind::OnCritResource, None);
        if crit_resource > 0.0 {
            self.grant_resource(session, character, crit_resource.round() as i32);
        }
    }

    /// Rewards, on-kill passives and level-ups for `killer`; the enemy
    /// leaves the turn order.
    pub(super) fn enemy_killed(
        &self,
        session: &mut BattleSession,
        characters: &mut [Character],
        killer: usize,
        ti: usize,
    ) {
        let enemy_id = session.enemies[ti].id.clone();
        let enemy_name = session.enemies[ti].name.clone();
        let zone = session
            .zone_id
            .as_deref()
            .and_then(|id| self.repos.zones.get_zone_by_id(id).ok());
        let reward = roll_kill_reward(&session.enemies[ti], zone.as_ref(), &mut session.rng);
        session.record_kill(reward.exp, reward.gold);

        let character = &mut characters[killer];
        character.total_kills += 1;
        session.stats.record_kill(character.id);
        session.add_log(
            LogKind::Loot,
            format!(
                "{} is slain! {} gains {} exp and {} gold",
                enemy_name, character.name, reward.exp, reward.gold
            ),
        );

        let heal_percent =
            self.passives.get_passive_effect_value(character.id, PassiveKind::OnKillHeal, None);
        if heal_percent > 0.0 {
            let amount = (character.max_hp as f64 * heal_percent / 100.0).round() as i32;
            self.heal_character(session, character, amount);
        }
        let resource =
            self.passives.get_passive_effect_value(character.id, PassiveKind::OnKillResource, None);
        if resource > 0.0 {
            self.grant_resource(session, character, resource.round() as i32);
        }

        let levels = apply_exp(character, reward.exp, self.config.exp_curve_multiplier);
        if levels > 0 {
            session.add_log(
                LogKind::Levelup,
                format!("{} reached level {}!", character.name, character.level),
            );
            info!(character_id = character.id, level = character.level, "level up");
        }

        self.buffs.clear_enemy_debuffs(&enemy_id);
        remove_actor(
            &mut session.turn_order,
            &mut session.turn_index,
            &Actor::Monster(enemy_id),
        );
    }

    /// Mark a character dead, persist the death and drop them from the
    /// turn order.
    pub(super) fn character_died(
        &self,
        session: &mut BattleSession,
        characters: &mut [Character],
        ci: usize,
    ) {
        let character = &mut characters[ci];
        character.total_deaths += 1;
        session.stats.record_death(character.id);
        character.is_dead = true;
        character.hp = 0;
        if character.resource_type.is_rage() {
            character.resource = 0;
        }
        self.buffs.clear_buffs(character.id);
        remove_actor(
            &mut session.turn_order,
            &mut session.turn_index,
            &Actor::Character(character.id),
        );

        if let Err(err) = self.repos.characters.update_after_death(character) {
            warn!(character_id = character.id, error = %err, "failed to persist death");
            session.add_log(
                LogKind::Error,
                format!("Failed to save death of {}", character.name),
            );
        }
        session.add_log(LogKind::Death, format!("{} has fallen", character.name));
        info!(user_id = session.user_id, character_id = character.id, "character died");
    }

    fn end_player_turn(&self, session: &mut BattleSession, character: &Character) {
        self.skills.tick_cooldowns(character.id);
        for expired in self.buffs.tick_buffs(character.id) {
            debug!(character_id = character.id, effect = %expired.effect_id, "buff expired");
            session.add_log(
                LogKind::Buff,
                format!("{} fades from {}", expired.name, character.name),
            );
        }
    }

    // ── Helpers ─────────────────────────────────────────────────

    pub(super) fn add_threat(
        &self,
        session: &mut BattleSession,
        ti: usize,
        character_id: CharacterId,
        damage: i32,
    ) {
        let bonus = self.passives.get_passive_modifier(character_id, PassiveStat::Threat);
        let amount = (damage as f64 * (1.0 + bonus / 100.0)).round() as i64;
        let enemy_id = session.enemies[ti].id.clone();
        session.threat.add_threat(&enemy_id, character_id, amount);
    }

    /// Extra crit chance (0-1) from buffs and passives, including the
    /// school-specific passive for `damage_type`.
    fn crit_bonus(&self, character_id: CharacterId, damage_type: DamageType) -> f64 {
        let school = if damage_type.is_physical() {
            PassiveStat::PhysCritRate
        } else {
            PassiveStat::SpellCritRate
        };
        (self.buffs.get_buff_value(character_id, BuffStat::CritRate)
            + self.passives.get_passive_modifier(character_id, PassiveStat::CritRate)
            + self.passives.get_passive_modifier(character_id, school))
            / 100.0
    }

    pub(super) fn rage_bonus(&self, character_id: CharacterId) -> f64 {
        self.passives
            .get_passive_effect_value(character_id, PassiveKind::RageGeneration, None)
    }

    /// The enemy as seen through its guard buffs and armor debuffs.
    pub(super) fn guarded_view(&self, enemy: &Monster) -> Monster {
        let mut view = enemy.clone();
        let modifier = self.buffs.enemy_defense_modifier(&enemy.id);
        if modifier != 0.0 {
            let scale = (1.0 + modifier / 100.0).max(0.0);
            view.physical_defense = (view.physical_defense as f64 * scale) as i32;
            view.magic_defense = (view.magic_defense as f64 * scale) as i32;
        }
        view
    }

    fn heal_character(&self, session: &mut BattleSession, character: &mut Character, amount: i32) {
        if amount <= 0 || !character.is_alive() {
            return;
        }
        let healed = character.heal(amount);
        session.stats.record_healing(character.id, healed, amount, false);
        if healed > 0 {
            session.add_log(
                LogKind::Heal,
                format!("{} recovers {} HP", character.name, healed),
            );
        }
    }

    pub(super) fn grant_resource(
        &self,
        session: &mut BattleSession,
        character: &mut Character,
        amount: i32,
    ) {
        let gained = character.gain_resource(amount);
        session.stats.record_resource_generated(character.id, gained);
        if gained > 0 {
            session.add_log(
                LogKind::Resource,
                format!(
                    "{} gains {} {}",
                    character.name,
                    gained,
                    character.resource_type.display_name()
                ),
            );
        }
    }
}

fn alive_indices(enemies: &[Monster]) -> Vec<usize> {
    enemies
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_alive())
        .map(|(i, _)| i)
        .collect()
}
