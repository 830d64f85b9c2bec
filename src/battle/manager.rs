//! The auto-battle engine.
//!
//! One [`BattleSession`] per player, created on first use. Each call to
//! [`BattleManager::execute_tick`] advances exactly one step: a rest
//! update, an encounter spawn, or a single actor's turn. Turn pipelines
//! live in `player_turn.rs` and `enemy_turn.rs` as further `impl` blocks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use super::rest::{finish_rest, is_fully_recovered, party_rest_seconds, regenerate};
use super::results::{BattleStatus, BattleTickResult};
use super::session::{BattleLogEntry, BattleSession, LogKind, SessionState};
use super::spawn::{roll_enemy_count, spawn_group};
use super::turn_order::{build_turn_order, Actor};
use crate::buffs::{BuffManager, BuffSpec, BuffStat};
use crate::character::{Character, UserId};
use crate::core::constants::{PASSIVE_HP_SHIELD_DURATION, PASSIVE_HP_SHIELD_ID};
use crate::core::{BattleError, EngineConfig, Result};
use crate::passives::{PassiveSkillManager, PassiveStat};
use crate::repository::{
    CharacterRepository, PassiveSkillRepository, SkillRepository, StrategyRepository,
    ZoneRepository,
};
use crate::skills::SkillManager;
use crate::strategy::StrategyExecutor;
use crate::zones::{check_zone_access, STARTER_ZONE_ID};

type SessionHandle = Arc<Mutex<BattleSession>>;

/// Collaborators the engine reads definitions from and writes outcomes to.
#[derive(Clone)]
pub struct Repositories {
    pub characters: Arc<dyn CharacterRepository>,
    pub zones: Arc<dyn ZoneRepository>,
    pub strategies: Arc<dyn StrategyRepository>,
    pub skills: Arc<dyn SkillRepository>,
    pub passives: Arc<dyn PassiveSkillRepository>,
}

/// Owns every player's session plus the shared skill, passive and buff
/// state. Construct once at the composition root and share by reference.
pub struct BattleManager {
    sessions: RwLock<HashMap<UserId, SessionHandle>>,
    pub(super) repos: Repositories,
    pub(super) skills: SkillManager,
    pub(super) passives: PassiveSkillManager,
    pub(super) buffs: BuffManager,
    pub(super) executor: StrategyExecutor,
    pub(super) config: EngineConfig,
}

impl BattleManager {
    pub fn new(repos: Repositories, config: EngineConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            repos,
            skills: SkillManager::new(),
            passives: PassiveSkillManager::new(),
            buffs: BuffManager::new(),
            executor: StrategyExecutor::new(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn skills(&self) -> &SkillManager {
        &self.skills
    }

    pub fn passives(&self) -> &PassiveSkillManager {
        &self.passives
    }

    pub fn buffs(&self) -> &BuffManager {
        &self.buffs
    }

    // ── Lifecycle ───────────────────────────────────────────────

    /// Start auto-battle. Returns true once running; starting a running
    /// session changes nothing.
    pub fn start_battle(&self, user_id: UserId) -> bool {
        let handle = self.session(user_id);
        let mut session = lock(&handle);
        if session.state.is_running() {
            return true;
        }
        session.state = SessionState::Active;
        session.add_log(LogKind::System, "Auto-battle started");
        info!(user_id, "battle started");
        true
    }

    /// Stop auto-battle. Any rest in progress is abandoned; the current
    /// engagement is kept and resumes on the next start.
    pub fn stop_battle(&self, user_id: UserId) {
        let Some(handle) = self.existing_session(user_id) else {
            return;
        };
        let mut session = lock(&handle);
        if !session.state.is_running() {
            return;
        }
        session.state = SessionState::Idle;
        session.end_rest();
        session.add_log(LogKind::System, "Auto-battle paused");
        info!(user_id, "battle stopped");
    }

    /// Flip between running and stopped; returns the new running flag.
    pub fn toggle_battle(&self, user_id: UserId) -> bool {
        let running = self
            .existing_session(user_id)
            .is_some_and(|handle| lock(&handle).state.is_running());
        if running {
            self.stop_battle(user_id);
            false
        } else {
            self.start_battle(user_id)
        }
    }

    // ── Queries ─────────────────────────────────────────────────

    /// Status snapshot. Unknown players read as idle.
    pub fn get_battle_status(&self, user_id: UserId) -> BattleStatus {
        self.existing_session(user_id)
            .map(|handle| BattleStatus::from(&*lock(&handle)))
            .unwrap_or_default()
    }

    /// The last `limit` log entries, oldest first.
    pub fn get_battle_logs(&self, user_id: UserId, limit: usize) -> Vec<BattleLogEntry> {
        self.existing_session(user_id)
            .map(|handle| lock(&handle).log.tail(limit))
            .unwrap_or_default()
    }

    // ── Zones ───────────────────────────────────────────────────

    /// Move the session to another zone after checking the level band and
    /// faction. The current engagement is dropped.
    pub fn change_zone(
        &self,
        user_id: UserId,
        zone_id: &str,
        player_level: u32,
        faction: Option<&str>,
    ) -> Result<()> {
        let zone = self.repos.zones.get_zone_by_id(zone_id)?;
        check_zone_access(&zone, player_level, faction)?;

        let handle = self.session(user_id);
        let mut session = lock(&handle);
        self.clear_session_debuffs(&session);
        session.clear_engagement();
        session.zone_id = Some(zone.id.clone());
        session.add_log(LogKind::System, format!("Entered {}", zone.name));
        if !zone.description.is_empty() {
            session.add_log(LogKind::System, zone.description.clone());
        }
        info!(user_id, zone = %zone.id, "zone changed");
        Ok(())
    }

    // ── Tick ────────────────────────────────────────────────────

    /// Advance the player's session by one step. `characters` is the
    /// player's roster; it is updated in place.
    pub fn execute_tick(
        &self,
        user_id: UserId,
        characters: &mut [Character],
    ) -> Result<BattleTickResult> {
        self.execute_tick_at(user_id, characters, Utc::now())
    }

    /// [`execute_tick`](Self::execute_tick) with an explicit clock, so rest
    /// progress can be driven deterministically.
    pub fn execute_tick_at(
        &self,
        user_id: UserId,
        characters: &mut [Character],
        now: DateTime<Utc>,
    ) -> Result<BattleTickResult> {
        if characters.is_empty() {
            return Err(BattleError::InvalidInput("roster is empty".into()));
        }

        let handle = self.session(user_id);
        let mut session = lock(&handle);
        session.log.clear_fresh();
        self.prepare_roster(&mut session, characters);

        match session.state {
            SessionState::Idle => {}
            SessionState::Resting => self.process_rest(&mut session, characters, now),
            SessionState::Active => self.advance_battle(&mut session, characters, now)?,
        }

        Ok(BattleTickResult::from_session(&mut session))
    }

    /// Load skills and passives on first sight and pin rage pools to the
    /// configured size.
    fn prepare_roster(&self, session: &mut BattleSession, characters: &mut [Character]) {
        for character in characters.iter_mut() {
            if character.resource_type.is_rage() {
                character.max_resource = self.config.rage_max;
                character.resource = character.resource.clamp(0, self.config.rage_max);
            }

            if !self.skills.is_loaded(character.id) {
                if let Err(err) = self
                    .skills
                    .load_character_skills(character.id, self.repos.skills.as_ref())
                {
                    warn!(character_id = character.id, error = %err, "failed to load skills");
                    session.add_log(
                        LogKind::Error,
                        format!("Could not load skills for {}", character.name),
                    );
                }
            }
            if !self.passives.is_loaded(character.id) {
                if let Err(err) = self
                    .passives
                    .load_character_passives(character.id, self.repos.passives.as_ref())
                {
                    warn!(character_id = character.id, error = %err, "failed to load passives");
                    session.add_log(
                        LogKind::Error,
                        format!("Could not load passives for {}", character.name),
                    );
                }
            }
        }
    }

    fn advance_battle(
        &self,
        session: &mut BattleSession,
        characters: &mut [Character],
        now: DateTime<Utc>,
    ) -> Result<()> {
        if !session.has_live_enemies() {
            if characters.iter().any(|c| !c.is_alive()) {
                self.enter_rest(session, characters, now);
                return Ok(());
            }
            return self.spawn_encounter(session, characters, now);
        }

        // The tick after a spawn only presents the encounter.
        if session.just_encountered {
            session.just_encountered = false;
            return Ok(());
        }

        self.take_turn(session, characters, now)
    }

    // ── Spawning ────────────────────────────────────────────────

    fn spawn_encounter(
        &self,
        session: &mut BattleSession,
        characters: &mut [Character],
        now: DateTime<Utc>,
    ) -> Result<()> {
        let zone_id = session
            .zone_id
            .clone()
            .or_else(|| self.config.default_zone_id.clone())
            .unwrap_or_else(|| STARTER_ZONE_ID.to_string());

        let zone = self.repos.zones.get_zone_by_id(&zone_id)?;
        let pool = self.repos.zones.get_monsters_by_zone(&zone.id)?;
        if pool.is_empty() {
            return Err(BattleError::not_found("monster", zone.id));
        }

        let alive = characters.iter().filter(|c| c.is_alive()).count();
        let party_level = characters
            .iter()
            .filter(|c| c.is_alive())
            .map(|c| c.level)
            .max()
            .unwrap_or(1);
        let count = roll_enemy_count(alive, self.config.party_size_spread, &mut session.rng);
        let enemies = spawn_group(&pool, party_level, count, &mut session.rng);
        if enemies.is_empty() {
            return Err(BattleError::not_found("monster", zone.id));
        }

        self.clear_session_debuffs(session);
        session.clear_engagement();
        session.reset_battle_counters();
        session.stats.begin(characters.iter().map(|c| c.id));
        for character in characters.iter_mut().filter(|c| c.resource_type.is_rage()) {
            character.resource = 0;
        }
        for character in characters.iter().filter(|c| c.is_alive()) {
            self.grant_passive_shield(session, character);
        }

        session.zone_id = Some(zone.id.clone());
        session.enemies = enemies;
        session.turn_order = build_turn_order(characters, &session.enemies, &mut session.rng);
        session.turn_index = 0;
        session.round = 1;
        session.battle_started_at = Some(now);
        session.battle_count += 1;
        session.just_encountered = true;

        let names: Vec<String> = session
            .enemies
            .iter()
            .map(|e| format!("{} (Lv {})", e.name, e.level))
            .collect();
        session.add_log(
            LogKind::Encounter,
            format!("Encountered {} in {}", names.join(", "), zone.name),
        );
        info!(
            user_id = session.user_id,
            zone = %zone.id,
            enemies = session.enemies.len(),
            battle = session.battle_count,
            "encounter spawned"
        );
        Ok(())
    }

    // ── Turns ───────────────────────────────────────────────────

    fn take_turn(
        &self,
        session: &mut BattleSession,
        characters: &mut [Character],
        now: DateTime<Utc>,
    ) -> Result<()> {
        let Some(actor) = self.next_actor(session, characters) else {
            self.resolve_outcome(session, characters, now);
            return Ok(());
        };

        match &actor {
            Actor::Character(id) => self.player_turn(session, characters, *id)?,
            Actor::Monster(id) => self.enemy_turn(session, characters, id),
        }

        // A fallen actor was already removed, leaving the cursor on the next one.
        if session
            .turn_order
            .get(session.turn_index)
            .is_some_and(|slot| slot.actor == actor)
        {
            session.turn_index += 1;
        }

        self.resolve_outcome(session, characters, now);
        Ok(())
    }

    /// The living actor at the cursor, starting a new round when the queue
    /// is exhausted. `None` when nobody can act.
    fn next_actor(&self, session: &mut BattleSession, characters: &[Character]) -> Option<Actor> {
        let mut rebuilt = false;
        loop {
            if session.turn_index >= session.turn_order.len() {
                if rebuilt {
                    return None;
                }
                session.turn_order =
                    build_turn_order(characters, &session.enemies, &mut session.rng);
                session.turn_index = 0;
                session.round += 1;
                rebuilt = true;
                debug!(user_id = session.user_id, round = session.round, "new round");
                continue;
            }

            let actor = session.turn_order[session.turn_index].actor.clone();
            let alive = match &actor {
                Actor::Character(id) => characters.iter().any(|c| c.id == *id && c.is_alive()),
                Actor::Monster(id) => session.enemies.iter().any(|e| e.id == *id && e.is_alive()),
            };
            if alive {
                return Some(actor);
            }
            session.turn_index += 1;
        }
    }

    // ── Outcomes ────────────────────────────────────────────────

    fn resolve_outcome(
        &self,
        session: &mut BattleSession,
        characters: &mut [Character],
        now: DateTime<Utc>,
    ) {
        if !characters.iter().any(|c| c.is_alive()) {
            self.finish_defeat(session, characters, now);
        } else if !session.has_live_enemies() {
            self.finish_victory(session, characters, now);
        }
    }

    /// Max-HP passives become a shield that lasts the whole fight.
    fn grant_passive_shield(&self, session: &mut BattleSession, character: &Character) {
        let percent = self
            .passives
            .get_passive_modifier(character.id, PassiveStat::Hp);
        let pool = (character.max_hp as f64 * percent / 100.0).round();
        self.buffs.remove_buff(character.id, PASSIVE_HP_SHIELD_ID);
        if pool < 1.0 {
            return;
        }
        self.buffs.apply_buff(
            character.id,
            BuffSpec::buff(
                PASSIVE_HP_SHIELD_ID,
                "Toughness",
                BuffStat::Shield,
                pool,
                PASSIVE_HP_SHIELD_DURATION,
            ),
        );
        session.add_log(
            LogKind::Buff,
            format!("{} is shielded for {}", character.name, pool),
        );
    }

    fn finish_victory(
        &self,
        session: &mut BattleSession,
        characters: &mut [Character],
        now: DateTime<Utc>,
    ) {
        let seconds = battle_seconds(session, now);
        session.add_log(
            LogKind::Summary,
            format!(
                "Victory in {} rounds ({}s): {} kills, {} exp, {} gold",
                session.round, seconds, session.battle_kills, session.battle_exp, session.battle_gold
            ),
        );
        log_top_damage(session, characters);
        info!(
            user_id = session.user_id,
            rounds = session.round,
            kills = session.battle_kills,
            exp = session.battle_exp,
            gold = session.battle_gold,
            "battle won"
        );

        self.clear_battle_effects(session, characters);
        self.persist_after_battle(session, characters);

        session.threat.reset();
        session.survival_used.clear();
        session.turn_order.clear();
        session.turn_index = 0;

        self.enter_rest(session, characters, now);
    }

    fn finish_defeat(
        &self,
        session: &mut BattleSession,
        characters: &mut [Character],
        now: DateTime<Utc>,
    ) {
        let seconds = battle_seconds(session, now);
        session.add_log(
            LogKind::Summary,
            format!(
                "Defeat after {} rounds ({}s): {} kills, {} exp, {} gold",
                session.round, seconds, session.battle_kills, session.battle_exp, session.battle_gold
            ),
        );
        log_top_damage(session, characters);
        info!(
            user_id = session.user_id,
            rounds = session.round,
            kills = session.battle_kills,
            "battle lost"
        );

        self.clear_battle_effects(session, characters);
        session.clear_engagement();
        session.end_rest();
        session.state = SessionState::Idle;
        session.add_log(LogKind::System, "Auto-battle stopped: party defeated");
    }

    /// Drop every battle-scoped effect: buffs, enemy debuffs, cooldowns and
    /// rage.
    fn clear_battle_effects(&self, session: &BattleSession, characters: &mut [Character]) {
        self.clear_session_debuffs(session);
        for character in characters.iter_mut() {
            self.buffs.clear_buffs(character.id);
            self.skills.reset_cooldowns(character.id);
            if character.resource_type.is_rage() {
                character.resource = 0;
            }
        }
    }

    pub(super) fn clear_session_debuffs(&self, session: &BattleSession) {
        for enemy in &session.enemies {
            self.buffs.clear_enemy_debuffs(&enemy.id);
        }
    }

    /// One write per character. Failures are logged and not rolled back.
    fn persist_after_battle(&self, session: &mut BattleSession, characters: &[Character]) {
        for character in characters {
            if let Err(err) = self.repos.characters.update_after_battle(character) {
                warn!(
                    user_id = session.user_id,
                    character_id = character.id,
                    error = %err,
                    "failed to persist battle outcome"
                );
                session.add_log(
                    LogKind::Error,
                    format!("Failed to save progress for {}", character.name),
                );
            }
        }
    }

    // ── Rest ────────────────────────────────────────────────────

    /// Rest long enough for the slowest member. Stays active when nobody
    /// needs it.
    fn enter_rest(
        &self,
        session: &mut BattleSession,
        characters: &[Character],
        now: DateTime<Utc>,
    ) {
        let seconds = party_rest_seconds(characters, &self.config);
        let anyone_down = characters.iter().any(|c| !c.is_alive());
        if seconds <= 0.0 && !anyone_down {
            return;
        }

        let until = now + Duration::milliseconds((seconds * 1000.0).round() as i64);
        session.begin_rest(now, until);
        session.add_log(LogKind::System, format!("Resting for {seconds:.0}s"));
        info!(user_id = session.user_id, seconds, "resting");
    }

    fn process_rest(
        &self,
        session: &mut BattleSession,
        characters: &mut [Character],
        now: DateTime<Utc>,
    ) {
        let Some(until) = session.rest_until else {
            session.state = SessionState::Active;
            return;
        };

        if now >= until {
            for character in characters.iter_mut() {
                finish_rest(character);
            }
            self.complete_rest(session, characters);
            return;
        }

        let last = session.last_rest_tick.unwrap_or(now);
        let elapsed = (now - last).num_milliseconds().max(0) as f64 / 1000.0;
        for character in characters.iter_mut() {
            regenerate(character, elapsed, &self.config);
        }
        session.last_rest_tick = Some(now);

        if characters.iter().all(is_fully_recovered) {
            self.complete_rest(session, characters);
        }
    }

    fn complete_rest(&self, session: &mut BattleSession, characters: &[Character]) {
        session.end_rest();
        session.state = SessionState::Active;
        self.persist_after_battle(session, characters);
        session.add_log(LogKind::System, "Rest complete, looking for the next fight");
        info!(user_id = session.user_id, "rest complete");
    }

    // ── Sessions ────────────────────────────────────────────────

    fn session(&self, user_id: UserId) -> SessionHandle {
        if let Some(handle) = self.existing_session(user_id) {
            return handle;
        }
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            sessions
                .entry(user_id)
                .or_insert_with(|| Arc::new(Mutex::new(self.new_session(user_id)))),
        )
    }

    fn existing_session(&self, user_id: UserId) -> Option<SessionHandle> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user_id)
            .cloned()
    }

    fn new_session(&self, user_id: UserId) -> BattleSession {
        let rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ user_id.wrapping_mul(0x9E37_79B9_7F4A_7C15)),
            None => StdRng::from_entropy(),
        };
        let mut session = BattleSession::new(user_id, self.config.log_capacity, rng);
        session.zone_id = self.config.default_zone_id.clone();
        debug!(user_id, "session created");
        session
    }
}

fn lock(handle: &Mutex<BattleSession>) -> MutexGuard<'_, BattleSession> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

fn log_top_damage(session: &mut BattleSession, characters: &[Character]) {
    let Some((id, damage)) = session.stats.top_damage() else {
        return;
    };
    let Some(character) = characters.iter().find(|c| c.id == id) else {
        return;
    };
    session.add_log(
        LogKind::Summary,
        format!("Top damage: {} ({})", character.name, damage),
    );
}

fn battle_seconds(session: &BattleSession, now: DateTime<Utc>) -> i64 {
    session
        .battle_started_at
        .map(|start| (now - start).num_seconds().max(0))
        .unwrap_or(0)
}
