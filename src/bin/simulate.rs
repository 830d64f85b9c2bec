//! Headless auto-battle runner.
//!
//! Drives one player's session against the built-in zone catalogue and
//! prints every log line the engine produces.
//!
//! Usage:
//!   cargo run --bin simulate -- [OPTIONS]
//!
//! Examples:
//!   cargo run --bin simulate                         # 500 ticks, 3 warriors
//!   cargo run --bin simulate -- -t 2000 -p 1         # solo warrior
//!   cargo run --bin simulate -- --seed 42 --quiet    # reproducible summary
//!   RUST_LOG=autobattle=debug cargo run --bin simulate

use std::env;
use std::sync::Arc;

use autobattle::battle::{BattleManager, Repositories};
use autobattle::build_info;
use autobattle::character::{recalculate_derived, Character, ResourceType};
use autobattle::core::EngineConfig;
use autobattle::repository::{
    InMemoryCharacterRepository, InMemorySkillRepository, InMemoryStrategyRepository,
    InMemoryZoneRepository,
};
use autobattle::skills::LearnedSkill;
use autobattle::strategy::BattleStrategy;
use autobattle::zones::STARTER_ZONE_ID;
use chrono::{Duration, Utc};
use tracing_subscriber::EnvFilter;

const USER_ID: u64 = 1;
const PARTY_NAMES: [&str; 5] = ["Varian", "Bolvar", "Saurfang", "Garrosh", "Broll"];
const STARTING_SKILLS: [&str; 4] = ["heroic_strike", "rend", "battle_shout", "execute"];
const STARTING_PASSIVES: [&str; 2] = ["weapon_mastery", "anger_management"];

struct SimArgs {
    ticks: u32,
    party_size: usize,
    seed: Option<u64>,
    zone: String,
    quiet: bool,
}

impl Default for SimArgs {
    fn default() -> Self {
        Self {
            ticks: 500,
            party_size: 3,
            seed: None,
            zone: STARTER_ZONE_ID.to_string(),
            quiet: false,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let args: Vec<String> = env::args().collect();
    let sim = parse_args(&args);

    println!("{}", build_info::version_line());
    println!("  Ticks:   {}", sim.ticks);
    println!("  Party:   {}", sim.party_size);
    println!("  Zone:    {}", sim.zone);
    if let Some(seed) = sim.seed {
        println!("  Seed:    {}", seed);
    }
    println!();

    let mut party = build_party(sim.party_size);
    let characters = Arc::new(InMemoryCharacterRepository::with_characters(
        party.iter().cloned(),
    ));
    let skills = Arc::new(InMemorySkillRepository::with_warrior_catalogue());
    let strategies = Arc::new(InMemoryStrategyRepository::new());
    for character in &party {
        for skill_id in STARTING_SKILLS {
            skills.learn_skill(character.id, LearnedSkill::new(skill_id, 1));
        }
        for passive_id in STARTING_PASSIVES {
            skills.learn_passive(character.id, LearnedSkill::new(passive_id, 1));
        }
    }
    // The first warrior follows the stock strategy; the rest use fallback selection.
    if let Some(leader) = party.first() {
        let mut strategy = BattleStrategy::default_for(leader.id, "Default");
        strategy.is_active = true;
        strategy.skill_priority = vec!["execute".into(), "rend".into(), "heroic_strike".into()];
        strategies.set_active(strategy);
    }

    let mut config = EngineConfig::fast_rest();
    config.seed = sim.seed;
    let manager = BattleManager::new(
        Repositories {
            characters: characters.clone(),
            zones: Arc::new(InMemoryZoneRepository::with_starter_data()),
            strategies,
            skills: skills.clone(),
            passives: skills,
        },
        config,
    );

    let level = party.iter().map(|c| c.level).max().unwrap_or(1);
    if let Err(err) = manager.change_zone(USER_ID, &sim.zone, level, None) {
        eprintln!("Cannot enter zone '{}': {}", sim.zone, err);
        std::process::exit(1);
    }
    manager.start_battle(USER_ID);

    let mut clock = Utc::now();
    let mut defeats = 0u32;
    for _ in 0..sim.ticks {
        clock += Duration::seconds(1);
        let result = match manager.execute_tick_at(USER_ID, &mut party, clock) {
            Ok(result) => result,
            Err(err) => {
                eprintln!("Tick failed: {}", err);
                break;
            }
        };
        if !sim.quiet {
            for entry in &result.logs {
                println!("[{:?}] {}", entry.kind, entry.message);
            }
        }
        if !result.is_running {
            defeats += 1;
            manager.start_battle(USER_ID);
        }
    }

    let status = manager.get_battle_status(USER_ID);
    println!();
    println!("Summary:");
    println!("  Battles: {}", status.battle_count);
    println!("  Kills:   {}", status.session_kills);
    println!("  Exp:     {}", status.session_exp);
    println!("  Gold:    {}", status.session_gold);
    println!("  Wipes:   {}", defeats);
    for character in &party {
        let last_fight = status.battle_stats.get(character.id);
        println!(
            "  {:<10} L{:<3} {:>4}/{:<4} HP  kills {:<4} deaths {:<4} last fight dealt {} taken {}",
            character.name,
            character.level,
            character.hp,
            character.max_hp,
            character.total_kills,
            character.total_deaths,
            last_fight.map_or(0, |s| s.damage_dealt),
            last_fight.map_or(0, |s| s.damage_taken)
        );
    }
    println!(
        "  Saves:   {} battle, {} death",
        characters.battle_writes(),
        characters.death_writes()
    );
}

fn build_party(size: usize) -> Vec<Character> {
    PARTY_NAMES
        .iter()
        .take(size.clamp(1, PARTY_NAMES.len()))
        .enumerate()
        .map(|(i, name)| {
            let mut c = Character::new(i as u64 + 1, USER_ID, *name);
            c.class_id = "warrior".into();
            c.resource_type = ResourceType::Rage;
            c.resource = 0;
            c.strength = 18;
            c.stamina = 15;
            recalculate_derived(&mut c, 100, 0);
            c.hp = c.max_hp;
            c
        })
        .collect()
}

fn parse_args(args: &[String]) -> SimArgs {
    let mut sim = SimArgs::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-t" | "--ticks" => {
                if i + 1 < args.len() {
                    sim.ticks = args[i + 1].parse().unwrap_or(500);
                    i += 1;
                }
            }
            "-p" | "--party" => {
                if i + 1 < args.len() {
                    sim.party_size = args[i + 1].parse().unwrap_or(3);
                    i += 1;
                }
            }
            "-s" | "--seed" => {
                if i + 1 < args.len() {
                    sim.seed = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "-z" | "--zone" => {
                if i + 1 < args.len() {
                    sim.zone = args[i + 1].clone();
                    i += 1;
                }
            }
            "-q" | "--quiet" => {
                sim.quiet = true;
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }

    sim
}

fn print_help() {
    println!("Autobattle simulator");
    println!();
    println!("Options:");
    println!("  -t, --ticks N    Ticks to run (default: 500)");
    println!("  -p, --party N    Party size, 1-5 (default: 3)");
    println!("  -s, --seed N     Seed for reproducible runs");
    println!("  -z, --zone ID    Zone to fight in (default: elwynn)");
    println!("  -q, --quiet      Only print the summary");
    println!("  -h, --help       Show this help");
}
