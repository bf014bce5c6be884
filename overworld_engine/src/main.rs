#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
//! ** Overworld Engine **
//! Loads an extracted world and walks a short scripted demo session,
//! printing every request the engine raises.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;

use overworld_engine::session::{BattleOutcome, EngineRequest};
use overworld_engine::{Direction, GameVersion, MapId, Session, Terrain, load_world};

fn main() -> Result<()> {
    env_logger::init();
    let mut args = env::args().skip(1);
    let world_path = args
        .next()
        .map_or_else(|| PathBuf::from("overworld_engine/data/world.ron"), PathBuf::from);
    let start_map = args.next().unwrap_or_else(|| "PalletTown".to_string());

    info!("Start: loading overworld data from {}", world_path.display());
    let world = load_world(&world_path).context("while loading StaticWorld")?;
    info!("StaticWorld loaded successfully.");

    let start = MapId::from_raw(&start_map);
    let mut session = Session::new(world.into(), &start, (10, 10), GameVersion::Red, rand::random())
        .with_context(|| format!("while starting a session on '{start_map}'"))?;

    println!("Session started on {start} at {:?}.", session.position());
    for direction in [Direction::Up, Direction::Up, Direction::Left, Direction::Down] {
        let outcome = session.step_player(direction, Terrain::Grass);
        println!("step {direction:?}: {outcome:?} -> {:?}", session.position());
        session.tick();
        for request in session.drain_requests() {
            match request {
                EngineRequest::Dialogue { text } => {
                    println!("  [dialogue] {text}");
                    session.acknowledge_dialogue();
                },
                EngineRequest::TrainerBattle { class, base_money, party, .. } => {
                    println!("  [battle] {class} (${base_money}) with {} party members", party.len());
                    session.resolve_battle(BattleOutcome::Victory);
                },
                EngineRequest::WildBattle { species, level } => {
                    println!("  [wild] a level {level} {species} appeared");
                },
                EngineRequest::ItemReceived { item } => println!("  [item] received {item}"),
                EngineRequest::CoinsReceived { amount } => println!("  [coins] found {amount}"),
            }
        }
    }
    println!("Final state: {} at {:?}", session.map(), session.position());
    Ok(())
}
