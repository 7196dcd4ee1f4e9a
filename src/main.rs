//! Derby - headless race runner
//!
//! Runs one race on a fixed timestep against the in-process prediction
//! service and logs everything the presentation layer would receive.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use derby::assets::{self, AssetSource, DirectoryAssets};
use derby::consts::{MAX_SUBSTEPS, SIM_DT};
use derby::input::{self, InputCommand, Routed, TimedInput};
use derby::persistence::JsonPositionStore;
use derby::prediction::FakeService;
use derby::sim::{Arena, ArenaLayout, RaceEvent, RacePhase, RacerId, RacerProfile};
use derby::{RaceOrchestrator, RaceSettings};

#[derive(Parser, Debug)]
#[command(name = "derby")]
#[command(about = "Headless bouncing-racer derby with a simulated prediction service")]
struct Cli {
    /// Racer names, used when no asset folder is given
    #[arg(long, value_delimiter = ',', default_value = "Alpha,Beta,Gamma,Delta")]
    racers: Vec<String>,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// JSON settings file
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Folder with <Name>_Body.png / <Name>_Winner.png racers and sound overrides
    #[arg(long)]
    assets: Option<PathBuf>,
    /// JSON arena layout; the built-in arena is used otherwise
    #[arg(long)]
    arena: Option<PathBuf>,
    /// JSON file for dragged positions
    #[arg(long)]
    positions: Option<PathBuf>,
    /// Timed input script (`<seconds> <command>` per line); default is a single start
    #[arg(long)]
    script: Option<PathBuf>,
    /// Give up after this many real seconds
    #[arg(long, default_value_t = 180.0)]
    max_seconds: f32,
    /// Host frame length fed into the fixed-step loop
    #[arg(long, default_value_t = 1.0 / 30.0)]
    frame: f32,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    log::info!("Derby (headless) starting, seed {}", cli.seed);

    let settings = match &cli.settings {
        Some(path) => RaceSettings::load_or_default(path),
        None => RaceSettings::default(),
    };

    let arena = match &cli.arena {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading arena {}", path.display()))?;
            let layout: ArenaLayout = serde_json::from_str(&json)
                .with_context(|| format!("parsing arena {}", path.display()))?;
            Arena::new(layout)
        }
        None => Arena::demo(),
    };

    let mut race = RaceOrchestrator::new(settings, arena, FakeService::logged_in(), cli.seed);

    let profiles = match &cli.assets {
        Some(dir) => {
            let source = DirectoryAssets::new(dir);
            let arena_assets = source.arena_assets();
            for (label, path) in arena_assets.images() {
                log::info!("Arena {} image: {}", label, path.display());
            }
            for (effect, path) in arena_assets.sound_overrides {
                race.set_sound_override(effect, path);
            }
            assets::profiles(&source)
        }
        None => cli.racers.iter().map(RacerProfile::named).collect(),
    };
    if profiles.is_empty() {
        anyhow::bail!("no racers to race");
    }
    race.load_roster(profiles);

    let mut store = cli.positions.as_ref().map(JsonPositionStore::open);
    if let Some(store) = &store {
        race.restore_positions(store);
    }

    let script = match &cli.script {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading script {}", path.display()))?;
            input::parse_script(&text)?
        }
        None => vec![TimedInput {
            at: 0.0,
            command: InputCommand::StartRace,
        }],
    };

    run(&mut race, script, cli.frame.max(SIM_DT), cli.max_seconds);

    if let Some(store) = store.as_mut() {
        race.persist_positions(store);
        log::info!("Positions saved to {}", store.path().display());
    }
    race.shutdown();

    match race.winner() {
        Some(winner) => println!(
            "Winner: {} after {:.1}s ({})",
            winner.name,
            race.elapsed(),
            race.bridge().status()
        ),
        None => println!("No winner ({:?})", race.phase()),
    }
    Ok(())
}

/// Fixed-step loop fed by a simulated host frame clock
fn run(race: &mut RaceOrchestrator<FakeService>, script: Vec<TimedInput>, frame: f32, max_seconds: f32) {
    let mut pending = script.into_iter().peekable();
    let mut accumulator = 0.0;
    let mut real_time = 0.0;

    while real_time < max_seconds {
        real_time += frame;
        accumulator += frame;

        while let Some(input) = pending.next_if(|i| i.at <= real_time) {
            match input.command.route() {
                Routed::Race(command) => race.handle(command),
                Routed::Drag(command) => race.apply_drag(command),
            }
        }

        let mut substeps = 0;
        while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            race.update(SIM_DT);
            accumulator -= SIM_DT;
            substeps += 1;
        }
        if substeps >= MAX_SUBSTEPS {
            accumulator = 0.0;
        }

        let mut done = false;
        for event in race.drain_events() {
            done |= report(race, &event);
        }
        let idle = matches!(race.phase(), RacePhase::Idle | RacePhase::Aborted);
        if done || (idle && pending.peek().is_none() && real_time > 0.0) {
            break;
        }
    }
}

/// Log one event; true once the victory sequence is over
fn report(race: &RaceOrchestrator<FakeService>, event: &RaceEvent) -> bool {
    let name = |id: RacerId| {
        race.racers()
            .iter()
            .find(|r| r.id == id)
            .map_or("?", |r| r.name.as_str())
    };
    match event {
        RaceEvent::PhaseChanged { from, to } => log::info!("{:?} -> {:?}", from, to),
        RaceEvent::Clock { seconds } => log::info!("Race clock {}s", seconds),
        RaceEvent::TimeScaleChanged(scale) => log::info!("Time scale x{}", scale),
        RaceEvent::Kiss { racer, .. } => log::info!("{} blew a kiss", name(*racer)),
        RaceEvent::Win { racer } => log::info!("{} reached the goal", name(*racer)),
        RaceEvent::ResultsReady { .. } => return true,
        other => log::debug!("{:?}", other),
    }
    false
}
