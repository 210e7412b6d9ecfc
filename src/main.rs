//! Bullet Crawl headless runner
//!
//! Plays a seeded run in demo mode and logs what happens.
//!
//! Usage: `bullet-crawl [seed] [ticks] [catalog.json]`

#[cfg(not(target_arch = "wasm32"))]
use bullet_crawl::sim::{GamePhase, LogSink, SimulationState, autopilot, commit_choice, tick};
#[cfg(not(target_arch = "wasm32"))]
use bullet_crawl::{Catalog, Result, Settings, consts::SIM_DT};

#[cfg(not(target_arch = "wasm32"))]
const SETTINGS_FILE: &str = "bullet-crawl.json";
#[cfg(not(target_arch = "wasm32"))]
const DEFAULT_TICKS: u64 = 60 * 60 * 5;

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Bullet Crawl (headless) starting...");

    if let Err(err) = run() {
        log::error!("run aborted: {}", err);
        std::process::exit(1);
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(0xC0FFEE);
    let ticks = args.next().and_then(|s| s.parse().ok()).unwrap_or(DEFAULT_TICKS);

    let settings = Settings::load(SETTINGS_FILE);
    let catalog = match args.next() {
        Some(path) => Catalog::load(path)?,
        None => Catalog::builtin(),
    };
    let mut state = SimulationState::new(seed, settings, &catalog)?;
    log::info!("Game initialized with seed: {}", seed);

    let mut sink = LogSink::default();
    for _ in 0..ticks {
        if let Some(index) = autopilot::choose(&state) {
            commit_choice(&mut state, &catalog, index);
        }
        let input = autopilot::drive(&state);
        tick(&mut state, &catalog, &input, SIM_DT, &mut sink)?;
        if state.phase == GamePhase::GameOver {
            break;
        }
    }

    let hud = state.hud();
    log::info!(
        "finished after {} ticks ({:.1}s): floor {}, health {}/{}, currency {}, {} events",
        state.ticks,
        state.time,
        hud.floor + 1,
        hud.health,
        hud.max_health,
        hud.currency,
        sink.count
    );
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Nothing to run headless in the browser
}
