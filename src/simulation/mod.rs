pub mod clouds;
pub mod erosion;
pub mod fixups;
pub mod hydrology;
pub mod impacts;
pub mod phase;
pub mod plates;
pub mod rivers;
pub mod sea_level;
pub mod statistics;

use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, trace, warn};

use crate::config::generation::GenerationParams;
use crate::config::simulation::SimulationConfig;
use crate::error::GenerationError;
use crate::simulation::phase::Phase;
use crate::simulation::statistics::RoundStatistics;
use crate::world::generation::{generate_world, resolve_seed};
use crate::world::World;

/// Result of executing a single round.
#[derive(Debug)]
pub struct RoundResult {
    pub statistics: RoundStatistics,
    /// Wall-clock time of every phase that ran, in execution order.
    pub phase_timings_ms: Vec<(Phase, f32)>,
}

/// Run one phase, recording how long it took.
fn timed<T>(timings: &mut Vec<(Phase, f32)>, phase: Phase, run: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let out = run();
    timings.push((phase, start.elapsed().as_secs_f32() * 1000.0));
    out
}

/// Execute a single simulation round on the world.
///
/// Plates move first. Unless this is the final round, last round's erosion is
/// then applied and the land settles. The sea level, weather and drainage are
/// recomputed every round. Rocks are only moved, and next round's erosion only
/// scheduled, when more rounds follow.
pub fn execute_round(
    world: &mut World,
    config: &SimulationConfig,
    rng: &mut impl Rng,
    final_round: bool,
) -> Result<RoundResult, GenerationError> {
    let round_start = Instant::now();
    let mut timings = Vec::with_capacity(Phase::all().len());

    timed(&mut timings, Phase::Plates, || plates::advance_plates(world, rng));

    if !final_round {
        timed(&mut timings, Phase::Impacts, || {
            impacts::maybe_strike(world, config.asteroid_chance, rng)
        });
        timed(&mut timings, Phase::Erosion, || {
            erosion::apply_deferred_erosion(world)
        });
        timed(&mut timings, Phase::Landslides, || {
            erosion::landslides(world, rng)
        });
        timed(&mut timings, Phase::Diffusion, || {
            erosion::undersea_diffusion(world)
        });
    }

    timed(&mut timings, Phase::SeaLevel, || {
        sea_level::update_sea_level(world, config)
    });
    timed(&mut timings, Phase::Evaporation, || clouds::evaporate(world));
    timed(&mut timings, Phase::Clouds, || clouds::transport(world, rng));
    timed(&mut timings, Phase::Precipitation, || clouds::precipitate(world));
    timed(&mut timings, Phase::Hydrology, || hydrology::run_hydrology(world))?;
    timed(&mut timings, Phase::Rivers, || rivers::classify_rivers(world));

    if !final_round {
        timed(&mut timings, Phase::Transport, || {
            let rockflow = erosion::transport_rocks(world, config);
            erosion::compute_deferred_erosion(world, config, &rockflow);
        });
    }

    world.round += 1;

    let round_duration = round_start.elapsed().as_secs_f32() * 1000.0;
    let statistics = statistics::compute_statistics(world, round_duration);

    debug!(
        round = statistics.round,
        sea_level = statistics.sea_level,
        lakes = statistics.lakes,
        rivers = statistics.small_river_tiles + statistics.big_river_tiles,
        mass_balance = statistics.mass_balance,
        duration_ms = round_duration,
        "Round complete"
    );
    for (phase, ms) in &timings {
        trace!(round = statistics.round, phase = phase.name(), ms, "Phase timing");
    }

    // Landslides repay borrowed mass; a growing debt means they can't keep up.
    let total_mass = world.total_mass().max(1);
    if world.mass_balance > total_mass / 100 {
        warn!(
            round = statistics.round,
            mass_balance = world.mass_balance,
            total_mass,
            "Mass balance drifting"
        );
    }

    Ok(RoundResult {
        statistics,
        phase_timings_ms: timings,
    })
}

/// Run every remaining round, then the final terrain fixups.
pub fn run_rounds(
    world: &mut World,
    config: &SimulationConfig,
    rng: &mut impl Rng,
) -> Result<Option<RoundStatistics>, GenerationError> {
    let mut last = None;
    while world.round < world.rounds {
        let final_round = world.round + 1 == world.rounds;
        last = Some(execute_round(world, config, rng, final_round)?.statistics);
    }
    fixups::apply_fixups(world, rng);
    Ok(last)
}

/// Generate a complete planet from validated parameters.
///
/// A zero seed is replaced by a random one; the seed used is stored in the
/// world's parameters.
pub fn generate_planet(
    params: &GenerationParams,
    config: &SimulationConfig,
) -> Result<World, GenerationError> {
    params.validate()?;
    config.validate()?;

    let params = resolve_seed(params);
    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    let rounds = config.rounds.unwrap_or_else(|| params.rounds());

    let start = Instant::now();
    let mut world = generate_world(&params, rounds, &mut rng);
    let last = run_rounds(&mut world, config, &mut rng)?;

    if let Some(stats) = last {
        info!(
            seed = params.seed,
            rounds = world.round,
            sea_level = stats.sea_level,
            land = stats.land_tiles,
            lakes = world.lakes.active_count(),
            rivers = stats.small_river_tiles + stats.big_river_tiles,
            highest = stats.highest,
            mass_balance = world.mass_balance,
            elapsed_ms = start.elapsed().as_secs_f32() * 1000.0,
            "Planet generated"
        );
    }
    Ok(world)
}
