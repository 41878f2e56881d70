//! Erosion, rock transport and deposition.
//!
//! Erosion computed in one round is applied at the start of the next. The
//! dislodged material travels as rocks down the river network and settles
//! where the water can no longer carry it.

use std::cmp::Reverse;

use rand::Rng;
use tracing::debug;

use crate::config::simulation::SimulationConfig;
use crate::world::World;

/// Longest run of open water counted toward a wave's fetch.
const MAX_FETCH: i32 = 3;

/// Turn last round's deferred erosion into rocks. Sediment erodes three
/// times as easily as bedrock and goes first. Returns the mass dislodged.
pub fn apply_deferred_erosion(world: &mut World) -> i64 {
    let mut dislodged_total = 0;
    for tile in &mut world.tiles {
        let erosion = std::mem::take(&mut tile.deferred_erosion);
        if erosion <= 0 {
            continue;
        }
        let from_sediment = tile.sediment.min(3 * erosion);
        let bedrock = erosion - (from_sediment + 2) / 3;
        let dislodged = (from_sediment + bedrock.max(0)).min(tile.height);

        tile.sediment -= from_sediment.min(dislodged);
        tile.height -= dislodged;
        tile.rocks += dislodged;
        dislodged_total += dislodged as i64;
    }
    dislodged_total
}

/// Drop rocks onto a tile as sediment.
fn deposit(world: &mut World, index: usize, amount: i32) {
    if amount <= 0 {
        return;
    }
    let kept = world.add_height(index, amount);
    world.tiles[index].sediment += kept;
}

/// Rocks reaching water: a share settles in place, the rest spreads evenly
/// over neighboring water.
fn deposit_in_water(world: &mut World, index: usize, rocks: i32, config: &SimulationConfig) {
    let grid = world.grid;
    let water: Vec<usize> = grid
        .neighbors(index)
        .map(|(_, n)| n)
        .filter(|&n| world.tiles[n].is_water())
        .collect();
    if water.is_empty() {
        deposit(world, index, rocks);
        return;
    }
    let retained = rocks * config.sediment_retention / 100;
    let share = (rocks - retained) / water.len() as i32;
    deposit(world, index, rocks - share * water.len() as i32);
    for n in water {
        deposit(world, n, share);
    }
}

/// Carry rocks downstream, highest tiles first. Each land tile moves up to
/// `waterflow · steepness · transport_capacity` onward and drops the rest;
/// flat tiles flood and shed a further quarter. Returns the rocks that passed
/// through every tile.
pub fn transport_rocks(world: &mut World, config: &SimulationConfig) -> Vec<i32> {
    let grid = world.grid;
    let mut rockflow = vec![0; world.tiles.len()];
    let mut order: Vec<usize> = (0..world.tiles.len()).collect();
    order.sort_by_key(|&i| (Reverse(world.tiles[i].height), i));

    for i in order {
        let rocks = std::mem::take(&mut world.tiles[i].rocks);
        if rocks <= 0 {
            continue;
        }
        rockflow[i] += rocks;
        let tile = world.tiles[i];
        if tile.is_water() {
            deposit_in_water(world, i, rocks, config);
            continue;
        }

        let steepness = tile.steepness.unwrap_or(0) as i64;
        let capacity = (tile.waterflow.max(0) as i64 * steepness * config.transport_capacity as i64)
            .min(i32::MAX as i64) as i32;
        let mut carried = rocks.min(capacity);
        if steepness <= 1 {
            carried -= carried / 4;
        }
        deposit(world, i, rocks - carried);

        match tile
            .outflow
            .and_then(|d| grid.neighbor_index(i, d as usize))
        {
            Some(next) if carried > 0 => world.tiles[next].rocks += carried,
            _ => deposit(world, i, carried),
        }
    }

    // Rocks that ended up on a tile already passed settle there.
    for i in 0..world.tiles.len() {
        let rocks = std::mem::take(&mut world.tiles[i].rocks);
        deposit(world, i, rocks);
    }
    rockflow
}

/// Waves eat into the coast. Each sea tile erodes its land edge neighbors by
/// the open water behind it, doubled when the wind blows onshore.
pub fn coastal_erosion(world: &mut World, config: &SimulationConfig) {
    let grid = world.grid;
    let topology = grid.topology;
    for s in 0..world.tiles.len() {
        if !world.tiles[s].is_sea() {
            continue;
        }
        let weather = world.weather[s];
        for (direction, land) in grid.adjacent(s) {
            if !world.tiles[land].is_land() {
                continue;
            }
            let back = topology.opposite(direction);
            let mut fetch = 1;
            let mut current = s;
            while fetch < MAX_FETCH {
                match grid.neighbor_index(current, back) {
                    Some(n) if world.tiles[n].is_sea() => {
                        fetch += 1;
                        current = n;
                    }
                    _ => break,
                }
            }
            let onshore = weather.wind_strength > 0 && weather.wind.contains(&(direction as u8));
            let strength = fetch * if onshore { 2 } else { 1 } * config.coastal_erosion;
            world.tiles[land].deferred_erosion += strength;
        }
    }
}

/// Next round's erosion: river beds wear with the square root of
/// `waterflow · steepness`, rocks dragged along wear them further, and
/// coasts erode under the waves.
pub fn compute_deferred_erosion(world: &mut World, config: &SimulationConfig, rockflow: &[i32]) {
    for (tile, &rocks) in world.tiles.iter_mut().zip(rockflow) {
        if !tile.is_land() {
            continue;
        }
        let steepness = tile.steepness.unwrap_or(0) as i64;
        let bed = (tile.waterflow.max(0) as i64 * steepness).isqrt() as i32;
        tile.deferred_erosion += bed * config.river_erosion + rocks / config.rock_abrasion;
    }
    coastal_erosion(world, config);
}

/// Repay borrowed mass by lowering random coastal land. Returns the number
/// of landslides.
pub fn landslides(world: &mut World, rng: &mut impl Rng) -> usize {
    if world.mass_balance <= 0 {
        return 0;
    }
    let grid = world.grid;
    let level = world.sea_level;
    let mut slides = 0;
    for _ in 0..world.tiles.len() / 8 {
        if world.mass_balance <= 0 {
            break;
        }
        let i = rng.gen_range(0..world.tiles.len());
        if !world.tiles[i].is_land() || !grid.neighbors(i).any(|(_, n)| world.tiles[n].is_sea()) {
            continue;
        }
        let height = world.tiles[i].height;
        let drop = ((height - level) / 2).min(world.mass_balance.min(i32::MAX as i64) as i32);
        if drop <= 0 {
            continue;
        }
        world.adjust_height(i, height - drop);
        let tile = &mut world.tiles[i];
        tile.sediment = tile.sediment.min(tile.height);
        slides += 1;
    }
    if slides > 0 {
        debug!(slides, balance = world.mass_balance, "Landslides");
    }
    slides
}

/// Let the sea floor settle: each sea tile hands every lower sea neighbor a
/// fraction of the difference.
pub fn undersea_diffusion(world: &mut World) {
    let grid = world.grid;
    let mut delta = vec![0; world.tiles.len()];
    for s in 0..world.tiles.len() {
        if !world.tiles[s].is_sea() {
            continue;
        }
        let here = world.tiles[s].height;
        let weight = 2 * (grid.neighbors(s).count() as i32 + 2);
        for (_, n) in grid.neighbors(s) {
            let there = &world.tiles[n];
            if there.is_sea() && there.height < here {
                let moved = (here - there.height) / weight;
                delta[s] -= moved;
                delta[n] += moved;
            }
        }
    }
    for (tile, d) in world.tiles.iter_mut().zip(delta) {
        tile.height += d;
        tile.sediment = tile.sediment.min(tile.height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::generation::GenerationParams;
    use crate::simulation::hydrology::run_hydrology;
    use crate::world::generation::generate_world;
    use crate::world::tile::Terrain;
    use crate::world::topology::{Topology, WrapMode};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn slope() -> World {
        let params = GenerationParams {
            seed: 3,
            width: 16,
            height: 16,
            topology: Topology::Square,
            wrap: WrapMode::None,
            extended_tileset: false,
            land: 80,
            hill_mountain: 30,
            tempered: 50,
            water_on_land: 50,
            scenario: String::new(),
        };
        let mut world = generate_world(&params, 16, &mut ChaCha8Rng::seed_from_u64(3));
        world.sea_level = 100;
        for (i, tile) in world.tiles.iter_mut().enumerate() {
            let x = i % 16;
            if x < 3 {
                tile.terrain = Terrain::Sea;
                tile.height = 40 * x as i32 + 20;
            } else {
                tile.terrain = Terrain::Land;
                tile.height = 200 + 100 * x as i32;
            }
            tile.wetness = 300;
        }
        world
    }

    fn ledger(world: &World) -> i64 {
        world.total_mass() - world.mass_balance
    }

    #[test]
    fn sediment_erodes_before_bedrock() {
        let mut world = slope();
        let i = world.grid.index(5, 5);
        world.tiles[i].sediment = 30;
        world.tiles[i].deferred_erosion = 20;
        let height = world.tiles[i].height;
        apply_deferred_erosion(&mut world);
        // 30 sediment uses 10 of the erosion, the other 10 comes from bedrock.
        assert_eq!(world.tiles[i].sediment, 0);
        assert_eq!(world.tiles[i].rocks, 40);
        assert_eq!(world.tiles[i].height, height - 40);
        assert_eq!(world.tiles[i].deferred_erosion, 0);
    }

    #[test]
    fn thick_sediment_shields_bedrock() {
        let mut world = slope();
        let i = world.grid.index(5, 5);
        world.tiles[i].sediment = 500;
        world.tiles[i].deferred_erosion = 20;
        apply_deferred_erosion(&mut world);
        assert_eq!(world.tiles[i].sediment, 440);
        assert_eq!(world.tiles[i].rocks, 60);
    }

    #[test]
    fn erosion_and_transport_conserve_mass() {
        let mut world = slope();
        let config = SimulationConfig::default();
        run_hydrology(&mut world).unwrap();
        let before = ledger(&world);
        for _ in 0..3 {
            let rockflow = transport_rocks(&mut world, &config);
            compute_deferred_erosion(&mut world, &config, &rockflow);
            apply_deferred_erosion(&mut world);
        }
        transport_rocks(&mut world, &config);
        assert_eq!(ledger(&world), before);
        assert!(world.tiles.iter().all(|t| t.rocks == 0));
    }

    #[test]
    fn rocks_settle_in_the_sea() {
        let mut world = slope();
        let config = SimulationConfig::default();
        run_hydrology(&mut world).unwrap();
        let source = world.grid.index(9, 8);
        world.tiles[source].rocks = 5000;
        let sea_before: i64 = world
            .tiles
            .iter()
            .filter(|t| t.is_sea())
            .map(|t| t.height as i64)
            .sum();
        let rockflow = transport_rocks(&mut world, &config);
        assert_eq!(rockflow[source], 5000);
        let sea_after: i64 = world
            .tiles
            .iter()
            .filter(|t| t.is_sea())
            .map(|t| t.height as i64)
            .sum();
        assert!(sea_after > sea_before);
    }

    #[test]
    fn rivers_schedule_erosion() {
        let mut world = slope();
        let config = SimulationConfig::default();
        run_hydrology(&mut world).unwrap();
        let rockflow = vec![0; world.tiles.len()];
        compute_deferred_erosion(&mut world, &config, &rockflow);
        let mouth = world.grid.index(3, 8);
        let source = world.grid.index(15, 8);
        assert!(world.tiles[mouth].deferred_erosion > world.tiles[source].deferred_erosion);
    }

    #[test]
    fn onshore_wind_doubles_wave_erosion() {
        let mut world = slope();
        let mut config = SimulationConfig::default();
        config.coastal_erosion = 1;
        for weather in &mut world.weather {
            weather.wind_strength = 0;
        }
        coastal_erosion(&mut world, &config);
        let coast = world.grid.index(3, 8);
        // Three tiles of open sea to the west; sea above and below adds nothing.
        assert_eq!(world.tiles[coast].deferred_erosion, 3);

        for tile in &mut world.tiles {
            tile.deferred_erosion = 0;
        }
        let sea = world.grid.index(2, 8);
        world.weather[sea].wind_strength = 2;
        world.weather[sea].wind = [1, 1];
        coastal_erosion(&mut world, &config);
        assert_eq!(world.tiles[coast].deferred_erosion, 6);
    }

    #[test]
    fn landslides_repay_the_balance() {
        let mut world = slope();
        world.mass_balance = 150;
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let before = world.total_mass();
        let mut slides = 0;
        for _ in 0..50 {
            slides += landslides(&mut world, &mut rng);
        }
        assert!(slides > 0);
        assert_eq!(world.mass_balance, 0);
        assert_eq!(world.total_mass(), before - 150);
    }

    #[test]
    fn diffusion_smooths_the_sea_floor() {
        let mut world = slope();
        let before = ledger(&world);
        let deep = world.grid.index(0, 8);
        let shelf = world.grid.index(2, 8);
        let gap = world.tiles[shelf].height - world.tiles[deep].height;
        for _ in 0..10 {
            undersea_diffusion(&mut world);
        }
        assert_eq!(ledger(&world), before);
        assert!(world.tiles[shelf].height - world.tiles[deep].height < gap);
        assert!(world
            .tiles
            .iter()
            .filter(|t| t.is_sea())
            .all(|t| t.height <= world.sea_level));
    }
}
