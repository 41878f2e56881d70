//! Flow routing, runoff walks and lake formation.
//!
//! Every land tile points at one edge neighbor. Runoff is walked down those
//! pointers until it reaches the sea; a walk that gets stuck in a pit floods
//! it into a lake, growing lowest-first until a spill point is found. Lakes
//! that grow into each other are merged.

use std::cmp::Reverse;

use tracing::{debug, trace};

use crate::error::GenerationError;
use crate::world::lake::LakeId;
use crate::world::tile::{log2_floor, steepness_for_drop, RiverSize, Terrain};
use crate::world::World;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HydrologyReport {
    pub walks: usize,
    pub lakes_formed: usize,
    pub merges: usize,
}

/// Clear last pass's routing. Lakes are rebuilt from scratch every pass.
pub fn reset_drainage(world: &mut World) {
    for tile in &mut world.tiles {
        tile.old_flow = log2_floor(tile.waterflow);
        tile.waterflow = 0;
        tile.steepness = None;
        tile.outflow = None;
        tile.lake = None;
        tile.mark = false;
        tile.river = RiverSize::None;
        if tile.is_lake() {
            tile.terrain = Terrain::Land;
        }
    }
    world.lakes.clear();
}

/// Choose the downstream edge neighbor of a land tile.
///
/// The sea wins outright. Otherwise a strictly lower neighbor already
/// carrying a stronger river than this tile is preferred, so rivers join.
/// Failing that the lowest neighbor is taken, even when it is not lower.
pub fn compute_outflow(world: &mut World, index: usize) {
    let grid = world.grid;
    let here = world.tiles[index];
    let mut sea: Option<(i32, usize, usize)> = None;
    let mut river: Option<(i32, usize, usize)> = None;
    let mut lowest: Option<(i32, usize, usize)> = None;

    for (direction, n) in grid.adjacent(index) {
        let there = &world.tiles[n];
        if there.is_sea() {
            if sea.is_none_or(|(h, _, _)| there.height < h) {
                sea = Some((there.height, direction, n));
            }
            continue;
        }
        if lowest.is_none_or(|(h, _, _)| there.height < h) {
            lowest = Some((there.height, direction, n));
        }
        if there.height < here.height
            && there.old_flow > here.old_flow.max(1)
            && river.is_none_or(|(flow, _, _)| there.old_flow > flow)
        {
            river = Some((there.old_flow, direction, n));
        }
    }

    let river = river.map(|(_, d, n)| (world.tiles[n].height, d, n));
    let Some((height, direction, _)) = sea.or(river).or(lowest) else {
        return;
    };
    let tile = &mut world.tiles[index];
    tile.outflow = Some(direction as u8);
    tile.steepness = Some(steepness_for_drop(here.height - height.max(world.sea_level)));
}

/// Route all runoff for this round, forming lakes where it pools.
pub fn run_hydrology(world: &mut World) -> Result<HydrologyReport, GenerationError> {
    reset_drainage(world);
    for i in 0..world.tiles.len() {
        if world.tiles[i].is_land() {
            compute_outflow(world, i);
        }
    }

    let mut order: Vec<usize> = (0..world.tiles.len())
        .filter(|&i| world.tiles[i].is_land())
        .collect();
    order.sort_by_key(|&i| (Reverse(world.tiles[i].height), i));

    let mut report = HydrologyReport::default();
    for (serial, &i) in (1u32..).zip(order.iter()) {
        let tile = &mut world.tiles[i];
        let steepness = tile.steepness.unwrap_or(0) as i32;
        let runoff = 3 * tile.wetness / (7 - steepness / 3).max(1);
        tile.wetness -= runoff;
        let flow = if runoff > 0 { 1 + log2_floor(runoff) } else { 0 };

        let start = if world.tiles[i].is_lake() {
            lake_outlet(world, i)?
        } else {
            i
        };
        walk(world, start, flow, serial, &mut report)?;
        report.walks += 1;
    }

    debug!(
        walks = report.walks,
        lakes = world.lakes.active_count(),
        formed = report.lakes_formed,
        merges = report.merges,
        "Hydrology pass complete"
    );
    Ok(report)
}

fn missing_outflow(world: &World, index: usize) -> GenerationError {
    let (x, y) = world.grid.coords(index);
    GenerationError::MissingOutflow { x, y }
}

/// Tile the water of a lake tile leaves through.
pub fn lake_outlet(world: &mut World, index: usize) -> Result<usize, GenerationError> {
    let id = world.lake_of(index).ok_or_else(|| missing_outflow(world, index))?;
    world
        .lakes
        .get(id)
        .outflow
        .ok_or_else(|| missing_outflow(world, index))
}

fn downstream(world: &World, index: usize) -> Result<usize, GenerationError> {
    world.tiles[index]
        .outflow
        .and_then(|d| world.grid.neighbor_index(index, d as usize))
        .ok_or_else(|| missing_outflow(world, index))
}

/// Carry `flow` from `start` down to the sea. A walk without flow stops at
/// the first tile an earlier walk already passed.
fn walk(
    world: &mut World,
    start: usize,
    flow: i32,
    serial: u32,
    report: &mut HydrologyReport,
) -> Result<(), GenerationError> {
    let mut current = start;
    for _ in 0..world.tiles.len() * 4 {
        let tile = &mut world.tiles[current];
        if tile.is_sea() {
            tile.waterflow += flow;
            return Ok(());
        }
        if flow == 0 && tile.mark {
            return Ok(());
        }
        tile.mark = true;
        tile.waterflow += flow;

        if tile.is_lake() {
            current = lake_outlet(world, current)?;
            continue;
        }
        let next = downstream(world, current)?;
        if world.tiles[next].is_water() || world.tiles[next].height < world.tiles[current].height {
            current = next;
        } else {
            current = form_lake(world, current, serial, report)?;
        }
    }
    let (x, y) = world.grid.coords(start);
    Err(GenerationError::RiverLoop { x, y })
}

/// Whether water entering `start` reaches the sea or an unresolved pit
/// without passing through the lake `root` or the tile `spill`.
fn drains_away(world: &World, start: usize, root: LakeId, spill: usize) -> bool {
    let mut current = start;
    for _ in 0..world.tiles.len() * 4 {
        if current == spill {
            return false;
        }
        let tile = &world.tiles[current];
        match tile.terrain {
            Terrain::Sea => return true,
            Terrain::Lake => {
                let Some(id) = tile.lake else {
                    return true;
                };
                let lake = world.lakes.root(id);
                if lake == root {
                    return false;
                }
                match world.lakes.get(lake).outflow {
                    Some(outlet) => current = outlet,
                    None => return true,
                }
            }
            Terrain::Land => {
                let Some(next) = tile
                    .outflow
                    .and_then(|d| world.grid.neighbor_index(current, d as usize))
                else {
                    return true;
                };
                let there = &world.tiles[next];
                if there.is_land() && there.height >= tile.height {
                    return true;
                }
                current = next;
            }
        }
    }
    false
}

/// Best spill target of `spill` for the lake `root`, as (direction, tile).
///
/// Sea beats everything. Next come strictly lower land and lakes with a lower
/// surface, then another walk's lake at exactly this lake's surface. Lower
/// candidates beat higher ones within a rank. A candidate whose water would
/// come back into this lake is rejected.
fn find_exit(world: &World, root: LakeId, spill: usize, serial: u32) -> Option<(usize, usize)> {
    let surface = world.lakes.get(root).height;
    let spill_height = world.tiles[spill].height;
    let mut best: Option<(u8, i32, usize, usize)> = None;

    for (direction, n) in world.grid.adjacent(spill) {
        let there = &world.tiles[n];
        let candidate = match there.terrain {
            Terrain::Sea => Some((0, there.height)),
            Terrain::Land => (there.height < spill_height && drains_away(world, n, root, spill))
                .then_some((1, there.height)),
            Terrain::Lake => there.lake.and_then(|id| {
                let other = world.lakes.get(id);
                if world.lakes.root(id) == root {
                    None
                } else if other.height < spill_height {
                    drains_away(world, n, root, spill).then_some((1, other.height))
                } else if other.height == surface && other.serial != serial {
                    drains_away(world, n, root, spill).then_some((2, other.height))
                } else {
                    None
                }
            }),
        };
        if let Some((rank, height)) = candidate
            && best.is_none_or(|(r, h, _, _)| (rank, height) < (r, h))
        {
            best = Some((rank, height, direction, n));
        }
    }
    best.map(|(_, _, direction, n)| (direction, n))
}

/// Merge `other` into the growing lake and queue the former outlets.
fn merge(
    world: &mut World,
    root: LakeId,
    other: LakeId,
    serial: u32,
    report: &mut HydrologyReport,
) -> LakeId {
    let (survivor, outlets) = world.lakes.union(root, other, serial);
    report.merges += 1;
    for outlet in outlets {
        if world.tiles[outlet].is_land() {
            let height = world.tiles[outlet].height;
            world.lakes.push_frontier(survivor, outlet, height);
        }
    }
    survivor
}

/// Make `index` a member of the lake and queue its edge neighbors. Adjacent
/// lakes that were not spill targets are merged in.
fn absorb(
    world: &mut World,
    mut root: LakeId,
    index: usize,
    serial: u32,
    report: &mut HydrologyReport,
) -> LakeId {
    let tile = &mut world.tiles[index];
    tile.terrain = Terrain::Lake;
    tile.lake = Some(root);
    tile.outflow = None;
    tile.steepness = Some(0);
    world.lakes.get_mut(root).tile_count += 1;

    let grid = world.grid;
    for (_, n) in grid.adjacent(index) {
        let there = world.tiles[n];
        match there.terrain {
            Terrain::Sea => {}
            Terrain::Land => {
                world.lakes.push_frontier(root, n, there.height);
            }
            Terrain::Lake => {
                if let Some(id) = there.lake {
                    let other = world.lakes.find(id);
                    if other != root {
                        root = merge(world, root, other, serial, report);
                    }
                }
            }
        }
    }
    root
}

/// Flood the pit at `pit` into a lake and return the lake's outflow tile.
pub fn form_lake(
    world: &mut World,
    pit: usize,
    serial: u32,
    report: &mut HydrologyReport,
) -> Result<usize, GenerationError> {
    let id = world.lakes.create(serial, world.tiles[pit].height)?;
    report.lakes_formed += 1;
    let mut root = absorb(world, id, pit, serial, report);

    loop {
        let Some((spill, _)) = world.lakes.pop_frontier(root) else {
            let (x, y) = world.grid.coords(pit);
            return Err(GenerationError::EmptyLakeQueue { x, y });
        };
        let tile = world.tiles[spill];
        match tile.terrain {
            Terrain::Sea => continue,
            Terrain::Lake => {
                if let Some(other) = tile.lake.map(|id| world.lakes.find(id))
                    && other != root
                {
                    root = merge(world, root, other, serial, report);
                }
                continue;
            }
            Terrain::Land => {}
        }

        let lake = world.lakes.get_mut(root);
        lake.height = lake.height.max(tile.height);

        if let Some((direction, exit)) = find_exit(world, root, spill, serial) {
            let floor = world.tiles[exit].height.max(world.sea_level);
            let outflow = &mut world.tiles[spill];
            outflow.outflow = Some(direction as u8);
            outflow.steepness = Some(steepness_for_drop(tile.height - floor));
            world.lakes.get_mut(root).outflow = Some(spill);
            trace!(
                pit,
                spill,
                exit,
                height = world.lakes.get(root).height,
                "Lake found its outflow"
            );
            return Ok(spill);
        }
        root = absorb(world, root, spill, serial, report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::generation::GenerationParams;
    use crate::world::generation::generate_world;
    use crate::world::topology::{Topology, WrapMode};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// A 16x16 unwrapped square map: sea along the left column, land rising
    /// to the right.
    fn slope() -> World {
        let params = GenerationParams {
            seed: 3,
            width: 16,
            height: 16,
            topology: Topology::Square,
            wrap: WrapMode::None,
            extended_tileset: false,
            land: 90,
            hill_mountain: 30,
            tempered: 50,
            water_on_land: 50,
            scenario: String::new(),
        };
        let mut world = generate_world(&params, 16, &mut ChaCha8Rng::seed_from_u64(3));
        world.sea_level = 100;
        for (i, tile) in world.tiles.iter_mut().enumerate() {
            let x = i % 16;
            if x == 0 {
                tile.terrain = Terrain::Sea;
                tile.height = 100;
            } else {
                tile.terrain = Terrain::Land;
                tile.height = 200 + 100 * x as i32;
            }
            tile.wetness = 100;
        }
        world
    }

    fn reaches_sea(world: &World, start: usize) -> bool {
        let mut current = start;
        for _ in 0..world.tiles.len() * 4 {
            let tile = &world.tiles[current];
            if tile.is_sea() {
                return true;
            }
            current = if tile.is_lake() {
                let Some(outlet) = tile.lake.and_then(|id| world.lakes.get(id).outflow) else {
                    return false;
                };
                outlet
            } else {
                let Some(next) = tile
                    .outflow
                    .and_then(|d| world.grid.neighbor_index(current, d as usize))
                else {
                    return false;
                };
                next
            };
        }
        false
    }

    #[test]
    fn water_runs_straight_downhill() {
        let mut world = slope();
        run_hydrology(&mut world).unwrap();
        let i = world.grid.index(5, 7);
        assert_eq!(world.tiles[i].outflow, Some(0));
        assert_eq!(world.lakes.active_count(), 0);
        // Each column passes on the runoff of every column above it.
        let near = world.tiles[world.grid.index(1, 7)].waterflow;
        let far = world.tiles[world.grid.index(14, 7)].waterflow;
        assert!(near > far);
    }

    #[test]
    fn sea_beats_a_lower_land_neighbor() {
        let mut world = slope();
        let i = world.grid.index(1, 7);
        let below = world.grid.index(1, 8);
        world.tiles[below].height = 60;
        world.tiles[i].height = 400;
        compute_outflow(&mut world, i);
        assert_eq!(world.tiles[i].outflow, Some(0));
    }

    #[test]
    fn rivers_join_stronger_flow() {
        let mut world = slope();
        let i = world.grid.index(6, 6);
        let side = world.grid.index(6, 7);
        world.tiles[side].height = world.tiles[i].height - 10;
        world.tiles[side].old_flow = 5;
        world.tiles[i].old_flow = 1;
        compute_outflow(&mut world, i);
        assert_eq!(world.tiles[i].outflow, Some(3));
    }

    #[test]
    fn pit_becomes_a_lake_with_outflow() {
        let mut world = slope();
        let pit = world.grid.index(8, 8);
        world.tiles[pit].height = 300;
        run_hydrology(&mut world).unwrap();

        assert!(world.tiles[pit].is_lake());
        let id = world.lake_of(pit).unwrap();
        let lake = world.lakes.get(id);
        let outlet = lake.outflow.unwrap();
        assert!(!world.tiles[outlet].is_lake());
        assert!(lake.height >= world.tiles[pit].height);
        assert!(reaches_sea(&world, pit));
    }

    #[test]
    fn basin_fills_to_its_rim() {
        let mut world = slope();
        // A flat 3x3 bowl below everything around it.
        for y in 6..=8 {
            for x in 7..=9 {
                let i = world.grid.index(x, y);
                world.tiles[i].height = 500;
            }
        }
        run_hydrology(&mut world).unwrap();
        let centre = world.grid.index(8, 7);
        assert!(world.tiles[centre].is_lake());
        let id = world.lake_of(centre).unwrap();
        assert!(world.lakes.get(id).tile_count >= 1);
        for i in 0..world.tiles.len() {
            if world.tiles[i].is_land() || world.tiles[i].is_lake() {
                assert!(reaches_sea(&world, i), "tile {} does not drain", i);
            }
        }
    }

    #[test]
    fn every_land_tile_drains_on_generated_maps() {
        for topology in Topology::all() {
            for wrap in [WrapMode::None, WrapMode::X, WrapMode::XY] {
                let params = GenerationParams {
                    seed: 77,
                    width: 20,
                    height: 16,
                    topology,
                    wrap,
                    extended_tileset: false,
                    land: 40,
                    hill_mountain: 30,
                    tempered: 50,
                    water_on_land: 50,
                    scenario: String::new(),
                };
                let mut world = generate_world(&params, 20, &mut ChaCha8Rng::seed_from_u64(77));
                crate::simulation::sea_level::update_sea_level(
                    &mut world,
                    &crate::config::simulation::SimulationConfig::default(),
                );
                for tile in &mut world.tiles {
                    tile.wetness = 200;
                }
                run_hydrology(&mut world).unwrap();
                for i in 0..world.tiles.len() {
                    if !world.tiles[i].is_sea() {
                        assert!(reaches_sea(&world, i), "{:?}/{:?}: tile {}", topology, wrap, i);
                    }
                }
            }
        }
    }

    /// Turn the tile at (x, y) into a one-tile lake with the given surface.
    fn lake_at(world: &mut World, x: usize, y: usize, serial: u32, surface: i32) -> LakeId {
        let i = world.grid.index(x, y);
        let id = world.lakes.create(serial, surface).unwrap();
        world.lakes.get_mut(id).tile_count = 1;
        let tile = &mut world.tiles[i];
        tile.terrain = Terrain::Lake;
        tile.lake = Some(id);
        tile.height = surface;
        id
    }

    /// The slope with the tile at (8, 8) lowered to 700, below all four of
    /// its edge neighbors, and a growing lake whose surface matches it.
    fn spill_setup() -> (World, LakeId, usize) {
        let mut world = slope();
        let spill = world.grid.index(8, 8);
        world.tiles[spill].height = 700;
        let root = world.lakes.create(1, 700).unwrap();
        world.lakes.get_mut(root).tile_count = 1;
        (world, root, spill)
    }

    #[test]
    fn no_exit_when_every_neighbor_is_higher() {
        let (world, root, spill) = spill_setup();
        assert_eq!(find_exit(&world, root, spill, 1), None);
    }

    #[test]
    fn sea_beats_lower_land_at_the_spill() {
        let (mut world, root, spill) = spill_setup();
        let west = world.grid.index(7, 8);
        let south = world.grid.index(8, 9);
        world.tiles[west].height = 150;
        world.tiles[south].terrain = Terrain::Sea;
        world.tiles[south].height = 400;
        assert_eq!(find_exit(&world, root, spill, 1), Some((3, south)));
    }

    #[test]
    fn lower_land_beats_a_lake_at_the_surface() {
        let (mut world, root, spill) = spill_setup();
        lake_at(&mut world, 7, 8, 5, 700);
        let east = world.grid.index(9, 8);
        world.tiles[east].height = 650;
        assert_eq!(find_exit(&world, root, spill, 1), Some((1, east)));
    }

    #[test]
    fn lowest_candidate_wins_within_a_rank() {
        let (mut world, root, spill) = spill_setup();
        let east = world.grid.index(9, 8);
        let north = world.grid.index(8, 7);
        world.tiles[east].height = 650;
        world.tiles[north].height = 500;
        assert_eq!(find_exit(&world, root, spill, 1), Some((2, north)));
    }

    #[test]
    fn same_height_lake_of_this_walk_is_refused() {
        let (mut world, root, spill) = spill_setup();
        let west = world.grid.index(7, 8);
        lake_at(&mut world, 7, 8, 1, 700);
        assert_eq!(find_exit(&world, root, spill, 1), None);
        // Another walk's lake at the same surface is a valid exit.
        assert_eq!(find_exit(&world, root, spill, 2), Some((0, west)));
    }

    #[test]
    fn exit_leading_back_into_the_lake_is_rejected() {
        let (mut world, root, spill) = spill_setup();
        // East is a lower lake that spills through our spill tile.
        let east = lake_at(&mut world, 9, 8, 3, 650);
        world.lakes.get_mut(east).outflow = Some(spill);
        // West runs north into a member of the growing lake.
        let west = world.grid.index(7, 8);
        world.tiles[west].height = 600;
        world.tiles[west].outflow = Some(2);
        let member = world.grid.index(7, 7);
        world.tiles[member].terrain = Terrain::Lake;
        world.tiles[member].lake = Some(root);
        world.tiles[member].height = 550;
        assert_eq!(find_exit(&world, root, spill, 1), None);

        // Pointed away from the lake, west becomes the exit.
        world.tiles[west].outflow = Some(0);
        assert_eq!(find_exit(&world, root, spill, 1), Some((0, west)));
    }

    #[test]
    fn lake_members_sit_below_their_surface() {
        let mut world = slope();
        for (x, y, h) in [(4, 4, 250), (5, 4, 260), (4, 5, 255), (10, 10, 600)] {
            let i = world.grid.index(x, y);
            world.tiles[i].height = h;
        }
        run_hydrology(&mut world).unwrap();
        for i in 0..world.tiles.len() {
            if world.tiles[i].is_lake() {
                let id = world.lake_of(i).unwrap();
                assert!(world.tiles[i].height <= world.lakes.get(id).height);
            }
        }
    }
}
