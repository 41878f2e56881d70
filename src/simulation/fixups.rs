//! Touch-ups after the last round so no lake touches the sea and no island
//! is a single tile.

use std::collections::VecDeque;

use rand::Rng;
use tracing::debug;

use crate::simulation::hydrology::compute_outflow;
use crate::world::tile::{RiverSize, Terrain};
use crate::world::World;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixupReport {
    pub lake_tiles_to_sea: usize,
    pub islands_drowned: usize,
    pub islands_doubled: usize,
}

/// Turn a tile into sea at or below the sea level.
fn flood(world: &mut World, index: usize) {
    let level = world.sea_level;
    if world.tiles[index].height > level {
        world.adjust_height(index, level);
    }
    if let Some(id) = world.lake_of(index) {
        let lake = world.lakes.get_mut(id);
        lake.tile_count = lake.tile_count.saturating_sub(1);
    }
    let tile = &mut world.tiles[index];
    tile.terrain = Terrain::Sea;
    tile.lake = None;
    tile.river = RiverSize::None;
    tile.outflow = None;
    tile.steepness = None;
    tile.sediment = tile.sediment.min(tile.height);
}

/// Convert every lake region that touches the sea into sea.
pub fn lakes_to_sea(world: &mut World) -> usize {
    let grid = world.grid;
    let mut queue: VecDeque<usize> = (0..world.tiles.len())
        .filter(|&i| {
            world.tiles[i].is_lake() && grid.neighbors(i).any(|(_, n)| world.tiles[n].is_sea())
        })
        .collect();

    let mut converted = 0;
    while let Some(i) = queue.pop_front() {
        if !world.tiles[i].is_lake() {
            continue;
        }
        flood(world, i);
        converted += 1;
        queue.extend(
            grid.neighbors(i)
                .map(|(_, n)| n)
                .filter(|&n| world.tiles[n].is_lake()),
        );
    }
    converted
}

/// Drown or double every land tile whose whole neighborhood is sea.
pub fn fix_single_islands(world: &mut World, rng: &mut impl Rng) -> (usize, usize) {
    let grid = world.grid;
    let (mut drowned, mut doubled) = (0, 0);
    for i in 0..world.tiles.len() {
        if !world.tiles[i].is_land() {
            continue;
        }
        let neighbors: Vec<usize> = grid.neighbors(i).map(|(_, n)| n).collect();
        if neighbors.is_empty() || !neighbors.iter().all(|&n| world.tiles[n].is_sea()) {
            continue;
        }
        let k = rng.gen_range(0..2 * neighbors.len());
        if k >= neighbors.len() {
            flood(world, i);
            drowned += 1;
        } else {
            let n = neighbors[k];
            world.adjust_height(n, world.sea_level + 1);
            let tile = &mut world.tiles[n];
            tile.terrain = Terrain::Land;
            tile.sediment = tile.sediment.min(tile.height);
            compute_outflow(world, n);
            compute_outflow(world, i);
            doubled += 1;
        }
    }
    (drowned, doubled)
}

pub fn apply_fixups(world: &mut World, rng: &mut impl Rng) -> FixupReport {
    let lake_tiles_to_sea = lakes_to_sea(world);
    let (islands_drowned, islands_doubled) = fix_single_islands(world, rng);
    let report = FixupReport {
        lake_tiles_to_sea,
        islands_drowned,
        islands_doubled,
    };
    debug!(
        lake_tiles = lake_tiles_to_sea,
        drowned = islands_drowned,
        doubled = islands_doubled,
        "Terrain fixups applied"
    );
    report
}
