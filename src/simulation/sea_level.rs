use std::collections::VecDeque;

use tracing::debug;

use crate::config::simulation::SimulationConfig;
use crate::world::tile::{Terrain, MAX_HEIGHT};
use crate::world::World;

/// Outcome of one sea level pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeaLevelReport {
    pub level: i32,
    pub sea_tiles: usize,
    /// Land tiles raised off the level to keep sea and land apart.
    pub raised: usize,
    /// Landlocked sea tiles filled in.
    pub filled: usize,
}

/// Pick the sea level so that the requested share of the map is land, then
/// classify every tile and recompute temperatures.
///
/// Every sea tile ends up at or below the level and every land or lake tile
/// strictly above it.
pub fn update_sea_level(world: &mut World, config: &SimulationConfig) -> SeaLevelReport {
    let n = world.tiles.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&i| (world.tiles[i].height, i));

    let land_tiles = world.params.land as usize * n / 100;
    let sea_tiles = n.saturating_sub(land_tiles).max(1);
    let level = world.tiles[order[sea_tiles - 1]].height;

    let mut raised = 0;
    for (rank, &i) in order.iter().enumerate() {
        if rank < sea_tiles {
            world.tiles[i].terrain = Terrain::Sea;
            continue;
        }
        if world.tiles[i].height <= level {
            world.adjust_height(i, level + 1);
            raised += 1;
        }
        if world.tiles[i].is_sea() {
            world.tiles[i].terrain = Terrain::Land;
        }
    }
    world.sea_level = level;

    let filled = fill_landlocked_seas(world, config.min_sea_size);
    update_temperatures(world);

    let report = SeaLevelReport {
        level,
        sea_tiles: world.count_terrain(Terrain::Sea),
        raised,
        filled,
    };
    debug!(
        level,
        sea = report.sea_tiles,
        raised,
        filled,
        "Sea level updated"
    );
    report
}

/// Raise small sea bodies cut off from the ocean to just above the level.
/// The largest body is never filled.
pub fn fill_landlocked_seas(world: &mut World, min_size: usize) -> usize {
    let grid = world.grid;
    let mut body = vec![usize::MAX; world.tiles.len()];
    let mut bodies: Vec<Vec<usize>> = Vec::new();

    for start in 0..world.tiles.len() {
        if !world.tiles[start].is_sea() || body[start] != usize::MAX {
            continue;
        }
        let id = bodies.len();
        let mut members = vec![start];
        let mut queue = VecDeque::from([start]);
        body[start] = id;
        while let Some(i) = queue.pop_front() {
            for (_, n) in grid.neighbors(i) {
                if world.tiles[n].is_sea() && body[n] == usize::MAX {
                    body[n] = id;
                    members.push(n);
                    queue.push_back(n);
                }
            }
        }
        bodies.push(members);
    }

    let Some(largest) = (0..bodies.len()).max_by_key(|&b| (bodies[b].len(), usize::MAX - b)) else {
        return 0;
    };
    let target = (world.sea_level + 1).min(MAX_HEIGHT);
    let mut filled = 0;
    for (b, members) in bodies.iter().enumerate() {
        if b == largest || members.len() >= min_size {
            continue;
        }
        for &i in members {
            world.adjust_height(i, target);
            world.tiles[i].terrain = Terrain::Land;
            filled += 1;
        }
    }
    filled
}

/// Sea tiles take the sea baseline; land cools with height above the level.
/// The result is averaged twice over each neighborhood.
pub fn update_temperatures(world: &mut World) {
    let grid = world.grid;
    let level = world.sea_level;
    let mut temperatures: Vec<i32> = world
        .tiles
        .iter()
        .zip(&world.weather)
        .map(|(tile, weather)| {
            if tile.is_sea() {
                weather.sea_temperature
            } else {
                weather.land_temperature - (tile.height - level) / 111
            }
        })
        .collect();

    for _ in 0..2 {
        temperatures = (0..grid.len())
            .map(|i| {
                let mut sum = 2 * temperatures[i];
                let mut weight = 2;
                for (_, n) in grid.neighbors(i) {
                    sum += temperatures[n];
                    weight += 1;
                }
                let half = weight / 2;
                if sum < 0 {
                    (sum - half) / weight
                } else {
                    (sum + half) / weight
                }
            })
            .collect();
    }

    for (tile, temperature) in world.tiles.iter_mut().zip(temperatures) {
        tile.temperature = temperature;
    }
}
