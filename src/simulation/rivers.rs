use std::cmp::Reverse;
use std::collections::BTreeMap;

use tracing::debug;

use crate::world::lake::LakeId;
use crate::world::tile::{RiverSize, Terrain};
use crate::world::World;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiverReport {
    /// Smallest waterflow that makes a visible river, if any rivers are wanted.
    pub threshold: Option<i32>,
    pub big_threshold: Option<i32>,
    pub small: usize,
    pub big: usize,
    pub lakes_dissolved: usize,
}

/// Waterflow cut-offs for (small, big) rivers.
///
/// The number of river tiles is `land · water_on_land / 200`; the flow of the
/// last of them sets the threshold and the top quarter are big.
pub fn river_thresholds(world: &World) -> Option<(i32, i32)> {
    let mut flows: Vec<i32> = world
        .tiles
        .iter()
        .filter(|t| t.is_land())
        .map(|t| t.waterflow)
        .collect();
    let count = flows.len() * world.params.water_on_land.max(0) as usize / 200;
    if count == 0 {
        return None;
    }
    flows.sort_unstable_by_key(|&f| Reverse(f));
    let threshold = flows[count.min(flows.len()) - 1].max(1);
    let big = flows[(count / 4).max(1) - 1].max(threshold);
    Some((threshold, big))
}

/// Dissolve lakes that no river needs and that are one tile deep around
/// their outflow. Their tiles become land at the outflow's height, pointing
/// straight at it.
pub fn dissolve_lakes(world: &mut World, threshold: i32) -> usize {
    let grid = world.grid;
    let mut members: BTreeMap<LakeId, Vec<usize>> = BTreeMap::new();
    let mut inflows: BTreeMap<LakeId, Vec<i32>> = BTreeMap::new();
    for (i, tile) in world.tiles.iter().enumerate() {
        if tile.is_lake()
            && let Some(id) = tile.lake
        {
            members.entry(world.lakes.root(id)).or_default().push(i);
        } else if tile.is_land()
            && let Some(next) = tile.outflow.and_then(|d| grid.neighbor_index(i, d as usize))
            && let Some(id) = world.tiles[next].lake
            && world.tiles[next].is_lake()
        {
            inflows.entry(world.lakes.root(id)).or_default().push(tile.waterflow);
        }
    }

    let mut dissolved = 0;
    for (id, tiles) in members {
        let Some(outlet) = world.lakes.get(id).outflow else {
            continue;
        };
        let outlet_tile = world.tiles[outlet];
        let fed_only_by_rivers = inflows
            .get(&id)
            .is_some_and(|flows| flows.iter().all(|&f| f >= threshold));
        if outlet_tile.waterflow >= threshold && !fed_only_by_rivers {
            continue;
        }

        let directions: Option<Vec<usize>> = tiles
            .iter()
            .map(|&m| grid.adjacent(m).find(|&(_, n)| n == outlet).map(|(d, _)| d))
            .collect();
        let Some(directions) = directions else {
            continue;
        };

        for (&m, direction) in tiles.iter().zip(directions) {
            world.adjust_height(m, outlet_tile.height);
            let tile = &mut world.tiles[m];
            tile.terrain = Terrain::Land;
            tile.lake = None;
            tile.outflow = Some(direction as u8);
            tile.steepness = Some(0);
            tile.waterflow = outlet_tile.waterflow;
            tile.sediment = tile.sediment.min(tile.height);
        }
        world.lakes.delete(id);
        dissolved += 1;
    }
    dissolved
}

/// Mark visible rivers from every tile at or above the threshold and from
/// every lake's outflow, walking down until sea, a lake or an already marked
/// river. Returns (small, big) tile counts.
pub fn mark_rivers(world: &mut World, threshold: i32, big_threshold: i32) -> (usize, usize) {
    let grid = world.grid;
    let mut starts: Vec<usize> = (0..world.tiles.len())
        .filter(|&i| world.tiles[i].is_land() && world.tiles[i].waterflow >= threshold)
        .collect();
    starts.sort_by_key(|&i| (Reverse(world.tiles[i].waterflow), i));
    starts.extend(world.lakes.active().filter_map(|lake| lake.outflow));

    let (mut small, mut big) = (0, 0);
    for start in starts {
        let mut current = start;
        for _ in 0..world.tiles.len() {
            let tile = &mut world.tiles[current];
            if !tile.is_land() || tile.river != RiverSize::None {
                break;
            }
            if tile.waterflow >= big_threshold {
                tile.river = RiverSize::Big;
                big += 1;
            } else {
                tile.river = RiverSize::Small;
                small += 1;
            }
            match tile.outflow.and_then(|d| grid.neighbor_index(current, d as usize)) {
                Some(next) => current = next,
                None => break,
            }
        }
    }
    (small, big)
}

/// Pick the thresholds, thin out lakes and mark rivers.
pub fn classify_rivers(world: &mut World) -> RiverReport {
    let thresholds = river_thresholds(world);
    let lakes_dissolved = dissolve_lakes(world, thresholds.map_or(i32::MAX, |(t, _)| t));
    let (small, big) = match thresholds {
        Some((threshold, big)) => mark_rivers(world, threshold, big),
        None => (0, 0),
    };
    let report = RiverReport {
        threshold: thresholds.map(|(t, _)| t),
        big_threshold: thresholds.map(|(_, b)| b),
        small,
        big,
        lakes_dissolved,
    };
    debug!(
        threshold = ?report.threshold,
        small,
        big,
        dissolved = lakes_dissolved,
        "Rivers classified"
    );
    report
}
