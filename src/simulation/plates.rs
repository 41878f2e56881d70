use std::collections::VecDeque;

use glam::{IVec2, Vec2};
use rand::Rng;
use tracing::trace;

use crate::world::plate::{update_radii, Plate};
use crate::world::tile::MAX_HEIGHT;
use crate::world::topology::Grid;
use crate::world::World;

/// Height above which a spilling mountain is brought back down.
const SPILL_FLOOR: i32 = 9000;

/// Advance every plate by its velocity. A plate whose center has come closer
/// to a neighbor of its anchor than to the anchor itself shifts its tiles one
/// step in that direction. Returns the number of plates that moved.
pub fn advance_plates(world: &mut World, rng: &mut impl Rng) -> usize {
    let grid = world.grid;
    let mut moves = 0;
    for p in 0..world.plates.len() {
        let plate = &mut world.plates[p];
        plate.center += plate.velocity;
        keep_on_map(&grid, plate);

        let Some((direction, anchor)) = best_step(&grid, plate) else {
            continue;
        };
        let id = plate.id;
        let old_anchor = plate.anchor;
        move_plate(world, id, old_anchor, direction, rng);
        world.plates[p].anchor = anchor;
        moves += 1;
    }
    update_radii(&grid, &world.tiles, &mut world.plates);
    moves
}

/// Wrap the center around periodic axes and bounce it off map edges.
fn keep_on_map(grid: &Grid, plate: &mut Plate) {
    let limits = Vec2::new(grid.width as f32, grid.height as f32);
    let wraps = [grid.wraps_x(), grid.wraps_y()];
    for axis in 0..2 {
        if wraps[axis] {
            plate.center[axis] = plate.center[axis].rem_euclid(limits[axis]);
        } else if plate.center[axis] < 0.0 || plate.center[axis] > limits[axis] - 1.0 {
            plate.center[axis] = plate.center[axis].clamp(0.0, limits[axis] - 1.0);
            plate.velocity[axis] = -plate.velocity[axis];
        }
    }
}

/// Direction and new anchor bringing the anchor closest to the center, if
/// that is closer than staying put.
fn best_step(grid: &Grid, plate: &Plate) -> Option<(usize, Vec2)> {
    let mut best_distance = grid.sqdist(plate.center, plate.anchor);
    let mut best = None;
    let (ax, ay) = (plate.anchor.x as usize, plate.anchor.y as usize);
    for direction in 0..grid.topology.neighbor_count() {
        let Some((nx, ny)) = grid.neighbor(ax, ay, direction) else {
            continue;
        };
        let candidate = Vec2::new(nx as f32, ny as f32);
        let distance = grid.sqdist(plate.center, candidate);
        if distance < best_distance {
            best_distance = distance;
            best = Some((direction, candidate));
        }
    }
    best
}

/// Tiles within `radius` of `anchor` along each axis.
fn bounding_box(grid: &Grid, anchor: Vec2, radius: IVec2) -> Vec<usize> {
    let span = |center: f32, r: i32, size: usize, wraps: bool| -> Vec<i64> {
        let (center, r) = (center as i64, r as i64);
        if wraps && 2 * r + 1 >= size as i64 {
            (0..size as i64).collect()
        } else {
            (center - r..=center + r).collect()
        }
    };
    let xs = span(anchor.x, radius.x, grid.width, grid.wraps_x());
    let ys = span(anchor.y, radius.y, grid.height, grid.wraps_y());
    ys.iter()
        .flat_map(|&y| xs.iter().filter_map(move |&x| grid.normalize(x, y)))
        .map(|(x, y)| grid.index(x, y))
        .collect()
}

/// Shift every tile of a plate one step in `direction`. Only tiles inside
/// the plate's bounding radius around `anchor` are swept.
///
/// Tiles ahead are swept before tiles behind. Trailing tiles keep part of
/// their crust and are usually abandoned, leaving a rift. Leading tiles pile
/// their crust onto the tile ahead, which the plate usually claims. Every
/// unit of height ends up somewhere on the map.
pub fn move_plate(
    world: &mut World,
    id: u8,
    anchor: Vec2,
    direction: usize,
    rng: &mut impl Rng,
) {
    let grid = world.grid;
    let heading = Vec2::from_angle(grid.topology.direction_angle(direction).to_radians());

    let radius = world
        .plates
        .iter()
        .find(|p| p.id == id)
        .map_or(IVec2::ZERO, |p| p.radius);
    let mut owned: Vec<(f32, usize)> = bounding_box(&grid, anchor, radius)
        .into_iter()
        .filter(|&i| world.tiles[i].plate == id)
        .map(|i| (grid.delta(grid.tile_position(i), anchor).dot(heading), i))
        .collect();
    owned.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));

    let owners: Vec<u8> = world.tiles.iter().map(|t| t.plate).collect();
    let crust: Vec<(i32, i32)> = world
        .tiles
        .iter()
        .map(|t| (t.height, t.sediment))
        .collect();
    let mut collisions = Vec::new();

    for &(_, i) in &owned {
        let (x, y) = grid.coords(i);
        let next = grid.neighbor(x, y, direction).map(|(nx, ny)| grid.index(nx, ny));
        let prev = grid.step_back(x, y, direction).map(|(px, py)| grid.index(px, py));
        let trailing = prev.is_none_or(|p| owners[p] != id);
        let leading = next.is_none_or(|n| owners[n] != id);

        let (height, sediment) = crust[i];
        let moved = if trailing {
            (height as f32 * rng.gen_range(0.5..0.75)) as i32
        } else {
            height
        };
        let moved_sediment = sediment.min(moved);

        let tile = &mut world.tiles[i];
        tile.height -= moved;
        tile.sediment -= moved_sediment;

        let target = next.unwrap_or(i);
        world.tiles[target].height += moved;
        world.tiles[target].sediment += moved_sediment;

        if leading {
            collisions.push(target);
            if let Some(n) = next {
                let claim = if owners[n] == 0 {
                    rng.gen_range(0..16) != 0
                } else {
                    rng.gen_range(0..8) == 0
                };
                if claim {
                    world.tiles[n].plate = id;
                }
            }
        }
        if trailing && rng.gen_range(0..8) != 0 {
            world.tiles[i].plate = 0;
        }
    }

    trace!(
        plate = id,
        direction,
        tiles = owned.len(),
        collisions = collisions.len(),
        "Plate moved"
    );
    mountain_check(world, collisions, heading, rng);
}

/// Bring tiles above the height ceiling back down, spilling the excess onto
/// neighbors ahead of the collision until nothing is too high.
pub fn mountain_check(world: &mut World, start: Vec<usize>, heading: Vec2, rng: &mut impl Rng) {
    let grid = world.grid;
    let mut queue: VecDeque<usize> = start.into();
    let mut budget = grid.len() * 4;

    while let Some(i) = queue.pop_front() {
        let height = world.tiles[i].height;
        if height <= MAX_HEIGHT {
            continue;
        }
        if budget == 0 {
            world.adjust_height(i, MAX_HEIGHT);
            continue;
        }
        budget -= 1;

        let excess = (height - SPILL_FLOOR + rng.gen_range(0..1024)).min(height);
        let origin = grid.tile_position(i);
        let mut targets: Vec<usize> = grid
            .neighbors(i)
            .map(|(_, n)| n)
            .filter(|&n| grid.delta(grid.tile_position(n), origin).dot(heading) > 0.0)
            .collect();
        if targets.is_empty() {
            targets = grid.neighbors(i).map(|(_, n)| n).collect();
        }
        if targets.is_empty() {
            world.adjust_height(i, MAX_HEIGHT);
            continue;
        }

        let share = excess / targets.len() as i32;
        world.tiles[i].height -= share * targets.len() as i32;
        let sediment = world.tiles[i].sediment.min(world.tiles[i].height);
        world.tiles[i].sediment = sediment;
        for n in targets {
            world.tiles[n].height += share;
            queue.push_back(n);
        }
    }
}
