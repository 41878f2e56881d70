use glam::{IVec2, Vec2};
use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::world::tile::Tile;
use crate::world::topology::Grid;

pub const MAX_PLATES: usize = 255;
const MIN_PLATES: usize = 3;
const PLACEMENT_TRIES: usize = 5;
const PLACEMENT_ATTEMPTS: usize = 16;
/// Plate centers are kept at least 8 tiles apart.
const MIN_PLATE_SQDIST: f32 = 64.0;
/// Largest distance, in tiles, a plate drifts along one axis over a full run.
const MAX_DRIFT: f32 = 5.0;

/// A tectonic plate. Tiles refer to it by `id`, which is never 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plate {
    pub id: u8,
    /// Continuous position, advanced by `velocity` every round.
    pub center: Vec2,
    /// Grid position the owned tiles are currently aligned with.
    pub anchor: Vec2,
    pub velocity: Vec2,
    /// Largest per-axis tile distance from the anchor to any owned tile.
    pub radius: IVec2,
}

/// Number of plates to aim for on a map of the given size.
pub fn plate_target(width: usize, height: usize) -> usize {
    (3 * (width + height) / 32).clamp(MIN_PLATES, MAX_PLATES)
}

/// Place non-overlapping plates at random positions.
///
/// Each plate gets a few tries to find a spot far enough from the others;
/// a plate that finds none is dropped. When fewer than three plates fit, the
/// whole placement is redone a bounded number of times before settling.
pub fn place_plates(grid: &Grid, rounds: u32, rng: &mut impl Rng) -> Vec<Plate> {
    let target = plate_target(grid.width, grid.height);
    let max_speed = MAX_DRIFT / rounds.max(1) as f32;
    let mut best: Vec<Plate> = Vec::new();

    for attempt in 0..PLACEMENT_ATTEMPTS {
        let mut plates: Vec<Plate> = Vec::with_capacity(target);
        for _ in 0..target {
            for _ in 0..PLACEMENT_TRIES {
                let position = Vec2::new(
                    rng.gen_range(0..grid.width) as f32,
                    rng.gen_range(0..grid.height) as f32,
                );
                let too_close = plates
                    .iter()
                    .any(|p| grid.sqdist(p.center, position) < MIN_PLATE_SQDIST);
                if too_close {
                    continue;
                }
                let velocity = Vec2::new(
                    rng.gen_range(-max_speed..=max_speed),
                    rng.gen_range(-max_speed..=max_speed),
                );
                plates.push(Plate {
                    id: plates.len() as u8 + 1,
                    center: position,
                    anchor: position,
                    velocity,
                    radius: IVec2::ZERO,
                });
                break;
            }
        }
        debug!(attempt, placed = plates.len(), target, "Plate placement");
        if plates.len() > best.len() {
            best = plates;
        }
        if best.len() >= MIN_PLATES.min(target) {
            break;
        }
    }
    best
}

/// Give every tile to the plate whose center is nearest.
pub fn assign_tiles(grid: &Grid, tiles: &mut [Tile], plates: &mut [Plate]) {
    for (i, tile) in tiles.iter_mut().enumerate() {
        let position = grid.tile_position(i);
        tile.plate = plates
            .iter()
            .min_by(|a, b| {
                grid.sqdist(a.anchor, position)
                    .total_cmp(&grid.sqdist(b.anchor, position))
            })
            .map_or(0, |p| p.id);
    }
    update_radii(grid, tiles, plates);
}

/// Recompute each plate's bounding radius from the tiles it owns.
pub fn update_radii(grid: &Grid, tiles: &[Tile], plates: &mut [Plate]) {
    for plate in plates.iter_mut() {
        plate.radius = IVec2::ZERO;
    }
    for (i, tile) in tiles.iter().enumerate() {
        if tile.plate == 0 {
            continue;
        }
        let Some(plate) = plates.get_mut(tile.plate as usize - 1) else {
            continue;
        };
        let (x, y) = grid.coords(i);
        let rx = grid.axis_distance(x as i64, plate.anchor.x as i64, grid.width, grid.wraps_x());
        let ry = grid.axis_distance(y as i64, plate.anchor.y as i64, grid.height, grid.wraps_y());
        plate.radius = plate.radius.max(IVec2::new(rx as i32, ry as i32));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::topology::{Topology, WrapMode};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn plate_target_is_clamped() {
        assert_eq!(plate_target(16, 16), 3);
        assert_eq!(plate_target(64, 64), 12);
        assert_eq!(plate_target(4096, 4096), 255);
    }

    #[test]
    fn plates_keep_their_distance() {
        let grid = Grid::new(64, 48, Topology::Hex, WrapMode::X);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let plates = place_plates(&grid, 64, &mut rng);
        assert!(!plates.is_empty());
        for (i, a) in plates.iter().enumerate() {
            assert_eq!(a.id as usize, i + 1);
            for b in &plates[i + 1..] {
                assert!(grid.sqdist(a.center, b.center) >= MIN_PLATE_SQDIST);
            }
        }
    }

    #[test]
    fn velocities_stay_within_drift_budget() {
        let grid = Grid::new(32, 32, Topology::Square, WrapMode::None);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let plates = place_plates(&grid, 32, &mut rng);
        let limit = MAX_DRIFT / 32.0 + 1e-6;
        for plate in &plates {
            assert!(plate.velocity.x.abs() <= limit);
            assert!(plate.velocity.y.abs() <= limit);
        }
    }

    #[test]
    fn smallest_map_still_gets_plates() {
        for topology in Topology::all() {
            let grid = Grid::new(16, 16, topology, WrapMode::XY);
            let mut rng = ChaCha8Rng::seed_from_u64(11);
            let plates = place_plates(&grid, 16, &mut rng);
            assert!(!plates.is_empty(), "{:?} placed no plates", topology);
            assert!(plates.len() <= 3);
        }
    }

    #[test]
    fn every_tile_is_assigned_to_its_nearest_plate() {
        let grid = Grid::new(32, 32, Topology::Square, WrapMode::XY);
        let mut tiles = vec![Tile::default(); grid.len()];
        let mut plates = vec![
            Plate {
                id: 1,
                center: Vec2::new(4.0, 4.0),
                anchor: Vec2::new(4.0, 4.0),
                velocity: Vec2::ZERO,
                radius: IVec2::ZERO,
            },
            Plate {
                id: 2,
                center: Vec2::new(20.0, 20.0),
                anchor: Vec2::new(20.0, 20.0),
                velocity: Vec2::ZERO,
                radius: IVec2::ZERO,
            },
        ];
        assign_tiles(&grid, &mut tiles, &mut plates);
        assert!(tiles.iter().all(|t| t.plate == 1 || t.plate == 2));
        assert_eq!(tiles[grid.index(5, 3)].plate, 1);
        assert_eq!(tiles[grid.index(19, 22)].plate, 2);
        // (31, 31) is nearest to (4, 4) across the wrap.
        assert_eq!(tiles[grid.index(31, 31)].plate, 1);
        assert!(plates[0].radius.x > 0 && plates[0].radius.x <= 16);
    }
}
