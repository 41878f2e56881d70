use std::collections::BTreeMap;

use rand::Rng;
use tracing::debug;

use crate::world::World;

/// One asteroid strike.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Impact {
    pub center: usize,
    pub radius: i32,
    pub depth: i32,
    /// Height carried from the crater to its rim.
    pub excavated: i32,
}

/// Roll for an asteroid this round. `chance` is one in N; 0 never strikes.
pub fn maybe_strike(world: &mut World, chance: u32, rng: &mut impl Rng) -> Option<Impact> {
    if chance == 0 || rng.gen_range(0..chance) != 0 {
        return None;
    }
    let center = rng.gen_range(0..world.tiles.len());
    let radius = rng.gen_range(1..=3);
    let depth = rng.gen_range(200..=800);
    let impact = strike(world, center, radius, depth);
    debug!(
        x = world.grid.coords(center).0,
        y = world.grid.coords(center).1,
        radius,
        depth,
        excavated = impact.excavated,
        "Asteroid strike"
    );
    Some(impact)
}

/// Dig a crater around `center` and pile the spoil on its rim.
pub fn strike(world: &mut World, center: usize, radius: i32, depth: i32) -> Impact {
    let grid = world.grid;
    let (cx, cy) = grid.coords(center);
    let reach = 2 * (radius + 1) as i64;
    let r2 = (radius * radius) as f32;
    let outer = ((radius + 1) * (radius + 1)) as f32;

    // Keyed by tile so wrapped boxes visit each tile once, in index order.
    let mut area: BTreeMap<usize, f32> = BTreeMap::new();
    for dy in -reach..=reach {
        for dx in -reach..=reach {
            if let Some((x, y)) = grid.normalize(cx as i64 + dx, cy as i64 + dy) {
                let i = grid.index(x, y);
                area.entry(i).or_insert_with(|| grid.tile_sqdist(center, i));
            }
        }
    }

    let mut excavated = 0;
    let mut rim = Vec::new();
    for (&i, &d2) in &area {
        if d2 <= r2 {
            let loss = (depth as f32 * (r2 + 1.0 - d2) / (r2 + 1.0)) as i32;
            let tile = &mut world.tiles[i];
            let loss = loss.min(tile.height);
            tile.height -= loss;
            tile.sediment = tile.sediment.min(tile.height);
            excavated += loss;
        } else if d2 <= outer {
            rim.push(i);
        }
    }

    if rim.is_empty() {
        world.add_height(center, excavated);
    } else {
        let share = excavated / rim.len() as i32;
        let remainder = excavated - share * rim.len() as i32;
        for (n, &i) in rim.iter().enumerate() {
            let amount = if n == 0 { share + remainder } else { share };
            world.add_height(i, amount);
        }
    }

    Impact {
        center,
        radius,
        depth,
        excavated,
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

    fn world(topology: Topology, wrap: WrapMode) -> World {
        let params = GenerationParams {
            seed: 9,
            width: 16,
            height: 16,
            topology,
            wrap,
            extended_tileset: false,
            land: 30,
            hill_mountain: 30,
            tempered: 50,
            water_on_land: 50,
            scenario: String::new(),
        };
        generate_world(&params, 16, &mut ChaCha8Rng::seed_from_u64(9))
    }

    fn ledger(world: &World) -> i64 {
        world.total_mass() - world.mass_balance
    }

    #[test]
    fn crater_is_deepest_at_the_center() {
        let mut world = world(Topology::Square, WrapMode::None);
        for tile in &mut world.tiles {
            tile.height = 2000;
        }
        let center = world.grid.index(8, 8);
        let impact = strike(&mut world, center, 2, 500);
        assert_eq!(world.tiles[center].height, 1500);
        // d² = 1: 500 · 4 / 5.
        assert_eq!(world.tiles[world.grid.index(9, 8)].height, 1600);
        // d² = 9 is on the rim and receives spoil.
        assert!(world.tiles[world.grid.index(11, 8)].height > 2000);
        assert!(impact.excavated > 0);
    }

    #[test]
    fn strikes_conserve_mass_everywhere() {
        for topology in Topology::all() {
            for wrap in [WrapMode::None, WrapMode::X, WrapMode::XY] {
                let mut world = world(topology, wrap);
                let before = ledger(&world);
                for center in [0, 7, 120, 255] {
                    strike(&mut world, center, 3, 800);
                }
                assert_eq!(ledger(&world), before, "{:?} {:?}", topology, wrap);
            }
        }
    }

    #[test]
    fn crater_never_goes_below_zero() {
        let mut world = world(Topology::Hex, WrapMode::X);
        for tile in &mut world.tiles {
            tile.height = 100;
        }
        strike(&mut world, 40, 3, 800);
        assert!(world.tiles.iter().all(|t| t.height >= 0));
    }

    #[test]
    fn zero_chance_never_strikes() {
        let mut world = world(Topology::Square, WrapMode::None);
        let snapshot = world.tiles.clone();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(maybe_strike(&mut world, 0, &mut rng), None);
        }
        assert_eq!(world.tiles, snapshot);
    }

    #[test]
    fn certain_chance_always_strikes() {
        let mut world = world(Topology::IsoSquare, WrapMode::XY);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let impact = maybe_strike(&mut world, 1, &mut rng).unwrap();
        assert!((1..=3).contains(&impact.radius));
        assert!((200..=800).contains(&impact.depth));
    }
}
