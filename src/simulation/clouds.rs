//! Layered atmosphere: evaporation, wind transport of clouds and rain.

use rand::Rng;

use crate::world::World;

/// Top of each air layer in meters above sea level.
pub const AIR_HEIGHTS: [i32; 9] = [50, 100, 200, 500, 1000, 2000, 5000, 10000, 20000];
pub const LAYERS: usize = AIR_HEIGHTS.len();

/// Ground above this is treated as the top of the troposphere.
const TROPOPAUSE: i32 = 11000;

/// Water held in one layer above one tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AirBox {
    pub water: i32,
    /// Water arriving this round, merged in once transport is done.
    pub transit: i32,
}

/// All air boxes, layer-major.
#[derive(Debug, Clone)]
pub struct Atmosphere {
    boxes: Vec<AirBox>,
    tiles: usize,
}

impl Atmosphere {
    pub fn new(tiles: usize) -> Self {
        Atmosphere {
            boxes: vec![AirBox::default(); tiles * LAYERS],
            tiles,
        }
    }

    pub fn get(&self, layer: usize, tile: usize) -> &AirBox {
        &self.boxes[layer * self.tiles + tile]
    }

    pub fn get_mut(&mut self, layer: usize, tile: usize) -> &mut AirBox {
        &mut self.boxes[layer * self.tiles + tile]
    }

    pub fn total_water(&self) -> i64 {
        self.boxes
            .iter()
            .map(|b| b.water as i64 + b.transit as i64)
            .sum()
    }

    /// Move all water in transit into its destination box.
    pub fn settle(&mut self) {
        for b in &mut self.boxes {
            b.water += std::mem::take(&mut b.transit);
        }
    }
}

/// Air temperature at `height` over ground at `ground` with surface
/// temperature `ground_temperature`, using the standard lapse rate.
pub fn air_temperature(height: i32, ground: i32, ground_temperature: i32) -> i32 {
    if ground > TROPOPAUSE {
        return ground_temperature;
    }
    ground_temperature - (6.5 * (height.min(TROPOPAUSE) - ground) as f32 / 1000.0) as i32
}

/// Water a box can hold before it rains.
pub fn cloud_capacity(height: i32, ground: i32, ground_temperature: i32) -> i32 {
    let temperature = air_temperature(height, ground, ground_temperature);
    (3000.0 * 1.08f32.powi(temperature - 50)) as i32
}

/// Lowest layer that is not below the ground.
pub fn ground_layer(above_sea: i32) -> usize {
    AIR_HEIGHTS
        .iter()
        .position(|&top| top >= above_sea)
        .unwrap_or(LAYERS - 1)
}

fn above_sea(world: &World, tile: usize) -> i32 {
    (world.tiles[tile].height - world.sea_level).max(0)
}

/// Evaporate into the ground layer of every tile. Water evaporates freely;
/// land gives up at most half its wetness.
pub fn evaporate(world: &mut World) -> i64 {
    let mut total = 0;
    for i in 0..world.tiles.len() {
        let ground = above_sea(world, i);
        let layer = ground_layer(ground);
        let tile = world.tiles[i];
        let held = world.atmosphere.get(layer, i).water;
        let mut amount = (cloud_capacity(ground, ground, tile.temperature) - held).max(0);
        if tile.is_land() {
            amount = amount.min(tile.wetness / 2);
            world.tiles[i].wetness -= amount;
        }
        world.atmosphere.get_mut(layer, i).water += amount;
        total += amount as i64;
    }
    total
}

/// Take up to `amount` from `water`, returning what was taken.
fn take(water: &mut i32, amount: i32) -> i32 {
    let taken = amount.clamp(0, *water);
    *water -= taken;
    taken
}

/// Deposit water into the air above a tile, climbing to the first layer not
/// below the ground there. Returns the layer used.
fn push_cloud(world: &mut World, mut layer: usize, tile: usize, amount: i32) -> usize {
    let ground = above_sea(world, tile);
    while layer + 1 < LAYERS && AIR_HEIGHTS[layer] < ground {
        layer += 1;
    }
    world.atmosphere.get_mut(layer, tile).transit += amount;
    layer
}

/// Move clouds: some water rises a layer, sea air blows onshore, a little
/// scatters at random and the rest follows the prevailing wind.
pub fn transport(world: &mut World, rng: &mut impl Rng) {
    let grid = world.grid;
    let neighbor_count = grid.topology.neighbor_count();

    for layer in 0..LAYERS {
        for i in 0..grid.len() {
            if AIR_HEIGHTS[layer] < above_sea(world, i) {
                continue;
            }
            let mut water = world.atmosphere.get(layer, i).water;
            if water <= 0 {
                continue;
            }

            if layer + 1 < LAYERS {
                let share = water / 10;
                let rising = take(&mut water, share);
                world.atmosphere.get_mut(layer + 1, i).transit += rising;
            }

            let amount = water / 16;
            let weather = world.weather[i];

            if layer == 0 && !world.tiles[i].is_land() {
                let onshore: Vec<usize> = grid
                    .neighbors(i)
                    .filter(|&(_, n)| world.tiles[n].is_land())
                    .map(|(_, n)| n)
                    .collect();
                for n in onshore {
                    let moved = take(&mut water, amount);
                    push_cloud(world, layer, n, moved);
                }
            }

            for _ in 0..3u8.saturating_sub(weather.wind_strength) {
                let direction = rng.gen_range(0..neighbor_count);
                if let Some(n) = grid.neighbor_index(i, direction) {
                    let moved = take(&mut water, amount);
                    push_cloud(world, layer, n, moved);
                }
            }

            if weather.wind_strength > 0 {
                let reps = weather.wind_strength as i32;
                let amount = water / 3 / reps;
                let mut paths = [(Some(i), layer), (Some(i), layer)];
                for _ in 0..reps {
                    for (path, &way) in paths.iter_mut().zip(weather.wind.iter()) {
                        let Some(at) = path.0 else {
                            continue;
                        };
                        path.0 = grid.neighbor_index(at, way as usize);
                        if let Some(n) = path.0 {
                            let moved = take(&mut water, amount);
                            path.1 = push_cloud(world, path.1, n, moved);
                        }
                    }
                }
            }

            world.atmosphere.get_mut(layer, i).water = water;
        }
    }
    world.atmosphere.settle();
}

/// Rain out of every layer. Light rain falls everywhere; boxes over capacity
/// lose a third of the excess, half of which sinks a layer on its way down.
/// Rain over open sea is lost.
pub fn precipitate(world: &mut World) -> i64 {
    let mut total = 0;
    for layer in 0..LAYERS {
        for i in 0..world.tiles.len() {
            let ground = above_sea(world, i);
            if AIR_HEIGHTS[layer] < ground {
                continue;
            }
            let tile = world.tiles[i];
            let air = world.atmosphere.get_mut(layer, i);
            let mut rain = air.water / 25;
            air.water -= rain;

            let capacity = cloud_capacity(AIR_HEIGHTS[layer], ground, tile.temperature);
            if air.water > capacity {
                let excess = (air.water - capacity) / 3;
                air.water -= excess;
                rain += excess;
                if layer > 0 && AIR_HEIGHTS[layer - 1] > ground {
                    let sinking = take(&mut air.water, excess / 2);
                    world.atmosphere.get_mut(layer - 1, i).water += sinking;
                }
            }

            if !tile.is_sea() {
                world.tiles[i].wetness += rain;
            }
            total += rain as i64;
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::generation::GenerationParams;
    use crate::world::generation::generate_world;
    use crate::world::tile::Terrain;
    use crate::world::topology::{Topology, WrapMode};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn flat_world(topology: Topology) -> World {
        let params = GenerationParams {
            seed: 4,
            width: 16,
            height: 16,
            topology,
            wrap: WrapMode::XY,
            extended_tileset: false,
            land: 30,
            hill_mountain: 30,
            tempered: 50,
            water_on_land: 50,
            scenario: String::new(),
        };
        let mut world = generate_world(&params, 16, &mut ChaCha8Rng::seed_from_u64(4));
        for tile in &mut world.tiles {
            tile.height = 1000;
            tile.temperature = 20;
            tile.terrain = Terrain::Sea;
        }
        world.sea_level = 1000;
        world
    }

    #[test]
    fn lapse_rate_cools_with_height() {
        assert_eq!(air_temperature(0, 0, 20), 20);
        assert_eq!(air_temperature(2000, 0, 20), 7);
        assert_eq!(air_temperature(20000, 0, 20), 20 - 71);
        assert_eq!(air_temperature(500, 12000, 5), 5);
    }

    #[test]
    fn warm_air_holds_more_water() {
        assert_eq!(cloud_capacity(0, 0, 50), 3000);
        assert!(cloud_capacity(0, 0, 30) < cloud_capacity(0, 0, 40));
        assert_eq!(cloud_capacity(0, 0, -200), 0);
    }

    #[test]
    fn ground_layer_skips_buried_layers() {
        assert_eq!(ground_layer(0), 0);
        assert_eq!(ground_layer(50), 0);
        assert_eq!(ground_layer(51), 1);
        assert_eq!(ground_layer(9000), 7);
        assert_eq!(ground_layer(30000), LAYERS - 1);
    }

    #[test]
    fn sea_evaporates_up_to_capacity() {
        let mut world = flat_world(Topology::Square);
        let evaporated = evaporate(&mut world);
        let per_tile = cloud_capacity(0, 0, 20) as i64;
        assert_eq!(evaporated, per_tile * world.tiles.len() as i64);
        // Saturated air takes no more.
        assert_eq!(evaporate(&mut world), 0);
    }

    #[test]
    fn land_gives_up_half_its_wetness() {
        let mut world = flat_world(Topology::Hex);
        world.tiles[5].terrain = Terrain::Land;
        world.tiles[5].wetness = 40;
        evaporate(&mut world);
        assert_eq!(world.tiles[5].wetness, 20);
        assert_eq!(world.atmosphere.get(0, 5).water, 20);
    }

    #[test]
    fn transport_conserves_water() {
        for topology in Topology::all() {
            let mut world = flat_world(topology);
            world.tiles[17].terrain = Terrain::Land;
            world.tiles[40].height = 2600;
            evaporate(&mut world);
            let before = world.atmosphere.total_water();
            let mut rng = ChaCha8Rng::seed_from_u64(8);
            for _ in 0..5 {
                transport(&mut world, &mut rng);
            }
            assert_eq!(world.atmosphere.total_water(), before, "{:?}", topology);
        }
    }

    #[test]
    fn a_tenth_of_the_water_rises_a_layer() {
        let mut world = flat_world(Topology::Square);
        world.atmosphere.get_mut(0, 20).water = 1000;
        transport(&mut world, &mut ChaCha8Rng::seed_from_u64(2));
        assert_eq!(world.atmosphere.get(1, 20).water, 100);
        assert_eq!(world.atmosphere.total_water(), 1000);
    }

    #[test]
    fn rain_only_wets_land_and_lakes() {
        let mut world = flat_world(Topology::Square);
        world.tiles[3].terrain = Terrain::Land;
        world.tiles[4].terrain = Terrain::Lake;
        for i in 0..world.tiles.len() {
            world.atmosphere.get_mut(0, i).water = 5000;
        }
        let rained = precipitate(&mut world);
        assert!(rained > 0);
        assert!(world.tiles[3].wetness > 0);
        assert!(world.tiles[4].wetness > 0);
        assert_eq!(world.tiles[0].wetness, 0);
    }
}
