use std::f32::consts::PI;

use rand::prelude::*;
use tracing::info;

use crate::config::generation::GenerationParams;
use crate::simulation::clouds::Atmosphere;
use crate::world::climate::init_weather;
use crate::world::lake::LakeTable;
use crate::world::plate::{assign_tiles, place_plates};
use crate::world::tile::{RiverSize, Terrain, Tile};
use crate::world::topology::Grid;
use crate::world::World;

/// Base of the initial height band. Later uplift has room up to the maximum.
const BASE_HEIGHT: f32 = 2000.0;

/// Replace a zero seed with a random one so the run can be reproduced.
pub fn resolve_seed(params: &GenerationParams) -> GenerationParams {
    let seed = if params.seed == 0 {
        rand::thread_rng().r#gen()
    } else {
        params.seed
    };
    GenerationParams {
        seed,
        ..params.clone()
    }
}

/// Build the initial planet: height field, plates and climate baseline.
///
/// `params` must already carry a resolved seed; `rng` is the generation's
/// single random stream and is left positioned for the simulation rounds.
pub fn generate_world(params: &GenerationParams, rounds: u32, rng: &mut impl Rng) -> World {
    let grid = Grid::new(
        params.width as usize,
        params.height as usize,
        params.topology,
        params.wrap,
    );

    let heights = smooth_heights(&grid, &smooth_heights(&grid, &synthesize_heights(&grid, rng)));
    let mut tiles: Vec<Tile> = heights.into_iter().map(Tile::with_height).collect();

    let mut plates = place_plates(&grid, rounds, rng);
    assign_tiles(&grid, &mut tiles, &mut plates);
    let weather = init_weather(&grid, params.tempered);

    info!(
        width = grid.width,
        height = grid.height,
        topology = ?grid.topology,
        wrap = ?grid.wrap,
        plates = plates.len(),
        seed = params.seed,
        "Planet initialized"
    );

    World {
        name: if params.scenario.is_empty() {
            format!("Planet-{}", params.seed)
        } else {
            params.scenario.clone()
        },
        params: params.clone(),
        grid,
        tiles,
        plates,
        weather,
        atmosphere: Atmosphere::new(grid.len()),
        lakes: LakeTable::new(grid.len() + 1),
        sea_level: 0,
        mass_balance: 0,
        round: 0,
        rounds,
    }
}

/// Initial elevation from three superposed periodic surfaces plus jitter.
///
/// The low-frequency surface fits a whole number of waves across the map in
/// both axes so that wrapped maps have no seams.
pub fn synthesize_heights(grid: &Grid, rng: &mut impl Rng) -> Vec<i32> {
    let x_phase = rng.gen_range(-PI..PI);
    let y_phase = rng.gen_range(-PI..PI);

    let (w, h) = (grid.width as f32, grid.height as f32);
    let (mut period_x, mut period_y) = (w, h);
    if grid.width > grid.height {
        period_x = w / ((w + 0.5 * h) / h).floor();
    } else if grid.width < grid.height {
        period_y = h / ((h + 0.5 * w) / w).floor();
    }
    let half_x = w / 2.0 - 0.5;
    let half_y = h / 2.0 - 0.5;

    let mut heights = Vec::with_capacity(grid.len());
    for y in 0..grid.height {
        for x in 0..grid.width {
            let (xf, yf) = (x as f32, y as f32);
            let fx = 2.0 * xf * PI / period_x;
            let fy = 2.0 * yf * PI / period_y;
            let fxb = (xf - half_x) * 2.0 * PI / w;
            let fyb = (yf - half_y) * 2.0 * PI / h;

            let jitter_x = rng.gen_range(-0.5..0.5);
            let jitter_y = rng.gen_range(-0.5..0.5);

            // Round continents.
            let h1 = (fx * 2.0 + jitter_x + x_phase).sin() * (fy * 2.0 + jitter_y + y_phase).cos();
            // Irregular pattern breaking up the repetition.
            let h2 = (fxb * 1.8 * (1.0 + (fyb + y_phase).sin() / 2.0)).cos()
                * (fyb * 1.8 * (1.0 + (fxb + x_phase).sin() / 2.0)).cos();
            // High-frequency detail.
            let h3 = (fxb * 13.0 + jitter_y).sin() * (fyb * 13.0 + jitter_x).sin();

            heights.push((BASE_HEIGHT + 500.0 * h1 + 700.0 * h2 + 500.0 * h3 * h2) as i32);
        }
    }
    heights
}

/// One pass of neighborhood averaging with double weight on the tile itself.
pub fn smooth_heights(grid: &Grid, heights: &[i32]) -> Vec<i32> {
    (0..grid.len())
        .map(|i| {
            let mut sum = 2 * heights[i];
            let mut weight = 2;
            for (_, n) in grid.neighbors(i) {
                sum += heights[n];
                weight += 1;
            }
            sum / weight
        })
        .collect()
}

/// Print a summary of the generated planet.
pub fn print_world_summary(world: &World) {
    let total = world.tiles.len().max(1) as f32;
    println!("=== Planet Summary ===");
    println!("Name: {}", world.name);
    println!(
        "Map: {} x {} ({:?}, wrap {:?})",
        world.grid.width, world.grid.height, world.grid.topology, world.grid.wrap
    );
    println!("Seed: {}", world.params.seed);
    println!("Rounds: {}", world.round);
    println!("Sea level: {}", world.sea_level);
    println!("Mass balance: {}", world.mass_balance);

    println!("\nTerrain:");
    for (name, terrain) in [
        ("Sea", Terrain::Sea),
        ("Land", Terrain::Land),
        ("Lake", Terrain::Lake),
    ] {
        let count = world.count_terrain(terrain);
        println!(
            "  {:<8} {:>7} ({:.1}%)",
            name,
            count,
            count as f32 / total * 100.0
        );
    }

    let small = world
        .tiles
        .iter()
        .filter(|t| t.river == RiverSize::Small)
        .count();
    let big = world
        .tiles
        .iter()
        .filter(|t| t.river == RiverSize::Big)
        .count();
    println!("\nRivers: {} small, {} big", small, big);
    println!("Lakes: {}", world.lakes.active_count());

    let land: Vec<&Tile> = world.tiles.iter().filter(|t| t.is_land()).collect();
    if let Some(highest) = land.iter().map(|t| t.height).max() {
        let mean_temp =
            land.iter().map(|t| t.temperature as f64).sum::<f64>() / land.len() as f64;
        println!("\nHighest land: {}", highest);
        println!("Mean land temperature: {:.1}", mean_temp);
    }

    println!("\nPlates:");
    for plate in &world.plates {
        let owned = world.tiles.iter().filter(|t| t.plate == plate.id).count();
        println!(
            "  #{:<3} {:>6} tiles  at ({:.1}, {:.1})",
            plate.id, owned, plate.anchor.x, plate.anchor.y
        );
    }
}
