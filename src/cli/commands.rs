use std::path::Path;

use crate::config::generation::GenerationParams;
use crate::config::simulation::SimulationConfig;
use crate::output;
use crate::simulation;
use crate::world::generation::print_world_summary;
use crate::world::World;

/// Generate a planet, print its summary and optionally write the export.
pub fn generate(
    params: &GenerationParams,
    config: &SimulationConfig,
    output_path: Option<&Path>,
) -> Result<World, String> {
    let world = simulation::generate_planet(params, config).map_err(|e| e.to_string())?;
    print_world_summary(&world);

    if let Some(path) = output_path {
        let written = output::write_export(&world, path)
            .map_err(|e| format!("Cannot write {}: {}", path.display(), e))?;
        println!("\nTerrain written to {}", written.display());
    }
    Ok(world)
}

/// Regenerate a planet and print the state of one tile.
pub fn inspect(
    params: &GenerationParams,
    config: &SimulationConfig,
    x: usize,
    y: usize,
) -> Result<(), String> {
    if params.seed == 0 {
        return Err("Inspect needs a fixed seed in the generation file".to_string());
    }
    let world = simulation::generate_planet(params, config).map_err(|e| e.to_string())?;
    inspect_tile(&world, x, y)
}

fn inspect_tile(world: &World, x: usize, y: usize) -> Result<(), String> {
    let tile = world.tile_at(x, y).ok_or_else(|| {
        format!(
            "Tile ({}, {}) not found (map is {} x {})",
            x, y, world.grid.width, world.grid.height
        )
    })?;
    let index = world.grid.index(x, y);
    let weather = &world.weather[index];

    println!("=== Tile ({}, {}) ===", x, y);
    println!("Terrain: {:?}", tile.terrain);
    println!("Plate: {}", tile.plate);
    println!();
    println!("--- Elevation ---");
    println!("  Height: {}", tile.height);
    println!("  Above sea level: {}", tile.height - world.sea_level);
    println!("  Sediment: {}", tile.sediment);
    println!();
    println!("--- Climate ---");
    println!("  Latitude: {:.1}°", weather.latitude);
    println!("  Temperature: {}°C", tile.temperature);
    println!(
        "  Baseline: sea {}°C, land {}°C",
        weather.sea_temperature, weather.land_temperature
    );
    if weather.wind_strength > 0 {
        println!(
            "  Wind: directions {:?}, strength {}",
            weather.wind, weather.wind_strength
        );
    } else {
        println!("  Wind: calm");
    }
    println!("  Wetness: {}", tile.wetness);
    println!();
    println!("--- Water ---");
    println!("  Waterflow: {}", tile.waterflow);
    match (tile.outflow, tile.steepness) {
        (Some(direction), Some(steepness)) => {
            let target = world
                .grid
                .neighbor(x, y, direction as usize)
                .map(|(nx, ny)| format!("({}, {})", nx, ny))
                .unwrap_or_else(|| "off map".to_string());
            println!(
                "  Outflow: direction {} to {}, steepness {}",
                direction, target, steepness
            );
        }
        _ => println!("  Outflow: (none)"),
    }
    println!("  River: {:?}", tile.river);
    if let Some(id) = tile.lake {
        let lake = world.lakes.get(id);
        println!(
            "  Lake #{}: surface {}, {} tiles, outflow {:?}",
            lake.id.0,
            lake.height,
            lake.tile_count,
            lake.outflow.map(|i| world.grid.coords(i))
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::topology::{Topology, WrapMode};
    use tempfile::TempDir;

    fn params() -> GenerationParams {
        GenerationParams {
            seed: 11,
            width: 16,
            height: 16,
            topology: Topology::Square,
            wrap: WrapMode::X,
            extended_tileset: false,
            land: 30,
            hill_mountain: 30,
            tempered: 50,
            water_on_land: 50,
            scenario: String::new(),
        }
    }

    fn quick() -> SimulationConfig {
        SimulationConfig {
            rounds: Some(3),
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn generate_writes_export() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("planet.json");
        let world = generate(&params(), &quick(), Some(&path)).unwrap();
        assert!(path.exists());
        assert_eq!(world.round, 3);
    }

    #[test]
    fn inspect_rejects_tiles_off_the_map() {
        let err = inspect(&params(), &quick(), 16, 0).unwrap_err();
        assert!(err.contains("not found"), "Error: {}", err);
    }

    #[test]
    fn inspect_needs_a_fixed_seed() {
        let p = GenerationParams {
            seed: 0,
            ..params()
        };
        let err = inspect(&p, &quick(), 1, 1).unwrap_err();
        assert!(err.contains("seed"));
    }

    #[test]
    fn inspect_prints_a_tile() {
        inspect(&params(), &quick(), 4, 7).unwrap();
    }
}
