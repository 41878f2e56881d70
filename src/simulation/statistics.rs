use crate::world::tile::{RiverSize, Terrain};
use crate::world::World;

/// Per-round aggregate metrics for logging and degenerate state detection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundStatistics {
    pub round: u32,
    pub sea_level: i32,
    pub sea_tiles: u32,
    pub land_tiles: u32,
    pub lake_tiles: u32,
    pub lakes: u32,
    pub small_river_tiles: u32,
    pub big_river_tiles: u32,
    pub highest: i32,
    pub mean_land_temperature: f32,
    pub land_wetness: i64,
    pub mass_balance: i64,
    pub round_duration_ms: f32,
}

/// Compute statistics for the current world state after a round.
pub fn compute_statistics(world: &World, round_duration_ms: f32) -> RoundStatistics {
    if world.tiles.is_empty() {
        return RoundStatistics {
            round: world.round,
            sea_level: world.sea_level,
            mass_balance: world.mass_balance,
            round_duration_ms,
            ..RoundStatistics::default()
        };
    }

    let mut stats = RoundStatistics {
        round: world.round,
        sea_level: world.sea_level,
        lakes: world.lakes.active_count() as u32,
        highest: i32::MIN,
        mass_balance: world.mass_balance,
        round_duration_ms,
        ..RoundStatistics::default()
    };
    let mut total_land_temp = 0.0_f64;

    for tile in &world.tiles {
        match tile.terrain {
            Terrain::Sea => stats.sea_tiles += 1,
            Terrain::Land => {
                stats.land_tiles += 1;
                total_land_temp += tile.temperature as f64;
                stats.land_wetness += tile.wetness as i64;
            }
            Terrain::Lake => stats.lake_tiles += 1,
        }
        match tile.river {
            RiverSize::Small => stats.small_river_tiles += 1,
            RiverSize::Big => stats.big_river_tiles += 1,
            RiverSize::None => {}
        }
        stats.highest = stats.highest.max(tile.height);
    }

    if stats.land_tiles > 0 {
        stats.mean_land_temperature = (total_land_temp / stats.land_tiles as f64) as f32;
    }
    stats
}
