pub mod climate;
pub mod generation;
pub mod lake;
pub mod plate;
pub mod tile;
pub mod topology;

use serde::Serialize;

use crate::config::generation::GenerationParams;
use crate::simulation::clouds::Atmosphere;
pub use climate::WeatherCell;
pub use lake::{LakeId, LakeTable};
pub use plate::Plate;
pub use tile::{RiverSize, Terrain, Tile, MAX_HEIGHT};
pub use topology::{Grid, Topology, WrapMode};

/// The full physical state of a planet under generation.
#[derive(Debug, Clone)]
pub struct World {
    pub name: String,
    /// Parameters with the seed resolved.
    pub params: GenerationParams,
    pub grid: Grid,
    pub tiles: Vec<Tile>,
    pub plates: Vec<Plate>,
    pub weather: Vec<WeatherCell>,
    pub atmosphere: Atmosphere,
    pub lakes: LakeTable,
    /// Height of the highest sea tile.
    pub sea_level: i32,
    /// Net mass added to (positive) or removed from the terrain by anything
    /// other than transport between tiles.
    pub mass_balance: i64,
    /// Rounds completed so far.
    pub round: u32,
    pub rounds: u32,
}

impl World {
    pub fn tile_at(&self, x: usize, y: usize) -> Option<&Tile> {
        if x < self.grid.width && y < self.grid.height {
            self.tiles.get(self.grid.index(x, y))
        } else {
            None
        }
    }

    /// Surviving lake a tile belongs to, if any.
    pub fn lake_of(&mut self, index: usize) -> Option<LakeId> {
        let id = self.tiles[index].lake?;
        Some(self.lakes.find(id))
    }

    /// Height plus in-transit rocks over the whole map.
    pub fn total_mass(&self) -> i64 {
        self.tiles
            .iter()
            .map(|t| t.height as i64 + t.rocks as i64)
            .sum()
    }

    /// Change a tile's height outside of tile-to-tile transport, keeping the
    /// mass ledger balanced.
    pub fn adjust_height(&mut self, index: usize, new_height: i32) {
        let tile = &mut self.tiles[index];
        self.mass_balance += new_height as i64 - tile.height as i64;
        tile.height = new_height;
    }

    /// Pile `amount` onto a tile. Whatever would rise past the ceiling is
    /// dropped and booked against the mass ledger. Returns the amount kept.
    pub fn add_height(&mut self, index: usize, amount: i32) -> i32 {
        let tile = &mut self.tiles[index];
        let kept = amount.min((MAX_HEIGHT - tile.height).max(0));
        tile.height += kept;
        self.mass_balance -= (amount - kept) as i64;
        kept
    }

    pub fn count_terrain(&self, terrain: Terrain) -> usize {
        self.tiles.iter().filter(|t| t.terrain == terrain).count()
    }

    /// Snapshot of everything downstream consumers need.
    pub fn export(&self) -> TerrainExport {
        let tiles = self
            .tiles
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let (x, y) = self.grid.coords(i);
                TileExport {
                    x,
                    y,
                    height: t.height,
                    terrain: t.terrain,
                    temperature: t.temperature,
                    wetness: t.wetness,
                    waterflow: t.waterflow,
                    steepness: t.steepness,
                    outflow: t.outflow,
                    river: t.river,
                    lake: t.lake.map(|id| self.lakes.root(id).0),
                    sediment: t.sediment,
                    plate: t.plate,
                }
            })
            .collect();

        let lakes = self
            .lakes
            .active()
            .map(|lake| LakeExport {
                id: lake.id.0,
                height: lake.height,
                tile_count: lake.tile_count,
                outflow: lake.outflow.map(|i| self.grid.coords(i)),
            })
            .collect();

        TerrainExport {
            name: self.name.clone(),
            params: self.params.clone(),
            grid: self.grid,
            rounds: self.round,
            sea_level: self.sea_level,
            mass_balance: self.mass_balance,
            tiles,
            lakes,
            plates: self.plates.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TileExport {
    pub x: usize,
    pub y: usize,
    pub height: i32,
    pub terrain: Terrain,
    pub temperature: i32,
    pub wetness: i32,
    pub waterflow: i32,
    pub steepness: Option<u8>,
    pub outflow: Option<u8>,
    pub river: RiverSize,
    pub lake: Option<u32>,
    pub sediment: i32,
    pub plate: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct LakeExport {
    pub id: u32,
    pub height: i32,
    pub tile_count: u32,
    pub outflow: Option<(usize, usize)>,
}

/// Final per-tile state handed to the terrain classifier.
#[derive(Debug, Clone, Serialize)]
pub struct TerrainExport {
    pub name: String,
    pub params: GenerationParams,
    pub grid: Grid,
    pub rounds: u32,
    pub sea_level: i32,
    pub mass_balance: i64,
    pub tiles: Vec<TileExport>,
    pub lakes: Vec<LakeExport>,
    pub plates: Vec<Plate>,
}
