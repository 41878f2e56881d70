use serde::{Deserialize, Serialize};

use crate::world::lake::LakeId;

/// Highest elevation any tile may reach.
pub const MAX_HEIGHT: i32 = 10000;

// === Enums ===

/// Provisional terrain state. Exactly one holds for every tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terrain {
    #[default]
    Sea,
    Land,
    Lake,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiverSize {
    #[default]
    None,
    Small,
    Big,
}

// === Tile ===

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Tile {
    /// Meters above the deepest sea floor, 0..=MAX_HEIGHT.
    pub height: i32,
    pub terrain: Terrain,
    /// Owning plate, 0 when unclaimed.
    pub plate: u8,
    /// Celsius.
    pub temperature: i32,
    pub wetness: i32,
    pub waterflow: i32,
    /// 1 + log2 of the drop to the outflow neighbor; `None` until routed.
    pub steepness: Option<u8>,
    /// Direction index of the downstream neighbor.
    pub outflow: Option<u8>,
    /// Raw lake handle. Resolve through `LakeTable::find` before use.
    #[serde(skip)]
    pub lake: Option<LakeId>,
    pub sediment: i32,
    pub deferred_erosion: i32,
    pub rocks: i32,
    #[serde(skip)]
    pub mark: bool,
    pub river: RiverSize,
    /// log2 of the previous round's waterflow.
    pub old_flow: i32,
}

impl Tile {
    pub fn with_height(height: i32) -> Self {
        Tile {
            height,
            ..Tile::default()
        }
    }

    pub fn is_sea(&self) -> bool {
        self.terrain == Terrain::Sea
    }

    pub fn is_land(&self) -> bool {
        self.terrain == Terrain::Land
    }

    pub fn is_lake(&self) -> bool {
        self.terrain == Terrain::Lake
    }

    /// Sea or lake.
    pub fn is_water(&self) -> bool {
        self.terrain != Terrain::Land
    }
}

/// Integer floor of log2, 0 for values below 2.
pub fn log2_floor(value: i32) -> i32 {
    if value <= 1 {
        0
    } else {
        31 - value.leading_zeros() as i32
    }
}

/// Log-scaled measure of a height drop: 0 when flat or rising.
pub fn steepness_for_drop(drop: i32) -> u8 {
    if drop <= 0 {
        0
    } else {
        (1 + log2_floor(drop)) as u8
    }
}
