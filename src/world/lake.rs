//! Lake records addressed by stable handles, merged through a path-compressed
//! union-find. Each lake owns its own min-heap of frontier tiles.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use serde::Serialize;

use crate::error::GenerationError;

/// Stable handle into the lake table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LakeId(pub u32);

impl LakeId {
    fn slot(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct FrontierItem {
    height: i32,
    tile: usize,
}

// Min-heap by height, then tile index, via reversed ordering.
impl Ord for FrontierItem {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .height
            .cmp(&self.height)
            .then_with(|| other.tile.cmp(&self.tile))
    }
}

impl PartialOrd for FrontierItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone)]
pub struct Lake {
    pub id: LakeId,
    /// Tile index of the outflow tile (not itself a member).
    pub outflow: Option<usize>,
    pub tile_count: u32,
    /// Water surface height.
    pub height: i32,
    /// Identifies the river walk that created the lake.
    pub serial: u32,
    merged_into: Option<LakeId>,
    frontier: BinaryHeap<FrontierItem>,
    queued: HashSet<usize>,
}

impl Lake {
    pub fn merged_into(&self) -> Option<LakeId> {
        self.merged_into
    }

    pub fn is_active(&self) -> bool {
        self.merged_into.is_none() && self.tile_count > 0
    }
}

/// Arena of lakes for one hydrology pass.
#[derive(Debug, Clone, Default)]
pub struct LakeTable {
    lakes: Vec<Lake>,
    capacity: usize,
}

impl LakeTable {
    pub fn new(capacity: usize) -> Self {
        LakeTable {
            lakes: Vec::new(),
            capacity,
        }
    }

    pub fn clear(&mut self) {
        self.lakes.clear();
    }

    pub fn len(&self) -> usize {
        self.lakes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lakes.is_empty()
    }

    pub fn create(&mut self, serial: u32, height: i32) -> Result<LakeId, GenerationError> {
        if self.lakes.len() >= self.capacity {
            return Err(GenerationError::LakeCapacity {
                capacity: self.capacity,
            });
        }
        let id = LakeId(self.lakes.len() as u32);
        self.lakes.push(Lake {
            id,
            outflow: None,
            tile_count: 0,
            height,
            serial,
            merged_into: None,
            frontier: BinaryHeap::new(),
            queued: HashSet::new(),
        });
        Ok(id)
    }

    /// Resolve a handle to its surviving lake, compressing the path.
    pub fn find(&mut self, id: LakeId) -> LakeId {
        let root = self.root(id);
        let mut current = id;
        while let Some(parent) = self.lakes[current.slot()].merged_into {
            if parent == root {
                break;
            }
            self.lakes[current.slot()].merged_into = Some(root);
            current = parent;
        }
        root
    }

    /// Resolve without compressing.
    pub fn root(&self, id: LakeId) -> LakeId {
        let mut current = id;
        while let Some(parent) = self.lakes[current.slot()].merged_into {
            current = parent;
        }
        current
    }

    pub fn get(&self, id: LakeId) -> &Lake {
        &self.lakes[self.root(id).slot()]
    }

    pub fn get_mut(&mut self, id: LakeId) -> &mut Lake {
        let root = self.find(id);
        &mut self.lakes[root.slot()]
    }

    /// Queue a frontier tile. Each tile enters a lake's queue at most once.
    pub fn push_frontier(&mut self, id: LakeId, tile: usize, height: i32) -> bool {
        let lake = self.get_mut(id);
        if !lake.queued.insert(tile) {
            return false;
        }
        lake.frontier.push(FrontierItem { height, tile });
        true
    }

    /// Lowest queued frontier tile as (tile index, height).
    pub fn pop_frontier(&mut self, id: LakeId) -> Option<(usize, i32)> {
        self.get_mut(id)
            .frontier
            .pop()
            .map(|item| (item.tile, item.height))
    }

    /// Union two lakes. The smaller one is merged into the larger; the
    /// survivor takes the higher surface, the queued frontier of both and the
    /// given serial. Former outlets of both lakes are returned so the caller
    /// can queue them as frontier.
    pub fn union(&mut self, a: LakeId, b: LakeId, serial: u32) -> (LakeId, Vec<usize>) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return (ra, Vec::new());
        }
        let larger = self.lakes[ra.slot()].tile_count >= self.lakes[rb.slot()].tile_count;
        let (survivor, absorbed) = if larger {
            (ra, rb)
        } else {
            (rb, ra)
        };

        let taken = &mut self.lakes[absorbed.slot()];
        taken.merged_into = Some(survivor);
        let frontier = std::mem::take(&mut taken.frontier);
        let queued = std::mem::take(&mut taken.queued);
        let tiles = std::mem::take(&mut taken.tile_count);
        let height = taken.height;
        let outlet = taken.outflow.take();

        let kept = &mut self.lakes[survivor.slot()];
        kept.tile_count += tiles;
        kept.height = kept.height.max(height);
        kept.serial = serial;
        // The merged lake grows on; any previous exit must be found again.
        let survivor_outlet = kept.outflow.take();
        for item in frontier {
            if kept.queued.insert(item.tile) {
                kept.frontier.push(item);
            }
        }
        kept.queued.extend(queued);

        let outlets: Vec<usize> = outlet.into_iter().chain(survivor_outlet).collect();
        // Outlets were popped once already; let them be queued again.
        for tile in &outlets {
            kept.queued.remove(tile);
        }
        (survivor, outlets)
    }

    /// Logically delete a lake.
    pub fn delete(&mut self, id: LakeId) {
        let lake = self.get_mut(id);
        lake.tile_count = 0;
        lake.frontier.clear();
        lake.queued.clear();
    }

    /// Surviving lakes that still own tiles, in creation order.
    pub fn active(&self) -> impl Iterator<Item = &Lake> {
        self.lakes.iter().filter(|lake| lake.is_active())
    }

    pub fn active_count(&self) -> usize {
        self.active().count()
    }
}
