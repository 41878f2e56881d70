use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Discrete-grid adjacency scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topology {
    #[default]
    Square,
    IsoSquare,
    Hex,
    IsoHex,
}

/// Which axes of the map are periodic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WrapMode {
    #[default]
    None,
    X,
    #[serde(rename = "xy")]
    XY,
}

// Direction tables, indexed by direction. For the square topologies the first
// four entries share an edge with the tile, the last four only a corner.

const SQUARE_NEIGHBORS: [(i32, i32); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (-1, 1),
    (1, -1),
    (1, 1),
];

const ISO_SQUARE_ODD_ROW: [(i32, i32); 8] = [
    (0, -1),
    (1, -1),
    (0, 1),
    (1, 1),
    (0, -2),
    (-1, 0),
    (0, 2),
    (1, 0),
];

const ISO_SQUARE_EVEN_ROW: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (-1, 1),
    (0, 1),
    (0, -2),
    (-1, 0),
    (0, 2),
    (1, 0),
];

const HEX_ODD_ROW: [(i32, i32); 6] = [(0, -1), (1, -1), (-1, 0), (1, 0), (0, 1), (1, 1)];

const HEX_EVEN_ROW: [(i32, i32); 6] = [(-1, -1), (0, -1), (-1, 0), (1, 0), (-1, 1), (0, 1)];

const ISO_HEX_ODD_ROW: [(i32, i32); 6] = [(0, -2), (0, -1), (1, -1), (0, 1), (1, 1), (0, 2)];

const ISO_HEX_EVEN_ROW: [(i32, i32); 6] = [(0, -2), (-1, -1), (0, -1), (-1, 1), (0, 1), (0, 2)];

const SQRT_2: f32 = std::f32::consts::SQRT_2;
const SQRT_3: f32 = 1.732_050_8;

impl Topology {
    pub fn all() -> [Topology; 4] {
        [
            Topology::Square,
            Topology::IsoSquare,
            Topology::Hex,
            Topology::IsoHex,
        ]
    }

    pub fn is_hex(self) -> bool {
        matches!(self, Topology::Hex | Topology::IsoHex)
    }

    /// All neighbors, corners included.
    pub fn neighbor_count(self) -> usize {
        if self.is_hex() { 6 } else { 8 }
    }

    /// Neighbors sharing an edge with the tile.
    pub fn adjacent_count(self) -> usize {
        if self.is_hex() { 6 } else { 4 }
    }

    fn offsets(self, odd_row: bool) -> &'static [(i32, i32)] {
        match (self, odd_row) {
            (Topology::Square, _) => &SQUARE_NEIGHBORS,
            (Topology::IsoSquare, true) => &ISO_SQUARE_ODD_ROW,
            (Topology::IsoSquare, false) => &ISO_SQUARE_EVEN_ROW,
            (Topology::Hex, true) => &HEX_ODD_ROW,
            (Topology::Hex, false) => &HEX_EVEN_ROW,
            (Topology::IsoHex, true) => &ISO_HEX_ODD_ROW,
            (Topology::IsoHex, false) => &ISO_HEX_EVEN_ROW,
        }
    }

    /// Neighbor offset for `direction` from a tile on a row of the given parity.
    pub fn offset(self, odd_row: bool, direction: usize) -> (i32, i32) {
        self.offsets(odd_row)[direction]
    }

    /// Geometric position of a grid coordinate, scaled so that edge neighbors
    /// are one unit apart. Continuous coordinates take the parity of their row.
    pub fn position(self, x: f32, y: f32) -> Vec2 {
        let parity = (y.floor() as i64).rem_euclid(2) as f32;
        match self {
            Topology::Square => Vec2::new(x, y),
            Topology::IsoSquare => Vec2::new(SQRT_2 * (x + 0.5 * parity), y * SQRT_2 / 2.0),
            Topology::Hex => Vec2::new(x + 0.5 * parity, y * SQRT_3 / 2.0),
            Topology::IsoHex => Vec2::new(SQRT_3 * (x + 0.5 * parity), y * 0.5),
        }
    }

    /// Geometric size of one grid unit along each axis, for wrap periods.
    fn axis_scale(self) -> Vec2 {
        match self {
            Topology::Square => Vec2::ONE,
            Topology::IsoSquare => Vec2::new(SQRT_2, SQRT_2 / 2.0),
            Topology::Hex => Vec2::new(1.0, SQRT_3 / 2.0),
            Topology::IsoHex => Vec2::new(SQRT_3, 0.5),
        }
    }

    /// Angle in degrees (0 = right, 90 = down) of the given direction.
    pub fn direction_angle(self, direction: usize) -> f32 {
        let (dx, dy) = self.offset(true, direction);
        let from = self.position(0.0, 1.0);
        let to = self.position(dx as f32, (1 + dy) as f32);
        let d = to - from;
        d.y.atan2(d.x).to_degrees().rem_euclid(360.0)
    }

    /// The direction pointing the opposite way.
    pub fn opposite(self, direction: usize) -> usize {
        let target = (self.direction_angle(direction) + 180.0).rem_euclid(360.0);
        (0..self.neighbor_count())
            .min_by(|&a, &b| {
                let da = angle_between(self.direction_angle(a), target);
                let db = angle_between(self.direction_angle(b), target);
                da.total_cmp(&db)
            })
            .unwrap_or(direction)
    }
}

/// Smallest absolute difference between two angles in degrees.
pub fn angle_between(a: f32, b: f32) -> f32 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

/// A rectangular map of tiles with a topology and wrap mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Grid {
    pub width: usize,
    pub height: usize,
    pub topology: Topology,
    pub wrap: WrapMode,
}

impl Grid {
    pub fn new(width: usize, height: usize, topology: Topology, wrap: WrapMode) -> Self {
        Grid {
            width,
            height,
            topology,
            wrap,
        }
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn wraps_x(&self) -> bool {
        self.wrap != WrapMode::None
    }

    pub fn wraps_y(&self) -> bool {
        self.wrap == WrapMode::XY
    }

    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    pub fn coords(&self, index: usize) -> (usize, usize) {
        (index % self.width, index / self.width)
    }

    /// Bring a possibly out-of-range coordinate onto the map. Returns `None`
    /// when the coordinate lies past the edge of a non-wrapping axis.
    pub fn normalize(&self, x: i64, y: i64) -> Option<(usize, usize)> {
        let w = self.width as i64;
        let h = self.height as i64;
        let x = if self.wraps_x() {
            x.rem_euclid(w)
        } else if (0..w).contains(&x) {
            x
        } else {
            return None;
        };
        let y = if self.wraps_y() {
            y.rem_euclid(h)
        } else if (0..h).contains(&y) {
            y
        } else {
            return None;
        };
        Some((x as usize, y as usize))
    }

    pub fn neighbor(&self, x: usize, y: usize, direction: usize) -> Option<(usize, usize)> {
        let (dx, dy) = self.topology.offset(y % 2 == 1, direction);
        self.normalize(x as i64 + dx as i64, y as i64 + dy as i64)
    }

    pub fn neighbor_index(&self, index: usize, direction: usize) -> Option<usize> {
        let (x, y) = self.coords(index);
        self.neighbor(x, y, direction)
            .map(|(nx, ny)| self.index(nx, ny))
    }

    /// The tile whose neighbor in `direction` is (x, y).
    pub fn step_back(&self, x: usize, y: usize, direction: usize) -> Option<(usize, usize)> {
        // Both parity tables agree on dy for every direction.
        let (_, dy) = self.topology.offset(true, direction);
        let prev_row = y as i64 - dy as i64;
        let (dx, _) = self
            .topology
            .offset(prev_row.rem_euclid(2) == 1, direction);
        self.normalize(x as i64 - dx as i64, prev_row)
    }

    /// Full neighborhood as (direction, tile index) pairs.
    pub fn neighbors(&self, index: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.topology.neighbor_count())
            .filter_map(move |d| self.neighbor_index(index, d).map(|n| (d, n)))
    }

    /// Edge-sharing neighbors only, as (direction, tile index) pairs.
    pub fn adjacent(&self, index: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.topology.adjacent_count())
            .filter_map(move |d| self.neighbor_index(index, d).map(|n| (d, n)))
    }

    /// Geometric displacement from `b` to `a`, taking the shortest way around
    /// every wrapping axis.
    pub fn delta(&self, a: Vec2, b: Vec2) -> Vec2 {
        let mut d = self.topology.position(a.x, a.y) - self.topology.position(b.x, b.y);
        let scale = self.topology.axis_scale();
        if self.wraps_x() {
            let period = self.width as f32 * scale.x;
            d.x -= period * (d.x / period).round();
        }
        if self.wraps_y() {
            let period = self.height as f32 * scale.y;
            d.y -= period * (d.y / period).round();
        }
        d
    }

    /// Squared topology-correct distance between two grid positions.
    pub fn sqdist(&self, a: Vec2, b: Vec2) -> f32 {
        self.delta(a, b).length_squared()
    }

    /// Grid coordinates of a tile as a continuous position.
    pub fn tile_position(&self, index: usize) -> Vec2 {
        let (x, y) = self.coords(index);
        Vec2::new(x as f32, y as f32)
    }

    /// Squared distance between the centers of two tiles.
    pub fn tile_sqdist(&self, a: usize, b: usize) -> f32 {
        self.sqdist(self.tile_position(a), self.tile_position(b))
    }

    /// Shortest wrapped distance along one axis, in grid units.
    pub fn axis_distance(&self, a: i64, b: i64, size: usize, wraps: bool) -> i64 {
        let d = (a - b).abs();
        if wraps { d.min(size as i64 - d) } else { d }
    }
}
