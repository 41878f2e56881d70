use serde::Serialize;

use crate::world::topology::{angle_between, Grid, Topology};

/// Per-tile climate baseline. Computed once per map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WeatherCell {
    /// -90 (south pole) to 90 (north pole).
    pub latitude: f32,
    pub sea_temperature: i32,
    pub land_temperature: i32,
    /// Preferred wind directions; equal when the wind blows straight at one
    /// neighbor.
    pub wind: [u8; 2],
    /// 0 (random winds only) to 3.
    pub wind_strength: u8,
}

/// Temperature bands derived from the "tempered" percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemperatureRange {
    pub sea_min: i32,
    pub sea_max: i32,
    pub land_min: i32,
    pub land_max: i32,
}

impl TemperatureRange {
    pub fn new(tempered: i32) -> Self {
        TemperatureRange {
            sea_min: -14 * (100 - tempered) / 100 + 2,
            sea_max: 20 * tempered / 100 + 20,
            land_min: -55 * (100 - tempered) / 100 + 15,
            land_max: 20 * tempered / 100 + 50,
        }
    }

    /// (sea, land) baseline at a latitude, warmest at the equator.
    pub fn at(&self, latitude: f32) -> (i32, i32) {
        let warmth = (90.0 - latitude.abs()) / 90.0;
        let sea = warmth * (self.sea_max - self.sea_min) as f32 + self.sea_min as f32;
        let land = warmth * (self.land_max - self.land_min) as f32 + self.land_min as f32;
        (sea as i32, land as i32)
    }
}

/// Direction of air movement (degrees, 0 right, 90 down) and wind strength
/// for a latitude on a map whose east points at `east` degrees.
pub fn find_wind(latitude: f32, east: f32) -> (f32, u8) {
    let (angle, strength) = if latitude < -65.0 {
        (108.0 - latitude * 1.8, 2)
    } else if latitude < -60.0 {
        (0.0, 0)
    } else if latitude < -35.0 {
        (153.0 + latitude * 1.8, 2)
    } else if latitude < -30.0 {
        (0.0, 0)
    } else if latitude < -5.0 {
        (198.0 - 2.4 * latitude, 3)
    } else if latitude < 5.0 {
        (180.0 - 5.0 * latitude, 1)
    } else if latitude < 30.0 {
        (162.0 - 2.4 * latitude, 3)
    } else if latitude < 35.0 {
        (0.0, 0)
    } else if latitude < 60.0 {
        (207.0 + latitude * 1.8, 2)
    } else if latitude < 65.0 {
        (0.0, 0)
    } else {
        (252.0 - 1.8 * latitude, 2)
    };
    ((angle + east).rem_euclid(360.0), strength)
}

/// The one or two neighbor directions that best fit an angle.
pub fn wind_directions(topology: Topology, angle: f32) -> [u8; 2] {
    let count = topology.neighbor_count();
    let spacing = 360.0 / count as f32;
    let mut ranked: Vec<(f32, usize)> = (0..count)
        .map(|d| (angle_between(angle, topology.direction_angle(d)), d))
        .collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    let first = ranked[0].1 as u8;
    let second = match ranked.get(1) {
        Some(&(distance, d)) if distance < spacing - 1e-3 => d as u8,
        _ => first,
    };
    [first, second]
}

fn cell(topology: Topology, range: &TemperatureRange, latitude: f32, east: f32) -> WeatherCell {
    let (sea_temperature, land_temperature) = range.at(latitude);
    let (angle, wind_strength) = find_wind(latitude, east);
    let wind = if wind_strength > 0 {
        wind_directions(topology, angle)
    } else {
        [0, 0]
    };
    WeatherCell {
        latitude,
        sea_temperature,
        land_temperature,
        wind,
        wind_strength,
    }
}

/// Compute the climate baseline for every tile.
///
/// Maps wrapping in both axes have two round poles, one at the corner and one
/// at the center; latitude follows from the relative distance to each, and
/// east is perpendicular to the radius of the nearer pole. One quadrant is
/// computed and mirrored into the other three. Other maps use the row.
pub fn init_weather(grid: &Grid, tempered: i32) -> Vec<WeatherCell> {
    let range = TemperatureRange::new(tempered);
    let (w, h) = (grid.width, grid.height);
    let mut cells = vec![WeatherCell::default(); grid.len()];

    if grid.wraps_y() {
        for x in 0..w.div_ceil(2) {
            for y in 0..h.div_ceil(2) {
                let dx1 = x as f32 / w as f32;
                let dx2 = (w / 2) as f32 / w as f32 - dx1;
                let dy1 = y as f32 / h as f32;
                let dy2 = (h / 2) as f32 / h as f32 - dy1;
                let r1 = (dx1 * dx1 + dy1 * dy1).sqrt();
                let r2 = (dx2 * dx2 + dy2 * dy2).sqrt();
                let latitude = r1 / (r1 + r2) * 180.0 - 90.0;
                let east = if r1 < r2 {
                    dy1.atan2(dx1).to_degrees() + 90.0
                } else {
                    180.0 - dy2.atan2(dx2).to_degrees() + 90.0
                };

                let mirrors = [
                    (x, y, east),
                    (w - x - 1, y, 180.0 - east),
                    (x, h - y - 1, 360.0 - east),
                    (w - x - 1, h - y - 1, 179.9 + east),
                ];
                for (mx, my, east) in mirrors {
                    cells[grid.index(mx, my)] = cell(grid.topology, &range, latitude, east);
                }
            }
        }
    } else {
        for y in 0..h {
            let latitude = y as f32 / (h - 1) as f32 * 180.0 - 90.0;
            let row = cell(grid.topology, &range, latitude, 0.0);
            for x in 0..w {
                cells[grid.index(x, y)] = row;
            }
        }
    }
    cells
}
