use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::world::topology::{Topology, WrapMode};

pub const MIN_DIMENSION: u32 = 16;
pub const MAX_DIMENSION: u32 = 4096;

/// Parameters used to generate a planet.
/// Stored with the world for reproducibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    #[serde(default)]
    pub seed: u64,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub topology: Topology,
    #[serde(default)]
    pub wrap: WrapMode,
    /// Selects the extended tileset variant. Passed through to the classifier.
    #[serde(default)]
    pub extended_tileset: bool,
    /// Percentage of tiles that end up as land.
    #[serde(default = "default_land")]
    pub land: i32,
    /// Percentage of land that should be hills or mountains.
    #[serde(default = "default_hill_mountain")]
    pub hill_mountain: i32,
    /// Climate severity: 0 is a harsh planet, 100 a mild one.
    #[serde(default = "default_tempered")]
    pub tempered: i32,
    /// River density.
    #[serde(default = "default_water_on_land")]
    pub water_on_land: i32,
    #[serde(default)]
    pub scenario: String,
}

fn default_land() -> i32 {
    30
}

fn default_hill_mountain() -> i32 {
    30
}

fn default_tempered() -> i32 {
    60
}

fn default_water_on_land() -> i32 {
    50
}

impl GenerationParams {
    /// Load generation parameters from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
        let params: Self = toml::from_str(&content)
            .map_err(|e| format!("Invalid TOML in {}: {}", path.display(), e))?;
        params.validate()?;
        Ok(params)
    }

    /// Validate parameter ranges.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [("width", self.width), ("height", self.height)] {
            if !(MIN_DIMENSION..=MAX_DIMENSION).contains(&value) {
                return Err(format!(
                    "{} must be {}-{}, got {}",
                    name, MIN_DIMENSION, MAX_DIMENSION, value
                ));
            }
        }
        for (name, value) in [
            ("land", self.land),
            ("hill_mountain", self.hill_mountain),
            ("tempered", self.tempered),
            ("water_on_land", self.water_on_land),
        ] {
            if !(0..=100).contains(&value) {
                return Err(format!(
                    "{} is a percentage and must be 0-100, got {}",
                    name, value
                ));
            }
        }
        if self.wrap == WrapMode::XY
            && self.topology != Topology::Square
            && self.height % 2 != 0
        {
            return Err(format!(
                "height must be even for {:?} topology with xy wrap, got {}",
                self.topology, self.height
            ));
        }
        Ok(())
    }

    /// Number of simulated rounds: enough for weather to cross the map.
    pub fn rounds(&self) -> u32 {
        self.width.max(self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid() -> GenerationParams {
        GenerationParams {
            seed: 1,
            width: 32,
            height: 32,
            topology: Topology::Square,
            wrap: WrapMode::None,
            extended_tileset: false,
            land: 50,
            hill_mountain: 30,
            tempered: 50,
            water_on_land: 50,
            scenario: "test".to_string(),
        }
    }

    #[test]
    fn valid_params() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn too_small_map_rejected() {
        let params = GenerationParams {
            width: 15,
            ..valid()
        };
        let err = params.validate().unwrap_err();
        assert!(err.contains("width"), "Error should mention width: {}", err);
    }

    #[test]
    fn minimum_map_accepted() {
        let params = GenerationParams {
            width: 16,
            height: 16,
            ..valid()
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn percentage_out_of_range_rejected() {
        let params = GenerationParams {
            tempered: 101,
            ..valid()
        };
        let err = params.validate().unwrap_err();
        assert!(err.contains("tempered"), "Error: {}", err);

        let params = GenerationParams {
            land: -1,
            ..valid()
        };
        let err = params.validate().unwrap_err();
        assert!(err.contains("land"), "Error: {}", err);
    }

    #[test]
    fn odd_height_rejected_for_wrapped_hex() {
        let params = GenerationParams {
            height: 17,
            topology: Topology::IsoHex,
            wrap: WrapMode::XY,
            ..valid()
        };
        let err = params.validate().unwrap_err();
        assert!(err.contains("even"), "Error: {}", err);
    }

    #[test]
    fn rounds_follow_larger_dimension() {
        let params = GenerationParams {
            width: 40,
            height: 24,
            ..valid()
        };
        assert_eq!(params.rounds(), 40);
    }

    #[test]
    fn from_toml_string() {
        let toml_str = r#"
seed = 42
width = 64
height = 32
topology = "iso-hex"
wrap = "xy"
land = 40
"#;
        let params: GenerationParams = toml::from_str(toml_str).unwrap();
        assert_eq!(params.seed, 42);
        assert_eq!(params.topology, Topology::IsoHex);
        assert_eq!(params.wrap, WrapMode::XY);
        assert_eq!(params.land, 40);
        assert_eq!(params.tempered, 60);
        params.validate().unwrap();
    }

    #[test]
    fn from_file_valid() {
        let mut tmpfile = tempfile::NamedTempFile::new().unwrap();
        write!(
            tmpfile,
            r#"
width = 48
height = 48
topology = "hex"
wrap = "x"
land = 35
hill_mountain = 20
tempered = 70
water_on_land = 40
scenario = "Archipelago"
"#
        )
        .unwrap();

        let params = GenerationParams::from_file(tmpfile.path()).unwrap();
        assert_eq!(params.width, 48);
        assert_eq!(params.topology, Topology::Hex);
        assert_eq!(params.scenario, "Archipelago");
        assert_eq!(params.seed, 0);
    }

    #[test]
    fn from_file_missing() {
        let err = GenerationParams::from_file(Path::new("/nonexistent/file.toml")).unwrap_err();
        assert!(err.contains("Cannot read"), "Error: {}", err);
    }

    #[test]
    fn from_file_invalid_toml() {
        let mut tmpfile = tempfile::NamedTempFile::new().unwrap();
        write!(tmpfile, "this is not valid toml {{{{").unwrap();

        let err = GenerationParams::from_file(tmpfile.path()).unwrap_err();
        assert!(err.contains("Invalid TOML"), "Error: {}", err);
    }

    #[test]
    fn from_file_out_of_range() {
        let mut tmpfile = tempfile::NamedTempFile::new().unwrap();
        write!(
            tmpfile,
            r#"
width = 8
height = 32
"#
        )
        .unwrap();

        let err = GenerationParams::from_file(tmpfile.path()).unwrap_err();
        assert!(err.contains("width"), "Error: {}", err);
    }
}
