use serde::Deserialize;
use std::path::Path;

/// Engine settings that do not change what is generated, plus the erosion
/// and transport tuning knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub json_logs: bool,
    /// Overrides the number of rounds derived from the map size.
    #[serde(default)]
    pub rounds: Option<u32>,
    #[serde(default = "default_river_erosion")]
    pub river_erosion: i32,
    #[serde(default = "default_rock_abrasion")]
    pub rock_abrasion: i32,
    #[serde(default = "default_coastal_erosion")]
    pub coastal_erosion: i32,
    #[serde(default = "default_transport_capacity")]
    pub transport_capacity: i32,
    /// Percent of rocks reaching water that settle where they land.
    #[serde(default = "default_sediment_retention")]
    pub sediment_retention: i32,
    /// Landlocked seas with fewer tiles than this are filled in.
    #[serde(default = "default_min_sea_size")]
    pub min_sea_size: usize,
    /// One asteroid strike per this many rounds on average; 0 disables.
    #[serde(default = "default_asteroid_chance")]
    pub asteroid_chance: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_river_erosion() -> i32 {
    1
}
fn default_rock_abrasion() -> i32 {
    16
}
fn default_coastal_erosion() -> i32 {
    4
}
fn default_transport_capacity() -> i32 {
    2
}
fn default_sediment_retention() -> i32 {
    50
}
fn default_min_sea_size() -> usize {
    12
}
fn default_asteroid_chance() -> u32 {
    25
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            log_level: default_log_level(),
            json_logs: false,
            rounds: None,
            river_erosion: default_river_erosion(),
            rock_abrasion: default_rock_abrasion(),
            coastal_erosion: default_coastal_erosion(),
            transport_capacity: default_transport_capacity(),
            sediment_retention: default_sediment_retention(),
            min_sea_size: default_min_sea_size(),
            asteroid_chance: default_asteroid_chance(),
        }
    }
}

impl SimulationConfig {
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
        Self::from_toml_str(&content, path)
    }

    pub fn from_toml_str(content: &str, source_path: &Path) -> Result<Self, String> {
        let config: SimulationConfig =
            toml::from_str(content).map_err(|e| format!("{}: {}", source_path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        let mut errors = Vec::new();

        if self.rounds == Some(0) {
            errors.push("rounds must be > 0 when set. Example: rounds = 64".to_string());
        }

        if self.river_erosion < 0 {
            errors.push(format!(
                "river_erosion must be >= 0, got {}. Example: river_erosion = 1",
                self.river_erosion
            ));
        }

        if self.rock_abrasion <= 0 {
            errors.push(format!(
                "rock_abrasion must be > 0, got {}. Example: rock_abrasion = 16",
                self.rock_abrasion
            ));
        }

        if self.coastal_erosion < 0 {
            errors.push(format!(
                "coastal_erosion must be >= 0, got {}. Example: coastal_erosion = 4",
                self.coastal_erosion
            ));
        }

        if self.transport_capacity <= 0 {
            errors.push(format!(
                "transport_capacity must be > 0, got {}. Example: transport_capacity = 2",
                self.transport_capacity
            ));
        }

        if !(0..=100).contains(&self.sediment_retention) {
            errors.push(format!(
                "sediment_retention must be 0-100, got {}. Example: sediment_retention = 50",
                self.sediment_retention
            ));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            errors.push(format!(
                "log_level must be one of {:?}, got '{}'. Example: log_level = \"info\"",
                valid_levels, self.log_level
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("\n"))
        }
    }
}
