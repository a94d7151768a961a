//! Simulator configuration.
//!
//! Scenario parameters, loaded from a TOML file. Missing or invalid files
//! fall back to defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use riposte_combat::definitions::DEFAULT_PROFILE_PATH;

/// Configuration file name.
pub const CONFIG_FILE: &str = "riposte-sim.toml";

/// Scenario parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for sound pitch jitter.
    pub seed: u64,
    /// Directory holding item profile files.
    pub profile_dir: PathBuf,
    /// Ticks the lunge scenario runs for.
    pub lunge_ticks: u32,
    /// Forward speed of the charging player, in blocks per tick.
    pub charger_speed: f32,
    /// Mobs lined up in front of the charger.
    pub mob_count: u32,
    /// Gap between mobs in the line.
    pub mob_spacing: f32,
    /// Attack damage attribute of every attacker.
    pub attack_damage: f32,
    /// Damage of the axe hits in the shield scenario.
    pub axe_damage: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 7,
            profile_dir: PathBuf::from(DEFAULT_PROFILE_PATH),
            lunge_ticks: 40,
            charger_speed: 0.6,
            mob_count: 4,
            mob_spacing: 1.5,
            attack_damage: 2.0,
            axe_damage: 6.0,
        }
    }
}

impl SimConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read config file: {e}");
                return Self::default();
            },
        };

        match toml::from_str::<Self>(&contents) {
            Ok(mut config) => {
                config.validate();
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to parse config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    #[allow(dead_code)]
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents =
            toml::to_string_pretty(self).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, contents)?;
        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Clamp values to sensible ranges.
    pub fn validate(&mut self) {
        self.lunge_ticks = self.lunge_ticks.clamp(1, 1200);
        self.charger_speed = self.charger_speed.clamp(0.0, 4.0);
        self.mob_count = self.mob_count.clamp(1, 64);
        self.mob_spacing = self.mob_spacing.clamp(0.7, 16.0);
        self.attack_damage = self.attack_damage.clamp(0.0, 1000.0);
        self.axe_damage = self.axe_damage.clamp(0.0, 1000.0);
    }
}
