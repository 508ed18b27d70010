use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};

/// Lower clamp of the poll cadence in milliseconds.
pub const MIN_ACCURACY_MS: u16 = 10;
/// Upper clamp of the poll cadence in milliseconds.
pub const MAX_ACCURACY_MS: u16 = 500;
/// Poll cadence used when nothing else is configured.
pub const DEFAULT_ACCURACY_MS: u16 = 10;

/// Scheduler config (metronome.toml + METRONOME_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Poll cadence in milliseconds, clamped to [10, 500] when applied.
    /// Override with env var: METRONOME_ACCURACY_MS=250
    #[serde(default = "default_accuracy")]
    pub accuracy_ms: u16,

    /// Fixed clock offset in seconds, positive east of UTC (default: 0).
    /// Override with env var: METRONOME_UTC_OFFSET_SECS=3600
    #[serde(default)]
    pub utc_offset_secs: i32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            accuracy_ms: DEFAULT_ACCURACY_MS,
            utc_offset_secs: 0,
        }
    }
}

fn default_accuracy() -> u16 {
    DEFAULT_ACCURACY_MS
}

impl SchedulerConfig {
    /// Load config from a TOML file with METRONOME_* env var overrides.
    ///
    /// An absent file is not an error: every field carries a default, so
    /// embedders without a config file get the stock cadence and a UTC
    /// clock.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path.unwrap_or("metronome.toml");

        let config: SchedulerConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("METRONOME_"))
            .extract()
            .map_err(|e| SchedulerError::Config(e.to_string()))?;

        Ok(config)
    }
}
