use crate::DeckError;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where a worker process's stderr goes
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StderrMode {
    /// Worker diagnostics are dropped so they never land on the menu
    #[default]
    Discard,
    /// Worker stderr is shared with the supervising process
    Inherit,
}

/// Settings for the menu, the refresh loop and worker launching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[serde(rename_all = "camelCase")]
#[builder(setter(into))]
pub struct DeckConfig {
    /// Title shown above the main menu
    #[serde(default = "default_title")]
    #[builder(default = "default_title()")]
    pub title: String,

    /// Scheduler ticks per second
    #[serde(default = "default_ticks_per_second")]
    #[builder(default = "default_ticks_per_second()")]
    pub ticks_per_second: u32,

    /// Number of received items each worker keeps for display
    #[serde(default = "default_history_capacity")]
    #[builder(default = "default_history_capacity()")]
    pub history_capacity: usize,

    #[serde(default)]
    #[builder(default)]
    pub worker_stderr: StderrMode,

    /// Log destination for the supervising process; logging is off when unset
    #[serde(default)]
    #[builder(default, setter(strip_option))]
    pub log_file: Option<PathBuf>,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            ticks_per_second: default_ticks_per_second(),
            history_capacity: default_history_capacity(),
            worker_stderr: StderrMode::default(),
            log_file: None,
        }
    }
}

impl DeckConfig {
    pub fn builder() -> DeckConfigBuilder {
        DeckConfigBuilder::default()
    }

    /// Load a config from a JSON file; missing keys take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DeckError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DeckError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: DeckConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DeckError> {
        if self.ticks_per_second == 0 {
            return Err(DeckError::Configuration(
                "ticksPerSecond must be at least 1".to_string(),
            ));
        }

        if self.ticks_per_second > 1_000 {
            return Err(DeckError::Configuration(
                "ticksPerSecond should not exceed 1000".to_string(),
            ));
        }

        if self.history_capacity == 0 {
            return Err(DeckError::Configuration(
                "historyCapacity must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Period between two scheduler ticks
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.ticks_per_second.max(1)))
    }
}

fn default_title() -> String {
    "procdeck".to_string()
}
fn default_ticks_per_second() -> u32 {
    24
}
fn default_history_capacity() -> usize {
    10
}
