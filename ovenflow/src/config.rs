//! Configuration types for the bakery pipeline.

use crate::core::StageKind;
use crate::errors::{ConfigError, OvenflowError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Half-open range of ticks (`min..max`) a stage duration is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationRange {
    /// Inclusive lower bound.
    pub min: u64,
    /// Exclusive upper bound.
    pub max: u64,
}

impl DurationRange {
    /// Creates a new range.
    #[must_use]
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    /// Returns true if `ticks` lies inside the range.
    #[must_use]
    pub const fn contains(&self, ticks: u64) -> bool {
        ticks >= self.min && ticks < self.max
    }

    /// Returns true if the range holds no values.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.min >= self.max
    }
}

/// Deployment environment, used to pick the log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Human-readable logs at INFO.
    #[default]
    Development,
    /// JSON logs at WARN.
    Production,
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown environment: {other}")),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Selects format and default level.
    #[serde(default)]
    pub environment: Environment,
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl LoggingConfig {
    /// Returns the default filter directive for the environment.
    #[must_use]
    pub fn default_directive(&self) -> String {
        self.filter.clone().unwrap_or_else(|| match self.environment {
            Environment::Development => "info".to_string(),
            Environment::Production => "warn".to_string(),
        })
    }
}

/// Configuration for the production pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BakeryConfig {
    /// Wall-clock length of one tick in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Prepare stage duration range.
    #[serde(default = "default_prepare")]
    pub prepare: DurationRange,
    /// Bake stage duration range.
    #[serde(default = "default_bake")]
    pub bake: DurationRange,
    /// Pack stage duration range.
    #[serde(default = "default_pack")]
    pub pack: DurationRange,
    /// A bake drawn longer than this many ticks is burnt.
    #[serde(default = "default_burnt_threshold")]
    pub burnt_threshold: u64,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_tick_ms() -> u64 {
    1000
}

fn default_prepare() -> DurationRange {
    DurationRange::new(1, 3)
}

fn default_bake() -> DurationRange {
    DurationRange::new(3, 9)
}

fn default_pack() -> DurationRange {
    DurationRange::new(1, 2)
}

fn default_burnt_threshold() -> u64 {
    7
}

impl Default for BakeryConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            prepare: default_prepare(),
            bake: default_bake(),
            pack: default_pack(),
            burnt_threshold: default_burnt_threshold(),
            logging: LoggingConfig::default(),
        }
    }
}

impl BakeryConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, OvenflowError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, OvenflowError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Applies `OVENFLOW_*` environment overrides.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("OVENFLOW_ENV") {
            self.logging.environment = raw.parse().map_err(|_| invalid_env("OVENFLOW_ENV", &raw))?;
        }
        if let Some(raw) = lookup("OVENFLOW_TICK_MS") {
            self.tick_ms = raw.parse().map_err(|_| invalid_env("OVENFLOW_TICK_MS", &raw))?;
        }
        if let Some(raw) = lookup("OVENFLOW_BURNT_THRESHOLD") {
            self.burnt_threshold = raw
                .parse()
                .map_err(|_| invalid_env("OVENFLOW_BURNT_THRESHOLD", &raw))?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Sets the tick length.
    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick_ms = u64::try_from(tick.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the range for a stage.
    #[must_use]
    pub fn with_range(mut self, stage: StageKind, range: DurationRange) -> Self {
        match stage {
            StageKind::Prepare => self.prepare = range,
            StageKind::Bake => self.bake = range,
            StageKind::Pack => self.pack = range,
        }
        self
    }

    /// Sets the burnt threshold.
    #[must_use]
    pub fn with_burnt_threshold(mut self, ticks: u64) -> Self {
        self.burnt_threshold = ticks;
        self
    }

    /// Sets the logging environment.
    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.logging.environment = environment;
        self
    }

    /// Returns the range for a stage.
    #[must_use]
    pub const fn range(&self, stage: StageKind) -> DurationRange {
        match stage {
            StageKind::Prepare => self.prepare,
            StageKind::Bake => self.bake,
            StageKind::Pack => self.pack,
        }
    }

    /// Converts a tick count to wall-clock time.
    #[must_use]
    pub fn ticks_to_duration(&self, ticks: u64) -> Duration {
        Duration::from_millis(self.tick_ms.saturating_mul(ticks))
    }

    /// Rejects empty ranges and a zero tick.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_ms == 0 {
            return Err(ConfigError::ZeroTick);
        }
        for stage in StageKind::ALL {
            let range = self.range(stage);
            if range.is_empty() {
                return Err(ConfigError::EmptyRange {
                    stage,
                    min: range.min,
                    max: range.max,
                });
            }
        }
        Ok(())
    }
}

fn invalid_env(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnv {
        key: key.to_string(),
        value: value.to_string(),
    }
}
