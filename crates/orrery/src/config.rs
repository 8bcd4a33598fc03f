//! Stage configuration, loadable from JSON.
//!
//! ```json
//! {
//!   "allocator": { "kind": "sequential", "first": 1 },
//!   "max_dt": 0.1,
//!   "default_policy": "stop_at_contact"
//! }
//! ```
//!
//! Every field is optional; missing ones take the [`Default`] values.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::collision::MovePolicy;
use crate::entity::AllocatorStrategy;

/// Errors from loading a [`StageConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// The file couldn't be read.
    Io(std::io::Error),
    /// The contents weren't valid config JSON.
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config read failed: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse failed: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Settings for a [`Stage`](crate::stage::Stage).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Id strategy for the stage's [`IdSpace`](crate::entity::IdSpace).
    pub allocator: AllocatorStrategy,
    /// Largest step passed to `update`, in seconds. Longer frames are clamped
    /// so one hitch can't tunnel entities through walls.
    pub max_dt: f32,
    /// Policy given to collision variants built through
    /// [`Stage::collision_body`](crate::stage::Stage::collision_body) and
    /// [`Stage::actor`](crate::stage::Stage::actor).
    pub default_policy: MovePolicy,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            allocator: AllocatorStrategy::Generational,
            max_dt: 0.25,
            default_policy: MovePolicy::Slide,
        }
    }
}

impl StageConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&text)?;
        log::info!("loaded stage config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = StageConfig::from_json_str("{}").unwrap();
        assert_eq!(config, StageConfig::default());
    }

    #[test]
    fn parses_every_field() {
        let config = StageConfig::from_json_str(
            r#"{
                "allocator": { "kind": "sequential", "first": 1 },
                "max_dt": 0.1,
                "default_policy": "stop_at_contact"
            }"#,
        )
        .unwrap();
        assert_eq!(config.allocator, AllocatorStrategy::Sequential { first: 1 });
        assert!((config.max_dt - 0.1).abs() < 1e-6);
        assert_eq!(config.default_policy, MovePolicy::StopAtContact);
    }

    #[test]
    fn round_trips_through_json() {
        let config = StageConfig {
            allocator: AllocatorStrategy::Sequential { first: 7 },
            max_dt: 0.05,
            default_policy: MovePolicy::Reject,
        };
        let back = StageConfig::from_json_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn bad_json_is_a_parse_error() {
        let err = StageConfig::from_json_str("{ \"max_dt\": \"soon\" }").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().starts_with("config parse failed"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = StageConfig::from_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
