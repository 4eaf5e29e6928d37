//! Configuration for the layout kernel

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use super::declare::{Strength, Transition};

/// Errors that can occur when loading a layout configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read layout config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse layout config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid layout config: {0}")]
    Invalid(String),
}

/// Configuration options for the layout kernel
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    /// Log every dimension after each resolve
    pub debug: bool,

    /// Strength used by the convenience declaration helpers
    pub default_strength: Strength,

    /// Transition used by the convenience declaration helpers
    pub default_transition: Transition,

    /// Allowed error when checking dimension consistency
    pub tolerance: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            debug: false,
            default_strength: Strength::Strong,
            default_transition: Transition::none(),
            tolerance: 1e-6,
        }
    }
}

/// TOML structure for deserializing layout configs
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlLayoutConfig {
    debug: Option<bool>,
    default_strength: Option<Strength>,
    tolerance: Option<f64>,
    transition: Option<TomlTransition>,
}

/// Durations in milliseconds
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlTransition {
    enter: Option<u64>,
    update: Option<u64>,
    exit: Option<u64>,
}

impl LayoutConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from a TOML string; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let parsed: TomlLayoutConfig = toml::from_str(content)?;
        let mut config = Self::default();

        if let Some(debug) = parsed.debug {
            config.debug = debug;
        }
        if let Some(strength) = parsed.default_strength {
            config.default_strength = strength;
        }
        if let Some(tolerance) = parsed.tolerance {
            if !tolerance.is_finite() || tolerance < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "tolerance must be a non-negative number, got {}",
                    tolerance
                )));
            }
            config.tolerance = tolerance;
        }
        if let Some(t) = parsed.transition {
            let ms = |v: Option<u64>| Duration::from_millis(v.unwrap_or(0));
            config.default_transition = Transition {
                enter: ms(t.enter),
                update: ms(t.update),
                exit: ms(t.exit),
            };
        }
        Ok(config)
    }

    /// Enable per-tick debug logging of all dimensions
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set the strength used by convenience declarations
    pub fn with_default_strength(mut self, strength: Strength) -> Self {
        self.default_strength = strength;
        self
    }

    /// Set the transition used by convenience declarations
    pub fn with_default_transition(mut self, transition: Transition) -> Self {
        self.default_transition = transition;
        self
    }

    /// Set the consistency check tolerance
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = LayoutConfig::default();
        assert!(!config.debug);
        assert_eq!(config.default_strength, Strength::Strong);
        assert_eq!(config.default_transition, Transition::none());
    }

    #[test]
    fn test_builder_pattern() {
        let config = LayoutConfig::new()
            .with_debug(true)
            .with_default_strength(Strength::Medium)
            .with_tolerance(0.5);
        assert!(config.debug);
        assert_eq!(config.default_strength, Strength::Medium);
        assert_eq!(config.tolerance, 0.5);
    }

    #[test]
    fn test_from_toml() {
        let config = LayoutConfig::from_toml_str(
            r#"
debug = true
default_strength = "weak"

[transition]
update = 300
"#,
        )
        .unwrap();
        assert_eq!(
            config,
            LayoutConfig {
                debug: true,
                default_strength: Strength::Weak,
                default_transition: Transition::updates(Duration::from_millis(300)),
                tolerance: 1e-6,
            }
        );
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(LayoutConfig::from_toml_str("").unwrap(), LayoutConfig::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(matches!(
            LayoutConfig::from_toml_str("colour = 1"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        assert!(matches!(
            LayoutConfig::from_toml_str("tolerance = -1.0"),
            Err(ConfigError::Invalid(_))
        ));
    }
}
