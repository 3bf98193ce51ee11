//! Typed configuration for the turn-resolution engine.
//!
//! Every section defaults to the values in [`crate::constants`], so an empty
//! JSON object is a valid configuration. Load with [`SkirmishConfig::from_json`]
//! or [`SkirmishConfig::load`]; both validate before returning.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::heat::HeatThresholds;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse JSON content.
    #[error("failed to parse config JSON: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// A value parsed but is out of range.
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkirmishConfig {
    #[serde(default)]
    pub turn: TurnConfig,
    #[serde(default)]
    pub heat: HeatConfig,
    #[serde(default)]
    pub fire: FireConfig,
}

/// Simulation-phase timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnConfig {
    /// Length of the Simulation phase in seconds.
    pub simulation_duration_secs: f64,
    pub movement_fraction: f64,
    pub weapon_firing_fraction: f64,
    pub projectile_travel_fraction: f64,
}

/// Heat tiers, ceiling and turn-end dissipation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatConfig {
    /// Tier thresholds against a max heat of [`REFERENCE_MAX_HEAT`].
    pub thresholds: HeatThresholds,
    pub activation_ceiling_factor: f64,
    pub base_dissipation: f64,
    pub radiator_bonus: f64,
    pub notify_epsilon: f64,
}

/// Fire queue timing and arc prediction resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireConfig {
    pub settle_margin_secs: f64,
    pub spin_up_quantum_secs: f64,
    pub prediction_samples: u32,
    pub window_samples: u32,
}

impl SkirmishConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.turn.validate()?;
        self.heat.validate()?;
        self.fire.validate()
    }
}

impl TurnConfig {
    /// Sum of the three stage fractions.
    pub fn fraction_total(&self) -> f64 {
        self.movement_fraction + self.weapon_firing_fraction + self.projectile_travel_fraction
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.simulation_duration_secs > 0.0) {
            return Err(invalid(
                "turn.simulation_duration_secs",
                format!("must be positive, got {}", self.simulation_duration_secs),
            ));
        }
        let fractions = [
            ("turn.movement_fraction", self.movement_fraction),
            ("turn.weapon_firing_fraction", self.weapon_firing_fraction),
            ("turn.projectile_travel_fraction", self.projectile_travel_fraction),
        ];
        for (field, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(field, format!("must be within 0..=1, got {value}")));
            }
        }
        let total = self.fraction_total();
        if (total - 1.0).abs() > STAGE_FRACTION_TOLERANCE {
            return Err(invalid(
                "turn.*_fraction",
                format!("stage fractions must sum to 1.0, got {total}"),
            ));
        }
        Ok(())
    }
}

impl HeatConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.thresholds.is_ascending() || self.thresholds.minor <= 0.0 {
            return Err(invalid(
                "heat.thresholds",
                "thresholds must be positive and strictly ascending".into(),
            ));
        }
        if self.activation_ceiling_factor < 1.0 {
            return Err(invalid(
                "heat.activation_ceiling_factor",
                format!("must be at least 1.0, got {}", self.activation_ceiling_factor),
            ));
        }
        if self.base_dissipation < 0.0 || self.radiator_bonus < 0.0 {
            return Err(invalid(
                "heat.base_dissipation",
                "dissipation rates cannot be negative".into(),
            ));
        }
        Ok(())
    }
}

impl FireConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.spin_up_quantum_secs > 0.0) {
            return Err(invalid(
                "fire.spin_up_quantum_secs",
                format!("must be positive, got {}", self.spin_up_quantum_secs),
            ));
        }
        if self.settle_margin_secs < 0.0 {
            return Err(invalid(
                "fire.settle_margin_secs",
                format!("cannot be negative, got {}", self.settle_margin_secs),
            ));
        }
        if self.prediction_samples == 0 || self.window_samples == 0 {
            return Err(invalid(
                "fire.prediction_samples",
                "sample counts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            simulation_duration_secs: SIMULATION_DURATION_SECS,
            movement_fraction: MOVEMENT_FRACTION,
            weapon_firing_fraction: WEAPON_FIRING_FRACTION,
            projectile_travel_fraction: PROJECTILE_TRAVEL_FRACTION,
        }
    }
}

impl Default for HeatConfig {
    fn default() -> Self {
        Self {
            thresholds: HeatThresholds::default(),
            activation_ceiling_factor: ACTIVATION_CEILING_FACTOR,
            base_dissipation: BASE_DISSIPATION,
            radiator_bonus: RADIATOR_BONUS,
            notify_epsilon: HEAT_NOTIFY_EPSILON,
        }
    }
}

impl Default for FireConfig {
    fn default() -> Self {
        Self {
            settle_margin_secs: VOLLEY_SETTLE_MARGIN_SECS,
            spin_up_quantum_secs: SPIN_UP_QUANTUM_SECS,
            prediction_samples: PREDICTION_SAMPLES,
            window_samples: WINDOW_SAMPLES,
        }
    }
}
