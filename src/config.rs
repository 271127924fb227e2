//! Startup configuration
//!
//! Supplied once when the simulation is built. Loaded from JSON on native
//! hosts; every field falls back to its default when missing.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;
use crate::sim::{GlobalParams, SpawnTemplate};

/// Configuration problems, reported before the simulation starts
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("split probability {0} is outside [0, 1]")]
    ProbabilityOutOfRange(f32),
    #[error("capacity must be at least 1")]
    ZeroCapacity,
    #[error("reset delay must be a positive number of seconds, got {0}")]
    InvalidResetDelay(f32),
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Reject probabilities outside [0, 1] (NaN included) instead of clamping
pub fn validate_probability(probability: f32) -> Result<f32, ConfigError> {
    if (0.0..=1.0).contains(&probability) {
        Ok(probability)
    } else {
        Err(ConfigError::ProbabilityOutOfRange(probability))
    }
}

/// Simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Entities created up front in the inactive set
    pub starting_entity_count: usize,
    /// Maximum size of the active set
    pub capacity: usize,
    /// Initial global split probability
    pub starting_split_probability: f32,
    /// Whether balls collide with each other. When false the physics layer
    /// excludes ball-to-ball contacts.
    pub collision_exclusion_enabled: bool,

    /// Seconds between a reset request and the restart
    pub reset_delay: f32,
    /// Where restarted entities appear
    pub spawn_point: [f32; 2],
    /// Halve the capacity when ball-to-ball collisions are switched on,
    /// double it when they are switched off
    pub collision_capacity_scaling: bool,
    /// Fixed seed for reproducible runs (OS entropy when absent)
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            starting_entity_count: DEFAULT_STARTING_ENTITIES,
            capacity: DEFAULT_CAPACITY,
            starting_split_probability: DEFAULT_SPLIT_PROBABILITY,
            collision_exclusion_enabled: false,

            reset_delay: DEFAULT_RESET_DELAY,
            spawn_point: [0.0, 0.0],
            collision_capacity_scaling: true,
            seed: None,
        }
    }
}

impl SimConfig {
    /// Check every field; the first problem wins
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_probability(self.starting_split_probability)?;
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if !(self.reset_delay.is_finite() && self.reset_delay > 0.0) {
            return Err(ConfigError::InvalidResetDelay(self.reset_delay));
        }
        Ok(())
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Global parameters at startup
    pub fn initial_params(&self) -> GlobalParams {
        GlobalParams {
            split_probability: self.starting_split_probability,
            collision_exclusion_enabled: self.collision_exclusion_enabled,
        }
    }

    /// Prototype for newly created entities
    pub fn spawn_template(&self) -> SpawnTemplate {
        SpawnTemplate {
            pos: Vec2::from_array(self.spawn_point),
            split_probability: self.starting_split_probability,
            collision_exclusion: self.collision_exclusion_enabled,
        }
    }
}
