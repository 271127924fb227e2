//! Split Pool - a splitting-ball simulation core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (PRNG, split decisions, entity pool, reset cycle)
//! - `config`: Startup configuration with validation
//! - `stats`: Running statistics built from simulation events
//!
//! Physics, rendering and UI live outside this crate. The host reports
//! collisions and drives time; the core decides split/no-split and recycles
//! entities.

pub mod config;
pub mod sim;
pub mod stats;

pub use config::{ConfigError, SimConfig};
pub use stats::RunStats;

/// Simulation configuration constants
pub mod consts {
    /// Fixed host timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Seconds between a reset request and the restart
    pub const DEFAULT_RESET_DELAY: f32 = 1.0;
    /// Half-extent of the random velocity box used for spawns and restarts
    pub const SPAWN_JITTER: f32 = 5.0;

    /// Default active-set cap
    pub const DEFAULT_CAPACITY: usize = 500;
    /// Default number of pre-created inactive entities
    pub const DEFAULT_STARTING_ENTITIES: usize = 20;
    /// Default split probability
    pub const DEFAULT_SPLIT_PROBABILITY: f32 = 0.5;

    /// Capacity is divided by this when ball-to-ball collisions are switched
    /// on, and multiplied by it when they are switched off
    pub const CAPACITY_SCALE: usize = 2;
}
