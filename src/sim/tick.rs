//! Fixed timestep driver
//!
//! Feeds one tick's worth of collisions into the controller, then advances
//! its clock. Hosts with variable frame times use `FixedStep` to turn frame
//! deltas into whole ticks.

use super::controller::Simulation;
use super::state::CollisionEvent;
use crate::consts::{MAX_SUBSTEPS, SIM_DT};

/// Input for a single tick (deterministic, consumed once)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Collisions reported by the physics layer since the last tick, in order
    pub collisions: Vec<CollisionEvent>,
}

/// Advance the simulation by one fixed timestep
pub fn tick(sim: &mut Simulation, input: &TickInput, dt: f32) {
    for &collision in &input.collisions {
        sim.handle_collision(collision);
    }
    sim.advance(dt);
}

/// Frame-time accumulator
#[derive(Debug, Clone, Default)]
pub struct FixedStep {
    accumulator: f32,
}

impl FixedStep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a frame delta and return how many `SIM_DT` ticks to run.
    /// Capped at `MAX_SUBSTEPS` to avoid a spiral of death.
    pub fn substeps(&mut self, frame_dt: f32) -> u32 {
        self.accumulator += frame_dt.min(0.25);
        let mut steps = 0;
        while self.accumulator >= SIM_DT && steps < MAX_SUBSTEPS {
            self.accumulator -= SIM_DT;
            steps += 1;
        }
        steps
    }
}
