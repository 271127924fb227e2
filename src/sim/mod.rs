//! Deterministic simulation module
//!
//! All split/pool logic lives here. Given a fixed seed the module is
//! deterministic:
//! - Time only moves through `advance`/`tick`
//! - Seeded randomness only
//! - FIFO entity reuse
//! - No physics, rendering or platform dependencies

pub mod controller;
pub mod decision;
pub mod pool;
pub mod prng;
pub mod state;
pub mod tick;
pub mod timer;

pub use controller::Simulation;
pub use decision::{HALF_TOLERANCE, SPLIT_BIT_RANGE, SplitDecider, decide, is_coin_flip};
pub use pool::{EntityPool, PoolError};
pub use prng::{SeedError, Xoshiro256Plus};
pub use state::{
    CollisionEvent, CollisionOutcome, Entity, EntityHandle, GlobalParams, Participant, PoolCounts,
    SimEvent, SimPhase, SpawnTemplate,
};
pub use tick::{FixedStep, TickInput, tick};
pub use timer::{ResetTimer, TimerHandle};
