//! Simulation entities, parameters and events
//!
//! Plain data shared by the pool and the controller.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_SPLIT_PROBABILITY;

/// Opaque entity id, assigned in creation order and never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityHandle(pub(crate) u32);

impl EntityHandle {
    /// Raw index (creation order)
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A ball entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub handle: EntityHandle,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Normally mirrors the global value as of the last reset
    pub split_probability: f32,
    /// Collides with other balls. When clear, ball-to-ball contacts are
    /// excluded and ignored.
    pub collision_exclusion: bool,
}

/// Prototype for newly created entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnTemplate {
    pub pos: Vec2,
    pub split_probability: f32,
    pub collision_exclusion: bool,
}

impl Default for SpawnTemplate {
    fn default() -> Self {
        Self {
            pos: Vec2::ZERO,
            split_probability: DEFAULT_SPLIT_PROBABILITY,
            collision_exclusion: false,
        }
    }
}

impl SpawnTemplate {
    /// Instantiate an entity from this template
    pub fn instantiate(&self, handle: EntityHandle) -> Entity {
        Entity {
            handle,
            pos: self.pos,
            vel: Vec2::ZERO,
            split_probability: self.split_probability,
            collision_exclusion: self.collision_exclusion,
        }
    }

    fn apply(&mut self, params: &GlobalParams) {
        self.split_probability = params.split_probability;
        self.collision_exclusion = params.collision_exclusion_enabled;
    }
}

/// Global tunables, applied to recycled entities at reset time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlobalParams {
    pub split_probability: f32,
    pub collision_exclusion_enabled: bool,
}

impl Default for GlobalParams {
    fn default() -> Self {
        Self {
            split_probability: DEFAULT_SPLIT_PROBABILITY,
            collision_exclusion_enabled: false,
        }
    }
}

impl GlobalParams {
    /// Overwrite the per-entity copies on `entity`
    pub fn apply_to(&self, entity: &mut Entity) {
        entity.split_probability = self.split_probability;
        entity.collision_exclusion = self.collision_exclusion_enabled;
    }

    pub fn apply_to_template(&self, template: &mut SpawnTemplate) {
        template.apply(self);
    }
}

/// Pool occupancy snapshot carried on events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoolCounts {
    pub active: usize,
    pub inactive: usize,
}

impl PoolCounts {
    pub fn total(&self) -> usize {
        self.active + self.inactive
    }
}

/// What the colliding entity hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Participant {
    /// Arena border or any static collider
    Boundary,
    /// Another pooled entity
    Entity(EntityHandle),
}

/// Collision notification from the physics layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionEvent {
    pub entity: EntityHandle,
    /// Position of the colliding entity at contact
    pub position: Vec2,
    /// Velocity of the colliding entity at contact
    pub velocity: Vec2,
    pub other: Participant,
}

impl CollisionEvent {
    pub fn boundary(entity: EntityHandle, position: Vec2, velocity: Vec2) -> Self {
        Self {
            entity,
            position,
            velocity,
            other: Participant::Boundary,
        }
    }
}

/// Outbound notifications for telemetry/UI consumers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SimEvent {
    /// Collision decided "split". `spawned` is `None` when the pool was full.
    EntitySplit {
        parent: EntityHandle,
        spawned: Option<EntityHandle>,
        counts: PoolCounts,
    },
    /// Collision decided "fail"; the entity went back to the pool
    EntitySplitFail {
        entity: EntityHandle,
        counts: PoolCounts,
    },
    /// Reset cycle completed
    SimulationReset {
        restarted: Option<EntityHandle>,
        params: GlobalParams,
        counts: PoolCounts,
    },
    /// A runtime parameter update was accepted (takes effect at the next reset)
    ParametersChanged { params: GlobalParams },
}

/// Result of handling one collision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionOutcome {
    Split { spawned: Option<EntityHandle> },
    SplitFail,
}

/// Controller phase
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SimPhase {
    Running,
    /// Reset scheduled for `deadline` (simulation clock, seconds)
    ResetPending { deadline: f64 },
    /// Draining and restarting
    Resetting,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_instantiate() {
        let template = SpawnTemplate {
            pos: Vec2::new(1.0, 2.0),
            split_probability: 0.25,
            collision_exclusion: true,
        };
        let entity = template.instantiate(EntityHandle(7));
        assert_eq!(entity.handle.index(), 7);
        assert_eq!(entity.pos, Vec2::new(1.0, 2.0));
        assert_eq!(entity.vel, Vec2::ZERO);
        assert_eq!(entity.split_probability, 0.25);
        assert!(entity.collision_exclusion);
    }

    #[test]
    fn test_params_apply() {
        let params = GlobalParams {
            split_probability: 0.9,
            collision_exclusion_enabled: true,
        };
        let mut template = SpawnTemplate::default();
        params.apply_to_template(&mut template);
        assert_eq!(template.split_probability, 0.9);
        assert!(template.collision_exclusion);

        let mut entity = SpawnTemplate::default().instantiate(EntityHandle(0));
        params.apply_to(&mut entity);
        assert_eq!(entity.split_probability, 0.9);
        assert!(entity.collision_exclusion);
    }

    #[test]
    fn test_event_json_tagging() {
        let event = SimEvent::EntitySplitFail {
            entity: EntityHandle(3),
            counts: PoolCounts { active: 0, inactive: 4 },
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"EntitySplitFail\""));
        let back: SimEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
