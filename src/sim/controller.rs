//! Simulation controller
//!
//! Routes collisions through the split decision into pool mutations, and
//! owns the drain/delay/reapply/restart reset cycle. Constructed once and
//! passed by `&mut` to whatever drives it; there is no global instance.
//!
//! Phases:
//! - `Running`: collisions split or retire entities
//! - `ResetPending`: a reset is scheduled; collisions are still handled
//! - `Resetting`: transient while the reset runs

use super::decision::SplitDecider;
use super::pool::{EntityPool, PoolError};
use super::state::{
    CollisionEvent, CollisionOutcome, Entity, EntityHandle, GlobalParams, Participant, SimEvent,
    SimPhase,
};
use super::timer::ResetTimer;
use crate::config::{ConfigError, SimConfig, validate_probability};
use crate::consts::CAPACITY_SCALE;

/// A pool invariant was broken by the caller: fatal in debug builds,
/// logged and skipped in release
fn contract_violation(err: PoolError) {
    if cfg!(debug_assertions) {
        panic!("pool contract violated: {err}");
    }
    log::warn!("Ignoring pool contract violation: {}", err);
}

#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimConfig,
    /// Latest requested parameters; reach the pool at the next reset
    params: GlobalParams,
    pool: EntityPool,
    decider: SplitDecider,
    timer: ResetTimer,
    phase: SimPhase,
    /// Seconds since construction
    clock: f64,
    /// Outbound queue, drained by consumers
    events: Vec<SimEvent>,
    reset_count: u64,
}

impl Simulation {
    /// Build a simulation. Uses `config.seed` when present, OS entropy
    /// otherwise.
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        let decider = match config.seed {
            Some(seed) => SplitDecider::seeded(seed),
            None => SplitDecider::from_entropy(),
        };
        Self::with_decider(config, decider)
    }

    /// Build a simulation around explicit randomness sources
    pub fn with_decider(config: SimConfig, decider: SplitDecider) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut pool = EntityPool::new(config.capacity, config.spawn_template());
        pool.prewarm(config.starting_entity_count);

        let mut sim = Self {
            params: config.initial_params(),
            config,
            pool,
            decider,
            timer: ResetTimer::new(),
            phase: SimPhase::Running,
            clock: 0.0,
            events: Vec::new(),
            reset_count: 0,
        };

        // Nothing is active yet: the first reset starts the run
        sim.request_reset();
        log::info!(
            "Simulation created: capacity {}, {} prewarmed, split probability {}",
            sim.pool.capacity(),
            sim.pool.total_created(),
            sim.params.split_probability
        );
        Ok(sim)
    }

    /// Handle one collision reported by the physics layer.
    ///
    /// Returns `None` when the entity is not active (a stale event), or when
    /// it hit another ball while ball-to-ball collisions are excluded.
    pub fn handle_collision(&mut self, event: CollisionEvent) -> Option<CollisionOutcome> {
        if matches!(self.phase, SimPhase::Resetting) {
            return None;
        }
        if !self.pool.is_active(event.entity) {
            log::trace!("Ignoring collision for inactive {:?}", event.entity);
            return None;
        }

        let entity = self.pool.get(event.entity)?;
        if matches!(event.other, Participant::Entity(_)) && !entity.collision_exclusion {
            log::trace!("Ignoring excluded ball contact for {:?}", event.entity);
            return None;
        }
        let probability = entity.split_probability;
        if self.decider.decide(probability) {
            Some(self.split(event))
        } else {
            self.split_fail(event.entity)
        }
    }

    fn split(&mut self, event: CollisionEvent) -> CollisionOutcome {
        let spawned = self.pool.activate();
        match spawned {
            Some(handle) => {
                // Unit-length jitter on top of the parent's velocity
                let jitter = self.decider.jitter().normalize_or_zero();
                if let Some(entity) = self.pool.get_mut(handle) {
                    entity.pos = event.position;
                    entity.vel = event.velocity + jitter;
                }
                log::trace!("{:?} split into {:?}", event.entity, handle);
            }
            None => log::trace!("{:?} split but the pool is full", event.entity),
        }

        self.events.push(SimEvent::EntitySplit {
            parent: event.entity,
            spawned,
            counts: self.pool.counts(),
        });
        CollisionOutcome::Split { spawned }
    }

    fn split_fail(&mut self, entity: EntityHandle) -> Option<CollisionOutcome> {
        if let Err(err) = self.pool.deactivate(entity) {
            contract_violation(err);
            return None;
        }
        log::trace!("{:?} failed to split", entity);

        self.events.push(SimEvent::EntitySplitFail {
            entity,
            counts: self.pool.counts(),
        });

        if self.pool.active_count() == 0 && !self.timer.is_pending() {
            log::debug!("Active set empty, scheduling reset");
            self.request_reset();
        }
        Some(CollisionOutcome::SplitFail)
    }

    /// Update the global split probability (applied at the next reset).
    /// Out-of-range values are rejected, not clamped.
    pub fn set_split_probability(&mut self, probability: f32) -> Result<(), ConfigError> {
        self.params.split_probability = validate_probability(probability)?;
        log::info!("Split probability set to {}", probability);
        self.parameters_changed();
        Ok(())
    }

    /// Toggle ball-to-ball collisions (applied at the next reset). `false`
    /// excludes balls from colliding with each other.
    pub fn set_collision_exclusion(&mut self, enabled: bool) {
        if enabled != self.params.collision_exclusion_enabled
            && self.config.collision_capacity_scaling
        {
            let capacity = self.pool.capacity();
            let capacity = if enabled {
                capacity / CAPACITY_SCALE
            } else {
                capacity.saturating_mul(CAPACITY_SCALE)
            };
            self.pool.set_capacity(capacity);
            log::debug!("Capacity scaled to {}", self.pool.capacity());
        }

        self.params.collision_exclusion_enabled = enabled;
        log::info!("Ball-to-ball collisions set to {}", enabled);
        self.parameters_changed();
    }

    fn parameters_changed(&mut self) {
        self.events.push(SimEvent::ParametersChanged {
            params: self.params,
        });
        self.request_reset();
    }

    /// Schedule a reset after the configured delay. Any pending reset is
    /// cancelled first, so rapid requests collapse into one.
    pub fn request_reset(&mut self) {
        self.timer.schedule(self.clock, self.config.reset_delay);
        if let Some(deadline) = self.timer.deadline() {
            self.phase = SimPhase::ResetPending { deadline };
            log::debug!("Reset scheduled for t={:.3}", deadline);
        }
    }

    /// Advance the simulation clock, running the reset if it is due
    pub fn advance(&mut self, dt: f32) {
        self.clock += dt as f64;
        if self.timer.poll(self.clock).is_some() {
            self.run_reset();
        }
    }

    fn run_reset(&mut self) {
        if matches!(self.phase, SimPhase::Resetting) {
            return;
        }
        self.phase = SimPhase::Resetting;

        let drained = self.pool.deactivate_all();
        self.pool.apply_global_parameters(&self.params);

        let restarted = self.pool.activate();
        if let Some(handle) = restarted {
            let pos = self.pool.template().pos;
            let vel = self.decider.jitter();
            if let Some(entity) = self.pool.get_mut(handle) {
                entity.pos = pos;
                entity.vel = vel;
            }
        }

        self.reset_count += 1;
        log::info!(
            "Reset #{}: drained {}, split probability {}, ball-to-ball collisions {}",
            self.reset_count,
            drained,
            self.params.split_probability,
            self.params.collision_exclusion_enabled
        );
        self.events.push(SimEvent::SimulationReset {
            restarted,
            params: self.params,
            counts: self.pool.counts(),
        });
        self.phase = SimPhase::Running;
    }

    /// Take all queued events, oldest first
    pub fn drain_events(&mut self) -> std::vec::Drain<'_, SimEvent> {
        self.events.drain(..)
    }

    /// Queued events without consuming them
    pub fn pending_events(&self) -> &[SimEvent] {
        &self.events
    }

    pub fn phase(&self) -> SimPhase {
        self.phase
    }

    pub fn params(&self) -> GlobalParams {
        self.params
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn pool(&self) -> &EntityPool {
        &self.pool
    }

    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn reset_count(&self) -> u64 {
        self.reset_count
    }

    pub fn entity(&self, handle: EntityHandle) -> Option<&Entity> {
        self.pool.get(handle)
    }

    /// Mutable access for the physics layer to sync position and velocity
    pub fn entity_mut(&mut self, handle: EntityHandle) -> Option<&mut Entity> {
        self.pool.get_mut(handle)
    }

    pub fn active_entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.pool
            .active()
            .iter()
            .filter_map(move |&h| self.pool.get(h))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{CollisionEvent, PoolCounts};
    use glam::Vec2;

    fn config(probability: f32, capacity: usize, prewarm: usize) -> SimConfig {
        SimConfig {
            starting_entity_count: prewarm,
            capacity,
            starting_split_probability: probability,
            seed: Some(42),
            ..Default::default()
        }
    }

    /// Build and run the initial reset
    fn started(probability: f32, capacity: usize, prewarm: usize) -> Simulation {
        let mut sim = Simulation::new(config(probability, capacity, prewarm)).unwrap();
        sim.advance(1.0);
        sim.drain_events();
        sim
    }

    fn first_active(sim: &Simulation) -> EntityHandle {
        sim.pool().active()[0]
    }

    fn hit(sim: &mut Simulation, handle: EntityHandle) -> Option<CollisionOutcome> {
        sim.handle_collision(CollisionEvent::boundary(
            handle,
            Vec2::new(10.0, 0.0),
            Vec2::new(0.0, 3.0),
        ))
    }

    #[test]
    fn test_starts_with_pending_reset() {
        let mut sim = Simulation::new(config(0.5, 10, 4)).unwrap();
        assert_eq!(sim.phase(), SimPhase::ResetPending { deadline: 1.0 });
        assert_eq!(sim.pool().active_count(), 0);
        assert_eq!(sim.pool().inactive_count(), 4);

        sim.advance(0.5);
        assert_eq!(sim.pool().active_count(), 0);
        sim.advance(0.5);
        assert_eq!(sim.phase(), SimPhase::Running);
        assert_eq!(sim.pool().active_count(), 1);
        assert_eq!(sim.pool().inactive_count(), 3);
        let resets = sim
            .drain_events()
            .filter(|e| matches!(e, SimEvent::SimulationReset { .. }))
            .count();
        assert_eq!(resets, 1);
    }

    #[test]
    fn test_rejects_invalid_config() {
        assert!(Simulation::new(config(1.5, 10, 0)).is_err());
        assert!(Simulation::new(config(0.5, 0, 0)).is_err());
    }

    #[test]
    fn test_split_places_child_at_contact() {
        let mut sim = started(1.0, 10, 0);
        let parent = first_active(&sim);
        let outcome = hit(&mut sim, parent).unwrap();
        let CollisionOutcome::Split { spawned: Some(child) } = outcome else {
            panic!("expected a spawned entity, got {outcome:?}");
        };

        let entity = sim.entity(child).unwrap();
        assert_eq!(entity.pos, Vec2::new(10.0, 0.0));
        let jitter = entity.vel - Vec2::new(0.0, 3.0);
        assert!((jitter.length() - 1.0).abs() < 1e-4);
        assert_eq!(sim.pool().active_count(), 2);
        assert_eq!(
            sim.pending_events(),
            &[SimEvent::EntitySplit {
                parent,
                spawned: Some(child),
                counts: PoolCounts { active: 2, inactive: 0 },
            }]
        );
    }

    #[test]
    fn test_split_when_full_still_reports() {
        let mut sim = started(1.0, 1, 0);
        let parent = first_active(&sim);
        assert_eq!(
            hit(&mut sim, parent),
            Some(CollisionOutcome::Split { spawned: None })
        );
        assert_eq!(sim.pool().active_count(), 1);
        assert!(matches!(
            sim.pending_events(),
            [SimEvent::EntitySplit { spawned: None, .. }]
        ));
    }

    #[test]
    fn test_fail_retires_and_schedules_reset() {
        let mut sim = started(0.0, 10, 3);
        let entity = first_active(&sim);
        assert_eq!(hit(&mut sim, entity), Some(CollisionOutcome::SplitFail));
        assert!(!sim.pool().is_active(entity));
        assert_eq!(sim.pool().active_count(), 0);
        assert_eq!(sim.phase(), SimPhase::ResetPending { deadline: 2.0 });

        sim.advance(1.0);
        assert_eq!(sim.phase(), SimPhase::Running);
        assert_eq!(sim.pool().active_count(), 1);
        assert_eq!(sim.reset_count(), 2);
    }

    #[test]
    fn test_stale_collision_ignored() {
        let mut sim = started(0.0, 10, 0);
        let entity = first_active(&sim);
        hit(&mut sim, entity);
        sim.drain_events();
        assert_eq!(hit(&mut sim, entity), None);
        assert!(sim.pending_events().is_empty());
    }

    #[test]
    fn test_fail_does_not_push_back_pending_reset() {
        let mut sim = started(1.0, 10, 0);
        let parent = first_active(&sim);
        hit(&mut sim, parent);
        hit(&mut sim, parent);
        assert_eq!(sim.pool().active_count(), 3);

        sim.set_split_probability(0.0).unwrap();
        let deadline = sim.timer.deadline().unwrap();
        sim.advance(0.5);

        let handles = sim.pool().active().to_vec();
        for &h in &handles {
            sim.entity_mut(h).unwrap().split_probability = 0.0;
        }
        for h in handles {
            assert_eq!(hit(&mut sim, h), Some(CollisionOutcome::SplitFail));
        }
        assert_eq!(sim.pool().active_count(), 0);
        assert_eq!(sim.phase(), SimPhase::ResetPending { deadline });
    }

    #[test]
    fn test_parameters_lag_until_reset() {
        let mut sim = started(1.0, 10, 0);
        let parent = first_active(&sim);
        sim.set_split_probability(0.0).unwrap();

        // Active entity still carries the old probability and keeps splitting
        assert!(matches!(
            hit(&mut sim, parent),
            Some(CollisionOutcome::Split { spawned: Some(_) })
        ));
        assert_eq!(sim.entity(parent).unwrap().split_probability, 1.0);

        sim.advance(1.0);
        let restarted = first_active(&sim);
        assert_eq!(sim.entity(restarted).unwrap().split_probability, 0.0);
        assert_eq!(sim.pool().template().split_probability, 0.0);
    }

    #[test]
    fn test_invalid_probability_rejected() {
        let mut sim = started(0.5, 10, 0);
        assert!(matches!(
            sim.set_split_probability(1.5),
            Err(ConfigError::ProbabilityOutOfRange(_))
        ));
        assert!(sim.set_split_probability(f32::NAN).is_err());
        assert_eq!(sim.params().split_probability, 0.5);
        assert_eq!(sim.phase(), SimPhase::Running);
        assert!(sim.pending_events().is_empty());
    }

    #[test]
    fn test_collision_toggle_scales_capacity() {
        let mut sim = started(0.5, 100, 0);
        sim.set_collision_exclusion(true);
        assert_eq!(sim.capacity(), 50);
        sim.set_collision_exclusion(true);
        assert_eq!(sim.capacity(), 50);
        sim.set_collision_exclusion(false);
        assert_eq!(sim.capacity(), 100);
        assert!(matches!(sim.phase(), SimPhase::ResetPending { .. }));
    }

    #[test]
    fn test_capacity_scaling_is_exact_for_large_pools() {
        let mut sim = Simulation::new(SimConfig {
            collision_exclusion_enabled: true,
            ..config(0.5, 16_777_217, 0)
        })
        .unwrap();
        sim.set_collision_exclusion(false);
        assert_eq!(sim.capacity(), 33_554_434);
        sim.set_collision_exclusion(true);
        assert_eq!(sim.capacity(), 16_777_217);

        let mut sim = Simulation::new(SimConfig {
            collision_exclusion_enabled: true,
            ..config(0.5, usize::MAX, 0)
        })
        .unwrap();
        sim.set_collision_exclusion(false);
        assert_eq!(sim.capacity(), usize::MAX);
    }

    #[test]
    fn test_ball_contact_ignored_when_excluded() {
        let mut sim = started(1.0, 10, 0);
        let parent = first_active(&sim);
        let contact = CollisionEvent {
            entity: parent,
            position: Vec2::ZERO,
            velocity: Vec2::X,
            other: Participant::Entity(EntityHandle(7)),
        };
        let before = sim.decider.engine().state();
        assert_eq!(sim.handle_collision(contact), None);
        assert_eq!(sim.pool().active_count(), 1);
        assert!(sim.pending_events().is_empty());
        assert_eq!(sim.decider.engine().state(), before);

        // Boundary hits still count
        assert!(hit(&mut sim, parent).is_some());

        sim.entity_mut(parent).unwrap().collision_exclusion = true;
        assert!(matches!(
            sim.handle_collision(contact),
            Some(CollisionOutcome::Split { .. })
        ));
    }

    #[test]
    fn test_capacity_scaling_can_be_disabled() {
        let mut sim = Simulation::new(SimConfig {
            collision_capacity_scaling: false,
            ..config(0.5, 100, 0)
        })
        .unwrap();
        sim.set_collision_exclusion(true);
        assert_eq!(sim.capacity(), 100);
        assert!(sim.params().collision_exclusion_enabled);
    }

    #[test]
    fn test_capacity_floor() {
        let mut sim = Simulation::new(config(0.5, 1, 0)).unwrap();
        sim.set_collision_exclusion(true);
        assert_eq!(sim.capacity(), 1);
    }

    #[test]
    fn test_reset_places_restart_at_spawn_point() {
        let mut sim = Simulation::new(SimConfig {
            spawn_point: [4.0, -2.0],
            ..config(0.5, 10, 2)
        })
        .unwrap();
        sim.advance(1.0);
        let restarted = sim.entity(first_active(&sim)).unwrap();
        assert_eq!(restarted.pos, Vec2::new(4.0, -2.0));
        assert!(restarted.vel.x.abs() <= 5.0 && restarted.vel.y.abs() <= 5.0);
    }
}
