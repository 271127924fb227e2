//! Fixed-capacity entity pool
//!
//! Every entity ever created sits in exactly one of two sets:
//! - `active`: participating in the simulation (bounded by `capacity`)
//! - `inactive`: dormant, reused oldest-first
//!
//! Entities are never destroyed. Both sets are O(1) to count and to test
//! for membership.

use std::collections::VecDeque;

use thiserror::Error;

use super::state::{Entity, EntityHandle, GlobalParams, PoolCounts, SpawnTemplate};

/// Pool contract violations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Handle is unknown or not currently active
    #[error("entity {0:?} is not active in this pool")]
    InvalidHandle(EntityHandle),
}

/// Where an entity currently lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// Index into `active`
    Active(usize),
    Inactive,
}

#[derive(Debug, Clone)]
pub struct EntityPool {
    /// All entities, indexed by handle
    entities: Vec<Entity>,
    /// Membership per handle (parallel to `entities`)
    slots: Vec<Slot>,
    active: Vec<EntityHandle>,
    /// Front is the oldest inserted
    inactive: VecDeque<EntityHandle>,
    template: SpawnTemplate,
    capacity: usize,
}

impl EntityPool {
    /// Create an empty pool. A zero capacity is raised to 1.
    pub fn new(capacity: usize, template: SpawnTemplate) -> Self {
        Self {
            entities: Vec::new(),
            slots: Vec::new(),
            active: Vec::new(),
            inactive: VecDeque::new(),
            template,
            capacity: capacity.max(1),
        }
    }

    /// Create `count` entities directly in the inactive set
    pub fn prewarm(&mut self, count: usize) {
        self.entities.reserve(count);
        self.slots.reserve(count);
        for _ in 0..count {
            let handle = self.create();
            self.inactive.push_back(handle);
        }
        log::debug!("Pool prewarmed with {} entities", count);
    }

    /// Promote one entity to the active set.
    ///
    /// Reuses the oldest inactive entity, or creates one from the spawn
    /// template when none is dormant. Returns `None` when the active set is
    /// at capacity; that is backpressure, not an error.
    pub fn activate(&mut self) -> Option<EntityHandle> {
        if self.active.len() >= self.capacity {
            return None;
        }

        let handle = match self.inactive.pop_front() {
            Some(handle) => handle,
            None => {
                let handle = self.create();
                log::debug!("Pool grew to {} entities", self.entities.len());
                handle
            }
        };

        self.slots[handle.index()] = Slot::Active(self.active.len());
        self.active.push(handle);
        Some(handle)
    }

    /// Return an active entity to the back of the inactive queue
    pub fn deactivate(&mut self, handle: EntityHandle) -> Result<(), PoolError> {
        let Some(Slot::Active(pos)) = self.slots.get(handle.index()).copied() else {
            return Err(PoolError::InvalidHandle(handle));
        };

        self.active.swap_remove(pos);
        if let Some(&moved) = self.active.get(pos) {
            self.slots[moved.index()] = Slot::Active(pos);
        }
        self.slots[handle.index()] = Slot::Inactive;
        self.inactive.push_back(handle);
        Ok(())
    }

    /// Deactivate everything, in active-set order. Returns how many moved.
    pub fn deactivate_all(&mut self) -> usize {
        let drained = self.active.len();
        for handle in self.active.drain(..) {
            self.slots[handle.index()] = Slot::Inactive;
            self.inactive.push_back(handle);
        }
        drained
    }

    /// Copy global parameters onto every inactive entity and the spawn
    /// template. Active entities keep their values until recycled.
    pub fn apply_global_parameters(&mut self, params: &GlobalParams) {
        for handle in &self.inactive {
            params.apply_to(&mut self.entities[handle.index()]);
        }
        params.apply_to_template(&mut self.template);
    }

    #[inline]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    #[inline]
    pub fn inactive_count(&self) -> usize {
        self.inactive.len()
    }

    #[inline]
    pub fn total_created(&self) -> usize {
        self.entities.len()
    }

    pub fn counts(&self) -> PoolCounts {
        PoolCounts {
            active: self.active_count(),
            inactive: self.inactive_count(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the active-set cap (floor 1). Entities already active above a
    /// lowered cap stay active; `activate` refuses until they drain.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
    }

    #[inline]
    pub fn is_active(&self, handle: EntityHandle) -> bool {
        matches!(self.slots.get(handle.index()), Some(Slot::Active(_)))
    }

    pub fn get(&self, handle: EntityHandle) -> Option<&Entity> {
        self.entities.get(handle.index())
    }

    pub fn get_mut(&mut self, handle: EntityHandle) -> Option<&mut Entity> {
        self.entities.get_mut(handle.index())
    }

    /// Active handles (unordered)
    pub fn active(&self) -> &[EntityHandle] {
        &self.active
    }

    /// Inactive handles, oldest first
    pub fn inactive(&self) -> impl Iterator<Item = EntityHandle> + '_ {
        self.inactive.iter().copied()
    }

    pub fn template(&self) -> &SpawnTemplate {
        &self.template
    }

    /// Full O(n) check of the active/inactive partition
    pub fn partition_is_consistent(&self) -> bool {
        if self.active.len() + self.inactive.len() != self.entities.len()
            || self.slots.len() != self.entities.len()
        {
            return false;
        }

        let active_ok = self
            .active
            .iter()
            .enumerate()
            .all(|(pos, h)| self.slots[h.index()] == Slot::Active(pos));
        let mut seen = vec![false; self.entities.len()];
        let inactive_ok = self.inactive.iter().all(|h| {
            let fresh = !std::mem::replace(&mut seen[h.index()], true);
            fresh && self.slots[h.index()] == Slot::Inactive
        });

        active_ok && inactive_ok
    }

    fn create(&mut self) -> EntityHandle {
        let handle = EntityHandle(self.entities.len() as u32);
        self.entities.push(self.template.instantiate(handle));
        // Placeholder; the caller files it into a set immediately
        self.slots.push(Slot::Inactive);
        handle
    }
}
