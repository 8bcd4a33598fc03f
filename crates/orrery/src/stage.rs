//! # Stage: A Flat Simulation Driver
//!
//! The [`Stage`] owns a list of boxed entities and drives them the way the
//! entity contract expects to be driven:
//!
//! ```text
//! spawn(entity)     → stored, not yet readied (rejected if built from
//!                     another id space)
//! tick(dt)
//!   1. ready() every entity spawned since the last tick (exactly once)
//!   2. update(dt) every entity, in spawn order
//! despawn(id)       → entity handed back; dropping it releases its id
//! ```
//!
//! It also owns the [`IdSpace`] and [`CollisionWorld`] that entities should be
//! built with, so one stage is one identifier space and one collision scene.
//! There is no hierarchy: every entity is a root.

use std::fmt;

use crate::actor::Actor;
use crate::body::CollisionBody;
use crate::collision::{CollisionWorld, MovePolicy};
use crate::config::StageConfig;
use crate::entity::{EntityId, EntitySnapshot, IdSpace, SpatialEntity};
use crate::math::{Transform, Vec3};
use crate::visual::MeshHandle;

/// Errors from [`Stage::spawn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageError {
    /// The entity's id came from a different [`IdSpace`] than the stage's,
    /// so it could collide with ids the stage hands out.
    ForeignIdSpace(EntityId),
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageError::ForeignIdSpace(id) => {
                write!(f, "entity {id} was built from a different id space than this stage")
            }
        }
    }
}

impl std::error::Error for StageError {}

struct Slot {
    entity: Box<dyn SpatialEntity>,
    readied: bool,
}

/// Owns entities and ticks them.
pub struct Stage {
    config: StageConfig,
    ids: IdSpace,
    collision: CollisionWorld,
    slots: Vec<Slot>,
    tick_count: u64,
}

impl Stage {
    /// A stage with default settings and its own id space.
    pub fn new() -> Self {
        Self::from_config(&StageConfig::default())
    }

    pub fn from_config(config: &StageConfig) -> Self {
        Self::with_space(IdSpace::from_strategy(config.allocator), config)
    }

    /// A stage drawing ids from an existing space, e.g. [`IdSpace::shared`].
    pub fn with_space(ids: IdSpace, config: &StageConfig) -> Self {
        Self {
            config: config.clone(),
            ids,
            collision: CollisionWorld::new(),
            slots: Vec::new(),
            tick_count: 0,
        }
    }

    /// The id space entities for this stage should be built with.
    pub fn ids(&self) -> &IdSpace {
        &self.ids
    }

    /// The collision scene entities for this stage should be built with.
    pub fn collision(&self) -> &CollisionWorld {
        &self.collision
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    /// Move policy given to collision variants built through the stage.
    pub fn default_policy(&self) -> MovePolicy {
        self.config.default_policy
    }

    /// A [`CollisionBody`] from this stage's ids and collision scene, using
    /// the configured default policy. Not spawned yet.
    pub fn collision_body(&self, half_extents: Vec3, transform: Transform) -> CollisionBody {
        CollisionBody::with_transform(&self.ids, &self.collision, half_extents, transform)
            .with_policy(self.default_policy())
    }

    /// An [`Actor`] from this stage's ids and collision scene, using the
    /// configured default policy. Not spawned yet.
    pub fn actor(&self, mesh: MeshHandle, half_extents: Vec3, transform: Transform) -> Actor {
        Actor::new(&self.ids, &self.collision, mesh, half_extents, transform)
            .with_policy(self.default_policy())
    }

    /// Take ownership of an entity. It is readied on the next [`tick`](Self::tick).
    ///
    /// An entity built from another id space is dropped and an error returned.
    pub fn spawn(&mut self, entity: impl SpatialEntity + 'static) -> Result<EntityId, StageError> {
        self.spawn_boxed(Box::new(entity))
    }

    pub fn spawn_boxed(&mut self, entity: Box<dyn SpatialEntity>) -> Result<EntityId, StageError> {
        let id = entity.id();
        if !entity.core().id_space().ptr_eq(&self.ids) {
            log::warn!("rejected entity {id}: built from a different id space than this stage");
            return Err(StageError::ForeignIdSpace(id));
        }
        log::debug!("spawned entity {id} ({:?})", entity.name());
        self.slots.push(Slot {
            entity,
            readied: false,
        });
        Ok(id)
    }

    /// Remove an entity and hand it back. Dropping it releases its id.
    pub fn despawn(&mut self, id: EntityId) -> Option<Box<dyn SpatialEntity>> {
        let index = self.slots.iter().position(|slot| slot.entity.id() == id)?;
        log::debug!("despawned entity {id}");
        Some(self.slots.remove(index).entity)
    }

    /// Drop every entity.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn get(&self, id: EntityId) -> Option<&dyn SpatialEntity> {
        self.slots
            .iter()
            .find(|slot| slot.entity.id() == id)
            .map(|slot| slot.entity.as_ref())
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut (dyn SpatialEntity + 'static)> {
        self.slots
            .iter_mut()
            .find(|slot| slot.entity.id() == id)
            .map(|slot| slot.entity.as_mut())
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Entities spawned since the last [`ready_pending`](Self::ready_pending).
    pub fn pending_ready_count(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.readied).count()
    }

    /// Ready every entity that hasn't been readied yet. Returns how many were.
    pub fn ready_pending(&mut self) -> usize {
        let mut count = 0;
        for slot in self.slots.iter_mut().filter(|slot| !slot.readied) {
            slot.entity.ready();
            slot.readied = true;
            if !slot.entity.is_ready() {
                log::warn!("entity {} did not become ready", slot.entity.id());
            }
            count += 1;
        }
        count
    }

    /// Advance the simulation by `dt` seconds (clamped to `config.max_dt`).
    pub fn tick(&mut self, dt: f32) {
        let step = dt.min(self.config.max_dt).max(0.0);
        if step != dt {
            log::trace!("clamped dt {dt} to {step}");
        }
        self.ready_pending();
        for slot in &mut self.slots {
            slot.entity.update(step);
        }
        self.tick_count += 1;
    }

    /// Checked move of one entity. Returns `false` if it doesn't exist or
    /// can't be moved.
    pub fn move_entity(&mut self, id: EntityId, destination: Vec3) -> bool {
        match self.get_mut(id) {
            Some(entity) if entity.can_be_moved() => {
                entity.move_to(destination);
                true
            }
            Some(_) => {
                log::debug!("refusing to move immovable entity {id}");
                false
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &(dyn SpatialEntity + 'static)> {
        self.slots.iter().map(|slot| slot.entity.as_ref())
    }

    /// Entities the renderer should draw.
    pub fn visible(&self) -> impl Iterator<Item = &(dyn SpatialEntity + 'static)> {
        self.iter().filter(|entity| entity.has_visual())
    }

    /// Entities taking part in collision.
    pub fn colliding(&self) -> impl Iterator<Item = &(dyn SpatialEntity + 'static)> {
        self.iter().filter(|entity| entity.has_collision())
    }

    pub fn snapshots(&self) -> Vec<EntitySnapshot> {
        self.iter().map(|entity| entity.snapshot()).collect()
    }

    /// All snapshots as a pretty-printed JSON array.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.snapshots())
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("entities", &self.slots.len())
            .field("ticks", &self.tick_count)
            .field("ids", &self.ids)
            .field("collision", &self.collision)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::Aabb;
    use crate::entity::AllocatorStrategy;
    use crate::visual::{Mobility, VisualEntity};

    fn sequential_stage() -> Stage {
        Stage::from_config(&StageConfig {
            allocator: AllocatorStrategy::Sequential { first: 1 },
            ..StageConfig::default()
        })
    }

    #[test]
    fn spawn_ready_and_tick() {
        let mut stage = sequential_stage();
        let mut e = VisualEntity::new(stage.ids(), MeshHandle(0));
        e.set_velocity(Vec3::X);
        let id = stage.spawn(e).unwrap();
        assert_eq!(id, EntityId::new(1, 0));
        assert_eq!(stage.ready_pending(), 1);
        assert_eq!(stage.ready_pending(), 0);
        stage.tick(0.1);
        stage.tick(0.1);
        let pos = stage.get(id).unwrap().position();
        assert!((pos.x - 0.2).abs() < 1e-6);
        assert_eq!(stage.tick_count(), 2);
    }

    #[test]
    fn tick_readies_before_update() {
        let mut stage = Stage::new();
        let body = CollisionBody::new(stage.ids(), stage.collision(), Vec3::splat(0.5));
        stage.spawn(body).unwrap();
        assert_eq!(stage.collision().proxy_count(), 0);
        stage.tick(0.016);
        assert_eq!(stage.collision().proxy_count(), 1);
    }

    #[test]
    fn dt_is_clamped() {
        let mut stage = Stage::new();
        let mut e = VisualEntity::new(stage.ids(), MeshHandle(0));
        e.set_velocity(Vec3::X);
        let id = stage.spawn(e).unwrap();
        stage.tick(10.0);
        assert!((stage.get(id).unwrap().position().x - 0.25).abs() < 1e-6);
        stage.tick(-1.0);
        assert!((stage.get(id).unwrap().position().x - 0.25).abs() < 1e-6);
    }

    #[test]
    fn despawn_releases_id_and_box() {
        let mut stage = sequential_stage();
        let a = stage.spawn(CollisionBody::new(stage.ids(), stage.collision(), Vec3::ONE)).unwrap();
        let b = stage.spawn(VisualEntity::new(stage.ids(), MeshHandle(0))).unwrap();
        stage.tick(0.0);
        assert_eq!(stage.ids().live_count(), 2);

        drop(stage.despawn(a));
        assert!(!stage.contains(a));
        assert!(!stage.ids().is_allocated(a));
        assert_eq!(stage.collision().proxy_count(), 0);

        let c = stage.spawn(VisualEntity::new(stage.ids(), MeshHandle(1))).unwrap();
        assert_ne!(c, b);
        assert_eq!(c.index(), 3);
        assert!(stage.despawn(a).is_none());
    }

    #[test]
    fn move_entity_respects_capabilities() {
        let mut stage = Stage::new();
        stage.collision().add_static(Aabb::new(Vec3::new(2.0, -5.0, -5.0), Vec3::new(3.0, 5.0, 5.0)));
        let actor = stage.spawn(Actor::new(
            stage.ids(),
            stage.collision(),
            MeshHandle(0),
            Vec3::splat(0.5),
            Transform::IDENTITY,
        )).unwrap();
        let statue = stage.spawn(
            VisualEntity::with_transform(stage.ids(), MeshHandle(1), Transform::from_xyz(0.0, 0.0, 9.0))
                .with_mobility(Mobility::Static),
        ).unwrap();
        stage.tick(0.0);

        assert!(stage.move_entity(actor, Vec3::new(5.0, 0.0, 0.0)));
        assert_eq!(stage.get(actor).unwrap().position(), Vec3::new(1.5, 0.0, 0.0));
        assert!(!stage.move_entity(statue, Vec3::ZERO));
        assert_eq!(stage.get(statue).unwrap().position(), Vec3::new(0.0, 0.0, 9.0));
        assert!(!stage.move_entity(EntityId::new(99, 0), Vec3::ZERO));
    }

    #[test]
    fn capability_routing() {
        let mut stage = Stage::new();
        stage.spawn(VisualEntity::new(stage.ids(), MeshHandle(0))).unwrap();
        stage.spawn(CollisionBody::new(stage.ids(), stage.collision(), Vec3::ONE)).unwrap();
        stage.spawn(Actor::new(stage.ids(), stage.collision(), MeshHandle(1), Vec3::ONE, Transform::IDENTITY)).unwrap();
        assert_eq!(stage.len(), 3);
        assert_eq!(stage.visible().count(), 2);
        assert_eq!(stage.colliding().count(), 2);
    }

    #[test]
    fn snapshots_serialize() {
        let mut stage = sequential_stage();
        let id = stage.spawn(VisualEntity::new(stage.ids(), MeshHandle(4))).unwrap();
        stage.get_mut(id).unwrap().set_name("lamp");
        let snaps = stage.snapshots();
        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].name, "lamp");
        let json = stage.to_json().unwrap();
        assert!(json.contains("\"lamp\""));
        assert!(json.contains("visual mesh=4"));
    }

    #[test]
    fn foreign_entity_is_rejected() {
        let mut stage = sequential_stage();
        let other = IdSpace::sequential(1);
        let a = stage.spawn(VisualEntity::new(stage.ids(), MeshHandle(0))).unwrap();
        let foreign = VisualEntity::new(&other, MeshHandle(1));
        assert_eq!(foreign.id(), a);

        let err = stage.spawn(foreign).unwrap_err();
        assert_eq!(err, StageError::ForeignIdSpace(a));
        assert_eq!(stage.len(), 1);
        assert_eq!(other.live_count(), 0);
        assert!(err.to_string().contains("different id space"));
    }

    #[test]
    fn shared_space_entities_are_accepted() {
        let space = IdSpace::sequential(1);
        let mut stage = Stage::with_space(space.clone(), &StageConfig::default());
        let id = stage.spawn(VisualEntity::new(&space, MeshHandle(0))).unwrap();
        assert!(stage.contains(id));
    }

    #[test]
    fn configured_policy_reaches_built_entities() {
        let mut stage = Stage::from_config(&StageConfig {
            default_policy: MovePolicy::StopAtContact,
            ..StageConfig::default()
        });
        assert_eq!(stage.default_policy(), MovePolicy::StopAtContact);
        stage.collision().add_static(Aabb::new(Vec3::new(2.0, -5.0, -5.0), Vec3::new(3.0, 5.0, 5.0)));

        let body = stage.collision_body(Vec3::splat(0.5), Transform::IDENTITY);
        assert_eq!(body.policy(), MovePolicy::StopAtContact);
        let actor = stage.actor(MeshHandle(2), Vec3::splat(0.5), Transform::from_xyz(0.0, 0.0, 20.0));
        assert!(actor.describe().ends_with("StopAtContact"));

        let body = stage.spawn(body).unwrap();
        stage.tick(0.0);
        // Diagonal into the wall: stops dead instead of sliding along it.
        assert!(stage.move_entity(body, Vec3::new(5.0, 0.0, 5.0)));
        let end = stage.get(body).unwrap().position();
        assert!((end.x - 1.5).abs() < 1e-4);
        assert!((end.z - 1.5).abs() < 1e-4);
    }

    #[test]
    fn clear_releases_everything() {
        let mut stage = Stage::new();
        for i in 0..5 {
            stage.spawn(VisualEntity::new(stage.ids(), MeshHandle(i))).unwrap();
        }
        assert_eq!(stage.ids().live_count(), 5);
        stage.clear();
        assert!(stage.is_empty());
        assert_eq!(stage.ids().live_count(), 0);
    }
}
