//! # The Spatial Entity Contract
//!
//! [`SpatialEntity`] is the one trait every world object implements, whatever
//! backs it: a render node, a collision proxy, a rigid body, a sound source,
//! or several at once. Callers hold `Box<dyn SpatialEntity>` and decide how to
//! treat an entity by asking it, never by downcasting:
//!
//! ```text
//! has_visual()    → hand it to the renderer
//! has_collision() → it takes part in collision queries
//! can_be_moved()  → set_position / move_to are meaningful
//! ```
//!
//! ## Unchecked vs. Checked
//!
//! - [`set_position`](SpatialEntity::set_position) and
//!   [`set_rotation`](SpatialEntity::set_rotation) are *teleports*: the value
//!   is written as-is. Variants with a backing body override them only to keep
//!   that body in sync, never to adjust the value.
//! - [`move_to`](SpatialEntity::move_to) is a *movement*: the variant may stop
//!   short, slide, or refuse depending on what is in the way.
//!
//! Reading back after `set_position(p)` always yields `p`.

use serde::{Deserialize, Serialize};

use super::core::EntityCore;
use super::id::EntityId;
use crate::math::{Quat, Transform, Vec3};

/// A serializable picture of an entity at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub name: String,
    pub transform: Transform,
    pub ready: bool,
    pub has_visual: bool,
    pub has_collision: bool,
    pub can_be_moved: bool,
    /// Free-form text from [`SpatialEntity::describe`]; omitted when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Something with a position and orientation in the simulated world.
pub trait SpatialEntity {
    /// The embedded shared state.
    fn core(&self) -> &EntityCore;
    fn core_mut(&mut self) -> &mut EntityCore;

    /// Advance internal state by one simulation step of `dt` seconds.
    fn update(&mut self, dt: f32);

    /// Bind the entity to its backing resource. Called once before the first
    /// [`update`](Self::update); calling it again must be harmless.
    fn ready(&mut self);

    /// Human-readable description. Empty unless the variant has something to say.
    fn describe(&self) -> String {
        String::new()
    }

    fn position(&self) -> Vec3 {
        self.core().position()
    }

    /// Write the position without any collision or physics reconciliation.
    fn set_position(&mut self, position: Vec3) {
        self.core_mut().set_position(position);
    }

    fn rotation(&self) -> Quat {
        self.core().rotation()
    }

    /// Write the rotation without any reconciliation.
    fn set_rotation(&mut self, rotation: Quat) {
        self.core_mut().set_rotation(rotation);
    }

    fn scale(&self) -> Vec3 {
        self.core().scale()
    }

    /// Linear velocity, world units per second.
    fn set_velocity(&mut self, velocity: Vec3);

    /// Angular velocity as axis * radians per second.
    fn set_angular_velocity(&mut self, velocity: Vec3);

    fn has_visual(&self) -> bool;

    fn has_collision(&self) -> bool;

    /// Whether [`set_position`](Self::set_position) and
    /// [`move_to`](Self::move_to) mean anything for this entity.
    fn can_be_moved(&self) -> bool;

    /// Move from the current position toward `destination`, honouring
    /// whatever collision rules the variant has.
    fn move_to(&mut self, destination: Vec3);

    fn name(&self) -> &str {
        self.core().name()
    }

    fn set_name(&mut self, name: &str) {
        self.core_mut().set_name(name);
    }

    fn is_ready(&self) -> bool {
        self.core().is_ready()
    }

    fn id(&self) -> EntityId {
        self.core().id()
    }

    fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id(),
            name: self.name().to_string(),
            transform: Transform {
                translation: self.position(),
                rotation: self.rotation(),
                scale: self.scale(),
            },
            ready: self.is_ready(),
            has_visual: self.has_visual(),
            has_collision: self.has_collision(),
            can_be_moved: self.can_be_moved(),
            description: self.describe(),
        }
    }
}

/// Shared `move_to` guard: logs and returns `false` for immovable entities.
pub(crate) fn check_movable(entity: &dyn SpatialEntity) -> bool {
    if entity.can_be_moved() {
        true
    } else {
        log::warn!("move_to ignored: entity {} cannot be moved", entity.id());
        false
    }
}
