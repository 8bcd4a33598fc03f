//! Collision-only entities: an invisible box that takes part in checked moves.
//!
//! Typical uses are trigger volumes, blockers and the physical half of an
//! object whose visual lives elsewhere.

use crate::collision::{ColliderProxy, CollisionWorld, MovePolicy};
use crate::entity::spatial::check_movable;
use crate::entity::{EntityCore, IdSpace, SpatialEntity};
use crate::math::{Transform, Vec3};

/// A box in a [`CollisionWorld`].
///
/// `set_position` teleports and keeps the box in sync; `move_to` and
/// velocity-driven `update` go through the world with the body's
/// [`MovePolicy`]. A fixed body cannot be moved at all.
#[derive(Debug)]
pub struct CollisionBody {
    core: EntityCore,
    proxy: ColliderProxy,
    fixed: bool,
    velocity: Vec3,
    angular_velocity: Vec3,
}

impl CollisionBody {
    pub fn new(ids: &IdSpace, world: &CollisionWorld, half_extents: Vec3) -> Self {
        Self::with_transform(ids, world, half_extents, Transform::IDENTITY)
    }

    pub fn with_transform(
        ids: &IdSpace,
        world: &CollisionWorld,
        half_extents: Vec3,
        transform: Transform,
    ) -> Self {
        let core = EntityCore::with_transform(ids, transform);
        let proxy = ColliderProxy::new(world, core.id(), half_extents, MovePolicy::default());
        Self {
            core,
            proxy,
            fixed: false,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
        }
    }

    /// Builder: choose how blocked moves resolve.
    pub fn with_policy(mut self, policy: MovePolicy) -> Self {
        self.proxy.set_policy(policy);
        self
    }

    /// Builder: a fixed body blocks others but never moves.
    pub fn fixed(mut self) -> Self {
        self.fixed = true;
        self
    }

    pub fn policy(&self) -> MovePolicy {
        self.proxy.policy()
    }

    pub fn proxy(&self) -> &ColliderProxy {
        &self.proxy
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }
}

impl SpatialEntity for CollisionBody {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn update(&mut self, dt: f32) {
        if self.fixed || dt <= 0.0 {
            return;
        }
        if self.velocity != Vec3::ZERO {
            let from = self.core.position();
            let end = self.proxy.checked_move(from, from + self.velocity * dt);
            self.core.set_position(end);
        }
        self.core.integrate_rotation(self.angular_velocity, dt);
    }

    fn ready(&mut self) {
        if !self.proxy.is_registered() {
            self.proxy.register(self.core.position());
            log::debug!("entity {} registered collision box", self.core.id());
        }
    }

    fn describe(&self) -> String {
        format!("collision {:?}{}", self.proxy.policy(), if self.fixed { " fixed" } else { "" })
    }

    fn set_position(&mut self, position: Vec3) {
        self.core.set_position(position);
        self.proxy.sync(position);
    }

    fn set_velocity(&mut self, velocity: Vec3) {
        if !self.fixed {
            self.velocity = velocity;
        }
    }

    fn set_angular_velocity(&mut self, velocity: Vec3) {
        if !self.fixed {
            self.angular_velocity = velocity;
        }
    }

    fn has_visual(&self) -> bool {
        false
    }

    fn has_collision(&self) -> bool {
        true
    }

    fn can_be_moved(&self) -> bool {
        !self.fixed
    }

    fn move_to(&mut self, destination: Vec3) {
        if !check_movable(self) {
            return;
        }
        let end = self.proxy.checked_move(self.core.position(), destination);
        self.core.set_position(end);
    }
}
