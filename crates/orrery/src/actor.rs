//! Composite entities: a visible mesh with a collision box.

use crate::collision::{ColliderProxy, CollisionWorld, MovePolicy};
use crate::entity::spatial::check_movable;
use crate::entity::{EntityCore, IdSpace, SpatialEntity};
use crate::math::{Transform, Vec3};
use crate::visual::MeshHandle;

/// Relative shortfall of a step past which an axis counts as blocked.
const BLOCKED_TOLERANCE: f32 = 1e-4;

/// A drawn object that collides: characters, crates, doors.
///
/// Movement works like [`CollisionBody`](crate::body::CollisionBody); the
/// mesh is attached alongside the collision box in `ready`.
#[derive(Debug)]
pub struct Actor {
    core: EntityCore,
    mesh: MeshHandle,
    proxy: ColliderProxy,
    velocity: Vec3,
    angular_velocity: Vec3,
    attached: bool,
}

impl Actor {
    pub fn new(
        ids: &IdSpace,
        world: &CollisionWorld,
        mesh: MeshHandle,
        half_extents: Vec3,
        transform: Transform,
    ) -> Self {
        let core = EntityCore::with_transform(ids, transform);
        let proxy = ColliderProxy::new(world, core.id(), half_extents, MovePolicy::default());
        Self {
            core,
            mesh,
            proxy,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            attached: false,
        }
    }

    pub fn with_policy(mut self, policy: MovePolicy) -> Self {
        self.proxy.set_policy(policy);
        self
    }

    pub fn mesh(&self) -> MeshHandle {
        self.mesh
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.core.set_scale(scale);
    }
}

impl SpatialEntity for Actor {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn update(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        if self.velocity != Vec3::ZERO {
            let from = self.core.position();
            let wanted = self.velocity * dt;
            let applied = self.proxy.checked_step(from, wanted);
            // Blocked axes lose their velocity, like a character hitting a wall.
            for axis in 0..3 {
                if (wanted[axis] - applied[axis]).abs() > wanted[axis].abs() * BLOCKED_TOLERANCE {
                    self.velocity[axis] = 0.0;
                }
            }
            self.core.set_position(from + applied);
        }
        self.core.integrate_rotation(self.angular_velocity, dt);
    }

    fn ready(&mut self) {
        if self.attached {
            return;
        }
        self.proxy.register(self.core.position());
        self.attached = true;
        log::debug!(
            "entity {} attached mesh {:?} with collision box",
            self.core.id(),
            self.mesh
        );
    }

    fn describe(&self) -> String {
        format!("actor mesh={} {:?}", self.mesh.0, self.proxy.policy())
    }

    fn set_position(&mut self, position: Vec3) {
        self.core.set_position(position);
        self.proxy.sync(position);
    }

    fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }

    fn set_angular_velocity(&mut self, velocity: Vec3) {
        self.angular_velocity = velocity;
    }

    fn has_visual(&self) -> bool {
        true
    }

    fn has_collision(&self) -> bool {
        true
    }

    fn can_be_moved(&self) -> bool {
        true
    }

    fn move_to(&mut self, destination: Vec3) {
        if !check_movable(self) {
            return;
        }
        let end = self.proxy.checked_move(self.core.position(), destination);
        self.core.set_position(end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::Aabb;

    fn actor(ids: &IdSpace, world: &CollisionWorld) -> Actor {
        Actor::new(ids, world, MeshHandle(9), Vec3::splat(0.5), Transform::IDENTITY)
    }

    #[test]
    fn visual_and_collision() {
        let ids = IdSpace::generational();
        let world = CollisionWorld::new();
        let a = actor(&ids, &world);
        assert!(a.has_visual() && a.has_collision() && a.can_be_moved());
        assert_eq!(a.describe(), "actor mesh=9 Slide");
    }

    #[test]
    fn ready_registers_once() {
        let ids = IdSpace::generational();
        let world = CollisionWorld::new();
        let mut a = actor(&ids, &world);
        a.ready();
        a.ready();
        assert!(a.is_attached());
        assert_eq!(world.proxy_count(), 1);
    }

    #[test]
    fn blocked_axis_loses_velocity() {
        let ids = IdSpace::generational();
        let world = CollisionWorld::new();
        world.add_static(Aabb::new(Vec3::new(-10.0, -2.0, -10.0), Vec3::new(10.0, -0.5, 10.0)));
        let mut a = actor(&ids, &world);
        a.ready();
        a.set_velocity(Vec3::new(1.0, -1.0, 0.0));
        a.update(1.0);
        // Standing on the floor: falls no further, still walks.
        assert_eq!(a.position(), Vec3::new(1.0, 0.0, 0.0));
        a.update(1.0);
        assert_eq!(a.position(), Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn free_actor_far_from_origin_keeps_velocity() {
        let ids = IdSpace::generational();
        let world = CollisionWorld::new();
        let mut a = Actor::new(&ids, &world, MeshHandle(0), Vec3::splat(0.5), Transform::from_xyz(1000.0, 0.0, 0.0));
        a.ready();
        a.set_velocity(Vec3::X);
        for _ in 0..60 {
            a.update(1.0 / 60.0);
            assert_eq!(a.velocity(), Vec3::X);
        }
        assert!((a.position().x - 1001.0).abs() < 1e-2);
    }

    #[test]
    fn actors_block_each_other() {
        let ids = IdSpace::generational();
        let world = CollisionWorld::new();
        let mut a = actor(&ids, &world);
        let mut b = Actor::new(&ids, &world, MeshHandle(1), Vec3::splat(0.5), Transform::from_xyz(3.0, 0.0, 0.0));
        a.ready();
        b.ready();
        a.move_to(Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(a.position(), Vec3::new(2.0, 0.0, 0.0));
    }
}
