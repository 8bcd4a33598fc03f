//! Rigid-body entities simulated by Rapier.
//!
//! [`PhysicsWorld3d`] is a cloneable handle to one Rapier simulation. The host
//! calls [`PhysicsWorld3d::step`] once per frame; each [`RigidBodyEntity`]
//! inserts its body in `ready` and copies the solved pose back in `update`.
//!
//! ```ignore
//! let physics = PhysicsWorld3d::new();
//! stage.spawn(RigidBodyEntity::new(stage.ids(), &physics, BodyKind::Dynamic,
//!     Shape3d::Ball { radius: 0.5 }, Transform::from_xyz(0.0, 5.0, 0.0)))?;
//! loop {
//!     physics.step(dt);
//!     stage.tick(dt);
//! }
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use rapier3d::prelude::*;

use crate::entity::spatial::check_movable;
use crate::entity::{EntityCore, EntityId, IdSpace, SpatialEntity};
use crate::math::{Quat, Transform};
use crate::visual::MeshHandle;

/// Largest frame time fed into the accumulator.
const MAX_FRAME_SECS: f32 = 0.25;

/// Convert a glam Quat to a scaled-axis-angle vector (for `RigidBodyBuilder::rotation`).
fn quat_to_scaled_axis(q: Quat) -> Vec3 {
    let (axis, angle) = q.to_axis_angle();
    axis * angle
}

/// How the solver treats a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Driven by gravity, forces and contacts.
    Dynamic,
    /// Never moves; other bodies collide with it.
    Fixed,
    /// Moved by the caller, pushes dynamic bodies out of its way.
    Kinematic,
}

impl BodyKind {
    fn to_rapier(self) -> RigidBodyType {
        match self {
            BodyKind::Dynamic => RigidBodyType::Dynamic,
            BodyKind::Fixed => RigidBodyType::Fixed,
            BodyKind::Kinematic => RigidBodyType::KinematicPositionBased,
        }
    }
}

/// Collider shape attached to a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape3d {
    Ball { radius: f32 },
    Cuboid { half_extents: Vec3 },
    CapsuleY { half_height: f32, radius: f32 },
}

impl Shape3d {
    fn builder(&self) -> ColliderBuilder {
        match *self {
            Shape3d::Ball { radius } => ColliderBuilder::ball(radius),
            Shape3d::Cuboid { half_extents } => {
                ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
            Shape3d::CapsuleY {
                half_height,
                radius,
            } => ColliderBuilder::capsule_y(half_height, radius),
        }
    }
}

// ── World ───────────────────────────────────────────────────────────────

struct Simulation {
    gravity: Vec3,
    pipeline: PhysicsPipeline,
    params: IntegrationParameters,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    owners: HashMap<RigidBodyHandle, EntityId>,
    /// Bodies driven by `move_to` for one step, with the velocity to restore.
    drives: HashMap<RigidBodyHandle, Vec3>,
    accumulator: f32,
}

/// Shared handle to one Rapier simulation.
#[derive(Clone)]
pub struct PhysicsWorld3d {
    sim: Rc<RefCell<Simulation>>,
}

impl PhysicsWorld3d {
    /// A world with gravity (0, -9.81, 0) and a 1/60 s fixed step.
    pub fn new() -> Self {
        Self {
            sim: Rc::new(RefCell::new(Simulation {
                gravity: Vec3::new(0.0, -9.81, 0.0),
                pipeline: PhysicsPipeline::new(),
                params: IntegrationParameters::default(),
                islands: IslandManager::new(),
                broad_phase: DefaultBroadPhase::new(),
                narrow_phase: NarrowPhase::new(),
                bodies: RigidBodySet::new(),
                colliders: ColliderSet::new(),
                impulse_joints: ImpulseJointSet::new(),
                multibody_joints: MultibodyJointSet::new(),
                ccd_solver: CCDSolver::new(),
                owners: HashMap::new(),
                drives: HashMap::new(),
                accumulator: 0.0,
            })),
        }
    }

    /// Set gravity (builder pattern).
    pub fn with_gravity(self, gravity: Vec3) -> Self {
        self.sim.borrow_mut().gravity = gravity;
        self
    }

    pub fn gravity(&self) -> Vec3 {
        self.sim.borrow().gravity
    }

    /// Length of one solver step in seconds.
    pub fn fixed_dt(&self) -> f32 {
        self.sim.borrow().params.dt
    }

    pub fn body_count(&self) -> usize {
        self.sim.borrow().bodies.len()
    }

    /// Entity owning a body, if any.
    pub fn owner(&self, handle: RigidBodyHandle) -> Option<EntityId> {
        self.sim.borrow().owners.get(&handle).copied()
    }

    /// Advance by a frame of `dt` seconds. Runs as many fixed steps as have
    /// accumulated and returns how many that was.
    pub fn step(&self, dt: f32) -> u32 {
        if dt <= 0.0 {
            return 0;
        }
        let mut sim = self.sim.borrow_mut();
        let sim = &mut *sim;
        sim.accumulator += dt.min(MAX_FRAME_SECS);

        let fixed_dt = sim.params.dt;
        let mut steps = 0;
        while sim.accumulator >= fixed_dt {
            sim.pipeline.step(
                sim.gravity,
                &sim.params,
                &mut sim.islands,
                &mut sim.broad_phase,
                &mut sim.narrow_phase,
                &mut sim.bodies,
                &mut sim.colliders,
                &mut sim.impulse_joints,
                &mut sim.multibody_joints,
                &mut sim.ccd_solver,
                &(),
                &(),
            );
            for (handle, restore) in sim.drives.drain() {
                if let Some(body) = sim.bodies.get_mut(handle) {
                    body.set_linvel(restore, true);
                }
            }
            sim.accumulator -= fixed_dt;
            steps += 1;
        }
        steps
    }

    fn insert(&self, owner: EntityId, body: RigidBody, collider: Collider) -> RigidBodyHandle {
        let mut sim = self.sim.borrow_mut();
        let sim = &mut *sim;
        let handle = sim.bodies.insert(body);
        sim.colliders
            .insert_with_parent(collider, handle, &mut sim.bodies);
        sim.owners.insert(handle, owner);
        handle
    }

    fn remove(&self, handle: RigidBodyHandle) {
        let mut sim = self.sim.borrow_mut();
        let sim = &mut *sim;
        sim.owners.remove(&handle);
        sim.drives.remove(&handle);
        sim.bodies.remove(
            handle,
            &mut sim.islands,
            &mut sim.colliders,
            &mut sim.impulse_joints,
            &mut sim.multibody_joints,
            true,
        );
    }

    fn pose(&self, handle: RigidBodyHandle) -> Option<(Vec3, Quat)> {
        let sim = self.sim.borrow();
        let body = sim.bodies.get(handle)?;
        Some((body.translation(), *body.rotation()))
    }

    fn velocities(&self, handle: RigidBodyHandle) -> Option<(Vec3, Vec3)> {
        let sim = self.sim.borrow();
        let body = sim.bodies.get(handle)?;
        Some((body.linvel(), body.angvel()))
    }

    /// Give a body `velocity` for the next solver step only. Afterwards it
    /// gets back the velocity it had before the first pending drive.
    fn drive(&self, handle: RigidBodyHandle, velocity: Vec3) {
        let mut sim = self.sim.borrow_mut();
        let sim = &mut *sim;
        let Some(body) = sim.bodies.get_mut(handle) else {
            return;
        };
        let restore = match sim.drives.get(&handle) {
            Some(restore) => *restore,
            None => body.linvel(),
        };
        body.set_linvel(velocity, true);
        sim.drives.insert(handle, restore);
    }

    fn cancel_drive(&self, handle: RigidBodyHandle) {
        self.sim.borrow_mut().drives.remove(&handle);
    }

    /// Returns `true` while a `move_to` on `handle` waits for its step.
    pub fn is_driven(&self, handle: RigidBodyHandle) -> bool {
        self.sim.borrow().drives.contains_key(&handle)
    }

    fn with_body<R>(&self, handle: RigidBodyHandle, f: impl FnOnce(&mut RigidBody) -> R) -> Option<R> {
        let mut sim = self.sim.borrow_mut();
        sim.bodies.get_mut(handle).map(f)
    }
}

impl Default for PhysicsWorld3d {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PhysicsWorld3d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sim = self.sim.borrow();
        f.debug_struct("PhysicsWorld3d")
            .field("gravity", &sim.gravity)
            .field("bodies", &sim.bodies.len())
            .field("colliders", &sim.colliders.len())
            .finish()
    }
}

// ── Entity ──────────────────────────────────────────────────────────────

/// An entity whose pose belongs to the physics solver.
///
/// `set_position`/`set_rotation` teleport the body. `move_to` asks the solver
/// to get there: kinematic bodies are placed at the target on the next step,
/// dynamic bodies get the velocity that covers the distance in one step, then
/// fall back to the velocity they had before. Either way they are stopped by
/// whatever is in the way. Fixed bodies refuse to move.
pub struct RigidBodyEntity {
    core: EntityCore,
    world: PhysicsWorld3d,
    kind: BodyKind,
    shape: Shape3d,
    mesh: Option<MeshHandle>,
    restitution: f32,
    friction: f32,
    density: f32,
    velocity: Vec3,
    angular_velocity: Vec3,
    handle: Option<RigidBodyHandle>,
}

impl RigidBodyEntity {
    pub fn new(
        ids: &IdSpace,
        world: &PhysicsWorld3d,
        kind: BodyKind,
        shape: Shape3d,
        transform: Transform,
    ) -> Self {
        Self {
            core: EntityCore::with_transform(ids, transform),
            world: world.clone(),
            kind,
            shape,
            mesh: None,
            restitution: 0.0,
            friction: 0.5,
            density: 1.0,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            handle: None,
        }
    }

    /// Builder: draw this body with a mesh.
    pub fn with_mesh(mut self, mesh: MeshHandle) -> Self {
        self.mesh = Some(mesh);
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    pub fn shape(&self) -> Shape3d {
        self.shape
    }

    pub fn mesh(&self) -> Option<MeshHandle> {
        self.mesh
    }

    /// Linear velocity as of the last `update` or `set_velocity`.
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }

    /// Rapier handle, once `ready` has inserted the body.
    pub fn handle(&self) -> Option<RigidBodyHandle> {
        self.handle
    }
}

impl SpatialEntity for RigidBodyEntity {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn update(&mut self, _dt: f32) {
        let Some(handle) = self.handle else {
            return;
        };
        if let Some((position, rotation)) = self.world.pose(handle) {
            self.core.set_position(position);
            self.core.set_rotation(rotation);
        }
        if let Some((linear, angular)) = self.world.velocities(handle) {
            self.velocity = linear;
            self.angular_velocity = angular;
        }
    }

    fn ready(&mut self) {
        if self.handle.is_some() {
            return;
        }
        let body = RigidBodyBuilder::new(self.kind.to_rapier())
            .translation(self.core.position())
            .rotation(quat_to_scaled_axis(self.core.rotation()))
            .linvel(self.velocity)
            .angvel(self.angular_velocity)
            .build();
        let collider = self
            .shape
            .builder()
            .restitution(self.restitution)
            .friction(self.friction)
            .density(self.density)
            .build();
        let handle = self.world.insert(self.core.id(), body, collider);
        self.handle = Some(handle);
        log::debug!("entity {} inserted {:?} body", self.core.id(), self.kind);
    }

    fn describe(&self) -> String {
        format!("rigid {:?} {:?}", self.kind, self.shape)
    }

    fn set_position(&mut self, position: Vec3) {
        self.core.set_position(position);
        if let Some(handle) = self.handle {
            self.world
                .with_body(handle, |body| body.set_translation(position, true));
        }
    }

    fn set_rotation(&mut self, rotation: Quat) {
        self.core.set_rotation(rotation);
        if let Some(handle) = self.handle {
            self.world
                .with_body(handle, |body| body.set_rotation(rotation, true));
        }
    }

    fn set_velocity(&mut self, velocity: Vec3) {
        if self.kind == BodyKind::Fixed {
            return;
        }
        self.velocity = velocity;
        if let Some(handle) = self.handle {
            self.world.cancel_drive(handle);
            self.world
                .with_body(handle, |body| body.set_linvel(velocity, true));
        }
    }

    fn set_angular_velocity(&mut self, velocity: Vec3) {
        if self.kind == BodyKind::Fixed {
            return;
        }
        self.angular_velocity = velocity;
        if let Some(handle) = self.handle {
            self.world
                .with_body(handle, |body| body.set_angvel(velocity, true));
        }
    }

    fn has_visual(&self) -> bool {
        self.mesh.is_some()
    }

    fn has_collision(&self) -> bool {
        true
    }

    fn can_be_moved(&self) -> bool {
        self.kind != BodyKind::Fixed
    }

    fn move_to(&mut self, destination: Vec3) {
        if !check_movable(self) {
            return;
        }
        let Some(handle) = self.handle else {
            // Not in the simulation yet, so nothing can be in the way.
            self.core.set_position(destination);
            return;
        };
        match self.kind {
            BodyKind::Kinematic => {
                let rotation = self.core.rotation();
                self.world.with_body(handle, |body| {
                    body.set_next_kinematic_position(Pose::from_parts(destination, rotation))
                });
            }
            BodyKind::Dynamic => {
                let velocity = (destination - self.core.position()) / self.world.fixed_dt();
                self.world.drive(handle, velocity);
            }
            BodyKind::Fixed => {}
        }
    }
}

impl Drop for RigidBodyEntity {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.world.remove(handle);
        }
    }
}

impl fmt::Debug for RigidBodyEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RigidBodyEntity")
            .field("core", &self.core)
            .field("kind", &self.kind)
            .field("shape", &self.shape)
            .field("handle", &self.handle)
            .finish()
    }
}
