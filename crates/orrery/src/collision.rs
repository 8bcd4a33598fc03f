//! # Collision Seam for Checked Movement
//!
//! This is the minimum an entity needs to honour
//! [`move_to`](crate::entity::SpatialEntity::move_to): axis-aligned boxes, a
//! shared [`CollisionWorld`] holding static geometry plus one box per
//! colliding entity, and a [`MovePolicy`] saying what to do when something is
//! in the way.
//!
//! ```text
//! CollisionWorld (cloneable handle, Arc<RwLock<..>>)
//!   statics: Vec<Aabb>                 ← level geometry, never moves
//!   proxies: HashMap<EntityId, Aabb>   ← one per registered entity
//!
//! resolve(mover, delta, policy, ignore)
//!   Slide         → clip X, then Y, then Z against every solid
//!   StopAtContact → travel to the earliest time of impact
//!   Reject        → all or nothing
//! ```
//!
//! Boxes that already overlap the mover at the start of a move are ignored by
//! every policy, so an entity placed inside geometry with an unchecked
//! `set_position` can still move out of it.
//!
//! It is not a physics engine. Rapier-backed entities (feature `physics3d`)
//! let the solver decide instead.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::math::Vec3;

// ── Aabb ────────────────────────────────────────────────────────────────

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Box spanning two corners, in any order.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        let half = half_extents.abs();
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn translate(&self, delta: Vec3) -> Self {
        Self {
            min: self.min + delta,
            max: self.max + delta,
        }
    }

    /// Strict overlap. Boxes that only share a face do not intersect.
    pub fn intersects(&self, other: &Aabb) -> bool {
        (0..3).all(|axis| self.overlaps_on(other, axis))
    }

    fn overlaps_on(&self, other: &Aabb, axis: usize) -> bool {
        self.min[axis] < other.max[axis] && self.max[axis] > other.min[axis]
    }

    /// Limit a move of `mover` by `delta` along `axis` so it stops at this box.
    ///
    /// Returns `delta` unchanged when the boxes don't overlap on the other two
    /// axes, or when `mover` is not on the side it is moving away from.
    pub fn clip_axis(&self, mover: &Aabb, axis: usize, delta: f32) -> f32 {
        let (a, b) = ((axis + 1) % 3, (axis + 2) % 3);
        if !self.overlaps_on(mover, a) || !self.overlaps_on(mover, b) {
            return delta;
        }
        if delta > 0.0 && mover.max[axis] <= self.min[axis] {
            delta.min(self.min[axis] - mover.max[axis])
        } else if delta < 0.0 && mover.min[axis] >= self.max[axis] {
            delta.max(self.max[axis] - mover.min[axis])
        } else {
            delta
        }
    }

    /// Fraction of `delta` (in `[0, 1]`) after which `mover` first touches
    /// this box, or `None` if it never does or already overlaps it.
    pub fn time_of_impact(&self, mover: &Aabb, delta: Vec3) -> Option<f32> {
        if self.intersects(mover) {
            return None;
        }
        let mut t_enter = 0.0f32;
        let mut t_exit = 1.0f32;
        for axis in 0..3 {
            let d = delta[axis];
            if d == 0.0 {
                if !self.overlaps_on(mover, axis) {
                    return None;
                }
                continue;
            }
            let (enter, exit) = if d > 0.0 {
                (
                    (self.min[axis] - mover.max[axis]) / d,
                    (self.max[axis] - mover.min[axis]) / d,
                )
            } else {
                (
                    (self.max[axis] - mover.min[axis]) / d,
                    (self.min[axis] - mover.max[axis]) / d,
                )
            };
            t_enter = t_enter.max(enter);
            t_exit = t_exit.min(exit);
            if t_enter >= t_exit {
                return None;
            }
        }
        Some(t_enter)
    }
}

// ── MovePolicy ──────────────────────────────────────────────────────────

/// What a checked move does when something is in the way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovePolicy {
    /// Clip each axis separately, so the mover slides along walls.
    #[default]
    Slide,
    /// Travel along the straight line and stop at the first contact.
    StopAtContact,
    /// Don't move at all if the straight line hits anything.
    Reject,
}

// ── CollisionWorld ──────────────────────────────────────────────────────

#[derive(Default)]
struct Colliders {
    statics: Vec<Aabb>,
    proxies: HashMap<EntityId, Aabb>,
}

impl Colliders {
    fn solids(&self, ignore: Option<EntityId>) -> impl Iterator<Item = &Aabb> {
        self.statics.iter().chain(
            self.proxies
                .iter()
                .filter(move |(id, _)| Some(**id) != ignore)
                .map(|(_, aabb)| aabb),
        )
    }

    fn earliest_impact(&self, mover: &Aabb, delta: Vec3, ignore: Option<EntityId>) -> Option<f32> {
        self.solids(ignore)
            .filter_map(|solid| solid.time_of_impact(mover, delta))
            .reduce(f32::min)
    }
}

/// Shared handle to the boxes checked moves are tested against.
///
/// Clones refer to the same world.
#[derive(Clone, Default)]
pub struct CollisionWorld {
    inner: Arc<RwLock<Colliders>>,
}

impl CollisionWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add immovable geometry.
    pub fn add_static(&self, aabb: Aabb) {
        self.write().statics.push(aabb);
    }

    pub fn static_count(&self) -> usize {
        self.read().statics.len()
    }

    /// Register (or replace) the box owned by `id`.
    pub fn insert_proxy(&self, id: EntityId, aabb: Aabb) {
        self.write().proxies.insert(id, aabb);
    }

    /// Move the box owned by `id`. Returns `false` if `id` has no box.
    pub fn update_proxy(&self, id: EntityId, aabb: Aabb) -> bool {
        match self.write().proxies.get_mut(&id) {
            Some(slot) => {
                *slot = aabb;
                true
            }
            None => false,
        }
    }

    pub fn remove_proxy(&self, id: EntityId) -> Option<Aabb> {
        self.write().proxies.remove(&id)
    }

    pub fn proxy(&self, id: EntityId) -> Option<Aabb> {
        self.read().proxies.get(&id).copied()
    }

    pub fn proxy_count(&self) -> usize {
        self.read().proxies.len()
    }

    /// Returns `true` if `aabb` intersects any solid other than `ignore`'s box.
    pub fn overlaps(&self, aabb: &Aabb, ignore: Option<EntityId>) -> bool {
        self.read().solids(ignore).any(|solid| solid.intersects(aabb))
    }

    /// The part of `delta` that `mover` may actually travel under `policy`.
    pub fn resolve(
        &self,
        mover: Aabb,
        delta: Vec3,
        policy: MovePolicy,
        ignore: Option<EntityId>,
    ) -> Vec3 {
        let colliders = self.read();
        match policy {
            MovePolicy::Slide => {
                let mut moved = mover;
                let mut applied = Vec3::ZERO;
                for axis in 0..3 {
                    let mut d = delta[axis];
                    if d == 0.0 {
                        continue;
                    }
                    for solid in colliders.solids(ignore) {
                        d = solid.clip_axis(&moved, axis, d);
                    }
                    applied[axis] = d;
                    let mut step = Vec3::ZERO;
                    step[axis] = d;
                    moved = moved.translate(step);
                }
                applied
            }
            MovePolicy::StopAtContact => match colliders.earliest_impact(&mover, delta, ignore) {
                Some(t) => delta * t,
                None => delta,
            },
            MovePolicy::Reject => match colliders.earliest_impact(&mover, delta, ignore) {
                Some(t) if t < 1.0 => Vec3::ZERO,
                _ => delta,
            },
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Colliders> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Colliders> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for CollisionWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let colliders = self.read();
        f.debug_struct("CollisionWorld")
            .field("statics", &colliders.statics.len())
            .field("proxies", &colliders.proxies.len())
            .finish()
    }
}

// ── ColliderProxy ───────────────────────────────────────────────────────

/// An entity's box in a [`CollisionWorld`], centred on the entity position.
///
/// Owned by colliding variants. The box is inserted by
/// [`register`](Self::register) (from the variant's `ready`) and removed
/// when the proxy is dropped.
pub struct ColliderProxy {
    world: CollisionWorld,
    owner: EntityId,
    half_extents: Vec3,
    policy: MovePolicy,
    registered: bool,
}

impl ColliderProxy {
    pub fn new(world: &CollisionWorld, owner: EntityId, half_extents: Vec3, policy: MovePolicy) -> Self {
        Self {
            world: world.clone(),
            owner,
            half_extents: half_extents.abs(),
            policy,
            registered: false,
        }
    }

    /// Insert the box at `center`. Does nothing if already registered.
    pub fn register(&mut self, center: Vec3) {
        if self.registered {
            return;
        }
        self.world.insert_proxy(self.owner, self.bounds(center));
        self.registered = true;
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Move the registered box to `center` without any checks.
    pub fn sync(&self, center: Vec3) {
        if self.registered {
            self.world.update_proxy(self.owner, self.bounds(center));
        }
    }

    pub fn bounds(&self, center: Vec3) -> Aabb {
        Aabb::from_center(center, self.half_extents)
    }

    pub fn policy(&self) -> MovePolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: MovePolicy) {
        self.policy = policy;
    }

    pub fn world(&self) -> &CollisionWorld {
        &self.world
    }

    /// Resolve a move from `from` to `to` and return where the box ends up.
    /// The registered box is updated to the result.
    pub fn checked_move(&self, from: Vec3, to: Vec3) -> Vec3 {
        from + self.checked_step(from, to - from)
    }

    /// Like [`checked_move`](Self::checked_move), but takes and returns the
    /// offset. The returned offset is `delta` itself on axes nothing clipped,
    /// so callers can compare the two without position rounding.
    pub fn checked_step(&self, from: Vec3, delta: Vec3) -> Vec3 {
        let applied = self
            .world
            .resolve(self.bounds(from), delta, self.policy, Some(self.owner));
        self.sync(from + applied);
        applied
    }
}

impl Drop for ColliderProxy {
    fn drop(&mut self) {
        if self.registered {
            self.world.remove_proxy(self.owner);
        }
    }
}

impl fmt::Debug for ColliderProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColliderProxy")
            .field("owner", &self.owner)
            .field("half_extents", &self.half_extents)
            .field("policy", &self.policy)
            .field("registered", &self.registered)
            .finish()
    }
}
