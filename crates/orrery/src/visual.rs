//! Visual-only entities: something drawn, with no collision shape.

use serde::{Deserialize, Serialize};

use crate::entity::spatial::check_movable;
use crate::entity::{EntityCore, IdSpace, SpatialEntity};
use crate::math::{Transform, Vec3};

/// Opaque handle to a render node owned by the renderer.
///
/// The renderer hands these out; entities only carry them around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeshHandle(pub u32);

/// Whether a visual entity may change position after placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mobility {
    /// Merged into static geometry. Velocities and `move_to` are ignored.
    Static,
    #[default]
    Movable,
}

/// A mesh instance in the world.
///
/// With nothing to collide against, `move_to` goes straight to the
/// destination. `update` integrates the velocities set on it.
#[derive(Debug)]
pub struct VisualEntity {
    core: EntityCore,
    mesh: MeshHandle,
    mobility: Mobility,
    velocity: Vec3,
    angular_velocity: Vec3,
    attached: bool,
}

impl VisualEntity {
    pub fn new(ids: &IdSpace, mesh: MeshHandle) -> Self {
        Self::with_transform(ids, mesh, Transform::IDENTITY)
    }

    pub fn with_transform(ids: &IdSpace, mesh: MeshHandle, transform: Transform) -> Self {
        Self {
            core: EntityCore::with_transform(ids, transform),
            mesh,
            mobility: Mobility::Movable,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            attached: false,
        }
    }

    /// Builder: set mobility.
    pub fn with_mobility(mut self, mobility: Mobility) -> Self {
        self.mobility = mobility;
        if mobility == Mobility::Static {
            self.velocity = Vec3::ZERO;
            self.angular_velocity = Vec3::ZERO;
        }
        self
    }

    pub fn mesh(&self) -> MeshHandle {
        self.mesh
    }

    pub fn mobility(&self) -> Mobility {
        self.mobility
    }

    /// Returns `true` once [`ready`](SpatialEntity::ready) has attached the mesh.
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.core.set_scale(scale);
    }
}

impl SpatialEntity for VisualEntity {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn update(&mut self, dt: f32) {
        if self.mobility == Mobility::Static || dt <= 0.0 {
            return;
        }
        let position = self.core.position() + self.velocity * dt;
        self.core.set_position(position);
        self.core.integrate_rotation(self.angular_velocity, dt);
    }

    fn ready(&mut self) {
        if self.attached {
            return;
        }
        self.attached = true;
        log::debug!("entity {} attached mesh {:?}", self.core.id(), self.mesh);
    }

    fn describe(&self) -> String {
        format!("visual mesh={} {:?}", self.mesh.0, self.mobility)
    }

    fn set_velocity(&mut self, velocity: Vec3) {
        if self.mobility == Mobility::Movable {
            self.velocity = velocity;
        }
    }

    fn set_angular_velocity(&mut self, velocity: Vec3) {
        if self.mobility == Mobility::Movable {
            self.angular_velocity = velocity;
        }
    }

    fn has_visual(&self) -> bool {
        true
    }

    fn has_collision(&self) -> bool {
        false
    }

    fn can_be_moved(&self) -> bool {
        self.mobility == Mobility::Movable
    }

    fn move_to(&mut self, destination: Vec3) {
        if check_movable(self) {
            self.core.set_position(destination);
        }
    }
}
