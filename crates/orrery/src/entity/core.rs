//! State shared by every entity variant.

use std::fmt;

use super::id::EntityId;
use super::space::IdSpace;
use crate::math::{Quat, Transform, Vec3};

/// Identity, transform, name and readiness of one entity.
///
/// Every concrete variant embeds exactly one `EntityCore`. Constructing it
/// allocates an id from the given [`IdSpace`]; dropping it gives the id back.
/// Not `Clone`: a copy would hold the same id twice.
pub struct EntityCore {
    id: EntityId,
    transform: Transform,
    name: String,
    ready: bool,
    ids: IdSpace,
}

impl EntityCore {
    /// Allocate an id from `ids`. Transform is identity, name empty, ready flag set.
    pub fn new(ids: &IdSpace) -> Self {
        let id = ids.allocate();
        log::debug!("entity {id} constructed");
        Self {
            id,
            transform: Transform::IDENTITY,
            name: String::new(),
            ready: true,
            ids: ids.clone(),
        }
    }

    /// Like [`new`](Self::new), starting from `transform`.
    pub fn with_transform(ids: &IdSpace, transform: Transform) -> Self {
        let mut core = Self::new(ids);
        core.transform = transform;
        core
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// The space this entity's id belongs to.
    pub fn id_space(&self) -> &IdSpace {
        &self.ids
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn position(&self) -> Vec3 {
        self.transform.translation
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.transform.translation = position;
    }

    pub fn rotation(&self) -> Quat {
        self.transform.rotation
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.transform.rotation = rotation;
    }

    pub fn scale(&self) -> Vec3 {
        self.transform.scale
    }

    /// Not part of the public entity surface; variants decide whether to expose it.
    pub fn set_scale(&mut self, scale: Vec3) {
        self.transform.scale = scale;
    }

    pub(crate) fn integrate_rotation(&mut self, angular_velocity: Vec3, dt: f32) {
        self.transform.integrate_rotation(angular_velocity, dt);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Variants clear this when their backend failed to bind.
    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }
}

impl Drop for EntityCore {
    fn drop(&mut self) {
        match self.ids.release(self.id) {
            Ok(()) => log::debug!("entity {} released", self.id),
            Err(e) => log::error!("failed to release entity {}: {e}", self.id),
        }
    }
}

impl fmt::Debug for EntityCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityCore")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("translation", &self.transform.translation)
            .field("ready", &self.ready)
            .finish()
    }
}
