//! Convenience re-exports: `use orrery::prelude::*` for the common items.

// Core
pub use crate::actor::Actor;
pub use crate::body::CollisionBody;
pub use crate::collision::{Aabb, ColliderProxy, CollisionWorld, MovePolicy};
pub use crate::config::{ConfigError, StageConfig};
pub use crate::entity::{
    AllocatorStrategy, EntityCore, EntityId, EntitySnapshot, IdAllocator, IdError, IdSpace,
    SpatialEntity,
};
pub use crate::math::{Mat4, Quat, Transform, Vec3};
pub use crate::stage::{Stage, StageError};
pub use crate::visual::{MeshHandle, Mobility, VisualEntity};

// Audio (feature-gated)
#[cfg(feature = "audio")]
pub use crate::audio::{AudioEngine, AudioError, SoundData, SoundEmitter};

// Physics (feature-gated)
#[cfg(feature = "physics3d")]
pub use crate::physics3d::{BodyKind, PhysicsWorld3d, RigidBodyEntity, Shape3d};

// Diagnostics (feature-gated)
#[cfg(feature = "diagnostics")]
pub use crate::diag::StageStats;
