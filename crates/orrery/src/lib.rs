//! # Orrery: Spatial Entities for 3D Simulations
//!
//! Every object in an orrery scene is a [`SpatialEntity`](entity::SpatialEntity):
//! a transform, a name, a ready flag and an [`EntityId`](entity::EntityId) drawn
//! from an [`IdSpace`](entity::IdSpace). Concrete variants decide what backs
//! them (a mesh, a collision box, a rigid body, a sound) and how `move_to`
//! respects obstacles.
//!
//! Start with `use orrery::prelude::*` and drive entities with a
//! [`Stage`](stage::Stage).

pub mod actor;
pub mod body;
pub mod collision;
pub mod config;
pub mod entity;
pub mod math;
pub mod prelude;
pub mod stage;
pub mod visual;

#[cfg(feature = "audio")]
pub mod audio;

#[cfg(feature = "physics3d")]
pub mod physics3d;

#[cfg(feature = "diagnostics")]
pub mod diag;
