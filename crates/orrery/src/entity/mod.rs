//! # Entities and Their Identifiers
//!
//! ## Module Overview
//!
//! - [`id`]: [`EntityId`], the [`IdAllocator`] seam and the two built-in strategies
//! - [`space`]: [`IdSpace`], the shared handle entities allocate from
//! - [`core`]: [`EntityCore`], identity + transform + name + readiness
//! - [`spatial`]: [`SpatialEntity`], the contract every variant implements
//!
//! ## Lifecycle
//!
//! ```text
//! EntityCore::new(&ids)   → id allocated from the space
//! entity.ready()          → backend bound (render node, body, sound)
//! entity.update(dt) × N   → one call per simulation tick
//! drop(entity)            → id released back to the same space
//! ```

pub mod core;
pub mod id;
pub mod space;
pub mod spatial;

pub use self::core::EntityCore;
pub use id::{EntityId, GenerationalAllocator, IdAllocator, IdError, SequentialAllocator};
pub use space::{AllocatorStrategy, IdSpace};
pub use spatial::{EntitySnapshot, SpatialEntity};
