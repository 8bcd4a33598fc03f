//! Math types and glam re-exports.
//!
//! We re-export [glam](https://docs.rs/glam) types so users don't need to
//! depend on it directly. [`Transform`] is the position/rotation/scale triple
//! every entity carries.

pub use glam::{Mat4, Quat, Vec3};

use serde::{Deserialize, Serialize};

/// A 3D transform: position, rotation, and scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// Identity transform (origin, no rotation, uniform scale of 1).
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Create a transform at the given position.
    pub fn from_xyz(x: f32, y: f32, z: f32) -> Self {
        Self::from_translation(Vec3::new(x, y, z))
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Return a copy with the given rotation.
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Return a copy with uniform scale applied.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    /// Return a copy rotated to face `target` from the current position.
    ///
    /// `Transform::from_xyz(0.0, 5.0, 10.0).looking_at(Vec3::ZERO, Vec3::Y)`
    /// places something at (0,5,10) facing the origin.
    pub fn looking_at(mut self, target: Vec3, up: Vec3) -> Self {
        let look = Mat4::look_at_rh(self.translation, target, up);
        let (_, rot, _) = look.inverse().to_scale_rotation_translation();
        self.rotation = rot;
        self
    }

    /// Compute the 4x4 model matrix.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Advance rotation by an angular velocity (axis * radians/sec) over `dt`.
    pub(crate) fn integrate_rotation(&mut self, angular_velocity: Vec3, dt: f32) {
        if angular_velocity == Vec3::ZERO || dt <= 0.0 {
            return;
        }
        let delta = Quat::from_scaled_axis(angular_velocity * dt);
        self.rotation = (delta * self.rotation).normalize();
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_identity() {
        let t = Transform::default();
        assert_eq!(t.translation, Vec3::ZERO);
        assert_eq!(t.rotation, Quat::IDENTITY);
        assert_eq!(t.scale, Vec3::ONE);
    }

    #[test]
    fn matrix_carries_translation() {
        let t = Transform::from_xyz(1.0, 2.0, 3.0).with_scale(2.0);
        let col3 = t.matrix().col(3);
        assert!((col3.x - 1.0).abs() < 1e-6);
        assert!((col3.y - 2.0).abs() < 1e-6);
        assert!((col3.z - 3.0).abs() < 1e-6);
    }

    #[test]
    fn integrate_rotation_quarter_turn() {
        let mut t = Transform::IDENTITY;
        t.integrate_rotation(Vec3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0), 1.0);
        let forward = t.rotation * Vec3::NEG_Z;
        assert!((forward - Vec3::NEG_X).length() < 1e-5);
    }

    #[test]
    fn zero_angular_velocity_keeps_rotation() {
        let rot = Quat::from_rotation_x(0.3);
        let mut t = Transform::IDENTITY.with_rotation(rot);
        t.integrate_rotation(Vec3::ZERO, 0.016);
        assert_eq!(t.rotation, rot);
    }
}
