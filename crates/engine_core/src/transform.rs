//! Transform component and utilities for spatial positioning.

use glam::{Quat, Vec3};

/// A rigid transform: position and orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Transform {
    /// Create a new transform at the given position.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a new transform with position and rotation.
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Get the forward direction (negative Z in right-handed coordinates).
    pub fn forward(&self) -> Vec3 {
        self.rotation * -Vec3::Z
    }

    /// Get the up direction (positive Y).
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Map a point given in local space into world space.
    pub fn local_to_world(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * local
    }

    /// Rotate a local-space direction into world space (no translation).
    pub fn rotate_vector(&self, local: Vec3) -> Vec3 {
        self.rotation * local
    }

    /// Rotate around the Y axis (yaw).
    pub fn rotate_y(&mut self, angle: f32) {
        self.rotation = Quat::from_rotation_y(angle) * self.rotation;
    }
}

/// Orientation whose forward axis (-Z) points along `direction`.
/// A zero direction yields identity.
pub fn facing(direction: Vec3) -> Quat {
    let dir = direction.normalize_or_zero();
    if dir == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    Quat::from_rotation_arc(-Vec3::Z, dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facing_points_forward_axis_along_direction() {
        let dir = Vec3::new(1.0, 2.0, -0.5).normalize();
        let t = Transform::from_position_rotation(Vec3::ZERO, facing(dir));
        assert!((t.forward() - dir).length() < 1e-5);
        assert_eq!(facing(Vec3::ZERO), Quat::IDENTITY);
    }

    #[test]
    fn local_offset_follows_yaw() {
        let mut t = Transform::from_position(Vec3::new(10.0, 0.0, 0.0));
        t.rotate_y(std::f32::consts::FRAC_PI_2);
        let p = t.local_to_world(Vec3::new(0.0, 0.0, -1.0));
        assert!((p - Vec3::new(9.0, 0.0, 0.0)).length() < 1e-5);
    }
}
