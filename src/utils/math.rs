use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position as it travels on the wire: `{"x":..,"y":..,"z":..}`
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, Default)]
pub struct WirePosition {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl WirePosition {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

impl From<Vec3> for WirePosition {
    fn from(v: Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl fmt::Display for WirePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// Quaternion as browsers serialize a scene-graph quaternion: the component
/// fields carry a leading underscore (`_x`, `_y`, `_z`, `_w`).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct WireRotation {
    #[serde(rename = "_x")]
    pub x: f32,
    #[serde(rename = "_y")]
    pub y: f32,
    #[serde(rename = "_z")]
    pub z: f32,
    #[serde(rename = "_w")]
    pub w: f32,
}

impl WireRotation {
    pub fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub fn identity() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }

    /// Senders are not trusted to normalize; a zero quaternion maps to identity.
    pub fn to_quat(self) -> Quat {
        let q = Quat::from_xyzw(self.x, self.y, self.z, self.w);
        if q.length_squared() <= f32::EPSILON {
            Quat::IDENTITY
        } else {
            q.normalize()
        }
    }
}

impl Default for WireRotation {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<Quat> for WireRotation {
    fn from(q: Quat) -> Self {
        Self::new(q.x, q.y, q.z, q.w)
    }
}

/// Rotation about the vertical axis for a yaw angle in radians.
pub fn yaw_rotation(yaw: f32) -> Quat {
    Quat::from_rotation_y(yaw)
}
