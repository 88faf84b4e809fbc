//! Planar geometry helpers on top of nalgebra
//!
//! Every vector in the engine is a 3-vector (`NVec3`) even though motion is
//! planar: positions and forces use x/y, headings and angular rates use z.
//! This keeps cross products (torques, `α × GP`) in their natural form.

use nalgebra::{Matrix3, Vector3};

pub type NVec3 = Vector3<f64>;
pub type NMat3 = Matrix3<f64>;

/// Build a planar vector (z = 0)
#[inline]
pub fn vec2(x: f64, y: f64) -> NVec3 {
    NVec3::new(x, y, 0.0)
}

/// Vector along z, used for headings, angular speeds and accelerations
#[inline]
pub fn along_z(z: f64) -> NVec3 {
    NVec3::new(0.0, 0.0, z)
}

/// Rotation matrix about z by `angle` (radians, counter-clockwise)
pub fn rotation_z(angle: f64) -> NMat3 {
    let (s, c) = angle.sin_cos();
    NMat3::new(
        c, -s, 0.0,
        s, c, 0.0,
        0.0, 0.0, 1.0,
    )
}

/// Rotate `v` about z by `angle`
#[inline]
pub fn rotate_z(angle: f64, v: &NVec3) -> NVec3 {
    rotation_z(angle) * v
}

/// Rotate a body-frame vector into world frame given the body's rotation
/// vector (only its z component is a heading)
#[inline]
pub fn to_world(rotation: &NVec3, local: &NVec3) -> NVec3 {
    rotate_z(rotation.z, local)
}

/// Signed heading of `v` in the xy-plane, in (-pi, pi]
///
/// Callers use it on a body's speed to detect release conditions
/// (e.g. a projectile whose velocity has turned past a given angle)
#[inline]
pub fn planar_angle(v: &NVec3) -> f64 {
    v.y.atan2(v.x)
}

/// `ẑ × v`, i.e. `v` rotated by +90° in the plane
#[inline]
pub fn perp(v: &NVec3) -> NVec3 {
    NVec3::new(-v.y, v.x, 0.0)
}

/// Same inertia on all three axes
pub fn uniform_inertia(value: f64) -> NMat3 {
    NMat3::from_diagonal_element(value)
}

/// Solid sphere: 2/5 m r²
pub fn sphere_inertia(mass: f64, radius: f64) -> NMat3 {
    uniform_inertia(0.4 * mass * radius * radius)
}

/// Thin rectangular bar about its center: m (L² + w²) / 12
pub fn rod_inertia(mass: f64, length: f64, width: f64) -> NMat3 {
    uniform_inertia(mass * (length * length + width * width) / 12.0)
}
