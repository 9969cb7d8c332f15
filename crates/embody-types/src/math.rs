//! Vector and quaternion primitives shared by every layer.
//!
//! Positions are in centimetres, orientations are (w, x, y, z) quaternions.
//! [`Quaternion::rotate`] follows the Hamilton convention `p' = q · p · q*`,
//! and composing orientations down the body tree is a plain Hamilton
//! product (see `embody-scene`).

use std::ops::{Add, Neg, Sub};

use serde::{Deserialize, Serialize};

use crate::EmbodyError;

// ────────────────────────────────────────────────────────────────────────────
// Vec3
// ────────────────────────────────────────────────────────────────────────────

/// A 3-D position or displacement.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Create a new vector.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The zero vector.
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn scale(self, k: f64) -> Self {
        Self::new(self.x * k, self.y * k, self.z * k)
    }

    pub fn norm(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Euclidean distance between two points.
    pub fn distance(self, other: Self) -> f64 {
        (self - other).norm()
    }

    /// Whether every component is neither NaN nor infinite.
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Quaternion
// ────────────────────────────────────────────────────────────────────────────

/// A rotation quaternion (w, x, y, z).
///
/// Values arriving from outside the process (configuration, sensors, serde)
/// go through [`Quaternion::try_new`], which rejects NaN components.  Fused
/// orientations may legitimately be non-unit; call
/// [`normalized`][Quaternion::normalized] where a unit value is required.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawQuaternion")]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Deserialize)]
struct RawQuaternion {
    w: f64,
    x: f64,
    y: f64,
    z: f64,
}

impl TryFrom<RawQuaternion> for Quaternion {
    type Error = EmbodyError;

    fn try_from(raw: RawQuaternion) -> Result<Self, Self::Error> {
        Self::try_new(raw.w, raw.x, raw.y, raw.z)
    }
}

impl TryFrom<[f64; 4]> for Quaternion {
    type Error = EmbodyError;

    fn try_from(q: [f64; 4]) -> Result<Self, Self::Error> {
        Self::try_new(q[0], q[1], q[2], q[3])
    }
}

impl Quaternion {
    /// Create a quaternion without validation.  Use for compile-time
    /// constants and internal arithmetic only.
    pub const fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// Create a quaternion from externally supplied components.
    ///
    /// # Errors
    ///
    /// Returns [`EmbodyError::InvalidQuaternion`] if any component is NaN.
    pub fn try_new(w: f64, x: f64, y: f64, z: f64) -> Result<Self, EmbodyError> {
        if [w, x, y, z].iter().any(|c| c.is_nan()) {
            return Err(EmbodyError::InvalidQuaternion { w, x, y, z });
        }
        Ok(Self::new(w, x, y, z))
    }

    /// The identity rotation (no rotation).
    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Hamilton product: compose two rotations.
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }

    /// Conjugate (== inverse for a unit quaternion).
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Multiplicative inverse, `q* / |q|²`.  Differs from the conjugate for
    /// non-unit quaternions.  A zero quaternion inverts to the identity.
    pub fn inverse(self) -> Self {
        let n2 = self.dot(self);
        if n2 <= f64::EPSILON {
            return Self::identity();
        }
        self.conjugate().scale(1.0 / n2)
    }

    /// Rotate a vector by this quaternion: p' = q * p * q⁻¹.
    ///
    /// The vector's length is preserved for any non-zero `q`.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let p = Self::new(0.0, v.x, v.y, v.z);
        let rotated = self.mul(p).mul(self.inverse());
        Vec3::new(rotated.x, rotated.y, rotated.z)
    }

    /// Rotate a vector by the inverse of this quaternion.
    pub fn rotate_inverse(self, v: Vec3) -> Vec3 {
        self.inverse().rotate(v)
    }

    /// Four-component dot product.
    pub fn dot(self, other: Self) -> f64 {
        self.w * other.w + self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn norm(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Component-wise scaling.  The result is generally not a unit
    /// quaternion.
    pub fn scale(self, k: f64) -> Self {
        Self::new(self.w * k, self.x * k, self.y * k, self.z * k)
    }

    /// Component-wise sum.
    pub fn sum(self, other: Self) -> Self {
        Self::new(
            self.w + other.w,
            self.x + other.x,
            self.y + other.y,
            self.z + other.z,
        )
    }

    /// Unit-length copy.  A zero quaternion normalises to the identity.
    pub fn normalized(self) -> Self {
        let n = self.norm();
        if n <= f64::EPSILON {
            return Self::identity();
        }
        self.scale(1.0 / n)
    }

    /// Rotation angle (radians, in `[0, π]`) needed to go from `self` to
    /// `other`.  Sign-insensitive: `q` and `-q` are at distance 0.
    pub fn angle_to(self, other: Self) -> f64 {
        let d = self.normalized().dot(other.normalized()).abs().min(1.0);
        2.0 * d.acos()
    }

    pub fn is_finite(self) -> bool {
        self.to_array().iter().all(|c| c.is_finite())
    }

    pub fn to_array(self) -> [f64; 4] {
        [self.w, self.x, self.y, self.z]
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

impl Neg for Quaternion {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.w, -self.x, -self.y, -self.z)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
