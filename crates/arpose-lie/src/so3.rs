//! # SO(3): rotations in 3D
//!
//! [`SO3F32`] stores a rotation as a unit quaternion. `q` and `-q` encode the same
//! rotation, so comparisons go through the rotation matrix (see
//! [`SO3F32::abs_diff_eq`]) rather than through the raw quaternion components.
//!
//! Quaternion products drift off the unit sphere in floating point. Every product
//! produced by `*` is projected back with [`SO3F32::normalize`], which keeps the
//! matching rotation matrix orthonormal no matter how many poses are chained per frame.
//!
//! The exp/log maps use the axis-angle parameterisation of the Lie algebra so(3): a
//! vector `v ∈ R³` whose direction is the axis and whose norm is the angle in radians.
//! Both switch to Taylor expansions below [`SMALL_ANGLE_EPSILON`].

use glam::{Mat3A, Mat4, Quat, Vec3, Vec3A};
use rand::Rng;

/// Angle (radians) below which exp/log/jacobians use series expansions.
pub const SMALL_ANGLE_EPSILON: f32 = 1.0e-8;

/// A 3D rotation, stored as a unit quaternion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SO3F32 {
    /// Unit quaternion (x, y, z, w).
    pub q: Quat,
}

impl Default for SO3F32 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl SO3F32 {
    /// The identity rotation.
    pub const IDENTITY: Self = Self { q: Quat::IDENTITY };

    /// Create a rotation from a quaternion.
    /// NOTE: the quaternion is normalized on construction.
    #[inline]
    pub fn new(quat: Quat) -> Self {
        Self { q: quat }.normalize()
    }

    /// Create a rotation from a quaternion, see [`SO3F32::new`].
    #[inline]
    pub fn from_quaternion(quat: Quat) -> Self {
        Self::new(quat)
    }

    /// Create a rotation from `[x, y, z, w]` quaternion components.
    pub fn from_array(arr: [f32; 4]) -> Self {
        Self::new(Quat::from_array(arr))
    }

    /// Quaternion components as `[x, y, z, w]`.
    pub fn to_array(&self) -> [f32; 4] {
        self.q.to_array()
    }

    /// Rotation of `angle` radians about `axis`. The axis does not need to be unit length.
    pub fn from_axis_angle(axis: Vec3A, angle: f32) -> Self {
        Self::new(Quat::from_axis_angle(Vec3::from(axis.normalize()), angle))
    }

    /// Create a rotation from a 3x3 rotation matrix.
    pub fn from_matrix(mat: &Mat3A) -> Self {
        Self::new(Quat::from_mat3a(mat))
    }

    /// Create a rotation from the upper-left 3x3 block of a homogeneous matrix.
    pub fn from_matrix4(mat: &Mat4) -> Self {
        Self::new(Quat::from_mat4(mat))
    }

    /// Uniformly distributed random rotation (Shoemake method).
    pub fn from_random() -> Self {
        let mut rng = rand::rng();

        let r1: f32 = rng.random();
        let r2: f32 = rng.random();
        let r3: f32 = rng.random();

        let one_minus_r1_sqrt = (1.0 - r1).sqrt();
        let r1_sqrt = r1.sqrt();

        let w = one_minus_r1_sqrt * (2.0 * std::f32::consts::PI * r2).cos();
        let x = one_minus_r1_sqrt * (2.0 * std::f32::consts::PI * r2).sin();
        let y = r1_sqrt * (2.0 * std::f32::consts::PI * r3).cos();
        let z = r1_sqrt * (2.0 * std::f32::consts::PI * r3).sin();

        Self::new(Quat::from_xyzw(x, y, z, w))
    }

    /// Project the quaternion back onto the unit sphere.
    #[inline]
    pub fn normalize(self) -> Self {
        Self {
            q: self.q.normalize(),
        }
    }

    /// The 3x3 rotation matrix.
    pub fn matrix(&self) -> Mat3A {
        Mat3A::from_quat(self.q)
    }

    /// The adjoint representation, equal to the rotation matrix for SO(3).
    pub fn adjoint(&self) -> Mat3A {
        self.matrix()
    }

    /// The inverse rotation (quaternion conjugate).
    pub fn inverse(&self) -> Self {
        Self {
            q: self.q.conjugate(),
        }
    }

    /// Lie algebra -> Lie group
    pub fn exp(v: Vec3A) -> Self {
        let theta_sq = v.dot(v);
        let theta = theta_sq.sqrt();
        let theta_half = 0.5 * theta;

        let (w, b) = if theta < SMALL_ANGLE_EPSILON {
            // taylor series of cos(x/2) and sin(x/2)/x around 0
            (1.0 - theta_sq / 8.0, 0.5 - theta_sq / 48.0)
        } else {
            (theta_half.cos(), theta_half.sin() / theta)
        };

        let xyz = b * v;
        Self::new(Quat::from_xyzw(xyz.x, xyz.y, xyz.z, w))
    }

    /// Lie group -> Lie algebra
    pub fn log(&self) -> Vec3A {
        let mut w = self.q.w;
        let mut vec = Vec3A::new(self.q.x, self.q.y, self.q.z);

        // pick the hemisphere with w >= 0 so the angle lands in [0, pi]
        if w < 0.0 {
            w = -w;
            vec = -vec;
        }

        let theta = vec.length();
        if theta > SMALL_ANGLE_EPSILON {
            let half_theta = theta.atan2(w);
            vec * (2.0 * half_theta / theta)
        } else {
            vec * (2.0 / w)
        }
    }

    /// Vector space -> Lie algebra
    pub fn hat(v: Vec3A) -> Mat3A {
        let (a, b, c) = (v.x, v.y, v.z);
        Mat3A::from_cols_array(&[0.0, c, -b, -c, 0.0, a, b, -a, 0.0])
    }

    /// Lie algebra -> vector space
    pub fn vee(omega: Mat3A) -> Vec3A {
        Vec3A::new(omega.y_axis.z, omega.z_axis.x, omega.x_axis.y)
    }

    /// Left jacobian of the exponential map.
    pub fn left_jacobian(v: Vec3A) -> Mat3A {
        let skew = Self::hat(v);
        let theta = v.length();

        if theta < SMALL_ANGLE_EPSILON {
            return Mat3A::IDENTITY + 0.5 * skew + (1.0 / 6.0) * (skew * skew);
        }

        Mat3A::IDENTITY
            + ((1.0 - theta.cos()) / theta.powi(2)) * skew
            + ((theta - theta.sin()) / theta.powi(3)) * (skew * skew)
    }

    /// Inverse of [`SO3F32::left_jacobian`].
    pub fn left_jacobian_inverse(v: Vec3A) -> Mat3A {
        let skew = Self::hat(v);
        let theta = v.length();

        if theta < SMALL_ANGLE_EPSILON {
            return Mat3A::IDENTITY - 0.5 * skew + (1.0 / 12.0) * (skew * skew);
        }

        // (1 + cos θ) / sin θ = cot(θ/2), which stays finite up to θ = π
        let half_theta = 0.5 * theta;
        let coeff = (1.0 - half_theta * half_theta.cos() / half_theta.sin()) / theta.powi(2);
        Mat3A::IDENTITY - 0.5 * skew + coeff * (skew * skew)
    }

    /// Compare two rotations through their matrices, which is immune to the `q`/`-q`
    /// ambiguity.
    pub fn abs_diff_eq(&self, other: &Self, max_abs_diff: f32) -> bool {
        self.matrix().abs_diff_eq(other.matrix(), max_abs_diff)
    }
}

impl std::ops::Mul<SO3F32> for SO3F32 {
    type Output = SO3F32;

    #[inline]
    fn mul(self, rhs: Self) -> Self::Output {
        Self { q: self.q * rhs.q }.normalize()
    }
}

impl std::ops::MulAssign<SO3F32> for SO3F32 {
    #[inline]
    fn mul_assign(&mut self, rhs: SO3F32) {
        *self = *self * rhs;
    }
}

impl std::ops::Mul<Vec3A> for SO3F32 {
    type Output = Vec3A;

    #[inline]
    fn mul(self, rhs: Vec3A) -> Self::Output {
        self.q * rhs
    }
}

#[cfg(feature = "approx")]
impl approx::AbsDiffEq for SO3F32 {
    type Epsilon = f32;

    fn default_epsilon() -> Self::Epsilon {
        f32::EPSILON
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        SO3F32::abs_diff_eq(self, other, epsilon)
    }
}

#[cfg(feature = "approx")]
impl approx::RelativeEq for SO3F32 {
    fn default_max_relative() -> Self::Epsilon {
        f32::EPSILON
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        let a = self.matrix().to_cols_array();
        let b = other.matrix().to_cols_array();
        a.iter()
            .zip(b.iter())
            .all(|(x, y)| approx::RelativeEq::relative_eq(x, y, epsilon, max_relative))
    }
}
