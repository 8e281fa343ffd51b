//! Rigid body transforms (rotation + translation).
//!
//! [`SE3F32`] is the only transform type that flows through pose composition. It is a
//! `Copy` value: composing or inverting produces a new transform and never mutates the
//! operands.

use crate::so3::SO3F32;
use glam::{Mat4, Vec3, Vec3A};
use rand::Rng;

/// A 3D rigid body transformation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SE3F32 {
    /// Rotation part.
    pub r: SO3F32,
    /// Translation part.
    pub t: Vec3A,
}

impl Default for SE3F32 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl SE3F32 {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        r: SO3F32::IDENTITY,
        t: Vec3A::ZERO,
    };

    /// Create a transform from a rotation and a translation.
    pub fn new(r: SO3F32, t: Vec3A) -> Self {
        Self { r, t }
    }

    /// A pure translation.
    pub fn from_translation(t: Vec3A) -> Self {
        Self {
            r: SO3F32::IDENTITY,
            t,
        }
    }

    /// A pure rotation.
    pub fn from_rotation(r: SO3F32) -> Self {
        Self { r, t: Vec3A::ZERO }
    }

    /// Rotation of `angle` radians about `axis`, followed by `translation`.
    pub fn from_axis_angle(axis: Vec3A, angle: f32, translation: Vec3A) -> Self {
        Self {
            r: SO3F32::from_axis_angle(axis, angle),
            t: translation,
        }
    }

    /// Create a transform from a homogeneous matrix.
    ///
    /// The upper-left block is assumed to be a rotation; the bottom row is ignored.
    pub fn from_matrix(mat: &Mat4) -> Self {
        Self {
            r: SO3F32::from_matrix4(mat),
            t: Vec3A::from(mat.w_axis.truncate()),
        }
    }

    /// Random rotation with a translation drawn uniformly from `[-1, 1)³`.
    pub fn from_random() -> Self {
        let mut rng = rand::rng();
        let t = Vec3A::new(
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        );
        Self {
            r: SO3F32::from_random(),
            t,
        }
    }

    /// The 4x4 homogeneous matrix.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.r.q, Vec3::from(self.t))
    }

    /// The transform that undoes `self`: `R' = Rᵀ`, `t' = -Rᵀ t`.
    pub fn inverse(&self) -> Self {
        let r_inv = self.r.inverse();
        Self {
            r: r_inv,
            t: -(r_inv * self.t),
        }
    }

    /// `self · other`: apply `other` first, then `self`.
    ///
    /// The rotation of the result is renormalized, so long chains stay orthonormal.
    #[inline]
    pub fn compose(&self, other: &SE3F32) -> Self {
        *self * *other
    }

    /// Map a point from the source frame into the destination frame.
    #[inline]
    pub fn transform_point(&self, p: Vec3A) -> Vec3A {
        self.r * p + self.t
    }

    /// Rotate a direction vector; translation does not apply.
    #[inline]
    pub fn transform_vector(&self, v: Vec3A) -> Vec3A {
        self.r * v
    }

    /// Lie algebra -> Lie group, with `upsilon` the translational and `omega` the
    /// rotational part of the twist.
    pub fn exp(upsilon: Vec3A, omega: Vec3A) -> Self {
        Self {
            r: SO3F32::exp(omega),
            t: SO3F32::left_jacobian(omega) * upsilon,
        }
    }

    /// Lie group -> Lie algebra, returns `(upsilon, omega)`.
    pub fn log(&self) -> (Vec3A, Vec3A) {
        let omega = self.r.log();
        let upsilon = SO3F32::left_jacobian_inverse(omega) * self.t;
        (upsilon, omega)
    }

    /// Element-wise comparison of the homogeneous matrices.
    pub fn abs_diff_eq(&self, other: &Self, max_abs_diff: f32) -> bool {
        self.matrix().abs_diff_eq(other.matrix(), max_abs_diff)
    }
}

impl std::ops::Mul<SE3F32> for SE3F32 {
    type Output = SE3F32;

    #[inline]
    fn mul(self, rhs: SE3F32) -> SE3F32 {
        SE3F32::new(self.r * rhs.r, self.r * rhs.t + self.t)
    }
}

impl std::ops::Mul<Vec3A> for SE3F32 {
    type Output = Vec3A;

    #[inline]
    fn mul(self, rhs: Vec3A) -> Self::Output {
        self.transform_point(rhs)
    }
}

#[cfg(feature = "approx")]
impl approx::AbsDiffEq for SE3F32 {
    type Epsilon = f32;

    fn default_epsilon() -> Self::Epsilon {
        f32::EPSILON
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        SE3F32::abs_diff_eq(self, other, epsilon)
    }
}

#[cfg(feature = "approx")]
impl approx::RelativeEq for SE3F32 {
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

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TOLERANCE: f32 = 1e-5;

    #[test]
    fn test_identity() {
        let s = SE3F32::IDENTITY;
        assert_eq!(s.matrix(), Mat4::IDENTITY);
        assert_eq!(s.transform_point(Vec3A::new(1.0, 2.0, 3.0)), Vec3A::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_compose_inverse_is_identity() {
        for _ in 0..100 {
            let a = SE3F32::from_random();
            assert!(a.compose(&a.inverse()).abs_diff_eq(&SE3F32::IDENTITY, TOLERANCE));
            assert!(a.inverse().compose(&a).abs_diff_eq(&SE3F32::IDENTITY, TOLERANCE));
        }
    }

    #[test]
    fn test_compose_associative() {
        for _ in 0..100 {
            let a = SE3F32::from_random();
            let b = SE3F32::from_random();
            let c = SE3F32::from_random();
            let lhs = (a * b) * c;
            let rhs = a * (b * c);
            assert!(lhs.abs_diff_eq(&rhs, TOLERANCE));
        }
    }

    #[test]
    fn test_compose_matches_matrix_product() {
        let a = SE3F32::from_axis_angle(Vec3A::Z, 0.7, Vec3A::new(1.0, -2.0, 0.5));
        let b = SE3F32::from_axis_angle(Vec3A::new(1.0, 1.0, 0.0), -0.3, Vec3A::new(0.2, 0.0, 3.0));
        assert!((a * b).matrix().abs_diff_eq(a.matrix() * b.matrix(), TOLERANCE));
    }

    #[test]
    fn test_compose_order() {
        // translate first, then rotate a quarter turn about z
        let rot = SE3F32::from_axis_angle(Vec3A::Z, std::f32::consts::FRAC_PI_2, Vec3A::ZERO);
        let trans = SE3F32::from_translation(Vec3A::new(1.0, 0.0, 0.0));
        let p = (rot * trans).transform_point(Vec3A::ZERO);
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_inverse_transform_point() {
        let a = SE3F32::from_random();
        let p = Vec3A::new(0.3, -0.7, 2.0);
        let back = a.inverse().transform_point(a.transform_point(p));
        assert!(back.abs_diff_eq(p, TOLERANCE));
    }

    #[test]
    fn test_from_matrix() {
        let a = SE3F32::from_random();
        let b = SE3F32::from_matrix(&a.matrix());
        assert!(a.abs_diff_eq(&b, TOLERANCE));
    }

    #[test]
    fn test_exp_log() {
        let upsilon = Vec3A::new(0.4, -1.0, 0.25);
        let omega = Vec3A::new(0.1, 0.2, -0.3);
        let (u, w) = SE3F32::exp(upsilon, omega).log();
        assert!(u.abs_diff_eq(upsilon, TOLERANCE));
        assert!(w.abs_diff_eq(omega, TOLERANCE));
    }

    #[test]
    fn test_log_half_turn() {
        let half_turn = SE3F32::from_axis_angle(
            Vec3A::new(1.0, 1.0, 0.0),
            std::f32::consts::PI,
            Vec3A::new(0.5, -1.0, 2.0),
        );
        let (u, w) = half_turn.log();
        assert!(u.is_finite());
        assert_relative_eq!(w.length(), std::f32::consts::PI, epsilon = 1e-5);
        assert!(SE3F32::exp(u, w).abs_diff_eq(&half_turn, 1e-4));
    }

    #[test]
    fn test_exp_pure_translation() {
        let s = SE3F32::exp(Vec3A::new(1.0, 2.0, 3.0), Vec3A::ZERO);
        assert!(s.abs_diff_eq(&SE3F32::from_translation(Vec3A::new(1.0, 2.0, 3.0)), TOLERANCE));
    }

    #[test]
    fn test_long_chain_stays_rigid() {
        let step = SE3F32::exp(Vec3A::new(0.01, 0.0, 0.002), Vec3A::new(0.003, -0.001, 0.02));
        let mut acc = SE3F32::IDENTITY;
        for _ in 0..5_000 {
            acc = acc * step;
        }
        let r = acc.r.matrix();
        assert_relative_eq!(acc.r.q.length(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-5);
    }
}
