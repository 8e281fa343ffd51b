use arpose_lie::SE3F32;
use glam::{Mat3, Mat4, Quat, Vec3, Vec4};

use crate::error::ConfigError;

/// Tolerance used when validating convention matrices.
const CONVENTION_TOLERANCE: f32 = 1e-4;

/// Fixed axis changes between the tracking service and a renderer.
///
/// The final transform of a render entity is
/// `world_from_origin · origin_T_sensor · sensor_from_render`. Both matrices may be
/// reflections (handedness changes), which is why the result is a plain 4x4 matrix
/// rather than a rigid transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderConvention {
    world_from_origin: Mat4,
    sensor_from_render: Mat4,
}

impl Default for RenderConvention {
    fn default() -> Self {
        Self::identity()
    }
}

impl RenderConvention {
    /// Create a convention from two axis-change matrices.
    ///
    /// # Errors
    ///
    /// Fails when either matrix has a projective bottom row or an upper 3x3 block that
    /// is not orthonormal.
    pub fn new(world_from_origin: Mat4, sensor_from_render: Mat4) -> Result<Self, ConfigError> {
        validate_axis_change(&world_from_origin, "world_from_origin")?;
        validate_axis_change(&sensor_from_render, "sensor_from_render")?;
        Ok(Self {
            world_from_origin,
            sensor_from_render,
        })
    }

    /// No axis change: the renderer uses the service's conventions.
    pub const fn identity() -> Self {
        Self {
            world_from_origin: Mat4::IDENTITY,
            sensor_from_render: Mat4::IDENTITY,
        }
    }

    /// Unity camera rig driven by the color camera.
    ///
    /// The tracking origin is right-handed with Z up; the Unity world is left-handed with
    /// Y up, so Y and Z swap. The color camera looks down +Z with Y pointing down; the
    /// Unity camera keeps +Z forward with Y up, so Y flips.
    pub const fn unity() -> Self {
        Self {
            world_from_origin: Self::SWAP_YZ,
            sensor_from_render: Mat4::from_cols(
                Vec4::new(1.0, 0.0, 0.0, 0.0),
                Vec4::new(0.0, -1.0, 0.0, 0.0),
                Vec4::new(0.0, 0.0, 1.0, 0.0),
                Vec4::new(0.0, 0.0, 0.0, 1.0),
            ),
        }
    }

    /// Unity rig driven by the device frame itself, whose Z axis points out of the
    /// screen toward the user.
    pub const fn unity_device() -> Self {
        Self {
            world_from_origin: Self::SWAP_YZ,
            sensor_from_render: Mat4::from_cols(
                Vec4::new(1.0, 0.0, 0.0, 0.0),
                Vec4::new(0.0, 1.0, 0.0, 0.0),
                Vec4::new(0.0, 0.0, -1.0, 0.0),
                Vec4::new(0.0, 0.0, 0.0, 1.0),
            ),
        }
    }

    const SWAP_YZ: Mat4 = Mat4::from_cols(
        Vec4::new(1.0, 0.0, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 1.0, 0.0),
        Vec4::new(0.0, 1.0, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 0.0, 1.0),
    );

    /// Matrix mapping the tracking origin into the render world.
    pub fn world_from_origin(&self) -> Mat4 {
        self.world_from_origin
    }

    /// Matrix mapping the render entity's local frame into the sensor frame.
    pub fn sensor_from_render(&self) -> Mat4 {
        self.sensor_from_render
    }

    /// Wrap a rigid `origin_T_sensor` in this convention.
    pub fn apply(&self, origin_t_sensor: &SE3F32) -> RenderTransform {
        RenderTransform {
            matrix: self.world_from_origin * origin_t_sensor.matrix() * self.sensor_from_render,
        }
    }
}

fn validate_axis_change(mat: &Mat4, name: &str) -> Result<(), ConfigError> {
    if !mat.is_finite() {
        return Err(ConfigError::InvalidMatrix(format!("{name} is not finite")));
    }

    if !mat.row(3).abs_diff_eq(Vec4::W, CONVENTION_TOLERANCE) {
        return Err(ConfigError::InvalidMatrix(format!(
            "{name} has a projective bottom row"
        )));
    }

    let block = Mat3::from_mat4(*mat);
    if !(block.transpose() * block).abs_diff_eq(Mat3::IDENTITY, CONVENTION_TOLERANCE) {
        return Err(ConfigError::InvalidMatrix(format!(
            "{name} is not orthonormal"
        )));
    }

    Ok(())
}

/// The composed transform handed to a render entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTransform {
    matrix: Mat4,
}

impl RenderTransform {
    /// Wrap a matrix, typically produced by [`RenderConvention::apply`].
    pub fn from_matrix(matrix: Mat4) -> Self {
        Self { matrix }
    }

    /// The 4x4 matrix in the renderer's conventions.
    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }

    /// Position of the entity in the render world.
    pub fn translation(&self) -> Vec3 {
        self.matrix.w_axis.truncate()
    }

    /// Orientation of the entity, or `None` when the convention product is a reflection
    /// that no quaternion can express.
    pub fn rotation(&self) -> Option<Quat> {
        let block = Mat3::from_mat4(self.matrix);
        if block.determinant() <= 0.0 {
            return None;
        }
        Some(Quat::from_mat3(&block).normalize())
    }

    /// Map a point from the entity's local frame into the render world.
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.matrix.transform_point3(p)
    }

    /// Map a point cloud from the entity's local frame into the render world.
    pub fn transform_points(&self, points: &[Vec3]) -> Vec<Vec3> {
        points.iter().map(|p| self.matrix.transform_point3(*p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arpose_lie::SO3F32;
    use glam::Vec3A;

    #[test]
    fn test_identity_passthrough() {
        let pose = SE3F32::from_translation(Vec3A::new(1.0, 0.0, 0.0));
        let out = RenderConvention::identity().apply(&pose);
        assert_eq!(out.translation(), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(out.rotation(), Some(Quat::IDENTITY));
    }

    #[test]
    fn test_unity_swaps_up_axis() {
        // one meter up in the tracking frame is one meter up in Unity
        let pose = SE3F32::from_translation(Vec3A::new(0.0, 0.0, 1.0));
        let out = RenderConvention::unity().apply(&pose);
        assert!(out.translation().abs_diff_eq(Vec3::new(0.0, 1.0, 0.0), 1e-6));
    }

    #[test]
    fn test_unity_presets_are_proper_rotations() {
        let pose = SE3F32::new(SO3F32::from_random(), Vec3A::new(0.3, -0.2, 1.0));
        for convention in [RenderConvention::unity(), RenderConvention::unity_device()] {
            let out = convention.apply(&pose);
            let rotation = out.rotation();
            assert!(rotation.is_some());
            let block = Mat3::from_mat4(out.matrix());
            assert!((block.determinant() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_single_reflection_has_no_rotation() {
        let flip_z = Mat4::from_scale(Vec3::new(1.0, 1.0, -1.0));
        let convention = RenderConvention::new(Mat4::IDENTITY, flip_z);
        let out = convention.map(|c| c.apply(&SE3F32::IDENTITY));
        assert!(out.is_ok_and(|t| t.rotation().is_none()));
    }

    #[test]
    fn test_new_rejects_invalid_matrices() {
        let scaled = Mat4::from_scale(Vec3::splat(2.0));
        assert!(RenderConvention::new(scaled, Mat4::IDENTITY).is_err());

        let mut projective = Mat4::IDENTITY;
        projective.x_axis.w = 0.5;
        assert!(RenderConvention::new(Mat4::IDENTITY, projective).is_err());

        assert!(RenderConvention::new(RenderConvention::SWAP_YZ, Mat4::IDENTITY).is_ok());
    }

    #[test]
    fn test_transform_points() {
        let pose = SE3F32::from_axis_angle(
            Vec3A::Z,
            std::f32::consts::FRAC_PI_2,
            Vec3A::new(0.0, 0.0, 2.0),
        );
        let out = RenderConvention::identity().apply(&pose);
        let points = out.transform_points(&[Vec3::X, Vec3::ZERO]);
        assert!(points[0].abs_diff_eq(Vec3::new(0.0, 1.0, 2.0), 1e-6));
        assert!(points[1].abs_diff_eq(Vec3::new(0.0, 0.0, 2.0), 1e-6));
        assert_eq!(out.transform_point(Vec3::X), points[0]);
    }
}
