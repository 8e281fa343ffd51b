#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Rigid transforms
//!
//! This crate provides the two groups needed to chain sensor poses and extrinsics:
//!
//! - **SO(3)**: 3D rotations, stored as unit quaternions ([`SO3F32`]).
//! - **SE(3)**: 3D rigid body transformations, rotation + translation ([`SE3F32`]).
//!
//! Composition is written `a * b` (or [`SE3F32::compose`]) and means "apply `b`, then `a`",
//! i.e. the matrix product `A·B`. Naming follows the `frame_T_frame` convention: a
//! transform `imu_t_device` maps points expressed in the device frame into the IMU frame.
//!
//! ## Example
//!
//! ```rust
//! use arpose_lie::{SE3F32, SO3F32};
//! use glam::Vec3A;
//!
//! let yaw = SO3F32::from_axis_angle(Vec3A::Z, std::f32::consts::FRAC_PI_2);
//! let world_t_device = SE3F32::new(yaw, Vec3A::new(1.0, 0.0, 0.0));
//!
//! let device_t_world = world_t_device.inverse();
//! assert!((world_t_device * device_t_world).abs_diff_eq(&SE3F32::IDENTITY, 1e-5));
//! ```

/// Special Euclidean group SE(3) for 3D rigid transformations.
pub mod se3;

/// Special Orthogonal group SO(3) for 3D rotations.
pub mod so3;

pub use se3::SE3F32;
pub use so3::SO3F32;

// Re-export the glam types that appear in the public API
pub use glam::{Mat3A, Mat4, Quat, Vec3, Vec3A};
