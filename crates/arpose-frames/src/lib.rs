#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! The pipeline for one rendered entity is:
//!
//! 1. a [`PoseService`] reports `origin_T_device` poses and the static IMU extrinsics;
//! 2. the [`ExtrinsicsResolver`], owned by a [`Session`], turns the extrinsics into a
//!    cached `device_T_sensor`;
//! 3. a [`PoseListener`] copies callback poses into a latest-sample slot;
//! 4. the [`FrameCompositor`] polls that slot once per render frame and produces a
//!    [`RenderTransform`] in the renderer's axis convention.

/// Frame composition and tracking state.
pub mod compositor;

/// Serializable configuration of a render entity.
pub mod config;

/// Axis conventions between the tracking frames and a renderer.
pub mod convention;

/// Error types for pose resolution and configuration.
pub mod error;

/// Device-to-sensor extrinsics resolution.
pub mod extrinsics;

/// Coordinate frames and frame pairs.
pub mod frame;

/// Pose samples and the dynamic pose resolver.
pub mod pose;

/// The pose service seam and a scripted in-memory service.
pub mod service;

/// Per-connection session context.
pub mod session;

/// Latest-sample slots between callback threads and the render loop.
pub mod slot;

pub use compositor::{FrameCompositor, TrackingState};
pub use config::{CompositorConfig, ConventionConfig};
pub use convention::{RenderConvention, RenderTransform};
pub use error::{ConfigError, FrameError};
pub use extrinsics::ExtrinsicsResolver;
pub use frame::{CoordinateFrame, FramePair};
pub use pose::{PoseResolver, PoseSample, PoseStatus, RawPose, LATEST_TIMESTAMP};
pub use service::{MockPoseService, PoseService};
pub use session::{ConnectionGeneration, Session};
pub use slot::{pose_slot, PoseListener, SlotReader, SlotWriter};

pub use arpose_lie::{SE3F32, SO3F32};
