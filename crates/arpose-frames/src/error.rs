use crate::frame::{CoordinateFrame, FramePair};
use crate::pose::PoseStatus;

/// An error type for pose resolution and frame composition.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    /// The pose service is not connected.
    #[error("Pose service is not connected")]
    ServiceUnavailable,

    /// The query succeeded but the pose is not usable.
    #[error("Pose is not valid (status: {status:?})")]
    PoseInvalid {
        /// Status reported by the service.
        status: PoseStatus,
    },

    /// The static transform to a sensor could not be resolved.
    #[error("Extrinsics to {sensor:?} are not resolved")]
    ExtrinsicsUnresolved {
        /// The sensor frame whose extrinsics are missing.
        sensor: CoordinateFrame,
    },

    /// A sample for another frame pair was handed to a consumer.
    #[error("Frame pair mismatch: expected {expected}, got {got}")]
    FrameMismatch {
        /// Frame pair the consumer was built for.
        expected: FramePair,
        /// Frame pair carried by the sample.
        got: FramePair,
    },

    /// The service returned components that do not form a rigid transform.
    #[error("Malformed pose: {0}")]
    MalformedPose(String),
}

impl FrameError {
    /// Whether the caller should simply skip this update and try again next frame.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FrameError::PoseInvalid { .. })
    }
}

/// An error type for loading compositor configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Failed to parse the configuration.
    #[error(transparent)]
    Parse(#[from] serde_json::Error),

    /// A custom convention matrix cannot be used.
    #[error("Invalid convention matrix: {0}")]
    InvalidMatrix(String),

    /// A frame is used in a role it cannot play.
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
}
