use arpose_lie::{SE3F32, SO3F32};
use glam::{Quat, Vec3A};

use crate::error::FrameError;
use crate::frame::FramePair;
use crate::service::PoseService;

/// Timestamp that asks the service for the most recent (or static) pose.
pub const LATEST_TIMESTAMP: f64 = 0.0;

/// Quaternions shorter than this are rejected as degenerate.
const MIN_QUATERNION_NORM: f64 = 1e-6;

/// Tracking status attached to every pose sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoseStatus {
    /// Tracking is starting up; the transform is meaningless.
    Initializing,
    /// The transform can be used.
    Valid,
    /// Tracking was lost.
    Invalid,
    /// The service reported a status this crate does not know about.
    Unknown,
}

impl PoseStatus {
    /// Map a status code from the native service.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => PoseStatus::Initializing,
            1 => PoseStatus::Valid,
            2 => PoseStatus::Invalid,
            _ => PoseStatus::Unknown,
        }
    }

    /// Status code used by the native service.
    pub fn code(&self) -> i32 {
        match self {
            PoseStatus::Initializing => 0,
            PoseStatus::Valid => 1,
            PoseStatus::Invalid => 2,
            PoseStatus::Unknown => 3,
        }
    }
}

/// A single pose answer from the service.
///
/// Samples are plain `Copy` data: created per query or callback and consumed once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSample {
    /// `base_T_target` for [`PoseSample::frame_pair`]. Only meaningful when the status is
    /// [`PoseStatus::Valid`]; use [`PoseSample::valid_transform`] to read it safely.
    pub transform: SE3F32,
    /// Tracking status.
    pub status: PoseStatus,
    /// Service timestamp in seconds.
    pub timestamp: f64,
    /// The frame pair this sample answers.
    pub frame_pair: FramePair,
}

impl PoseSample {
    /// A valid sample.
    pub fn valid(frame_pair: FramePair, transform: SE3F32, timestamp: f64) -> Self {
        Self {
            transform,
            status: PoseStatus::Valid,
            timestamp,
            frame_pair,
        }
    }

    /// A sample without a usable transform.
    pub fn unusable(frame_pair: FramePair, status: PoseStatus, timestamp: f64) -> Self {
        Self {
            transform: SE3F32::IDENTITY,
            status,
            timestamp,
            frame_pair,
        }
    }

    /// Whether the transform can be used.
    pub fn is_valid(&self) -> bool {
        self.status == PoseStatus::Valid
    }

    /// The transform, if and only if the sample is valid.
    pub fn valid_transform(&self) -> Option<SE3F32> {
        self.is_valid().then_some(self.transform)
    }
}

/// Pose record as delivered by the native service callbacks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPose {
    /// Service timestamp in seconds.
    pub timestamp: f64,
    /// Translation of the target frame in the base frame.
    pub position: [f64; 3],
    /// Orientation quaternion as `[x, y, z, w]`.
    pub orientation: [f64; 4],
    /// Raw status code, see [`PoseStatus::from_code`].
    pub status_code: i32,
    /// The queried frame pair.
    pub frame_pair: FramePair,
}

impl TryFrom<RawPose> for PoseSample {
    type Error = FrameError;

    fn try_from(raw: RawPose) -> Result<Self, Self::Error> {
        // consumers order samples by timestamp, whatever their status
        if !raw.timestamp.is_finite() {
            return Err(FrameError::MalformedPose(format!(
                "non-finite timestamp for {}",
                raw.frame_pair
            )));
        }

        let status = PoseStatus::from_code(raw.status_code);

        // unusable poses frequently come with zeroed components
        if status != PoseStatus::Valid {
            return Ok(PoseSample::unusable(raw.frame_pair, status, raw.timestamp));
        }

        if raw.position.iter().chain(raw.orientation.iter()).any(|v| !v.is_finite()) {
            return Err(FrameError::MalformedPose(format!(
                "non-finite components for {}",
                raw.frame_pair
            )));
        }

        let [qx, qy, qz, qw] = raw.orientation;
        let norm = (qx * qx + qy * qy + qz * qz + qw * qw).sqrt();
        if norm < MIN_QUATERNION_NORM {
            return Err(FrameError::MalformedPose(format!(
                "degenerate orientation for {}",
                raw.frame_pair
            )));
        }

        // normalize in f64 before narrowing
        let q = Quat::from_xyzw(
            (qx / norm) as f32,
            (qy / norm) as f32,
            (qz / norm) as f32,
            (qw / norm) as f32,
        );
        let [x, y, z] = raw.position;
        let transform = SE3F32::new(
            SO3F32::from_quaternion(q),
            Vec3A::new(x as f32, y as f32, z as f32),
        );

        Ok(PoseSample::valid(raw.frame_pair, transform, raw.timestamp))
    }
}

/// Fetches dynamic poses for a single frame pair.
#[derive(Debug, Clone, Copy)]
pub struct PoseResolver {
    pair: FramePair,
}

impl PoseResolver {
    /// Create a resolver for `pair`.
    pub fn new(pair: FramePair) -> Self {
        Self { pair }
    }

    /// The frame pair this resolver queries.
    pub fn pair(&self) -> FramePair {
        self.pair
    }

    /// Query the pose at `timestamp` (or the latest with [`LATEST_TIMESTAMP`]).
    ///
    /// Samples of any status are returned; the caller decides what to do with
    /// non-valid ones.
    pub fn resolve<S: PoseService + ?Sized>(
        &self,
        service: &S,
        timestamp: f64,
    ) -> Result<PoseSample, FrameError> {
        if !service.is_connected() {
            return Err(FrameError::ServiceUnavailable);
        }

        let sample = service.query_pose(self.pair, timestamp)?;
        if sample.frame_pair != self.pair {
            return Err(FrameError::FrameMismatch {
                expected: self.pair,
                got: sample.frame_pair,
            });
        }

        Ok(sample)
    }

    /// Like [`PoseResolver::resolve`] but turns non-valid samples into
    /// [`FrameError::PoseInvalid`].
    pub fn resolve_valid<S: PoseService + ?Sized>(
        &self,
        service: &S,
        timestamp: f64,
    ) -> Result<PoseSample, FrameError> {
        let sample = self.resolve(service, timestamp)?;
        if !sample.is_valid() {
            return Err(FrameError::PoseInvalid {
                status: sample.status,
            });
        }
        Ok(sample)
    }

    /// Query the most recent pose.
    pub fn latest<S: PoseService + ?Sized>(&self, service: &S) -> Result<PoseSample, FrameError> {
        self.resolve(service, LATEST_TIMESTAMP)
    }
}
