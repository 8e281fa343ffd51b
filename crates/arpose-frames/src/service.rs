use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use arpose_lie::SE3F32;

use crate::error::FrameError;
use crate::frame::FramePair;
use crate::pose::{PoseSample, PoseStatus, LATEST_TIMESTAMP};

/// The external tracking service that answers pose and extrinsics queries.
///
/// Implementations wrap the native device SDK. Every method may be called from the
/// render thread; none of them may block for long.
pub trait PoseService {
    /// Whether the service is connected and able to answer queries.
    fn is_connected(&self) -> bool;

    /// Query `pair` at `timestamp` seconds, or the latest pose for [`LATEST_TIMESTAMP`].
    fn query_pose(&self, pair: FramePair, timestamp: f64) -> Result<PoseSample, FrameError>;

    /// Query a static mounting transform. Only valid answers are returned.
    fn query_static_extrinsics(&self, pair: FramePair) -> Result<SE3F32, FrameError> {
        let sample = self.query_pose(pair, LATEST_TIMESTAMP)?;
        if sample.frame_pair != pair {
            return Err(FrameError::FrameMismatch {
                expected: pair,
                got: sample.frame_pair,
            });
        }
        sample.valid_transform().ok_or(FrameError::PoseInvalid {
            status: sample.status,
        })
    }
}

impl<T: PoseService + ?Sized> PoseService for Arc<T> {
    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn query_pose(&self, pair: FramePair, timestamp: f64) -> Result<PoseSample, FrameError> {
        (**self).query_pose(pair, timestamp)
    }

    fn query_static_extrinsics(&self, pair: FramePair) -> Result<SE3F32, FrameError> {
        (**self).query_static_extrinsics(pair)
    }
}

/// A scripted in-memory service for tests and demos.
///
/// Static transforms are looked up by frame pair. Dynamic queries pop scripted samples
/// in FIFO order and answer `Initializing` once the script runs dry.
#[derive(Debug)]
pub struct MockPoseService {
    connected: AtomicBool,
    statics: Mutex<HashMap<FramePair, SE3F32>>,
    poses: Mutex<VecDeque<PoseSample>>,
    pose_queries: AtomicUsize,
    static_queries: AtomicUsize,
}

impl Default for MockPoseService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPoseService {
    /// A connected service with no scripted data.
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            statics: Mutex::new(HashMap::new()),
            poses: Mutex::new(VecDeque::new()),
            pose_queries: AtomicUsize::new(0),
            static_queries: AtomicUsize::new(0),
        }
    }

    /// Simulate the service connecting or dropping.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Script the answer to a static extrinsics query.
    pub fn set_static(&self, pair: FramePair, transform: SE3F32) {
        self.statics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pair, transform);
    }

    /// Forget a scripted static transform.
    pub fn clear_static(&self, pair: FramePair) {
        self.statics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&pair);
    }

    /// Queue the answer to the next dynamic pose query.
    pub fn push_pose(&self, sample: PoseSample) {
        self.poses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(sample);
    }

    /// Number of dynamic pose queries received so far.
    pub fn pose_query_count(&self) -> usize {
        self.pose_queries.load(Ordering::SeqCst)
    }

    /// Number of static extrinsics queries received so far.
    pub fn static_query_count(&self) -> usize {
        self.static_queries.load(Ordering::SeqCst)
    }
}

impl PoseService for MockPoseService {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn query_pose(&self, pair: FramePair, timestamp: f64) -> Result<PoseSample, FrameError> {
        self.pose_queries.fetch_add(1, Ordering::SeqCst);
        if !self.is_connected() {
            return Err(FrameError::ServiceUnavailable);
        }

        let scripted = self
            .poses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        Ok(scripted
            .unwrap_or_else(|| PoseSample::unusable(pair, PoseStatus::Initializing, timestamp)))
    }

    fn query_static_extrinsics(&self, pair: FramePair) -> Result<SE3F32, FrameError> {
        self.static_queries.fetch_add(1, Ordering::SeqCst);
        if !self.is_connected() {
            return Err(FrameError::ServiceUnavailable);
        }

        self.statics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&pair)
            .copied()
            .ok_or(FrameError::PoseInvalid {
                status: PoseStatus::Invalid,
            })
    }
}
