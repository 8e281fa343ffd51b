use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arpose_lie::SE3F32;

use crate::error::FrameError;
use crate::extrinsics::ExtrinsicsResolver;
use crate::frame::{CoordinateFrame, FramePair};
use crate::pose::{PoseResolver, PoseSample};
use crate::service::PoseService;

/// Everything tied to one connection with the pose service.
///
/// A session is created once and passed explicitly to the components that need the
/// service or the cached extrinsics.
#[derive(Debug)]
pub struct Session<S> {
    service: S,
    extrinsics: ExtrinsicsResolver,
    generation: Arc<AtomicU64>,
}

/// The connection a value was resolved under.
///
/// Components that keep their own copy of per-connection data hold one of these and
/// check [`ConnectionGeneration::is_current`] before using it.
#[derive(Debug, Clone)]
pub struct ConnectionGeneration {
    current: Arc<AtomicU64>,
    bound: u64,
}

impl ConnectionGeneration {
    /// Generation this handle was taken at.
    pub fn bound(&self) -> u64 {
        self.bound
    }

    /// Whether the session has not reconnected since this handle was taken.
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.bound
    }
}

impl<S: PoseService> Session<S> {
    /// Wrap a service handle.
    pub fn new(service: S) -> Self {
        Self {
            service,
            extrinsics: ExtrinsicsResolver::new(),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Check that the service is reachable.
    ///
    /// Failing to connect is reported as [`FrameError::ServiceUnavailable`]; nothing is
    /// retried at this layer.
    pub fn connect(&mut self) -> Result<(), FrameError> {
        if !self.service.is_connected() {
            log::warn!("pose service unavailable (generation {})", self.generation());
            return Err(FrameError::ServiceUnavailable);
        }
        log::debug!("pose service connected (generation {})", self.generation());
        Ok(())
    }

    /// Start a new connection: cached extrinsics are dropped and re-queried on demand.
    pub fn reconnect(&mut self) -> Result<(), FrameError> {
        self.extrinsics.invalidate();
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.connect()
    }

    /// Number of reconnects since the session was created.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// A handle on the current connection that goes stale on the next reconnect.
    pub fn connection(&self) -> ConnectionGeneration {
        ConnectionGeneration {
            current: self.generation.clone(),
            bound: self.generation(),
        }
    }

    /// The wrapped service.
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Cached `device_T_sensor` for this connection, see [`ExtrinsicsResolver::resolve`].
    pub fn extrinsics(&mut self, sensor: CoordinateFrame) -> Result<SE3F32, FrameError> {
        self.extrinsics.resolve(&self.service, sensor)
    }

    /// Query a dynamic pose, see [`PoseResolver::resolve`].
    pub fn pose(&self, pair: FramePair, timestamp: f64) -> Result<PoseSample, FrameError> {
        PoseResolver::new(pair).resolve(&self.service, timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::MockPoseService;
    use std::sync::Arc;

    #[test]
    fn test_connect() {
        let service = Arc::new(MockPoseService::new());
        let mut session = Session::new(service.clone());
        assert!(session.connect().is_ok());

        service.set_connected(false);
        assert_eq!(session.connect(), Err(FrameError::ServiceUnavailable));
    }

    #[test]
    fn test_reconnect_invalidates_extrinsics() -> Result<(), FrameError> {
        let service = Arc::new(MockPoseService::new());
        let imu_t_color = FramePair::new(CoordinateFrame::Imu, CoordinateFrame::CameraColor);
        service.set_static(FramePair::IMU_T_DEVICE, SE3F32::IDENTITY);
        service.set_static(imu_t_color, SE3F32::IDENTITY);

        let mut session = Session::new(service.clone());
        session.extrinsics(CoordinateFrame::CameraColor)?;
        session.extrinsics(CoordinateFrame::CameraColor)?;
        assert_eq!(service.static_query_count(), 2);

        let before = session.connection();
        session.reconnect()?;
        assert_eq!(session.generation(), 1);
        assert!(!before.is_current());
        assert_eq!(session.connection().bound(), 1);
        assert!(session.connection().is_current());
        session.extrinsics(CoordinateFrame::CameraColor)?;
        assert_eq!(service.static_query_count(), 4);
        Ok(())
    }
}
