use arpose_lie::SE3F32;

use crate::config::CompositorConfig;
use crate::convention::{RenderConvention, RenderTransform};
use crate::error::{ConfigError, FrameError};
use crate::frame::{CoordinateFrame, FramePair};
use crate::pose::PoseSample;
use crate::service::PoseService;
use crate::session::{ConnectionGeneration, Session};
use crate::slot::SlotReader;

/// Tracking state of a single render entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    /// Extrinsics are not known yet; poses cannot be composed.
    Uninitialized,
    /// Extrinsics are known; the entity holds its last transform, if any.
    WaitingForValidPose,
    /// The last sample was valid and has been applied.
    Tracking,
}

/// Chains `origin_T_device`, `device_T_sensor` and a render convention into the
/// transform of one render entity (camera rig, point-cloud root, overlay plane).
///
/// The static extrinsics term is set once per connection; the dynamic pose term is
/// recomposed on every valid sample. Non-valid samples never move the entity: the last
/// valid transform is held until a new valid one arrives.
#[derive(Debug, Clone)]
pub struct FrameCompositor {
    pair: FramePair,
    sensor: CoordinateFrame,
    convention: RenderConvention,
    device_t_sensor: Option<SE3F32>,
    connection: Option<ConnectionGeneration>,
    state: TrackingState,
    last: Option<RenderTransform>,
    last_timestamp: Option<f64>,
}

impl FrameCompositor {
    /// Create a compositor for an entity attached to `sensor`, tracked relative to
    /// `origin`.
    pub fn new(origin: CoordinateFrame, sensor: CoordinateFrame, convention: RenderConvention) -> Self {
        Self {
            pair: FramePair::new(origin, CoordinateFrame::Device),
            sensor,
            convention,
            device_t_sensor: None,
            connection: None,
            state: TrackingState::Uninitialized,
            last: None,
            last_timestamp: None,
        }
    }

    /// Create a compositor from a validated configuration.
    pub fn from_config(config: &CompositorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config.origin, config.sensor, config.convention.build()?))
    }

    /// Current tracking state.
    pub fn state(&self) -> TrackingState {
        self.state
    }

    /// Whether the last sample was valid.
    pub fn is_tracking(&self) -> bool {
        self.state == TrackingState::Tracking
    }

    /// The last composed transform, held across non-valid samples.
    pub fn transform(&self) -> Option<RenderTransform> {
        self.last
    }

    /// Timestamp of the sample behind [`FrameCompositor::transform`].
    pub fn last_timestamp(&self) -> Option<f64> {
        self.last_timestamp
    }

    /// The dynamic pose pair this compositor consumes.
    pub fn frame_pair(&self) -> FramePair {
        self.pair
    }

    /// The sensor the render entity is attached to.
    pub fn sensor(&self) -> CoordinateFrame {
        self.sensor
    }

    /// The render convention applied to every output.
    pub fn convention(&self) -> &RenderConvention {
        &self.convention
    }

    /// Install the static `device_T_sensor` term. Extrinsics set by hand are not tied
    /// to any session connection.
    pub fn set_extrinsics(&mut self, device_t_sensor: SE3F32) {
        self.device_t_sensor = Some(device_t_sensor);
        self.connection = None;
        if self.state == TrackingState::Uninitialized {
            log::debug!("compositor {}: waiting for a valid pose", self.sensor);
            self.state = TrackingState::WaitingForValidPose;
        }
    }

    /// Resolve the static term through the session's extrinsics cache.
    ///
    /// The term is bound to the session's current connection: once the session
    /// reconnects, [`FrameCompositor::update`] refuses it until the compositor is
    /// initialized again.
    pub fn initialize<S: PoseService>(&mut self, session: &mut Session<S>) -> Result<(), FrameError> {
        let device_t_sensor = session.extrinsics(self.sensor)?;
        self.set_extrinsics(device_t_sensor);
        self.connection = Some(session.connection());
        Ok(())
    }

    /// Initialize if the static term is missing or belongs to a previous connection.
    /// Cheap to call once per render frame.
    pub fn sync<S: PoseService>(&mut self, session: &mut Session<S>) -> Result<(), FrameError> {
        if self.device_t_sensor.is_some() && !self.is_stale() {
            return Ok(());
        }
        self.reset();
        self.initialize(session)
    }

    /// Forget the static term after a reconnect. The last transform stays on screen.
    pub fn reset(&mut self) {
        self.device_t_sensor = None;
        self.connection = None;
        self.state = TrackingState::Uninitialized;
    }

    fn is_stale(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|connection| !connection.is_current())
    }

    /// Feed one pose sample.
    ///
    /// # Errors
    ///
    /// - [`FrameError::ExtrinsicsUnresolved`] before the static term is known, or once
    ///   the session it was resolved under has reconnected. The stale term is dropped
    ///   and the compositor goes back to [`TrackingState::Uninitialized`].
    /// - [`FrameError::FrameMismatch`] for samples of another frame pair.
    /// - [`FrameError::PoseInvalid`] for non-valid samples; recoverable, the held
    ///   transform is untouched.
    pub fn update(&mut self, sample: &PoseSample) -> Result<RenderTransform, FrameError> {
        let Some(device_t_sensor) = self.device_t_sensor else {
            return Err(FrameError::ExtrinsicsUnresolved {
                sensor: self.sensor,
            });
        };

        if self.is_stale() {
            log::debug!(
                "compositor {}: extrinsics belong to a previous connection",
                self.sensor
            );
            self.reset();
            return Err(FrameError::ExtrinsicsUnresolved {
                sensor: self.sensor,
            });
        }

        if sample.frame_pair != self.pair {
            return Err(FrameError::FrameMismatch {
                expected: self.pair,
                got: sample.frame_pair,
            });
        }

        let Some(origin_t_device) = sample.valid_transform() else {
            if self.state == TrackingState::Tracking {
                log::debug!(
                    "compositor {}: lost tracking at t={} ({:?})",
                    self.sensor,
                    sample.timestamp,
                    sample.status
                );
                self.state = TrackingState::WaitingForValidPose;
            }
            return Err(FrameError::PoseInvalid {
                status: sample.status,
            });
        };

        let origin_t_sensor = origin_t_device * device_t_sensor;
        let transform = self.convention.apply(&origin_t_sensor);

        if self.state != TrackingState::Tracking {
            log::debug!("compositor {}: tracking at t={}", self.sensor, sample.timestamp);
            self.state = TrackingState::Tracking;
        }
        self.last = Some(transform);
        self.last_timestamp = Some(sample.timestamp);

        Ok(transform)
    }

    /// Consume at most one pending sample from `reader` and feed it to
    /// [`FrameCompositor::update`]. Returns `Ok(None)` when nothing is pending.
    pub fn poll(&mut self, reader: &SlotReader<PoseSample>) -> Result<Option<RenderTransform>, FrameError> {
        match reader.take() {
            Some(sample) => self.update(&sample).map(Some),
            None => Ok(None),
        }
    }
}
