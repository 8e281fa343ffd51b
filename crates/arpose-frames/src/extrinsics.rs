use std::collections::HashMap;

use arpose_lie::SE3F32;

use crate::error::FrameError;
use crate::frame::{CoordinateFrame, FramePair};
use crate::service::PoseService;

/// Resolves and memoizes the static `device_T_sensor` transforms of one session.
///
/// The service only exposes each sensor relative to the IMU, so the device-relative
/// extrinsics are derived as `inverse(imu_T_device) · imu_T_sensor`. Results are cached
/// until [`ExtrinsicsResolver::invalidate`] is called on reconnect. Failures are never
/// cached and never replaced by a default transform.
#[derive(Debug, Default, Clone)]
pub struct ExtrinsicsResolver {
    imu_t_device: Option<SE3F32>,
    device_t_sensor: HashMap<CoordinateFrame, SE3F32>,
}

impl ExtrinsicsResolver {
    /// An empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `device_T_sensor`, querying the service only on a cache miss.
    ///
    /// # Errors
    ///
    /// [`FrameError::ServiceUnavailable`] when the service is not connected, otherwise
    /// [`FrameError::ExtrinsicsUnresolved`] for any failed underlying query.
    pub fn resolve<S: PoseService + ?Sized>(
        &mut self,
        service: &S,
        sensor: CoordinateFrame,
    ) -> Result<SE3F32, FrameError> {
        if let Some(cached) = self.device_t_sensor.get(&sensor) {
            return Ok(*cached);
        }

        if !service.is_connected() {
            return Err(FrameError::ServiceUnavailable);
        }

        let device_t_sensor = match sensor {
            CoordinateFrame::Device => SE3F32::IDENTITY,
            frame if frame.is_mounted() => {
                let imu_t_device = self.imu_t_device(service, sensor)?;
                let imu_t_sensor = if frame == CoordinateFrame::Imu {
                    SE3F32::IDENTITY
                } else {
                    query(service, FramePair::new(CoordinateFrame::Imu, frame), sensor)?
                };
                imu_t_device.inverse() * imu_t_sensor
            }
            _ => return Err(FrameError::ExtrinsicsUnresolved { sensor }),
        };

        log::debug!("resolved extrinsics device->{sensor}: {device_t_sensor:?}");
        self.device_t_sensor.insert(sensor, device_t_sensor);
        Ok(device_t_sensor)
    }

    /// The cached transform for `sensor`, if it was resolved in this session.
    pub fn cached(&self, sensor: CoordinateFrame) -> Option<SE3F32> {
        self.device_t_sensor.get(&sensor).copied()
    }

    /// Drop every cached transform. Call this when reconnecting to the service.
    pub fn invalidate(&mut self) {
        if !self.device_t_sensor.is_empty() || self.imu_t_device.is_some() {
            log::debug!("invalidating {} cached extrinsics", self.device_t_sensor.len());
        }
        self.imu_t_device = None;
        self.device_t_sensor.clear();
    }

    fn imu_t_device<S: PoseService + ?Sized>(
        &mut self,
        service: &S,
        sensor: CoordinateFrame,
    ) -> Result<SE3F32, FrameError> {
        if let Some(imu_t_device) = self.imu_t_device {
            return Ok(imu_t_device);
        }
        let imu_t_device = query(service, FramePair::IMU_T_DEVICE, sensor)?;
        self.imu_t_device = Some(imu_t_device);
        Ok(imu_t_device)
    }
}

fn query<S: PoseService + ?Sized>(
    service: &S,
    pair: FramePair,
    sensor: CoordinateFrame,
) -> Result<SE3F32, FrameError> {
    service
        .query_static_extrinsics(pair)
        .map_err(|err| match err {
            FrameError::ServiceUnavailable => FrameError::ServiceUnavailable,
            other => {
                log::warn!("static query {pair} failed: {other}");
                FrameError::ExtrinsicsUnresolved { sensor }
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::MockPoseService;
    use arpose_lie::SO3F32;
    use glam::Vec3A;

    fn imu_t_color() -> FramePair {
        FramePair::new(CoordinateFrame::Imu, CoordinateFrame::CameraColor)
    }

    #[test]
    fn test_device_t_camera_from_yaw() -> Result<(), FrameError> {
        let yaw = SO3F32::from_axis_angle(Vec3A::Z, std::f32::consts::FRAC_PI_2);
        let service = MockPoseService::new();
        service.set_static(FramePair::IMU_T_DEVICE, SE3F32::from_rotation(yaw));
        service.set_static(imu_t_color(), SE3F32::IDENTITY);

        let mut resolver = ExtrinsicsResolver::new();
        let device_t_camera = resolver.resolve(&service, CoordinateFrame::CameraColor)?;

        let expected = SE3F32::from_rotation(yaw.inverse());
        assert!(device_t_camera.abs_diff_eq(&expected, 1e-6));
        Ok(())
    }

    #[test]
    fn test_idempotent_without_requery() -> Result<(), FrameError> {
        let service = MockPoseService::new();
        service.set_static(
            FramePair::IMU_T_DEVICE,
            SE3F32::from_translation(Vec3A::new(0.0, 0.0, 0.01)),
        );
        service.set_static(
            imu_t_color(),
            SE3F32::from_axis_angle(Vec3A::X, 0.1, Vec3A::new(0.02, 0.0, 0.0)),
        );

        let mut resolver = ExtrinsicsResolver::new();
        let first = resolver.resolve(&service, CoordinateFrame::CameraColor)?;
        let queries = service.static_query_count();
        let second = resolver.resolve(&service, CoordinateFrame::CameraColor)?;

        assert_eq!(first, second);
        assert_eq!(service.static_query_count(), queries);
        assert_eq!(resolver.cached(CoordinateFrame::CameraColor), Some(first));
        Ok(())
    }

    #[test]
    fn test_imu_t_device_shared_between_sensors() -> Result<(), FrameError> {
        let service = MockPoseService::new();
        service.set_static(FramePair::IMU_T_DEVICE, SE3F32::IDENTITY);
        service.set_static(imu_t_color(), SE3F32::IDENTITY);
        service.set_static(
            FramePair::new(CoordinateFrame::Imu, CoordinateFrame::CameraDepth),
            SE3F32::IDENTITY,
        );

        let mut resolver = ExtrinsicsResolver::new();
        resolver.resolve(&service, CoordinateFrame::CameraColor)?;
        resolver.resolve(&service, CoordinateFrame::CameraDepth)?;
        // imu->device once, then one query per sensor
        assert_eq!(service.static_query_count(), 3);
        Ok(())
    }

    #[test]
    fn test_failure_is_explicit_and_not_cached() {
        let service = MockPoseService::new();
        service.set_static(FramePair::IMU_T_DEVICE, SE3F32::IDENTITY);

        let mut resolver = ExtrinsicsResolver::new();
        assert_eq!(
            resolver.resolve(&service, CoordinateFrame::CameraColor),
            Err(FrameError::ExtrinsicsUnresolved {
                sensor: CoordinateFrame::CameraColor
            })
        );
        assert_eq!(resolver.cached(CoordinateFrame::CameraColor), None);

        service.set_static(imu_t_color(), SE3F32::IDENTITY);
        assert!(resolver.resolve(&service, CoordinateFrame::CameraColor).is_ok());
    }

    #[test]
    fn test_service_unavailable_propagates() {
        let service = MockPoseService::new();
        service.set_connected(false);
        let mut resolver = ExtrinsicsResolver::new();
        assert_eq!(
            resolver.resolve(&service, CoordinateFrame::CameraColor),
            Err(FrameError::ServiceUnavailable)
        );
    }

    #[test]
    fn test_non_mounted_frame_is_unresolved() {
        let service = MockPoseService::new();
        let mut resolver = ExtrinsicsResolver::new();
        assert_eq!(
            resolver.resolve(&service, CoordinateFrame::StartOfService),
            Err(FrameError::ExtrinsicsUnresolved {
                sensor: CoordinateFrame::StartOfService
            })
        );
    }

    #[test]
    fn test_invalidate_requeries() -> Result<(), FrameError> {
        let service = MockPoseService::new();
        service.set_static(FramePair::IMU_T_DEVICE, SE3F32::IDENTITY);
        service.set_static(imu_t_color(), SE3F32::IDENTITY);

        let mut resolver = ExtrinsicsResolver::new();
        resolver.resolve(&service, CoordinateFrame::CameraColor)?;
        resolver.invalidate();
        assert_eq!(resolver.cached(CoordinateFrame::CameraColor), None);

        let moved = SE3F32::from_translation(Vec3A::new(0.0, 0.05, 0.0));
        service.set_static(imu_t_color(), moved);
        let device_t_camera = resolver.resolve(&service, CoordinateFrame::CameraColor)?;
        assert!(device_t_camera.abs_diff_eq(&moved, 1e-6));
        assert_eq!(service.static_query_count(), 4);
        Ok(())
    }
}
