use serde::{Deserialize, Serialize};

/// A named 3D reference frame.
///
/// Frames are labels only; they never carry data themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateFrame {
    /// Origin of a saved area description, stable across sessions.
    AreaDescription,
    /// Where the device was when the tracking service started.
    StartOfService,
    /// The device pose at the previous pose update.
    PreviousDevicePose,
    /// The device body.
    Device,
    /// The inertial measurement unit.
    Imu,
    /// The display panel.
    Display,
    /// The color camera.
    CameraColor,
    /// The depth camera.
    CameraDepth,
    /// The wide-angle fisheye camera.
    CameraFisheye,
    /// The renderer's world frame. Never queried from the service.
    RenderWorld,
}

impl CoordinateFrame {
    /// Frames that are rigidly mounted on the device and have static extrinsics.
    pub fn is_mounted(&self) -> bool {
        matches!(
            self,
            CoordinateFrame::Device
                | CoordinateFrame::Imu
                | CoordinateFrame::Display
                | CoordinateFrame::CameraColor
                | CoordinateFrame::CameraDepth
                | CoordinateFrame::CameraFisheye
        )
    }

    /// Frames that can serve as the tracking origin of a dynamic pose.
    pub fn is_origin(&self) -> bool {
        matches!(
            self,
            CoordinateFrame::AreaDescription
                | CoordinateFrame::StartOfService
                | CoordinateFrame::PreviousDevicePose
        )
    }

    /// Numeric id used by the native tracking service.
    pub fn service_id(&self) -> Option<i32> {
        let id = match self {
            CoordinateFrame::AreaDescription => 0,
            CoordinateFrame::StartOfService => 1,
            CoordinateFrame::PreviousDevicePose => 2,
            CoordinateFrame::Device => 3,
            CoordinateFrame::Imu => 4,
            CoordinateFrame::Display => 5,
            CoordinateFrame::CameraColor => 6,
            CoordinateFrame::CameraDepth => 7,
            CoordinateFrame::CameraFisheye => 8,
            CoordinateFrame::RenderWorld => return None,
        };
        Some(id)
    }

    /// Inverse of [`CoordinateFrame::service_id`].
    pub fn from_service_id(id: i32) -> Option<Self> {
        let frame = match id {
            0 => CoordinateFrame::AreaDescription,
            1 => CoordinateFrame::StartOfService,
            2 => CoordinateFrame::PreviousDevicePose,
            3 => CoordinateFrame::Device,
            4 => CoordinateFrame::Imu,
            5 => CoordinateFrame::Display,
            6 => CoordinateFrame::CameraColor,
            7 => CoordinateFrame::CameraDepth,
            8 => CoordinateFrame::CameraFisheye,
            _ => return None,
        };
        Some(frame)
    }
}

impl std::fmt::Display for CoordinateFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CoordinateFrame::AreaDescription => "area_description",
            CoordinateFrame::StartOfService => "start_of_service",
            CoordinateFrame::PreviousDevicePose => "previous_device_pose",
            CoordinateFrame::Device => "device",
            CoordinateFrame::Imu => "imu",
            CoordinateFrame::Display => "display",
            CoordinateFrame::CameraColor => "camera_color",
            CoordinateFrame::CameraDepth => "camera_depth",
            CoordinateFrame::CameraFisheye => "camera_fisheye",
            CoordinateFrame::RenderWorld => "render_world",
        };
        f.write_str(name)
    }
}

/// A `(base, target)` query. The answer is `base_T_target`: the pose of `target`
/// expressed in `base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FramePair {
    /// Frame the pose is expressed in.
    pub base: CoordinateFrame,
    /// Frame whose pose is requested.
    pub target: CoordinateFrame,
}

impl FramePair {
    /// Create a new frame pair.
    pub const fn new(base: CoordinateFrame, target: CoordinateFrame) -> Self {
        Self { base, target }
    }

    /// Device motion relative to the start-of-service origin.
    pub const START_OF_SERVICE_T_DEVICE: Self =
        Self::new(CoordinateFrame::StartOfService, CoordinateFrame::Device);

    /// Device motion relative to a loaded area description.
    pub const AREA_DESCRIPTION_T_DEVICE: Self =
        Self::new(CoordinateFrame::AreaDescription, CoordinateFrame::Device);

    /// Static mounting of the device body on the IMU.
    pub const IMU_T_DEVICE: Self = Self::new(CoordinateFrame::Imu, CoordinateFrame::Device);

    /// The pair with base and target swapped.
    pub fn swapped(&self) -> Self {
        Self::new(self.target, self.base)
    }
}

impl std::fmt::Display for FramePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}->{}", self.base, self.target)
    }
}
