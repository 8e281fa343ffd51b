use std::path::Path;

use glam::Mat4;
use serde::{Deserialize, Serialize};

use crate::convention::RenderConvention;
use crate::error::ConfigError;
use crate::frame::CoordinateFrame;

/// Which axis-change preset a render entity uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConventionConfig {
    /// See [`RenderConvention::identity`].
    Identity,
    /// See [`RenderConvention::unity`].
    Unity,
    /// See [`RenderConvention::unity_device`].
    UnityDevice,
    /// Explicit column-major matrices.
    Custom {
        /// Tracking origin to render world.
        world_from_origin: [f32; 16],
        /// Render entity to sensor.
        sensor_from_render: [f32; 16],
    },
}

impl Default for ConventionConfig {
    fn default() -> Self {
        ConventionConfig::Unity
    }
}

impl ConventionConfig {
    /// Build the convention, validating custom matrices.
    pub fn build(&self) -> Result<RenderConvention, ConfigError> {
        match self {
            ConventionConfig::Identity => Ok(RenderConvention::identity()),
            ConventionConfig::Unity => Ok(RenderConvention::unity()),
            ConventionConfig::UnityDevice => Ok(RenderConvention::unity_device()),
            ConventionConfig::Custom {
                world_from_origin,
                sensor_from_render,
            } => RenderConvention::new(
                Mat4::from_cols_array(world_from_origin),
                Mat4::from_cols_array(sensor_from_render),
            ),
        }
    }
}

/// Configuration of one render entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorConfig {
    /// Tracking origin the device pose is expressed in.
    pub origin: CoordinateFrame,
    /// Sensor the entity is attached to.
    pub sensor: CoordinateFrame,
    /// Axis changes into the renderer.
    pub convention: ConventionConfig,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            origin: CoordinateFrame::StartOfService,
            sensor: CoordinateFrame::CameraColor,
            convention: ConventionConfig::default(),
        }
    }
}

impl CompositorConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        log::debug!("loading compositor config from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Check that each frame plays a role it can play and that custom matrices are
    /// usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.origin.is_origin() {
            return Err(ConfigError::InvalidFrame(format!(
                "{} is not a tracking origin",
                self.origin
            )));
        }
        if !self.sensor.is_mounted() {
            return Err(ConfigError::InvalidFrame(format!(
                "{} is not mounted on the device",
                self.sensor
            )));
        }
        self.convention.build().map(|_| ())
    }
}
