use std::path::{Path, PathBuf};

use glam::Vec3;
use physview_camera::CameraParams;
use physview_input::KeyBindings;
use physview_physics::{AvatarMotion, SimConfig};
use physview_render::LightRig;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub eye: Vec3,
    pub target: Vec3,
    #[serde(flatten)]
    pub params: CameraParams,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            eye: Vec3::new(20.0, 3.0, 20.0),
            target: Vec3::ZERO,
            params: CameraParams::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Longest step fed to physics, in seconds.
    pub max_dt: f32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self { max_dt: 1.0 / 30.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: Vec3,
    #[serde(flatten)]
    pub sim: SimConfig,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            sim: SimConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarConfig {
    /// Follow a physics body instead of flying freely.
    pub enabled: bool,
    pub spawn: Vec3,
    pub mass: f32,
    /// Size of the fallback box hull when no avatar model is configured.
    pub half_extents: Vec3,
    #[serde(flatten)]
    pub motion: AvatarMotion,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            spawn: Vec3::new(20.0, 3.0, 20.0),
            mass: 85.0,
            half_extents: Vec3::new(0.3, 0.9, 0.3),
            motion: AvatarMotion::default(),
        }
    }
}

/// The stacked grid of falling props.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropsConfig {
    /// Inclusive lower grid coordinate on x and z.
    pub grid_min: i32,
    /// Exclusive upper grid coordinate on x and z.
    pub grid_max: i32,
    pub layers: u32,
    pub spacing: f32,
    pub base_height: f32,
    pub mass: f32,
    pub texture_seed: u64,
    /// Uniform scale baked into the prop model at import.
    pub model_scale: f32,
    /// Generated textures when no prop textures load.
    pub fallback_textures: usize,
}

impl Default for PropsConfig {
    fn default() -> Self {
        Self {
            grid_min: -5,
            grid_max: 5,
            layers: 50,
            spacing: 1.5,
            base_height: 20.0,
            mass: 10.0,
            texture_seed: 0x5eed,
            model_scale: 0.015,
            fallback_textures: 5,
        }
    }
}

impl PropsConfig {
    /// Number of props the grid spawns. Saturates instead of overflowing.
    pub fn count(&self) -> usize {
        let side = (i64::from(self.grid_max) - i64::from(self.grid_min)).max(0) as u64;
        let total = side.saturating_mul(side).saturating_mul(u64::from(self.layers));
        usize::try_from(total).unwrap_or(usize::MAX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub shadow_clear: [f32; 4],
    pub screen_clear: [f32; 4],
    pub sky_size: f32,
    /// Wait for the display refresh. Off runs the loop as fast as it can go.
    pub vsync: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            shadow_clear: [1.0, 1.0, 1.0, 1.0],
            screen_clear: [0.5, 0.5, 1.0, 1.0],
            sky_size: 300.0,
            vsync: false,
        }
    }
}

/// Model and texture files. Anything missing falls back to generated content.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Directory the other paths are relative to.
    pub root: Option<PathBuf>,
    pub scene_model: Option<PathBuf>,
    pub physics_model: Option<PathBuf>,
    pub prop_model: Option<PathBuf>,
    pub avatar_model: Option<PathBuf>,
    pub prop_textures: Vec<PathBuf>,
}

impl AssetsConfig {
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

/// Everything tunable about the viewer. Defaults reproduce the stock scene.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub camera: CameraConfig,
    pub keys: KeyBindings,
    pub timing: TimingConfig,
    pub physics: PhysicsConfig,
    pub avatar: AvatarConfig,
    pub props: PropsConfig,
    pub light: LightRig,
    pub render: RenderConfig,
    pub assets: AssetsConfig,
}

impl ViewerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&text)?;
        tracing::info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: format!("{value} must be a positive number"),
                })
            }
        }

        positive("timing.max_dt", self.timing.max_dt)?;
        positive("camera.move_speed", self.camera.params.move_speed)?;
        positive("camera.max_pointer_step", self.camera.params.max_pointer_step)?;
        positive("camera.near", self.camera.params.near)?;
        positive("props.spacing", self.props.spacing)?;
        positive("props.model_scale", self.props.model_scale)?;
        positive("light.half_extent", self.light.half_extent)?;
        positive("render.sky_size", self.render.sky_size)?;
        if self.camera.params.far <= self.camera.params.near {
            return Err(ConfigError::Invalid {
                field: "camera.far",
                reason: "must be beyond camera.near".to_string(),
            });
        }
        if self.light.far <= self.light.near {
            return Err(ConfigError::Invalid {
                field: "light.far",
                reason: "must be beyond light.near".to_string(),
            });
        }
        if self.light.shadow_resolution == 0 {
            return Err(ConfigError::Invalid {
                field: "light.shadow_resolution",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.avatar.motion.damping) {
            return Err(ConfigError::Invalid {
                field: "avatar.damping",
                reason: format!("{} is outside 0..=1", self.avatar.motion.damping),
            });
        }
        Ok(())
    }
}
