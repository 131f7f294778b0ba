//! Session configuration loaded from TOML.
//!
//! Resolution order for [`SessionConfig::load`]:
//! 1. the file named by `$ANCHOR_SYNC_CONFIG`
//! 2. `config.toml` in the platform config directory for `anchor-sync`
//! 3. built-in defaults

use anchor_sync_spatial::Vector3D;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, SessionError};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "ANCHOR_SYNC_CONFIG";

/// Which surfaces the tracking subsystem should detect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlaneDetection {
    None,
    #[default]
    Horizontal,
    Vertical,
    Both,
}

/// How plane updates for different identifiers drive the reality anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlanePolicy {
    /// The first plane seen becomes the reference; other planes are ignored
    #[default]
    FirstPlaneWins,
    /// Every plane update moves the reality anchor
    LastWriterWins,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterConfig {
    /// Name passed to the asset source
    pub asset: String,
    /// Scale applied to the character once loaded
    pub scale: [f32; 3],
    /// Added to the tracked body position before it is written to the character anchor
    pub offset: [f32; 3],
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            asset: "models/robot".to_string(),
            scale: [1.0, 1.0, 1.0],
            offset: [0.0, 0.0, 0.0],
        }
    }
}

impl CharacterConfig {
    pub fn scale_vector(&self) -> Vector3D {
        Vector3D::from_array(self.scale)
    }

    pub fn offset_vector(&self) -> Vector3D {
        Vector3D::from_array(self.offset)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub plane_detection: PlaneDetection,
    pub automatic_skeleton_scale_estimation: bool,
    pub plane_policy: PlanePolicy,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            plane_detection: PlaneDetection::Horizontal,
            automatic_skeleton_scale_estimation: true,
            plane_policy: PlanePolicy::FirstPlaneWins,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Keep the device screen awake while the session runs
    pub disable_idle_timer: bool,
    /// Capacity of the tracking callback channel
    pub frame_channel_capacity: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            disable_idle_timer: true,
            frame_channel_capacity: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorNames {
    pub character_name: String,
    pub reality_name: String,
}

impl Default for AnchorNames {
    fn default() -> Self {
        Self {
            character_name: "Character Anchor".to_string(),
            reality_name: "Reality Anchor".to_string(),
        }
    }
}

/// Top-level configuration for one tracking session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SessionConfig {
    pub character: CharacterConfig,
    pub tracking: TrackingConfig,
    pub session: LifecycleConfig,
    pub anchors: AnchorNames,
}

impl SessionConfig {
    /// Load using the environment / config directory / defaults chain
    pub fn load() -> Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            let path = PathBuf::from(path);
            debug!("Loading session config from ${}: {}", CONFIG_ENV, path.display());
            return Self::from_path(&path);
        }

        if let Some(path) = Self::default_path() {
            if path.exists() {
                debug!("Loading session config from {}", path.display());
                return Self::from_path(&path);
            }
        }

        debug!("No session config file found, using defaults");
        Ok(Self::default())
    }

    /// Platform config file location, if the platform has a config directory
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "anchor-sync").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SessionError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: SessionConfig = toml::from_str(contents)
            .map_err(|e| SessionError::Config(format!("invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| SessionError::Config(format!("failed to serialize config: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.character.asset.trim().is_empty() {
            return Err(SessionError::Config("character.asset must not be empty".into()));
        }
        if self
            .character
            .scale
            .iter()
            .any(|s| !s.is_finite() || *s <= 0.0)
        {
            return Err(SessionError::Config(format!(
                "character.scale must be positive, got {:?}",
                self.character.scale
            )));
        }
        if !self.character.offset_vector().is_finite() {
            return Err(SessionError::Config("character.offset must be finite".into()));
        }
        if self.session.frame_channel_capacity == 0 {
            return Err(SessionError::Config(
                "session.frame_channel_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.character.asset, "models/robot");
        assert_eq!(config.tracking.plane_detection, PlaneDetection::Horizontal);
        assert!(config.tracking.automatic_skeleton_scale_estimation);
        assert_eq!(config.tracking.plane_policy, PlanePolicy::FirstPlaneWins);
        assert_eq!(config.anchors.character_name, "Character Anchor");
        assert_eq!(config.anchors.reality_name, "Reality Anchor");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SessionConfig::from_toml_str(
            r#"
            [character]
            asset = "models/astronaut"
            offset = [0.0, 0.1, 0.0]

            [tracking]
            plane_policy = "last_writer_wins"
            "#,
        )
        .unwrap();

        assert_eq!(config.character.asset, "models/astronaut");
        assert_eq!(config.character.scale, [1.0, 1.0, 1.0]);
        assert_eq!(config.character.offset_vector(), Vector3D::new(0.0, 0.1, 0.0));
        assert_eq!(config.tracking.plane_policy, PlanePolicy::LastWriterWins);
        assert_eq!(config.session.frame_channel_capacity, 64);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let err = SessionConfig::from_toml_str("[character]\nscale = [1.0, 0.0, 1.0]\n").unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));

        let err = SessionConfig::from_toml_str("[session]\nframe_channel_capacity = 0\n").unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));

        let err = SessionConfig::from_toml_str("[tracking]\nplane_detection = \"sideways\"\n")
            .unwrap_err();
        assert!(err.to_string().contains("invalid TOML"));
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut config = SessionConfig::default();
        config.tracking.plane_detection = PlaneDetection::Both;
        let text = config.to_toml_string().unwrap();
        assert_eq!(SessionConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    #[serial]
    fn test_load_from_env_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[anchors]\nreality_name = \"Floor\"").unwrap();

        std::env::set_var(CONFIG_ENV, file.path());
        let config = SessionConfig::load();
        std::env::remove_var(CONFIG_ENV);

        assert_eq!(config.unwrap().anchors.reality_name, "Floor");
    }

    #[test]
    #[serial]
    fn test_load_missing_env_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var(CONFIG_ENV, dir.path().join("absent.toml"));
        let result = SessionConfig::load();
        std::env::remove_var(CONFIG_ENV);

        assert!(matches!(result, Err(SessionError::Config(_))));
    }
}
