//! Configuration Vault – reads/writes `~/.egopose/config.toml`.

use egopose_trajectory::{ConversionConfig, frame_interval_ns_from_fps};
use egopose_types::{InitialFramePolicy, PoseError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted user configuration stored in `~/.egopose/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Floor height in the raw world frame (metres).
    #[serde(default)]
    pub floor_offset: f64,

    /// Frame rate of the raw trajectories; sets the timestamp spacing.
    #[serde(default = "default_fps")]
    pub fps: f64,

    /// How the synthetic first frame is produced.
    #[serde(default)]
    pub initial_frame: InitialFramePolicy,

    /// Remove q → −q jumps between consecutive frames.
    #[serde(default)]
    pub enforce_sign_continuity: bool,

    /// Trajectory length used by `egopose validate`.
    #[serde(default = "default_validation_frames")]
    pub validation_frames: usize,

    /// RNG seed used by `egopose validate`.
    #[serde(default = "default_validation_seed")]
    pub validation_seed: u64,
}

fn default_fps() -> f64 {
    egopose_trajectory::DEFAULT_FPS
}
fn default_validation_frames() -> usize {
    80
}
fn default_validation_seed() -> u64 {
    42
}

impl Default for Config {
    fn default() -> Self {
        Self {
            floor_offset: 0.0,
            fps: default_fps(),
            initial_frame: InitialFramePolicy::default(),
            enforce_sign_continuity: false,
            validation_frames: default_validation_frames(),
            validation_seed: default_validation_seed(),
        }
    }
}

impl Config {
    /// Library settings derived from this file.
    pub fn conversion(&self) -> Result<ConversionConfig, PoseError> {
        let cfg = ConversionConfig::default()
            .with_floor_offset(self.floor_offset)
            .with_frame_interval_ns(frame_interval_ns_from_fps(self.fps)?)
            .with_initial_frame(self.initial_frame)
            .with_sign_continuity(self.enforce_sign_continuity);
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Return the path to `~/.egopose/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".egopose").join("config.toml")
}

/// Load the config from disk (defaults when the file is absent), then apply
/// environment overrides.
pub fn load() -> Result<Config, String> {
    let mut cfg = load_from(&config_path())?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Load the config from a specific path.  Returns `None` if the file does
/// not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    Ok(Some(cfg))
}

/// Apply `EGOPOSE_*` environment variable overrides to `cfg`.
///
/// Supported variables:
///
/// | Variable | Config field |
/// |---|---|
/// | `EGOPOSE_FLOOR_OFFSET` | `floor_offset` |
/// | `EGOPOSE_FPS` | `fps` |
/// | `EGOPOSE_INITIAL_FRAME` | `initial_frame` |
/// | `EGOPOSE_SIGN_CONTINUITY` | `enforce_sign_continuity` |
///
/// Unparseable values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("EGOPOSE_FLOOR_OFFSET")
        && let Ok(h) = v.trim().parse::<f64>()
    {
        cfg.floor_offset = h;
    }
    if let Ok(v) = std::env::var("EGOPOSE_FPS")
        && let Ok(fps) = v.trim().parse::<f64>()
    {
        cfg.fps = fps;
    }
    if let Ok(v) = std::env::var("EGOPOSE_INITIAL_FRAME")
        && let Ok(policy) = v.parse::<InitialFramePolicy>()
    {
        cfg.initial_frame = policy;
    }
    if let Ok(v) = std::env::var("EGOPOSE_SIGN_CONTINUITY")
        && let Ok(flag) = v.trim().parse::<bool>()
    {
        cfg.enforce_sign_continuity = flag;
    }
}

/// Save the config to disk, creating `~/.egopose/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let cfg = Config::default();
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded, cfg);
        assert_eq!(loaded.fps, 10.0);
        assert_eq!(loaded.validation_frames, 80);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "floor_offset = 1.3\ninitial_frame = \"repeat_first\"\n").unwrap();

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.floor_offset, 1.3);
        assert_eq!(loaded.initial_frame, InitialFramePolicy::RepeatFirst);
        assert_eq!(loaded.fps, 10.0);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "floor_offset = \"high\"").unwrap();
        assert!(load_from(&path).is_err());
    }

    #[test]
    fn config_path_points_to_egopose_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".egopose"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn conversion_uses_fps_for_interval() {
        let cfg = Config {
            fps: 20.0,
            floor_offset: 0.5,
            ..Config::default()
        };
        let conv = cfg.conversion().unwrap();
        assert_eq!(conv.frame_interval_ns, 50_000_000);
        assert_eq!(conv.floor_offset, 0.5);
    }

    #[test]
    fn conversion_rejects_zero_fps() {
        let cfg = Config {
            fps: 0.0,
            ..Config::default()
        };
        assert!(cfg.conversion().is_err());
    }

    #[test]
    fn apply_env_overrides_changes_floor_offset() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("EGOPOSE_FLOOR_OFFSET", "1.25") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.floor_offset, 1.25);
        unsafe { std::env::remove_var("EGOPOSE_FLOOR_OFFSET") };
    }

    #[test]
    fn apply_env_overrides_changes_policy() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("EGOPOSE_INITIAL_FRAME", "identity") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.initial_frame, InitialFramePolicy::Identity);
        unsafe { std::env::remove_var("EGOPOSE_INITIAL_FRAME") };
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_fps() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("EGOPOSE_FPS", "fast") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.fps, 10.0);
        unsafe { std::env::remove_var("EGOPOSE_FPS") };
    }
}
