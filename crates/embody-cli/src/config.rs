//! Model file handling – reads/writes `~/.embody/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use embody_runtime::ModelConfig;

/// Return the path to `~/.embody/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".embody").join("config.toml")
}

/// Load the model from `path`.  Returns `None` if the file does not exist.
pub fn load_from(path: &Path) -> Result<Option<ModelConfig>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg = ModelConfig::from_toml(&raw).map_err(|e| e.to_string())?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `EMBODY_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `EMBODY_FPS` | `frames_per_second` |
/// | `EMBODY_RETURN_TO_DEFAULT_MS` | `return_to_default_ms` |
/// | `EMBODY_FRAME_HISTORY` | `frame_history` |
///
/// Unparsable values are ignored.
pub fn apply_env_overrides(cfg: &mut ModelConfig) {
    apply_overrides(cfg, |key| std::env::var(key).ok());
}

pub(crate) fn apply_overrides(cfg: &mut ModelConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(fps) = lookup("EMBODY_FPS").and_then(|v| v.trim().parse().ok()) {
        cfg.frames_per_second = fps;
    }
    if let Some(ms) = lookup("EMBODY_RETURN_TO_DEFAULT_MS").and_then(|v| v.trim().parse().ok()) {
        cfg.return_to_default_ms = ms;
    }
    if let Some(n) = lookup("EMBODY_FRAME_HISTORY").and_then(|v| v.trim().parse().ok()) {
        cfg.frame_history = n;
    }
}

/// Write `cfg` to `path`, creating the parent directory if necessary.
pub fn save_to(cfg: &ModelConfig, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw = cfg.to_toml().map_err(|e| e.to_string())?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_points_to_embody_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".embody"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn roundtrip_demo_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let cfg = ModelConfig::demo();
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.sensors.len(), 1);
        assert_eq!(loaded.sensors[0].kind, "sim");
        assert_eq!(loaded.filter, cfg.filter);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("broken.toml");
        fs::write(&path, "frames_per_second = \"fast\"").expect("write");
        let err = load_from(&path).err().expect("parse error");
        assert!(err.contains("Configuration Error"), "unexpected message: {err}");
    }

    #[test]
    fn overrides_replace_timing() {
        let mut cfg = ModelConfig::default();
        apply_overrides(&mut cfg, |key| match key {
            "EMBODY_FPS" => Some("60".to_string()),
            "EMBODY_RETURN_TO_DEFAULT_MS" => Some("750".to_string()),
            "EMBODY_FRAME_HISTORY" => Some("0".to_string()),
            _ => None,
        });
        assert_eq!(cfg.frames_per_second, 60.0);
        assert_eq!(cfg.return_to_default_ms, 750);
        assert_eq!(cfg.frame_history, 0);
    }

    #[test]
    fn overrides_ignore_invalid_values() {
        let mut cfg = ModelConfig::default();
        apply_overrides(&mut cfg, |key| match key {
            "EMBODY_FPS" => Some("fast".to_string()),
            "EMBODY_FRAME_HISTORY" => Some("-3".to_string()),
            _ => None,
        });
        assert_eq!(cfg, ModelConfig::default());
    }

    #[test]
    fn env_override_is_read() {
        // SAFETY: no other test reads this variable.
        unsafe { std::env::set_var("EMBODY_RETURN_TO_DEFAULT_MS", "1234") };
        let mut cfg = ModelConfig::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.return_to_default_ms, 1234);
        unsafe { std::env::remove_var("EMBODY_RETURN_TO_DEFAULT_MS") };
    }
}
