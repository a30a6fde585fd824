pub mod error;
pub mod settings;

pub use error::*;
pub use settings::{Backoff, DEFAULT_CONCURRENCY, Settings};

use std::path::PathBuf;

pub const CONFIG_PATH_VAR: &str = "DRIFTFLOW_CONFIG_PATH";

const CANDIDATES: [&str; 4] = [
    "driftflow.local.yaml",
    ".driftflow.local.yaml",
    "driftflow.yaml",
    ".driftflow.yaml",
];

/// Locate the settings file
///
/// Search order:
/// 1. `DRIFTFLOW_CONFIG_PATH` (direct path)
/// 2. Current directory: driftflow.local.yaml, .driftflow.local.yaml, driftflow.yaml, .driftflow.yaml
/// 3. `./.driftflow/` directory, same order
/// 4. `~/.config/driftflow/config.yaml` (global settings)
pub fn find_settings_file() -> Result<Option<PathBuf>> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_VAR) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(Some(path));
        }
        tracing::warn!(path = %path.display(), "{} points to a missing file", CONFIG_PATH_VAR);
    }

    let current_dir = std::env::current_dir()?;
    for dir in [current_dir.clone(), current_dir.join(".driftflow")] {
        if !dir.is_dir() {
            continue;
        }
        for filename in &CANDIDATES {
            let path = dir.join(filename);
            if path.exists() {
                return Ok(Some(path));
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global = config_dir.join("driftflow").join("config.yaml");
        if global.exists() {
            return Ok(Some(global));
        }
    }

    Ok(None)
}

/// Load settings from the discovered file, or defaults when there is none.
pub fn load() -> Result<Settings> {
    match find_settings_file()? {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Loading settings");
            Settings::load_from(&path)
        }
        None => Ok(Settings::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    /// Run `f` inside `dir` with `DRIFTFLOW_CONFIG_PATH` unset
    fn in_dir<T>(dir: &std::path::Path, f: impl FnOnce() -> T) -> T {
        let original_dir = std::env::current_dir().unwrap();
        let saved = std::env::var(CONFIG_PATH_VAR).ok();
        unsafe {
            std::env::remove_var(CONFIG_PATH_VAR);
        }
        std::env::set_current_dir(dir).unwrap();

        let out = f();

        std::env::set_current_dir(original_dir).unwrap();
        if let Some(value) = saved {
            unsafe {
                std::env::set_var(CONFIG_PATH_VAR, value);
            }
        }
        out
    }

    #[test]
    #[serial]
    fn test_find_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("driftflow.yaml"), "concurrency: 2\n").unwrap();

        let found = in_dir(temp_dir.path(), find_settings_file).unwrap().unwrap();
        assert!(found.ends_with("driftflow.yaml"));
    }

    #[test]
    #[serial]
    fn test_local_file_has_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("driftflow.yaml"), "concurrency: 2\n").unwrap();
        fs::write(temp_dir.path().join("driftflow.local.yaml"), "concurrency: 3\n").unwrap();

        let settings = in_dir(temp_dir.path(), load).unwrap();
        assert_eq!(settings.concurrency, 3);
    }

    #[test]
    #[serial]
    fn test_find_in_project_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let project_dir = temp_dir.path().join(".driftflow");
        fs::create_dir(&project_dir).unwrap();
        fs::write(project_dir.join("driftflow.yaml"), "timeout_secs: 60\n").unwrap();

        let found = in_dir(temp_dir.path(), find_settings_file).unwrap().unwrap();
        assert!(found.ends_with(".driftflow/driftflow.yaml"));
    }

    #[test]
    #[serial]
    fn test_env_var_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.yaml");
        fs::write(&config_path, "concurrency: 7\n").unwrap();

        unsafe {
            std::env::set_var(CONFIG_PATH_VAR, config_path.to_str().unwrap());
        }
        let result = find_settings_file().unwrap();
        let settings = load().unwrap();
        unsafe {
            std::env::remove_var(CONFIG_PATH_VAR);
        }

        assert_eq!(result, Some(config_path));
        assert_eq!(settings.concurrency, 7);
    }

    #[test]
    #[serial]
    fn test_defaults_without_file() {
        let temp_dir = tempfile::tempdir().unwrap();

        let found = in_dir(temp_dir.path(), find_settings_file).unwrap();
        // A developer's global config may exist; only assert the local search came up empty
        if let Some(path) = found {
            assert!(!path.starts_with(temp_dir.path()));
        } else {
            let settings = in_dir(temp_dir.path(), load).unwrap();
            assert_eq!(settings, Settings::default());
        }
    }
}
