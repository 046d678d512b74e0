//! Configuration file loading (YAML/TOML)
//!
//! Format is picked from the file extension: `.toml` is TOML, `.yaml`/`.yml`
//! is YAML, anything else is tried as YAML first and then as TOML.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{TalonError, TalonResult};

/// Load a config value from a file (auto-detect format)
pub fn from_file<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> TalonResult<T> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| {
        TalonError::config(format!("Failed to read config {}: {}", path.display(), e))
    })?;

    log::debug!("loading config from {}", path.display());

    match extension(path) {
        Some("toml") => from_toml(&contents),
        Some("yaml") | Some("yml") => from_yaml(&contents),
        _ => from_yaml(&contents).or_else(|_| from_toml(&contents)),
    }
}

/// Parse a config value from a YAML string
pub fn from_yaml<T: DeserializeOwned>(contents: &str) -> TalonResult<T> {
    serde_yaml::from_str(contents)
        .map_err(|e| TalonError::config(format!("Failed to parse YAML: {}", e)))
}

/// Parse a config value from a TOML string
pub fn from_toml<T: DeserializeOwned>(contents: &str) -> TalonResult<T> {
    toml::from_str(contents).map_err(|e| TalonError::config(format!("Failed to parse TOML: {}", e)))
}

/// Save a config value to a file, TOML for `.toml` and YAML otherwise
pub fn save<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> TalonResult<()> {
    let path = path.as_ref();

    let contents = match extension(path) {
        Some("toml") => toml::to_string_pretty(value)?,
        _ => serde_yaml::to_string(value)?,
    };

    std::fs::write(path, contents)
        .map_err(|e| TalonError::config(format!("Failed to write config: {}", e)))
}

/// Return the first existing path out of `candidates`
pub fn find_existing<I>(candidates: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    candidates.into_iter().find(|p| p.exists())
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|s| s.to_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        period_ms: u32,
    }

    #[test]
    fn test_yaml_and_toml_parse() {
        let yaml: Sample = from_yaml("name: left\nperiod_ms: 10\n").unwrap();
        let toml: Sample = from_toml("name = \"left\"\nperiod_ms = 10\n").unwrap();
        assert_eq!(yaml, toml);
    }

    #[test]
    fn test_parse_error_is_config_error() {
        let err = from_yaml::<Sample>("name: [").unwrap_err();
        assert!(matches!(err, TalonError::Config(_)));
    }

    #[test]
    fn test_save_and_reload_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let sample = Sample {
            name: "arm".to_string(),
            period_ms: 20,
        };

        let toml_path = dir.path().join("talon.toml");
        save(&sample, &toml_path).unwrap();
        let text = std::fs::read_to_string(&toml_path).unwrap();
        assert!(text.contains("period_ms = 20"));
        assert_eq!(from_file::<Sample, _>(&toml_path).unwrap(), sample);

        let unknown_path = dir.path().join("talon.conf");
        save(&sample, &unknown_path).unwrap();
        assert_eq!(from_file::<Sample, _>(&unknown_path).unwrap(), sample);
    }

    #[test]
    fn test_find_existing() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("talon.yaml");
        std::fs::write(&present, "x: 1").unwrap();

        let found = find_existing(vec![dir.path().join("talon.toml"), present.clone()]);
        assert_eq!(found, Some(present));
        assert_eq!(find_existing(vec![dir.path().join("missing.yml")]), None);
    }
}
