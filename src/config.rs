use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::sources::Mirror;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub bundle: BundleConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BundleConfig {
    /// Bundle directory. Defaults to `bundle` next to the executable.
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default = "default_source")]
    pub default_source: String,
    #[serde(default = "default_bundle_timeout")]
    pub timeout_secs: u64,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            dir: None,
            default_source: default_source(),
            timeout_secs: default_bundle_timeout(),
        }
    }
}

fn default_source() -> String {
    "of".to_string()
}
fn default_bundle_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_api_timeout(),
        }
    }
}

fn default_api_timeout() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportConfig {
    #[serde(default = "default_count")]
    pub default_count: usize,
    #[serde(default = "default_filename")]
    pub default_filename: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            default_count: default_count(),
            default_filename: default_filename(),
        }
    }
}

fn default_count() -> usize {
    10
}
fn default_filename() -> String {
    "hitokoto.txt".to_string()
}

impl Config {
    /// Configuration with every default, used when no file exists.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// Bundle directory: configured value, else `bundle` beside the binary,
    /// else `./bundle`.
    pub fn bundle_dir(&self) -> PathBuf {
        if let Some(dir) = &self.bundle.dir {
            return dir.clone();
        }
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|p| p.join("bundle")))
            .unwrap_or_else(|| PathBuf::from("bundle"))
    }

    pub fn default_mirror(&self) -> Result<Mirror> {
        self.bundle
            .default_source
            .parse::<Mirror>()
            .map_err(|e| anyhow::anyhow!("bundle.default_source: {}", e))
    }
}

/// Load a config file. A missing file yields [`Config::minimal`].
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!("no config at {}, using defaults", path.display());
        return Ok(Config::minimal());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.bundle.timeout_secs == 0 {
        anyhow::bail!("bundle.timeout_secs must be > 0");
    }
    if config.api.timeout_secs == 0 {
        anyhow::bail!("api.timeout_secs must be > 0");
    }
    config.default_mirror()?;

    if config.export.default_count == 0 {
        anyhow::bail!("export.default_count must be > 0");
    }
    if config.export.default_filename.trim().is_empty() {
        anyhow::bail!("export.default_filename must not be empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("hitokoto.toml")).unwrap();
        assert_eq!(config.bundle.default_source, "of");
        assert_eq!(config.bundle.timeout_secs, 30);
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.export.default_count, 10);
        assert_eq!(config.export.default_filename, "hitokoto.txt");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hitokoto.toml");
        std::fs::write(
            &path,
            "[bundle]\ndir = \"/data/quotes\"\ndefault_source = \"gh\"\n",
        )
        .unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.bundle_dir(), PathBuf::from("/data/quotes"));
        assert_eq!(config.default_mirror().unwrap(), Mirror::GitHub);
        assert_eq!(config.bundle.timeout_secs, 30);
    }

    #[test]
    fn invalid_values_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hitokoto.toml");

        std::fs::write(&path, "[bundle]\ndefault_source = \"npm\"\n").unwrap();
        assert!(load_config(&path).is_err());

        std::fs::write(&path, "[api]\ntimeout_secs = 0\n").unwrap();
        assert!(load_config(&path).is_err());

        std::fs::write(&path, "[export]\ndefault_count = 0\n").unwrap();
        assert!(load_config(&path).is_err());

        std::fs::write(&path, "not = [valid").unwrap();
        assert!(load_config(&path).is_err());
    }
}
