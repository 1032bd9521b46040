use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::decode::ResolutionMode;
use crate::store::Backend;

pub const DEFAULT_BATCH_SIZE: usize = 500;
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

/// Where converted output goes when the command line does not say
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetConfig {
    pub backend: Backend,
    pub location: PathBuf,
    /// Passed through untouched; neither backend needs it today
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeConfig {
    /// No default: decoding needs an explicit choice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<ResolutionMode>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Kept last so it serializes as a trailing `[target]` table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetConfig>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            resolution: None,
            batch_size: DEFAULT_BATCH_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            target: None,
        }
    }
}

impl BridgeConfig {
    /// Resolution mode from the command line, else from the file
    pub fn resolution_or(&self, cli: Option<ResolutionMode>) -> anyhow::Result<ResolutionMode> {
        match cli.or(self.resolution) {
            Some(mode) => Ok(mode),
            None => anyhow::bail!(
                "no resolution mode given: pass --resolution strict|lenient or set `resolution` in the config"
            ),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("lexbridge.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<BridgeConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: BridgeConfig = toml::from_str(&contents)?;
    if config.batch_size == 0 {
        anyhow::bail!("batch_size in {} must be at least 1", path.display());
    }
    tracing::debug!("Loaded config from {}", path.display());
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &BridgeConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    ensure_parent_dir(path)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_keys() {
        let config: BridgeConfig = toml::from_str("resolution = \"lenient\"\n").unwrap();
        assert_eq!(config.resolution, Some(ResolutionMode::Lenient));
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert!(config.target.is_none());
    }

    #[test]
    fn test_target_section() {
        let config: BridgeConfig = toml::from_str(
            "batch_size = 10\n[target]\nbackend = \"xml\"\nlocation = \"out/lexicon.xml\"\n",
        )
        .unwrap();
        let target = config.target.unwrap();
        assert_eq!(target.backend, Backend::Xml);
        assert_eq!(target.location, PathBuf::from("out/lexicon.xml"));
        assert_eq!(target.credentials, None);
    }

    #[test]
    fn test_resolution_must_be_chosen() {
        let config = BridgeConfig::default();
        assert!(config.resolution_or(None).is_err());
        assert_eq!(config.resolution_or(Some(ResolutionMode::Strict)).unwrap(), ResolutionMode::Strict);

        let config = BridgeConfig { resolution: Some(ResolutionMode::Lenient), ..BridgeConfig::default() };
        assert_eq!(config.resolution_or(None).unwrap(), ResolutionMode::Lenient);
        assert_eq!(config.resolution_or(Some(ResolutionMode::Strict)).unwrap(), ResolutionMode::Strict);
    }

    #[test]
    fn test_write_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("lexbridge.toml");
        let config = BridgeConfig { resolution: Some(ResolutionMode::Strict), ..BridgeConfig::default() };
        write_config(&path, &config, false).unwrap();
        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &config, true).unwrap();

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded, config);
        assert!(load_config(Some(&dir.path().join("missing.toml"))).unwrap().is_none());

        std::fs::write(&path, "batch_size = 0\n").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }
}
