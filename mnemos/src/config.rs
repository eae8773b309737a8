//! Configuration management for mnemos.
//!
//! The memory configuration is loaded from the first source found:
//! 1. `--config PATH` or the `MNEMOS_CONFIG` environment variable
//! 2. Config file in the platform config directory (config.toml)
//! 3. Default values

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use mnemos_core::MemoryConfiguration;

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Explicit(PathBuf),
    Default(PathBuf),
    BuiltIn,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Explicit(path) | Self::Default(path) => write!(f, "{}", path.display()),
            Self::BuiltIn => write!(f, "built-in defaults"),
        }
    }
}

/// Load and validate the memory configuration.
///
/// An explicitly requested file must exist; the default location may be absent.
pub fn load(explicit: Option<&Path>) -> Result<(MemoryConfiguration, ConfigSource)> {
    if let Some(path) = explicit {
        if !path.exists() {
            bail!("Config file not found: {}", path.display());
        }
        let config = read(path)?;
        return Ok((config, ConfigSource::Explicit(path.to_path_buf())));
    }

    let path = default_config_path();
    if path.exists() {
        let config = read(&path)?;
        return Ok((config, ConfigSource::Default(path)));
    }

    Ok((MemoryConfiguration::default(), ConfigSource::BuiltIn))
}

fn read(path: &Path) -> Result<MemoryConfiguration> {
    MemoryConfiguration::load(path)
        .with_context(|| format!("Failed to load config file {}", path.display()))
}

/// Get the default config file path.
pub fn default_config_path() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("dev", "mnemos", "mnemos") {
        proj_dirs.config_dir().join("config.toml")
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".mnemos")
            .join("config.toml")
    }
}
