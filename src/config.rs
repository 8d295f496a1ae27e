//! Provider configuration file location and loading
//!
//! The provider section lives in a TOML file, by default
//! `~/.config/floe/provider.toml`:
//!
//! ```toml
//! [provider]
//! ovh_endpoint = "ovh-eu"
//! snowflake_account = "acme"
//! snowflake_username = "loader"
//! snowflake_private_key_path = "~/.snowflake/rsa_key.p8"
//! ```
//!
//! # Environment Variables
//!
//! - `FLOE_CONFIG_DIR` - Override the config directory

use anyhow::{Context, Result};
use reconcile::ProviderConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "FLOE_CONFIG_DIR";

/// File name of the provider configuration inside the config directory
pub const PROVIDER_FILE: &str = "provider.toml";

/// Get the floe config directory path
///
/// Priority:
/// 1. `FLOE_CONFIG_DIR` env var
/// 2. `~/.config/floe`
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR)
        && !dir.is_empty()
    {
        let path = expand_path(&dir);
        log::debug!("Using config dir from {}: {}", ENV_CONFIG_DIR, path.display());
        return Ok(path);
    }
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("floe"))
}

/// Default provider configuration path
pub fn default_provider_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(PROVIDER_FILE))
}

/// Expand `~` and environment variables in a path argument
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(path).as_ref()),
    }
}

/// A TOML document with an optional `[provider]` table.
///
/// Other top-level keys are ignored so the same file can hold a manifest.
#[derive(Debug, Default, Deserialize)]
struct ProviderFile {
    #[serde(default)]
    provider: Option<ProviderConfig>,
}

/// Parse the `[provider]` table of a TOML document
pub fn parse_provider(content: &str) -> Result<ProviderConfig> {
    let file: ProviderFile = toml::from_str(content).context("Invalid provider configuration")?;
    Ok(file.provider.unwrap_or_default())
}

/// Load the `[provider]` table from a file
pub fn load_provider(path: &Path) -> Result<ProviderConfig> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Could not read {}", path.display()))?;
    parse_provider(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Where the provider configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    File(PathBuf),
    /// Default file does not exist; environment only
    Environment(PathBuf),
}

/// Load an explicitly named file, or the default file when it exists.
///
/// An explicit path must exist; a missing default file yields an empty
/// configuration so the environment alone can supply every field.
pub fn load_provider_or_default(explicit: Option<&str>) -> Result<(ProviderConfig, Source)> {
    if let Some(path) = explicit {
        let path = expand_path(path);
        return Ok((load_provider(&path)?, Source::File(path)));
    }
    let path = default_provider_path()?;
    if path.exists() {
        Ok((load_provider(&path)?, Source::File(path)))
    } else {
        log::debug!("No provider file at {}", path.display());
        Ok((ProviderConfig::default(), Source::Environment(path)))
    }
}
