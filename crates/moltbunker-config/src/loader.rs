//! Configuration loader.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::error::ConfigError;
use crate::schema::ClientConfig;

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<ClientConfig, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<ClientConfig, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let config: ClientConfig = toml::from_str(&expanded)?;
        Ok(config)
    }

    /// Load from the default location, falling back to built-in defaults.
    ///
    /// Environment overrides are applied in both cases.
    pub fn load_default() -> Result<ClientConfig, ConfigError> {
        let config = match Self::default_path() {
            Some(path) if path.exists() => {
                debug!("Loading config from {}", path.display());
                Self::load(&path)?
            }
            _ => ClientConfig::default(),
        };
        Ok(config.with_env_overrides())
    }

    /// `~/.config/moltbunker/config.toml` (platform config dir).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("moltbunker").join("config.toml"))
    }

    /// Expand environment variables in the format `${VAR}`.
    pub fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        static VAR_RE: OnceLock<Regex> = OnceLock::new();
        let re = VAR_RE.get_or_init(|| {
            Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static regex is valid")
        });

        let mut result = content.to_string();
        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    /// Expand shell-style paths (e.g., `~/.config`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}
