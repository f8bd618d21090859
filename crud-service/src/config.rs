//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: CRUD_, sections separated by `__`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/crud-service/{service_name}/config.toml
//! 4. System directory: /etc/crud-service/{service_name}/config.toml
//! 5. Default values
//!
//! For example `CRUD_USECASE__TIMEOUT_MS=250` overrides `usecase.timeout_ms`.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::repository::{PageLimits, DEFAULT_SIZE_PAGE, MAX_SIZE_PAGE};

const ENV_PREFIX: &str = "CRUD_";
const APP_DIR: &str = "crud-service";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,

    /// Use-case execution settings
    #[serde(default)]
    pub usecase: UseCaseConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    pub name: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level or `EnvFilter` directive (e.g. `info,crud_service=debug`)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Environment (dev, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,
}

/// Bounds applied to every use-case operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseCaseConfig {
    /// Budget of one operation in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Page size used when the client sends none
    #[serde(default = "default_size_page")]
    pub default_size_page: u32,

    /// Largest page size a client may request
    #[serde(default = "default_max_size_page")]
    pub max_size_page: u32,
}

impl UseCaseConfig {
    /// Operation budget as a duration
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Page limits for request normalization
    #[must_use]
    pub fn limits(&self) -> PageLimits {
        PageLimits {
            default_size_page: self.default_size_page,
            max_size_page: self.max_size_page,
        }
    }
}

impl Default for UseCaseConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            default_size_page: default_size_page(),
            max_size_page: default_max_size_page(),
        }
    }
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_size_page() -> u32 {
    DEFAULT_SIZE_PAGE
}

fn default_max_size_page() -> u32 {
    MAX_SIZE_PAGE
}

impl Config {
    /// Load configuration from all sources
    ///
    /// The service name is taken from the binary name.
    pub fn load() -> Result<Self> {
        let service_name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| APP_DIR.to_string());

        Self::load_for_service(&service_name)
    }

    /// Load configuration for a specific service name
    pub fn load_for_service(service_name: &str) -> Result<Self> {
        let config_paths = Self::find_config_paths(service_name);

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Self::named(service_name)));

        // Lowest priority first so higher priority files override
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        let config = figment.merge(Self::env()).extract()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// This bypasses the search path. A missing file leaves the defaults in
    /// place; environment variables still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Self::env())
            .extract()?;

        Ok(config)
    }

    fn env() -> Env {
        Env::prefixed(ENV_PREFIX).split("__")
    }

    fn named(service_name: &str) -> Self {
        let mut config = Self::default();
        config.service.name = service_name.to_string();
        config
    }

    /// Possible config file paths, highest priority first
    fn find_config_paths(service_name: &str) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let config_file_path = Path::new(service_name).join("config.toml");
        if let Some(path) =
            xdg::BaseDirectories::with_prefix(APP_DIR).find_config_file(&config_file_path)
        {
            paths.push(path);
        }

        paths.push(
            PathBuf::from("/etc")
                .join(APP_DIR)
                .join(service_name)
                .join("config.toml"),
        );

        paths
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: APP_DIR.to_string(),
                port: default_port(),
                log_level: default_log_level(),
                environment: default_environment(),
            },
            usecase: UseCaseConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service.port, 8080);
        assert_eq!(config.service.log_level, "info");
        assert_eq!(config.usecase.timeout(), Duration::from_secs(5));
        assert_eq!(config.usecase.limits(), PageLimits::default());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[service]
name = "roles"
port = 9090

[usecase]
timeout_ms = 250
max_size_page = 50
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.service.name, "roles");
        assert_eq!(config.service.port, 9090);
        assert_eq!(config.service.log_level, "info");
        assert_eq!(config.usecase.timeout(), Duration::from_millis(250));
        assert_eq!(config.usecase.default_size_page, DEFAULT_SIZE_PAGE);
        assert_eq!(config.usecase.limits().max_size_page, 50);
    }

    #[test]
    fn test_missing_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.service.port, Config::default().service.port);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[usecase]\ntimeout_ms = \"soon\"").unwrap();

        let error = Config::load_from(file.path()).unwrap_err();
        assert!(matches!(error, crate::error::Error::Config(_)));
    }
}
