//! Server configuration.
//!
//! The core settings come from the command line:
//!
//! ```text
//! facewire-server clientlimit maxsize [portnumber]
//! ```
//!
//! Optional extras live in a TOML file named by `FACEWIRE_SERVER_CONFIG`:
//!
//! ```toml
//! bind_host = "127.0.0.1"
//! legacy_response_path = "/srv/facewire/legacy_response"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Highest accepted client limit.
pub const MAX_CLIENT_LIMIT: u32 = 10_000;

/// Environment variable naming the optional settings file.
pub const SETTINGS_ENV: &str = "FACEWIRE_SERVER_CONFIG";

/// Legacy-fallback blob sent when a peer's first bytes are not the magic prefix.
pub const DEFAULT_LEGACY_RESPONSE: &[u8] = include_bytes!("../resources/legacy_response.txt");

/// Errors produced while building the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("cannot load legacy response {}: {source}", path.display())]
    LegacyResponse {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Immutable server configuration, shared read-only by every session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Listen backlog (0..=10000).
    pub client_limit: u32,
    /// Largest accepted image in bytes. "Unlimited" is stored as `u32::MAX`.
    pub max_image_size: u32,
    /// Port to listen on; `"0"` lets the OS choose.
    pub port: String,
    /// Host or address to bind.
    pub bind_host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            client_limit: 128,
            max_image_size: u32::MAX,
            port: "0".into(),
            bind_host: default_bind_host(),
        }
    }
}

impl ServerConfig {
    /// Parses `clientlimit maxsize [portnumber]` (program name excluded).
    pub fn from_args<I>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let args: Vec<I::Item> = args.into_iter().collect();
        if !(2..=3).contains(&args.len()) {
            return Err(ConfigError::Usage("expected 2 or 3 arguments"));
        }

        let client_limit = parse_client_limit(args[0].as_ref())?;
        let max_image_size = parse_max_size(args[1].as_ref())?;
        let port = match args.get(2) {
            Some(port) if port.as_ref().is_empty() => {
                return Err(ConfigError::Usage("port must not be empty"));
            }
            Some(port) => port.as_ref().to_string(),
            None => "0".to_string(),
        };

        Ok(Self {
            client_limit,
            max_image_size,
            port,
            bind_host: default_bind_host(),
        })
    }

    /// Applies the optional settings file on top of the command line.
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.bind_host = settings.bind_host.clone();
        self
    }
}

fn parse_client_limit(value: &str) -> Result<u32, ConfigError> {
    match value.parse::<u32>() {
        Ok(limit) if limit <= MAX_CLIENT_LIMIT => Ok(limit),
        _ => Err(ConfigError::Usage("clientlimit must be an integer in 0..=10000")),
    }
}

fn parse_max_size(value: &str) -> Result<u32, ConfigError> {
    match value.parse::<u32>() {
        Ok(0) => Ok(u32::MAX),
        Ok(size) => Ok(size),
        Err(_) => Err(ConfigError::Usage("maxsize must be an integer in 0..=4294967295")),
    }
}

/// Optional settings loaded from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Host or address the listener binds to.
    #[serde(default = "default_bind_host")]
    pub bind_host: String,

    /// File whose bytes replace the built-in legacy-fallback blob.
    #[serde(default)]
    pub legacy_response_path: Option<PathBuf>,
}

fn default_bind_host() -> String {
    "127.0.0.1".into()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_host: default_bind_host(),
            legacy_response_path: None,
        }
    }
}

impl Settings {
    /// Loads settings from the file named by [`SETTINGS_ENV`], or defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(SETTINGS_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    /// Loads settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Returns the legacy-fallback blob: the configured file, or the built-in one.
    pub fn legacy_response(&self) -> Result<Arc<[u8]>, ConfigError> {
        match &self.legacy_response_path {
            Some(path) => std::fs::read(path)
                .map(Arc::from)
                .map_err(|source| ConfigError::LegacyResponse {
                    path: path.clone(),
                    source,
                }),
            None => Ok(Arc::from(DEFAULT_LEGACY_RESPONSE)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_arguments_use_ephemeral_port() {
        let config = ServerConfig::from_args(["10", "5000"]).unwrap();
        assert_eq!(config.client_limit, 10);
        assert_eq!(config.max_image_size, 5000);
        assert_eq!(config.port, "0");
        assert_eq!(config.bind_host, "127.0.0.1");
    }

    #[test]
    fn explicit_port() {
        let config = ServerConfig::from_args(["0", "1", "8080"]).unwrap();
        assert_eq!(config.client_limit, 0);
        assert_eq!(config.port, "8080");
    }

    #[test]
    fn zero_max_size_means_unlimited() {
        let config = ServerConfig::from_args(["5", "0"]).unwrap();
        assert_eq!(config.max_image_size, u32::MAX);
    }

    #[test]
    fn max_size_accepts_u32_max() {
        let config = ServerConfig::from_args(["5", "4294967295"]).unwrap();
        assert_eq!(config.max_image_size, u32::MAX);
    }

    #[test]
    fn rejects_bad_argument_counts() {
        assert!(ServerConfig::from_args(["5"]).is_err());
        assert!(ServerConfig::from_args(["5", "1", "80", "extra"]).is_err());
        assert!(ServerConfig::from_args(Vec::<String>::new()).is_err());
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(ServerConfig::from_args(["10001", "1"]).is_err());
        assert!(ServerConfig::from_args(["-1", "1"]).is_err());
        assert!(ServerConfig::from_args(["5", "4294967296"]).is_err());
        assert!(ServerConfig::from_args(["5", "-3"]).is_err());
        assert!(ServerConfig::from_args(["abc", "1"]).is_err());
        assert!(ServerConfig::from_args(["5", "12kb"]).is_err());
    }

    #[test]
    fn rejects_empty_strings() {
        assert!(ServerConfig::from_args(["", "1"]).is_err());
        assert!(ServerConfig::from_args(["1", ""]).is_err());
        assert!(ServerConfig::from_args(["1", "1", ""]).is_err());
    }

    #[test]
    fn settings_partial_toml() {
        let settings: Settings = toml::from_str(r#"legacy_response_path = "/tmp/blob""#).unwrap();
        assert_eq!(settings.bind_host, "127.0.0.1");
        assert_eq!(
            settings.legacy_response_path,
            Some(PathBuf::from("/tmp/blob"))
        );
    }

    #[test]
    fn settings_override_bind_host() {
        let settings = Settings {
            bind_host: "0.0.0.0".into(),
            ..Settings::default()
        };
        let config = ServerConfig::from_args(["1", "1"])
            .unwrap()
            .with_settings(&settings);
        assert_eq!(config.bind_host, "0.0.0.0");
    }

    #[test]
    fn settings_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");
        std::fs::write(&path, "bind_host = \"localhost\"\n").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.bind_host, "localhost");
        assert!(settings.legacy_response_path.is_none());
    }

    #[test]
    fn default_legacy_response_is_builtin() {
        let blob = Settings::default().legacy_response().unwrap();
        assert_eq!(&blob[..], DEFAULT_LEGACY_RESPONSE);
        assert!(!blob.is_empty());
    }

    #[test]
    fn legacy_response_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.bin");
        std::fs::write(&path, [0xDE, 0xAD]).unwrap();

        let settings = Settings {
            legacy_response_path: Some(path),
            ..Settings::default()
        };
        assert_eq!(&settings.legacy_response().unwrap()[..], &[0xDE, 0xAD]);
    }

    #[test]
    fn missing_legacy_response_is_an_error() {
        let settings = Settings {
            legacy_response_path: Some(PathBuf::from("/nonexistent/facewire/legacy")),
            ..Settings::default()
        };
        assert!(matches!(
            settings.legacy_response(),
            Err(ConfigError::LegacyResponse { .. })
        ));
    }
}
