//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name used inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.ron";

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Listener and session limits.
    pub network: NetworkConfig,
    /// Per-connection socket options.
    pub tcp: TcpConfig,
    /// Logging and diagnostics.
    pub debug: DebugConfig,
}

/// Listener and session limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address the listener binds to.
    pub bind_address: String,
    /// Listener port.
    pub port: u16,
    /// Maximum concurrently registered sessions. Client ids are drawn from
    /// `1..=max_sessions`, so this may not exceed `u16::MAX`.
    pub max_sessions: u32,
    /// Capacity of the channel carrying connection events into the event loop.
    pub event_queue_depth: usize,
}

/// Socket options applied to every accepted connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TcpConfig {
    /// Disable Nagle's algorithm.
    pub nodelay: bool,
    /// Enable TCP keepalive probes.
    pub keepalive: bool,
    /// Idle time before the first keepalive probe, in seconds.
    pub keepalive_idle_secs: u64,
    /// Interval between keepalive probes, in seconds.
    pub keepalive_interval_secs: u64,
}

/// Logging and diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log filter (e.g., "debug", "info", "gomoku_net=trace").
    pub log_level: String,
    /// Log a hex dump of every received frame at trace level.
    pub hex_dump_frames: bool,
    /// Directory for JSON log files. Console only when unset.
    pub log_dir: Option<PathBuf>,
}

// --- Default implementations ---

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 6666,
            max_sessions: 1024,
            event_queue_depth: 1024,
        }
    }
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            nodelay: true,
            keepalive: true,
            keepalive_idle_secs: 60,
            keepalive_interval_secs: 10,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            hex_dump_frames: false,
            log_dir: None,
        }
    }
}

/// Platform config directory for the server, e.g. `~/.config/gomoku-server`.
///
/// Falls back to the working directory when the platform has none.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("gomoku-server"))
        .unwrap_or_else(|| PathBuf::from("."))
}

// --- Validation / Load / Save / Reload ---

impl Config {
    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.max_sessions == 0 || self.network.max_sessions > u32::from(u16::MAX) {
            return Err(ConfigError::Invalid {
                field: "network.max_sessions",
                reason: format!(
                    "{} is outside 1..={}",
                    self.network.max_sessions,
                    u16::MAX
                ),
            });
        }
        if self.network.event_queue_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "network.event_queue_depth",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// The `bind_address:port` pair as a single string.
    pub fn listen_address(&self) -> String {
        if self.network.bind_address.contains(':') {
            format!("[{}]:{}", self.network.bind_address, self.network.port)
        } else {
            format!("{}:{}", self.network.bind_address, self.network.port)
        }
    }

    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            let config = Self::read_file(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`, creating the
    /// directory if needed.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let write_error = |source| ConfigError::Write {
            path: config_path.clone(),
            source,
        };

        std::fs::create_dir_all(config_dir).map_err(write_error)?;
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .enumerate_arrays(false);
        let serialized = ron::ser::to_string_pretty(self, pretty)?;
        std::fs::write(&config_path, serialized).map_err(write_error)?;
        Ok(())
    }

    /// Re-read the file: `Some(new_config)` if it differs from `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = Self::read_file(&config_dir.join(CONFIG_FILE_NAME))?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("port: 6666"));
        assert!(ron_str.contains("max_sessions: 1024"));
    }

    #[test]
    fn test_missing_section_uses_default() {
        let config: Config = ron::from_str("(network: (port: 7000))").unwrap();
        assert_eq!(config.network.port, 7000);
        assert_eq!(config.network.max_sessions, 1024);
        assert_eq!(config.tcp, TcpConfig::default());
        assert_eq!(config.debug, DebugConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(board_size: 19)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let result: Result<Config, _> = ron::from_str("{{not valid}}");
        assert!(result.is_err());
    }

    #[test]
    fn test_default_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_session_limit_must_fit_id_space() {
        let mut config = Config::default();
        config.network.max_sessions = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "network.max_sessions",
                ..
            })
        ));

        config.network.max_sessions = u32::from(u16::MAX) + 1;
        assert!(config.validate().is_err());

        config.network.max_sessions = u32::from(u16::MAX);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_queue_depth_rejected() {
        let mut config = Config::default();
        config.network.event_queue_depth = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_listen_address_formats() {
        let mut config = Config::default();
        assert_eq!(config.listen_address(), "0.0.0.0:6666");

        config.network.bind_address = "::".to_string();
        config.network.port = 7001;
        assert_eq!(config.listen_address(), "[::]:7001");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.network.port = 9000;
        config.debug.hex_dump_frames = true;
        config.debug.log_dir = Some(PathBuf::from("/tmp/gomoku-logs"));

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join(CONFIG_FILE_NAME).exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.network.max_sessions = 64;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert_eq!(result.map(|c| c.network.max_sessions), Some(64));
    }

    #[test]
    fn test_corrupt_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "(network: (port: \"x\"))").unwrap();

        match Config::load_or_create(dir.path()) {
            Err(ConfigError::Parse { path, .. }) => {
                assert_eq!(path, dir.path().join(CONFIG_FILE_NAME));
            }
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_reload_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::default().reload(dir.path()),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        assert!(config.reload(dir.path()).unwrap().is_none());
    }
}
