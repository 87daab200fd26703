//! Configuration for the gomoku match server.
//!
//! Settings persist to disk as a RON file and can be overridden per run from
//! the command line. Unknown or missing fields fall back to defaults so older
//! config files keep loading.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{CONFIG_FILE_NAME, Config, DebugConfig, NetworkConfig, TcpConfig, default_config_dir};
pub use error::ConfigError;
