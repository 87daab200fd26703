//! Command-line argument parsing for the match server.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Gomoku match server command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "gomoku-server", about = "Two-player gomoku match server")]
pub struct CliArgs {
    /// Listener port.
    #[arg(long, short)]
    pub port: Option<u16>,

    /// Address to bind (e.g. 0.0.0.0 or ::).
    #[arg(long)]
    pub bind: Option<String>,

    /// Maximum concurrently connected clients.
    #[arg(long)]
    pub max_sessions: Option<u32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log a hex dump of every received frame.
    #[arg(long)]
    pub hex_dump: bool,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(port) = args.port {
            self.network.port = port;
        }
        if let Some(ref bind) = args.bind {
            self.network.bind_address = bind.clone();
        }
        if let Some(max) = args.max_sessions {
            self.network.max_sessions = max;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
        if args.hex_dump {
            self.debug.hex_dump_frames = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            port: Some(7777),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.network.port, 7777);
        assert_eq!(config.debug.log_level, "debug");
        // Non-overridden fields retain defaults
        assert_eq!(config.network.max_sessions, 1024);
        assert!(!config.debug.hex_dump_frames);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_parse_from_argv() {
        let args = CliArgs::parse_from([
            "gomoku-server",
            "--port",
            "6000",
            "--max-sessions",
            "8",
            "--hex-dump",
        ]);
        assert_eq!(args.port, Some(6000));
        assert_eq!(args.max_sessions, Some(8));
        assert!(args.hex_dump);
        assert!(args.config.is_none());
    }
}
