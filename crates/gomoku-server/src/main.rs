//! Gomoku match server.
//!
//! Loads `config.ron` (creating it on first run), applies command-line
//! overrides, initializes logging, and runs the event loop on a
//! current-thread tokio runtime until Ctrl+C.
//!
//! Run with: `cargo run -p gomoku-server -- --port 6666`

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use gomoku_config::{CliArgs, Config, default_config_dir};
use gomoku_net::{GameServer, ServerConfig, SocketConfig, resolve_bind_address};
use tracing::info;

/// Translate the persisted configuration into what the server needs.
fn server_config(config: &Config) -> Result<ServerConfig, String> {
    let bind_addr = resolve_bind_address(&config.network.bind_address, config.network.port)
        .map_err(|e| format!("bad bind address {}: {e}", config.listen_address()))?;
    let max_sessions = u16::try_from(config.network.max_sessions)
        .map_err(|_| format!("max_sessions {} does not fit the id space", config.network.max_sessions))?;

    Ok(ServerConfig {
        bind_addr,
        max_sessions,
        event_queue_depth: config.network.event_queue_depth,
        socket: SocketConfig {
            tcp_nodelay: config.tcp.nodelay,
            keepalive_enabled: config.tcp.keepalive,
            keepalive_idle: Duration::from_secs(config.tcp.keepalive_idle_secs),
            keepalive_interval: Duration::from_secs(config.tcp.keepalive_interval_secs),
            ..SocketConfig::default()
        },
        hex_dump_frames: config.debug.hex_dump_frames,
    })
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().unwrap_or_else(default_config_dir);
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        return ExitCode::FAILURE;
    }

    gomoku_log::init_logging(Some(&config));
    info!("Config directory: {}", config_dir.display());

    let server_config = match server_config(&config) {
        Ok(server_config) => server_config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        "Up to {} sessions, socket options {:?}",
        server_config.max_sessions, server_config.socket
    );
    let server = Arc::new(GameServer::new(server_config));

    let result = runtime.block_on(async {
        let on_signal = Arc::clone(&server);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received");
                on_signal.shutdown();
            }
        });
        server.run().await
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_map_to_server_config() {
        let server = server_config(&Config::default()).unwrap();
        assert_eq!(server.bind_addr.port(), 6666);
        assert!(server.bind_addr.ip().is_unspecified());
        assert_eq!(server.max_sessions, 1024);
        assert!(server.socket.tcp_nodelay);
        assert_eq!(server.socket.keepalive_idle, Duration::from_secs(60));
        assert!(!server.hex_dump_frames);
    }

    #[test]
    fn test_cli_overrides_reach_server_config() {
        let mut config = Config::default();
        let args = CliArgs::parse_from([
            "gomoku-server",
            "--port",
            "7000",
            "--bind",
            "127.0.0.1",
            "--max-sessions",
            "4",
            "--hex-dump",
        ]);
        config.apply_cli_overrides(&args);

        let server = server_config(&config).unwrap();
        assert_eq!(
            server.bind_addr,
            "127.0.0.1:7000".parse::<std::net::SocketAddr>().unwrap()
        );
        assert_eq!(server.max_sessions, 4);
        assert!(server.hex_dump_frames);
    }

    #[test]
    fn test_unresolvable_bind_address_rejected() {
        let mut config = Config::default();
        config.network.bind_address = "not an address at all".to_string();
        assert!(server_config(&config).is_err());
    }
}
