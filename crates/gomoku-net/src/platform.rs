//! Listening socket factory and per-connection socket options.
//!
//! The listener is built with socket2 so `SO_REUSEADDR`, dual-stack IPv6
//! and the backlog are set before binding.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use socket2::{Domain, Protocol, SockRef, Socket, TcpKeepalive, Type};
use tokio::net::{TcpListener, TcpStream};

/// Socket options for the listener and every accepted connection.
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// Disable Nagle's algorithm. Default: true.
    pub tcp_nodelay: bool,
    /// Enable TCP keepalive. Default: true.
    pub keepalive_enabled: bool,
    /// Idle time before the first keepalive probe. Default: 60s.
    pub keepalive_idle: Duration,
    /// Interval between keepalive probes. Default: 10s.
    pub keepalive_interval: Duration,
    /// Enable `SO_REUSEADDR` on the listener. Default: true except on Windows.
    pub reuse_addr: bool,
    /// Pending-connection backlog passed to `listen`. Default: 128.
    pub backlog: i32,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            tcp_nodelay: true,
            keepalive_enabled: true,
            keepalive_idle: Duration::from_secs(60),
            keepalive_interval: Duration::from_secs(10),
            reuse_addr: !cfg!(target_os = "windows"),
            backlog: 128,
        }
    }
}

/// Apply per-connection options to an accepted stream.
pub fn configure_stream(stream: &TcpStream, config: &SocketConfig) -> io::Result<()> {
    stream.set_nodelay(config.tcp_nodelay)?;

    if config.keepalive_enabled {
        let keepalive = TcpKeepalive::new()
            .with_time(config.keepalive_idle)
            .with_interval(config.keepalive_interval);
        SockRef::from(stream).set_tcp_keepalive(&keepalive)?;
    }

    Ok(())
}

/// Bind a non-blocking listener on `addr`.
///
/// IPv6 addresses are bound dual-stack so `::` also accepts IPv4 clients.
pub fn create_listener(addr: SocketAddr, config: &SocketConfig) -> io::Result<TcpListener> {
    let domain = if addr.is_ipv6() {
        Domain::IPV6
    } else {
        Domain::IPV4
    };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    if config.reuse_addr {
        socket.set_reuse_address(true)?;
    }
    if addr.is_ipv6() {
        socket.set_only_v6(false)?;
    }

    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(config.backlog)?;

    TcpListener::from_std(socket.into())
}

/// Resolve `host` and `port` to the first matching socket address.
///
/// `host` may be a literal (`0.0.0.0`, `::`) or a name (`localhost`).
pub fn resolve_bind_address(host: &str, port: u16) -> io::Result<SocketAddr> {
    (host, port).to_socket_addrs()?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("{host} did not resolve to any address"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_listener_accepts_configured_streams() {
        let config = SocketConfig::default();
        let listener = create_listener("127.0.0.1:0".parse().unwrap(), &config).unwrap();
        let addr = listener.local_addr().unwrap();

        let _client = TcpStream::connect(addr).await.unwrap();
        let (server_side, _) = listener.accept().await.unwrap();
        configure_stream(&server_side, &config).unwrap();

        assert!(server_side.nodelay().unwrap());
        assert!(SockRef::from(&server_side).keepalive().unwrap());
    }

    #[tokio::test]
    async fn test_nodelay_can_be_disabled() {
        let config = SocketConfig {
            tcp_nodelay: false,
            keepalive_enabled: false,
            ..Default::default()
        };
        let listener = create_listener("127.0.0.1:0".parse().unwrap(), &config).unwrap();
        let addr = listener.local_addr().unwrap();

        let client = TcpStream::connect(addr).await.unwrap();
        configure_stream(&client, &config).unwrap();

        assert!(!client.nodelay().unwrap());
        assert!(!SockRef::from(&client).keepalive().unwrap());
    }

    #[tokio::test]
    async fn test_ipv6_listener_when_available() {
        let config = SocketConfig::default();
        match create_listener("[::1]:0".parse().unwrap(), &config) {
            Ok(listener) => {
                let addr = listener.local_addr().unwrap();
                assert!(addr.is_ipv6());
                assert!(TcpStream::connect(addr).await.is_ok());
            }
            Err(_) => eprintln!("IPv6 not available, skipping test"),
        }
    }

    #[tokio::test]
    async fn test_busy_port_is_an_error() {
        let config = SocketConfig {
            reuse_addr: false,
            ..Default::default()
        };
        let first = create_listener("127.0.0.1:0".parse().unwrap(), &config).unwrap();
        let taken = first.local_addr().unwrap();
        assert!(create_listener(taken, &config).is_err());
    }

    #[test]
    fn test_resolve_literal_addresses() {
        let v4 = resolve_bind_address("0.0.0.0", 6666).unwrap();
        assert!(v4.is_ipv4());
        assert_eq!(v4.port(), 6666);

        let v6 = resolve_bind_address("::", 7000).unwrap();
        assert!(v6.is_ipv6());
        assert_eq!(v6.port(), 7000);
    }
}
