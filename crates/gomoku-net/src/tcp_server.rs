//! TCP match server: accept loop, connection table, and the event loop that
//! owns all game state.
//!
//! Each accepted socket is split in two. A reader task decodes frames and
//! forwards them to the event loop over a bounded channel; a writer task
//! drains an unbounded per-connection queue onto the socket. Neither task
//! touches [`GameState`]; only the loop in [`GameServer::run_with_listener`]
//! does, one event at a time.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashMap;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::AbortHandle;

use crate::framing::{Frame, FrameError, hex_dump, read_frame, write_frame};
use crate::handlers::default_router;
use crate::platform::{SocketConfig, configure_stream, create_listener};
use crate::routing::{HandlerContext, MessageRouter, Outbox};
use crate::state::GameState;

/// Port the server listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 6666;

/// Unique identifier for a TCP connection within a server run. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generator for monotonically increasing [`ConnectionId`]s.
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    /// Create a new generator starting at 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Return the next unique [`ConnectionId`].
    pub fn next_id(&self) -> ConnectionId {
        ConnectionId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Something that happened on a connection, as seen by the event loop.
#[derive(Debug)]
pub enum ConnectionEvent {
    /// A complete frame arrived.
    Frame { id: ConnectionId, frame: Frame },
    /// The read side ended. No further events follow for `id`.
    Closed { id: ConnectionId, reason: FrameError },
}

struct ConnectionHandle {
    outgoing: mpsc::UnboundedSender<Frame>,
    reader: AbortHandle,
}

/// Live connections and the channels that feed their sockets.
pub struct ConnectionTable {
    handles: FxHashMap<ConnectionId, ConnectionHandle>,
    events: mpsc::Sender<ConnectionEvent>,
}

impl ConnectionTable {
    /// A table whose reader tasks report into `events`.
    pub fn new(events: mpsc::Sender<ConnectionEvent>) -> Self {
        Self {
            handles: FxHashMap::default(),
            events,
        }
    }

    /// Start watching a connection: spawn its reader and writer tasks.
    pub fn register(&mut self, id: ConnectionId, stream: TcpStream) {
        let (mut reader, mut writer) = stream.into_split();
        let (outgoing, mut queued) = mpsc::unbounded_channel::<Frame>();

        tokio::spawn(async move {
            while let Some(frame) = queued.recv().await {
                if let Err(e) = write_frame(&mut writer, &frame).await {
                    tracing::debug!("Connection {id} write failed: {e}");
                    break;
                }
            }
            let _ = writer.shutdown().await;
        });

        let events = self.events.clone();
        let reader_task = tokio::spawn(async move {
            loop {
                match read_frame(&mut reader).await {
                    Ok(frame) => {
                        if events
                            .send(ConnectionEvent::Frame { id, frame })
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(reason) => {
                        let _ = events.send(ConnectionEvent::Closed { id, reason }).await;
                        break;
                    }
                }
            }
        });

        self.handles.insert(
            id,
            ConnectionHandle {
                outgoing,
                reader: reader_task.abort_handle(),
            },
        );
    }

    /// Stop watching a connection. Frames already queued are still written
    /// before the socket closes. Returns whether the connection was known.
    pub fn deregister(&mut self, id: ConnectionId) -> bool {
        match self.handles.remove(&id) {
            Some(handle) => {
                handle.reader.abort();
                true
            }
            None => false,
        }
    }

    /// Deregister every connection.
    pub fn close_all(&mut self) {
        for (_, handle) in self.handles.drain() {
            handle.reader.abort();
        }
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.handles.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl Outbox for ConnectionTable {
    fn send(&mut self, to: ConnectionId, frame: Frame) -> bool {
        self.handles
            .get(&to)
            .is_some_and(|handle| handle.outgoing.send(frame).is_ok())
    }

    fn close(&mut self, connection_id: ConnectionId) {
        self.deregister(connection_id);
    }
}

/// Errors that end the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    /// Every sender of the event channel is gone, so nothing can wake the
    /// loop again.
    #[error("connection event channel closed")]
    EventChannelClosed,
}

/// Configuration for [`GameServer`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to. Default: `0.0.0.0:6666`.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent sessions; also the size of the client id space.
    /// Default: 1024.
    pub max_sessions: u16,
    /// Capacity of the reader → event loop channel. Default: 1024.
    pub event_queue_depth: usize,
    /// Options for the listener and accepted sockets.
    pub socket: SocketConfig,
    /// Trace-log every received frame as hex.
    pub hex_dump_frames: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            max_sessions: 1024,
            event_queue_depth: 1024,
            socket: SocketConfig::default(),
            hex_dump_frames: false,
        }
    }
}

/// State owned by a running event loop.
struct EventLoop {
    state: GameState,
    router: MessageRouter,
    connections: ConnectionTable,
    ids: IdGenerator,
    socket: SocketConfig,
    hex_dump: bool,
}

impl EventLoop {
    fn on_accept(&mut self, stream: TcpStream, peer_addr: SocketAddr) {
        let id = self.ids.next_id();

        if let Err(e) = configure_stream(&stream, &self.socket) {
            tracing::warn!("Failed to set socket options for {peer_addr}: {e}");
        }

        if let Err(e) = self.state.on_connect(id, peer_addr) {
            tracing::warn!("Rejecting {peer_addr}: {e}");
            return;
        }

        self.connections.register(id, stream);
        tracing::info!("Accepted connection {id} from {peer_addr}");
    }

    fn on_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Frame { id, frame } => {
                if !self.connections.contains(id) {
                    tracing::trace!("Dropping frame from closed connection {id}");
                    return;
                }
                if self.hex_dump {
                    tracing::trace!("Connection {id} <- [{}]", hex_dump(&frame));
                }

                let mut ctx = HandlerContext {
                    connection_id: id,
                    state: &mut self.state,
                    outbox: &mut self.connections,
                };
                let outcome = self.router.dispatch(&mut ctx, &frame);
                tracing::debug!("Connection {id}: {outcome:?}");
            }
            ConnectionEvent::Closed { id, reason } => {
                match reason {
                    FrameError::ConnectionClosed => {
                        tracing::info!("Connection {id} closed by peer");
                    }
                    other => tracing::warn!("Connection {id} dropped: {other}"),
                }
                self.state.disconnect(id, &mut self.connections);
            }
        }
    }
}

/// TCP match server.
pub struct GameServer {
    config: ServerConfig,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl GameServer {
    /// Create a new server with the given configuration.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            config,
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind to the configured address and run until shut down.
    pub async fn run(&self) -> Result<(), ServerError> {
        let addr = self.config.bind_addr;
        let listener = create_listener(addr, &self.config.socket)
            .map_err(|source| ServerError::Bind { addr, source })?;
        tracing::info!("Server listening on {addr}");
        self.run_with_listener(listener).await
    }

    /// Run the event loop on a pre-bound listener (useful for tests).
    ///
    /// Returns `Ok(())` after [`shutdown`](Self::shutdown), with every
    /// connection closed.
    pub async fn run_with_listener(&self, listener: TcpListener) -> Result<(), ServerError> {
        let (events_tx, mut events_rx) = mpsc::channel(self.config.event_queue_depth.max(1));
        let max_sessions = self.config.max_sessions.max(1);

        let mut event_loop = EventLoop {
            state: GameState::new(usize::from(max_sessions), max_sessions),
            router: default_router(),
            connections: ConnectionTable::new(events_tx),
            ids: IdGenerator::new(),
            socket: self.config.socket.clone(),
            hex_dump: self.config.hex_dump_frames,
        };
        tracing::debug!(
            "Handling message types {:?}",
            event_loop.router.registered_tags().collect::<Vec<_>>()
        );

        let mut shutdown_rx = self.shutdown_rx.clone();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer_addr)) => event_loop.on_accept(stream, peer_addr),
                    Err(e) => tracing::warn!("Accept failed: {e}"),
                },
                event = events_rx.recv() => match event {
                    Some(event) => event_loop.on_event(event),
                    None => return Err(ServerError::EventChannelClosed),
                },
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        tracing::info!("Server shutting down");
                        break;
                    }
                }
            }
        }

        tracing::info!(
            "Closing {} connection(s), {} match(es) still open",
            event_loop.connections.len(),
            event_loop.state.matches().len()
        );
        event_loop.connections.close_all();
        Ok(())
    }

    /// Signal the server to shut down gracefully.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}
