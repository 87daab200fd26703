//! Networking for the gomoku match server: the 5-byte wire protocol, message
//! dispatch, sessions, matchmaking, and the event loop that ties them
//! together.

pub mod framing;
pub mod handlers;
pub mod matches;
pub mod matchmaking;
pub mod messages;
pub mod platform;
pub mod routing;
pub mod session;
pub mod state;
pub mod tcp_client;
pub mod tcp_server;

#[cfg(test)]
mod testing;

pub use framing::{FRAME_LEN, Frame, FrameError, hex_dump, read_frame, write_frame};
pub use handlers::default_router;
pub use matches::{MatchError, MatchId, MatchTable, Release};
pub use matchmaking::{MatchQueue, Pairing, QueueError};
pub use messages::{ClientId, Message, MessageError, MessageTag, Outcome};
pub use platform::{SocketConfig, configure_stream, create_listener, resolve_bind_address};
pub use routing::{Dispatch, HandlerContext, MessageHandler, MessageRouter, Outbox};
pub use session::{RegistryError, Session, SessionRegistry, SessionState};
pub use state::{GameState, HandlerError};
pub use tcp_client::{ClientError, ConnectionState, GameClient};
pub use tcp_server::{
    ConnectionEvent, ConnectionId, ConnectionTable, DEFAULT_PORT, GameServer, IdGenerator,
    ServerConfig, ServerError,
};
