//! Headless client for the match server.
//!
//! Speaks the same 5-byte protocol as a player's client, without any board
//! rendering. Used by the end-to-end tests and handy for poking a running
//! server.

use std::net::SocketAddr;
use std::time::Duration;

use gomoku_judge::Position;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::framing::{Frame, FrameError, read_frame, write_frame};
use crate::messages::{ClientId, Message, MessageError};

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// TCP connection established.
    Connected,
    /// The server closed the connection or a read failed.
    Disconnected,
}

/// Errors surfaced by [`GameClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("connect failed: {0}")]
    Connect(#[from] std::io::Error),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Message(#[from] MessageError),
}

/// A connected player.
pub struct GameClient {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    client_id: Option<ClientId>,
    state: ConnectionState,
}

impl GameClient {
    /// Connect to the server at `addr` with `TCP_NODELAY` set.
    pub async fn connect(addr: SocketAddr) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader,
            writer,
            client_id: None,
            state: ConnectionState::Connected,
        })
    }

    /// The id the server assigned, once an `AssignId` has been received.
    pub fn client_id(&self) -> Option<ClientId> {
        self.client_id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub async fn send(&mut self, message: &Message) -> Result<(), ClientError> {
        self.send_raw(&message.encode()).await
    }

    /// Send bytes as-is, including frames the protocol does not define.
    pub async fn send_raw(&mut self, frame: &Frame) -> Result<(), ClientError> {
        write_frame(&mut self.writer, frame).await?;
        Ok(())
    }

    /// Report an id, or `ClientId(0)` to ask for a new one.
    pub async fn report_id(&mut self, requested: ClientId) -> Result<(), ClientError> {
        self.send(&Message::ReportId { requested }).await
    }

    /// Play at `(x, y)`, stamped with this client's id (0 if unassigned).
    pub async fn place_stone(&mut self, x: u8, y: u8) -> Result<(), ClientError> {
        let sender = self.client_id.unwrap_or(ClientId(0));
        self.send(&Message::PlaceStone {
            sender,
            pos: Position::new(x, y),
        })
        .await
    }

    /// Wait for the next frame without decoding it.
    pub async fn recv_frame(&mut self) -> Result<Frame, ClientError> {
        match read_frame(&mut self.reader).await {
            Ok(frame) => Ok(frame),
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                Err(e.into())
            }
        }
    }

    /// Wait for the next message. An `AssignId` also updates
    /// [`client_id`](Self::client_id).
    pub async fn recv(&mut self) -> Result<Message, ClientError> {
        let frame = self.recv_frame().await?;
        let message = Message::decode(&frame)?;
        if let Message::AssignId { client_id } = message {
            self.client_id = Some(client_id);
        }
        Ok(message)
    }

    /// Like [`recv`](Self::recv), but gives up after `timeout` and returns
    /// `Ok(None)`. A frame cut off by the timeout is lost.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Message>, ClientError> {
        match tokio::time::timeout(timeout, self.recv()).await {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }
}
