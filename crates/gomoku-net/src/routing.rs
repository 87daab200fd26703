//! Message routing: dispatch incoming frames to type-specific handlers.
//!
//! The [`MessageRouter`] maps [`MessageTag`] values to [`MessageHandler`]
//! implementations. The event loop hands every received frame to
//! [`MessageRouter::dispatch`] together with a [`HandlerContext`] that gives
//! the handler the server state and a way to write to peers.

use std::collections::HashMap;

use crate::ConnectionId;
use crate::framing::{Frame, hex_dump};
use crate::messages::MessageTag;
use crate::state::{GameState, HandlerError};

// ---------------------------------------------------------------------------
// Outbox
// ---------------------------------------------------------------------------

/// Write side of the multiplexer, as seen by handlers.
pub trait Outbox {
    /// Queue a frame for a connection. Returns `false` if the connection is
    /// unknown or already closing; the frame is dropped in that case.
    fn send(&mut self, to: ConnectionId, frame: Frame) -> bool;

    /// Stop watching a connection and close it once queued frames are
    /// flushed.
    fn close(&mut self, connection_id: ConnectionId);
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// Context provided to every message handler.
pub struct HandlerContext<'a> {
    /// The connection that sent this frame.
    pub connection_id: ConnectionId,
    /// All sessions, the queue, and the boards.
    pub state: &'a mut GameState,
    /// Where replies and relayed frames go.
    pub outbox: &'a mut dyn Outbox,
}

/// Trait for message handlers. Implemented for plain functions and closures.
pub trait MessageHandler: Send + Sync {
    /// Process a single incoming frame.
    fn handle(&self, ctx: &mut HandlerContext<'_>, frame: &Frame) -> Result<(), HandlerError>;
}

/// Blanket implementation for closures.
impl<F> MessageHandler for F
where
    F: Fn(&mut HandlerContext<'_>, &Frame) -> Result<(), HandlerError> + Send + Sync,
{
    fn handle(&self, ctx: &mut HandlerContext<'_>, frame: &Frame) -> Result<(), HandlerError> {
        self(ctx, frame)
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// What the router did with a frame.
#[derive(Debug)]
pub enum Dispatch {
    /// A handler ran and accepted the frame.
    Handled(MessageTag),
    /// A handler ran and refused the frame.
    Rejected(MessageTag, HandlerError),
    /// The type byte is known but nothing handles it from clients.
    NoHandler(MessageTag),
    /// The type byte is not part of the protocol.
    UnknownType(u8),
}

/// Routes incoming frames to registered handlers by [`MessageTag`].
pub struct MessageRouter {
    handlers: HashMap<MessageTag, Box<dyn MessageHandler>>,
}

impl MessageRouter {
    /// Create an empty router.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for a specific message tag, replacing any
    /// previous one.
    pub fn register<H: MessageHandler + 'static>(&mut self, tag: MessageTag, handler: H) {
        self.handlers.insert(tag, Box::new(handler));
    }

    /// Route a frame to its handler.
    ///
    /// Unknown types and unhandled tags are logged and dropped; the sender's
    /// connection is left open either way.
    pub fn dispatch(&self, ctx: &mut HandlerContext<'_>, frame: &Frame) -> Dispatch {
        let Some(tag) = MessageTag::of(frame) else {
            tracing::warn!(
                "Connection {} sent unknown message type 0x{:02x} [{}], ignoring",
                ctx.connection_id,
                frame[0],
                hex_dump(frame)
            );
            return Dispatch::UnknownType(frame[0]);
        };

        let Some(handler) = self.handlers.get(&tag) else {
            tracing::warn!(
                "No handler registered for {:?} from connection {}, dropping message",
                tag,
                ctx.connection_id
            );
            return Dispatch::NoHandler(tag);
        };

        match handler.handle(ctx, frame) {
            Ok(()) => Dispatch::Handled(tag),
            Err(e) => {
                tracing::warn!("Rejected {:?} from connection {}: {e}", tag, ctx.connection_id);
                Dispatch::Rejected(tag, e)
            }
        }
    }

    /// Return an iterator over registered tags (useful for startup logging).
    pub fn registered_tags(&self) -> impl Iterator<Item = &MessageTag> {
        self.handlers.keys()
    }
}

impl Default for MessageRouter {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
