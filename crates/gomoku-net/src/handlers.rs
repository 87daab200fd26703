//! Handlers for the client-to-server message types.

use crate::framing::Frame;
use crate::messages::{Message, MessageTag};
use crate::routing::{HandlerContext, MessageRouter};
use crate::state::HandlerError;

/// `0x01`: report or request a client id.
pub fn handle_report_id(ctx: &mut HandlerContext<'_>, frame: &Frame) -> Result<(), HandlerError> {
    match Message::decode(frame)? {
        Message::ReportId { requested } => {
            ctx.state
                .report_id(ctx.connection_id, requested, &mut *ctx.outbox)
        }
        other => Err(HandlerError::Unexpected(other.tag())),
    }
}

/// `0x02`: place a stone and relay it to the opponent.
pub fn handle_place_stone(ctx: &mut HandlerContext<'_>, frame: &Frame) -> Result<(), HandlerError> {
    match Message::decode(frame)? {
        Message::PlaceStone { pos, .. } => ctx
            .state
            .place_stone(ctx.connection_id, frame, pos, &mut *ctx.outbox)
            .map(|_| ()),
        other => Err(HandlerError::Unexpected(other.tag())),
    }
}

/// A router with every client-to-server message type registered.
///
/// Server-to-client types are left unregistered, so a client sending one is
/// logged and ignored.
pub fn default_router() -> MessageRouter {
    let mut router = MessageRouter::new();
    router.register(MessageTag::ReportId, handle_report_id);
    router.register(MessageTag::PlaceStone, handle_place_stone);
    router
}
