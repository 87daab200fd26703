//! Test doubles shared by the unit tests in this crate.

use crate::ConnectionId;
use crate::framing::Frame;
use crate::routing::Outbox;

/// Outbox that records everything instead of writing to sockets.
#[derive(Debug, Default)]
pub struct RecordingOutbox {
    pub sent: Vec<(ConnectionId, Frame)>,
    pub closed: Vec<ConnectionId>,
}

impl RecordingOutbox {
    /// Frames sent to one connection, in order.
    pub fn frames_to(&self, connection_id: ConnectionId) -> Vec<Frame> {
        self.sent
            .iter()
            .filter(|(to, _)| *to == connection_id)
            .map(|(_, frame)| *frame)
            .collect()
    }

    pub fn clear(&mut self) {
        self.sent.clear();
        self.closed.clear();
    }
}

impl Outbox for RecordingOutbox {
    fn send(&mut self, to: ConnectionId, frame: Frame) -> bool {
        if self.closed.contains(&to) {
            return false;
        }
        self.sent.push((to, frame));
        true
    }

    fn close(&mut self, connection_id: ConnectionId) {
        self.closed.push(connection_id);
    }
}
