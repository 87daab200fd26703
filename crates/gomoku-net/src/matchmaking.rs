//! FIFO queue of sessions waiting for an opponent.

use std::collections::VecDeque;

use crate::ConnectionId;

/// Errors raised by the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("connection {0} is already waiting for a match")]
    AlreadyQueued(ConnectionId),
}

/// Two sessions taken from the front of the queue. `first` waited longer and
/// moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pairing {
    pub first: ConnectionId,
    pub second: ConnectionId,
}

/// Ordered waiting list. A connection appears at most once.
#[derive(Debug, Default)]
pub struct MatchQueue {
    waiting: VecDeque<ConnectionId>,
}

impl MatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the back of the queue.
    pub fn enqueue(&mut self, connection_id: ConnectionId) -> Result<(), QueueError> {
        if self.contains(connection_id) {
            return Err(QueueError::AlreadyQueued(connection_id));
        }
        self.waiting.push_back(connection_id);
        Ok(())
    }

    /// Put a connection back at the head, ahead of everyone else.
    pub fn requeue_front(&mut self, connection_id: ConnectionId) {
        if !self.contains(connection_id) {
            self.waiting.push_front(connection_id);
        }
    }

    /// Remove a connection wherever it sits. Returns whether it was queued.
    pub fn remove(&mut self, connection_id: ConnectionId) -> bool {
        match self.waiting.iter().position(|c| *c == connection_id) {
            Some(index) => {
                self.waiting.remove(index);
                true
            }
            None => false,
        }
    }

    /// Take the two longest-waiting connections, if there are two.
    pub fn pop_pair(&mut self) -> Option<Pairing> {
        if self.waiting.len() < 2 {
            return None;
        }
        let first = self.waiting.pop_front()?;
        let second = self.waiting.pop_front()?;
        Some(Pairing { first, second })
    }

    /// Take every complete pair, oldest first. At most one connection is
    /// left behind.
    pub fn drain_pairs(&mut self) -> Vec<Pairing> {
        std::iter::from_fn(|| self.pop_pair()).collect()
    }

    pub fn contains(&self, connection_id: ConnectionId) -> bool {
        self.waiting.contains(&connection_id)
    }

    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }

    /// Queued connections, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.waiting.iter().copied()
    }
}
