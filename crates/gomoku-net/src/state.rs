//! Server-side game state and the operations handlers perform on it.
//!
//! [`GameState`] bundles the session registry, the matchmaking queue, and
//! the match table. It is owned by the event loop and mutated only from
//! there, one event at a time. Every operation that touches more than one of
//! the three structures lives here so they cannot drift apart.

use std::net::SocketAddr;

use gomoku_judge::{MoveError, Placement, Position, Stone};

use crate::ConnectionId;
use crate::framing::Frame;
use crate::matches::{MatchError, MatchId, MatchTable, Release};
use crate::matchmaking::{MatchQueue, Pairing, QueueError};
use crate::messages::{ClientId, Message, MessageError, MessageTag, Outcome};
use crate::routing::Outbox;
use crate::session::{RegistryError, Session, SessionRegistry, SessionState};

/// Errors a handler can return. None of them are fatal to the server; the
/// dispatcher logs them and the sender's connection stays open.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    #[error("no session for connection {0}")]
    UnknownSession(ConnectionId),
    #[error("{0:?} is not accepted from clients")]
    Unexpected(MessageTag),
    #[error(transparent)]
    Message(#[from] MessageError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error(transparent)]
    Move(#[from] MoveError),
    #[error("connection {0} has no opponent")]
    NotPaired(ConnectionId),
    #[error("opponent {0} is no longer connected")]
    OpponentGone(ClientId),
    #[error("session already holds client id {0}")]
    AlreadyIdentified(ClientId),
    #[error("session is already in a match")]
    AlreadyPaired,
}

/// Everything the event loop knows about clients and matches.
pub struct GameState {
    registry: SessionRegistry,
    queue: MatchQueue,
    matches: MatchTable,
}

impl GameState {
    /// Room for `max_sessions` concurrent sessions, handing out client ids
    /// from `1..=id_space`.
    pub fn new(max_sessions: usize, id_space: u16) -> Self {
        Self {
            registry: SessionRegistry::new(max_sessions, id_space),
            queue: MatchQueue::new(),
            matches: MatchTable::new(),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn queue(&self) -> &MatchQueue {
        &self.queue
    }

    pub fn matches(&self) -> &MatchTable {
        &self.matches
    }

    /// Register a freshly accepted connection.
    pub fn on_connect(
        &mut self,
        connection_id: ConnectionId,
        peer_addr: SocketAddr,
    ) -> Result<(), RegistryError> {
        self.registry.insert(Session::new(connection_id, peer_addr))
    }

    /// Handle a client's id report.
    ///
    /// `ClientId(0)` asks for a fresh id: the session is given one, told
    /// about it, and queued for a match. Any other value is adopted as the
    /// session's id without queueing.
    pub fn report_id(
        &mut self,
        connection_id: ConnectionId,
        requested: ClientId,
        outbox: &mut dyn Outbox,
    ) -> Result<(), HandlerError> {
        let session = self
            .registry
            .get(connection_id)
            .ok_or(HandlerError::UnknownSession(connection_id))?;

        if requested.0 != 0 {
            if session.is_paired() {
                return Err(HandlerError::AlreadyPaired);
            }
            self.registry.adopt_id(connection_id, requested)?;
            if let Some(session) = self.registry.get_mut(connection_id)
                && session.state == SessionState::Connected
            {
                session.state = SessionState::Identified;
            }
            tracing::info!("Connection {connection_id} identified as {requested}");
            return Ok(());
        }

        if let Some(current) = session.client_id {
            return Err(HandlerError::AlreadyIdentified(current));
        }

        let client_id = self.registry.assign_new_id(connection_id)?;
        outbox.send(connection_id, Message::AssignId { client_id }.encode());
        self.queue.enqueue(connection_id)?;
        if let Some(session) = self.registry.get_mut(connection_id) {
            session.state = SessionState::Waiting;
        }
        tracing::info!(
            "Assigned {client_id} to connection {connection_id}, {} waiting",
            self.queue.len()
        );

        self.run_matchmaking(outbox);
        Ok(())
    }

    /// Pair waiting sessions two at a time, oldest first, until fewer than
    /// two remain. Returns the number of matches started.
    pub fn run_matchmaking(&mut self, outbox: &mut dyn Outbox) -> usize {
        let mut started = 0;

        while let Some(Pairing { first, second }) = self.queue.pop_pair() {
            let first_id = self.registry.get(first).and_then(|s| s.client_id);
            let second_id = self.registry.get(second).and_then(|s| s.client_id);
            let (Some(first_id), Some(second_id)) = (first_id, second_id) else {
                // A queued connection with no identified session. Put the
                // other one back where it was.
                tracing::warn!("Dropping stale queue entry while pairing {first} and {second}");
                for survivor in [second, first] {
                    if self.registry.get(survivor).is_some_and(|s| s.client_id.is_some()) {
                        self.queue.requeue_front(survivor);
                    }
                }
                continue;
            };

            let match_id = self.matches.create(first, second);
            self.seat(first, second_id, Stone::Black, match_id);
            self.seat(second, first_id, Stone::White, match_id);

            outbox.send(
                first,
                Message::GameStart {
                    own: Stone::Black,
                    opponent: Stone::White,
                }
                .encode(),
            );
            outbox.send(
                second,
                Message::GameStart {
                    own: Stone::White,
                    opponent: Stone::Black,
                }
                .encode(),
            );

            tracing::info!("{match_id}: {first_id} (black) vs {second_id} (white)");
            started += 1;
        }

        started
    }

    fn seat(
        &mut self,
        connection_id: ConnectionId,
        opponent: ClientId,
        stone: Stone,
        match_id: MatchId,
    ) {
        if let Some(session) = self.registry.get_mut(connection_id) {
            session.state = SessionState::Paired;
            session.opponent = Some(opponent);
            session.stone = Some(stone);
            session.match_id = Some(match_id);
        }
    }

    /// Apply a move from `connection_id` and relay `frame` unchanged to the
    /// opponent. A winning move also sends the result to both players.
    pub fn place_stone(
        &mut self,
        connection_id: ConnectionId,
        frame: &Frame,
        pos: Position,
        outbox: &mut dyn Outbox,
    ) -> Result<Placement, HandlerError> {
        let session = self
            .registry
            .get(connection_id)
            .ok_or(HandlerError::UnknownSession(connection_id))?;
        let (Some(opponent), Some(stone), Some(match_id)) =
            (session.opponent, session.stone, session.match_id)
        else {
            return Err(HandlerError::NotPaired(connection_id));
        };

        let opponent_conn = self
            .live_opponent(opponent, match_id)
            .ok_or(HandlerError::OpponentGone(opponent))?;

        let placement = self
            .matches
            .judge_mut(match_id)
            .ok_or(MatchError::UnknownMatch(match_id))?
            .place(pos, stone)?;

        tracing::debug!("{match_id}: {stone:?} at {pos}");
        outbox.send(opponent_conn, *frame);

        if placement == Placement::Win {
            outbox.send(
                connection_id,
                Message::GameOver {
                    outcome: Outcome::Winner,
                }
                .encode(),
            );
            outbox.send(
                opponent_conn,
                Message::GameOver {
                    outcome: Outcome::Loser,
                }
                .encode(),
            );
            tracing::info!("{match_id}: {stone:?} wins with {pos}");
        }

        Ok(placement)
    }

    /// The connection currently holding `opponent`, provided it is still
    /// seated at `match_id`. A reused id on some other connection does not
    /// count.
    fn live_opponent(&self, opponent: ClientId, match_id: MatchId) -> Option<ConnectionId> {
        self.registry
            .connection_for(opponent)
            .filter(|&conn| {
                self.registry
                    .get(conn)
                    .is_some_and(|s| s.match_id == Some(match_id))
            })
    }

    /// Tear down everything that refers to `connection_id`.
    ///
    /// In order: the live opponent is told, the queue entry goes, the
    /// connection is closed, the registry forgets it, and its hold on the
    /// board is released. Returns `false` for an unknown connection, in which
    /// case nothing happens.
    pub fn disconnect(&mut self, connection_id: ConnectionId, outbox: &mut dyn Outbox) -> bool {
        let Some(session) = self.registry.get(connection_id) else {
            return false;
        };

        let opponent_conn = match (session.opponent, session.match_id) {
            (Some(opponent), Some(match_id)) => self
                .live_opponent(opponent, match_id)
                .filter(|&conn| conn != connection_id),
            _ => None,
        };
        if let Some(peer) = opponent_conn {
            outbox.send(peer, Message::OpponentDisconnected.encode());
        }

        self.queue.remove(connection_id);
        outbox.close(connection_id);

        let Some(session) = self.registry.remove(connection_id) else {
            return false;
        };

        if let Some(match_id) = session.match_id {
            match self.matches.release(match_id, connection_id) {
                Ok(Release::Destroyed) => {}
                Ok(Release::Retained { remaining }) => {
                    tracing::debug!("{match_id} still held by {remaining} session(s)");
                }
                Err(e) => tracing::warn!("Releasing {match_id} for {connection_id}: {e}"),
            }
        }

        match session.client_id {
            Some(client_id) => tracing::info!(
                "Session {client_id} on connection {connection_id} ({}) cleaned up",
                session.peer_addr
            ),
            None => tracing::info!(
                "Connection {connection_id} ({}) cleaned up",
                session.peer_addr
            ),
        }
        true
    }
}
