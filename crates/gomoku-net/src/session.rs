//! Per-connection sessions and the registry that indexes them.
//!
//! Each accepted connection gets a [`Session`] keyed by its
//! [`ConnectionId`]. Once the client has an id, the registry also maps
//! [`ClientId`] → [`ConnectionId`] so a peer known only by id can be reached.
//! Both indexes are updated together; there is no way to remove a session
//! from one and not the other.

use std::net::SocketAddr;

use gomoku_judge::Stone;
use rustc_hash::FxHashMap;

use crate::ConnectionId;
use crate::matches::MatchId;
use crate::messages::ClientId;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepted, no id yet.
    Connected,
    /// Adopted a client-reported id; not queued for a match.
    Identified,
    /// Assigned a fresh id and waiting in the matchmaking queue.
    Waiting,
    /// Paired with an opponent and sharing a board.
    Paired,
}

/// Server-side state for one connected client.
#[derive(Debug, Clone)]
pub struct Session {
    /// The connection this session belongs to.
    pub connection_id: ConnectionId,
    /// Remote address, for logging.
    pub peer_addr: SocketAddr,
    /// Current lifecycle state.
    pub state: SessionState,
    /// Assigned or reported id; `None` until the first report.
    pub client_id: Option<ClientId>,
    /// The opponent's id once paired.
    pub opponent: Option<ClientId>,
    /// This session's color once paired.
    pub stone: Option<Stone>,
    /// The shared board once paired.
    pub match_id: Option<MatchId>,
}

impl Session {
    /// A freshly accepted session with no id.
    pub fn new(connection_id: ConnectionId, peer_addr: SocketAddr) -> Self {
        Self {
            connection_id,
            peer_addr,
            state: SessionState::Connected,
            client_id: None,
            opponent: None,
            stone: None,
            match_id: None,
        }
    }

    pub fn is_paired(&self) -> bool {
        self.state == SessionState::Paired
    }
}

/// Errors raised by the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The registry already holds its maximum number of sessions.
    #[error("session registry is full ({capacity} sessions)")]
    Full { capacity: usize },
    /// The connection is already registered.
    #[error("connection {0} is already registered")]
    Duplicate(ConnectionId),
    /// No session exists for the connection.
    #[error("no session registered for connection {0}")]
    UnknownConnection(ConnectionId),
    /// Every id in the id space belongs to a live session.
    #[error("all {id_space} client ids are in use")]
    IdSpaceExhausted { id_space: u16 },
    /// The id is bound to another live session.
    #[error("client id {id} is already held by connection {holder}")]
    IdInUse { id: ClientId, holder: ConnectionId },
    /// Zero is reserved for "unassigned".
    #[error("client id 0 is reserved")]
    ReservedId,
}

/// Hands out client ids sequentially from `1..=id_space`, wrapping back to 1.
#[derive(Debug, Clone)]
pub struct ClientIdAllocator {
    next: u16,
    id_space: u16,
}

impl ClientIdAllocator {
    /// Ids will be drawn from `1..=id_space`. An `id_space` of 0 is treated
    /// as 1.
    pub fn new(id_space: u16) -> Self {
        Self {
            next: 1,
            id_space: id_space.max(1),
        }
    }

    pub fn id_space(&self) -> u16 {
        self.id_space
    }

    /// The next id for which `in_use` is false, scanning at most one full
    /// cycle of the id space.
    pub fn allocate(&mut self, in_use: impl Fn(ClientId) -> bool) -> Option<ClientId> {
        for _ in 0..self.id_space {
            let candidate = ClientId(self.next);
            self.next = if self.next >= self.id_space {
                1
            } else {
                self.next + 1
            };
            if !in_use(candidate) {
                return Some(candidate);
            }
        }
        None
    }
}

/// Sessions indexed by connection, with a secondary client-id index.
pub struct SessionRegistry {
    sessions: FxHashMap<ConnectionId, Session>,
    by_client: FxHashMap<ClientId, ConnectionId>,
    ids: ClientIdAllocator,
    capacity: usize,
}

impl SessionRegistry {
    /// A registry holding at most `capacity` sessions, allocating ids from
    /// `1..=id_space`.
    pub fn new(capacity: usize, id_space: u16) -> Self {
        Self {
            sessions: FxHashMap::default(),
            by_client: FxHashMap::default(),
            ids: ClientIdAllocator::new(id_space),
            capacity,
        }
    }

    /// Register a new session. Fails when full or when the connection is
    /// already present.
    pub fn insert(&mut self, session: Session) -> Result<(), RegistryError> {
        if self.sessions.contains_key(&session.connection_id) {
            return Err(RegistryError::Duplicate(session.connection_id));
        }
        if self.sessions.len() >= self.capacity {
            return Err(RegistryError::Full {
                capacity: self.capacity,
            });
        }
        self.sessions.insert(session.connection_id, session);
        Ok(())
    }

    /// Remove a session from both indexes.
    pub fn remove(&mut self, connection_id: ConnectionId) -> Option<Session> {
        let session = self.sessions.remove(&connection_id)?;
        if let Some(client_id) = session.client_id {
            self.unindex(client_id, connection_id);
        }
        Some(session)
    }

    pub fn get(&self, connection_id: ConnectionId) -> Option<&Session> {
        self.sessions.get(&connection_id)
    }

    pub fn get_mut(&mut self, connection_id: ConnectionId) -> Option<&mut Session> {
        self.sessions.get_mut(&connection_id)
    }

    pub fn contains(&self, connection_id: ConnectionId) -> bool {
        self.sessions.contains_key(&connection_id)
    }

    /// The connection currently bound to `client_id`.
    pub fn connection_for(&self, client_id: ClientId) -> Option<ConnectionId> {
        self.by_client.get(&client_id).copied()
    }

    /// Give the session the next free id and index it.
    pub fn assign_new_id(&mut self, connection_id: ConnectionId) -> Result<ClientId, RegistryError> {
        if !self.sessions.contains_key(&connection_id) {
            return Err(RegistryError::UnknownConnection(connection_id));
        }
        let by_client = &self.by_client;
        let client_id = self
            .ids
            .allocate(|id| by_client.contains_key(&id))
            .ok_or(RegistryError::IdSpaceExhausted {
                id_space: self.ids.id_space(),
            })?;
        self.bind(connection_id, client_id);
        Ok(client_id)
    }

    /// Bind a client-reported id to the session, replacing any id it held
    /// before. Fails if another live session holds `client_id`.
    pub fn adopt_id(
        &mut self,
        connection_id: ConnectionId,
        client_id: ClientId,
    ) -> Result<(), RegistryError> {
        if client_id.0 == 0 {
            return Err(RegistryError::ReservedId);
        }
        if !self.sessions.contains_key(&connection_id) {
            return Err(RegistryError::UnknownConnection(connection_id));
        }
        match self.by_client.get(&client_id) {
            Some(&holder) if holder != connection_id => {
                Err(RegistryError::IdInUse {
                    id: client_id,
                    holder,
                })
            }
            _ => {
                self.bind(connection_id, client_id);
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate over all registered sessions in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    fn bind(&mut self, connection_id: ConnectionId, client_id: ClientId) {
        let Some(session) = self.sessions.get_mut(&connection_id) else {
            return;
        };
        let previous = session.client_id.replace(client_id);
        if let Some(previous) = previous.filter(|p| *p != client_id) {
            self.unindex(previous, connection_id);
        }
        self.by_client.insert(client_id, connection_id);
    }

    /// Drop the id index entry only if it still points at `connection_id`.
    fn unindex(&mut self, client_id: ClientId, connection_id: ConnectionId) {
        if self.by_client.get(&client_id) == Some(&connection_id) {
            self.by_client.remove(&client_id);
        }
    }
}
