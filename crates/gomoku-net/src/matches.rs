//! Arena of live matches, each owning one [`BoardJudge`].
//!
//! Sessions refer to their board by [`MatchId`] only. A match records which
//! two connections still hold it; the board is dropped when the second of
//! them releases it, and releasing twice from the same connection is an
//! error rather than a second decrement.

use gomoku_judge::BoardJudge;
use rustc_hash::FxHashMap;

use crate::ConnectionId;

/// Number of sessions that share one board.
pub const MATCH_HOLDERS: usize = 2;

/// Handle to a match in the [`MatchTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchId(pub u64);

impl std::fmt::Display for MatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "match-{}", self.0)
    }
}

/// Errors raised by the match table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    #[error("{0} does not exist")]
    UnknownMatch(MatchId),
    #[error("connection {connection} does not hold {match_id}")]
    NotHolder {
        match_id: MatchId,
        connection: ConnectionId,
    },
}

/// What happened to a match after one holder let go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// Another session still holds the board.
    Retained { remaining: usize },
    /// That was the last holder; the board is gone.
    Destroyed,
}

struct MatchEntry {
    judge: BoardJudge,
    players: [ConnectionId; MATCH_HOLDERS],
    held: [bool; MATCH_HOLDERS],
}

impl MatchEntry {
    fn holders(&self) -> usize {
        self.held.iter().filter(|h| **h).count()
    }
}

/// Owner of every live board.
#[derive(Default)]
pub struct MatchTable {
    entries: FxHashMap<MatchId, MatchEntry>,
    next_id: u64,
    destroyed: u64,
}

impl MatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new match held by both players.
    pub fn create(&mut self, first: ConnectionId, second: ConnectionId) -> MatchId {
        debug_assert_ne!(first, second, "a session cannot play itself");
        self.next_id += 1;
        let id = MatchId(self.next_id);
        self.entries.insert(
            id,
            MatchEntry {
                judge: BoardJudge::new(),
                players: [first, second],
                held: [true; MATCH_HOLDERS],
            },
        );
        id
    }

    pub fn judge(&self, id: MatchId) -> Option<&BoardJudge> {
        self.entries.get(&id).map(|e| &e.judge)
    }

    pub fn judge_mut(&mut self, id: MatchId) -> Option<&mut BoardJudge> {
        self.entries.get_mut(&id).map(|e| &mut e.judge)
    }

    /// How many sessions still hold the match, or `None` once destroyed.
    pub fn holders(&self, id: MatchId) -> Option<usize> {
        self.entries.get(&id).map(MatchEntry::holders)
    }

    /// Drop `connection`'s hold on the match, destroying it when no holder
    /// remains.
    pub fn release(&mut self, id: MatchId, connection: ConnectionId) -> Result<Release, MatchError> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(MatchError::UnknownMatch(id))?;

        let slot = entry
            .players
            .iter()
            .position(|p| *p == connection)
            .filter(|&i| entry.held[i])
            .ok_or(MatchError::NotHolder {
                match_id: id,
                connection,
            })?;
        entry.held[slot] = false;

        let remaining = entry.holders();
        if remaining == 0 {
            self.entries.remove(&id);
            self.destroyed += 1;
            tracing::debug!("{id} destroyed");
            Ok(Release::Destroyed)
        } else {
            Ok(Release::Retained { remaining })
        }
    }

    /// Number of live matches.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Matches destroyed since the table was created.
    pub fn destroyed_count(&self) -> u64 {
        self.destroyed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gomoku_judge::{Position, Stone};

    #[test]
    fn test_new_match_has_two_holders() {
        let mut table = MatchTable::new();
        let id = table.create(ConnectionId(1), ConnectionId(2));
        assert_eq!(table.holders(id), Some(2));
        assert_eq!(table.judge(id).unwrap().board().stone_count(), 0);
    }

    #[test]
    fn test_destroyed_exactly_on_last_release() {
        let mut table = MatchTable::new();
        let id = table.create(ConnectionId(1), ConnectionId(2));

        assert_eq!(
            table.release(id, ConnectionId(2)),
            Ok(Release::Retained { remaining: 1 })
        );
        assert!(table.judge(id).is_some());
        assert_eq!(table.destroyed_count(), 0);

        assert_eq!(table.release(id, ConnectionId(1)), Ok(Release::Destroyed));
        assert!(table.judge(id).is_none());
        assert_eq!(table.destroyed_count(), 1);
        assert!(table.is_empty());
    }

    #[test]
    fn test_double_release_does_not_decrement_twice() {
        let mut table = MatchTable::new();
        let id = table.create(ConnectionId(1), ConnectionId(2));
        table.release(id, ConnectionId(1)).unwrap();

        assert_eq!(
            table.release(id, ConnectionId(1)),
            Err(MatchError::NotHolder {
                match_id: id,
                connection: ConnectionId(1)
            })
        );
        assert_eq!(table.holders(id), Some(1));
    }

    #[test]
    fn test_release_after_destroy_is_an_error() {
        let mut table = MatchTable::new();
        let id = table.create(ConnectionId(1), ConnectionId(2));
        table.release(id, ConnectionId(1)).unwrap();
        table.release(id, ConnectionId(2)).unwrap();

        assert_eq!(
            table.release(id, ConnectionId(2)),
            Err(MatchError::UnknownMatch(id))
        );
        assert_eq!(table.destroyed_count(), 1);
    }

    #[test]
    fn test_stranger_cannot_release() {
        let mut table = MatchTable::new();
        let id = table.create(ConnectionId(1), ConnectionId(2));
        assert!(table.release(id, ConnectionId(3)).is_err());
        assert_eq!(table.holders(id), Some(2));
    }

    #[test]
    fn test_boards_are_independent() {
        let mut table = MatchTable::new();
        let a = table.create(ConnectionId(1), ConnectionId(2));
        let b = table.create(ConnectionId(3), ConnectionId(4));
        assert_ne!(a, b);

        table
            .judge_mut(a)
            .unwrap()
            .place(Position::new(0, 0), Stone::Black)
            .unwrap();
        assert_eq!(table.judge(a).unwrap().board().stone_count(), 1);
        assert_eq!(table.judge(b).unwrap().board().stone_count(), 0);
    }
}
