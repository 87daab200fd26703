//! Wire message types and their fixed-layout encoding.
//!
//! | byte 0 | bytes 1-4                                  | direction |
//! |--------|--------------------------------------------|-----------|
//! | `0x01` | 1-2: requested id (BE, 0 = new)            | c → s     |
//! | `0x02` | 1-2: sender id (BE), 3: x, 4: y            | both      |
//! | `0x03` | 1-2: assigned id (BE)                      | s → c     |
//! | `0x04` | 3: own color, 4: opponent color            | s → c     |
//! | `0x05` | 3: 1 = winner, 2 = loser                   | s → c     |
//! | `0x06` | unused                                     | s → c     |
//!
//! Unused payload bytes are written as zero and ignored on decode.

use gomoku_judge::{BOARD_SIZE, Position, Stone};
use static_assertions::const_assert;

use crate::framing::{FRAME_LEN, Frame};

// Board coordinates travel as single bytes.
const_assert!(BOARD_SIZE <= 256);

/// Client identifier as carried in bytes 1-2 of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u16);

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// MessageTag
// ---------------------------------------------------------------------------

/// The type byte of a frame, used as the dispatch key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageTag {
    /// Client reports its id, or asks for one.
    ReportId = 0x01,
    /// A stone placement, relayed verbatim to the opponent.
    PlaceStone = 0x02,
    /// Server hands out a fresh id.
    AssignId = 0x03,
    /// Server announces a pairing and the colors.
    GameStart = 0x04,
    /// Server announces the result.
    GameOver = 0x05,
    /// Server reports that the opponent's connection ended.
    OpponentDisconnected = 0x06,
}

impl MessageTag {
    /// Every tag, in wire order.
    pub const ALL: [MessageTag; 6] = [
        MessageTag::ReportId,
        MessageTag::PlaceStone,
        MessageTag::AssignId,
        MessageTag::GameStart,
        MessageTag::GameOver,
        MessageTag::OpponentDisconnected,
    ];

    /// Decode a type byte. Returns `None` for unassigned values.
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|tag| *tag as u8 == byte)
    }

    /// The type byte for this tag.
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// The tag of a raw frame, if its type byte is known.
    pub fn of(frame: &Frame) -> Option<Self> {
        Self::from_byte(frame[0])
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Result flag carried by [`Message::GameOver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Outcome {
    Winner = 1,
    Loser = 2,
}

/// A decoded wire message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    /// `requested == ClientId(0)` asks the server for a new id.
    ReportId { requested: ClientId },
    /// `sender` is informational; the server identifies senders by connection.
    PlaceStone { sender: ClientId, pos: Position },
    AssignId { client_id: ClientId },
    GameStart { own: Stone, opponent: Stone },
    GameOver { outcome: Outcome },
    OpponentDisconnected,
}

/// Errors that can occur when decoding a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    /// The type byte is not assigned.
    #[error("unknown message type 0x{0:02x}")]
    UnknownType(u8),
    /// A color byte is neither 1 nor 2.
    #[error("invalid stone color {0}")]
    InvalidStone(u8),
    /// A game-over flag is neither 1 nor 2.
    #[error("invalid game-over flag {0}")]
    InvalidOutcome(u8),
}

impl Message {
    /// Extract the routing tag without consuming the message.
    pub fn tag(&self) -> MessageTag {
        match self {
            Message::ReportId { .. } => MessageTag::ReportId,
            Message::PlaceStone { .. } => MessageTag::PlaceStone,
            Message::AssignId { .. } => MessageTag::AssignId,
            Message::GameStart { .. } => MessageTag::GameStart,
            Message::GameOver { .. } => MessageTag::GameOver,
            Message::OpponentDisconnected => MessageTag::OpponentDisconnected,
        }
    }

    /// Lay the message out as a wire frame.
    pub fn encode(&self) -> Frame {
        let mut frame = [0u8; FRAME_LEN];
        frame[0] = self.tag().to_byte();
        match *self {
            Message::ReportId { requested: id }
            | Message::AssignId { client_id: id } => {
                frame[1..3].copy_from_slice(&id.0.to_be_bytes());
            }
            Message::PlaceStone { sender, pos } => {
                frame[1..3].copy_from_slice(&sender.0.to_be_bytes());
                frame[3] = pos.x;
                frame[4] = pos.y;
            }
            Message::GameStart { own, opponent } => {
                frame[3] = own.to_byte();
                frame[4] = opponent.to_byte();
            }
            Message::GameOver { outcome } => {
                frame[3] = outcome as u8;
            }
            Message::OpponentDisconnected => {}
        }
        frame
    }

    /// Parse a wire frame.
    pub fn decode(frame: &Frame) -> Result<Self, MessageError> {
        let tag = MessageTag::of(frame).ok_or(MessageError::UnknownType(frame[0]))?;
        let id = ClientId(u16::from_be_bytes([frame[1], frame[2]]));

        Ok(match tag {
            MessageTag::ReportId => Message::ReportId { requested: id },
            MessageTag::PlaceStone => Message::PlaceStone {
                sender: id,
                pos: Position::new(frame[3], frame[4]),
            },
            MessageTag::AssignId => Message::AssignId { client_id: id },
            MessageTag::GameStart => Message::GameStart {
                own: Stone::from_byte(frame[3]).ok_or(MessageError::InvalidStone(frame[3]))?,
                opponent: Stone::from_byte(frame[4])
                    .ok_or(MessageError::InvalidStone(frame[4]))?,
            },
            MessageTag::GameOver => Message::GameOver {
                outcome: match frame[3] {
                    1 => Outcome::Winner,
                    2 => Outcome::Loser,
                    other => return Err(MessageError::InvalidOutcome(other)),
                },
            },
            MessageTag::OpponentDisconnected => Message::OpponentDisconnected,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
