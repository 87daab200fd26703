//! Board state and rule checking for a two-player gomoku match.
//!
//! A [`BoardJudge`] owns one fixed-size grid and validates every placement
//! against it. Win detection scans outward from the last stone only, so it
//! costs the same on an empty board as on a full one.

mod board;
mod judge;

pub use board::{BOARD_SIZE, Board, Position, Stone};
pub use judge::{BoardJudge, MoveError, Placement, WIN_LENGTH, is_winning_move};
