//! Move validation and five-in-a-row detection.

use crate::board::{Board, Position, Stone};

/// Run length that wins the match. Longer runs also win.
pub const WIN_LENGTH: usize = 5;

/// The four axes through a cell: horizontal, vertical, and both diagonals.
/// Each is walked in the positive and negative direction.
const AXES: [(isize, isize); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

/// Errors returned when a placement is refused. The board is never mutated
/// when one of these is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    /// The coordinate is off the board.
    #[error("position {0} is outside the board")]
    OutOfBounds(Position),
    /// The target cell already holds a stone.
    #[error("position {pos} is already occupied by {occupant:?}")]
    Occupied { pos: Position, occupant: Stone },
    /// A winner has already been decided.
    #[error("the match is already over, {winner:?} won")]
    Concluded { winner: Stone },
}

/// Outcome of an accepted placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// The stone was placed and play continues.
    Placed,
    /// The stone completed a run of at least [`WIN_LENGTH`].
    Win,
}

/// Grid plus the verdict for one match.
#[derive(Debug, Clone, Default)]
pub struct BoardJudge {
    board: Board,
    winner: Option<Stone>,
}

impl BoardJudge {
    /// A judge over an empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only view of the grid.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// The winning color, once decided.
    pub fn winner(&self) -> Option<Stone> {
        self.winner
    }

    /// Whether a winner has been decided.
    pub fn is_concluded(&self) -> bool {
        self.winner.is_some()
    }

    /// Validate and apply a placement, then check for a win from `pos`.
    ///
    /// Rejected moves leave the grid untouched.
    pub fn place(&mut self, pos: Position, stone: Stone) -> Result<Placement, MoveError> {
        if let Some(winner) = self.winner {
            return Err(MoveError::Concluded { winner });
        }
        if !pos.in_bounds() {
            return Err(MoveError::OutOfBounds(pos));
        }
        if let Some(occupant) = self.board.get(pos) {
            return Err(MoveError::Occupied { pos, occupant });
        }

        self.board.set(pos, stone);

        if is_winning_move(&self.board, pos) {
            self.winner = Some(stone);
            Ok(Placement::Win)
        } else {
            Ok(Placement::Placed)
        }
    }
}

/// Whether the stone at `pos` sits on a run of [`WIN_LENGTH`] or more.
///
/// Only cells within `WIN_LENGTH - 1` of `pos` are visited. An empty `pos`
/// never wins.
pub fn is_winning_move(board: &Board, pos: Position) -> bool {
    let Some(stone) = board.get(pos) else {
        return false;
    };

    AXES.iter().any(|&(dx, dy)| {
        let run = 1 + run_length(board, pos, stone, dx, dy) + run_length(board, pos, stone, -dx, -dy);
        run >= WIN_LENGTH
    })
}

/// Count consecutive `stone` cells starting one step from `pos`.
fn run_length(board: &Board, pos: Position, stone: Stone, dx: isize, dy: isize) -> usize {
    (1..WIN_LENGTH as isize)
        .map_while(|steps| pos.step(dx, dy, steps))
        .take_while(|&cell| board.get(cell) == Some(stone))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BOARD_SIZE;

    fn place_all(judge: &mut BoardJudge, cells: &[(u8, u8)], stone: Stone) -> Vec<Placement> {
        cells
            .iter()
            .map(|&(x, y)| judge.place(Position::new(x, y), stone).unwrap())
            .collect()
    }

    fn assert_wins_on_fifth(cells: [(u8, u8); 5]) {
        let mut judge = BoardJudge::new();
        let results = place_all(&mut judge, &cells, Stone::Black);
        assert_eq!(&results[..4], &[Placement::Placed; 4], "no win before the 5th stone");
        assert_eq!(results[4], Placement::Win);
        assert_eq!(judge.winner(), Some(Stone::Black));
    }

    #[test]
    fn test_horizontal_five_wins() {
        assert_wins_on_fifth([(0, 0), (0, 1), (0, 2), (0, 3), (0, 4)]);
    }

    #[test]
    fn test_vertical_five_wins() {
        assert_wins_on_fifth([(3, 7), (4, 7), (5, 7), (6, 7), (7, 7)]);
    }

    #[test]
    fn test_main_diagonal_five_wins() {
        assert_wins_on_fifth([(2, 2), (3, 3), (4, 4), (5, 5), (6, 6)]);
    }

    #[test]
    fn test_anti_diagonal_five_wins() {
        assert_wins_on_fifth([(4, 10), (5, 9), (6, 8), (7, 7), (8, 6)]);
    }

    #[test]
    fn test_win_detected_when_gap_is_filled_last() {
        let mut judge = BoardJudge::new();
        place_all(&mut judge, &[(5, 1), (5, 2), (5, 4), (5, 5)], Stone::White);
        assert!(!judge.is_concluded());
        assert_eq!(
            judge.place(Position::new(5, 3), Stone::White),
            Ok(Placement::Win)
        );
    }

    #[test]
    fn test_four_with_gap_does_not_win() {
        let mut judge = BoardJudge::new();
        let results = place_all(&mut judge, &[(1, 0), (1, 1), (1, 3), (1, 4), (1, 5)], Stone::Black);
        assert!(results.iter().all(|r| *r == Placement::Placed));
        assert!(!judge.is_concluded());
    }

    #[test]
    fn test_mixed_colors_break_the_run() {
        let mut judge = BoardJudge::new();
        place_all(&mut judge, &[(0, 0), (0, 1), (0, 2), (0, 3)], Stone::Black);
        judge.place(Position::new(0, 4), Stone::White).unwrap();
        assert_eq!(
            judge.place(Position::new(0, 5), Stone::Black),
            Ok(Placement::Placed)
        );
    }

    #[test]
    fn test_overline_wins() {
        let mut judge = BoardJudge::new();
        place_all(&mut judge, &[(9, 0), (9, 1), (9, 2), (9, 4), (9, 5)], Stone::Black);
        assert_eq!(
            judge.place(Position::new(9, 3), Stone::Black),
            Ok(Placement::Win)
        );
    }

    #[test]
    fn test_run_along_far_edge() {
        let edge = (BOARD_SIZE - 1) as u8;
        assert_wins_on_fifth([
            (edge, edge),
            (edge, edge - 1),
            (edge, edge - 2),
            (edge, edge - 3),
            (edge, edge - 4),
        ]);
    }

    #[test]
    fn test_occupied_cell_rejected_without_mutation() {
        let mut judge = BoardJudge::new();
        let pos = Position::new(3, 3);
        judge.place(pos, Stone::Black).unwrap();
        let before = judge.board().clone();

        let result = judge.place(pos, Stone::White);
        assert_eq!(
            result,
            Err(MoveError::Occupied {
                pos,
                occupant: Stone::Black
            })
        );
        assert_eq!(judge.board(), &before);
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let mut judge = BoardJudge::new();
        let pos = Position::new(BOARD_SIZE as u8, 0);
        assert_eq!(
            judge.place(pos, Stone::Black),
            Err(MoveError::OutOfBounds(pos))
        );
        assert_eq!(judge.board().stone_count(), 0);
    }

    #[test]
    fn test_moves_after_win_rejected() {
        let mut judge = BoardJudge::new();
        place_all(&mut judge, &[(0, 0), (1, 0), (2, 0), (3, 0), (4, 0)], Stone::White);
        assert_eq!(
            judge.place(Position::new(8, 8), Stone::Black),
            Err(MoveError::Concluded {
                winner: Stone::White
            })
        );
        assert_eq!(judge.board().stone_count(), 5);
    }

    #[test]
    fn test_empty_cell_never_wins() {
        assert!(!is_winning_move(&Board::new(), Position::new(4, 4)));
    }
}
