//! Grid storage, stone colors, and board coordinates.

use std::fmt;

/// Edge length of the square board.
pub const BOARD_SIZE: usize = 16;

/// One of the two player markers.
///
/// The discriminants are the wire encoding: black moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Stone {
    /// First player.
    Black = 1,
    /// Second player.
    White = 2,
}

impl Stone {
    /// The opposing color.
    pub fn opponent(self) -> Self {
        match self {
            Stone::Black => Stone::White,
            Stone::White => Stone::Black,
        }
    }

    /// Wire byte for this color.
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Decode a wire byte. Returns `None` for anything other than 1 or 2.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Stone::Black),
            2 => Some(Stone::White),
            _ => None,
        }
    }
}

/// A cell coordinate. `x` indexes the row, `y` the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: u8,
    pub y: u8,
}

impl Position {
    pub fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    /// Whether this coordinate lies on the board.
    pub fn in_bounds(self) -> bool {
        usize::from(self.x) < BOARD_SIZE && usize::from(self.y) < BOARD_SIZE
    }

    /// Step `steps` cells along `(dx, dy)`. Returns `None` once the walk
    /// leaves the board.
    pub(crate) fn step(self, dx: isize, dy: isize, steps: isize) -> Option<Self> {
        let x = self.x as isize + dx * steps;
        let y = self.y as isize + dy * steps;
        let limit = BOARD_SIZE as isize;
        if (0..limit).contains(&x) && (0..limit).contains(&y) {
            Some(Self::new(x as u8, y as u8))
        } else {
            None
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A `BOARD_SIZE` × `BOARD_SIZE` grid of optional stones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: [[Option<Stone>; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    /// An empty board.
    pub fn new() -> Self {
        Self {
            cells: [[None; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    /// Stone at `pos`, or `None` if empty or off the board.
    pub fn get(&self, pos: Position) -> Option<Stone> {
        if !pos.in_bounds() {
            return None;
        }
        self.cells[usize::from(pos.x)][usize::from(pos.y)]
    }

    /// Overwrite a cell. Callers are expected to have checked bounds.
    pub(crate) fn set(&mut self, pos: Position, stone: Stone) {
        self.cells[usize::from(pos.x)][usize::from(pos.y)] = Some(stone);
    }

    /// Number of occupied cells.
    pub fn stone_count(&self) -> usize {
        self.cells
            .iter()
            .flat_map(|row| row.iter())
            .filter(|cell| cell.is_some())
            .count()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}
