//! Board geometry for the 5x5 grid: adjacency and the 8 dihedral symmetries.

/// Side length of the board.
pub const SIDE: u8 = 5;
/// Number of grid positions / tile identities (including the zero tile).
pub const GRID_SIZE: usize = 25;

/// A direction the zero tile can move in. Order is fixed and matches the
/// 4-entry transition rows of the FSM file format (section 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Zero moves up (swaps with the tile above it).
    Up,
    /// Zero moves down.
    Down,
    /// Zero moves left.
    Left,
    /// Zero moves right.
    Right,
}

impl Direction {
    /// All four directions in FSM-row order.
    pub const ALL: [Self; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// Index into a 4-entry FSM transition row.
    pub fn index(self) -> usize {
        match self {
            Self::Up => 0,
            Self::Down => 1,
            Self::Left => 2,
            Self::Right => 3,
        }
    }

    /// The direction that undoes this one.
    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// Returns the grid position reached by moving the zero tile one step in
/// `dir` from `pos`, or `None` if that would leave the board.
pub fn step(pos: u8, dir: Direction) -> Option<u8> {
    let row = pos / SIDE;
    let col = pos % SIDE;
    match dir {
        Direction::Up if row > 0 => Some(pos - SIDE),
        Direction::Down if row < SIDE - 1 => Some(pos + SIDE),
        Direction::Left if col > 0 => Some(pos - 1),
        Direction::Right if col < SIDE - 1 => Some(pos + 1),
        _ => None,
    }
}

/// Returns every grid position adjacent to `pos` (up to 4, board-edge aware).
pub fn neighbors(pos: u8) -> impl Iterator<Item = u8> {
    Direction::ALL.into_iter().filter_map(move |d| step(pos, d))
}

/// The 8 symmetries of the square: identity, three rotations, two axis
/// reflections, and the two diagonal reflections. Indexed 0..8.
pub const NUM_SYMMETRIES: u8 = 8;

/// Applies symmetry `sym` (0..8) to a grid position, returning the position
/// it maps to.
///
/// # Panics
///
/// Panics if `sym >= NUM_SYMMETRIES`.
pub fn apply_symmetry(sym: u8, pos: u8) -> u8 {
    let row = i32::from(pos / SIDE);
    let col = i32::from(pos % SIDE);
    let last = i32::from(SIDE) - 1;
    let (nr, nc) = match sym {
        0 => (row, col),
        1 => (col, last - row),
        2 => (last - row, last - col),
        3 => (last - col, row),
        4 => (row, last - col),
        5 => (last - row, col),
        6 => (col, row),
        7 => (last - col, last - row),
        _ => panic!("invalid symmetry index {sym}"),
    };
    (nr * i32::from(SIDE) + nc) as u8
}
