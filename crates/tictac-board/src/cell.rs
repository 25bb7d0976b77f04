use std::fmt;

use serde::{Deserialize, Serialize};

/// Occupancy of one board cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellState {
    #[default]
    Empty,
    X,
    O,
}

impl CellState {
    pub fn to_char(self) -> char {
        match self {
            CellState::Empty => '.',
            CellState::X => 'X',
            CellState::O => 'O',
        }
    }

    pub fn from_char(c: char) -> Option<CellState> {
        match c {
            '.' | '_' | ' ' => Some(CellState::Empty),
            'X' | 'x' => Some(CellState::X),
            'O' | 'o' | '0' => Some(CellState::O),
            _ => None,
        }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self == CellState::Empty
    }

    /// The player owning this mark, if any.
    pub fn player(self) -> Option<Player> {
        match self {
            CellState::Empty => None,
            CellState::X => Some(Player::X),
            CellState::O => Some(Player::O),
        }
    }

    /// Swap X and O labels; Empty stays Empty.
    pub fn swapped(self) -> CellState {
        match self {
            CellState::Empty => CellState::Empty,
            CellState::X => CellState::O,
            CellState::O => CellState::X,
        }
    }
}

impl fmt::Display for CellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    X,
    O,
}

impl Player {
    pub fn opponent(self) -> Player {
        match self {
            Player::X => Player::O,
            Player::O => Player::X,
        }
    }

    pub fn to_cell(self) -> CellState {
        match self {
            Player::X => CellState::X,
            Player::O => CellState::O,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_cell().to_char())
    }
}

impl std::str::FromStr for Player {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "X" | "x" => Ok(Player::X),
            "O" | "o" => Ok(Player::O),
            other => Err(format!("unknown player {other:?} (expected X or O)")),
        }
    }
}

/// Classifier verdict for a single cell.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellObservation {
    /// Row-major cell index, `row * 3 + col`.
    pub cell_index: usize,
    pub state: CellState,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
}

impl CellObservation {
    pub fn new(cell_index: usize, state: CellState, confidence: f32) -> Self {
        Self {
            cell_index,
            state,
            confidence,
        }
    }
}
