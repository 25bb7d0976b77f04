use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cell::{CellState, Player};
use crate::lines::has_line;

pub const CELL_COUNT: usize = 9;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("cell {cell_index} is already occupied by {occupant}")]
    CellOccupied {
        cell_index: usize,
        occupant: CellState,
    },
    #[error("cell index {0} is outside 0..9")]
    InvalidCellIndex(usize),
    #[error("cannot parse board {input:?}: {reason}")]
    ParseBoard { input: String, reason: String },
}

/// Result of a board position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    InProgress,
    XWins,
    OWins,
    Draw,
}

impl Outcome {
    pub fn is_over(self) -> bool {
        self != Outcome::InProgress
    }

    pub fn winner(self) -> Option<Player> {
        match self {
            Outcome::XWins => Some(Player::X),
            Outcome::OWins => Some(Player::O),
            _ => None,
        }
    }

    /// Same outcome with X and O labels exchanged.
    pub fn swapped(self) -> Outcome {
        match self {
            Outcome::XWins => Outcome::OWins,
            Outcome::OWins => Outcome::XWins,
            other => other,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub cell_index: usize,
    pub player: Player,
}

impl Move {
    pub fn new(cell_index: usize, player: Player) -> Result<Self, BoardError> {
        if cell_index >= CELL_COUNT {
            return Err(BoardError::InvalidCellIndex(cell_index));
        }
        Ok(Self { cell_index, player })
    }

    #[inline]
    pub fn row(&self) -> usize {
        self.cell_index / 3
    }

    #[inline]
    pub fn col(&self) -> usize {
        self.cell_index % 3
    }
}

/// Nine cells in row-major order (`index = row * 3 + col`).
///
/// Serialized as its 9-character text form, e.g. `"X.O..X..."`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BoardState {
    cells: [CellState; CELL_COUNT],
}

impl BoardState {
    pub const EMPTY: BoardState = BoardState {
        cells: [CellState::Empty; CELL_COUNT],
    };

    pub fn new(cells: [CellState; CELL_COUNT]) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[CellState; CELL_COUNT] {
        &self.cells
    }

    pub fn cell(&self, idx: usize) -> Option<CellState> {
        self.cells.get(idx).copied()
    }

    pub fn count(&self, state: CellState) -> usize {
        self.cells.iter().filter(|&&c| c == state).count()
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|c| !c.is_empty())
    }

    pub fn empty_cells(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_empty())
            .map(|(i, _)| i)
    }

    pub fn has_line(&self, player: Player) -> bool {
        has_line(&self.cells, player)
    }

    /// Legal iff the mark counts differ by at most one and the players do
    /// not both hold a line.
    pub fn is_legal(&self) -> bool {
        let xs = self.count(CellState::X);
        let os = self.count(CellState::O);
        xs.abs_diff(os) <= 1 && !(self.has_line(Player::X) && self.has_line(Player::O))
    }

    pub fn outcome(&self) -> Outcome {
        let x_line = self.has_line(Player::X);
        let o_line = self.has_line(Player::O);
        match (x_line, o_line) {
            (true, false) => Outcome::XWins,
            (false, true) => Outcome::OWins,
            // two winners only happens on illegal boards; report no winner
            (true, true) => Outcome::InProgress,
            (false, false) if self.is_full() => Outcome::Draw,
            (false, false) => Outcome::InProgress,
        }
    }

    /// Board with the move applied; the target cell must be empty.
    pub fn apply(&self, mv: Move) -> Result<BoardState, BoardError> {
        let occupant = self
            .cell(mv.cell_index)
            .ok_or(BoardError::InvalidCellIndex(mv.cell_index))?;
        if !occupant.is_empty() {
            return Err(BoardError::CellOccupied {
                cell_index: mv.cell_index,
                occupant,
            });
        }
        let mut next = *self;
        next.cells[mv.cell_index] = mv.player.to_cell();
        Ok(next)
    }

    /// Whose turn it is, given which player opened the game.
    pub fn next_player(&self, first: Player) -> Player {
        let first_count = self.count(first.to_cell());
        let second_count = self.count(first.opponent().to_cell());
        if first_count > second_count {
            first.opponent()
        } else {
            first
        }
    }

    pub fn swapped(&self) -> BoardState {
        let mut cells = self.cells;
        for c in &mut cells {
            *c = c.swapped();
        }
        BoardState { cells }
    }

    /// Cells that are empty here and occupied in `other`.
    pub fn newly_occupied(&self, other: &BoardState) -> usize {
        self.cells
            .iter()
            .zip(other.cells.iter())
            .filter(|(a, b)| a.is_empty() && !b.is_empty())
            .count()
    }
}

impl fmt::Display for BoardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.cells {
            write!(f, "{}", c.to_char())?;
        }
        Ok(())
    }
}

impl FromStr for BoardState {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_err = |reason: String| BoardError::ParseBoard {
            input: s.to_string(),
            reason,
        };
        // Allow "XO.|...|..." style row separators.
        let chars: Vec<char> = s.chars().filter(|c| !matches!(c, '|' | '/' | ',')).collect();
        if chars.len() != CELL_COUNT {
            return Err(parse_err(format!(
                "expected {CELL_COUNT} cells, got {}",
                chars.len()
            )));
        }
        let mut cells = [CellState::Empty; CELL_COUNT];
        for (i, &ch) in chars.iter().enumerate() {
            cells[i] = CellState::from_char(ch)
                .ok_or_else(|| parse_err(format!("invalid cell character {ch:?} at {i}")))?;
        }
        Ok(BoardState { cells })
    }
}

impl TryFrom<String> for BoardState {
    type Error = BoardError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BoardState> for String {
    fn from(value: BoardState) -> Self {
        value.to_string()
    }
}
