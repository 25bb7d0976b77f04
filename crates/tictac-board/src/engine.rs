//! Fixed-priority move selection.

use serde::{Deserialize, Serialize};

use crate::cell::Player;
use crate::lines::completing_cell;
use crate::state::{BoardState, Move, Outcome};

const CENTER: usize = 4;
const CORNERS: [usize; 4] = [0, 2, 6, 8];
const EDGES: [usize; 4] = [1, 3, 5, 7];

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("no empty cell on in-progress board {board}")]
    NoLegalMove { board: BoardState },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decision {
    Move(Move),
    GameOver { outcome: Outcome },
}

impl Decision {
    pub fn as_move(&self) -> Option<Move> {
        match self {
            Decision::Move(mv) => Some(*mv),
            Decision::GameOver { .. } => None,
        }
    }
}

/// Win, block, center, corner, edge; first match wins.
#[derive(Clone, Copy, Debug, Default)]
pub struct MoveEngine;

impl MoveEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn next_move(&self, state: &BoardState, to_move: Player) -> Result<Decision, EngineError> {
        let outcome = state.outcome();
        if outcome.is_over() {
            return Ok(Decision::GameOver { outcome });
        }

        let cells = state.cells();
        let is_empty = |idx: &usize| cells[*idx].is_empty();

        let pick = completing_cell(cells, to_move)
            .or_else(|| completing_cell(cells, to_move.opponent()))
            .or_else(|| Some(CENTER).filter(is_empty))
            .or_else(|| CORNERS.into_iter().find(is_empty))
            .or_else(|| EDGES.into_iter().find(is_empty));

        match pick {
            Some(cell_index) => Ok(Decision::Move(Move {
                cell_index,
                player: to_move,
            })),
            None => Err(EngineError::NoLegalMove { board: *state }),
        }
    }
}
