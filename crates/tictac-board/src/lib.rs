//! Game-side half of the board vision pipeline.
//!
//! - [`BoardState`] / [`Outcome`]: the 3×3 board, legality and result.
//! - [`BoardStateTracker`]: folds noisy per-frame [`CellObservation`]s into a
//!   single accepted state, rejecting impossible transitions.
//! - [`MoveEngine`]: fixed-priority move selection (win, block, center,
//!   corner, edge).
//!
//! ## Quickstart
//!
//! ```
//! use tictac_board::{BoardState, Decision, MoveEngine, Player};
//!
//! let board: BoardState = "OO..X....".parse().unwrap();
//! let decision = MoveEngine::new().next_move(&board, Player::X).unwrap();
//! assert!(matches!(decision, Decision::Move(m) if m.cell_index == 2));
//! ```

mod cell;
mod engine;
mod lines;
mod state;
mod tracker;

pub use cell::{CellObservation, CellState, Player};
pub use engine::{Decision, EngineError, MoveEngine};
pub use lines::WINNING_LINES;
pub use state::{BoardError, BoardState, Move, Outcome, CELL_COUNT};
pub use tracker::{BoardStateTracker, TrackerError, TrackerParams};
