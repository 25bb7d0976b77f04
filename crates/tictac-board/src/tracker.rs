//! Noise-tolerant board state tracking.
//!
//! The tracker owns the single accepted [`BoardState`]. Each frame's
//! observations form a candidate which is either accepted (and replaces the
//! stored state) or rejected with a [`TrackerError`]; a rejection never
//! touches the accepted state.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::cell::{CellObservation, CellState};
use crate::state::{BoardState, CELL_COUNT};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    #[error(
        "{changed} cells changed at once; seen in {agreeing} of the last {window} frames, need {required}"
    )]
    UnstableObservation {
        changed: usize,
        agreeing: usize,
        window: usize,
        required: usize,
    },
    #[error("candidate board {candidate} is not a legal position")]
    IllegalBoardState { candidate: BoardState },
}

/// Parameters for [`BoardStateTracker`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerParams {
    /// Observations below this confidence count as "unknown".
    pub confidence_threshold: f32,
    /// Number of recent candidates kept for debounce.
    pub debounce_window: usize,
    /// Identical candidates required in the window to accept a multi-cell change.
    pub debounce_min_agree: usize,
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.6,
            debounce_window: 3,
            debounce_min_agree: 2,
        }
    }
}

#[derive(Clone, Debug)]
pub struct BoardStateTracker {
    params: TrackerParams,
    accepted: BoardState,
    history: VecDeque<BoardState>,
    generation: u64,
}

impl Default for BoardStateTracker {
    fn default() -> Self {
        Self::new(TrackerParams::default())
    }
}

impl BoardStateTracker {
    /// Window and agreement count are clamped so that `1 <= min_agree <= window`.
    pub fn new(mut params: TrackerParams) -> Self {
        let window = params.debounce_window.max(1);
        let min_agree = params.debounce_min_agree.clamp(1, window);
        if window != params.debounce_window || min_agree != params.debounce_min_agree {
            log::warn!(
                "debounce window {} / min agree {} adjusted to {window} / {min_agree}",
                params.debounce_window,
                params.debounce_min_agree
            );
        }
        params.debounce_window = window;
        params.debounce_min_agree = min_agree;
        Self {
            params,
            accepted: BoardState::EMPTY,
            history: VecDeque::with_capacity(window),
            generation: 0,
        }
    }

    pub fn params(&self) -> &TrackerParams {
        &self.params
    }

    /// Current accepted state.
    pub fn accepted(&self) -> BoardState {
        self.accepted
    }

    /// Bumped every time the accepted state changes.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Start a new game: all-empty board, empty history.
    pub fn reset(&mut self) {
        self.accepted = BoardState::EMPTY;
        self.history.clear();
        self.generation += 1;
        log::info!("tracker reset, generation {}", self.generation);
    }

    /// Fold one frame of observations into the accepted state.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, observations), fields(generation = self.generation))
    )]
    pub fn update(
        &mut self,
        observations: &[CellObservation; CELL_COUNT],
    ) -> Result<BoardState, TrackerError> {
        let candidate = self.candidate(observations);

        let window = self.params.debounce_window;
        while self.history.len() >= window {
            self.history.pop_front();
        }
        self.history.push_back(candidate);

        let changed = self.accepted.newly_occupied(&candidate);
        if changed == 0 {
            return Ok(self.accepted);
        }

        if changed > 1 {
            let agreeing = self.history.iter().filter(|&&h| h == candidate).count();
            let required = self.params.debounce_min_agree;
            if agreeing < required {
                log::debug!(
                    "unconfirmed {changed}-cell change to {candidate} ({agreeing}/{window})"
                );
                return Err(TrackerError::UnstableObservation {
                    changed,
                    agreeing,
                    window,
                    required,
                });
            }
        }

        if !candidate.is_legal() {
            log::debug!("illegal candidate {candidate}");
            return Err(TrackerError::IllegalBoardState { candidate });
        }

        log::info!("accepted board {} -> {}", self.accepted, candidate);
        self.accepted = candidate;
        self.generation += 1;
        Ok(candidate)
    }

    /// Per-frame candidate with low-confidence cells and non-additive
    /// transitions replaced by the accepted value.
    fn candidate(&self, observations: &[CellObservation; CELL_COUNT]) -> BoardState {
        let mut cells = *self.accepted.cells();
        for obs in observations {
            let Some(prev) = self.accepted.cell(obs.cell_index) else {
                log::warn!("observation for invalid cell {} ignored", obs.cell_index);
                continue;
            };
            if obs.confidence < self.params.confidence_threshold {
                continue;
            }
            if prev != CellState::Empty && obs.state != prev {
                log::debug!(
                    "cell {} observed {} but holds {}; keeping {}",
                    obs.cell_index,
                    obs.state,
                    prev,
                    prev
                );
                continue;
            }
            cells[obs.cell_index] = obs.state;
        }
        BoardState::new(cells)
    }
}
