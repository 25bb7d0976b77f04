//! Frame-to-move pipeline: locate, classify, track, decide, dispatch.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use nalgebra::Point2;
use serde::Serialize;

#[cfg(feature = "tracing")]
use tracing::instrument;

use tictac_actuator::{ActuatorSink, ActuatorTarget, CalibrationTable};
use tictac_board::{
    BoardState, BoardStateTracker, CellObservation, Decision, EngineError, MoveEngine, Outcome,
    Player, TrackerError, TrackerParams, CELL_COUNT,
};
use tictac_core::Frame;
use tictac_vision::{BoardLocator, CellClassifier, GridLocator, LocatorError, StrokeClassifier};

use crate::config::PipelineConfig;

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Locator(#[from] LocatorError),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl PipelineError {
    /// Locator and tracker rejections are routine noise; engine errors are defects.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, PipelineError::Engine(_))
    }
}

/// Game-side parameters of a [`Pipeline`].
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineParams {
    pub tracker: TrackerParams,
    pub calibration: CalibrationTable,
    pub robot_player: Player,
    pub first_player: Player,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            tracker: TrackerParams::default(),
            calibration: CalibrationTable::default(),
            robot_player: Player::O,
            first_player: Player::X,
        }
    }
}

/// Locate + classify result for a single frame, with no tracking.
#[derive(Clone, Debug, Serialize)]
pub struct DetectionReport {
    pub width: usize,
    pub height: usize,
    /// Board corners in the frame: TL, TR, BR, BL.
    pub corners: [Point2<f32>; 4],
    pub score: f32,
    pub observations: [CellObservation; CELL_COUNT],
    /// Labels as a 9-character row-major string, low-confidence cells as `.`.
    pub board: String,
}

/// What one pipeline run did.
#[derive(Clone, Debug, Serialize)]
pub struct FrameReport {
    pub captured_at_ms: u128,
    pub board: BoardState,
    pub outcome: Outcome,
    pub generation: u64,
    pub corners: [Point2<f32>; 4],
    pub score: f32,
    pub observations: [CellObservation; CELL_COUNT],
    pub decision: Option<Decision>,
    pub target: Option<ActuatorTarget>,
    pub dispatched: bool,
}

struct Session {
    tracker: BoardStateTracker,
    last_dispatched: Option<u64>,
    last_game_over: Option<u64>,
}

/// Owns the tracker and drives one frame at a time through every stage.
///
/// `process` takes `&self`: the tracker sits behind a mutex, so a pipeline
/// can be shared with a scheduler through an `Arc`.
pub struct Pipeline<L, C> {
    locator: L,
    classifier: C,
    engine: MoveEngine,
    sink: Arc<dyn ActuatorSink>,
    params: PipelineParams,
    session: Mutex<Session>,
}

impl Pipeline<GridLocator, StrokeClassifier> {
    /// Built-in locator and classifier configured from `cfg`.
    pub fn from_config(cfg: &PipelineConfig, sink: Arc<dyn ActuatorSink>) -> Self {
        let params = PipelineParams {
            tracker: cfg.tracker_params(),
            calibration: cfg.calibration.clone(),
            robot_player: cfg.robot_player,
            first_player: cfg.first_player,
        };
        Self::new(
            GridLocator::new(cfg.locator.clone()),
            StrokeClassifier::new(cfg.classifier_params()),
            sink,
            params,
        )
    }
}

impl<L: BoardLocator, C: CellClassifier> Pipeline<L, C> {
    pub fn new(
        locator: L,
        classifier: C,
        sink: Arc<dyn ActuatorSink>,
        params: PipelineParams,
    ) -> Self {
        let tracker = BoardStateTracker::new(params.tracker.clone());
        Self {
            locator,
            classifier,
            engine: MoveEngine::new(),
            sink,
            params,
            session: Mutex::new(Session {
                tracker,
                last_dispatched: None,
                last_game_over: None,
            }),
        }
    }

    pub fn params(&self) -> &PipelineParams {
        &self.params
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Last accepted board.
    pub fn accepted(&self) -> BoardState {
        self.session().tracker.accepted()
    }

    pub fn generation(&self) -> u64 {
        self.session().tracker.generation()
    }

    /// Forget the current game. The physical board must be cleared too.
    pub fn reset(&self) {
        let mut session = self.session();
        session.tracker.reset();
        session.last_dispatched = None;
        session.last_game_over = None;
    }

    /// Run one frame through the pipeline.
    ///
    /// Errors leave the accepted board untouched. A move is dispatched at
    /// most once per accepted board, and only on the robot's turn.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip_all,
            fields(captured_at_ms = frame.captured_at().as_millis() as u64)
        )
    )]
    pub fn process(&self, frame: &Frame) -> Result<FrameReport, PipelineError> {
        let rectified = self.locator.locate(frame)?;
        let observations = self.classifier.classify(&rectified);

        let (board, generation, fresh_game_over, needs_move) = {
            let mut session = self.session();
            let board = session.tracker.update(&observations)?;
            let generation = session.tracker.generation();
            let over = board.outcome().is_over();
            let fresh_game_over = over && session.last_game_over != Some(generation);
            if fresh_game_over {
                session.last_game_over = Some(generation);
            }
            let needs_move = !over
                && board.next_player(self.params.first_player) == self.params.robot_player
                && session.last_dispatched != Some(generation);
            (board, generation, fresh_game_over, needs_move)
        };

        let mut report = FrameReport {
            captured_at_ms: frame.captured_at().as_millis(),
            board,
            outcome: board.outcome(),
            generation,
            corners: rectified.corners_img,
            score: rectified.score,
            observations,
            decision: None,
            target: None,
            dispatched: false,
        };

        if fresh_game_over {
            log::info!("game over on {board}: {:?}", report.outcome);
            report.decision = Some(Decision::GameOver {
                outcome: report.outcome,
            });
            return Ok(report);
        }
        if !needs_move {
            return Ok(report);
        }

        let decision = self
            .engine
            .next_move(&board, self.params.robot_player)
            .inspect_err(|err| log::error!("engine failed on {board}: {err}"))?;
        report.decision = Some(decision);
        let Some(mv) = decision.as_move() else {
            return Ok(report);
        };
        let target = self.params.calibration.to_target(mv);
        report.target = Some(target);

        {
            let mut session = self.session();
            if session.tracker.generation() != generation {
                log::debug!("result for generation {generation} superseded; not dispatching");
                return Ok(report);
            }
            if session.last_dispatched == Some(generation) {
                return Ok(report);
            }
            session.last_dispatched = Some(generation);
        }

        log::info!(
            "{} plays cell {} on {board}: servo1={} servo2={} servo3={}",
            mv.player,
            mv.cell_index,
            target.servo1,
            target.servo2,
            target.servo3
        );
        self.sink.dispatch(target);
        report.dispatched = true;
        Ok(report)
    }
}

/// Locate and classify a single frame without touching any game state.
pub fn detect_board<L, C>(
    locator: &L,
    classifier: &C,
    frame: &Frame,
) -> Result<DetectionReport, LocatorError>
where
    L: BoardLocator + ?Sized,
    C: CellClassifier + ?Sized,
{
    let rectified = locator.locate(frame)?;
    let observations = classifier.classify(&rectified);
    let board = observations.iter().map(|o| o.state.to_char()).collect();
    Ok(DetectionReport {
        width: frame.width(),
        height: frame.height(),
        corners: rectified.corners_img,
        score: rectified.score,
        observations,
        board,
    })
}
