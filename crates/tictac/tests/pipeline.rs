use std::sync::{Arc, Mutex};
use std::time::Duration;

use nalgebra::Point2;
use tictac::actuator::{ActuatorSink, ActuatorTarget, CalibrationTable};
use tictac::core::{Frame, GrayImage};
use tictac::vision::synthetic::{render_frame, square_corners, RenderParams};
use tictac::vision::{GridLocator, LocatorError, StrokeClassifier};
use tictac::{
    run_pipeline, BoardState, MemorySource, Move, Pipeline, PipelineConfig, PipelineError, Player,
    Scheduler,
};

#[derive(Default)]
struct RecordingSink(Mutex<Vec<ActuatorTarget>>);

impl RecordingSink {
    fn sent(&self) -> Vec<ActuatorTarget> {
        self.0.lock().unwrap().clone()
    }
}

impl ActuatorSink for RecordingSink {
    fn dispatch(&self, target: ActuatorTarget) {
        self.0.lock().unwrap().push(target);
    }
}

fn board_frame(board: &str, at_ms: u64) -> Frame {
    let state: BoardState = board.parse().unwrap();
    let corners = square_corners(Point2::new(120.0, 100.0), 150.0);
    let img = render_frame(240, 200, 230, &corners, &state, &RenderParams::default()).unwrap();
    Frame::new(img, Duration::from_millis(at_ms)).unwrap()
}

type Shared = Arc<Pipeline<GridLocator, StrokeClassifier>>;

fn pipeline() -> (Shared, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let pipeline = Pipeline::from_config(&PipelineConfig::default(), sink.clone());
    (Arc::new(pipeline), sink)
}

fn expected_target(cell_index: usize) -> ActuatorTarget {
    CalibrationTable::default().to_target(Move::new(cell_index, Player::O).unwrap())
}

#[test]
fn opening_move_is_seen_and_answered_once() {
    let (pipeline, sink) = pipeline();
    let frames = [
        ".........",
        ".........",
        ".........",
        "X........",
        "X........",
    ];
    for (i, board) in frames.iter().enumerate() {
        let report = pipeline.process(&board_frame(board, 2000 * i as u64)).unwrap();
        assert_eq!(report.captured_at_ms, 2000 * i as u128);
    }

    assert_eq!(pipeline.accepted().to_string(), "X........");
    // O answers in the center, never on the occupied corner
    assert_eq!(sink.sent(), vec![expected_target(4)]);
}

#[test]
fn missing_board_keeps_the_accepted_state() {
    let (pipeline, sink) = pipeline();
    pipeline.process(&board_frame("....X....", 0)).unwrap();
    let blank = Frame::new(GrayImage::filled(240, 200, 230), Duration::from_millis(2000)).unwrap();

    let err = pipeline.process(&blank).unwrap_err();
    assert!(matches!(err, PipelineError::Locator(LocatorError::NoGridFound)));
    assert!(err.is_recoverable());
    assert_eq!(pipeline.accepted().to_string(), "....X....");
    assert_eq!(sink.sent().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn scheduled_run_drains_the_source() {
    let (pipeline, sink) = pipeline();
    let source: MemorySource = ["..X......", "..X......", "..X.O....", "X.X.O...."]
        .iter()
        .enumerate()
        .map(|(i, b)| board_frame(b, 10 * i as u64))
        .collect();

    let scheduler = Scheduler::new(Duration::from_millis(10));
    let stats = run_pipeline(&scheduler, source, pipeline.clone()).await;

    // four frames plus the tick that finds the source empty
    assert_eq!(stats.runs + stats.dropped_ticks, stats.ticks);
    assert_eq!(stats.runs, 5, "{stats:?}");
    assert_eq!(pipeline.accepted().to_string(), "X.X.O....");
    // center after X's corner, then block the top row
    assert_eq!(sink.sent(), vec![expected_target(4), expected_target(1)]);
}
