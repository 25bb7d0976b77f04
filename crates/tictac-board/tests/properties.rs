use std::collections::HashSet;

use tictac_board::{
    BoardState, BoardStateTracker, CellObservation, CellState, Decision, MoveEngine, Outcome,
    Player, TrackerError, TrackerParams,
};

fn board(s: &str) -> BoardState {
    s.parse().expect("valid board")
}

fn observe(s: &str, confidence: f32) -> [CellObservation; 9] {
    let state = board(s);
    std::array::from_fn(|i| CellObservation::new(i, state.cells()[i], confidence))
}

/// Every board reachable by alternating play from either opening player.
fn reachable_boards() -> Vec<BoardState> {
    let mut seen = HashSet::new();
    let mut stack = vec![(BoardState::EMPTY, Player::X), (BoardState::EMPTY, Player::O)];
    while let Some((state, to_move)) = stack.pop() {
        if !seen.insert((state, to_move)) {
            continue;
        }
        if state.outcome().is_over() {
            continue;
        }
        for idx in state.empty_cells() {
            let mut cells = *state.cells();
            cells[idx] = to_move.to_cell();
            stack.push((BoardState::new(cells), to_move.opponent()));
        }
    }
    seen.into_iter().map(|(state, _)| state).collect()
}

#[test]
fn outcome_is_symmetric_under_label_swap() {
    let boards = reachable_boards();
    assert!(boards.len() > 5000);
    for b in boards {
        assert!(b.is_legal(), "{b} should be legal");
        assert_eq!(b.swapped().outcome(), b.outcome().swapped(), "board {b}");
    }
}

#[test]
fn consecutive_accepted_states_are_monotonic() {
    let mut tracker = BoardStateTracker::default();
    let frames = [
        ("X........", 0.9),
        ("O........", 0.9), // symbol flip
        (".........", 0.95), // revert to empty
        ("X...O....", 0.8),
        ("XO..O....", 0.4), // low confidence
        ("X...O...X", 0.9),
        ("....O...X", 0.9),
        ("XOOXO...X", 0.9), // 3 new cells, unconfirmed
        ("X..XOO..X", 0.9), // 2 new cells, first sighting
        ("X..XOO..X", 0.9), // confirmed
    ];
    let mut previous = tracker.accepted();
    for (frame, conf) in frames {
        let _ = tracker.update(&observe(frame, conf));
        let current = tracker.accepted();
        for i in 0..9 {
            let before = previous.cells()[i];
            if before != CellState::Empty {
                assert_eq!(current.cells()[i], before, "cell {i} changed after {frame}");
            }
        }
        previous = current;
    }
    assert_eq!(previous.to_string(), "X..XOO..X");
}

#[test]
fn two_cell_change_seen_once_in_three_frames_is_rejected() {
    let mut tracker = BoardStateTracker::default();
    tracker.update(&observe(".........", 0.9)).unwrap();
    let err = tracker.update(&observe("X...O....", 0.9)).unwrap_err();
    assert!(matches!(
        err,
        TrackerError::UnstableObservation {
            changed: 2,
            agreeing: 1,
            ..
        }
    ));
    tracker.update(&observe(".........", 0.9)).unwrap();
    assert_eq!(tracker.accepted(), BoardState::EMPTY);
    assert_eq!(tracker.generation(), 0);
}

#[test]
fn two_cell_change_seen_twice_in_three_frames_is_accepted() {
    let mut tracker = BoardStateTracker::default();
    assert!(tracker.update(&observe("X...O....", 0.9)).is_err());
    tracker.update(&observe(".........", 0.9)).unwrap();
    let accepted = tracker.update(&observe("X...O....", 0.9)).unwrap();
    assert_eq!(accepted.to_string(), "X...O....");
    assert_eq!(tracker.generation(), 1);
}

#[test]
fn confirmation_outside_window_does_not_count() {
    let params = TrackerParams {
        debounce_window: 3,
        debounce_min_agree: 2,
        ..TrackerParams::default()
    };
    let mut tracker = BoardStateTracker::new(params);
    assert!(tracker.update(&observe("X...O....", 0.9)).is_err());
    tracker.update(&observe(".........", 0.9)).unwrap();
    tracker.update(&observe(".........", 0.9)).unwrap();
    assert!(tracker.update(&observe("X...O....", 0.9)).is_err());
}

#[test]
fn engine_completes_own_line() {
    let state = board("XOXOXO...");
    let mv = MoveEngine::new()
        .next_move(&state, Player::X)
        .unwrap()
        .as_move()
        .unwrap();
    assert!(mv.cell_index == 6 || mv.cell_index == 8);
    assert_eq!(mv.player, Player::X);
    assert_eq!(state.apply(mv).unwrap().outcome(), Outcome::XWins);
}

#[test]
fn engine_takes_center_on_empty_board() {
    let decision = MoveEngine::new()
        .next_move(&BoardState::EMPTY, Player::X)
        .unwrap();
    assert_eq!(decision.as_move().map(|m| m.cell_index), Some(4));
}

#[test]
fn engine_blocks_opponent_row() {
    let decision = MoveEngine::new()
        .next_move(&board("OO..X...."), Player::X)
        .unwrap();
    assert_eq!(decision.as_move().map(|m| m.cell_index), Some(2));
}

#[test]
fn engine_self_play_always_finishes() {
    let engine = MoveEngine::new();
    let mut state = BoardState::EMPTY;
    let mut to_move = Player::X;
    for _ in 0..9 {
        match engine.next_move(&state, to_move).unwrap() {
            Decision::Move(mv) => state = state.apply(mv).unwrap(),
            Decision::GameOver { .. } => break,
        }
        to_move = to_move.opponent();
    }
    assert!(state.outcome().is_over());
}

#[test]
fn tracker_end_to_end_single_x() {
    let mut tracker = BoardStateTracker::default();
    for _ in 0..3 {
        tracker.update(&observe(".........", 0.9)).unwrap();
    }
    for _ in 0..2 {
        tracker.update(&observe("X........", 0.9)).unwrap();
    }
    let accepted = tracker.accepted();
    assert_eq!(accepted.to_string(), "X........");

    let mv = MoveEngine::new()
        .next_move(&accepted, Player::O)
        .unwrap()
        .as_move()
        .unwrap();
    assert_ne!(mv.cell_index, 0);
}
