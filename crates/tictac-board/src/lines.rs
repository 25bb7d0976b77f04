//! Three-in-a-row analysis.

use crate::{CellState, Player};

/// Winning line indices on the 3×3 board.
pub const WINNING_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8], // rows
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8], // columns
    [0, 4, 8],
    [2, 4, 6], // diagonals
];

/// Whether `player` holds a complete line.
pub(crate) fn has_line(cells: &[CellState; 9], player: Player) -> bool {
    let target = player.to_cell();
    WINNING_LINES
        .iter()
        .any(|line| line.iter().all(|&idx| cells[idx] == target))
}

/// Lowest empty cell that would complete a line for `player`.
pub(crate) fn completing_cell(cells: &[CellState; 9], player: Player) -> Option<usize> {
    let target = player.to_cell();
    (0..cells.len()).find(|&idx| {
        cells[idx].is_empty()
            && WINNING_LINES
                .iter()
                .filter(|line| line.contains(&idx))
                .any(|line| line.iter().all(|&k| k == idx || cells[k] == target))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use CellState::{Empty as E, O, X};

    #[test]
    fn detects_lines_for_each_player() {
        let cells = [X, X, X, O, O, E, E, E, E];
        assert!(has_line(&cells, Player::X));
        assert!(!has_line(&cells, Player::O));
    }

    #[test]
    fn completing_cell_prefers_lowest_index() {
        // X threatens 6 (diag 2-4-6) and 8 (diag 0-4-8)
        let cells = [X, O, X, O, X, O, E, E, E];
        assert_eq!(completing_cell(&cells, Player::X), Some(6));
        assert_eq!(completing_cell(&cells, Player::O), None);
    }

    #[test]
    fn blocked_line_is_not_completable() {
        let cells = [X, X, O, E, E, E, E, E, E];
        assert_eq!(completing_cell(&cells, Player::X), None);
    }
}
