//! Template-agreement cell classification.
//!
//! Each cell's inset region is binarized with one threshold for the whole
//! board, then compared against an X template (two diagonal bands) and an
//! O template (an annulus). Agreement is the F1 overlap between the ink mask
//! and the template, so stray ink and missing strokes both cost score.

use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use tictac_board::{CellObservation, CellState, CELL_COUNT};
use tictac_core::otsu_threshold;

use crate::board::{CellBounds, CellClassifier, RectifiedBoard};

/// Parameters for [`StrokeClassifier`]. Template sizes are in cell units.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifierParams {
    /// Fraction of the cell ignored on each side (keeps grid strokes out).
    pub inset_frac: f32,
    /// Half-width of the X template's diagonal bands.
    pub stroke_half_width: f32,
    /// Inner radius of the O template annulus.
    pub ring_inner: f32,
    /// Outer radius of the O template annulus.
    pub ring_outer: f32,
    /// Ink ratio at which the empty score reaches zero.
    pub empty_ink_max: f32,
    /// Scores below this yield an Empty, low-confidence observation.
    pub min_confidence: f32,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            inset_frac: 0.14,
            stroke_half_width: 0.08,
            ring_inner: 0.2,
            ring_outer: 0.36,
            empty_ink_max: 0.05,
            min_confidence: 0.6,
        }
    }
}

/// Per-cell scores, each in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct CellScores {
    pub x: f32,
    pub o: f32,
    pub empty: f32,
}

/// Default [`CellClassifier`].
#[derive(Clone, Debug, Default)]
pub struct StrokeClassifier {
    pub params: ClassifierParams,
}

impl StrokeClassifier {
    pub fn new(params: ClassifierParams) -> Self {
        Self { params }
    }

    fn in_x(&self, s: f32, t: f32) -> bool {
        let d1 = (s - t).abs() / std::f32::consts::SQRT_2;
        let d2 = (s + t - 1.0).abs() / std::f32::consts::SQRT_2;
        d1.min(d2) <= self.params.stroke_half_width
    }

    fn in_o(&self, s: f32, t: f32) -> bool {
        let r = (s - 0.5).hypot(t - 0.5);
        r >= self.params.ring_inner && r <= self.params.ring_outer
    }

    pub(crate) fn score_cell(
        &self,
        board: &RectifiedBoard,
        cell: &CellBounds,
        threshold: u8,
    ) -> CellScores {
        let region = cell.inset(self.params.inset_frac);
        let (cw, ch) = (cell.width().max(1) as f32, cell.height().max(1) as f32);

        let mut ink = 0usize;
        let mut total = 0usize;
        let (mut x_hit, mut x_tmpl) = (0usize, 0usize);
        let (mut o_hit, mut o_tmpl) = (0usize, 0usize);

        for y in region.y0..region.y1 {
            for x in region.x0..region.x1 {
                let Some(v) = board.image.get(x, y) else {
                    continue;
                };
                total += 1;
                let is_ink = v <= threshold;
                let s = (x - cell.x0) as f32 / cw + 0.5 / cw;
                let t = (y - cell.y0) as f32 / ch + 0.5 / ch;
                if is_ink {
                    ink += 1;
                }
                if self.in_x(s, t) {
                    x_tmpl += 1;
                    if is_ink {
                        x_hit += 1;
                    }
                }
                if self.in_o(s, t) {
                    o_tmpl += 1;
                    if is_ink {
                        o_hit += 1;
                    }
                }
            }
        }

        let f1 = |hit: usize, tmpl: usize| {
            let denom = (ink + tmpl) as f32;
            if denom > 0.0 {
                2.0 * hit as f32 / denom
            } else {
                0.0
            }
        };
        let ink_ratio = if total > 0 {
            ink as f32 / total as f32
        } else {
            0.0
        };
        let empty_max = self.params.empty_ink_max.max(f32::EPSILON);

        CellScores {
            x: f1(x_hit, x_tmpl),
            o: f1(o_hit, o_tmpl),
            empty: (1.0 - ink_ratio / empty_max).clamp(0.0, 1.0),
        }
    }

    fn label(&self, cell_index: usize, scores: CellScores) -> CellObservation {
        let mut best = (CellState::Empty, scores.empty);
        if scores.x > best.1 {
            best = (CellState::X, scores.x);
        }
        if scores.o > best.1 {
            best = (CellState::O, scores.o);
        }
        let (state, confidence) = best;
        if confidence >= self.params.min_confidence {
            CellObservation::new(cell_index, state, confidence)
        } else {
            CellObservation::new(cell_index, CellState::Empty, confidence)
        }
    }
}

impl CellClassifier for StrokeClassifier {
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    fn classify(&self, board: &RectifiedBoard) -> [CellObservation; CELL_COUNT] {
        let threshold = otsu_threshold(&board.image.data);
        std::array::from_fn(|idx| {
            let scores = self.score_cell(board, &board.cell_bounds[idx], threshold);
            let obs = self.label(idx, scores);
            log::trace!(
                "cell {idx}: x {:.2} o {:.2} empty {:.2} -> {} ({:.2})",
                scores.x,
                scores.o,
                scores.empty,
                obs.state,
                obs.confidence
            );
            obs
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{render_rectified, RenderParams};
    use tictac_board::BoardState;

    fn classify(board: &str) -> [CellObservation; CELL_COUNT] {
        let state: BoardState = board.parse().unwrap();
        let rect = render_rectified(48, &state, &RenderParams::default());
        StrokeClassifier::default().classify(&rect)
    }

    #[test]
    fn labels_clean_marks() {
        let obs = classify("X.O|.X.|O..");
        let labels: String = obs.iter().map(|o| o.state.to_char()).collect();
        assert_eq!(labels, "X.O.X.O..");
        for o in &obs {
            assert!(o.confidence >= 0.6, "cell {} confidence {}", o.cell_index, o.confidence);
            assert!(o.confidence <= 1.0);
        }
        for (i, o) in obs.iter().enumerate() {
            assert_eq!(o.cell_index, i);
        }
    }

    #[test]
    fn scores_separate_x_from_o() {
        let state: BoardState = "XO.......".parse().unwrap();
        let rect = render_rectified(48, &state, &RenderParams::default());
        let clf = StrokeClassifier::default();
        let t = otsu_threshold(&rect.image.data);
        let x = clf.score_cell(&rect, &rect.cell_bounds[0], t);
        let o = clf.score_cell(&rect, &rect.cell_bounds[1], t);
        let e = clf.score_cell(&rect, &rect.cell_bounds[2], t);
        assert!(x.x > 0.8 && x.x > x.o + 0.2, "{x:?}");
        assert!(o.o > 0.8 && o.o > o.x + 0.2, "{o:?}");
        assert!(e.empty > 0.95 && e.x < 0.1 && e.o < 0.1, "{e:?}");
    }

    #[test]
    fn scribble_is_low_confidence_empty() {
        let state = BoardState::EMPTY;
        let mut rect = render_rectified(48, &state, &RenderParams::default());
        // a short horizontal smear in cell 4
        for y in 70..74 {
            for x in 62..82 {
                rect.image.set(x, y, 20);
            }
        }
        let obs = StrokeClassifier::default().classify(&rect);
        assert_eq!(obs[4].state, CellState::Empty);
        assert!(obs[4].confidence < 0.6);
    }
}
