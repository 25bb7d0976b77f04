//! Grid localization and rectification.
//!
//! The board is expected to be a 3×3 grid drawn with an outer border, dark
//! ink on light paper. The whole grid then forms a single 8-connected ink
//! component whose extreme points are the four board corners.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use tictac_core::{homography_from_4pt, otsu_threshold, warp_perspective_gray, Frame, GrayImage};

use crate::board::{quad_center, BoardLocator, RectifiedBoard};
use crate::components::{connected_components, Component};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LocatorError {
    #[error("no 3x3 grid found in frame")]
    NoGridFound,
    #[error("{candidates} comparable grid candidates, none clearly closest to the frame center")]
    AmbiguousGrid { candidates: usize },
}

/// Parameters for [`GridLocator`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocatorParams {
    /// Minimum bounding-box side as a fraction of the shorter frame side.
    pub min_board_frac: f32,
    /// Minimum short/long ratio for the bounding box and the quad sides.
    pub min_aspect: f32,
    /// Rectified cell size in pixels.
    pub px_per_cell: usize,
    /// Minimum paper-to-line contrast (0..255) on every inner grid line.
    pub min_line_contrast: f32,
    /// Candidates scoring at least this fraction of the best are comparable.
    pub ambiguity_ratio: f32,
    /// Comparable candidates whose center distances differ by no more than
    /// this are tied.
    pub center_tie_px: f32,
}

impl Default for LocatorParams {
    fn default() -> Self {
        Self {
            min_board_frac: 0.2,
            min_aspect: 0.5,
            px_per_cell: 48,
            min_line_contrast: 40.0,
            ambiguity_ratio: 0.8,
            center_tie_px: 4.0,
        }
    }
}

#[derive(Clone, Debug)]
struct Candidate {
    board: RectifiedBoard,
    component: Component,
}

/// Default [`BoardLocator`].
#[derive(Clone, Debug, Default)]
pub struct GridLocator {
    pub params: LocatorParams,
}

impl GridLocator {
    pub fn new(params: LocatorParams) -> Self {
        Self { params }
    }

    /// Every component that passes the grid checks, best score first.
    fn candidates(&self, frame: &Frame) -> Vec<Candidate> {
        let img = frame.image();
        let (w, h) = (img.width, img.height);

        let (lo, hi) = img
            .data
            .iter()
            .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if (hi as f32 - lo as f32) < self.params.min_line_contrast {
            log::debug!("frame contrast {} below minimum", hi as i32 - lo as i32);
            return Vec::new();
        }

        let t = otsu_threshold(&img.data);
        let mask: Vec<bool> = img.data.iter().map(|&v| v <= t).collect();
        let min_side = (w.min(h) as f32 * self.params.min_board_frac).max(8.0);

        let mut out = Vec::new();
        for comp in connected_components(&mask, w, h) {
            let (bw, bh) = (comp.bbox_width() as f32, comp.bbox_height() as f32);
            if bw < min_side || bh < min_side {
                continue;
            }
            if bw.min(bh) / bw.max(bh) < self.params.min_aspect {
                continue;
            }
            if let Some(board) = self.rectify(img, comp.corners()) {
                log::debug!(
                    "grid candidate at ({:.1}, {:.1}) score {:.3}",
                    board.center_img().x,
                    board.center_img().y,
                    board.score
                );
                out.push(Candidate {
                    board,
                    component: comp,
                });
            }
        }
        out.sort_by(|a, b| b.board.score.total_cmp(&a.board.score));
        out
    }

    /// Warp a corner quad and score its inner grid lines.
    fn rectify(&self, img: &GrayImage, quad: [Point2<f32>; 4]) -> Option<RectifiedBoard> {
        if !is_convex(&quad) {
            return None;
        }
        let sides = side_lengths(&quad);
        let (s_min, s_max) = sides
            .iter()
            .fold((f32::MAX, 0.0f32), |(lo, hi), &s| (lo.min(s), hi.max(s)));
        if s_max <= 0.0 {
            return None;
        }
        let side_ratio = s_min / s_max;
        if side_ratio < self.params.min_aspect {
            return None;
        }

        let p = self.params.px_per_cell.max(4);
        let size = 3 * p;
        let s = size as f32;
        let rect = [
            Point2::new(0.0, 0.0),
            Point2::new(s, 0.0),
            Point2::new(s, s),
            Point2::new(0.0, s),
        ];
        let h_img_from_rect = homography_from_4pt(&rect, &quad)?;
        let warped = warp_perspective_gray(&img.view(), h_img_from_rect, size, size);

        let contrast = inner_line_contrast(&warped, p);
        if contrast < self.params.min_line_contrast {
            return None;
        }
        let score = (contrast / 255.0).clamp(0.0, 1.0) * side_ratio;
        Some(RectifiedBoard::from_square(warped, quad, score))
    }

    fn select(
        &self,
        frame: &Frame,
        candidates: Vec<Candidate>,
    ) -> Result<RectifiedBoard, LocatorError> {
        let best_score = match candidates.first() {
            Some(c) => c.board.score,
            None => return Err(LocatorError::NoGridFound),
        };

        // comparable and mutually disjoint, best first
        let mut comparable: Vec<Candidate> = Vec::new();
        for cand in candidates {
            if cand.board.score < best_score * self.params.ambiguity_ratio {
                break;
            }
            if comparable
                .iter()
                .all(|kept| !kept.component.overlaps(&cand.component))
            {
                comparable.push(cand);
            }
        }

        if comparable.len() > 1 {
            let center = Point2::new(frame.width() as f32 / 2.0, frame.height() as f32 / 2.0);
            let dist = |c: &Candidate| (quad_center(&c.board.corners_img) - center).norm();
            comparable.sort_by(|a, b| dist(a).total_cmp(&dist(b)));
            let gap = dist(&comparable[1]) - dist(&comparable[0]);
            if gap <= self.params.center_tie_px {
                log::debug!(
                    "{} comparable grids, center distance gap {gap:.1}px",
                    comparable.len()
                );
                return Err(LocatorError::AmbiguousGrid {
                    candidates: comparable.len(),
                });
            }
        }

        comparable
            .into_iter()
            .next()
            .map(|c| c.board)
            .ok_or(LocatorError::NoGridFound)
    }
}

impl BoardLocator for GridLocator {
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, frame), fields(width = frame.width(), height = frame.height()))
    )]
    fn locate(&self, frame: &Frame) -> Result<RectifiedBoard, LocatorError> {
        let candidates = self.candidates(frame);
        self.select(frame, candidates)
    }
}

fn side_lengths(q: &[Point2<f32>; 4]) -> [f32; 4] {
    std::array::from_fn(|i| (q[(i + 1) % 4] - q[i]).norm())
}

fn is_convex(q: &[Point2<f32>; 4]) -> bool {
    let mut sign = 0.0f32;
    for i in 0..4 {
        let a = q[i];
        let b = q[(i + 1) % 4];
        let c = q[(i + 2) % 4];
        let cross = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
        if cross.abs() < 1e-6 {
            return false;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}

/// Weakest paper-to-ink contrast over the four inner lines of a rectified
/// board with cells of `p` pixels.
///
/// Each line is scanned across a band of `±p/8` pixels; a line's level is
/// taken near the bright end of its per-position minima so that a line
/// broken over more than a fifth of its length scores as paper.
fn inner_line_contrast(rect: &GrayImage, p: usize) -> f32 {
    let size = rect.width.min(rect.height);
    if size < 3 * p || p == 0 {
        return 0.0;
    }

    let mut sorted = rect.data.clone();
    sorted.sort_unstable();
    let paper = sorted[(sorted.len() * 3) / 4] as f32;

    let band = (p / 8).max(2);
    let lo = size / 20;
    let hi = size - lo;

    let line_level = |mut minima: Vec<u8>| -> f32 {
        minima.sort_unstable_by(|a, b| b.cmp(a));
        minima.get(minima.len() / 5).map_or(paper, |&v| v as f32)
    };

    let mut weakest = f32::MAX;
    for line in [p, 2 * p] {
        let across = line.saturating_sub(band)..=(line + band).min(size - 1);
        let mut vertical = Vec::with_capacity(hi - lo);
        let mut horizontal = Vec::with_capacity(hi - lo);
        for along in lo..hi {
            let mut v_min = u8::MAX;
            let mut h_min = u8::MAX;
            for k in across.clone() {
                if let Some(v) = rect.get(k, along) {
                    v_min = v_min.min(v);
                }
                if let Some(v) = rect.get(along, k) {
                    h_min = h_min.min(v);
                }
            }
            vertical.push(v_min);
            horizontal.push(h_min);
        }
        weakest = weakest
            .min(paper - line_level(vertical))
            .min(paper - line_level(horizontal));
    }
    weakest.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn convexity() {
        let square = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
        ];
        assert!(is_convex(&square));
        let bowtie = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(10.0, 0.0),
            Point2::new(0.0, 10.0),
        ];
        assert!(!is_convex(&bowtie));
    }

    #[test]
    fn inner_lines_measured_against_paper() {
        let p = 20;
        let mut img = GrayImage::filled(3 * p, 3 * p, 220);
        for k in 0..3 * p {
            for line in [p, 2 * p] {
                img.set(line, k, 20);
                img.set(k, line, 20);
            }
        }
        assert_relative_eq!(inner_line_contrast(&img, p), 200.0, epsilon = 1e-3);

        let blank = GrayImage::filled(3 * p, 3 * p, 220);
        assert_eq!(inner_line_contrast(&blank, p), 0.0);
    }

    #[test]
    fn flat_frame_has_no_grid() {
        let frame = Frame::new(GrayImage::filled(64, 48, 200), Default::default()).unwrap();
        let err = GridLocator::default().locate(&frame).unwrap_err();
        assert_eq!(err, LocatorError::NoGridFound);
    }
}
