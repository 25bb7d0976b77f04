//! Synthetic board rendering.
//!
//! Draws a bordered 3×3 grid with X/O marks into a gray image, either
//! directly as a [`RectifiedBoard`] or projected onto an arbitrary quad of a
//! frame. Used by tests and by the CLI `render` command to produce input
//! data with known ground truth.

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use tictac_board::{BoardState, CellState};
use tictac_core::{homography_from_4pt, GrayImage};

use crate::board::RectifiedBoard;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("board corners are degenerate")]
    DegenerateCorners,
}

/// Drawing parameters. Widths are half-widths: grid lines in board units
/// (board side = 1), marks in cell units (cell side = 1).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderParams {
    pub paper: u8,
    pub ink: u8,
    pub line_half_width: f32,
    pub mark_half_width: f32,
    /// Distance of the X stroke ends from the cell edges.
    pub mark_margin: f32,
    pub ring_radius: f32,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            paper: 230,
            ink: 20,
            line_half_width: 0.02,
            mark_half_width: 0.07,
            mark_margin: 0.15,
            ring_radius: 0.28,
        }
    }
}

/// Axis-aligned square corners TL, TR, BR, BL.
pub fn square_corners(center: Point2<f32>, side: f32) -> [Point2<f32>; 4] {
    let h = side / 2.0;
    [
        Point2::new(center.x - h, center.y - h),
        Point2::new(center.x + h, center.y - h),
        Point2::new(center.x + h, center.y + h),
        Point2::new(center.x - h, center.y + h),
    ]
}

fn dist_to_segment(p: Point2<f32>, a: Point2<f32>, b: Point2<f32>) -> f32 {
    let ab: Vector2<f32> = b - a;
    let len2 = ab.norm_squared();
    if len2 <= f32::EPSILON {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

fn mark_ink(mark: CellState, s: f32, t: f32, params: &RenderParams) -> bool {
    let p = Point2::new(s, t);
    match mark {
        CellState::Empty => false,
        CellState::X => {
            let (lo, hi) = (params.mark_margin, 1.0 - params.mark_margin);
            let d1 = dist_to_segment(p, Point2::new(lo, lo), Point2::new(hi, hi));
            let d2 = dist_to_segment(p, Point2::new(hi, lo), Point2::new(lo, hi));
            d1.min(d2) <= params.mark_half_width
        }
        CellState::O => {
            let r = (s - 0.5).hypot(t - 0.5);
            (r - params.ring_radius).abs() <= params.mark_half_width
        }
    }
}

/// Gray value at board coordinates `(u, v)` in `[0, 1]²`.
fn shade(u: f32, v: f32, board: &BoardState, params: &RenderParams) -> u8 {
    let on_line = |w: f32| (0..=3).any(|k| (w - k as f32 / 3.0).abs() <= params.line_half_width);
    if on_line(u) || on_line(v) {
        return params.ink;
    }
    let col = ((u * 3.0) as usize).min(2);
    let row = ((v * 3.0) as usize).min(2);
    let s = u * 3.0 - col as f32;
    let t = v * 3.0 - row as f32;
    let mark = board.cells()[row * 3 + col];
    if mark_ink(mark, s, t, params) {
        params.ink
    } else {
        params.paper
    }
}

/// Render a board directly as a rectified, `3 * px_per_cell` square view.
pub fn render_rectified(
    px_per_cell: usize,
    board: &BoardState,
    params: &RenderParams,
) -> RectifiedBoard {
    let size = 3 * px_per_cell.max(1);
    let s = size as f32;
    let mut img = GrayImage::filled(size, size, params.paper);
    for y in 0..size {
        for x in 0..size {
            let u = (x as f32 + 0.5) / s;
            let v = (y as f32 + 0.5) / s;
            img.set(x, y, shade(u, v, board, params));
        }
    }
    let corners = [
        Point2::new(0.0, 0.0),
        Point2::new(s, 0.0),
        Point2::new(s, s),
        Point2::new(0.0, s),
    ];
    RectifiedBoard::from_square(img, corners, 1.0)
}

/// Draw `board` onto `img` so that its outer border spans `corners`
/// (TL, TR, BR, BL, continuous pixel coordinates).
pub fn render_board_into(
    img: &mut GrayImage,
    corners: &[Point2<f32>; 4],
    board: &BoardState,
    params: &RenderParams,
) -> Result<(), RenderError> {
    let unit = [
        Point2::new(0.0, 0.0),
        Point2::new(1.0, 0.0),
        Point2::new(1.0, 1.0),
        Point2::new(0.0, 1.0),
    ];
    let h_board_from_img =
        homography_from_4pt(corners, &unit).ok_or(RenderError::DegenerateCorners)?;

    let (min_x, min_y, max_x, max_y) = corners.iter().fold(
        (f32::MAX, f32::MAX, f32::MIN, f32::MIN),
        |(x0, y0, x1, y1), p| (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y)),
    );
    let x_lo = min_x.floor().max(0.0) as usize;
    let y_lo = min_y.floor().max(0.0) as usize;
    let x_hi = (max_x.ceil().max(0.0) as usize).min(img.width);
    let y_hi = (max_y.ceil().max(0.0) as usize).min(img.height);

    for y in y_lo..y_hi {
        for x in x_lo..x_hi {
            let b = h_board_from_img.apply(Point2::new(x as f32 + 0.5, y as f32 + 0.5));
            if (0.0..=1.0).contains(&b.x) && (0.0..=1.0).contains(&b.y) {
                img.set(x, y, shade(b.x, b.y, board, params));
            }
        }
    }
    Ok(())
}

/// Render a single board onto a uniform background.
pub fn render_frame(
    width: usize,
    height: usize,
    background: u8,
    corners: &[Point2<f32>; 4],
    board: &BoardState,
    params: &RenderParams,
) -> Result<GrayImage, RenderError> {
    let mut img = GrayImage::filled(width, height, background);
    render_board_into(&mut img, corners, board, params)?;
    Ok(img)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn border_spans_corners_exactly() {
        let corners = square_corners(Point2::new(50.0, 50.0), 60.0);
        let params = RenderParams::default();
        let img = render_frame(100, 100, 255, &corners, &BoardState::EMPTY, &params).unwrap();
        assert_eq!(img.get(20, 20), Some(20));
        assert_eq!(img.get(79, 79), Some(20));
        assert_eq!(img.get(19, 20), Some(255));
        assert_eq!(img.get(80, 79), Some(255));
        // cell interior stays paper
        assert_eq!(img.get(30, 30), Some(230));
    }

    #[test]
    fn marks_drawn_in_their_cells() {
        let board: BoardState = "X...O....".parse().unwrap();
        let rect = render_rectified(30, &board, &RenderParams::default());
        // X crosses at the center of cell 0, O leaves the center of cell 4 blank
        assert_eq!(rect.image.get(15, 15), Some(20));
        assert_eq!(rect.image.get(45, 45), Some(230));
        // O ring passes 0.28 cells right of the center of cell 4
        assert_eq!(rect.image.get(53, 45), Some(20));
    }

    #[test]
    fn collapsed_corners_rejected() {
        let p = Point2::new(5.0, 5.0);
        let mut img = GrayImage::filled(10, 10, 0);
        assert_eq!(
            render_board_into(&mut img, &[p; 4], &BoardState::EMPTY, &RenderParams::default()),
            Err(RenderError::DegenerateCorners)
        );
    }
}
