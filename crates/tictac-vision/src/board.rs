use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use tictac_board::{CellObservation, CELL_COUNT};
use tictac_core::{Frame, GrayImage};

use crate::locator::LocatorError;

/// Axis-aligned cell region in rectified pixels, `[x0, x1) × [y0, y1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellBounds {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl CellBounds {
    pub fn width(&self) -> usize {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> usize {
        self.y1.saturating_sub(self.y0)
    }

    /// Shrink by `frac` of the width/height on every side.
    pub fn inset(&self, frac: f32) -> CellBounds {
        let dx = (self.width() as f32 * frac).round() as usize;
        let dy = (self.height() as f32 * frac).round() as usize;
        CellBounds {
            x0: (self.x0 + dx).min(self.x1),
            y0: (self.y0 + dy).min(self.y1),
            x1: self.x1.saturating_sub(dx).max(self.x0),
            y1: self.y1.saturating_sub(dy).max(self.y0),
        }
    }
}

/// Top-down view of a located board.
#[derive(Clone, Debug)]
pub struct RectifiedBoard {
    /// Square gray image, `3 * px_per_cell` on a side.
    pub image: GrayImage,
    /// Row-major cell regions evenly partitioning `image`.
    pub cell_bounds: [CellBounds; CELL_COUNT],
    /// Board corners in the source frame: TL, TR, BR, BL.
    pub corners_img: [Point2<f32>; 4],
    /// Detection score in `[0, 1]`.
    pub score: f32,
}

impl RectifiedBoard {
    /// Build from a square rectified image split into a 3×3 partition.
    pub fn from_square(image: GrayImage, corners_img: [Point2<f32>; 4], score: f32) -> Self {
        let side = image.width.min(image.height);
        let edges = [0, side / 3, 2 * side / 3, side];
        let cell_bounds = std::array::from_fn(|idx| {
            let (row, col) = (idx / 3, idx % 3);
            CellBounds {
                x0: edges[col],
                y0: edges[row],
                x1: edges[col + 1],
                y1: edges[row + 1],
            }
        });
        Self {
            image,
            cell_bounds,
            corners_img,
            score,
        }
    }

    /// Centroid of the four image-space corners.
    pub fn center_img(&self) -> Point2<f32> {
        quad_center(&self.corners_img)
    }
}

pub(crate) fn quad_center(q: &[Point2<f32>; 4]) -> Point2<f32> {
    let (sx, sy) = q.iter().fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Point2::new(sx / 4.0, sy / 4.0)
}

/// Finds the board in a frame.
pub trait BoardLocator {
    fn locate(&self, frame: &Frame) -> Result<RectifiedBoard, LocatorError>;
}

/// Labels the nine cells of a rectified board. Never fails.
pub trait CellClassifier {
    fn classify(&self, board: &RectifiedBoard) -> [CellObservation; CELL_COUNT];
}

impl<T: BoardLocator + ?Sized> BoardLocator for Box<T> {
    fn locate(&self, frame: &Frame) -> Result<RectifiedBoard, LocatorError> {
        (**self).locate(frame)
    }
}

impl<T: CellClassifier + ?Sized> CellClassifier for Box<T> {
    fn classify(&self, board: &RectifiedBoard) -> [CellObservation; CELL_COUNT] {
        (**self).classify(board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_partition_square() {
        let board = RectifiedBoard::from_square(
            GrayImage::filled(144, 144, 255),
            [Point2::origin(); 4],
            1.0,
        );
        assert_eq!(
            board.cell_bounds[0],
            CellBounds {
                x0: 0,
                y0: 0,
                x1: 48,
                y1: 48
            }
        );
        assert_eq!(
            board.cell_bounds[5],
            CellBounds {
                x0: 96,
                y0: 48,
                x1: 144,
                y1: 96
            }
        );
        let area: usize = board
            .cell_bounds
            .iter()
            .map(|c| c.width() * c.height())
            .sum();
        assert_eq!(area, 144 * 144);
    }

    #[test]
    fn inset_shrinks_symmetrically() {
        let c = CellBounds {
            x0: 0,
            y0: 0,
            x1: 50,
            y1: 50,
        };
        let i = c.inset(0.1);
        assert_eq!((i.x0, i.y0, i.x1, i.y1), (5, 5, 45, 45));
    }
}
