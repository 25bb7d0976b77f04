//! Vision stages of the tic-tac-toe pipeline.
//!
//! - [`BoardLocator`]: finds the 3×3 grid in a [`Frame`](tictac_core::Frame)
//!   and produces a [`RectifiedBoard`]. [`GridLocator`] is the built-in
//!   implementation (Otsu ink mask, connected components, extreme-point
//!   corners, homography warp, inner-line contrast check).
//! - [`CellClassifier`]: labels the nine cells of a rectified board.
//!   [`StrokeClassifier`] matches each cell's ink against X and O templates.
//! - [`synthetic`]: renders boards into gray frames for tests and demos.
//!
//! Both stages are capability traits so the pipeline can be driven by any
//! implementation satisfying the same contract.

mod board;
mod classifier;
mod components;
mod locator;
pub mod synthetic;

pub use board::{BoardLocator, CellBounds, CellClassifier, RectifiedBoard};
pub use classifier::{ClassifierParams, StrokeClassifier};
pub use locator::{GridLocator, LocatorError, LocatorParams};
