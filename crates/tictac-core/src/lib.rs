//! Core types and utilities for tic-tac-toe board vision.
//!
//! This crate is small and purely geometric: 8-bit gray images, bilinear
//! sampling, projective warps and the immutable [`Frame`] handed to the
//! pipeline. It knows nothing about boards, players or actuators.

mod frame;
mod homography;
mod image;
mod logger;
mod threshold;

pub use frame::{Frame, FrameError};
pub use homography::{homography_from_4pt, warp_perspective_gray, Homography};
pub use image::{sample_bilinear, sample_bilinear_u8, GrayImage, GrayImageView};
pub use threshold::{otsu_threshold, Histogram};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
