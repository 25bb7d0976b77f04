//! Facade crate for the `tictac-*` workspace.
//!
//! This crate provides:
//! - re-exports of the stage crates (`core`, `board`, `vision`, `actuator`)
//! - [`Pipeline`]: one frame through locate → classify → track → decide →
//!   dispatch, with the accepted board kept across frames
//! - [`Scheduler`]: fixed-interval runs with at most one in flight
//! - [`FrameSource`]s and the JSON [`PipelineConfig`]
//!
//! ## Quickstart
//!
//! ```no_run
//! use std::sync::Arc;
//! use tictac::{actuator::LogActuator, ImageSequenceSource, Pipeline, PipelineConfig, Scheduler};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = PipelineConfig::load_json("tictac.json")?;
//! let pipeline = Arc::new(Pipeline::from_config(&cfg, Arc::new(LogActuator)));
//! let source = ImageSequenceSource::open("frames/", false)?;
//! let stats = tictac::run_pipeline(&Scheduler::new(cfg.frame_interval()), source, pipeline).await;
//! println!("{} frames processed", stats.runs);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `tictac::core`: gray images, homographies, frames, logger.
//! - `tictac::board`: board state, tracker and move engine.
//! - `tictac::vision`: board locator, cell classifier, synthetic renderer.
//! - `tictac::actuator`: calibration table and actuator sinks.

pub use tictac_actuator as actuator;
pub use tictac_board as board;
pub use tictac_core as core;
pub use tictac_vision as vision;

pub use tictac_board::{BoardState, Decision, Move, MoveEngine, Outcome, Player};
pub use tictac_core::Frame;

mod config;
mod pipeline;
mod scheduler;
mod source;

pub use config::{ConfigError, PipelineConfig};
pub use pipeline::{
    detect_board, DetectionReport, FrameReport, Pipeline, PipelineError, PipelineParams,
};
pub use scheduler::{run_pipeline, RunStats, Scheduler, SingleSlot, SlotGuard, TickOutcome};
pub use source::{FrameSource, MemorySource, SourceError};

#[cfg(feature = "image")]
pub use source::{load_frame, save_gray, ImageSequenceSource};
