//! Actuator side of the pipeline.
//!
//! A chosen [`Move`](tictac_board::Move) becomes an [`ActuatorTarget`] (three
//! servo angles) through a [`CalibrationTable`], and an [`ActuatorSink`]
//! hands the target to the device. [`HttpActuator`] posts
//! `{"servo1", "servo2", "servo3"}` as JSON without blocking the caller.

mod calibration;
mod sink;

pub use calibration::{ActuatorTarget, CalibrationError, CalibrationTable, MAX_ANGLE};
pub use sink::{ActuatorSink, HttpActuator, LogActuator, TransportError};
