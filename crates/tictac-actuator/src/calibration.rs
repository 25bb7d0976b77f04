use serde::{Deserialize, Serialize};

use tictac_board::{Move, CELL_COUNT};

/// Largest servo angle in degrees.
pub const MAX_ANGLE: u16 = 180;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CalibrationError {
    #[error("servo{servo} angle {angle} is outside 0..=180")]
    AngleOutOfRange { servo: u8, angle: u16 },
}

#[derive(Deserialize)]
struct RawTarget {
    servo1: u16,
    servo2: u16,
    servo3: u16,
}

/// Servo angles in degrees, each in `0..=180`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawTarget")]
pub struct ActuatorTarget {
    pub servo1: u8,
    pub servo2: u8,
    pub servo3: u8,
}

impl ActuatorTarget {
    pub fn new(servo1: u16, servo2: u16, servo3: u16) -> Result<Self, CalibrationError> {
        let check = |servo: u8, angle: u16| {
            if angle > MAX_ANGLE {
                Err(CalibrationError::AngleOutOfRange { servo, angle })
            } else {
                Ok(angle as u8)
            }
        };
        Ok(Self {
            servo1: check(1, servo1)?,
            servo2: check(2, servo2)?,
            servo3: check(3, servo3)?,
        })
    }
}

impl TryFrom<RawTarget> for ActuatorTarget {
    type Error = CalibrationError;

    fn try_from(raw: RawTarget) -> Result<Self, Self::Error> {
        ActuatorTarget::new(raw.servo1, raw.servo2, raw.servo3)
    }
}

/// Pre-calibrated angle triple per cell, row-major.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalibrationTable {
    targets: [ActuatorTarget; CELL_COUNT],
}

impl Default for CalibrationTable {
    /// Base sweeps 60/90/120 across columns; shoulder and elbow reach
    /// further for rows closer to the arm.
    fn default() -> Self {
        const BASE: [u8; 3] = [60, 90, 120];
        const SHOULDER: [u8; 3] = [70, 90, 110];
        const ELBOW: [u8; 3] = [150, 130, 110];
        Self {
            targets: std::array::from_fn(|idx| {
                let (row, col) = (idx / 3, idx % 3);
                ActuatorTarget {
                    servo1: BASE[col],
                    servo2: SHOULDER[row],
                    servo3: ELBOW[row],
                }
            }),
        }
    }
}

impl CalibrationTable {
    pub fn new(targets: [ActuatorTarget; CELL_COUNT]) -> Self {
        Self { targets }
    }

    /// Build from raw angle triples, validating every angle.
    pub fn from_angles(angles: [[u16; 3]; CELL_COUNT]) -> Result<Self, CalibrationError> {
        let mut targets = [ActuatorTarget {
            servo1: 0,
            servo2: 0,
            servo3: 0,
        }; CELL_COUNT];
        for (slot, [a, b, c]) in targets.iter_mut().zip(angles) {
            *slot = ActuatorTarget::new(a, b, c)?;
        }
        Ok(Self { targets })
    }

    pub fn targets(&self) -> &[ActuatorTarget; CELL_COUNT] {
        &self.targets
    }

    /// Angle triple for the move's cell.
    ///
    /// Defined for every move: [`Move::new`] only admits cells `0..9`, and an
    /// out-of-range index from a hand-built `Move` wraps modulo 9.
    pub fn to_target(&self, mv: Move) -> ActuatorTarget {
        self.targets[mv.cell_index % CELL_COUNT]
    }
}
