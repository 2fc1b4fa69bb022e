//! # Hardware interface
//!
//! The [Machine] trait is the boundary between the SOFB units and the
//! device layer: BPM readings, corrector kicks and response matrix measurement.

use std::{ops::Range, sync::atomic::AtomicBool};

use nalgebra::DMatrix;
use sofb_clients_respmat::Kicks;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HardwareError {
    #[error("device timed out")]
    Timeout,
    #[error("malformed data: expected {expected} values, found {found}")]
    Malformed { expected: usize, found: usize },
    #[error("device disconnected: {0}")]
    Disconnected(String),
}
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Block of the response matrix: BPM readings `rows` by actuators `cols`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementBlock {
    pub rows: Range<usize>,
    pub cols: Range<usize>,
}

impl MeasurementBlock {
    pub fn new(rows: Range<usize>, cols: Range<usize>) -> Self {
        Self { rows, cols }
    }
    /// Block shape `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.cols.len())
    }
}

/// Accelerator devices
pub trait Machine: Send + Sync {
    /// Reads the BPMs, horizontal readings first
    fn read_orbit(&self) -> Result<Vec<f64>>;
    /// Applies kicks increments to the correctors and to the RF
    fn apply_kicks(&self, kicks: &Kicks) -> Result<()>;
    /// Measures a block of the response matrix
    ///
    /// The measurement stops before the next actuator once `interrupt` is set
    /// and the actuators not measured are left with zero response.
    fn measure_response_matrix(
        &self,
        block: &MeasurementBlock,
        interrupt: &AtomicBool,
    ) -> Result<DMatrix<f64>>;
}
