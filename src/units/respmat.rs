use std::sync::{atomic::Ordering, Arc};

use interface::{print_info, Update};
use nalgebra::DMatrix;

use crate::{state::Shared, ErrorCode, HardwareError, MeasureMode, Mode, OpMode};

/// Response matrix measurement unit
///
/// Measures the blocks of the response matrix selected by the measurement mode,
/// commits the assembled matrix and turns the SOFB off.
/// The measurement stops at the next actuator once interrupted.
pub struct RespMatMeasurement {
    shared: Arc<Shared>,
}

impl RespMatMeasurement {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Measures the blocks of `mode`, blocks not measured are left to zero
    fn measure(&self, mode: MeasureMode) -> Result<DMatrix<f64>, HardwareError> {
        let layout = self.shared.layout;
        let mut matrix = DMatrix::<f64>::zeros(layout.nr_rows(), layout.nr_corrs());
        for block in mode.0.blocks(&layout) {
            if self.shared.interrupt.load(Ordering::Acquire) {
                log::info!("response matrix measurement interrupted");
                break;
            }
            log::debug!("measuring response matrix block {block:?}");
            let measured = self
                .shared
                .machine
                .measure_response_matrix(&block, &self.shared.interrupt)?;
            let (nrows, ncols) = block.shape();
            if measured.shape() != (nrows, ncols) {
                return Err(HardwareError::Malformed {
                    expected: nrows * ncols,
                    found: measured.len(),
                });
            }
            matrix
                .view_mut((block.rows.start, block.cols.start), (nrows, ncols))
                .copy_from(&measured);
        }
        Ok(matrix)
    }
}

impl Update for RespMatMeasurement {
    fn update(&mut self) {
        let Some(mode) = self.shared.registers().measurement.active().copied() else {
            return;
        };
        log::info!("measuring the {} response matrix", mode.0);
        match self.measure(mode) {
            Ok(matrix) => {
                let flat = matrix.transpose().as_slice().to_vec();
                if let Err(e) = self.shared.engine_mut().set_response_matrix(&flat) {
                    print_info("measured response matrix refused", Some(&e));
                    self.shared.report((&e).into());
                }
            }
            Err(e) => {
                print_info("response matrix measurement failed", Some(&e));
                self.shared.report(ErrorCode::RespMatMeasurement);
            }
        }
        self.shared.transition(|registers| {
            registers.measurement = Mode::Idle;
            registers.op_mode = OpMode::Off;
            self.shared.interrupt.store(false, Ordering::Release);
        });
    }
}
