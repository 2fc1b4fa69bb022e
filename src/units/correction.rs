use std::sync::Arc;

use interface::{print_info, Update};
use sofb_clients_respmat::Kicks;

use crate::{state::Shared, CorrectionMode, ErrorCode, Mode, OpMode, Planes, Selection};

/// Orbit correction unit
///
/// Each pass turns the averaged orbit error into kicks and applies them.
/// A manual correction runs a single pass.
pub struct OrbitCorrection {
    shared: Arc<Shared>,
}

impl OrbitCorrection {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Computes and applies the kicks of a correction pass
    fn pass(
        &self,
        selection: Selection,
        strength_ch: f64,
        strength_cv: f64,
    ) -> Result<Kicks, ErrorCode> {
        let orbit = self
            .shared
            .buffer()
            .average_orbit()
            .ok_or(ErrorCode::OrbitUnavailable)?;
        let error = self.shared.reference().error(&orbit);
        let nr_bpms = self.shared.layout.nr_bpms;
        let plane_error = |x: bool, y: bool| -> Vec<f64> {
            error
                .iter()
                .enumerate()
                .map(|(i, e)| {
                    if (i < nr_bpms && x) || (i >= nr_bpms && y) {
                        *e
                    } else {
                        0.
                    }
                })
                .collect()
        };

        let mut kicks = {
            let engine = self.shared.engine();
            match selection.planes {
                Planes::Uncoupled => {
                    let h = engine.calculate_kicks(&plane_error(true, false))?;
                    let v = engine.calculate_kicks(&plane_error(false, true))?;
                    Kicks {
                        ch: h.ch,
                        cv: v.cv,
                        rf: h.rf + v.rf,
                    }
                }
                planes => {
                    engine.calculate_kicks(&plane_error(planes.horizontal(), planes.vertical()))?
                }
            }
        };
        if !selection.horizontal() {
            kicks.ch.fill(0.);
        }
        if !selection.vertical() {
            kicks.cv.fill(0.);
        }
        if !selection.rf {
            kicks.rf = 0.;
        }
        let kicks = kicks.scale(strength_ch * 1e-2, strength_cv * 1e-2, strength_ch * 1e-2);

        self.shared.machine.apply_kicks(&kicks).map_err(|e| {
            print_info("kicks application failed", Some(&e));
            ErrorCode::KickApplication
        })?;
        Ok(kicks)
    }
}

impl OrbitCorrection {
    /// Ends a manual pass unless the continuous correction took over meanwhile
    fn single_pass_done(&self, mode: CorrectionMode) {
        self.shared.transition(|registers| {
            if registers.correction == Mode::Active(mode) && !registers.auto_correct {
                registers.correction = Mode::Idle;
            }
        });
    }
}

impl Update for OrbitCorrection {
    fn update(&mut self) {
        let (mode, auto_correct, strength_ch, strength_cv) = {
            let registers = self.shared.registers();
            match registers.correction.active() {
                Some(mode) => (
                    *mode,
                    registers.auto_correct,
                    registers.strength_ch,
                    registers.strength_cv,
                ),
                None => return,
            }
        };
        let CorrectionMode(selection) = mode;
        match self.pass(selection, strength_ch, strength_cv) {
            Ok(kicks) => {
                log::debug!("{selection} correction: {kicks}");
                if !auto_correct {
                    self.single_pass_done(mode);
                }
            }
            Err(ErrorCode::KickApplication) => {
                self.shared.report(ErrorCode::KickApplication);
                self.shared.transition(|registers| {
                    registers.correction = Mode::Idle;
                    registers.auto_correct = false;
                    registers.op_mode = OpMode::Off;
                });
            }
            Err(code) => {
                log::warn!("{selection} correction failed: {code}");
                self.shared.report(code);
                if !auto_correct {
                    self.single_pass_done(mode);
                }
            }
        }
    }
}
