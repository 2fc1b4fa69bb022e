//! Admission control of the mode registers and of the SOFB fields

use std::sync::atomic::Ordering;

use interface::{Data, Publish, Value};
use sofb_clients_io::{kicks, orbit, status};

use crate::{
    Code, CorrectionMode, ErrorCode, MeasureMode, Mode, OpMode, Plane, Planes, Selection, Sofb,
    VarUpdate,
};

type Outcome = std::result::Result<(), ErrorCode>;

fn int(value: &Value) -> Result<i64, ErrorCode> {
    value.as_int().ok_or(ErrorCode::InvalidValue)
}
fn index(value: &Value) -> Result<usize, ErrorCode> {
    usize::try_from(int(value)?).map_err(|_| ErrorCode::InvalidValue)
}
fn boolean(value: &Value) -> Result<bool, ErrorCode> {
    value.as_bool().ok_or(ErrorCode::InvalidValue)
}
fn float(value: &Value) -> Result<f64, ErrorCode> {
    value.as_float().ok_or(ErrorCode::InvalidValue)
}
fn floats(value: &Value) -> Result<Vec<f64>, ErrorCode> {
    value
        .as_floats()
        .map(|x| x.to_vec())
        .ok_or(ErrorCode::InvalidValue)
}
fn bools(value: &Value) -> Result<Vec<bool>, ErrorCode> {
    value.as_bools().ok_or(ErrorCode::InvalidValue)
}

impl Sofb {
    /// Publishes and logs a refusal
    fn outcome(&self, request: &str, outcome: Outcome) -> Outcome {
        if let Err(code) = outcome {
            log::warn!("{request} refused: {code} ({})", code.code());
            self.shared.report(code);
        }
        outcome
    }

    /// Writes a SOFB field
    ///
    /// The value is converted to the type of the field, a value of the wrong type
    /// or an unknown field is refused with [ErrorCode::InvalidValue].
    pub fn write(&self, field: &str, value: Value) -> Outcome {
        let outcome = self.try_write(field, &value);
        self.outcome(&format!("{field} <- {value}"), outcome)
    }

    fn try_write(&self, field: &str, value: &Value) -> Outcome {
        match field {
            "OpMode" => {
                let op_mode = OpMode::from_code(int(value)?).ok_or(ErrorCode::InvalidValue)?;
                self.try_set_op_mode(op_mode)
            }
            "ManCorrTrig" => self.try_manual_correction(int(value)?),
            "RespMatSlot" => self.try_update(VarUpdate::RespMatSlot(index(value)?)),
            "RefOrbXSlot" => self.try_update(VarUpdate::RefOrbXSlot(index(value)?)),
            "RefOrbYSlot" => self.try_update(VarUpdate::RefOrbYSlot(index(value)?)),
            "RefOrbX" => self.try_update(VarUpdate::RefOrbX(floats(value)?)),
            "RefOrbY" => self.try_update(VarUpdate::RefOrbY(floats(value)?)),
            "RespMat" => self.try_update(VarUpdate::RespMat(floats(value)?)),
            "EnblListBPM" => self.try_update(VarUpdate::EnblListBPM(bools(value)?)),
            "EnblListCH" => self.try_update(VarUpdate::EnblListCH(bools(value)?)),
            "EnblListCV" => self.try_update(VarUpdate::EnblListCV(bools(value)?)),
            "NumSingValues" => self.try_update(VarUpdate::NumSingValues(index(value)?)),
            "AddBPM" => self.try_update(VarUpdate::AddBPM(index(value)?)),
            "RmvBPM" => self.try_update(VarUpdate::RmvBPM(index(value)?)),
            "AddCorr" => self.try_update(VarUpdate::AddCorr(index(value)?)),
            "RmvCorr" => self.try_update(VarUpdate::RmvCorr(index(value)?)),
            "EnblRF" => self.try_update(VarUpdate::EnblRF(boolean(value)?)),
            "NrSpl" => self.try_set_nr_spl(index(value)?),
            "StrthCH" => self.try_set_strength(Plane::Horizontal, float(value)?),
            "StrthCV" => self.try_set_strength(Plane::Vertical, float(value)?),
            "RFreqEnbl" => {
                self.set_flags(None, Some(boolean(value)?));
                Ok(())
            }
            "RespMatType" => match int(value)? {
                0 => {
                    self.set_flags(Some(false), None);
                    Ok(())
                }
                1 => {
                    self.set_flags(Some(true), None);
                    Ok(())
                }
                _ => Err(ErrorCode::InvalidValue),
            },
            _ => Err(ErrorCode::InvalidValue),
        }
    }

    /// Sets the operation mode
    ///
    ///  - [OpMode::Off]: interrupts the response matrix measurement and stops the correction
    ///  - [OpMode::Correct]: starts the continuous correction, refused while measuring
    ///  - [OpMode::MeasureRespMat]: starts the response matrix measurement,
    ///    refused while correcting or while a measurement is still running
    ///
    /// The correction or the measurement wait for the completion of an ongoing variable update.
    pub fn set_op_mode(&self, op_mode: OpMode) -> Outcome {
        let outcome = self.try_set_op_mode(op_mode);
        self.outcome(&format!("OpMode <- {op_mode:?}"), outcome)
    }

    fn try_set_op_mode(&self, op_mode: OpMode) -> Outcome {
        self.shared.transition(|registers| {
            match op_mode {
                OpMode::Off => {
                    match registers.measurement {
                        Mode::Active(_) => self.shared.interrupt.store(true, Ordering::Release),
                        Mode::Waiting(_) => registers.measurement = Mode::Idle,
                        Mode::Idle => (),
                    }
                    registers.correction = Mode::Idle;
                    registers.auto_correct = false;
                }
                OpMode::Correct => {
                    if !registers.measurement.is_idle() {
                        return Err(ErrorCode::MeasuringRespMat);
                    }
                    let mode = CorrectionMode(Selection::from_flags(
                        registers.coupled,
                        registers.rf_enabled,
                    ));
                    registers.correction = if registers.var_update.is_idle() {
                        Mode::Active(mode)
                    } else {
                        Mode::Waiting(mode)
                    };
                    registers.auto_correct = true;
                }
                OpMode::MeasureRespMat => {
                    if !registers.correction.is_idle() {
                        return Err(ErrorCode::Correcting);
                    }
                    if !registers.measurement.is_idle() {
                        return Err(ErrorCode::MeasuringRespMat);
                    }
                    let mode = MeasureMode(Selection::from_flags(
                        registers.coupled,
                        registers.rf_enabled,
                    ));
                    self.shared.interrupt.store(false, Ordering::Release);
                    registers.measurement = if registers.var_update.is_idle() {
                        Mode::Active(mode)
                    } else {
                        Mode::Waiting(mode)
                    };
                }
            }
            registers.op_mode = op_mode;
            Ok(())
        })
    }

    /// Triggers a single correction pass
    ///
    /// `0`: horizontal, `1`: vertical, `2`: planes set by the response matrix type and RF flags
    pub fn manual_correction(&self, trigger: i64) -> Outcome {
        let outcome = self.try_manual_correction(trigger);
        self.outcome(&format!("ManCorrTrig <- {trigger}"), outcome)
    }

    fn try_manual_correction(&self, trigger: i64) -> Outcome {
        self.shared.transition(|registers| {
            if !registers.correction.is_idle() {
                return Err(ErrorCode::Correcting);
            }
            if !registers.measurement.is_idle() {
                return Err(ErrorCode::MeasuringRespMat);
            }
            let selection = match trigger {
                0 => Selection::new(Planes::Horizontal, false),
                1 => Selection::new(Planes::Vertical, false),
                2 => Selection::from_flags(registers.coupled, registers.rf_enabled),
                _ => return Err(ErrorCode::InvalidValue),
            };
            let mode = CorrectionMode(selection);
            registers.correction = if registers.var_update.is_idle() {
                Mode::Active(mode)
            } else {
                Mode::Waiting(mode)
            };
            registers.auto_correct = false;
            Ok(())
        })
    }

    /// Requests a configuration change to the variable update unit
    ///
    /// Refused with [ErrorCode::ConfigurationBusy] while correcting, measuring
    /// or if another configuration change is in progress
    pub fn request_update(&self, action: VarUpdate) -> Outcome {
        let request = format!("variable update {}", action.code());
        let outcome = self.try_update(action);
        self.outcome(&request, outcome)
    }

    /// Checks the action arguments before any state change
    fn validate(&self, action: &VarUpdate) -> Outcome {
        let layout = self.shared.layout;
        let check = |ok: bool, code: ErrorCode| if ok { Ok(()) } else { Err(code) };
        match action {
            VarUpdate::RefOrbX(values) | VarUpdate::RefOrbY(values) => {
                check(values.len() == layout.nr_bpms, ErrorCode::WrongSize)
            }
            VarUpdate::RespMat(values) => {
                check(values.len() == layout.size(), ErrorCode::WrongSize)
            }
            VarUpdate::NumSingValues(n) => check(
                (1..=layout.nr_corrs()).contains(n),
                ErrorCode::SingValuesOutOfRange,
            ),
            VarUpdate::AddBPM(i) | VarUpdate::RmvBPM(i) => {
                check(*i < layout.nr_rows(), ErrorCode::InvalidValue)
            }
            VarUpdate::AddCorr(i) | VarUpdate::RmvCorr(i) => {
                check(*i < layout.nr_corrs(), ErrorCode::InvalidValue)
            }
            _ => Ok(()),
        }
    }

    fn try_update(&self, action: VarUpdate) -> Outcome {
        self.validate(&action)?;
        self.shared.transition(|registers| {
            if registers.correction.is_active()
                || registers.measurement.is_active()
                || !registers.var_update.is_idle()
            {
                return Err(ErrorCode::ConfigurationBusy);
            }
            registers.var_update = Mode::Active(action);
            Ok(())
        })
    }

    /// Sets the number of orbit samples averaged
    pub fn set_nr_spl(&self, n_samples: usize) -> Outcome {
        let outcome = self.try_set_nr_spl(n_samples);
        self.outcome(&format!("NrSpl <- {n_samples}"), outcome)
    }

    fn try_set_nr_spl(&self, n_samples: usize) -> Outcome {
        self.shared.buffer().set_n_samples(n_samples)?;
        self.shared
            .publisher
            .send(Data::<orbit::NrSpl>::new(n_samples));
        Ok(())
    }

    /// Sets the correction strength `[%]` of a plane
    ///
    /// Refused unless the operation mode is [OpMode::Off]
    pub fn set_strength(&self, plane: Plane, strength: f64) -> Outcome {
        let outcome = self.try_set_strength(plane, strength);
        self.outcome(&format!("{plane:?} strength <- {strength}"), outcome)
    }

    fn try_set_strength(&self, plane: Plane, strength: f64) -> Outcome {
        {
            let mut registers = self.shared.registers();
            if registers.op_mode != OpMode::Off {
                return Err(ErrorCode::NotIdle);
            }
            if !(0f64..=100f64).contains(&strength) {
                return Err(ErrorCode::WeightOutOfBounds);
            }
            match plane {
                Plane::Horizontal => registers.strength_ch = strength,
                Plane::Vertical => registers.strength_cv = strength,
            }
        }
        match plane {
            Plane::Horizontal => self
                .shared
                .publisher
                .send(Data::<kicks::StrthCH>::new(strength)),
            Plane::Vertical => self
                .shared
                .publisher
                .send(Data::<kicks::StrthCV>::new(strength)),
        }
        Ok(())
    }

    /// Sets the response matrix type (`RespMatType`) and the RF frequency correction (`RFreqEnbl`)
    pub fn set_flags(&self, coupled: Option<bool>, rf_enabled: Option<bool>) {
        let (coupled, rf_enabled) = {
            let mut registers = self.shared.registers();
            if let Some(coupled) = coupled {
                registers.coupled = coupled;
            }
            if let Some(rf_enabled) = rf_enabled {
                registers.rf_enabled = rf_enabled;
            }
            (registers.coupled, registers.rf_enabled)
        };
        self.shared
            .publisher
            .send(Data::<status::RespMatType>::new(coupled as i64));
        self.shared
            .publisher
            .send(Data::<status::RFreqEnbl>::new(rf_enabled));
    }
}
