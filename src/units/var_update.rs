use std::sync::Arc;

use interface::{print_info, Data, Publish, Update};
use sofb_clients_io::orbit;
use sofb_clients_respmat::DeviceClass;

use crate::{state::Shared, Code, ErrorCode, Mode, Plane, VarUpdate};

/// Variable update unit
///
/// Performs the configuration action of the register, then goes idle and
/// releases the correction or the measurement waiting for it.
pub struct VariableUpdate {
    shared: Arc<Shared>,
}

impl VariableUpdate {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    fn set_reference(&self, plane: Plane, values: Vec<f64>) -> Result<(), ErrorCode> {
        self.shared.reference_mut().set(plane, values.clone())?;
        match plane {
            Plane::Horizontal => self
                .shared
                .publisher
                .send(Data::<orbit::RefOrbX>::new(values)),
            Plane::Vertical => self
                .shared
                .publisher
                .send(Data::<orbit::RefOrbY>::new(values)),
        }
        Ok(())
    }

    /// Enables or disables a device, BPMs and correctors are numbered across classes
    fn set_enabled(
        &self,
        classes: &[DeviceClass],
        index: usize,
        enabled: bool,
    ) -> Result<(), ErrorCode> {
        let layout = self.shared.layout;
        let mut offset = 0;
        for &class in classes {
            let n = layout.len(class);
            if index < offset + n {
                self.shared
                    .engine_mut()
                    .set_enabled(class, index - offset, enabled)?;
                return Ok(());
            }
            offset += n;
        }
        Err(ErrorCode::InvalidValue)
    }

    /// Performs a configuration action
    pub(crate) fn apply(&self, action: VarUpdate) -> Result<(), ErrorCode> {
        let layout = self.shared.layout;
        let slot_error = |e: interface::filing::FilingError| {
            print_info("slot unavailable", Some(&e));
            ErrorCode::SlotUnavailable
        };
        const BPMS: [DeviceClass; 2] = [DeviceClass::BpmX, DeviceClass::BpmY];
        const CORRS: [DeviceClass; 3] = [DeviceClass::Ch, DeviceClass::Cv, DeviceClass::Rf];
        match action {
            VarUpdate::RespMatSlot(slot) => {
                let flat = self
                    .shared
                    .slots
                    .load_respmat(slot, &layout)
                    .map_err(slot_error)?;
                self.shared.engine_mut().set_response_matrix(&flat)?;
            }
            VarUpdate::RefOrbXSlot(slot) => {
                let values = self
                    .shared
                    .slots
                    .load_reforb(Plane::Horizontal, slot, layout.nr_bpms)
                    .map_err(slot_error)?;
                self.set_reference(Plane::Horizontal, values)?;
            }
            VarUpdate::RefOrbYSlot(slot) => {
                let values = self
                    .shared
                    .slots
                    .load_reforb(Plane::Vertical, slot, layout.nr_bpms)
                    .map_err(slot_error)?;
                self.set_reference(Plane::Vertical, values)?;
            }
            VarUpdate::RefOrbX(values) => self.set_reference(Plane::Horizontal, values)?,
            VarUpdate::RefOrbY(values) => self.set_reference(Plane::Vertical, values)?,
            VarUpdate::RespMat(flat) => self.shared.engine_mut().set_response_matrix(&flat)?,
            VarUpdate::EnblListBPM(mask) => {
                let n = layout.nr_bpms.min(mask.len());
                let (x, y) = mask.split_at(n);
                self.shared
                    .engine_mut()
                    .set_enable_masks(&[(DeviceClass::BpmX, x), (DeviceClass::BpmY, y)])?;
            }
            VarUpdate::EnblListCH(mask) => self
                .shared
                .engine_mut()
                .set_enable_mask(DeviceClass::Ch, &mask)?,
            VarUpdate::EnblListCV(mask) => self
                .shared
                .engine_mut()
                .set_enable_mask(DeviceClass::Cv, &mask)?,
            VarUpdate::NumSingValues(n) => self.shared.engine_mut().set_num_sing_values(n)?,
            VarUpdate::AddBPM(index) => self.set_enabled(&BPMS, index, true)?,
            VarUpdate::RmvBPM(index) => self.set_enabled(&BPMS, index, false)?,
            VarUpdate::AddCorr(index) => self.set_enabled(&CORRS, index, true)?,
            VarUpdate::RmvCorr(index) => self.set_enabled(&CORRS, index, false)?,
            VarUpdate::EnblRF(enabled) => self
                .shared
                .engine_mut()
                .set_enable_mask(DeviceClass::Rf, &[enabled])?,
        }
        Ok(())
    }
}

impl Update for VariableUpdate {
    fn update(&mut self) {
        let Some(action) = self.shared.registers().var_update.active().cloned() else {
            return;
        };
        let code = action.code();
        if let Err(e) = self.apply(action) {
            log::warn!("variable update {code} failed: {e}");
            self.shared.report(e);
        } else {
            log::debug!("variable update {code} done");
        }
        self.shared.transition(|registers| {
            registers.var_update = Mode::Idle;
            registers.correction = std::mem::take(&mut registers.correction).release();
            registers.measurement = std::mem::take(&mut registers.measurement).release();
        });
    }
}
