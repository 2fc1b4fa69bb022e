use std::sync::{
    atomic::AtomicBool, Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard,
    RwLockWriteGuard,
};

use interface::{Data, Publish, Publisher};
use sofb_clients_io::{kicks, status};
use sofb_clients_respmat::{Layout, ResponseMatrix};

use crate::{
    units::OrbitBuffer, CorrectionMode, ErrorCode, Machine, MeasureMode, Mode, OpMode,
    ReferenceOrbit, SlotStore, VarUpdate,
};

/// SOFB mode registers and operation flags
#[derive(Debug, Clone, PartialEq)]
pub struct Registers {
    pub op_mode: OpMode,
    pub correction: Mode<CorrectionMode>,
    pub measurement: Mode<MeasureMode>,
    pub var_update: Mode<VarUpdate>,
    /// Continuous correction, a single pass otherwise
    pub auto_correct: bool,
    /// Coupled response matrix (`RespMatType`)
    pub coupled: bool,
    /// RF frequency correction (`RFreqEnbl`)
    pub rf_enabled: bool,
    pub strength_ch: f64,
    pub strength_cv: f64,
}

impl Registers {
    pub(crate) fn status(&self) -> Status {
        Status {
            op_mode: self.op_mode.code(),
            correction: self.correction.to_string(),
            measurement: self.measurement.to_string(),
            var_update: self.var_update.to_string(),
        }
    }
}

/// Published state of the mode registers
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Status {
    op_mode: i64,
    correction: String,
    measurement: String,
    var_update: String,
}

/// State shared by the dispatcher and the units
pub(crate) struct Shared {
    pub layout: Layout,
    pub registers: Mutex<Registers>,
    pub engine: RwLock<ResponseMatrix>,
    pub buffer: Mutex<OrbitBuffer>,
    pub reference: RwLock<ReferenceOrbit>,
    pub interrupt: AtomicBool,
    pub machine: Arc<dyn Machine>,
    pub publisher: Arc<dyn Publisher>,
    pub slots: SlotStore,
}

impl Shared {
    pub fn registers(&self) -> MutexGuard<'_, Registers> {
        self.registers.lock().unwrap_or_else(PoisonError::into_inner)
    }
    pub fn engine(&self) -> RwLockReadGuard<'_, ResponseMatrix> {
        self.engine.read().unwrap_or_else(PoisonError::into_inner)
    }
    pub fn engine_mut(&self) -> RwLockWriteGuard<'_, ResponseMatrix> {
        self.engine.write().unwrap_or_else(PoisonError::into_inner)
    }
    pub fn buffer(&self) -> MutexGuard<'_, OrbitBuffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
    pub fn reference(&self) -> RwLockReadGuard<'_, ReferenceOrbit> {
        self.reference.read().unwrap_or_else(PoisonError::into_inner)
    }
    pub fn reference_mut(&self) -> RwLockWriteGuard<'_, ReferenceOrbit> {
        self.reference.write().unwrap_or_else(PoisonError::into_inner)
    }
    /// Applies `f` to the registers and publishes the modes if they changed
    pub fn transition<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Registers) -> R,
    {
        let (result, before, after) = {
            let mut registers = self.registers();
            let before = registers.status();
            let result = f(&mut registers);
            (result, before, registers.status())
        };
        if before != after {
            self.publish_status(after);
        }
        result
    }
    pub fn publish_status(&self, status: Status) {
        let Status {
            op_mode,
            correction,
            measurement,
            var_update,
        } = status;
        self.publisher.send(Data::<status::OpMode>::new(op_mode));
        self.publisher.send(Data::<status::CorrMode>::new(correction));
        self.publisher
            .send(Data::<status::MeasRespMatMode>::new(measurement));
        self.publisher
            .send(Data::<status::VarUpdateMode>::new(var_update));
    }
    /// Publishes the flags and the strengths
    pub fn publish_flags(&self) {
        let registers = self.registers().clone();
        self.publisher
            .send(Data::<status::RFreqEnbl>::new(registers.rf_enabled));
        self.publisher
            .send(Data::<status::RespMatType>::new(registers.coupled as i64));
        self.publisher
            .send(Data::<kicks::StrthCH>::new(registers.strength_ch));
        self.publisher
            .send(Data::<kicks::StrthCV>::new(registers.strength_cv));
        self.publish_status(registers.status());
    }
    /// Publishes an error code
    pub fn report(&self, code: ErrorCode) {
        self.publisher
            .send(Data::<status::Error>::new(code.code() as i64));
    }
}
