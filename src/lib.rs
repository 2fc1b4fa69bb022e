//! # Slow orbit feedback
//!
//! The SOFB corrects the closed orbit of a storage ring with the pseudo-inverse
//! of the orbit [response matrix](sofb_clients_respmat::ResponseMatrix).
//!
//! [Sofb] owns the state shared by 4 units, each running in its own thread:
//!  1. [OrbitMeasurement] samples the BPMs and averages the orbit,
//!  2. [OrbitCorrection] turns the orbit error into corrector kicks,
//!  3. [RespMatMeasurement] measures the response matrix,
//!  4. [VariableUpdate] applies configuration changes.
//!
//! The units are coordinated by [Mode] registers written by the dispatcher:
//! [Sofb::set_op_mode], [Sofb::write] and the other setters.
//! The correction and the response matrix measurement exclude each other,
//! and no configuration change is accepted while either of them is active.
//! A request that cannot be admitted is refused with an [ErrorCode].
//!
//! The hardware is accessed through the [Machine] trait and the SOFB fields
//! are published with an [interface::Publisher].
//!
//! ```no_run
//! use std::sync::Arc;
//! use interface::Silent;
//! use sofb::{sim::LinearMachine, OpMode, Sofb, SofbConfig};
//!
//! let config = SofbConfig::builder();
//! let machine = Arc::new(LinearMachine::random(&config.layout, 7));
//! let sofb = Sofb::new(config, machine, Arc::new(Silent))?;
//! let _running = sofb.start()?;
//! sofb.set_op_mode(OpMode::MeasureRespMat)?;
//! # Ok::<(), sofb::SofbError>(())
//! ```

use std::{
    sync::{atomic::AtomicBool, Arc, Mutex, RwLock},
    time::Duration,
};

use interface::Publisher;
use nalgebra::DMatrix;
use sofb_clients_respmat::{Layout, ResponseMatrix};

mod config;
pub use config::{ConfigError, SofbConfig};
mod error;
pub use error::{ErrorCode, Result, SofbError};
mod hardware;
pub use hardware::{HardwareError, Machine, MeasurementBlock};
mod mode;
pub use mode::{
    Code, CorrectionMode, MeasureMode, Mode, OpMode, Plane, Planes, Selection, VarUpdate,
};
mod slots;
pub use slots::SlotStore;
mod state;
pub use state::Registers;
use state::Shared;
pub mod units;
pub use units::{
    OrbitBuffer, OrbitCorrection, OrbitMeasurement, ReferenceOrbit, RespMatMeasurement,
    VariableUpdate,
};
mod worker;
pub use worker::{Running, Worker};
mod dispatch;
pub mod sim;

pub use sofb_clients_opticscorr as opticscorr;
pub use sofb_clients_respmat as respmat;

/// Polling intervals of the units
#[derive(Debug, Clone, Copy)]
struct Intervals {
    orbit: Duration,
    correction: Duration,
    measurement: Duration,
    var_update: Duration,
}

/// Slow orbit feedback
pub struct Sofb {
    shared: Arc<Shared>,
    intervals: Intervals,
}

impl Sofb {
    /// Creates a new SOFB
    ///
    /// The response matrix is loaded from [SofbConfig::respmat_path] if the file exists
    pub fn new(
        config: SofbConfig,
        machine: Arc<dyn Machine>,
        publisher: Arc<dyn Publisher>,
    ) -> Result<Self> {
        let config = config.validate()?;
        let layout = config.layout;
        let mut builder = ResponseMatrix::builder()
            .layout(layout)
            .num_sing_values(config.num_sing_values.unwrap_or(layout.nr_corrs()))
            .shared_publisher(publisher.clone());
        if let Some(path) = config.respmat_path.as_ref() {
            builder = builder.path(path);
        }
        let engine = builder.build();

        let registers = Registers {
            op_mode: OpMode::Off,
            correction: Mode::Idle,
            measurement: Mode::Idle,
            var_update: Mode::Idle,
            auto_correct: false,
            coupled: config.coupled,
            rf_enabled: config.rf_enabled,
            strength_ch: config.strength_ch,
            strength_cv: config.strength_cv,
        };
        let shared = Arc::new(Shared {
            layout,
            registers: Mutex::new(registers),
            engine: RwLock::new(engine),
            buffer: Mutex::new(OrbitBuffer::new(config.buffer_capacity, config.n_samples)),
            reference: RwLock::new(ReferenceOrbit::zeros(layout.nr_bpms)),
            interrupt: AtomicBool::new(false),
            machine,
            publisher,
            slots: SlotStore::new(&config.slots_dir),
        });
        let sofb = Self {
            shared,
            intervals: Intervals {
                orbit: Duration::from_millis(config.orbit_interval_ms),
                correction: Duration::from_millis(config.correction_interval_ms),
                measurement: Duration::from_millis(config.measurement_interval_ms),
                var_update: Duration::from_millis(config.var_update_interval_ms),
            },
        };
        sofb.publish();
        log::info!("SOFB ready: {layout}");
        Ok(sofb)
    }

    /// Publishes the complete SOFB state
    pub fn publish(&self) {
        self.shared.engine().publish();
        self.shared.publish_flags();
    }

    pub fn orbit_measurement(&self) -> OrbitMeasurement {
        OrbitMeasurement::new(self.shared.clone())
    }
    pub fn orbit_correction(&self) -> OrbitCorrection {
        OrbitCorrection::new(self.shared.clone())
    }
    pub fn respmat_measurement(&self) -> RespMatMeasurement {
        RespMatMeasurement::new(self.shared.clone())
    }
    pub fn variable_update(&self) -> VariableUpdate {
        VariableUpdate::new(self.shared.clone())
    }

    /// Starts the units threads
    pub fn start(&self) -> Result<Running> {
        let Intervals {
            orbit,
            correction,
            measurement,
            var_update,
        } = self.intervals;
        Running::spawn(vec![
            Worker::new("sofb-orbit", orbit, self.orbit_measurement()),
            Worker::new("sofb-correction", correction, self.orbit_correction()),
            Worker::new("sofb-respmat", measurement, self.respmat_measurement()),
            Worker::new("sofb-varupdate", var_update, self.variable_update()),
        ])
    }

    pub fn layout(&self) -> &Layout {
        &self.shared.layout
    }
    /// Returns a copy of the mode registers
    pub fn registers(&self) -> Registers {
        self.shared.registers().clone()
    }
    pub fn op_mode(&self) -> OpMode {
        self.shared.registers().op_mode
    }
    pub fn correction_mode(&self) -> Mode<CorrectionMode> {
        self.shared.registers().correction.clone()
    }
    pub fn measurement_mode(&self) -> Mode<MeasureMode> {
        self.shared.registers().measurement.clone()
    }
    pub fn var_update_mode(&self) -> Mode<VarUpdate> {
        self.shared.registers().var_update.clone()
    }
    /// Averaged orbit
    pub fn average_orbit(&self) -> Option<Vec<f64>> {
        self.shared.buffer().average_orbit()
    }
    pub fn reference_orbit(&self) -> ReferenceOrbit {
        self.shared.reference().clone()
    }
    /// Runs `f` with the response matrix
    pub fn with_response_matrix<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&ResponseMatrix) -> R,
    {
        f(&self.shared.engine())
    }
    pub fn response_matrix(&self) -> DMatrix<f64> {
        self.shared.engine().response_matrix().clone()
    }
    pub fn slots(&self) -> &SlotStore {
        &self.shared.slots
    }
}
