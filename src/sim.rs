//! # Linear machine model
//!
//! [LinearMachine] is a [Machine] whose orbit is a linear function of the actuators:
//! `orbit = R * kicks + offset + noise`.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, PoisonError,
    },
    thread,
    time::Duration,
};

use nalgebra::{DMatrix, DVector};
use rand::{rngs::StdRng, Rng, SeedableRng};
use sofb_clients_respmat::{Kicks, Layout};

use crate::{hardware::Result, HardwareError, Machine, MeasurementBlock};

struct State {
    actuators: DVector<f64>,
    rng: StdRng,
}

/// Simulated ring
pub struct LinearMachine {
    response: DMatrix<f64>,
    offset: DVector<f64>,
    noise: f64,
    column_delay: Duration,
    kick_failure: AtomicBool,
    disconnected: AtomicBool,
    state: Mutex<State>,
}

impl LinearMachine {
    /// Creates a machine with a given response matrix `(2*nr_bpms, nr_corrs)`
    pub fn new(response: DMatrix<f64>) -> Self {
        let (nrows, ncols) = response.shape();
        Self {
            response,
            offset: DVector::zeros(nrows),
            noise: 0.,
            column_delay: Duration::ZERO,
            kick_failure: AtomicBool::new(false),
            disconnected: AtomicBool::new(false),
            state: Mutex::new(State {
                actuators: DVector::zeros(ncols),
                rng: StdRng::seed_from_u64(0),
            }),
        }
    }
    /// Creates a machine with a random response matrix and a random orbit offset
    ///
    /// The RF column is a dispersion-like response of the horizontal BPMs only.
    pub fn random(layout: &Layout, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let nr_bpms = layout.nr_bpms;
        let rf = layout.rf_col();
        let response = DMatrix::from_fn(layout.nr_rows(), layout.nr_corrs(), |i, j| {
            let x = rng.gen_range(-1f64..1f64);
            match (i < nr_bpms, j) {
                (true, j) if layout.ch_cols().contains(&j) => x,
                (false, j) if layout.cv_cols().contains(&j) => x,
                (true, j) if j == rf => 5. + x,
                (false, j) if j == rf => 0.,
                _ => 0.05 * x,
            }
        });
        let offset = DVector::from_fn(layout.nr_rows(), |_, _| rng.gen_range(-1f64..1f64));
        Self::new(response).offset(offset.as_slice()).seed(seed)
    }
    /// Sets the orbit offset
    pub fn offset(mut self, offset: &[f64]) -> Self {
        self.offset = DVector::from_column_slice(offset);
        self
    }
    /// Sets the standard deviation of the BPM noise
    pub fn noise(mut self, sigma: f64) -> Self {
        self.noise = sigma;
        self
    }
    /// Sets the noise generator seed
    pub fn seed(self, seed: u64) -> Self {
        self.lock().rng = StdRng::seed_from_u64(seed);
        self
    }
    /// Sets the time to measure a response matrix column
    pub fn column_delay(mut self, delay: Duration) -> Self {
        self.column_delay = delay;
        self
    }
    /// Makes the kicks application fail
    pub fn fail_kicks(&self, fail: bool) {
        self.kick_failure.store(fail, Ordering::Relaxed);
    }
    /// Disconnects the BPMs
    pub fn disconnect(&self, disconnected: bool) {
        self.disconnected.store(disconnected, Ordering::Relaxed);
    }
    pub fn response(&self) -> &DMatrix<f64> {
        &self.response
    }
    /// Current actuators values
    pub fn actuators(&self) -> Vec<f64> {
        self.lock().actuators.as_slice().to_vec()
    }
    /// Noiseless orbit
    pub fn orbit(&self) -> Vec<f64> {
        let state = self.lock();
        (&self.response * &state.actuators + &self.offset)
            .as_slice()
            .to_vec()
    }
    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Machine for LinearMachine {
    fn read_orbit(&self) -> Result<Vec<f64>> {
        if self.disconnected.load(Ordering::Relaxed) {
            return Err(HardwareError::Disconnected("BPMs not responding".into()));
        }
        let mut orbit = self.orbit();
        if self.noise > 0. {
            let mut state = self.lock();
            let sigma = self.noise;
            orbit
                .iter_mut()
                .for_each(|x| *x += sigma * state.rng.gen_range(-1f64..1f64));
        }
        Ok(orbit)
    }

    fn apply_kicks(&self, kicks: &Kicks) -> Result<()> {
        if self.kick_failure.load(Ordering::Relaxed) {
            return Err(HardwareError::Disconnected("correctors not responding".into()));
        }
        let delta = kicks.to_actuators();
        let mut state = self.lock();
        if delta.len() != state.actuators.len() {
            return Err(HardwareError::Malformed {
                expected: state.actuators.len(),
                found: delta.len(),
            });
        }
        state
            .actuators
            .iter_mut()
            .zip(delta)
            .for_each(|(a, d)| *a += d);
        Ok(())
    }

    fn measure_response_matrix(
        &self,
        block: &MeasurementBlock,
        interrupt: &AtomicBool,
    ) -> Result<DMatrix<f64>> {
        let (nrows, ncols) = block.shape();
        if block.rows.end > self.response.nrows() || block.cols.end > self.response.ncols() {
            return Err(HardwareError::Malformed {
                expected: self.response.len(),
                found: block.rows.end * block.cols.end,
            });
        }
        let mut measured = DMatrix::zeros(nrows, ncols);
        for (j, col) in block.cols.clone().enumerate() {
            if interrupt.load(Ordering::Acquire) {
                log::debug!("measurement interrupted at column {col}");
                break;
            }
            if !self.column_delay.is_zero() {
                thread::sleep(self.column_delay);
            }
            measured
                .column_mut(j)
                .copy_from(&self.response.view((block.rows.start, col), (nrows, 1)));
        }
        Ok(measured)
    }
}
