use std::{collections::VecDeque, sync::Arc};

use interface::{Data, Publish, Update};
use sofb_clients_io::orbit;

use crate::{state::Shared, ErrorCode, HardwareError, Plane};

/// Ring buffer of the most recent orbit samples
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitBuffer {
    samples: VecDeque<Vec<f64>>,
    capacity: usize,
    n_samples: usize,
}

impl OrbitBuffer {
    /// Creates an empty buffer averaging the last `n_samples` samples
    pub fn new(capacity: usize, n_samples: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            n_samples: n_samples.clamp(1, capacity),
        }
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }
    pub fn len(&self) -> usize {
        self.samples.len()
    }
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
    /// Sets the number of samples averaged, in `[1,capacity]`
    pub fn set_n_samples(&mut self, n_samples: usize) -> Result<(), ErrorCode> {
        if !(1..=self.capacity).contains(&n_samples) {
            return Err(ErrorCode::NrSplOutOfBounds);
        }
        self.n_samples = n_samples;
        Ok(())
    }
    /// Adds a sample, discarding the oldest one if the buffer is full
    pub fn push(&mut self, sample: Vec<f64>) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }
    /// Average of the last `n_samples` samples, `None` if the buffer is empty
    pub fn average_orbit(&self) -> Option<Vec<f64>> {
        let n = self.n_samples.min(self.samples.len());
        let mut samples = self.samples.iter().rev().take(n);
        let mut sum = samples.next()?.clone();
        for sample in samples {
            sum.iter_mut().zip(sample).for_each(|(s, x)| *s += x);
        }
        sum.iter_mut().for_each(|s| *s /= n as f64);
        Some(sum)
    }
}

/// Reference orbit, zero by default
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceOrbit {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl ReferenceOrbit {
    pub fn zeros(nr_bpms: usize) -> Self {
        Self {
            x: vec![0.; nr_bpms],
            y: vec![0.; nr_bpms],
        }
    }
    /// Sets the reference of a plane
    pub fn set(&mut self, plane: Plane, orbit: Vec<f64>) -> Result<(), ErrorCode> {
        let reference = match plane {
            Plane::Horizontal => &mut self.x,
            Plane::Vertical => &mut self.y,
        };
        if reference.len() != orbit.len() {
            return Err(ErrorCode::WrongSize);
        }
        *reference = orbit;
        Ok(())
    }
    /// Orbit error: `orbit - reference`
    pub fn error(&self, orbit: &[f64]) -> Vec<f64> {
        orbit
            .iter()
            .zip(self.x.iter().chain(&self.y))
            .map(|(o, r)| o - r)
            .collect()
    }
}

/// Orbit measurement unit
///
/// Samples the BPMs into the [OrbitBuffer] and publishes the averaged orbit.
pub struct OrbitMeasurement {
    shared: Arc<Shared>,
}

impl OrbitMeasurement {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }
    fn sample(&self) -> Result<Vec<f64>, HardwareError> {
        let orbit = self.shared.machine.read_orbit()?;
        let expected = self.shared.layout.nr_rows();
        if orbit.len() != expected {
            return Err(HardwareError::Malformed {
                expected,
                found: orbit.len(),
            });
        }
        Ok(orbit)
    }
}

impl Update for OrbitMeasurement {
    fn update(&mut self) {
        match self.sample() {
            Ok(sample) => {
                let average = {
                    let mut buffer = self.shared.buffer();
                    buffer.push(sample);
                    buffer.average_orbit()
                };
                if let Some(average) = average {
                    let (x, y) = average.split_at(self.shared.layout.nr_bpms);
                    self.shared.publisher.send(Data::<orbit::SlowOrbX>::from(x));
                    self.shared.publisher.send(Data::<orbit::SlowOrbY>::from(y));
                }
            }
            Err(e) => {
                match &e {
                    HardwareError::Timeout => log::debug!("orbit sampling: {e}"),
                    HardwareError::Malformed { .. } | HardwareError::Disconnected(_) => {
                        log::warn!("orbit sampling: {e}")
                    }
                }
                self.shared.report(ErrorCode::OrbitSampling);
            }
        }
    }
}
