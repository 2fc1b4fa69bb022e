use std::fmt::Display;

use crate::Layout;

/// Actuator kicks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Kicks {
    pub ch: Vec<f64>,
    pub cv: Vec<f64>,
    pub rf: f64,
}

impl Kicks {
    /// Zero kicks
    pub fn zeros(layout: &Layout) -> Self {
        Self {
            ch: vec![0.; layout.nr_ch],
            cv: vec![0.; layout.nr_cv],
            rf: 0.,
        }
    }
    /// Splits a vector of actuator values ordered as the response matrix columns
    pub fn from_actuators(layout: &Layout, values: &[f64]) -> Self {
        let ch_cols = layout.ch_cols();
        let cv_cols = layout.cv_cols();
        Self {
            ch: values[ch_cols].to_vec(),
            cv: values[cv_cols].to_vec(),
            rf: values[layout.rf_col()],
        }
    }
    /// Concatenates the kicks in the response matrix column order
    pub fn to_actuators(&self) -> Vec<f64> {
        self.ch
            .iter()
            .chain(&self.cv)
            .chain(Some(&self.rf))
            .cloned()
            .collect()
    }
    /// Scales the horizontal, vertical and RF kicks
    pub fn scale(mut self, ch: f64, cv: f64, rf: f64) -> Self {
        self.ch.iter_mut().for_each(|x| *x *= ch);
        self.cv.iter_mut().for_each(|x| *x *= cv);
        self.rf *= rf;
        self
    }
    /// Root mean square of the corrector kicks
    pub fn rms(&self) -> f64 {
        let n = self.ch.len() + self.cv.len();
        if n == 0 {
            return 0.;
        }
        (self.ch.iter().chain(&self.cv).map(|x| x * x).sum::<f64>() / n as f64).sqrt()
    }
}

impl Display for Kicks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "kicks: {} CH, {} CV, RF {:+.3e}, rms {:.3e}",
            self.ch.len(),
            self.cv.len(),
            self.rf,
            self.rms()
        )
    }
}
