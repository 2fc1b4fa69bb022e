use serde::{Deserialize, Serialize};

use crate::{DeviceClass, Layout};

/// Enable masks of the response matrix rows and columns
///
/// A disabled BPM reading is left out of the inversion and a disabled
/// actuator gets no kick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectItems {
    bpmx: Vec<bool>,
    bpmy: Vec<bool>,
    ch: Vec<bool>,
    cv: Vec<bool>,
    rf: Vec<bool>,
}

impl SelectItems {
    /// Creates masks with every device enabled
    pub fn new(layout: &Layout) -> Self {
        Self {
            bpmx: vec![true; layout.nr_bpms],
            bpmy: vec![true; layout.nr_bpms],
            ch: vec![true; layout.nr_ch],
            cv: vec![true; layout.nr_cv],
            rf: vec![true],
        }
    }
    /// Returns the mask of a device class
    pub fn mask(&self, class: DeviceClass) -> &[bool] {
        match class {
            DeviceClass::BpmX => &self.bpmx,
            DeviceClass::BpmY => &self.bpmy,
            DeviceClass::Ch => &self.ch,
            DeviceClass::Cv => &self.cv,
            DeviceClass::Rf => &self.rf,
        }
    }
    fn mask_mut(&mut self, class: DeviceClass) -> &mut Vec<bool> {
        match class {
            DeviceClass::BpmX => &mut self.bpmx,
            DeviceClass::BpmY => &mut self.bpmy,
            DeviceClass::Ch => &mut self.ch,
            DeviceClass::Cv => &mut self.cv,
            DeviceClass::Rf => &mut self.rf,
        }
    }
    /// Sets the mask of a device class
    ///
    /// The mask is truncated or padded with `false` to the length of the class
    pub fn set(&mut self, class: DeviceClass, mask: &[bool]) {
        let current = self.mask_mut(class);
        let n = current.len();
        *current = mask
            .iter()
            .cloned()
            .chain(std::iter::repeat(false))
            .take(n)
            .collect();
    }
    /// Enables or disables a single device, returns `false` if `index` is out of range
    pub fn set_item(&mut self, class: DeviceClass, index: usize, enabled: bool) -> bool {
        match self.mask_mut(class).get_mut(index) {
            Some(item) => {
                *item = enabled;
                true
            }
            None => false,
        }
    }
    /// Returns the RF enable flag
    pub fn rf(&self) -> bool {
        self.rf.first().copied().unwrap_or_default()
    }
    /// Returns both BPM masks, horizontal first
    pub fn bpm(&self) -> Vec<bool> {
        self.bpmx.iter().chain(&self.bpmy).cloned().collect()
    }
    /// Indices of the selected response matrix rows
    pub fn rows(&self) -> Vec<usize> {
        self.bpmx
            .iter()
            .chain(&self.bpmy)
            .enumerate()
            .filter_map(|(i, &s)| s.then_some(i))
            .collect()
    }
    /// Indices of the selected response matrix columns
    pub fn cols(&self) -> Vec<usize> {
        self.ch
            .iter()
            .chain(&self.cv)
            .chain(&self.rf)
            .enumerate()
            .filter_map(|(i, &s)| s.then_some(i))
            .collect()
    }
    /// Number of selected devices of a class
    pub fn area(&self, class: DeviceClass) -> usize {
        self.mask(class).iter().filter(|x| **x).count()
    }
}
