use std::{fmt::Display, ops::Range, str::FromStr};

use serde::{Deserialize, Serialize};

/// Default number of BPMs
pub const NR_BPMS: usize = 160;
/// Default number of horizontal correctors
pub const NR_CH: usize = 120;
/// Default number of vertical correctors
pub const NR_CV: usize = 160;
/// Default number of actuators: correctors and RF
pub const NR_CORRS: usize = NR_CH + NR_CV + 1;

/// Device counts of a ring
///
/// The response matrix has `2*nr_bpms` rows (horizontal then vertical readings)
/// and `nr_ch + nr_cv + 1` columns (horizontal correctors, vertical correctors and RF)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    pub nr_bpms: usize,
    pub nr_ch: usize,
    pub nr_cv: usize,
}
impl Default for Layout {
    fn default() -> Self {
        Self {
            nr_bpms: NR_BPMS,
            nr_ch: NR_CH,
            nr_cv: NR_CV,
        }
    }
}
impl Layout {
    pub fn new(nr_bpms: usize, nr_ch: usize, nr_cv: usize) -> Self {
        Self {
            nr_bpms,
            nr_ch,
            nr_cv,
        }
    }
    /// Number of actuators
    #[inline]
    pub fn nr_corrs(&self) -> usize {
        self.nr_ch + self.nr_cv + 1
    }
    /// Number of response matrix rows
    #[inline]
    pub fn nr_rows(&self) -> usize {
        2 * self.nr_bpms
    }
    /// Number of response matrix entries
    #[inline]
    pub fn size(&self) -> usize {
        self.nr_rows() * self.nr_corrs()
    }
    /// Response matrix rows of the horizontal readings
    pub fn x_rows(&self) -> Range<usize> {
        0..self.nr_bpms
    }
    /// Response matrix rows of the vertical readings
    pub fn y_rows(&self) -> Range<usize> {
        self.nr_bpms..self.nr_rows()
    }
    /// Response matrix columns of the horizontal correctors
    pub fn ch_cols(&self) -> Range<usize> {
        0..self.nr_ch
    }
    /// Response matrix columns of the vertical correctors
    pub fn cv_cols(&self) -> Range<usize> {
        self.nr_ch..self.nr_ch + self.nr_cv
    }
    /// Response matrix column of the RF
    pub fn rf_col(&self) -> usize {
        self.nr_ch + self.nr_cv
    }
    /// Rows or columns spanned by a device class
    pub fn span(&self, class: DeviceClass) -> Range<usize> {
        match class {
            DeviceClass::BpmX => self.x_rows(),
            DeviceClass::BpmY => self.y_rows(),
            DeviceClass::Ch => self.ch_cols(),
            DeviceClass::Cv => self.cv_cols(),
            DeviceClass::Rf => self.rf_col()..self.rf_col() + 1,
        }
    }
    /// Number of devices in a class
    pub fn len(&self, class: DeviceClass) -> usize {
        self.span(class).len()
    }
}
impl Display for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} BPMs, {} CHs, {} CVs ({}x{} response matrix)",
            self.nr_bpms,
            self.nr_ch,
            self.nr_cv,
            self.nr_rows(),
            self.nr_corrs()
        )
    }
}

/// Device classes of the selection masks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    BpmX,
    BpmY,
    Ch,
    Cv,
    Rf,
}
impl DeviceClass {
    pub const ALL: [DeviceClass; 5] = [
        DeviceClass::BpmX,
        DeviceClass::BpmY,
        DeviceClass::Ch,
        DeviceClass::Cv,
        DeviceClass::Rf,
    ];
}
impl Display for DeviceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DeviceClass::BpmX => "bpmx",
            DeviceClass::BpmY => "bpmy",
            DeviceClass::Ch => "ch",
            DeviceClass::Cv => "cv",
            DeviceClass::Rf => "rf",
        };
        write!(f, "{name}")
    }
}
impl FromStr for DeviceClass {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeviceClass::ALL
            .into_iter()
            .find(|class| class.to_string() == s.to_lowercase())
            .ok_or_else(|| format!("unknown device class: {s}"))
    }
}
