//! # Mode registers
//!
//! Each SOFB unit owns a [Mode] register: idle, active or waiting for a
//! variable update to complete before becoming active.

use std::fmt::Display;

use sofb_clients_respmat::Layout;

use crate::MeasurementBlock;

/// Integer code of a unit operation
pub trait Code {
    fn code(&self) -> i64;
}

/// Unit mode register
#[derive(Debug, Clone, PartialEq)]
pub enum Mode<C> {
    Idle,
    Active(C),
    /// Deferred until the ongoing variable update completes
    Waiting(C),
}

impl<C> Default for Mode<C> {
    fn default() -> Self {
        Mode::Idle
    }
}

impl<C: Code> Mode<C> {
    /// Operation code, 0 if idle
    pub fn code(&self) -> i64 {
        match self {
            Mode::Idle => 0,
            Mode::Active(c) | Mode::Waiting(c) => c.code(),
        }
    }
    pub fn is_idle(&self) -> bool {
        matches!(self, Mode::Idle)
    }
    pub fn is_active(&self) -> bool {
        matches!(self, Mode::Active(_))
    }
    pub fn is_waiting(&self) -> bool {
        matches!(self, Mode::Waiting(_))
    }
    /// Turns a waiting operation into an active one
    pub fn release(self) -> Self {
        match self {
            Mode::Waiting(c) => Mode::Active(c),
            mode => mode,
        }
    }
    /// Returns the active operation
    pub fn active(&self) -> Option<&C> {
        match self {
            Mode::Active(c) => Some(c),
            _ => None,
        }
    }
}

impl<C: Code> Display for Mode<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Idle => write!(f, "Idle"),
            Mode::Active(c) => write!(f, "{}", c.code()),
            Mode::Waiting(c) => write!(f, "W_{}", c.code()),
        }
    }
}

/// Transverse planes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Plane {
    Horizontal,
    Vertical,
}

/// Planes of a correction or of a measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Planes {
    /// Horizontal readings and correctors (`H`)
    Horizontal,
    /// Vertical readings and correctors (`V`)
    Vertical,
    /// Both planes, independently (`H_V`)
    Uncoupled,
    /// Both planes, cross-talk included (`HV`)
    Coupled,
}

impl Planes {
    pub fn horizontal(&self) -> bool {
        !matches!(self, Planes::Vertical)
    }
    pub fn vertical(&self) -> bool {
        !matches!(self, Planes::Horizontal)
    }
}

/// Planes selection with or without the RF
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Selection {
    pub planes: Planes,
    pub rf: bool,
}

impl Selection {
    pub const ALL: [Selection; 8] = [
        Selection::new(Planes::Horizontal, false),
        Selection::new(Planes::Vertical, false),
        Selection::new(Planes::Uncoupled, false),
        Selection::new(Planes::Coupled, false),
        Selection::new(Planes::Horizontal, true),
        Selection::new(Planes::Vertical, true),
        Selection::new(Planes::Uncoupled, true),
        Selection::new(Planes::Coupled, true),
    ];
    pub const fn new(planes: Planes, rf: bool) -> Self {
        Self { planes, rf }
    }
    /// Selection derived from the response matrix type and from the RF enable flag
    pub fn from_flags(coupled: bool, rf: bool) -> Self {
        let planes = if coupled {
            Planes::Coupled
        } else {
            Planes::Uncoupled
        };
        Self { planes, rf }
    }
    pub fn horizontal(&self) -> bool {
        self.planes.horizontal()
    }
    pub fn vertical(&self) -> bool {
        self.planes.vertical()
    }
    /// Response matrix blocks spanned by the selection
    pub fn blocks(&self, layout: &Layout) -> Vec<MeasurementBlock> {
        let all_rows = 0..layout.nr_rows();
        let mut blocks = match self.planes {
            Planes::Horizontal => vec![MeasurementBlock::new(layout.x_rows(), layout.ch_cols())],
            Planes::Vertical => vec![MeasurementBlock::new(layout.y_rows(), layout.cv_cols())],
            Planes::Uncoupled => vec![
                MeasurementBlock::new(layout.x_rows(), layout.ch_cols()),
                MeasurementBlock::new(layout.y_rows(), layout.cv_cols()),
            ],
            Planes::Coupled => vec![MeasurementBlock::new(
                all_rows.clone(),
                0..layout.nr_ch + layout.nr_cv,
            )],
        };
        if self.rf {
            let rows = match self.planes {
                Planes::Horizontal => layout.x_rows(),
                Planes::Vertical => layout.y_rows(),
                _ => all_rows,
            };
            let rf = layout.rf_col();
            blocks.push(MeasurementBlock::new(rows, rf..rf + 1));
        }
        blocks
    }
}

impl Display for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let planes = match self.planes {
            Planes::Horizontal => "H",
            Planes::Vertical => "V",
            Planes::Uncoupled => "H_V",
            Planes::Coupled => "HV",
        };
        if self.rf {
            write!(f, "{planes}_F")
        } else {
            write!(f, "{planes}")
        }
    }
}

/// Orbit correction operation
///
/// | code | mode |
/// |-----:|------|
/// | 1 | H |
/// | 2 | V |
/// | 3 | H_V |
/// | 4 | HV |
/// | 5 | H_F |
/// | 6 | V_F |
/// | 7 | H_V_F |
/// | 8 | HV_F |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrectionMode(pub Selection);

/// Response matrix measurement operation
///
/// | code | mode |
/// |-----:|------|
/// | 1 | H |
/// | 2 | V |
/// | 3 | HV |
/// | 4 | H_F |
/// | 5 | V_F |
/// | 6 | HV_F |
/// | 7 | H_V |
/// | 8 | H_V_F |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasureMode(pub Selection);

impl Code for CorrectionMode {
    fn code(&self) -> i64 {
        let Selection { planes, rf } = self.0;
        let code = match planes {
            Planes::Horizontal => 1,
            Planes::Vertical => 2,
            Planes::Uncoupled => 3,
            Planes::Coupled => 4,
        };
        if rf {
            code + 4
        } else {
            code
        }
    }
}

impl Code for MeasureMode {
    fn code(&self) -> i64 {
        match (self.0.planes, self.0.rf) {
            (Planes::Horizontal, false) => 1,
            (Planes::Vertical, false) => 2,
            (Planes::Coupled, false) => 3,
            (Planes::Horizontal, true) => 4,
            (Planes::Vertical, true) => 5,
            (Planes::Coupled, true) => 6,
            (Planes::Uncoupled, false) => 7,
            (Planes::Uncoupled, true) => 8,
        }
    }
}

impl CorrectionMode {
    pub fn from_code(code: i64) -> Option<Self> {
        Selection::ALL
            .into_iter()
            .map(CorrectionMode)
            .find(|mode| mode.code() == code)
    }
}

impl MeasureMode {
    pub fn from_code(code: i64) -> Option<Self> {
        Selection::ALL
            .into_iter()
            .map(MeasureMode)
            .find(|mode| mode.code() == code)
    }
}

/// Configuration action of the variable update unit
#[derive(Debug, Clone, PartialEq)]
pub enum VarUpdate {
    /// Loads the response matrix from a slot
    RespMatSlot(usize),
    /// Loads the horizontal reference orbit from a slot
    RefOrbXSlot(usize),
    /// Loads the vertical reference orbit from a slot
    RefOrbYSlot(usize),
    RefOrbX(Vec<f64>),
    RefOrbY(Vec<f64>),
    /// Response matrix, row-major
    RespMat(Vec<f64>),
    /// BPMs enable list, horizontal then vertical
    EnblListBPM(Vec<bool>),
    EnblListCH(Vec<bool>),
    EnblListCV(Vec<bool>),
    NumSingValues(usize),
    /// Enables a BPM, horizontal readings first
    AddBPM(usize),
    RmvBPM(usize),
    /// Enables a corrector: horizontal, vertical and then RF
    AddCorr(usize),
    RmvCorr(usize),
    EnblRF(bool),
}

impl Code for VarUpdate {
    fn code(&self) -> i64 {
        match self {
            VarUpdate::RespMatSlot(_) => 1,
            VarUpdate::RefOrbXSlot(_) => 2,
            VarUpdate::RefOrbYSlot(_) => 3,
            VarUpdate::RefOrbX(_) => 4,
            VarUpdate::RefOrbY(_) => 5,
            VarUpdate::RespMat(_) => 6,
            VarUpdate::EnblListBPM(_) => 7,
            VarUpdate::EnblListCH(_) => 8,
            VarUpdate::EnblListCV(_) => 9,
            VarUpdate::NumSingValues(_) => 10,
            VarUpdate::AddBPM(_) => 11,
            VarUpdate::RmvBPM(_) => 12,
            VarUpdate::AddCorr(_) => 13,
            VarUpdate::RmvCorr(_) => 14,
            VarUpdate::EnblRF(_) => 15,
        }
    }
}

/// Operation mode requested to the SOFB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpMode {
    #[default]
    Off,
    Correct,
    MeasureRespMat,
}

impl OpMode {
    pub fn code(&self) -> i64 {
        match self {
            OpMode::Off => 0,
            OpMode::Correct => 1,
            OpMode::MeasureRespMat => 2,
        }
    }
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(OpMode::Off),
            1 => Some(OpMode::Correct),
            2 => Some(OpMode::MeasureRespMat),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes() {
        let codes: Vec<_> = Selection::ALL
            .into_iter()
            .map(|s| (CorrectionMode(s).code(), MeasureMode(s).code(), s.to_string()))
            .collect();
        assert_eq!(
            codes,
            vec![
                (1, 1, "H".to_string()),
                (2, 2, "V".to_string()),
                (3, 7, "H_V".to_string()),
                (4, 3, "HV".to_string()),
                (5, 4, "H_F".to_string()),
                (6, 5, "V_F".to_string()),
                (7, 8, "H_V_F".to_string()),
                (8, 6, "HV_F".to_string()),
            ]
        );
        for code in 1..=8 {
            assert_eq!(CorrectionMode::from_code(code).map(|m| m.code()), Some(code));
            assert_eq!(MeasureMode::from_code(code).map(|m| m.code()), Some(code));
        }
        assert!(CorrectionMode::from_code(0).is_none());
        assert_eq!(VarUpdate::EnblRF(true).code(), 15);
    }

    #[test]
    fn mode_register() {
        let mode = Mode::Waiting(CorrectionMode(Selection::from_flags(true, true)));
        assert_eq!(mode.to_string(), "W_8");
        let mode = mode.release();
        assert!(mode.is_active());
        assert_eq!(mode.to_string(), "8");
        assert_eq!(Mode::<VarUpdate>::Idle.to_string(), "Idle");
        assert_eq!(Mode::<VarUpdate>::Idle.code(), 0);
    }

    #[test]
    fn blocks() {
        let layout = Layout::new(3, 2, 4);
        let blocks = Selection::new(Planes::Uncoupled, true).blocks(&layout);
        assert_eq!(
            blocks,
            vec![
                MeasurementBlock::new(0..3, 0..2),
                MeasurementBlock::new(3..6, 2..6),
                MeasurementBlock::new(0..6, 6..7),
            ]
        );
        let blocks = Selection::new(Planes::Vertical, false).blocks(&layout);
        assert_eq!(blocks, vec![MeasurementBlock::new(3..6, 2..6)]);
    }
}
