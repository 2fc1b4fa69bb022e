/*!
# Optics correction

[OpticsCorr] maps the deltas of the integrated strengths of magnet families
to the deltas of two optics parameters (tunes or chromaticities) and back.

The magnet families are gathered into two knobs, the focusing and the defocusing families.
The strengths deltas are either [additive](Method::Additive) or [proportional](Method::Proportional)
to the nominal strengths and they are computed either for each family of the knobs ([Grouping::Svd])
or for each knob as a whole ([Grouping::TwoKnobs]).

```
use sofb_clients_opticscorr::{Grouping, Method, OpticsCorr};

let corr = OpticsCorr::builder()
    .magnetfams_ordering(["QFA", "QDA"])
    .nominal_matrix(vec![1.0, -1.0, 0.5, 0.5])
    .nominal_intstrengths(vec![2.0, 2.0])
    .nominal_opticsparam(vec![1.0, 1.0])
    .magnetfams_focusing(["QFA"])
    .magnetfams_defocusing(["QDA"])
    .build()?;
let delta = corr.calculate_delta_intstrengths(Method::Additive, Grouping::TwoKnobs, &[1.2, 1.0])?;
let optics = corr.calculate_opticsparam(&delta)?;
assert!((optics[0] - 1.2).abs() < 1e-12);
# Ok::<(), sofb_clients_opticscorr::OpticsCorrError>(())
```
*/

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

mod builder;
pub use builder::OpticsCorrBuilder;
mod optics_corr;
pub use optics_corr::OpticsCorr;

/// Strength delta parametrization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Deltas are added to the nominal strengths
    Additive,
    /// Deltas are relative to the nominal strengths
    Proportional,
}

/// Magnet families grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grouping {
    /// One knob per family
    #[serde(rename = "svd")]
    Svd,
    /// One knob for the focusing families and one for the defocusing families
    #[serde(rename = "2knobs")]
    TwoKnobs,
}

impl Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Additive => write!(f, "additive"),
            Method::Proportional => write!(f, "proportional"),
        }
    }
}
impl FromStr for Method {
    type Err = OpticsCorrError;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "additive" => Ok(Method::Additive),
            "proportional" => Ok(Method::Proportional),
            _ => Err(OpticsCorrError::Parse(s.to_string())),
        }
    }
}
impl Display for Grouping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Grouping::Svd => write!(f, "svd"),
            Grouping::TwoKnobs => write!(f, "2knobs"),
        }
    }
}
impl FromStr for Grouping {
    type Err = OpticsCorrError;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "svd" => Ok(Grouping::Svd),
            "2knobs" => Ok(Grouping::TwoKnobs),
            _ => Err(OpticsCorrError::Parse(s.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OpticsCorrError {
    #[error("at least 2 magnet families are required, found {0}")]
    TooFewFamilies(usize),
    #[error("magnet family {0} is duplicated")]
    DuplicateFamily(String),
    #[error("magnet family {0} is not in the families ordering")]
    UnknownFamily(String),
    #[error("no {0} magnet family")]
    EmptyKnob(&'static str),
    #[error("magnet family {0} is both focusing and defocusing")]
    OverlappingKnobs(String),
    #[error("{what}: expected {expected} values, found {found}")]
    WrongSize {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("SVD failed to converge")]
    Svd,
    #[error("pseudo-inverse has non-finite values")]
    NonFinite,
    #[error("unknown method or grouping: {0}")]
    Parse(String),
    #[error("failed to read optics correction configuration")]
    Io(#[from] std::io::Error),
    #[error("failed to parse optics correction configuration")]
    Toml(#[from] toml::de::Error),
}
pub type Result<T> = std::result::Result<T, OpticsCorrError>;
