use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{OpticsCorr, OpticsCorrError, Result};

/// Builder for [OpticsCorr]
///
/// The builder can be deserialized from a TOML table:
/// ```toml
/// magnetfams_ordering = ["QFA", "QDA"]
/// nominal_matrix = [1.0, -1.0, 0.5, 0.5]
/// nominal_intstrengths = [2.0, 2.0]
/// nominal_opticsparam = [1.0, 1.0]
/// magnetfams_focusing = ["QFA"]
/// magnetfams_defocusing = ["QDA"]
/// ```
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpticsCorrBuilder {
    pub(crate) magnetfams_ordering: Vec<String>,
    /// 2xN matrix, row-major
    pub(crate) nominal_matrix: Vec<f64>,
    pub(crate) nominal_intstrengths: Vec<f64>,
    pub(crate) nominal_opticsparam: Vec<f64>,
    pub(crate) magnetfams_focusing: Vec<String>,
    pub(crate) magnetfams_defocusing: Vec<String>,
}

fn names<I, S>(families: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    families.into_iter().map(|f| f.into()).collect()
}

impl OpticsCorrBuilder {
    /// Reads the builder from a TOML file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        log::info!("loading optics correction from {:?}", path.as_ref());
        let contents = std::fs::read_to_string(path)?;
        contents.parse()
    }
    /// Sets the magnet families
    pub fn magnetfams_ordering<I, S>(mut self, families: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.magnetfams_ordering = names(families);
        self
    }
    /// Sets the nominal 2xN matrix, row-major
    pub fn nominal_matrix(mut self, matrix: Vec<f64>) -> Self {
        self.nominal_matrix = matrix;
        self
    }
    /// Sets the nominal integrated strengths
    pub fn nominal_intstrengths(mut self, strengths: Vec<f64>) -> Self {
        self.nominal_intstrengths = strengths;
        self
    }
    /// Sets the nominal optics parameters
    pub fn nominal_opticsparam(mut self, opticsparam: Vec<f64>) -> Self {
        self.nominal_opticsparam = opticsparam;
        self
    }
    /// Sets the focusing magnet families
    pub fn magnetfams_focusing<I, S>(mut self, families: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.magnetfams_focusing = names(families);
        self
    }
    /// Sets the defocusing magnet families
    pub fn magnetfams_defocusing<I, S>(mut self, families: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.magnetfams_defocusing = names(families);
        self
    }
    /// Builds [OpticsCorr]
    pub fn build(self) -> Result<OpticsCorr> {
        self.try_into()
    }
}

impl std::str::FromStr for OpticsCorrBuilder {
    type Err = OpticsCorrError;
    fn from_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

impl TryFrom<OpticsCorrBuilder> for OpticsCorr {
    type Error = OpticsCorrError;
    fn try_from(builder: OpticsCorrBuilder) -> Result<Self> {
        let OpticsCorrBuilder {
            magnetfams_ordering,
            nominal_matrix,
            nominal_intstrengths,
            nominal_opticsparam,
            magnetfams_focusing,
            magnetfams_defocusing,
        } = builder;
        OpticsCorr::new(
            magnetfams_ordering,
            nominal_matrix,
            nominal_intstrengths,
            nominal_opticsparam,
            magnetfams_focusing,
            magnetfams_defocusing,
        )
    }
}
