//! # SOFB configuration
//!
//! [SofbConfig] is read from a TOML file, every field has a default:
//! ```toml
//! buffer_capacity = 100
//! n_samples = 10
//! strength_ch = 100.0
//! strength_cv = 100.0
//! respmat_path = "data/respmat.txt"
//! slots_dir = "data/slots"
//! orbit_interval_ms = 100
//!
//! [layout]
//! nr_bpms = 160
//! nr_ch = 120
//! nr_cv = 160
//! ```

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use sofb_clients_respmat::Layout;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {1:?}")]
    Io(#[source] std::io::Error, PathBuf),
    #[error("failed to parse configuration")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
pub type Result<T> = std::result::Result<T, ConfigError>;

/// SOFB configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SofbConfig {
    pub layout: Layout,
    /// Orbit buffer capacity
    pub buffer_capacity: usize,
    /// Number of orbit samples averaged
    pub n_samples: usize,
    /// Horizontal correction strength `[%]`
    pub strength_ch: f64,
    /// Vertical correction strength `[%]`
    pub strength_cv: f64,
    /// Singular values retained in the pseudo-inverse, all of them if not set
    pub num_sing_values: Option<usize>,
    /// Response matrix file
    pub respmat_path: Option<PathBuf>,
    /// Response matrix and reference orbits slots directory
    pub slots_dir: PathBuf,
    /// Coupled response matrix
    pub coupled: bool,
    /// RF frequency correction
    pub rf_enabled: bool,
    pub orbit_interval_ms: u64,
    pub correction_interval_ms: u64,
    pub measurement_interval_ms: u64,
    pub var_update_interval_ms: u64,
}

impl Default for SofbConfig {
    fn default() -> Self {
        Self {
            layout: Default::default(),
            buffer_capacity: 100,
            n_samples: 10,
            strength_ch: 100.,
            strength_cv: 100.,
            num_sing_values: None,
            respmat_path: None,
            slots_dir: PathBuf::from("slots"),
            coupled: true,
            rf_enabled: false,
            orbit_interval_ms: 100,
            correction_interval_ms: 100,
            measurement_interval_ms: 100,
            var_update_interval_ms: 50,
        }
    }
}

impl SofbConfig {
    /// Default configuration, to be modified with the setters
    pub fn builder() -> Self {
        Default::default()
    }
    /// Reads the configuration from a TOML file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        log::info!("loading SOFB configuration from {path:?}");
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e, path.to_path_buf()))?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()
    }
    /// Checks the consistency of the configuration
    pub fn validate(self) -> Result<Self> {
        let nr_corrs = self.layout.nr_corrs();
        if self.layout.nr_bpms == 0 {
            return Err(ConfigError::Invalid("no BPM".into()));
        }
        if self.buffer_capacity == 0 {
            return Err(ConfigError::Invalid("empty orbit buffer".into()));
        }
        if !(1..=self.buffer_capacity).contains(&self.n_samples) {
            return Err(ConfigError::Invalid(format!(
                "number of samples must be in [1,{}], found {}",
                self.buffer_capacity, self.n_samples
            )));
        }
        for strength in [self.strength_ch, self.strength_cv] {
            if !(0f64..=100f64).contains(&strength) {
                return Err(ConfigError::Invalid(format!(
                    "correction strength must be in [0,100], found {strength}"
                )));
            }
        }
        if let Some(n) = self.num_sing_values {
            if !(1..=nr_corrs).contains(&n) {
                return Err(ConfigError::Invalid(format!(
                    "number of singular values must be in [1,{nr_corrs}], found {n}"
                )));
            }
        }
        Ok(self)
    }
    pub fn layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }
    pub fn n_samples(mut self, n_samples: usize) -> Self {
        self.n_samples = n_samples;
        self
    }
    pub fn strengths(mut self, ch: f64, cv: f64) -> Self {
        self.strength_ch = ch;
        self.strength_cv = cv;
        self
    }
    pub fn num_sing_values(mut self, n: usize) -> Self {
        self.num_sing_values = Some(n);
        self
    }
    pub fn respmat_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.respmat_path = Some(path.into());
        self
    }
    pub fn slots_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.slots_dir = dir.into();
        self
    }
    pub fn coupled(mut self, coupled: bool) -> Self {
        self.coupled = coupled;
        self
    }
    pub fn rf_enabled(mut self, rf_enabled: bool) -> Self {
        self.rf_enabled = rf_enabled;
        self
    }
    /// Sets the polling interval of all the units
    pub fn interval(mut self, interval: Duration) -> Self {
        let ms = interval.as_millis() as u64;
        self.orbit_interval_ms = ms;
        self.correction_interval_ms = ms;
        self.measurement_interval_ms = ms;
        self.var_update_interval_ms = ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_defaults() {
        let config: SofbConfig = toml::from_str(
            r#"
            n_samples = 5
            respmat_path = "respmat.txt"
            [layout]
            nr_bpms = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.n_samples, 5);
        assert_eq!(config.layout, Layout::new(8, 120, 160));
        assert_eq!(config.respmat_path, Some(PathBuf::from("respmat.txt")));
        assert_eq!(config.buffer_capacity, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid() {
        assert!(SofbConfig::builder().n_samples(0).validate().is_err());
        assert!(SofbConfig::builder()
            .buffer_capacity(4)
            .n_samples(5)
            .validate()
            .is_err());
        assert!(SofbConfig::builder()
            .strengths(100., 101.)
            .validate()
            .is_err());
        assert!(SofbConfig::builder()
            .layout(Layout::new(2, 1, 1))
            .num_sing_values(4)
            .validate()
            .is_err());
    }
}
