//! # SOFB units
//!
//! The 4 units of the SOFB, each one polled by its own [Worker](crate::Worker) thread:
//!  - [OrbitMeasurement]: samples and averages the orbit
//!  - [OrbitCorrection]: corrects the orbit with the response matrix pseudo-inverse
//!  - [RespMatMeasurement]: measures the response matrix
//!  - [VariableUpdate]: applies the configuration changes

mod orbit;
pub use orbit::{OrbitBuffer, OrbitMeasurement, ReferenceOrbit};
mod correction;
pub use correction::OrbitCorrection;
mod respmat;
pub use respmat::RespMatMeasurement;
mod var_update;
pub use var_update::VariableUpdate;
