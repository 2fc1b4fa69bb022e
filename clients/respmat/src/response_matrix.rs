use std::{
    fmt::{Debug, Display},
    path::{Path, PathBuf},
    sync::Arc,
};

use interface::{filing::Filing, filing::Table, print_info, Data, Publish, Publisher};
use nalgebra::{DMatrix, DVector};
use sofb_clients_io::{kicks, respmat};

use crate::{DeviceClass, Inversion, Kicks, Layout, RespMatError, Result, SelectItems};

mod builder;
pub use builder::ResponseMatrixBuilder;

/// Orbit response matrix
///
/// Maps the actuators (horizontal correctors, vertical correctors and RF)
/// to the BPM readings (horizontal then vertical).
/// Any change to the matrix, to the enable masks or to the number of singular values
/// is applied to a candidate [Inversion] first and committed only if the inversion succeeds,
/// the engine is never left with a matrix and an inverse that do not match.
pub struct ResponseMatrix {
    pub(crate) layout: Layout,
    pub(crate) matrix: DMatrix<f64>,
    pub(crate) select_items: SelectItems,
    pub(crate) num_sing_values: usize,
    pub(crate) inversion: Inversion,
    pub(crate) path: Option<PathBuf>,
    pub(crate) publisher: Arc<dyn Publisher>,
}

impl ResponseMatrix {
    /// Creates a [ResponseMatrixBuilder]
    pub fn builder() -> ResponseMatrixBuilder {
        Default::default()
    }
    /// Returns the device layout
    pub fn layout(&self) -> &Layout {
        &self.layout
    }
    /// Returns the response matrix
    pub fn response_matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }
    /// Returns the response matrix as a row-major vector
    pub fn to_row_major(&self) -> Vec<f64> {
        self.matrix.transpose().as_slice().to_vec()
    }
    /// Returns the pseudo-inverse
    pub fn inverse(&self) -> &DMatrix<f64> {
        self.inversion.inverse()
    }
    /// Returns the singular values
    pub fn sing_values(&self) -> &[f64] {
        self.inversion.sing_values()
    }
    /// Returns the number of singular values retained in the pseudo-inverse
    pub fn num_sing_values(&self) -> usize {
        self.num_sing_values
    }
    /// Returns the enable masks
    pub fn select_items(&self) -> &SelectItems {
        &self.select_items
    }

    /// Sets the response matrix from a row-major vector
    ///
    /// On success, the matrix is saved and published with its inverse
    pub fn set_response_matrix(&mut self, flat: &[f64]) -> Result<()> {
        let expected = self.layout.size();
        if flat.len() != expected {
            return Err(RespMatError::WrongSize {
                expected,
                found: flat.len(),
            });
        }
        let matrix = DMatrix::from_row_slice(self.layout.nr_rows(), self.layout.nr_corrs(), flat);
        let inversion = Inversion::compute(&matrix, &self.select_items, self.num_sing_values)?;
        self.matrix = matrix;
        self.inversion = inversion;
        self.save();
        self.publisher.send(Data::<respmat::RespMat>::from(flat));
        self.publish_inversion();
        Ok(())
    }

    /// Sets the enable mask of a device class
    ///
    /// The mask is truncated or padded with `false` to the length of the class
    pub fn set_enable_mask(&mut self, class: DeviceClass, mask: &[bool]) -> Result<()> {
        self.set_enable_masks(&[(class, mask)])
    }

    /// Sets the enable masks of several device classes at once
    pub fn set_enable_masks(&mut self, masks: &[(DeviceClass, &[bool])]) -> Result<()> {
        let mut select_items = self.select_items.clone();
        for (class, mask) in masks {
            select_items.set(*class, mask);
        }
        let inversion = Inversion::compute(&self.matrix, &select_items, self.num_sing_values)?;
        self.select_items = select_items;
        self.inversion = inversion;
        let mut classes: Vec<DeviceClass> = masks
            .iter()
            .map(|(class, _)| match class {
                DeviceClass::BpmY => DeviceClass::BpmX,
                class => *class,
            })
            .collect();
        classes.dedup();
        for class in classes {
            self.publish_mask(class);
        }
        self.publish_inversion();
        Ok(())
    }

    /// Enables or disables a single device
    pub fn set_enabled(&mut self, class: DeviceClass, index: usize, enabled: bool) -> Result<()> {
        let mut mask = self.select_items.mask(class).to_vec();
        let n = mask.len();
        match mask.get_mut(index) {
            Some(item) => *item = enabled,
            None => return Err(RespMatError::IndexOutOfRange { class, index, n }),
        }
        self.set_enable_mask(class, &mask)
    }

    /// Sets the number of singular values retained in the pseudo-inverse
    pub fn set_num_sing_values(&mut self, n: usize) -> Result<()> {
        let nr_corrs = self.layout.nr_corrs();
        if !(1..=nr_corrs).contains(&n) {
            return Err(RespMatError::SingValuesOutOfRange { n, max: nr_corrs });
        }
        let inversion = Inversion::compute(&self.matrix, &self.select_items, n)?;
        self.num_sing_values = n;
        self.inversion = inversion;
        self.publisher.send(Data::<respmat::NumSingValues>::new(n));
        self.publish_inversion();
        Ok(())
    }

    /// Computes the kicks correcting `orbit`: `kicks = -pinv * orbit`
    pub fn calculate_kicks(&self, orbit: &[f64]) -> Result<Kicks> {
        let expected = self.layout.nr_rows();
        if orbit.len() != expected {
            return Err(RespMatError::WrongSize {
                expected,
                found: orbit.len(),
            });
        }
        let values = -(self.inverse() * DVector::from_column_slice(orbit));
        let delta = Kicks::from_actuators(&self.layout, values.as_slice());
        self.publisher
            .send(Data::<kicks::DeltaKicksCH>::from(delta.ch.as_slice()));
        self.publisher
            .send(Data::<kicks::DeltaKicksCV>::from(delta.cv.as_slice()));
        self.publisher.send(Data::<kicks::DeltaKickRF>::new(delta.rf));
        Ok(delta)
    }

    /// Publishes the complete state of the engine
    pub fn publish(&self) {
        self.publisher
            .send(Data::<respmat::RespMat>::new(self.to_row_major()));
        self.publisher
            .send(Data::<respmat::NumSingValues>::new(self.num_sing_values));
        for class in [DeviceClass::BpmX, DeviceClass::Ch, DeviceClass::Cv, DeviceClass::Rf] {
            self.publish_mask(class);
        }
        self.publish_inversion();
    }

    fn publish_mask(&self, class: DeviceClass) {
        match class {
            DeviceClass::BpmX | DeviceClass::BpmY => self
                .publisher
                .send(Data::<respmat::EnblListBPM>::new(self.select_items.bpm())),
            DeviceClass::Ch => self.publisher.send(Data::<respmat::EnblListCH>::from(
                self.select_items.mask(class),
            )),
            DeviceClass::Cv => self.publisher.send(Data::<respmat::EnblListCV>::from(
                self.select_items.mask(class),
            )),
            DeviceClass::Rf => self
                .publisher
                .send(Data::<respmat::EnblRF>::new(self.select_items.rf())),
        }
    }

    fn publish_inversion(&self) {
        self.publisher.send(Data::<respmat::InvRespMat>::new(
            self.inverse().transpose().as_slice().to_vec(),
        ));
        self.publisher
            .send(Data::<respmat::SingValues>::from(self.sing_values()));
    }

    /// Saves the response matrix as a text table
    pub fn save_to<P: AsRef<Path> + Debug>(&self, path: P) -> Result<()> {
        Table::from_row_major(&self.to_row_major(), self.layout.nr_corrs()).to_path(path)?;
        Ok(())
    }

    fn save(&self) {
        let Some(path) = self.path.as_ref() else {
            return;
        };
        if let Err(e) = self.save_to(path) {
            print_info(
                format!("failed to save the response matrix to {path:?}"),
                Some(&e),
            );
        }
    }
}

impl Display for ResponseMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let n = self.sing_values().iter().filter(|s| **s > 0.).count();
        writeln!(f, "Response matrix: {}", self.layout)?;
        writeln!(
            f,
            " . selection: {} BPMs, {} CHs, {} CVs, RF {}",
            self.select_items.area(DeviceClass::BpmX) + self.select_items.area(DeviceClass::BpmY),
            self.select_items.area(DeviceClass::Ch),
            self.select_items.area(DeviceClass::Cv),
            if self.select_items.rf() { "on" } else { "off" }
        )?;
        write!(
            f,
            " . singular values: {}/{} retained",
            self.num_sing_values.min(n),
            n
        )
    }
}
