//! # Slots
//!
//! Response matrices and reference orbits saved as text tables in a directory:
//! `respmat_<n>.txt`, `reforbx_<n>.txt` and `reforby_<n>.txt`.

use std::path::{Path, PathBuf};

use interface::filing::{Filing, FilingError, Table};
use sofb_clients_respmat::Layout;

use crate::Plane;

#[derive(Debug, Clone)]
pub struct SlotStore {
    dir: PathBuf,
}

impl SlotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
    pub fn dir(&self) -> &Path {
        &self.dir
    }
    pub fn respmat_path(&self, slot: usize) -> PathBuf {
        self.dir.join(format!("respmat_{slot}.txt"))
    }
    pub fn reforb_path(&self, plane: Plane, slot: usize) -> PathBuf {
        let name = match plane {
            Plane::Horizontal => "reforbx",
            Plane::Vertical => "reforby",
        };
        self.dir.join(format!("{name}_{slot}.txt"))
    }
    /// Loads a response matrix, row-major
    pub fn load_respmat(&self, slot: usize, layout: &Layout) -> Result<Vec<f64>, FilingError> {
        Ok(Table::from_path(self.respmat_path(slot))?
            .expect_shape(layout.nr_rows(), layout.nr_corrs())?
            .into_row_major())
    }
    /// Loads a reference orbit, written either as a row or as a column
    pub fn load_reforb(
        &self,
        plane: Plane,
        slot: usize,
        nr_bpms: usize,
    ) -> Result<Vec<f64>, FilingError> {
        let table = Table::from_path(self.reforb_path(plane, slot))?;
        let table = if table.nrows() == 1 {
            table.expect_shape(1, nr_bpms)?
        } else {
            table.expect_shape(nr_bpms, 1)?
        };
        Ok(table.into_row_major())
    }
    pub fn save_respmat(
        &self,
        slot: usize,
        layout: &Layout,
        flat: &[f64],
    ) -> Result<(), FilingError> {
        std::fs::create_dir_all(&self.dir)?;
        Table::from_row_major(flat, layout.nr_corrs()).to_path(self.respmat_path(slot))
    }
    pub fn save_reforb(&self, plane: Plane, slot: usize, orbit: &[f64]) -> Result<(), FilingError> {
        std::fs::create_dir_all(&self.dir)?;
        Table::column(orbit).to_path(self.reforb_path(plane, slot))
    }
}
