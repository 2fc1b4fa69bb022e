use std::{path::PathBuf, sync::Arc};

use interface::{
    filing::{Filing, Table},
    print_info, Publisher, Silent,
};
use nalgebra::DMatrix;

use crate::{Inversion, Layout, ResponseMatrix, SelectItems};

/// Builder for [ResponseMatrix]
pub struct ResponseMatrixBuilder {
    layout: Layout,
    path: Option<PathBuf>,
    num_sing_values: Option<usize>,
    select_items: Option<SelectItems>,
    publisher: Arc<dyn Publisher>,
}

impl Default for ResponseMatrixBuilder {
    fn default() -> Self {
        Self {
            layout: Default::default(),
            path: None,
            num_sing_values: None,
            select_items: None,
            publisher: Arc::new(Silent),
        }
    }
}

impl ResponseMatrixBuilder {
    /// Sets the device layout
    pub fn layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }
    /// Sets the path the response matrix is loaded from and saved to
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
    /// Sets the number of singular values retained in the pseudo-inverse
    ///
    /// Defaults to the number of actuators
    pub fn num_sing_values(mut self, n: usize) -> Self {
        self.num_sing_values = Some(n);
        self
    }
    /// Sets the initial enable masks
    pub fn select_items(mut self, select_items: SelectItems) -> Self {
        self.select_items = Some(select_items);
        self
    }
    /// Sets the [Publisher] of the engine outputs
    pub fn publisher<P: Publisher + 'static>(mut self, publisher: P) -> Self {
        self.publisher = Arc::new(publisher);
        self
    }
    /// Sets a shared [Publisher]
    pub fn shared_publisher(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publisher = publisher;
        self
    }
    /// Builds the [ResponseMatrix]
    ///
    /// The response matrix is loaded from the file if there is one;
    /// if the file is missing or invalid, the matrix and its inverse are set to zero.
    pub fn build(self) -> ResponseMatrix {
        let Self {
            layout,
            path,
            num_sing_values,
            select_items,
            publisher,
        } = self;
        let (nrows, ncols) = (layout.nr_rows(), layout.nr_corrs());
        let num_sing_values = match num_sing_values {
            Some(n) if (1..=ncols).contains(&n) => n,
            Some(n) => {
                log::warn!("{n} singular values out of range, retaining {ncols}");
                ncols
            }
            None => ncols,
        };
        let select_items = select_items.unwrap_or_else(|| SelectItems::new(&layout));

        let loaded = path.as_ref().and_then(|path| {
            let matrix = match Table::from_path(path).and_then(|t| t.expect_shape(nrows, ncols)) {
                Ok(table) => DMatrix::from_row_slice(nrows, ncols, &table.into_row_major()),
                Err(e) => {
                    print_info("response matrix not loaded", Some(&e));
                    return None;
                }
            };
            match Inversion::compute(&matrix, &select_items, num_sing_values) {
                Ok(inversion) => Some((matrix, inversion)),
                Err(e) => {
                    print_info("invalid response matrix", Some(&e));
                    None
                }
            }
        });
        let (matrix, inversion) = loaded.unwrap_or_else(|| {
            log::warn!("starting from a zero response matrix");
            (DMatrix::zeros(nrows, ncols), Inversion::zeros(nrows, ncols))
        });

        let rm = ResponseMatrix {
            layout,
            matrix,
            select_items,
            num_sing_values,
            inversion,
            path,
            publisher,
        };
        log::info!("{rm}");
        rm
    }
}
