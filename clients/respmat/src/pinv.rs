use nalgebra::DMatrix;

use crate::{RespMatError, Result, SelectItems};

/// Truncated pseudo-inverse of the selected response matrix
///
/// `inverse` has the shape of the transposed response matrix with zeros
/// at the rows and columns of the disabled devices.
#[derive(Debug, Clone, PartialEq)]
pub struct Inversion {
    pub(crate) sing_values: Vec<f64>,
    pub(crate) inverse: DMatrix<f64>,
}

impl Inversion {
    /// Zero inverse for a matrix of the given shape
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            sing_values: vec![0.; ncols],
            inverse: DMatrix::zeros(ncols, nrows),
        }
    }
    /// Computes the pseudo-inverse of `matrix` restricted to `select`,
    /// retaining the `num_sing_values` largest singular values
    pub fn compute(
        matrix: &DMatrix<f64>,
        select: &SelectItems,
        num_sing_values: usize,
    ) -> Result<Self> {
        let rows = select.rows();
        if rows.is_empty() {
            return Err(RespMatError::NoBpmSelected);
        }
        let cols = select.cols();
        if cols.is_empty() {
            return Err(RespMatError::NoCorrectorSelected);
        }
        let sub = DMatrix::from_fn(rows.len(), cols.len(), |i, j| matrix[(rows[i], cols[j])]);
        if sub.iter().any(|x| !x.is_finite()) {
            return Err(RespMatError::NonFinite);
        }

        let svd = sub
            .try_svd(true, true, f64::EPSILON, 0)
            .ok_or(RespMatError::Svd)?;
        let (Some(u), Some(v_t)) = (svd.u.as_ref(), svd.v_t.as_ref()) else {
            return Err(RespMatError::Svd);
        };
        let s = &svd.singular_values;
        let mut order: Vec<usize> = (0..s.len()).collect();
        order.sort_by(|&a, &b| s[b].total_cmp(&s[a]));

        // singular values below the cut-off are truncated with the ones beyond `num_sing_values`
        let cutoff = order.first().map_or(0., |&k| s[k])
            * rows.len().max(cols.len()) as f64
            * f64::EPSILON;
        let retained: Vec<usize> = order
            .iter()
            .take(num_sing_values)
            .copied()
            .filter(|&k| s[k] > cutoff)
            .collect();
        let mut pinv = DMatrix::<f64>::zeros(cols.len(), rows.len());
        for &k in &retained {
            let inv_s = s[k].recip();
            pinv += (v_t.row(k).transpose() * u.column(k).transpose()) * inv_s;
        }
        if pinv.iter().any(|x| !x.is_finite()) {
            return Err(RespMatError::NonFinite);
        }

        let mut inverse = DMatrix::<f64>::zeros(matrix.ncols(), matrix.nrows());
        for (j, &col) in cols.iter().enumerate() {
            for (i, &row) in rows.iter().enumerate() {
                inverse[(col, row)] = pinv[(j, i)];
            }
        }
        let mut sing_values: Vec<f64> = order.iter().map(|&k| s[k]).collect();
        sing_values.resize(matrix.ncols(), 0.);

        log::debug!(
            "pseudo-inverse of ({}x{}) selection with {} singular values",
            rows.len(),
            cols.len(),
            retained.len(),
        );
        Ok(Self {
            sing_values,
            inverse,
        })
    }
    /// Singular values in descending order, padded with zeros to the number of actuators
    pub fn sing_values(&self) -> &[f64] {
        &self.sing_values
    }
    /// Pseudo-inverse
    pub fn inverse(&self) -> &DMatrix<f64> {
        &self.inverse
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DeviceClass, Layout};

    fn close(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(a, b)| (a - b).abs() < 1e-12)
    }

    #[test]
    fn diagonal() {
        let layout = Layout::new(2, 1, 1);
        // 4 rows, 3 columns
        let matrix = DMatrix::from_row_slice(
            4,
            3,
            &[2., 0., 0., 0., 0., 0., 0., 4., 0., 0., 0., 1.],
        );
        let select = SelectItems::new(&layout);
        let inv = Inversion::compute(&matrix, &select, 3).unwrap();
        assert!(close(inv.sing_values(), &[4., 2., 1.]));
        assert!((inv.inverse()[(0, 0)] - 0.5).abs() < 1e-12);
        assert!((inv.inverse()[(1, 2)] - 0.25).abs() < 1e-12);
        assert!((inv.inverse()[(2, 3)] - 1.).abs() < 1e-12);

        let inv = Inversion::compute(&matrix, &select, 1).unwrap();
        assert!(close(inv.sing_values(), &[4., 2., 1.]));
        assert!(inv.inverse()[(0, 0)].abs() < 1e-12);
        assert!((inv.inverse()[(1, 2)] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn degenerate() {
        let layout = Layout::new(2, 1, 1);
        let matrix = DMatrix::from_element(4, 3, 1.);
        let mut select = SelectItems::new(&layout);
        select.set(DeviceClass::BpmX, &[]);
        select.set(DeviceClass::BpmY, &[]);
        assert!(matches!(
            Inversion::compute(&matrix, &select, 3),
            Err(RespMatError::NoBpmSelected)
        ));
        let mut select = SelectItems::new(&layout);
        select.set(DeviceClass::Ch, &[]);
        select.set(DeviceClass::Cv, &[]);
        select.set(DeviceClass::Rf, &[]);
        assert!(matches!(
            Inversion::compute(&matrix, &select, 3),
            Err(RespMatError::NoCorrectorSelected)
        ));
    }

    #[test]
    fn zero_singular_value() {
        let layout = Layout::new(2, 1, 1);
        let matrix = DMatrix::zeros(4, 3);
        let select = SelectItems::new(&layout);
        let inv = Inversion::compute(&matrix, &select, 3).unwrap();
        assert!(inv.inverse().iter().all(|x| *x == 0.));
        assert!(inv.sing_values().iter().all(|x| *x == 0.));
    }

    #[test]
    fn unmeasured_column() {
        let layout = Layout::new(2, 1, 1);
        // RF column left to zero
        let matrix = DMatrix::from_row_slice(
            4,
            3,
            &[2., 0., 0., 0., 0., 0., 0., 4., 0., 0., 0., 0.],
        );
        let select = SelectItems::new(&layout);
        let inv = Inversion::compute(&matrix, &select, 3).unwrap();
        assert!(close(inv.sing_values(), &[4., 2., 0.]));
        assert!((inv.inverse()[(0, 0)] - 0.5).abs() < 1e-12);
        assert!((inv.inverse()[(1, 2)] - 0.25).abs() < 1e-12);
        assert!(inv.inverse().row(2).amax() < 1e-12);
    }

    #[test]
    fn non_finite() {
        let layout = Layout::new(2, 1, 1);
        let mut matrix = DMatrix::from_element(4, 3, 1.);
        matrix[(1, 1)] = f64::NAN;
        let select = SelectItems::new(&layout);
        assert!(matches!(
            Inversion::compute(&matrix, &select, 3),
            Err(RespMatError::NonFinite)
        ));
    }
}
