use std::fmt::Display;

use nalgebra::{DMatrix, DVector};

use crate::{Grouping, Method, OpticsCorrBuilder, OpticsCorrError, Result};

/// Correction matrix and its pseudo-inverse
#[derive(Debug, Clone, PartialEq)]
struct Correction {
    matrix: DMatrix<f64>,
    inverse: DMatrix<f64>,
}

impl Correction {
    fn new(matrix: DMatrix<f64>) -> Result<Self> {
        let inverse = pseudo_inverse(&matrix)?;
        Ok(Self { matrix, inverse })
    }
}

/// Pseudo-inverse with singular values below `max(sv) * max(m,n) * eps` discarded
fn pseudo_inverse(matrix: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    if matrix.iter().any(|x| !x.is_finite()) {
        return Err(OpticsCorrError::NonFinite);
    }
    let svd = matrix
        .clone()
        .try_svd(true, true, f64::EPSILON, 0)
        .ok_or(OpticsCorrError::Svd)?;
    let cutoff =
        svd.singular_values.max() * matrix.nrows().max(matrix.ncols()) as f64 * f64::EPSILON;
    let inverse = svd
        .pseudo_inverse(cutoff)
        .map_err(|_| OpticsCorrError::Svd)?;
    if inverse.iter().any(|x| !x.is_finite()) {
        return Err(OpticsCorrError::NonFinite);
    }
    Ok(inverse)
}

/// Optics correction matrices
///
/// Any change to the nominal data or to the families grouping is validated
/// and the 4 correction matrices are recomputed before it is committed.
#[derive(Debug, Clone, PartialEq)]
pub struct OpticsCorr {
    nominal: OpticsCorrBuilder,
    nominal_matrix: DMatrix<f64>,
    focusing: Vec<usize>,
    defocusing: Vec<usize>,
    // indexed with `slot`
    corrections: Vec<Correction>,
}

fn slot(method: Method, grouping: Grouping) -> usize {
    match (method, grouping) {
        (Method::Additive, Grouping::Svd) => 0,
        (Method::Additive, Grouping::TwoKnobs) => 1,
        (Method::Proportional, Grouping::Svd) => 2,
        (Method::Proportional, Grouping::TwoKnobs) => 3,
    }
}

fn check_len(what: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(OpticsCorrError::WrongSize {
            what,
            expected,
            found,
        })
    }
}

/// Indices of the knob families into `ordering`, sorting `knob` in the same order
fn knob_indices(
    ordering: &[String],
    knob: &mut Vec<String>,
    name: &'static str,
) -> Result<Vec<usize>> {
    if knob.is_empty() {
        return Err(OpticsCorrError::EmptyKnob(name));
    }
    let mut indices = knob
        .iter()
        .map(|family| {
            ordering
                .iter()
                .position(|f| f == family)
                .ok_or_else(|| OpticsCorrError::UnknownFamily(family.clone()))
        })
        .collect::<Result<Vec<usize>>>()?;
    indices.sort_unstable();
    if let Some(i) = indices.windows(2).find(|w| w[0] == w[1]) {
        return Err(OpticsCorrError::DuplicateFamily(ordering[i[0]].clone()));
    }
    *knob = indices.iter().map(|&i| ordering[i].clone()).collect();
    Ok(indices)
}

impl OpticsCorr {
    /// Creates a [OpticsCorrBuilder]
    pub fn builder() -> OpticsCorrBuilder {
        Default::default()
    }

    pub(crate) fn new(
        magnetfams_ordering: Vec<String>,
        nominal_matrix: Vec<f64>,
        nominal_intstrengths: Vec<f64>,
        nominal_opticsparam: Vec<f64>,
        magnetfams_focusing: Vec<String>,
        magnetfams_defocusing: Vec<String>,
    ) -> Result<Self> {
        let mut nominal = OpticsCorrBuilder {
            magnetfams_ordering,
            nominal_matrix,
            nominal_intstrengths,
            nominal_opticsparam,
            magnetfams_focusing,
            magnetfams_defocusing,
        };

        let ordering = &nominal.magnetfams_ordering;
        let n = ordering.len();
        if n < 2 {
            return Err(OpticsCorrError::TooFewFamilies(n));
        }
        for (i, family) in ordering.iter().enumerate() {
            if ordering[..i].contains(family) {
                return Err(OpticsCorrError::DuplicateFamily(family.clone()));
            }
        }
        check_len("nominal matrix", 2 * n, nominal.nominal_matrix.len())?;
        check_len("nominal strengths", n, nominal.nominal_intstrengths.len())?;
        check_len("nominal optics parameters", 2, nominal.nominal_opticsparam.len())?;

        let focusing = knob_indices(ordering, &mut nominal.magnetfams_focusing, "focusing")?;
        let defocusing =
            knob_indices(ordering, &mut nominal.magnetfams_defocusing, "defocusing")?;
        if let Some(&i) = focusing.iter().find(|i| defocusing.contains(i)) {
            return Err(OpticsCorrError::OverlappingKnobs(ordering[i].clone()));
        }

        let nominal_matrix = DMatrix::from_row_slice(2, n, &nominal.nominal_matrix);
        let mut this = Self {
            nominal,
            nominal_matrix,
            focusing,
            defocusing,
            corrections: Vec::with_capacity(4),
        };
        for method in [Method::Additive, Method::Proportional] {
            for grouping in [Grouping::Svd, Grouping::TwoKnobs] {
                let matrix = this.correction_matrix(method, grouping);
                this.corrections.push(Correction::new(matrix)?);
            }
        }
        log::debug!("{this}");
        Ok(this)
    }

    /// Scale of family `k` for a given method
    fn weight(&self, method: Method, k: usize) -> f64 {
        match method {
            Method::Additive => 1.,
            Method::Proportional => self.nominal.nominal_intstrengths[k],
        }
    }

    fn correction_matrix(&self, method: Method, grouping: Grouping) -> DMatrix<f64> {
        let n = self.nominal_matrix.ncols();
        match grouping {
            Grouping::Svd => {
                let mut matrix = DMatrix::<f64>::zeros(2, n);
                for &k in self.focusing.iter().chain(&self.defocusing) {
                    let column = self.nominal_matrix.column(k) * self.weight(method, k);
                    matrix.set_column(k, &column);
                }
                matrix
            }
            Grouping::TwoKnobs => {
                let mut matrix = DMatrix::<f64>::zeros(2, 2);
                let knobs = [&self.focusing, &self.defocusing];
                for (knob, families) in knobs.into_iter().enumerate() {
                    for &k in families {
                        let column = self.nominal_matrix.column(k) * self.weight(method, k);
                        let mut knob_column = matrix.column_mut(knob);
                        knob_column += column;
                    }
                }
                matrix
            }
        }
    }

    /// Computes the strengths deltas of all the families to reach `target` optics parameters
    ///
    /// Families outside the knobs get a zero delta
    pub fn calculate_delta_intstrengths(
        &self,
        method: Method,
        grouping: Grouping,
        target: &[f64],
    ) -> Result<Vec<f64>> {
        check_len("optics parameters", 2, target.len())?;
        let diff = DVector::from_iterator(
            2,
            target
                .iter()
                .zip(&self.nominal.nominal_opticsparam)
                .map(|(t, n)| t - n),
        );
        let x = self.inverse(method, grouping) * diff;
        let n = self.nominal_matrix.ncols();
        let mut delta = vec![0.; n];
        match grouping {
            Grouping::Svd => {
                for &k in self.focusing.iter().chain(&self.defocusing) {
                    delta[k] = x[k] * self.weight(method, k);
                }
            }
            Grouping::TwoKnobs => {
                let knobs = [&self.focusing, &self.defocusing];
                for (knob, families) in knobs.into_iter().enumerate() {
                    for &k in families {
                        delta[k] = x[knob] * self.weight(method, k);
                    }
                }
            }
        }
        Ok(delta)
    }

    /// Computes the optics parameters for given strengths deltas:
    /// `nominal_opticsparam + nominal_matrix * delta`
    pub fn calculate_opticsparam(&self, delta_intstrengths: &[f64]) -> Result<Vec<f64>> {
        let n = self.nominal_matrix.ncols();
        check_len("strengths deltas", n, delta_intstrengths.len())?;
        let delta = &self.nominal_matrix * DVector::from_column_slice(delta_intstrengths);
        Ok(self
            .nominal
            .nominal_opticsparam
            .iter()
            .zip(delta.iter())
            .map(|(p, d)| p + d)
            .collect())
    }

    /// Returns a correction matrix
    pub fn matrix(&self, method: Method, grouping: Grouping) -> &DMatrix<f64> {
        &self.corrections[slot(method, grouping)].matrix
    }
    /// Returns the pseudo-inverse of a correction matrix
    pub fn inverse(&self, method: Method, grouping: Grouping) -> &DMatrix<f64> {
        &self.corrections[slot(method, grouping)].inverse
    }
    pub fn magnetfams_ordering(&self) -> &[String] {
        &self.nominal.magnetfams_ordering
    }
    pub fn nominal_matrix(&self) -> &DMatrix<f64> {
        &self.nominal_matrix
    }
    pub fn nominal_intstrengths(&self) -> &[f64] {
        &self.nominal.nominal_intstrengths
    }
    pub fn nominal_opticsparam(&self) -> &[f64] {
        &self.nominal.nominal_opticsparam
    }
    pub fn magnetfams_focusing(&self) -> &[String] {
        &self.nominal.magnetfams_focusing
    }
    pub fn magnetfams_defocusing(&self) -> &[String] {
        &self.nominal.magnetfams_defocusing
    }

    /// Applies `edit` to a copy of the nominal data, commits if the new data is valid
    fn update<F: FnOnce(&mut OpticsCorrBuilder)>(&mut self, edit: F) -> Result<()> {
        let mut nominal = self.nominal.clone();
        edit(&mut nominal);
        *self = nominal.try_into()?;
        Ok(())
    }

    pub fn set_magnetfams_ordering<I, S>(&mut self, families: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let families: Vec<String> = families.into_iter().map(|f| f.into()).collect();
        self.update(|nominal| nominal.magnetfams_ordering = families)
    }
    /// Sets the nominal 2xN matrix, row-major
    pub fn set_nominal_matrix(&mut self, matrix: Vec<f64>) -> Result<()> {
        self.update(|nominal| nominal.nominal_matrix = matrix)
    }
    pub fn set_nominal_intstrengths(&mut self, strengths: Vec<f64>) -> Result<()> {
        self.update(|nominal| nominal.nominal_intstrengths = strengths)
    }
    pub fn set_nominal_opticsparam(&mut self, opticsparam: Vec<f64>) -> Result<()> {
        self.update(|nominal| nominal.nominal_opticsparam = opticsparam)
    }
    pub fn set_magnetfams_focusing<I, S>(&mut self, families: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let families: Vec<String> = families.into_iter().map(|f| f.into()).collect();
        self.update(|nominal| nominal.magnetfams_focusing = families)
    }
    pub fn set_magnetfams_defocusing<I, S>(&mut self, families: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let families: Vec<String> = families.into_iter().map(|f| f.into()).collect();
        self.update(|nominal| nominal.magnetfams_defocusing = families)
    }
}

impl Display for OpticsCorr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Optics correction: {} families",
            self.nominal.magnetfams_ordering.len()
        )?;
        writeln!(f, " . focusing: {:?}", self.nominal.magnetfams_focusing)?;
        write!(f, " . defocusing: {:?}", self.nominal.magnetfams_defocusing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sirius() -> OpticsCorr {
        OpticsCorr::builder()
            .magnetfams_ordering(["QFA", "QDA", "QFB", "QDB"])
            .nominal_matrix(vec![1.0, -0.8, 2.1, -0.3, 0.4, -1.2, 0.7, -2.0])
            .nominal_intstrengths(vec![0.7, -0.2, 1.4, -0.5])
            .nominal_opticsparam(vec![49.1, 14.2])
            .magnetfams_focusing(["QFB", "QFA"])
            .magnetfams_defocusing(["QDA"])
            .build()
            .unwrap()
    }

    #[test]
    fn knobs_sorted() {
        let corr = sirius();
        assert_eq!(corr.magnetfams_focusing(), &["QFA", "QFB"]);
        // QDB is not in any knob
        let m = corr.matrix(Method::Additive, Grouping::Svd);
        assert!(m.column(3).iter().all(|x| *x == 0.));
        let m = corr.matrix(Method::Proportional, Grouping::TwoKnobs);
        assert!((m[(0, 0)] - (1.0 * 0.7 + 2.1 * 1.4)).abs() < 1e-12);
        assert!((m[(1, 1)] - (-1.2 * -0.2)).abs() < 1e-12);
    }

    #[test]
    fn rejected_setters() {
        let mut corr = sirius();
        let snapshot = corr.clone();
        assert!(matches!(
            corr.set_magnetfams_focusing(["QFA", "QFC"]),
            Err(OpticsCorrError::UnknownFamily(f)) if f == "QFC"
        ));
        assert!(matches!(
            corr.set_magnetfams_defocusing(Vec::<String>::new()),
            Err(OpticsCorrError::EmptyKnob("defocusing"))
        ));
        assert!(matches!(
            corr.set_magnetfams_defocusing(["QDA", "QFA"]),
            Err(OpticsCorrError::OverlappingKnobs(_))
        ));
        assert!(matches!(
            corr.set_magnetfams_ordering(["QFA"]),
            Err(OpticsCorrError::TooFewFamilies(1))
        ));
        assert!(matches!(
            corr.set_nominal_matrix(vec![1.; 6]),
            Err(OpticsCorrError::WrongSize { expected: 8, .. })
        ));
        assert!(matches!(
            corr.set_nominal_intstrengths(vec![f64::NAN; 4]),
            Err(OpticsCorrError::NonFinite)
        ));
        assert_eq!(corr, snapshot);
        corr.set_nominal_opticsparam(vec![49.2, 14.3]).unwrap();
        assert_eq!(corr.nominal_opticsparam(), &[49.2, 14.3]);
    }
}
