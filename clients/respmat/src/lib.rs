/*!
# SOFB response matrix

The [ResponseMatrix] maps the correctors and RF actuators to the BPM readings.
It holds the devices enable masks ([SelectItems]) and the truncated SVD pseudo-inverse
of the selected sub-matrix, used to turn an orbit distortion into corrective [Kicks].

```
use sofb_clients_respmat::{DeviceClass, Layout, ResponseMatrix};

let layout = Layout::new(2, 1, 1);
let mut rm = ResponseMatrix::builder().layout(layout).build();
rm.set_response_matrix(&[
    1., 0., 0.,
    0., 0., 1.,
    0., 2., 0.,
    0., 0., 0.,
])?;
let kicks = rm.calculate_kicks(&[0.5, 0., 1., 0.])?;
assert!((kicks.cv[0] + 0.5).abs() < 1e-12);
rm.set_enable_mask(DeviceClass::Ch, &[false])?;
assert_eq!(rm.inverse().row(0).sum(), 0.);
# Ok::<(), sofb_clients_respmat::RespMatError>(())
```
*/

mod layout;
pub use layout::{DeviceClass, Layout, NR_BPMS, NR_CH, NR_CORRS, NR_CV};
mod selection;
pub use selection::SelectItems;
mod kicks;
pub use kicks::Kicks;
mod pinv;
pub use pinv::Inversion;
mod response_matrix;
pub use response_matrix::{ResponseMatrix, ResponseMatrixBuilder};

#[derive(Debug, thiserror::Error)]
pub enum RespMatError {
    #[error("expected {expected} values, found {found}")]
    WrongSize { expected: usize, found: usize },
    #[error("no BPM selected")]
    NoBpmSelected,
    #[error("no corrector nor RF selected")]
    NoCorrectorSelected,
    #[error("SVD failed to converge")]
    Svd,
    #[error("pseudo-inverse has non-finite values")]
    NonFinite,
    #[error("number of singular values must be in [1,{max}], found {n}")]
    SingValuesOutOfRange { n: usize, max: usize },
    #[error("{class} index {index} out of range (0..{n})")]
    IndexOutOfRange {
        class: DeviceClass,
        index: usize,
        n: usize,
    },
    #[error("response matrix filing failed")]
    Filing(#[from] interface::filing::FilingError),
}
pub type Result<T> = std::result::Result<T, RespMatError>;
