use sofb_clients_respmat::RespMatError;

use crate::ConfigError;

/// Error codes published to `Err-Mon`
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ErrorCode {
    #[error("no error")]
    Ok = 0,
    #[error("wrong number of values")]
    WrongSize = 1,
    #[error("no BPM selected")]
    NoBpmSelected = 2,
    #[error("no corrector selected")]
    NoCorrectorSelected = 3,
    #[error("response matrix inversion failed")]
    InversionFailed = 4,
    #[error("number of orbit samples out of bounds")]
    NrSplOutOfBounds = 5,
    #[error("measuring the response matrix")]
    MeasuringRespMat = 6,
    #[error("correcting the orbit")]
    Correcting = 7,
    #[error("configuration busy")]
    ConfigurationBusy = 8,
    #[error("operation mode is not off")]
    NotIdle = 9,
    #[error("correction strength out of bounds")]
    WeightOutOfBounds = 10,
    #[error("kicks application failed")]
    KickApplication = 11,
    #[error("orbit sampling failed")]
    OrbitSampling = 12,
    #[error("response matrix measurement failed")]
    RespMatMeasurement = 13,
    #[error("slot unavailable")]
    SlotUnavailable = 14,
    #[error("invalid value")]
    InvalidValue = 15,
    #[error("no orbit available")]
    OrbitUnavailable = 16,
    #[error("number of singular values out of range")]
    SingValuesOutOfRange = 17,
}

impl ErrorCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<&RespMatError> for ErrorCode {
    fn from(e: &RespMatError) -> Self {
        match e {
            RespMatError::WrongSize { .. } => ErrorCode::WrongSize,
            RespMatError::NoBpmSelected => ErrorCode::NoBpmSelected,
            RespMatError::NoCorrectorSelected => ErrorCode::NoCorrectorSelected,
            RespMatError::Svd | RespMatError::NonFinite => ErrorCode::InversionFailed,
            RespMatError::SingValuesOutOfRange { .. } => ErrorCode::SingValuesOutOfRange,
            RespMatError::IndexOutOfRange { .. } => ErrorCode::InvalidValue,
            RespMatError::Filing(_) => ErrorCode::SlotUnavailable,
        }
    }
}
impl From<RespMatError> for ErrorCode {
    fn from(e: RespMatError) -> Self {
        (&e).into()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SofbError {
    #[error("invalid configuration")]
    Config(#[from] ConfigError),
    #[error("failed to spawn the {0} thread")]
    Spawn(String, #[source] std::io::Error),
    #[error("{0}")]
    Refused(#[from] ErrorCode),
}
pub type Result<T> = std::result::Result<T, SofbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes() {
        assert_eq!(ErrorCode::Ok.code(), 0);
        assert_eq!(ErrorCode::ConfigurationBusy.code(), 8);
        assert_eq!(ErrorCode::SingValuesOutOfRange.code(), 17);
        assert_eq!(
            ErrorCode::from(&RespMatError::NonFinite),
            ErrorCode::InversionFailed
        );
    }
}
