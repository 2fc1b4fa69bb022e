/*!
# SOFB fields

Unique identifiers of the fields published by the SOFB units.

The field name of each identifier is the name of the process variable
the IOC layer maps the data to.
*/

/// Orbit
pub mod orbit {
    use interface::UID;
    /// Averaged horizontal orbit
    #[derive(UID)]
    #[uid(field = "SlowOrbX-Mon")]
    pub enum SlowOrbX {}
    /// Averaged vertical orbit
    #[derive(UID)]
    #[uid(field = "SlowOrbY-Mon")]
    pub enum SlowOrbY {}
    /// Horizontal reference orbit
    #[derive(UID)]
    #[uid(field = "RefOrbX-RB")]
    pub enum RefOrbX {}
    /// Vertical reference orbit
    #[derive(UID)]
    #[uid(field = "RefOrbY-RB")]
    pub enum RefOrbY {}
    /// Number of samples of the orbit average
    #[derive(UID)]
    #[uid(data = usize, field = "NrSpl-RB")]
    pub enum NrSpl {}
}

/// Correctors and RF kicks
pub mod kicks {
    use interface::UID;
    /// Horizontal correctors kicks
    #[derive(UID)]
    #[uid(field = "DeltaKicksCH-Mon")]
    pub enum DeltaKicksCH {}
    /// Vertical correctors kicks
    #[derive(UID)]
    #[uid(field = "DeltaKicksCV-Mon")]
    pub enum DeltaKicksCV {}
    /// RF frequency kick
    #[derive(UID)]
    #[uid(data = f64, field = "DeltaKickRF-Mon")]
    pub enum DeltaKickRF {}
    /// Horizontal correction strength `[%]`
    #[derive(UID)]
    #[uid(data = f64, field = "StrthCH-RB")]
    pub enum StrthCH {}
    /// Vertical correction strength `[%]`
    #[derive(UID)]
    #[uid(data = f64, field = "StrthCV-RB")]
    pub enum StrthCV {}
}

/// Response matrix
pub mod respmat {
    use interface::UID;
    /// Response matrix, row-major
    #[derive(UID)]
    #[uid(field = "RespMat-RB")]
    pub enum RespMat {}
    /// Response matrix pseudo-inverse, row-major
    #[derive(UID)]
    #[uid(field = "InvRespMat-Mon")]
    pub enum InvRespMat {}
    /// Response matrix singular values
    #[derive(UID)]
    #[uid(field = "SingValues-Mon")]
    pub enum SingValues {}
    /// Number of singular values retained in the pseudo-inverse
    #[derive(UID)]
    #[uid(data = usize, field = "NumSingValues-RB")]
    pub enum NumSingValues {}
    /// BPMs enable list, horizontal then vertical
    #[derive(UID)]
    #[uid(data = Vec<bool>, field = "EnblListBPM-RB")]
    pub enum EnblListBPM {}
    /// Horizontal correctors enable list
    #[derive(UID)]
    #[uid(data = Vec<bool>, field = "EnblListCH-RB")]
    pub enum EnblListCH {}
    /// Vertical correctors enable list
    #[derive(UID)]
    #[uid(data = Vec<bool>, field = "EnblListCV-RB")]
    pub enum EnblListCV {}
    /// RF enable
    #[derive(UID)]
    #[uid(data = bool, field = "EnblRF-RB")]
    pub enum EnblRF {}
}

/// Operation status
pub mod status {
    use interface::UID;
    /// Error code of the last refused or failed operation
    #[derive(UID)]
    #[uid(data = i64, field = "Err-Mon")]
    pub enum Error {}
    /// Operation mode
    #[derive(UID)]
    #[uid(data = i64, field = "OpMode-Sts")]
    pub enum OpMode {}
    /// Orbit correction mode register
    #[derive(UID)]
    #[uid(data = String, field = "CorrMode-Sts")]
    pub enum CorrMode {}
    /// Response matrix measurement mode register
    #[derive(UID)]
    #[uid(data = String, field = "MeasRespMatMode-Sts")]
    pub enum MeasRespMatMode {}
    /// Variable update mode register
    #[derive(UID)]
    #[uid(data = String, field = "VarUpdateMode-Sts")]
    pub enum VarUpdateMode {}
    /// RF frequency correction enable
    #[derive(UID)]
    #[uid(data = bool, field = "RFreqEnbl-Sts")]
    pub enum RFreqEnbl {}
    /// Response matrix type: uncoupled (0) or coupled (1)
    #[derive(UID)]
    #[uid(data = i64, field = "RespMatType-Sts")]
    pub enum RespMatType {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use interface::{Data, UniqueIdentifier, Value};

    #[test]
    fn field_names() {
        assert_eq!(<orbit::SlowOrbX as UniqueIdentifier>::FIELD, "SlowOrbX-Mon");
        assert_eq!(<respmat::SingValues as UniqueIdentifier>::FIELD, "SingValues-Mon");
        assert_eq!(<status::Error as UniqueIdentifier>::FIELD, "Err-Mon");
        let data = Data::<respmat::EnblListBPM>::new(vec![true, false]);
        assert_eq!(Value::from(data), Value::Bools(vec![true, false]));
    }
}
