use std::{
    path::PathBuf,
    sync::{atomic::AtomicBool, Arc, OnceLock, Weak},
};

use interface::{Channel, Update, Value};
use nalgebra::DMatrix;
use sofb::{
    respmat::{Kicks, Layout},
    sim::LinearMachine,
    ErrorCode, HardwareError, Machine, MeasurementBlock, OpMode, Plane, Sofb, SofbConfig,
    VarUpdate,
};

type Fields = flume::Receiver<(String, Value)>;

// 8 readings and 8 actuators: the response matrix is invertible
fn layout() -> Layout {
    Layout::new(4, 4, 3)
}

fn config() -> SofbConfig {
    SofbConfig::builder().layout(layout()).rf_enabled(true)
}

fn setup(config: SofbConfig, seed: u64) -> anyhow::Result<(Sofb, Arc<LinearMachine>, Fields)> {
    let machine = Arc::new(LinearMachine::random(&config.layout, seed));
    let (publisher, rx) = Channel::new();
    let sofb = Sofb::new(config, machine.clone(), Arc::new(publisher))?;
    Ok((sofb, machine, rx))
}

fn error_codes(rx: &Fields) -> Vec<i64> {
    rx.try_iter()
        .filter_map(|(field, value)| match (field.as_str(), value) {
            ("Err-Mon", Value::Int(code)) => Some(code),
            _ => None,
        })
        .collect()
}

fn rms(x: &[f64]) -> f64 {
    (x.iter().map(|x| x * x).sum::<f64>() / x.len() as f64).sqrt()
}

fn measure(sofb: &Sofb) -> anyhow::Result<()> {
    sofb.set_op_mode(OpMode::MeasureRespMat)?;
    sofb.respmat_measurement().update();
    assert!(sofb.measurement_mode().is_idle());
    assert_eq!(sofb.op_mode(), OpMode::Off);
    Ok(())
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(name);
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[test]
fn measure_then_correct() -> anyhow::Result<()> {
    let config = config().n_samples(1);
    let (sofb, machine, rx) = setup(config, 5)?;

    measure(&sofb)?;
    assert_eq!(&sofb.response_matrix(), machine.response());

    let initial = rms(&machine.orbit());
    sofb.set_op_mode(OpMode::Correct)?;
    let mut orbit = sofb.orbit_measurement();
    let mut correction = sofb.orbit_correction();
    for _ in 0..3 {
        orbit.update();
        correction.update();
    }
    let last = rms(&machine.orbit());
    assert!(
        last < 1e-6 * initial,
        "orbit RMS: {initial:.3e} -> {last:.3e}"
    );
    assert!(sofb.correction_mode().is_active());
    assert!(error_codes(&rx).is_empty());
    Ok(())
}

#[test]
fn weighted_correction() -> anyhow::Result<()> {
    let config = config().strengths(50., 50.).n_samples(1);
    let (sofb, machine, _rx) = setup(config, 5)?;
    measure(&sofb)?;

    let initial = rms(&machine.orbit());
    sofb.manual_correction(2)?;
    sofb.orbit_measurement().update();
    sofb.orbit_correction().update();
    assert!(sofb.correction_mode().is_idle());
    let last = rms(&machine.orbit());
    assert!((last - 0.5 * initial).abs() < 1e-6 * initial);
    Ok(())
}

#[test]
fn horizontal_correction() -> anyhow::Result<()> {
    let layout = layout();
    let config = SofbConfig::builder().layout(layout).n_samples(1);
    let (sofb, machine, _rx) = setup(config, 9)?;
    let flat = machine.response().transpose().as_slice().to_vec();
    sofb.request_update(VarUpdate::RespMat(flat))?;
    sofb.variable_update().update();

    sofb.manual_correction(0)?;
    sofb.orbit_measurement().update();
    sofb.orbit_correction().update();
    assert!(sofb.correction_mode().is_idle());

    let actuators = machine.actuators();
    assert!(actuators[layout.ch_cols()].iter().any(|x| *x != 0.));
    assert!(actuators[layout.cv_cols()].iter().all(|x| *x == 0.));
    assert_eq!(actuators[layout.rf_col()], 0.);
    Ok(())
}

#[test]
fn kick_failure_forces_off() -> anyhow::Result<()> {
    let (sofb, machine, rx) = setup(config(), 5)?;
    measure(&sofb)?;

    machine.fail_kicks(true);
    sofb.set_op_mode(OpMode::Correct)?;
    sofb.orbit_measurement().update();
    sofb.orbit_correction().update();
    assert_eq!(sofb.op_mode(), OpMode::Off);
    assert!(sofb.correction_mode().is_idle());
    assert!(!sofb.registers().auto_correct);
    assert_eq!(error_codes(&rx), vec![ErrorCode::KickApplication.code() as i64]);
    Ok(())
}

#[test]
fn no_orbit_no_kicks() -> anyhow::Result<()> {
    let (sofb, machine, rx) = setup(config(), 5)?;
    measure(&sofb)?;

    sofb.set_op_mode(OpMode::Correct)?;
    sofb.orbit_correction().update();
    assert!(sofb.correction_mode().is_active());
    assert!(machine.actuators().iter().all(|x| *x == 0.));

    machine.disconnect(true);
    sofb.orbit_measurement().update();
    assert!(sofb.average_orbit().is_none());
    assert_eq!(error_codes(&rx), vec![16, 12]);
    Ok(())
}

#[test]
fn slots() -> anyhow::Result<()> {
    let layout = layout();
    let dir = temp_dir("sofb-closed-loop-slots");
    let config = SofbConfig::builder().layout(layout).slots_dir(&dir);
    let (sofb, machine, rx) = setup(config, 13)?;

    let flat = machine.response().transpose().as_slice().to_vec();
    sofb.slots().save_respmat(3, &layout, &flat)?;
    let reference: Vec<f64> = (0..layout.nr_bpms).map(|i| 0.1 * i as f64).collect();
    sofb.slots().save_reforb(Plane::Vertical, 1, &reference)?;

    sofb.write("RespMatSlot", Value::Int(3))?;
    sofb.variable_update().update();
    assert_eq!(&sofb.response_matrix(), machine.response());

    sofb.write("RefOrbYSlot", Value::Int(1))?;
    sofb.variable_update().update();
    assert_eq!(sofb.reference_orbit().y, reference);

    sofb.write("RefOrbXSlot", Value::Int(9))?;
    sofb.variable_update().update();
    assert!(sofb.var_update_mode().is_idle());
    assert_eq!(sofb.reference_orbit().x, vec![0.; layout.nr_bpms]);
    assert_eq!(error_codes(&rx), vec![14]);
    Ok(())
}

#[test]
fn persistence() -> anyhow::Result<()> {
    let path = temp_dir("sofb-closed-loop-persistence").join("respmat.txt");
    std::fs::create_dir_all(path.parent().unwrap())?;
    let config = config().respmat_path(&path);

    let (sofb, machine, _rx) = setup(config.clone(), 17)?;
    measure(&sofb)?;
    drop(sofb);

    let (sofb, _, _rx) = setup(config, 17)?;
    let reloaded = sofb.response_matrix();
    assert!((reloaded - machine.response()).abs().max() < 1e-12);
    Ok(())
}

#[test]
fn device_masks() -> anyhow::Result<()> {
    let layout = layout();
    let (sofb, machine, _rx) = setup(config().n_samples(1), 21)?;
    measure(&sofb)?;

    // second vertical corrector
    let corr = layout.nr_ch + 1;
    sofb.write("RmvCorr", Value::Int(corr as i64))?;
    sofb.variable_update().update();
    let enabled = sofb.with_response_matrix(|engine| {
        engine
            .select_items()
            .mask(sofb::respmat::DeviceClass::Cv)
            .to_vec()
    });
    assert_eq!(enabled, vec![true, false, true]);

    sofb.manual_correction(2)?;
    sofb.orbit_measurement().update();
    sofb.orbit_correction().update();
    assert_eq!(machine.actuators()[corr], 0.);
    Ok(())
}

#[test]
fn measure_without_rf() -> anyhow::Result<()> {
    let layout = layout();
    let config = SofbConfig::builder().layout(layout).n_samples(1);
    let (sofb, machine, rx) = setup(config, 5)?;

    measure(&sofb)?;
    let measured = sofb.response_matrix();
    let correctors = layout.nr_ch + layout.nr_cv;
    assert_eq!(
        measured.columns(0, correctors),
        machine.response().columns(0, correctors)
    );
    assert!(measured.column(layout.rf_col()).iter().all(|x| *x == 0.));
    let rf_row =
        sofb.with_response_matrix(|engine| engine.inverse().row(layout.rf_col()).amax());
    assert!(rf_row < 1e-9);

    let initial = rms(&machine.orbit());
    sofb.manual_correction(2)?;
    sofb.orbit_measurement().update();
    sofb.orbit_correction().update();
    assert!(rms(&machine.orbit()) < initial);
    assert_eq!(machine.actuators()[layout.rf_col()], 0.);
    assert!(error_codes(&rx).is_empty());
    Ok(())
}

#[test]
fn uncoupled_measurement() -> anyhow::Result<()> {
    let layout = layout();
    let config = SofbConfig::builder().layout(layout).coupled(false);
    let (sofb, machine, rx) = setup(config, 5)?;

    measure(&sofb)?;
    let measured = sofb.response_matrix();
    let response = machine.response();
    for (rows, cols) in [
        (layout.x_rows(), layout.ch_cols()),
        (layout.y_rows(), layout.cv_cols()),
    ] {
        for i in rows.clone() {
            for j in cols.clone() {
                assert_eq!(measured[(i, j)], response[(i, j)]);
            }
        }
    }
    for i in layout.x_rows() {
        for j in layout.cv_cols() {
            assert_eq!(measured[(i, j)], 0.);
        }
    }
    assert!(error_codes(&rx).is_empty());
    Ok(())
}

/// Ring requesting the continuous correction while a kick is applied
struct SwitchingRing {
    ring: LinearMachine,
    sofb: OnceLock<Weak<Sofb>>,
}

impl Machine for SwitchingRing {
    fn read_orbit(&self) -> Result<Vec<f64>, HardwareError> {
        self.ring.read_orbit()
    }
    fn apply_kicks(&self, kicks: &Kicks) -> Result<(), HardwareError> {
        if let Some(sofb) = self.sofb.get().and_then(Weak::upgrade) {
            sofb.set_op_mode(OpMode::Correct)
                .map_err(|e| HardwareError::Disconnected(e.to_string()))?;
        }
        self.ring.apply_kicks(kicks)
    }
    fn measure_response_matrix(
        &self,
        block: &MeasurementBlock,
        interrupt: &AtomicBool,
    ) -> Result<DMatrix<f64>, HardwareError> {
        self.ring.measure_response_matrix(block, interrupt)
    }
}

#[test]
fn continuous_correction_after_manual_pass() -> anyhow::Result<()> {
    let config = config().n_samples(1);
    let machine = Arc::new(SwitchingRing {
        ring: LinearMachine::random(&config.layout, 5),
        sofb: OnceLock::new(),
    });
    let (publisher, rx) = Channel::new();
    let sofb = Arc::new(Sofb::new(config, machine.clone(), Arc::new(publisher))?);
    measure(&sofb)?;
    let _ = machine.sofb.set(Arc::downgrade(&sofb));

    sofb.manual_correction(2)?;
    sofb.orbit_measurement().update();
    sofb.orbit_correction().update();
    assert!(sofb.correction_mode().is_active());
    assert!(sofb.registers().auto_correct);
    assert_eq!(sofb.op_mode(), OpMode::Correct);
    assert!(error_codes(&rx).is_empty());
    Ok(())
}
