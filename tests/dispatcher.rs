use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use interface::{Channel, Update, Value};
use sofb::{
    respmat::Layout, sim::LinearMachine, CorrectionMode, ErrorCode, Mode, OpMode, Planes,
    Selection, Sofb, SofbConfig, VarUpdate,
};

type Fields = flume::Receiver<(String, Value)>;

fn layout() -> Layout {
    Layout::new(4, 4, 3)
}

fn setup(config: SofbConfig) -> anyhow::Result<(Sofb, Arc<LinearMachine>, Fields)> {
    let machine = Arc::new(LinearMachine::random(&config.layout, 11));
    let (publisher, rx) = Channel::new();
    let sofb = Sofb::new(config, machine.clone(), Arc::new(publisher))?;
    Ok((sofb, machine, rx))
}

fn commit_response(sofb: &Sofb, machine: &LinearMachine) -> anyhow::Result<()> {
    let flat = machine.response().transpose().as_slice().to_vec();
    sofb.request_update(VarUpdate::RespMat(flat))?;
    sofb.variable_update().update();
    Ok(())
}

fn error_codes(rx: &Fields) -> Vec<i64> {
    rx.try_iter()
        .filter_map(|(field, value)| match (field.as_str(), value) {
            ("Err-Mon", Value::Int(code)) => Some(code),
            _ => None,
        })
        .collect()
}

fn last(rx: &Fields, name: &str) -> Option<Value> {
    rx.try_iter()
        .filter(|(field, _)| field == name)
        .map(|(_, value)| value)
        .last()
}

#[test]
fn correction_excludes_measurement() -> anyhow::Result<()> {
    let (sofb, _, rx) = setup(SofbConfig::builder().layout(layout()))?;

    sofb.set_op_mode(OpMode::Correct)?;
    assert!(sofb.correction_mode().is_active());
    assert_eq!(
        sofb.set_op_mode(OpMode::MeasureRespMat),
        Err(ErrorCode::Correcting)
    );
    assert_eq!(sofb.manual_correction(0), Err(ErrorCode::Correcting));

    sofb.set_op_mode(OpMode::Off)?;
    assert!(sofb.correction_mode().is_idle());
    sofb.set_op_mode(OpMode::MeasureRespMat)?;
    assert!(sofb.measurement_mode().is_active());
    assert_eq!(
        sofb.set_op_mode(OpMode::Correct),
        Err(ErrorCode::MeasuringRespMat)
    );
    assert_eq!(sofb.manual_correction(1), Err(ErrorCode::MeasuringRespMat));
    assert!(sofb.correction_mode().is_idle());

    assert_eq!(error_codes(&rx), vec![7, 7, 6, 6]);
    Ok(())
}

#[test]
fn configuration_busy() -> anyhow::Result<()> {
    let (sofb, machine, rx) = setup(SofbConfig::builder().layout(layout()))?;
    commit_response(&sofb, &machine)?;

    sofb.set_op_mode(OpMode::Correct)?;
    assert_eq!(
        sofb.request_update(VarUpdate::NumSingValues(2)),
        Err(ErrorCode::ConfigurationBusy)
    );
    sofb.set_op_mode(OpMode::Off)?;

    sofb.request_update(VarUpdate::NumSingValues(2))?;
    assert_eq!(
        sofb.request_update(VarUpdate::EnblRF(false)),
        Err(ErrorCode::ConfigurationBusy)
    );
    sofb.variable_update().update();
    assert!(sofb.var_update_mode().is_idle());
    assert_eq!(sofb.with_response_matrix(|engine| engine.num_sing_values()), 2);

    assert_eq!(error_codes(&rx), vec![8, 8]);
    Ok(())
}

#[test]
fn waiting_for_variable_update() -> anyhow::Result<()> {
    let layout = layout();
    let (sofb, _, rx) = setup(SofbConfig::builder().layout(layout))?;

    let reference: Vec<f64> = (0..layout.nr_bpms).map(|i| i as f64).collect();
    sofb.request_update(VarUpdate::RefOrbX(reference.clone()))?;
    sofb.set_op_mode(OpMode::Correct)?;
    let mode = CorrectionMode(Selection::new(Planes::Coupled, false));
    assert_eq!(sofb.correction_mode(), Mode::Waiting(mode));
    assert_eq!(sofb.op_mode(), OpMode::Correct);
    assert_eq!(last(&rx, "CorrMode-Sts"), Some(Value::Text("W_4".into())));

    sofb.variable_update().update();
    assert!(sofb.var_update_mode().is_idle());
    assert_eq!(sofb.correction_mode(), Mode::Active(mode));
    assert_eq!(sofb.reference_orbit().x, reference);
    Ok(())
}

#[test]
fn off_cancels_waiting_measurement() -> anyhow::Result<()> {
    let (sofb, _, _rx) = setup(SofbConfig::builder().layout(layout()))?;

    sofb.request_update(VarUpdate::EnblRF(false))?;
    sofb.set_op_mode(OpMode::MeasureRespMat)?;
    assert!(sofb.measurement_mode().is_waiting());
    sofb.set_op_mode(OpMode::Off)?;
    assert!(sofb.measurement_mode().is_idle());
    sofb.variable_update().update();
    assert!(sofb.measurement_mode().is_idle());
    assert!(sofb.correction_mode().is_idle());
    Ok(())
}

#[test]
fn refusals() -> anyhow::Result<()> {
    let layout = layout();
    let (sofb, _, rx) = setup(
        SofbConfig::builder()
            .layout(layout)
            .buffer_capacity(5)
            .n_samples(2),
    )?;

    assert_eq!(
        sofb.write("NrSpl", Value::Int(0)),
        Err(ErrorCode::NrSplOutOfBounds)
    );
    assert_eq!(sofb.set_nr_spl(6), Err(ErrorCode::NrSplOutOfBounds));
    sofb.write("NrSpl", Value::Int(5))?;
    assert_eq!(
        sofb.write("StrthCH", Value::Float(100.5)),
        Err(ErrorCode::WeightOutOfBounds)
    );
    assert_eq!(
        sofb.write("StrthCV", Value::Float(-1.)),
        Err(ErrorCode::WeightOutOfBounds)
    );
    sofb.write("StrthCV", Value::Float(50.))?;
    assert_eq!(sofb.registers().strength_cv, 50.);
    assert_eq!(
        sofb.write("RefOrbX", Value::Floats(vec![0.; layout.nr_bpms + 1])),
        Err(ErrorCode::WrongSize)
    );
    assert_eq!(
        sofb.write("RespMat", Value::Floats(vec![0.; layout.size() - 1])),
        Err(ErrorCode::WrongSize)
    );
    assert_eq!(
        sofb.write("NumSingValues", Value::Int(0)),
        Err(ErrorCode::SingValuesOutOfRange)
    );
    assert_eq!(
        sofb.write("NumSingValues", Value::Int(layout.nr_corrs() as i64 + 1)),
        Err(ErrorCode::SingValuesOutOfRange)
    );
    assert_eq!(
        sofb.write("RmvBPM", Value::Int(layout.nr_rows() as i64)),
        Err(ErrorCode::InvalidValue)
    );
    assert_eq!(
        sofb.write("AddCorr", Value::Int(-1)),
        Err(ErrorCode::InvalidValue)
    );
    assert_eq!(
        sofb.write("OpMode", Value::Int(3)),
        Err(ErrorCode::InvalidValue)
    );
    assert_eq!(
        sofb.write("OpMode", Value::Text("Correct".into())),
        Err(ErrorCode::InvalidValue)
    );
    assert_eq!(
        sofb.write("Orbit", Value::Int(1)),
        Err(ErrorCode::InvalidValue)
    );
    assert_eq!(sofb.manual_correction(3), Err(ErrorCode::InvalidValue));
    assert!(sofb.var_update_mode().is_idle());

    sofb.write("OpMode", Value::Int(1))?;
    assert_eq!(
        sofb.set_strength(sofb::Plane::Horizontal, 10.),
        Err(ErrorCode::NotIdle)
    );
    assert_eq!(sofb.registers().strength_ch, 100.);

    assert_eq!(
        error_codes(&rx),
        vec![5, 5, 10, 10, 1, 1, 17, 17, 15, 15, 15, 15, 15, 15, 9]
    );
    Ok(())
}

#[test]
fn flags_select_the_correction_mode() -> anyhow::Result<()> {
    let (sofb, _, rx) = setup(SofbConfig::builder().layout(layout()))?;

    sofb.write("RespMatType", Value::Int(0))?;
    sofb.write("RFreqEnbl", Value::Int(1))?;
    assert_eq!(last(&rx, "RFreqEnbl-Sts"), Some(Value::Int(1)));
    sofb.write("ManCorrTrig", Value::Int(2))?;
    assert_eq!(
        sofb.correction_mode(),
        Mode::Active(CorrectionMode(Selection::new(Planes::Uncoupled, true)))
    );
    assert_eq!(sofb.correction_mode().code(), 7);
    assert!(!sofb.registers().auto_correct);
    Ok(())
}

#[test]
fn off_interrupts_measurement() -> anyhow::Result<()> {
    let layout = layout();
    let config = SofbConfig::builder()
        .layout(layout)
        .rf_enabled(true)
        .interval(Duration::from_millis(2));
    let machine =
        Arc::new(LinearMachine::random(&layout, 3).column_delay(Duration::from_millis(50)));
    let (publisher, rx) = Channel::new();
    let sofb = Sofb::new(config, machine.clone(), Arc::new(publisher))?;
    let mut running = sofb.start()?;

    let wait_idle = |sofb: &Sofb| {
        let now = Instant::now();
        while !sofb.measurement_mode().is_idle() && now.elapsed() < Duration::from_secs(10) {
            thread::sleep(Duration::from_millis(5));
        }
    };

    sofb.set_op_mode(OpMode::MeasureRespMat)?;
    thread::sleep(Duration::from_millis(120));
    sofb.set_op_mode(OpMode::Off)?;
    wait_idle(&sofb);
    assert!(sofb.measurement_mode().is_idle());
    assert_eq!(sofb.op_mode(), OpMode::Off);
    // the columns measured before the interrupt are committed, the others are zero
    let partial = sofb.response_matrix();
    assert_eq!(partial.column(0), machine.response().column(0));
    assert!(partial.column(layout.nr_ch + layout.nr_cv - 1).iter().all(|x| *x == 0.));
    assert!(partial.column(layout.rf_col()).iter().all(|x| *x == 0.));
    assert!(error_codes(&rx).is_empty());

    sofb.set_op_mode(OpMode::MeasureRespMat)?;
    thread::sleep(Duration::from_millis(20));
    wait_idle(&sofb);
    running.stop();
    assert_eq!(sofb.op_mode(), OpMode::Off);
    assert_eq!(&sofb.response_matrix(), machine.response());
    Ok(())
}

#[test]
fn measurement_request_while_interrupted() -> anyhow::Result<()> {
    let (sofb, machine, rx) = setup(SofbConfig::builder().layout(layout()).rf_enabled(true))?;

    sofb.set_op_mode(OpMode::MeasureRespMat)?;
    sofb.set_op_mode(OpMode::Off)?;
    assert!(sofb.measurement_mode().is_active());
    assert_eq!(
        sofb.set_op_mode(OpMode::MeasureRespMat),
        Err(ErrorCode::MeasuringRespMat)
    );
    assert_eq!(sofb.op_mode(), OpMode::Off);

    sofb.respmat_measurement().update();
    assert!(sofb.measurement_mode().is_idle());
    assert!(sofb.response_matrix().iter().all(|x| *x == 0.));

    sofb.set_op_mode(OpMode::MeasureRespMat)?;
    sofb.respmat_measurement().update();
    assert_eq!(sofb.op_mode(), OpMode::Off);
    assert_eq!(&sofb.response_matrix(), machine.response());
    assert_eq!(error_codes(&rx), vec![6]);
    Ok(())
}
