//! SOFB SIMULATION
//!
//! Runs the slow orbit feedback against a simulated ring:
//! measures the response matrix and then corrects the orbit.
//!
//! ```shell
//! RUST_LOG=info cargo run -r --bin sofb-sim -- --duration 5 --seed 7
//! ```

use std::{path::PathBuf, sync::Arc, thread, time::Duration};

use clap::Parser;
use interface::{Channel, Value};
use sofb::{sim::LinearMachine, OpMode, Sofb, SofbConfig};

#[derive(Parser, Debug)]
pub struct Cli {
    /// SOFB configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// correction duration [s]
    #[arg(short, long, default_value_t = 2.)]
    duration: f64,
    /// simulated ring random seed
    #[arg(short, long, default_value_t = 7)]
    seed: u64,
    /// BPM noise standard deviation
    #[arg(short, long, default_value_t = 0.)]
    noise: f64,
}

fn rms(x: &[f64]) -> f64 {
    (x.iter().map(|x| x * x).sum::<f64>() / x.len().max(1) as f64).sqrt()
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Cli::parse();

    let config = match args.config.as_ref() {
        Some(path) => SofbConfig::from_path(path)?,
        None => SofbConfig::builder(),
    };
    let machine = Arc::new(LinearMachine::random(&config.layout, args.seed).noise(args.noise));

    let (publisher, rx) = Channel::new();
    let monitor = thread::Builder::new()
        .name("sofb-monitor".into())
        .spawn(move || {
            for (field, value) in rx.iter() {
                match (field.as_str(), &value) {
                    ("Err-Mon", Value::Int(code)) if *code != 0 => {
                        log::warn!("{field}: {code}")
                    }
                    _ => log::trace!("{field} <- {value}"),
                }
            }
        })?;

    let sofb = Sofb::new(config, machine.clone(), Arc::new(publisher))?;
    let mut running = sofb.start()?;
    log::info!("initial orbit RMS: {:.3e}", rms(&machine.orbit()));

    sofb.set_op_mode(OpMode::MeasureRespMat)?;
    while sofb.op_mode() != OpMode::Off || !sofb.measurement_mode().is_idle() {
        thread::sleep(Duration::from_millis(100));
    }
    log::info!(
        "response matrix measured: {}",
        sofb.with_response_matrix(|engine| engine.to_string())
    );

    sofb.set_op_mode(OpMode::Correct)?;
    thread::sleep(Duration::from_secs_f64(args.duration));
    sofb.set_op_mode(OpMode::Off)?;
    running.stop();
    log::info!("final orbit RMS: {:.3e}", rms(&machine.orbit()));

    drop(sofb);
    if monitor.join().is_err() {
        log::warn!("monitor thread panicked");
    }
    Ok(())
}
