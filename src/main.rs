pub mod actuator;
pub mod config;
pub mod controller;
pub mod mapping;
pub mod robot;

use crate::actuator::logging::LogBackend;
use crate::actuator::pwm::PwmBackend;
use crate::actuator::safety::{SafeOutputs, SafetyWatchdog};
use crate::actuator::{ActuatorOutput, OutputBackend};
use crate::config::RobotConfig;
use crate::controller::ControllerHandle;
use crate::robot::{PhaseScheduler, Robot, RobotPhase};
use color_eyre::{eyre::eyre, Result};
use std::future::Future;
use std::path::PathBuf;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = RobotConfig::load(config_path)
        .await
        .map_err(|e| eyre!("Failed to load configuration: {}", e))?;
    info!("Running with configuration: {:?}", config);

    let cancel = CancellationToken::new();

    info!("Initializing controller input");
    let controller = ControllerHandle::spawn(
        Some(config.input.controller_settings()),
        cancel.child_token(),
    )
    .map_err(|e| eyre!("Failed to spawn controller: {}", e))?;

    let (phase_tx, phase_rx) = watch::channel(config.control.startup_phase);

    spawn_shutdown_handler(tokio::signal::ctrl_c(), phase_tx, cancel.clone());

    match config.output.backend {
        OutputBackend::Log => {
            warn!("Using log output backend, no actuator will move");
            run_robot(LogBackend::new(), &config, controller, phase_rx, cancel).await
        }
        OutputBackend::Pwm => {
            let backend = PwmBackend::new(&config.output)
                .map_err(|e| eyre!("Failed to open PWM outputs: {}", e))?;
            run_robot(backend, &config, controller, phase_rx, cancel).await
        }
    }
}

async fn run_robot<B>(
    backend: B,
    config: &RobotConfig,
    controller: ControllerHandle,
    phase_rx: watch::Receiver<RobotPhase>,
    cancel: CancellationToken,
) -> Result<()>
where
    B: ActuatorOutput + Send + 'static,
{
    let outputs = SafeOutputs::new(backend);
    let watchdog =
        SafetyWatchdog::spawn(outputs.clone(), config.safety.clone(), cancel.child_token());

    let robot = Robot::new(controller, outputs.clone(), config.control_cycle());
    let scheduler = PhaseScheduler::new(robot, outputs, phase_rx, config.period());

    scheduler
        .run(cancel.clone())
        .await
        .map_err(|e| eyre!("Scheduler failed: {}", e))?;

    cancel.cancel();
    if let Err(e) = watchdog.await {
        error!("Safety watchdog task failed: {}", e);
    }

    info!("Robot shut down");
    Ok(())
}

// Disables the robot and cancels everything once `signal` fires.
// A signal that fails to register leaves the robot running.
fn spawn_shutdown_handler<F>(
    signal: F,
    phase_tx: watch::Sender<RobotPhase>,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    F: Future<Output = std::io::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        match signal.await {
            Ok(()) => {
                info!("Ctrl-C received, disabling robot");
                phase_tx.send_replace(RobotPhase::Disabled);
                cancel.cancel();
            }
            Err(e) => error!("Failed to listen for Ctrl-C, running without it: {}", e),
        }
    })
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
