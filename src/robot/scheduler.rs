use chrono::Local;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{PhaseHooks, RobotError, RobotPhase};
use crate::actuator::ActuatorOutput;

/// Fixed-period dispatcher for [`PhaseHooks`]
///
/// Reads the requested phase from a watch channel each period. The outputs
/// handle belongs to the framework side: all channels are stopped on entry
/// to a non-driving phase and when the scheduler shuts down.
pub struct PhaseScheduler<H, O> {
    hooks: H,
    outputs: O,
    phase_receiver: watch::Receiver<RobotPhase>,
    current_phase: Option<RobotPhase>,
    period: Duration,
}

impl<H: PhaseHooks, O: ActuatorOutput> PhaseScheduler<H, O> {
    pub fn new(
        hooks: H,
        outputs: O,
        phase_receiver: watch::Receiver<RobotPhase>,
        period: Duration,
    ) -> Self {
        Self {
            hooks,
            outputs,
            phase_receiver,
            current_phase: None,
            period,
        }
    }

    pub fn current_phase(&self) -> Option<RobotPhase> {
        self.current_phase
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// One scheduler period: phase entry if the phase changed, then a tick
    pub fn step(&mut self) -> Result<RobotPhase, RobotError> {
        let requested = *self.phase_receiver.borrow();

        if self.current_phase != Some(requested) {
            info!(
                "Phase change: {} -> {}",
                self.current_phase
                    .map(|phase| phase.to_string())
                    .unwrap_or_else(|| "startup".to_string()),
                requested
            );
            if !requested.is_driving() {
                self.outputs.stop_all()?;
            }
            self.current_phase = Some(requested);
            self.hooks.on_enter(requested)?;
        }

        self.hooks.on_tick(requested)?;
        Ok(requested)
    }

    /// Runs until `cancel` fires, then stops every output
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), RobotError> {
        info!("Starting phase scheduler with {:?} period", self.period);

        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut cycles: u64 = 0;
        let mut overruns: u64 = 0;
        let mut last_stats_time = Local::now();
        let stats_interval = chrono::Duration::seconds(30);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            let cycle_start = Instant::now();
            if let Err(e) = self.step() {
                error!("Scheduler period failed: {}", e);
            }
            cycles += 1;

            let cycle_duration = cycle_start.elapsed();
            if cycle_duration > self.period {
                overruns += 1;
                warn!(
                    "Loop time of {:?} overrun: period took {:?}",
                    self.period, cycle_duration
                );
            } else {
                debug!("Period completed in {:?}", cycle_duration);
            }

            let now = Local::now();
            if now - last_stats_time > stats_interval {
                info!(
                    "Scheduler stats: {} periods, {} overruns in {} seconds",
                    cycles,
                    overruns,
                    (now - last_stats_time).num_seconds()
                );
                cycles = 0;
                overruns = 0;
                last_stats_time = now;
            }
        }

        info!("Phase scheduler cancelled, stopping all outputs");
        self.outputs.stop_all()?;
        Ok(())
    }
}
