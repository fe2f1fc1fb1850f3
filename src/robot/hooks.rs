use chrono::Local;
use tracing::{debug, info};

use super::{PhaseHooks, PhaseTimer, RobotError, RobotPhase};
use crate::actuator::ActuatorOutput;
use crate::controller::joystick::InputSource;
use crate::mapping::cycle::ControlCycle;
use crate::mapping::snapshot::ActuatorCommandSet;

/// The robot program: one shared control cycle behind the phase hooks
///
/// Autonomous and Teleop run the identical cycle. The autonomous timer is
/// reset on every Autonomous entry and only reported, never branched on.
pub struct Robot<S, O> {
    inputs: S,
    outputs: O,
    cycle: ControlCycle,
    autonomous_timer: PhaseTimer,
    last_commands: ActuatorCommandSet,
    cycles: u64,
    last_stats_time: chrono::DateTime<Local>,
}

impl<S: InputSource, O: ActuatorOutput> Robot<S, O> {
    pub fn new(inputs: S, outputs: O, cycle: ControlCycle) -> Self {
        Self {
            inputs,
            outputs,
            cycle,
            autonomous_timer: PhaseTimer::new(),
            last_commands: ActuatorCommandSet::default(),
            cycles: 0,
            last_stats_time: Local::now(),
        }
    }

    pub fn cycle(&self) -> &ControlCycle {
        &self.cycle
    }

    pub fn outputs(&self) -> &O {
        &self.outputs
    }

    pub fn autonomous_timer(&self) -> &PhaseTimer {
        &self.autonomous_timer
    }

    /// Commands produced by the most recent driving tick
    pub fn last_commands(&self) -> ActuatorCommandSet {
        self.last_commands
    }

    fn log_stats_if_due(&mut self, phase: RobotPhase) {
        let now = Local::now();
        if now - self.last_stats_time > chrono::Duration::seconds(30) {
            info!(
                "{} stats: {} cycles, drive mode {:?}, autonomous timer {:.1}s, last commands {:?}",
                phase,
                self.cycles,
                self.cycle.drive_mode(),
                self.autonomous_timer.elapsed().as_secs_f64(),
                self.last_commands
            );
            self.cycles = 0;
            self.last_stats_time = now;
        }
    }
}

impl<S: InputSource, O: ActuatorOutput> PhaseHooks for Robot<S, O> {
    fn on_enter(&mut self, phase: RobotPhase) -> Result<(), RobotError> {
        match phase {
            RobotPhase::Autonomous => {
                self.autonomous_timer.reset();
                self.autonomous_timer.start();
                info!("Autonomous entered, timer restarted");
            }
            RobotPhase::Teleop => {
                info!("Teleop entered, drive mode {:?}", self.cycle.drive_mode());
            }
            RobotPhase::Disabled | RobotPhase::Test => {
                debug!("{} entered, nothing to do", phase);
            }
        }
        Ok(())
    }

    fn on_tick(&mut self, phase: RobotPhase) -> Result<(), RobotError> {
        if !phase.is_driving() {
            return Ok(());
        }

        self.last_commands = self.cycle.run(&mut self.inputs, &mut self.outputs)?;
        self.cycles += 1;
        self.log_stats_if_due(phase);
        Ok(())
    }
}
