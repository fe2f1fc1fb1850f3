//! One period of control work, shared by every driving phase.

use tracing::trace;

use crate::actuator::{ActuatorError, ActuatorOutput};
use crate::controller::joystick::InputSource;
use crate::mapping::drivetrain::{DriveMode, DriveTuning, DrivetrainController};
use crate::mapping::manipulator::{ManipulatorController, ManipulatorTuning};
use crate::mapping::snapshot::{ActuatorCommandSet, InputBindings, InputSnapshot};

#[derive(Debug, Clone)]
pub struct ControlCycle {
    bindings: InputBindings,
    drivetrain: DrivetrainController,
    manipulator: ManipulatorController,
}

impl ControlCycle {
    pub fn new(
        bindings: InputBindings,
        drive: DriveTuning,
        manipulator: ManipulatorTuning,
    ) -> Self {
        Self {
            bindings,
            drivetrain: DrivetrainController::new(drive),
            manipulator: ManipulatorController::new(manipulator),
        }
    }

    pub fn drive_mode(&self) -> DriveMode {
        self.drivetrain.mode()
    }

    /// Derives this cycle's commands; advances the drive mode
    pub fn compute(&mut self, snapshot: &InputSnapshot) -> ActuatorCommandSet {
        let drive = self.drivetrain.update(snapshot);
        let (hatch_power, cargo_power) = self.manipulator.update(snapshot);

        ActuatorCommandSet {
            left_speed: drive.left_speed,
            right_speed: drive.right_speed,
            hatch_power,
            cargo_power,
        }
    }

    /// Captures inputs, computes commands and forwards them to the outputs
    pub fn run<S, O>(
        &mut self,
        inputs: &mut S,
        outputs: &mut O,
    ) -> Result<ActuatorCommandSet, ActuatorError>
    where
        S: InputSource + ?Sized,
        O: ActuatorOutput + ?Sized,
    {
        let snapshot = InputSnapshot::capture(inputs, &self.bindings);
        trace!("Captured {:?}", snapshot);

        let commands = self.compute(&snapshot);
        outputs.apply(&commands)?;
        Ok(commands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::logging::LogBackend;
    use crate::actuator::ActuatorChannel;
    use crate::controller::joystick::{AxisName, JoystickState};

    struct FixedInputs(Vec<JoystickState>);

    impl InputSource for FixedInputs {
        fn joystick(&mut self, handle: usize) -> JoystickState {
            self.0.get(handle).cloned().unwrap_or_default()
        }
    }

    fn cycle() -> ControlCycle {
        ControlCycle::new(
            InputBindings::default(),
            DriveTuning::default(),
            ManipulatorTuning::default(),
        )
    }

    #[test]
    fn neutral_inputs_produce_neutral_commands() {
        let commands = cycle().compute(&InputSnapshot::default());
        assert_eq!(commands, ActuatorCommandSet::default());
    }

    #[test]
    fn run_applies_every_command() {
        let mut inputs = FixedInputs(vec![
            JoystickState::connected()
                .with_axis(AxisName::Y, -1.0)
                .with_axis(AxisName::X, 1.0),
            JoystickState::connected()
                .with_axis(AxisName::Y, -0.8)
                .with_button(1, true),
        ]);
        let mut outputs = LogBackend::new();

        let commands = cycle().run(&mut inputs, &mut outputs).unwrap();

        assert_eq!(
            commands,
            ActuatorCommandSet {
                left_speed: 1.0,
                right_speed: 0.0,
                hatch_power: 0.75,
                cargo_power: 0.3,
            }
        );
        assert_eq!(outputs.last(ActuatorChannel::LeftDrive), Some(1.0));
        assert_eq!(outputs.last(ActuatorChannel::RightDrive), Some(0.0));
        assert_eq!(outputs.last(ActuatorChannel::Hatch), Some(0.75));
        assert_eq!(outputs.last(ActuatorChannel::Cargo), Some(0.3));
    }

    #[test]
    fn drive_mode_survives_between_runs() {
        let mut cycle = cycle();
        let mut outputs = LogBackend::new();
        let mut toggling = FixedInputs(vec![JoystickState::connected().with_button(11, true)]);
        let mut forward = FixedInputs(vec![JoystickState::connected().with_axis(AxisName::Y, -1.0)]);

        cycle.run(&mut toggling, &mut outputs).unwrap();
        assert_eq!(cycle.drive_mode(), DriveMode::LowSpeed);

        let commands = cycle.run(&mut forward, &mut outputs).unwrap();
        assert_eq!(commands.left_speed, 0.25);
        assert_eq!(commands.right_speed, 0.25);
    }

    #[test]
    fn missing_devices_stop_everything() {
        let mut inputs = FixedInputs(Vec::new());
        let mut outputs = LogBackend::new();
        let commands = cycle().run(&mut inputs, &mut outputs).unwrap();
        assert_eq!(commands, ActuatorCommandSet::default());
    }
}
