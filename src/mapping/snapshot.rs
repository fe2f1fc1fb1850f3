//! Per-cycle input capture and the command set produced from it.

use crate::actuator::ActuatorChannel;
use crate::controller::joystick::{AxisName, InputDevice, InputSource};

/// Which device handles and buttons feed the snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct InputBindings {
    pub drive_stick: usize,
    pub arm_stick: usize,
    /// 1-based raw button on the drive stick that toggles the drive mode
    pub speed_toggle_button: u8,
}

impl Default for InputBindings {
    fn default() -> Self {
        Self {
            drive_stick: 0,
            arm_stick: 1,
            speed_toggle_button: 11,
        }
    }
}

/// Device state captured once per cycle
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputSnapshot {
    pub drive_x: f64,
    pub drive_y: f64,
    pub drive_speed_toggle_pressed: bool,
    pub arm_y: f64,
    pub arm_trigger_pressed: bool,
}

impl InputSnapshot {
    pub fn from_devices(
        drive: &impl InputDevice,
        arm: &impl InputDevice,
        bindings: &InputBindings,
    ) -> Self {
        Self {
            drive_x: drive.axis(AxisName::X),
            drive_y: drive.axis(AxisName::Y),
            drive_speed_toggle_pressed: drive.raw_button(bindings.speed_toggle_button),
            arm_y: arm.axis(AxisName::Y),
            arm_trigger_pressed: arm.trigger(),
        }
    }

    pub fn capture<S: InputSource + ?Sized>(source: &mut S, bindings: &InputBindings) -> Self {
        let drive = source.joystick(bindings.drive_stick);
        let arm = source.joystick(bindings.arm_stick);
        Self::from_devices(&drive, &arm, bindings)
    }
}

/// Normalized actuator powers for one cycle
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActuatorCommandSet {
    pub left_speed: f64,
    pub right_speed: f64,
    pub hatch_power: f64,
    pub cargo_power: f64,
}

impl ActuatorCommandSet {
    pub fn power(&self, channel: ActuatorChannel) -> f64 {
        match channel {
            ActuatorChannel::LeftDrive => self.left_speed,
            ActuatorChannel::RightDrive => self.right_speed,
            ActuatorChannel::Hatch => self.hatch_power,
            ActuatorChannel::Cargo => self.cargo_power,
        }
    }

    pub fn channels(&self) -> [(ActuatorChannel, f64); 4] {
        ActuatorChannel::ALL.map(|channel| (channel, self.power(channel)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::joystick::JoystickState;

    struct FixedInputs(Vec<JoystickState>);

    impl InputSource for FixedInputs {
        fn joystick(&mut self, handle: usize) -> JoystickState {
            self.0.get(handle).cloned().unwrap_or_default()
        }
    }

    #[test]
    fn capture_reads_bound_devices() {
        let mut inputs = FixedInputs(vec![
            JoystickState::connected()
                .with_axis(AxisName::X, 0.2)
                .with_axis(AxisName::Y, -0.9)
                .with_button(11, true),
            JoystickState::connected()
                .with_axis(AxisName::Y, 0.6)
                .with_button(1, true),
        ]);

        let snapshot = InputSnapshot::capture(&mut inputs, &InputBindings::default());

        assert_eq!(
            snapshot,
            InputSnapshot {
                drive_x: 0.2,
                drive_y: -0.9,
                drive_speed_toggle_pressed: true,
                arm_y: 0.6,
                arm_trigger_pressed: true,
            }
        );
    }

    #[test]
    fn trigger_on_drive_stick_is_not_the_arm_trigger() {
        let mut inputs = FixedInputs(vec![JoystickState::connected().with_button(1, true)]);
        let snapshot = InputSnapshot::capture(&mut inputs, &InputBindings::default());
        assert!(!snapshot.arm_trigger_pressed);
        assert!(!snapshot.drive_speed_toggle_pressed);
    }

    #[test]
    fn swapped_handles_follow_bindings() {
        let mut inputs = FixedInputs(vec![
            JoystickState::connected().with_axis(AxisName::Y, 0.1),
            JoystickState::connected().with_axis(AxisName::Y, 0.7),
        ]);
        let bindings = InputBindings {
            drive_stick: 1,
            arm_stick: 0,
            speed_toggle_button: 2,
        };
        let snapshot = InputSnapshot::capture(&mut inputs, &bindings);
        assert_eq!(snapshot.drive_y, 0.7);
        assert_eq!(snapshot.arm_y, 0.1);
    }

    #[test]
    fn command_set_lists_every_channel() {
        let commands = ActuatorCommandSet {
            left_speed: 0.1,
            right_speed: 0.2,
            hatch_power: 0.75,
            cargo_power: -0.3,
        };
        assert_eq!(
            commands.channels(),
            [
                (ActuatorChannel::LeftDrive, 0.1),
                (ActuatorChannel::RightDrive, 0.2),
                (ActuatorChannel::Hatch, 0.75),
                (ActuatorChannel::Cargo, -0.3),
            ]
        );
    }
}
