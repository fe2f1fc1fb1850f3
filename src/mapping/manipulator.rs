//! Bang-bang control of the hatch and cargo mechanisms.

use serde::{Deserialize, Serialize};

use crate::mapping::snapshot::InputSnapshot;

/// Manipulator power and threshold constants
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ManipulatorTuning {
    /// Power applied to the hatch motor while the trigger is held
    pub hatch_power: f64,
    /// Magnitude applied to the cargo motor outside the deadband
    pub cargo_power: f64,
    /// Half-width of the arm Y deadband, inclusive
    pub cargo_deadband: f64,
}

impl Default for ManipulatorTuning {
    fn default() -> Self {
        Self {
            hatch_power: 0.75,
            cargo_power: 0.3,
            cargo_deadband: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ManipulatorController {
    tuning: ManipulatorTuning,
}

impl ManipulatorController {
    pub fn new(tuning: ManipulatorTuning) -> Self {
        Self { tuning }
    }

    /// Forward at fixed power while pressed, stopped otherwise
    pub fn compute_hatch_command(&self, trigger_pressed: bool) -> f64 {
        if trigger_pressed {
            self.tuning.hatch_power
        } else {
            0.0
        }
    }

    /// Pulling the arm stick back (negative Y past the deadband) drives the
    /// cargo motor forward; pushing it forward reverses. `±cargo_deadband`
    /// itself stops the motor.
    pub fn compute_cargo_command(&self, arm_y: f64) -> f64 {
        let deadband = self.tuning.cargo_deadband;
        if arm_y < -deadband {
            self.tuning.cargo_power
        } else if arm_y > deadband {
            -self.tuning.cargo_power
        } else {
            0.0
        }
    }

    /// Returns `(hatch_power, cargo_power)`
    pub fn update(&self, snapshot: &InputSnapshot) -> (f64, f64) {
        (
            self.compute_hatch_command(snapshot.arm_trigger_pressed),
            self.compute_cargo_command(snapshot.arm_y),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hatch_is_bang_bang() {
        let manipulator = ManipulatorController::default();
        assert_eq!(manipulator.compute_hatch_command(true), 0.75);
        assert_eq!(manipulator.compute_hatch_command(false), 0.0);
    }

    #[test]
    fn cargo_deadband_is_inclusive() {
        let manipulator = ManipulatorController::default();
        assert_eq!(manipulator.compute_cargo_command(-0.5), 0.0);
        assert_eq!(manipulator.compute_cargo_command(0.5), 0.0);
        assert_eq!(manipulator.compute_cargo_command(0.0), 0.0);
    }

    #[test]
    fn cargo_drive_zones() {
        let manipulator = ManipulatorController::default();
        assert_eq!(manipulator.compute_cargo_command(-0.51), 0.3);
        assert_eq!(manipulator.compute_cargo_command(-1.0), 0.3);
        assert_eq!(manipulator.compute_cargo_command(0.51), -0.3);
        assert_eq!(manipulator.compute_cargo_command(1.0), -0.3);
    }

    #[test]
    fn repeated_calls_are_identical() {
        let manipulator = ManipulatorController::default();
        for arm_y in [-0.9, -0.5, 0.2, 0.77] {
            assert_eq!(
                manipulator.compute_cargo_command(arm_y),
                manipulator.compute_cargo_command(arm_y)
            );
        }
        assert_eq!(
            manipulator.compute_hatch_command(true),
            manipulator.compute_hatch_command(true)
        );
    }

    #[test]
    fn update_reads_arm_fields_only() {
        let manipulator = ManipulatorController::default();
        let snapshot = InputSnapshot {
            drive_x: 1.0,
            drive_y: -1.0,
            drive_speed_toggle_pressed: true,
            arm_y: 0.9,
            arm_trigger_pressed: true,
        };
        assert_eq!(manipulator.update(&snapshot), (0.75, -0.3));
    }

    #[test]
    fn tuned_constants_are_applied() {
        let manipulator = ManipulatorController::new(ManipulatorTuning {
            hatch_power: 0.5,
            cargo_power: 0.6,
            cargo_deadband: 0.2,
        });
        assert_eq!(manipulator.compute_hatch_command(true), 0.5);
        assert_eq!(manipulator.compute_cargo_command(-0.3), 0.6);
        assert_eq!(manipulator.compute_cargo_command(0.2), 0.0);
    }
}
