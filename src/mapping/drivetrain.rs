//! Arcade-drive kinematics with a togglable high/low speed mode.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::mapping::snapshot::InputSnapshot;

/// Speed scaling applied to the throttle axis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriveMode {
    #[default]
    HighSpeed,
    LowSpeed,
}

impl DriveMode {
    pub fn toggled(self) -> Self {
        match self {
            DriveMode::HighSpeed => DriveMode::LowSpeed,
            DriveMode::LowSpeed => DriveMode::HighSpeed,
        }
    }
}

/// How the speed toggle button is sampled
///
/// `Level` flips the mode on every cycle the button reads pressed, so holding
/// it alternates the mode at the cycle rate. `RisingEdge` flips once per press.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToggleTrigger {
    #[default]
    Level,
    RisingEdge,
}

/// Drivetrain scaling constants
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DriveTuning {
    /// Throttle scale in [`DriveMode::HighSpeed`]
    pub high_speed_scale: f64,
    /// Throttle scale in [`DriveMode::LowSpeed`]
    pub low_speed_scale: f64,
    /// Turn scale, independent of the drive mode
    pub turn_scale: f64,
    /// Mode the drivetrain starts in at process start
    pub initial_mode: DriveMode,
    pub speed_toggle: ToggleTrigger,
}

impl Default for DriveTuning {
    fn default() -> Self {
        Self {
            high_speed_scale: 0.75,
            low_speed_scale: 0.25,
            turn_scale: 0.75,
            initial_mode: DriveMode::HighSpeed,
            speed_toggle: ToggleTrigger::Level,
        }
    }
}

impl DriveTuning {
    pub fn throttle_scale(&self, mode: DriveMode) -> f64 {
        match mode {
            DriveMode::HighSpeed => self.high_speed_scale,
            DriveMode::LowSpeed => self.low_speed_scale,
        }
    }
}

/// Output of one drivetrain computation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveCommand {
    pub left_speed: f64,
    pub right_speed: f64,
    pub mode: DriveMode,
}

/// Standard arcade mixing, each side saturated to `[-1, 1]`
pub fn arcade_mix(throttle: f64, turn: f64) -> (f64, f64) {
    let left = (throttle + turn).clamp(-1.0, 1.0);
    let right = (throttle - turn).clamp(-1.0, 1.0);
    (left, right)
}

/// Converts raw stick axes into left/right commands
///
/// `drive_y` is negated so that pushing the stick forward (negative Y)
/// drives forward. The mode is flipped before scaling when `toggle_pressed`.
pub fn compute_drive_command(
    drive_y: f64,
    drive_x: f64,
    toggle_pressed: bool,
    current_mode: DriveMode,
    tuning: &DriveTuning,
) -> DriveCommand {
    let mode = if toggle_pressed {
        current_mode.toggled()
    } else {
        current_mode
    };

    let throttle = -drive_y * tuning.throttle_scale(mode);
    let turn = drive_x * tuning.turn_scale;
    let (left_speed, right_speed) = arcade_mix(throttle, turn);

    DriveCommand {
        left_speed,
        right_speed,
        mode,
    }
}

/// Owns the drive mode across cycles
#[derive(Debug, Clone)]
pub struct DrivetrainController {
    tuning: DriveTuning,
    mode: DriveMode,
    // Toggle level seen last cycle, only consulted for rising-edge toggling
    last_toggle_level: bool,
}

impl DrivetrainController {
    pub fn new(tuning: DriveTuning) -> Self {
        let mode = tuning.initial_mode;
        Self::with_mode(tuning, mode)
    }

    pub fn with_mode(tuning: DriveTuning, mode: DriveMode) -> Self {
        Self {
            tuning,
            mode,
            last_toggle_level: false,
        }
    }

    pub fn mode(&self) -> DriveMode {
        self.mode
    }

    /// Runs one cycle and persists the resulting mode
    pub fn update(&mut self, snapshot: &InputSnapshot) -> DriveCommand {
        let level = snapshot.drive_speed_toggle_pressed;
        let toggle_pressed = match self.tuning.speed_toggle {
            ToggleTrigger::Level => level,
            ToggleTrigger::RisingEdge => level && !self.last_toggle_level,
        };
        self.last_toggle_level = level;

        let command = compute_drive_command(
            snapshot.drive_y,
            snapshot.drive_x,
            toggle_pressed,
            self.mode,
            &self.tuning,
        );

        if command.mode != self.mode {
            info!("Drive mode switched {:?} -> {:?}", self.mode, command.mode);
        }
        debug!(
            "Drive command: left={:.3} right={:.3} mode={:?}",
            command.left_speed, command.right_speed, command.mode
        );

        self.mode = command.mode;
        command
    }
}
