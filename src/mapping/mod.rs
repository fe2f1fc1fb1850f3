//! Control mapping from joystick input to actuator commands.
//!
//! This is the only place that makes decisions about actuator power:
//!
//! - [`drivetrain`] - arcade-drive kinematics and the high/low speed toggle
//! - [`manipulator`] - bang-bang hatch and deadband cargo control
//! - [`snapshot`] - per-cycle input capture and the resulting command set
//! - [`cycle`] - one period of work composing the controllers
//!
//! Everything here is synchronous and non-blocking. The drive mode owned by
//! [`drivetrain::DrivetrainController`] is the only state kept between cycles.

pub mod cycle;
pub mod drivetrain;
pub mod manipulator;
pub mod snapshot;

pub use cycle::ControlCycle;
pub use drivetrain::{DriveCommand, DriveMode, DriveTuning, DrivetrainController, ToggleTrigger};
pub use manipulator::{ManipulatorController, ManipulatorTuning};
pub use snapshot::{ActuatorCommandSet, InputBindings, InputSnapshot};
