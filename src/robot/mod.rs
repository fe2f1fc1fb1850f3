//! Competition lifecycle
//!
//! [`scheduler::PhaseScheduler`] plays the part of the competition framework:
//! it tracks the requested [`RobotPhase`], calls [`PhaseHooks::on_enter`]
//! once per phase entry and [`PhaseHooks::on_tick`] every period.
//! [`hooks::Robot`] is the robot program hanging off those hooks.

pub mod hooks;
pub mod scheduler;
pub mod timer;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::actuator::ActuatorError;

pub use hooks::Robot;
pub use scheduler::PhaseScheduler;
pub use timer::PhaseTimer;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RobotPhase {
    #[default]
    Disabled,
    Autonomous,
    Teleop,
    Test,
}

impl RobotPhase {
    /// Phases in which the control cycle drives the actuators
    pub fn is_driving(self) -> bool {
        matches!(self, RobotPhase::Autonomous | RobotPhase::Teleop)
    }
}

impl fmt::Display for RobotPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RobotPhase::Disabled => write!(f, "Disabled"),
            RobotPhase::Autonomous => write!(f, "Autonomous"),
            RobotPhase::Teleop => write!(f, "Teleop"),
            RobotPhase::Test => write!(f, "Test"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RobotError {
    #[error("Actuator error: {0}")]
    Actuator(#[from] ActuatorError),
}

/// Entry points invoked by the lifecycle dispatcher
pub trait PhaseHooks {
    /// Called once each time `phase` is entered
    fn on_enter(&mut self, phase: RobotPhase) -> Result<(), RobotError>;

    /// Called every scheduler period while in `phase`
    fn on_tick(&mut self, phase: RobotPhase) -> Result<(), RobotError>;
}
