//! Actuator outputs
//!
//! The control cycle only ever talks to [`ActuatorOutput`]. Which physical
//! ports a channel drives, and whether it is inverted, is configuration held
//! in [`OutputSettings`].
//!
//! - [`logging`] - records and traces values, for bench runs without hardware
//! - [`pwm`] - Raspberry Pi software PWM driving RC-style motor controllers
//! - [`safety`] - shared outputs plus the watchdog stopping stale channels

pub mod logging;
pub mod pwm;
pub mod safety;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::mapping::snapshot::ActuatorCommandSet;

/// Logical output channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActuatorChannel {
    LeftDrive,
    RightDrive,
    Hatch,
    Cargo,
}

impl ActuatorChannel {
    pub const ALL: [ActuatorChannel; 4] = [
        ActuatorChannel::LeftDrive,
        ActuatorChannel::RightDrive,
        ActuatorChannel::Hatch,
        ActuatorChannel::Cargo,
    ];

    /// Position of the channel in [`ActuatorChannel::ALL`]
    pub fn index(self) -> usize {
        match self {
            ActuatorChannel::LeftDrive => 0,
            ActuatorChannel::RightDrive => 1,
            ActuatorChannel::Hatch => 2,
            ActuatorChannel::Cargo => 3,
        }
    }
}

impl fmt::Display for ActuatorChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActuatorChannel::LeftDrive => write!(f, "LeftDrive"),
            ActuatorChannel::RightDrive => write!(f, "RightDrive"),
            ActuatorChannel::Hatch => write!(f, "Hatch"),
            ActuatorChannel::Cargo => write!(f, "Cargo"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ActuatorError {
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    #[error("Output lock poisoned")]
    LockPoisoned,
}

/// Sink for normalized actuator power in `[-1, 1]`
///
/// Setting the same value repeatedly must be harmless; the scheduler calls
/// the cycle every period whether or not inputs changed.
pub trait ActuatorOutput {
    fn set(&mut self, channel: ActuatorChannel, power: f64) -> Result<(), ActuatorError>;

    fn stop(&mut self, channel: ActuatorChannel) -> Result<(), ActuatorError> {
        self.set(channel, 0.0)
    }

    fn stop_all(&mut self) -> Result<(), ActuatorError> {
        for channel in ActuatorChannel::ALL {
            self.stop(channel)?;
        }
        Ok(())
    }

    fn apply(&mut self, commands: &ActuatorCommandSet) -> Result<(), ActuatorError> {
        for (channel, power) in commands.channels() {
            self.set(channel, power)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputBackend {
    #[default]
    Log,
    Pwm,
}

/// Ports driven together as one logical channel
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct ChannelBinding {
    /// BCM GPIO numbers
    pub ports: Vec<u8>,
    #[serde(default)]
    pub inverted: bool,
}

impl ChannelBinding {
    pub fn new(ports: &[u8], inverted: bool) -> Self {
        Self {
            ports: ports.to_vec(),
            inverted,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ChannelBindings {
    pub left_drive: ChannelBinding,
    pub right_drive: ChannelBinding,
    pub hatch: ChannelBinding,
    pub cargo: ChannelBinding,
}

impl Default for ChannelBindings {
    fn default() -> Self {
        Self {
            left_drive: ChannelBinding::new(&[5, 6], false),
            // right side faces the other way on a tank chassis
            right_drive: ChannelBinding::new(&[13, 19], true),
            hatch: ChannelBinding::new(&[26], false),
            cargo: ChannelBinding::new(&[12], false),
        }
    }
}

impl ChannelBindings {
    pub fn get(&self, channel: ActuatorChannel) -> &ChannelBinding {
        match channel {
            ActuatorChannel::LeftDrive => &self.left_drive,
            ActuatorChannel::RightDrive => &self.right_drive,
            ActuatorChannel::Hatch => &self.hatch,
            ActuatorChannel::Cargo => &self.cargo,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct OutputSettings {
    pub backend: OutputBackend,
    /// Software PWM frame length
    pub pwm_period_ms: u64,
    pub channels: ChannelBindings,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            backend: OutputBackend::Log,
            pwm_period_ms: 20,
            channels: ChannelBindings::default(),
        }
    }
}
