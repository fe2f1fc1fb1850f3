//! Controller subsystem for joystick input handling
//!
//! 1. [`event_collector`] - Raw gamepad input collection via gilrs
//! 2. [`controller_handle`] - Latest device state exposed as an [`InputSource`]
//! 3. [`joystick`] - Device state and the input seams used by the control cycle
//!
//! # Architecture
//!
//! ```text
//! Gamepads ──► Collector ──[watch: Vec<JoystickState>]──► ControllerHandle ──► InputSnapshot
//!              (blocking task)
//! ```

pub mod controller_handle;
pub mod event_collector;
pub mod joystick;

pub use controller_handle::{ControllerError, ControllerHandle, ControllerSettings};
pub use joystick::{AxisName, InputDevice, InputSource, JoystickState};

/// Rate limiter for log messages that would otherwise repeat every cycle
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// Minimum time between accepted events in milliseconds
    min_interval_ms: u64,

    /// When the last accepted event happened, `None` before the first one
    last_event_time: Option<std::time::Instant>,
}

impl RateLimiter {
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            min_interval_ms,
            last_event_time: None,
        }
    }

    /// Returns true if enough time has passed since the last accepted event
    pub fn should_process(&mut self) -> bool {
        let now = std::time::Instant::now();
        let due = match self.last_event_time {
            Some(last) => now.duration_since(last).as_millis() as u64 >= self.min_interval_ms,
            None => true,
        };

        if due {
            self.last_event_time = Some(now);
        }
        due
    }
}
