//! Controller Handle - device state access for the control cycle
//!
//! Wraps the gamepad collector behind the [`InputSource`] seam. The collector
//! runs on its own blocking task and publishes the state of every device
//! handle through a watch channel; the handle only ever reads the latest
//! published value, so a capture never waits on hardware.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use super::event_collector::{CollectorError, CollectorHandle, CollectorSettings};
use super::joystick::{InputSource, JoystickState};
use super::RateLimiter;

/// Configuration settings for the controller subsystem
///
/// # Examples
///
/// ```rust,ignore
/// use hatchbot::controller::ControllerSettings;
///
/// // Worn sticks with visible drift
/// let settings = ControllerSettings {
///     joystick_deadzone: 0.08,
///     device_slots: 2,
///     poll_interval_us: 500,
/// };
/// ```
#[derive(Clone, Debug)]
pub struct ControllerSettings {
    /// Analog stick deadzone as a fraction (0.0-1.0), 0 disables it
    pub joystick_deadzone: f32,

    /// Number of device handles exposed to the control cycle
    pub device_slots: usize,

    /// Sleep between gilrs polls in microseconds
    pub poll_interval_us: u64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            joystick_deadzone: 0.0,
            device_slots: 2,
            poll_interval_us: 500,
        }
    }
}

/// Errors that can occur during controller initialization
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// Gamepad detection, driver problems or hardware communication failures
    #[error("Collector error: {0}")]
    CollectorError(#[from] CollectorError),
}

/// Read side of the controller subsystem
///
/// Implements [`InputSource`]: a handle without a bound, connected gamepad
/// reads as neutral state and logs a rate limited warning.
pub struct ControllerHandle {
    state_receiver: watch::Receiver<Vec<JoystickState>>,
    missing_warning: RateLimiter,
}

impl ControllerHandle {
    /// Spawns the gamepad collector and returns a handle reading its output
    ///
    /// # Errors
    ///
    /// [`ControllerError::CollectorError`] if gilrs cannot be initialized.
    pub fn spawn(
        settings: Option<ControllerSettings>,
        cancel: CancellationToken,
    ) -> Result<Self, ControllerError> {
        info!(
            "Initializing Controller system with settings: {:?}",
            settings
        );

        let settings = settings.unwrap_or_default();
        let collector_settings = CollectorSettings {
            joystick_deadzone: settings.joystick_deadzone,
            device_slots: settings.device_slots,
            poll_interval_us: settings.poll_interval_us,
        };
        debug!("Collector settings: {:?}", collector_settings);

        let collector_handle = CollectorHandle::spawn(Some(collector_settings), cancel)?;
        info!("Controller system initialized successfully");

        Ok(Self::new(collector_handle.subscribe()))
    }

    pub fn new(state_receiver: watch::Receiver<Vec<JoystickState>>) -> Self {
        Self {
            state_receiver,
            missing_warning: RateLimiter::new(1000),
        }
    }
}

impl InputSource for ControllerHandle {
    fn joystick(&mut self, handle: usize) -> JoystickState {
        let state = self.state_receiver.borrow().get(handle).cloned();

        match state {
            Some(state) if state.connected => state,
            _ => {
                if self.missing_warning.should_process() {
                    warn!(
                        "Joystick on device handle {} is not connected, reading neutral input",
                        handle
                    );
                }
                JoystickState::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::joystick::{AxisName, InputDevice};

    #[test]
    fn reads_latest_published_state() {
        let (tx, rx) = watch::channel(vec![JoystickState::default(); 2]);
        let mut handle = ControllerHandle::new(rx);

        tx.send_replace(vec![
            JoystickState::connected().with_axis(AxisName::Y, -1.0),
            JoystickState::connected().with_button(1, true),
        ]);

        assert_eq!(handle.joystick(0).axis(AxisName::Y), -1.0);
        assert!(handle.joystick(1).trigger());
    }

    #[test]
    fn disconnected_and_unknown_handles_read_neutral() {
        let mut stale = JoystickState::default().with_axis(AxisName::X, 0.4);
        stale.connected = false;
        let (_tx, rx) = watch::channel(vec![stale]);
        let mut handle = ControllerHandle::new(rx);

        assert_eq!(handle.joystick(0), JoystickState::default());
        assert_eq!(handle.joystick(5), JoystickState::default());
    }
}
