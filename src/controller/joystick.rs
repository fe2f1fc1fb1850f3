//! Joystick state and the input-device seams consumed by the control cycle.
//!
//! Axis values follow the driver-station convention: pushing a stick forward
//! yields a negative Y value. Buttons are addressed by 1-based raw index, and
//! the trigger is raw button 1.

use std::fmt;

/// Named analog axis of an input device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisName {
    X,
    Y,
    Twist,
    Throttle,
}

impl fmt::Display for AxisName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisName::X => write!(f, "X"),
            AxisName::Y => write!(f, "Y"),
            AxisName::Twist => write!(f, "Twist"),
            AxisName::Throttle => write!(f, "Throttle"),
        }
    }
}

/// Raw index of the trigger button
pub const TRIGGER_BUTTON: u8 = 1;

/// Highest raw button index a [`JoystickState`] can hold
pub const MAX_BUTTONS: u8 = 32;

/// Read access to one dual-axis input device
pub trait InputDevice {
    /// Current value of an axis in `[-1, 1]`
    fn axis(&self, axis: AxisName) -> f64;

    /// State of a 1-based raw button; out-of-range indices read as released
    fn raw_button(&self, index: u8) -> bool;

    /// State of the trigger (raw button 1)
    fn trigger(&self) -> bool {
        self.raw_button(TRIGGER_BUTTON)
    }
}

/// Source of device state, indexed by a stable integer handle
///
/// Missing or disconnected devices must read as [`JoystickState::default`],
/// i.e. centered axes and no buttons held.
pub trait InputSource {
    fn joystick(&mut self, handle: usize) -> JoystickState;
}

/// Last known state of one input device
#[derive(Clone, Debug, PartialEq)]
pub struct JoystickState {
    pub x: f64,
    pub y: f64,
    pub twist: f64,
    pub throttle: f64,
    /// Bit `n - 1` is set while raw button `n` is held
    pub buttons: u32,
    pub connected: bool,
}

impl Default for JoystickState {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            twist: 0.0,
            throttle: 0.0,
            buttons: 0,
            connected: false,
        }
    }
}

impl JoystickState {
    /// A connected device with centered axes and no buttons held
    pub fn connected() -> Self {
        Self {
            connected: true,
            ..Self::default()
        }
    }

    pub fn with_axis(mut self, axis: AxisName, value: f64) -> Self {
        self.set_axis(axis, value);
        self
    }

    pub fn with_button(mut self, index: u8, pressed: bool) -> Self {
        self.set_button(index, pressed);
        self
    }

    pub fn set_axis(&mut self, axis: AxisName, value: f64) {
        match axis {
            AxisName::X => self.x = value,
            AxisName::Y => self.y = value,
            AxisName::Twist => self.twist = value,
            AxisName::Throttle => self.throttle = value,
        }
    }

    pub fn set_button(&mut self, index: u8, pressed: bool) {
        if index == 0 || index > MAX_BUTTONS {
            return;
        }
        let mask = 1u32 << (index - 1);
        if pressed {
            self.buttons |= mask;
        } else {
            self.buttons &= !mask;
        }
    }

    /// Drops all held buttons and recenters the axes, keeping the connection flag
    pub fn release_all(&mut self) {
        self.x = 0.0;
        self.y = 0.0;
        self.twist = 0.0;
        self.throttle = 0.0;
        self.buttons = 0;
    }
}

impl InputDevice for JoystickState {
    fn axis(&self, axis: AxisName) -> f64 {
        match axis {
            AxisName::X => self.x,
            AxisName::Y => self.y,
            AxisName::Twist => self.twist,
            AxisName::Throttle => self.throttle,
        }
    }

    fn raw_button(&self, index: u8) -> bool {
        if index == 0 || index > MAX_BUTTONS {
            return false;
        }
        self.buttons & (1u32 << (index - 1)) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buttons_are_one_based() {
        let state = JoystickState::connected().with_button(11, true);
        assert!(state.raw_button(11));
        assert!(!state.raw_button(10));
        assert!(!state.raw_button(12));
        assert_eq!(state.buttons, 1 << 10);
    }

    #[test]
    fn trigger_reads_button_one() {
        let state = JoystickState::connected().with_button(TRIGGER_BUTTON, true);
        assert!(state.trigger());
        assert!(!JoystickState::connected().trigger());
    }

    #[test]
    fn out_of_range_buttons_are_ignored() {
        let state = JoystickState::connected()
            .with_button(0, true)
            .with_button(MAX_BUTTONS + 1, true);
        assert_eq!(state.buttons, 0);
        assert!(!state.raw_button(0));
        assert!(!state.raw_button(200));
    }

    #[test]
    fn release_all_keeps_connection() {
        let mut state = JoystickState::connected()
            .with_axis(AxisName::Y, -0.8)
            .with_button(3, true);
        state.release_all();
        assert!(state.connected);
        assert_eq!(state.axis(AxisName::Y), 0.0);
        assert!(!state.raw_button(3));
    }
}
