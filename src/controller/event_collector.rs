use chrono::{DateTime, Local};
use gilrs::{Axis, Button, Event, EventType, Gamepad, GamepadId, Gilrs};
use statum::{machine, state};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::controller::joystick::{AxisName, JoystickState};

// Raw controller event with chrono timestamps, already in driver-station convention
#[derive(Debug, Clone, PartialEq)]
pub enum RawControllerEvent {
    AxisMove {
        axis: AxisName,
        value: f64,
        timestamp: DateTime<Local>,
    },
    ButtonEvent {
        index: u8,
        button_state: ButtonState,
        timestamp: DateTime<Local>,
    },
    Connected {
        timestamp: DateTime<Local>,
    },
    Disconnected {
        timestamp: DateTime<Local>,
    },
}

impl RawControllerEvent {
    pub fn timestamp(&self) -> DateTime<Local> {
        match self {
            RawControllerEvent::AxisMove { timestamp, .. }
            | RawControllerEvent::ButtonEvent { timestamp, .. }
            | RawControllerEvent::Connected { timestamp }
            | RawControllerEvent::Disconnected { timestamp } => *timestamp,
        }
    }
}

// Button state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonState {
    Pressed,
    Released,
}

// Collector settings
#[derive(Clone, Debug)]
pub struct CollectorSettings {
    pub joystick_deadzone: f32,
    /// Number of device handles published (handles `0..device_slots`)
    pub device_slots: usize,
    pub poll_interval_us: u64,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            joystick_deadzone: 0.0,
            device_slots: 2,
            poll_interval_us: 500,
        }
    }
}

// Collector errors
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Failed to initialize collector: {0}")]
    InitializationError(String),

    #[error("Failed to publish device state: {0}")]
    PublishError(String),
}

#[state]
#[derive(Debug, Clone)]
pub enum CollectionState {
    Initializing,
    Collecting,
}

#[machine]
#[derive(Debug)]
pub struct EventCollector<S: CollectionState> {
    gilrs: Gilrs,

    // Gamepad bound to each device handle
    slots: Vec<Option<GamepadId>>,

    settings: CollectorSettings,

    // Published device state, one entry per handle
    states: Vec<JoystickState>,

    state_sender: watch::Sender<Vec<JoystickState>>,
}

impl<S: CollectionState> EventCollector<S> {
    pub fn subscribe(&self) -> watch::Receiver<Vec<JoystickState>> {
        self.state_sender.subscribe()
    }
}

impl EventCollector<Initializing> {
    pub fn create(settings: Option<CollectorSettings>) -> Result<Self, CollectorError> {
        let settings = settings.unwrap_or_default();
        debug!("Creating Event Collector with settings: {:?}", settings);

        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(CollectorError::InitializationError(e.to_string()));
            }
        };

        let states = vec![JoystickState::default(); settings.device_slots];
        let (state_sender, _) = watch::channel(states.clone());
        let slots = vec![None; settings.device_slots];

        Ok(Self::new(gilrs, slots, settings, states, state_sender))
    }

    // Bind already connected gamepads to handles in enumeration order
    pub fn initialize(mut self) -> EventCollector<Collecting> {
        info!(
            "Initializing Event Collector with deadzone: {}",
            self.settings.joystick_deadzone
        );

        let gamepads: Vec<(GamepadId, Gamepad<'_>)> = self.gilrs.gamepads().collect();
        if gamepads.is_empty() {
            warn!("No gamepad connected, all device handles read neutral");
        } else {
            info!("Found {} gamepads:", gamepads.len());
            for (idx, (id, gamepad)) in gamepads.iter().enumerate() {
                info!(
                    "  [{}] ID: {}, Name: {}, UUID: {:?}",
                    idx,
                    id,
                    gamepad.name(),
                    gamepad.uuid()
                );
            }
        }

        let ids: Vec<GamepadId> = gamepads.iter().map(|(id, _)| *id).collect();
        let now = Local::now();
        for id in ids {
            if let Some(handle) = bind_slot(&mut self.slots, id) {
                info!("Gamepad {} bound to device handle {}", id, handle);
                apply_event(
                    &mut self.states[handle],
                    &RawControllerEvent::Connected { timestamp: now },
                );
            } else {
                warn!("No free device handle for gamepad {}", id);
            }
        }
        self.state_sender.send_replace(self.states.clone());

        info!("Event Collector initialized, transitioning to Collecting state");
        self.transition()
    }
}

impl EventCollector<Collecting> {
    // Drain all pending gilrs events, returns true if any device state changed
    pub fn collect_pending_events(&mut self) -> bool {
        let mut changed = false;

        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            let handle = match event {
                EventType::Connected => match bind_slot(&mut self.slots, id) {
                    Some(handle) => {
                        info!("Gamepad {} connected as device handle {}", id, handle);
                        Some(handle)
                    }
                    None => {
                        warn!("Gamepad {} connected but all device handles are taken", id);
                        None
                    }
                },
                _ => self.slots.iter().position(|slot| *slot == Some(id)),
            };

            let Some(handle) = handle else {
                debug!("Skipping event from unbound gamepad: {:?}", id);
                continue;
            };

            let Some(raw_event) = convert_gilrs_event(event, self.settings.joystick_deadzone)
            else {
                continue;
            };

            let at = raw_event.timestamp().format("%H:%M:%S.%3f");
            match &raw_event {
                RawControllerEvent::ButtonEvent {
                    index,
                    button_state,
                    ..
                } => {
                    debug!("Device {} button {} {:?} at {}", handle, index, button_state, at);
                }
                RawControllerEvent::Disconnected { .. } => {
                    warn!(
                        "Gamepad {} on device handle {} disconnected at {}",
                        id, handle, at
                    );
                    self.slots[handle] = None;
                }
                _ => debug!("Device {} captured event at {}: {:?}", handle, at, raw_event),
            }

            apply_event(&mut self.states[handle], &raw_event);
            changed = true;
        }

        changed
    }

    pub fn run_collection_loop(&mut self, cancel: CancellationToken) -> Result<(), CollectorError> {
        info!("Starting Event Collector loop");

        let mut publish_count = 0;
        let mut last_log_time = Local::now();
        let log_interval = chrono::Duration::seconds(10);
        let poll_interval = std::time::Duration::from_micros(self.settings.poll_interval_us);

        while !cancel.is_cancelled() {
            if self.collect_pending_events() {
                if self.state_sender.is_closed() {
                    return Err(CollectorError::PublishError(
                        "all device state receivers dropped".to_string(),
                    ));
                }
                self.state_sender.send_replace(self.states.clone());
                publish_count += 1;
            }

            let now = Local::now();
            if now - last_log_time > log_interval {
                info!(
                    "Event Collector stats: {} state updates in last {} seconds",
                    publish_count,
                    log_interval.num_seconds()
                );
                publish_count = 0;
                last_log_time = now;
            }

            std::thread::sleep(poll_interval);
        }

        info!("Event Collector loop cancelled");
        Ok(())
    }
}

// Public interface for spawning and running the collector
pub struct CollectorHandle {
    state_receiver: watch::Receiver<Vec<JoystickState>>,
}

impl CollectorHandle {
    pub fn spawn(
        settings: Option<CollectorSettings>,
        cancel: CancellationToken,
    ) -> Result<Self, CollectorError> {
        info!("Spawning Event Collector with settings: {:?}", settings);

        let collector = EventCollector::create(settings)?;
        let state_receiver = collector.subscribe();

        // gilrs polling blocks, keep it off the async workers
        let task_handle = tokio::task::spawn_blocking(move || {
            let mut collecting = collector.initialize();
            if let Err(e) = collecting.run_collection_loop(cancel) {
                error!("Collector task terminated with error: {}", e);
            }
        });

        debug!("Blocking task spawned with handle: {:?}", task_handle);
        info!("Event Collector successfully started");

        Ok(Self { state_receiver })
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<JoystickState>> {
        self.state_receiver.clone()
    }
}

// Assign a gamepad to the first free handle, or return the handle it already owns
fn bind_slot(slots: &mut [Option<GamepadId>], id: GamepadId) -> Option<usize> {
    if let Some(handle) = slots.iter().position(|slot| *slot == Some(id)) {
        return Some(handle);
    }
    let handle = slots.iter().position(Option::is_none)?;
    slots[handle] = Some(id);
    Some(handle)
}

// Update one device's state from an already converted event
pub fn apply_event(state: &mut JoystickState, event: &RawControllerEvent) {
    match event {
        RawControllerEvent::AxisMove { axis, value, .. } => state.set_axis(*axis, *value),
        RawControllerEvent::ButtonEvent {
            index,
            button_state,
            ..
        } => state.set_button(*index, *button_state == ButtonState::Pressed),
        RawControllerEvent::Connected { .. } => state.connected = true,
        RawControllerEvent::Disconnected { .. } => {
            state.release_all();
            state.connected = false;
        }
    }
}

fn convert_gilrs_event(event: EventType, deadzone: f32) -> Option<RawControllerEvent> {
    let timestamp = Local::now();

    match event {
        EventType::AxisChanged(axis, value, _) => {
            let (axis, value) = map_axis(axis, apply_deadzone(value, deadzone))?;
            Some(RawControllerEvent::AxisMove {
                axis,
                value,
                timestamp,
            })
        }
        EventType::ButtonPressed(button, _) => map_button(button).map(|index| {
            RawControllerEvent::ButtonEvent {
                index,
                button_state: ButtonState::Pressed,
                timestamp,
            }
        }),
        EventType::ButtonReleased(button, _) => map_button(button).map(|index| {
            RawControllerEvent::ButtonEvent {
                index,
                button_state: ButtonState::Released,
                timestamp,
            }
        }),
        EventType::Connected => Some(RawControllerEvent::Connected { timestamp }),
        EventType::Disconnected => Some(RawControllerEvent::Disconnected { timestamp }),
        _ => None,
    }
}

// gilrs reports up as positive Y, driver-station convention is forward negative
fn map_axis(axis: Axis, value: f32) -> Option<(AxisName, f64)> {
    let value = f64::from(value.clamp(-1.0, 1.0));
    match axis {
        Axis::LeftStickX => Some((AxisName::X, value)),
        Axis::LeftStickY => Some((AxisName::Y, -value)),
        Axis::RightStickX => Some((AxisName::Twist, value)),
        Axis::RightStickY => Some((AxisName::Throttle, -value)),
        _ => None,
    }
}

// Raw button numbering as a driver station enumerates an Xbox-style pad
fn map_button(button: Button) -> Option<u8> {
    match button {
        Button::South => Some(1),
        Button::East => Some(2),
        Button::West => Some(3),
        Button::North => Some(4),
        Button::LeftTrigger => Some(5),
        Button::RightTrigger => Some(6),
        Button::Select => Some(7),
        Button::Start => Some(8),
        Button::LeftThumb => Some(9),
        Button::RightThumb => Some(10),
        Button::Mode => Some(11),
        Button::LeftTrigger2 => Some(12),
        Button::RightTrigger2 => Some(13),
        Button::DPadUp => Some(14),
        Button::DPadDown => Some(15),
        Button::DPadLeft => Some(16),
        Button::DPadRight => Some(17),
        _ => None,
    }
}

// Rescale the value to the range outside the deadzone
fn apply_deadzone(value: f32, deadzone: f32) -> f32 {
    if deadzone <= 0.0 {
        return value;
    }
    if value.abs() < deadzone {
        0.0
    } else {
        let sign = if value < 0.0 { -1.0 } else { 1.0 };
        sign * (value.abs() - deadzone) / (1.0 - deadzone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::joystick::InputDevice;

    #[test]
    fn forward_stick_reads_negative_y() {
        assert_eq!(map_axis(Axis::LeftStickY, 1.0), Some((AxisName::Y, -1.0)));
        assert_eq!(map_axis(Axis::LeftStickX, 0.5), Some((AxisName::X, 0.5)));
        assert_eq!(map_axis(Axis::LeftZ, 0.5), None);
    }

    #[test]
    fn zero_deadzone_passes_values_through() {
        assert_eq!(apply_deadzone(0.01, 0.0), 0.01);
        assert_eq!(apply_deadzone(-0.7, 0.0), -0.7);
    }

    #[test]
    fn deadzone_rescales_outside_band() {
        assert_eq!(apply_deadzone(0.04, 0.05), 0.0);
        assert!((apply_deadzone(1.0, 0.05) - 1.0).abs() < 1e-6);
        assert!((apply_deadzone(-0.525, 0.05) + 0.5).abs() < 1e-6);
    }

    #[test]
    fn south_face_button_is_trigger() {
        assert_eq!(map_button(Button::South), Some(1));
        assert_eq!(map_button(Button::Mode), Some(11));
        assert_eq!(map_button(Button::Unknown), None);
    }

    #[test]
    fn events_update_device_state() {
        let now = Local::now();
        let mut state = JoystickState::default();

        apply_event(&mut state, &RawControllerEvent::Connected { timestamp: now });
        apply_event(
            &mut state,
            &RawControllerEvent::AxisMove {
                axis: AxisName::Y,
                value: -0.6,
                timestamp: now,
            },
        );
        apply_event(
            &mut state,
            &RawControllerEvent::ButtonEvent {
                index: 1,
                button_state: ButtonState::Pressed,
                timestamp: now,
            },
        );

        assert!(state.connected);
        assert_eq!(state.axis(AxisName::Y), -0.6);
        assert!(state.trigger());

        apply_event(
            &mut state,
            &RawControllerEvent::ButtonEvent {
                index: 1,
                button_state: ButtonState::Released,
                timestamp: now,
            },
        );
        assert!(!state.trigger());
    }

    #[test]
    fn every_event_carries_its_timestamp() {
        let now = Local::now();
        let events = [
            RawControllerEvent::AxisMove {
                axis: AxisName::X,
                value: 0.1,
                timestamp: now,
            },
            RawControllerEvent::Connected { timestamp: now },
            RawControllerEvent::Disconnected { timestamp: now },
        ];
        for event in events {
            assert_eq!(event.timestamp(), now);
        }
    }

    #[test]
    fn disconnect_neutralizes_device() {
        let now = Local::now();
        let mut state = JoystickState::connected()
            .with_axis(AxisName::X, 0.9)
            .with_button(11, true);

        apply_event(&mut state, &RawControllerEvent::Disconnected { timestamp: now });

        assert!(!state.connected);
        assert_eq!(state.axis(AxisName::X), 0.0);
        assert!(!state.raw_button(11));
    }
}
