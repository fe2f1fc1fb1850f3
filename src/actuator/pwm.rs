//! Software PWM outputs for RC-style motor controllers on Raspberry Pi GPIO.
//!
//! Power maps linearly onto a 1000-2000 µs pulse with 1500 µs as neutral,
//! the same range an RC receiver drives.

use rppal::gpio::{Gpio, OutputPin};
use std::time::Duration;
use tracing::{debug, info};

use super::{ActuatorChannel, ActuatorError, ActuatorOutput, OutputSettings};

pub const NEUTRAL_PULSE_US: f64 = 1500.0;
pub const PULSE_RANGE_US: f64 = 500.0;

struct PwmChannel {
    pins: Vec<OutputPin>,
    inverted: bool,
}

pub struct PwmBackend {
    period: Duration,
    // One entry per channel, in `ActuatorChannel::ALL` order
    channels: Vec<PwmChannel>,
}

impl PwmBackend {
    /// Claims every bound GPIO pin and parks it at the neutral pulse
    pub fn new(settings: &OutputSettings) -> Result<Self, ActuatorError> {
        let period = Duration::from_millis(settings.pwm_period_ms);
        let gpio = Gpio::new()?;
        info!("Opened GPIO, PWM period {:?}", period);

        let mut channels = Vec::with_capacity(ActuatorChannel::ALL.len());
        for channel in ActuatorChannel::ALL {
            let binding = settings.channels.get(channel);
            let mut pins = Vec::with_capacity(binding.ports.len());

            for &port in &binding.ports {
                let mut pin = gpio.get(port)?.into_output_low();
                pin.set_pwm(period, Duration::from_micros(pulse_width_us(0.0, false)))?;
                pins.push(pin);
            }

            info!(
                "{} bound to GPIO {:?} (inverted: {})",
                channel, binding.ports, binding.inverted
            );
            channels.push(PwmChannel {
                pins,
                inverted: binding.inverted,
            });
        }

        Ok(Self { period, channels })
    }
}

impl ActuatorOutput for PwmBackend {
    fn set(&mut self, channel: ActuatorChannel, power: f64) -> Result<(), ActuatorError> {
        let output = &mut self.channels[channel.index()];

        let pulse = Duration::from_micros(pulse_width_us(power, output.inverted));
        for pin in output.pins.iter_mut() {
            pin.set_pwm(self.period, pulse)?;
        }
        debug!("{} pulse {:?}", channel, pulse);
        Ok(())
    }
}

/// Pulse width for a normalized power, saturating outside `[-1, 1]`
pub fn pulse_width_us(power: f64, inverted: bool) -> u64 {
    let power = power.clamp(-1.0, 1.0);
    let power = if inverted { -power } else { power };
    (NEUTRAL_PULSE_US + PULSE_RANGE_US * power).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulse_spans_rc_range() {
        assert_eq!(pulse_width_us(0.0, false), 1500);
        assert_eq!(pulse_width_us(1.0, false), 2000);
        assert_eq!(pulse_width_us(-1.0, false), 1000);
        assert_eq!(pulse_width_us(0.75, false), 1875);
        assert_eq!(pulse_width_us(-0.3, false), 1350);
    }

    #[test]
    fn inverted_channel_mirrors_pulse() {
        assert_eq!(pulse_width_us(0.75, true), 1125);
        assert_eq!(pulse_width_us(0.0, true), 1500);
    }

    #[test]
    fn out_of_range_power_saturates() {
        assert_eq!(pulse_width_us(1.5, false), 2000);
        assert_eq!(pulse_width_us(-3.0, false), 1000);
    }
}
