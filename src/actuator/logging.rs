use std::collections::HashMap;
use tracing::{debug, trace};

use super::{ActuatorChannel, ActuatorError, ActuatorOutput};

/// Output backend that only records and traces commanded values
#[derive(Debug, Default)]
pub struct LogBackend {
    last: HashMap<ActuatorChannel, f64>,
}

impl LogBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last value commanded on a channel, `None` if it was never set
    pub fn last(&self, channel: ActuatorChannel) -> Option<f64> {
        self.last.get(&channel).copied()
    }
}

impl ActuatorOutput for LogBackend {
    fn set(&mut self, channel: ActuatorChannel, power: f64) -> Result<(), ActuatorError> {
        match self.last.insert(channel, power) {
            Some(previous) if previous == power => trace!("{} holds {:.3}", channel, power),
            _ => debug!("{} set to {:.3}", channel, power),
        }
        Ok(())
    }
}
