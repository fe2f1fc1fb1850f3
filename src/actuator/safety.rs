//! Output sharing and the actuator safety watchdog
//!
//! [`SafeOutputs`] wraps a backend so the control cycle and the watchdog task
//! can both reach it. Every `set` stamps the channel; [`SafetyWatchdog`]
//! stops any guarded channel whose stamp is older than the expiration, so a
//! stalled scheduler cannot leave a motor running. A stopped channel stays
//! quiet until it is commanded again.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::{ActuatorChannel, ActuatorError, ActuatorOutput};

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SafetySettings {
    pub expiration_ms: u64,
    pub guarded_channels: Vec<ActuatorChannel>,
}

impl Default for SafetySettings {
    fn default() -> Self {
        Self {
            expiration_ms: 100,
            guarded_channels: ActuatorChannel::ALL.to_vec(),
        }
    }
}

impl SafetySettings {
    pub fn expiration(&self) -> Duration {
        Duration::from_millis(self.expiration_ms)
    }
}

struct Guarded<B> {
    backend: B,
    last_update: HashMap<ActuatorChannel, Instant>,
    tripped: HashSet<ActuatorChannel>,
}

/// Cloneable handle to one backend shared between tasks
pub struct SafeOutputs<B> {
    inner: Arc<Mutex<Guarded<B>>>,
}

impl<B> Clone for SafeOutputs<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: ActuatorOutput> SafeOutputs<B> {
    pub fn new(backend: B) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Guarded {
                backend,
                last_update: HashMap::new(),
                tripped: HashSet::new(),
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Guarded<B>>, ActuatorError> {
        self.inner.lock().map_err(|_| ActuatorError::LockPoisoned)
    }

    /// Stops guarded channels not updated within the expiration
    ///
    /// Returns the channels stopped by this call.
    pub fn check_expired(
        &self,
        now: Instant,
        settings: &SafetySettings,
    ) -> Result<Vec<ActuatorChannel>, ActuatorError> {
        let mut guard = self.lock()?;
        let expiration = settings.expiration();
        let mut stopped = Vec::new();

        for &channel in &settings.guarded_channels {
            let stale = guard
                .last_update
                .get(&channel)
                .is_some_and(|updated| now.saturating_duration_since(*updated) > expiration);

            if stale && !guard.tripped.contains(&channel) {
                guard.backend.stop(channel)?;
                guard.tripped.insert(channel);
                stopped.push(channel);
            }
        }

        Ok(stopped)
    }

    /// Runs `f` against the wrapped backend
    pub fn inspect<R>(&self, f: impl FnOnce(&B) -> R) -> Result<R, ActuatorError> {
        let guard = self.lock()?;
        Ok(f(&guard.backend))
    }
}

impl<B: ActuatorOutput> ActuatorOutput for SafeOutputs<B> {
    fn set(&mut self, channel: ActuatorChannel, power: f64) -> Result<(), ActuatorError> {
        let mut guard = self.lock()?;
        guard.backend.set(channel, power)?;
        guard.last_update.insert(channel, Instant::now());
        guard.tripped.remove(&channel);
        Ok(())
    }

    // A deliberately stopped channel is no longer watched
    fn stop(&mut self, channel: ActuatorChannel) -> Result<(), ActuatorError> {
        let mut guard = self.lock()?;
        guard.backend.stop(channel)?;
        guard.last_update.remove(&channel);
        guard.tripped.remove(&channel);
        Ok(())
    }
}

pub struct SafetyWatchdog;

impl SafetyWatchdog {
    /// Spawns the watchdog task; it runs until `cancel` fires
    pub fn spawn<B>(
        outputs: SafeOutputs<B>,
        settings: SafetySettings,
        cancel: CancellationToken,
    ) -> JoinHandle<()>
    where
        B: ActuatorOutput + Send + 'static,
    {
        info!(
            "Starting safety watchdog: {}ms expiration on {:?}",
            settings.expiration_ms, settings.guarded_channels
        );

        tokio::spawn(async move {
            let check_period = (settings.expiration() / 2).max(Duration::from_millis(1));
            let mut interval = tokio::time::interval(check_period);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        match outputs.check_expired(Instant::now(), &settings) {
                            Ok(stopped) => {
                                for channel in stopped {
                                    error!(
                                        "{} output not updated often enough, stopped by safety watchdog",
                                        channel
                                    );
                                }
                            }
                            Err(e) => error!("Safety watchdog check failed: {}", e),
                        }
                    }
                }
            }

            debug!("Safety watchdog stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::logging::LogBackend;

    fn settings() -> SafetySettings {
        SafetySettings::default()
    }

    #[test]
    fn fresh_channels_are_left_alone() {
        let mut outputs = SafeOutputs::new(LogBackend::new());
        outputs.set(ActuatorChannel::Hatch, 0.75).unwrap();

        let stopped = outputs.check_expired(Instant::now(), &settings()).unwrap();

        assert!(stopped.is_empty());
        let hatch = outputs.inspect(|b| b.last(ActuatorChannel::Hatch)).unwrap();
        assert_eq!(hatch, Some(0.75));
    }

    #[test]
    fn stale_guarded_channel_is_stopped_once() {
        let mut outputs = SafeOutputs::new(LogBackend::new());
        outputs.set(ActuatorChannel::Cargo, 0.3).unwrap();
        let later = Instant::now() + Duration::from_millis(250);

        let stopped = outputs.check_expired(later, &settings()).unwrap();
        assert_eq!(stopped, vec![ActuatorChannel::Cargo]);
        let cargo = outputs.inspect(|b| b.last(ActuatorChannel::Cargo)).unwrap();
        assert_eq!(cargo, Some(0.0));

        let again = outputs.check_expired(later, &settings()).unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn stale_drive_channels_are_stopped() {
        let mut outputs = SafeOutputs::new(LogBackend::new());
        outputs.set(ActuatorChannel::LeftDrive, 0.75).unwrap();
        outputs.set(ActuatorChannel::RightDrive, 0.75).unwrap();
        let later = Instant::now() + Duration::from_secs(10);

        let stopped = outputs.check_expired(later, &settings()).unwrap();

        assert_eq!(
            stopped,
            vec![ActuatorChannel::LeftDrive, ActuatorChannel::RightDrive]
        );
        for channel in [ActuatorChannel::LeftDrive, ActuatorChannel::RightDrive] {
            assert_eq!(outputs.inspect(|b| b.last(channel)).unwrap(), Some(0.0));
        }
    }

    #[test]
    fn unguarded_channels_are_not_watched() {
        let mut outputs = SafeOutputs::new(LogBackend::new());
        outputs.set(ActuatorChannel::LeftDrive, 0.9).unwrap();
        let settings = SafetySettings {
            guarded_channels: vec![ActuatorChannel::Hatch],
            ..SafetySettings::default()
        };
        let later = Instant::now() + Duration::from_secs(5);

        assert!(outputs.check_expired(later, &settings).unwrap().is_empty());
        let left = outputs.inspect(|b| b.last(ActuatorChannel::LeftDrive)).unwrap();
        assert_eq!(left, Some(0.9));
    }

    #[test]
    fn commanding_again_rearms_the_channel() {
        let mut outputs = SafeOutputs::new(LogBackend::new());
        outputs.set(ActuatorChannel::Hatch, 0.75).unwrap();
        outputs
            .check_expired(Instant::now() + Duration::from_millis(500), &settings())
            .unwrap();

        outputs.set(ActuatorChannel::Hatch, 0.75).unwrap();
        let stopped = outputs
            .check_expired(Instant::now() + Duration::from_millis(500), &settings())
            .unwrap();
        assert_eq!(stopped, vec![ActuatorChannel::Hatch]);
    }

    #[test]
    fn explicit_stop_is_not_a_fault() {
        let mut outputs = SafeOutputs::new(LogBackend::new());
        outputs.set(ActuatorChannel::Hatch, 0.75).unwrap();
        outputs.stop_all().unwrap();

        let stopped = outputs
            .check_expired(Instant::now() + Duration::from_secs(1), &settings())
            .unwrap();
        assert!(stopped.is_empty());
    }

    #[tokio::test]
    async fn watchdog_task_stops_stale_output() {
        let mut outputs = SafeOutputs::new(LogBackend::new());
        let cancel = CancellationToken::new();
        let settings = SafetySettings {
            expiration_ms: 10,
            guarded_channels: vec![ActuatorChannel::Cargo],
        };
        outputs.set(ActuatorChannel::Cargo, -0.3).unwrap();

        let handle = SafetyWatchdog::spawn(outputs.clone(), settings, cancel.clone());
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        handle.await.unwrap();

        let cargo = outputs.inspect(|b| b.last(ActuatorChannel::Cargo)).unwrap();
        assert_eq!(cargo, Some(0.0));
    }
}
