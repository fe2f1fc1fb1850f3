use std::time::{Duration, Instant};

/// Resettable stopwatch
#[derive(Debug, Clone, Default)]
pub struct PhaseTimer {
    accumulated: Duration,
    started_at: Option<Instant>,
}

impl PhaseTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zeroes the elapsed time, keeping the running state
    pub fn reset(&mut self) {
        self.accumulated = Duration::ZERO;
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
        }
    }

    pub fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    pub fn stop(&mut self) {
        if let Some(started) = self.started_at.take() {
            self.accumulated += started.elapsed();
        }
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn elapsed(&self) -> Duration {
        match self.started_at {
            Some(started) => self.accumulated + started.elapsed(),
            None => self.accumulated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_timer_is_stopped_at_zero() {
        let timer = PhaseTimer::new();
        assert!(!timer.is_running());
        assert_eq!(timer.elapsed(), Duration::ZERO);
    }

    #[test]
    fn runs_after_start_and_freezes_on_stop() {
        let mut timer = PhaseTimer::new();
        timer.start();
        std::thread::sleep(Duration::from_millis(5));
        timer.stop();

        let frozen = timer.elapsed();
        assert!(frozen >= Duration::from_millis(5));
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(timer.elapsed(), frozen);
    }

    #[test]
    fn reset_then_start_counts_from_zero() {
        let mut timer = PhaseTimer::new();
        timer.start();
        std::thread::sleep(Duration::from_millis(20));
        timer.stop();

        timer.reset();
        timer.start();
        assert!(timer.is_running());
        assert!(timer.elapsed() < Duration::from_millis(20));
    }
}
