//! Application time with pause/resume.
//!
//! Elapsed time is measured from a start instant. Pausing records when the
//! pause began; resuming moves the start forward by the paused duration, so
//! time spent paused never counts as elapsed.

use chrono::{DateTime, Local};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::common::clock::{Clock, SystemClock};

pub struct Timeline {
    clock: Arc<dyn Clock>,
    time_start: Instant,
    time_now: Duration,
    is_paused: bool,
    time_paused: Instant,
    started_at: DateTime<Local>,
}

impl Timeline {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            clock,
            time_start: now,
            time_now: Duration::ZERO,
            is_paused: false,
            time_paused: now,
            started_at: Local::now(),
        }
    }

    /// Make "now" the time origin and clear any pause.
    pub fn reset(&mut self) {
        let now = self.clock.now();
        self.time_start = now;
        self.time_now = Duration::ZERO;
        self.is_paused = false;
        self.time_paused = now;
        self.started_at = Local::now();
    }

    /// Recompute elapsed time. Does nothing while paused.
    pub fn update(&mut self) -> Duration {
        if !self.is_paused {
            self.time_now = self.clock.now().saturating_duration_since(self.time_start);
        }
        self.time_now
    }

    pub fn pause(&mut self) {
        if self.is_paused {
            return;
        }
        self.time_paused = self.clock.now();
        self.is_paused = true;
    }

    pub fn resume(&mut self) {
        if !self.is_paused {
            return;
        }
        let paused_for = self.clock.now().saturating_duration_since(self.time_paused);
        self.time_start += paused_for;
        self.is_paused = false;
    }

    /// Elapsed time as of the last `update()`.
    pub fn time_now(&self) -> Duration {
        self.time_now
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    /// Wall-clock time of the last reset.
    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::clock::ManualClock;

    fn manual() -> (ManualClock, Timeline) {
        let clock = ManualClock::new();
        let timeline = Timeline::new(Arc::new(clock.clone()));
        (clock, timeline)
    }

    #[test]
    fn test_reset_then_update_is_near_zero() {
        let mut timeline = Timeline::default();
        timeline.reset();
        let elapsed = timeline.update();
        assert!(elapsed < Duration::from_millis(50), "elapsed {:?}", elapsed);
        assert!(!timeline.is_paused());
    }

    #[test]
    fn test_update_tracks_clock() {
        let (clock, mut timeline) = manual();
        clock.advance(Duration::from_millis(1500));
        assert_eq!(timeline.update(), Duration::from_millis(1500));
        assert_eq!(timeline.time_now(), Duration::from_millis(1500));
    }

    #[test]
    fn test_pause_interval_is_not_counted() {
        let (clock, mut timeline) = manual();
        clock.advance(Duration::from_secs(2));
        let before_pause = timeline.update();

        timeline.pause();
        clock.advance(Duration::from_secs(5));
        timeline.resume();

        assert_eq!(timeline.update(), before_pause);
        clock.advance(Duration::from_secs(1));
        assert_eq!(timeline.update(), before_pause + Duration::from_secs(1));
    }

    #[test]
    fn test_update_is_frozen_while_paused() {
        let (clock, mut timeline) = manual();
        clock.advance(Duration::from_secs(1));
        timeline.update();
        timeline.pause();
        clock.advance(Duration::from_secs(3));
        assert_eq!(timeline.update(), Duration::from_secs(1));
        assert!(timeline.is_paused());
    }

    #[test]
    fn test_double_pause_keeps_first_pause_instant() {
        let (clock, mut timeline) = manual();
        timeline.pause();
        clock.advance(Duration::from_secs(1));
        timeline.pause();
        clock.advance(Duration::from_secs(1));
        timeline.resume();
        timeline.resume();
        assert_eq!(timeline.update(), Duration::ZERO);
    }

    #[test]
    fn test_reset_clears_pause() {
        let (clock, mut timeline) = manual();
        clock.advance(Duration::from_secs(4));
        timeline.pause();
        timeline.reset();
        assert!(!timeline.is_paused());
        assert_eq!(timeline.time_now(), Duration::ZERO);
        clock.advance(Duration::from_millis(10));
        assert_eq!(timeline.update(), Duration::from_millis(10));
    }
}
