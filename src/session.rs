use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionState {
    Idle,
    Running,
    Paused,
    Ended,
}

/// What a tick did to the clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockTick {
    /// Not running; nothing to advance
    Inactive,
    Running { elapsed_ms: f64, remaining_ms: f64 },
    /// The remaining time reached zero on this tick
    Ended { elapsed_ms: f64 },
}

/// idle → running ⇄ paused → ended → idle
///
/// Timestamps are wall-clock milliseconds from the caller's monotonic source.
#[derive(Debug, Clone)]
pub struct SessionClock {
    state: SessionState,
    duration_ms: f64,
    started_at: f64,
    paused_at: Option<f64>,
    paused_accum_ms: f64,
    elapsed_ms: f64,
}

impl SessionClock {
    pub fn new(duration_ms: f64) -> Self {
        Self {
            state: SessionState::Idle,
            duration_ms: duration_ms.max(0.0),
            started_at: 0.0,
            paused_at: None,
            paused_accum_ms: 0.0,
            elapsed_ms: 0.0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    pub fn paused_accum_ms(&self) -> f64 {
        self.paused_accum_ms
    }

    /// Active time as of the last tick (pauses excluded)
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    pub fn remaining_ms(&self) -> f64 {
        (self.duration_ms - self.elapsed_ms).max(0.0)
    }

    /// Active session time at `now_ms`, frozen while paused
    pub fn session_time(&self, now_ms: f64) -> f64 {
        match self.state {
            SessionState::Running => {
                (now_ms - self.started_at - self.paused_accum_ms).clamp(0.0, self.duration_ms)
            }
            _ => self.elapsed_ms,
        }
    }

    /// Only valid from idle; returns whether the clock started
    pub fn start(&mut self, now_ms: f64) -> bool {
        if self.state != SessionState::Idle {
            return false;
        }
        self.state = SessionState::Running;
        self.started_at = now_ms;
        self.paused_at = None;
        self.paused_accum_ms = 0.0;
        self.elapsed_ms = 0.0;
        info!(duration_ms = self.duration_ms, "session started");
        true
    }

    pub fn pause(&mut self, now_ms: f64) -> bool {
        if self.state != SessionState::Running {
            return false;
        }
        self.elapsed_ms = self.session_time(now_ms);
        self.state = SessionState::Paused;
        self.paused_at = Some(now_ms);
        info!(elapsed_ms = self.elapsed_ms, "session paused");
        true
    }

    /// Credits the paused interval so elapsed-time math survives the pause
    pub fn resume(&mut self, now_ms: f64) -> bool {
        if self.state != SessionState::Paused {
            return false;
        }
        if let Some(paused_at) = self.paused_at.take() {
            self.paused_accum_ms += (now_ms - paused_at).max(0.0);
        }
        self.state = SessionState::Running;
        info!(paused_accum_ms = self.paused_accum_ms, "session resumed");
        true
    }

    pub fn tick(&mut self, now_ms: f64) -> ClockTick {
        if self.state != SessionState::Running {
            return ClockTick::Inactive;
        }
        let elapsed = now_ms - self.started_at - self.paused_accum_ms;
        let remaining = (self.duration_ms - elapsed).max(0.0);
        self.elapsed_ms = elapsed.clamp(0.0, self.duration_ms);

        if remaining <= 0.0 {
            self.state = SessionState::Ended;
            info!(elapsed_ms = self.elapsed_ms, "session ended");
            ClockTick::Ended {
                elapsed_ms: self.elapsed_ms,
            }
        } else {
            ClockTick::Running {
                elapsed_ms: self.elapsed_ms,
                remaining_ms: remaining,
            }
        }
    }

    /// Permitted from any state
    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.paused_at = None;
        self.paused_accum_ms = 0.0;
        self.elapsed_ms = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_requires_idle() {
        let mut clock = SessionClock::new(1000.0);
        assert!(clock.start(0.0));
        assert!(!clock.start(10.0));
        assert_eq!(clock.state(), SessionState::Running);
    }

    #[test]
    fn test_pause_resume_only_from_matching_states() {
        let mut clock = SessionClock::new(1000.0);
        assert!(!clock.pause(0.0));
        assert!(!clock.resume(0.0));
        clock.start(0.0);
        assert!(!clock.resume(5.0));
        assert!(clock.pause(100.0));
        assert!(!clock.pause(150.0));
        assert!(clock.resume(400.0));
        assert_eq!(clock.paused_accum_ms(), 300.0);
    }

    #[test]
    fn test_tick_excludes_paused_time() {
        let mut clock = SessionClock::new(1000.0);
        clock.start(0.0);
        clock.pause(200.0);
        assert_eq!(clock.tick(5000.0), ClockTick::Inactive);
        clock.resume(700.0);
        match clock.tick(900.0) {
            ClockTick::Running {
                elapsed_ms,
                remaining_ms,
            } => {
                assert_eq!(elapsed_ms, 400.0);
                assert_eq!(remaining_ms, 600.0);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(clock.tick(1500.0), ClockTick::Ended { elapsed_ms: 1000.0 });
        assert_eq!(clock.state(), SessionState::Ended);
        assert_eq!(clock.tick(1600.0), ClockTick::Inactive);
    }

    #[test]
    fn test_session_time_frozen_while_paused() {
        let mut clock = SessionClock::new(10_000.0);
        clock.start(1000.0);
        clock.pause(1600.0);
        assert_eq!(clock.session_time(9000.0), 600.0);
        clock.resume(2000.0);
        assert_eq!(clock.session_time(2100.0), 700.0);
    }

    #[test]
    fn test_reset_from_any_state() {
        let mut clock = SessionClock::new(1000.0);
        clock.start(0.0);
        clock.pause(10.0);
        clock.reset();
        assert_eq!(clock.state(), SessionState::Idle);
        assert!(clock.start(50.0));
    }
}
