/// Round countdown.
///
/// The deadline is fixed once at start; every reading is recomputed from
/// it, so a late or skipped tick never accumulates drift. The recurring
/// tick lives only as long as the `Countdown`: `cancel()` or dropping it
/// stops further readings.

use std::time::{Duration, Instant};

use tracing::trace;

/// Below this fraction of the round left, the bar turns to danger.
pub const DEFAULT_DANGER_FRACTION: f64 = 0.15;

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Reading {
    /// Remaining time as a fraction of the full duration, 0.0..=1.0.
    pub fraction: f64,
    /// Whole seconds remaining, rounded up.
    pub seconds: u64,
    pub danger: bool,
    pub expired: bool,
}

pub struct Countdown {
    deadline: Instant,
    duration: Duration,
    danger_fraction: f64,
    tick: Duration,
    next_tick: Instant,
    active: bool,
}

impl Countdown {
    pub fn start(now: Instant, duration: Duration, danger_fraction: f64) -> Self {
        Countdown {
            deadline: now + duration,
            duration,
            danger_fraction,
            tick: Duration::from_secs(1),
            next_tick: now,
            active: true,
        }
    }

    /// Reading at `now`; `None` once cancelled.
    pub fn reading(&self, now: Instant) -> Option<Reading> {
        if !self.active {
            return None;
        }
        let remaining = self.deadline.saturating_duration_since(now);
        let fraction = if self.duration.is_zero() {
            0.0
        } else {
            (remaining.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
        };
        let mut seconds = remaining.as_secs();
        if remaining.subsec_nanos() > 0 {
            seconds += 1;
        }
        Some(Reading {
            fraction,
            seconds,
            danger: fraction < self.danger_fraction,
            expired: remaining.is_zero(),
        })
    }

    /// Once-per-second tick: a reading when a tick is due, else `None`.
    pub fn poll(&mut self, now: Instant) -> Option<Reading> {
        if !self.active || now < self.next_tick {
            return None;
        }
        while self.next_tick <= now {
            self.next_tick += self.tick;
        }
        let reading = self.reading(now);
        trace!(?reading, "countdown tick");
        reading
    }

    pub fn cancel(&mut self) {
        self.active = false;
    }

    #[allow(dead_code)]
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn full_at_start() {
        let t0 = Instant::now();
        let c = Countdown::start(t0, secs(60), DEFAULT_DANGER_FRACTION);
        let r = c.reading(t0).unwrap();
        assert_eq!(r.fraction, 1.0);
        assert_eq!(r.seconds, 60);
        assert!(!r.danger);
        assert!(!r.expired);
    }

    #[test]
    fn danger_below_fifteen_percent() {
        let t0 = Instant::now();
        let c = Countdown::start(t0, secs(100), DEFAULT_DANGER_FRACTION);
        assert!(!c.reading(t0 + secs(85)).unwrap().danger);
        assert!(c.reading(t0 + secs(86)).unwrap().danger);
    }

    #[test]
    fn partial_seconds_round_up() {
        let t0 = Instant::now();
        let c = Countdown::start(t0, secs(10), DEFAULT_DANGER_FRACTION);
        assert_eq!(c.reading(t0 + Duration::from_millis(8_500)).unwrap().seconds, 2);
    }

    #[test]
    fn past_deadline_is_expired() {
        let t0 = Instant::now();
        let c = Countdown::start(t0, secs(5), DEFAULT_DANGER_FRACTION);
        let r = c.reading(t0 + secs(9)).unwrap();
        assert!(r.expired);
        assert_eq!(r.fraction, 0.0);
        assert_eq!(r.seconds, 0);
    }

    #[test]
    fn ticks_once_per_second_without_drift() {
        let t0 = Instant::now();
        let mut c = Countdown::start(t0, secs(30), DEFAULT_DANGER_FRACTION);
        assert!(c.poll(t0).is_some());
        assert!(c.poll(t0 + Duration::from_millis(400)).is_none());
        // A late tick reads from the deadline, not from an accumulator
        let late = c.poll(t0 + Duration::from_millis(3_200)).unwrap();
        assert_eq!(late.seconds, 27);
        assert!(c.poll(t0 + Duration::from_millis(3_900)).is_none());
        assert!(c.poll(t0 + secs(4)).is_some());
    }

    #[test]
    fn cancelled_countdown_stops_ticking() {
        let t0 = Instant::now();
        let mut c = Countdown::start(t0, secs(30), DEFAULT_DANGER_FRACTION);
        c.cancel();
        assert!(!c.is_active());
        assert!(c.poll(t0 + secs(2)).is_none());
        assert!(c.reading(t0).is_none());
    }
}
