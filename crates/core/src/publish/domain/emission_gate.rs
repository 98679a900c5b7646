use std::time::{Duration, Instant};

/// Per-session rate limiter.
///
/// Emits when nothing was emitted yet or when at least `interval` has
/// passed since the last emission. Time is passed in so callers (and
/// tests) control the clock.
#[derive(Clone, Debug)]
pub struct EmissionGate {
    interval: Duration,
    last: Option<Instant>,
}

impl EmissionGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Returns true and records `now` if an emission is allowed.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        let open = match self.last {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        };
        if open {
            self.last = Some(now);
        }
        open
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn last_emission(&self) -> Option<Instant> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn at_rate(hz: f64) -> EmissionGate {
        EmissionGate::new(Duration::from_secs_f64(1.0 / hz))
    }

    #[test]
    fn test_first_frame_is_emitted() {
        let mut gate = at_rate(30.0);
        assert!(gate.try_acquire(Instant::now()));
    }

    #[test]
    fn test_frame_inside_interval_is_throttled() {
        let mut gate = at_rate(30.0);
        let t0 = Instant::now();
        assert!(gate.try_acquire(t0));
        assert!(!gate.try_acquire(t0 + Duration::from_millis(20)));
        assert!(!gate.try_acquire(t0 + Duration::from_millis(33)));
        assert!(gate.try_acquire(t0 + Duration::from_millis(34)));
        assert_eq!(gate.last_emission(), Some(t0 + Duration::from_millis(34)));
    }

    #[test]
    fn test_exact_interval_is_emitted() {
        let mut gate = EmissionGate::new(Duration::from_millis(10));
        let t0 = Instant::now();
        gate.try_acquire(t0);
        assert!(gate.try_acquire(t0 + Duration::from_millis(10)));
    }

    #[rstest]
    #[case(30.0, 29, 31)]
    #[case(10.0, 9, 11)]
    #[case(60.0, 58, 61)]
    fn test_fast_frames_emit_at_target_rate(
        #[case] hz: f64,
        #[case] min: usize,
        #[case] max: usize,
    ) {
        let mut gate = at_rate(hz);
        let t0 = Instant::now();
        let emissions: Vec<Instant> = (0..1000u64)
            .map(|ms| t0 + Duration::from_millis(ms))
            .filter(|&now| gate.try_acquire(now))
            .collect();

        assert!(
            (min..=max).contains(&emissions.len()),
            "{} emissions at {hz} Hz",
            emissions.len()
        );
        for pair in emissions.windows(2) {
            assert!(pair[1] - pair[0] >= gate.interval());
        }
    }

    #[test]
    fn test_clock_going_backwards_does_not_emit() {
        let mut gate = at_rate(30.0);
        let t0 = Instant::now() + Duration::from_secs(1);
        gate.try_acquire(t0);
        assert!(!gate.try_acquire(t0 - Duration::from_millis(500)));
    }
}
