use std::{
    thread,
    time::{Duration, Instant},
};

/// Fixed-rate loop pacing.
///
/// If a cycle overruns (for example a blocking adapter read), the next tick
/// is re-anchored to the current time rather than firing a burst of catch-up
/// ticks.
#[derive(Debug)]
pub struct Ticker {
    period: Duration,
    next_tick: Instant,
    overruns: u64,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        Self {
            period,
            next_tick: Instant::now() + period,
            overruns: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Number of ticks that started late.
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    /// Sleep until the next tick is due.
    pub fn wait(&mut self) {
        let now = Instant::now();
        if now < self.next_tick {
            thread::sleep(self.next_tick - now);
            self.next_tick += self.period;
        } else {
            self.overruns += 1;
            self.next_tick = now + self.period;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waits_roughly_one_period() {
        let mut ticker = Ticker::new(Duration::from_millis(5));
        let start = Instant::now();
        ticker.wait();
        ticker.wait();
        assert!(start.elapsed() >= Duration::from_millis(9));
    }

    #[test]
    fn overrun_reanchors_instead_of_bursting() {
        let mut ticker = Ticker::new(Duration::from_millis(2));
        thread::sleep(Duration::from_millis(10));

        ticker.wait();
        assert_eq!(ticker.overruns(), 1);

        let before = Instant::now();
        ticker.wait();
        assert!(before.elapsed() >= Duration::from_millis(1));
    }

    #[test]
    fn zero_period_is_clamped() {
        assert_eq!(Ticker::new(Duration::ZERO).period(), Duration::from_millis(1));
    }
}
