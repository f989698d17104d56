//! # Kernel Tick Timer
//!
//! The scheduler tick is driven by the supervisor timer. Reading the counter
//! and programming the next deadline are two separate operations, so the
//! deadline can already be in the past by the time the firmware takes it; on
//! some implementations that interrupt is then lost and the hart sleeps a
//! whole extra tick. [`TickTimer::reset`] closes the window by re-reading the
//! counter after programming and trying again until the deadline is ahead.

/// Timer frequency and tick length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfig {
    /// Timebase frequency of the `time` counter (Hz)
    pub clock_hz: u64,
    /// Kernel tick length (ms)
    pub tick_ms: u64,
}

impl TimerConfig {
    /// 10 MHz timebase, 2 ms tick
    pub const DEFAULT: Self = Self {
        clock_hz: 10_000_000,
        tick_ms: 2,
    };

    /// Counter ticks per kernel tick
    pub const fn reset_cycles(&self) -> u64 {
        self.clock_hz / 1000 * self.tick_ms
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Source of the time counter and sink for the next deadline
pub trait TimerDevice {
    /// Current counter value
    fn now(&self) -> u64;

    /// Fire the supervisor timer interrupt once the counter reaches `deadline`
    fn set_deadline(&mut self, deadline: u64);
}

/// Periodic kernel tick on top of a [`TimerDevice`]
#[derive(Debug)]
pub struct TickTimer<T> {
    dev: T,
    interval: u64,
}

impl<T: TimerDevice> TickTimer<T> {
    /// Create a tick timer; nothing is programmed until [`init`](Self::init)
    pub const fn new(dev: T, config: TimerConfig) -> Self {
        Self {
            dev,
            interval: config.reset_cycles(),
        }
    }

    /// Counter ticks per kernel tick
    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// The timer device
    pub fn device(&self) -> &T {
        &self.dev
    }

    /// The timer device, mutably
    pub fn device_mut(&mut self) -> &mut T {
        &mut self.dev
    }

    /// Program the first tick
    pub fn init(&mut self) {
        let deadline = self.dev.now().saturating_add(self.interval);
        self.dev.set_deadline(deadline);
    }

    /// Program the next tick one interval from now
    ///
    /// Returns the deadline that was left in place. On return the counter
    /// was observed at or before it.
    pub fn reset(&mut self) -> u64 {
        loop {
            let target = self.dev.now().saturating_add(self.interval);
            self.dev.set_deadline(target);
            let now = self.dev.now();
            if now <= target {
                return target;
            }
            log::trace!("timer deadline {} already passed at {}, retrying", target, now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedClock;

    #[test]
    fn test_reset_cycles() {
        assert_eq!(TimerConfig::DEFAULT.reset_cycles(), 20_000);
        let cfg = TimerConfig { clock_hz: 1_000_000, tick_ms: 10 };
        assert_eq!(cfg.reset_cycles(), 10_000);
    }

    #[test]
    fn test_init_programs_one_interval_ahead() {
        let mut timer = TickTimer::new(ScriptedClock::new(&[500]), TimerConfig::DEFAULT);
        timer.init();
        assert_eq!(timer.device().deadlines(), &[20_500]);
    }

    #[test]
    fn test_reset_single_pass() {
        let mut timer = TickTimer::new(ScriptedClock::new(&[100, 150]), TimerConfig::DEFAULT);
        assert_eq!(timer.reset(), 20_100);
        assert_eq!(timer.device().deadlines(), &[20_100]);
    }

    #[test]
    fn test_reset_retries_missed_deadline() {
        // the second read lands after the deadline, e.g. a long SBI call
        let mut timer = TickTimer::new(
            ScriptedClock::new(&[0, 25_000, 25_010, 25_020]),
            TimerConfig::DEFAULT,
        );
        let target = timer.reset();
        assert_eq!(target, 45_010);
        assert_eq!(timer.device().deadlines(), &[20_000, 45_010]);
    }

    #[test]
    fn test_reset_converges_after_backward_jump() {
        // 30_000 overshoots, then the clock steps back and runs on
        let script = [10, 30_000, 5, 40, 41];
        let mut timer = TickTimer::new(ScriptedClock::new(&script), TimerConfig::DEFAULT);
        let target = timer.reset();

        assert_eq!(target, 20_005);
        let last_read = timer.device().last_read();
        assert!(last_read <= target);
        assert_eq!(timer.device().deadlines(), &[20_010, 20_005]);
    }

    #[test]
    fn test_reset_exit_condition_holds_for_many_scripts() {
        let scripts: [&[u64]; 4] = [
            &[0, 0],
            &[7, 19_999, 20_008],
            &[1_000, 50_000, 2_000, 3_000],
            &[100, 90_000, 50, 80_000, 60, 61],
        ];
        for script in scripts {
            let mut timer = TickTimer::new(ScriptedClock::new(script), TimerConfig::DEFAULT);
            let target = timer.reset();
            assert!(timer.device().last_read() <= target, "script {:?}", script);
            assert_eq!(timer.device().deadlines().last(), Some(&target));
        }
    }
}
