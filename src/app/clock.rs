//! Round clock, countdown overlay and timed banners
//!
//! Nothing here sleeps or spawns: every timer is a [`Ticker`] polled with an
//! explicit `Instant`, so stopping it is just forgetting the next deadline.

use std::time::{Duration, Instant};

/// Low-time warning threshold (seconds)
pub const WARNING_SECONDS: u32 = 10;

/// Low-time critical threshold (seconds)
pub const CRITICAL_SECONDS: u32 = 5;

/// How long the round winner banner stays up
pub const BANNER_DURATION: Duration = Duration::from_secs(3);

const SECOND: Duration = Duration::from_secs(1);

/// Cancellable fixed-period schedule
#[derive(Debug, Clone)]
pub struct Ticker {
    period: Duration,
    next: Option<Instant>,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self { period, next: None }
    }

    /// (Re)start; the first tick is due one period after `now`
    pub fn start(&mut self, now: Instant) {
        self.next = Some(now + self.period);
    }

    pub fn stop(&mut self) {
        self.next = None;
    }

    pub fn is_running(&self) -> bool {
        self.next.is_some()
    }

    /// Number of ticks that came due since the last poll
    pub fn poll(&mut self, now: Instant) -> u32 {
        let mut due = 0;
        while let Some(next) = self.next {
            if next > now {
                break;
            }
            due += 1;
            self.next = Some(next + self.period);
        }
        due
    }
}

/// Urgency of the remaining round time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TimeLevel {
    Normal,
    Warning,
    Critical,
}

impl TimeLevel {
    pub fn for_remaining(remaining: u32) -> Self {
        if remaining <= CRITICAL_SECONDS {
            TimeLevel::Critical
        } else if remaining <= WARNING_SECONDS {
            TimeLevel::Warning
        } else {
            TimeLevel::Normal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// Seconds left to display
    Tick { remaining: u32 },
    /// First tick at or below a threshold
    LowTime { level: TimeLevel },
    /// Follows the 0 tick; the clock is idle afterwards
    Expired,
}

/// 1 Hz countdown for a round
#[derive(Debug, Clone)]
pub struct RoundClock {
    ticker: Ticker,
    /// Value shown by the next tick
    next_value: u32,
    /// Value shown by the last tick
    displayed: Option<u32>,
    warned: bool,
    critical: bool,
}

impl RoundClock {
    pub fn new() -> Self {
        Self {
            ticker: Ticker::new(SECOND),
            next_value: 0,
            displayed: None,
            warned: false,
            critical: false,
        }
    }

    /// Start counting down from `duration`, cancelling any running count
    pub fn start(&mut self, duration: u32, now: Instant) {
        self.ticker.start(now);
        self.next_value = duration;
        self.displayed = None;
        self.warned = false;
        self.critical = false;
    }

    /// Idempotent
    pub fn stop(&mut self) {
        self.ticker.stop();
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_running()
    }

    /// Seconds shown by the most recent tick
    pub fn remaining(&self) -> Option<u32> {
        self.displayed
    }

    /// Emit every tick that came due, in order
    pub fn poll(&mut self, now: Instant) -> Vec<ClockEvent> {
        let mut events = Vec::new();
        for _ in 0..self.ticker.poll(now) {
            let remaining = self.next_value;
            self.displayed = Some(remaining);
            events.push(ClockEvent::Tick { remaining });

            if remaining > 0 && remaining <= WARNING_SECONDS && !self.warned {
                self.warned = true;
                events.push(ClockEvent::LowTime {
                    level: TimeLevel::Warning,
                });
            }
            if remaining > 0 && remaining <= CRITICAL_SECONDS && !self.critical {
                self.critical = true;
                events.push(ClockEvent::LowTime {
                    level: TimeLevel::Critical,
                });
            }

            if remaining == 0 {
                self.ticker.stop();
                events.push(ClockEvent::Expired);
                break;
            }
            self.next_value = remaining - 1;
        }
        events
    }
}

impl Default for RoundClock {
    fn default() -> Self {
        Self::new()
    }
}

/// What the countdown overlay does on a poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStep {
    Show(u32),
    Hidden,
}

/// "Game starting" overlay: `n, n-1, ..., 0`, one per second
#[derive(Debug, Clone)]
pub struct CountdownOverlay {
    ticker: Ticker,
    value: Option<u32>,
}

impl CountdownOverlay {
    pub fn new() -> Self {
        Self {
            ticker: Ticker::new(SECOND),
            value: None,
        }
    }

    /// Show `from` immediately and schedule the rest
    pub fn start(&mut self, from: u32, now: Instant) -> CountdownStep {
        self.value = Some(from);
        self.ticker.start(now);
        CountdownStep::Show(from)
    }

    pub fn cancel(&mut self) {
        self.value = None;
        self.ticker.stop();
    }

    /// Number currently shown
    pub fn value(&self) -> Option<u32> {
        self.value
    }

    pub fn poll(&mut self, now: Instant) -> Vec<CountdownStep> {
        let mut steps = Vec::new();
        for _ in 0..self.ticker.poll(now) {
            match self.value {
                Some(0) | None => {
                    self.cancel();
                    steps.push(CountdownStep::Hidden);
                    break;
                }
                Some(n) => {
                    self.value = Some(n - 1);
                    steps.push(CountdownStep::Show(n - 1));
                }
            }
        }
        steps
    }
}

impl Default for CountdownOverlay {
    fn default() -> Self {
        Self::new()
    }
}

/// A message that disappears on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub message: String,
    expires: Instant,
}

impl Banner {
    pub fn new(message: String, now: Instant) -> Self {
        Self {
            message,
            expires: now + BANNER_DURATION,
        }
    }

    pub fn is_visible(&self, now: Instant) -> bool {
        now < self.expires
    }
}
