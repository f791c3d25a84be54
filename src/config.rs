use embassy_time::Duration;

use crate::module_timing::{
    at_retry_delay, escape_confirm_time, escape_confirm_time_close, escape_guard_time,
    escape_guard_time_close, resume_time, ring_poll_time,
};

/// Fixed-delay retry policy used by the command dispatcher.
///
/// The delay before attempt N is the same for every N > 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn fixed(delay: Duration) -> Self {
        Self { delay }
    }

    /// Delay to sleep before `attempt` (zero based). The first attempt is
    /// never delayed.
    pub fn delay_before(&self, attempt: u8) -> Option<Duration> {
        if attempt == 0 {
            None
        } else {
            Some(self.delay)
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(at_retry_delay())
    }
}

/// Escape sequence timing, for one kind of data mode exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscapeTiming {
    /// TX silence required before `+++`
    pub guard: Duration,
    /// Window in which `OK` / `NO CARRIER` is awaited after `+++`
    pub confirm: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) retry: RetryPolicy,
    pub(crate) suspend_escape: EscapeTiming,
    pub(crate) close_escape: EscapeTiming,
    pub(crate) resume_timeout: Duration,
    pub(crate) ring_poll: Duration,
    pub(crate) escape_guard_register: Option<u8>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            suspend_escape: EscapeTiming {
                guard: escape_guard_time(),
                confirm: escape_confirm_time(),
            },
            close_escape: EscapeTiming {
                guard: escape_guard_time_close(),
                confirm: escape_confirm_time_close(),
            },
            resume_timeout: resume_time(),
            ring_poll: ring_poll_time(),
            // ATS12=20: 20 fiftieths of a second
            escape_guard_register: Some(20),
        }
    }
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_retry_delay(self, delay: Duration) -> Self {
        Self {
            retry: RetryPolicy::fixed(delay),
            ..self
        }
    }

    #[must_use]
    pub fn with_suspend_escape(self, timing: EscapeTiming) -> Self {
        Self {
            suspend_escape: timing,
            ..self
        }
    }

    #[must_use]
    pub fn with_close_escape(self, timing: EscapeTiming) -> Self {
        Self {
            close_escape: timing,
            ..self
        }
    }

    #[must_use]
    pub fn with_resume_timeout(self, timeout: Duration) -> Self {
        Self {
            resume_timeout: timeout,
            ..self
        }
    }

    #[must_use]
    pub fn with_ring_poll(self, window: Duration) -> Self {
        Self {
            ring_poll: window,
            ..self
        }
    }

    /// Value written to `S12` before dialing, `None` leaves the modem default.
    #[must_use]
    pub fn with_escape_guard_register(self, fiftieths: Option<u8>) -> Self {
        Self {
            escape_guard_register: fiftieths,
            ..self
        }
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }
}

/// Saturating conversion of a [`Duration`] to the millisecond `u32` the
/// receive state machine counts in.
pub(crate) fn as_millis(d: Duration) -> u32 {
    u32::try_from(d.as_millis()).unwrap_or(u32::MAX)
}
