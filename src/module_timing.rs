use embassy_time::Duration;

/// Inter-character timeout for short single line responses
pub const INTERCHAR_TIMEOUT_MS: u32 = 20;

/// Inter-character timeout for multi line responses
pub const INTERCHAR_MID_TIMEOUT_MS: u32 = 100;

/// Inter-character timeout for slow network driven responses
pub const INTERCHAR_CONNECT_TIMEOUT_MS: u32 = 200;

/// Delay inserted before every repeated attempt of the same command
pub fn at_retry_delay() -> Duration {
    Duration::from_millis(500)
}

/// Silence on the TX side required before the escape sequence, when
/// suspending an online socket
pub fn escape_guard_time() -> Duration {
    Duration::from_millis(500)
}

/// Silence on the TX side required before the escape sequence, when closing
/// an online socket
pub fn escape_guard_time_close() -> Duration {
    Duration::from_millis(1500)
}

/// Window for the modem to confirm an escape sequence with `OK` or
/// `NO CARRIER`
pub fn escape_confirm_time() -> Duration {
    Duration::from_millis(1000)
}

/// Window for the modem to confirm an escape sequence sent as part of a close
pub fn escape_confirm_time_close() -> Duration {
    Duration::from_millis(2000)
}

/// Time for the modem to restore a suspended socket with `CONNECT`
pub fn resume_time() -> Duration {
    Duration::from_millis(5000)
}

/// Window in which an unsolicited `SRING` is collected from an idle line
pub fn ring_poll_time() -> Duration {
    Duration::from_millis(20)
}
