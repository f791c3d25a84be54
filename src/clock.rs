/// Monotonic millisecond time source.
///
/// The counter is allowed to wrap; every comparison in this crate goes
/// through [`elapsed`].
pub trait Clock {
    fn now_ms(&mut self) -> u32;
}

impl<T: Clock + ?Sized> Clock for &mut T {
    fn now_ms(&mut self) -> u32 {
        T::now_ms(self)
    }
}

/// [`Clock`] backed by the `embassy-time` driver of the target.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&mut self) -> u32 {
        // Truncation is the wrap-around
        embassy_time::Instant::now().as_millis() as u32
    }
}

/// Milliseconds from `start` to `now`, correct across one counter wrap.
#[inline]
pub fn elapsed(now: u32, start: u32) -> u32 {
    now.wrapping_sub(start)
}

/// `true` once at least `timeout` ms have passed since `start`.
#[inline]
pub fn expired(now: u32, start: u32, timeout: u32) -> bool {
    elapsed(now, start) >= timeout
}
