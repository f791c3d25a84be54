use crate::channel::ByteChannel;
use crate::clock::{expired, Clock};
use crate::fmt::LossyStr;

use super::buffer::ResponseBuffer;

/// What to do with bytes already waiting when a receive cycle begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Flush {
    /// Drop them, they belong to an earlier exchange.
    Discard,
    Keep,
}

/// What to do with bytes arriving once the buffer is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Overflow {
    /// Finish the cycle at once, leaving the bytes in the channel.
    Stop,
    /// Read and drop them until the line goes quiet.
    Discard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReceiveOutcome {
    Pending,
    /// Nothing arrived within the start timeout.
    TimedOutNoData,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    NotStarted,
    Started,
    Done(ReceiveOutcome),
}

/// Dual timeout receive state machine.
///
/// A cycle waits up to the start timeout for a first byte, then collects
/// bytes until the line has been silent for the inter-character timeout.
pub struct Receiver<const N: usize> {
    buffer: ResponseBuffer<N>,
    phase: Phase,
    start_timeout: u32,
    interchar_timeout: u32,
    overflow: Overflow,
    mark: u32,
}

impl<const N: usize> Default for Receiver<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Receiver<N> {
    pub const fn new() -> Self {
        Self {
            buffer: ResponseBuffer::new(),
            phase: Phase::Done(ReceiveOutcome::TimedOutNoData),
            start_timeout: 0,
            interchar_timeout: 0,
            overflow: Overflow::Discard,
            mark: 0,
        }
    }

    /// Reset the buffer and start a new cycle at the current time.
    pub fn begin<CH: ByteChannel, CL: Clock>(
        &mut self,
        channel: &mut CH,
        clock: &mut CL,
        start_timeout: u32,
        interchar_timeout: u32,
        flush: Flush,
        overflow: Overflow,
    ) {
        if flush == Flush::Discard {
            channel.flush_input();
        }
        self.buffer.clear();
        self.start_timeout = start_timeout;
        self.interchar_timeout = interchar_timeout;
        self.overflow = overflow;
        self.mark = clock.now_ms();
        self.phase = Phase::NotStarted;
    }

    /// Advance the cycle without blocking.
    pub fn poll<CH: ByteChannel, CL: Clock>(
        &mut self,
        channel: &mut CH,
        clock: &mut CL,
    ) -> ReceiveOutcome {
        let now = clock.now_ms();

        if self.phase == Phase::NotStarted {
            if channel.available() == 0 {
                if expired(now, self.mark, self.start_timeout) {
                    return self.finish(ReceiveOutcome::TimedOutNoData);
                }
                return ReceiveOutcome::Pending;
            }
            self.mark = now;
            self.phase = Phase::Started;
        }

        match self.phase {
            Phase::Done(outcome) => outcome,
            Phase::NotStarted => ReceiveOutcome::Pending,
            Phase::Started => {
                let available = channel.available();
                if available > 0 {
                    self.mark = now;
                }

                for _ in 0..available {
                    if self.buffer.is_full() && self.overflow == Overflow::Stop {
                        return self.finish(ReceiveOutcome::Finished);
                    }
                    match channel.read_byte() {
                        Some(byte) => {
                            self.buffer.push(byte);
                        }
                        None => break,
                    }
                }

                if expired(now, self.mark, self.interchar_timeout) {
                    self.finish(ReceiveOutcome::Finished)
                } else {
                    ReceiveOutcome::Pending
                }
            }
        }
    }

    /// Poll until the cycle reaches a terminal outcome.
    pub fn run<CH: ByteChannel, CL: Clock>(
        &mut self,
        channel: &mut CH,
        clock: &mut CL,
    ) -> ReceiveOutcome {
        loop {
            match self.poll(channel, clock) {
                ReceiveOutcome::Pending => continue,
                outcome => return outcome,
            }
        }
    }

    pub fn buffer(&self) -> &ResponseBuffer<N> {
        &self.buffer
    }

    fn finish(&mut self, outcome: ReceiveOutcome) -> ReceiveOutcome {
        if self.buffer.is_truncated() {
            warn!(
                "Response truncated, {} bytes discarded",
                self.buffer.discarded()
            );
        }
        trace!(
            "<-- {:?} ({:?})",
            LossyStr(self.buffer.as_bytes()),
            outcome
        );
        self.phase = Phase::Done(outcome);
        outcome
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_helpers::{init_logger, MockChannel, MockClock, MockTime};

    fn setup(time: &MockTime) -> (MockChannel, MockClock) {
        init_logger();
        (MockChannel::new(time), MockClock::new(time))
    }

    #[test]
    fn finishes_after_interchar_silence() {
        let time = MockTime::default();
        let (mut channel, mut clock) = setup(&time);
        let mut rx = Receiver::<200>::new();

        rx.begin(&mut channel, &mut clock, 500, 20, Flush::Discard, Overflow::Discard);
        channel.inject(10, b"X");

        assert_eq!(rx.run(&mut channel, &mut clock), ReceiveOutcome::Finished);
        assert_eq!(rx.buffer().as_bytes(), b"X");
        // First byte at ~10 ms, finished 20 ms of silence later
        assert!(time.now() >= 30 && time.now() < 40);
    }

    #[test]
    fn silence_times_out_without_data() {
        let time = MockTime::default();
        let (mut channel, mut clock) = setup(&time);
        let mut rx = Receiver::<200>::new();

        rx.begin(&mut channel, &mut clock, 500, 20, Flush::Discard, Overflow::Discard);
        assert_eq!(rx.poll(&mut channel, &mut clock), ReceiveOutcome::Pending);
        assert_eq!(
            rx.run(&mut channel, &mut clock),
            ReceiveOutcome::TimedOutNoData
        );
        assert!(rx.buffer().is_empty());
        assert!(time.now() >= 500);
        // Terminal outcomes are sticky
        assert_eq!(
            rx.poll(&mut channel, &mut clock),
            ReceiveOutcome::TimedOutNoData
        );
    }

    #[test]
    fn start_timeout_survives_counter_wrap() {
        let time = MockTime::starting_at(u32::MAX - 100);
        let (mut channel, mut clock) = setup(&time);
        let mut rx = Receiver::<200>::new();

        rx.begin(&mut channel, &mut clock, 500, 20, Flush::Discard, Overflow::Discard);
        channel.inject(300, b"OK");

        assert_eq!(rx.run(&mut channel, &mut clock), ReceiveOutcome::Finished);
        assert_eq!(rx.buffer().text(), b"OK");
    }

    #[test]
    fn flush_drops_stale_bytes() {
        let time = MockTime::default();
        let (mut channel, mut clock) = setup(&time);
        let mut rx = Receiver::<200>::new();

        channel.inject(0, b"stale");
        rx.begin(&mut channel, &mut clock, 50, 20, Flush::Discard, Overflow::Discard);
        assert_eq!(
            rx.run(&mut channel, &mut clock),
            ReceiveOutcome::TimedOutNoData
        );

        channel.inject(0, b"kept");
        rx.begin(&mut channel, &mut clock, 50, 20, Flush::Keep, Overflow::Discard);
        assert_eq!(rx.run(&mut channel, &mut clock), ReceiveOutcome::Finished);
        assert_eq!(rx.buffer().text(), b"kept");
    }

    #[test]
    fn gaps_shorter_than_interchar_are_one_response() {
        let time = MockTime::default();
        let (mut channel, mut clock) = setup(&time);
        let mut rx = Receiver::<200>::new();

        rx.begin(&mut channel, &mut clock, 500, 20, Flush::Discard, Overflow::Discard);
        channel.inject(5, b"\r\nOK");
        channel.inject(15, b"\r\n");
        channel.inject(200, b"late");

        assert_eq!(rx.run(&mut channel, &mut clock), ReceiveOutcome::Finished);
        assert_eq!(rx.buffer().text(), b"\r\nOK\r\n");
        assert_eq!(channel.pending(), 4);
    }

    #[test]
    fn overflow_discard_keeps_draining() {
        let time = MockTime::default();
        let (mut channel, mut clock) = setup(&time);
        let mut rx = Receiver::<4>::new();

        rx.begin(&mut channel, &mut clock, 500, 20, Flush::Discard, Overflow::Discard);
        channel.inject(1, b"CONNECT");

        assert_eq!(rx.run(&mut channel, &mut clock), ReceiveOutcome::Finished);
        assert_eq!(rx.buffer().as_bytes(), b"CONN");
        assert_eq!(rx.buffer().discarded(), 3);
        assert_eq!(channel.pending(), 0);
    }

    #[test]
    fn overflow_stop_leaves_bytes_in_channel() {
        let time = MockTime::default();
        let (mut channel, mut clock) = setup(&time);
        let mut rx = Receiver::<4>::new();

        rx.begin(&mut channel, &mut clock, 500, 20, Flush::Discard, Overflow::Stop);
        channel.inject(1, b"CONNECT");

        assert_eq!(rx.run(&mut channel, &mut clock), ReceiveOutcome::Finished);
        assert_eq!(rx.buffer().as_bytes(), b"CONN");
        assert!(!rx.buffer().is_truncated());
        assert_eq!(channel.pending(), 3);
    }
}
