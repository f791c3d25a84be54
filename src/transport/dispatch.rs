use atat::AtatCmd;
use embedded_hal::delay::DelayNs;
use heapless::Vec;

use crate::channel::ByteChannel;
use crate::clock::{elapsed, expired, Clock};
use crate::command::AT;
use crate::config::{as_millis, Config, EscapeTiming};
use crate::error::Error;
use crate::fmt::LossyStr;
use crate::module_timing::INTERCHAR_TIMEOUT_MS;

use super::buffer::{ResponseBuffer, DEFAULT_CAPACITY};
use super::classify::{contains, Classification};
use super::receiver::{Flush, Overflow, ReceiveOutcome, Receiver};

/// Longest command line, terminator included.
pub const TX_BUF_LEN: usize = 256;

const ESCAPE_SEQUENCE: &[u8] = b"+++";

/// Final classification of a dispatched command, after all attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchResult {
    Ok,
    /// Something arrived, but not the expected token.
    DifferentResponse,
    NoResponse,
}

impl DispatchResult {
    pub fn is_ok(self) -> bool {
        self == DispatchResult::Ok
    }

    pub fn into_result(self) -> Result<(), Error> {
        match self {
            DispatchResult::Ok => Ok(()),
            DispatchResult::DifferentResponse => Err(Error::UnexpectedResponse),
            DispatchResult::NoResponse => Err(Error::Timeout),
        }
    }
}

impl From<Classification> for DispatchResult {
    fn from(c: Classification) -> Self {
        match c {
            Classification::StringFound => DispatchResult::Ok,
            Classification::StringNotFound => DispatchResult::DifferentResponse,
            Classification::TimedOut => DispatchResult::NoResponse,
        }
    }
}

/// Which of two awaited tokens showed up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Matched {
    First,
    Second,
}

/// Command/response engine on top of one serial line.
///
/// Owns the channel and the response buffer. Line ownership is not checked
/// here, callers hold the arbiter.
pub struct AtPort<CH, CL, D, const N: usize = DEFAULT_CAPACITY> {
    channel: CH,
    clock: CL,
    delay: D,
    receiver: Receiver<N>,
    config: Config,
    last_tx: u32,
}

impl<CH, CL, D, const N: usize> AtPort<CH, CL, D, N>
where
    CH: ByteChannel,
    CL: Clock,
    D: DelayNs,
{
    pub fn new(channel: CH, mut clock: CL, delay: D, config: Config) -> Self {
        let last_tx = clock.now_ms();
        Self {
            channel,
            clock,
            delay,
            receiver: Receiver::new(),
            config,
            last_tx,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Raw bytes of the last receive cycle.
    pub fn response(&self) -> &ResponseBuffer<N> {
        self.receiver.buffer()
    }

    pub fn release(self) -> (CH, CL, D) {
        (self.channel, self.clock, self.delay)
    }

    /// Send `command` followed by `\r\n` and wait for `expected`, up to
    /// `attempts` times.
    ///
    /// Only a failed write is an error, a missing or wrong answer is reported
    /// in the [`DispatchResult`].
    pub fn send_and_wait(
        &mut self,
        command: &str,
        start_timeout: u32,
        interchar_timeout: u32,
        expected: &str,
        attempts: u8,
    ) -> Result<DispatchResult, Error> {
        let mut line: Vec<u8, TX_BUF_LEN> = Vec::new();
        line.extend_from_slice(command.as_bytes())
            .map_err(|_| Error::CommandOverflow)?;
        line.extend_from_slice(b"\r\n")
            .map_err(|_| Error::CommandOverflow)?;

        self.dispatch_line(&line, start_timeout, interchar_timeout, expected, attempts)
    }

    /// Typed form of [`AtPort::send_and_wait`]. The start timeout and the
    /// number of attempts come from the command definition.
    pub fn send_command<C: AtatCmd>(
        &mut self,
        cmd: &C,
        interchar_timeout: u32,
        expected: &str,
    ) -> Result<DispatchResult, Error> {
        let mut buf = [0u8; TX_BUF_LEN];
        let len = encode(cmd, &mut buf)?;

        self.dispatch_line(
            &buf[..len],
            C::MAX_TIMEOUT_MS,
            interchar_timeout,
            expected,
            C::ATTEMPTS,
        )
    }

    /// Send a typed command once, then wait up to `timeout` for either
    /// token.
    pub fn send_and_find<C: AtatCmd>(
        &mut self,
        cmd: &C,
        first: &str,
        second: &str,
        timeout: u32,
    ) -> Result<Option<Matched>, Error> {
        let mut buf = [0u8; TX_BUF_LEN];
        let len = encode(cmd, &mut buf)?;

        self.channel.flush_input();
        self.write(&buf[..len])?;
        Ok(self.wait_for_either(first, second, timeout))
    }

    fn dispatch_line(
        &mut self,
        line: &[u8],
        start_timeout: u32,
        interchar_timeout: u32,
        expected: &str,
        attempts: u8,
    ) -> Result<DispatchResult, Error> {
        let attempts = attempts.max(1);
        let mut result = DispatchResult::NoResponse;

        for attempt in 0..attempts {
            if let Some(delay) = self.config.retry.delay_before(attempt) {
                warn!(
                    "{:?}, retrying {:?} ({}/{})",
                    result,
                    LossyStr(line),
                    attempt + 1,
                    attempts
                );
                self.delay.delay_ms(as_millis(delay));
            }

            // Stale bytes go before the write, so a fast reply is not lost
            self.channel.flush_input();
            self.write(line)?;
            result = self
                .receive(start_timeout, interchar_timeout, Flush::Keep, Overflow::Discard, expected)
                .into();

            if result == DispatchResult::Ok {
                break;
            }
        }

        Ok(result)
    }

    /// Run one receive cycle without sending anything first.
    pub fn wait_response(
        &mut self,
        start_timeout: u32,
        interchar_timeout: u32,
        expected: &str,
    ) -> Classification {
        self.receive(
            start_timeout,
            interchar_timeout,
            Flush::Keep,
            Overflow::Discard,
            expected,
        )
    }

    fn receive(
        &mut self,
        start_timeout: u32,
        interchar_timeout: u32,
        flush: Flush,
        overflow: Overflow,
        expected: &str,
    ) -> Classification {
        self.receiver.begin(
            &mut self.channel,
            &mut self.clock,
            start_timeout,
            interchar_timeout,
            flush,
            overflow,
        );
        match self.receiver.run(&mut self.channel, &mut self.clock) {
            ReceiveOutcome::Finished if contains(self.response().text(), expected) => {
                Classification::StringFound
            }
            ReceiveOutcome::Finished => Classification::StringNotFound,
            _ => Classification::TimedOut,
        }
    }

    /// Wait up to `timeout` for either token, returning as soon as one of
    /// them is in the buffer.
    pub fn wait_for_either(&mut self, first: &str, second: &str, timeout: u32) -> Option<Matched> {
        let start = self.clock.now_ms();
        self.receiver.begin(
            &mut self.channel,
            &mut self.clock,
            timeout,
            timeout,
            Flush::Keep,
            Overflow::Discard,
        );

        loop {
            let outcome = self.receiver.poll(&mut self.channel, &mut self.clock);

            let text = self.receiver.buffer().text();
            if contains(text, first) {
                return Some(Matched::First);
            }
            if contains(text, second) {
                return Some(Matched::Second);
            }

            if outcome != ReceiveOutcome::Pending || expired(self.clock.now_ms(), start, timeout) {
                return None;
            }
        }
    }

    /// Bare liveness check, `AT` answered by `OK`.
    pub fn probe(&mut self) -> Result<bool, Error> {
        Ok(self
            .send_command(&AT, INTERCHAR_TIMEOUT_MS, "OK")?
            .is_ok())
    }

    /// Leave data mode: TX silence for the guard time, then `+++` without a
    /// terminator. Returns which of `OK` (first) or `NO CARRIER` (second)
    /// confirmed it.
    pub fn escape(&mut self, timing: EscapeTiming) -> Result<Option<Matched>, Error> {
        let guard = as_millis(timing.guard);
        let quiet = elapsed(self.clock.now_ms(), self.last_tx);
        if quiet < guard {
            self.delay.delay_ms(guard - quiet);
        }

        // Whatever arrived meanwhile is payload nobody asked for
        self.channel.flush_input();
        self.write(ESCAPE_SEQUENCE)?;

        Ok(self.wait_for_either("OK", "NO CARRIER", as_millis(timing.confirm)))
    }

    /// Send payload bytes as they are, no terminator.
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<(), Error> {
        trace!("--> {} raw bytes", bytes.len());
        self.channel
            .write_bytes(bytes)
            .map_err(|_| Error::Io)?;
        self.last_tx = self.clock.now_ms();
        Ok(())
    }

    /// Receive payload bytes. Stops when the buffer is full, the rest stays
    /// in the channel for the next call.
    pub fn receive_raw(&mut self, start_timeout: u32, interchar_timeout: u32) -> ReceiveOutcome {
        self.receiver.begin(
            &mut self.channel,
            &mut self.clock,
            start_timeout,
            interchar_timeout,
            Flush::Keep,
            Overflow::Stop,
        );
        self.receiver.run(&mut self.channel, &mut self.clock)
    }

    fn write(&mut self, line: &[u8]) -> Result<(), Error> {
        debug!("--> {:?}", LossyStr(line));
        self.channel.write_bytes(line).map_err(|_| Error::Io)?;
        self.last_tx = self.clock.now_ms();
        Ok(())
    }
}

fn encode<C: AtatCmd>(cmd: &C, buf: &mut [u8; TX_BUF_LEN]) -> Result<usize, Error> {
    if C::MAX_LEN > buf.len() {
        return Err(Error::CommandOverflow);
    }
    Ok(cmd.write(buf))
}
