use atat::AtatCmd;
use embedded_hal::delay::DelayNs;
use no_std_net::Ipv4Addr;

use crate::channel::ByteChannel;
use crate::clock::Clock;
use crate::config::Config;
use crate::error::Error;
use crate::socket::{SessionState, SocketHandle, SocketSession, SocketSet};
use crate::transport::{
    AtPort, DispatchResult, LineArbiter, LineGuard, LineState, ResponseBuffer, DEFAULT_CAPACITY,
};

/// Resources shared by everything talking over one modem line.
///
/// Lives outside the [`Device`] so tests and applications can own it
/// explicitly.
pub struct State {
    pub(crate) line: LineArbiter,
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl State {
    pub const fn new() -> Self {
        Self {
            line: LineArbiter::new(),
        }
    }

    pub fn line_state(&self) -> LineState {
        self.line.state()
    }
}

/// A Telit GE86x modem on a serial line.
pub struct Device<'d, CH, CL, D, const N: usize = DEFAULT_CAPACITY> {
    pub(crate) port: AtPort<CH, CL, D, N>,
    pub(crate) line: &'d LineArbiter,
    pub(crate) sockets: SocketSet,
    pub(crate) local_ip: Option<Ipv4Addr>,
}

impl<'d, CH, CL, D, const N: usize> Device<'d, CH, CL, D, N>
where
    CH: ByteChannel,
    CL: Clock,
    D: DelayNs,
{
    pub fn new(state: &'d State, channel: CH, clock: CL, delay: D, config: Config) -> Self {
        Self {
            port: AtPort::new(channel, clock, delay, config),
            line: &state.line,
            sockets: SocketSet::new(),
            local_ip: None,
        }
    }

    pub fn line_state(&self) -> LineState {
        self.line.state()
    }

    pub fn sockets(&self) -> &SocketSet {
        &self.sockets
    }

    pub fn socket(&self, handle: SocketHandle) -> Result<&SocketSession, Error> {
        self.sockets.get(handle)
    }

    /// Raw bytes of the last exchange, valid until the next one.
    pub fn response(&self) -> &ResponseBuffer<N> {
        self.port.response()
    }

    /// Send a raw command line and wait for `expected`.
    ///
    /// Fails fast with [`Error::LineBusy`] if the line is owned by another
    /// operation or an online socket.
    pub fn dispatch(
        &mut self,
        command: &str,
        start_timeout: u32,
        interchar_timeout: u32,
        expected: &str,
        attempts: u8,
    ) -> Result<DispatchResult, Error> {
        let _guard = self.lock()?;
        self.port.send_and_wait(
            command,
            start_timeout,
            interchar_timeout,
            expected,
            attempts,
        )
    }

    /// Send a typed command and wait for `expected`.
    pub fn send_command<C: AtatCmd>(
        &mut self,
        cmd: &C,
        interchar_timeout: u32,
        expected: &str,
    ) -> Result<DispatchResult, Error> {
        let _guard = self.lock()?;
        self.port.send_command(cmd, interchar_timeout, expected)
    }

    pub fn release(self) -> (CH, CL, D) {
        self.port.release()
    }

    pub(crate) fn lock(&self) -> Result<LineGuard<'d>, Error> {
        let line: &'d LineArbiter = self.line;
        line.lock().ok_or(Error::LineBusy)
    }

    /// After a transition went unanswered, find out whether the modem is
    /// still in command mode.
    pub(crate) fn settle_no_response(&mut self) -> Error {
        match self.port.probe() {
            Ok(true) => Error::Timeout,
            Ok(false) => {
                warn!("Modem silent in command mode, line state unknown");
                Error::Desynchronized
            }
            Err(e) => e,
        }
    }

    /// Map a failed transition result to an error, probing the modem if it
    /// did not answer at all.
    pub(crate) fn transition_error(&mut self, result: DispatchResult) -> Error {
        match result {
            DispatchResult::NoResponse => self.settle_no_response(),
            DispatchResult::DifferentResponse => Error::UnexpectedResponse,
            DispatchResult::Ok => Error::UnexpectedResponse,
        }
    }

    /// Session and line disagree: close the session and free the line.
    pub(crate) fn desynchronized(&mut self, handle: SocketHandle) -> Error {
        warn!(
            "[{}] Session and line ({:?}) out of sync, closing",
            handle,
            self.line.state()
        );
        if let Ok(session) = self.sockets.get_mut(handle) {
            session.set_state(SessionState::Closed);
        }
        self.line.release();
        Error::Desynchronized
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::command::AT;
    use crate::test_helpers::{test_device, MockTime};

    #[test]
    fn dispatch_frees_line_on_every_path() {
        let time = MockTime::default();
        let state = State::new();
        let (mut device, modem) = test_device(&state, &time, Config::default());

        modem.reply(b"\r\nOK\r\n");
        assert_eq!(
            device.dispatch("AT", 500, 20, "OK", 1),
            Ok(DispatchResult::Ok)
        );
        assert_eq!(state.line_state(), LineState::Free);
        assert_eq!(device.response().text(), b"\r\nOK\r\n");

        assert_eq!(
            device.send_command(&AT, 20, "OK"),
            Ok(DispatchResult::NoResponse)
        );
        assert_eq!(state.line_state(), LineState::Free);

        let long = [b'A'; 300];
        assert_eq!(
            device.dispatch(core::str::from_utf8(&long).unwrap(), 500, 20, "OK", 1),
            Err(Error::CommandOverflow)
        );
        assert_eq!(state.line_state(), LineState::Free);
    }

    #[test]
    fn busy_line_fails_fast() {
        let time = MockTime::default();
        let state = State::new();
        let (mut device, modem) = test_device(&state, &time, Config::default());

        assert!(state.line.try_acquire(LineState::Data));
        assert_eq!(
            device.dispatch("AT", 500, 20, "OK", 3),
            Err(Error::LineBusy)
        );
        assert_eq!(state.line_state(), LineState::Data);
        assert!(modem.written().is_empty());
    }
}
