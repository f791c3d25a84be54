//! IP Easy socket sessions.
//!
//! A dialed or accepted socket takes the serial line into data mode. From
//! then on the line only carries payload until the escape sequence brings the
//! module back to command mode, suspending the socket, or the remote side
//! hangs up.

use embedded_hal::delay::DelayNs;

use crate::channel::ByteChannel;
use crate::client::Device;
use crate::clock::Clock;
use crate::command::ip_easy::responses::{SocketRing, SocketStatusResponse};
use crate::command::ip_easy::types::{ClosurePolicy, ListenState, SocketProtocol};
use crate::command::ip_easy::{
    GetSocketStatus, SetSocketConfig, SetSocketListen, SocketAccept, SocketDial, SocketRestore,
    SocketShutdown,
};
use crate::command::psn::types::ContextId;
use crate::command::SetEscapeGuardTime;
use crate::config::as_millis;
use crate::error::Error;
use crate::module_timing::{INTERCHAR_CONNECT_TIMEOUT_MS, INTERCHAR_TIMEOUT_MS};
use crate::socket::{SessionState, SocketHandle};
use crate::transport::{
    find_in_binary, Classification, DispatchResult, LineArbiter, LineState, Matched,
};

/// Written by the module into the payload stream when the remote side
/// closes the connection.
const NO_CARRIER_MARKER: &[u8] = b"\r\nNO CARRIER\r\n";

/// Payload of one receive cycle.
#[derive(Debug, PartialEq, Eq)]
pub struct Received<'a> {
    /// Bytes received, up to the hang-up marker if there was one.
    pub data: &'a [u8],
    /// The remote side hung up, the socket is closed.
    pub connection_lost: bool,
}

/// How the module acknowledged the escape sequence of a suspend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SuspendOutcome {
    /// `OK`, the socket is suspended.
    Confirmed,
    /// `NO CARRIER`, the connection was gone.
    HungUp,
    /// Neither, the module state was checked with a liveness probe.
    Unconfirmed,
}

/// Socket parameters set with `#SCFG`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketConfig {
    pub cid: ContextId,
    /// Minimum packet size sent to the network, in bytes
    pub packet_size: u16,
    /// In seconds
    pub inactivity_timeout: u16,
    /// In tenths of a second
    pub connection_timeout: u16,
    /// In tenths of a second
    pub tx_timeout: u16,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            cid: ContextId(1),
            packet_size: 300,
            inactivity_timeout: 90,
            connection_timeout: 600,
            tx_timeout: 50,
        }
    }
}

impl<'d, CH, CL, D, const N: usize> Device<'d, CH, CL, D, N>
where
    CH: ByteChannel,
    CL: Clock,
    D: DelayNs,
{
    /// Dial a remote host on the first closed socket. On `CONNECT` the
    /// socket is online and owns the line.
    pub fn open_socket(
        &mut self,
        protocol: SocketProtocol,
        remote_port: u16,
        remote_addr: &str,
        closure: ClosurePolicy,
        local_port: u16,
    ) -> Result<SocketHandle, Error> {
        let guard = self.lock()?;
        let handle = self.sockets.free_handle()?;
        let session = self.sockets.get_mut(handle)?;
        session.prepare_dial(protocol, remote_addr, remote_port, closure, local_port)?;
        session.set_state(SessionState::Connecting);

        let dial = SocketDial {
            connection_id: handle.connection_id(),
            protocol,
            remote_port,
            remote_addr,
            closure,
            local_port,
        };
        match self.dial(&dial) {
            Ok(DispatchResult::Ok) => {
                self.sockets
                    .get_mut(handle)?
                    .set_state(SessionState::DataActive);
                guard.hand_over_to_data();
                info!("[{}] Connected to {}:{}", handle, remote_addr, remote_port);
                Ok(handle)
            }
            result => {
                let err = match result {
                    Ok(r) => self.transition_error(r),
                    Err(e) => e,
                };
                self.sockets.get_mut(handle)?.set_state(SessionState::Closed);
                Err(err)
            }
        }
    }

    fn dial(&mut self, dial: &SocketDial<'_>) -> Result<DispatchResult, Error> {
        self.write_escape_guard()?;
        self.port
            .send_command(dial, INTERCHAR_CONNECT_TIMEOUT_MS, "CONNECT")
    }

    fn write_escape_guard(&mut self) -> Result<(), Error> {
        if let Some(fiftieths) = self.port.config().escape_guard_register {
            // The module default still allows escaping, the answer is not checked
            self.port.send_command(
                &SetEscapeGuardTime { fiftieths },
                INTERCHAR_TIMEOUT_MS,
                "OK",
            )?;
        }
        Ok(())
    }

    /// Write payload to an online socket.
    pub fn send(&mut self, handle: SocketHandle, data: &[u8]) -> Result<(), Error> {
        self.check_online(handle)?;
        self.port.write_raw(data)
    }

    /// Receive payload from an online socket.
    ///
    /// Ends when the line has been silent for `interchar_timeout` or the
    /// buffer is full. An empty result means nothing arrived within
    /// `start_timeout`.
    pub fn receive(
        &mut self,
        handle: SocketHandle,
        start_timeout: u32,
        interchar_timeout: u32,
    ) -> Result<Received<'_>, Error> {
        self.check_online(handle)?;
        self.port.receive_raw(start_timeout, interchar_timeout);

        let hang_up = find_in_binary(self.port.response().as_bytes(), NO_CARRIER_MARKER);
        if hang_up.is_some() {
            info!("[{}] Remote closed the connection", handle);
            self.sockets.get_mut(handle)?.set_state(SessionState::Closed);
            self.line.release();
        }

        let data = self.port.response().as_bytes();
        Ok(Received {
            data: &data[..hang_up.unwrap_or(data.len())],
            connection_lost: hang_up.is_some(),
        })
    }

    /// Bring an online socket back to command mode, keeping the connection.
    ///
    /// Once the escape sequence is out only an I/O error fails it, the
    /// outcome tells how the module answered.
    pub fn suspend(&mut self, handle: SocketHandle) -> Result<SuspendOutcome, Error> {
        self.check_online(handle)?;
        let line: &'d LineArbiter = self.line;
        let guard = line.take_over_data().ok_or(Error::LineBusy)?;

        let timing = self.port.config().suspend_escape;
        let outcome = match self.port.escape(timing) {
            Ok(Some(Matched::First)) => SuspendOutcome::Confirmed,
            Ok(Some(Matched::Second)) => SuspendOutcome::HungUp,
            Ok(None) => SuspendOutcome::Unconfirmed,
            Err(e) => {
                self.sockets.get_mut(handle)?.set_state(SessionState::Closed);
                return Err(e);
            }
        };

        let state = match outcome {
            SuspendOutcome::Confirmed => SessionState::Suspended,
            SuspendOutcome::HungUp => SessionState::Closed,
            SuspendOutcome::Unconfirmed => match self.port.probe() {
                Ok(true) => SessionState::Suspended,
                Ok(false) => {
                    warn!("[{}] Escape unanswered and module silent", handle);
                    SessionState::Closed
                }
                Err(e) => {
                    self.sockets.get_mut(handle)?.set_state(SessionState::Closed);
                    return Err(e);
                }
            },
        };
        self.sockets.get_mut(handle)?.set_state(state);
        drop(guard);

        Ok(outcome)
    }

    /// Put a suspended socket back online. Without `CONNECT` the socket is
    /// considered closed.
    pub fn resume(&mut self, handle: SocketHandle) -> Result<(), Error> {
        let state = self.sockets.get(handle)?.state();
        if !state.is_suspended() {
            return Err(Error::InvalidState(state));
        }
        let guard = self.lock()?;

        let restore = SocketRestore {
            connection_id: handle.connection_id(),
        };
        let timeout = as_millis(self.port.config().resume_timeout);
        match self
            .port
            .send_and_find(&restore, "CONNECT", "NO CARRIER", timeout)
        {
            Ok(Some(Matched::First)) => {
                self.sockets
                    .get_mut(handle)?
                    .set_state(SessionState::DataActive);
                guard.hand_over_to_data();
                Ok(())
            }
            result => {
                let err = match result {
                    Ok(None) if self.port.response().is_empty() => self.settle_no_response(),
                    Ok(_) => Error::UnexpectedResponse,
                    Err(e) => e,
                };
                self.sockets.get_mut(handle)?.set_state(SessionState::Closed);
                Err(err)
            }
        }
    }

    /// Shut a socket down from any state. Closing a closed socket does
    /// nothing.
    ///
    /// An online socket is escaped first. The socket ends up closed even if
    /// the module never confirms the shutdown.
    pub fn close_socket(&mut self, handle: SocketHandle) -> Result<(), Error> {
        let state = self.sockets.get(handle)?.state();
        if state == SessionState::Closed {
            return Ok(());
        }

        let line: &'d LineArbiter = self.line;
        let online = state == SessionState::DataActive && line.state() == LineState::Data;
        let guard = if online {
            line.take_over_data()
        } else {
            line.lock()
        };
        let guard = guard.ok_or(Error::LineBusy)?;

        let shutdown = self.shutdown(handle, online);
        self.sockets.get_mut(handle)?.set_state(SessionState::Closed);
        drop(guard);

        match shutdown? {
            DispatchResult::Ok => {}
            r => warn!("[{}] Shutdown not confirmed: {:?}", handle, r),
        }
        Ok(())
    }

    fn shutdown(&mut self, handle: SocketHandle, escape: bool) -> Result<DispatchResult, Error> {
        if escape {
            let timing = self.port.config().close_escape;
            if self.port.escape(timing)?.is_none() {
                // Whatever the answer, the module is in command mode or gone
                self.port.probe()?;
            }
        }

        let cmd = SocketShutdown {
            connection_id: handle.connection_id(),
        };
        self.port.send_command(&cmd, INTERCHAR_TIMEOUT_MS, "OK")
    }

    /// Listen for incoming TCP connections on `port`.
    pub fn listen(&mut self, handle: SocketHandle, port: u16) -> Result<(), Error> {
        let state = self.sockets.get(handle)?.state();
        if state != SessionState::Closed {
            return Err(Error::InvalidState(state));
        }
        let _guard = self.lock()?;

        let cmd = SetSocketListen {
            connection_id: handle.connection_id(),
            state: ListenState::Start,
            port,
        };
        match self
            .port
            .send_command(&cmd, INTERCHAR_CONNECT_TIMEOUT_MS, "OK")?
        {
            DispatchResult::Ok => {
                let session = self.sockets.get_mut(handle)?;
                session.prepare_listen(port);
                session.set_state(SessionState::Listening);
                Ok(())
            }
            r => Err(self.transition_error(r)),
        }
    }

    pub fn stop_listening(&mut self, handle: SocketHandle) -> Result<(), Error> {
        let session = self.sockets.get(handle)?;
        let state = session.state();
        if !matches!(
            state,
            SessionState::Listening | SessionState::IncomingPendingAccept
        ) {
            return Err(Error::InvalidState(state));
        }
        let port = session.local_port();
        let _guard = self.lock()?;

        let cmd = SetSocketListen {
            connection_id: handle.connection_id(),
            state: ListenState::Stop,
            port,
        };
        match self
            .port
            .send_command(&cmd, INTERCHAR_CONNECT_TIMEOUT_MS, "OK")?
        {
            DispatchResult::Ok => {
                self.sockets.get_mut(handle)?.set_state(SessionState::Closed);
                Ok(())
            }
            r => Err(self.transition_error(r)),
        }
    }

    /// Collect an unsolicited `SRING` from an idle line.
    ///
    /// On a listening socket it announces an incoming connection, on a
    /// suspended one pending data. Returns the socket it was for.
    pub fn poll_incoming(&mut self) -> Result<Option<SocketHandle>, Error> {
        let _guard = self.lock()?;

        let window = as_millis(self.port.config().ring_poll);
        let found = self
            .port
            .wait_response(window, INTERCHAR_TIMEOUT_MS, SocketRing::PREFIX);
        if found != Classification::StringFound {
            return Ok(None);
        }

        let ring = SocketRing::parse(self.port.response().as_bytes())?;
        let handle = SocketHandle::from(ring.connection_id);
        let session = self.sockets.get_mut(handle)?;
        match session.state() {
            SessionState::Listening => session.set_state(SessionState::IncomingPendingAccept),
            SessionState::Suspended => session.set_state(SessionState::SuspendedWithPendingData),
            SessionState::IncomingPendingAccept | SessionState::SuspendedWithPendingData => {}
            state => {
                warn!("[{}] SRING in state {:?}, ignored", handle, state);
                return Ok(None);
            }
        }
        Ok(Some(handle))
    }

    /// Accept the incoming connection announced on `handle`. On `CONNECT`
    /// the socket is online and owns the line.
    pub fn accept(&mut self, handle: SocketHandle) -> Result<(), Error> {
        let state = self.sockets.get(handle)?.state();
        if state != SessionState::IncomingPendingAccept {
            return Err(Error::InvalidState(state));
        }
        let guard = self.lock()?;

        let cmd = SocketAccept {
            connection_id: handle.connection_id(),
        };
        match self
            .port
            .send_command(&cmd, INTERCHAR_CONNECT_TIMEOUT_MS, "CONNECT")
        {
            Ok(DispatchResult::Ok) => {
                self.sockets
                    .get_mut(handle)?
                    .set_state(SessionState::DataActive);
                guard.hand_over_to_data();
                Ok(())
            }
            result => {
                let err = match result {
                    Ok(r) => self.transition_error(r),
                    Err(e) => e,
                };
                // The listener survives a failed accept, unless the module is gone
                let state = if err == Error::Desynchronized {
                    SessionState::Closed
                } else {
                    SessionState::Listening
                };
                self.sockets.get_mut(handle)?.set_state(state);
                Err(err)
            }
        }
    }

    /// Ask the module for the socket state and adopt it.
    ///
    /// The module reporting an active data connection while the line is in
    /// command mode means both sides lost track, the socket is closed.
    pub fn socket_status(&mut self, handle: SocketHandle) -> Result<SessionState, Error> {
        self.sockets.get(handle)?;
        let guard = self.lock()?;

        let cmd = GetSocketStatus {
            connection_id: handle.connection_id(),
        };
        let result = self.port.send_command(&cmd, INTERCHAR_TIMEOUT_MS, "OK")?;
        if result != DispatchResult::Ok {
            return Err(self.transition_error(result));
        }

        let report = SocketStatusResponse::parse(self.port.response().as_bytes())?;
        if report.connection_id != handle.connection_id() {
            return Err(Error::Parse);
        }

        let state = SessionState::from(report.status);
        if state == SessionState::DataActive {
            drop(guard);
            return Err(self.desynchronized(handle));
        }
        let session = self.sockets.get_mut(handle)?;
        if matches!(
            state,
            SessionState::Listening | SessionState::IncomingPendingAccept
        ) {
            session.prepare_listen(report.local_port.unwrap_or_default());
        }
        session.set_state(state);
        Ok(state)
    }

    /// Set the context and timeouts used by a socket.
    pub fn configure_socket(
        &mut self,
        handle: SocketHandle,
        config: &SocketConfig,
    ) -> Result<(), Error> {
        self.sockets.get(handle)?;
        let _guard = self.lock()?;
        self.write_escape_guard()?;

        let cmd = SetSocketConfig {
            connection_id: handle.connection_id(),
            cid: config.cid,
            packet_size: config.packet_size,
            inactivity_timeout: config.inactivity_timeout,
            connection_timeout: config.connection_timeout,
            tx_timeout: config.tx_timeout,
        };
        self.port
            .send_command(&cmd, INTERCHAR_CONNECT_TIMEOUT_MS, "OK")?
            .into_result()
    }

    fn check_online(&mut self, handle: SocketHandle) -> Result<(), Error> {
        let state = self.sockets.get(handle)?.state();
        match state {
            SessionState::DataActive if self.line.state() == LineState::Data => Ok(()),
            SessionState::DataActive => Err(self.desynchronized(handle)),
            state => Err(Error::InvalidState(state)),
        }
    }
}
