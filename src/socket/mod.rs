mod set;

use core::fmt;

use heapless::String;

use crate::command::ip_easy::types::{ClosurePolicy, ConnectionId, SocketProtocol, SocketStatus};

pub use self::set::{SocketHandle, SocketSet, MAX_SOCKETS};

/// Longest remote host name or dotted address accepted by a dial.
pub const MAX_HOST_LEN: usize = 128;

/// State of a socket session, as this side of the line believes it is.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionState {
    #[default]
    Closed,
    /// Dial sent, waiting for `CONNECT`.
    Connecting,
    /// Online, the serial line carries payload.
    DataActive,
    Suspended,
    SuspendedWithPendingData,
    Listening,
    /// `SRING` received, waiting for accept.
    IncomingPendingAccept,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SessionState::Closed => write!(f, "CLOSED"),
            SessionState::Connecting => write!(f, "CONNECTING"),
            SessionState::DataActive => write!(f, "DATA-ACTIVE"),
            SessionState::Suspended => write!(f, "SUSPENDED"),
            SessionState::SuspendedWithPendingData => write!(f, "SUSPENDED-PENDING-DATA"),
            SessionState::Listening => write!(f, "LISTENING"),
            SessionState::IncomingPendingAccept => write!(f, "INCOMING"),
        }
    }
}

impl From<SocketStatus> for SessionState {
    fn from(status: SocketStatus) -> Self {
        match status {
            SocketStatus::Closed => SessionState::Closed,
            SocketStatus::Active => SessionState::DataActive,
            SocketStatus::Suspended => SessionState::Suspended,
            SocketStatus::SuspendedPendingData => SessionState::SuspendedWithPendingData,
            SocketStatus::Listening => SessionState::Listening,
            SocketStatus::Incoming => SessionState::IncomingPendingAccept,
        }
    }
}

impl SessionState {
    pub fn is_suspended(self) -> bool {
        matches!(
            self,
            SessionState::Suspended | SessionState::SuspendedWithPendingData
        )
    }
}

/// One IP Easy socket and what is known about its connection.
#[derive(Debug)]
pub struct SocketSession {
    handle: SocketHandle,
    state: SessionState,
    protocol: SocketProtocol,
    remote_host: String<MAX_HOST_LEN>,
    remote_port: u16,
    local_port: u16,
    closure: ClosurePolicy,
}

impl SocketSession {
    pub(crate) fn new(handle: SocketHandle) -> Self {
        Self {
            handle,
            state: SessionState::Closed,
            protocol: SocketProtocol::Tcp,
            remote_host: String::new(),
            remote_port: 0,
            local_port: 0,
            closure: ClosurePolicy::Immediate,
        }
    }

    #[inline]
    pub fn handle(&self) -> SocketHandle {
        self.handle
    }

    #[inline]
    pub fn connection_id(&self) -> ConnectionId {
        self.handle.connection_id()
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    pub fn protocol(&self) -> SocketProtocol {
        self.protocol
    }

    pub fn remote_host(&self) -> &str {
        &self.remote_host
    }

    pub fn remote_port(&self) -> u16 {
        self.remote_port
    }

    /// Local port of a dialed UDP socket, or the listening port.
    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    pub fn closure(&self) -> ClosurePolicy {
        self.closure
    }

    pub(crate) fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            debug!("[{}] {:?} -> {:?}", self.handle, self.state, state);
        }
        self.state = state;
    }

    pub(crate) fn prepare_dial(
        &mut self,
        protocol: SocketProtocol,
        remote_host: &str,
        remote_port: u16,
        closure: ClosurePolicy,
        local_port: u16,
    ) -> Result<(), crate::error::Error> {
        self.remote_host.clear();
        self.remote_host
            .push_str(remote_host)
            .map_err(|_| crate::error::Error::CommandOverflow)?;
        self.protocol = protocol;
        self.remote_port = remote_port;
        self.closure = closure;
        self.local_port = local_port;
        Ok(())
    }

    pub(crate) fn prepare_listen(&mut self, port: u16) {
        self.remote_host.clear();
        self.protocol = SocketProtocol::Tcp;
        self.remote_port = 0;
        self.local_port = port;
    }
}
