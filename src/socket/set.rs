use core::fmt;

use serde::{Deserialize, Serialize};

use super::{SessionState, SocketSession};
use crate::command::ip_easy::types::ConnectionId;
use crate::error::Error;

/// Number of sockets the module can hold.
pub const MAX_SOCKETS: usize = ConnectionId::MAX as usize;

/// A handle, identifying a socket in a set. Equal to the module connection
/// id, 1..=6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SocketHandle(pub u8);

impl SocketHandle {
    pub fn connection_id(self) -> ConnectionId {
        ConnectionId(self.0)
    }
}

impl From<ConnectionId> for SocketHandle {
    fn from(id: ConnectionId) -> Self {
        SocketHandle(id.0)
    }
}

impl fmt::Display for SocketHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed set of the module's sockets.
#[derive(Debug)]
pub struct SocketSet {
    sockets: [SocketSession; MAX_SOCKETS],
}

impl Default for SocketSet {
    fn default() -> Self {
        Self::new()
    }
}

impl SocketSet {
    pub fn new() -> Self {
        Self {
            sockets: core::array::from_fn(|i| {
                SocketSession::new(SocketHandle(i as u8 + ConnectionId::MIN))
            }),
        }
    }

    /// First socket in [`SessionState::Closed`](super::SessionState::Closed).
    pub fn free_handle(&self) -> Result<SocketHandle, Error> {
        self.sockets
            .iter()
            .find(|s| s.is_closed())
            .map(SocketSession::handle)
            .ok_or(Error::NoFreeSocket)
    }

    pub fn get(&self, handle: SocketHandle) -> Result<&SocketSession, Error> {
        let i = self.index(handle)?;
        Ok(&self.sockets[i])
    }

    pub fn get_mut(&mut self, handle: SocketHandle) -> Result<&mut SocketSession, Error> {
        let i = self.index(handle)?;
        Ok(&mut self.sockets[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &SocketSession> {
        self.sockets.iter()
    }

    fn index(&self, handle: SocketHandle) -> Result<usize, Error> {
        ConnectionId::new(handle.0)
            .map(|id| usize::from(id.0 - ConnectionId::MIN))
            .ok_or(Error::InvalidHandle)
    }
}
