//! Argument and parameter types used by IP Easy Extension socket commands
use atat::atat_derive::{AtatEnum, AtatLen};
use serde::{Deserialize, Serialize};

/// Socket connection identifier, 1..=6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, AtatLen)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnectionId(pub u8);

impl ConnectionId {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 6;

    pub fn new(id: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&id).then_some(Self(id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SocketProtocol {
    Tcp = 0,
    Udp = 1,
}

/// What the module does with the socket when data mode is left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClosurePolicy {
    /// Local host closes immediately on remote close.
    Immediate = 0,
    /// Local host closes only after an escape sequence.
    AfterEscape = 255,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ListenState {
    Stop = 0,
    Start = 1,
}

/// Socket status code of a #SS report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SocketStatus {
    Closed = 0,
    /// Active data transfer connection
    Active = 1,
    Suspended = 2,
    SuspendedPendingData = 3,
    Listening = 4,
    /// Incoming connection waiting for accept or shutdown
    Incoming = 5,
}

impl SocketStatus {
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => SocketStatus::Closed,
            1 => SocketStatus::Active,
            2 => SocketStatus::Suspended,
            3 => SocketStatus::SuspendedPendingData,
            4 => SocketStatus::Listening,
            5 => SocketStatus::Incoming,
            _ => return None,
        })
    }
}
