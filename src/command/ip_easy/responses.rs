//! Responses for IP Easy Extension socket commands
use core::str::FromStr;

use atat::atat_derive::AtatResp;
use no_std_net::Ipv4Addr;

use super::types::{ConnectionId, SocketStatus};
use crate::command::psn::responses::field_after;
use crate::error::Error;

/// Socket status #SS
#[derive(Debug, Clone, PartialEq, Eq, AtatResp)]
pub struct SocketStatusResponse {
    #[at_arg(position = 0)]
    pub connection_id: ConnectionId,
    #[at_arg(position = 1)]
    pub status: SocketStatus,
    #[at_arg(position = 2)]
    pub local_ip: Option<Ipv4Addr>,
    #[at_arg(position = 3)]
    pub local_port: Option<u16>,
    #[at_arg(position = 4)]
    pub remote_ip: Option<Ipv4Addr>,
    #[at_arg(position = 5)]
    pub remote_port: Option<u16>,
}

impl SocketStatusResponse {
    pub const PREFIX: &'static str = "#SS: ";

    /// Parse `#SS: <id>,<status>[,<lip>,<lport>,<rip>,<rport>]`.
    pub fn parse(response: &[u8]) -> Result<Self, Error> {
        let line = field_after(response, Self::PREFIX.as_bytes()).ok_or(Error::Parse)?;
        let line = core::str::from_utf8(line).map_err(|_| Error::Parse)?;
        let mut fields = line.split(',').map(str::trim);

        let connection_id = fields
            .next()
            .and_then(|id| u8::from_str(id).ok())
            .and_then(ConnectionId::new)
            .ok_or(Error::Parse)?;
        let status = fields
            .next()
            .and_then(|code| u8::from_str(code).ok())
            .and_then(SocketStatus::from_code)
            .ok_or(Error::Parse)?;

        let local_ip = fields.next().and_then(|f| Ipv4Addr::from_str(f).ok());
        let local_port = fields.next().and_then(|p| u16::from_str(p).ok());
        let remote_ip = fields.next().and_then(|f| Ipv4Addr::from_str(f).ok());
        let remote_port = fields.next().and_then(|p| u16::from_str(p).ok());

        Ok(Self {
            connection_id,
            status,
            local_ip,
            local_port,
            remote_ip,
            remote_port,
        })
    }
}

/// Unsolicited `SRING: <id>`, a remote host is connecting to a listening
/// socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketRing {
    pub connection_id: ConnectionId,
}

impl SocketRing {
    pub const PREFIX: &'static str = "SRING: ";

    pub fn parse(response: &[u8]) -> Result<Self, Error> {
        let id = field_after(response, Self::PREFIX.as_bytes()).ok_or(Error::Parse)?;
        core::str::from_utf8(id)
            .ok()
            .and_then(|id| u8::from_str(id.trim()).ok())
            .and_then(ConnectionId::new)
            .map(|connection_id| Self { connection_id })
            .ok_or(Error::Parse)
    }
}
