//! ### IP Easy Extension socket commands
//!
//! Up to six sockets run over an activated PDP context. An online socket
//! owns the serial line, the escape sequence suspends it back to command
//! mode and `#SO` restores it.
pub mod responses;
pub mod types;

use atat::atat_derive::AtatCmd;
use responses::SocketStatusResponse;
use types::{ClosurePolicy, ConnectionId, ListenState, SocketProtocol};

use super::psn::types::ContextId;
use super::NoResponse;

/// Socket dial #SD
///
/// Opens a remote connection and enters data mode, answered by `CONNECT`.
#[derive(Clone, AtatCmd)]
#[at_cmd("#SD", NoResponse, attempts = 3, timeout_ms = 20000)]
pub struct SocketDial<'a> {
    #[at_arg(position = 0)]
    pub connection_id: ConnectionId,
    #[at_arg(position = 1)]
    pub protocol: SocketProtocol,
    #[at_arg(position = 2)]
    pub remote_port: u16,
    #[at_arg(position = 3, len = 128)]
    pub remote_addr: &'a str,
    #[at_arg(position = 4)]
    pub closure: ClosurePolicy,
    /// Only meaningful for UDP
    #[at_arg(position = 5)]
    pub local_port: u16,
}

/// Socket accept #SA
///
/// Accepts an incoming connection announced by `SRING`, answered by
/// `CONNECT`.
#[derive(Clone, AtatCmd)]
#[at_cmd("#SA", NoResponse, attempts = 3, timeout_ms = 20000)]
pub struct SocketAccept {
    #[at_arg(position = 0)]
    pub connection_id: ConnectionId,
}

/// Socket listen #SL
#[derive(Clone, AtatCmd)]
#[at_cmd("#SL", NoResponse, attempts = 3, timeout_ms = 20000)]
pub struct SetSocketListen {
    #[at_arg(position = 0)]
    pub connection_id: ConnectionId,
    #[at_arg(position = 1)]
    pub state: ListenState,
    #[at_arg(position = 2)]
    pub port: u16,
}

/// Socket restore #SO
///
/// Resumes a suspended socket into data mode.
#[derive(Clone, AtatCmd)]
#[at_cmd("#SO", NoResponse, attempts = 1, timeout_ms = 5000)]
pub struct SocketRestore {
    #[at_arg(position = 0)]
    pub connection_id: ConnectionId,
}

/// Socket shutdown #SH
#[derive(Clone, AtatCmd)]
#[at_cmd("#SH", NoResponse, attempts = 3, timeout_ms = 500)]
pub struct SocketShutdown {
    #[at_arg(position = 0)]
    pub connection_id: ConnectionId,
}

/// Socket status #SS
#[derive(Clone, AtatCmd)]
#[at_cmd("#SS", SocketStatusResponse, attempts = 3, timeout_ms = 500)]
pub struct GetSocketStatus {
    #[at_arg(position = 0)]
    pub connection_id: ConnectionId,
}

/// Socket configuration #SCFG
///
/// Timeouts are in seconds for inactivity and in tenths of a second for the
/// connection and the data sending.
#[derive(Clone, AtatCmd)]
#[at_cmd("#SCFG", NoResponse, attempts = 3, timeout_ms = 20000)]
pub struct SetSocketConfig {
    #[at_arg(position = 0)]
    pub connection_id: ConnectionId,
    #[at_arg(position = 1)]
    pub cid: ContextId,
    #[at_arg(position = 2)]
    pub packet_size: u16,
    #[at_arg(position = 3)]
    pub inactivity_timeout: u16,
    #[at_arg(position = 4)]
    pub connection_timeout: u16,
    #[at_arg(position = 5)]
    pub tx_timeout: u16,
}

#[cfg(test)]
mod test {
    use super::*;
    use atat::AtatCmd;

    fn line<C: AtatCmd>(cmd: &C) -> std::string::String {
        let mut buf = [0u8; 256];
        let len = cmd.write(&mut buf);
        std::string::String::from_utf8(buf[..len].to_vec()).unwrap()
    }

    #[test]
    fn dial() {
        let cmd = SocketDial {
            connection_id: ConnectionId(1),
            protocol: SocketProtocol::Tcp,
            remote_port: 80,
            remote_addr: "example.com",
            closure: ClosurePolicy::Immediate,
            local_port: 0,
        };
        assert_eq!(line(&cmd), "AT#SD=1,0,80,\"example.com\",0,0\r\n");
    }

    #[test]
    fn listen_and_config() {
        let cmd = SetSocketListen {
            connection_id: ConnectionId(1),
            state: ListenState::Start,
            port: 6543,
        };
        assert_eq!(line(&cmd), "AT#SL=1,1,6543\r\n");

        let cmd = SetSocketConfig {
            connection_id: ConnectionId(1),
            cid: ContextId(1),
            packet_size: 300,
            inactivity_timeout: 90,
            connection_timeout: 600,
            tx_timeout: 50,
        };
        assert_eq!(line(&cmd), "AT#SCFG=1,1,300,90,600,50\r\n");
    }

    #[test]
    fn single_id_commands() {
        let id = ConnectionId(2);
        assert_eq!(line(&SocketAccept { connection_id: id }), "AT#SA=2\r\n");
        assert_eq!(line(&SocketRestore { connection_id: id }), "AT#SO=2\r\n");
        assert_eq!(line(&GetSocketStatus { connection_id: id }), "AT#SS=2\r\n");
    }
}
