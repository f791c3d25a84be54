//! AT commands for the Telit GE86x family, IP Easy Extension included.

pub mod ip_easy;
pub mod psn;

use atat::atat_derive::{AtatCmd, AtatResp};

#[derive(Clone, AtatResp)]
pub struct NoResponse;

/// Attention, answered by `OK` when the module is in command mode.
#[derive(Clone, AtatCmd)]
#[at_cmd("", NoResponse, attempts = 3, timeout_ms = 500)]
pub struct AT;

/// Escape prompt delay S12
///
/// Minimum silence before and after `+++` for it to be taken as an escape
/// sequence, in fiftieths of a second.
#[derive(Clone, AtatCmd)]
#[at_cmd("S12", NoResponse, attempts = 3, timeout_ms = 500)]
pub struct SetEscapeGuardTime {
    #[at_arg(position = 0)]
    pub fiftieths: u8,
}

#[cfg(test)]
mod test {
    use super::*;
    use atat::AtatCmd;

    #[test]
    fn bare_commands() {
        let mut buf = [0u8; 32];
        let len = AT.write(&mut buf);
        assert_eq!(&buf[..len], b"AT\r\n");

        let len = SetEscapeGuardTime { fiftieths: 20 }.write(&mut buf);
        assert_eq!(&buf[..len], b"ATS12=20\r\n");
    }
}
