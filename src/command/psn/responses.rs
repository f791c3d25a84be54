//! Responses for PDP context commands
use core::str::FromStr;

use atat::atat_derive::AtatResp;
use no_std_net::Ipv4Addr;

use crate::error::Error;
use crate::transport::find_in_binary;

/// Context activation #SGACT
#[derive(Debug, Clone, PartialEq, Eq, AtatResp)]
pub struct ContextActivated {
    /// Address assigned to the module by the network
    #[at_arg(position = 0)]
    pub ip: Ipv4Addr,
}

impl ContextActivated {
    pub const PREFIX: &'static str = "#SGACT: ";

    pub fn parse(response: &[u8]) -> Result<Self, Error> {
        let ip = field_after(response, Self::PREFIX.as_bytes()).ok_or(Error::Parse)?;
        let ip = core::str::from_utf8(ip).map_err(|_| Error::Parse)?;
        Ipv4Addr::from_str(ip.trim())
            .map(|ip| Self { ip })
            .map_err(|_| Error::Parse)
    }
}

/// Bytes following `prefix` up to the end of that line.
pub(crate) fn field_after<'a>(response: &'a [u8], prefix: &[u8]) -> Option<&'a [u8]> {
    let start = find_in_binary(response, prefix)? + prefix.len();
    let rest = &response[start..];
    let end = rest
        .iter()
        .position(|b| *b == b'\r' || *b == b'\n')
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_assigned_address() {
        let resp = ContextActivated::parse(b"\r\n#SGACT: 212.195.45.65\r\n\r\nOK\r\n").unwrap();
        assert_eq!(resp.ip, Ipv4Addr::new(212, 195, 45, 65));
    }

    #[test]
    fn rejects_error_and_garbage() {
        assert_eq!(ContextActivated::parse(b"\r\nERROR\r\n"), Err(Error::Parse));
        assert_eq!(
            ContextActivated::parse(b"\r\n#SGACT: 999.1.1.1\r\n"),
            Err(Error::Parse)
        );
    }
}
