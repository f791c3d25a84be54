//! PDP context setup for the IP Easy sockets.

use embedded_hal::delay::DelayNs;
use no_std_net::Ipv4Addr;

use super::apn::APNInfo;
use crate::channel::ByteChannel;
use crate::client::Device;
use crate::clock::Clock;
use crate::command::psn::responses::ContextActivated;
use crate::command::psn::types::ContextId;
use crate::command::psn::{
    ActivateContext, DeactivateContext, SetPDPContextDefinition, SetPassword, SetUserId,
};
use crate::error::Error;
use crate::module_timing::{INTERCHAR_CONNECT_TIMEOUT_MS, INTERCHAR_MID_TIMEOUT_MS};
use crate::transport::DispatchResult;

impl<'d, CH, CL, D, const N: usize> Device<'d, CH, CL, D, N>
where
    CH: ByteChannel,
    CL: Clock,
    D: DelayNs,
{
    /// Define context `cid` with the APN and credentials in `apn_info`.
    /// Missing credentials are written as empty strings.
    pub fn init_context(&mut self, cid: ContextId, apn_info: &APNInfo<'_>) -> Result<(), Error> {
        let _guard = self.lock()?;

        self.port
            .send_command(
                &SetPDPContextDefinition {
                    cid,
                    pdp_type: "IP",
                    apn: apn_info.apn.as_str(),
                },
                INTERCHAR_MID_TIMEOUT_MS,
                "OK",
            )?
            .into_result()?;

        self.port
            .send_command(
                &SetUserId {
                    user: apn_info.user_name.unwrap_or_default(),
                },
                INTERCHAR_MID_TIMEOUT_MS,
                "OK",
            )?
            .into_result()?;

        self.port
            .send_command(
                &SetPassword {
                    password: apn_info.password.unwrap_or_default(),
                },
                INTERCHAR_MID_TIMEOUT_MS,
                "OK",
            )?
            .into_result()
    }

    /// Activate context `cid`, returning the address the network assigned.
    ///
    /// A failed activation is followed by a deactivation and one more try.
    pub fn activate_context(&mut self, cid: ContextId) -> Result<Ipv4Addr, Error> {
        let _guard = self.lock()?;

        let ip = match self.try_activate(cid)? {
            Some(ip) => ip,
            None => {
                warn!("Context {} activation failed, retrying", cid.0);
                self.port.send_command(
                    &DeactivateContext::new(cid),
                    INTERCHAR_CONNECT_TIMEOUT_MS,
                    "OK",
                )?;
                self.try_activate(cid)?.ok_or(Error::UnexpectedResponse)?
            }
        };

        info!("Context {} active, local address {:?}", cid.0, ip.octets());
        self.local_ip = Some(ip);
        Ok(ip)
    }

    fn try_activate(&mut self, cid: ContextId) -> Result<Option<Ipv4Addr>, Error> {
        let result = self.port.send_command(
            &ActivateContext::new(cid),
            INTERCHAR_CONNECT_TIMEOUT_MS,
            ContextActivated::PREFIX,
        )?;
        if result != DispatchResult::Ok {
            return Ok(None);
        }
        ContextActivated::parse(self.port.response().as_bytes())
            .map(|activated| Some(activated.ip))
    }

    pub fn deactivate_context(&mut self, cid: ContextId) -> Result<(), Error> {
        let _guard = self.lock()?;

        self.port
            .send_command(
                &DeactivateContext::new(cid),
                INTERCHAR_CONNECT_TIMEOUT_MS,
                "OK",
            )?
            .into_result()?;
        self.local_ip = None;
        Ok(())
    }

    /// Address of the active context, if any.
    pub fn local_ip(&self) -> Option<Ipv4Addr> {
        self.local_ip
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::client::State;
    use crate::config::Config;
    use crate::test_helpers::{test_device, MockTime};
    use crate::transport::LineState;

    const OK: &[u8] = b"\r\nOK\r\n";

    #[test]
    fn context_definition_with_credentials() {
        let time = MockTime::default();
        let state = State::new();
        let (mut device, modem) = test_device(&state, &time, Config::default());
        for _ in 0..3 {
            modem.reply(OK);
        }

        let apn = APNInfo::new("internet").with_credentials("user", "secret");
        device.init_context(ContextId(1), &apn).unwrap();

        assert_eq!(
            modem.written(),
            vec![
                b"AT+CGDCONT=1,\"IP\",\"internet\"\r\n".to_vec(),
                b"AT#USERID=\"user\"\r\n".to_vec(),
                b"AT#PASSW=\"secret\"\r\n".to_vec(),
            ]
        );
        assert_eq!(state.line_state(), LineState::Free);
    }

    #[test]
    fn rejected_definition_stops_early() {
        let time = MockTime::default();
        let state = State::new();
        let (mut device, modem) = test_device(&state, &time, Config::default());
        modem.reply(b"\r\nERROR\r\n");
        modem.reply(b"\r\nERROR\r\n");

        assert_eq!(
            device.init_context(ContextId(1), &APNInfo::default()),
            Err(Error::UnexpectedResponse)
        );
        assert_eq!(modem.written().len(), 2);
        assert_eq!(state.line_state(), LineState::Free);
    }

    #[test]
    fn activation_reports_address() {
        let time = MockTime::default();
        let state = State::new();
        let (mut device, modem) = test_device(&state, &time, Config::default());
        modem.reply(b"\r\n#SGACT: 10.11.12.13\r\n\r\nOK\r\n");

        let ip = device.activate_context(ContextId(1)).unwrap();

        assert_eq!(ip, Ipv4Addr::new(10, 11, 12, 13));
        assert_eq!(device.local_ip(), Some(ip));
        assert_eq!(modem.written(), vec![b"AT#SGACT=1,1\r\n".to_vec()]);
    }

    #[test]
    fn failed_activation_deactivates_and_retries() {
        let time = MockTime::default();
        let state = State::new();
        let (mut device, modem) = test_device(&state, &time, Config::default());
        modem.reply(b"\r\nERROR\r\n");
        modem.reply(OK);
        modem.reply(b"\r\n#SGACT: 10.0.0.2\r\n\r\nOK\r\n");

        let ip = device.activate_context(ContextId(1)).unwrap();

        assert_eq!(ip, Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(
            modem.written(),
            vec![
                b"AT#SGACT=1,1\r\n".to_vec(),
                b"AT#SGACT=1,0\r\n".to_vec(),
                b"AT#SGACT=1,1\r\n".to_vec(),
            ]
        );

        modem.reply(OK);
        device.deactivate_context(ContextId(1)).unwrap();
        assert_eq!(device.local_ip(), None);
    }
}
