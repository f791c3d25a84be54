//! ### PDP context commands
//!
//! The IP Easy Extension runs its sockets over a PDP context of the module
//! itself. A context is defined with `+CGDCONT`, optionally given
//! credentials with `#USERID` / `#PASSW`, then activated with `#SGACT`,
//! which reports the address assigned by the network.

pub mod responses;
pub mod types;

use atat::atat_derive::AtatCmd;
use responses::ContextActivated;
use types::{ContextId, ContextState};

use super::NoResponse;

/// PDP context definition +CGDCONT
///
/// Defines the connection parameters for the PDP context identified by
/// `cid`.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CGDCONT", NoResponse, attempts = 2, timeout_ms = 1000)]
pub struct SetPDPContextDefinition<'a> {
    #[at_arg(position = 0)]
    pub cid: ContextId,
    #[at_arg(position = 1, len = 6)]
    pub pdp_type: &'a str,
    #[at_arg(position = 2, len = 99)]
    pub apn: &'a str,
}

/// Authentication user ID #USERID
#[derive(Clone, AtatCmd)]
#[at_cmd("#USERID", NoResponse, attempts = 2, timeout_ms = 1000)]
pub struct SetUserId<'a> {
    #[at_arg(position = 0, len = 64)]
    pub user: &'a str,
}

/// Authentication password #PASSW
#[derive(Clone, AtatCmd)]
#[at_cmd("#PASSW", NoResponse, attempts = 2, timeout_ms = 1000)]
pub struct SetPassword<'a> {
    #[at_arg(position = 0, len = 64)]
    pub password: &'a str,
}

/// Context activation #SGACT
///
/// Activates the context and answers with `#SGACT: <ip>`. A single attempt,
/// a failed activation is followed by a deactivation before trying again.
#[derive(Clone, AtatCmd)]
#[at_cmd("#SGACT", ContextActivated, attempts = 1, timeout_ms = 20000)]
pub struct ActivateContext {
    #[at_arg(position = 0)]
    pub cid: ContextId,
    #[at_arg(position = 1)]
    state: ContextState,
}

impl ActivateContext {
    pub fn new(cid: ContextId) -> Self {
        Self {
            cid,
            state: ContextState::Activated,
        }
    }
}

/// Context deactivation #SGACT
#[derive(Clone, AtatCmd)]
#[at_cmd("#SGACT", NoResponse, attempts = 3, timeout_ms = 20000)]
pub struct DeactivateContext {
    #[at_arg(position = 0)]
    pub cid: ContextId,
    #[at_arg(position = 1)]
    state: ContextState,
}

impl DeactivateContext {
    pub fn new(cid: ContextId) -> Self {
        Self {
            cid,
            state: ContextState::Deactivated,
        }
    }
}
