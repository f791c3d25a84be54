//! Argument and parameter types used by PDP context commands
use atat::atat_derive::{AtatEnum, AtatLen};
use serde::{Deserialize, Serialize};

/// PDP context identifier, 1..=5 on GE86x modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AtatLen)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ContextId(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ContextState {
    Deactivated = 0,
    Activated = 1,
}
