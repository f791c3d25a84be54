#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod channel;
pub mod client;
pub mod clock;
pub mod command;
pub mod config;
pub mod error;
mod module_timing;
pub mod services;
pub mod socket;
pub mod transport;

#[cfg(test)]
mod test_helpers;

pub use channel::{ByteChannel, Serial};
pub use client::{Device, State};
pub use clock::{Clock, SystemClock};
pub use config::{Config, EscapeTiming, RetryPolicy};
pub use error::Error;
pub use services::apn::{APNInfo, Apn};
pub use services::data::{Received, SocketConfig, SuspendOutcome};
pub use socket::{SessionState, SocketHandle, SocketSession};
pub use transport::{DispatchResult, LineState};
