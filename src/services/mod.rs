//! Operations of a [`Device`](crate::client::Device), grouped by concern.

pub mod apn;
pub mod data;
pub mod gprs;
