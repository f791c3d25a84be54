//! Command/response transport over the shared serial line.

pub mod arbiter;
pub mod buffer;
pub mod classify;
pub mod dispatch;
pub mod receiver;

pub use arbiter::{LineArbiter, LineGuard, LineState};
pub use buffer::{ResponseBuffer, DEFAULT_CAPACITY};
pub use classify::{contains, find_in_binary, Classification};
pub use dispatch::{AtPort, DispatchResult, Matched};
pub use receiver::{Flush, Overflow, ReceiveOutcome, Receiver};
