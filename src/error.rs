use crate::socket::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    // Line arbitration errors
    /// The serial line is owned by another operation (command or data mode).
    LineBusy,

    // Modem response errors
    /// Nothing was received within the start timeout, on every attempt.
    Timeout,
    /// Something was received, but the expected token was not in it.
    UnexpectedResponse,
    /// Line state and session state disagreed, the session has been closed
    /// and the line released.
    Desynchronized,

    // Socket errors
    InvalidState(SessionState),
    NoFreeSocket,
    InvalidHandle,

    // Generic shared errors
    /// The formatted command does not fit in the transmit buffer.
    CommandOverflow,
    Parse,
    Io,
}
