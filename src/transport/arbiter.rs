use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::blocking_mutex::Mutex;

/// Owner of the serial line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineState {
    Free,
    /// A command/response exchange is in progress.
    Command,
    /// A socket is online, bytes on the line are payload.
    Data,
}

/// Try-lock over the serial line.
///
/// Acquisition never waits, a busy line is reported to the caller.
pub struct LineArbiter {
    state: Mutex<NoopRawMutex, Cell<LineState>>,
}

impl Default for LineArbiter {
    fn default() -> Self {
        Self::new()
    }
}

impl LineArbiter {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(Cell::new(LineState::Free)),
        }
    }

    pub fn state(&self) -> LineState {
        self.state.lock(Cell::get)
    }

    /// Take the line for `mode`. Only succeeds from [`LineState::Free`], a
    /// failed attempt leaves the state untouched.
    pub fn try_acquire(&self, mode: LineState) -> bool {
        self.state.lock(|s| {
            if s.get() != LineState::Free {
                return false;
            }
            s.set(mode);
            if mode != LineState::Free {
                debug!("Line: Free -> {:?}", mode);
            }
            true
        })
    }

    /// Move the line from `from` to `to`. Fails if it is not in `from`.
    pub(crate) fn transition(&self, from: LineState, to: LineState) -> bool {
        self.state.lock(|s| {
            if s.get() != from {
                return false;
            }
            s.set(to);
            debug!("Line: {:?} -> {:?}", from, to);
            true
        })
    }

    pub fn release(&self) {
        self.state.lock(|s| {
            let prev = s.replace(LineState::Free);
            if prev != LineState::Free {
                debug!("Line: {:?} -> Free", prev);
            }
        })
    }

    /// RAII form of [`LineArbiter::try_acquire`] for command mode.
    pub fn lock(&self) -> Option<LineGuard<'_>> {
        self.try_acquire(LineState::Command)
            .then(|| LineGuard {
                arbiter: self,
                armed: true,
            })
    }

    /// Take over a line in data mode to run command traffic on it, e.g.
    /// for the escape sequence.
    pub(crate) fn take_over_data(&self) -> Option<LineGuard<'_>> {
        self.transition(LineState::Data, LineState::Command)
            .then(|| LineGuard {
                arbiter: self,
                armed: true,
            })
    }
}

/// Command mode ownership of the line, freed on drop.
#[must_use]
pub struct LineGuard<'a> {
    arbiter: &'a LineArbiter,
    armed: bool,
}

impl<'a> LineGuard<'a> {
    /// Keep the line past the guard, handing it to data mode.
    pub fn hand_over_to_data(mut self) {
        self.armed = false;
        self.arbiter.transition(LineState::Command, LineState::Data);
    }
}

impl<'a> Drop for LineGuard<'a> {
    fn drop(&mut self) {
        if self.armed {
            self.arbiter.release();
        }
    }
}
