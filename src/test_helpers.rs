//! Scripted modem, clock and delay for the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Once;
use std::vec::Vec;

use env_logger::Env;

use crate::channel::ByteChannel;
use crate::client::{Device, State};
use crate::clock::Clock;
use crate::config::Config;
use crate::transport::AtPort;

static INIT: Once = Once::new();

pub fn init_logger() {
    INIT.call_once(|| {
        env_logger::Builder::from_env(Env::default().default_filter_or("info"))
            .is_test(true)
            .init();
    });
}

/// Millisecond counter shared by the clock, the delay and the modem.
#[derive(Clone, Default)]
pub struct MockTime(Rc<Cell<u32>>);

impl MockTime {
    pub fn starting_at(ms: u32) -> Self {
        Self(Rc::new(Cell::new(ms)))
    }

    pub fn now(&self) -> u32 {
        self.0.get()
    }

    pub fn advance(&self, ms: u32) {
        self.0.set(self.0.get().wrapping_add(ms));
    }
}

/// Every read moves time forward by one millisecond, so polling loops
/// always make progress towards their timeouts.
pub struct MockClock(MockTime);

impl MockClock {
    pub fn new(time: &MockTime) -> Self {
        Self(time.clone())
    }
}

impl Clock for MockClock {
    fn now_ms(&mut self) -> u32 {
        let now = self.0.now();
        self.0.advance(1);
        now
    }
}

pub struct MockDelay(MockTime);

impl MockDelay {
    pub fn new(time: &MockTime) -> Self {
        Self(time.clone())
    }
}

impl embedded_hal::delay::DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.advance(ns.div_ceil(1_000_000));
    }

    fn delay_us(&mut self, us: u32) {
        self.0.advance(us.div_ceil(1_000));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.0.advance(ms);
    }
}

/// Reaction of the mock modem to one write.
pub enum Script {
    Silence,
    /// Chunks delivered `delay` ms after the write.
    Reply(Vec<(u32, Vec<u8>)>),
}

impl Script {
    pub fn reply(bytes: &[u8]) -> Self {
        Script::Reply(vec![(MODEM_LATENCY_MS, bytes.to_vec())])
    }
}

const MODEM_LATENCY_MS: u32 = 5;

#[derive(Default)]
struct Modem {
    script: VecDeque<Script>,
    rx: VecDeque<(u32, u8)>,
    tx: Vec<(u32, Vec<u8>)>,
    writes_left: Option<usize>,
}

/// Write error of a [`MockChannel`] whose serial line has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineDown;

/// Modem that answers every write with the next [`Script`] entry, silence
/// once the script is exhausted.
#[derive(Clone)]
pub struct MockChannel {
    time: MockTime,
    modem: Rc<RefCell<Modem>>,
}

impl MockChannel {
    pub fn new(time: &MockTime) -> Self {
        Self {
            time: time.clone(),
            modem: Rc::new(RefCell::new(Modem::default())),
        }
    }

    pub fn script(&self, step: Script) {
        self.modem.borrow_mut().script.push_back(step);
    }

    pub fn reply(&self, bytes: &[u8]) {
        self.script(Script::reply(bytes));
    }

    pub fn silence(&self) {
        self.script(Script::Silence);
    }

    /// Unsolicited bytes, arriving `delay` ms from now.
    pub fn inject(&self, delay: u32, bytes: &[u8]) {
        let due = self.time.now().wrapping_add(delay);
        self.schedule(due, bytes);
    }

    /// Everything written so far, one entry per write.
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.modem
            .borrow()
            .tx
            .iter()
            .map(|(_, bytes)| bytes.clone())
            .collect()
    }

    /// Write timestamps, in the same order as [`MockChannel::written`].
    pub fn write_times(&self) -> Vec<u32> {
        self.modem.borrow().tx.iter().map(|(at, _)| *at).collect()
    }

    /// Accept `writes` more writes, fail every one after them.
    pub fn fail_writes_after(&self, writes: usize) {
        self.modem.borrow_mut().writes_left = Some(writes);
    }

    pub fn pending(&self) -> usize {
        self.modem.borrow().rx.len()
    }

    fn schedule(&self, due: u32, bytes: &[u8]) {
        let mut modem = self.modem.borrow_mut();
        modem.rx.extend(bytes.iter().map(|b| (due, *b)));
    }

    fn arrived(&self, due: u32) -> bool {
        // Due times are always close to now, a wrapped difference is "late"
        crate::clock::elapsed(self.time.now(), due) < u32::MAX / 2
    }
}

impl ByteChannel for MockChannel {
    type Error = LineDown;

    fn available(&mut self) -> usize {
        let modem = self.modem.borrow();
        modem
            .rx
            .iter()
            .take_while(|(due, _)| self.arrived(*due))
            .count()
    }

    fn read_byte(&mut self) -> Option<u8> {
        let mut modem = self.modem.borrow_mut();
        let ready = matches!(modem.rx.front(), Some((due, _)) if self.arrived(*due));
        if ready {
            modem.rx.pop_front().map(|(_, b)| b)
        } else {
            None
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        let now = self.time.now();
        let step = {
            let mut modem = self.modem.borrow_mut();
            match modem.writes_left {
                Some(0) => return Err(LineDown),
                Some(n) => modem.writes_left = Some(n - 1),
                None => {}
            }
            modem.tx.push((now, bytes.to_vec()));
            modem.script.pop_front()
        };
        if let Some(Script::Reply(chunks)) = step {
            for (delay, chunk) in chunks {
                self.schedule(now.wrapping_add(delay), &chunk);
            }
        }
        Ok(())
    }

    fn flush_input(&mut self) {
        let arrived = self.available();
        self.modem.borrow_mut().rx.drain(..arrived).for_each(drop);
    }
}

pub type TestPort = AtPort<MockChannel, MockClock, MockDelay>;

/// A port on a fresh mock modem, plus a handle to script and inspect it.
pub fn test_port(time: &MockTime, config: Config) -> (TestPort, MockChannel) {
    init_logger();
    let channel = MockChannel::new(time);
    let port = AtPort::new(
        channel.clone(),
        MockClock::new(time),
        MockDelay::new(time),
        config,
    );
    (port, channel)
}

pub type TestDevice<'d> = Device<'d, MockChannel, MockClock, MockDelay>;

/// A device on a fresh mock modem, plus a handle to script and inspect it.
pub fn test_device<'d>(
    state: &'d State,
    time: &MockTime,
    config: Config,
) -> (TestDevice<'d>, MockChannel) {
    init_logger();
    let channel = MockChannel::new(time);
    let device = Device::new(
        state,
        channel.clone(),
        MockClock::new(time),
        MockDelay::new(time),
        config,
    );
    (device, channel)
}
