//! Host-side fakes sharing one event timeline.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::blocking::i2c::{Write, WriteRead};
use embedded_hal::digital::v2::{InputPin, OutputPin};
use embedded_hal_async::delay::DelayNs;

use crate::pca9685::ADDRESS;
use crate::sensors::{PulseIn, PulseLevel};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BusFault;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Register { reg: u8, value: u8 },
    Read { reg: u8 },
    Pwm { channel: u8, on: u16, off: u16 },
    DelayMs(u32),
    DelayUs(u32),
    Pin { id: u8, high: bool },
    PulseIn { level: PulseLevel, timeout_us: u32 },
}

#[derive(Default)]
struct State {
    events: Vec<Event>,
    raw_writes: Vec<Vec<u8>>,
    mode1: u8,
    fail_bus: bool,
    echoes: VecDeque<u32>,
}

#[derive(Clone, Default)]
pub struct Timeline {
    state: Rc<RefCell<State>>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn i2c(&self) -> FakeI2c {
        FakeI2c {
            state: self.state.clone(),
        }
    }

    pub fn delay(&self) -> FakeDelay {
        FakeDelay {
            state: self.state.clone(),
        }
    }

    pub fn output(&self, id: u8) -> FakeOutput {
        FakeOutput {
            id,
            state: self.state.clone(),
        }
    }

    pub fn echo(&self) -> FakeEcho {
        FakeEcho {
            state: self.state.clone(),
        }
    }

    pub fn set_mode1(&self, value: u8) {
        self.state.borrow_mut().mode1 = value;
    }

    pub fn fail_bus(&self) {
        self.state.borrow_mut().fail_bus = true;
    }

    /// Queue echo widths (µs) returned by successive pulse measurements.
    pub fn push_echoes(&self, widths: &[u32]) {
        self.state.borrow_mut().echoes.extend(widths.iter().copied());
    }

    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.events.clear();
        state.raw_writes.clear();
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.borrow().events.clone()
    }

    pub fn raw_writes(&self) -> Vec<Vec<u8>> {
        self.state.borrow().raw_writes.clone()
    }

    pub fn register_writes(&self) -> Vec<(u8, u8)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Register { reg, value } => Some((reg, value)),
                _ => None,
            })
            .collect()
    }

    pub fn pwm_writes(&self) -> Vec<(u8, u16, u16)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Pwm { channel, on, off } => Some((channel, on, off)),
                _ => None,
            })
            .collect()
    }

    /// Events with the initialization sequence (register traffic) dropped.
    pub fn motion(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| {
                !matches!(
                    e,
                    Event::Register { .. } | Event::Read { .. } | Event::DelayUs(_)
                )
            })
            .collect()
    }

    pub fn total_delay_ms(&self) -> u32 {
        self.events()
            .into_iter()
            .map(|e| match e {
                Event::DelayMs(ms) => ms,
                _ => 0,
            })
            .sum()
    }
}

pub struct FakeI2c {
    state: Rc<RefCell<State>>,
}

impl Write for FakeI2c {
    type Error = BusFault;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        assert_eq!(address, ADDRESS);
        let mut state = self.state.borrow_mut();
        if state.fail_bus {
            return Err(BusFault);
        }
        state.raw_writes.push(bytes.to_vec());
        let event = match *bytes {
            [reg, value] => Event::Register { reg, value },
            [reg, on_l, on_h, off_l, off_h] => Event::Pwm {
                channel: (reg - 0x06) / 4,
                on: u16::from_le_bytes([on_l, on_h]),
                off: u16::from_le_bytes([off_l, off_h]),
            },
            _ => panic!("unexpected write {:?}", bytes),
        };
        state.events.push(event);
        Ok(())
    }
}

impl WriteRead for FakeI2c {
    type Error = BusFault;

    fn write_read(&mut self, address: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), Self::Error> {
        assert_eq!(address, ADDRESS);
        let mut state = self.state.borrow_mut();
        if state.fail_bus {
            return Err(BusFault);
        }
        state.events.push(Event::Read { reg: bytes[0] });
        buffer[0] = state.mode1;
        Ok(())
    }
}

pub struct FakeDelay {
    state: Rc<RefCell<State>>,
}

impl DelayNs for FakeDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.state.borrow_mut().events.push(Event::DelayUs(ns / 1_000));
    }

    async fn delay_us(&mut self, us: u32) {
        self.state.borrow_mut().events.push(Event::DelayUs(us));
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.state.borrow_mut().events.push(Event::DelayMs(ms));
    }
}

pub struct FakeOutput {
    id: u8,
    state: Rc<RefCell<State>>,
}

impl OutputPin for FakeOutput {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.state.borrow_mut().events.push(Event::Pin { id: self.id, high: false });
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.state.borrow_mut().events.push(Event::Pin { id: self.id, high: true });
        Ok(())
    }
}

/// Input pin with a fixed level.
pub struct FakeInput(pub bool);

impl InputPin for FakeInput {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Self::Error> {
        Ok(self.0)
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        Ok(!self.0)
    }
}

/// Input pin whose read always fails.
pub struct BrokenInput;

impl InputPin for BrokenInput {
    type Error = ();

    fn is_high(&self) -> Result<bool, Self::Error> {
        Err(())
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        Err(())
    }
}

/// Echo line replaying queued pulse widths; 0 (timeout) once exhausted.
pub struct FakeEcho {
    state: Rc<RefCell<State>>,
}

impl PulseIn for FakeEcho {
    type Error = Infallible;

    async fn pulse_in(&mut self, level: PulseLevel, timeout_us: u32) -> Result<u32, Self::Error> {
        let mut state = self.state.borrow_mut();
        state.events.push(Event::PulseIn { level, timeout_us });
        Ok(state.echoes.pop_front().unwrap_or(0))
    }
}
