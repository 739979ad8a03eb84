//! In-memory GPIO bus that records what is done to it, for testing drivers without hardware.
//!
//! A [RecordingBus] hands out outputs and a delay that all append to one shared event log, so
//! the exact interleaving of pin writes and waits can be checked afterwards. [decode] turns that
//! log back into what an HD44780 would have latched.
use crate::delay::Delay;
use crate::lcd::hd44780::{LcdPins, RegisterSelect};
use crate::{GpioDriver, GpioError, GpioOutput, GpioResult};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt::{Debug, Formatter};
use std::rc::Rc;
use std::time::Duration;

/// A single thing that happened on the bus.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BusEvent {
    Write { pin: usize, level: bool },
    Delay(Duration),
}

#[derive(Debug, Default)]
struct Shared {
    events: Vec<BusEvent>,
    claimed: HashSet<usize>,
    failing: HashSet<usize>,
}

/// Fake GPIO chip with `count` lines.
#[derive(Clone)]
pub struct RecordingBus {
    shared: Rc<RefCell<Shared>>,
    count: usize,
}

impl RecordingBus {
    pub fn new(count: usize) -> Self {
        RecordingBus {
            shared: Rc::default(),
            count,
        }
    }

    /// Gets an output for `pin` without claiming it.
    pub fn output(&self, pin: usize) -> RecordingOutput {
        RecordingOutput {
            shared: self.shared.clone(),
            pin,
            claimed: false,
        }
    }

    /// Gets a delay that records instead of sleeping.
    pub fn delay(&self) -> RecordingDelay {
        RecordingDelay {
            shared: self.shared.clone(),
        }
    }

    /// Makes every following write to `pin` fail.
    pub fn fail_writes_to(&self, pin: usize) {
        self.shared.borrow_mut().failing.insert(pin);
    }

    pub fn events(&self) -> Vec<BusEvent> {
        self.shared.borrow().events.clone()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.shared.borrow_mut().events.clear();
    }

    /// Decodes everything recorded so far, see [decode].
    pub fn frames(&self, pins: &LcdPins) -> Vec<Frame> {
        decode(&self.shared.borrow().events, pins)
    }

    pub fn is_claimed(&self, pin: usize) -> bool {
        self.shared.borrow().claimed.contains(&pin)
    }
}

impl Debug for RecordingBus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecordingBus({})", self.count)
    }
}

impl GpioDriver for RecordingBus {
    fn count(&self) -> GpioResult<usize> {
        Ok(self.count)
    }

    fn get_output(&self, index: usize) -> GpioResult<Box<dyn GpioOutput + '_>> {
        if index >= self.count {
            return Err(GpioError::InvalidArgument);
        }

        if !self.shared.borrow_mut().claimed.insert(index) {
            return Err(GpioError::AlreadyInUse);
        }

        Ok(Box::new(RecordingOutput {
            shared: self.shared.clone(),
            pin: index,
            claimed: true,
        }))
    }
}

pub struct RecordingOutput {
    shared: Rc<RefCell<Shared>>,
    pin: usize,
    claimed: bool,
}

impl Debug for RecordingOutput {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecordingBus[{}][output]", self.pin)
    }
}

impl GpioOutput for RecordingOutput {
    fn write(&self, value: bool) -> GpioResult<()> {
        let mut shared = self.shared.borrow_mut();
        if shared.failing.contains(&self.pin) {
            return Err(GpioError::Other(format!("line {} is broken", self.pin)));
        }
        shared.events.push(BusEvent::Write {
            pin: self.pin,
            level: value,
        });
        Ok(())
    }
}

impl Drop for RecordingOutput {
    fn drop(&mut self) {
        if self.claimed {
            self.shared.borrow_mut().claimed.remove(&self.pin);
        }
    }
}

pub struct RecordingDelay {
    shared: Rc<RefCell<Shared>>,
}

impl Debug for RecordingDelay {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecordingBus[delay]")
    }
}

impl Delay for RecordingDelay {
    fn delay(&mut self, duration: Duration) {
        self.shared.borrow_mut().events.push(BusEvent::Delay(duration));
    }
}

/// What the controller saw, reconstructed from a recording.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Frame {
    /// One E pulse. `value` is D7..D4 as bits 3..0 at the rising edge, `high` and `low` are how
    /// long E was held at each level.
    Nibble {
        mode: RegisterSelect,
        value: u8,
        high: Duration,
        low: Duration,
    },
    /// Time spent waiting outside of any E pulse. Consecutive waits are merged.
    Idle(Duration),
}

struct Pulse {
    mode: RegisterSelect,
    value: u8,
    high: Duration,
    fallen: bool,
}

impl Pulse {
    fn into_frame(self, low: Duration) -> Frame {
        Frame::Nibble {
            mode: self.mode,
            value: self.value,
            high: self.high,
            low,
        }
    }
}

/// Decodes recorded events into E pulses and idle time.
///
/// A pulse's low hold is the first wait after its falling edge; any later wait counts as idle.
/// All lines start out low.
pub fn decode(events: &[BusEvent], pins: &LcdPins) -> Vec<Frame> {
    let mut levels: HashMap<usize, bool> = HashMap::new();
    let mut frames = Vec::new();
    let mut pulse: Option<Pulse> = None;

    for event in events {
        match *event {
            BusEvent::Write { pin, level } => {
                let previous = levels.get(&pin).copied().unwrap_or(false);
                levels.insert(pin, level);

                if pin == pins.enable {
                    if level && !previous {
                        if let Some(p) = pulse.take() {
                            frames.push(p.into_frame(Duration::ZERO));
                        }
                        let bit = |i: usize| levels.get(&pins.data[i]).copied().unwrap_or(false);
                        let value = (0..4).fold(0u8, |acc, i| acc | (bit(i) as u8) << i);
                        let rs = levels.get(&pins.register_select).copied().unwrap_or(false);
                        pulse = Some(Pulse {
                            mode: if rs { RegisterSelect::Data } else { RegisterSelect::Command },
                            value,
                            high: Duration::ZERO,
                            fallen: false,
                        });
                    } else if !level {
                        if let Some(p) = pulse.as_mut() {
                            p.fallen = true;
                        }
                    }
                } else if pulse.as_ref().is_some_and(|p| p.fallen) {
                    if let Some(p) = pulse.take() {
                        frames.push(p.into_frame(Duration::ZERO));
                    }
                }
            }
            BusEvent::Delay(duration) => match pulse.take() {
                Some(mut p) if !p.fallen => {
                    p.high += duration;
                    pulse = Some(p);
                }
                Some(p) => frames.push(p.into_frame(duration)),
                None => match frames.last_mut() {
                    Some(Frame::Idle(idle)) => *idle += duration,
                    _ => frames.push(Frame::Idle(duration)),
                },
            },
        }
    }

    if let Some(p) = pulse {
        frames.push(p.into_frame(Duration::ZERO));
    }

    frames
}

/// Keeps only the nibbles, dropping timing.
pub fn nibbles(frames: &[Frame]) -> Vec<(RegisterSelect, u8)> {
    frames
        .iter()
        .filter_map(|frame| match *frame {
            Frame::Nibble { mode, value, .. } => Some((mode, value)),
            Frame::Idle(_) => None,
        })
        .collect()
}

/// Pairs up nibbles into bytes, high nibble first. A trailing unpaired nibble is dropped.
pub fn bytes(frames: &[Frame]) -> Vec<(RegisterSelect, u8)> {
    nibbles(frames)
        .chunks_exact(2)
        .map(|pair| (pair[0].0, pair[0].1 << 4 | pair[1].1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PINS: LcdPins = LcdPins {
        enable: 0,
        register_select: 1,
        data: [2, 3, 4, 5],
    };

    fn write(pin: usize, level: bool) -> BusEvent {
        BusEvent::Write { pin, level }
    }

    #[test]
    fn decodes_pulse_and_merges_idle() {
        let us = Duration::from_micros;
        let events = [
            write(1, true),
            write(5, true),
            write(2, true),
            write(0, true),
            BusEvent::Delay(us(20)),
            write(0, false),
            BusEvent::Delay(us(30)),
            BusEvent::Delay(us(100)),
            BusEvent::Delay(us(5)),
        ];
        assert_eq!(
            decode(&events, &PINS),
            vec![
                Frame::Nibble {
                    mode: RegisterSelect::Data,
                    value: 0b1001,
                    high: us(20),
                    low: us(30),
                },
                Frame::Idle(us(105)),
            ]
        );
    }

    #[test]
    fn claims_are_exclusive_until_dropped() {
        let bus = RecordingBus::new(4);
        let output = bus.get_output(2).unwrap();
        assert_eq!(bus.get_output(2).unwrap_err(), GpioError::AlreadyInUse);
        assert_eq!(bus.get_output(4).unwrap_err(), GpioError::InvalidArgument);
        drop(output);
        assert!(!bus.is_claimed(2));
        assert!(bus.get_output(2).is_ok());
    }

    #[test]
    fn failing_line_reports_error_and_records_nothing() {
        let bus = RecordingBus::new(4);
        bus.fail_writes_to(3);
        assert!(bus.output(3).write(true).is_err());
        assert!(bus.output(2).write(true).is_ok());
        assert_eq!(bus.events(), vec![write(2, true)]);
    }
}
