use crate::delay::{Delay, ThreadDelay};
use crate::lcd::hd44780::command::{self, SOFT_RESET};
use crate::lcd::hd44780::driver::HD44780Driver;
use crate::lcd::hd44780::{HD44780Timing, LcdError, LcdPins, LcdResult, PinRole, RegisterSelect};
use crate::{GpioDriver, GpioOutput};
use log::{debug, trace};
use std::time::Duration;

/// HD44780 driver bit-banging a 4-bit bus over GPIO outputs.
///
/// The controller is initialized as part of construction, so an instance that exists is ready
/// to take commands. All waits go through the [Delay] it was built with and block the caller.
/// Not meant to be shared: interleaving two transmissions breaks the nibble pairing.
#[derive(Debug)]
pub struct GpioHD44780Driver<'a> {
    pin_e: Box<dyn GpioOutput + 'a>,
    pin_rs: Box<dyn GpioOutput + 'a>,
    /// D4, D5, D6, D7.
    data_bus: [Box<dyn GpioOutput + 'a>; 4],
    delay: Box<dyn Delay + 'a>,
    timing: HD44780Timing,
}

impl<'a> GpioHD44780Driver<'a> {
    /// Creates a driver on already configured outputs and initializes the display.
    ///
    /// # Parameters
    ///
    /// - `pin_e`: Enable output pin.
    /// - `pin_rs`: Register select output pin.
    /// - `data_bus`: D4, D5, D6 and D7 output pins, in that order.
    /// - `delay`: Used for every wait, including the ones inside the enable pulse.
    /// - `timing`: The delays to wait, [HD44780Timing::default] fits a genuine HD44780.
    pub fn new(
        pin_e: Box<dyn GpioOutput + 'a>,
        pin_rs: Box<dyn GpioOutput + 'a>,
        data_bus: [Box<dyn GpioOutput + 'a>; 4],
        delay: impl Delay + 'a,
        timing: HD44780Timing,
    ) -> LcdResult<Self> {
        let mut driver = GpioHD44780Driver {
            pin_e,
            pin_rs,
            data_bus,
            delay: Box::new(delay),
            timing,
        };
        driver.init()?;
        Ok(driver)
    }

    /// Claims the lines in `pins` from `gpio` and initializes the display, sleeping the thread
    /// for every wait.
    ///
    /// Fails before anything is sent if a line is listed twice or can't be claimed.
    pub fn open(gpio: &'a dyn GpioDriver, pins: LcdPins, timing: HD44780Timing) -> LcdResult<Self> {
        pins.validate()?;
        debug!("Claiming LCD lines {:?} from {:?}", pins, gpio);

        let claim = |role: PinRole, index: usize| {
            gpio.get_output(index)
                .map_err(|source| LcdError::PinAcquisition { role, index, source })
        };

        let pin_e = claim(PinRole::Enable, pins.enable)?;
        let pin_rs = claim(PinRole::RegisterSelect, pins.register_select)?;
        let data_bus = [
            claim(PinRole::D4, pins.data[0])?,
            claim(PinRole::D5, pins.data[1])?,
            claim(PinRole::D6, pins.data[2])?,
            claim(PinRole::D7, pins.data[3])?,
        ];

        Self::new(pin_e, pin_rs, data_bus, ThreadDelay, timing)
    }

    fn init(&mut self) -> LcdResult<()> {
        debug!("Initializing HD44780...");

        // Power-up settle
        self.wait(self.timing.bootup);

        // Three soft resets, still in 8-bit framing, so only the high nibble goes out
        self.set_mode(RegisterSelect::Command)?;
        for settle in self.timing.soft_reset {
            self.send_half_byte(SOFT_RESET >> 4)?;
            self.wait(settle);
        }

        // Switch to 4-bit; everything from here on is sent as two nibbles
        self.send_half_byte(command::function_set_4bit(false, false) >> 4)?;
        self.wait(self.timing.set_4bit_mode);

        self.function_set(true, false)?;
        self.set_display_control(true, false, false)?;
        self.clear_screen()?;
        self.return_cursor()?;

        debug!("HD44780 initialized.");
        Ok(())
    }

    fn set_mode(&mut self, mode: RegisterSelect) -> LcdResult<()> {
        self.pin_rs.write(mode.level())?;
        Ok(())
    }

    fn pulse_e(&mut self) -> LcdResult<()> {
        // Data is sampled while E is high and latched on the falling edge
        self.pin_e.write(true)?;
        self.delay.delay(self.timing.enable_pulse);
        self.pin_e.write(false)?;
        self.delay.delay(self.timing.enable_pulse);
        Ok(())
    }

    fn send_half_byte(&mut self, nibble: u8) -> LcdResult<()> {
        trace!("Writing nibble: {:04b}", nibble & 0x0F);
        // D7 first, down to D4
        for bit in (0..4).rev() {
            self.data_bus[bit].write(nibble & (1 << bit) != 0)?;
        }
        self.pulse_e()
    }
}

impl HD44780Driver for GpioHD44780Driver<'_> {
    fn send_byte(&mut self, byte: u8, mode: RegisterSelect) -> LcdResult<()> {
        trace!("Sending byte: {:08b}, mode: {:?}", byte, mode);

        self.set_mode(mode)?;

        let high_nibble = (byte >> 4) & 0x0F;
        let low_nibble = byte & 0x0F;
        self.send_half_byte(high_nibble)?;
        self.send_half_byte(low_nibble)?;

        let settle = match mode {
            RegisterSelect::Data => self.timing.write_data,
            RegisterSelect::Command => self.timing.command,
        };
        self.wait(settle);
        Ok(())
    }

    fn wait(&mut self, duration: Duration) {
        self.delay.delay(duration);
    }

    fn timing(&self) -> &HD44780Timing {
        &self.timing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GpioError;
    use crate::mock::{Frame, RecordingBus, bytes, nibbles};
    use crate::lcd::hd44780::RegisterSelect::{Command, Data};

    const PINS: LcdPins = LcdPins {
        enable: 17,
        register_select: 22,
        data: [26, 16, 20, 21],
    };

    fn driver(bus: &RecordingBus, timing: HD44780Timing) -> GpioHD44780Driver<'static> {
        GpioHD44780Driver::new(
            Box::new(bus.output(PINS.enable)),
            Box::new(bus.output(PINS.register_select)),
            PINS.data.map(|pin| Box::new(bus.output(pin)) as Box<dyn GpioOutput>),
            bus.delay(),
            timing,
        )
        .unwrap()
    }

    /// A driver past its init sequence, with the recording emptied.
    fn ready_driver(bus: &RecordingBus) -> GpioHD44780Driver<'static> {
        let lcd = driver(bus, HD44780Timing::default());
        bus.clear();
        lcd
    }

    fn idle_after_last_nibble(frames: &[Frame]) -> Duration {
        match frames.last() {
            Some(Frame::Idle(idle)) => *idle,
            other => panic!("expected trailing idle, got {:?}", other),
        }
    }

    #[test]
    fn send_byte_sends_high_nibble_first() {
        let bus = RecordingBus::new(32);
        let mut lcd = ready_driver(&bus);

        for b in 0..=u8::MAX {
            bus.clear();
            lcd.send_byte(b, Data).unwrap();
            assert_eq!(
                nibbles(&bus.frames(&PINS)),
                vec![(Data, (b >> 4) & 0xF), (Data, b & 0xF)],
                "byte {:#04x}",
                b
            );
        }
    }

    #[test]
    fn every_nibble_gets_one_full_enable_pulse() {
        let bus = RecordingBus::new(32);
        let timing = HD44780Timing::default();
        let mut lcd = ready_driver(&bus);

        lcd.print_message(b"Hi!").unwrap();

        let frames = bus.frames(&PINS);
        // clear, home and three characters
        assert_eq!(nibbles(&frames).len(), 10);
        for frame in frames {
            if let Frame::Nibble { high, low, .. } = frame {
                assert!(high >= timing.enable_pulse);
                assert!(low >= timing.enable_pulse);
            }
        }
    }

    #[test]
    fn send_byte_settles_per_mode() {
        let bus = RecordingBus::new(32);
        let timing = HD44780Timing::default();
        let mut lcd = ready_driver(&bus);

        lcd.send_byte(0x28, Command).unwrap();
        assert!(idle_after_last_nibble(&bus.frames(&PINS)) >= timing.command);

        bus.clear();
        lcd.send_byte(b'x', Data).unwrap();
        assert!(idle_after_last_nibble(&bus.frames(&PINS)) >= timing.write_data);
    }

    #[test]
    fn clear_screen_waits_longer_than_a_command() {
        let bus = RecordingBus::new(32);
        let timing = HD44780Timing::default();
        let mut lcd = ready_driver(&bus);

        lcd.clear_screen().unwrap();

        let frames = bus.frames(&PINS);
        assert_eq!(bytes(&frames), vec![(Command, 0x01)]);
        let idle = idle_after_last_nibble(&frames);
        assert!(idle >= timing.clear_display);
        assert!(idle > timing.command);
    }

    #[test]
    fn clear_screen_is_repeatable() {
        let bus = RecordingBus::new(32);
        let mut lcd = ready_driver(&bus);

        lcd.print_message(b"move the cursor").unwrap();
        bus.clear();
        lcd.clear_screen().unwrap();
        let first = bus.events();
        bus.clear();
        lcd.clear_screen().unwrap();
        assert_eq!(bus.events(), first);
    }

    #[test]
    fn print_message_clears_homes_then_writes() {
        let bus = RecordingBus::new(32);
        let mut lcd = ready_driver(&bus);

        lcd.print_message(b"AB").unwrap();

        assert_eq!(
            bytes(&bus.frames(&PINS)),
            vec![(Command, 0x01), (Command, 0x02), (Data, b'A'), (Data, b'B')]
        );
    }

    #[test]
    fn print_empty_message_only_clears_and_homes() {
        let bus = RecordingBus::new(32);
        let mut lcd = ready_driver(&bus);

        lcd.print_message(b"").unwrap();

        assert_eq!(
            bytes(&bus.frames(&PINS)),
            vec![(Command, 0x01), (Command, 0x02)]
        );
    }

    #[test]
    fn send_char_and_send_command_add_headroom() {
        let bus = RecordingBus::new(32);
        let timing = HD44780Timing::default();
        let mut lcd = ready_driver(&bus);

        lcd.send_char(b'a').unwrap();
        assert_eq!(
            idle_after_last_nibble(&bus.frames(&PINS)),
            timing.write_data * 2
        );

        bus.clear();
        lcd.send_command(0x0F).unwrap();
        assert_eq!(idle_after_last_nibble(&bus.frames(&PINS)), timing.command * 2);
    }

    #[test]
    fn init_sequence_order() {
        let bus = RecordingBus::new(32);
        let timing = HD44780Timing::default();
        let _lcd = driver(&bus, timing);

        let frames = bus.frames(&PINS);
        let settle = |frame: &Frame| match *frame {
            Frame::Idle(idle) => idle,
            _ => Duration::ZERO,
        };

        assert_eq!(frames[0], Frame::Idle(timing.bootup));
        // three resets and the 4-bit switch, each a lone nibble
        let lone = [
            (0x3, timing.soft_reset[0]),
            (0x3, timing.soft_reset[1]),
            (0x3, timing.soft_reset[2]),
            (0x2, timing.set_4bit_mode),
        ];
        for (i, (value, wait)) in lone.into_iter().enumerate() {
            let nibble = frames[1 + i * 2];
            assert!(
                matches!(nibble, Frame::Nibble { mode: Command, value: v, .. } if v == value),
                "frame {}: {:?}",
                1 + i * 2,
                nibble
            );
            assert_eq!(settle(&frames[2 + i * 2]), wait);
        }

        assert_eq!(
            bytes(&frames[9..]),
            vec![
                (Command, 0x28),
                (Command, 0x0C),
                (Command, 0x01),
                (Command, 0x02),
            ]
        );
    }

    #[test]
    fn custom_timing_is_used() {
        let bus = RecordingBus::new(32);
        let timing = HD44780Timing::default().scaled(3.0).unwrap();
        let mut lcd = driver(&bus, timing);
        bus.clear();

        lcd.return_cursor().unwrap();

        let frames = bus.frames(&PINS);
        assert!(matches!(
            frames[0],
            Frame::Nibble { high, .. } if high == timing.enable_pulse
        ));
        assert_eq!(
            idle_after_last_nibble(&frames),
            timing.command + timing.cursor_home
        );
        assert_eq!(lcd.timing(), &timing);
    }

    #[test]
    fn open_claims_lines_and_initializes() {
        let bus = RecordingBus::new(32);
        let lcd = GpioHD44780Driver::open(&bus, PINS, HD44780Timing::zero())
            .unwrap();

        for (_, index) in PINS.roles() {
            assert!(bus.is_claimed(index));
        }
        // four lone init nibbles, then function set, display control, clear and home
        assert_eq!(nibbles(&bus.frames(&PINS)).len(), 12);

        drop(lcd);
        assert!(!bus.is_claimed(PINS.enable));
    }

    #[test]
    fn open_reports_unavailable_line() {
        let bus = RecordingBus::new(24);
        let err = GpioHD44780Driver::open(&bus, PINS, HD44780Timing::default()).unwrap_err();

        assert_eq!(
            err,
            LcdError::PinAcquisition {
                role: PinRole::D4,
                index: 26,
                source: GpioError::InvalidArgument,
            }
        );
        assert!(bus.events().is_empty());
        assert!(!bus.is_claimed(PINS.enable));
    }

    #[test]
    fn open_rejects_shared_lines() {
        let bus = RecordingBus::new(32);
        let pins = LcdPins {
            register_select: PINS.enable,
            ..PINS
        };
        let err = GpioHD44780Driver::open(&bus, pins, HD44780Timing::default()).unwrap_err();

        assert!(matches!(err, LcdError::DuplicatePin { index: 17, .. }));
        assert!(bus.events().is_empty());
    }

    #[test]
    fn write_failure_is_propagated() {
        let bus = RecordingBus::new(32);
        let mut lcd = ready_driver(&bus);
        bus.fail_writes_to(PINS.data[3]);

        let err = lcd.send_char(b'A').unwrap_err();
        assert!(matches!(err, LcdError::Bus(GpioError::Other(_))));
    }
}
