use std::time::Duration;

/// Delays the driver waits between bus operations.
///
/// The controller is never polled for its busy flag, so each of these must cover the worst case
/// for the controller in use. The [Default] values are the HD44780 datasheet figures with a bit
/// of headroom; slower clones may need them raised, never lowered below the documented minimums.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct HD44780Timing {
    /// Wait after power-up before the first transmission. Minimum 15 ms.
    pub bootup: Duration,
    /// How long E is held high, and then low, for every nibble. Minimum ~1 µs, 20 µs default.
    pub enable_pulse: Duration,
    /// Settle after a data (RS high) byte. Minimum ~46 µs, 460 µs default.
    pub write_data: Duration,
    /// Settle after a command (RS low) byte. Minimum ~42 µs, 420 µs default.
    pub command: Duration,
    /// Settle after each of the three soft resets: 5 ms, then 1 ms, then 1 ms.
    pub soft_reset: [Duration; 3],
    /// Settle after switching the bus to 4-bit mode. Minimum 5 ms.
    pub set_4bit_mode: Duration,
    /// Extra settle after clearing the display. Must be longer than [Self::command]; 2 ms default.
    pub clear_display: Duration,
    /// Extra settle after returning the cursor home. 2 ms default.
    pub cursor_home: Duration,
}

impl Default for HD44780Timing {
    fn default() -> Self {
        HD44780Timing {
            bootup: Duration::from_millis(15),
            enable_pulse: Duration::from_micros(20),
            write_data: Duration::from_micros(460),
            command: Duration::from_micros(420),
            soft_reset: [
                Duration::from_millis(5),
                Duration::from_millis(1),
                Duration::from_millis(1),
            ],
            set_4bit_mode: Duration::from_millis(5),
            clear_display: Duration::from_millis(2),
            cursor_home: Duration::from_millis(2),
        }
    }
}

impl HD44780Timing {
    /// No waits at all. Only useful with a [Delay](crate::delay::Delay) that doesn't really
    /// sleep, like the recording one in [mock](crate::mock); a real controller won't keep up.
    pub fn zero() -> Self {
        HD44780Timing {
            bootup: Duration::ZERO,
            enable_pulse: Duration::ZERO,
            write_data: Duration::ZERO,
            command: Duration::ZERO,
            soft_reset: [Duration::ZERO; 3],
            set_4bit_mode: Duration::ZERO,
            clear_display: Duration::ZERO,
            cursor_home: Duration::ZERO,
        }
    }

    /// Scales every delay by `factor`, e.g. `2.0` for a controller running at half the clock.
    ///
    /// Results are rounded up to the next nanosecond. Returns `None` unless `factor` is finite
    /// and positive, since anything else would wipe out the waits.
    pub fn scaled(self, factor: f64) -> Option<Self> {
        if !factor.is_finite() || factor <= 0.0 {
            return None;
        }
        let scale = |d: Duration| Duration::from_nanos((d.as_nanos() as f64 * factor).ceil() as u64);
        Some(HD44780Timing {
            bootup: scale(self.bootup),
            enable_pulse: scale(self.enable_pulse),
            write_data: scale(self.write_data),
            command: scale(self.command),
            soft_reset: self.soft_reset.map(scale),
            set_4bit_mode: scale(self.set_4bit_mode),
            clear_display: scale(self.clear_display),
            cursor_home: scale(self.cursor_home),
        })
    }
}
