mod gpio;

use crate::lcd::hd44780::command::{self, CLEAR_DISPLAY, CURSOR_HOME};
use crate::lcd::hd44780::{HD44780Timing, LcdResult, RegisterSelect};
pub use gpio::*;
use std::fmt::Debug;
use std::time::Duration;

/// Write-only HD44780 driver.
///
/// Implementors provide the raw byte transmission and a way to wait; every higher level command
/// is built on those and adds whatever extra settle time its instruction needs.
pub trait HD44780Driver: Debug {
    /// Sends a byte with RS set according to `mode`, then waits the settle time for that mode.
    fn send_byte(&mut self, byte: u8, mode: RegisterSelect) -> LcdResult<()>;

    /// Blocks for at least `duration`.
    fn wait(&mut self, duration: Duration);

    /// Gets the delays in use.
    fn timing(&self) -> &HD44780Timing;

    /// Sends an instruction, followed by another command settle.
    fn send_command(&mut self, command: u8) -> LcdResult<()> {
        self.send_byte(command, RegisterSelect::Command)?;
        let settle = self.timing().command;
        self.wait(settle);
        Ok(())
    }

    /// Writes a character at the cursor, followed by another write settle.
    ///
    /// The byte is sent as-is; which glyph it maps to is up to the controller's character ROM.
    fn send_char(&mut self, char: u8) -> LcdResult<()> {
        self.send_byte(char, RegisterSelect::Data)?;
        let settle = self.timing().write_data;
        self.wait(settle);
        Ok(())
    }

    /// Clears the display and sets the cursor to the home position.
    fn clear_screen(&mut self) -> LcdResult<()> {
        self.send_byte(CLEAR_DISPLAY, RegisterSelect::Command)?;
        let settle = self.timing().clear_display;
        self.wait(settle);
        Ok(())
    }

    /// Sets the cursor to the home position.
    fn return_cursor(&mut self) -> LcdResult<()> {
        self.send_byte(CURSOR_HOME, RegisterSelect::Command)?;
        let settle = self.timing().cursor_home;
        self.wait(settle);
        Ok(())
    }

    /// Sets the display on/off, cursor on/off, and blinking on/off.
    fn set_display_control(
        &mut self,
        display_on: bool,
        cursor_on: bool,
        blink_on: bool,
    ) -> LcdResult<()> {
        self.send_command(command::display_control(display_on, cursor_on, blink_on))
    }

    /// Sets the number of lines and the font. The bus width always stays 4-bit.
    fn function_set(&mut self, two_lines: bool, large_font: bool) -> LcdResult<()> {
        self.send_command(command::function_set_4bit(two_lines, large_font))
    }

    /// Clears the display, homes the cursor and writes `message` byte by byte.
    ///
    /// The cursor auto-increments after each character. Nothing is wrapped or truncated: whatever
    /// doesn't fit goes wherever the controller's address counter takes it.
    fn print_message(&mut self, message: &[u8]) -> LcdResult<()> {
        self.clear_screen()?;
        self.return_cursor()?;
        for &char in message {
            self.send_char(char)?;
        }
        Ok(())
    }
}
