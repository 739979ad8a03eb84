//! HD44780 instruction opcodes and flags.
//!
//! A command byte is a family opcode OR-ed with any of the flags belonging to that family,
//! e.g. `FUNCTION_SET | FUNCTION_4BIT | FUNCTION_2LINE | FUNCTION_5X7`. Nothing checks that the
//! flags match the family.

/// Clears the display and sets the cursor to the home position.
pub const CLEAR_DISPLAY: u8 = 0b0000_0001;
/// Sets the cursor to the home position and undoes any display shift.
pub const CURSOR_HOME: u8 = 0b0000_0010;
/// Function set opcode in 8-bit framing, sent three times to force a known bus width.
pub const SOFT_RESET: u8 = 0b0011_0000;

pub const DISPLAY_CONTROL: u8 = 0b0000_1000;
pub const DISPLAY_OFF: u8 = 0b0000_0000;
pub const DISPLAY_ON: u8 = 0b0000_0100;
pub const CURSOR_OFF: u8 = 0b0000_0000;
pub const CURSOR_ON: u8 = 0b0000_0010;
pub const BLINK_OFF: u8 = 0b0000_0000;
pub const BLINK_ON: u8 = 0b0000_0001;

pub const FUNCTION_SET: u8 = 0b0010_0000;
pub const FUNCTION_4BIT: u8 = 0b0000_0000;
pub const FUNCTION_8BIT: u8 = 0b0001_0000;
pub const FUNCTION_1LINE: u8 = 0b0000_0000;
pub const FUNCTION_2LINE: u8 = 0b0000_1000;
pub const FUNCTION_5X7: u8 = 0b0000_0000;
pub const FUNCTION_5X10: u8 = 0b0000_0100;

/// Composes a display control command.
pub fn display_control(display_on: bool, cursor_on: bool, blink_on: bool) -> u8 {
    let mut command = DISPLAY_CONTROL;
    command |= if display_on { DISPLAY_ON } else { DISPLAY_OFF };
    command |= if cursor_on { CURSOR_ON } else { CURSOR_OFF };
    command |= if blink_on { BLINK_ON } else { BLINK_OFF };
    command
}

/// Composes a function set command for a 4-bit bus.
pub fn function_set_4bit(two_lines: bool, large_font: bool) -> u8 {
    let mut command = FUNCTION_SET | FUNCTION_4BIT;
    command |= if two_lines { FUNCTION_2LINE } else { FUNCTION_1LINE };
    command |= if large_font { FUNCTION_5X10 } else { FUNCTION_5X7 };
    command
}
