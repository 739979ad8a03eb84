use charlcd_gpio::lcd::hd44780::LcdResult;
use charlcd_gpio::lcd::hd44780::driver::HD44780Driver;
use eyre::{WrapErr, eyre};
use log::warn;

/// Parses exactly `N` line numbers, separated by commas, semicolons or whitespace.
pub fn parse_pins<const N: usize>(pin_str: &str) -> eyre::Result<[usize; N]> {
    let pins = pin_str
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .wrap_err_with(|| format!("Invalid pin number {:?}", s))
        })
        .collect::<eyre::Result<Vec<_>>>()?;

    let count = pins.len();
    pins.try_into()
        .map_err(|_| eyre!("Expected {} pins, got {} in {:?}", N, count, pin_str))
}

/// Encodes text for the display's character ROM, which only reliably matches ASCII.
///
/// Anything else becomes `?`.
pub fn to_lcd_bytes(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| {
            if c.is_ascii() {
                c as u8
            } else {
                warn!("Non-ASCII character: {}", c);
                b'?'
            }
        })
        .collect()
}

pub trait DisplayExt {
    /// Clears the display and prints `s` from the home position.
    fn print(&mut self, s: &str) -> LcdResult<()>;
}

impl<T: ?Sized + HD44780Driver> DisplayExt for T {
    fn print(&mut self, s: &str) -> LcdResult<()> {
        self.print_message(&to_lcd_bytes(s))
    }
}
