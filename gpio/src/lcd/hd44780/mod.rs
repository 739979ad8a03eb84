//! HD44780 character LCD over a write-only 4-bit GPIO bus.
//!
//! Six lines are used: E, RS and D4-D7. R/W is expected to be tied to ground, so the busy flag is
//! never read and every instruction is followed by a fixed wait instead (see [HD44780Timing]).
//! If the host can't honour those waits, e.g. the thread gets preempted between two nibbles, the
//! controller may silently misread what follows. Nothing here can detect that.
pub mod command;
pub mod driver;
mod timing;

use crate::GpioError;
use std::fmt::{Display, Formatter};
use thiserror::Error;
pub use timing::*;

/// The role a GPIO line plays on the LCD bus.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PinRole {
    Enable,
    RegisterSelect,
    D4,
    D5,
    D6,
    D7,
}

impl PinRole {
    /// Data lines in nibble bit order, bit 0 first.
    pub const DATA: [PinRole; 4] = [PinRole::D4, PinRole::D5, PinRole::D6, PinRole::D7];
}

impl Display for PinRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PinRole::Enable => "E",
            PinRole::RegisterSelect => "RS",
            PinRole::D4 => "D4",
            PinRole::D5 => "D5",
            PinRole::D6 => "D6",
            PinRole::D7 => "D7",
        };
        f.write_str(name)
    }
}

/// GPIO line numbers the LCD is wired to.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LcdPins {
    pub enable: usize,
    pub register_select: usize,
    /// D4, D5, D6, D7.
    pub data: [usize; 4],
}

impl LcdPins {
    /// Every line paired with its role, E and RS first.
    pub fn roles(&self) -> [(PinRole, usize); 6] {
        [
            (PinRole::Enable, self.enable),
            (PinRole::RegisterSelect, self.register_select),
            (PinRole::D4, self.data[0]),
            (PinRole::D5, self.data[1]),
            (PinRole::D6, self.data[2]),
            (PinRole::D7, self.data[3]),
        ]
    }

    /// Checks that no line is assigned to two roles.
    pub fn validate(&self) -> LcdResult<()> {
        let roles = self.roles();
        for (i, &(first, index)) in roles.iter().enumerate() {
            if let Some(&(second, _)) = roles[i + 1..].iter().find(|(_, other)| *other == index) {
                return Err(LcdError::DuplicatePin { index, first, second });
            }
        }
        Ok(())
    }
}

/// What the controller makes of the byte on the bus, selected by the RS line.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RegisterSelect {
    /// RS low, the byte is an instruction.
    Command,
    /// RS high, the byte is a character written at the cursor.
    Data,
}

impl RegisterSelect {
    pub fn level(self) -> bool {
        matches!(self, RegisterSelect::Data)
    }
}

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum LcdError {
    #[error("GPIO {index} is assigned to both {first} and {second}")]
    DuplicatePin {
        index: usize,
        first: PinRole,
        second: PinRole,
    },
    #[error("failed to claim GPIO {index} for {role}: {source}")]
    PinAcquisition {
        role: PinRole,
        index: usize,
        #[source]
        source: GpioError,
    },
    #[error("bus write failed: {0}")]
    Bus(#[from] GpioError),
}

pub type LcdResult<T> = Result<T, LcdError>;
