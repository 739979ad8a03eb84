use std::fmt::Debug;
use std::thread::sleep;
use std::time::Duration;

/// A source of blocking delays.
///
/// Implementations must block for **at least** the requested duration. Returning early breaks
/// every protocol that relies on fixed settle times instead of feedback from the device.
pub trait Delay: Debug {
    fn delay(&mut self, duration: Duration);
}

/// Blocks the calling thread using [std::thread::sleep].
///
/// The OS may oversleep, never undersleep, which is fine for minimum-duration waits.
#[derive(Copy, Clone, Debug, Default)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn delay(&mut self, duration: Duration) {
        sleep(duration);
    }
}
