//! Hardware seams shared by the firmware core and the drivers.
//!
//! Trait boundaries use `Box<dyn Error + Send + Sync>` so drivers can bring
//! their own error types; the core maps them to typed errors.
pub mod clock;

pub use clock::{Clock, MonotonicClock};

pub type HwResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Analog distance sensor behind an ADC.
pub trait Sensor {
    /// One raw conversion in ADC counts.
    fn read_raw(&mut self) -> HwResult<u16>;
}

/// Positional hobby servo.
pub trait Servo {
    /// Command the horn to `degrees` (0..=180).
    fn write_angle(&mut self, degrees: u8) -> HwResult<()>;
}

impl<T: Sensor + ?Sized> Sensor for Box<T> {
    fn read_raw(&mut self) -> HwResult<u16> {
        (**self).read_raw()
    }
}

impl<T: Servo + ?Sized> Servo for Box<T> {
    fn write_angle(&mut self, degrees: u8) -> HwResult<()> {
        (**self).write_angle(degrees)
    }
}
