pub mod hd44780;
pub mod pcf8574;

/// Trait for an 8-bit output register reachable over a serial bus, such as the
/// PCF8574 quasi-bidirectional port. Every write replaces all 8 output lines at
/// once, so callers must always supply the complete register value.
pub trait ExpanderPort {
    /// Error reported by the underlying transport (NACK, timeout, disconnect).
    type Error;

    /// Writes the full register value to the expander.
    fn write(&mut self, value: u8) -> Result<(), Self::Error>;

    /// Reads the register value from the expander.
    fn read(&mut self) -> Result<u8, Self::Error>;
}

/// Trait for expanders that drive the display backlight from one bit of the
/// output register. Implementations cache the backlight state so that every
/// other register write can carry it along unchanged.
pub trait BacklightControl: ExpanderPort {
    /// Turns the backlight on or off. The change is written to the expander
    /// immediately without disturbing the other register bits.
    fn set_backlight(&mut self, on: bool) -> Result<(), Self::Error>;

    /// Returns the cached backlight state. Does not touch the bus.
    fn backlight(&self) -> bool;
}
