use embedded_hal::i2c;

use crate::{
    bit_configurations::PCF8574BitField,
    driver::{BacklightControl, ExpanderPort},
};

/// Default address of PCF8574T based LCD backpacks with A0-A2 pulled high.
pub const DEFAULT_I2C_ADDRESS: u8 = 0x27;

/// PCF8574 I2C GPIO expander wired to an HD44780 display through a 4-bit
/// interface. Keeps a copy of the last register value written so the
/// backlight bit can be changed on its own.
pub struct PCF8574<I2C>
where
    I2C: i2c::I2c,
{
    i2c: I2C,
    address: u8,
    bits: PCF8574BitField,
    backlight: bool,
}

impl<I2C> PCF8574<I2C>
where
    I2C: i2c::I2c,
{
    /// Create a new expander using the default I2C address of `0x27`.
    pub fn new(i2c: I2C) -> Self {
        Self::new_with_address(i2c, DEFAULT_I2C_ADDRESS)
    }

    /// Create a new expander at a specific I2C address.
    pub fn new_with_address(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            bits: PCF8574BitField(0),
            backlight: false,
        }
    }

    /// returns configured i2c address
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Last register value written to the expander.
    pub fn state(&self) -> u8 {
        self.bits.0
    }

    /// Releases the I2C peripheral.
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// returns the i2c object. mostly used for testing
    #[cfg(test)]
    pub(crate) fn i2c(&mut self) -> &mut I2C {
        &mut self.i2c
    }

    fn write_bits_to_gpio(&mut self) -> Result<(), I2C::Error> {
        let data = [self.bits.0];
        self.i2c.write(self.address, &data)
    }
}

impl<I2C> ExpanderPort for PCF8574<I2C>
where
    I2C: i2c::I2c,
{
    type Error = I2C::Error;

    fn write(&mut self, value: u8) -> Result<(), Self::Error> {
        self.bits = PCF8574BitField(value);
        self.write_bits_to_gpio()
    }

    fn read(&mut self) -> Result<u8, Self::Error> {
        let mut data = [0];
        self.i2c.read(self.address, &mut data)?;
        Ok(data[0])
    }
}

impl<I2C> BacklightControl for PCF8574<I2C>
where
    I2C: i2c::I2c,
{
    fn set_backlight(&mut self, on: bool) -> Result<(), Self::Error> {
        self.backlight = on;
        self.bits.set_backlight(on as u8);
        self.write_bits_to_gpio()
    }

    fn backlight(&self) -> bool {
        self.backlight
    }
}
