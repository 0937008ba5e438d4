use bitfield::bitfield;

// Pin assignment of the common PCF8574 LCD backpack. The HD44780 4-bit data
// lines D4-D7 sit on P4-P7.
bitfield! {
    pub struct PCF8574BitField(u8);
    impl Debug;
    impl BitAnd;
    pub rs, set_rs: 0, 0;
    pub rw, set_rw: 1, 1;
    pub enable, set_enable: 2, 2;
    pub backlight, set_backlight: 3, 3;
    pub data, set_data: 7, 4;
}

impl Clone for PCF8574BitField {
    fn clone(&self) -> Self {
        *self
    }
}

impl Copy for PCF8574BitField {}

impl PartialEq for PCF8574BitField {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

/// Selects which HD44780 register a transfer targets. Drives the RS line.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControllerMode {
    /// RS low: the byte is an instruction.
    Instruction,
    /// RS high: the byte is written to CGRAM or DDRAM.
    Data,
}

impl ControllerMode {
    const fn rs_bit(self) -> u8 {
        match self {
            ControllerMode::Instruction => 0,
            ControllerMode::Data => 1,
        }
    }
}

/// Builds the two register frames that latch a single nibble: the first with
/// the enable line high, the second with it low. The HD44780 latches on the
/// falling edge between them. Only the low 4 bits of `nibble` are used.
pub fn nibble_frames(nibble: u8, mode: ControllerMode, backlight: bool) -> [u8; 2] {
    let mut bits = PCF8574BitField(0);
    bits.set_rs(mode.rs_bit());
    bits.set_rw(0);
    bits.set_backlight(backlight as u8);
    bits.set_data(nibble & 0x0F);

    bits.set_enable(1);
    let strobe = bits.0;
    bits.set_enable(0);
    let latch = bits.0;

    [strobe, latch]
}

/// Encodes a full byte for the 4-bit bus. Returns the frames in the order they
/// must be written to the expander: high nibble (enable high, enable low),
/// then low nibble (enable high, enable low).
pub fn encode(value: u8, mode: ControllerMode, backlight: bool) -> [u8; 4] {
    let [high_strobe, high_latch] = nibble_frames(value >> 4, mode, backlight);
    let [low_strobe, low_latch] = nibble_frames(value & 0x0F, mode, backlight);
    [high_strobe, high_latch, low_strobe, low_latch]
}
