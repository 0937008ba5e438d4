//! Simulated HD44780 behind a PCF8574, for tests. Frames are decoded the way the controller sees them: a nibble is
//! latched on the falling edge of the enable line. Execution times are modelled against a shared simulated clock that
//! only advances through [`SimDelay`], so a driver that does not wait long enough loses nibbles.

extern crate std;

use core::convert::Infallible;
use std::{cell::Cell, rc::Rc, vec::Vec};

use embedded_hal::delay::DelayNs;

use crate::{
    bit_configurations::PCF8574BitField,
    driver::{BacklightControl, ExpanderPort},
};

// datasheet execution times at 270 kHz
const POWER_ON_NS: u64 = 40_000_000;
const INSTRUCTION_NS: u64 = 37_000;
const DATA_WRITE_NS: u64 = 41_000;
const CLEAR_NS: u64 = 1_520_000;
// after the 1st and 2nd 8-bit function set of the bootstrap
const BOOTSTRAP_NS: [u64; 2] = [4_100_000, 100_000];

/// Simulated time in nanoseconds, shared between the delay and the controller.
#[derive(Clone, Default)]
pub(crate) struct SimClock(Rc<Cell<u64>>);

impl SimClock {
    pub(crate) fn now(&self) -> u64 {
        self.0.get()
    }

    fn advance(&self, ns: u64) {
        self.0.set(self.0.get() + ns);
    }
}

pub(crate) struct SimDelay {
    clock: SimClock,
}

impl SimDelay {
    pub(crate) fn new(clock: SimClock) -> Self {
        Self { clock }
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.clock.advance(ns as u64);
    }
}

pub(crate) struct SimulatedHD44780 {
    clock: SimClock,
    pins: PCF8574BitField,
    backlight: bool,
    frames: Vec<u8>,
    busy_until: u64,
    four_bit: bool,
    high_nibble: Option<u8>,
    bootstrap_nibbles: Vec<u8>,
    dropped_nibbles: Vec<u8>,
    instructions: Vec<u8>,
    data_writes: Vec<u8>,
    entry_mode: u8,
    address: u8,
    cgram_selected: bool,
    ddram: [u8; 128],
    cgram: [u8; 64],
}

impl SimulatedHD44780 {
    pub(crate) fn new(clock: SimClock) -> Self {
        let busy_until = clock.now() + POWER_ON_NS;
        Self {
            clock,
            pins: PCF8574BitField(0),
            backlight: false,
            frames: Vec::new(),
            busy_until,
            four_bit: false,
            high_nibble: None,
            bootstrap_nibbles: Vec::new(),
            dropped_nibbles: Vec::new(),
            instructions: Vec::new(),
            data_writes: Vec::new(),
            // power-on reset state
            entry_mode: 0x06,
            address: 0,
            cgram_selected: false,
            ddram: [0; 128],
            cgram: [0; 64],
        }
    }

    /// Every register value written to the expander, in order.
    pub(crate) fn frames(&self) -> &[u8] {
        &self.frames
    }

    /// Nibbles latched while the controller was still in its power-on 8-bit interface.
    pub(crate) fn bootstrap_nibbles(&self) -> &[u8] {
        &self.bootstrap_nibbles
    }

    /// Nibbles the controller ignored because it was still busy.
    pub(crate) fn dropped_nibbles(&self) -> &[u8] {
        &self.dropped_nibbles
    }

    /// Instruction bytes executed in 4-bit mode.
    pub(crate) fn instructions(&self) -> &[u8] {
        &self.instructions
    }

    /// Data bytes executed in 4-bit mode, to DDRAM or CGRAM.
    pub(crate) fn data_writes(&self) -> &[u8] {
        &self.data_writes
    }

    pub(crate) fn ddram_text(&self, address: u8, len: u8) -> &[u8] {
        let start = address as usize;
        &self.ddram[start..start + len as usize]
    }

    pub(crate) fn cgram_glyph(&self, location: u8) -> [u8; 8] {
        let mut glyph = [0; 8];
        let start = (location as usize & 0x7) * 8;
        glyph.copy_from_slice(&self.cgram[start..start + 8]);
        glyph
    }

    fn latch(&mut self, rs: bool, nibble: u8) {
        let now = self.clock.now();
        if now < self.busy_until {
            self.dropped_nibbles.push(nibble);
            return;
        }

        if !self.four_bit {
            // 8-bit interface: D0-D3 are not wired, so every nibble is a full instruction
            self.bootstrap_nibbles.push(nibble);
            let busy = BOOTSTRAP_NS
                .get(self.bootstrap_nibbles.len() - 1)
                .copied()
                .unwrap_or(INSTRUCTION_NS);
            self.busy_until = now + busy;
            if nibble == 0x02 {
                self.four_bit = true;
            }
            return;
        }

        match self.high_nibble.take() {
            None => self.high_nibble = Some(nibble),
            Some(high) => {
                let value = (high << 4) | nibble;
                let busy = if rs {
                    self.execute_data(value)
                } else {
                    self.execute_instruction(value)
                };
                self.busy_until = now + busy;
            }
        }
    }

    fn execute_instruction(&mut self, value: u8) -> u64 {
        self.instructions.push(value);
        if value & 0x80 != 0 {
            self.address = value & 0x7F;
            self.cgram_selected = false;
        } else if value & 0x40 != 0 {
            self.address = value & 0x3F;
            self.cgram_selected = true;
        } else if value & 0xFC == 0x04 {
            self.entry_mode = value;
        } else if value == 0x01 {
            self.ddram = [b' '; 128];
            self.address = 0;
            self.cgram_selected = false;
            self.entry_mode |= 0x02;
            return CLEAR_NS;
        } else if value & 0xFE == 0x02 {
            self.address = 0;
            self.cgram_selected = false;
            return CLEAR_NS;
        }
        INSTRUCTION_NS
    }

    fn execute_data(&mut self, value: u8) -> u64 {
        self.data_writes.push(value);
        let increment = self.entry_mode & 0x02 != 0;
        if self.cgram_selected {
            self.cgram[self.address as usize] = value;
            self.address = step_address(self.address, increment) & 0x3F;
        } else {
            self.ddram[self.address as usize] = value;
            self.address = step_address(self.address, increment) & 0x7F;
        }
        DATA_WRITE_NS
    }
}

fn step_address(address: u8, increment: bool) -> u8 {
    if increment {
        address.wrapping_add(1)
    } else {
        address.wrapping_sub(1)
    }
}

impl ExpanderPort for SimulatedHD44780 {
    type Error = Infallible;

    fn write(&mut self, value: u8) -> Result<(), Self::Error> {
        let next = PCF8574BitField(value);
        self.frames.push(value);
        if self.pins.enable() == 1 && next.enable() == 0 {
            self.latch(self.pins.rs() == 1, self.pins.data());
        }
        self.pins = next;
        Ok(())
    }

    fn read(&mut self) -> Result<u8, Self::Error> {
        Ok(self.pins.0)
    }
}

impl BacklightControl for SimulatedHD44780 {
    fn set_backlight(&mut self, on: bool) -> Result<(), Self::Error> {
        self.backlight = on;
        let mut pins = self.pins;
        pins.set_backlight(on as u8);
        self.write(pins.0)
    }

    fn backlight(&self) -> bool {
        self.backlight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bit_configurations::{encode, nibble_frames, ControllerMode};

    fn send(sim: &mut SimulatedHD44780, frames: &[u8]) {
        for &frame in frames {
            let _ = sim.write(frame);
        }
    }

    #[test]
    fn test_ignores_nibbles_during_power_on() {
        let clock = SimClock::default();
        let mut sim = SimulatedHD44780::new(clock.clone());
        send(&mut sim, &nibble_frames(0x03, ControllerMode::Instruction, false));
        assert_eq!(sim.dropped_nibbles(), &[0x03]);
        assert!(sim.bootstrap_nibbles().is_empty());
    }

    #[test]
    fn test_bootstrap_then_byte_pairs() {
        let clock = SimClock::default();
        let mut delay = SimDelay::new(clock.clone());
        let mut sim = SimulatedHD44780::new(clock.clone());
        delay.delay_ms(40);
        for (nibble, wait_us) in [(0x03, 4100), (0x03, 100), (0x03, 37), (0x02, 37)] {
            send(&mut sim, &nibble_frames(nibble, ControllerMode::Instruction, false));
            delay.delay_us(wait_us);
        }
        send(&mut sim, &encode(0x80 | 0x41, ControllerMode::Instruction, false));
        delay.delay_us(37);
        send(&mut sim, &encode(b'Z', ControllerMode::Data, false));

        assert_eq!(sim.bootstrap_nibbles(), &[0x03, 0x03, 0x03, 0x02]);
        assert_eq!(sim.instructions(), &[0xC1]);
        assert_eq!(sim.ddram_text(0x41, 1), b"Z");
        assert!(sim.dropped_nibbles().is_empty());

        // no wait after the data write, the next byte is lost
        send(&mut sim, &encode(b'!', ControllerMode::Data, false));
        assert_eq!(sim.dropped_nibbles(), &[0x02, 0x01]);
    }

    #[test]
    fn test_backlight_keeps_pins() {
        let mut sim = SimulatedHD44780::new(SimClock::default());
        send(&mut sim, &[0b0101_0001]);
        assert!(sim.set_backlight(true).is_ok());
        assert_eq!(sim.read(), Ok(0b0101_1001));
        assert!(sim.backlight());
    }
}
