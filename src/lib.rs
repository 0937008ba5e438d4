//! This Rust `embedded-hal`-based library drives a [HD44780](https://en.wikipedia.org/wiki/Hitachi_HD44780_LCD_controller)
//! compatible character display through a PCF8574 I2C I/O expander in an embedded, `no_std` environment. These expander
//! boards ("I2C backpacks") are ubiquitous on eBay and AliExpress and wire the display's 4-bit data pins to P4-P7 of the
//! PCF8574, with register select, read/write, enable and the backlight transistor on P0-P3.
//!
//! The library is layered:
//! - [`ExpanderPort`] and [`BacklightControl`] are the capabilities an expander must provide. [`PCF8574`] implements both
//!   on top of any `embedded_hal::i2c::I2c`.
//! - [`bit_configurations`] packs a byte into the four register frames of a 4-bit bus transfer.
//! - [`HD44780`] is the controller: its power-on initialization sequence and instruction set.
//! - [`CharacterDisplay`] is a convenience layer for writing whole lines, wrapping text and scrolling marquees.
//!
//! Key features include:
//! - Backlight control that survives every data and instruction write
//! - Software tracked display state; the controller is never read back
//! - Support for custom characters
//! - `core::fmt::Write` implementation for easy use with the `write!` macro
//! - Compatible with the `embedded-hal` traits v1.0 and later
//! - Optional support for the `defmt` and `ufmt` logging frameworks
//!
//! ## Usage
//! Add this to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! pcf8574-hd44780 = { version = "0.1", features = ["defmt"] }
//! ```
//! The `features = ["defmt"]` line is optional and enables the `defmt` feature, which adds debug logging to the
//! initialization sequence and allows the library's errors to be used with the `defmt` logging framework. Another
//! optional feature is `features = ["ufmt"]`, which allows the `uwriteln!` and `uwrite!` macros to be used.
//!
//! ```rust
//! use pcf8574_hd44780::{CharacterDisplay, HD44780, LcdDisplayType, PCF8574};
//!
//! // board setup
//! let i2c = ...; // I2C peripheral
//! let delay = ...; // DelayNs implementation
//!
//! let port = PCF8574::new(i2c);
//! let mut lcd = HD44780::new(port, LcdDisplayType::Lcd16x2.geometry(), delay);
//! if let Err(e) = lcd.init() {
//!    panic!("Error initializing LCD: {}", e);
//! }
//! lcd.set_backlight(true)?.clear()?.print("Hello, world!")?;
//!
//! // or line oriented
//! let mut display = CharacterDisplay::new(lcd);
//! display.write_lines("Hello, world!\nSecond line")?;
//! ```
//!
//! Every method on [`HD44780`] returns a `Result` that wraps the display object in `Ok()`, allowing for easy chaining.
//! Operations issued before [`HD44780::init`] completes fail with [`CharacterDisplayError::NotInitialized`].
//!
//! ### Sharing the bus
//! One display value owns its port exclusively. If the I2C bus is shared with other peripherals, wrap it in an
//! `embedded_hal_bus::i2c::CriticalSectionDevice` (or similar) before handing it to [`PCF8574`]. Interleaving nibble
//! transfers from two owners corrupts the controller state without any detectable error.
//!
#![no_std]
#![allow(non_upper_case_globals)]
use core::fmt::Display;

pub mod bit_configurations;
pub mod display;
mod driver;

#[cfg(test)]
mod sim;

pub use bit_configurations::ControllerMode;
pub use display::{CharacterDisplay, ScrollDirection, TextOverflow};
pub use driver::{
    hd44780::{CharacterFont, ControllerState, HD44780},
    pcf8574::{DEFAULT_I2C_ADDRESS, PCF8574},
    BacklightControl, ExpanderPort,
};

/// HD44780 controller driven through a PCF8574 I2C expander.
pub type HD44780PCF8574<I2C, DELAY> = HD44780<PCF8574<I2C>, DELAY>;

/// Line oriented display driven through a PCF8574 I2C expander.
pub type CharacterDisplayPCF8574<I2C, DELAY> = CharacterDisplay<PCF8574<I2C>, DELAY>;

/// The maximum number of lines a single HD44780 controller addresses.
const MAX_LINES: u8 = 4;

/// The maximum number of columns per line a single HD44780 controller addresses.
const MAX_COLUMNS: u8 = 40;

#[derive(Debug, PartialEq, Copy, Clone)]
/// Errors that can occur when driving the display
pub enum CharacterDisplayError<E> {
    /// Error returned from the underlying bus transport
    BusError(E),
    /// The operation was invoked before the controller was initialized
    NotInitialized,
    /// Line is outside the display geometry
    LineOutOfBounds,
    /// Column is outside the display geometry
    ColumnOutOfBounds,
    /// Formatting error
    FormattingError(core::fmt::Error),
}

impl<E> CharacterDisplayError<E> {
    /// Returns `true` for both cursor position errors.
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(
            self,
            CharacterDisplayError::LineOutOfBounds | CharacterDisplayError::ColumnOutOfBounds
        )
    }
}

impl<E> From<core::fmt::Error> for CharacterDisplayError<E> {
    fn from(err: core::fmt::Error) -> Self {
        CharacterDisplayError::FormattingError(err)
    }
}

impl<E> From<&CharacterDisplayError<E>> for &'static str {
    fn from(err: &CharacterDisplayError<E>) -> Self {
        match err {
            CharacterDisplayError::BusError(_) => "Bus error",
            CharacterDisplayError::NotInitialized => "Display not initialized",
            CharacterDisplayError::LineOutOfBounds => "Line out of bounds",
            CharacterDisplayError::ColumnOutOfBounds => "Column out of bounds",
            CharacterDisplayError::FormattingError(_) => "Formatting error",
        }
    }
}

#[cfg(feature = "defmt")]
impl<E> defmt::Format for CharacterDisplayError<E> {
    fn format(&self, fmt: defmt::Formatter) {
        let msg: &'static str = From::from(self);
        defmt::write!(fmt, "{}", msg);
    }
}

#[cfg(feature = "ufmt")]
impl<E> ufmt::uDisplay for CharacterDisplayError<E> {
    fn fmt<W>(&self, w: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        let msg: &'static str = From::from(self);
        ufmt::uwrite!(w, "{}", msg)
    }
}

impl<E> Display for CharacterDisplayError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg: &'static str = From::from(self);
        write!(f, "{}", msg)
    }
}

/// Number of lines and columns of a display. Determines the valid cursor positions and where each line starts in the
/// controller's DDRAM. The lines are not contiguous in DDRAM: the second line always starts at `0x40`, and on 4-line
/// displays the third and fourth lines continue the first and second lines.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayGeometry {
    lines: u8,
    columns: u8,
}

impl DisplayGeometry {
    /// Creates a geometry. Returns `None` unless `lines` is 1, 2 or 4 and the columns fit a single HD44780
    /// controller: up to 40 columns for 1 and 2 line displays, up to 20 for 4 line displays.
    pub const fn new(lines: u8, columns: u8) -> Option<Self> {
        let max_columns = if lines == MAX_LINES {
            MAX_COLUMNS / 2
        } else {
            MAX_COLUMNS
        };
        match lines {
            1 | 2 | MAX_LINES if columns > 0 && columns <= max_columns => {
                Some(Self { lines, columns })
            }
            _ => None,
        }
    }

    /// Number of display lines
    pub const fn lines(&self) -> u8 {
        self.lines
    }

    /// Number of characters per line
    pub const fn columns(&self) -> u8 {
        self.columns
    }

    /// DDRAM address of the first character of each line. Entries past the last line are unused.
    pub const fn line_offsets(&self) -> [u8; 4] {
        [0x00, 0x40, self.columns, 0x40 + self.columns]
    }

    /// DDRAM address for a zero-indexed line and column, or the matching out of bounds error.
    pub fn ddram_address<E>(&self, line: u8, column: u8) -> Result<u8, CharacterDisplayError<E>> {
        if line >= self.lines {
            return Err(CharacterDisplayError::LineOutOfBounds);
        }
        if column >= self.columns {
            return Err(CharacterDisplayError::ColumnOutOfBounds);
        }
        Ok(self.line_offsets()[line as usize] + column)
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
/// Common display sizes. Each converts to its [`DisplayGeometry`].
pub enum LcdDisplayType {
    /// 8x1 display
    Lcd8x1,
    /// 8x2 display
    Lcd8x2,
    /// 16x1 display
    Lcd16x1,
    /// 16x2 display
    Lcd16x2,
    /// 16x4 display
    Lcd16x4,
    /// 20x2 display
    Lcd20x2,
    /// 20x4 display
    Lcd20x4,
    /// 40x1 display
    Lcd40x1,
    /// 40x2 display
    Lcd40x2,
}

impl From<&LcdDisplayType> for &'static str {
    fn from(display_type: &LcdDisplayType) -> Self {
        match display_type {
            LcdDisplayType::Lcd8x1 => "8x1",
            LcdDisplayType::Lcd8x2 => "8x2",
            LcdDisplayType::Lcd16x1 => "16x1",
            LcdDisplayType::Lcd16x2 => "16x2",
            LcdDisplayType::Lcd16x4 => "16x4",
            LcdDisplayType::Lcd20x2 => "20x2",
            LcdDisplayType::Lcd20x4 => "20x4",
            LcdDisplayType::Lcd40x1 => "40x1",
            LcdDisplayType::Lcd40x2 => "40x2",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for LcdDisplayType {
    fn format(&self, fmt: defmt::Formatter) {
        let msg: &'static str = From::from(self);
        defmt::write!(fmt, "{}", msg);
    }
}

#[cfg(feature = "ufmt")]
impl ufmt::uDisplay for LcdDisplayType {
    fn fmt<W>(&self, w: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        let msg: &'static str = From::from(self);
        ufmt::uwrite!(w, "{}", msg)
    }
}

impl Display for LcdDisplayType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg: &'static str = From::from(self);
        write!(f, "{}", msg)
    }
}

impl LcdDisplayType {
    /// Get the number of lines for the display type
    const fn lines(&self) -> u8 {
        match self {
            LcdDisplayType::Lcd8x1 => 1,
            LcdDisplayType::Lcd8x2 => 2,
            LcdDisplayType::Lcd16x1 => 1,
            LcdDisplayType::Lcd16x2 => 2,
            LcdDisplayType::Lcd16x4 => 4,
            LcdDisplayType::Lcd20x2 => 2,
            LcdDisplayType::Lcd20x4 => 4,
            LcdDisplayType::Lcd40x1 => 1,
            LcdDisplayType::Lcd40x2 => 2,
        }
    }

    /// Get the number of columns for the display type
    const fn columns(&self) -> u8 {
        match self {
            LcdDisplayType::Lcd8x1 => 8,
            LcdDisplayType::Lcd8x2 => 8,
            LcdDisplayType::Lcd16x1 => 16,
            LcdDisplayType::Lcd16x2 => 16,
            LcdDisplayType::Lcd16x4 => 16,
            LcdDisplayType::Lcd20x2 => 20,
            LcdDisplayType::Lcd20x4 => 20,
            LcdDisplayType::Lcd40x1 => 40,
            LcdDisplayType::Lcd40x2 => 40,
        }
    }

    /// The geometry of the display type.
    pub const fn geometry(&self) -> DisplayGeometry {
        DisplayGeometry {
            lines: self.lines(),
            columns: self.columns(),
        }
    }
}

impl From<LcdDisplayType> for DisplayGeometry {
    fn from(display_type: LcdDisplayType) -> Self {
        display_type.geometry()
    }
}
