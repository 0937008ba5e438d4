// HD44780 Support
// The HD44780 struct drives the controller's 4-bit bus through an object implementing the
// BacklightControl (and so ExpanderPort) trait. Every byte is split by the bit_configurations
// encoder into four register frames, which are written to the expander one at a time. The
// display control, entry mode and function set bytes are mirrored here because the controller
// is never read back.
//

use embedded_hal::delay::DelayNs;

use crate::{
    bit_configurations::{encode, nibble_frames, ControllerMode},
    driver::BacklightControl,
    CharacterDisplayError, DisplayGeometry,
};

// commands
const LCD_CMD_CLEARDISPLAY: u8 = 0x01; //  Clear display, set cursor position to zero
const LCD_CMD_RETURNHOME: u8 = 0x02; //  Set cursor position to zero
const LCD_CMD_ENTRYMODESET: u8 = 0x04; //  Sets the entry mode
const LCD_CMD_DISPLAYCONTROL: u8 = 0x08; //  Controls the display; does stuff like turning it off and on
const LCD_CMD_CURSORSHIFT: u8 = 0x10; //  Lets you move the cursor
const LCD_CMD_FUNCTIONSET: u8 = 0x20; //  Used to send the function to set to the display
const LCD_CMD_SETCGRAMADDR: u8 = 0x40; //  Used to set the CGRAM (character generator RAM) with characters
const LCD_CMD_SETDDRAMADDR: u8 = 0x80; //  Used to set the DDRAM (Display Data RAM)

// flags for display entry mode
const LCD_FLAG_ENTRYLEFT: u8 = 0x02; //  Used to set text to flow from left to right
const LCD_FLAG_ENTRYSHIFTINCREMENT: u8 = 0x01; //  Used to 'right justify' text from the cursor
const LCD_FLAG_ENTRYSHIFTDECREMENT: u8 = 0x00; //  Used to 'left justify' text from the cursor

// flags for display on/off control
const LCD_FLAG_DISPLAYON: u8 = 0x04; //  Turns the display on
const LCD_FLAG_DISPLAYOFF: u8 = 0x00; //  Turns the display off
const LCD_FLAG_CURSORON: u8 = 0x02; //  Turns the cursor on
const LCD_FLAG_CURSOROFF: u8 = 0x00; //  Turns the cursor off
const LCD_FLAG_BLINKON: u8 = 0x01; //  Turns on the blinking cursor
const LCD_FLAG_BLINKOFF: u8 = 0x00; //  Turns off the blinking cursor

// flags for display/cursor shift
const LCD_FLAG_DISPLAYMOVE: u8 = 0x08; //  Flag for moving the display
const LCD_FLAG_MOVERIGHT: u8 = 0x04; //  Flag for moving right
const LCD_FLAG_MOVELEFT: u8 = 0x00; //  Flag for moving left

// flags for function set
const LCD_FLAG_4BITMODE: u8 = 0x00; //  LCD 4 bit mode
const LCD_FLAG_2LINE: u8 = 0x08; //  LCD 2 line mode
const LCD_FLAG_1LINE: u8 = 0x00; //  LCD 1 line mode
const LCD_FLAG_5x10_DOTS: u8 = 0x04; //  10 pixel high font mode
const LCD_FLAG_5x8_DOTS: u8 = 0x00; //  8 pixel high font mode

// timing, taken from the worst case values of the HD44780 datasheet
const POWER_ON_DELAY_MS: u32 = 50; // > 40 ms after Vcc rises to 2.7 V
const COMMAND_SETTLE_US: u32 = 50; // > 37 us for most instructions and data writes
const CLEAR_SETTLE_US: u32 = 2000; // > 1.52 ms for clear display and return home

/// The nibbles that force the controller from its ambiguous power-on interface width into 4-bit
/// mode, each paired with the delay that must follow it. The first three are the 8-bit function set
/// as seen on D4-D7; the last one switches to the 4-bit interface.
const BOOTSTRAP_SEQUENCE: [(u8, u32); 4] = [(0x03, 5000), (0x03, 150), (0x03, 1000), (0x02, 1000)];

/// Lifecycle of the controller as seen by the driver.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControllerState {
    /// Power-on state, or the state after a failed initialization.
    Uninitialized,
    /// The initialization sequence is in progress.
    Initializing,
    /// The controller accepts operations.
    Ready,
}

/// Character font selected by the function set instruction.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CharacterFont {
    /// 5x8 dots, supported by all displays
    #[default]
    Dots5x8,
    /// 5x10 dots. The HD44780 only honors this on 1 line displays.
    Dots5x10,
}

/// Converts a character to the controller's character code. Characters outside the 8-bit range
/// are shown as `?`.
pub(crate) fn char_code(c: char) -> u8 {
    u8::try_from(c).unwrap_or(b'?')
}

/// Driver for one HD44780 controller attached to an I/O expander through the 4-bit interface.
pub struct HD44780<PORT, DELAY>
where
    PORT: BacklightControl,
    DELAY: DelayNs,
{
    port: PORT,
    delay: DELAY,
    geometry: DisplayGeometry,
    font: CharacterFont,
    state: ControllerState,
    display_function: u8,
    display_control: u8,
    display_mode: u8,
}

impl<PORT, DELAY> HD44780<PORT, DELAY>
where
    PORT: BacklightControl,
    DELAY: DelayNs,
{
    /// Create a new driver. Nothing is sent to the display until [`HD44780::init`] is called.
    pub fn new(port: PORT, geometry: impl Into<DisplayGeometry>, delay: DELAY) -> Self {
        Self {
            port,
            delay,
            geometry: geometry.into(),
            font: CharacterFont::default(),
            state: ControllerState::Uninitialized,
            display_function: 0,
            display_control: 0,
            display_mode: 0,
        }
    }

    /// Select the character font sent in the function set instruction during initialization.
    pub fn with_font(mut self, font: CharacterFont) -> Self {
        self.font = font;
        self
    }

    /// returns the geometry used to create the driver
    pub fn geometry(&self) -> DisplayGeometry {
        self.geometry
    }

    /// returns the current lifecycle state
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Returns the cached backlight state.
    pub fn backlight(&self) -> bool {
        self.port.backlight()
    }

    /// Releases the expander port and delay.
    pub fn release(self) -> (PORT, DELAY) {
        (self.port, self.delay)
    }

    /// returns the port object. mostly used for testing
    #[cfg(test)]
    pub(crate) fn port(&mut self) -> &mut PORT {
        &mut self.port
    }

    pub(crate) fn delay(&mut self) -> &mut DELAY {
        &mut self.delay
    }

    /// Initialize the display. This must be called before using the display. Calling it again
    /// resets the controller with the full power-on sequence, which is the way to recover from a
    /// bus error. If initialization fails the driver is left uninitialized.
    pub fn init(&mut self) -> Result<&mut Self, CharacterDisplayError<PORT::Error>> {
        #[cfg(feature = "defmt")]
        defmt::debug!(
            "Initializing HD44780, {} lines x {} columns",
            self.geometry.lines(),
            self.geometry.columns()
        );
        self.state = ControllerState::Initializing;
        match self.run_init_sequence() {
            Ok(()) => {
                self.state = ControllerState::Ready;
                #[cfg(feature = "defmt")]
                defmt::debug!("HD44780 ready");
                Ok(self)
            }
            Err(e) => {
                self.state = ControllerState::Uninitialized;
                #[cfg(feature = "defmt")]
                defmt::warn!("HD44780 initialization failed: {}", e);
                Err(e)
            }
        }
    }

    /// Re-run the initialization sequence. Same as [`HD44780::init`].
    pub fn reset(&mut self) -> Result<&mut Self, CharacterDisplayError<PORT::Error>> {
        self.init()
    }

    fn run_init_sequence(&mut self) -> Result<(), CharacterDisplayError<PORT::Error>> {
        self.delay.delay_ms(POWER_ON_DELAY_MS);

        for (nibble, delay_us) in BOOTSTRAP_SEQUENCE {
            self.write_nibble(nibble)?;
            self.delay.delay_us(delay_us);
        }

        let lines = if self.geometry.lines() > 1 {
            LCD_FLAG_2LINE
        } else {
            LCD_FLAG_1LINE
        };
        let font = match self.font {
            CharacterFont::Dots5x10 if self.geometry.lines() == 1 => LCD_FLAG_5x10_DOTS,
            _ => LCD_FLAG_5x8_DOTS,
        };
        self.display_function = LCD_FLAG_4BITMODE | lines | font;
        self.send_command(LCD_CMD_FUNCTIONSET | self.display_function)?;

        self.display_control = LCD_FLAG_DISPLAYOFF | LCD_FLAG_CURSOROFF | LCD_FLAG_BLINKOFF;
        self.send_command(LCD_CMD_DISPLAYCONTROL | self.display_control)?;

        self.clear_display()?;

        self.display_mode = LCD_FLAG_ENTRYLEFT | LCD_FLAG_ENTRYSHIFTDECREMENT;
        self.send_command(LCD_CMD_ENTRYMODESET | self.display_mode)?;

        self.display_control = LCD_FLAG_DISPLAYON | LCD_FLAG_CURSOROFF | LCD_FLAG_BLINKOFF;
        self.send_command(LCD_CMD_DISPLAYCONTROL | self.display_control)?;

        Ok(())
    }

    fn ensure_ready(&self) -> Result<(), CharacterDisplayError<PORT::Error>> {
        if self.state != ControllerState::Ready {
            #[cfg(feature = "defmt")]
            defmt::warn!("HD44780 operation rejected, controller is {}", self.state);
            return Err(CharacterDisplayError::NotInitialized);
        }
        Ok(())
    }

    fn write_frames(&mut self, frames: &[u8]) -> Result<(), CharacterDisplayError<PORT::Error>> {
        for &frame in frames {
            self.port
                .write(frame)
                .map_err(CharacterDisplayError::BusError)?;
        }
        Ok(())
    }

    /// writes a single nibble as an instruction. Only used by the bootstrap sequence, while the
    /// controller may still be in 8-bit mode.
    fn write_nibble(&mut self, nibble: u8) -> Result<(), CharacterDisplayError<PORT::Error>> {
        let frames = nibble_frames(nibble, ControllerMode::Instruction, self.port.backlight());
        self.write_frames(&frames)
    }

    /// writes a full byte to the controller and waits for it to be executed. The backlight bit is
    /// taken from the port so that it is never clobbered.
    fn write_byte(
        &mut self,
        mode: ControllerMode,
        value: u8,
    ) -> Result<(), CharacterDisplayError<PORT::Error>> {
        let frames = encode(value, mode, self.port.backlight());
        self.write_frames(&frames)?;
        self.delay.delay_us(COMMAND_SETTLE_US);
        Ok(())
    }

    fn send_command(&mut self, command: u8) -> Result<(), CharacterDisplayError<PORT::Error>> {
        self.write_byte(ControllerMode::Instruction, command)
    }

    fn clear_display(&mut self) -> Result<(), CharacterDisplayError<PORT::Error>> {
        self.send_command(LCD_CMD_CLEARDISPLAY)?;
        self.delay.delay_us(CLEAR_SETTLE_US);
        Ok(())
    }

    //--------------------------------------------------------------------------------------------------
    // high level commands, for the user!
    //--------------------------------------------------------------------------------------------------

    /// Clear the display and set the cursor to the home position. Waits for the controller to finish
    /// before returning, so the next operation can follow immediately.
    pub fn clear(&mut self) -> Result<&mut Self, CharacterDisplayError<PORT::Error>> {
        self.ensure_ready()?;
        self.clear_display()?;
        Ok(self)
    }

    /// Set the cursor to the home position without changing the display contents.
    pub fn home(&mut self) -> Result<&mut Self, CharacterDisplayError<PORT::Error>> {
        self.ensure_ready()?;
        self.send_command(LCD_CMD_RETURNHOME)?;
        self.delay.delay_us(CLEAR_SETTLE_US);
        Ok(self)
    }

    /// Set the cursor position at specified line and column. Lines and columns are zero-indexed.
    /// Positions outside the display geometry are rejected, nothing is sent.
    pub fn set_cursor(
        &mut self,
        line: u8,
        column: u8,
    ) -> Result<&mut Self, CharacterDisplayError<PORT::Error>> {
        self.ensure_ready()?;
        let address = self.geometry.ddram_address(line, column)?;
        #[cfg(feature = "defmt")]
        defmt::trace!("set cursor line {} column {} -> {=u8:#x}", line, column, address);
        self.send_command(LCD_CMD_SETDDRAMADDR | address)?;
        Ok(self)
    }

    /// Writes one character code at the cursor. The controller advances the cursor in the
    /// current entry direction.
    pub fn write_char(&mut self, code: u8) -> Result<&mut Self, CharacterDisplayError<PORT::Error>> {
        self.ensure_ready()?;
        self.write_byte(ControllerMode::Data, code)?;
        Ok(self)
    }

    /// Prints a string to the LCD at the current cursor position.
    pub fn print(&mut self, text: &str) -> Result<&mut Self, CharacterDisplayError<PORT::Error>> {
        self.ensure_ready()?;
        for c in text.chars() {
            self.write_byte(ControllerMode::Data, char_code(c))?;
        }
        Ok(self)
    }

    /// Set the display visibility. The display contents are kept while the display is off.
    pub fn set_display(&mut self, on: bool) -> Result<&mut Self, CharacterDisplayError<PORT::Error>> {
        self.ensure_ready()?;
        if on {
            self.display_control |= LCD_FLAG_DISPLAYON;
        } else {
            self.display_control &= !LCD_FLAG_DISPLAYON;
        }
        self.send_command(LCD_CMD_DISPLAYCONTROL | self.display_control)?;
        Ok(self)
    }

    /// Set the cursor visibility.
    pub fn set_cursor_visible(
        &mut self,
        on: bool,
    ) -> Result<&mut Self, CharacterDisplayError<PORT::Error>> {
        self.ensure_ready()?;
        if on {
            self.display_control |= LCD_FLAG_CURSORON;
        } else {
            self.display_control &= !LCD_FLAG_CURSORON;
        }
        self.send_command(LCD_CMD_DISPLAYCONTROL | self.display_control)?;
        Ok(self)
    }

    /// Set the cursor blinking.
    pub fn set_blink(&mut self, on: bool) -> Result<&mut Self, CharacterDisplayError<PORT::Error>> {
        self.ensure_ready()?;
        if on {
            self.display_control |= LCD_FLAG_BLINKON;
        } else {
            self.display_control &= !LCD_FLAG_BLINKON;
        }
        self.send_command(LCD_CMD_DISPLAYCONTROL | self.display_control)?;
        Ok(self)
    }

    /// Turn the backlight on or off
    pub fn set_backlight(&mut self, on: bool) -> Result<&mut Self, CharacterDisplayError<PORT::Error>> {
        self.ensure_ready()?;
        self.port
            .set_backlight(on)
            .map_err(CharacterDisplayError::BusError)?;
        Ok(self)
    }

    /// Scroll the display contents one position to the left without changing DDRAM.
    pub fn scroll_display_left(&mut self) -> Result<&mut Self, CharacterDisplayError<PORT::Error>> {
        self.ensure_ready()?;
        self.send_command(LCD_CMD_CURSORSHIFT | LCD_FLAG_DISPLAYMOVE | LCD_FLAG_MOVELEFT)?;
        Ok(self)
    }

    /// Scroll the display contents one position to the right without changing DDRAM.
    pub fn scroll_display_right(&mut self) -> Result<&mut Self, CharacterDisplayError<PORT::Error>> {
        self.ensure_ready()?;
        self.send_command(LCD_CMD_CURSORSHIFT | LCD_FLAG_DISPLAYMOVE | LCD_FLAG_MOVERIGHT)?;
        Ok(self)
    }

    /// Set the text flow direction to left to right.
    pub fn left_to_right(&mut self) -> Result<&mut Self, CharacterDisplayError<PORT::Error>> {
        self.ensure_ready()?;
        self.display_mode |= LCD_FLAG_ENTRYLEFT;
        self.send_command(LCD_CMD_ENTRYMODESET | self.display_mode)?;
        Ok(self)
    }

    /// Set the text flow direction to right to left.
    pub fn right_to_left(&mut self) -> Result<&mut Self, CharacterDisplayError<PORT::Error>> {
        self.ensure_ready()?;
        self.display_mode &= !LCD_FLAG_ENTRYLEFT;
        self.send_command(LCD_CMD_ENTRYMODESET | self.display_mode)?;
        Ok(self)
    }

    /// Set the auto scroll mode. When on, the display shifts on every character written instead
    /// of the cursor moving.
    pub fn autoscroll(&mut self, on: bool) -> Result<&mut Self, CharacterDisplayError<PORT::Error>> {
        self.ensure_ready()?;
        if on {
            self.display_mode |= LCD_FLAG_ENTRYSHIFTINCREMENT;
        } else {
            self.display_mode &= !LCD_FLAG_ENTRYSHIFTINCREMENT;
        }
        self.send_command(LCD_CMD_ENTRYMODESET | self.display_mode)?;
        Ok(self)
    }

    /// Create a new custom character in one of the eight CGRAM slots. Only the low 5 bits of each
    /// row are used. Afterwards the cursor is back at the home position.
    pub fn create_char(
        &mut self,
        location: u8,
        charmap: [u8; 8],
    ) -> Result<&mut Self, CharacterDisplayError<PORT::Error>> {
        self.ensure_ready()?;
        self.send_command(LCD_CMD_SETCGRAMADDR | ((location & 0x7) << 3))?;
        for charmap_byte in charmap {
            self.write_byte(ControllerMode::Data, charmap_byte)?;
        }
        // data writes go to CGRAM until a DDRAM address is set again
        self.send_command(LCD_CMD_SETDDRAMADDR)?;
        Ok(self)
    }
}

/// Implement the `core::fmt::Write` trait for the driver, allowing it to be used with the `write!` macro.
impl<PORT, DELAY> core::fmt::Write for HD44780<PORT, DELAY>
where
    PORT: BacklightControl,
    DELAY: DelayNs,
{
    fn write_str(&mut self, s: &str) -> Result<(), core::fmt::Error> {
        if let Err(_e) = self.print(s) {
            return Err(core::fmt::Error);
        }
        Ok(())
    }
}

#[cfg(feature = "ufmt")]
/// Implement the `ufmt::uWrite` trait for the driver, allowing it to be used with the `uwriteln!` and `uwrite!` macros.
impl<PORT, DELAY> ufmt::uWrite for HD44780<PORT, DELAY>
where
    PORT: BacklightControl,
    DELAY: DelayNs,
{
    fn write_str(&mut self, s: &str) -> Result<(), CharacterDisplayError<PORT::Error>> {
        self.print(s)?;
        Ok(())
    }

    type Error = CharacterDisplayError<PORT::Error>;
}
