//! Line oriented convenience layer over [`HD44780`]. It only uses the controller's public operations; everything here is
//! about where text goes and how long to wait between scroll steps.

use core::iter;

use embedded_hal::delay::DelayNs;

use crate::{
    driver::{
        hd44780::{char_code, ControllerState, HD44780},
        BacklightControl,
    },
    CharacterDisplayError, DisplayGeometry,
};

/// What [`CharacterDisplay::write_line`] does with text longer than a line.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TextOverflow {
    /// Clip the text at the last column.
    #[default]
    Truncate,
    /// Continue on the following lines, clipping at the last line of the display.
    Wrap,
}

/// Direction for [`CharacterDisplay::scroll_content_off_screen`].
#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScrollDirection {
    Left,
    #[default]
    Right,
}

/// A character display addressed by whole lines.
///
/// Lines are always written in full: text shorter than the display width is padded with spaces, so whatever was on
/// the line before is overwritten.
pub struct CharacterDisplay<PORT, DELAY>
where
    PORT: BacklightControl,
    DELAY: DelayNs,
{
    lcd: HD44780<PORT, DELAY>,
    overflow: TextOverflow,
}

impl<PORT, DELAY> CharacterDisplay<PORT, DELAY>
where
    PORT: BacklightControl,
    DELAY: DelayNs,
{
    /// Wrap a controller. The controller may be initialized before or after, see [`CharacterDisplay::init`].
    pub fn new(lcd: HD44780<PORT, DELAY>) -> Self {
        Self {
            lcd,
            overflow: TextOverflow::default(),
        }
    }

    /// Set the overflow policy of [`CharacterDisplay::write_line`].
    pub fn with_overflow(mut self, overflow: TextOverflow) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn overflow(&self) -> TextOverflow {
        self.overflow
    }

    /// Initialize the underlying controller.
    pub fn init(&mut self) -> Result<&mut Self, CharacterDisplayError<PORT::Error>> {
        self.lcd.init()?;
        Ok(self)
    }

    pub fn state(&self) -> ControllerState {
        self.lcd.state()
    }

    pub fn geometry(&self) -> DisplayGeometry {
        self.lcd.geometry()
    }

    /// Access the underlying controller, for the operations not exposed here.
    pub fn hd44780(&self) -> &HD44780<PORT, DELAY> {
        &self.lcd
    }

    /// Mutable access to the underlying controller.
    pub fn hd44780_mut(&mut self) -> &mut HD44780<PORT, DELAY> {
        &mut self.lcd
    }

    /// Releases the expander port and delay.
    pub fn release(self) -> (PORT, DELAY) {
        self.lcd.release()
    }

    /// Clear the display.
    pub fn clear(&mut self) -> Result<&mut Self, CharacterDisplayError<PORT::Error>> {
        self.lcd.clear()?;
        Ok(self)
    }

    /// Move the cursor to the first column of `line`.
    pub fn reset_cursor(&mut self, line: u8) -> Result<&mut Self, CharacterDisplayError<PORT::Error>> {
        self.lcd.set_cursor(line, 0)?;
        Ok(self)
    }

    /// Write `text` to `line`, replacing the whole line. Overflow is handled according to the configured
    /// [`TextOverflow`] policy.
    pub fn write_line(
        &mut self,
        text: &str,
        line: u8,
    ) -> Result<&mut Self, CharacterDisplayError<PORT::Error>> {
        let geometry = self.lcd.geometry();
        let columns = geometry.columns() as usize;
        match self.overflow {
            TextOverflow::Truncate => self.fill_line(line, text.chars())?,
            TextOverflow::Wrap => {
                let mut remaining = text.chars();
                self.fill_line(line, remaining.by_ref().take(columns))?;
                for next_line in (line + 1)..geometry.lines() {
                    let mut rest = remaining.by_ref().take(columns).peekable();
                    if rest.peek().is_none() {
                        break;
                    }
                    self.fill_line(next_line, rest)?;
                }
            }
        }
        Ok(self)
    }

    /// Write text to the display, one `'\n'` separated segment per line. Each segment is clipped to its line and
    /// lines without a segment are blanked. Segments past the last line are ignored.
    pub fn write_lines(&mut self, text: &str) -> Result<&mut Self, CharacterDisplayError<PORT::Error>> {
        let mut segments = text.split('\n');
        for line in 0..self.lcd.geometry().lines() {
            let segment = segments.next().unwrap_or("");
            self.fill_line(line, segment.chars())?;
        }
        Ok(self)
    }

    /// Scroll `text` across `line` from the right edge until it has left at the left edge, waiting `delay_ms` after
    /// every step. The line is rewritten on each step; the other lines are left alone. Blocks until done.
    pub fn marquee_text(
        &mut self,
        text: &str,
        line: u8,
        delay_ms: u32,
    ) -> Result<&mut Self, CharacterDisplayError<PORT::Error>> {
        let columns = self.lcd.geometry().columns() as usize;
        let steps = text.chars().count() + columns + 1;
        for step in 0..steps {
            let window = iter::repeat(' ')
                .take(columns)
                .chain(text.chars())
                .chain(iter::repeat(' ').take(columns))
                .skip(step);
            self.fill_line(line, window)?;
            self.lcd.delay().delay_ms(delay_ms);
        }
        Ok(self)
    }

    /// Shift the whole display content out of view, one column per step, waiting `delay_ms` after every step.
    /// DDRAM is not changed; [`CharacterDisplay::clear`] or a cursor home brings the content back.
    pub fn scroll_content_off_screen(
        &mut self,
        direction: ScrollDirection,
        delay_ms: u32,
    ) -> Result<&mut Self, CharacterDisplayError<PORT::Error>> {
        for _ in 0..self.lcd.geometry().columns() {
            match direction {
                ScrollDirection::Left => self.lcd.scroll_display_left()?,
                ScrollDirection::Right => self.lcd.scroll_display_right()?,
            };
            self.lcd.delay().delay_ms(delay_ms);
        }
        Ok(self)
    }

    pub fn display_on(&mut self) -> Result<&mut Self, CharacterDisplayError<PORT::Error>> {
        self.lcd.set_display(true)?;
        Ok(self)
    }

    pub fn display_off(&mut self) -> Result<&mut Self, CharacterDisplayError<PORT::Error>> {
        self.lcd.set_display(false)?;
        Ok(self)
    }

    pub fn cursor_on(&mut self) -> Result<&mut Self, CharacterDisplayError<PORT::Error>> {
        self.lcd.set_cursor_visible(true)?;
        Ok(self)
    }

    pub fn cursor_off(&mut self) -> Result<&mut Self, CharacterDisplayError<PORT::Error>> {
        self.lcd.set_cursor_visible(false)?;
        Ok(self)
    }

    pub fn blink_on(&mut self) -> Result<&mut Self, CharacterDisplayError<PORT::Error>> {
        self.lcd.set_blink(true)?;
        Ok(self)
    }

    pub fn blink_off(&mut self) -> Result<&mut Self, CharacterDisplayError<PORT::Error>> {
        self.lcd.set_blink(false)?;
        Ok(self)
    }

    pub fn backlight_on(&mut self) -> Result<&mut Self, CharacterDisplayError<PORT::Error>> {
        self.lcd.set_backlight(true)?;
        Ok(self)
    }

    pub fn backlight_off(&mut self) -> Result<&mut Self, CharacterDisplayError<PORT::Error>> {
        self.lcd.set_backlight(false)?;
        Ok(self)
    }

    /// Writes exactly one line's worth of characters to `line`, clipping `text` and padding with spaces.
    fn fill_line(
        &mut self,
        line: u8,
        text: impl Iterator<Item = char>,
    ) -> Result<(), CharacterDisplayError<PORT::Error>> {
        let columns = self.lcd.geometry().columns() as usize;
        self.lcd.set_cursor(line, 0)?;
        for c in text.chain(iter::repeat(' ')).take(columns) {
            self.lcd.write_char(char_code(c))?;
        }
        Ok(())
    }
}

/// Implement the `core::fmt::Write` trait, writing at the current cursor position.
impl<PORT, DELAY> core::fmt::Write for CharacterDisplay<PORT, DELAY>
where
    PORT: BacklightControl,
    DELAY: DelayNs,
{
    fn write_str(&mut self, s: &str) -> Result<(), core::fmt::Error> {
        core::fmt::Write::write_str(&mut self.lcd, s)
    }
}

#[cfg(feature = "ufmt")]
impl<PORT, DELAY> ufmt::uWrite for CharacterDisplay<PORT, DELAY>
where
    PORT: BacklightControl,
    DELAY: DelayNs,
{
    fn write_str(&mut self, s: &str) -> Result<(), CharacterDisplayError<PORT::Error>> {
        ufmt::uWrite::write_str(&mut self.lcd, s)
    }

    type Error = CharacterDisplayError<PORT::Error>;
}
