//! Short driver-facing status text.
//!
//! A message stays visible for [`HOLD_TICKS`] ticks after it was last
//! written and is then cleared. Every message is also emitted as a
//! `tracing` debug event under the `cruise::status` target.

use core::fmt::{self, Write};

use heapless::String;

/// Ticks a message stays visible.
pub const HOLD_TICKS: u32 = 300;

/// Longest message kept; longer text is truncated.
pub const STATUS_CAPACITY: usize = 64;

/// Tick-held status text.
#[derive(Clone, Debug, Default)]
pub struct StatusLine {
    text: String<STATUS_CAPACITY>,
    timer: u32,
}

impl StatusLine {
    /// Empty status line.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current text, empty once the hold expired.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Count down the hold and clear the text when it runs out.
    pub fn begin_tick(&mut self) {
        self.timer = self.timer.saturating_sub(1);
        if self.timer == 0 {
            self.text.clear();
        }
    }

    /// Replace the text and restart the hold.
    pub fn show(&mut self, args: fmt::Arguments<'_>) {
        tracing::debug!(target: "cruise::status", "{}", args);
        self.text.clear();
        let mut w = Truncating(&mut self.text);
        // Truncating never fails
        let _ = w.write_fmt(args);
        self.timer = HOLD_TICKS;
    }

    /// As [`show`](Self::show), only when automatic cruise is enabled.
    pub fn show_auto(&mut self, auto_cruise: bool, args: fmt::Arguments<'_>) {
        if auto_cruise {
            self.show(args);
        }
    }
}

/// Writer that keeps as much of the message as fits.
struct Truncating<'a>(&'a mut String<STATUS_CAPACITY>);

impl Write for Truncating<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.0.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}
