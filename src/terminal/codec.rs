//! Line codec.
//!
//! Wire format: ASCII text terminated by `\n`, `\r` or `\r\n`.
//!
//! The decoder accumulates incoming bytes and yields complete lines.
//! A single `Transport::read` may return a partial line or several lines
//! at once (a pasted `update_config` document).
//!
//! ```text
//!   "wat" │ "er herbs\r" │ "\ninfo\n"
//!           ▼                   ▼
//!     "water herbs"          "info"
//! ```

use log::warn;

/// Longest accepted line.  Sized for an `update_config` document of a
/// hundred-odd domains.
pub const MAX_LINE_LEN: usize = 8192;

/// One decoded line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Text(String),
    /// The line outgrew [`MAX_LINE_LEN`] and was discarded.  `keyword` is
    /// its first word so the session can still answer it.
    Overflow { keyword: String },
}

/// Streaming line decoder.
pub struct LineDecoder {
    buf: heapless::Vec<u8, MAX_LINE_LEN>,
    /// The current line outgrew `buf`; discard until the terminator.
    overflowed: bool,
    /// Last byte was `\r`, so a following `\n` is the same terminator.
    after_cr: bool,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LineDecoder {
    pub fn new() -> Self {
        Self {
            buf: heapless::Vec::new(),
            overflowed: false,
            after_cr: false,
        }
    }

    /// Feed one byte.  Returns a line when `byte` terminates one.
    ///
    /// Invalid UTF-8 is replaced, not rejected: the command parser turns
    /// it into an "invalid command" reply.
    pub fn push(&mut self, byte: u8) -> Option<Line> {
        let after_cr = core::mem::replace(&mut self.after_cr, byte == b'\r');
        match byte {
            b'\n' if after_cr => None,
            b'\r' | b'\n' => Some(self.take_line()),
            _ => {
                if !self.overflowed && self.buf.push(byte).is_err() {
                    warn!("Terminal: line longer than {MAX_LINE_LEN} bytes dropped");
                    self.overflowed = true;
                }
                None
            }
        }
    }

    /// Feed a chunk, returning every line it completes.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Line> {
        data.iter().filter_map(|&b| self.push(b)).collect()
    }

    fn take_line(&mut self) -> Line {
        let text = String::from_utf8_lossy(&self.buf).into_owned();
        let line = if self.overflowed {
            Line::Overflow {
                keyword: text.split_whitespace().next().unwrap_or_default().to_owned(),
            }
        } else {
            Line::Text(text)
        };
        self.buf.clear();
        self.overflowed = false;
        line
    }
}
