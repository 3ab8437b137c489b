//! Byte accumulator that splits the serial stream into lines.

/// Default maximum line length in bytes, excluding the terminator.
pub const DEFAULT_MAX_LINE_LEN: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// A complete line without its terminator. Invalid UTF-8 is replaced.
    Line(String),
    /// The line grew past the limit and was dropped. Reported once per
    /// overlong line.
    Overflow,
}

#[derive(Debug)]
pub struct LineBuffer {
    buf: Vec<u8>,
    max_len: usize,
    discarding: bool,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LEN)
    }
}

impl LineBuffer {
    pub fn new(max_len: usize) -> Self {
        let max_len = max_len.max(1);
        Self {
            buf: Vec::with_capacity(max_len),
            max_len,
            discarding: false,
        }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// True while the tail of an overlong line is being dropped.
    pub fn is_discarding(&self) -> bool {
        self.discarding
    }

    /// Bytes buffered towards the current line.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Feed raw bytes, appending completed lines and overflow events to `out`
    /// in arrival order. A single trailing carriage return is stripped from
    /// each line; carriage returns elsewhere are kept and count towards the
    /// limit.
    pub fn push_bytes(&mut self, bytes: &[u8], out: &mut Vec<LineEvent>) {
        for &b in bytes {
            match b {
                b'\n' => {
                    if self.discarding {
                        self.discarding = false;
                    } else {
                        let raw = self.buf.strip_suffix(b"\r").unwrap_or(&self.buf);
                        let line = String::from_utf8_lossy(raw).into_owned();
                        out.push(LineEvent::Line(line));
                    }
                    self.buf.clear();
                }
                _ if self.discarding => {}
                _ => {
                    if self.buf.len() == self.max_len {
                        self.buf.clear();
                        self.discarding = true;
                        out.push(LineEvent::Overflow);
                    } else {
                        self.buf.push(b);
                    }
                }
            }
        }
    }
}
